//! # Threshold Agent
//!
//! Rule-based analyst. It reads only the incident itself, so it cannot time
//! out or fail, which makes it the default fallback.
//!
//! | Observed confidence | Disaster type | Severity |
//! |---------------------|---------------|----------|
//! | `< clear_below` | any | Clear |
//! | `≥ clear_below` | wildfire, mass_casualty | Critical |
//! | `≥ clear_below` | flood, accident, other | Advisory |
//!
//! The reported confidence is the sensor's observed confidence.

use async_trait::async_trait;
use triage_core::{Assessment, Confidence, DisasterType, Incident, Severity};

use crate::agent::{Agent, AgentError, Deadline};

/// Default observed confidence below which incidents are cleared.
pub const DEFAULT_CLEAR_BELOW: f64 = 0.5;

/// Deterministic severity-by-rule agent.
#[derive(Debug, Clone)]
pub struct ThresholdAgent {
    name: String,
    clear_below: Confidence,
}

impl ThresholdAgent {
    /// Agent with the default clear threshold.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clear_below: Confidence::from_basis_points(5_000),
        }
    }

    /// Override the clear threshold.
    pub fn with_clear_below(mut self, clear_below: Confidence) -> Self {
        self.clear_below = clear_below;
        self
    }

    /// Pure assessment, usable without a runtime.
    pub fn assess(&self, incident: &Incident) -> Assessment {
        let observed = incident.observed_confidence();
        let sector = incident.sector_id();
        let kind = incident.disaster_type();

        if observed.value() < self.clear_below.value() {
            return Assessment {
                severity: Severity::Clear,
                confidence: observed,
                reasoning: format!(
                    "{kind} signal in {sector} at {observed} is below the {} clear threshold; treating as noise",
                    self.clear_below
                ),
                recommended_actions: vec![
                    "Continue routine monitoring".into(),
                    "Maintain current drone positions".into(),
                ],
            };
        }

        let severity = match kind {
            DisasterType::Wildfire | DisasterType::MassCasualty => Severity::Critical,
            DisasterType::Flood | DisasterType::Accident | DisasterType::Other => {
                Severity::Advisory
            }
        };

        Assessment {
            severity,
            confidence: observed,
            reasoning: format!("{kind} detected in {sector} with observed confidence {observed}"),
            recommended_actions: actions_for(kind),
        }
    }
}

fn actions_for(kind: DisasterType) -> Vec<String> {
    let actions: &[&str] = match kind {
        DisasterType::Wildfire => &[
            "Dispatch fire response units",
            "Issue evacuation advisory for the sector",
            "Reposition drones for perimeter mapping",
        ],
        DisasterType::Flood => &[
            "Alert water management authorities",
            "Close low-lying access roads",
            "Monitor water level trend",
        ],
        DisasterType::Accident => &[
            "Dispatch emergency medical services",
            "Notify traffic control",
        ],
        DisasterType::MassCasualty => &[
            "Activate mass casualty protocol",
            "Dispatch all available medical units",
            "Notify regional hospitals",
        ],
        DisasterType::Other => &["Send reconnaissance drone", "Escalate to duty officer"],
    };
    actions.iter().map(|s| (*s).to_string()).collect()
}

#[async_trait]
impl Agent for ThresholdAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(
        &self,
        incident: &Incident,
        _deadline: Deadline,
    ) -> Result<Assessment, AgentError> {
        Ok(self.assess(incident))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(kind: DisasterType, confidence: f64) -> Incident {
        Incident::new(kind, "Sector-9", None, confidence, None).unwrap()
    }

    #[test]
    fn default_clear_threshold() {
        assert_eq!(ThresholdAgent::new("t").clear_below.value(), DEFAULT_CLEAR_BELOW);
    }

    #[test]
    fn low_observed_confidence_clears() {
        let a = ThresholdAgent::new("t").assess(&incident(DisasterType::Wildfire, 0.3));
        assert_eq!(a.severity, Severity::Clear);
        assert_eq!(a.confidence.value(), 0.3);
    }

    #[test]
    fn wildfire_and_mass_casualty_are_critical() {
        let agent = ThresholdAgent::new("t");
        assert_eq!(agent.assess(&incident(DisasterType::Wildfire, 0.92)).severity, Severity::Critical);
        assert_eq!(
            agent.assess(&incident(DisasterType::MassCasualty, 0.85)).severity,
            Severity::Critical
        );
    }

    #[test]
    fn others_are_advisory_with_observed_confidence() {
        let a = ThresholdAgent::new("t").assess(&incident(DisasterType::Flood, 0.6));
        assert_eq!(a.severity, Severity::Advisory);
        assert_eq!(a.confidence.value(), 0.6);
        assert!(!a.recommended_actions.is_empty());
    }

    #[test]
    fn clear_threshold_is_configurable() {
        let agent = ThresholdAgent::new("t").with_clear_below(Confidence::new(0.7).unwrap());
        assert_eq!(agent.assess(&incident(DisasterType::Flood, 0.6)).severity, Severity::Clear);
        assert_eq!(agent.assess(&incident(DisasterType::Flood, 0.7)).severity, Severity::Advisory);
    }

    #[tokio::test]
    async fn agent_impl_never_fails() {
        let agent = ThresholdAgent::new("threshold");
        let a = agent
            .analyze(&incident(DisasterType::Accident, 0.9), Deadline::unbounded())
            .await
            .unwrap();
        assert_eq!(a.severity, Severity::Advisory);
        assert_eq!(agent.name(), "threshold");
    }
}
