//! # Incidents and Fingerprints
//!
//! An [`Incident`] is a sensor observation submitted for triage. It is
//! immutable once built: fields are private, and every field type validates
//! itself on construction and on deserialization.
//!
//! ## Fingerprint
//!
//! The [`Fingerprint`] is the idempotence key for approvals and ledger
//! commits. It is the SHA-256 of the canonical JSON of the
//! [`NormalizedIncident`]:
//!
//! | Field | Normalization |
//! |-------|---------------|
//! | `sector_id` | trimmed |
//! | `observed_confidence` | integer basis points, `round(c × 10_000)` |
//! | `coordinates` | integer microdegrees, `round(deg × 1_000_000)` |
//! | `evidence_ref` | trimmed |
//!
//! Two submissions that differ only below these resolutions share a
//! fingerprint.

use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalBytes;
use crate::digest::sha256_hex;
use crate::error::{CanonicalizationError, ValidationError};

/// Maximum accepted sector identifier length.
pub const MAX_SECTOR_LEN: usize = 128;

// ─── Disaster Type ───────────────────────────────────────────────────

/// The kind of disaster the sensor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterType {
    /// Active wildfire or smoke plume.
    Wildfire,
    /// Flash flood or water overflow.
    Flood,
    /// Traffic or industrial accident.
    Accident,
    /// Mass casualty event.
    MassCasualty,
    /// Anything else.
    Other,
}

impl DisasterType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wildfire => "wildfire",
            Self::Flood => "flood",
            Self::Accident => "accident",
            Self::MassCasualty => "mass_casualty",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for DisasterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Sector ──────────────────────────────────────────────────────────

/// Validated sector identifier (trimmed, non-empty, bounded).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectorId(String);

impl SectorId {
    /// Create a validated sector identifier.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySector);
        }
        let len = trimmed.chars().count();
        if len > MAX_SECTOR_LEN {
            return Err(ValidationError::SectorTooLong {
                max: MAX_SECTOR_LEN,
                len,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The sector identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SectorId {
    type Error = ValidationError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SectorId> for String {
    fn from(value: SectorId) -> Self {
        value.0
    }
}

impl std::fmt::Display for SectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Confidence ──────────────────────────────────────────────────────

/// A confidence score in `[0, 1]`.
///
/// Serialized as a plain JSON number. Use [`Confidence::basis_points`] when
/// the value must be hashed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Full confidence.
    pub const MAX: Self = Self(1.0);
    /// Zero confidence.
    pub const MIN: Self = Self(0.0);

    /// Create a validated confidence. Rejects NaN, infinities, and values
    /// outside `[0, 1]`.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::ConfidenceOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Build from integer basis points (clamped to 10 000).
    pub fn from_basis_points(bps: u32) -> Self {
        Self(f64::from(bps.min(10_000)) / 10_000.0)
    }

    /// The raw value.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// The value in basis points, rounded to the nearest integer.
    pub fn basis_points(&self) -> u32 {
        // Range-checked at construction, so the cast cannot truncate.
        (self.0 * 10_000.0).round() as u32
    }
}

impl TryFrom<f64> for Confidence {
    type Error = ValidationError;
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

// ─── Coordinates ─────────────────────────────────────────────────────

/// WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = ValidationError;
    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Self::new(raw.lat, raw.lng)
    }
}

impl Coordinates {
    /// Create validated coordinates.
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::LatitudeOutOfRange(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(ValidationError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }

    fn normalized(&self) -> NormalizedCoordinates {
        NormalizedCoordinates {
            lat_micro: (self.lat * 1_000_000.0).round() as i64,
            lng_micro: (self.lng * 1_000_000.0).round() as i64,
        }
    }
}

// ─── Evidence ────────────────────────────────────────────────────────

/// URI pointing at supporting evidence (video, imagery).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EvidenceRef(String);

impl EvidenceRef {
    /// Create a validated evidence reference. The value must look like
    /// `scheme://rest` where the scheme is RFC 3986 shaped.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = raw.as_ref().trim();
        let valid = match trimmed.split_once("://") {
            Some((scheme, rest)) => {
                !rest.is_empty()
                    && scheme
                        .chars()
                        .next()
                        .is_some_and(|c| c.is_ascii_alphabetic())
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            }
            None => false,
        };
        if !valid {
            return Err(ValidationError::InvalidEvidenceRef(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The URI as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EvidenceRef {
    type Error = ValidationError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EvidenceRef> for String {
    fn from(value: EvidenceRef) -> Self {
        value.0
    }
}

// ─── Incident ────────────────────────────────────────────────────────

/// A sensor/incident observation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    disaster_type: DisasterType,
    sector_id: SectorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coordinates: Option<Coordinates>,
    observed_confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    evidence_ref: Option<EvidenceRef>,
}

impl Incident {
    /// Build a validated incident from raw inputs.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn new(
        disaster_type: DisasterType,
        sector_id: &str,
        coordinates: Option<(f64, f64)>,
        observed_confidence: f64,
        evidence_ref: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            disaster_type,
            sector_id: SectorId::new(sector_id)?,
            coordinates: coordinates
                .map(|(lat, lng)| Coordinates::new(lat, lng))
                .transpose()?,
            observed_confidence: Confidence::new(observed_confidence)?,
            evidence_ref: evidence_ref.map(EvidenceRef::new).transpose()?,
        })
    }

    /// Disaster classification.
    pub fn disaster_type(&self) -> DisasterType {
        self.disaster_type
    }

    /// Sector the observation came from.
    pub fn sector_id(&self) -> &SectorId {
        &self.sector_id
    }

    /// Optional location.
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    /// Sensor-side confidence.
    pub fn observed_confidence(&self) -> Confidence {
        self.observed_confidence
    }

    /// Optional evidence URI.
    pub fn evidence_ref(&self) -> Option<&EvidenceRef> {
        self.evidence_ref.as_ref()
    }

    /// The float-free form used for hashing.
    pub fn normalized(&self) -> NormalizedIncident {
        NormalizedIncident {
            disaster_type: self.disaster_type,
            sector_id: self.sector_id.as_str().to_string(),
            confidence_bps: self.observed_confidence.basis_points(),
            coordinates: self.coordinates.map(|c| c.normalized()),
            evidence_ref: self.evidence_ref.as_ref().map(|e| e.as_str().to_string()),
        }
    }

    /// Compute the deterministic fingerprint of this incident.
    pub fn fingerprint(&self) -> Result<Fingerprint, CanonicalizationError> {
        let canonical = CanonicalBytes::new(&self.normalized())?;
        Ok(Fingerprint(sha256_hex(&canonical)))
    }
}

/// Integer-only projection of an [`Incident`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedIncident {
    /// Disaster classification.
    pub disaster_type: DisasterType,
    /// Trimmed sector identifier.
    pub sector_id: String,
    /// Observed confidence in basis points.
    pub confidence_bps: u32,
    /// Location in microdegrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<NormalizedCoordinates>,
    /// Trimmed evidence URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_ref: Option<String>,
}

/// Coordinates in integer microdegrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCoordinates {
    /// Latitude × 10⁶.
    pub lat_micro: i64,
    /// Longitude × 10⁶.
    pub lng_micro: i64,
}

// ─── Fingerprint ─────────────────────────────────────────────────────

/// Deterministic incident fingerprint: 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse and validate a fingerprint string.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let valid =
            raw.len() == 64 && raw.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(ValidationError::InvalidFingerprint(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// The hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = ValidationError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wildfire() -> Incident {
        Incident::new(
            DisasterType::Wildfire,
            "Sector-1",
            Some((37.3417, -121.9751)),
            0.92,
            Some("neofs://neoguard/incident_Sector-1.mp4"),
        )
        .unwrap()
    }

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(wildfire().fingerprint().unwrap(), wildfire().fingerprint().unwrap());
    }

    #[test]
    fn fingerprint_ignores_whitespace_and_sub_resolution_noise() {
        let noisy = Incident::new(
            DisasterType::Wildfire,
            "  Sector-1 ",
            Some((37.34170000001, -121.9751)),
            0.920000001,
            Some(" neofs://neoguard/incident_Sector-1.mp4"),
        )
        .unwrap();
        assert_eq!(noisy.fingerprint().unwrap(), wildfire().fingerprint().unwrap());
    }

    #[test]
    fn fingerprint_changes_with_any_field() {
        let base = wildfire().fingerprint().unwrap();
        let flood = Incident::new(
            DisasterType::Flood,
            "Sector-1",
            Some((37.3417, -121.9751)),
            0.92,
            Some("neofs://neoguard/incident_Sector-1.mp4"),
        )
        .unwrap();
        let other_sector = Incident::new(
            DisasterType::Wildfire,
            "Sector-2",
            Some((37.3417, -121.9751)),
            0.92,
            Some("neofs://neoguard/incident_Sector-1.mp4"),
        )
        .unwrap();
        assert_ne!(flood.fingerprint().unwrap(), base);
        assert_ne!(other_sector.fingerprint().unwrap(), base);
    }

    #[test]
    fn normalized_form_is_integer_only() {
        let n = wildfire().normalized();
        assert_eq!(n.confidence_bps, 9200);
        let coords = n.coordinates.unwrap();
        assert_eq!(coords.lat_micro, 37_341_700);
        assert_eq!(coords.lng_micro, -121_975_100);
        assert!(CanonicalBytes::new(&n).is_ok());
    }

    #[test]
    fn rejects_empty_sector() {
        let err = Incident::new(DisasterType::Flood, "   ", None, 0.5, None).unwrap_err();
        assert_eq!(err, ValidationError::EmptySector);
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        assert!(matches!(
            Incident::new(DisasterType::Flood, "Sector-2", None, 1.01, None),
            Err(ValidationError::ConfidenceOutOfRange(_))
        ));
        assert!(matches!(
            Incident::new(DisasterType::Flood, "Sector-2", None, f64::NAN, None),
            Err(ValidationError::ConfidenceOutOfRange(_))
        ));
    }

    #[test]
    fn rejects_bad_coordinates() {
        assert!(matches!(
            Incident::new(DisasterType::Accident, "Sector-3", Some((91.0, 0.0)), 0.5, None),
            Err(ValidationError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            Incident::new(DisasterType::Accident, "Sector-3", Some((0.0, -180.5)), 0.5, None),
            Err(ValidationError::LongitudeOutOfRange(_))
        ));
    }

    #[test]
    fn rejects_schemeless_evidence() {
        assert!(matches!(
            Incident::new(DisasterType::Other, "Sector-4", None, 0.5, Some("incident.mp4")),
            Err(ValidationError::InvalidEvidenceRef(_))
        ));
        assert!(matches!(
            Incident::new(DisasterType::Other, "Sector-4", None, 0.5, Some("1ab://x")),
            Err(ValidationError::InvalidEvidenceRef(_))
        ));
    }

    #[test]
    fn deserialization_validates() {
        let bad = serde_json::json!({
            "disaster_type": "flood",
            "sector_id": "Sector-2",
            "observed_confidence": 1.5
        });
        assert!(serde_json::from_value::<Incident>(bad).is_err());

        let good = serde_json::json!({
            "disaster_type": "mass_casualty",
            "sector_id": "Sector-4",
            "coordinates": {"lat": 37.343, "lng": -121.977},
            "observed_confidence": 0.85
        });
        let incident: Incident = serde_json::from_value(good).unwrap();
        assert_eq!(incident.disaster_type(), DisasterType::MassCasualty);
        assert!(incident.evidence_ref().is_none());
    }

    #[test]
    fn fingerprint_parse_round_trips_display() {
        let fp = wildfire().fingerprint().unwrap();
        assert_eq!(Fingerprint::parse(&fp.to_string()).unwrap(), fp);
        assert!(Fingerprint::parse("ABC").is_err());
        assert!(Fingerprint::parse(&"G".repeat(64)).is_err());
    }

    #[test]
    fn confidence_basis_points_round() {
        assert_eq!(Confidence::new(0.85).unwrap().basis_points(), 8500);
        assert_eq!(Confidence::new(0.99995).unwrap().basis_points(), 10_000);
        assert_eq!(Confidence::from_basis_points(9300).value(), 0.93);
    }
}
