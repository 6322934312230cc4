//! Identifier-type classification heuristics.
//!
//! Secondary identifiers arrive with free-text type and issuer hints.
//! Well-known registry id shapes are recognized from the value itself;
//! otherwise the hints decide between funder / ethics / registry / sponsor
//! classifications, defaulting to a sponsor id.

use harvestry_common::vocab::org;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NCT_RE: Regex = Regex::new(r"^NCT\d{8}$").unwrap();
    static ref EUDRACT_RE: Regex = Regex::new(r"^\d{4}-\d{6}-\d{2}$").unwrap();
    static ref ISRCTN_RE: Regex = Regex::new(r"^ISRCTN\d{8}$").unwrap();
    static ref NIH_GRANT_RE: Regex = Regex::new(r"^[A-Z]\d{2}\s?[A-Z]{2}\d{6}").unwrap();
}

/// A classified identifier, ready to become a `StudyIdentifier` row.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierDetails {
    pub id_value: String,
    pub id_type_id: i32,
    pub id_type: String,
    pub id_org_id: Option<i32>,
    pub id_org: Option<String>,
}

impl IdentifierDetails {
    fn new(value: &str, type_id: i32, type_label: &str, org_id: Option<i32>, org: Option<&str>) -> Self {
        Self {
            id_value: value.trim().to_string(),
            id_type_id: type_id,
            id_type: type_label.to_string(),
            id_org_id: org_id,
            id_org: org.map(str::to_string),
        }
    }
}

/// Classify a secondary identifier from its value shape and the source's
/// free-text type / issuing organisation hints.
pub fn classify_identifier(
    type_hint: Option<&str>,
    org_hint: Option<&str>,
    value: &str,
) -> IdentifierDetails {
    let v = value.trim();

    // registry id shapes are recognized regardless of hints
    if NCT_RE.is_match(v) {
        return IdentifierDetails::new(v, 11, "Trial Registry ID",
            Some(org::CLINICAL_TRIALS_GOV), Some("ClinicalTrials.gov"));
    }
    if EUDRACT_RE.is_match(v) {
        return IdentifierDetails::new(v, 11, "Trial Registry ID",
            Some(org::EU_CTR), Some("EU Clinical Trials Register"));
    }
    if ISRCTN_RE.is_match(v) {
        return IdentifierDetails::new(v, 11, "Trial Registry ID",
            Some(org::ISRCTN), Some("ISRCTN"));
    }

    let hint = format!(
        "{} {}",
        type_hint.unwrap_or_default(),
        org_hint.unwrap_or_default()
    )
    .to_lowercase();

    if hint.contains("nih grant") || hint.contains("nih grant/contract") || NIH_GRANT_RE.is_match(v) {
        return IdentifierDetails::new(v, 13, "Funder's ID",
            Some(org::NIH), Some("National Institutes of Health"));
    }
    if hint.contains("ethics") || hint.contains("irb") || hint.contains("iec")
        || hint.contains("institutional review")
    {
        return IdentifierDetails::new(v, 12, "Ethics Review ID", None, org_hint);
    }
    if hint.contains("grant") || hint.contains("funder") || hint.contains("funding") {
        return IdentifierDetails::new(v, 13, "Funder's ID", None, org_hint);
    }
    if hint.contains("registry") || hint.contains("register") {
        return IdentifierDetails::new(v, 11, "Trial Registry ID", None, org_hint);
    }

    IdentifierDetails::new(v, 14, "Sponsor's ID", None, org_hint)
}
