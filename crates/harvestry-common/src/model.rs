//! The canonical study aggregate and its child records.
//!
//! One `Study` is produced per harvested source file. Coded attributes are
//! stored as paired (id, label) fields, matching the staging tables they are
//! bulk-copied into. Child rows carry their parent key (`sd_sid` for study
//! attributes, `sd_oid` for data object attributes) so that the storage sink
//! can insert each collection as a flat homogeneous batch.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Root aggregate for one source study record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Study {
    pub sd_sid: String,
    pub display_title: Option<String>,
    pub title_lang_code: Option<String>,

    pub brief_description: Option<String>,
    pub bd_contains_html: bool,
    pub data_sharing_statement: Option<String>,
    pub dss_contains_html: bool,

    pub study_type_id: Option<i32>,
    pub study_type: Option<String>,
    pub study_status_id: Option<i32>,
    pub study_status: Option<String>,
    pub study_start_year: Option<i32>,
    pub study_start_month: Option<i32>,
    pub study_enrolment: Option<i32>,

    pub study_gender_elig_id: Option<i32>,
    pub study_gender_elig: Option<String>,
    pub min_age: Option<i32>,
    pub min_age_units_id: Option<i32>,
    pub min_age_units: Option<String>,
    pub max_age: Option<i32>,
    pub max_age_units_id: Option<i32>,
    pub max_age_units: Option<String>,

    pub datetime_of_data_fetch: Option<DateTime<Utc>>,

    pub identifiers: Vec<StudyIdentifier>,
    pub titles: Vec<StudyTitle>,
    pub references: Vec<StudyReference>,
    pub contributors: Vec<StudyContributor>,
    pub topics: Vec<StudyTopic>,
    pub features: Vec<StudyFeature>,
    pub relationships: Vec<StudyRelationship>,
    pub links: Vec<StudyLink>,
    pub ipd_info: Vec<AvailableIpd>,

    pub data_objects: Vec<DataObject>,
}

impl Study {
    pub fn new(sd_sid: impl Into<String>, fetched: Option<DateTime<Utc>>) -> Self {
        Self {
            sd_sid: sd_sid.into(),
            datetime_of_data_fetch: fetched,
            ..Default::default()
        }
    }
}

/// An identifier assigned to a study by a registry, sponsor, funder etc.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyIdentifier {
    pub sd_sid: String,
    pub identifier_value: String,
    pub identifier_type_id: i32,
    pub identifier_type: String,
    pub identifier_org_id: Option<i32>,
    pub identifier_org: Option<String>,
    pub identifier_date: Option<String>,
    pub identifier_link: Option<String>,
}

impl StudyIdentifier {
    pub fn new(
        sd_sid: &str,
        value: &str,
        type_id: i32,
        type_label: &str,
        org_id: Option<i32>,
        org: Option<&str>,
    ) -> Self {
        Self {
            sd_sid: sd_sid.to_string(),
            identifier_value: value.to_string(),
            identifier_type_id: type_id,
            identifier_type: type_label.to_string(),
            identifier_org_id: org_id,
            identifier_org: org.map(str::to_string),
            identifier_date: None,
            identifier_link: None,
        }
    }
}

/// A study title. At most one per study carries `is_default`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyTitle {
    pub sd_sid: String,
    pub title_text: String,
    pub title_type_id: i32,
    pub title_type: String,
    pub is_default: bool,
    pub comments: Option<String>,
}

impl StudyTitle {
    pub fn new(sd_sid: &str, text: &str, type_id: i32, type_label: &str, is_default: bool) -> Self {
        Self {
            sd_sid: sd_sid.to_string(),
            title_text: text.to_string(),
            title_type_id: type_id,
            title_type: type_label.to_string(),
            is_default,
            comments: None,
        }
    }
}

/// A literature reference attached to a study.
///
/// `comments` carries the source provenance tag ("primary", "associated",
/// "RETRACTION") used by reference reconciliation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyReference {
    pub sd_sid: String,
    pub pmid: Option<String>,
    pub citation: Option<String>,
    pub doi: Option<String>,
    pub comments: Option<String>,
}

impl StudyReference {
    pub fn new(
        sd_sid: &str,
        pmid: Option<&str>,
        citation: Option<&str>,
        doi: Option<&str>,
        comments: Option<&str>,
    ) -> Self {
        Self {
            sd_sid: sd_sid.to_string(),
            pmid: pmid.map(str::to_string),
            citation: citation.map(str::to_string),
            doi: doi.map(str::to_string),
            comments: comments.map(str::to_string),
        }
    }
}

/// A contributing organisation or person. Exactly one of the organisation or
/// person identity is populated, never both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyContributor {
    pub sd_sid: String,
    pub contrib_type_id: i32,
    pub contrib_type: String,
    pub is_individual: bool,
    pub organisation_id: Option<i32>,
    pub organisation_name: Option<String>,
    pub person_full_name: Option<String>,
    pub person_affiliation: Option<String>,
}

impl StudyContributor {
    pub fn organisation(
        sd_sid: &str,
        type_id: i32,
        type_label: &str,
        org_id: Option<i32>,
        org_name: &str,
    ) -> Self {
        Self {
            sd_sid: sd_sid.to_string(),
            contrib_type_id: type_id,
            contrib_type: type_label.to_string(),
            is_individual: false,
            organisation_id: org_id,
            organisation_name: Some(org_name.to_string()),
            person_full_name: None,
            person_affiliation: None,
        }
    }

    pub fn person(
        sd_sid: &str,
        type_id: i32,
        type_label: &str,
        full_name: &str,
        affiliation: Option<&str>,
    ) -> Self {
        Self {
            sd_sid: sd_sid.to_string(),
            contrib_type_id: type_id,
            contrib_type: type_label.to_string(),
            is_individual: true,
            organisation_id: None,
            organisation_name: None,
            person_full_name: Some(full_name.to_string()),
            person_affiliation: affiliation.map(str::to_string),
        }
    }

    /// Reclassify an organisation-tagged entry as a person. Used when the
    /// name-token heuristic says the "organisation" is actually a person.
    pub fn reassign_as_person(&mut self) {
        if let Some(name) = self.organisation_name.take() {
            self.person_full_name = Some(name);
            self.organisation_id = None;
            self.is_individual = true;
        }
    }
}

/// A condition, keyword or chemical/agent topic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyTopic {
    pub sd_sid: String,
    pub topic_type_id: i32,
    pub topic_type: String,
    pub topic_value: String,
    pub ct_scheme_id: Option<i32>,
    pub ct_scheme: Option<String>,
    pub ct_scheme_code: Option<String>,
    pub comments: Option<String>,
}

impl StudyTopic {
    pub fn new(sd_sid: &str, type_id: i32, type_label: &str, value: &str) -> Self {
        Self {
            sd_sid: sd_sid.to_string(),
            topic_type_id: type_id,
            topic_type: type_label.to_string(),
            topic_value: value.to_string(),
            ..Default::default()
        }
    }

    pub fn coded(
        sd_sid: &str,
        type_id: i32,
        type_label: &str,
        value: &str,
        scheme_id: Option<i32>,
        scheme: &str,
        code: &str,
    ) -> Self {
        Self {
            sd_sid: sd_sid.to_string(),
            topic_type_id: type_id,
            topic_type: type_label.to_string(),
            topic_value: value.to_string(),
            ct_scheme_id: scheme_id,
            ct_scheme: Some(scheme.to_string()),
            ct_scheme_code: Some(code.to_string()),
            comments: None,
        }
    }
}

/// A coded design feature (phase, masking, allocation, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyFeature {
    pub sd_sid: String,
    pub feature_type_id: i32,
    pub feature_type: String,
    pub feature_value_id: i32,
    pub feature_value: String,
}

impl StudyFeature {
    pub fn new(sd_sid: &str, type_id: i32, type_label: &str, value_id: i32, value: &str) -> Self {
        Self {
            sd_sid: sd_sid.to_string(),
            feature_type_id: type_id,
            feature_type: type_label.to_string(),
            feature_value_id: value_id,
            feature_value: value.to_string(),
        }
    }
}

/// A directed link between two studies (e.g. expanded access pairs).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyRelationship {
    pub sd_sid: String,
    pub relationship_type_id: i32,
    pub relationship_type: String,
    pub target_sd_sid: String,
}

impl StudyRelationship {
    pub fn new(sd_sid: &str, type_id: i32, type_label: &str, target: &str) -> Self {
        Self {
            sd_sid: sd_sid.to_string(),
            relationship_type_id: type_id,
            relationship_type: type_label.to_string(),
            target_sd_sid: target.to_string(),
        }
    }
}

/// An arbitrary labelled external URL attached to a study.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyLink {
    pub sd_sid: String,
    pub link_label: Option<String>,
    pub link_url: String,
}

impl StudyLink {
    pub fn new(sd_sid: &str, label: Option<&str>, url: &str) -> Self {
        Self {
            sd_sid: sd_sid.to_string(),
            link_label: label.map(str::to_string),
            link_url: url.to_string(),
        }
    }
}

/// A record of IPD availability that could not be resolved into a concrete
/// data object. Stored for future processing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailableIpd {
    pub sd_sid: String,
    pub ipd_id: Option<String>,
    pub ipd_type: Option<String>,
    pub ipd_url: Option<String>,
    pub ipd_comment: Option<String>,
}

/// A document, dataset or web page associated with a study.
///
/// `sd_oid` is the hex SHA-256 of `sd_sid` + the derived display title, so
/// re-harvesting an unchanged source document yields the same object id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataObject {
    pub sd_oid: String,
    pub sd_sid: String,
    pub display_title: String,
    pub publication_year: Option<i32>,
    pub object_class_id: i32,
    pub object_class: String,
    pub object_type_id: i32,
    pub object_type: String,
    pub managing_org_id: Option<i32>,
    pub managing_org: Option<String>,
    pub access_type_id: Option<i32>,
    pub access_type: Option<String>,
    pub access_details: Option<String>,
    pub access_details_url: Option<String>,
    pub url_last_checked: Option<NaiveDate>,
    pub datetime_of_data_fetch: Option<DateTime<Utc>>,

    pub titles: Vec<ObjectTitle>,
    pub dates: Vec<ObjectDate>,
    pub instances: Vec<ObjectInstance>,
    pub dataset: Option<ObjectDataset>,
}

/// A title attached to a data object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectTitle {
    pub sd_oid: String,
    pub title_text: String,
    pub title_type_id: i32,
    pub title_type: String,
    pub is_default: bool,
}

impl ObjectTitle {
    pub fn new(sd_oid: &str, text: &str, type_id: i32, type_label: &str, is_default: bool) -> Self {
        Self {
            sd_oid: sd_oid.to_string(),
            title_text: text.to_string(),
            title_type_id: type_id,
            title_type: type_label.to_string(),
            is_default,
        }
    }
}

/// A typed partial date attached to a data object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectDate {
    pub sd_oid: String,
    pub date_type_id: i32,
    pub date_type: String,
    pub start_year: Option<i32>,
    pub start_month: Option<i32>,
    pub start_day: Option<i32>,
    pub date_as_string: Option<String>,
}

/// A concrete downloadable or viewable representation of a data object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectInstance {
    pub sd_oid: String,
    pub instance_type_id: Option<i32>,
    pub instance_type: Option<String>,
    pub repository_org_id: Option<i32>,
    pub repository_org: Option<String>,
    pub url: Option<String>,
    pub url_accessible: Option<bool>,
    pub resource_type_id: Option<i32>,
    pub resource_type: Option<String>,
    pub resource_size: Option<String>,
    pub resource_size_units: Option<String>,
}

impl ObjectInstance {
    pub fn new(
        sd_oid: &str,
        org_id: Option<i32>,
        org: Option<&str>,
        url: &str,
        resource_type_id: i32,
        resource_type: &str,
    ) -> Self {
        Self {
            sd_oid: sd_oid.to_string(),
            repository_org_id: org_id,
            repository_org: org.map(str::to_string),
            url: Some(url.to_string()),
            url_accessible: Some(true),
            resource_type_id: Some(resource_type_id),
            resource_type: Some(resource_type.to_string()),
            ..Default::default()
        }
    }
}

/// Record-level de-identification and consent properties of a dataset object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectDataset {
    pub sd_oid: String,
    pub record_keys_type_id: i32,
    pub record_keys_type: String,
    pub record_keys_details: Option<String>,
    pub deident_type_id: i32,
    pub deident_type: String,
    pub deident_details: Option<String>,
    pub consent_type_id: i32,
    pub consent_type: String,
    pub consent_details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contributor_org_person_exclusive() {
        let org = StudyContributor::organisation("S1", 54, "Trial Sponsor", None, "Acme Pharma");
        assert!(!org.is_individual);
        assert!(org.organisation_name.is_some());
        assert!(org.person_full_name.is_none());

        let person = StudyContributor::person("S1", 51, "Study Lead", "Jane Doe", Some("Acme"));
        assert!(person.is_individual);
        assert!(person.organisation_name.is_none());
        assert_eq!(person.person_full_name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_reassign_as_person_moves_name() {
        let mut c = StudyContributor::organisation("S1", 54, "Trial Sponsor", Some(9), "Dr John Smith");
        c.reassign_as_person();
        assert!(c.is_individual);
        assert_eq!(c.person_full_name.as_deref(), Some("Dr John Smith"));
        assert!(c.organisation_name.is_none());
        assert!(c.organisation_id.is_none());
    }
}
