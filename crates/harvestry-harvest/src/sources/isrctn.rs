//! ISRCTN registry study processor.
//!
//! One `IsrctnRecord` XML document per trial. ISRCTN is unusual in listing
//! "study outputs" (protocols, SAPs, results articles, participant
//! information sheets) directly against the registration; each output is
//! mapped through a fixed document-type table into a data object.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use harvestry_common::error::Result;
use harvestry_common::model::{
    DataObject, ObjectDate, ObjectInstance, ObjectTitle, Study, StudyContributor, StudyFeature,
    StudyIdentifier, StudyTitle, StudyTopic,
};
use harvestry_common::vocab::{self, org};

use crate::helpers::dates::{self, SplitDate};
use crate::helpers::{hash, html, orgs};
use crate::reconcile;

use super::{uniquify_title, xml_err};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename = "IsrctnRecord")]
pub struct IsrctnRecord {
    pub isrctn_id: String,
    pub public_title: Option<String>,
    pub scientific_title: Option<String>,
    pub acronym: Option<String>,
    pub plain_english_summary: Option<String>,
    pub study_hypothesis: Option<String>,
    pub trial_status: Option<String>,
    pub trial_type: Option<String>,
    pub study_design: Option<String>,
    pub phase: Option<String>,
    pub gender: Option<String>,
    pub target_enrolment: Option<String>,
    pub date_assigned: Option<String>,
    pub start_date: Option<String>,
    pub sponsor_name: Option<String>,
    pub sponsor_protocol_id: Option<String>,
    pub ipd_sharing_statement: Option<String>,
    pub remote_url: Option<String>,
    pub contacts: IsrctnContacts,
    pub conditions: IsrctnConditions,
    pub drug_names: IsrctnDrugs,
    pub outputs: IsrctnOutputs,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IsrctnContacts {
    #[serde(rename = "Contact")]
    pub items: Vec<IsrctnContact>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IsrctnContact {
    pub contact_type: Option<String>,
    pub forename: Option<String>,
    pub surname: Option<String>,
    pub affiliation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IsrctnConditions {
    #[serde(rename = "Condition")]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IsrctnDrugs {
    #[serde(rename = "DrugName")]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IsrctnOutputs {
    #[serde(rename = "Output")]
    pub items: Vec<IsrctnOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IsrctnOutput {
    pub output_type: String,
    pub url: Option<String>,
    pub date_created: Option<String>,
}

pub fn parse(raw: &str) -> Result<IsrctnRecord> {
    quick_xml::de::from_str(raw).map_err(xml_err)
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Object class/type for the registry's output-type vocabulary.
fn output_types(output_type: &str) -> (i32, &'static str, i32, String) {
    let lower = output_type.trim().to_lowercase();
    if lower.contains("dataset") {
        (14, "Datasets", 80, "Individual Participant Data".to_string())
    } else if lower.contains("protocol") {
        (23, "Text", 11, "Study Protocol".to_string())
    } else if lower.contains("statistical analysis plan") || lower == "sap" {
        (23, "Text", 22, "Statistical analysis plan".to_string())
    } else if lower.contains("basic results") {
        (23, "Text", 28, "Trial registry results summary".to_string())
    } else if lower.contains("results article") || lower.contains("journal article") {
        (23, "Text", 12, "Journal article".to_string())
    } else if lower.contains("participant information sheet") {
        (23, "Text", 19, "Participant information sheets".to_string())
    } else if lower.contains("abstract") {
        (23, "Text", 12, "Journal article".to_string())
    } else if lower.contains("thesis") {
        (23, "Text", 12, "Journal article".to_string())
    } else {
        (23, "Text", 37, output_type.trim().to_string())
    }
}

fn resource_type_for(url: &str) -> (i32, &'static str) {
    if url.to_lowercase().ends_with(".pdf") {
        (11, "PDF")
    } else {
        (35, "Web text")
    }
}

pub fn process(st: &IsrctnRecord, fetched: Option<DateTime<Utc>>) -> Option<Study> {
    let sid = st.isrctn_id.trim();
    if sid.is_empty() {
        return None;
    }
    let mut s = Study::new(sid, fetched);

    let mut identifiers: Vec<StudyIdentifier> = Vec::new();
    let mut titles: Vec<StudyTitle> = Vec::new();
    let mut features: Vec<StudyFeature> = Vec::new();
    let mut topics: Vec<StudyTopic> = Vec::new();
    let mut contributors: Vec<StudyContributor> = Vec::new();
    let mut data_objects: Vec<DataObject> = Vec::new();
    let mut used_titles: Vec<String> = Vec::new();

    let registration_date = non_empty(&st.date_assigned).and_then(dates::parse_iso_date);

    let mut registry_id =
        StudyIdentifier::new(sid, sid, 11, "Trial Registry ID", Some(org::ISRCTN), Some("ISRCTN"));
    registry_id.identifier_date = registration_date.as_ref().map(|d| d.date_string.clone());
    identifiers.push(registry_id);

    let sponsor_name = non_empty(&st.sponsor_name)
        .filter(|sp| !orgs::is_null_org_name(sp))
        .map(|sp| orgs::tidy_org_name(sp, sid));
    if let Some(protocol_id) = non_empty(&st.sponsor_protocol_id) {
        identifiers.push(StudyIdentifier::new(
            sid, protocol_id, 14, "Sponsor's ID", None, sponsor_name.as_deref()));
    }

    // ── Titles and description ────────────────────────────────────────────

    let public_title = non_empty(&st.public_title).map(|t| html::normalise_markup(t).0);
    let scientific_title = non_empty(&st.scientific_title).map(|t| html::normalise_markup(t).0);

    let mut default_found = false;
    if let Some(ref t) = public_title {
        titles.push(StudyTitle::new(sid, t, 15, "Public Title", true));
        default_found = true;
    }
    if let Some(ref t) = scientific_title {
        if public_title.as_deref().map_or(true, |p| !p.eq_ignore_ascii_case(t)) {
            titles.push(StudyTitle::new(sid, t, 16, "Trial registry title", !default_found));
            default_found = true;
        }
    }
    if let Some(acronym) = non_empty(&st.acronym) {
        titles.push(StudyTitle::new(sid, acronym, 14, "Acronym or Abbreviation", !default_found));
    }
    s.display_title = public_title.clone().or(scientific_title.clone());
    s.title_lang_code = Some("en".to_string());

    // plain english summary preferred over the formal hypothesis
    if let Some(description) =
        non_empty(&st.plain_english_summary).or_else(|| non_empty(&st.study_hypothesis))
    {
        let (desc, had_markup) = html::normalise_markup(description);
        s.brief_description = Some(desc);
        s.bd_contains_html = had_markup;
    }

    if let Some(sharing) = non_empty(&st.ipd_sharing_statement) {
        let lower = sharing.to_lowercase();
        if sharing.len() > 10 && lower != "not available" && lower != "not applicable" {
            let (stmt, had_markup) = html::normalise_markup(sharing);
            s.data_sharing_statement = Some(stmt);
            s.dss_contains_html = had_markup;
        }
    }

    // ── Type, status, enrolment ───────────────────────────────────────────

    if let Some(trial_type) = non_empty(&st.trial_type) {
        s.study_type_id = Some(vocab::study_type_id(trial_type));
        s.study_type = Some(trial_type.to_string());
    }
    if let Some(status) = non_empty(&st.trial_status) {
        s.study_status_id = Some(vocab::study_status_id(status));
        s.study_status = Some(status.to_string());
    }
    if let Some(phase) = non_empty(&st.phase) {
        features.push(StudyFeature::new(sid, 20, "phase", vocab::phase_id(phase), phase));
    }
    if let Some(design) = non_empty(&st.study_design) {
        let lower = design.to_lowercase();
        if lower.contains("randomised") || lower.contains("randomized") {
            features.push(StudyFeature::new(
                sid, 22, "allocation type", vocab::allocation_type_id("Randomised"), "Randomised"));
        }
    }

    if let Some(start) = non_empty(&st.start_date).and_then(dates::parse_iso_date) {
        if start.year > 1960 {
            s.study_start_year = Some(start.year);
            s.study_start_month = start.month;
        }
    }

    // the target figure is all ISRCTN provides; same dummy-value rules as
    // the ICTRP feed
    if let Some(raw) = non_empty(&st.target_enrolment) {
        if !raw.contains("9999") {
            if let Ok(value) = raw.parse::<i32>() {
                if value > 0 && value < 10000 {
                    s.study_enrolment = Some(value);
                }
            }
        }
    }

    if let Some(gender) = non_empty(&st.gender) {
        s.study_gender_elig_id = Some(vocab::gender_elig_id(gender));
        s.study_gender_elig = Some(gender.to_string());
    }

    // ── Contributors and topics ───────────────────────────────────────────

    if let Some(ref name) = sponsor_name {
        if orgs::is_individual(name) {
            contributors.push(StudyContributor::person(sid, 54, "Trial Sponsor", name, None));
        } else {
            contributors.push(StudyContributor::organisation(sid, 54, "Trial Sponsor", None, name));
        }
    }
    for contact in &st.contacts.items {
        let forename = non_empty(&contact.forename).unwrap_or("");
        let surname = non_empty(&contact.surname).unwrap_or("");
        let full_name = format!("{forename} {surname}").trim().to_string();
        if full_name.is_empty() {
            continue;
        }
        let full_name = orgs::tidy_person_name(&full_name);
        let is_public = non_empty(&contact.contact_type)
            .map_or(false, |t| t.eq_ignore_ascii_case("public"));
        let (type_id, type_label) = if is_public {
            (56, "Public Contact")
        } else {
            (51, "Study Lead")
        };
        contributors.push(StudyContributor::person(
            sid, type_id, type_label, &full_name, non_empty(&contact.affiliation)));
    }

    for condition in &st.conditions.items {
        let value = condition.trim();
        if !value.is_empty() && reconcile::topic_is_new(&topics, value) {
            topics.push(StudyTopic::new(sid, 13, "condition", value));
        }
    }
    for drug in &st.drug_names.items {
        let value = drug.trim();
        if !value.is_empty() && reconcile::topic_is_new(&topics, value) {
            topics.push(StudyTopic::new(sid, 12, "chemical / agent", value));
        }
    }

    // ── Data objects ──────────────────────────────────────────────────────

    let name_base = s.display_title.clone().unwrap_or_else(|| sid.to_string());

    let object_display_title =
        uniquify_title(format!("{name_base} :: Registry web page"), &mut used_titles);
    let sd_oid = hash::object_hash(sid, &object_display_title);
    let url = non_empty(&st.remote_url)
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://www.isrctn.com/{sid}"));
    let mut registry_obj = DataObject {
        sd_oid: sd_oid.clone(),
        sd_sid: sid.to_string(),
        display_title: object_display_title.clone(),
        publication_year: registration_date.as_ref().map(|d| d.year),
        object_class_id: 23,
        object_class: "Text".to_string(),
        object_type_id: 13,
        object_type: "Trial Registry entry".to_string(),
        managing_org_id: Some(org::ISRCTN),
        managing_org: Some("ISRCTN".to_string()),
        access_type_id: Some(12),
        access_type: Some("Public on-screen access".to_string()),
        datetime_of_data_fetch: fetched,
        titles: vec![ObjectTitle::new(
            &sd_oid, &object_display_title, 22, "Study short name :: object type", true)],
        instances: vec![ObjectInstance::new(
            &sd_oid, Some(org::ISRCTN), Some("ISRCTN"), &url, 35, "Web text")],
        ..Default::default()
    };
    if let Some(ref d) = registration_date {
        registry_obj.dates.push(split_object_date(&sd_oid, 15, "Created", d));
    }
    data_objects.push(registry_obj);

    for output in &st.outputs.items {
        let Some(url) = non_empty(&output.url) else { continue };
        let (class_id, class_label, type_id, type_label) = output_types(&output.output_type);
        let created = non_empty(&output.date_created).and_then(dates::parse_iso_date);

        let object_display_title =
            uniquify_title(format!("{name_base} :: {type_label}"), &mut used_titles);
        let sd_oid = hash::object_hash(sid, &object_display_title);
        let (resource_type_id, resource_type) = resource_type_for(url);

        let mut output_obj = DataObject {
            sd_oid: sd_oid.clone(),
            sd_sid: sid.to_string(),
            display_title: object_display_title.clone(),
            publication_year: created.as_ref().map(|d| d.year),
            object_class_id: class_id,
            object_class: class_label.to_string(),
            object_type_id: type_id,
            object_type: type_label.clone(),
            managing_org_id: Some(org::ISRCTN),
            managing_org: Some("ISRCTN".to_string()),
            access_type_id: Some(11),
            access_type: Some("Public download".to_string()),
            datetime_of_data_fetch: fetched,
            titles: vec![ObjectTitle::new(
                &sd_oid, &object_display_title, 22, "Study short name :: object type", true)],
            instances: vec![ObjectInstance::new(
                &sd_oid, Some(org::ISRCTN), Some("ISRCTN"), url,
                resource_type_id, resource_type)],
            ..Default::default()
        };
        if let Some(ref d) = created {
            output_obj.dates.push(split_object_date(&sd_oid, 15, "Created", d));
        }
        data_objects.push(output_obj);
    }

    s.identifiers = identifiers;
    s.titles = titles;
    s.features = features;
    s.topics = topics;
    s.contributors = contributors;
    s.data_objects = data_objects;

    Some(s)
}

fn split_object_date(sd_oid: &str, type_id: i32, type_label: &str, d: &SplitDate) -> ObjectDate {
    ObjectDate {
        sd_oid: sd_oid.to_string(),
        date_type_id: type_id,
        date_type: type_label.to_string(),
        start_year: Some(d.year),
        start_month: d.month,
        start_day: d.day,
        date_as_string: Some(d.date_string.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_record() -> IsrctnRecord {
        IsrctnRecord {
            isrctn_id: "ISRCTN11262717".to_string(),
            public_title: Some("Does drug X improve outcomes in condition Y?".to_string()),
            scientific_title: Some(
                "A pragmatic randomised trial of drug X in condition Y".to_string()),
            trial_status: Some("Completed".to_string()),
            trial_type: Some("Interventional".to_string()),
            date_assigned: Some("2011-03-15".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_record_xml() {
        let xml = r#"<IsrctnRecord>
            <isrctn_id>ISRCTN11262717</isrctn_id>
            <public_title>A trial</public_title>
            <contacts>
                <Contact><contact_type>Scientific</contact_type>
                    <forename>Ada</forename><surname>Lovelace</surname></Contact>
            </contacts>
            <conditions><Condition>Asthma</Condition></conditions>
            <outputs>
                <Output><output_type>Protocol file</output_type>
                    <url>https://www.isrctn.com/editorial/retrieveFile/1.pdf</url>
                    <date_created>2018-01-10</date_created></Output>
            </outputs>
        </IsrctnRecord>"#;
        let rec = parse(xml).unwrap();
        assert_eq!(rec.isrctn_id, "ISRCTN11262717");
        assert_eq!(rec.contacts.items[0].surname.as_deref(), Some("Lovelace"));
        assert_eq!(rec.outputs.items[0].output_type, "Protocol file");
    }

    #[test]
    fn test_registry_identifier_carries_assignment_date() {
        let s = process(&base_record(), None).unwrap();
        assert_eq!(s.identifiers[0].identifier_org_id, Some(org::ISRCTN));
        assert_eq!(s.identifiers[0].identifier_date.as_deref(), Some("2011 Mar 15"));
    }

    #[test]
    fn test_default_title_is_public() {
        let s = process(&base_record(), None).unwrap();
        let defaults: Vec<_> = s.titles.iter().filter(|t| t.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].title_type_id, 15);
    }

    #[test]
    fn test_registry_page_url_built_from_id() {
        let s = process(&base_record(), None).unwrap();
        assert_eq!(
            s.data_objects[0].instances[0].url.as_deref(),
            Some("https://www.isrctn.com/ISRCTN11262717")
        );
    }

    #[test]
    fn test_output_type_table() {
        let mut rec = base_record();
        rec.outputs.items = vec![
            IsrctnOutput {
                output_type: "Protocol file".to_string(),
                url: Some("https://www.isrctn.com/file/protocol.pdf".to_string()),
                date_created: Some("2017-06-01".to_string()),
            },
            IsrctnOutput {
                output_type: "Basic results".to_string(),
                url: Some("https://www.isrctn.com/file/results".to_string()),
                date_created: None,
            },
            IsrctnOutput {
                output_type: "Participant information sheet".to_string(),
                url: Some("https://www.isrctn.com/file/pis.pdf".to_string()),
                date_created: None,
            },
        ];
        let s = process(&rec, None).unwrap();
        assert_eq!(s.data_objects.len(), 4);
        assert_eq!(s.data_objects[1].object_type_id, 11);
        assert_eq!(s.data_objects[1].publication_year, Some(2017));
        assert_eq!(s.data_objects[1].instances[0].resource_type_id, Some(11));
        assert_eq!(s.data_objects[2].object_type_id, 28);
        assert_eq!(s.data_objects[2].instances[0].resource_type_id, Some(35));
        assert_eq!(s.data_objects[3].object_type_id, 19);
    }

    #[test]
    fn test_duplicate_output_titles_suffixed() {
        let mut rec = base_record();
        rec.outputs.items = vec![
            IsrctnOutput {
                output_type: "Protocol file".to_string(),
                url: Some("https://www.isrctn.com/file/protocol_v1.pdf".to_string()),
                date_created: None,
            },
            IsrctnOutput {
                output_type: "Protocol file".to_string(),
                url: Some("https://www.isrctn.com/file/protocol_v2.pdf".to_string()),
                date_created: None,
            },
        ];
        let s = process(&rec, None).unwrap();
        assert!(s.data_objects[1].display_title.ends_with(":: Study Protocol"));
        assert!(s.data_objects[2].display_title.ends_with(":: Study Protocol_1"));
        assert_ne!(s.data_objects[1].sd_oid, s.data_objects[2].sd_oid);
    }

    #[test]
    fn test_target_enrolment_sentinel() {
        let mut rec = base_record();
        rec.target_enrolment = Some("9999".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.study_enrolment, None);

        rec.target_enrolment = Some("350".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.study_enrolment, Some(350));
    }

    #[test]
    fn test_contacts_routed_by_type() {
        let mut rec = base_record();
        rec.contacts.items = vec![
            IsrctnContact {
                contact_type: Some("Scientific".to_string()),
                forename: Some("Ada".to_string()),
                surname: Some("Lovelace".to_string()),
                affiliation: Some("Analytical Engines Institute".to_string()),
            },
            IsrctnContact {
                contact_type: Some("Public".to_string()),
                forename: Some("Charles".to_string()),
                surname: Some("Babbage".to_string()),
                affiliation: None,
            },
        ];
        let s = process(&rec, None).unwrap();
        assert_eq!(s.contributors[0].contrib_type_id, 51);
        assert_eq!(s.contributors[1].contrib_type_id, 56);
    }
}
