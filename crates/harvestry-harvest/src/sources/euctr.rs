//! EU Clinical Trials Register study processor.
//!
//! One `EuctrRecord` XML document per trial, flattened from the member-state
//! protocol pages by the download stage: design features pre-coded, IMPs
//! listed with product and trade names, population flags summarised. The
//! EudraCT number is the study key; the sponsor's protocol code is the usual
//! secondary identifier.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use harvestry_common::error::Result;
use harvestry_common::model::{
    DataObject, ObjectDate, ObjectInstance, ObjectTitle, Study, StudyContributor, StudyFeature,
    StudyIdentifier, StudyTitle, StudyTopic,
};
use harvestry_common::vocab::{self, org};

use crate::helpers::{dates, hash, html, orgs};
use crate::reconcile;

use super::xml_err;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename = "EuctrRecord")]
pub struct EuctrRecord {
    pub eudract_id: String,
    pub sponsor_protocol_id: Option<String>,
    pub sponsor_name: Option<String>,
    pub member_state: Option<String>,
    pub start_date: Option<String>,
    pub trial_status: Option<String>,
    pub public_title: Option<String>,
    pub scientific_title: Option<String>,
    pub acronym: Option<String>,
    pub medical_condition: Option<String>,
    pub population_age: Option<String>,
    pub gender: Option<String>,
    pub details_url: Option<String>,
    pub results_url: Option<String>,
    pub features: EuctrFeatures,
    pub imps: EuctrImps,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EuctrFeatures {
    #[serde(rename = "Feature")]
    pub items: Vec<EuctrFeature>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EuctrFeature {
    pub ftype_id: i32,
    pub ftype: String,
    pub fvalue_id: i32,
    pub fvalue: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EuctrImps {
    #[serde(rename = "Imp")]
    pub items: Vec<EuctrImp>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EuctrImp {
    pub product_name: Option<String>,
    pub trade_name: Option<String>,
}

pub fn parse(raw: &str) -> Result<EuctrRecord> {
    quick_xml::de::from_str(raw).map_err(xml_err)
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// The register publishes the "Female: yes/no Male: yes/no" flags verbatim.
fn map_gender(raw: &str) -> (i32, &'static str) {
    let lower = raw.to_lowercase();
    let female = lower.contains("female: yes");
    let male = lower.replace("female: yes", "").contains("male: yes");
    match (female, male) {
        (true, true)  => (900, "Both"),
        (true, false) => (905, "Female"),
        (false, true) => (910, "Male"),
        _             => vocab::GENDER_NOT_PROVIDED,
    }
}

pub fn process(st: &EuctrRecord, fetched: Option<DateTime<Utc>>) -> Option<Study> {
    let sid = st.eudract_id.trim();
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

    identifiers.push(StudyIdentifier::new(
        sid, sid, 11, "Trial Registry ID",
        Some(org::EU_CTR), Some("EU Clinical Trials Register")));

    let sponsor_name = non_empty(&st.sponsor_name)
        .filter(|sp| !orgs::is_null_org_name(sp))
        .map(|sp| orgs::tidy_org_name(sp, sid));

    if let Some(protocol_code) = non_empty(&st.sponsor_protocol_id) {
        identifiers.push(StudyIdentifier::new(
            sid, protocol_code, 14, "Sponsor's ID", None, sponsor_name.as_deref()));
    }

    // ── Titles ────────────────────────────────────────────────────────────

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

    // all EUCTR studies are interventional drug trials
    s.study_type_id = Some(11);
    s.study_type = Some("Interventional".to_string());

    if let Some(status) = non_empty(&st.trial_status) {
        s.study_status_id = Some(vocab::study_status_id(status));
        s.study_status = Some(status.to_string());
    }

    if let Some(start) = non_empty(&st.start_date).and_then(dates::parse_iso_date) {
        if start.year > 1960 {
            s.study_start_year = Some(start.year);
            s.study_start_month = start.month;
        }
    }

    if let Some(gender) = non_empty(&st.gender) {
        let (id, label) = map_gender(gender);
        s.study_gender_elig_id = Some(id);
        s.study_gender_elig = Some(label.to_string());
    }

    // ── Contributors, features, topics ────────────────────────────────────

    if let Some(ref name) = sponsor_name {
        if orgs::is_individual(name) {
            contributors.push(StudyContributor::person(sid, 54, "Trial Sponsor", name, None));
        } else {
            contributors.push(StudyContributor::organisation(sid, 54, "Trial Sponsor", None, name));
        }
    }

    for f in &st.features.items {
        features.push(StudyFeature::new(sid, f.ftype_id, &f.ftype, f.fvalue_id, &f.fvalue));
    }

    if let Some(condition) = non_empty(&st.medical_condition) {
        topics.push(StudyTopic::new(sid, 13, "condition", condition));
    }
    for imp in &st.imps.items {
        if let Some(product) = non_empty(&imp.product_name) {
            if reconcile::topic_is_new(&topics, product) {
                let mut topic = StudyTopic::new(sid, 12, "chemical / agent", product);
                topic.comments = Some("product name".to_string());
                topics.push(topic);
            }
        }
        if let Some(trade) = non_empty(&imp.trade_name) {
            if reconcile::topic_is_new(&topics, trade) {
                let mut topic = StudyTopic::new(sid, 12, "chemical / agent", trade);
                topic.comments = Some("trade name".to_string());
                topics.push(topic);
            }
        }
    }

    // ── Data objects ──────────────────────────────────────────────────────

    let name_base = s.display_title.clone().unwrap_or_else(|| sid.to_string());
    let member_state = non_empty(&st.member_state).unwrap_or("GB");

    let object_display_title = format!("{name_base} :: Registry web page");
    let sd_oid = hash::object_hash(sid, &object_display_title);
    let url = non_empty(&st.details_url)
        .map(str::to_string)
        .unwrap_or_else(|| format!(
            "https://www.clinicaltrialsregister.eu/ctr-search/trial/{sid}/{member_state}"));
    let mut registry_obj = DataObject {
        sd_oid: sd_oid.clone(),
        sd_sid: sid.to_string(),
        display_title: object_display_title.clone(),
        publication_year: s.study_start_year,
        object_class_id: 23,
        object_class: "Text".to_string(),
        object_type_id: 13,
        object_type: "Trial Registry entry".to_string(),
        managing_org_id: Some(org::EU_CTR),
        managing_org: Some("EU Clinical Trials Register".to_string()),
        access_type_id: Some(12),
        access_type: Some("Public on-screen access".to_string()),
        datetime_of_data_fetch: fetched,
        titles: vec![ObjectTitle::new(
            &sd_oid, &object_display_title, 22, "Study short name :: object type", true)],
        instances: vec![ObjectInstance::new(
            &sd_oid, Some(org::EU_CTR), Some("EU Clinical Trials Register"),
            &url, 35, "Web text")],
        ..Default::default()
    };
    if let Some(start) = non_empty(&st.start_date).and_then(dates::parse_iso_date) {
        registry_obj.dates.push(ObjectDate {
            sd_oid: sd_oid.clone(),
            date_type_id: 15,
            date_type: "Created".to_string(),
            start_year: Some(start.year),
            start_month: start.month,
            start_day: start.day,
            date_as_string: Some(start.date_string.clone()),
        });
    }
    data_objects.push(registry_obj);

    if let Some(results_url) = non_empty(&st.results_url) {
        if results_url.contains("http") {
            let object_display_title = format!("{name_base} :: Results summary");
            let sd_oid = hash::object_hash(sid, &object_display_title);
            data_objects.push(DataObject {
                sd_oid: sd_oid.clone(),
                sd_sid: sid.to_string(),
                display_title: object_display_title.clone(),
                object_class_id: 23,
                object_class: "Text".to_string(),
                object_type_id: 28,
                object_type: "Trial registry results summary".to_string(),
                managing_org_id: Some(org::EU_CTR),
                managing_org: Some("EU Clinical Trials Register".to_string()),
                access_type_id: Some(12),
                access_type: Some("Public on-screen access".to_string()),
                datetime_of_data_fetch: fetched,
                titles: vec![ObjectTitle::new(
                    &sd_oid, &object_display_title, 22,
                    "Study short name :: object type", true)],
                instances: vec![ObjectInstance::new(
                    &sd_oid, Some(org::EU_CTR), Some("EU Clinical Trials Register"),
                    results_url, 35, "Web text")],
                ..Default::default()
            });
        }
    }

    s.identifiers = identifiers;
    s.titles = titles;
    s.features = features;
    s.topics = topics;
    s.contributors = contributors;
    s.data_objects = data_objects;

    Some(s)
}
