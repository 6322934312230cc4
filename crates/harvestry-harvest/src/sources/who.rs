//! WHO ICTRP study processor.
//!
//! The ICTRP dump aggregates records from the national registries; each
//! intermediate file is one pre-flattened `WHORecord` XML document carrying
//! the originating registry id. Vocabulary is noisier than the primary
//! registries — several fields arrive with "Other ..." or "?? Unable to
//! classify ..." markers left by the download stage and are recovered here.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use harvestry_common::error::Result;
use harvestry_common::model::{
    DataObject, ObjectDate, ObjectInstance, ObjectTitle, Study, StudyContributor, StudyFeature,
    StudyIdentifier, StudyTitle, StudyTopic,
};
use harvestry_common::vocab::{self, org};

use crate::helpers::dates::{self, SplitDate};
use crate::helpers::{hash, html, orgs};

use super::xml_err;

lazy_static! {
    static ref URL_RE: Regex = Regex::new(
        r"(http|https)://[\w-]+(\.[\w-]+)+([\w\.,@\?\^=%&:/~\+#-]*[\w@\?\^=%&/~\+#-])?"
    ).unwrap();
    static ref FIRST_NUMBER_RE: Regex = Regex::new(r"\d+").unwrap();
    static ref DATE_SHAPE_RE: Regex = Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();
    static ref YEARS_UNIT_RE: Regex = Regex::new(r"\d+y").unwrap();
    static ref MONTHS_UNIT_RE: Regex = Regex::new(r"\d+m").unwrap();
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename = "WHORecord")]
pub struct WhoRecord {
    pub sd_sid: String,
    pub source_id: i32,
    pub record_date: Option<String>,
    pub date_registration: Option<String>,
    pub public_title: Option<String>,
    pub scientific_title: Option<String>,
    pub remote_url: Option<String>,
    pub date_enrollement: Option<String>,
    pub study_type: Option<String>,
    pub study_status: Option<String>,
    pub interventions: Option<String>,
    pub primary_outcome: Option<String>,
    pub design_string: Option<String>,
    pub ipd_description: Option<String>,
    pub results_actual_enrollment: Option<String>,
    pub target_size: Option<String>,
    pub agemin: Option<String>,
    pub agemin_units: Option<String>,
    pub agemax: Option<String>,
    pub agemax_units: Option<String>,
    pub gender: Option<String>,
    pub primary_sponsor: Option<String>,
    pub scientific_contact_givenname: Option<String>,
    pub scientific_contact_familyname: Option<String>,
    pub scientific_contact_affiliation: Option<String>,
    pub public_contact_givenname: Option<String>,
    pub public_contact_familyname: Option<String>,
    pub public_contact_affiliation: Option<String>,
    pub results_url_link: Option<String>,
    pub results_date_posted: Option<String>,
    pub results_url_protocol: Option<String>,
    pub study_features: WhoFeatures,
    pub secondary_ids: WhoSecondaryIds,
    pub condition_list: WhoConditions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WhoFeatures {
    #[serde(rename = "StudyFeature")]
    pub items: Vec<WhoFeature>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WhoFeature {
    pub ftype_id: i32,
    pub ftype: String,
    pub fvalue_id: i32,
    pub fvalue: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WhoSecondaryIds {
    #[serde(rename = "SecondaryId")]
    pub items: Vec<WhoSecondaryId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WhoSecondaryId {
    pub processed_id: String,
    pub sec_id_source: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WhoConditions {
    #[serde(rename = "StudyCondition")]
    pub items: Vec<WhoCondition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WhoCondition {
    pub condition: String,
    pub code: Option<String>,
    pub code_system: Option<String>,
}

pub fn parse(raw: &str) -> Result<WhoRecord> {
    quick_xml::de::from_str(raw).map_err(xml_err)
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Sentence-ify a composed description fragment: ensure the given prefix and
/// a sentence terminator.
fn composed_fragment(raw: &str, lead_word: &str, prefix: &str) -> String {
    let mut fragment = raw.trim().to_string();
    if !fragment.to_lowercase().starts_with(lead_word) {
        fragment = format!("{prefix}{fragment}");
    }
    if !fragment.ends_with('.') && !fragment.ends_with(';') && !fragment.ends_with('?') {
        fragment.push('.');
    }
    fragment
}

/// Enrolment figures arrive as free text with dummy values and the odd
/// mis-entered date; both are rejected, as are implausible magnitudes.
fn parse_enrolment(raw: &str) -> Option<i32> {
    if raw.contains("9999") || DATE_SHAPE_RE.is_match(raw) {
        return None;
    }
    let numeric: i32 = FIRST_NUMBER_RE.find(raw)?.as_str().parse().ok()?;
    (numeric > 0 && numeric < 10000).then_some(numeric)
}

/// Recover an age unit the download stage could not classify, from raw
/// forms like "15y" / "180m".
fn recover_age_units(raw_units: &str) -> Option<(i32, &'static str)> {
    let lower = raw_units.to_lowercase();
    if YEARS_UNIT_RE.is_match(&lower) {
        Some((17, "Years"))
    } else if MONTHS_UNIT_RE.is_match(&lower) {
        Some((16, "Months"))
    } else {
        None
    }
}

pub fn process(st: &WhoRecord, fetched: Option<DateTime<Utc>>) -> Option<Study> {
    let sid = st.sd_sid.trim();
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

    let registration_date = non_empty(&st.date_registration).and_then(dates::parse_iso_date);

    let source_name = vocab::who_registry_name(st.source_id);
    let mut registry_id = StudyIdentifier::new(
        sid, sid, 11, "Trial Registry ID", Some(st.source_id), Some(source_name));
    registry_id.identifier_date = registration_date.as_ref().map(|d| d.date_string.clone());
    identifiers.push(registry_id);

    // ── Titles ────────────────────────────────────────────────────────────

    let public_title = non_empty(&st.public_title).map(|t| html::normalise_markup(t).0);
    let scientific_title = non_empty(&st.scientific_title).map(|t| html::normalise_markup(t).0);

    match (&public_title, &scientific_title) {
        (Some(public), scientific) => {
            titles.push(StudyTitle::new(sid, public, 15, "Public Title", true));
            s.display_title = Some(public.clone());
            if let Some(scientific) = scientific {
                if !scientific.eq_ignore_ascii_case(public) {
                    titles.push(StudyTitle::new(
                        sid, scientific, 16, "Trial registry title", false));
                }
            }
        }
        (None, Some(scientific)) => {
            titles.push(StudyTitle::new(sid, scientific, 16, "Trial registry title", true));
            s.display_title = Some(scientific.clone());
        }
        (None, None) => {
            s.display_title = Some("No public or scientific title provided".to_string());
        }
    }
    s.title_lang_code = Some("en".to_string());

    // ── Composed description and sharing statement ────────────────────────

    let mut description_parts: Vec<String> = Vec::new();
    if let Some(interventions) = non_empty(&st.interventions) {
        description_parts.push(composed_fragment(interventions, "intervention", "Interventions: "));
    }
    if let Some(outcome) = non_empty(&st.primary_outcome) {
        description_parts.push(composed_fragment(outcome, "primary", "Primary outcome(s): "));
    }
    if let Some(design) = non_empty(&st.design_string) {
        if !design.to_lowercase().contains("not selected") {
            description_parts.push(composed_fragment(design, "study design", "Study Design: "));
        }
    }
    if !description_parts.is_empty() {
        let (desc, had_markup) = html::normalise_markup(&description_parts.join(" "));
        s.brief_description = Some(desc);
        s.bd_contains_html = had_markup;
    }

    if let Some(ipd) = non_empty(&st.ipd_description) {
        let lower = ipd.to_lowercase();
        let usable = ipd.len() > 10
            && lower != "not available"
            && lower != "not avavilable"   // recurring typo in the source data
            && lower != "not applicable"
            && !lower.contains("justification or reason for");
        if usable {
            let (stmt, had_markup) = html::normalise_markup(ipd);
            s.data_sharing_statement = Some(stmt);
            s.dss_contains_html = had_markup;
        }
    }

    // enrolment start; years before 1960 are data-entry noise
    if let Some(enrolment_date) = non_empty(&st.date_enrollement).and_then(dates::parse_iso_date) {
        if enrolment_date.year > 1960 {
            s.study_start_year = Some(enrolment_date.year);
            s.study_start_month = enrolment_date.month;
        }
    }

    // ── Type, status, enrolment, eligibility ──────────────────────────────

    if let Some(study_type) = non_empty(&st.study_type) {
        if study_type.starts_with("Other") {
            s.study_type_id = Some(16);
            s.study_type = Some("Other".to_string());
        } else {
            s.study_type_id = Some(vocab::study_type_id(study_type));
            s.study_type = Some(study_type.to_string());
        }
    }
    if let Some(status) = non_empty(&st.study_status) {
        if status.starts_with("Other") {
            s.study_status_id = Some(24);
            s.study_status = Some("Other".to_string());
        } else {
            s.study_status_id = Some(vocab::study_status_id(status));
            s.study_status = Some(status.to_string());
        }
    }

    // actual enrolment preferred over the recruitment target
    s.study_enrolment = non_empty(&st.results_actual_enrollment)
        .and_then(parse_enrolment)
        .or_else(|| non_empty(&st.target_size).and_then(parse_enrolment));

    if let Some(min) = non_empty(&st.agemin).and_then(|v| v.parse::<i32>().ok()) {
        s.min_age = Some(min);
        if let Some(units) = non_empty(&st.agemin_units) {
            if units.starts_with("Other") {
                if let Some((unit_id, unit)) = recover_age_units(units) {
                    s.min_age_units_id = Some(unit_id);
                    s.min_age_units = Some(unit.to_string());
                }
            } else {
                s.min_age_units_id = Some(vocab::time_units_id(units));
                s.min_age_units = Some(units.to_string());
            }
        }
    }
    if let Some(max) = non_empty(&st.agemax).and_then(|v| v.parse::<i32>().ok()) {
        if max != 0 {
            s.max_age = Some(max);
            if let Some(units) = non_empty(&st.agemax_units) {
                if units.starts_with("Other") {
                    if let Some((unit_id, unit)) = recover_age_units(units) {
                        s.max_age_units_id = Some(unit_id);
                        s.max_age_units = Some(unit.to_string());
                    }
                } else {
                    s.max_age_units_id = Some(vocab::time_units_id(units));
                    s.max_age_units = Some(units.to_string());
                }
            }
        }
    }

    if let Some(gender) = non_empty(&st.gender) {
        if gender.starts_with("??") {
            // the download stage could not classify; recover from the raw text
            // (the marker appears with a recurring typo as well)
            let raw = gender
                .to_lowercase()
                .replace("?? unable to classify", "")
                .replace("?? unavle to classify", "")
                .trim()
                .to_string();
            let (id, label) = if raw.contains('f') {
                (905, "Female")
            } else if raw.contains('m') {
                (910, "Male")
            } else {
                vocab::GENDER_NOT_PROVIDED
            };
            s.study_gender_elig_id = Some(id);
            s.study_gender_elig = Some(label.to_string());
        } else {
            s.study_gender_elig_id = Some(vocab::gender_elig_id(gender));
            s.study_gender_elig = Some(gender.to_string());
        }
    }

    // ── Contributors ──────────────────────────────────────────────────────

    let mut sponsor_name: Option<String> = None;
    if let Some(sponsor) = non_empty(&st.primary_sponsor) {
        if !orgs::is_null_org_name(sponsor) {
            let name = orgs::tidy_org_name(sponsor, sid);
            if orgs::is_individual(&name) {
                contributors.push(StudyContributor::person(
                    sid, 54, "Trial Sponsor", &name, None));
            } else {
                contributors.push(StudyContributor::organisation(
                    sid, 54, "Trial Sponsor", None, &name));
            }
            sponsor_name = Some(name);
        }
    }

    let study_lead = {
        let given = non_empty(&st.scientific_contact_givenname).unwrap_or("");
        let family = non_empty(&st.scientific_contact_familyname).unwrap_or("");
        let full_name = format!("{given} {family}").trim().to_string();
        if !full_name.is_empty() {
            contributors.push(StudyContributor::person(
                sid, 51, "Study Lead", &full_name,
                non_empty(&st.scientific_contact_affiliation)));
        }
        full_name
    };

    let public_given = non_empty(&st.public_contact_givenname).unwrap_or("");
    let public_family = non_empty(&st.public_contact_familyname).unwrap_or("");
    let public_name = format!("{public_given} {public_family}").trim().to_string();
    if !public_name.is_empty() && public_name != study_lead {
        contributors.push(StudyContributor::person(
            sid, 56, "Public Contact", &public_name,
            non_empty(&st.public_contact_affiliation)));
    }

    // ── Features, secondary ids, conditions ───────────────────────────────

    for f in &st.study_features.items {
        features.push(StudyFeature::new(sid, f.ftype_id, &f.ftype, f.fvalue_id, &f.fvalue));
    }

    for id in &st.secondary_ids.items {
        let value = id.processed_id.trim();
        if value.is_empty() {
            continue;
        }
        match id.sec_id_source {
            None => identifiers.push(StudyIdentifier::new(
                sid, value, 14, "Sponsor's ID", None, sponsor_name.as_deref())),
            Some(source) if source == org::ANVISA => identifiers.push(StudyIdentifier::new(
                sid, value, 41, "Regulatory Body ID", Some(source), Some("Anvisa (Brazil)"))),
            Some(source) if source == org::CEP_BRAZIL => identifiers.push(StudyIdentifier::new(
                sid, value, 12, "Ethics Review ID", Some(source),
                Some("Comitê de Ética em Pesquisa (local) (Brazil)"))),
            Some(source) => identifiers.push(StudyIdentifier::new(
                sid, value, 11, "Trial Registry ID", Some(source),
                Some(vocab::who_registry_name(source)))),
        }
    }

    for condition in &st.condition_list.items {
        let value = condition.condition.trim();
        if value.is_empty() {
            continue;
        }
        match (&condition.code, &condition.code_system) {
            (Some(code), Some(system)) if system == "ICD 10" => {
                topics.push(StudyTopic::coded(
                    sid, 13, "condition", value, Some(12), system, code));
            }
            _ => topics.push(StudyTopic::new(sid, 13, "condition", value)),
        }
    }

    // ── Data objects ──────────────────────────────────────────────────────

    let name_base = s.display_title.clone().unwrap_or_else(|| sid.to_string());
    let pub_year = registration_date.as_ref().map(|d| d.year);

    // the registry entry web page
    let object_display_title = format!("{name_base} :: Registry web page");
    let sd_oid = hash::object_hash(sid, &object_display_title);
    let mut registry_obj = DataObject {
        sd_oid: sd_oid.clone(),
        sd_sid: sid.to_string(),
        display_title: object_display_title.clone(),
        publication_year: pub_year,
        object_class_id: 23,
        object_class: "Text".to_string(),
        object_type_id: 13,
        object_type: "Trial Registry entry".to_string(),
        managing_org_id: Some(st.source_id),
        managing_org: Some(source_name.to_string()),
        access_type_id: Some(12),
        access_type: Some("Public on-screen access".to_string()),
        datetime_of_data_fetch: fetched,
        titles: vec![ObjectTitle::new(
            &sd_oid, &object_display_title, 22, "Study short name :: object type", true)],
        ..Default::default()
    };
    if let Some(url) = non_empty(&st.remote_url) {
        registry_obj.instances.push(ObjectInstance::new(
            &sd_oid, Some(st.source_id), Some(source_name), url, 35, "Web text"));
    }
    if let Some(ref d) = registration_date {
        registry_obj.dates.push(split_object_date(&sd_oid, 15, "Created", d));
    }
    if let Some(d) = non_empty(&st.record_date).and_then(dates::parse_iso_date) {
        registry_obj.dates.push(split_object_date(&sd_oid, 18, "Updated", &d));
    }
    data_objects.push(registry_obj);

    // a results summary link is present for a minority of records
    if let Some(link) = non_empty(&st.results_url_link) {
        if link.contains("http") {
            if let Some(url) = URL_RE.find(link).map(|m| m.as_str()) {
                let results_date =
                    non_empty(&st.results_date_posted).and_then(dates::parse_iso_date);
                let object_display_title = format!("{name_base} :: Results summary");
                let sd_oid = hash::object_hash(sid, &object_display_title);
                let mut results_obj = DataObject {
                    sd_oid: sd_oid.clone(),
                    sd_sid: sid.to_string(),
                    display_title: object_display_title.clone(),
                    publication_year: results_date.as_ref().map(|d| d.year),
                    object_class_id: 23,
                    object_class: "Text".to_string(),
                    object_type_id: 28,
                    object_type: "Trial registry results summary".to_string(),
                    managing_org_id: Some(st.source_id),
                    managing_org: Some(source_name.to_string()),
                    access_type_id: Some(12),
                    access_type: Some("Public on-screen access".to_string()),
                    datetime_of_data_fetch: fetched,
                    titles: vec![ObjectTitle::new(
                        &sd_oid, &object_display_title, 22,
                        "Study short name :: object type", true)],
                    instances: vec![ObjectInstance::new(
                        &sd_oid, Some(st.source_id), Some(source_name), url, 35, "Web text")],
                    ..Default::default()
                };
                if let Some(ref d) = results_date {
                    results_obj.dates.push(split_object_date(&sd_oid, 15, "Created", d));
                }
                data_objects.push(results_obj);
            }
        }
    }

    // likewise an occasional protocol download
    if let Some(link) = non_empty(&st.results_url_protocol) {
        if link.contains("http") {
            if let Some(url) = URL_RE.find(link).map(|m| m.as_str()) {
                let object_display_title = format!("{name_base} :: Study Protocol");
                let sd_oid = hash::object_hash(sid, &object_display_title);
                data_objects.push(DataObject {
                    sd_oid: sd_oid.clone(),
                    sd_sid: sid.to_string(),
                    display_title: object_display_title.clone(),
                    publication_year: pub_year,
                    object_class_id: 23,
                    object_class: "Text".to_string(),
                    object_type_id: 11,
                    object_type: "Study Protocol".to_string(),
                    access_type_id: Some(11),
                    access_type: Some("Public download".to_string()),
                    datetime_of_data_fetch: fetched,
                    titles: vec![ObjectTitle::new(
                        &sd_oid, &object_display_title, 22,
                        "Study short name :: object type", true)],
                    instances: vec![ObjectInstance::new(
                        &sd_oid, Some(st.source_id), Some(source_name), url, 11, "PDF")],
                    ..Default::default()
                });
            }
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

    fn base_record() -> WhoRecord {
        WhoRecord {
            sd_sid: "ACTRN12609000373268".to_string(),
            source_id: 100116,
            public_title: Some("A trial of thing one versus thing two".to_string()),
            scientific_title: Some("A randomised trial of thing one versus thing two".to_string()),
            date_registration: Some("2009-05-12".to_string()),
            remote_url: Some("https://anzctr.org.au/Trial/Registration/TrialReview.aspx?id=83632".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_record_xml() {
        let xml = r#"<WHORecord>
            <sd_sid>ChiCTR-IOR-17012345</sd_sid>
            <source_id>100118</source_id>
            <public_title>A study of something</public_title>
            <secondary_ids>
                <SecondaryId><processed_id>XYZ-01</processed_id></SecondaryId>
            </secondary_ids>
            <condition_list>
                <StudyCondition><condition>Asthma</condition></StudyCondition>
                <StudyCondition>
                    <condition>Asthma</condition><code>J45</code><code_system>ICD 10</code_system>
                </StudyCondition>
            </condition_list>
        </WHORecord>"#;
        let rec = parse(xml).unwrap();
        assert_eq!(rec.sd_sid, "ChiCTR-IOR-17012345");
        assert_eq!(rec.source_id, 100118);
        assert_eq!(rec.secondary_ids.items.len(), 1);
        assert_eq!(rec.condition_list.items.len(), 2);
        assert_eq!(rec.condition_list.items[1].code.as_deref(), Some("J45"));
    }

    #[test]
    fn test_registry_identifier_and_page_object() {
        let s = process(&base_record(), None).unwrap();
        assert_eq!(s.identifiers.len(), 1);
        assert_eq!(s.identifiers[0].identifier_org_id, Some(100116));
        assert_eq!(
            s.identifiers[0].identifier_org.as_deref(),
            Some("Australian New Zealand Clinical Trials Registry")
        );
        assert_eq!(s.data_objects.len(), 1);
        let obj = &s.data_objects[0];
        assert!(obj.display_title.ends_with(":: Registry web page"));
        assert_eq!(obj.publication_year, Some(2009));
        assert_eq!(obj.dates[0].date_type_id, 15);
    }

    #[test]
    fn test_public_title_wins_default() {
        let s = process(&base_record(), None).unwrap();
        let defaults: Vec<_> = s.titles.iter().filter(|t| t.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].title_type_id, 15);
        assert_eq!(s.titles.len(), 2);
    }

    #[test]
    fn test_missing_titles_placeholder() {
        let mut rec = base_record();
        rec.public_title = None;
        rec.scientific_title = None;
        let s = process(&rec, None).unwrap();
        assert_eq!(
            s.display_title.as_deref(),
            Some("No public or scientific title provided")
        );
        assert!(s.titles.is_empty());
    }

    #[test]
    fn test_enrolment_sentinels_rejected() {
        let mut rec = base_record();
        rec.results_actual_enrollment = Some("9999".to_string());
        rec.target_size = Some("2014-06-01".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.study_enrolment, None);
    }

    #[test]
    fn test_actual_enrolment_preferred_over_target() {
        let mut rec = base_record();
        rec.results_actual_enrollment = Some("150 participants".to_string());
        rec.target_size = Some("200".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.study_enrolment, Some(150));
    }

    #[test]
    fn test_target_used_when_actual_unusable() {
        let mut rec = base_record();
        rec.results_actual_enrollment = Some("99990".to_string());
        rec.target_size = Some("200".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.study_enrolment, Some(200));
    }

    #[test]
    fn test_pre_1960_start_year_discarded() {
        let mut rec = base_record();
        rec.date_enrollement = Some("1900-01-01".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.study_start_year, None);
    }

    #[test]
    fn test_other_age_units_recovered() {
        let mut rec = base_record();
        rec.agemin = Some("15".to_string());
        rec.agemin_units = Some("Other (15y)".to_string());
        rec.agemax = Some("180".to_string());
        rec.agemax_units = Some("Other (180m)".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.min_age_units.as_deref(), Some("Years"));
        assert_eq!(s.min_age_units_id, Some(17));
        assert_eq!(s.max_age_units.as_deref(), Some("Months"));
        assert_eq!(s.max_age_units_id, Some(16));
    }

    #[test]
    fn test_unclassified_gender_recovered() {
        let mut rec = base_record();
        rec.gender = Some("?? Unable to classify F".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.study_gender_elig.as_deref(), Some("Female"));
        assert_eq!(s.study_gender_elig_id, Some(905));
    }

    #[test]
    fn test_sponsor_honorific_routes_to_person() {
        let mut rec = base_record();
        rec.primary_sponsor = Some("Prof. Erik Andersson".to_string());
        let s = process(&rec, None).unwrap();
        assert!(s.contributors[0].is_individual);
        assert_eq!(s.contributors[0].contrib_type_id, 54);
    }

    #[test]
    fn test_public_contact_deduplicated_against_lead() {
        let mut rec = base_record();
        rec.scientific_contact_givenname = Some("Mina".to_string());
        rec.scientific_contact_familyname = Some("Harker".to_string());
        rec.public_contact_givenname = Some("Mina".to_string());
        rec.public_contact_familyname = Some("Harker".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.contributors.len(), 1);
        assert_eq!(s.contributors[0].contrib_type_id, 51);
    }

    #[test]
    fn test_ipd_description_filters() {
        let mut rec = base_record();
        rec.ipd_description = Some("Not available".to_string());
        let s = process(&rec, None).unwrap();
        assert!(s.data_sharing_statement.is_none());

        rec.ipd_description =
            Some("De-identified IPD will be shared on reasonable request.".to_string());
        let s = process(&rec, None).unwrap();
        assert!(s.data_sharing_statement.is_some());
    }

    #[test]
    fn test_results_url_extracted_into_object() {
        let mut rec = base_record();
        rec.results_url_link =
            Some("see https://example.org/results/83632.pdf for details".to_string());
        rec.results_date_posted = Some("2015-10-01".to_string());
        let s = process(&rec, None).unwrap();
        let results = s.data_objects.iter().find(|o| o.object_type_id == 28).unwrap();
        assert_eq!(
            results.instances[0].url.as_deref(),
            Some("https://example.org/results/83632.pdf")
        );
        assert_eq!(results.publication_year, Some(2015));
    }

    #[test]
    fn test_composed_description() {
        let mut rec = base_record();
        rec.interventions = Some("drug A versus placebo".to_string());
        rec.primary_outcome = Some("Primary outcome: survival at 5 years".to_string());
        rec.design_string = Some("Randomised, double-blind".to_string());
        let s = process(&rec, None).unwrap();
        let desc = s.brief_description.unwrap();
        assert!(desc.starts_with("Interventions: drug A versus placebo."));
        assert!(desc.contains("Primary outcome: survival at 5 years."));
        assert!(desc.contains("Study Design: Randomised, double-blind."));
    }
}
