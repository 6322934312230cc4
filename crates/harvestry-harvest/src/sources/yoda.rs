//! Yoda study processor.
//!
//! The YODA Project lists industry studies whose participant data can be
//! requested. Each record arrives as one `YodaRecord` XML document; titles,
//! identifiers and supplementary documents were pre-extracted by the
//! download stage. Studies only present on Yoda (not in a registry) carry
//! `is_yoda_only` and keep their sponsor as a contributor here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use harvestry_common::error::Result;
use harvestry_common::model::{
    DataObject, ObjectDataset, ObjectInstance, ObjectTitle, Study, StudyContributor,
    StudyIdentifier, StudyReference, StudyTitle, StudyTopic,
};
use harvestry_common::vocab::org;

use crate::helpers::{hash, html, orgs};
use crate::reconcile;

use super::xml_err;

const ACCESS_DETAILS: &str = "The YODA Project will require that requestors provide basic information about the Principal Investigator, Key Personnel, and the \
    project Research Proposal, including a scientific abstract and research methods. The YODA Project will review proposals to ensure that: \
    1) the scientific purpose is clearly described; 2) the data requested will be used to enhance scientific and/or medical knowledge; and \
    3) the proposed research can be reasonably addressed using the requested data.";

const DEIDENT_DETAILS: &str = "Yoda states that '...researchers will be granted access to participant-level study data that are devoid of \
    personally identifiable information; current best guidelines for de-identification of data will be used.'";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename = "YodaRecord")]
pub struct YodaRecord {
    pub sd_sid: String,
    pub yoda_title: Option<String>,
    pub display_title: Option<String>,
    pub is_yoda_only: Option<bool>,
    pub type_id: Option<i32>,
    pub enrolment: Option<String>,
    pub percent_female: Option<String>,
    pub sponsor_id: Option<i32>,
    pub sponsor: Option<String>,
    pub compound_generic_name: Option<String>,
    pub compound_product_name: Option<String>,
    pub conditions_studied: Option<String>,
    pub primary_citation_link: Option<String>,
    pub remote_url: Option<String>,
    pub study_titles: YodaTitles,
    pub study_identifiers: YodaIdentifiers,
    pub study_references: YodaReferences,
    pub supp_docs: SuppDocs,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct YodaTitles {
    #[serde(rename = "Title")]
    pub items: Vec<YodaTitle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct YodaTitle {
    pub title_text: String,
    pub title_type_id: i32,
    pub title_type: String,
    pub is_default: bool,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct YodaIdentifiers {
    #[serde(rename = "Identifier")]
    pub items: Vec<YodaIdentifier>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct YodaIdentifier {
    pub identifier_value: String,
    pub identifier_type_id: i32,
    pub identifier_type: String,
    pub identifier_org_id: Option<i32>,
    pub identifier_org: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct YodaReferences {
    #[serde(rename = "Reference")]
    pub items: Vec<YodaReference>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct YodaReference {
    pub pmid: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SuppDocs {
    #[serde(rename = "SuppDoc")]
    pub items: Vec<SuppDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SuppDoc {
    pub doc_name: String,
    pub url: Option<String>,
    pub comment: Option<String>,
}

pub fn parse(raw: &str) -> Result<YodaRecord> {
    quick_xml::de::from_str(raw).map_err(xml_err)
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Object class/type for the named supplementary documents Yoda lists.
fn supp_doc_types(doc_name: &str) -> Option<(i32, &'static str, i32, &'static str)> {
    // (class id, class, type id, type)
    match doc_name {
        "Collected Datasets" =>
            Some((14, "Datasets", 80, "Individual Participant Data")),
        "Data Definition Specification" =>
            Some((23, "Text", 31, "Data Dictionary")),
        "Analysis Datasets" =>
            Some((14, "Datasets", 51, "IPD final analysis datasets (full study population)")),
        "CSR Summary" =>
            Some((23, "Text", 79, "CSR Summary")),
        "Annotated Case Report Form" =>
            Some((23, "Text", 30, "Annotated Data Collection Forms")),
        "Statistical Analysis Plan" =>
            Some((23, "Text", 22, "Statistical analysis plan")),
        "Protocol with Amendments" =>
            Some((23, "Text", 11, "Study Protocol")),
        "Clinical Study Report" =>
            Some((23, "Text", 26, "Clinical Study Report")),
        _ => None,
    }
}

/// Simple title-casing for product trade names.
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => lower,
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn process(st: &YodaRecord, fetched: Option<DateTime<Utc>>) -> Option<Study> {
    let sid = st.sd_sid.trim();
    if sid.is_empty() {
        return None;
    }
    let mut s = Study::new(sid, fetched);

    let mut titles: Vec<StudyTitle> = Vec::new();
    let mut identifiers: Vec<StudyIdentifier> = Vec::new();
    let mut references: Vec<StudyReference> = Vec::new();
    let mut contributors: Vec<StudyContributor> = Vec::new();
    let mut topics: Vec<StudyTopic> = Vec::new();
    let mut data_objects: Vec<DataObject> = Vec::new();

    let yoda_title = non_empty(&st.yoda_title).map(|t| html::normalise_markup(t).0);
    s.display_title = non_empty(&st.display_title)
        .map(str::to_string)
        .or(yoda_title);
    // no brief description is available for Yoda records

    // presence on the site implies the study has finished
    s.study_status_id = Some(21);
    s.study_status = Some("Completed".to_string());

    // type was pre-coded from the ctg or isrctn entry where one existed
    s.study_type_id = st.type_id;
    s.study_type = match st.type_id {
        Some(11) => Some("Interventional".to_string()),
        Some(12) => Some("Observational".to_string()),
        _ => None,
    };

    if let Some(enrolment) = non_empty(&st.enrolment).and_then(|e| e.parse::<i32>().ok()) {
        s.study_enrolment = Some(enrolment);
    }

    match non_empty(&st.percent_female).filter(|p| *p != "N/A") {
        Some(percent) => {
            let percent = percent.trim_end_matches('%');
            if let Ok(female_percentage) = percent.parse::<f32>() {
                let (id, label) = if female_percentage == 0.0 {
                    (910, "Male")
                } else if female_percentage == 100.0 {
                    (905, "Female")
                } else {
                    (900, "All")
                };
                s.study_gender_elig_id = Some(id);
                s.study_gender_elig = Some(label.to_string());
            }
        }
        None => {
            s.study_gender_elig_id = Some(915);
            s.study_gender_elig = Some("Not provided".to_string());
        }
    }

    // pre-extracted title and identifier lists pass straight through
    for t in &st.study_titles.items {
        let mut title = StudyTitle::new(
            sid, &t.title_text, t.title_type_id, &t.title_type, t.is_default);
        title.comments = t.comments.clone();
        titles.push(title);
    }
    for i in &st.study_identifiers.items {
        identifiers.push(StudyIdentifier::new(
            sid, &i.identifier_value, i.identifier_type_id, &i.identifier_type,
            i.identifier_org_id, i.identifier_org.as_deref()));
    }

    // sponsor is only relevant for studies with no registry entry
    let sponsor_org = match non_empty(&st.sponsor) {
        Some(sponsor) => orgs::tidy_org_name(sponsor, sid),
        None => "No organisation name provided in source data".to_string(),
    };
    if st.is_yoda_only.unwrap_or(false) {
        contributors.push(StudyContributor::organisation(
            sid, 54, "Trial Sponsor",
            non_empty(&st.sponsor).and(st.sponsor_id), &sponsor_org));
    }

    // ── Topics ────────────────────────────────────────────────────────────

    if let Some(generic) = non_empty(&st.compound_generic_name) {
        let mut topic = StudyTopic::new(sid, 12, "chemical / agent", generic);
        topic.comments = Some("generic name".to_string());
        topics.push(topic);
    }
    if let Some(product) = non_empty(&st.compound_product_name) {
        // drop trademark symbols and collapse whitespace
        let product = product.replace(['\u{00ae}', '\u{2122}'], "");
        let product = product.split_whitespace().collect::<Vec<_>>().join(" ");
        if !product.is_empty() && reconcile::topic_is_new(&topics, &product) {
            let mut topic = StudyTopic::new(
                sid, 12, "chemical / agent", &title_case(&product.to_lowercase()));
            topic.comments = Some("trade name".to_string());
            topics.push(topic);
        }
    }
    if let Some(condition) = non_empty(&st.conditions_studied) {
        topics.push(StudyTopic::new(sid, 13, "condition", condition));
    }

    // normally at most one reference, carrying the primary citation link
    for r in &st.study_references.items {
        let pmid = r.pmid.trim();
        if !pmid.is_empty() {
            references.push(StudyReference::new(
                sid, Some(pmid), non_empty(&st.primary_citation_link), None, None));
        }
    }

    // ── Data objects ──────────────────────────────────────────────────────

    let name_base = s.display_title.clone().unwrap_or_else(|| sid.to_string());

    // the Yoda study page itself
    let object_display_title = format!("{name_base} :: Yoda web page");
    let sd_oid = hash::object_hash(sid, &object_display_title);
    let mut page_obj = DataObject {
        sd_oid: sd_oid.clone(),
        sd_sid: sid.to_string(),
        display_title: object_display_title.clone(),
        object_class_id: 23,
        object_class: "Text".to_string(),
        object_type_id: 38,
        object_type: "Study Overview".to_string(),
        managing_org_id: Some(org::YODA),
        managing_org: Some("Yoda".to_string()),
        access_type_id: Some(12),
        access_type: Some("Public on-screen access".to_string()),
        datetime_of_data_fetch: fetched,
        titles: vec![ObjectTitle::new(
            &sd_oid, &object_display_title, 22, "Study short name :: object type", true)],
        ..Default::default()
    };
    if let Some(url) = non_empty(&st.remote_url) {
        page_obj.instances.push(ObjectInstance::new(
            &sd_oid, Some(org::YODA), Some("Yoda"), url, 35, "Web text"));
    }
    data_objects.push(page_obj);

    for supp_doc in &st.supp_docs.items {
        let Some((class_id, class_label, type_id, type_label)) =
            supp_doc_types(supp_doc.doc_name.trim())
        else {
            continue;
        };
        let object_display_title = format!("{name_base} :: {type_label}");
        let sd_oid = hash::object_hash(sid, &object_display_title);

        let available_now = supp_doc.comment.as_deref() == Some("Available now");
        let mut doc_obj = DataObject {
            sd_oid: sd_oid.clone(),
            sd_sid: sid.to_string(),
            display_title: object_display_title.clone(),
            object_class_id: class_id,
            object_class: class_label.to_string(),
            object_type_id: type_id,
            object_type: type_label.to_string(),
            managing_org_id: Some(org::YODA),
            managing_org: Some("Yoda".to_string()),
            datetime_of_data_fetch: fetched,
            titles: vec![ObjectTitle::new(
                &sd_oid, &object_display_title, 22, "Study short name :: object type", true)],
            ..Default::default()
        };

        if available_now {
            doc_obj.access_type_id = Some(11);
            doc_obj.access_type = Some("Public download".to_string());
            if let Some(url) = non_empty(&supp_doc.url) {
                let (resource_type_id, resource_type) = if url.to_lowercase().ends_with(".pdf") {
                    (11, "PDF")
                } else if url.to_lowercase().ends_with(".xls") {
                    (18, "Excel Spreadsheet(s)")
                } else {
                    (0, "Not yet known")
                };
                doc_obj.instances.push(ObjectInstance::new(
                    &sd_oid, Some(org::YODA), Some("Yoda"), url, resource_type_id, resource_type));
            }
        } else {
            doc_obj.access_type_id = Some(17);
            doc_obj.access_type = Some("Case by case download".to_string());
            doc_obj.access_details = Some(ACCESS_DETAILS.to_string());
            doc_obj.access_details_url = Some("https://yoda.yale.edu/how-request-data".to_string());
            doc_obj.url_last_checked = NaiveDate::from_ymd_opt(2020, 9, 23);
        }

        // datasets carry their properties even when largely unknown
        if type_id == 80 {
            doc_obj.dataset = Some(ObjectDataset {
                sd_oid: sd_oid.clone(),
                record_keys_type_id: 0,
                record_keys_type: "Not known".to_string(),
                record_keys_details: None,
                deident_type_id: 2,
                deident_type: "De-identification applied".to_string(),
                deident_details: Some(DEIDENT_DETAILS.to_string()),
                consent_type_id: 0,
                consent_type: "Not known".to_string(),
                consent_details: None,
            });
        }
        data_objects.push(doc_obj);
    }

    s.identifiers = identifiers;
    s.titles = titles;
    s.references = references;
    s.contributors = contributors;
    s.topics = topics;
    s.data_objects = data_objects;

    Some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_record() -> YodaRecord {
        YodaRecord {
            sd_sid: "Y-2015-1234".to_string(),
            yoda_title: Some("A Study of Drug X in Condition Y".to_string()),
            remote_url: Some("https://yoda.yale.edu/trial/2015-1234".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_record_xml() {
        let xml = r#"<YodaRecord>
            <sd_sid>Y-2015-0042</sd_sid>
            <yoda_title>Trial of something</yoda_title>
            <is_yoda_only>true</is_yoda_only>
            <supp_docs>
                <SuppDoc><doc_name>Clinical Study Report</doc_name>
                    <comment>Available now</comment>
                    <url>https://yoda.yale.edu/csr.pdf</url></SuppDoc>
            </supp_docs>
        </YodaRecord>"#;
        let rec = parse(xml).unwrap();
        assert_eq!(rec.sd_sid, "Y-2015-0042");
        assert_eq!(rec.is_yoda_only, Some(true));
        assert_eq!(rec.supp_docs.items.len(), 1);
    }

    #[test]
    fn test_assumed_completed_and_page_object() {
        let s = process(&base_record(), None).unwrap();
        assert_eq!(s.study_status_id, Some(21));
        assert_eq!(s.data_objects[0].object_type_id, 38);
        assert!(s.data_objects[0].display_title.ends_with(":: Yoda web page"));
    }

    #[test]
    fn test_percent_female_mapping() {
        let mut rec = base_record();
        rec.percent_female = Some("100%".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.study_gender_elig.as_deref(), Some("Female"));

        rec.percent_female = Some("0".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.study_gender_elig.as_deref(), Some("Male"));

        rec.percent_female = Some("47.5%".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.study_gender_elig.as_deref(), Some("All"));

        rec.percent_female = None;
        let s = process(&rec, None).unwrap();
        assert_eq!(s.study_gender_elig.as_deref(), Some("Not provided"));
    }

    #[test]
    fn test_trade_name_deduplicated_against_generic() {
        let mut rec = base_record();
        rec.compound_generic_name = Some("canagliflozin".to_string());
        rec.compound_product_name = Some("INVOKANA\u{00ae}".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.topics.len(), 2);
        assert_eq!(s.topics[1].topic_value, "Invokana");
        assert_eq!(s.topics[1].comments.as_deref(), Some("trade name"));

        // identical names collapse to one topic
        rec.compound_product_name = Some("Canagliflozin".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.topics.len(), 1);
    }

    #[test]
    fn test_supp_doc_table_dataset_properties() {
        let mut rec = base_record();
        rec.supp_docs.items.push(SuppDoc {
            doc_name: "Collected Datasets".to_string(),
            url: None,
            comment: Some("Not yet available".to_string()),
        });
        let s = process(&rec, None).unwrap();
        let dataset_obj = s.data_objects.iter().find(|o| o.object_type_id == 80).unwrap();
        assert_eq!(dataset_obj.object_class_id, 14);
        assert_eq!(dataset_obj.access_type_id, Some(17));
        assert!(dataset_obj.url_last_checked.is_some());
        assert_eq!(dataset_obj.dataset.as_ref().unwrap().deident_type_id, 2);
    }

    #[test]
    fn test_available_supp_doc_gets_instance() {
        let mut rec = base_record();
        rec.supp_docs.items.push(SuppDoc {
            doc_name: "Statistical Analysis Plan".to_string(),
            url: Some("https://yoda.yale.edu/sites/default/sap.pdf".to_string()),
            comment: Some("Available now".to_string()),
        });
        let s = process(&rec, None).unwrap();
        let sap = s.data_objects.iter().find(|o| o.object_type_id == 22).unwrap();
        assert_eq!(sap.access_type_id, Some(11));
        assert_eq!(sap.instances[0].resource_type_id, Some(11));
    }

    #[test]
    fn test_sponsor_only_for_yoda_only_studies() {
        let mut rec = base_record();
        rec.sponsor = Some("Janssen Research & Development".to_string());
        rec.sponsor_id = Some(100188);
        let s = process(&rec, None).unwrap();
        assert!(s.contributors.is_empty());

        rec.is_yoda_only = Some(true);
        let s = process(&rec, None).unwrap();
        assert_eq!(s.contributors.len(), 1);
        assert_eq!(s.contributors[0].organisation_id, Some(100188));
    }

    #[test]
    fn test_unknown_supp_doc_name_skipped() {
        let mut rec = base_record();
        rec.supp_docs.items.push(SuppDoc {
            doc_name: "Mystery Document".to_string(),
            url: None,
            comment: None,
        });
        let s = process(&rec, None).unwrap();
        assert_eq!(s.data_objects.len(), 1); // just the web page
    }
}
