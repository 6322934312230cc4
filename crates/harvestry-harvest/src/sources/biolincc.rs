//! BioLINCC study processor.
//!
//! BioLINCC publishes NHLBI study collections as web pages; the download
//! stage flattens each page into one `BioLinccRecord` XML document, with
//! document resources pre-classified by type. Most studies also carry their
//! ClinicalTrials.gov registration ids; the NCT display name is preferred
//! unless several BioLINCC studies share one NCT entry.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use harvestry_common::error::Result;
use harvestry_common::model::{
    DataObject, ObjectDataset, ObjectDate, ObjectInstance, ObjectTitle, Study, StudyContributor,
    StudyIdentifier, StudyReference, StudyTitle,
};
use harvestry_common::vocab::org;

use crate::helpers::{dates, hash, html};
use crate::reconcile;

use super::xml_err;

const ACCESS_DETAILS: &str = "Investigators wishing to request materials from studies ... must register (free) on the BioLINCC website. \
    Registered investigators may then request detailed searches and submit an application for data sets \
    and/or biospecimens. (from the BioLINCC website)";

const DE_IDENTIFICATION: &str = "All BioLINCC data and biospecimens are de-identified. That is to say that obvious subject identifiers \
    (e.g., name, addresses, social security numbers, place of birth, city of birth, contact data) \
    have been redacted from all BioLINCC datasets and biospecimens, and under no circumstances would BioLINCC \
    provide subject identifiers, or a link to such information, to recipients of coded materials. (from the BioLINCC website)";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename = "BioLinccRecord")]
pub struct BiolinccRecord {
    pub sd_sid: String,
    pub title: Option<String>,
    pub acronym: Option<String>,
    pub nct_base_name: Option<String>,
    pub in_multiple_biolincc_group: Option<bool>,
    pub brief_description: Option<String>,
    pub study_type_id: Option<i32>,
    pub study_type: Option<String>,
    pub study_period: Option<String>,
    pub accession_number: Option<String>,
    pub publication_year: Option<i32>,
    pub remote_url: Option<String>,
    pub last_revised_date: Option<String>,
    pub study_website: Option<String>,
    pub resources_available: Option<String>,
    pub dataset_consent_restrictions: Option<String>,
    pub sponsor_id: Option<i32>,
    pub sponsor_name: Option<String>,
    pub registry_ids: RegistryIds,
    pub primary_docs: PrimaryDocs,
    pub resources: Resources,
    pub assoc_docs: AssocDocs,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryIds {
    #[serde(rename = "RegistryId")]
    pub items: Vec<RegistryId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryId {
    pub nct_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PrimaryDocs {
    #[serde(rename = "PrimaryDoc")]
    pub items: Vec<PrimaryDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PrimaryDoc {
    pub pubmed_id: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Resources {
    #[serde(rename = "Resource")]
    pub items: Vec<Resource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Resource {
    pub doc_name: String,
    pub object_type_id: Option<i32>,
    pub object_type: Option<String>,
    pub access_type_id: Option<i32>,
    pub url: Option<String>,
    pub doc_type_id: Option<i32>,
    pub doc_type: Option<String>,
    pub size: Option<String>,
    pub size_units: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssocDocs {
    #[serde(rename = "AssocDoc")]
    pub items: Vec<AssocDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssocDoc {
    pub pubmed_id: Option<String>,
    pub display_title: Option<String>,
    pub link_id: Option<String>,
}

pub fn parse(raw: &str) -> Result<BiolinccRecord> {
    quick_xml::de::from_str(raw).map_err(xml_err)
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Pull a start year (and month, when the period opens with a month name)
/// from a free-text study period like "1998-2004" or "December 2008 - ...".
fn parse_study_period(period: &str) -> (Option<i32>, Option<i32>) {
    let period = period.trim();
    if period.len() < 4 {
        return (None, None);
    }
    if let Some(year) = period.get(..4).and_then(|p| p.parse::<i32>().ok()) {
        return (Some(year), None);
    }
    // perhaps "Month yyyy ...", a month name then a 4-digit year
    let mut tokens = period.split_whitespace();
    if let (Some(first), Some(second)) = (tokens.next(), tokens.next()) {
        if let Some(month) = dates::month_from_name(first) {
            if let Some(year) = second.get(..4).and_then(|y| y.parse::<i32>().ok()) {
                return (Some(year), Some(month));
            }
        }
    }
    (None, None)
}

/// Consent classification for the IPD dataset object.
fn classify_consent(restrictions: Option<&str>) -> (i32, &'static str, Option<String>) {
    match restrictions {
        None => (0, "Not known", None),
        Some(r) => {
            let lower = r.trim().to_lowercase();
            if lower == "none" || lower == "none." {
                (2, "No restriction",
                    Some("Explicitly states that there are no restrictions on use".to_string()))
            } else {
                (6, "Consent specified, not elsewhere categorised", Some(r.to_string()))
            }
        }
    }
}

pub fn process(st: &BiolinccRecord, fetched: Option<DateTime<Utc>>) -> Option<Study> {
    let sid = st.sd_sid.trim();
    if sid.is_empty() {
        return None;
    }
    let title = html::normalise_markup(non_empty(&st.title)?).0;

    let mut s = Study::new(sid, fetched);
    let mut titles: Vec<StudyTitle> = Vec::new();
    let mut identifiers: Vec<StudyIdentifier> = Vec::new();
    let mut references: Vec<StudyReference> = Vec::new();
    let mut contributors: Vec<StudyContributor> = Vec::new();
    let mut data_objects: Vec<DataObject> = Vec::new();

    // NHLBI's own title is not always identical to the registry entry
    let mut page_title = StudyTitle::new(sid, &title, 15, "Public Title", true);
    page_title.comments = Some("From study page on BioLINCC web site".to_string());
    titles.push(page_title);
    if let Some(acronym) = non_empty(&st.acronym) {
        titles.push(StudyTitle::new(sid, acronym, 14, "Acronym or Abbreviation", false));
    }

    // prefer the NCT display name, except for studies grouped under a
    // single shared NCT entry
    let in_group = st.in_multiple_biolincc_group.unwrap_or(false);
    s.display_title = match (in_group, non_empty(&st.nct_base_name)) {
        (false, Some(nct_name)) => Some(nct_name.to_string()),
        _ => Some(title.clone()),
    };

    if let Some(description) = non_empty(&st.brief_description) {
        let (desc, had_markup) = html::normalise_markup(description);
        s.brief_description = Some(desc);
        s.bd_contains_html = had_markup;
    }

    // study type was pre-coded by the download stage
    s.study_type_id = st.study_type_id;
    s.study_type = non_empty(&st.study_type).map(str::to_string);

    // being on the website at all implies the study has finished
    s.study_status_id = Some(21);
    s.study_status = Some("Completed".to_string());

    if let Some(period) = non_empty(&st.study_period) {
        let (year, month) = parse_study_period(period);
        s.study_start_year = year;
        s.study_start_month = month;
    }

    // ── Identifiers and sponsor ───────────────────────────────────────────

    if let Some(accession) = non_empty(&st.accession_number) {
        identifiers.push(StudyIdentifier::new(
            sid, accession, 42, "NHLBI ID",
            Some(org::NHLBI), Some("National Heart, Lung, and Blood Institute (US)")));
    }
    for registry_id in &st.registry_ids.items {
        let nct_id = registry_id.nct_id.trim();
        if !nct_id.is_empty() {
            identifiers.push(StudyIdentifier::new(
                sid, nct_id, 11, "Trial Registry ID",
                Some(org::CLINICAL_TRIALS_GOV), Some("ClinicalTrials.gov")));
        }
    }

    let sponsor_name = non_empty(&st.sponsor_name);
    if let Some(name) = sponsor_name {
        if st.sponsor_id.is_some() {
            contributors.push(StudyContributor::organisation(
                sid, 54, "Trial Sponsor", st.sponsor_id, name));
        }
    }

    // ── Data objects ──────────────────────────────────────────────────────

    let name_base = s.display_title.clone().unwrap_or_else(|| title.clone());

    // the BioLINCC study page
    let object_display_title = format!("{name_base} :: NHLBI web page");
    let sd_oid = hash::object_hash(sid, &object_display_title);
    let mut page_obj = DataObject {
        sd_oid: sd_oid.clone(),
        sd_sid: sid.to_string(),
        display_title: object_display_title.clone(),
        publication_year: st.publication_year,
        object_class_id: 23,
        object_class: "Text".to_string(),
        object_type_id: 38,
        object_type: "Study Overview".to_string(),
        managing_org_id: Some(org::NHLBI),
        managing_org: Some("National Heart, Lung, and Blood Institute (US)".to_string()),
        access_type_id: Some(12),
        access_type: Some("Public on-screen access".to_string()),
        datetime_of_data_fetch: fetched,
        titles: vec![ObjectTitle::new(
            &sd_oid, &object_display_title, 22, "Study short name :: object type", true)],
        ..Default::default()
    };
    if let Some(url) = non_empty(&st.remote_url) {
        page_obj.instances.push(ObjectInstance::new(
            &sd_oid, Some(org::BIOLINCC), Some("BioLINCC"), url, 35, "Web text"));
    }
    if let Some(revised) = non_empty(&st.last_revised_date) {
        if let Some(d) = dates::parse_iso_date(&revised[..revised.len().min(10)]) {
            page_obj.dates.push(ObjectDate {
                sd_oid: sd_oid.clone(),
                date_type_id: 18,
                date_type: "Updated".to_string(),
                start_year: Some(d.year),
                start_month: d.month,
                start_day: d.day,
                date_as_string: Some(d.date_string.clone()),
            });
        }
    }
    data_objects.push(page_obj);

    // a dedicated study web site, when one exists
    if let Some(website) = non_empty(&st.study_website) {
        let object_display_title = format!("{name_base} :: Study web site");
        let sd_oid = hash::object_hash(sid, &object_display_title);
        data_objects.push(DataObject {
            sd_oid: sd_oid.clone(),
            sd_sid: sid.to_string(),
            display_title: object_display_title.clone(),
            object_class_id: 23,
            object_class: "Text".to_string(),
            object_type_id: 134,
            object_type: "Website".to_string(),
            managing_org_id: st.sponsor_id,
            managing_org: sponsor_name.map(str::to_string),
            access_type_id: Some(12),
            access_type: Some("Public on-screen access".to_string()),
            datetime_of_data_fetch: fetched,
            titles: vec![ObjectTitle::new(
                &sd_oid, &object_display_title, 22, "Study short name :: object type", true)],
            instances: vec![ObjectInstance::new(
                &sd_oid, st.sponsor_id, sponsor_name, website, 35, "Web text")],
            ..Default::default()
        });
    }

    // the IPD dataset collection, described rather than directly linked
    if non_empty(&st.resources_available)
        .is_some_and(|r| r.to_lowercase().contains("datasets"))
    {
        let object_display_title = format!("{name_base} :: IPD Datasets");
        let sd_oid = hash::object_hash(sid, &object_display_title);
        let (consent_type_id, consent_type, consent_details) =
            classify_consent(non_empty(&st.dataset_consent_restrictions));

        data_objects.push(DataObject {
            sd_oid: sd_oid.clone(),
            sd_sid: sid.to_string(),
            display_title: object_display_title.clone(),
            object_class_id: 14,
            object_class: "Datasets".to_string(),
            object_type_id: 80,
            object_type: "Individual Participant Data".to_string(),
            managing_org_id: Some(org::NHLBI),
            managing_org: Some("National Heart, Lung, and Blood Institute (US)".to_string()),
            access_type_id: Some(17),
            access_type: Some("Case by case download".to_string()),
            access_details: Some(ACCESS_DETAILS.to_string()),
            access_details_url: Some(
                "https://biolincc.nhlbi.nih.gov/media/guidelines/handbook.pdf#page=15".to_string()),
            datetime_of_data_fetch: fetched,
            titles: vec![ObjectTitle::new(
                &sd_oid, &object_display_title, 22, "Study short name :: object type", true)],
            dataset: Some(ObjectDataset {
                sd_oid: sd_oid.clone(),
                record_keys_type_id: 0,
                record_keys_type: "Not known".to_string(),
                record_keys_details: None,
                deident_type_id: 2,
                deident_type: "De-identification applied".to_string(),
                deident_details: Some(DE_IDENTIFICATION.to_string()),
                consent_type_id,
                consent_type: consent_type.to_string(),
                consent_details,
            }),
            ..Default::default()
        });
    }

    // per-resource document objects, pre-classified by the download stage
    for resource in &st.resources.items {
        let doc_name = resource.doc_name.trim();
        if doc_name.is_empty() {
            continue;
        }
        let object_display_title = format!("{name_base} :: {doc_name}");
        let sd_oid = hash::object_hash(sid, &object_display_title);
        let mut doc_obj = DataObject {
            sd_oid: sd_oid.clone(),
            sd_sid: sid.to_string(),
            display_title: object_display_title.clone(),
            publication_year: st.publication_year,
            object_class_id: 23,
            object_class: "Text".to_string(),
            object_type_id: resource.object_type_id.unwrap_or(37),
            object_type: resource.object_type.clone().unwrap_or_else(|| "Other".to_string()),
            managing_org_id: st.sponsor_id,
            managing_org: sponsor_name.map(str::to_string),
            access_type_id: resource.access_type_id,
            datetime_of_data_fetch: fetched,
            titles: vec![ObjectTitle::new(
                &sd_oid, &object_display_title, 21, "Study short name :: object name", true)],
            ..Default::default()
        };
        if let Some(url) = non_empty(&resource.url) {
            let mut instance = ObjectInstance::new(
                &sd_oid, Some(org::BIOLINCC), Some("BioLINCC"), url,
                resource.doc_type_id.unwrap_or(0),
                resource.doc_type.as_deref().unwrap_or("Not yet known"));
            instance.resource_size = non_empty(&resource.size).map(str::to_string);
            instance.resource_size_units = non_empty(&resource.size_units).map(str::to_string);
            doc_obj.instances.push(instance);
        }
        data_objects.push(doc_obj);
    }

    // ── References ────────────────────────────────────────────────────────

    for doc in &st.primary_docs.items {
        references.push(StudyReference::new(
            sid, non_empty(&doc.pubmed_id), None, non_empty(&doc.url), Some("primary")));
    }
    for doc in &st.assoc_docs.items {
        references.push(StudyReference::new(
            sid,
            non_empty(&doc.pubmed_id),
            non_empty(&doc.display_title),
            non_empty(&doc.link_id),
            Some("associated"),
        ));
    }

    s.titles = titles;
    s.identifiers = identifiers;
    // the primary doc is sometimes repeated among the associated docs
    s.references = reconcile::reconcile_references(references);
    s.contributors = contributors;
    s.data_objects = data_objects;

    Some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_record() -> BiolinccRecord {
        BiolinccRecord {
            sd_sid: "HLB01041919a".to_string(),
            title: Some("Aspirin Myocardial Infarction Study".to_string()),
            acronym: Some("AMIS".to_string()),
            accession_number: Some("HLB01041919a".to_string()),
            remote_url: Some("https://biolincc.nhlbi.nih.gov/studies/amis/".to_string()),
            publication_year: Some(1980),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_record_xml() {
        let xml = r#"<BioLinccRecord>
            <sd_sid>HLB0104</sd_sid>
            <title>Test Study</title>
            <registry_ids><RegistryId><nct_id>NCT00000489</nct_id></RegistryId></registry_ids>
            <primary_docs><PrimaryDoc><pubmed_id>363853</pubmed_id><url>https://pubmed/363853</url></PrimaryDoc></primary_docs>
            <resources>
                <Resource>
                    <doc_name>Protocol</doc_name>
                    <object_type_id>11</object_type_id>
                    <object_type>Study Protocol</object_type>
                    <url>https://biolincc.nhlbi.nih.gov/media/studies/amis/protocol.pdf</url>
                    <doc_type_id>11</doc_type_id>
                    <doc_type>PDF</doc_type>
                    <size>12</size><size_units>MB</size_units>
                </Resource>
            </resources>
        </BioLinccRecord>"#;
        let rec = parse(xml).unwrap();
        assert_eq!(rec.sd_sid, "HLB0104");
        assert_eq!(rec.registry_ids.items[0].nct_id, "NCT00000489");
        assert_eq!(rec.resources.items[0].object_type_id, Some(11));
        assert_eq!(rec.resources.items[0].size.as_deref(), Some("12"));
    }

    #[test]
    fn test_status_assumed_completed() {
        let s = process(&base_record(), None).unwrap();
        assert_eq!(s.study_status_id, Some(21));
        assert_eq!(s.study_status.as_deref(), Some("Completed"));
    }

    #[test]
    fn test_display_title_prefers_nct_name() {
        let mut rec = base_record();
        rec.nct_base_name = Some("Aspirin in Myocardial Infarction".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.display_title.as_deref(), Some("Aspirin in Myocardial Infarction"));

        rec.in_multiple_biolincc_group = Some(true);
        let s = process(&rec, None).unwrap();
        assert_eq!(s.display_title.as_deref(), Some("Aspirin Myocardial Infarction Study"));
    }

    #[test]
    fn test_study_period_year_only() {
        let mut rec = base_record();
        rec.study_period = Some("1975-1979".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.study_start_year, Some(1975));
        assert_eq!(s.study_start_month, None);
    }

    #[test]
    fn test_study_period_month_year() {
        let mut rec = base_record();
        rec.study_period = Some("December 2008 - May 2013".to_string());
        let s = process(&rec, None).unwrap();
        assert_eq!(s.study_start_year, Some(2008));
        assert_eq!(s.study_start_month, Some(12));
    }

    #[test]
    fn test_nhlbi_identifier_and_nct_ids() {
        let mut rec = base_record();
        rec.registry_ids.items.push(RegistryId { nct_id: "NCT00000489".to_string() });
        let s = process(&rec, None).unwrap();
        assert_eq!(s.identifiers.len(), 2);
        assert_eq!(s.identifiers[0].identifier_type_id, 42);
        assert_eq!(s.identifiers[0].identifier_org_id, Some(org::NHLBI));
        assert_eq!(s.identifiers[1].identifier_value, "NCT00000489");
    }

    #[test]
    fn test_dataset_object_with_consent_classification() {
        let mut rec = base_record();
        rec.resources_available = Some("Datasets and biospecimens".to_string());
        rec.dataset_consent_restrictions = Some("None.".to_string());
        let s = process(&rec, None).unwrap();
        let dataset_obj = s.data_objects.iter().find(|o| o.object_type_id == 80).unwrap();
        assert_eq!(dataset_obj.object_class_id, 14);
        let ds = dataset_obj.dataset.as_ref().unwrap();
        assert_eq!(ds.deident_type_id, 2);
        assert_eq!(ds.consent_type_id, 2);
        assert_eq!(ds.consent_type, "No restriction");
    }

    #[test]
    fn test_specific_consent_restrictions_kept() {
        let (id, label, details) = classify_consent(Some("Commercial use excluded"));
        assert_eq!(id, 6);
        assert_eq!(label, "Consent specified, not elsewhere categorised");
        assert_eq!(details.as_deref(), Some("Commercial use excluded"));
    }

    #[test]
    fn test_primary_and_associated_docs_merged() {
        let mut rec = base_record();
        rec.primary_docs.items.push(PrimaryDoc {
            pubmed_id: Some("363853".to_string()),
            url: Some("https://pubmed.ncbi.nlm.nih.gov/363853".to_string()),
        });
        rec.assoc_docs.items.push(AssocDoc {
            pubmed_id: Some("363853".to_string()),
            display_title: Some("AMIS primary results".to_string()),
            link_id: Some("10.1001/jama.1980.03300300019017".to_string()),
        });
        let s = process(&rec, None).unwrap();
        assert_eq!(s.references.len(), 1);
        let merged = &s.references[0];
        assert_eq!(merged.comments.as_deref(), Some("primary"));
        assert_eq!(merged.citation.as_deref(), Some("AMIS primary results"));
        assert_eq!(merged.doi.as_deref(), Some("10.1001/jama.1980.03300300019017"));
    }

    #[test]
    fn test_resource_objects_carry_size() {
        let mut rec = base_record();
        rec.resources.items.push(Resource {
            doc_name: "Forms".to_string(),
            object_type_id: Some(23),
            object_type: Some("Data collection forms".to_string()),
            access_type_id: Some(11),
            url: Some("https://biolincc.nhlbi.nih.gov/media/studies/amis/forms.pdf".to_string()),
            doc_type_id: Some(11),
            doc_type: Some("PDF".to_string()),
            size: Some("4".to_string()),
            size_units: Some("MB".to_string()),
        });
        let s = process(&rec, None).unwrap();
        let forms = s.data_objects.iter().find(|o| o.display_title.ends_with(":: Forms")).unwrap();
        assert_eq!(forms.titles[0].title_type_id, 21);
        assert_eq!(forms.instances[0].resource_size.as_deref(), Some("4"));
        assert_eq!(forms.instances[0].resource_size_units.as_deref(), Some("MB"));
    }

    #[test]
    fn test_missing_title_returns_none() {
        let mut rec = base_record();
        rec.title = None;
        assert!(process(&rec, None).is_none());
    }
}
