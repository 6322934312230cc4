//! PubMed citation processor.
//!
//! Consumes one PubMed citation XML document (efetch abstract shape,
//! `<PubmedArticleSet><PubmedArticle>` or a bare `<PubmedArticle>`).
//! Citations reach this harvester because they were linked to a trial
//! registry entry; the linkage travels in the DataBank accession numbers.
//! A citation without any registry accession cannot be keyed to a study and
//! is skipped. The linked study is emitted as a stub carrying the article
//! as a Journal Article data object plus a literature reference.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use harvestry_common::error::{HarvestError, Result};
use harvestry_common::model::{
    DataObject, ObjectInstance, ObjectTitle, Study, StudyIdentifier, StudyReference, StudyTitle,
};
use harvestry_common::vocab::org;

use crate::helpers::hash;

/// Fields pulled from one PubMed citation.
#[derive(Debug, Clone, Default)]
pub struct PubmedCitation {
    pub pmid: Option<String>,
    pub article_title: Option<String>,
    pub journal_title: Option<String>,
    pub pub_year: Option<i32>,
    pub doi: Option<String>,
    /// (databank name, accession number) pairs, e.g. ("ClinicalTrials.gov",
    /// "NCT00000001").
    pub accession_numbers: Vec<(String, String)>,
}

/// Parse PubMed citation XML with an event state machine.
pub fn parse(xml: &str) -> Result<PubmedCitation> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut citation = PubmedCitation::default();
    let mut in_pmid = false;
    let mut in_title = false;
    let mut in_journal = false;
    let mut in_journal_title = false;
    let mut in_pub_date = false;
    let mut in_year = false;
    let mut in_eloc = false;
    let mut eloc_is_doi = false;
    let mut in_bank_name = false;
    let mut in_accession = false;
    let mut current_bank = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"PMID" => in_pmid = citation.pmid.is_none(),
                b"ArticleTitle" => in_title = true,
                b"Journal" => in_journal = true,
                b"Title" if in_journal => in_journal_title = true,
                b"PubDate" => in_pub_date = true,
                b"Year" if in_pub_date => in_year = true,
                b"ELocationID" => {
                    in_eloc = true;
                    eloc_is_doi = e.attributes().flatten().any(|a| {
                        a.key.as_ref() == b"EIdType" && a.value.as_ref() == b"doi"
                    });
                }
                b"DataBankName" => in_bank_name = true,
                b"AccessionNumber" => in_accession = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if in_pmid {
                    citation.pmid = Some(text);
                } else if in_title {
                    citation.article_title = Some(text);
                } else if in_journal_title {
                    citation.journal_title = Some(text);
                } else if in_year && citation.pub_year.is_none() {
                    citation.pub_year = text.parse().ok();
                } else if in_eloc && eloc_is_doi {
                    citation.doi = Some(text);
                } else if in_bank_name {
                    current_bank = text;
                } else if in_accession {
                    citation.accession_numbers.push((current_bank.clone(), text));
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"PMID" => in_pmid = false,
                b"ArticleTitle" => in_title = false,
                b"Journal" => in_journal = false,
                b"Title" => in_journal_title = false,
                b"PubDate" => in_pub_date = false,
                b"Year" => in_year = false,
                b"ELocationID" => in_eloc = false,
                b"DataBankName" => in_bank_name = false,
                b"AccessionNumber" => in_accession = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(HarvestError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(citation)
}

/// The registry accession used to key the linked study: an NCT number if one
/// is present, otherwise the first accession listed.
fn linked_study_id(citation: &PubmedCitation) -> Option<&str> {
    citation
        .accession_numbers
        .iter()
        .find(|(_, acc)| acc.starts_with("NCT"))
        .or_else(|| citation.accession_numbers.first())
        .map(|(_, acc)| acc.as_str())
}

pub fn process(citation: &PubmedCitation, fetched: Option<DateTime<Utc>>) -> Option<Study> {
    let pmid = citation.pmid.as_deref()?.trim().to_string();
    let article_title = citation.article_title.as_deref()?.trim().to_string();
    let sid = linked_study_id(citation)?.trim().to_string();
    if pmid.is_empty() || article_title.is_empty() || sid.is_empty() {
        return None;
    }

    let mut s = Study::new(&sid, fetched);
    s.display_title = Some(article_title.clone());
    s.title_lang_code = Some("en".to_string());
    s.titles.push(StudyTitle::new(&sid, &article_title, 15, "Public Title", true));

    // the linking registry id, so the stub can be matched downstream
    let (registry_org_id, registry_org) = if sid.starts_with("ISRCTN") {
        (org::ISRCTN, "ISRCTN")
    } else if sid.starts_with("NCT") {
        (org::CLINICAL_TRIALS_GOV, "ClinicalTrials.gov")
    } else {
        (org::EU_CTR, "EU Clinical Trials Register")
    };
    s.identifiers.push(StudyIdentifier::new(
        &sid, &sid, 11, "Trial Registry ID", Some(registry_org_id), Some(registry_org)));

    let citation_text = match (&citation.journal_title, citation.pub_year) {
        (Some(journal), Some(year)) => format!("{article_title}. {journal} ({year})."),
        (Some(journal), None)       => format!("{article_title}. {journal}."),
        _                           => format!("{article_title}."),
    };
    s.references.push(StudyReference::new(
        &sid, Some(&pmid), Some(&citation_text), citation.doi.as_deref(), None));

    // the article itself is the data object
    let sd_oid = hash::object_hash(&sid, &article_title);
    s.data_objects.push(DataObject {
        sd_oid: sd_oid.clone(),
        sd_sid: sid.clone(),
        display_title: article_title.clone(),
        publication_year: citation.pub_year,
        object_class_id: 23,
        object_class: "Text".to_string(),
        object_type_id: 12,
        object_type: "Journal article".to_string(),
        access_type_id: Some(12),
        access_type: Some("Public on-screen access".to_string()),
        datetime_of_data_fetch: fetched,
        titles: vec![ObjectTitle::new(
            &sd_oid, &article_title, 20, "Unique data object title", true)],
        instances: vec![ObjectInstance::new(
            &sd_oid, Some(org::PUBMED), Some("PubMed"),
            &format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"), 35, "Web text")],
        ..Default::default()
    });

    Some(s)
}
