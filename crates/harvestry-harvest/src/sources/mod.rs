//! Per-source processors.
//!
//! One module per registry format. Each exposes `parse` (raw file text →
//! source-specific record) and a pure `process` (record + retrieval
//! timestamp → canonical `Study`, or `None` when the document lacks the
//! sections needed to be usable). Dispatch is a tagged union keyed by
//! source id — no inheritance, no dynamic lookup.

pub mod biolincc;
pub mod ctg;
pub mod euctr;
pub mod isrctn;
pub mod pubmed;
pub mod who;
pub mod yoda;

use chrono::{DateTime, Utc};
use harvestry_common::error::{HarvestError, Result};
use harvestry_common::model::Study;

/// The registry sources this harvester understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Ctg,
    Biolincc,
    Yoda,
    Who,
    Euctr,
    Isrctn,
    Pubmed,
}

impl Source {
    pub fn id(&self) -> i32 {
        match self {
            Source::Who      => 100115,
            Source::Ctg      => 100120,
            Source::Euctr    => 100123,
            Source::Isrctn   => 100126,
            Source::Pubmed   => 100135,
            Source::Biolincc => 101900,
            Source::Yoda     => 101901,
        }
    }

    pub fn from_id(id: i32) -> Option<Source> {
        match id {
            100115 => Some(Source::Who),
            100120 => Some(Source::Ctg),
            100123 => Some(Source::Euctr),
            100126 => Some(Source::Isrctn),
            100135 => Some(Source::Pubmed),
            101900 => Some(Source::Biolincc),
            101901 => Some(Source::Yoda),
            _      => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Ctg      => "ctg",
            Source::Biolincc => "biolincc",
            Source::Yoda     => "yoda",
            Source::Who      => "who",
            Source::Euctr    => "euctr",
            Source::Isrctn   => "isrctn",
            Source::Pubmed   => "pubmed",
        }
    }
}

/// A parsed source document, ready for its processor.
#[derive(Debug, Clone)]
pub enum SourceDocument {
    Ctg(serde_json::Value),
    Biolincc(biolincc::BiolinccRecord),
    Yoda(yoda::YodaRecord),
    Who(who::WhoRecord),
    Euctr(euctr::EuctrRecord),
    Isrctn(isrctn::IsrctnRecord),
    Pubmed(pubmed::PubmedCitation),
}

/// Deserialize one raw file into its source-specific record shape.
pub fn parse_document(source: Source, raw: &str) -> Result<SourceDocument> {
    match source {
        Source::Ctg      => Ok(SourceDocument::Ctg(serde_json::from_str(raw)?)),
        Source::Biolincc => Ok(SourceDocument::Biolincc(biolincc::parse(raw)?)),
        Source::Yoda     => Ok(SourceDocument::Yoda(yoda::parse(raw)?)),
        Source::Who      => Ok(SourceDocument::Who(who::parse(raw)?)),
        Source::Euctr    => Ok(SourceDocument::Euctr(euctr::parse(raw)?)),
        Source::Isrctn   => Ok(SourceDocument::Isrctn(isrctn::parse(raw)?)),
        Source::Pubmed   => Ok(SourceDocument::Pubmed(pubmed::parse(raw)?)),
    }
}

/// Run the matching processor. `None` means the document is unusable and
/// should be skipped (logged by the caller), not that processing failed.
pub fn process_document(doc: &SourceDocument, fetched: Option<DateTime<Utc>>) -> Option<Study> {
    match doc {
        SourceDocument::Ctg(d)      => ctg::process(d, fetched),
        SourceDocument::Biolincc(d) => biolincc::process(d, fetched),
        SourceDocument::Yoda(d)     => yoda::process(d, fetched),
        SourceDocument::Who(d)      => who::process(d, fetched),
        SourceDocument::Euctr(d)    => euctr::process(d, fetched),
        SourceDocument::Isrctn(d)   => isrctn::process(d, fetched),
        SourceDocument::Pubmed(d)   => pubmed::process(d, fetched),
    }
}

/// Map a quick-xml error into the shared error type.
pub(crate) fn xml_err(e: quick_xml::DeError) -> HarvestError {
    HarvestError::Xml(e.to_string())
}

/// Resolve an object display title against the titles already used for this
/// study, suffixing "_n" on collision. Repeated harvests see the documents
/// in the same order, so the suffixes are stable.
pub(crate) fn uniquify_title(candidate: String, used: &mut Vec<String>) -> String {
    if !used.contains(&candidate) {
        used.push(candidate.clone());
        return candidate;
    }
    let mut n = 1;
    loop {
        let with_suffix = format!("{candidate}_{n}");
        if !used.contains(&with_suffix) {
            used.push(with_suffix.clone());
            return with_suffix;
        }
        n += 1;
    }
}

/// Render an ALL_CAPS code from a registry API as readable text:
/// "PRINCIPAL_INVESTIGATOR" -> "Principal investigator".
pub(crate) fn pretty_code(code: &str) -> String {
    let lower = code.trim().replace('_', " ").to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => lower,
    }
}
