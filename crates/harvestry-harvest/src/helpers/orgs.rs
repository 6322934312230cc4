//! Organisation / person name heuristics.
//!
//! Sponsor and contributor fields mix organisation names, personal names
//! with honorifics, and placeholder junk. These helpers clean names and
//! decide which side of the org/person split an entry belongs on. The
//! individual-detection heuristic is best-effort, not a correctness
//! invariant.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

/// The literal used by several registries for withheld sponsor names.
pub const REDACTED: &str = "[Redacted]";

/// Replacement text stored when a registry has redacted the sponsor name.
pub const REDACTED_SUBSTITUTE: &str = "(sponsor name redacted in registry record)";

const NULL_ORG_NAMES: [&str; 14] = [
    "", "-", "--", "no sponsor", "none", "n/a", "na", "nil", "nill",
    "not applicable", "no available", "not provided", "no funding", "self",
];

const HONORIFIC_PREFIXES: [&str; 10] = [
    "dr ", "dr. ", "drs ", "prof ", "prof. ", "professor ", "mr ", "mr. ",
    "mrs ", "ms ",
];

const ORG_TOKENS: [&str; 22] = [
    "university", "hospital", "institute", "institut", "college", "center",
    "centre", "foundation", "faculty", "school", "clinic", "laborator",
    "ltd", "llc", "inc", "gmbh", "corporation", "company", "pharma",
    "group", "ministry", "department",
];

lazy_static! {
    static ref MULTI_SPACE_RE: Regex = Regex::new(r"\s{2,}").unwrap();
    static ref TRAILING_DEGREE_RE: Regex =
        Regex::new(r"(?i),?\s*(m\.?d\.?|ph\.?d\.?|msc|mph|frcp|md phd)\.?$").unwrap();
}

/// Is this candidate a placeholder rather than a real organisation name?
pub fn is_null_org_name(candidate: &str) -> bool {
    let lower = candidate.trim().to_lowercase();
    NULL_ORG_NAMES.contains(&lower.as_str())
}

/// Clean a free-text organisation name: surrounding quotes, trailing
/// punctuation, internal whitespace runs. The study id is only used for
/// diagnostics on degenerate names.
pub fn tidy_org_name(name: &str, sd_sid: &str) -> String {
    let mut n = name.trim().to_string();
    if n.len() > 1 && n.starts_with('"') && n.ends_with('"') {
        n = n[1..n.len() - 1].to_string();
    }
    while n.ends_with('.') || n.ends_with(',') || n.ends_with(';') {
        n.pop();
    }
    let n = MULTI_SPACE_RE.replace_all(n.trim(), " ").to_string();
    if n.is_empty() {
        debug!(sd_sid, raw = name, "organisation name empty after tidying");
    }
    n
}

/// Substitute the redacted-sponsor placeholder where a registry withheld
/// the name.
pub fn deredact(name: &str) -> String {
    if name == REDACTED {
        REDACTED_SUBSTITUTE.to_string()
    } else {
        name.to_string()
    }
}

/// Does this name look like a person rather than an organisation?
/// Honorific prefixes and trailing degrees say person; well-known
/// institutional tokens override and say organisation.
pub fn is_individual(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    if ORG_TOKENS.iter().any(|t| lower.contains(t)) {
        return false;
    }
    HONORIFIC_PREFIXES.iter().any(|p| lower.starts_with(p))
        || TRAILING_DEGREE_RE.is_match(&lower)
}

/// Clean a personal name: strip honorific prefix and trailing degrees.
pub fn tidy_person_name(name: &str) -> String {
    let mut n = name.trim().to_string();
    let lower = n.to_lowercase();
    for prefix in HONORIFIC_PREFIXES {
        if lower.starts_with(prefix) {
            n = n[prefix.len()..].to_string();
            break;
        }
    }
    let n = TRAILING_DEGREE_RE.replace(&n, "").to_string();
    MULTI_SPACE_RE.replace_all(n.trim(), " ").to_string()
}
