//! Cross-field reconciliation shared by several processors.
//!
//! Sources list the same paper once as a "primary" citation and again in an
//! "associated" document list; the associated entry usually carries the
//! richer citation and DOI. Reconciliation merges such pairs by PubMed id.
//! Topic lists drawn from overlapping sources (free-text keywords vs coded
//! MeSH terms) are deduplicated case-insensitively.

use harvestry_common::model::{StudyReference, StudyTopic};

/// Merge "primary" references with their "associated" duplicates.
///
/// For each primary entry the first associated entry sharing the same
/// non-null pmid donates its citation and doi; the associated duplicate is
/// dropped. Entries are rebuilt into a new list (no in-place mutation while
/// scanning) and the original relative order is preserved.
pub fn reconcile_references(references: Vec<StudyReference>) -> Vec<StudyReference> {
    let mut merged = references;
    let mut to_drop = vec![false; merged.len()];

    for p in 0..merged.len() {
        if merged[p].comments.as_deref() != Some("primary") || merged[p].pmid.is_none() {
            continue;
        }
        let pmid = merged[p].pmid.clone();
        for a in 0..merged.len() {
            if a == p || to_drop[a] {
                continue;
            }
            if merged[a].comments.as_deref() == Some("associated") && merged[a].pmid == pmid {
                merged[p].citation = merged[a].citation.clone();
                merged[p].doi = merged[a].doi.clone();
                to_drop[a] = true;
                break; // first match wins
            }
        }
    }

    merged
        .into_iter()
        .zip(to_drop)
        .filter_map(|(r, drop)| (!drop).then_some(r))
        .collect()
}

/// Case-insensitive, per-type topic deduplication; first occurrence wins.
pub fn dedupe_topics(topics: Vec<StudyTopic>) -> Vec<StudyTopic> {
    let mut seen: Vec<(i32, String)> = Vec::new();
    topics
        .into_iter()
        .filter(|t| {
            let key = (t.topic_type_id, t.topic_value.to_lowercase());
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        })
        .collect()
}

/// Is this candidate value already present (any type, case-insensitive)?
/// Used while building topic lists from overlapping source fields.
pub fn topic_is_new(topics: &[StudyTopic], candidate: &str) -> bool {
    !topics
        .iter()
        .any(|t| t.topic_value.eq_ignore_ascii_case(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(pmid: Option<&str>, citation: Option<&str>, doi: Option<&str>, tag: Option<&str>) -> StudyReference {
        StudyReference::new("S1", pmid, citation, doi, tag)
    }

    #[test]
    fn test_primary_absorbs_associated_duplicate() {
        let refs = vec![
            reference(Some("1"), None, None, Some("primary")),
            reference(Some("1"), Some("C"), Some("D"), Some("associated")),
        ];
        let out = reconcile_references(refs);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].comments.as_deref(), Some("primary"));
        assert_eq!(out[0].citation.as_deref(), Some("C"));
        assert_eq!(out[0].doi.as_deref(), Some("D"));
    }

    #[test]
    fn test_first_associated_match_wins() {
        let refs = vec![
            reference(Some("7"), None, None, Some("primary")),
            reference(Some("7"), Some("first"), None, Some("associated")),
            reference(Some("7"), Some("second"), None, Some("associated")),
        ];
        let out = reconcile_references(refs);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].citation.as_deref(), Some("first"));
        // the second associated entry is untouched
        assert_eq!(out[1].citation.as_deref(), Some("second"));
    }

    #[test]
    fn test_unrelated_references_preserved_in_order() {
        let refs = vec![
            reference(Some("1"), None, None, Some("primary")),
            reference(Some("2"), Some("other"), None, Some("associated")),
            reference(Some("3"), Some("untagged"), None, None),
        ];
        let out = reconcile_references(refs);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].pmid.as_deref(), Some("1"));
        assert_eq!(out[1].pmid.as_deref(), Some("2"));
        assert_eq!(out[2].pmid.as_deref(), Some("3"));
    }

    #[test]
    fn test_null_pmids_never_merge() {
        let refs = vec![
            reference(None, None, None, Some("primary")),
            reference(None, Some("C"), None, Some("associated")),
        ];
        let out = reconcile_references(refs);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_topic_dedup_case_insensitive() {
        let topics = vec![
            StudyTopic::new("S1", 13, "condition", "Diabetes Mellitus"),
            StudyTopic::new("S1", 13, "condition", "diabetes mellitus"),
            StudyTopic::new("S1", 11, "keyword", "diabetes mellitus"),
        ];
        let out = dedupe_topics(topics);
        // same value dropped within a type, kept across types
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].topic_value, "Diabetes Mellitus");
    }

    #[test]
    fn test_topic_is_new_spans_types() {
        let topics = vec![StudyTopic::new("S1", 13, "condition", "Asthma")];
        assert!(!topic_is_new(&topics, "asthma"));
        assert!(topic_is_new(&topics, "copd"));
    }
}
