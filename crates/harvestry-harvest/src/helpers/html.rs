//! Embedded-markup detection and stripping.
//!
//! Registry text fields occasionally carry HTML fragments. Structural tags
//! are replaced with plain-text equivalents before the remaining tags are
//! stripped; the "had markup" flag always refers to the original text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"</?[A-Za-z][^>]*>").unwrap();
    static ref BREAK_RE: Regex = Regex::new(r"(?i)<br\s*/?>|</p>|</div>").unwrap();
    static ref LIST_ITEM_RE: Regex = Regex::new(r"(?i)<li[^>]*>").unwrap();
    static ref MULTI_SPACE_RE: Regex = Regex::new(r"[ \t]{2,}").unwrap();
}

/// Does the text contain markup? Cheap negative fast-path on the start
/// delimiter before running the tag pattern.
pub fn contains_tags(text: &str) -> bool {
    text.contains('<') && TAG_RE.is_match(text)
}

/// Replace structural tags with plain-text equivalents: line breaks and
/// paragraph/div closers become newlines, list items become dashed lines.
/// Other tags are left for [`strip_tags`].
pub fn replace_tags(text: &str) -> String {
    let text = BREAK_RE.replace_all(text, "\n");
    let text = LIST_ITEM_RE.replace_all(&text, "\n- ");
    text.into_owned()
}

/// Remove all remaining tags and decode the common entities.
pub fn strip_tags(text: &str) -> String {
    let stripped = TAG_RE.replace_all(text, "");
    let decoded = stripped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    MULTI_SPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Normalize a possibly-marked-up field into plain text.
///
/// Returns the plain text and whether the ORIGINAL text contained markup;
/// the flag is not recomputed from the stripped output.
pub fn normalise_markup(text: &str) -> (String, bool) {
    if !contains_tags(text) {
        return (text.to_string(), false);
    }
    (strip_tags(&replace_tags(text)), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        let (out, had) = normalise_markup("Trial of X");
        assert_eq!(out, "Trial of X");
        assert!(!had);
    }

    #[test]
    fn test_emphasis_tags_stripped_flag_set() {
        let (out, had) = normalise_markup("<b>Trial</b> of X");
        assert_eq!(out, "Trial of X");
        assert!(had);
    }

    #[test]
    fn test_breaks_become_newlines() {
        let out = strip_tags(&replace_tags("line one<br/>line two"));
        assert_eq!(out, "line one\nline two");
    }

    #[test]
    fn test_list_items_become_dashes() {
        let out = strip_tags(&replace_tags("<ul><li>first</li><li>second</li></ul>"));
        assert!(out.contains("- first"));
        assert!(out.contains("- second"));
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(strip_tags("Smith &amp; Jones"), "Smith & Jones");
    }

    #[test]
    fn test_lone_angle_bracket_is_not_markup() {
        // comparison operators are common in eligibility text
        let (out, had) = normalise_markup("age < 65 years");
        assert_eq!(out, "age < 65 years");
        assert!(!had);
    }
}
