//! Free-text and ISO date parsing into structured partial dates.
//!
//! Registry dates arrive as full ISO dates, "Month d, yyyy", "Month yyyy",
//! bare years, or variants with an estimate marker. Anything unparseable
//! yields `None` — a missing date fact, never an error.

use serde::{Deserialize, Serialize};

/// A partial date: a year, optionally a month and day, plus a display string
/// in "yyyy Mon d" form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitDate {
    pub year: i32,
    pub month: Option<i32>,
    pub day: Option<i32>,
    pub date_string: String,
}

impl SplitDate {
    /// Append the estimate marker to the display string.
    pub fn mark_estimated(&mut self) {
        self.date_string.push_str(" (est.)");
    }
}

const MONTHS_FULL: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

const MONTHS_ABBREV: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun",
    "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Month number (1-12) from a full or three-letter English month name.
pub fn month_from_name(name: &str) -> Option<i32> {
    let lower = name.trim().trim_end_matches(',').to_lowercase();
    MONTHS_FULL
        .iter()
        .position(|m| *m == lower || (lower.len() == 3 && m.starts_with(&lower)))
        .map(|i| i as i32 + 1)
}

/// Three-letter display abbreviation for a month number.
pub fn month_abbrev(month: i32) -> Option<&'static str> {
    if (1..=12).contains(&month) {
        Some(MONTHS_ABBREV[(month - 1) as usize])
    } else {
        None
    }
}

fn display_string(year: i32, month: Option<i32>, day: Option<i32>) -> String {
    match (month.and_then(month_abbrev), day) {
        (Some(m), Some(d)) => format!("{year} {m} {d}"),
        (Some(m), None)    => format!("{year} {m}"),
        _                  => format!("{year}"),
    }
}

fn is_year_token(token: &str) -> Option<i32> {
    if token.len() != 4 || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let y: i32 = token.parse().ok()?;
    // a 4-digit number below this is a day/month fragment or a typo,
    // not a calendar year
    if (1900..=2399).contains(&y) {
        Some(y)
    } else {
        None
    }
}

/// Parse a free-text date: full ISO date, "Month d, yyyy", "Month yyyy" or
/// a bare year.
pub fn parse_date_parts(text: &str) -> Option<SplitDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    // ISO prefix form first
    if text.len() >= 7 && text.as_bytes()[4] == b'-' {
        return parse_iso_date(text);
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.as_slice() {
        [y] => {
            let year = is_year_token(y)?;
            Some(SplitDate { year, month: None, day: None, date_string: display_string(year, None, None) })
        }
        [m, y] => {
            let month = month_from_name(m)?;
            let year = is_year_token(y)?;
            Some(SplitDate {
                year,
                month: Some(month),
                day: None,
                date_string: display_string(year, Some(month), None),
            })
        }
        [m, d, y] => {
            let month = month_from_name(m)?;
            let day: i32 = d.trim_end_matches(',').parse().ok()?;
            if !(1..=31).contains(&day) {
                return None;
            }
            let year = is_year_token(y)?;
            Some(SplitDate {
                year,
                month: Some(month),
                day: Some(day),
                date_string: display_string(year, Some(month), Some(day)),
            })
        }
        _ => None,
    }
}

/// Parse the leading ISO portion of a string: "yyyy-mm-dd" or "yyyy-mm".
/// Trailing content (times, zone designators) is ignored.
pub fn parse_iso_date(text: &str) -> Option<SplitDate> {
    let text = text.trim();
    let mut parts = text.splitn(3, '-');
    let year = is_year_token(parts.next()?)?;
    let month = parts
        .next()
        .and_then(|m| m.get(0..2))
        .and_then(|m| m.parse::<i32>().ok())
        .filter(|m| (1..=12).contains(m));
    let day = parts
        .next()
        .and_then(|d| d.get(0..2))
        .and_then(|d| d.parse::<i32>().ok())
        .filter(|d| (1..=31).contains(d));
    let day = if month.is_some() { day } else { None };
    Some(SplitDate {
        year,
        month,
        day,
        date_string: display_string(year, month, day),
    })
}

/// Re-render a free-text date in the canonical display form, if parseable.
pub fn standardise_date_format(text: &str) -> Option<String> {
    parse_date_parts(text).map(|d| d.date_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_us_date() {
        let d = parse_date_parts("November 23, 2020").unwrap();
        assert_eq!((d.year, d.month, d.day), (2020, Some(11), Some(23)));
        assert_eq!(d.date_string, "2020 Nov 23");
    }

    #[test]
    fn test_parse_month_year() {
        let d = parse_date_parts("March 2014").unwrap();
        assert_eq!((d.year, d.month, d.day), (2014, Some(3), None));
        assert_eq!(d.date_string, "2014 Mar");
    }

    #[test]
    fn test_parse_bare_year() {
        let d = parse_date_parts("2009").unwrap();
        assert_eq!((d.year, d.month, d.day), (2009, None, None));
        assert_eq!(d.date_string, "2009");
    }

    #[test]
    fn test_parse_iso_date() {
        let d = parse_iso_date("2016-05-04").unwrap();
        assert_eq!((d.year, d.month, d.day), (2016, Some(5), Some(4)));
        assert_eq!(d.date_string, "2016 May 4");
    }

    #[test]
    fn test_parse_iso_with_time_suffix() {
        let d = parse_iso_date("2020-09-23T14:05:00Z").unwrap();
        assert_eq!((d.year, d.month, d.day), (2020, Some(9), Some(23)));
    }

    #[test]
    fn test_parse_iso_year_month_only() {
        let d = parse_iso_date("2018-07").unwrap();
        assert_eq!((d.year, d.month, d.day), (2018, Some(7), None));
        assert_eq!(d.date_string, "2018 Jul");
    }

    #[test]
    fn test_day_fragment_is_not_a_year() {
        // 4-digit token outside the plausible year range
        assert!(parse_date_parts("0023").is_none());
    }

    #[test]
    fn test_unparseable_returns_none() {
        assert!(parse_date_parts("sometime soon").is_none());
        assert!(parse_date_parts("").is_none());
        assert!(parse_date_parts("Undecember 2020").is_none());
    }

    #[test]
    fn test_estimate_marker() {
        let mut d = parse_date_parts("June 2021").unwrap();
        d.mark_estimated();
        assert_eq!(d.date_string, "2021 Jun (est.)");
    }

    #[test]
    fn test_abbreviated_month_name() {
        let d = parse_date_parts("Dec 2015").unwrap();
        assert_eq!((d.year, d.month), (2015, Some(12)));
    }
}
