//! Category normalization applied before grouping, display-label truncation, and
//! free-text volume extraction.
//!
//! Raw dimension text from the demo generators is not clean: values carry stray
//! whitespace, corrupted rows put numbers into `region`, and lead-potential labels are
//! free-text sentences. Everything here is total: bad input yields `None` or `0`, never
//! an error.

use crate::models::{DimValue, Dimension, FieldRef, Record};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Default display width for category labels, in characters.
pub const DEFAULT_LABEL_MAX_CHARS: usize = 40;

const ELLIPSIS: &str = "...";

/// Literal values that mark a missing category rather than a real one.
const PLACEHOLDERS: [&str; 3] = ["undefined", "null", "nan"];

/// Digit groups with optional thousands separators, e.g. `6,000` or `10000`.
static VOLUME_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:,\d{3})*").expect("volume regex is valid"));

/// Canonical lead-potential categories, checked in this order.
const LEAD_CATEGORIES: [(&str, &str); 3] = [("hot", "Hot"), ("warm", "Warm"), ("cold", "Cold")];

/// Trim a raw label and reject values that are not real categories of `dimension`.
///
/// Rejected: empty strings, placeholder literals (`"undefined"`), purely numeric
/// location names (corrupted rows), and the `"All"` aggregate row of `gender`.
pub fn clean_label(dimension: Dimension, raw: &str) -> Option<&str> {
    let s = raw.trim();
    if s.is_empty() || PLACEHOLDERS.iter().any(|p| s.eq_ignore_ascii_case(p)) {
        return None;
    }
    match dimension {
        Dimension::Region | Dimension::Country if is_numeric_label(s) => None,
        Dimension::Gender if s.eq_ignore_ascii_case("all") => None,
        _ => Some(s),
    }
}

/// True when the label consists of ASCII digits only.
pub fn is_numeric_label(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Grouping key for a raw label: [`clean_label`] followed by the per-dimension
/// canonicalization, so that variants of one category land in one bucket.
pub fn category_key(dimension: Dimension, raw: &str) -> Option<Cow<'_, str>> {
    let s = clean_label(dimension, raw)?;
    match dimension {
        Dimension::LeadPotential => Some(canonical_lead(s)),
        _ => Some(Cow::Borrowed(s)),
    }
}

/// Collapse a free-text lead-potential label onto `Hot`, `Warm` or `Cold`.
/// Labels mentioning none of them are kept as they are.
pub fn canonical_lead(label: &str) -> Cow<'_, str> {
    let lower = label.to_lowercase();
    LEAD_CATEGORIES
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, canonical)| Cow::Borrowed(*canonical))
        .unwrap_or(Cow::Borrowed(label))
}

/// The record's grouping key for `dimension`, or `None` if it has no valid category.
pub fn group_key(record: &Record, dimension: Dimension) -> Option<DimValue> {
    match record.field(dimension)? {
        FieldRef::Year(y) => Some(DimValue::Year(y)),
        FieldRef::Text(raw) => category_key(dimension, raw).map(|k| DimValue::Text(k.into_owned())),
    }
}

/// Shorten a label for display. The grouping key stays untouched; only the label
/// handed to the chart is cut to `max_chars` characters (ellipsis included).
pub fn truncate_label(label: &str, max_chars: usize) -> Cow<'_, str> {
    if label.chars().count() <= max_chars {
        return Cow::Borrowed(label);
    }
    if max_chars <= ELLIPSIS.len() {
        return Cow::Owned(label.chars().take(max_chars).collect());
    }
    let keep = max_chars - ELLIPSIS.len();
    let mut out: String = label.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    Cow::Owned(out)
}

/// Representative yearly volume of a free-text range such as `"6,000-10,000 units/year"`.
///
/// Two or more numbers: mean of the first two. One number: that number. None: `0`.
pub fn parse_volume_range(text: &str) -> f64 {
    let numbers: Vec<f64> = VOLUME_NUMBER
        .find_iter(text)
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .take(2)
        .collect();
    match numbers.as_slice() {
        [a, b] => (a + b) / 2.0,
        [a] => *a,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_label_rejects_placeholders_and_numeric_regions() {
        assert_eq!(clean_label(Dimension::Region, "  Europe "), Some("Europe"));
        assert_eq!(clean_label(Dimension::Region, "undefined"), None);
        assert_eq!(clean_label(Dimension::Region, "   "), None);
        assert_eq!(clean_label(Dimension::Region, "123"), None);
        // digits are only suspicious for location names
        assert_eq!(clean_label(Dimension::HandleLength, "48"), Some("48"));
        assert_eq!(clean_label(Dimension::Gender, "All"), None);
        assert_eq!(clean_label(Dimension::Gender, "Female"), Some("Female"));
    }

    #[test]
    fn lead_labels_collapse_case_insensitively() {
        assert_eq!(canonical_lead("Hot - scale & centralized sourcing"), "Hot");
        assert_eq!(canonical_lead("HOT (large buyer)"), "Hot");
        assert_eq!(canonical_lead("hot"), "Hot");
        assert_eq!(canonical_lead("Warm - steady procurement"), "Warm");
        assert_eq!(canonical_lead("cold lead"), "Cold");
        assert_eq!(canonical_lead("Unqualified"), "Unqualified");
    }

    #[test]
    fn truncation_only_touches_long_labels() {
        assert_eq!(truncate_label("Retail", 40), "Retail");
        let long = "Excavator shovel/bucket attachments for heavy equipment";
        let cut = truncate_label(long, 40);
        assert_eq!(cut.chars().count(), 40);
        assert!(cut.ends_with("..."));
        assert!(long.starts_with(cut.trim_end_matches('.')));
    }

    #[test]
    fn tiny_limits_never_exceed_the_width() {
        assert_eq!(truncate_label("Retail", 3), "Ret");
        assert_eq!(truncate_label("Retail", 1), "R");
        assert_eq!(truncate_label("Retail", 0), "");
        assert_eq!(truncate_label("Retail", 4), "R...");
    }

    #[test]
    fn volume_ranges() {
        assert_eq!(parse_volume_range("6,000-10,000 units/year"), 8000.0);
        assert_eq!(parse_volume_range("500-1,000 units/year"), 750.0);
        assert_eq!(parse_volume_range("50-100 units annually"), 75.0);
        assert_eq!(parse_volume_range("about 1,200 units"), 1200.0);
        assert_eq!(parse_volume_range("on request"), 0.0);
        assert_eq!(parse_volume_range(""), 0.0);
    }
}
