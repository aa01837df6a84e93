use std::cmp::Ordering;

use chrono::NaiveDate;

/// Parse a document date as stored by the backend or typed in a filter.
///
/// Accepts `YYYY/MM/DD`, `YYYY-MM-DD`, and `DD/MM/YYYY` (with `-` or `/`
/// separators). Surrounding whitespace is ignored. Returns `None` when parsing
/// fails.
pub fn parse_document_date(value: &str) -> Option<NaiveDate> {
    let normalized = value.trim().replace('/', "-");
    if normalized.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%d-%m-%Y") {
        return Some(date);
    }
    None
}

/// Compare two textual dates chronologically.
///
/// When either side cannot be parsed as a calendar date the comparison falls
/// back to lexical order of the separator-normalized strings, which is still
/// chronological for zero-padded year-first dates.
pub fn compare_document_dates(left: &str, right: &str) -> Ordering {
    match (parse_document_date(left), parse_document_date(right)) {
        (Some(left), Some(right)) => left.cmp(&right),
        _ => lexical_key(left).cmp(&lexical_key(right)),
    }
}

/// Returns `true` when `date` falls inside the inclusive, open-ended range.
pub fn date_in_range(date: &str, start: Option<&str>, end: Option<&str>) -> bool {
    if let Some(start) = start
        && compare_document_dates(date, start) == Ordering::Less
    {
        return false;
    }
    if let Some(end) = end
        && compare_document_dates(date, end) == Ordering::Greater
    {
        return false;
    }
    true
}

/// Render a date bound in the `YYYY/MM/DD` form the backend column stores.
///
/// The column is text, so bounds must share its zero-padded layout for the
/// backend's ordering to be chronological. Unparseable input is forwarded
/// as-is (trimmed).
pub fn to_backend_date(value: &str) -> String {
    parse_document_date(value)
        .map(|date| date.format("%Y/%m/%d").to_string())
        .unwrap_or_else(|| value.trim().to_string())
}

fn lexical_key(value: &str) -> String {
    value.trim().replace('/', "-")
}
