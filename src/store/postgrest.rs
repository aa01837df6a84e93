use crate::constants::store::{
    COLUMN_CITY, COLUMN_DATE, COLUMN_LICENSE_TYPE, COLUMN_STATUS, DEFAULT_PROJECTION,
    SEARCH_COLUMNS,
};
use crate::dates::to_backend_date;
use crate::filter::FilterSpec;

/// Query-string pairs for a PostgREST read.
///
/// Built without any I/O so translation can be checked in isolation. Pairs
/// are kept in insertion order; the projection always comes first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostgrestQuery {
    pairs: Vec<(String, String)>,
}

impl PostgrestQuery {
    /// Read every row with `projection` (`*` when blank).
    pub fn select(projection: &str) -> Self {
        let projection = match projection.trim() {
            "" => DEFAULT_PROJECTION,
            value => value,
        };
        Self {
            pairs: vec![("select".to_string(), projection.to_string())],
        }
    }

    /// Read the rows satisfying `spec`.
    ///
    /// Status, city, and license type become `eq` filters, present date bounds
    /// become inclusive `gte`/`lte` filters, and a search term becomes one
    /// `or` group of case-insensitive `ilike` patterns over the search columns.
    pub fn filtered(projection: &str, spec: &FilterSpec) -> Self {
        let mut query = Self::select(projection);
        if let Some(status) = spec.status.status() {
            query.push(COLUMN_STATUS, format!("eq.{}", status.as_str()));
        }
        if let Some(start) = spec.date_range.start() {
            query.push(COLUMN_DATE, format!("gte.{}", to_backend_date(start)));
        }
        if let Some(end) = spec.date_range.end() {
            query.push(COLUMN_DATE, format!("lte.{}", to_backend_date(end)));
        }
        if let Some(city) = spec.city() {
            query.push(COLUMN_CITY, format!("eq.{city}"));
        }
        if let Some(license_type) = spec.license_type() {
            query.push(COLUMN_LICENSE_TYPE, format!("eq.{license_type}"));
        }
        if let Some(term) = spec.search() {
            let pattern = quote(&format!("*{term}*"));
            let clauses: Vec<String> = SEARCH_COLUMNS
                .iter()
                .map(|column| format!("{}.ilike.{}", quote(column), pattern))
                .collect();
            query.push("or", format!("({})", clauses.join(",")));
        }
        query
    }

    fn push(&mut self, key: &str, value: String) {
        self.pairs.push((key.to_string(), value));
    }

    /// Pairs in request order. Values are not yet percent-encoded.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Human-readable form used in logs.
    pub fn describe(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Double-quote a value for use inside a PostgREST logic tree.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
