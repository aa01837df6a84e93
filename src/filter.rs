//! Filter specification and the local evaluator.
//!
//! `FilterSpec` is the single source of truth for every constraint dimension.
//! The status/category duality of the UI is expressed through `Category`,
//! which reads and writes `FilterSpec::status` instead of keeping its own copy.

use serde::{Deserialize, Serialize};

use crate::data::{Record, Status};
use crate::dates::date_in_range;
use crate::types::{CityName, DocumentDate, LicenseType, SearchTerm};
use crate::utils::{contains_folded, fold_case, non_blank};

/// Status constraint. `All` is equivalent to "no constraint".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusFilter {
    /// Any status.
    #[default]
    All,
    /// Exactly this status.
    Only(Status),
}

impl StatusFilter {
    /// The constrained status, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(*status),
        }
    }
}

impl From<Option<Status>> for StatusFilter {
    fn from(value: Option<Status>) -> Self {
        value.map(StatusFilter::Only).unwrap_or_default()
    }
}

/// Inclusive document date range. Each bound is optional and applied on its own.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DocumentDate>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DocumentDate>,
}

impl DateRange {
    /// Lower bound after trimming; blank bounds count as absent.
    pub fn start(&self) -> Option<&str> {
        non_blank(self.start.as_deref())
    }

    /// Upper bound after trimming; blank bounds count as absent.
    pub fn end(&self) -> Option<&str> {
        non_blank(self.end.as_deref())
    }

    /// Returns `true` when neither bound constrains anything.
    pub fn is_unbounded(&self) -> bool {
        self.start().is_none() && self.end().is_none()
    }
}

/// Every constraint a caller can place on the record set.
///
/// Absent fields (and blank strings) mean "no constraint on this dimension".
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Status constraint; also the selected category.
    #[serde(default)]
    pub status: StatusFilter,
    /// Document date bounds.
    #[serde(default)]
    pub date_range: DateRange,
    /// City, case-insensitive exact match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<CityName>,
    /// License type, case-insensitive exact match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_type: Option<LicenseType>,
    /// Substring of address, company name, or city.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchTerm>,
}

impl FilterSpec {
    /// Spec constraining only the status.
    pub fn with_status(status: Status) -> Self {
        Self {
            status: StatusFilter::Only(status),
            ..Self::default()
        }
    }

    /// Spec constraining only the free-text search.
    pub fn with_search(term: impl Into<SearchTerm>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    /// Returns `true` when no dimension constrains the record set.
    pub fn is_empty(&self) -> bool {
        self.status == StatusFilter::All
            && self.date_range.is_unbounded()
            && self.city().is_none()
            && self.license_type().is_none()
            && self.search().is_none()
    }

    /// City constraint after trimming.
    pub fn city(&self) -> Option<&str> {
        non_blank(self.city.as_deref())
    }

    /// License type constraint after trimming.
    pub fn license_type(&self) -> Option<&str> {
        non_blank(self.license_type.as_deref())
    }

    /// Search term after trimming.
    pub fn search(&self) -> Option<&str> {
        non_blank(self.search.as_deref())
    }

    /// Category currently implied by the status constraint.
    pub fn category(&self) -> Category {
        match self.status {
            StatusFilter::All => Category::All,
            StatusFilter::Only(status) => Category::Status(status),
        }
    }

    /// Select a category by writing the canonical status field.
    pub fn set_category(&mut self, category: Category) {
        self.status = category.status_filter();
    }

    /// Copy of this spec without the search term.
    pub fn without_search(&self) -> Self {
        Self {
            search: None,
            ..self.clone()
        }
    }

    /// Canonical form: blank strings removed, values trimmed.
    pub fn normalized(&self) -> Self {
        Self {
            status: self.status,
            date_range: DateRange {
                start: self.date_range.start().map(str::to_string),
                end: self.date_range.end().map(str::to_string),
            },
            city: self.city().map(str::to_string),
            license_type: self.license_type().map(str::to_string),
            search: self.search().map(str::to_string),
        }
    }

    /// Returns `true` when `record` satisfies every present constraint.
    pub fn matches(&self, record: &Record) -> bool {
        CompiledFilter::new(self).matches(record)
    }
}

/// Quick-select category shown above the map. A view over `FilterSpec::status`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Every record.
    #[default]
    All,
    /// Records with this status.
    Status(Status),
}

impl Category {
    /// Every selectable category in display order.
    pub fn options() -> Vec<Category> {
        std::iter::once(Category::All)
            .chain(Status::ALL.into_iter().map(Category::Status))
            .collect()
    }

    /// Stable identifier used by UI bindings.
    pub fn id(&self) -> &'static str {
        match self {
            Category::All => "all",
            Category::Status(Status::Aprovada) => "aprovada",
            Category::Status(Status::Consulta) => "consulta",
            Category::Status(Status::Analise) => "analise",
        }
    }

    /// Parse a category identifier produced by [`Category::id`].
    pub fn from_id(id: &str) -> Option<Self> {
        Category::options()
            .into_iter()
            .find(|category| category.id() == id.trim())
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Category::All => "Todas",
            Category::Status(status) => status.as_str(),
        }
    }

    /// Status constraint this category stands for.
    pub fn status_filter(&self) -> StatusFilter {
        match self {
            Category::All => StatusFilter::All,
            Category::Status(status) => StatusFilter::Only(*status),
        }
    }
}

/// Filter with pre-folded comparison values, reused across a whole record set.
struct CompiledFilter<'a> {
    status: Option<Status>,
    start: Option<&'a str>,
    end: Option<&'a str>,
    city: Option<String>,
    license_type: Option<String>,
    search: Option<String>,
}

impl<'a> CompiledFilter<'a> {
    fn new(spec: &'a FilterSpec) -> Self {
        Self {
            status: spec.status.status(),
            start: spec.date_range.start(),
            end: spec.date_range.end(),
            city: spec.city().map(fold_case),
            license_type: spec.license_type().map(fold_case),
            search: spec.search().map(fold_case),
        }
    }

    fn matches(&self, record: &Record) -> bool {
        if let Some(status) = self.status
            && record.status != status
        {
            return false;
        }
        if let Some(city) = &self.city
            && fold_case(&record.city) != *city
        {
            return false;
        }
        if let Some(license_type) = &self.license_type
            && fold_case(&record.license_type) != *license_type
        {
            return false;
        }
        if (self.start.is_some() || self.end.is_some())
            && !date_in_range(&record.date, self.start, self.end)
        {
            return false;
        }
        if let Some(term) = &self.search {
            let hit = contains_folded(&record.address, term)
                || contains_folded(&record.company_name, term)
                || contains_folded(&record.city, term);
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Return the records satisfying `spec`, preserving input order.
///
/// An empty spec returns a copy of the input unchanged.
pub fn apply(records: &[Record], spec: &FilterSpec) -> Vec<Record> {
    if spec.is_empty() {
        return records.to_vec();
    }
    let compiled = CompiledFilter::new(spec);
    records
        .iter()
        .filter(|record| compiled.matches(record))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, status: Status, city: &str, date: &str) -> Record {
        Record {
            id: id.to_string(),
            file_name: format!("{id}.pdf"),
            date: date.to_string(),
            license_type: "LAO".to_string(),
            tax_id: String::new(),
            address: format!("Rua {id}, 10"),
            company_name: format!("Empresa {id}"),
            city: city.to_string(),
            built_area: Some(100.0),
            lot_area: Some(200.0),
            latitude: Some(-26.3),
            longitude: Some(-48.8),
            status,
        }
    }

    #[test]
    fn status_filter_scenario() {
        let records = vec![record("a", Status::Aprovada, "Joinville", "2024/03/18")];
        assert_eq!(
            apply(&records, &FilterSpec::with_status(Status::Aprovada)).len(),
            1
        );
        assert!(apply(&records, &FilterSpec::with_status(Status::Consulta)).is_empty());
    }

    #[test]
    fn blank_fields_count_as_absent() {
        let spec = FilterSpec {
            city: Some("   ".into()),
            search: Some("".into()),
            date_range: DateRange {
                start: Some(" ".into()),
                end: None,
            },
            ..FilterSpec::default()
        };
        assert!(spec.is_empty());
        assert_eq!(spec.normalized(), FilterSpec::default());
    }

    #[test]
    fn search_matches_address_company_and_city_only() {
        let mut target = record("a", Status::Consulta, "Blumenau", "2024/01/01");
        target.tax_id = "needle".into();
        let records = vec![
            target,
            record("b", Status::Consulta, "Joinville", "2024/01/01"),
        ];
        assert!(apply(&records, &FilterSpec::with_search("NEEDLE")).is_empty());
        let hits = apply(&records, &FilterSpec::with_search("  blumen "));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
        let hits = apply(&records, &FilterSpec::with_search("empresa b"));
        assert_eq!(hits[0].id, "b");
    }

    #[test]
    fn date_range_is_inclusive_and_open_ended() {
        let records = vec![
            record("jan", Status::Aprovada, "X", "2024/01/15"),
            record("feb", Status::Aprovada, "X", "2024/02/15"),
            record("mar", Status::Aprovada, "X", "2024/03/15"),
        ];
        let spec = FilterSpec {
            date_range: DateRange {
                start: Some("2024-02-15".into()),
                end: None,
            },
            ..FilterSpec::default()
        };
        let ids: Vec<_> = apply(&records, &spec).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["feb", "mar"]);

        let spec = FilterSpec {
            date_range: DateRange {
                start: Some("2024-01-01".into()),
                end: Some("15/02/2024".into()),
            },
            ..FilterSpec::default()
        };
        let ids: Vec<_> = apply(&records, &spec).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["jan", "feb"]);
    }

    #[test]
    fn city_and_license_type_match_case_insensitively() {
        let records = vec![
            record("a", Status::Aprovada, "Joinville", "2024/01/01"),
            record("b", Status::Aprovada, "Joinville do Sul", "2024/01/01"),
        ];
        let spec = FilterSpec {
            city: Some("joinville".into()),
            license_type: Some("lao".into()),
            ..FilterSpec::default()
        };
        let ids: Vec<_> = apply(&records, &spec).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn category_writes_the_canonical_status() {
        let mut spec = FilterSpec::default();
        spec.set_category(Category::Status(Status::Analise));
        assert_eq!(spec.status, StatusFilter::Only(Status::Analise));
        assert_eq!(spec.category(), Category::Status(Status::Analise));

        spec.status = StatusFilter::Only(Status::Aprovada);
        assert_eq!(spec.category(), Category::Status(Status::Aprovada));

        spec.set_category(Category::All);
        assert!(spec.is_empty());
    }

    #[test]
    fn category_ids_round_trip() {
        for category in Category::options() {
            assert_eq!(Category::from_id(category.id()), Some(category));
        }
        assert_eq!(Category::from_id("pending"), None);
    }
}
