use indexmap::IndexMap;
use serde::Serialize;

use crate::data::{Record, Status};
use crate::types::{CityName, LicenseType};
use crate::utils::{fold_case, non_blank};

/// Option lists and counts derived from a record set for the filter bar.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Facets {
    /// Distinct cities, case-insensitively de-duplicated, sorted.
    pub cities: Vec<CityName>,
    /// Distinct license types, case-insensitively de-duplicated, sorted.
    pub license_types: Vec<LicenseType>,
    /// Record count per status, in `Status::ALL` order.
    pub status_counts: IndexMap<Status, usize>,
    /// Records with usable coordinates.
    pub mapped: usize,
    /// Records that can only be listed.
    pub unmapped: usize,
}

impl Facets {
    /// Compute facets from a record set. The first spelling seen for a value wins.
    pub fn from_records(records: &[Record]) -> Self {
        let mut cities: IndexMap<String, CityName> = IndexMap::new();
        let mut license_types: IndexMap<String, LicenseType> = IndexMap::new();
        let mut status_counts: IndexMap<Status, usize> =
            Status::ALL.into_iter().map(|status| (status, 0)).collect();
        let mut mapped = 0usize;

        for record in records {
            if let Some(city) = non_blank(Some(record.city.as_str())) {
                cities
                    .entry(fold_case(city))
                    .or_insert_with(|| city.to_string());
            }
            if let Some(license_type) = non_blank(Some(record.license_type.as_str())) {
                license_types
                    .entry(fold_case(license_type))
                    .or_insert_with(|| license_type.to_string());
            }
            *status_counts.entry(record.status).or_insert(0) += 1;
            if record.is_mapped() {
                mapped += 1;
            }
        }

        Self {
            cities: sorted_values(cities),
            license_types: sorted_values(license_types),
            status_counts,
            mapped,
            unmapped: records.len() - mapped,
        }
    }

    /// Total records counted.
    pub fn total(&self) -> usize {
        self.mapped + self.unmapped
    }
}

fn sorted_values(mut values: IndexMap<String, String>) -> Vec<String> {
    values.sort_keys();
    values.into_values().collect()
}
