//! Page controller: load, debounced filtering, and selection.
//!
//! The controller owns the full record set and the displayed subset. Input
//! changes (filter bar, search box, category chips) are staged in independent
//! debouncers and applied when `tick` observes their quiet period elapsed.
//! Every refresh takes a sequence number so a slow backend response can never
//! overwrite a newer result.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::constants::controller::DEFAULT_DEBOUNCE;
use crate::data::Record;
use crate::debounce::Debounced;
use crate::errors::LeadsError;
use crate::facets::Facets;
use crate::filter::{Category, FilterSpec, apply};
use crate::store::RecordStore;
use crate::types::SearchTerm;

/// Where filters are evaluated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// Evaluate against the loaded full set.
    #[default]
    Local,
    /// Ask the store with `fetch_filtered`.
    Backend,
}

/// Progress of the initial full load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LoadStatus {
    /// `load` has not run.
    #[default]
    Idle,
    /// `load` is running.
    Loading,
    /// The full set is available.
    Loaded,
    /// The full load failed; the record sets are empty.
    Failed(String),
}

/// Whether an operation changed the displayed set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Update {
    /// Displayed set is structurally identical to before.
    Unchanged,
    /// Displayed set was replaced.
    Replaced,
}

/// A backend filter request issued by `tick_deferred`.
///
/// Run `spec` against the store on any thread, then hand the result back
/// through `PageController::complete`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterRequest {
    seq: u64,
    spec: FilterSpec,
}

impl FilterRequest {
    /// Sequence number; higher is newer.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Spec to evaluate.
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }
}

fn apply_category(spec: &mut FilterSpec, category: Option<(Category, Instant)>) {
    if let Some((category, _)) = category {
        spec.set_category(category);
    }
}

/// Outcome of recomputing the displayed set.
enum Refresh {
    Applied(Update),
    Request(FilterRequest),
}

/// Staged filter-bar value. The search term is owned by the search box.
struct StagedFilter {
    spec: FilterSpec,
}

/// Coordinates record loading, filtering, and selection for one page.
pub struct PageController<S: RecordStore> {
    store: S,
    mode: FilterMode,
    status: LoadStatus,
    all: Vec<Record>,
    displayed: Vec<Record>,
    spec: FilterSpec,
    pending_filter: Debounced<StagedFilter>,
    pending_search: Debounced<SearchTerm>,
    pending_category: Debounced<Category>,
    issued_seq: u64,
    selected: Option<Record>,
    last_filter_error: Option<String>,
}

impl<S: RecordStore> PageController<S> {
    /// Controller over `store` with local filtering and the default debounce.
    pub fn new(store: S) -> Self {
        Self::with_options(store, FilterMode::Local, DEFAULT_DEBOUNCE)
    }

    /// Controller with explicit filter mode and debounce delay.
    pub fn with_options(store: S, mode: FilterMode, debounce: Duration) -> Self {
        Self {
            store,
            mode,
            status: LoadStatus::Idle,
            all: Vec::new(),
            displayed: Vec::new(),
            spec: FilterSpec::default(),
            pending_filter: Debounced::new(debounce),
            pending_search: Debounced::new(debounce),
            pending_category: Debounced::new(debounce),
            issued_seq: 0,
            selected: None,
            last_filter_error: None,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Filter evaluation mode.
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Full-load progress.
    pub fn load_status(&self) -> &LoadStatus {
        &self.status
    }

    /// Every loaded record.
    pub fn all_records(&self) -> &[Record] {
        &self.all
    }

    /// Records currently shown on the map and in the list.
    pub fn displayed(&self) -> &[Record] {
        &self.displayed
    }

    /// The applied filter spec (filter bar, search, and category merged).
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// The applied category, a view over the status filter.
    pub fn category(&self) -> Category {
        self.spec.category()
    }

    /// Option lists and counts over the full set.
    pub fn facets(&self) -> Facets {
        Facets::from_records(&self.all)
    }

    /// Message of the most recent failed backend filter, cleared on success.
    pub fn last_filter_error(&self) -> Option<&str> {
        self.last_filter_error.as_deref()
    }

    /// Load the full record set and seed the displayed set.
    ///
    /// Failures are logged and leave both sets empty with
    /// `LoadStatus::Failed`; they are not returned.
    pub fn load(&mut self) -> Update {
        self.status = LoadStatus::Loading;
        info!(
            "[construleads:controller] loading records from '{}'",
            self.store.collection()
        );
        match self.store.fetch_all() {
            Ok(records) => {
                info!(
                    "[construleads:controller] loaded {} records",
                    records.len()
                );
                self.all = records;
                self.status = LoadStatus::Loaded;
                self.refresh_now()
            }
            Err(err) => {
                warn!("[construleads:controller] full load failed: {err}");
                self.all.clear();
                self.status = LoadStatus::Failed(err.to_string());
                self.next_seq();
                self.replace_displayed(Vec::new())
            }
        }
    }

    /// Stage a filter-bar change. Its `search` field is ignored.
    pub fn set_filter(&mut self, spec: FilterSpec, now: Instant) {
        self.pending_filter.set(StagedFilter { spec }, now);
    }

    /// Stage a search box change.
    pub fn set_search(&mut self, term: impl Into<SearchTerm>, now: Instant) {
        self.pending_search.set(term.into(), now);
    }

    /// Stage a category selection.
    pub fn select_category(&mut self, category: Category, now: Instant) {
        self.pending_category.set(category, now);
    }

    /// Earliest instant at which a staged change becomes due.
    pub fn next_due(&self) -> Option<Instant> {
        [
            self.pending_filter.due_at(),
            self.pending_search.due_at(),
            self.pending_category.due_at(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Apply every change whose quiet period elapsed at `now`.
    ///
    /// In backend mode the store is called inline.
    pub fn tick(&mut self, now: Instant) -> Update {
        if !self.settle(now) {
            return Update::Unchanged;
        }
        self.refresh_now()
    }

    /// Like `tick`, but hands a backend request back instead of running it.
    ///
    /// Local evaluation and the unfiltered short-circuit are applied
    /// immediately and return `None`.
    pub fn tick_deferred(&mut self, now: Instant) -> Option<FilterRequest> {
        if !self.settle(now) {
            return None;
        }
        match self.refresh() {
            Refresh::Applied(_) => None,
            Refresh::Request(request) => Some(request),
        }
    }

    /// Apply the result of a request from `tick_deferred`.
    ///
    /// Only the newest issued request may change the displayed set; responses
    /// to superseded requests are dropped even when the newer one failed.
    pub fn complete(
        &mut self,
        request: FilterRequest,
        result: Result<Vec<Record>, LeadsError>,
    ) -> Update {
        if request.seq < self.issued_seq {
            debug!(
                "[construleads:controller] dropping stale response seq={} (latest={})",
                request.seq, self.issued_seq
            );
            return Update::Unchanged;
        }
        match result {
            Ok(records) => {
                self.last_filter_error = None;
                self.replace_displayed(records)
            }
            Err(err) => {
                warn!(
                    "[construleads:controller] backend filter seq={} failed: {err}",
                    request.seq
                );
                self.last_filter_error = Some(err.to_string());
                Update::Unchanged
            }
        }
    }

    /// Open details for `record_id` if it is displayed.
    pub fn select(&mut self, record_id: &str) -> Option<&Record> {
        let record = self
            .displayed
            .iter()
            .find(|record| record.id == record_id)
            .cloned()?;
        Some(self.select_record(record))
    }

    /// Open details for `record` (e.g. handed over by a marker click).
    pub fn select_record(&mut self, record: Record) -> &Record {
        debug!("[construleads:controller] selected record '{}'", record.id);
        self.selected.insert(record)
    }

    /// Record whose details are open.
    pub fn selected(&self) -> Option<&Record> {
        self.selected.as_ref()
    }

    /// Close the details view. The displayed set is untouched.
    pub fn close_details(&mut self) {
        self.selected = None;
    }

    /// Merge due changes into the applied spec. Returns whether any settled.
    fn settle(&mut self, now: Instant) -> bool {
        let filter = self.pending_filter.settle(now);
        let search = self.pending_search.settle(now);
        let category = self.pending_category.settle(now);
        if filter.is_none() && search.is_none() && category.is_none() {
            return false;
        }

        // Filter bar and category both write the status; the later change wins.
        let category_first = match (&filter, &category) {
            (Some((_, filter_at)), Some((_, category_at))) => category_at <= filter_at,
            _ => false,
        };

        let mut next = self.spec.clone();
        let mut category = category;
        if category_first {
            apply_category(&mut next, category.take());
        }
        if let Some((staged, _)) = filter {
            let search = next.search.take();
            next = FilterSpec { search, ..staged.spec };
        }
        apply_category(&mut next, category);
        if let Some((term, _)) = search {
            next.search = Some(term);
        }

        let next = next.normalized();
        debug!(
            "[construleads:controller] settled filter change: {:?}",
            next
        );
        self.spec = next;
        true
    }

    fn next_seq(&mut self) -> u64 {
        self.issued_seq += 1;
        self.issued_seq
    }

    /// Refresh synchronously regardless of mode.
    fn refresh_now(&mut self) -> Update {
        match self.refresh() {
            Refresh::Applied(update) => update,
            Refresh::Request(request) => {
                let result = self.store.fetch_filtered(request.spec());
                self.complete(request, result)
            }
        }
    }

    /// Recompute the displayed set for the applied spec, or issue a request.
    fn refresh(&mut self) -> Refresh {
        let seq = self.next_seq();
        if self.spec.is_empty() && !self.all.is_empty() {
            debug!("[construleads:controller] no active filters, showing full set");
            let all = self.all.clone();
            return Refresh::Applied(self.replace_displayed(all));
        }
        match self.mode {
            FilterMode::Local => {
                let filtered = apply(&self.all, &self.spec);
                Refresh::Applied(self.replace_displayed(filtered))
            }
            FilterMode::Backend => Refresh::Request(FilterRequest {
                seq,
                spec: self.spec.clone(),
            }),
        }
    }

    fn replace_displayed(&mut self, records: Vec<Record>) -> Update {
        if records == self.displayed {
            return Update::Unchanged;
        }
        debug!(
            "[construleads:controller] displayed set {} -> {} records",
            self.displayed.len(),
            records.len()
        );
        self.displayed = records;
        Update::Replaced
    }
}
