use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use construleads::filter::FilterSpec;
use construleads::{
    CachedStore, Category, FilterMode, InMemoryStore, LeadsError, LoadStatus, PageController,
    Record, RecordStore, Status, Update,
};

const DEBOUNCE: Duration = Duration::from_millis(300);

const ROWS: &str = r#"[
    {"id": 1, "Data": "2024/01/10", "Tipo de Licença": "LAO", "Endereço": "Rua XV de Novembro, 10",
     "Nome da Empresa": "Alfa Construções", "Cidade": "Joinville", "status": "Aprovada",
     "latitude": -26.30, "longitude": -48.84},
    {"id": 2, "Data": "2024/02/15", "Tipo de Licença": "LAP", "Endereço": "Av. Beira Rio, 200",
     "Nome da Empresa": "Beta Obras", "Cidade": "Blumenau", "status": "Consulta",
     "latitude": -26.91, "longitude": -49.06},
    {"id": 3, "Data": "2024/03/20", "Tipo de Licença": "LAO", "Endereço": "Rua das Palmeiras, 5",
     "Nome da Empresa": "Gama Engenharia", "Cidade": "Joinville", "status": "Análise",
     "latitude": null, "longitude": null},
    {"id": 4, "Data": "2024/04/01", "Tipo de Licença": "LAI", "Endereço": "Rua XV de Novembro, 99",
     "Nome da Empresa": "Delta", "Cidade": "Itajaí", "status": "Aprovada",
     "latitude": -26.90, "longitude": -48.66}
]"#;

fn rows() -> InMemoryStore {
    InMemoryStore::from_json_reader(ROWS.as_bytes()).unwrap()
}

fn ids(records: &[Record]) -> Vec<&str> {
    records.iter().map(|record| record.id.as_str()).collect()
}

/// Store that counts calls and can be told to fail.
struct ScriptedStore {
    inner: InMemoryStore,
    full_reads: AtomicUsize,
    filtered_reads: AtomicUsize,
    fail_full: bool,
    fail_filtered: Mutex<bool>,
}

impl ScriptedStore {
    fn new() -> Self {
        Self {
            inner: rows(),
            full_reads: AtomicUsize::new(0),
            filtered_reads: AtomicUsize::new(0),
            fail_full: false,
            fail_filtered: Mutex::new(false),
        }
    }

    fn failing() -> Self {
        Self {
            fail_full: true,
            ..Self::new()
        }
    }

    fn unavailable(&self) -> LeadsError {
        LeadsError::BackendUnavailable {
            collection: self.collection().to_string(),
            reason: "connection refused".into(),
        }
    }
}

impl RecordStore for ScriptedStore {
    fn collection(&self) -> &str {
        self.inner.collection()
    }

    fn fetch_all(&self) -> Result<Vec<Record>, LeadsError> {
        self.full_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_full {
            return Err(self.unavailable());
        }
        self.inner.fetch_all()
    }

    fn fetch_filtered(&self, spec: &FilterSpec) -> Result<Vec<Record>, LeadsError> {
        self.filtered_reads.fetch_add(1, Ordering::SeqCst);
        if *self.fail_filtered.lock().unwrap() {
            return Err(self.unavailable());
        }
        self.inner.fetch_filtered(spec)
    }
}

#[test]
fn load_seeds_the_displayed_set() {
    let mut controller = PageController::new(rows());
    assert_eq!(controller.load_status(), &LoadStatus::Idle);

    assert_eq!(controller.load(), Update::Replaced);
    assert_eq!(controller.load_status(), &LoadStatus::Loaded);
    assert_eq!(ids(controller.displayed()), vec!["1", "2", "3", "4"]);
    assert_eq!(controller.all_records().len(), 4);
    assert_eq!(controller.category(), Category::All);
}

#[test]
fn failed_load_leaves_empty_sets() {
    let mut controller = PageController::new(ScriptedStore::failing());
    controller.load();

    assert!(matches!(controller.load_status(), LoadStatus::Failed(message) if message.contains("connection refused")));
    assert!(controller.displayed().is_empty());
    assert!(controller.all_records().is_empty());
    assert_eq!(controller.facets().total(), 0);
}

#[test]
fn filter_changes_wait_for_the_quiet_period() {
    let mut controller = PageController::with_options(rows(), FilterMode::Local, DEBOUNCE);
    controller.load();
    let start = Instant::now();

    controller.set_filter(
        FilterSpec {
            city: Some("joinville".into()),
            ..FilterSpec::default()
        },
        start,
    );
    assert_eq!(controller.next_due(), Some(start + DEBOUNCE));
    assert_eq!(controller.tick(start + Duration::from_millis(299)), Update::Unchanged);
    assert_eq!(controller.displayed().len(), 4);

    assert_eq!(controller.tick(start + DEBOUNCE), Update::Replaced);
    assert_eq!(ids(controller.displayed()), vec!["1", "3"]);
    assert_eq!(controller.next_due(), None);
}

#[test]
fn rapid_search_input_applies_only_the_last_term() {
    let mut controller = PageController::with_options(rows(), FilterMode::Local, DEBOUNCE);
    controller.load();
    let start = Instant::now();

    controller.set_search("r", start);
    controller.set_search("rua", start + Duration::from_millis(100));
    controller.set_search("rua xv", start + Duration::from_millis(200));
    assert_eq!(controller.tick(start + Duration::from_millis(450)), Update::Unchanged);

    assert_eq!(controller.tick(start + Duration::from_millis(500)), Update::Replaced);
    assert_eq!(controller.spec().search(), Some("rua xv"));
    assert_eq!(ids(controller.displayed()), vec!["1", "4"]);
}

#[test]
fn search_survives_filter_bar_changes() {
    let mut controller = PageController::with_options(rows(), FilterMode::Local, DEBOUNCE);
    controller.load();
    let start = Instant::now();

    controller.set_search("rua", start);
    controller.tick(start + DEBOUNCE);
    assert_eq!(ids(controller.displayed()), vec!["1", "3", "4"]);

    let later = start + Duration::from_secs(1);
    controller.set_filter(
        FilterSpec {
            license_type: Some("lao".into()),
            search: Some("ignored".into()),
            ..FilterSpec::default()
        },
        later,
    );
    controller.tick(later + DEBOUNCE);
    assert_eq!(controller.spec().search(), Some("rua"));
    assert_eq!(ids(controller.displayed()), vec!["1", "3"]);
}

#[test]
fn category_is_a_view_over_the_status_filter() {
    let mut controller = PageController::with_options(rows(), FilterMode::Local, DEBOUNCE);
    controller.load();
    let start = Instant::now();

    controller.select_category(Category::Status(Status::Aprovada), start);
    controller.tick(start + DEBOUNCE);
    assert_eq!(controller.category(), Category::Status(Status::Aprovada));
    assert_eq!(ids(controller.displayed()), vec!["1", "4"]);

    let later = start + Duration::from_secs(1);
    controller.select_category(Category::All, later);
    assert_eq!(controller.tick(later + DEBOUNCE), Update::Replaced);
    assert_eq!(controller.displayed().len(), 4);
}

#[test]
fn later_of_filter_and_category_wins() {
    let start = Instant::now();

    let mut controller = PageController::with_options(rows(), FilterMode::Local, DEBOUNCE);
    controller.load();
    controller.set_filter(FilterSpec::with_status(Status::Consulta), start);
    controller.select_category(
        Category::Status(Status::Analise),
        start + Duration::from_millis(10),
    );
    controller.tick(start + Duration::from_secs(1));
    assert_eq!(controller.category(), Category::Status(Status::Analise));
    assert_eq!(ids(controller.displayed()), vec!["3"]);

    let mut controller = PageController::with_options(rows(), FilterMode::Local, DEBOUNCE);
    controller.load();
    controller.select_category(Category::Status(Status::Analise), start);
    controller.set_filter(
        FilterSpec::with_status(Status::Consulta),
        start + Duration::from_millis(10),
    );
    controller.tick(start + Duration::from_secs(1));
    assert_eq!(controller.category(), Category::Status(Status::Consulta));
    assert_eq!(ids(controller.displayed()), vec!["2"]);
}

#[test]
fn identical_results_report_unchanged() {
    let mut controller = PageController::with_options(rows(), FilterMode::Local, DEBOUNCE);
    controller.load();
    let start = Instant::now();

    // A blank search is no constraint, so the full set is shown again.
    controller.set_search("  ", start);
    assert_eq!(controller.tick(start + DEBOUNCE), Update::Unchanged);
    assert_eq!(controller.displayed().len(), 4);
}

#[test]
fn clearing_filters_in_backend_mode_skips_the_store() {
    let mut controller = PageController::with_options(ScriptedStore::new(), FilterMode::Backend, DEBOUNCE);
    controller.load();
    let start = Instant::now();

    controller.select_category(Category::Status(Status::Consulta), start);
    controller.tick(start + DEBOUNCE);
    assert_eq!(controller.store().filtered_reads.load(Ordering::SeqCst), 1);
    assert_eq!(ids(controller.displayed()), vec!["2"]);

    let later = start + Duration::from_secs(1);
    controller.select_category(Category::All, later);
    controller.tick(later + DEBOUNCE);
    assert_eq!(controller.store().filtered_reads.load(Ordering::SeqCst), 1);
    assert_eq!(controller.store().full_reads.load(Ordering::SeqCst), 1);
    assert_eq!(controller.displayed().len(), 4);
}

#[test]
fn stale_backend_responses_are_dropped() {
    let mut controller = PageController::with_options(ScriptedStore::new(), FilterMode::Backend, DEBOUNCE);
    controller.load();
    let start = Instant::now();

    controller.set_filter(
        FilterSpec {
            city: Some("Joinville".into()),
            ..FilterSpec::default()
        },
        start,
    );
    let older = controller.tick_deferred(start + DEBOUNCE).expect("request issued");

    let later = start + Duration::from_secs(1);
    controller.set_filter(
        FilterSpec {
            city: Some("Blumenau".into()),
            ..FilterSpec::default()
        },
        later,
    );
    let newer = controller.tick_deferred(later + DEBOUNCE).expect("request issued");
    assert!(newer.seq() > older.seq());

    let newer_rows = controller.store().fetch_filtered(newer.spec());
    let older_rows = controller.store().fetch_filtered(older.spec());
    assert_eq!(controller.complete(newer, newer_rows), Update::Replaced);
    assert_eq!(ids(controller.displayed()), vec!["2"]);

    assert_eq!(controller.complete(older, older_rows), Update::Unchanged);
    assert_eq!(ids(controller.displayed()), vec!["2"]);
}

#[test]
fn failed_backend_filter_keeps_the_displayed_set() {
    let mut controller = PageController::with_options(ScriptedStore::new(), FilterMode::Backend, DEBOUNCE);
    controller.load();
    *controller.store().fail_filtered.lock().unwrap() = true;
    let start = Instant::now();

    controller.set_search("beira", start);
    assert_eq!(controller.tick(start + DEBOUNCE), Update::Unchanged);
    assert_eq!(controller.displayed().len(), 4);
    assert!(controller.last_filter_error().is_some());

    *controller.store().fail_filtered.lock().unwrap() = false;
    let later = start + Duration::from_secs(1);
    controller.set_search("beira rio", later);
    assert_eq!(controller.tick(later + DEBOUNCE), Update::Replaced);
    assert_eq!(ids(controller.displayed()), vec!["2"]);
    assert_eq!(controller.last_filter_error(), None);
}

#[test]
fn selection_does_not_touch_the_displayed_set() {
    let mut controller = PageController::new(rows());
    controller.load();
    let before = controller.displayed().to_vec();

    let selected = controller.select("3").expect("record 3 is displayed");
    assert_eq!(selected.company_name, "Gama Engenharia");
    assert_eq!(controller.displayed(), before.as_slice());

    controller.close_details();
    assert!(controller.selected().is_none());
    assert_eq!(controller.displayed(), before.as_slice());
    assert!(controller.select("missing").is_none());
}

#[test]
fn cached_store_serves_repeated_backend_filters() {
    let store = CachedStore::new(ScriptedStore::new());
    let mut controller = PageController::with_options(store, FilterMode::Backend, DEBOUNCE);
    controller.load();
    let start = Instant::now();

    for step in 0..3u64 {
        let at = start + Duration::from_secs(step);
        let category = if step % 2 == 0 {
            Category::Status(Status::Aprovada)
        } else {
            Category::Status(Status::Consulta)
        };
        controller.select_category(category, at);
        controller.tick(at + DEBOUNCE);
    }

    assert_eq!(ids(controller.displayed()), vec!["1", "4"]);
    assert_eq!(controller.store().inner().filtered_reads.load(Ordering::SeqCst), 2);
}

#[test]
fn superseded_response_is_dropped_when_the_newer_request_fails() {
    let mut controller = PageController::with_options(ScriptedStore::new(), FilterMode::Backend, DEBOUNCE);
    controller.load();
    let start = Instant::now();

    controller.set_filter(
        FilterSpec {
            city: Some("Joinville".into()),
            ..FilterSpec::default()
        },
        start,
    );
    let older = controller.tick_deferred(start + DEBOUNCE).expect("request issued");

    let later = start + Duration::from_secs(1);
    controller.set_filter(
        FilterSpec {
            city: Some("Blumenau".into()),
            ..FilterSpec::default()
        },
        later,
    );
    let newer = controller.tick_deferred(later + DEBOUNCE).expect("request issued");

    let failure = Err(controller.store().unavailable());
    assert_eq!(controller.complete(newer, failure), Update::Unchanged);
    assert!(controller.last_filter_error().is_some());

    let older_rows = controller.store().fetch_filtered(older.spec());
    assert_eq!(controller.complete(older, older_rows), Update::Unchanged);
    assert_eq!(controller.spec().city(), Some("Blumenau"));
    assert_eq!(controller.displayed().len(), 4);
}
