//! Record store interfaces and implementations.
//!
//! Ownership model:
//! - `RecordStore` is the controller-facing interface: one full read and one
//!   backend-filtered read, both returning typed errors.
//! - `CachedStore` wraps any store with the short-lived `TtlCache`; stores
//!   themselves never cache.
//! - `InMemoryStore` evaluates filters locally and backs offline runs.
//! - `SupabaseStore` (feature `supabase`) talks PostgREST over HTTP.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{CacheKey, TtlCache};
use crate::constants::cache::{OP_FETCH_ALL, OP_FETCH_FILTERED};
use crate::constants::store::DEFAULT_COLLECTION;
use crate::data::Record;
use crate::errors::LeadsError;
use crate::filter::{FilterSpec, apply};
use crate::types::CollectionName;

/// PostgREST query translation.
pub mod postgrest;
#[cfg(feature = "supabase")]
/// Supabase (PostgREST over HTTP) store implementation.
pub mod supabase;

pub use postgrest::PostgrestQuery;
#[cfg(feature = "supabase")]
pub use supabase::SupabaseStore;

/// Read access to the construction record collection.
///
/// Implementations must return records in backend order and must not drop
/// rows silently: a row that cannot be decoded is an error.
pub trait RecordStore: Send + Sync {
    /// Collection name used in logs, errors, and cache keys.
    fn collection(&self) -> &str;
    /// Fetch every record in the collection.
    fn fetch_all(&self) -> Result<Vec<Record>, LeadsError>;
    /// Fetch the records satisfying `spec`, evaluated by the store.
    fn fetch_filtered(&self, spec: &FilterSpec) -> Result<Vec<Record>, LeadsError>;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn collection(&self) -> &str {
        (**self).collection()
    }

    fn fetch_all(&self) -> Result<Vec<Record>, LeadsError> {
        (**self).fetch_all()
    }

    fn fetch_filtered(&self, spec: &FilterSpec) -> Result<Vec<Record>, LeadsError> {
        (**self).fetch_filtered(spec)
    }
}

impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    fn collection(&self) -> &str {
        (**self).collection()
    }

    fn fetch_all(&self) -> Result<Vec<Record>, LeadsError> {
        (**self).fetch_all()
    }

    fn fetch_filtered(&self, spec: &FilterSpec) -> Result<Vec<Record>, LeadsError> {
        (**self).fetch_filtered(spec)
    }
}

/// Decode a JSON array of backend rows into records.
///
/// Every row must decode; the first failing row aborts with
/// `LeadsError::Decode` naming its position.
pub fn decode_rows(collection: &str, body: &str) -> Result<Vec<Record>, LeadsError> {
    let rows: Vec<Value> = serde_json::from_str(body).map_err(|err| LeadsError::Decode {
        collection: collection.to_string(),
        details: format!("response is not a JSON array of rows: {err}"),
    })?;
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            serde_json::from_value::<Record>(row).map_err(|err| LeadsError::Decode {
                collection: collection.to_string(),
                details: format!("row {idx}: {err}"),
            })
        })
        .collect()
}

/// Store over a fixed record set, filtered with the local evaluator.
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    collection: CollectionName,
    records: Vec<Record>,
}

impl InMemoryStore {
    /// Store serving `records` under the default collection name.
    pub fn new(records: Vec<Record>) -> Self {
        Self::with_collection(DEFAULT_COLLECTION, records)
    }

    /// Store serving `records` under `collection`.
    pub fn with_collection(collection: impl Into<CollectionName>, records: Vec<Record>) -> Self {
        Self {
            collection: collection.into(),
            records,
        }
    }

    /// Load a JSON dump of backend rows (the body a full read would return).
    pub fn from_json_reader<R: Read>(mut reader: R) -> Result<Self, LeadsError> {
        let mut body = String::new();
        reader.read_to_string(&mut body)?;
        let records = decode_rows(DEFAULT_COLLECTION, &body)?;
        Ok(Self::new(records))
    }

    /// Load a JSON dump from `path`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LeadsError> {
        let path = path.as_ref();
        info!(
            "[construleads:store] loading record dump from {}",
            path.display()
        );
        let file = File::open(path)?;
        Self::from_json_reader(BufReader::new(file))
    }

    /// Records served by this store, in load order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

impl RecordStore for InMemoryStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn fetch_all(&self) -> Result<Vec<Record>, LeadsError> {
        Ok(self.records.clone())
    }

    fn fetch_filtered(&self, spec: &FilterSpec) -> Result<Vec<Record>, LeadsError> {
        Ok(apply(&self.records, spec))
    }
}

/// Any store fronted by a `TtlCache`.
///
/// Full reads are keyed by the bare `constructions` operation; filtered reads
/// by the normalized spec, so specs differing only in blank fields share an
/// entry. Errors are never cached.
pub struct CachedStore<S> {
    inner: S,
    cache: TtlCache<Arc<Vec<Record>>>,
}

impl<S: RecordStore> CachedStore<S> {
    /// Wrap `inner` with a default one-minute cache.
    pub fn new(inner: S) -> Self {
        Self::with_cache(inner, TtlCache::new())
    }

    /// Wrap `inner` with an explicit cache (custom TTL or clock).
    pub fn with_cache(inner: S, cache: TtlCache<Arc<Vec<Record>>>) -> Self {
        Self { inner, cache }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The cache in front of the store.
    pub fn cache(&self) -> &TtlCache<Arc<Vec<Record>>> {
        &self.cache
    }

    fn fetch_through(
        &self,
        key: CacheKey,
        fetch: impl FnOnce() -> Result<Vec<Record>, LeadsError>,
    ) -> Result<Vec<Record>, LeadsError> {
        let records = self.cache.get_or_fetch(&key, || fetch().map(Arc::new))?;
        debug!(
            "[construleads:cache] {} -> {} records",
            key,
            records.len()
        );
        Ok(records.as_ref().clone())
    }
}

impl<S: RecordStore> RecordStore for CachedStore<S> {
    fn collection(&self) -> &str {
        self.inner.collection()
    }

    fn fetch_all(&self) -> Result<Vec<Record>, LeadsError> {
        self.fetch_through(CacheKey::bare(OP_FETCH_ALL), || self.inner.fetch_all())
    }

    fn fetch_filtered(&self, spec: &FilterSpec) -> Result<Vec<Record>, LeadsError> {
        let spec = spec.normalized();
        let key = CacheKey::new(OP_FETCH_FILTERED, &spec);
        self.fetch_through(key, || self.inner.fetch_filtered(&spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Status;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DUMP: &str = r#"[
        {"id": 1, "Nome do Arquivo": "a.pdf", "Data": "2024/01/10", "Tipo de Licença": "LAO",
         "CNPJ": "00.000.000/0001-00", "Endereço": "Rua A, 1", "Nome da Empresa": "Alfa",
         "Cidade": "Joinville", "Área Construída": "1.234,50", "Área do Terreno": 800,
         "latitude": -26.3, "longitude": -48.8, "status": "Aprovada"},
        {"id": "b-2", "Data": "2024/02/10", "Cidade": "Blumenau", "status": "Consulta",
         "latitude": null, "longitude": null}
    ]"#;

    struct CountingStore {
        inner: InMemoryStore,
        calls: AtomicUsize,
    }

    impl RecordStore for CountingStore {
        fn collection(&self) -> &str {
            self.inner.collection()
        }

        fn fetch_all(&self) -> Result<Vec<Record>, LeadsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_all()
        }

        fn fetch_filtered(&self, spec: &FilterSpec) -> Result<Vec<Record>, LeadsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_filtered(spec)
        }
    }

    #[test]
    fn json_dump_decodes_into_records() {
        let store = InMemoryStore::from_json_reader(DUMP.as_bytes()).unwrap();
        assert_eq!(store.records().len(), 2);
        assert_eq!(store.records()[0].id, "1");
        assert_eq!(store.records()[0].built_area, Some(1234.5));
        assert!(!store.records()[1].is_mapped());
    }

    #[test]
    fn undecodable_row_reports_its_position() {
        let body = r#"[{"id": 1, "status": "Aprovada"}, {"id": 2, "status": "Pendente"}]"#;
        match decode_rows("constructions", body) {
            Err(LeadsError::Decode { collection, details }) => {
                assert_eq!(collection, "constructions");
                assert!(details.starts_with("row 1:"), "details: {details}");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
        assert!(matches!(
            decode_rows("constructions", "{}"),
            Err(LeadsError::Decode { .. })
        ));
    }

    #[test]
    fn in_memory_store_filters_locally() {
        let store = InMemoryStore::from_json_reader(DUMP.as_bytes()).unwrap();
        let hits = store
            .fetch_filtered(&FilterSpec::with_status(Status::Consulta))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].city, "Blumenau");
    }

    #[test]
    fn cached_store_reuses_entries_and_normalizes_specs() {
        let store = CachedStore::new(CountingStore {
            inner: InMemoryStore::from_json_reader(DUMP.as_bytes()).unwrap(),
            calls: AtomicUsize::new(0),
        });

        assert_eq!(store.fetch_all().unwrap().len(), 2);
        assert_eq!(store.fetch_all().unwrap().len(), 2);
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 1);

        let spec = FilterSpec::with_search("alfa");
        let padded = FilterSpec {
            city: Some("  ".into()),
            ..FilterSpec::with_search(" alfa ")
        };
        assert_eq!(store.fetch_filtered(&spec).unwrap().len(), 1);
        assert_eq!(store.fetch_filtered(&padded).unwrap().len(), 1);
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.cache().len(), 2);
    }
}
