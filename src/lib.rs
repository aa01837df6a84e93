#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Short-lived memoization of backend reads.
pub mod cache;
/// Device capability detection for the interactive map.
pub mod capability;
/// Command-line entry point shared by the `construleads` binary.
pub mod cli;
/// Runtime configuration and environment loading.
pub mod config;
/// Centralized constants used across stores, cache, map, and controller.
pub mod constants;
/// Page controller sequencing load, filtering, and selection.
pub mod controller;
/// Construction record types.
pub mod data;
/// Document date parsing and comparison.
pub mod dates;
/// Quiet-period value staging.
pub mod debounce;
/// Filter option lists and counts.
pub mod facets;
/// Filter specification and the local evaluator.
pub mod filter;
/// Map synchronizer and rendering backend seam.
pub mod map;
/// Record store trait and implementations.
pub mod store;
/// Shared type aliases.
pub mod types;
/// Text normalization helpers.
pub mod utils;

mod errors;

pub use cache::{CacheKey, CacheStats, Clock, ManualClock, SystemClock, TtlCache};
pub use capability::{Capabilities, CapabilityProbe, DeviceProfile, StaticProbe};
pub use config::{AppConfig, MapConfig, SupabaseConfig};
pub use controller::{FilterMode, FilterRequest, LoadStatus, PageController, Update};
pub use data::{GeoPoint, Record, Status};
pub use errors::{LeadsError, MapError};
pub use facets::Facets;
pub use filter::{Category, DateRange, FilterSpec, StatusFilter, apply};
pub use map::{
    Bounds, FallbackReason, FitOptions, HeadlessMap, MapBackend, MapOptions, MapState,
    MapSynchronizer, MarkerSpec, PopupContent,
};
#[cfg(feature = "supabase")]
pub use store::SupabaseStore;
pub use store::{CachedStore, InMemoryStore, PostgrestQuery, RecordStore};
pub use types::{
    CityName, CollectionName, ContainerId, DocumentDate, LicenseType, NoticeText, OperationName,
    RecordId, SearchTerm, StyleUrl,
};
