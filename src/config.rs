use std::time::Duration;

use tracing::{info, warn};

use crate::constants::cache::DEFAULT_TTL;
use crate::constants::controller::DEFAULT_DEBOUNCE;
use crate::constants::env;
use crate::constants::map::{DEFAULT_CENTER, DEFAULT_ZOOM, LIGHT_STYLE, PRIMARY_STYLE};
use crate::constants::store::{DEFAULT_COLLECTION, DEFAULT_PROJECTION, REST_PATH};
use crate::errors::LeadsError;
use crate::types::{CollectionName, StyleUrl};
use crate::utils::non_blank;

/// Connection settings for a Supabase project's PostgREST endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    /// Anonymous API key sent as `apikey` and bearer token.
    pub api_key: String,
    /// Table holding the rows.
    pub collection: CollectionName,
    /// Column projection passed as `select`.
    pub projection: String,
}

impl SupabaseConfig {
    /// Settings for `base_url` with the default table and projection.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            collection: DEFAULT_COLLECTION.to_string(),
            projection: DEFAULT_PROJECTION.to_string(),
        }
    }

    /// Endpoint serving the configured table.
    pub fn table_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim().trim_end_matches('/'),
            REST_PATH,
            self.collection.trim()
        )
    }

    /// Reject settings that cannot produce a request.
    pub fn validate(&self) -> Result<(), LeadsError> {
        let base_url = self.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(LeadsError::Configuration(format!(
                "{} must be an http(s) URL, got '{}'",
                env::SUPABASE_URL, self.base_url
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(LeadsError::Configuration(format!(
                "{} must not be empty",
                env::SUPABASE_ANON_KEY
            )));
        }
        if self.collection.trim().is_empty() {
            return Err(LeadsError::Configuration(
                "collection name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Initial map placement and styles.
#[derive(Clone, Debug, PartialEq)]
pub struct MapConfig {
    /// Initial center as `(longitude, latitude)`.
    pub center: (f64, f64),
    /// Initial zoom level.
    pub zoom: f64,
    /// Style used for the first attempt.
    pub style: StyleUrl,
    /// Lighter style used for retries.
    pub fallback_style: StyleUrl,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            style: PRIMARY_STYLE.to_string(),
            fallback_style: LIGHT_STYLE.to_string(),
        }
    }
}

/// Runtime configuration for the whole app.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// Backend connection, `None` when no project URL is configured.
    pub supabase: Option<SupabaseConfig>,
    /// Map placement and styles.
    pub map: MapConfig,
    /// Lifetime of cached backend reads.
    pub cache_ttl: Duration,
    /// Quiet period for filter, search, and category changes.
    pub debounce: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase: None,
            map: MapConfig::default(),
            cache_ttl: DEFAULT_TTL,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl AppConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self, LeadsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, for runs that never contact the backend.
    pub fn from_env_offline() -> Result<Self, LeadsError> {
        Self::from_lookup_offline(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Unset or blank variables keep their defaults. Present but invalid
    /// values are a `LeadsError::Configuration`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LeadsError> {
        Self::build(lookup, true)
    }

    /// Build configuration without resolving the backend connection.
    ///
    /// `SUPABASE_*` variables are ignored, so a half-configured backend does
    /// not block reading records from a local dump.
    pub fn from_lookup_offline(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, LeadsError> {
        Self::build(lookup, false)
    }

    fn build(
        lookup: impl Fn(&str) -> Option<String>,
        with_backend: bool,
    ) -> Result<Self, LeadsError> {
        let read = |key: &str| {
            lookup(key).and_then(|value| non_blank(Some(value.as_str())).map(str::to_string))
        };
        let mut config = Self::default();

        if with_backend {
            config.supabase = read_backend(&read)?;
        } else if read(env::SUPABASE_URL).is_some() || read(env::SUPABASE_ANON_KEY).is_some() {
            info!("[construleads:config] offline run, ignoring SUPABASE_* variables");
        }

        if let Some(value) = read(env::CACHE_TTL_SECS) {
            config.cache_ttl = Duration::from_secs(parse_number(env::CACHE_TTL_SECS, &value)?);
        }
        if let Some(value) = read(env::DEBOUNCE_MS) {
            config.debounce = Duration::from_millis(parse_number(env::DEBOUNCE_MS, &value)?);
        }
        if let Some(style) = read(env::MAP_STYLE) {
            config.map.style = style;
        }
        if let Some(value) = read(env::MAP_LON) {
            config.map.center.0 = parse_bounded(env::MAP_LON, &value, -180.0, 180.0)?;
        }
        if let Some(value) = read(env::MAP_LAT) {
            config.map.center.1 = parse_bounded(env::MAP_LAT, &value, -90.0, 90.0)?;
        }
        if let Some(value) = read(env::MAP_ZOOM) {
            config.map.zoom = parse_bounded(env::MAP_ZOOM, &value, 0.0, 24.0)?;
        }

        info!(
            "[construleads:config] cache_ttl={}s debounce={}ms map_center=({}, {}) zoom={}",
            config.cache_ttl.as_secs(),
            config.debounce.as_millis(),
            config.map.center.0,
            config.map.center.1,
            config.map.zoom
        );
        Ok(config)
    }
}

fn read_backend(
    read: &impl Fn(&str) -> Option<String>,
) -> Result<Option<SupabaseConfig>, LeadsError> {
    match (read(env::SUPABASE_URL), read(env::SUPABASE_ANON_KEY)) {
        (Some(url), Some(key)) => {
            let mut supabase = SupabaseConfig::new(url, key);
            if let Some(collection) = read(env::COLLECTION) {
                supabase.collection = collection;
            }
            supabase.validate()?;
            Ok(Some(supabase))
        }
        (Some(_), None) => Err(LeadsError::Configuration(format!(
            "{} is set but {} is missing",
            env::SUPABASE_URL,
            env::SUPABASE_ANON_KEY
        ))),
        (None, Some(_)) => {
            warn!(
                "[construleads:config] {} is set but {} is missing; no backend configured",
                env::SUPABASE_ANON_KEY,
                env::SUPABASE_URL
            );
            Ok(None)
        }
        (None, None) => {
            info!(
                "[construleads:config] {} not set; no backend configured",
                env::SUPABASE_URL
            );
            Ok(None)
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, LeadsError> {
    value.parse::<u64>().map_err(|err| {
        LeadsError::Configuration(format!("{key} must be a non-negative integer, got '{value}': {err}"))
    })
}

fn parse_bounded(key: &str, value: &str, min: f64, max: f64) -> Result<f64, LeadsError> {
    let parsed = value.parse::<f64>().map_err(|err| {
        LeadsError::Configuration(format!("{key} must be a number, got '{value}': {err}"))
    })?;
    if !parsed.is_finite() || parsed < min || parsed > max {
        return Err(LeadsError::Configuration(format!(
            "{key} must be within [{min}, {max}], got {parsed}"
        )));
    }
    Ok(parsed)
}
