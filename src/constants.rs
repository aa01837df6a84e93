/// Constants used by the record store and its PostgREST wire format.
pub mod store {
    /// Default backend table holding construction license rows.
    pub const DEFAULT_COLLECTION: &str = "constructions";
    /// Default projection requested from the backend.
    pub const DEFAULT_PROJECTION: &str = "*";
    /// Path prefix of the PostgREST API under a Supabase project URL.
    pub const REST_PATH: &str = "rest/v1";

    /// Column holding the textual document date.
    pub const COLUMN_DATE: &str = "Data";
    /// Column holding the license type.
    pub const COLUMN_LICENSE_TYPE: &str = "Tipo de Licença";
    /// Column holding the street address.
    pub const COLUMN_ADDRESS: &str = "Endereço";
    /// Column holding the company name.
    pub const COLUMN_COMPANY: &str = "Nome da Empresa";
    /// Column holding the city name.
    pub const COLUMN_CITY: &str = "Cidade";
    /// Column holding the license status.
    pub const COLUMN_STATUS: &str = "status";

    /// Columns matched by free-text search, in evaluation order.
    pub const SEARCH_COLUMNS: [&str; 3] = [COLUMN_ADDRESS, COLUMN_COMPANY, COLUMN_CITY];
}

/// Constants used by the client-side cache.
pub mod cache {
    use std::time::Duration;

    /// Lifetime of a cache entry.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60);
    /// Operation name for the full collection read.
    pub const OP_FETCH_ALL: &str = "constructions";
    /// Operation name for backend-filtered reads.
    pub const OP_FETCH_FILTERED: &str = "constructions_filtered";
    /// Separator between the operation name and serialized params.
    pub const KEY_SEPARATOR: &str = ":";
}

/// Constants used by the map synchronizer.
pub mod map {
    /// Default map center as `(longitude, latitude)`, Santa Catarina.
    pub const DEFAULT_CENTER: (f64, f64) = (-49.6401, -27.2423);
    /// Default zoom level when the map is created.
    pub const DEFAULT_ZOOM: f64 = 9.0;
    /// Primary map style.
    pub const PRIMARY_STYLE: &str = "mapbox://styles/mapbox/streets-v11";
    /// Lighter style used when the primary style fails to load.
    pub const LIGHT_STYLE: &str = "mapbox://styles/mapbox/light-v11";
    /// Maximum number of re-initializations after a map error.
    pub const MAX_RETRIES: u32 = 2;
    /// Padding in pixels applied when fitting the viewport to markers.
    pub const FIT_PADDING: u32 = 50;
    /// Highest zoom level a viewport fit may reach.
    pub const FIT_MAX_ZOOM: f64 = 15.0;
    /// Popup offset in pixels above the marker anchor.
    pub const POPUP_OFFSET: u32 = 25;
    /// Notice shown when the map falls back to the list view after errors.
    pub const NOTICE_MAP_FAILED: &str = "Interactive map failed to load, showing list view.";
    /// Notice shown when the device cannot render the map.
    pub const NOTICE_MAP_UNSUPPORTED: &str = "Interactive map unavailable on this device, showing list view.";
    /// Notice shown when the map is retried with a lighter style.
    pub const NOTICE_MAP_RETRY: &str = "Map error, retrying with a lighter style.";
}

/// Constants used by the device capability heuristic.
pub mod capability {
    /// Lowercased user-agent tokens that mark a mobile or tablet device.
    pub const MOBILE_UA_TOKENS: [&str; 10] = [
        "android",
        "webos",
        "iphone",
        "ipad",
        "ipod",
        "blackberry",
        "iemobile",
        "opera mini",
        "mobile",
        "tablet",
    ];
    /// Viewport width below which a touch device is treated as mobile.
    pub const MOBILE_VIEWPORT_MAX_WIDTH: u32 = 768;
}

/// Constants used by the page controller.
pub mod controller {
    use std::time::Duration;

    /// Quiet period applied to filter, search, and category changes.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
}

/// Environment variables read by `AppConfig::from_env`.
pub mod env {
    /// Supabase project URL.
    pub const SUPABASE_URL: &str = "SUPABASE_URL";
    /// Supabase anonymous API key.
    pub const SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
    /// Backend table override.
    pub const COLLECTION: &str = "CONSTRULEADS_COLLECTION";
    /// Cache TTL override in seconds.
    pub const CACHE_TTL_SECS: &str = "CONSTRULEADS_CACHE_TTL_SECS";
    /// Debounce override in milliseconds.
    pub const DEBOUNCE_MS: &str = "CONSTRULEADS_DEBOUNCE_MS";
    /// Map style override.
    pub const MAP_STYLE: &str = "CONSTRULEADS_MAP_STYLE";
    /// Map center latitude override.
    pub const MAP_LAT: &str = "CONSTRULEADS_MAP_LAT";
    /// Map center longitude override.
    pub const MAP_LON: &str = "CONSTRULEADS_MAP_LON";
    /// Map zoom override.
    pub const MAP_ZOOM: &str = "CONSTRULEADS_MAP_ZOOM";
}
