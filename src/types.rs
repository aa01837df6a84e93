/// Unique record identifier as stored by the backend.
/// Examples: `42`, `8f14e45f-ceea-467f-a0e6-0b1c7d6a2f91`
pub type RecordId = String;
/// Name of the backend table/collection records are read from.
/// Example: `constructions`
pub type CollectionName = String;
/// City name as written in the record.
/// Examples: `Joinville`, `Rio do Sul`
pub type CityName = String;
/// License type label as written in the record.
/// Examples: `LAO`, `Licença Ambiental Prévia`
pub type LicenseType = String;
/// Textual document date as stored by the backend.
/// Examples: `2024/03/18`, `2024-03-18`, `18/03/2024`
pub type DocumentDate = String;
/// Operation name used as the first half of a cache key.
/// Examples: `constructions`, `constructions_filtered`
pub type OperationName = String;
/// Free-text search term typed by the user.
/// Example: `rua xv`
pub type SearchTerm = String;
/// Opaque identifier of the container element a map is bound to.
/// Example: `map-root`
pub type ContainerId = String;
/// Map style identifier understood by the rendering SDK.
/// Examples: `mapbox://styles/mapbox/streets-v11`, `mapbox://styles/mapbox/light-v11`
pub type StyleUrl = String;
/// Transient user-facing notice text.
/// Example: `Interactive map unavailable, showing list view.`
pub type NoticeText = String;
