//! Map synchronization.
//!
//! Ownership model:
//! - `MapBackend` is the rendering SDK seam. It creates maps and markers and
//!   hands back opaque handles.
//! - `MapSynchronizer` is the only owner of those handles. It drives the
//!   capability check, creation, retry with a lighter style, fallback, and
//!   disposal, and keeps live markers equal to the displayed records that have
//!   usable coordinates.
//! - Load and error events are delivered by the host through `on_load` and
//!   `on_error`; the synchronizer never blocks waiting for them.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::capability::Capabilities;
use crate::config::MapConfig;
use crate::constants::map::{
    FIT_MAX_ZOOM, FIT_PADDING, MAX_RETRIES, NOTICE_MAP_FAILED, NOTICE_MAP_RETRY,
    NOTICE_MAP_UNSUPPORTED, POPUP_OFFSET,
};
use crate::data::{GeoPoint, Record, Status};
use crate::errors::MapError;
use crate::types::{ContainerId, NoticeText, RecordId, StyleUrl};

/// In-memory map backend.
pub mod headless;

pub use headless::HeadlessMap;

/// Parameters for creating one map instance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapOptions {
    /// Initial center as `(longitude, latitude)`.
    pub center: (f64, f64),
    /// Initial zoom.
    pub zoom: f64,
    /// Style to load.
    pub style: StyleUrl,
}

/// Text shown in a record's popup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PopupContent {
    /// Company name, used as the popup title.
    pub title: String,
    /// Street address.
    pub address: String,
    /// Status label.
    pub status: String,
}

impl PopupContent {
    /// Popup for `record`.
    pub fn for_record(record: &Record) -> Self {
        Self {
            title: record.company_name.trim().to_string(),
            address: record.address.trim().to_string(),
            status: record.status.as_str().to_string(),
        }
    }
}

/// Everything a backend needs to place one marker.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarkerSpec {
    /// Record the marker stands for.
    pub record_id: RecordId,
    /// Marker position.
    pub position: GeoPoint,
    /// Status, used by backends to pick a marker color.
    pub status: Status,
    /// Popup opened when the marker is clicked.
    pub popup: PopupContent,
    /// Popup offset above the anchor, in pixels.
    pub popup_offset: u32,
}

impl MarkerSpec {
    /// Marker for `record`, or `None` when it has no usable coordinates.
    pub fn for_record(record: &Record) -> Option<Self> {
        let position = record.coordinates()?;
        Some(Self {
            record_id: record.id.clone(),
            position,
            status: record.status,
            popup: PopupContent::for_record(record),
            popup_offset: POPUP_OFFSET,
        })
    }
}

/// Geographic bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bounds {
    /// Minimum latitude and longitude.
    pub south_west: GeoPoint,
    /// Maximum latitude and longitude.
    pub north_east: GeoPoint,
}

impl Bounds {
    /// Smallest box containing every point, or `None` for no points.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = Bounds {
            south_west: first,
            north_east: first,
        };
        for point in points {
            bounds.south_west.latitude = bounds.south_west.latitude.min(point.latitude);
            bounds.south_west.longitude = bounds.south_west.longitude.min(point.longitude);
            bounds.north_east.latitude = bounds.north_east.latitude.max(point.latitude);
            bounds.north_east.longitude = bounds.north_east.longitude.max(point.longitude);
        }
        Some(bounds)
    }
}

/// Viewport fitting parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FitOptions {
    /// Padding around the bounds, in pixels.
    pub padding: u32,
    /// Highest zoom the fit may reach.
    pub max_zoom: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            padding: FIT_PADDING,
            max_zoom: FIT_MAX_ZOOM,
        }
    }
}

/// Rendering SDK operations used by the synchronizer.
///
/// Handles are owned by the caller once returned; the backend must release a
/// marker in `remove_marker` and a map in `dispose`.
pub trait MapBackend {
    /// Handle for one live map instance.
    type Map;
    /// Handle for one live marker.
    type Marker;

    /// Create a map bound to `container`. Loading continues asynchronously and
    /// is reported through `MapSynchronizer::on_load` / `on_error`.
    fn create_map(&mut self, container: &str, options: &MapOptions) -> Result<Self::Map, MapError>;
    /// Attach zoom/rotation controls.
    fn add_navigation_control(&mut self, map: &mut Self::Map) -> Result<(), MapError>;
    /// Place a marker.
    fn add_marker(
        &mut self,
        map: &mut Self::Map,
        marker: &MarkerSpec,
    ) -> Result<Self::Marker, MapError>;
    /// Remove a marker placed by `add_marker`.
    fn remove_marker(&mut self, map: &mut Self::Map, marker: Self::Marker);
    /// Open the popup attached to `marker`.
    fn open_popup(
        &mut self,
        map: &mut Self::Map,
        marker: &Self::Marker,
        popup: &PopupContent,
    ) -> Result<(), MapError>;
    /// Move the viewport so `bounds` is visible.
    fn fit_bounds(
        &mut self,
        map: &mut Self::Map,
        bounds: &Bounds,
        options: &FitOptions,
    ) -> Result<(), MapError>;
    /// Tear the map down.
    fn dispose(&mut self, map: Self::Map);
}

/// Why the list view replaced the map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    /// Capabilities ruled the map out before creation.
    Unsupported,
    /// Creation or loading kept failing after every retry.
    Failed(MapError),
}

/// Lifecycle state of one synchronizer.
#[derive(Clone, Debug, PartialEq)]
pub enum MapState {
    /// Not mounted yet.
    Uninitialized,
    /// List view is shown instead of the map for the rest of this mount.
    Fallback {
        /// Cause of the fallback.
        reason: FallbackReason,
    },
    /// First map instance created, waiting for load.
    Initializing {
        /// Style being loaded.
        style: StyleUrl,
    },
    /// Map recreated after an error, waiting for load.
    Retrying {
        /// Retry number, starting at 1.
        attempt: u32,
        /// Style being loaded.
        style: StyleUrl,
    },
    /// Map loaded; markers track the displayed records.
    Ready,
    /// Unmounted. Terminal.
    Disposed,
}

impl MapState {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            MapState::Uninitialized => "uninitialized",
            MapState::Fallback { .. } => "fallback",
            MapState::Initializing { .. } => "initializing",
            MapState::Retrying { .. } => "retrying",
            MapState::Ready => "ready",
            MapState::Disposed => "disposed",
        }
    }

    fn awaiting_load(&self) -> bool {
        matches!(self, MapState::Initializing { .. } | MapState::Retrying { .. })
    }
}

impl fmt::Display for MapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct MarkerBinding<M> {
    record_id: RecordId,
    popup: PopupContent,
    handle: M,
}

/// Keeps one map instance and its markers in step with the displayed records.
pub struct MapSynchronizer<B: MapBackend> {
    backend: B,
    config: MapConfig,
    container: Option<ContainerId>,
    state: MapState,
    map: Option<B::Map>,
    markers: Vec<MarkerBinding<B::Marker>>,
    records: Vec<Record>,
    rendered: bool,
    retries: u32,
    notices: Vec<NoticeText>,
}

impl<B: MapBackend> MapSynchronizer<B> {
    /// Synchronizer driving `backend` with `config`.
    pub fn new(backend: B, config: MapConfig) -> Self {
        Self {
            backend,
            config,
            container: None,
            state: MapState::Uninitialized,
            map: None,
            markers: Vec::new(),
            records: Vec::new(),
            rendered: false,
            retries: 0,
            notices: Vec::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &MapState {
        &self.state
    }

    /// The backend, for inspection.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of live markers.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Record ids of live markers, in placement order.
    pub fn marker_record_ids(&self) -> Vec<&str> {
        self.markers
            .iter()
            .map(|binding| binding.record_id.as_str())
            .collect()
    }

    /// Retries used so far in this mount.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Records for the list view while in fallback, `None` otherwise.
    pub fn fallback_view(&self) -> Option<&[Record]> {
        match self.state {
            MapState::Fallback { .. } => Some(&self.records),
            _ => None,
        }
    }

    /// Drain transient notices queued for the user.
    pub fn take_notices(&mut self) -> Vec<NoticeText> {
        std::mem::take(&mut self.notices)
    }

    /// Mount on `container`.
    ///
    /// Unsupported capabilities go straight to fallback and no map is ever
    /// created. Mounting twice is ignored.
    pub fn mount(&mut self, container: impl Into<ContainerId>, capabilities: &Capabilities) {
        if self.state != MapState::Uninitialized {
            warn!(
                "[construleads:map] mount ignored in state {}",
                self.state
            );
            return;
        }
        let container = container.into();
        info!(
            "[construleads:map] mounting on '{}' (map_supported={})",
            container,
            capabilities.map_supported()
        );
        self.container = Some(container);
        if !capabilities.map_supported() {
            self.enter_fallback(FallbackReason::Unsupported, NOTICE_MAP_UNSUPPORTED);
            return;
        }
        let style = self.config.style.clone();
        self.start_attempt(style);
    }

    /// The current map instance finished loading.
    pub fn on_load(&mut self) {
        if !self.state.awaiting_load() {
            debug!(
                "[construleads:map] load event ignored in state {}",
                self.state
            );
            return;
        }
        info!("[construleads:map] map ready after {} retries", self.retries);
        self.state = MapState::Ready;
        self.render();
    }

    /// The current map instance reported an error.
    ///
    /// While a map exists the instance is torn down and recreated with the
    /// lighter style, up to the retry limit; after that the list view takes
    /// over for the rest of the mount.
    pub fn on_error(&mut self, error: MapError) {
        if !(self.state.awaiting_load() || self.state == MapState::Ready) {
            debug!(
                "[construleads:map] error ignored in state {}: {}",
                self.state, error
            );
            return;
        }
        self.handle_failure(error);
    }

    /// Replace the displayed records.
    ///
    /// A structurally identical set leaves existing markers untouched. Sets
    /// pushed before the map is ready are rendered once it loads.
    pub fn set_records(&mut self, records: &[Record]) {
        if self.rendered && self.records.as_slice() == records {
            debug!("[construleads:map] record set unchanged, keeping markers");
            return;
        }
        self.records = records.to_vec();
        self.rendered = false;
        if self.state == MapState::Ready {
            self.render();
        }
    }

    /// Click the marker for `record_id`: open its popup and return the record.
    pub fn click_marker(&mut self, record_id: &str) -> Option<Record> {
        let binding = self
            .markers
            .iter()
            .find(|binding| binding.record_id == record_id)?;
        if let Some(map) = self.map.as_mut()
            && let Err(err) = self
                .backend
                .open_popup(map, &binding.handle, &binding.popup)
        {
            warn!("[construleads:map] popup for '{record_id}' failed: {err}");
        }
        self.records
            .iter()
            .find(|record| record.id == record_id)
            .cloned()
    }

    /// Unmount: remove every marker and dispose the map. Terminal.
    pub fn unmount(&mut self) {
        if self.state == MapState::Disposed {
            return;
        }
        self.teardown();
        info!("[construleads:map] disposed (was {})", self.state);
        self.state = MapState::Disposed;
    }

    fn start_attempt(&mut self, style: StyleUrl) {
        let Some(container) = self.container.clone() else {
            return;
        };
        loop {
            let options = MapOptions {
                center: self.config.center,
                zoom: self.config.zoom,
                style: style.clone(),
            };
            let created = self.backend.create_map(&container, &options).and_then(|mut map| {
                match self.backend.add_navigation_control(&mut map) {
                    Ok(()) => Ok(map),
                    Err(err) => {
                        self.backend.dispose(map);
                        Err(err)
                    }
                }
            });
            match created {
                Ok(map) => {
                    self.map = Some(map);
                    self.state = if self.retries == 0 {
                        MapState::Initializing { style }
                    } else {
                        MapState::Retrying {
                            attempt: self.retries,
                            style,
                        }
                    };
                    return;
                }
                Err(err) => {
                    warn!("[construleads:map] map creation failed: {err}");
                    if !self.consume_retry(err) {
                        return;
                    }
                }
            }
        }
    }

    fn handle_failure(&mut self, error: MapError) {
        warn!(
            "[construleads:map] map error in state {}: {}",
            self.state, error
        );
        self.teardown();
        if self.consume_retry(error) {
            let style = self.config.fallback_style.clone();
            self.start_attempt(style);
        }
    }

    /// Count one retry, or fall back when none are left. Returns whether to retry.
    fn consume_retry(&mut self, error: MapError) -> bool {
        if self.retries >= MAX_RETRIES {
            self.enter_fallback(FallbackReason::Failed(error), NOTICE_MAP_FAILED);
            return false;
        }
        self.retries += 1;
        info!(
            "[construleads:map] retry {}/{} with style {}",
            self.retries, MAX_RETRIES, self.config.fallback_style
        );
        self.notices.push(NOTICE_MAP_RETRY.to_string());
        true
    }

    fn enter_fallback(&mut self, reason: FallbackReason, notice: &str) {
        info!(
            "[construleads:map] falling back to list view: {:?}",
            reason
        );
        self.teardown();
        self.state = MapState::Fallback { reason };
        self.notices.push(notice.to_string());
    }

    fn render(&mut self) {
        let Some(map) = self.map.as_mut() else {
            return;
        };
        for binding in self.markers.drain(..) {
            self.backend.remove_marker(map, binding.handle);
        }

        let mut positions = Vec::new();
        for record in &self.records {
            let Some(spec) = MarkerSpec::for_record(record) else {
                continue;
            };
            match self.backend.add_marker(map, &spec) {
                Ok(handle) => {
                    positions.push(spec.position);
                    self.markers.push(MarkerBinding {
                        record_id: spec.record_id,
                        popup: spec.popup,
                        handle,
                    });
                }
                Err(err) => {
                    warn!(
                        "[construleads:map] skipping marker for '{}': {}",
                        record.id, err
                    );
                }
            }
        }

        if let Some(bounds) = Bounds::enclosing(positions)
            && let Err(err) = self
                .backend
                .fit_bounds(map, &bounds, &FitOptions::default())
        {
            warn!("[construleads:map] fitting viewport failed: {err}");
        }
        self.rendered = true;
        debug!(
            "[construleads:map] rendered {} markers for {} records",
            self.markers.len(),
            self.records.len()
        );
    }

    fn teardown(&mut self) {
        if let Some(mut map) = self.map.take() {
            for binding in self.markers.drain(..) {
                self.backend.remove_marker(&mut map, binding.handle);
            }
            self.backend.dispose(map);
        }
        self.markers.clear();
        self.rendered = false;
    }
}

impl<B: MapBackend> Drop for MapSynchronizer<B> {
    fn drop(&mut self) {
        self.unmount();
    }
}
