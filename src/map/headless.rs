use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::errors::MapError;
use crate::map::{Bounds, FitOptions, MapBackend, MapOptions, MarkerSpec, PopupContent};
use crate::types::{ContainerId, RecordId};

/// Handle to a map created by `HeadlessMap`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HeadlessMapId(u64);

/// Handle to a marker created by `HeadlessMap`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HeadlessMarkerId(u64);

/// Observable state of one headless map instance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeadlessMapView {
    /// Container the map was created on.
    pub container: ContainerId,
    /// Creation options.
    pub options: MapOptions,
    /// Navigation controls attached.
    pub controls: u32,
    /// Most recent viewport fit.
    pub fitted: Option<(Bounds, FitOptions)>,
}

#[derive(Default)]
struct HeadlessWorld {
    next_id: u64,
    maps: BTreeMap<u64, HeadlessMapView>,
    markers: BTreeMap<u64, MarkerSpec>,
    created_maps: u32,
    disposed_maps: u32,
    opened_popups: Vec<RecordId>,
    pending_create_failures: u32,
    failing_markers: HashSet<RecordId>,
}

impl HeadlessWorld {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Map backend that renders nothing and records everything.
///
/// Clones share state, so a test can keep one handle for inspection while a
/// synchronizer owns another. Creation and marker failures can be injected.
#[derive(Clone, Default)]
pub struct HeadlessMap {
    world: Arc<Mutex<HeadlessWorld>>,
}

impl HeadlessMap {
    /// Fresh backend with no maps.
    pub fn new() -> Self {
        Self::default()
    }

    fn world(&self) -> MutexGuard<'_, HeadlessWorld> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `count` calls to `create_map` fail.
    pub fn fail_next_creates(&self, count: u32) {
        self.world().pending_create_failures = count;
    }

    /// Make every marker for `record_id` fail to be created.
    pub fn fail_marker(&self, record_id: impl Into<RecordId>) {
        self.world().failing_markers.insert(record_id.into());
    }

    /// Markers currently placed, across all maps.
    pub fn live_markers(&self) -> Vec<MarkerSpec> {
        self.world().markers.values().cloned().collect()
    }

    /// Number of markers currently placed.
    pub fn live_marker_count(&self) -> usize {
        self.world().markers.len()
    }

    /// Maps created and not yet disposed.
    pub fn live_maps(&self) -> Vec<HeadlessMapView> {
        self.world().maps.values().cloned().collect()
    }

    /// Total successful `create_map` calls.
    pub fn created_maps(&self) -> u32 {
        self.world().created_maps
    }

    /// Total `dispose` calls.
    pub fn disposed_maps(&self) -> u32 {
        self.world().disposed_maps
    }

    /// Record ids whose popups were opened, in order.
    pub fn opened_popups(&self) -> Vec<RecordId> {
        self.world().opened_popups.clone()
    }
}

impl MapBackend for HeadlessMap {
    type Map = HeadlessMapId;
    type Marker = HeadlessMarkerId;

    fn create_map(&mut self, container: &str, options: &MapOptions) -> Result<Self::Map, MapError> {
        let mut world = self.world();
        if world.pending_create_failures > 0 {
            world.pending_create_failures -= 1;
            return Err(MapError::Create {
                container: container.to_string(),
                reason: "injected creation failure".into(),
            });
        }
        let id = world.allocate();
        world.maps.insert(
            id,
            HeadlessMapView {
                container: container.to_string(),
                options: options.clone(),
                controls: 0,
                fitted: None,
            },
        );
        world.created_maps += 1;
        Ok(HeadlessMapId(id))
    }

    fn add_navigation_control(&mut self, map: &mut Self::Map) -> Result<(), MapError> {
        let mut world = self.world();
        let view = world
            .maps
            .get_mut(&map.0)
            .ok_or_else(|| MapError::Runtime(format!("unknown map {}", map.0)))?;
        view.controls += 1;
        Ok(())
    }

    fn add_marker(
        &mut self,
        map: &mut Self::Map,
        marker: &MarkerSpec,
    ) -> Result<Self::Marker, MapError> {
        let mut world = self.world();
        if !world.maps.contains_key(&map.0) {
            return Err(MapError::Runtime(format!("unknown map {}", map.0)));
        }
        if world.failing_markers.contains(&marker.record_id) {
            return Err(MapError::Marker {
                record_id: marker.record_id.clone(),
                reason: "injected marker failure".into(),
            });
        }
        let id = world.allocate();
        world.markers.insert(id, marker.clone());
        Ok(HeadlessMarkerId(id))
    }

    fn remove_marker(&mut self, _map: &mut Self::Map, marker: Self::Marker) {
        self.world().markers.remove(&marker.0);
    }

    fn open_popup(
        &mut self,
        _map: &mut Self::Map,
        marker: &Self::Marker,
        _popup: &PopupContent,
    ) -> Result<(), MapError> {
        let mut world = self.world();
        let record_id = world
            .markers
            .get(&marker.0)
            .map(|spec| spec.record_id.clone())
            .ok_or_else(|| MapError::Runtime(format!("unknown marker {}", marker.0)))?;
        world.opened_popups.push(record_id);
        Ok(())
    }

    fn fit_bounds(
        &mut self,
        map: &mut Self::Map,
        bounds: &Bounds,
        options: &FitOptions,
    ) -> Result<(), MapError> {
        let mut world = self.world();
        let view = world
            .maps
            .get_mut(&map.0)
            .ok_or_else(|| MapError::Runtime(format!("unknown map {}", map.0)))?;
        view.fitted = Some((*bounds, *options));
        Ok(())
    }

    fn dispose(&mut self, map: Self::Map) {
        let mut world = self.world();
        if world.maps.remove(&map.0).is_some() {
            world.disposed_maps += 1;
        }
    }
}
