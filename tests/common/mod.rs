#![allow(dead_code)]

use datamaps::prelude::*;
use datamaps::MapError;
use std::sync::Mutex;

pub const PAGE: &str = "Map:Forest";

pub const CONFIG: &str = r##"{
    "crs": [[0, 0], [100, 100]],
    "backgrounds": [
        { "name": "Surface", "image": "Surface.png" },
        {
            "name": "Caves",
            "image": "Caves.png",
            "overlays": [ { "name": "Tunnel", "path": [[10, 10], [20, 20]], "color": "#f00" } ]
        }
    ],
    "groups": {
        "chest": { "name": "Chests", "icon": "Chest.png", "collectible": "individual", "article": "Chest" },
        "ore": { "name": "Ore veins", "fillColor": "#c0c0c0", "collectible": "group" },
        "shrine": { "name": "Shrines", "collectible": "globalGroup" },
        "npc": { "name": "Villagers", "isSearchable": false },
        "boss": { "name": "Bosses" }
    },
    "layers": {
        "cave": { "name": "Caves" },
        "surface": { "exclusive": "depth" },
        "underground": { "exclusive": "depth", "hidden": true }
    }
}"##;

pub const PAYLOAD: &str = r##"{
    "chest": [
        { "lat": 25, "lon": 75, "label": "Golden chest" },
        { "lat": 50, "lon": 50 }
    ],
    "chest cave": [ { "lat": 10, "lon": 20, "desc": "Behind the waterfall" } ],
    "ore": [ { "lat": 30, "lon": 30 }, { "lat": 31, "lon": 31 } ],
    "shrine": [ { "lat": 60, "lon": 60, "uid": "sky-shrine" } ],
    "npc": [ { "lat": 70, "lon": 70, "label": "Old man" } ],
    "boss surface": [ { "lat": 80, "lon": 80, "uid": "dragon", "label": "Dragon" } ],
    "boss underground": [ { "lat": 85, "lon": 85, "uid": "worm" } ]
}"##;

pub fn config() -> Arc<MapConfig> {
    Arc::new(MapConfig::from_json(CONFIG).unwrap())
}

pub fn payload() -> MarkerPayload {
    MarkerPayload::from_json(PAYLOAD).unwrap()
}

pub fn key(key: &str) -> StableKey {
    StableKey::new(key)
}

/// Ready map on a shared in-memory storage
pub fn map_with(page: &str, storage: &MemoryStorage) -> MapController<HeadlessSurface> {
    MapController::new(
        page,
        config(),
        HeadlessSurface::new(),
        PersistentState::new(page, Box::new(storage.clone())),
    )
    .unwrap()
}

pub fn map() -> MapController<HeadlessSurface> {
    map_with(PAGE, &MemoryStorage::new())
}

pub fn loaded_map() -> MapController<HeadlessSurface> {
    let mut map = map();
    map.ingest(&payload()).unwrap();
    map
}

/// Whether a marker's render object is currently shown
pub fn shown(map: &MapController<HeadlessSurface>, marker: &str) -> bool {
    map.marker(&key(marker))
        .and_then(|marker| marker.handle())
        .map(|handle| map.surface().is_shown(handle))
        .unwrap_or(false)
}

/// Storage that fails every call
pub struct BrokenStorage;

impl StorageBackend for BrokenStorage {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(MapError::StorageUnavailable("quota exceeded".to_string()))
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
        Err(MapError::StorageUnavailable("quota exceeded".to_string()))
    }
}

/// Collects errors passed to the map's error handler
pub fn capture_errors(map: &mut MapController<HeadlessSurface>) -> Arc<Mutex<Vec<String>>> {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    map.on_error(move |error| {
        if let Ok(mut errors) = sink.lock() {
            errors.push(error.to_string());
        }
    });
    errors
}
