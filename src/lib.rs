//! # DataMaps
//!
//! A marker-map core inspired by Leaflet's `CRS.Simple` maps.
//!
//! Maps are authored in an arbitrary coordinate space and rendered in a
//! normalised 0-100 space. Markers are organised into groups and layers that
//! can be toggled, may be collected or dismissed with the choice persisted
//! locally, and can be linked to directly through a URL parameter.
//!
//! The rendering engine, the storage medium and the marker data source are
//! collaborators behind traits; [`rendering::headless::HeadlessSurface`] and
//! [`storage::MemoryStorage`] are provided for headless use and tests.

pub mod core;
pub mod data;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod rendering;
pub mod spatial;
pub mod storage;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{CollectibleMode, GroupDefinition, MapConfig},
    crs::{CoordinateSpace, CrsOrigin},
    geo::{LatLng, LatLngBox, NativeBox, NativePoint},
    map::{MapController, MapStatus},
};

pub use layers::{
    marker::{Marker, MarkerId, MarkerSlots, MarkerState, StableKey},
    registry::LayerRegistry,
};

pub use data::{
    payload::{MarkerData, MarkerPayload},
    source::{ApiMarkerSource, MarkerRequest, MarkerSource, StaticMarkerSource},
};

pub use input::{deeplink::DeepLink, events::MapEvent, events::UiEvent, handler::EventManager};

pub use rendering::{headless::HeadlessSurface, surface::RenderSurface};

pub use storage::{FileStorage, MemoryStorage, PersistentState, StorageBackend};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Invalid coordinate space: {0}")]
    InvalidCoordinateSpace(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown marker group: {0}")]
    UnknownGroup(String),

    #[error("Duplicate marker key: {0}")]
    DuplicateMarkerKey(String),

    #[error("Unknown marker: {0}")]
    UnknownMarker(String),

    #[error("Group {0} is not collectible")]
    NotCollectible(String),

    #[error("Marker fetch failed: {0}")]
    FetchFailed(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Map has been torn down")]
    MapRemoved,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MapError {
    /// Whether the error aborts map construction rather than a single operation
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MapError::InvalidCoordinateSpace(_) | MapError::InvalidConfig(_)
        )
    }
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs `env_logger` as the `log` backend. Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
