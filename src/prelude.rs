//! Prelude module for common datamaps types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use datamaps::prelude::*;`

pub use crate::core::{
    config::{
        BackgroundDefinition, CollectibleMode, GroupDefinition, LayerDefinition, MapConfig,
        OverlayDefinition,
    },
    crs::{CoordinateSpace, CrsOrigin},
    geo::{LatLng, LatLngBox, NativeBox, NativePoint},
    map::{IngestReport, MapController, MapStatus, StreamTicket},
};

pub use crate::layers::{
    marker::{Marker, MarkerId, MarkerSlots, MarkerState, StableKey},
    registry::{LayerRegistry, VisibilityChange},
};

pub use crate::data::{
    payload::{MarkerData, MarkerPayload},
    source::{ApiMarkerSource, MarkerRequest, MarkerSource, StaticMarkerSource},
};

pub use crate::input::{
    deeplink::DeepLink,
    events::{MapEvent, MapEventKind, UiEvent},
    handler::EventManager,
};

pub use crate::rendering::{
    headless::HeadlessSurface,
    surface::{MarkerStyle, RenderHandle, RenderSurface},
};

pub use crate::storage::{
    DismissalKey, FileStorage, MemoryStorage, PersistentState, StorageBackend,
};

pub use crate::{Error as MapError, Result};

pub use std::sync::Arc;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};
