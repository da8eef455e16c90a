pub mod background;
pub mod marker;
pub mod registry;

pub use background::BackgroundLayer;
pub use marker::{Marker, MarkerId, MarkerSlots, MarkerState, PopupContent, StableKey};
pub use registry::{parse_combination, LayerRegistry, VisibilityChange};
