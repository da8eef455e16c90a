//! Marker data: the payload format and where it comes from

pub mod payload;
pub mod source;

pub use payload::{MarkerData, MarkerPayload};
pub use source::{ApiMarkerSource, MarkerRequest, MarkerSource, StaticMarkerSource};
