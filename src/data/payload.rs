//! Marker payload format
//!
//! Payloads are JSON objects keyed by layer-combination strings, each holding
//! the markers placed in that combination:
//!
//! ```json
//! { "chest cave": [ { "lat": 25, "lon": 75, "label": "Hidden chest" } ] }
//! ```

use crate::{
    core::geo::NativePoint,
    layers::{marker::MarkerSlots, registry::parse_combination},
    Result,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single marker as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerData {
    pub lat: f64,
    pub lon: f64,
    #[serde(flatten)]
    pub slots: MarkerSlots,
}

impl MarkerData {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            slots: MarkerSlots::default(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.slots.label = Some(label.into());
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.slots.uid = Some(uid.into());
        self
    }

    pub fn position(&self) -> NativePoint {
        NativePoint::new(self.lat, self.lon)
    }
}

/// Markers grouped by layer-combination key. Buckets iterate in key order,
/// which keeps derived marker keys stable across loads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerPayload {
    buckets: BTreeMap<String, Vec<MarkerData>>,
}

impl MarkerPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    pub fn push(&mut self, combination: impl Into<String>, marker: MarkerData) {
        self.buckets.entry(combination.into()).or_default().push(marker);
    }

    /// Builder-style variant of [`MarkerPayload::push`]
    pub fn with(mut self, combination: impl Into<String>, marker: MarkerData) -> Self {
        self.push(combination, marker);
        self
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&str, &[MarkerData])> {
        self.buckets
            .iter()
            .map(|(combination, markers)| (combination.as_str(), markers.as_slice()))
    }

    /// Number of markers across all buckets
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keeps only buckets tagged with at least one of `layers`
    pub fn filtered(&self, layers: &[String]) -> Self {
        let buckets = self
            .buckets
            .iter()
            .filter(|(combination, _)| {
                parse_combination(combination)
                    .iter()
                    .any(|layer| layers.contains(layer))
            })
            .map(|(combination, markers)| (combination.clone(), markers.clone()))
            .collect();
        Self { buckets }
    }
}
