use crate::{
    layers::marker::MarkerId,
    prelude::{HashMap, HashSet},
};
use std::collections::BTreeSet;

/// A marker whose effective visibility flipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityChange {
    pub marker: MarkerId,
    pub visible: bool,
}

#[derive(Debug, Clone)]
struct LayerState {
    visible: bool,
    exclusive: Option<String>,
    members: HashSet<MarkerId>,
}

impl LayerState {
    fn new(visible: bool, exclusive: Option<String>) -> Self {
        Self {
            visible,
            exclusive,
            members: HashSet::default(),
        }
    }
}

/// Splits a layer-combination key into its layers, group first.
/// Repeated layers are dropped.
pub fn parse_combination(combination: &str) -> Vec<String> {
    let mut layers: Vec<String> = Vec::new();
    for token in combination.split_whitespace() {
        if !layers.iter().any(|layer| layer == token) {
            layers.push(token.to_string());
        }
    }
    layers
}

/// Tracks layer toggles and which markers each layer holds.
///
/// A marker is visible only while every one of its layers is visible.
/// Toggling a layer only re-evaluates that layer's members.
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    layers: HashMap<String, LayerState>,
    memberships: HashMap<MarkerId, Vec<String>>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a layer that starts visible. Returns `false` if it was
    /// already known.
    pub fn register(&mut self, layer: &str) -> bool {
        self.register_with(layer, true, None)
    }

    /// Registers a layer with its initial toggle and exclusive group. Known
    /// layers keep their current state.
    pub fn register_with(&mut self, layer: &str, visible: bool, exclusive: Option<String>) -> bool {
        if self.layers.contains_key(layer) {
            return false;
        }
        self.layers
            .insert(layer.to_string(), LayerState::new(visible, exclusive));
        true
    }

    pub fn contains(&self, layer: &str) -> bool {
        self.layers.contains_key(layer)
    }

    /// Attaches a marker to every layer of a combination key, registering
    /// unseen layers on the way. Returns the parsed layers.
    pub fn add_member(&mut self, combination: &str, marker: MarkerId) -> Vec<String> {
        let layers = parse_combination(combination);
        for layer in &layers {
            self.register(layer);
            if let Some(state) = self.layers.get_mut(layer) {
                state.members.insert(marker);
            }
        }
        self.memberships.insert(marker, layers.clone());
        layers
    }

    /// Drops every membership, keeping layers and their toggles
    pub fn clear_members(&mut self) {
        for state in self.layers.values_mut() {
            state.members.clear();
        }
        self.memberships.clear();
    }

    /// Toggle state of a layer, `None` if unknown
    pub fn is_visible(&self, layer: &str) -> Option<bool> {
        self.layers.get(layer).map(|state| state.visible)
    }

    /// Effective visibility of a marker: the AND of all its layers
    pub fn is_marker_visible(&self, marker: MarkerId) -> bool {
        match self.memberships.get(&marker) {
            Some(layers) => layers
                .iter()
                .all(|layer| self.is_visible(layer).unwrap_or(true)),
            None => false,
        }
    }

    /// Markers attached to a layer, in id order
    pub fn members(&self, layer: &str) -> Vec<MarkerId> {
        let mut members: Vec<MarkerId> = self
            .layers
            .get(layer)
            .map(|state| state.members.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub fn marker_layers(&self, marker: MarkerId) -> Option<&[String]> {
        self.memberships.get(&marker).map(Vec::as_slice)
    }

    /// All known layers, sorted
    pub fn layers(&self) -> Vec<String> {
        let mut layers: Vec<String> = self.layers.keys().cloned().collect();
        layers.sort();
        layers
    }

    /// Other layers sharing an exclusive group with `layer`
    pub fn exclusive_partners(&self, layer: &str) -> Vec<String> {
        let group = match self.layers.get(layer).and_then(|state| state.exclusive.as_ref()) {
            Some(group) => group,
            None => return Vec::new(),
        };
        let mut partners: Vec<String> = self
            .layers
            .iter()
            .filter(|(id, state)| id.as_str() != layer && state.exclusive.as_ref() == Some(group))
            .map(|(id, _)| id.clone())
            .collect();
        partners.sort();
        partners
    }

    /// Sets a layer's toggle and returns the markers whose visibility flipped.
    ///
    /// Switching on a layer of an exclusive group switches the rest of the
    /// group off in the same step. Unknown layers are registered first.
    pub fn set_visibility(&mut self, layer: &str, visible: bool) -> Vec<VisibilityChange> {
        self.register(layer);

        let mut updates = vec![(layer.to_string(), visible)];
        if visible {
            for partner in self.exclusive_partners(layer) {
                updates.push((partner, false));
            }
        }
        self.apply(&updates)
    }

    fn apply(&mut self, updates: &[(String, bool)]) -> Vec<VisibilityChange> {
        let touched: BTreeSet<MarkerId> = updates
            .iter()
            .filter_map(|(layer, _)| self.layers.get(layer))
            .flat_map(|state| state.members.iter().copied())
            .collect();

        let before: Vec<bool> = touched
            .iter()
            .map(|marker| self.is_marker_visible(*marker))
            .collect();

        for (layer, visible) in updates {
            if let Some(state) = self.layers.get_mut(layer) {
                state.visible = *visible;
            }
        }

        touched
            .into_iter()
            .zip(before)
            .filter_map(|(marker, was_visible)| {
                let visible = self.is_marker_visible(marker);
                (visible != was_visible).then_some(VisibilityChange { marker, visible })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
