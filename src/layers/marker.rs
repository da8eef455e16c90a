use crate::{
    constants::KEY_COORD_PRECISION,
    core::{
        config::GroupDefinition,
        crs::CoordinateSpace,
        geo::{LatLng, NativePoint},
    },
    rendering::surface::{create_marker, MarkerStyle, RenderHandle, RenderSurface},
    MapError, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a marker within its map. Only meaningful for one ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u32);

/// Identifier that survives reloads; used for persistence and deep links
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableKey(String);

impl StableKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives a key from the marker's layer combination, position and its
    /// ordinal among markers of the same group.
    pub fn derive(combination: &str, position: &NativePoint, ordinal: usize) -> Self {
        Self(format!(
            "{}@{:.prec$}:{:.prec$}#{}",
            combination,
            position.y,
            position.x,
            ordinal,
            prec = KEY_COORD_PRECISION
        ))
    }

    /// Explicit `uid` if the marker has one, the derived key otherwise
    pub fn resolve(
        slots: &MarkerSlots,
        combination: &str,
        position: &NativePoint,
        ordinal: usize,
    ) -> Self {
        match slots.uid.as_deref() {
            Some(uid) if !uid.is_empty() => Self::new(uid),
            _ => Self::derive(combination, position, ordinal),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StableKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Optional per-marker data
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarkerSlots {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "desc", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// Lifecycle of a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerState {
    /// Ingested, not yet on the surface
    Unplaced,
    /// On the surface, dismissal not yet applied
    Placed,
    Active,
    Dismissed,
    /// Torn down; no further operations are valid
    Removed,
}

/// Popup fields with group fallbacks applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupContent {
    pub title: String,
    pub group: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub article: Option<String>,
}

/// One placed marker
#[derive(Debug, Clone)]
pub struct Marker {
    id: MarkerId,
    key: StableKey,
    layers: Vec<String>,
    position: NativePoint,
    render_position: Option<LatLng>,
    slots: MarkerSlots,
    handle: Option<RenderHandle>,
    state: MarkerState,
}

impl Marker {
    /// Creates an unplaced marker. `layers[0]` is the owning group.
    pub fn new(
        id: MarkerId,
        key: StableKey,
        layers: Vec<String>,
        position: NativePoint,
        slots: MarkerSlots,
    ) -> Self {
        Self {
            id,
            key,
            layers,
            position,
            render_position: None,
            slots,
            handle: None,
            state: MarkerState::Unplaced,
        }
    }

    pub fn id(&self) -> MarkerId {
        self.id
    }

    pub fn key(&self) -> &StableKey {
        &self.key
    }

    pub fn group(&self) -> &str {
        self.layers.first().map(String::as_str).unwrap_or_default()
    }

    /// Every attached layer, group first
    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    pub fn combination(&self) -> String {
        self.layers.join(" ")
    }

    pub fn position(&self) -> NativePoint {
        self.position
    }

    pub fn render_position(&self) -> Option<LatLng> {
        self.render_position
    }

    pub fn slots(&self) -> &MarkerSlots {
        &self.slots
    }

    pub fn handle(&self) -> Option<RenderHandle> {
        self.handle
    }

    pub fn state(&self) -> MarkerState {
        self.state
    }

    pub fn is_dismissed(&self) -> bool {
        self.state == MarkerState::Dismissed
    }

    pub fn is_removed(&self) -> bool {
        self.state == MarkerState::Removed
    }

    /// Transforms the position and creates the render object. The object is
    /// not shown; visibility is decided by the layer registry.
    pub fn place<S: RenderSurface + ?Sized>(
        &mut self,
        crs: &CoordinateSpace,
        style: &MarkerStyle,
        surface: &mut S,
    ) -> Result<RenderHandle> {
        if self.is_removed() {
            return Err(MapError::MapRemoved);
        }
        if let Some(handle) = self.handle {
            return Ok(handle);
        }

        let position = crs.point_to_render(&self.position);
        let handle = create_marker(surface, position, style);
        self.render_position = Some(position);
        self.handle = Some(handle);
        self.state = MarkerState::Placed;
        Ok(handle)
    }

    /// Applies the persisted dismissal flag to a freshly placed marker
    pub fn settle<S: RenderSurface + ?Sized>(&mut self, dismissed: bool, surface: &mut S) {
        if self.state == MarkerState::Placed {
            self.apply_dismissed(dismissed, surface);
        }
    }

    /// Updates dismissal state and styling. Returns whether anything changed.
    pub fn set_dismissed<S: RenderSurface + ?Sized>(
        &mut self,
        dismissed: bool,
        surface: &mut S,
    ) -> Result<bool> {
        match self.state {
            MarkerState::Removed => Err(MapError::MapRemoved),
            MarkerState::Unplaced => Err(MapError::UnknownMarker(format!(
                "{} has not been placed",
                self.key
            ))),
            MarkerState::Dismissed if dismissed => Ok(false),
            MarkerState::Active if !dismissed => Ok(false),
            _ => {
                self.apply_dismissed(dismissed, surface);
                Ok(true)
            }
        }
    }

    fn apply_dismissed<S: RenderSurface + ?Sized>(&mut self, dismissed: bool, surface: &mut S) {
        self.state = if dismissed {
            MarkerState::Dismissed
        } else {
            MarkerState::Active
        };
        if let Some(handle) = self.handle {
            surface.set_dismissed(handle, dismissed);
        }
    }

    /// Releases the render object. Valid from any state.
    pub fn remove<S: RenderSurface + ?Sized>(&mut self, surface: &mut S) {
        if let Some(handle) = self.handle.take() {
            surface.release(handle);
        }
        self.state = MarkerState::Removed;
    }

    /// Label, falling back to the group name
    pub fn title<'a>(&'a self, group: &'a GroupDefinition) -> &'a str {
        self.slots.label.as_deref().unwrap_or(&group.name)
    }

    /// Linked article; the marker's own overrides the group's
    pub fn article<'a>(&'a self, group: &'a GroupDefinition) -> Option<&'a str> {
        self.slots
            .article
            .as_deref()
            .or(group.article.as_deref())
    }

    pub fn popup(&self, group: &GroupDefinition) -> PopupContent {
        PopupContent {
            title: self.title(group).to_string(),
            group: group.name.clone(),
            description: self.slots.description.clone(),
            image: self.slots.image.clone(),
            article: self.article(group).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::headless::HeadlessSurface;

    fn marker(slots: MarkerSlots) -> Marker {
        let layers = vec!["chest".to_string(), "cave".to_string()];
        let position = NativePoint::new(25.0, 75.0);
        let key = StableKey::resolve(&slots, &layers.join(" "), &position, 0);
        Marker::new(MarkerId(0), key, layers, position, slots)
    }

    #[test]
    fn test_derived_key_is_deterministic() {
        let position = NativePoint::new(25.0, 75.12345);
        let first = StableKey::derive("chest cave", &position, 2);
        let second = StableKey::derive("chest cave", &position, 2);
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "chest cave@25.000:75.123#2");
        assert_ne!(first, StableKey::derive("chest cave", &position, 3));
    }

    #[test]
    fn test_uid_overrides_derived_key() {
        let slots = MarkerSlots {
            uid: Some("golden-chest".to_string()),
            ..Default::default()
        };
        assert_eq!(marker(slots).key().as_str(), "golden-chest");

        let empty_uid = MarkerSlots {
            uid: Some(String::new()),
            ..Default::default()
        };
        assert!(marker(empty_uid).key().as_str().starts_with("chest cave@"));
    }

    #[test]
    fn test_lifecycle() {
        let crs = CoordinateSpace::from_corners([[100.0, 100.0], [0.0, 0.0]]).unwrap();
        let group = GroupDefinition::new("Chests");
        let mut surface = HeadlessSurface::new();
        let mut marker = marker(MarkerSlots::default());
        assert_eq!(marker.state(), MarkerState::Unplaced);
        assert!(marker.set_dismissed(true, &mut surface).is_err());

        let handle = marker.place(&crs, &group.style(), &mut surface).unwrap();
        assert_eq!(marker.state(), MarkerState::Placed);
        assert_eq!(marker.render_position(), Some(LatLng::new(25.0, 75.0)));
        assert_eq!(marker.place(&crs, &group.style(), &mut surface).unwrap(), handle);

        marker.settle(false, &mut surface);
        assert_eq!(marker.state(), MarkerState::Active);

        assert!(marker.set_dismissed(true, &mut surface).unwrap());
        assert!(!marker.set_dismissed(true, &mut surface).unwrap());
        assert!(surface.is_dismissed(handle));

        marker.remove(&mut surface);
        assert!(marker.is_removed());
        assert_eq!(surface.object_count(), 0);
        assert!(matches!(
            marker.set_dismissed(false, &mut surface),
            Err(MapError::MapRemoved)
        ));
    }

    #[test]
    fn test_popup_fallbacks() {
        let group = GroupDefinition::new("Chests").with_article("Chest");
        let plain = marker(MarkerSlots::default());
        let popup = plain.popup(&group);
        assert_eq!(popup.title, "Chests");
        assert_eq!(popup.article.as_deref(), Some("Chest"));

        let custom = marker(MarkerSlots {
            label: Some("Golden chest".to_string()),
            article: Some("Golden Chest".to_string()),
            ..Default::default()
        });
        assert_eq!(custom.title(&group), "Golden chest");
        assert_eq!(custom.article(&group), Some("Golden Chest"));
    }
}
