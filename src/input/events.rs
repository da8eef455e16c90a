use crate::layers::marker::StableKey;

/// Requests coming from the legend, popups and other UI collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Legend checkbox for a group or layer
    ToggleLayer { layer: String, visible: bool },
    /// Background picker
    SelectBackground { index: usize },
    /// Collect/dismiss button in a marker popup
    ToggleDismissed { marker: StableKey },
    /// Marker clicked or searched for
    FocusMarker { marker: StableKey },
    /// Popup closed
    ClearFocus,
}

/// Notifications emitted by the map controller
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Rendering surface became ready and deferred work has run
    Ready,
    BackgroundChanged { index: usize },
    LayerToggled { layer: String, visible: bool },
    VisibilityChanged { marker: StableKey, visible: bool },
    MarkerDismissed { marker: StableKey, dismissed: bool },
    MarkerFocused { marker: StableKey },
    MarkerUnfocused { marker: StableKey },
    /// The shareable link changed; hosts should replace the address bar
    LinkChanged { url: String },
    /// Markers of an ingestion are in place
    MarkersLoaded { generation: u64, count: usize },
    /// Loading failed; the map keeps its previous markers
    LoadFailed { reason: String },
}

/// Discriminant of [`MapEvent`], used to register listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapEventKind {
    Ready,
    BackgroundChanged,
    LayerToggled,
    VisibilityChanged,
    MarkerDismissed,
    MarkerFocused,
    MarkerUnfocused,
    LinkChanged,
    MarkersLoaded,
    LoadFailed,
}

impl MapEvent {
    pub fn kind(&self) -> MapEventKind {
        match self {
            MapEvent::Ready => MapEventKind::Ready,
            MapEvent::BackgroundChanged { .. } => MapEventKind::BackgroundChanged,
            MapEvent::LayerToggled { .. } => MapEventKind::LayerToggled,
            MapEvent::VisibilityChanged { .. } => MapEventKind::VisibilityChanged,
            MapEvent::MarkerDismissed { .. } => MapEventKind::MarkerDismissed,
            MapEvent::MarkerFocused { .. } => MapEventKind::MarkerFocused,
            MapEvent::MarkerUnfocused { .. } => MapEventKind::MarkerUnfocused,
            MapEvent::LinkChanged { .. } => MapEventKind::LinkChanged,
            MapEvent::MarkersLoaded { .. } => MapEventKind::MarkersLoaded,
            MapEvent::LoadFailed { .. } => MapEventKind::LoadFailed,
        }
    }

    /// Marker the event is about, if any
    pub fn marker(&self) -> Option<&StableKey> {
        match self {
            MapEvent::VisibilityChanged { marker, .. }
            | MapEvent::MarkerDismissed { marker, .. }
            | MapEvent::MarkerFocused { marker }
            | MapEvent::MarkerUnfocused { marker } => Some(marker),
            _ => None,
        }
    }
}
