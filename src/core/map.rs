use crate::{
    core::{
        config::{CollectibleMode, MapConfig},
        crs::CoordinateSpace,
        geo::{LatLng, LatLngBox},
    },
    data::{
        payload::{MarkerData, MarkerPayload},
        source::{MarkerRequest, MarkerSource},
    },
    input::{
        deeplink::DeepLink,
        events::{MapEvent, UiEvent},
        handler::EventManager,
    },
    layers::{
        background::BackgroundLayer,
        marker::{Marker, MarkerId, PopupContent, StableKey},
        registry::{parse_combination, LayerRegistry, VisibilityChange},
    },
    prelude::{HashMap, HashSet},
    rendering::surface::{Readiness, RenderSurface},
    spatial::index::{IndexedMarker, MarkerIndex},
    storage::state::{DismissalKey, PersistentState},
    MapError, Result,
};
use crossbeam_channel::Receiver;
use futures::Future;
use std::collections::VecDeque;
use std::sync::Arc;

type ErrorHandler = Box<dyn FnMut(&MapError) + Send>;

/// Load state of a map, for "loading" / "failed to load" presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapStatus {
    /// No marker set has been ingested yet
    Loading,
    Ready,
    /// The first load failed; nothing usable is on the map
    Failed(String),
}

/// Outcome of a successful ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub generation: u64,
    /// Markers now on the map
    pub markers: usize,
    /// Every layer known after the ingestion, sorted
    pub layers: Vec<String>,
    /// Marker that will be focused because a link asked for it
    pub focus: Option<StableKey>,
}

/// An outstanding marker stream. Only the most recent ticket is accepted
/// by [`MapController::complete_stream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTicket {
    generation: u64,
    request: MarkerRequest,
}

impl StreamTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn request(&self) -> &MarkerRequest {
        &self.request
    }
}

/// Work that needs the rendering surface to be ready, kept in issue order
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingOp {
    Background(usize),
    Focus(StableKey),
    Unfocus,
}

/// A marker that passed validation but is not built yet
struct PlannedMarker<'a> {
    key: StableKey,
    layers: Vec<String>,
    data: &'a MarkerData,
}

/// Orchestrates one map: configuration, background, markers, user state and
/// the events exchanged with the UI.
///
/// Operations that need the rendering surface (installing a background,
/// focusing a marker) are queued until [`MapController::on_surface_ready`]
/// and then run in the order they were issued.
pub struct MapController<S: RenderSurface> {
    page: String,
    revision: Option<u64>,
    config: Arc<MapConfig>,
    crs: CoordinateSpace,
    surface: S,
    state: PersistentState,
    registry: LayerRegistry,
    markers: Vec<Marker>,
    keys: HashMap<StableKey, MarkerId>,
    index: MarkerIndex,
    background: Option<BackgroundLayer>,
    selected_background: usize,
    events: EventManager,
    link: Option<DeepLink>,
    requested_focus: Option<StableKey>,
    focused: Option<MarkerId>,
    pending: VecDeque<PendingOp>,
    readiness: Readiness,
    generation: u64,
    status: MapStatus,
    error_handler: Option<ErrorHandler>,
    removed: bool,
}

impl<S: RenderSurface> MapController<S> {
    /// Builds the controller for `page`. Configuration errors abort
    /// construction.
    pub fn new(
        page: impl Into<String>,
        config: Arc<MapConfig>,
        surface: S,
        state: PersistentState,
    ) -> Result<Self> {
        config.validate()?;
        let crs = config.coordinate_space()?;

        let mut registry = LayerRegistry::new();
        for id in config.groups.keys() {
            registry.register_with(id, config.initially_visible(id), None);
        }
        for id in config.layers.keys() {
            registry.register_with(
                id,
                config.initially_visible(id),
                config.exclusive_group(id).map(str::to_string),
            );
        }

        let mut controller = Self {
            page: page.into(),
            revision: None,
            config,
            crs,
            surface,
            state,
            registry,
            markers: Vec::new(),
            keys: HashMap::default(),
            index: MarkerIndex::new(),
            background: None,
            selected_background: 0,
            events: EventManager::new(),
            link: None,
            requested_focus: None,
            focused: None,
            pending: VecDeque::new(),
            readiness: Readiness::new(),
            generation: 0,
            status: MapStatus::Loading,
            error_handler: None,
            removed: false,
        };

        let restored = controller.state.background().unwrap_or(0);
        controller.selected_background = controller.clamp_background(restored);
        controller
            .pending
            .push_back(PendingOp::Background(controller.selected_background));

        if controller.surface.is_ready() {
            controller.on_surface_ready();
        }
        log::debug!(
            "map {} created with {} groups and {} layers",
            controller.page,
            controller.config.groups.len(),
            controller.registry.len()
        );
        Ok(controller)
    }

    /// Reads the page address; its `marker` parameter is focused once a
    /// matching marker has been ingested.
    pub fn with_link(mut self, url: &str) -> Result<Self> {
        let link = DeepLink::parse(url)?;
        self.requested_focus = link.marker();
        self.link = Some(link);
        Ok(self)
    }

    /// Pins marker streams to a page revision
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = Some(revision);
        self
    }

    /// Installs the handler called for failed loads and deferred operations
    pub fn on_error<F>(&mut self, handler: F)
    where
        F: FnMut(&MapError) + Send + 'static,
    {
        self.error_handler = Some(Box::new(handler));
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn config(&self) -> &Arc<MapConfig> {
        &self.config
    }

    pub fn coordinate_space(&self) -> &CoordinateSpace {
        &self.crs
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn status(&self) -> &MapStatus {
        &self.status
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn link(&self) -> Option<&DeepLink> {
        self.link.as_ref()
    }

    pub fn is_storage_degraded(&self) -> bool {
        self.state.is_degraded()
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    // --- readiness ---------------------------------------------------------------------------------

    /// Called once the rendering surface has finished its own setup. Runs
    /// every queued operation in issue order.
    pub fn on_surface_ready(&mut self) {
        if self.removed || !self.readiness.signal() {
            return;
        }
        log::debug!("surface ready, running {} queued operations", self.pending.len());
        while let Some(op) = self.pending.pop_front() {
            if let Err(e) = self.run(op) {
                self.report(&e);
            }
        }
        self.events.emit(MapEvent::Ready);
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Resolves once [`MapController::on_surface_ready`] has run
    pub fn wait_until_ready(&mut self) -> impl Future<Output = ()> + Send + 'static {
        self.readiness.wait()
    }

    fn schedule(&mut self, op: PendingOp) -> Result<()> {
        if self.readiness.is_ready() {
            self.run(op)
        } else {
            self.pending.push_back(op);
            Ok(())
        }
    }

    fn run(&mut self, op: PendingOp) -> Result<()> {
        match op {
            PendingOp::Background(index) => self.install_background(index),
            PendingOp::Focus(key) => self.open_focus(&key),
            PendingOp::Unfocus => {
                self.close_focus(true);
                Ok(())
            }
        }
    }

    // --- background --------------------------------------------------------------------------------

    /// Index of the selected background
    pub fn background(&self) -> usize {
        self.selected_background
    }

    /// Switches background. Out-of-range indices fall back to the first
    /// background. Returns the index actually used.
    pub fn set_background(&mut self, index: usize) -> Result<usize> {
        self.ensure_live()?;
        let index = self.clamp_background(index);
        if index != self.selected_background || self.background.is_none() {
            self.selected_background = index;
            self.schedule(PendingOp::Background(index))?;
        }
        self.state.set_background(index);
        Ok(index)
    }

    fn clamp_background(&self, index: usize) -> usize {
        if index < self.config.backgrounds.len() {
            index
        } else {
            if index != 0 {
                log::warn!("background {} does not exist, using the first one", index);
            }
            0
        }
    }

    fn install_background(&mut self, index: usize) -> Result<()> {
        let first = match self.background.take() {
            Some(current) => {
                current.uninstall(&mut self.surface);
                false
            }
            None => true,
        };
        let layer = BackgroundLayer::install(&self.config, &self.crs, index, &mut self.surface)?;
        self.background = Some(layer);
        if first {
            self.surface.fit_bounds(self.crs.render_bounds());
        }
        log::info!("background {} installed on {}", index, self.page);
        self.events.emit(MapEvent::BackgroundChanged { index });
        Ok(())
    }

    // --- ingestion ---------------------------------------------------------------------------------

    /// Replaces every marker with the contents of `payload`.
    ///
    /// The payload is validated before anything is touched: an unknown
    /// group or a duplicate key fails the whole batch and keeps the current
    /// markers.
    pub fn ingest(&mut self, payload: &MarkerPayload) -> Result<IngestReport> {
        self.ensure_live()?;
        self.generation += 1;
        self.apply_payload(self.generation, payload)
    }

    /// Starts an on-demand load. Any ticket issued before becomes stale.
    pub fn begin_stream(&mut self, layers: Option<Vec<String>>) -> Result<StreamTicket> {
        self.ensure_live()?;
        self.generation += 1;

        let mut request = MarkerRequest::new(self.page.clone());
        if let Some(revision) = self.revision {
            request = request.with_revision(revision);
        }
        if let Some(layers) = layers {
            request = request.with_layers(layers);
        }
        log::debug!("marker stream {} started for {}", self.generation, self.page);
        Ok(StreamTicket {
            generation: self.generation,
            request,
        })
    }

    /// Applies the response of a stream. Returns `Ok(None)` when a newer
    /// request has been issued since, in which case the response is dropped.
    pub fn complete_stream(
        &mut self,
        ticket: StreamTicket,
        response: Result<MarkerPayload>,
    ) -> Result<Option<IngestReport>> {
        self.ensure_live()?;
        if ticket.generation != self.generation {
            log::debug!(
                "dropping stale marker stream {} (current is {})",
                ticket.generation,
                self.generation
            );
            return Ok(None);
        }

        match response {
            Ok(payload) => self.apply_payload(ticket.generation, &payload).map(Some),
            Err(e) => {
                let error = match e {
                    MapError::FetchFailed(_) => e,
                    other => MapError::FetchFailed(other.to_string()),
                };
                self.fail(&error);
                Err(error)
            }
        }
    }

    /// Fetches markers from `source` and ingests them
    pub async fn stream_markers<M>(
        &mut self,
        source: &M,
        layers: Option<Vec<String>>,
    ) -> Result<Option<IngestReport>>
    where
        M: MarkerSource + ?Sized,
    {
        let ticket = self.begin_stream(layers)?;
        let response = source.fetch(ticket.request()).await;
        self.complete_stream(ticket, response)
    }

    fn apply_payload(&mut self, generation: u64, payload: &MarkerPayload) -> Result<IngestReport> {
        let planned = match self.plan(payload) {
            Ok(planned) => planned,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };
        log::info!("ingesting {} markers for {}", planned.len(), self.page);

        let previous_focus = self
            .focused
            .and_then(|id| self.markers.get(id.0 as usize))
            .map(|marker| marker.key().clone());
        self.clear_markers();
        if self.requested_focus.is_none() {
            self.requested_focus = previous_focus.clone();
        }

        let config = Arc::clone(&self.config);
        self.markers.reserve(planned.len());
        for (i, planned) in planned.into_iter().enumerate() {
            let id = MarkerId(i as u32);
            let combination = planned.layers.join(" ");
            self.registry.add_member(&combination, id);

            let style = config
                .group(&planned.layers[0])
                .map(|group| group.style())
                .ok_or_else(|| MapError::UnknownGroup(planned.layers[0].clone()))?;
            let mut marker = Marker::new(
                id,
                planned.key,
                planned.layers,
                planned.data.position(),
                planned.data.slots.clone(),
            );
            let handle = marker.place(&self.crs, &style, &mut self.surface)?;
            let dismissed = self.stored_dismissal(&marker);
            marker.settle(dismissed, &mut self.surface);
            if self.registry.is_marker_visible(id) {
                self.surface.add_layer(handle);
            }

            self.keys.insert(marker.key().clone(), id);
            self.markers.push(marker);
        }

        self.index = MarkerIndex::build(self.markers.iter().filter_map(|marker| {
            marker
                .render_position()
                .map(|position| IndexedMarker::new(marker.id(), position))
        }));
        self.status = MapStatus::Ready;
        self.events.emit(MapEvent::MarkersLoaded {
            generation,
            count: self.markers.len(),
        });

        let focus = match self.requested_focus.take() {
            Some(key) if self.keys.contains_key(&key) => {
                self.schedule(PendingOp::Focus(key.clone()))?;
                Some(key)
            }
            other => {
                self.requested_focus = other;
                None
            }
        };
        if focus.is_none() && previous_focus.is_some() && self.link_marker() == previous_focus {
            self.update_link(None);
        }

        log::debug!("ingestion {} done: {} markers", generation, self.markers.len());
        Ok(IngestReport {
            generation,
            markers: self.markers.len(),
            layers: self.registry.layers(),
            focus,
        })
    }

    /// Resolves groups and keys for every marker of a payload
    fn plan<'a>(&self, payload: &'a MarkerPayload) -> Result<Vec<PlannedMarker<'a>>> {
        let mut ordinals: HashMap<String, usize> = HashMap::default();
        let mut seen: HashSet<StableKey> = HashSet::default();
        let mut planned = Vec::with_capacity(payload.len());

        for (combination, markers) in payload.buckets() {
            let layers = parse_combination(combination);
            let group = match layers.first() {
                Some(group) => group.clone(),
                None => return Err(MapError::UnknownGroup(format!("{:?}", combination))),
            };
            if self.config.group(&group).is_none() {
                return Err(MapError::UnknownGroup(group));
            }
            let combination = layers.join(" ");

            for data in markers {
                let position = data.position();
                if !position.y.is_finite() || !position.x.is_finite() {
                    return Err(MapError::InvalidConfig(format!(
                        "marker in {} has a non-finite position",
                        combination
                    )));
                }
                let ordinal = ordinals.entry(group.clone()).or_insert(0);
                let key = StableKey::resolve(&data.slots, &combination, &position, *ordinal);
                *ordinal += 1;
                if !seen.insert(key.clone()) {
                    return Err(MapError::DuplicateMarkerKey(key.to_string()));
                }
                planned.push(PlannedMarker {
                    key,
                    layers: layers.clone(),
                    data,
                });
            }
        }
        Ok(planned)
    }

    fn clear_markers(&mut self) {
        // announced while the marker still exists
        self.close_focus(false);
        for marker in &mut self.markers {
            marker.remove(&mut self.surface);
        }
        self.markers.clear();
        self.keys.clear();
        self.index.clear();
        self.registry.clear_members();
    }

    fn stored_dismissal(&mut self, marker: &Marker) -> bool {
        let mode = self.collectible_mode(marker.group());
        DismissalKey::for_marker(mode, marker.group(), marker.key())
            .map(|key| self.state.is_dismissed(&key))
            .unwrap_or(false)
    }

    fn collectible_mode(&self, group: &str) -> CollectibleMode {
        self.config
            .group(group)
            .map(|group| group.collectible)
            .unwrap_or_default()
    }

    // --- markers -----------------------------------------------------------------------------------

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn marker(&self, key: &StableKey) -> Option<&Marker> {
        self.keys
            .get(key)
            .and_then(|id| self.markers.get(id.0 as usize))
    }

    fn marker_id(&self, key: &StableKey) -> Result<MarkerId> {
        self.keys
            .get(key)
            .copied()
            .ok_or_else(|| MapError::UnknownMarker(key.to_string()))
    }

    /// Whether a marker is currently shown
    pub fn is_marker_visible(&self, key: &StableKey) -> bool {
        self.keys
            .get(key)
            .map(|id| self.registry.is_marker_visible(*id))
            .unwrap_or(false)
    }

    /// Popup content with group fallbacks applied
    pub fn popup(&self, key: &StableKey) -> Option<PopupContent> {
        let marker = self.marker(key)?;
        let group = self.config.group(marker.group())?;
        Some(marker.popup(group))
    }

    /// Case-insensitive search over labels and group names of searchable
    /// groups, in marker order
    pub fn search(&self, query: &str) -> Vec<&Marker> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.markers
            .iter()
            .filter(|marker| {
                let group = match self.config.group(marker.group()) {
                    Some(group) if group.is_searchable => group,
                    _ => return false,
                };
                marker.title(group).to_lowercase().contains(&query)
                    || group.name.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Closest visible marker to a render-space point
    pub fn nearest_marker(&self, point: &LatLng) -> Option<&Marker> {
        self.index
            .nearest_where(point, |id| self.registry.is_marker_visible(id))
            .and_then(|id| self.markers.get(id.0 as usize))
    }

    /// Markers inside a render-space box, visible or not
    pub fn markers_in(&self, bounds: &LatLngBox) -> Vec<&Marker> {
        self.index
            .within(bounds)
            .into_iter()
            .filter_map(|id| self.markers.get(id.0 as usize))
            .collect()
    }

    // --- layers ------------------------------------------------------------------------------------

    /// Toggles a group or layer and shows/hides the affected markers.
    /// Only members of the toggled layers are looked at.
    pub fn set_layer_visibility(&mut self, layer: &str, visible: bool) -> Result<Vec<VisibilityChange>> {
        self.ensure_live()?;

        let switched_off: Vec<String> = if visible {
            self.registry
                .exclusive_partners(layer)
                .into_iter()
                .filter(|partner| self.registry.is_visible(partner) == Some(true))
                .collect()
        } else {
            Vec::new()
        };

        let changes = self.registry.set_visibility(layer, visible);
        self.events.emit(MapEvent::LayerToggled {
            layer: layer.to_string(),
            visible,
        });
        for partner in switched_off {
            self.events.emit(MapEvent::LayerToggled {
                layer: partner,
                visible: false,
            });
        }

        for change in &changes {
            let marker = match self.markers.get(change.marker.0 as usize) {
                Some(marker) => marker,
                None => continue,
            };
            if let Some(handle) = marker.handle() {
                if change.visible {
                    self.surface.add_layer(handle);
                } else {
                    self.surface.remove_layer(handle);
                }
            }
            self.events.emit(MapEvent::VisibilityChanged {
                marker: marker.key().clone(),
                visible: change.visible,
            });
            if !change.visible && self.focused == Some(change.marker) {
                self.close_focus(true);
            }
        }
        log::debug!(
            "layer {} -> {}: {} markers changed",
            layer,
            visible,
            changes.len()
        );
        Ok(changes)
    }

    // --- dismissal ---------------------------------------------------------------------------------

    /// Marks a marker as collected/dismissed, or clears the mark. The scope
    /// follows the group's collectible mode. Returns the markers that
    /// changed.
    pub fn set_dismissed(&mut self, key: &StableKey, dismissed: bool) -> Result<Vec<StableKey>> {
        self.ensure_live()?;
        let id = self.marker_id(key)?;
        let group = self.markers[id.0 as usize].group().to_string();
        let mode = self.collectible_mode(&group);
        let storage_key = DismissalKey::for_marker(mode, &group, key)
            .ok_or_else(|| MapError::NotCollectible(group.clone()))?;

        self.state.set_dismissed(&storage_key, dismissed);

        let mut changed = Vec::new();
        for marker in &mut self.markers {
            let affected = match mode {
                CollectibleMode::Individual => marker.id() == id,
                _ => marker.group() == group,
            };
            if affected && marker.set_dismissed(dismissed, &mut self.surface)? {
                changed.push(marker.key().clone());
            }
        }
        for marker in &changed {
            self.events.emit(MapEvent::MarkerDismissed {
                marker: marker.clone(),
                dismissed,
            });
        }
        Ok(changed)
    }

    /// Flips the dismissal of a marker. Returns the new state.
    pub fn toggle_dismissed(&mut self, key: &StableKey) -> Result<bool> {
        let dismissed = !self
            .marker(key)
            .ok_or_else(|| MapError::UnknownMarker(key.to_string()))?
            .is_dismissed();
        self.set_dismissed(key, dismissed)?;
        Ok(dismissed)
    }

    // --- focus -------------------------------------------------------------------------------------

    /// Marker whose popup is open
    pub fn focused(&self) -> Option<&StableKey> {
        self.focused
            .and_then(|id| self.markers.get(id.0 as usize))
            .map(Marker::key)
    }

    /// Pans to a marker and opens its popup, updating the link
    pub fn focus_marker(&mut self, key: &StableKey) -> Result<()> {
        self.ensure_live()?;
        self.marker_id(key)?;
        self.schedule(PendingOp::Focus(key.clone()))
    }

    /// Closes the popup of the focused marker, if any
    pub fn unfocus(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.schedule(PendingOp::Unfocus)
    }

    fn open_focus(&mut self, key: &StableKey) -> Result<()> {
        let id = self.marker_id(key)?;
        if self.focused == Some(id) {
            return Ok(());
        }
        self.close_focus(false);

        let marker = &self.markers[id.0 as usize];
        if let Some(position) = marker.render_position() {
            self.surface.pan_to(position, None);
        }
        if let Some(handle) = marker.handle() {
            self.surface.open_popup(handle);
        }
        self.focused = Some(id);
        self.events.emit(MapEvent::MarkerFocused {
            marker: key.clone(),
        });
        self.update_link(Some(key.clone()));
        Ok(())
    }

    fn close_focus(&mut self, clear_link: bool) {
        let id = match self.focused.take() {
            Some(id) => id,
            None => return,
        };
        self.surface.close_popup();
        if let Some(marker) = self.markers.get(id.0 as usize) {
            self.events.emit(MapEvent::MarkerUnfocused {
                marker: marker.key().clone(),
            });
        }
        if clear_link {
            self.update_link(None);
        }
    }

    fn link_marker(&self) -> Option<StableKey> {
        self.link.as_ref().and_then(DeepLink::marker)
    }

    fn update_link(&mut self, marker: Option<StableKey>) {
        if let Some(link) = &mut self.link {
            link.set_marker(marker.as_ref());
            let url = link.to_string();
            self.events.emit(MapEvent::LinkChanged { url });
        }
    }

    // --- UI events ---------------------------------------------------------------------------------

    /// Applies a request coming from the legend or a popup
    pub fn handle_event(&mut self, event: UiEvent) -> Result<()> {
        match event {
            UiEvent::ToggleLayer { layer, visible } => {
                self.set_layer_visibility(&layer, visible)?;
            }
            UiEvent::SelectBackground { index } => {
                self.set_background(index)?;
            }
            UiEvent::ToggleDismissed { marker } => {
                self.toggle_dismissed(&marker)?;
            }
            UiEvent::FocusMarker { marker } => self.focus_marker(&marker)?,
            UiEvent::ClearFocus => self.unfocus()?,
        }
        Ok(())
    }

    pub fn events_mut(&mut self) -> &mut EventManager {
        &mut self.events
    }

    /// Opens a channel receiving every event delivered from now on
    pub fn subscribe(&mut self) -> Receiver<MapEvent> {
        self.events.subscribe()
    }

    /// Delivers queued events to listeners and returns them
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        self.events.process_events()
    }

    // --- errors and teardown -----------------------------------------------------------------------

    fn ensure_live(&self) -> Result<()> {
        if self.removed {
            Err(MapError::MapRemoved)
        } else {
            Ok(())
        }
    }

    /// A load failed. The previous marker set, if any, stays in place.
    fn fail(&mut self, error: &MapError) {
        log::error!("loading markers for {} failed: {}", self.page, error);
        if self.status != MapStatus::Ready {
            self.status = MapStatus::Failed(error.to_string());
        }
        self.events.emit(MapEvent::LoadFailed {
            reason: error.to_string(),
        });
        self.report(error);
    }

    fn report(&mut self, error: &MapError) {
        if let Some(handler) = &mut self.error_handler {
            handler(error);
        } else {
            log::warn!("unhandled map error on {}: {}", self.page, error);
        }
    }

    /// Removes every render object. All later operations fail with
    /// [`MapError::MapRemoved`].
    pub fn teardown(&mut self) {
        if self.removed {
            return;
        }
        self.clear_markers();
        if self.link_marker().is_some() {
            self.update_link(None);
        }
        if let Some(background) = self.background.take() {
            background.uninstall(&mut self.surface);
        }
        self.pending.clear();
        self.readiness.close();
        self.removed = true;
        log::info!("map {} torn down", self.page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::config::{BackgroundDefinition, GroupDefinition},
        rendering::headless::HeadlessSurface,
    };

    fn config() -> Arc<MapConfig> {
        let mut config = MapConfig::default();
        config.backgrounds.push(BackgroundDefinition::new("Map.png"));
        config
            .groups
            .insert("chest".to_string(), GroupDefinition::new("Chests"));
        Arc::new(config)
    }

    fn payload() -> MarkerPayload {
        MarkerPayload::new()
            .with("chest", MarkerData::new(10.0, 10.0))
            .with("chest", MarkerData::new(20.0, 20.0))
            .with("chest cave", MarkerData::new(10.0, 10.0))
    }

    #[test]
    fn test_ordinals_are_per_group() {
        let controller = MapController::new(
            "Map:Test",
            config(),
            HeadlessSurface::new(),
            PersistentState::in_memory("Map:Test"),
        )
        .unwrap();
        let payload = payload();
        let planned = controller.plan(&payload).unwrap();
        let keys: Vec<&str> = planned.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "chest@10.000:10.000#0",
                "chest@20.000:20.000#1",
                "chest cave@10.000:10.000#2",
            ]
        );
    }

    #[test]
    fn test_queued_until_ready() {
        let mut controller = MapController::new(
            "Map:Test",
            config(),
            HeadlessSurface::pending(),
            PersistentState::in_memory("Map:Test"),
        )
        .unwrap();
        assert!(!controller.is_ready());
        assert_eq!(controller.pending, VecDeque::from(vec![PendingOp::Background(0)]));

        controller.ingest(&payload()).unwrap();
        let key = controller.markers()[1].key().clone();
        controller.focus_marker(&key).unwrap();
        assert!(controller.focused().is_none());
        assert_eq!(controller.pending.len(), 2);

        controller.surface_mut().mark_ready();
        controller.on_surface_ready();
        assert!(controller.pending.is_empty());
        assert_eq!(controller.focused(), Some(&key));
        assert!(controller.surface().popup().is_some());
    }

    #[test]
    fn test_teardown_blocks_operations() {
        let mut controller = MapController::new(
            "Map:Test",
            config(),
            HeadlessSurface::new(),
            PersistentState::in_memory("Map:Test"),
        )
        .unwrap();
        controller.ingest(&payload()).unwrap();
        assert!(controller.surface().object_count() > 0);

        controller.teardown();
        assert_eq!(controller.surface().object_count(), 0);
        assert!(controller.is_removed());
        assert!(matches!(controller.ingest(&payload()), Err(MapError::MapRemoved)));
        assert!(matches!(controller.set_background(0), Err(MapError::MapRemoved)));
    }

    #[test]
    fn test_teardown_releases_ready_waiters() {
        use futures::FutureExt;

        let mut controller = MapController::new(
            "Map:Test",
            config(),
            HeadlessSurface::pending(),
            PersistentState::in_memory("Map:Test"),
        )
        .unwrap();
        let mut ready = Box::pin(controller.wait_until_ready());
        assert!((&mut ready).now_or_never().is_none());

        controller.teardown();
        assert!(!controller.is_ready());
        assert!(ready.now_or_never().is_some());
    }
}
