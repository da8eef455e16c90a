use crate::{
    core::geo::{LatLng, LatLngBox},
    prelude::{HashMap, HashSet},
    rendering::surface::{CircleStyle, IconStyle, RenderHandle, RenderSurface, ShapeStyle},
};

/// Object recorded by the [`HeadlessSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum SceneObject {
    IconMarker { position: LatLng, style: IconStyle },
    CircleMarker { position: LatLng, style: CircleStyle },
    ImageOverlay { image: String, bounds: LatLngBox },
    Rectangle { bounds: LatLngBox, style: ShapeStyle },
    Polyline { path: Vec<LatLng>, style: ShapeStyle },
}

impl SceneObject {
    pub fn position(&self) -> Option<LatLng> {
        match self {
            SceneObject::IconMarker { position, .. } | SceneObject::CircleMarker { position, .. } => {
                Some(*position)
            }
            _ => None,
        }
    }
}

/// Current camera of the headless surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View {
    Center { center: LatLng, zoom: Option<f64> },
    Fit(LatLngBox),
}

/// Surface that keeps an in-memory scene instead of drawing.
///
/// Used by the command-line viewer and by tests to observe what the core
/// asked the renderer to do.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    next_handle: u64,
    objects: HashMap<RenderHandle, SceneObject>,
    shown: HashSet<RenderHandle>,
    dismissed: HashSet<RenderHandle>,
    popup: Option<RenderHandle>,
    view: Option<View>,
    not_ready: bool,
}

impl HeadlessSurface {
    /// A surface that is ready immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface that reports not ready until [`HeadlessSurface::mark_ready`]
    pub fn pending() -> Self {
        Self {
            not_ready: true,
            ..Self::default()
        }
    }

    pub fn mark_ready(&mut self) {
        self.not_ready = false;
    }

    pub fn object(&self, handle: RenderHandle) -> Option<&SceneObject> {
        self.objects.get(&handle)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_shown(&self, handle: RenderHandle) -> bool {
        self.shown.contains(&handle)
    }

    /// Shown objects, ordered by handle
    pub fn shown(&self) -> Vec<RenderHandle> {
        let mut shown: Vec<_> = self.shown.iter().copied().collect();
        shown.sort();
        shown
    }

    pub fn is_dismissed(&self, handle: RenderHandle) -> bool {
        self.dismissed.contains(&handle)
    }

    pub fn popup(&self) -> Option<RenderHandle> {
        self.popup
    }

    pub fn view(&self) -> Option<View> {
        self.view
    }

    fn insert(&mut self, object: SceneObject) -> RenderHandle {
        self.next_handle += 1;
        let handle = RenderHandle(self.next_handle);
        self.objects.insert(handle, object);
        handle
    }
}

impl RenderSurface for HeadlessSurface {
    fn create_icon_marker(&mut self, position: LatLng, style: &IconStyle) -> RenderHandle {
        self.insert(SceneObject::IconMarker {
            position,
            style: style.clone(),
        })
    }

    fn create_circle_marker(&mut self, position: LatLng, style: &CircleStyle) -> RenderHandle {
        self.insert(SceneObject::CircleMarker {
            position,
            style: style.clone(),
        })
    }

    fn create_image_overlay(&mut self, image: &str, bounds: LatLngBox) -> RenderHandle {
        self.insert(SceneObject::ImageOverlay {
            image: image.to_string(),
            bounds,
        })
    }

    fn create_rectangle(&mut self, bounds: LatLngBox, style: &ShapeStyle) -> RenderHandle {
        self.insert(SceneObject::Rectangle {
            bounds,
            style: style.clone(),
        })
    }

    fn create_polyline(&mut self, path: &[LatLng], style: &ShapeStyle) -> RenderHandle {
        self.insert(SceneObject::Polyline {
            path: path.to_vec(),
            style: style.clone(),
        })
    }

    fn add_layer(&mut self, handle: RenderHandle) {
        if self.objects.contains_key(&handle) {
            self.shown.insert(handle);
        }
    }

    fn remove_layer(&mut self, handle: RenderHandle) {
        self.shown.remove(&handle);
        if self.popup == Some(handle) {
            self.popup = None;
        }
    }

    fn release(&mut self, handle: RenderHandle) {
        self.remove_layer(handle);
        self.dismissed.remove(&handle);
        self.objects.remove(&handle);
    }

    fn set_dismissed(&mut self, handle: RenderHandle, dismissed: bool) {
        if dismissed {
            self.dismissed.insert(handle);
        } else {
            self.dismissed.remove(&handle);
        }
    }

    fn open_popup(&mut self, handle: RenderHandle) {
        if self.objects.contains_key(&handle) {
            self.popup = Some(handle);
        }
    }

    fn close_popup(&mut self) {
        self.popup = None;
    }

    fn pan_to(&mut self, center: LatLng, zoom: Option<f64>) {
        self.view = Some(View::Center { center, zoom });
    }

    fn fit_bounds(&mut self, bounds: LatLngBox) {
        self.view = Some(View::Fit(bounds));
    }

    fn is_ready(&self) -> bool {
        !self.not_ready
    }
}
