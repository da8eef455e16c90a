//! Interface to the engine that actually draws the map.
//!
//! The core never inspects what a surface does with the objects it creates;
//! it only keeps the returned [`RenderHandle`]s and tells the surface when to
//! show, hide, restyle or focus them.

use crate::core::geo::{LatLng, LatLngBox};
use futures::channel::oneshot;
use futures::Future;

/// Opaque reference to an object created by a [`RenderSurface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderHandle(pub u64);

/// Image marker style
#[derive(Debug, Clone, PartialEq)]
pub struct IconStyle {
    pub icon: String,
    pub size: f64,
}

/// Filled circle marker style
#[derive(Debug, Clone, PartialEq)]
pub struct CircleStyle {
    pub fill_color: String,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerStyle {
    Icon(IconStyle),
    Circle(CircleStyle),
}

/// Stroke style for overlay shapes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeStyle {
    pub color: Option<String>,
    pub thickness: Option<f64>,
}

/// Rendering engine operations the core depends on
pub trait RenderSurface {
    fn create_icon_marker(&mut self, position: LatLng, style: &IconStyle) -> RenderHandle;

    fn create_circle_marker(&mut self, position: LatLng, style: &CircleStyle) -> RenderHandle;

    fn create_image_overlay(&mut self, image: &str, bounds: LatLngBox) -> RenderHandle;

    fn create_rectangle(&mut self, bounds: LatLngBox, style: &ShapeStyle) -> RenderHandle;

    fn create_polyline(&mut self, path: &[LatLng], style: &ShapeStyle) -> RenderHandle;

    /// Shows an object on the map
    fn add_layer(&mut self, handle: RenderHandle);

    /// Hides an object; it can be shown again with `add_layer`
    fn remove_layer(&mut self, handle: RenderHandle);

    /// Drops an object for good
    fn release(&mut self, handle: RenderHandle) {
        self.remove_layer(handle);
    }

    /// Switches the visual dismissed/collected styling of a marker
    fn set_dismissed(&mut self, handle: RenderHandle, dismissed: bool);

    fn open_popup(&mut self, handle: RenderHandle);

    fn close_popup(&mut self);

    fn pan_to(&mut self, center: LatLng, zoom: Option<f64>);

    fn fit_bounds(&mut self, bounds: LatLngBox);

    /// Whether the surface has finished its own asynchronous setup
    fn is_ready(&self) -> bool;
}

/// Creates the marker object matching a group style
pub fn create_marker<S: RenderSurface + ?Sized>(
    surface: &mut S,
    position: LatLng,
    style: &MarkerStyle,
) -> RenderHandle {
    match style {
        MarkerStyle::Icon(icon) => surface.create_icon_marker(position, icon),
        MarkerStyle::Circle(circle) => surface.create_circle_marker(position, circle),
    }
}

/// One-shot readiness signal for the rendering surface.
///
/// Futures returned by [`Readiness::wait`] resolve once [`Readiness::signal`]
/// has been called; waits issued afterwards resolve immediately.
#[derive(Debug, Default)]
pub struct Readiness {
    ready: bool,
    waiters: Vec<oneshot::Sender<()>>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Fires the signal. Returns `false` if it had already fired.
    pub fn signal(&mut self) -> bool {
        if self.ready {
            return false;
        }
        self.ready = true;
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(());
        }
        true
    }

    /// Releases every outstanding waiter without firing the signal
    pub fn close(&mut self) {
        self.waiters.clear();
    }

    pub fn wait(&mut self) -> impl Future<Output = ()> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        if self.ready {
            let _ = tx.send(());
        } else {
            self.waiters.push(tx);
        }
        async move {
            // A dropped signal also releases the waiter.
            let _ = rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn test_readiness_releases_waiters() {
        let mut readiness = Readiness::new();
        let mut early = Box::pin(readiness.wait());
        assert!((&mut early).now_or_never().is_none());

        assert!(readiness.signal());
        assert!(!readiness.signal());
        assert!(early.now_or_never().is_some());

        let late = readiness.wait();
        assert!(late.now_or_never().is_some());
    }

    #[test]
    fn test_close_releases_waiters() {
        let mut readiness = Readiness::new();
        let mut waiter = Box::pin(readiness.wait());
        assert!((&mut waiter).now_or_never().is_none());

        readiness.close();
        assert!(!readiness.is_ready());
        assert!(waiter.now_or_never().is_some());
    }
}
