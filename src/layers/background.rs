use crate::{
    core::{
        config::{MapConfig, OverlayShape},
        crs::CoordinateSpace,
        geo::LatLng,
    },
    rendering::surface::{RenderHandle, RenderSurface},
    MapError, Result,
};

/// Render objects of the background currently on the map: the image
/// itself followed by its overlays.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundLayer {
    index: usize,
    handles: Vec<RenderHandle>,
}

impl BackgroundLayer {
    /// Creates and shows every object of background `index`
    pub fn install<S: RenderSurface + ?Sized>(
        config: &MapConfig,
        crs: &CoordinateSpace,
        index: usize,
        surface: &mut S,
    ) -> Result<Self> {
        let background = config.backgrounds.get(index).ok_or_else(|| {
            MapError::InvalidConfig(format!("background {} does not exist", index))
        })?;
        let at = config.background_bounds(index).unwrap_or(config.crs);

        // Resolve shapes first so a bad overlay leaves nothing behind
        let shapes = background
            .overlays
            .iter()
            .map(|overlay| overlay.shape())
            .collect::<Result<Vec<_>>>()?;

        let mut handles = vec![surface.create_image_overlay(&background.image, crs.box_to_render(&at))];
        for shape in shapes {
            let handle = match shape {
                OverlayShape::Image { image, at } => {
                    surface.create_image_overlay(&image, crs.box_to_render(&at))
                }
                OverlayShape::Rectangle { at, style } => {
                    surface.create_rectangle(crs.box_to_render(&at), &style)
                }
                OverlayShape::Polyline { path, style } => {
                    let path: Vec<LatLng> =
                        path.iter().map(|point| crs.point_to_render(point)).collect();
                    surface.create_polyline(&path, &style)
                }
            };
            handles.push(handle);
        }

        for handle in &handles {
            surface.add_layer(*handle);
        }
        Ok(Self { index, handles })
    }

    /// Removes every object of this background from the surface
    pub fn uninstall<S: RenderSurface + ?Sized>(self, surface: &mut S) {
        for handle in self.handles {
            surface.release(handle);
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn handles(&self) -> &[RenderHandle] {
        &self.handles
    }
}
