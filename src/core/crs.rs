//! Coordinate reference system for data-defined maps.
//!
//! Maps declare their native space by two corner points. The space is
//! projected into a 0-100 render space per axis; when the origin sits at the
//! top-left corner the vertical axis is flipped, since the render space grows
//! upwards.

use crate::{
    constants::RENDER_EXTENT,
    core::geo::{LatLng, LatLngBox, NativeBox, NativePoint},
    MapError, Result,
};

/// Where the native space places its origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsOrigin {
    TopLeft,
    BottomLeft,
}

/// Transform between a map's native space and render space.
///
/// Parameters are derived once from the configured corners and never change.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateSpace {
    corners: NativeBox,
    origin: CrsOrigin,
    scale_y: f64,
    scale_x: f64,
}

impl CoordinateSpace {
    /// Builds the transform from the two configured corners
    pub fn new(corners: NativeBox) -> Result<Self> {
        let (a, b) = (corners.first, corners.second);
        if ![a.y, a.x, b.y, b.x].iter().all(|v| v.is_finite()) {
            return Err(MapError::InvalidCoordinateSpace(format!(
                "corners must be finite, got {:?}",
                corners
            )));
        }

        let origin = if a.y < b.y && a.x < b.x {
            CrsOrigin::TopLeft
        } else if a.y > b.y && a.x > b.x {
            CrsOrigin::BottomLeft
        } else {
            return Err(MapError::InvalidCoordinateSpace(format!(
                "corners [{}, {}] and [{}, {}] do not span a box in a consistent direction",
                a.y, a.x, b.y, b.x
            )));
        };

        let scale_y = axis_scale(&corners, 0)?;
        let scale_x = axis_scale(&corners, 1)?;

        Ok(Self {
            corners,
            origin,
            scale_y,
            scale_x,
        })
    }

    /// Builds the transform from `[[y, x], [y, x]]` arrays
    pub fn from_corners(corners: [[f64; 2]; 2]) -> Result<Self> {
        Self::new(NativeBox::from_corners(corners))
    }

    pub fn origin(&self) -> CrsOrigin {
        self.origin
    }

    pub fn corners(&self) -> NativeBox {
        self.corners
    }

    /// Per-axis scale factors as `(vertical, horizontal)`
    pub fn scale(&self) -> (f64, f64) {
        (self.scale_y, self.scale_x)
    }

    /// Converts a native point into render space
    pub fn point_to_render(&self, point: &NativePoint) -> LatLng {
        let lat = point.y * self.scale_y;
        let lng = point.x * self.scale_x;
        match self.origin {
            CrsOrigin::TopLeft => LatLng::new(RENDER_EXTENT - lat, lng),
            CrsOrigin::BottomLeft => LatLng::new(lat, lng),
        }
    }

    /// Converts a native box into render space, keeping corner order
    pub fn box_to_render(&self, native: &NativeBox) -> LatLngBox {
        LatLngBox::new(
            self.point_to_render(&native.first),
            self.point_to_render(&native.second),
        )
    }

    /// Converts a render-space point back into native space
    pub fn render_to_point(&self, point: &LatLng) -> NativePoint {
        let lat = match self.origin {
            CrsOrigin::TopLeft => RENDER_EXTENT - point.lat,
            CrsOrigin::BottomLeft => point.lat,
        };
        NativePoint::new(lat / self.scale_y, point.lng / self.scale_x)
    }

    /// The configured corners in render space
    pub fn render_bounds(&self) -> LatLngBox {
        self.box_to_render(&self.corners)
    }
}

fn axis_scale(corners: &NativeBox, axis: usize) -> Result<f64> {
    let extent = corners.first.axis(axis).max(corners.second.axis(axis));
    if extent <= 0.0 {
        return Err(MapError::InvalidCoordinateSpace(format!(
            "axis {} has no positive extent",
            axis
        )));
    }
    Ok(RENDER_EXTENT / extent)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_origin_detection() {
        let top_left = CoordinateSpace::from_corners([[0.0, 0.0], [100.0, 100.0]]).unwrap();
        assert_eq!(top_left.origin(), CrsOrigin::TopLeft);

        let bottom_left = CoordinateSpace::from_corners([[100.0, 100.0], [0.0, 0.0]]).unwrap();
        assert_eq!(bottom_left.origin(), CrsOrigin::BottomLeft);
    }

    #[test]
    fn test_mixed_ordering_is_rejected() {
        for corners in [
            [[0.0, 100.0], [100.0, 0.0]],
            [[100.0, 0.0], [0.0, 100.0]],
            [[0.0, 0.0], [0.0, 100.0]],
            [[50.0, 50.0], [50.0, 50.0]],
        ] {
            let err = CoordinateSpace::from_corners(corners).unwrap_err();
            assert!(matches!(err, MapError::InvalidCoordinateSpace(_)), "{:?}", corners);
        }
    }

    #[test]
    fn test_non_positive_extent_is_rejected() {
        let err = CoordinateSpace::from_corners([[-10.0, -10.0], [0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, MapError::InvalidCoordinateSpace(_)));
    }

    #[test]
    fn test_top_left_flips_vertical_axis() {
        let crs = CoordinateSpace::from_corners([[0.0, 0.0], [100.0, 100.0]]).unwrap();
        let render = crs.point_to_render(&NativePoint::new(25.0, 75.0));
        assert!(render.approx_eq(&LatLng::new(75.0, 75.0), EPSILON));
    }

    #[test]
    fn test_bottom_left_is_identity_at_unit_scale() {
        let crs = CoordinateSpace::from_corners([[100.0, 100.0], [0.0, 0.0]]).unwrap();
        let render = crs.point_to_render(&NativePoint::new(25.0, 75.0));
        assert!(render.approx_eq(&LatLng::new(25.0, 75.0), EPSILON));
    }

    #[test]
    fn test_axes_scale_independently() {
        let crs = CoordinateSpace::from_corners([[400.0, 200.0], [0.0, 0.0]]).unwrap();
        assert_eq!(crs.scale(), (0.25, 0.5));

        let render = crs.point_to_render(&NativePoint::new(200.0, 200.0));
        assert!(render.approx_eq(&LatLng::new(50.0, 100.0), EPSILON));
    }

    #[test]
    fn test_box_keeps_corner_correspondence() {
        let crs = CoordinateSpace::from_corners([[0.0, 0.0], [200.0, 200.0]]).unwrap();
        let native = NativeBox::from_corners([[20.0, 40.0], [100.0, 120.0]]);
        let render = crs.box_to_render(&native);

        assert!(render.start.approx_eq(&LatLng::new(90.0, 20.0), EPSILON));
        assert!(render.end.approx_eq(&LatLng::new(50.0, 60.0), EPSILON));
    }

    #[test]
    fn test_round_trip_within_bounds() {
        for corners in [
            [[0.0, 0.0], [1000.0, 750.0]],
            [[1000.0, 750.0], [0.0, 0.0]],
            [[-500.0, -250.0], [3.5, 7.25]],
        ] {
            let crs = CoordinateSpace::from_corners(corners).unwrap();
            let bounds = crs.corners();
            for step_y in 0..=10 {
                for step_x in 0..=10 {
                    let t_y = step_y as f64 / 10.0;
                    let t_x = step_x as f64 / 10.0;
                    let point = NativePoint::new(
                        bounds.first.y + (bounds.second.y - bounds.first.y) * t_y,
                        bounds.first.x + (bounds.second.x - bounds.first.x) * t_x,
                    );
                    let back = crs.render_to_point(&crs.point_to_render(&point));
                    assert!(back.approx_eq(&point, 1e-6), "{:?} -> {:?}", point, back);
                }
            }
        }
    }
}
