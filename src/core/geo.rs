use serde::{Deserialize, Serialize};

/// A point in the map's native (authoring) coordinate space.
///
/// The first component is the vertical axis, the second the horizontal one,
/// matching the `[y, x]` arrays used by map definitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct NativePoint {
    pub y: f64,
    pub x: f64,
}

impl NativePoint {
    /// Creates a new native point
    pub fn new(y: f64, x: f64) -> Self {
        Self { y, x }
    }

    /// Component along `axis` (0 = vertical, 1 = horizontal)
    pub fn axis(&self, axis: usize) -> f64 {
        if axis == 0 {
            self.y
        } else {
            self.x
        }
    }

    /// Whether the point is within `tolerance` of another on both axes
    pub fn approx_eq(&self, other: &NativePoint, tolerance: f64) -> bool {
        (self.y - other.y).abs() <= tolerance && (self.x - other.x).abs() <= tolerance
    }
}

impl From<[f64; 2]> for NativePoint {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<NativePoint> for [f64; 2] {
    fn from(value: NativePoint) -> Self {
        [value.y, value.x]
    }
}

impl Default for NativePoint {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// An axis-aligned box in native space, stored as the two authored corners.
///
/// Corner order is preserved so that transformed boxes keep the same
/// correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[NativePoint; 2]", into = "[NativePoint; 2]")]
pub struct NativeBox {
    pub first: NativePoint,
    pub second: NativePoint,
}

impl NativeBox {
    pub fn new(first: NativePoint, second: NativePoint) -> Self {
        Self { first, second }
    }

    /// Creates a box from `[[y, x], [y, x]]` corner arrays
    pub fn from_corners(corners: [[f64; 2]; 2]) -> Self {
        Self::new(corners[0].into(), corners[1].into())
    }

    /// Checks if the box contains a point, regardless of corner order
    pub fn contains(&self, point: &NativePoint) -> bool {
        let (min_y, max_y) = min_max(self.first.y, self.second.y);
        let (min_x, max_x) = min_max(self.first.x, self.second.x);
        point.y >= min_y && point.y <= max_y && point.x >= min_x && point.x <= max_x
    }
}

impl From<[NativePoint; 2]> for NativeBox {
    fn from(value: [NativePoint; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<NativeBox> for [NativePoint; 2] {
    fn from(value: NativeBox) -> Self {
        [value.first, value.second]
    }
}

/// A point in render space, following Leaflet's `CRS.Simple` convention
/// where `lat` is the vertical axis and `lng` the horizontal one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new render-space coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Squared euclidean distance, enough for nearest-neighbour ordering
    pub fn distance_2(&self, other: &LatLng) -> f64 {
        let d_lat = self.lat - other.lat;
        let d_lng = self.lng - other.lng;
        d_lat * d_lat + d_lng * d_lng
    }

    pub fn distance_to(&self, other: &LatLng) -> f64 {
        self.distance_2(other).sqrt()
    }

    pub fn approx_eq(&self, other: &LatLng, tolerance: f64) -> bool {
        (self.lat - other.lat).abs() <= tolerance && (self.lng - other.lng).abs() <= tolerance
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A box in render space with its two corners kept in authored order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBox {
    pub start: LatLng,
    pub end: LatLng,
}

impl LatLngBox {
    pub fn new(start: LatLng, end: LatLng) -> Self {
        Self { start, end }
    }

    /// Smallest box containing every point, or `None` for an empty input
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a LatLng>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self::new(first, first);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// South-west-most corner (minimum on both axes)
    pub fn min(&self) -> LatLng {
        LatLng::new(
            self.start.lat.min(self.end.lat),
            self.start.lng.min(self.end.lng),
        )
    }

    /// North-east-most corner (maximum on both axes)
    pub fn max(&self) -> LatLng {
        LatLng::new(
            self.start.lat.max(self.end.lat),
            self.start.lng.max(self.end.lng),
        )
    }

    /// Checks if the box contains a point
    pub fn contains(&self, point: &LatLng) -> bool {
        let (min, max) = (self.min(), self.max());
        point.lat >= min.lat && point.lat <= max.lat && point.lng >= min.lng && point.lng <= max.lng
    }

    /// Gets the center point of the box
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.start.lat + self.end.lat) / 2.0,
            (self.start.lng + self.end.lng) / 2.0,
        )
    }

    /// Extends the box to include a point. The result is normalised to
    /// min/max corner order.
    pub fn extend(&mut self, point: &LatLng) {
        let (min, max) = (self.min(), self.max());
        self.start = LatLng::new(min.lat.min(point.lat), min.lng.min(point.lng));
        self.end = LatLng::new(max.lat.max(point.lat), max.lng.max(point.lng));
    }

    /// Returns the union of this box with another one
    pub fn union(&self, other: &LatLngBox) -> LatLngBox {
        let mut merged = *self;
        merged.extend(&other.start);
        merged.extend(&other.end);
        merged
    }
}

fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
