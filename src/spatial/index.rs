use crate::{
    core::geo::{LatLng, LatLngBox},
    layers::marker::MarkerId,
};

use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// A placed marker as stored in the R-tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedMarker {
    pub id: MarkerId,
    pub position: LatLng,
}

impl IndexedMarker {
    pub fn new(id: MarkerId, position: LatLng) -> Self {
        Self { id, position }
    }

    fn coords(&self) -> [f64; 2] {
        [self.position.lng, self.position.lat]
    }
}

// --- rstar integration -------------------------------------------------------------------------

impl RTreeObject for IndexedMarker {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.coords())
    }
}

impl PointDistance for IndexedMarker {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let [x, y] = self.coords();
        let dx = x - point[0];
        let dy = y - point[1];
        dx * dx + dy * dy
    }
}

fn to_coords(point: &LatLng) -> [f64; 2] {
    [point.lng, point.lat]
}

/// R-tree over marker render positions.
///
/// Built in bulk after every ingestion; markers never move afterwards.
#[derive(Debug, Default)]
pub struct MarkerIndex {
    rtree: RTree<IndexedMarker>,
}

impl MarkerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(markers: impl IntoIterator<Item = IndexedMarker>) -> Self {
        Self {
            rtree: RTree::bulk_load(markers.into_iter().collect()),
        }
    }

    pub fn insert(&mut self, marker: IndexedMarker) {
        self.rtree.insert(marker);
    }

    /// Closest marker to `point`
    pub fn nearest(&self, point: &LatLng) -> Option<MarkerId> {
        self.rtree
            .nearest_neighbor(&to_coords(point))
            .map(|marker| marker.id)
    }

    /// Closest marker to `point` accepted by `filter`, e.g. only visible ones
    pub fn nearest_where<F>(&self, point: &LatLng, mut filter: F) -> Option<MarkerId>
    where
        F: FnMut(MarkerId) -> bool,
    {
        self.rtree
            .nearest_neighbor_iter(&to_coords(point))
            .map(|marker| marker.id)
            .find(|id| filter(*id))
    }

    /// Markers inside a render box, in id order
    pub fn within(&self, bounds: &LatLngBox) -> Vec<MarkerId> {
        let envelope = AABB::from_corners(to_coords(&bounds.min()), to_coords(&bounds.max()));
        let mut found: Vec<MarkerId> = self
            .rtree
            .locate_in_envelope(&envelope)
            .map(|marker| marker.id)
            .collect();
        found.sort();
        found
    }

    /// Markers within `radius` render units of `center`, in id order
    pub fn within_radius(&self, center: &LatLng, radius: f64) -> Vec<MarkerId> {
        let mut found: Vec<MarkerId> = self
            .rtree
            .locate_within_distance(to_coords(center), radius * radius)
            .map(|marker| marker.id)
            .collect();
        found.sort();
        found
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    pub fn clear(&mut self) {
        self.rtree = RTree::new();
    }
}
