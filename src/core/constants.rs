//! Engine-wide constants. Keeping them in a single place makes it easier to
//! keep storage keys and link formats stable across releases.

/// Extent of the normalised render space along each axis.
pub const RENDER_EXTENT: f64 = 100.0;

/// Default native coordinate space corners when the configuration omits them.
pub const DEFAULT_CRS: [[f64; 2]; 2] = [[0.0, 0.0], [100.0, 100.0]];

/// Query parameter that names the focused marker.
pub const MARKER_LINK_PARAM: &str = "marker";

/// Prefix for every key written to the storage backend.
pub const STORAGE_PREFIX: &str = "ext.datamaps";

/// Storage scope shared by every map (global group collectibles).
pub const GLOBAL_SCOPE: &str = "global";

/// Decimal places kept for coordinates inside derived marker keys.
pub const KEY_COORD_PRECISION: usize = 3;

/// Default icon edge length in pixels when a group does not set one.
pub const DEFAULT_ICON_SIZE: f64 = 32.0;

/// Default circle marker radius in pixels.
pub const DEFAULT_CIRCLE_RADIUS: f64 = 5.0;

/// Default circle marker fill colour.
pub const DEFAULT_CIRCLE_COLOR: &str = "#fff";

/// Number of revision-pinned marker responses kept by the API source.
pub const API_CACHE_CAPACITY: usize = 32;
