pub mod headless;
pub mod surface;

// Re-export main types
pub use headless::{HeadlessSurface, SceneObject, View};
pub use surface::{
    create_marker, CircleStyle, IconStyle, MarkerStyle, Readiness, RenderHandle, RenderSurface,
    ShapeStyle,
};
