pub mod deeplink;
pub mod events;
pub mod handler;

// Re-export the essential types
pub use deeplink::DeepLink;
pub use events::{MapEvent, MapEventKind, UiEvent};
pub use handler::EventManager;
