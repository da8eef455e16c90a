//! Local persistence of per-user map state
//!
//! Only two kinds of values are stored: the chosen background and dismissal
//! flags. Nothing is sent to a server.

pub mod backend;
pub mod state;

pub use backend::{FileStorage, MemoryStorage, StorageBackend};
pub use state::{DismissalKey, PersistentState};
