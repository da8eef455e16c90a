use crate::{
    constants::{GLOBAL_SCOPE, STORAGE_PREFIX},
    core::config::CollectibleMode,
    layers::marker::StableKey,
    prelude::HashMap,
    storage::backend::StorageBackend,
};

/// What a dismissal flag is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DismissalKey {
    Marker(StableKey),
    Group(String),
    GlobalGroup(String),
}

impl DismissalKey {
    /// Key for a marker of a group with the given mode. Non-collectible
    /// groups have no key, so nothing can ever be stored for them.
    pub fn for_marker(mode: CollectibleMode, group: &str, marker: &StableKey) -> Option<Self> {
        match mode {
            CollectibleMode::None => None,
            CollectibleMode::Individual => Some(Self::Marker(marker.clone())),
            CollectibleMode::Group => Some(Self::Group(group.to_string())),
            CollectibleMode::GlobalGroup => Some(Self::GlobalGroup(group.to_string())),
        }
    }

    fn storage_key(&self, scope: &str) -> String {
        match self {
            Self::Marker(key) => format!("{}.{}.dismissed.marker.{}", STORAGE_PREFIX, scope, key),
            Self::Group(group) => format!("{}.{}.dismissed.group.{}", STORAGE_PREFIX, scope, group),
            Self::GlobalGroup(group) => format!(
                "{}.{}.dismissed.group.{}",
                STORAGE_PREFIX, GLOBAL_SCOPE, group
            ),
        }
    }
}

/// Per-map user state on top of a durable backend.
///
/// Writes go straight to the backend. If the backend fails, the state
/// degrades to an in-memory store for the rest of the session.
pub struct PersistentState {
    scope: String,
    backend: Option<Box<dyn StorageBackend>>,
    session: HashMap<String, String>,
}

impl PersistentState {
    /// `scope` identifies the map, typically its page name
    pub fn new(scope: impl Into<String>, backend: Box<dyn StorageBackend>) -> Self {
        Self {
            scope: scope.into(),
            backend: Some(backend),
            session: HashMap::default(),
        }
    }

    /// Session-only state, as if storage were unavailable from the start
    pub fn in_memory(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            backend: None,
            session: HashMap::default(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Whether durable storage has been lost
    pub fn is_degraded(&self) -> bool {
        self.backend.is_none()
    }

    pub fn background(&mut self) -> Option<usize> {
        let key = self.background_key();
        self.read(&key)
    }

    pub fn set_background(&mut self, index: usize) {
        let key = self.background_key();
        self.write(&key, &index);
    }

    pub fn is_dismissed(&mut self, key: &DismissalKey) -> bool {
        let key = key.storage_key(&self.scope);
        self.read::<bool>(&key).unwrap_or(false)
    }

    pub fn set_dismissed(&mut self, key: &DismissalKey, dismissed: bool) {
        let key = key.storage_key(&self.scope);
        self.write(&key, &dismissed);
    }

    fn background_key(&self) -> String {
        format!("{}.{}.background", STORAGE_PREFIX, self.scope)
    }

    fn read<T: serde::de::DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let raw = match self.backend.as_ref().map(|backend| backend.get(key)) {
            Some(Ok(value)) => value,
            Some(Err(e)) => {
                self.degrade(e);
                None
            }
            None => None,
        };
        let raw = raw.or_else(|| self.session.get(key).cloned())?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("ignoring unreadable stored value for {}: {}", key, e);
                None
            }
        }
    }

    fn write<T: serde::Serialize>(&mut self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("cannot encode value for {}: {}", key, e);
                return;
            }
        };
        self.session.insert(key.to_string(), raw.clone());
        let result = self.backend.as_mut().map(|backend| backend.set(key, &raw));
        if let Some(Err(e)) = result {
            self.degrade(e);
        }
    }

    fn degrade(&mut self, error: crate::MapError) {
        log::warn!(
            "storage for {} unavailable, keeping state for this session only: {}",
            self.scope,
            error
        );
        self.backend = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::MemoryStorage;
    use crate::MapError;

    struct BrokenStorage;

    impl StorageBackend for BrokenStorage {
        fn get(&self, _key: &str) -> crate::Result<Option<String>> {
            Err(MapError::StorageUnavailable("quota exceeded".to_string()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> crate::Result<()> {
            Err(MapError::StorageUnavailable("quota exceeded".to_string()))
        }
    }

    #[test]
    fn test_nothing_written_until_first_change() {
        let storage = MemoryStorage::new();
        let mut state = PersistentState::new("Map:Forest", Box::new(storage.clone()));
        assert_eq!(state.background(), None);
        assert!(!state.is_dismissed(&DismissalKey::Group("ore".to_string())));
        assert!(storage.is_empty());

        state.set_background(1);
        assert_eq!(state.background(), Some(1));
        assert_eq!(storage.keys(), vec!["ext.datamaps.Map:Forest.background".to_string()]);
    }

    #[test]
    fn test_dismissal_keys_by_mode() {
        let marker = StableKey::new("chest@1.000:2.000#0");
        assert_eq!(DismissalKey::for_marker(CollectibleMode::None, "chest", &marker), None);
        assert_eq!(
            DismissalKey::for_marker(CollectibleMode::Individual, "chest", &marker),
            Some(DismissalKey::Marker(marker.clone()))
        );

        let group = DismissalKey::for_marker(CollectibleMode::Group, "chest", &marker).unwrap();
        let global = DismissalKey::for_marker(CollectibleMode::GlobalGroup, "chest", &marker).unwrap();
        assert_eq!(group.storage_key("A"), "ext.datamaps.A.dismissed.group.chest");
        assert_eq!(global.storage_key("A"), global.storage_key("B"));
        assert_ne!(group.storage_key("A"), group.storage_key("B"));
    }

    #[test]
    fn test_global_group_shared_between_maps() {
        let storage = MemoryStorage::new();
        let key = DismissalKey::GlobalGroup("boss".to_string());

        let mut first = PersistentState::new("Map:A", Box::new(storage.clone()));
        first.set_dismissed(&key, true);

        let mut second = PersistentState::new("Map:B", Box::new(storage));
        assert!(second.is_dismissed(&key));
        assert!(!second.is_dismissed(&DismissalKey::Group("boss".to_string())));
    }

    #[test]
    fn test_degrades_to_session_memory() {
        let mut state = PersistentState::new("Map:A", Box::new(BrokenStorage));
        assert!(!state.is_degraded());

        let key = DismissalKey::Marker(StableKey::new("x"));
        state.set_dismissed(&key, true);
        assert!(state.is_degraded());
        assert!(state.is_dismissed(&key));

        state.set_background(2);
        assert_eq!(state.background(), Some(2));
    }
}
