//! Page-local key/value storage that survives for the browsing session.

use dashmap::DashMap;

pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

/// Storage backed by an in-process map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_overwrite() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("usersessioncontext"), None);

        storage.set("usersessioncontext", "s-1".into());
        storage.set("usersessioncontext", "s-2".into());
        assert_eq!(storage.get("usersessioncontext").as_deref(), Some("s-2"));
        assert_eq!(storage.len(), 1);
    }
}
