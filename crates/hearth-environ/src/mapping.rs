//! Mapping-shaped view of an environment.

use std::sync::Arc;

use hearth_core::{EnvKey, EnvValue};

use crate::environ::LazyEnvironment;

/// The environment as an ordinary key-value mapping.
///
/// Clones share one [`LazyEnvironment`], as does any
/// [`RequestFacade`](crate::RequestFacade) built from it, so a write through
/// the map is visible to every other view immediately.
#[derive(Clone)]
pub struct EnvironmentMap {
    env: Arc<LazyEnvironment>,
}

impl EnvironmentMap {
    pub fn new(env: Arc<LazyEnvironment>) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &Arc<LazyEnvironment> {
        &self.env
    }

    /// `None` means "key not found".
    pub fn get(&self, key: &str) -> Option<EnvValue> {
        self.env.get(key)
    }

    /// Convenience for text values.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.env.get(key)? {
            EnvValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn insert(&self, key: impl Into<EnvKey>, value: impl Into<EnvValue>) -> Option<EnvValue> {
        self.env.insert(key, value.into())
    }

    pub fn remove(&self, key: &str) -> Option<EnvValue> {
        self.env.remove(key)
    }

    pub fn clear(&self) {
        self.env.clear()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.env.contains_key(key)
    }

    /// Live key view. Enumerating keys never computes values.
    pub fn keys(&self) -> KeySet {
        KeySet {
            env: self.env.clone(),
        }
    }

    /// Every key with its value; computes whatever has not been read yet.
    pub fn entries(&self) -> Vec<(EnvKey, EnvValue)> {
        self.env.entries()
    }

    /// Number of entries with a value. Computes every key.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Extend<(K, V)> for EnvironmentMap
where
    K: Into<EnvKey>,
    V: Into<EnvValue>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.env.insert(key, value.into());
        }
    }
}

/// Keys of an [`EnvironmentMap`], reflecting later writes and removals.
///
/// The set is known before any value is computed, so it can list a key
/// whose value turns out to be missing. Such keys are absent from
/// [`EnvironmentMap::entries`] and `contains_key` reports them as missing.
#[derive(Clone)]
pub struct KeySet {
    env: Arc<LazyEnvironment>,
}

impl KeySet {
    pub fn contains(&self, key: &str) -> bool {
        self.env.lists_key(key)
    }

    /// Snapshot of the keys at the time of the call.
    pub fn iter(&self) -> std::vec::IntoIter<EnvKey> {
        self.env.keys().into_iter()
    }

    pub fn len(&self) -> usize {
        self.env.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntoIterator for &KeySet {
    type Item = EnvKey;
    type IntoIter = std::vec::IntoIter<EnvKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{REQUEST_METHOD, SERVER_NAME};
    use crate::request::HttpRequest;
    use hearth_core::{EmptyInput, NullErrors};

    fn map(req: HttpRequest) -> EnvironmentMap {
        EnvironmentMap::new(Arc::new(LazyEnvironment::new(
            Arc::new(req),
            Arc::new(NullErrors),
            Arc::new(EmptyInput),
        )))
    }

    #[test]
    fn get_missing_is_not_found() {
        let map = map(HttpRequest::new("GET", ""));
        assert_eq!(map.get("HTTP_NOPE"), None);
        assert!(!map.contains_key("HTTP_NOPE"));
        assert_eq!(map.get_str(REQUEST_METHOD).as_deref(), Some("GET"));
    }

    #[test]
    fn clones_share_state() {
        let a = map(HttpRequest::new("GET", ""));
        let b = a.clone();
        a.insert(REQUEST_METHOD, "DELETE");
        assert_eq!(b.get_str(REQUEST_METHOD).as_deref(), Some("DELETE"));
    }

    #[test]
    fn key_set_is_live() {
        let map = map(HttpRequest::new("GET", "").with_server("localhost", 80));
        let keys = map.keys();
        assert!(keys.contains(SERVER_NAME));

        map.remove(SERVER_NAME);
        assert!(!keys.contains(SERVER_NAME));

        map.insert("app.state", "ready");
        assert!(keys.contains("app.state"));
        assert!((&keys).into_iter().any(|k| k.as_str() == "app.state"));
    }

    #[test]
    fn extend_inserts_all() {
        let mut map = map(HttpRequest::new("GET", ""));
        map.extend([("a", "1"), ("b", "2")]);
        assert_eq!(map.get_str("a").as_deref(), Some("1"));
        assert_eq!(map.get_str("b").as_deref(), Some("2"));
    }

    #[test]
    fn len_counts_materialized_entries() {
        let map = map(HttpRequest::new("GET", ""));
        let before = map.len();
        map.insert("extra", true);
        assert_eq!(map.len(), before + 1);
        map.clear();
        assert!(map.is_empty());
        assert!(map.keys().is_empty());
    }
}
