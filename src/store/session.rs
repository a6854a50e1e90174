//! Typed, namespaced access to the state backend.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{MonitorError, MonitorResult};

use super::StateBackend;

/// Shared handle to the persisted state. Cheap to clone; hand one
/// [`ViewStore`] to each view.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn StateBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        Self { backend }
    }

    /// Scoped view over one namespace. Keys written through it can't collide
    /// with another namespace's keys.
    pub fn namespace(&self, namespace: &'static str) -> ViewStore {
        ViewStore {
            namespace,
            backend: Arc::clone(&self.backend),
        }
    }
}

/// Key/value access restricted to one view's namespace.
#[derive(Clone)]
pub struct ViewStore {
    namespace: &'static str,
    backend: Arc<dyn StateBackend>,
}

impl ViewStore {
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}/{}", self.namespace, key)
    }

    /// Stored value, or `default` when nothing is stored or the stored text
    /// no longer parses. Corruption is logged and swallowed.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_load(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                warn!("{}; using default", e);
                default
            }
        }
    }

    fn try_load<T: DeserializeOwned>(&self, key: &str) -> MonitorResult<Option<T>> {
        let full = self.full_key(key);
        let Some(raw) = self.backend.read(&full)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| MonitorError::PersistedStateCorrupt {
                key: full,
                reason: e.to_string(),
            })
    }

    /// Overwrite the stored value in full.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> MonitorResult<()> {
        let full = self.full_key(key);
        let json = serde_json::to_string(value).map_err(|e| {
            MonitorError::Validation(format!("cannot serialize {}: {}", full, e))
        })?;
        self.backend.write(&full, &json)?;
        debug!(key = %full, bytes = json.len(), "saved view state");
        Ok(())
    }
}

/// In-memory mirror of one persisted value.
///
/// The store is read exactly once, on construction. Every change goes
/// through [`set`](Self::set) or [`update`](Self::update), which write the
/// full value back.
pub struct Persisted<T> {
    key: &'static str,
    store: ViewStore,
    value: T,
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn load(store: ViewStore, key: &'static str, default: T) -> Self {
        Self::load_with(store, key, default, |_| {})
    }

    /// Load, then fix up the value in memory. The fixed value is written on
    /// the next change, so loading never writes.
    pub fn load_with<F>(store: ViewStore, key: &'static str, default: T, normalize: F) -> Self
    where
        F: FnOnce(&mut T),
    {
        let mut value = store.load(key, default);
        normalize(&mut value);
        Self { key, store, value }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replace the value and write it through. The in-memory value is
    /// updated even if the write fails; the error is logged and returned.
    pub fn set(&mut self, value: T) -> MonitorResult<()> {
        self.value = value;
        self.flush()
    }

    /// Mutate in place, then write the whole value.
    pub fn update<F>(&mut self, f: F) -> MonitorResult<()>
    where
        F: FnOnce(&mut T),
    {
        f(&mut self.value);
        self.flush()
    }

    fn flush(&self) -> MonitorResult<()> {
        self.store.save(self.key, &self.value).inspect_err(|e| {
            warn!(
                "failed to persist {}/{}: {}",
                self.store.namespace(),
                self.key,
                e
            );
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryBackend, SqliteBackend};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Turn {
        role: String,
        content: String,
    }

    fn memory_store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn load_never_saved_returns_default() {
        let store = memory_store().namespace("chat");
        let v: Vec<Turn> = store.load("transcript", Vec::new());
        assert!(v.is_empty());
        let tab: String = store.load("active", "chat".to_string());
        assert_eq!(tab, "chat");
    }

    #[test]
    fn save_then_load_roundtrips() {
        let store = memory_store().namespace("chat");
        let turns = vec![
            Turn {
                role: "user".into(),
                content: "bearing is hot".into(),
            },
            Turn {
                role: "assistant".into(),
                content: "check grease".into(),
            },
        ];
        store.save("transcript", &turns).unwrap();
        assert_eq!(store.load("transcript", Vec::<Turn>::new()), turns);
    }

    #[test]
    fn corrupt_value_falls_back_to_default() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write("manual/conversations", "{not json").unwrap();
        let store = SessionStore::new(backend).namespace("manual");
        let v: Vec<Turn> = store.load("conversations", Vec::new());
        assert!(v.is_empty());
    }

    #[test]
    fn wrong_shape_falls_back_to_default() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write("app/active_tab", "42").unwrap();
        let store = SessionStore::new(backend).namespace("app");
        assert_eq!(store.load("active_tab", "monitor".to_string()), "monitor");
    }

    #[test]
    fn namespaces_do_not_collide() {
        let session = memory_store();
        let chat = session.namespace("chat");
        let manual = session.namespace("manual");
        chat.save("history", &vec![1, 2]).unwrap();
        manual.save("history", &vec![9]).unwrap();
        assert_eq!(chat.load("history", Vec::<i32>::new()), vec![1, 2]);
        assert_eq!(manual.load("history", Vec::<i32>::new()), vec![9]);
    }

    #[test]
    fn persisted_writes_through_on_update() {
        let session = memory_store();
        let mut log = Persisted::load(session.namespace("chat"), "transcript", Vec::<Turn>::new());
        log.update(|v| {
            v.push(Turn {
                role: "user".into(),
                content: "hi".into(),
            })
        })
        .unwrap();

        // a fresh mirror (next mount) sees the saved value
        let again = Persisted::load(session.namespace("chat"), "transcript", Vec::<Turn>::new());
        assert_eq!(again.get().len(), 1);
        assert_eq!(again.get()[0].content, "hi");
    }

    #[test]
    fn load_with_normalizes_without_writing() {
        let session = memory_store();
        session.namespace("chat").save("transcript", &vec![1, 2, 3]).unwrap();

        let trimmed = Persisted::load_with(session.namespace("chat"), "transcript", Vec::new(), |v: &mut Vec<i32>| {
            v.remove(0);
        });
        assert_eq!(trimmed.get(), &vec![2, 3]);
        assert_eq!(session.namespace("chat").load("transcript", Vec::<i32>::new()), vec![1, 2, 3]);
    }

    #[test]
    fn persisted_survives_simulated_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");
        {
            let session = SessionStore::new(Arc::new(SqliteBackend::open(Some(&path)).unwrap()));
            let mut tab = Persisted::load(session.namespace("app"), "active_tab", "chat".to_string());
            tab.set("manual".to_string()).unwrap();
        }
        let session = SessionStore::new(Arc::new(SqliteBackend::open(Some(&path)).unwrap()));
        let tab = Persisted::load(session.namespace("app"), "active_tab", "chat".to_string());
        assert_eq!(tab.get(), "manual");
    }
}
