use crate::error::{store_error, PatternResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// File holding the persistent store
pub const LOCAL_STORE_FILE: &str = "local_store.json";

/// Where a pattern keeps its state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreScope {
    /// Nothing is kept
    #[default]
    None,
    /// Kept for the lifetime of one browsing session
    Session,
    /// Kept on disk, shared by all sessions
    Local,
}

impl FromStr for StoreScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(StoreScope::None),
            "session" => Ok(StoreScope::Session),
            "local" => Ok(StoreScope::Local),
            other => Err(format!("Unknown store '{}'", other)),
        }
    }
}

impl fmt::Display for StoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreScope::None => "none",
            StoreScope::Session => "session",
            StoreScope::Local => "local",
        })
    }
}

/// A string-keyed value store
pub trait StoreBackend: Send + Sync {
    fn get(&self, key: &str) -> PatternResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PatternResult<()>;
}

/// In-memory backend used for session scope
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for MemoryBackend {
    fn get(&self, key: &str) -> PatternResult<Option<String>> {
        let data = self
            .data
            .lock()
            .map_err(|e| store_error(&format!("Session store poisoned: {}", e)))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PatternResult<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| store_error(&format!("Session store poisoned: {}", e)))?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON file backend used for local scope
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    // Serializes read-modify-write cycles within the process
    lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(LOCAL_STORE_FILE),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> PatternResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let data = serde_json::from_str(&content)
            .map_err(|e| store_error(&format!("Corrupt store {}: {}", self.path.display(), e)))?;
        Ok(data)
    }
}

impl StoreBackend for FileBackend {
    fn get(&self, key: &str) -> PatternResult<Option<String>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| store_error(&format!("Local store poisoned: {}", e)))?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> PatternResult<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| store_error(&format!("Local store poisoned: {}", e)))?;

        let mut data = self.read_all()?;
        data.insert(key.to_string(), value.to_string());

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, serde_json::to_string_pretty(&data)?)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

/// Backends of one browsing session: its own session store plus the
/// shared local store.
#[derive(Clone)]
pub struct Storage {
    session: Arc<dyn StoreBackend>,
    local: Arc<dyn StoreBackend>,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Storage whose local scope lives in `dir`
    pub fn new(dir: &Path) -> Self {
        Self::with_backends(Arc::new(MemoryBackend::new()), Arc::new(FileBackend::new(dir)))
    }

    pub fn with_backends(session: Arc<dyn StoreBackend>, local: Arc<dyn StoreBackend>) -> Self {
        Self { session, local }
    }

    /// A new browsing session: fresh session scope, same local scope
    pub fn new_session(&self) -> Self {
        Self {
            session: Arc::new(MemoryBackend::new()),
            local: Arc::clone(&self.local),
        }
    }

    /// Store for `namespace` in `scope`
    pub fn scoped(&self, scope: StoreScope, namespace: &str) -> ScopedStore {
        let backend = match scope {
            StoreScope::None => None,
            StoreScope::Session => Some(Arc::clone(&self.session)),
            StoreScope::Local => Some(Arc::clone(&self.local)),
        };
        ScopedStore {
            namespace: namespace.to_string(),
            scope,
            backend,
        }
    }
}

/// Namespaced view of one backend. Never fails: problems are logged and
/// reads fall back to empty.
#[derive(Clone)]
pub struct ScopedStore {
    namespace: String,
    scope: StoreScope,
    backend: Option<Arc<dyn StoreBackend>>,
}

impl fmt::Debug for ScopedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedStore")
            .field("namespace", &self.namespace)
            .field("scope", &self.scope)
            .finish()
    }
}

impl ScopedStore {
    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match backend.get(&self.key(key)) {
            Ok(value) => value,
            Err(e) => {
                warn!("Could not read '{}' from {} store: {}", key, self.scope, e);
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        let Some(backend) = &self.backend else {
            return;
        };
        match backend.set(&self.key(key), value) {
            Ok(()) => debug!("Stored {}={} in {} store", self.key(key), value, self.scope),
            Err(e) => warn!("Could not write '{}' to {} store: {}", key, self.scope, e),
        }
    }
}
