//! Locally persisted API credentials.
//!
//! Two opaque strings, the IBM Cloud API key and the service CRN, stored
//! under fixed keys. Every successful write bumps a generation counter;
//! token caches record the generation they were issued under and treat a
//! mismatch as invalid.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{DashError, DashResult};

/// Storage key for the API key.
pub const API_KEY_KEY: &str = "ibm_quantum_api_key";

/// Storage key for the service CRN.
pub const SERVICE_CRN_KEY: &str = "ibm_quantum_service_crn";

/// Environment variable holding an API key for non-persisted sessions.
pub const API_KEY_ENV: &str = "IBM_API_KEY";

/// Environment variable holding a service CRN for non-persisted sessions.
pub const SERVICE_CRN_ENV: &str = "IBM_SERVICE_CRN";

/// Client-local string storage.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> DashResult<Option<String>>;

    /// Write several values in one operation.
    fn set_all(&self, entries: &[(&str, &str)]) -> DashResult<()>;

    /// Remove several values in one operation.
    fn remove_all(&self, keys: &[&str]) -> DashResult<()>;
}

/// In-memory storage (tests and environment-seeded sessions).
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> DashResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> DashResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        for (key, value) in entries {
            values.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> DashResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }
}

/// A JSON object file on disk.
///
/// Writes go to a sibling temp file that is renamed into place. On Unix the
/// file is created with mode `0600`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Use the file at `path` (created on first write).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Default location: `$XDG_CONFIG_HOME/qdash/credentials.json`.
    pub fn default_path() -> DashResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("qdash").join("credentials.json"))
            .ok_or_else(|| DashError::Config("could not determine config directory".into()))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> DashResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> DashResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp)?;
        file.write_all(serde_json::to_string_pretty(map)?.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> DashResult<Option<String>> {
        Ok(self.read_map()?.remove(key))
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> DashResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        self.write_map(&map)
    }

    fn remove_all(&self, keys: &[&str]) -> DashResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        for key in keys {
            map.remove(*key);
        }
        self.write_map(&map)
    }
}

/// An API key and service CRN pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// IBM Cloud API key.
    pub api_key: String,
    /// Service CRN of the Quantum instance.
    pub service_crn: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("service_crn", &self.service_crn)
            .finish()
    }
}

impl Credentials {
    /// Read `IBM_API_KEY` and `IBM_SERVICE_CRN`; `None` unless both are set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var(API_KEY_ENV).ok().filter(|v| !v.is_empty())?;
        let service_crn = std::env::var(SERVICE_CRN_ENV).ok().filter(|v| !v.is_empty())?;
        Some(Self {
            api_key,
            service_crn,
        })
    }
}

/// Credential store shared by the token manager and the orchestrator.
pub struct CredentialStore {
    storage: Box<dyn KeyValueStore>,
    generation: AtomicU64,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("generation", &self.generation())
            .field("has_credentials", &self.has_credentials())
            .finish()
    }
}

impl CredentialStore {
    /// Create a store over the given storage.
    pub fn new(storage: impl KeyValueStore + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            generation: AtomicU64::new(0),
        }
    }

    /// An empty in-memory store.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// A file-backed store at the default path.
    pub fn open_default() -> DashResult<Self> {
        Ok(Self::new(FileStore::new(FileStore::default_path()?)))
    }

    /// An in-memory store seeded with `credentials`.
    pub fn with_credentials(credentials: &Credentials) -> DashResult<Self> {
        let store = Self::in_memory();
        store.set_credentials(&credentials.api_key, &credentials.service_crn)?;
        Ok(store)
    }

    /// Persist both values and invalidate tokens issued under the old ones.
    pub fn set_credentials(&self, api_key: &str, service_crn: &str) -> DashResult<()> {
        self.storage
            .set_all(&[(API_KEY_KEY, api_key), (SERVICE_CRN_KEY, service_crn)])?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        tracing::info!("credentials updated");
        Ok(())
    }

    /// Remove both values.
    pub fn clear(&self) -> DashResult<()> {
        self.storage.remove_all(&[API_KEY_KEY, SERVICE_CRN_KEY])?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        tracing::info!("credentials cleared");
        Ok(())
    }

    /// Whether both values are present and non-empty.
    pub fn has_credentials(&self) -> bool {
        self.api_key().is_some() && self.service_crn().is_some()
    }

    /// The stored API key, if any.
    pub fn api_key(&self) -> Option<String> {
        self.read(API_KEY_KEY)
    }

    /// The stored service CRN, if any.
    pub fn service_crn(&self) -> Option<String> {
        self.read(SERVICE_CRN_KEY)
    }

    /// Both values, if present.
    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            api_key: self.api_key()?,
            service_crn: self.service_crn()?,
        })
    }

    /// Counter bumped on every credential change.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!("failed to read {key} from credential storage: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_has_credentials() {
        let store = CredentialStore::in_memory();
        assert!(!store.has_credentials());

        store.set_credentials("k", "crn:v1:bluemix:public:quantum-computing").unwrap();
        assert!(store.has_credentials());
        assert_eq!(store.api_key().as_deref(), Some("k"));
    }

    #[test]
    fn test_empty_values_are_absent() {
        let store = CredentialStore::in_memory();
        store.set_credentials("", "crn:v1:x").unwrap();
        assert!(!store.has_credentials());
        assert!(store.api_key().is_none());
        assert!(store.service_crn().is_some());
    }

    #[test]
    fn test_generation_bumps_on_change() {
        let store = CredentialStore::in_memory();
        let g0 = store.generation();
        store.set_credentials("a", "b").unwrap();
        let g1 = store.generation();
        store.clear().unwrap();
        assert!(g1 > g0);
        assert!(store.generation() > g1);
        assert!(!store.has_credentials());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let creds = Credentials {
            api_key: "super-secret".into(),
            service_crn: "crn:v1:x".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("crn:v1:x"));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = CredentialStore::new(FileStore::new(&path));
        store.set_credentials("key-1", "crn:v1:a").unwrap();

        // A fresh store over the same file sees the persisted values.
        let reopened = CredentialStore::new(FileStore::new(&path));
        assert_eq!(reopened.api_key().as_deref(), Some("key-1"));
        assert_eq!(reopened.service_crn().as_deref(), Some("crn:v1:a"));

        reopened.clear().unwrap();
        assert!(!CredentialStore::new(FileStore::new(&path)).has_credentials());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        FileStore::new(&path).set_all(&[(API_KEY_KEY, "k")]).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));
        assert!(store.get(API_KEY_KEY).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "not json").unwrap();

        let store = CredentialStore::new(FileStore::new(&path));
        assert!(!store.has_credentials());
    }
}
