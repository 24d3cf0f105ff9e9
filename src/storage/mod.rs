//! Storage layer for healthdash data.
//!
//! ## Layout
//!
//! All data lives in one directory (default `~/.local/share/healthdash/`):
//!
//! - `health.db` - SQLite document store (primary record storage)
//! - `kv/health_<key>.json` - key-value store (profile, goals, reminders,
//!   settings, and records when the document store is unavailable)
//! - `config.kdl` - session configuration
//!
//! ## Storage tiers
//!
//! Records normally live in the [`DocumentStore`]. When it cannot be opened
//! the record store switches to [`StorageTier::KeyValue`] and keeps records
//! under `record_<id>` keys with a `records_index` id list.

pub mod backend;
pub mod files;
pub mod memory;
pub mod sqlite;

pub use backend::{
    Collection, DocumentStore, Index, KEY_PREFIX, KeyValueStore, StorageTier, StorageUsage,
};
pub use files::FileKeyValueStore;
pub use memory::{FailSwitch, MemoryDocumentStore, MemoryKeyValueStore};
pub use sqlite::SqliteDocumentStore;

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::HealthConfig;
use crate::{Error, Result};

/// Key-value keys used by the stores.
pub mod keys {
    pub const PROFILE: &str = "profile";
    pub const GOALS: &str = "goals";
    pub const REMINDERS: &str = "reminders";
    pub const SETTINGS: &str = "settings";
    pub const RECORDS_INDEX: &str = "records_index";

    /// Key holding one record in the key-value tier.
    pub fn record(id: &str) -> String {
        format!("record_{}", id)
    }
}

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "HDASH_DATA_DIR";

const DB_FILE: &str = "health.db";
const KV_DIR: &str = "kv";
const CONFIG_FILE: &str = "config.kdl";

/// Handle on an initialized data directory.
#[derive(Debug, Clone)]
pub struct Storage {
    /// Root directory for all healthdash data
    pub root: PathBuf,
}

impl Storage {
    /// Open existing storage in the resolved data directory.
    pub fn open(data_dir: Option<&Path>) -> Result<Self> {
        Self::open_with_data_dir(&get_storage_dir(data_dir)?)
    }

    /// Initialize storage in the resolved data directory.
    pub fn init(data_dir: Option<&Path>) -> Result<Self> {
        Self::init_with_data_dir(&get_storage_dir(data_dir)?)
    }

    /// Check whether storage exists in the resolved data directory.
    pub fn exists(data_dir: Option<&Path>) -> Result<bool> {
        Ok(Self::exists_with_data_dir(&get_storage_dir(data_dir)?))
    }

    /// Open existing storage rooted at `root`.
    pub fn open_with_data_dir(root: &Path) -> Result<Self> {
        if !Self::exists_with_data_dir(root) {
            return Err(Error::NotInitialized);
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Create the directory structure under `root`. Safe to repeat.
    pub fn init_with_data_dir(root: &Path) -> Result<Self> {
        fs::create_dir_all(root.join(KV_DIR))?;
        tracing::info!(root = %root.display(), "storage initialized");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn exists_with_data_dir(root: &Path) -> bool {
        root.join(KV_DIR).is_dir()
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join(DB_FILE)
    }

    pub fn kv_dir(&self) -> PathBuf {
        self.root.join(KV_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// The SQLite document store for this directory (not yet opened).
    pub fn documents(&self) -> SqliteDocumentStore {
        SqliteDocumentStore::new(self.db_path())
    }

    /// The file key-value store for this directory.
    pub fn key_value(&self) -> Result<Arc<FileKeyValueStore>> {
        Ok(Arc::new(FileKeyValueStore::open(self.kv_dir())?))
    }

    /// Read the session config, if present.
    pub fn read_config(&self) -> Result<Option<HealthConfig>> {
        read_config_file(&self.config_path())
    }

    /// Write the session config.
    pub fn write_config(&self, config: &HealthConfig) -> Result<()> {
        let path = self.config_path();
        let temp_path = path.with_extension("kdl.tmp");
        fs::write(&temp_path, config.to_kdl().to_string())?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }
}

/// Path of the system-wide config file (`~/.config/healthdash/config.kdl`).
pub fn system_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("healthdash").join(CONFIG_FILE))
}

/// Read the system-wide config, if present.
pub fn read_system_config() -> Result<Option<HealthConfig>> {
    match system_config_path() {
        Some(path) => read_config_file(&path),
        None => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<Option<HealthConfig>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(HealthConfig::from_kdl_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Resolve the data directory.
///
/// Precedence: explicit path > `HDASH_DATA_DIR` > `<data_dir>/healthdash`.
pub fn get_storage_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => return Ok(PathBuf::from(dir)),
        _ => {}
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("healthdash"))
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique id.
///
/// Format: `<prefix>-<12 hex chars>`, e.g. `record-3f9a0c1b2d4e`. The hash
/// covers the seed, the nanosecond clock and a process-wide counter.
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    hasher.update(ID_COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..12])
}
