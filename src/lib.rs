//! healthdash - A local-first personal health dashboard.
//!
//! This library provides the core functionality for the `hdash` CLI tool:
//! daily health records, goals with automatic progress tracking, trend and
//! statistics aggregation, reminders, and data export/import.

pub mod aggregate;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod dates;
pub mod export;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod storage;
pub mod stores;
pub mod sync;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::dates::FixedClock;
    use crate::storage::{MemoryDocumentStore, MemoryKeyValueStore, Storage};
    use crate::stores::{GoalStore, RecordStore};

    /// Test environment with an isolated data directory.
    pub struct TestEnv {
        pub data_dir: TempDir,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self {
                data_dir: TempDir::new().unwrap(),
            }
        }

        pub fn data_path(&self) -> &Path {
            self.data_dir.path()
        }

        /// Initialize storage for this test environment.
        pub fn init_storage(&self) -> Storage {
            Storage::init_with_data_dir(self.data_path()).unwrap()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    /// In-memory record and goal stores pinned to `today`.
    pub fn memory_stores(
        today: &str,
    ) -> (RecordStore, GoalStore, Arc<MemoryKeyValueStore>) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let clock = Arc::new(FixedClock::on(crate::dates::parse_date(today).unwrap()));
        let mut records = RecordStore::new(Box::new(MemoryDocumentStore::new()), kv.clone(), clock);
        records.init();
        let goals = GoalStore::init(kv.clone());
        (records, goals, kv)
    }
}

/// Library-level error type for healthdash operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not initialized: run `hdash system init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a storage failure as a persistence error for `operation`.
    pub fn persistence(operation: &str, err: impl std::fmt::Display) -> Self {
        Error::Persistence(format!("{}: {}", operation, err))
    }

    /// Tag a failed store write with `operation`, keeping an existing
    /// persistence error as is.
    pub fn into_persistence(self, operation: &str) -> Self {
        match self {
            Error::Persistence(_) => self,
            other => Error::persistence(operation, other),
        }
    }
}

/// Result type alias for healthdash operations.
pub type Result<T> = std::result::Result<T, Error>;
