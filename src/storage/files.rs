//! Key-value store backed by a directory of JSON files.
//!
//! Each key is stored as `<dir>/health_<key>.json`. Writes go to a temp file
//! that is renamed into place, so a crash never leaves a half-written value.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::backend::{KEY_PREFIX, KeyValueStore, validate_key};
use crate::Result;

const EXTENSION: &str = "json";

/// Key-value store persisted as one file per key.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Open (creating if needed) the store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}{}.{}", KEY_PREFIX, key, EXTENSION)))
    }

    /// Namespaced files in the store directory, as (key, path) pairs.
    fn entries(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let key = name
                .strip_prefix(KEY_PREFIX)
                .and_then(|rest| rest.strip_suffix(&format!(".{}", EXTENSION)));
            if let Some(key) = key {
                entries.push((key.to_string(), path.clone()));
            }
        }
        entries.sort();
        Ok(entries)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let temp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<()> {
        for (_, path) in self.entries()? {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        let mut total = 0;
        for (_, path) in self.entries()? {
            total += fs::metadata(path)?.len();
        }
        Ok(total)
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries()?.into_iter().map(|(key, _)| key).collect())
    }
}
