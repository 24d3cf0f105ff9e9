//! Storage traits and shared storage types.
//!
//! Two kinds of persistence back the dashboard:
//! - [`DocumentStore`] - indexed collections of JSON documents (primary
//!   record storage)
//! - [`KeyValueStore`] - small JSON values under namespaced keys (profile,
//!   goals, reminders, settings, and the record fallback)

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Logical document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Records,
    Achievements,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Records => "records",
            Collection::Achievements => "achievements",
        }
    }

    /// Secondary indexes maintained for this collection.
    pub fn indexes(&self) -> &'static [Index] {
        match self {
            Collection::Records => &[Index::Date, Index::CreatedAt],
            Collection::Achievements => &[Index::Date, Index::Type],
        }
    }

    /// Reject indexes the collection does not maintain.
    pub fn check_index(&self, index: Index) -> Result<()> {
        if self.indexes().contains(&index) {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "Collection '{}' has no index '{}'",
                self.as_str(),
                index.field()
            )))
        }
    }
}

/// Secondary index over a document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    Date,
    CreatedAt,
    Type,
}

impl Index {
    /// Document field the index reads.
    pub fn field(&self) -> &'static str {
        match self {
            Index::Date => "date",
            Index::CreatedAt => "createdAt",
            Index::Type => "type",
        }
    }

    /// Index key of a document, if it has one.
    pub fn key_of(&self, doc: &Value) -> Option<String> {
        match doc.get(self.field())? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Identity of a document (its `id` string field).
pub fn document_id(doc: &Value) -> Result<&str> {
    doc.get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidInput("Document is missing a string 'id' field".to_string()))
}

/// Persistence tier holding the records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageTier {
    /// Document store is available (normal mode)
    #[default]
    Document,
    /// Document store failed to open; records live in the key-value store
    KeyValue,
}

impl StorageTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::KeyValue => "key-value",
        }
    }
}

impl std::fmt::Display for StorageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Indexed, transactional document persistence.
///
/// `init` doubles as the capability check: callers treat a failing `init` as
/// "document store unavailable" and fall back to the key-value tier.
pub trait DocumentStore: Send {
    /// Open the store and create collections and indexes.
    fn init(&mut self) -> Result<()>;

    /// Insert a new document; fails if the id already exists.
    fn add(&mut self, collection: Collection, doc: &Value) -> Result<()>;

    /// Insert many documents in one transaction (all or nothing).
    fn add_batch(&mut self, collection: Collection, docs: &[Value]) -> Result<()>;

    /// Insert or overwrite a document by id.
    fn update(&mut self, collection: Collection, doc: &Value) -> Result<()>;

    /// Delete a document by id. Deleting a missing id is not an error.
    fn delete(&mut self, collection: Collection, id: &str) -> Result<()>;

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>>;

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>>;

    /// Documents whose index key equals `value`.
    fn get_by_index(&self, collection: Collection, index: Index, value: &str) -> Result<Vec<Value>>;

    /// Documents whose index key falls in `start..=end`, ordered by key.
    fn get_by_range(
        &self,
        collection: Collection,
        index: Index,
        start: &str,
        end: &str,
    ) -> Result<Vec<Value>>;

    fn clear(&mut self, collection: Collection) -> Result<()>;

    fn count(&self, collection: Collection) -> Result<usize>;

    /// Short backend name (for display purposes).
    fn backend_type(&self) -> &'static str;
}

/// Prefix applied to every key so unrelated data never collides.
pub const KEY_PREFIX: &str = "health_";

/// Simple synchronous key-value persistence.
///
/// Keys are given without [`KEY_PREFIX`]; implementations namespace them.
pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>>;

    fn set_raw(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every namespaced key.
    fn clear(&self) -> Result<()>;

    /// Bytes used by namespaced values.
    fn size(&self) -> Result<u64>;

    /// Namespaced keys (without prefix), sorted.
    fn keys(&self) -> Result<Vec<String>>;
}

impl dyn KeyValueStore {
    /// Serialize `value` as JSON under `key`.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.set_raw(key, &json)
    }

    /// Read and deserialize `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Read `key`, returning `default` when it is missing or unreadable.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(key, error = %e, "unreadable value in key-value store, using default");
                default
            }
        }
    }

    /// Storage usage against a byte quota.
    pub fn usage(&self, quota: u64) -> Result<StorageUsage> {
        Ok(StorageUsage::new(self.size()?, quota))
    }
}

/// Validate a key for use as a storage name.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        || key.starts_with('.')
    {
        return Err(Error::InvalidInput(format!("Invalid storage key: {:?}", key)));
    }
    Ok(())
}

/// Bytes used versus the configured quota.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StorageUsage {
    pub used: u64,
    pub total: u64,
    /// Percentage used, two decimals
    pub percentage: f64,
}

impl StorageUsage {
    pub fn new(used: u64, total: u64) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            ((used as f64 / total as f64) * 10000.0).round() / 100.0
        };
        Self {
            used,
            total,
            percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_indexes() {
        assert!(Collection::Records.check_index(Index::Date).is_ok());
        assert!(Collection::Records.check_index(Index::CreatedAt).is_ok());
        assert!(Collection::Records.check_index(Index::Type).is_err());
        assert!(Collection::Achievements.check_index(Index::Type).is_ok());
    }

    #[test]
    fn test_index_key_of() {
        let doc = json!({"id": "a", "date": "2026-10-18", "type": 3});
        assert_eq!(Index::Date.key_of(&doc).as_deref(), Some("2026-10-18"));
        assert_eq!(Index::Type.key_of(&doc).as_deref(), Some("3"));
        assert_eq!(Index::CreatedAt.key_of(&doc), None);
    }

    #[test]
    fn test_document_id_required() {
        assert_eq!(document_id(&json!({"id": "x"})).unwrap(), "x");
        assert!(document_id(&json!({"id": 1})).is_err());
        assert!(document_id(&json!({})).is_err());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("goals").is_ok());
        assert!(validate_key("record_record-abc").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc").is_err());
        assert!(validate_key("a/b").is_err());
    }

    #[test]
    fn test_storage_usage_percentage() {
        let usage = StorageUsage::new(1024, 5 * 1024 * 1024);
        assert_eq!(usage.percentage, 0.02);
        assert_eq!(StorageUsage::new(10, 0).percentage, 0.0);
    }
}
