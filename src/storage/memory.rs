//! In-memory storage drivers.
//!
//! Used by tests and by callers that want a throwaway dashboard. Both stores
//! expose a failure switch so persistence errors can be injected.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::backend::{Collection, DocumentStore, Index, KeyValueStore, document_id, validate_key};
use crate::{Error, Result};

/// Shared switch that makes a store's writes fail while set.
#[derive(Debug, Clone, Default)]
pub struct FailSwitch(Arc<AtomicBool>);

impl FailSwitch {
    pub fn set(&self, failing: bool) {
        self.0.store(failing, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.is_set() {
            Err(Error::persistence(operation, "injected write failure"))
        } else {
            Ok(())
        }
    }
}

/// Document store kept in process memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: HashMap<Collection, Vec<Value>>,
    initialized: bool,
    unavailable: bool,
    writes: FailSwitch,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `init` always fails, as if the backend were missing.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Switch controlling write failures.
    pub fn write_switch(&self) -> FailSwitch {
        self.writes.clone()
    }

    fn docs(&self, collection: Collection) -> Result<&[Value]> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        Ok(self
            .collections
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    fn docs_mut(&mut self, collection: Collection, operation: &str) -> Result<&mut Vec<Value>> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        self.writes.check(operation)?;
        Ok(self.collections.entry(collection).or_default())
    }
}

fn position(docs: &[Value], id: &str) -> Option<usize> {
    docs.iter()
        .position(|d| d.get("id").and_then(Value::as_str) == Some(id))
}

impl DocumentStore for MemoryDocumentStore {
    fn init(&mut self) -> Result<()> {
        if self.unavailable {
            return Err(Error::Other("document store unavailable".to_string()));
        }
        self.initialized = true;
        Ok(())
    }

    fn add(&mut self, collection: Collection, doc: &Value) -> Result<()> {
        let id = document_id(doc)?.to_string();
        let docs = self.docs_mut(collection, "add")?;
        if position(docs, &id).is_some() {
            return Err(Error::persistence("add", format!("duplicate id {}", id)));
        }
        docs.push(doc.clone());
        Ok(())
    }

    fn add_batch(&mut self, collection: Collection, docs: &[Value]) -> Result<()> {
        let existing = self.docs_mut(collection, "add_batch")?;
        let mut staged = existing.clone();
        for doc in docs {
            let id = document_id(doc)?;
            if position(&staged, id).is_some() {
                return Err(Error::persistence("add_batch", format!("duplicate id {}", id)));
            }
            staged.push(doc.clone());
        }
        *existing = staged;
        Ok(())
    }

    fn update(&mut self, collection: Collection, doc: &Value) -> Result<()> {
        let id = document_id(doc)?.to_string();
        let docs = self.docs_mut(collection, "update")?;
        match position(docs, &id) {
            Some(i) => docs[i] = doc.clone(),
            None => docs.push(doc.clone()),
        }
        Ok(())
    }

    fn delete(&mut self, collection: Collection, id: &str) -> Result<()> {
        let docs = self.docs_mut(collection, "delete")?;
        docs.retain(|d| d.get("id").and_then(Value::as_str) != Some(id));
        Ok(())
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let docs = self.docs(collection)?;
        Ok(position(docs, id).map(|i| docs[i].clone()))
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>> {
        Ok(self.docs(collection)?.to_vec())
    }

    fn get_by_index(&self, collection: Collection, index: Index, value: &str) -> Result<Vec<Value>> {
        collection.check_index(index)?;
        Ok(self
            .docs(collection)?
            .iter()
            .filter(|d| index.key_of(d).as_deref() == Some(value))
            .cloned()
            .collect())
    }

    fn get_by_range(
        &self,
        collection: Collection,
        index: Index,
        start: &str,
        end: &str,
    ) -> Result<Vec<Value>> {
        collection.check_index(index)?;
        let mut hits: Vec<(String, Value)> = self
            .docs(collection)?
            .iter()
            .filter_map(|d| {
                let key = index.key_of(d)?;
                (key.as_str() >= start && key.as_str() <= end).then(|| (key, d.clone()))
            })
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(hits.into_iter().map(|(_, d)| d).collect())
    }

    fn clear(&mut self, collection: Collection) -> Result<()> {
        self.docs_mut(collection, "clear")?.clear();
        Ok(())
    }

    fn count(&self, collection: Collection) -> Result<usize> {
        Ok(self.docs(collection)?.len())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

/// Key-value store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<BTreeMap<String, String>>,
    writes: FailSwitch,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch controlling write failures.
    pub fn write_switch(&self) -> FailSwitch {
        self.writes.clone()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| Error::Other("key-value store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.writes.check("set")?;
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.writes.check("remove")?;
        self.lock()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.writes.check("clear")?;
        self.lock()?.clear();
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.lock()?.values().map(|v| v.len() as u64).sum())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}
