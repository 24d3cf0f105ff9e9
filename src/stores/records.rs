//! Daily health records over the two storage tiers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::dates::{Clock, DateRange};
use crate::models::{Record, RecordPatch};
use crate::storage::{
    Collection, DocumentStore, Index, KeyValueStore, StorageTier, generate_id, keys,
};
use crate::stores::GoalStore;
use crate::sync::{SyncReport, sync_goals};
use crate::{Error, Result};

/// Result of a successful add or update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub record: Record,
    /// Present when the record is today's and goals were synchronized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncReport>,
}

/// Records plus export timestamp.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordExport {
    pub records: Vec<Record>,
    pub exported_at: DateTime<Utc>,
}

/// Counts from a batch import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    /// Records skipped because their id already exists
    pub skipped: usize,
}

enum Write<'a> {
    Insert(&'a Record),
    Overwrite(&'a Record),
    Remove(&'a str),
}

/// Canonical list of daily records.
///
/// The list is ordered newest date first after load; new records are
/// inserted at the head.
pub struct RecordStore {
    documents: Box<dyn DocumentStore>,
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    tier: StorageTier,
    records: Vec<Record>,
    today: Option<Record>,
    error: Option<String>,
}

impl RecordStore {
    pub fn new(
        documents: Box<dyn DocumentStore>,
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            documents,
            kv,
            clock,
            tier: StorageTier::Document,
            records: Vec::new(),
            today: None,
            error: None,
        }
    }

    /// Select the storage tier and load every record.
    ///
    /// A document store that fails to open switches the store to the
    /// key-value tier for the rest of the session. Nothing is migrated
    /// between tiers.
    pub fn init(&mut self) -> StorageTier {
        match self.documents.init() {
            Ok(()) => {
                self.tier = StorageTier::Document;
                self.error = None;
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.documents.backend_type(),
                    error = %e,
                    "document store unavailable, falling back to key-value storage"
                );
                self.tier = StorageTier::KeyValue;
                self.error = Some(format!("document store unavailable: {}", e));
            }
        }
        self.reload();
        self.tier
    }

    fn reload(&mut self) {
        let loaded = match self.tier {
            StorageTier::Document => self.load_documents(),
            StorageTier::KeyValue => Ok(self.load_key_value()),
        };
        match loaded {
            Ok(mut records) => {
                records.sort_by(|a, b| b.date.cmp(&a.date));
                self.records = records;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load records");
                self.error = Some(e.to_string());
                self.records.clear();
            }
        }
        self.refresh_today();
        tracing::debug!(count = self.records.len(), tier = %self.tier, "records loaded");
    }

    fn load_documents(&self) -> Result<Vec<Record>> {
        self.documents
            .get_all(Collection::Records)?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(Error::from))
            .collect()
    }

    /// Records listed in `records_index`; unreadable entries are skipped.
    fn load_key_value(&self) -> Vec<Record> {
        let ids: Vec<String> = self.kv.get_or(keys::RECORDS_INDEX, Vec::new());
        ids.iter()
            .filter_map(|id| match self.kv.get::<Record>(&keys::record(id)) {
                Ok(Some(record)) => Some(record),
                Ok(None) => {
                    tracing::warn!(id = %id, "indexed record missing from key-value store");
                    None
                }
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "unreadable record in key-value store");
                    None
                }
            })
            .collect()
    }

    /// Cache the most recently written record dated today.
    fn refresh_today(&mut self) {
        let today = self.clock.today();
        self.today = self
            .records
            .iter()
            .filter(|r| r.date == today)
            .max_by_key(|r| r.updated_at)
            .cloned();
    }

    fn index_without(&self, id: &str) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| r.id != id)
            .map(|r| r.id.clone())
            .collect()
    }

    fn write(&mut self, write: Write<'_>) -> Result<()> {
        let result = match self.tier {
            StorageTier::Document => match write {
                Write::Insert(record) => serde_json::to_value(record)
                    .map_err(Error::from)
                    .and_then(|doc| self.documents.add(Collection::Records, &doc)),
                Write::Overwrite(record) => serde_json::to_value(record)
                    .map_err(Error::from)
                    .and_then(|doc| self.documents.update(Collection::Records, &doc)),
                Write::Remove(id) => self.documents.delete(Collection::Records, id),
            },
            StorageTier::KeyValue => match write {
                Write::Insert(record) => {
                    let mut index = self.index_without(&record.id);
                    index.push(record.id.clone());
                    self.kv
                        .set(&keys::record(&record.id), record)
                        .and_then(|()| self.kv.set(keys::RECORDS_INDEX, &index))
                }
                Write::Overwrite(record) => self.kv.set(&keys::record(&record.id), record),
                Write::Remove(id) => {
                    let index = self.index_without(id);
                    self.kv
                        .set(keys::RECORDS_INDEX, &index)
                        .and_then(|()| self.kv.remove(&keys::record(id)))
                }
            },
        };

        match result {
            Ok(()) => {
                self.error = None;
                Ok(())
            }
            Err(e) => {
                let err = e.into_persistence("record write");
                tracing::warn!(tier = %self.tier, error = %err, "record write failed");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn sync_if_today(&self, record: &Record, goals: &mut GoalStore) -> Option<SyncReport> {
        (record.date == self.clock.today()).then(|| sync_goals(record, goals))
    }

    /// Create a record from `patch` on top of the default template.
    ///
    /// The date defaults to today. Goals are synchronized when the record is
    /// today's.
    pub fn add_record(&mut self, patch: &RecordPatch, goals: &mut GoalStore) -> Result<RecordOutcome> {
        let date = patch.date.unwrap_or_else(|| self.clock.today());
        let id = generate_id("record", &date.to_string());
        let record = Record::from_patch(id, date, patch);

        self.write(Write::Insert(&record))?;
        self.records.insert(0, record.clone());
        if record.date == self.clock.today() {
            self.today = Some(record.clone());
        }
        tracing::info!(id = %record.id, date = %record.date, "record added");

        let sync = self.sync_if_today(&record, goals);
        Ok(RecordOutcome { record, sync })
    }

    /// Merge `patch` into the record `id`. `Ok(None)` if absent.
    pub fn update_record(
        &mut self,
        id: &str,
        patch: &RecordPatch,
        goals: &mut GoalStore,
    ) -> Result<Option<RecordOutcome>> {
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let mut record = self.records[index].clone();
        record.merge(patch);
        record.updated_at = Utc::now();

        self.write(Write::Overwrite(&record))?;
        self.records[index] = record.clone();
        if record.date == self.clock.today() {
            self.today = Some(record.clone());
        } else if self.today.as_ref().is_some_and(|t| t.id == record.id) {
            self.refresh_today();
        }
        tracing::info!(id = %record.id, "record updated");

        let sync = self.sync_if_today(&record, goals);
        Ok(Some(RecordOutcome { record, sync }))
    }

    /// Delete the record `id`. `Ok(false)` if absent.
    ///
    /// Deleting the cached today record clears the cache, or hands it to the
    /// most recently written other record dated today when there is one.
    pub fn delete_record(&mut self, id: &str) -> Result<bool> {
        if !self.records.iter().any(|r| r.id == id) {
            return Ok(false);
        }
        self.write(Write::Remove(id))?;
        self.records.retain(|r| r.id != id);
        if self.today.as_ref().is_some_and(|t| t.id == id) {
            self.refresh_today();
        }
        tracing::info!(id, "record deleted");
        Ok(true)
    }

    /// Insert many records at once and reload.
    ///
    /// In the document tier the batch is a single transaction. Records whose
    /// id already exists are skipped.
    pub fn import_records(&mut self, records: Vec<Record>) -> Result<ImportSummary> {
        let existing: HashSet<&str> = self.records.iter().map(|r| r.id.as_str()).collect();
        let mut seen = HashSet::new();
        let mut fresh = Vec::new();
        let mut skipped = 0;
        for record in records {
            if existing.contains(record.id.as_str()) || !seen.insert(record.id.clone()) {
                skipped += 1;
            } else {
                fresh.push(record);
            }
        }

        if !fresh.is_empty() {
            let result = match self.tier {
                StorageTier::Document => fresh
                    .iter()
                    .map(|r| serde_json::to_value(r).map_err(Error::from))
                    .collect::<Result<Vec<_>>>()
                    .and_then(|docs| self.documents.add_batch(Collection::Records, &docs)),
                StorageTier::KeyValue => self.import_key_value(&fresh),
            };
            if let Err(e) = result {
                let err = e.into_persistence("import records");
                self.error = Some(err.to_string());
                return Err(err);
            }
            self.error = None;
            self.reload();
        }

        tracing::info!(imported = fresh.len(), skipped, "records imported");
        Ok(ImportSummary {
            imported: fresh.len(),
            skipped,
        })
    }

    fn import_key_value(&self, records: &[Record]) -> Result<()> {
        let mut index: Vec<String> = self.records.iter().map(|r| r.id.clone()).collect();
        for record in records {
            self.kv.set(&keys::record(&record.id), record)?;
            index.push(record.id.clone());
        }
        self.kv.set(keys::RECORDS_INDEX, &index)
    }

    /// All records, newest date first.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// First record on `date`.
    pub fn get_record_by_date(&self, date: NaiveDate) -> Option<&Record> {
        self.records.iter().find(|r| r.date == date)
    }

    /// Records dated within `start..=end`.
    ///
    /// Served from the document store's date index when it is active.
    pub fn records_by_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Record>> {
        match self.tier {
            StorageTier::Document => self
                .documents
                .get_by_range(
                    Collection::Records,
                    Index::Date,
                    &start.to_string(),
                    &end.to_string(),
                )?
                .into_iter()
                .map(|doc| serde_json::from_value(doc).map_err(Error::from))
                .collect(),
            StorageTier::KeyValue => {
                let range = DateRange::new(start, end);
                let mut hits: Vec<Record> = self
                    .records
                    .iter()
                    .filter(|r| range.contains(r.date))
                    .cloned()
                    .collect();
                hits.sort_by(|a, b| a.date.cmp(&b.date));
                Ok(hits)
            }
        }
    }

    pub fn today_record(&self) -> Option<&Record> {
        self.today.as_ref()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn tier(&self) -> StorageTier {
        self.tier
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Export records, optionally limited to a date range.
    pub fn export(&self, range: Option<DateRange>) -> RecordExport {
        let records = self
            .records
            .iter()
            .filter(|r| range.is_none_or(|range| range.contains(r.date)))
            .cloned()
            .collect();
        RecordExport {
            records,
            exported_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{FixedClock, parse_date};
    use crate::models::{GoalPeriod, GoalStatus, GoalType, NewGoal, Sleep};
    use crate::storage::{MemoryDocumentStore, MemoryKeyValueStore};
    use crate::test_utils::memory_stores;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn steps(n: u32) -> RecordPatch {
        RecordPatch {
            steps: Some(n),
            ..Default::default()
        }
    }

    fn steps_goal(goals: &mut GoalStore) -> String {
        goals
            .add_goal(NewGoal {
                goal_type: GoalType::Steps,
                period: GoalPeriod::Daily,
                target_value: 10000.0,
                name: None,
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_add_today_record_syncs_goal() {
        let (mut records, mut goals, _) = memory_stores("2026-10-18");
        let goal_id = steps_goal(&mut goals);

        let outcome = records.add_record(&steps(8000), &mut goals).unwrap();

        assert_eq!(outcome.record.date, date("2026-10-18"));
        assert!(outcome.sync.is_some());
        let goal = goals.get(&goal_id).unwrap();
        assert_eq!(goal.current_value, 8000.0);
        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(goals.today_progress()[0].progress, 80);
        assert_eq!(records.today_record().unwrap().id, outcome.record.id);
    }

    #[test]
    fn test_update_to_target_completes_goal() {
        let (mut records, mut goals, _) = memory_stores("2026-10-18");
        let goal_id = steps_goal(&mut goals);
        let id = records.add_record(&steps(8000), &mut goals).unwrap().record.id;

        let outcome = records
            .update_record(&id, &steps(10500), &mut goals)
            .unwrap()
            .unwrap();

        assert_eq!(outcome.record.steps, Some(10500));
        let goal = goals.get(&goal_id).unwrap();
        assert_eq!(goal.status, GoalStatus::Completed);
        let progress = crate::models::GoalProgress::from_goal(goal);
        assert_eq!(progress.progress, 100);
        assert_eq!(progress.remaining, 0.0);
    }

    #[test]
    fn test_past_record_does_not_sync() {
        let (mut records, mut goals, _) = memory_stores("2026-10-18");
        let goal_id = steps_goal(&mut goals);

        let patch = RecordPatch {
            date: Some(date("2026-10-17")),
            ..steps(12000)
        };
        let outcome = records.add_record(&patch, &mut goals).unwrap();

        assert!(outcome.sync.is_none());
        assert_eq!(goals.get(&goal_id).unwrap().current_value, 0.0);
        assert!(records.today_record().is_none());
    }

    #[test]
    fn test_empty_patch_only_touches_updated_at() {
        let (mut records, mut goals, _) = memory_stores("2026-10-18");
        let patch = RecordPatch {
            sleep: Some(Sleep {
                duration: Some(7.0),
                quality: Some("good".to_string()),
                ..Default::default()
            }),
            notes: Some("run".to_string()),
            ..steps(500)
        };
        let before = records.add_record(&patch, &mut goals).unwrap().record;

        let after = records
            .update_record(&before.id, &RecordPatch::default(), &mut goals)
            .unwrap()
            .unwrap()
            .record;

        let mut expected = before.clone();
        expected.updated_at = after.updated_at;
        assert_eq!(after, expected);
        assert!(after.updated_at >= before.updated_at);
    }

    #[test]
    fn test_update_missing_record_is_none() {
        let (mut records, mut goals, _) = memory_stores("2026-10-18");
        assert!(records
            .update_record("record-missing", &steps(1), &mut goals)
            .unwrap()
            .is_none());
        assert!(!records.delete_record("record-missing").unwrap());
    }

    #[test]
    fn test_delete_today_clears_cache() {
        let (mut records, mut goals, _) = memory_stores("2026-10-18");
        let id = records.add_record(&steps(100), &mut goals).unwrap().record.id;

        assert!(records.delete_record(&id).unwrap());

        assert!(records.today_record().is_none());
        assert!(records.get_record_by_date(date("2026-10-18")).is_none());
        assert!(records.records().is_empty());
    }

    #[test]
    fn test_failed_write_leaves_list_unchanged() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let documents = MemoryDocumentStore::new();
        let switch = documents.write_switch();
        let clock = Arc::new(FixedClock::on(date("2026-10-18")));
        let mut records = RecordStore::new(Box::new(documents), kv.clone(), clock);
        records.init();
        let mut goals = GoalStore::init(kv);

        let first = records.add_record(&steps(100), &mut goals).unwrap().record;
        switch.set(true);

        let err = records.add_record(&steps(200), &mut goals).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert_eq!(records.records().len(), 1);
        assert!(records.last_error().is_some());

        let message = records.last_error().unwrap();
        assert_eq!(message.matches("Persistence error").count(), 1);

        assert!(records.update_record(&first.id, &steps(999), &mut goals).is_err());
        assert_eq!(records.get(&first.id).unwrap().steps, Some(100));
        assert!(records.delete_record(&first.id).is_err());
        assert_eq!(records.records().len(), 1);

        switch.set(false);
        records.add_record(&steps(300), &mut goals).unwrap();
        assert!(records.last_error().is_none());
    }

    #[test]
    fn test_same_day_records_keep_cache_and_goal_in_step() {
        let (mut records, mut goals, _) = memory_stores("2026-10-18");
        let goal_id = steps_goal(&mut goals);

        let agree = |records: &RecordStore, goals: &GoalStore, expected: u32| {
            assert_eq!(records.today_record().unwrap().steps, Some(expected));
            assert_eq!(goals.get(&goal_id).unwrap().current_value, expected as f64);
        };

        let first = records.add_record(&steps(1000), &mut goals).unwrap().record;
        agree(&records, &goals, 1000);
        let second = records.add_record(&steps(2000), &mut goals).unwrap().record;
        agree(&records, &goals, 2000);

        records.init();
        assert_eq!(records.today_record().unwrap().id, second.id);
        agree(&records, &goals, 2000);

        records.update_record(&first.id, &steps(3000), &mut goals).unwrap();
        assert_eq!(records.today_record().unwrap().id, first.id);
        agree(&records, &goals, 3000);

        records.init();
        assert_eq!(records.today_record().unwrap().id, first.id);
        agree(&records, &goals, 3000);

        let moved = RecordPatch {
            date: Some(date("2026-10-17")),
            ..Default::default()
        };
        records.update_record(&first.id, &moved, &mut goals).unwrap();
        assert_eq!(records.today_record().unwrap().id, second.id);

        records.delete_record(&second.id).unwrap();
        assert!(records.today_record().is_none());
    }

    #[test]
    fn test_unavailable_document_store_falls_back_to_key_value() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let clock = Arc::new(FixedClock::on(date("2026-10-18")));

        let mut seeded = Record::new("record-old".to_string(), date("2026-10-10"));
        seeded.steps = Some(4321);
        let kv_dyn: Arc<dyn KeyValueStore> = kv.clone();
        kv_dyn.set(&keys::record("record-old"), &seeded).unwrap();
        kv_dyn.set(keys::RECORDS_INDEX, &vec!["record-old", "record-gone"]).unwrap();

        let mut records =
            RecordStore::new(Box::new(MemoryDocumentStore::unavailable()), kv.clone(), clock);
        assert_eq!(records.init(), StorageTier::KeyValue);
        assert!(records.last_error().unwrap().contains("unavailable"));
        assert_eq!(records.records().len(), 1);
        assert_eq!(records.records()[0].steps, Some(4321));

        let mut goals = GoalStore::init(kv.clone());
        let added = records.add_record(&steps(10), &mut goals).unwrap().record;
        let index: Vec<String> = kv_dyn.get(keys::RECORDS_INDEX).unwrap().unwrap();
        assert!(index.contains(&added.id));
        assert!(kv_dyn.get::<Record>(&keys::record(&added.id)).unwrap().is_some());

        records.delete_record("record-old").unwrap();
        assert!(kv_dyn.get_raw(&keys::record("record-old")).unwrap().is_none());
    }

    #[test]
    fn test_init_sorts_newest_first() {
        let (mut records, mut goals, _) = memory_stores("2026-10-18");
        for d in ["2026-10-15", "2026-10-18", "2026-10-01"] {
            let patch = RecordPatch {
                date: Some(date(d)),
                ..Default::default()
            };
            records.add_record(&patch, &mut goals).unwrap();
        }
        records.init();
        let dates: Vec<_> = records.records().iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2026-10-18", "2026-10-15", "2026-10-01"]);
        assert!(records.today_record().is_some());
    }

    #[test]
    fn test_records_by_range_inclusive() {
        let (mut records, mut goals, _) = memory_stores("2026-10-18");
        for d in ["2026-10-11", "2026-10-12", "2026-10-18", "2026-10-19"] {
            let patch = RecordPatch {
                date: Some(date(d)),
                ..Default::default()
            };
            records.add_record(&patch, &mut goals).unwrap();
        }
        let hits = records
            .records_by_range(date("2026-10-12"), date("2026-10-18"))
            .unwrap();
        let dates: Vec<_> = hits.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2026-10-12", "2026-10-18"]);
    }

    #[test]
    fn test_import_skips_existing_ids() {
        let (mut records, mut goals, _) = memory_stores("2026-10-18");
        let existing = records.add_record(&steps(1), &mut goals).unwrap().record;

        let incoming = vec![
            existing.clone(),
            Record::new("record-a".to_string(), date("2026-10-01")),
            Record::new("record-a".to_string(), date("2026-10-02")),
            Record::new("record-b".to_string(), date("2026-10-03")),
        ];
        let summary = records.import_records(incoming).unwrap();

        assert_eq!(summary, ImportSummary { imported: 2, skipped: 2 });
        assert_eq!(records.records().len(), 3);
        assert_eq!(records.records()[0].id, existing.id);
    }

    #[test]
    fn test_export_range() {
        let (mut records, mut goals, _) = memory_stores("2026-10-18");
        for d in ["2026-09-30", "2026-10-01"] {
            let patch = RecordPatch {
                date: Some(date(d)),
                ..Default::default()
            };
            records.add_record(&patch, &mut goals).unwrap();
        }
        let all = records.export(None);
        assert_eq!(all.records.len(), 2);
        let october = records.export(Some(DateRange::new(date("2026-10-01"), date("2026-10-31"))));
        assert_eq!(october.records.len(), 1);
    }
}
