//! SQLite-backed document store.
//!
//! Each collection is a table holding the document body as JSON text plus
//! one column per secondary index:
//!
//! ```text
//! records      (id, date, created_at, body)
//! achievements (id, date, kind, body)
//! ```

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::backend::{Collection, DocumentStore, Index, document_id};
use crate::{Error, Result};

/// Document store persisted in a single SQLite database file.
pub struct SqliteDocumentStore {
    path: Option<PathBuf>,
    conn: Option<Connection>,
}

impl SqliteDocumentStore {
    /// Store backed by the database at `path` (opened on `init`).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            conn: None,
        }
    }

    /// Store backed by a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            conn: None,
        }
    }

    /// Database file location, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::NotInitialized)
    }

    fn conn_mut(&mut self) -> Result<&mut Connection> {
        self.conn.as_mut().ok_or(Error::NotInitialized)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                date TEXT,
                created_at TEXT,
                body TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_records_date ON records(date);
            CREATE INDEX IF NOT EXISTS idx_records_created_at ON records(created_at);

            CREATE TABLE IF NOT EXISTS achievements (
                id TEXT PRIMARY KEY,
                date TEXT,
                kind TEXT,
                body TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_achievements_date ON achievements(date);
            CREATE INDEX IF NOT EXISTS idx_achievements_kind ON achievements(kind);
            "#,
        )?;
        Ok(())
    }
}

fn table(collection: Collection) -> &'static str {
    collection.as_str()
}

fn column(index: Index) -> &'static str {
    match index {
        Index::Date => "date",
        Index::CreatedAt => "created_at",
        Index::Type => "kind",
    }
}

/// `INSERT` (or `INSERT OR REPLACE`) statement for a collection.
fn insert_sql(collection: Collection, replace: bool) -> String {
    let indexes = collection.indexes();
    let mut columns = vec!["id"];
    columns.extend(indexes.iter().map(|i| column(*i)));
    columns.push("body");

    let placeholders: Vec<String> = (1..=columns.len()).map(|n| format!("?{}", n)).collect();
    format!(
        "INSERT{} INTO {} ({}) VALUES ({})",
        if replace { " OR REPLACE" } else { "" },
        table(collection),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Bound values matching [`insert_sql`]'s column order.
fn insert_values(collection: Collection, doc: &Value) -> Result<Vec<Option<String>>> {
    let mut values = vec![Some(document_id(doc)?.to_string())];
    values.extend(collection.indexes().iter().map(|i| i.key_of(doc)));
    values.push(Some(serde_json::to_string(doc)?));
    Ok(values)
}

fn parse_bodies(bodies: Vec<String>) -> Result<Vec<Value>> {
    bodies
        .iter()
        .map(|b| serde_json::from_str(b).map_err(Error::from))
        .collect()
}

impl DocumentStore for SqliteDocumentStore {
    fn init(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let conn = match &self.path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                Connection::open(path)?
            }
            None => Connection::open_in_memory()?,
        };
        Self::init_schema(&conn)?;
        tracing::debug!(path = ?self.path, "document store opened");
        self.conn = Some(conn);
        Ok(())
    }

    fn add(&mut self, collection: Collection, doc: &Value) -> Result<()> {
        let sql = insert_sql(collection, false);
        let values = insert_values(collection, doc)?;
        self.conn()?.execute(&sql, params_from_iter(values.iter()))?;
        Ok(())
    }

    fn add_batch(&mut self, collection: Collection, docs: &[Value]) -> Result<()> {
        let sql = insert_sql(collection, false);
        let tx = self.conn_mut()?.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for doc in docs {
                let values = insert_values(collection, doc)?;
                stmt.execute(params_from_iter(values.iter()))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn update(&mut self, collection: Collection, doc: &Value) -> Result<()> {
        let sql = insert_sql(collection, true);
        let values = insert_values(collection, doc)?;
        self.conn()?.execute(&sql, params_from_iter(values.iter()))?;
        Ok(())
    }

    fn delete(&mut self, collection: Collection, id: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table(collection));
        self.conn()?.execute(&sql, params![id])?;
        Ok(())
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let sql = format!("SELECT body FROM {} WHERE id = ?1", table(collection));
        let body: Option<String> = self
            .conn()?
            .query_row(&sql, params![id], |row| row.get(0))
            .optional()?;
        body.map(|b| serde_json::from_str(&b).map_err(Error::from))
            .transpose()
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>> {
        let sql = format!("SELECT body FROM {} ORDER BY rowid", table(collection));
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let bodies = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        parse_bodies(bodies)
    }

    fn get_by_index(&self, collection: Collection, index: Index, value: &str) -> Result<Vec<Value>> {
        collection.check_index(index)?;
        let sql = format!(
            "SELECT body FROM {} WHERE {} = ?1 ORDER BY rowid",
            table(collection),
            column(index)
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let bodies = stmt
            .query_map(params![value], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        parse_bodies(bodies)
    }

    fn get_by_range(
        &self,
        collection: Collection,
        index: Index,
        start: &str,
        end: &str,
    ) -> Result<Vec<Value>> {
        collection.check_index(index)?;
        let col = column(index);
        let sql = format!(
            "SELECT body FROM {} WHERE {col} >= ?1 AND {col} <= ?2 ORDER BY {col}, rowid",
            table(collection)
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let bodies = stmt
            .query_map(params![start, end], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        parse_bodies(bodies)
    }

    fn clear(&mut self, collection: Collection) -> Result<()> {
        let sql = format!("DELETE FROM {}", table(collection));
        self.conn()?.execute(&sql, [])?;
        Ok(())
    }

    fn count(&self, collection: Collection) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table(collection));
        let count: i64 = self.conn()?.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn backend_type(&self) -> &'static str {
        "sqlite"
    }
}
