//! Persistence of Job, Action, and Trigger rows.
//!
//! # Versioning
//!
//! All three tables are append-only: an "update" inserts a new row sharing
//! the entity's `job_id`, and the current value is the row with the greatest
//! `created_at` (insertion order breaks ties). Rows are only ever removed by
//! the bulk per-job delete used by the saga.
//!
//! A connection is scoped to a single logical operation: opened on entry,
//! closed on every exit path when it drops.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Current value of a job definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub members: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Current value of an action or trigger attached to a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    pub job_id: String,
    pub name: String,
    pub payload: Value,
}

// ---------------------------------------------------------------------------
// EntityStore trait
// ---------------------------------------------------------------------------

/// Blocking persistence interface for the gateway's three entities.
///
/// Inserting an action or trigger for a `job_id` that already has one
/// appends a new version; there is no separate update operation for them.
pub trait EntityStore {
    /// Insert a new job and return its fresh identifier.
    fn insert_job(
        &self,
        name: &str,
        description: &str,
        author: &str,
        members: &[String],
    ) -> Result<String>;

    /// Append a new version row for an existing job identifier.
    fn update_job(
        &self,
        job_id: &str,
        name: &str,
        description: &str,
        author: &str,
        members: &[String],
    ) -> Result<()>;

    /// Delete every version row for the job identifier.
    fn delete_job(&self, job_id: &str) -> Result<()>;

    /// Current job value, or `None` when no row exists.
    fn job(&self, job_id: &str) -> Result<Option<JobRecord>>;

    /// Latest version of each job the user authored or is a member of,
    /// keyset-paginated by the creation time of `last_id`'s job.
    fn jobs(&self, user: &str, last_id: Option<&str>, limit: u32) -> Result<Vec<JobRecord>>;

    fn insert_action(&self, job_id: &str, name: &str, payload: &Value) -> Result<()>;
    fn delete_action(&self, job_id: &str) -> Result<()>;
    fn action(&self, job_id: &str) -> Result<Option<ItemRecord>>;

    fn insert_trigger(&self, job_id: &str, name: &str, payload: &Value) -> Result<()>;
    fn delete_trigger(&self, job_id: &str) -> Result<()>;
    fn trigger(&self, job_id: &str) -> Result<Option<ItemRecord>>;
}

// ---------------------------------------------------------------------------
// SQLite implementation
// ---------------------------------------------------------------------------

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS job (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    author TEXT NOT NULL,
    members TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS job_by_entity ON job (job_id, created_at);

CREATE TABLE IF NOT EXISTS action (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL,
    name TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS action_by_entity ON action (job_id, created_at);

CREATE TABLE IF NOT EXISTS "trigger" (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL,
    name TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS trigger_by_entity ON "trigger" (job_id, created_at);
"#;

/// SQLite-backed store. Holds only the database path; each operation opens
/// its own connection and releases it on return.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open or create the database at `path`, creating the schema if it
    /// doesn't already exist.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::Store(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn with_conn<T>(&self, op: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = Connection::open(&self.path).map_err(|e| Error::Store(e.to_string()))?;
        op(&conn).map_err(|e| Error::Store(e.to_string()))
    }

    fn insert_item(&self, table: &str, job_id: &str, name: &str, payload: &Value) -> Result<()> {
        let payload_text = payload.to_string();
        let sql = format!(
            r#"INSERT INTO "{table}" (job_id, name, payload, created_at) VALUES (?1, ?2, ?3, ?4)"#
        );
        self.with_conn(|conn| {
            conn.execute(&sql, (job_id, name, &payload_text, now_text()))?;
            Ok(())
        })
    }

    fn delete_item(&self, table: &str, job_id: &str) -> Result<()> {
        let sql = format!(r#"DELETE FROM "{table}" WHERE job_id = ?1"#);
        self.with_conn(|conn| {
            conn.execute(&sql, (job_id,))?;
            Ok(())
        })
    }

    fn select_item(&self, table: &str, job_id: &str) -> Result<Option<ItemRecord>> {
        let sql = format!(
            r#"SELECT job_id, name, payload FROM "{table}"
               WHERE job_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1"#
        );
        self.with_conn(|conn| {
            conn.query_row(&sql, (job_id,), |row| {
                Ok(ItemRecord {
                    job_id: row.get(0)?,
                    name: row.get(1)?,
                    payload: parse_json(row.get::<_, String>(2)?),
                })
            })
            .optional()
        })
    }
}

fn now_text() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

fn parse_json(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::Null)
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobRecord> {
    let members: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(JobRecord {
        job_id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        author: row.get(3)?,
        members: serde_json::from_str(&members).unwrap_or_default(),
        created_at: parse_time(&created_at),
    })
}

impl EntityStore for SqliteStore {
    fn insert_job(
        &self,
        name: &str,
        description: &str,
        author: &str,
        members: &[String],
    ) -> Result<String> {
        let job_id = Uuid::new_v4().to_string();
        let members_text =
            serde_json::to_string(members).map_err(|e| Error::Store(e.to_string()))?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO job (job_id, name, description, author, members, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (&job_id, name, description, author, &members_text, now_text()),
            )?;
            Ok(())
        })?;
        Ok(job_id)
    }

    fn update_job(
        &self,
        job_id: &str,
        name: &str,
        description: &str,
        author: &str,
        members: &[String],
    ) -> Result<()> {
        let members_text =
            serde_json::to_string(members).map_err(|e| Error::Store(e.to_string()))?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO job (job_id, name, description, author, members, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (job_id, name, description, author, &members_text, now_text()),
            )?;
            Ok(())
        })
    }

    fn delete_job(&self, job_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM job WHERE job_id = ?1", (job_id,))?;
            Ok(())
        })
    }

    fn job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT job_id, name, description, author, members, created_at FROM job
                 WHERE job_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
                (job_id,),
                row_to_job,
            )
            .optional()
        })
    }

    fn jobs(&self, user: &str, last_id: Option<&str>, limit: u32) -> Result<Vec<JobRecord>> {
        // Keyset cursor: resume after the creation time of the last job the
        // caller saw. An unknown cursor falls back to the beginning.
        let mut last_created = String::from("1990-01-01T00:00:00Z");
        if let Some(id) = last_id {
            if let Some(job) = self.job(id)? {
                last_created = job
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true);
            }
        }

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t1.job_id, t1.name, t1.description, t1.author, t1.members, t1.created_at
                 FROM job t1
                 INNER JOIN (
                     SELECT job_id, MAX(created_at) AS latest FROM job GROUP BY job_id
                 ) t2 ON t1.job_id = t2.job_id AND t1.created_at = t2.latest
                 WHERE t1.created_at > ?2
                   AND (t1.author = ?1 OR EXISTS (
                       SELECT 1 FROM json_each(t1.members) WHERE json_each.value = ?1
                   ))
                 ORDER BY t1.created_at
                 LIMIT ?3",
            )?;
            let rows = stmt.query_map((user, &last_created, limit), |row| row_to_job(row))?;
            rows.collect()
        })
    }

    fn insert_action(&self, job_id: &str, name: &str, payload: &Value) -> Result<()> {
        self.insert_item("action", job_id, name, payload)
    }

    fn delete_action(&self, job_id: &str) -> Result<()> {
        self.delete_item("action", job_id)
    }

    fn action(&self, job_id: &str) -> Result<Option<ItemRecord>> {
        self.select_item("action", job_id)
    }

    fn insert_trigger(&self, job_id: &str, name: &str, payload: &Value) -> Result<()> {
        self.insert_item("trigger", job_id, name, payload)
    }

    fn delete_trigger(&self, job_id: &str) -> Result<()> {
        self.delete_item("trigger", job_id)
    }

    fn trigger(&self, job_id: &str) -> Result<Option<ItemRecord>> {
        self.select_item("trigger", job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> SqliteStore {
        SqliteStore::open(&dir.path().join("gateway.db")).unwrap()
    }

    /// Version rows must not share a timestamp for ordering to be observable.
    fn settle() {
        std::thread::sleep(std::time::Duration::from_millis(2));
    }

    #[test]
    fn open_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gateway.db");
        SqliteStore::open(&path).unwrap();
        SqliteStore::open(&path).unwrap();
    }

    #[test]
    fn insert_job_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let id = store
            .insert_job("nightly", "runs at midnight", "alice", &["bob".into()])
            .unwrap();

        let job = store.job(&id).unwrap().unwrap();
        assert_eq!(job.job_id, id);
        assert_eq!(job.name, "nightly");
        assert_eq!(job.author, "alice");
        assert_eq!(job.members, vec!["bob".to_string()]);
    }

    #[test]
    fn missing_job_is_none() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(store.job("no-such-id").unwrap().is_none());
    }

    #[test]
    fn update_job_appends_a_version_and_latest_wins() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let id = store.insert_job("nightly", "v1", "alice", &[]).unwrap();
        settle();
        store.update_job(&id, "nightly", "v2", "alice", &[]).unwrap();

        let job = store.job(&id).unwrap().unwrap();
        assert_eq!(job.description, "v2");
    }

    #[test]
    fn versioned_action_read_returns_latest_payload() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store
            .insert_action("j1", "shell", &json!({"cmd": "ls"}))
            .unwrap();
        settle();
        store
            .insert_action("j1", "shell", &json!({"cmd": "ls -la"}))
            .unwrap();

        let action = store.action("j1").unwrap().unwrap();
        assert_eq!(action.payload, json!({"cmd": "ls -la"}));
    }

    #[test]
    fn delete_removes_every_version() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.insert_trigger("j1", "cron", &json!({"expr": "0 0 * * *"})).unwrap();
        settle();
        store.insert_trigger("j1", "cron", &json!({"expr": "0 6 * * *"})).unwrap();

        store.delete_trigger("j1").unwrap();
        assert!(store.trigger("j1").unwrap().is_none());

        // Deleting again is a no-op, not an error.
        store.delete_trigger("j1").unwrap();
    }

    #[test]
    fn jobs_lists_authored_and_member_jobs_only() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let mine = store.insert_job("mine", "", "alice", &[]).unwrap();
        settle();
        let shared = store
            .insert_job("shared", "", "bob", &["alice".into()])
            .unwrap();
        settle();
        store.insert_job("other", "", "bob", &[]).unwrap();

        let listed = store.jobs("alice", None, 10).unwrap();
        let ids: Vec<_> = listed.iter().map(|j| j.job_id.as_str()).collect();
        assert_eq!(ids, vec![mine.as_str(), shared.as_str()]);
    }

    #[test]
    fn jobs_paginates_after_cursor() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let first = store.insert_job("a", "", "alice", &[]).unwrap();
        settle();
        let second = store.insert_job("b", "", "alice", &[]).unwrap();
        settle();
        let third = store.insert_job("c", "", "alice", &[]).unwrap();

        let page = store.jobs("alice", Some(&first), 10).unwrap();
        let ids: Vec<_> = page.iter().map(|j| j.job_id.as_str()).collect();
        assert_eq!(ids, vec![second.as_str(), third.as_str()]);

        let limited = store.jobs("alice", None, 1).unwrap();
        assert_eq!(limited.len(), 1);
    }
}
