//! libSQL backend for the result log.
//!
//! Every append is a single `INSERT`, so writes are atomic per entry and
//! never rewrite earlier rows. Reads order by an autoincrement sequence.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::LogWriteError;
use crate::store::migrations;
use crate::store::traits::{ResultLog, ResultLogEntry, ResultLogSnapshot};

const RESULT_COLUMNS: &str = "timestamp, agent, input_meta, extracted, actions, trace";

/// libSQL-backed result log.
pub struct LibSqlResultLog {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlResultLog {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, LogWriteError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                LogWriteError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path).build().await.map_err(|e| {
            LogWriteError::Connection(format!("Failed to open libSQL database: {e}"))
        })?;
        let log = Self::from_database(db).await?;
        info!(path = %path.display(), "Result log opened");
        Ok(log)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, LogWriteError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                LogWriteError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, LogWriteError> {
        let conn = db
            .connect()
            .map_err(|e| LogWriteError::Connection(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    async fn query_entries(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<ResultLogEntry>, LogWriteError> {
        let mut rows = self
            .conn
            .query(sql, params)
            .await
            .map_err(|e| LogWriteError::Query(format!("query results: {e}")))?;

        let mut entries = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => entries.push(row_to_entry(&row)?),
                Ok(None) => break,
                Err(e) => return Err(LogWriteError::Query(format!("read results: {e}"))),
            }
        }
        Ok(entries)
    }
}

/// Parse an RFC 3339 timestamp, falling back to the epoch for bad rows.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn row_to_entry(row: &libsql::Row) -> Result<ResultLogEntry, LogWriteError> {
    let get = |idx: i32| -> Result<String, LogWriteError> {
        row.get::<String>(idx)
            .map_err(|e| LogWriteError::Query(format!("row parse: {e}")))
    };
    Ok(ResultLogEntry {
        timestamp: parse_datetime(&get(0)?),
        agent: get(1)?,
        input_meta: serde_json::from_str(&get(2)?)?,
        extracted: serde_json::from_str(&get(3)?)?,
        actions: serde_json::from_str(&get(4)?)?,
        trace: get(5)?,
    })
}

#[async_trait]
impl ResultLog for LibSqlResultLog {
    async fn append(&self, entry: &ResultLogEntry) -> Result<(), LogWriteError> {
        let id = Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO results (id, timestamp, agent, input_id, input_meta, extracted, actions, trace)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.clone(),
                    entry.timestamp.to_rfc3339(),
                    entry.agent.clone(),
                    entry.input_id().to_string(),
                    serde_json::to_string(&entry.input_meta)?,
                    serde_json::to_string(&entry.extracted)?,
                    serde_json::to_string(&entry.actions)?,
                    entry.trace.clone(),
                ],
            )
            .await
            .map_err(|e| LogWriteError::Query(format!("append result: {e}")))?;

        debug!(id = %id, input_id = entry.input_id(), agent = %entry.agent, "Result appended");
        Ok(())
    }

    async fn load_all(&self) -> Result<ResultLogSnapshot, LogWriteError> {
        let results = self
            .query_entries(
                &format!("SELECT {RESULT_COLUMNS} FROM results ORDER BY seq ASC"),
                (),
            )
            .await?;
        Ok(ResultLogSnapshot { results })
    }

    async fn latest_for(&self, input_id: &str) -> Result<Option<ResultLogEntry>, LogWriteError> {
        let mut entries = self
            .query_entries(
                &format!(
                    "SELECT {RESULT_COLUMNS} FROM results WHERE input_id = ?1 ORDER BY seq DESC LIMIT 1"
                ),
                params![input_id],
            )
            .await?;
        Ok(entries.pop())
    }
}
