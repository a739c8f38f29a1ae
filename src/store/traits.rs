//! `ResultLog` trait: append-only store of per-run results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LogWriteError;
use crate::pipeline::types::InputMeta;

/// One processed document, as recorded in the result log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultLogEntry {
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub input_meta: InputMeta,
    /// Extracted fields plus intent and confidence.
    pub extracted: serde_json::Value,
    /// Candidate action descriptions, in order.
    pub actions: Vec<String>,
    pub trace: String,
}

impl ResultLogEntry {
    /// Identifier this entry is looked up by.
    pub fn input_id(&self) -> &str {
        self.input_meta.input_id()
    }
}

/// Everything in the log, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultLogSnapshot {
    pub results: Vec<ResultLogEntry>,
}

/// Backend-agnostic append-only result log.
///
/// Appends never rewrite existing entries, so concurrent writers cannot
/// lose each other's updates.
#[async_trait]
pub trait ResultLog: Send + Sync {
    /// Append one entry.
    async fn append(&self, entry: &ResultLogEntry) -> Result<(), LogWriteError>;

    /// Load every entry, oldest first.
    async fn load_all(&self) -> Result<ResultLogSnapshot, LogWriteError>;

    /// Most recent entry for an input identifier.
    async fn latest_for(&self, input_id: &str) -> Result<Option<ResultLogEntry>, LogWriteError> {
        let snapshot = self.load_all().await?;
        Ok(snapshot
            .results
            .into_iter()
            .rev()
            .find(|e| e.input_id() == input_id))
    }
}
