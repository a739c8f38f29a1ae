//! In-memory result log, for tests and throwaway runs.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::LogWriteError;
use crate::store::traits::{ResultLog, ResultLogEntry, ResultLogSnapshot};

#[derive(Debug, Default)]
pub struct MemoryResultLog {
    entries: RwLock<Vec<ResultLogEntry>>,
}

impl MemoryResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ResultLog for MemoryResultLog {
    async fn append(&self, entry: &ResultLogEntry) -> Result<(), LogWriteError> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<ResultLogSnapshot, LogWriteError> {
        Ok(ResultLogSnapshot {
            results: self.entries.read().await.clone(),
        })
    }
}
