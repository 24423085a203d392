// SPDX-License-Identifier: MIT

//! Persistence adapter for the roster
//!
//! This module provides:
//! - `KeyValueStore` - raw string get/set over durable storage
//! - `MemoryStorage` - process-local backend, used in tests and dry runs
//! - `FileStorage` - one file per key under a data directory
//! - `RosterPersistence` - the whole roster as one JSON array under one key,
//!   plus the highest id ever issued under `<key>.last_id`

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use std::sync::Arc;

use super::error::PersistenceError;
use super::model::WorkerRecord;

/// Default key the roster is stored under
pub const DEFAULT_STORAGE_KEY: &str = "workers";

/// Durable key-value storage holding opaque string values
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` when nothing is stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Replace the value under `key`. Must be a single atomic overwrite.
    async fn set(&self, key: &str, value: String) -> Result<(), PersistenceError>;
}

/// Loads and saves the full roster under a single key
#[derive(Clone)]
pub struct RosterPersistence {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    last_id_key: String,
}

impl RosterPersistence {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            backend,
            last_id_key: format!("{}.last_id", key),
            key,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the stored roster; an absent or blank value is an empty roster
    pub async fn load(&self) -> Result<Vec<WorkerRecord>, PersistenceError> {
        match self.backend.get(&self.key).await? {
            Some(raw) if !raw.trim().is_empty() => {
                let records: Vec<WorkerRecord> = serde_json::from_str(&raw)?;
                log::debug!("Loaded {} workers from '{}'", records.len(), self.key);
                Ok(records)
            }
            _ => {
                log::debug!("No workers stored under '{}'", self.key);
                Ok(vec![])
            }
        }
    }

    /// Overwrite the stored roster with `records`
    pub async fn save(&self, records: &[WorkerRecord]) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(records)?;
        self.backend.set(&self.key, raw).await?;
        log::debug!("Saved {} workers to '{}'", records.len(), self.key);
        Ok(())
    }

    /// Highest id ever issued, `None` if never recorded
    pub async fn load_last_id(&self) -> Result<Option<u64>, PersistenceError> {
        match self.backend.get(&self.last_id_key).await? {
            Some(raw) if !raw.trim().is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
            _ => Ok(None),
        }
    }

    pub async fn save_last_id(&self, last_id: u64) -> Result<(), PersistenceError> {
        self.backend
            .set(&self.last_id_key, serde_json::to_string(&last_id)?)
            .await
    }
}
