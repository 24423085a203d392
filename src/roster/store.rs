// SPDX-License-Identifier: MIT

//! Roster store - the authoritative list of workers
//!
//! Mutations are serialized through a single writer lock. Each one builds the
//! next roster off to the side, persists it in full, and only then publishes
//! it as the settled snapshot. A failed save therefore leaves memory matching
//! durable storage. Reads never wait on the writer.
//!
//! The highest id ever issued is stored next to the roster, so ids of removed
//! workers stay retired across restarts.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use super::config::RosterConfig;
use super::error::{PersistenceError, RosterError};
use super::model::{WorkerId, WorkerPatch, WorkerRecord, WorkerRecordInput};
use super::storage::{FileStorage, RosterPersistence};

const EVENT_CAPACITY: usize = 64;

/// Change notification emitted after a committed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RosterEvent {
    Loaded { count: usize },
    Added(WorkerRecord),
    Updated(WorkerRecord),
    Removed { id: WorkerId },
}

/// Hands out millisecond-timestamp ids, strictly increasing:
/// `max(now, last + 1)`
#[derive(Debug, Default)]
struct IdAllocator {
    /// Highest id ever issued or loaded
    last: u64,
}

impl IdAllocator {
    /// Raise the floor so no id at or below `id` is issued again
    fn observe(&mut self, id: u64) {
        self.last = self.last.max(id);
    }

    fn next(&mut self, now_ms: u64) -> Result<WorkerId, RosterError> {
        let bumped = self.last.checked_add(1).ok_or(RosterError::IdsExhausted {
            last: WorkerId(self.last),
        })?;
        self.last = bumped.max(now_ms);
        Ok(WorkerId(self.last))
    }
}

pub struct RosterStore {
    persistence: RosterPersistence,
    strict_fields: bool,
    /// Settled snapshot; `None` until `initialize` has run
    records: RwLock<Option<Vec<WorkerRecord>>>,
    writer: Mutex<IdAllocator>,
    events: broadcast::Sender<RosterEvent>,
}

impl RosterStore {
    pub fn new(persistence: RosterPersistence, strict_fields: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            persistence,
            strict_fields,
            records: RwLock::new(None),
            writer: Mutex::new(IdAllocator::default()),
            events,
        }
    }

    /// File-backed store described by `config`
    pub fn from_config(config: &RosterConfig) -> Self {
        let backend = Arc::new(FileStorage::new(&config.data_dir));
        Self::new(
            RosterPersistence::new(backend, config.storage_key.clone()),
            config.strict_fields,
        )
    }

    /// Load the roster from storage. Must be called once, before anything else.
    ///
    /// On a failed load the store still becomes usable with an empty roster,
    /// and the error is returned.
    pub async fn initialize(&self) -> Result<Vec<WorkerRecord>, RosterError> {
        let mut ids = self.writer.lock().await;
        if self.records.read().await.is_some() {
            return Err(RosterError::AlreadyInitialized);
        }

        let stored = async {
            let records = self.persistence.load().await?;
            let last_id = self.persistence.load_last_id().await?;
            Ok::<_, PersistenceError>((records, last_id))
        };
        let (loaded, result) = match stored.await {
            Ok((records, last_id)) => {
                if let Some(last_id) = last_id {
                    ids.observe(last_id);
                }
                (records.clone(), Ok(records))
            }
            Err(e) => {
                log::error!(
                    "Failed to load workers from '{}', starting empty: {}",
                    self.persistence.key(),
                    e
                );
                (vec![], Err(RosterError::from(e)))
            }
        };

        for record in &loaded {
            ids.observe(record.id.0);
        }
        let count = loaded.len();
        *self.records.write().await = Some(loaded);
        log::info!("Roster initialized with {} workers", count);
        self.notify(RosterEvent::Loaded { count });
        result
    }

    /// Validate and append a new worker, returning the committed record
    pub async fn add(&self, input: WorkerRecordInput) -> Result<WorkerRecord, RosterError> {
        input
            .validate(self.strict_fields)
            .map_err(RosterError::Validation)?;

        let mut ids = self.writer.lock().await;
        let mut next = self.snapshot().await?;

        // Allocated once; the same id goes to memory and to storage.
        let id = ids.next(now_millis())?;
        let record = WorkerRecord::from_input(id, input);
        next.push(record.clone());

        self.commit(next, &ids).await?;
        log::info!("Added worker {} ({})", record.id, record.name);
        self.notify(RosterEvent::Added(record.clone()));
        Ok(record)
    }

    /// Apply `patch` to the worker with `id`, returning the updated record
    pub async fn update(
        &self,
        id: WorkerId,
        patch: WorkerPatch,
    ) -> Result<WorkerRecord, RosterError> {
        let ids = self.writer.lock().await;
        let mut next = self.snapshot().await?;

        let record = next
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RosterError::not_found(id))?;
        let updated = patch
            .apply_to(record, self.strict_fields)
            .map_err(RosterError::Validation)?;
        *record = updated.clone();

        self.commit(next, &ids).await?;
        log::info!("Updated worker {} ({})", updated.id, updated.name);
        self.notify(RosterEvent::Updated(updated.clone()));
        Ok(updated)
    }

    /// Remove the worker with `id`; the order of the rest is kept
    pub async fn remove(&self, id: WorkerId) -> Result<WorkerRecord, RosterError> {
        let ids = self.writer.lock().await;
        let mut next = self.snapshot().await?;

        let index = next
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| RosterError::not_found(id))?;
        let removed = next.remove(index);

        self.commit(next, &ids).await?;
        log::info!("Removed worker {} ({})", removed.id, removed.name);
        self.notify(RosterEvent::Removed { id });
        Ok(removed)
    }

    /// Current settled roster in insertion order
    pub async fn list(&self) -> Result<Vec<WorkerRecord>, RosterError> {
        self.snapshot().await
    }

    /// Copy of a single worker
    pub async fn get(&self, id: WorkerId) -> Result<WorkerRecord, RosterError> {
        let records = self.records.read().await;
        let records = records.as_ref().ok_or(RosterError::NotInitialized)?;
        records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| RosterError::not_found(id))
    }

    /// Receive every committed change from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RosterEvent> {
        self.events.subscribe()
    }

    /// Same as `subscribe`, as a stream. Events missed by a lagging
    /// subscriber are skipped.
    pub fn changes(&self) -> impl Stream<Item = RosterEvent> {
        BroadcastStream::new(self.events.subscribe()).filter_map(|event| match event {
            Ok(event) => Some(event),
            Err(e) => {
                log::warn!("Roster subscriber fell behind: {}", e);
                None
            }
        })
    }

    async fn snapshot(&self) -> Result<Vec<WorkerRecord>, RosterError> {
        self.records
            .read()
            .await
            .clone()
            .ok_or(RosterError::NotInitialized)
    }

    /// Persist `next` and publish it. Callers hold the writer lock.
    ///
    /// The id high-water mark goes first: if the roster save then fails, the
    /// only cost is a skipped id.
    async fn commit(&self, next: Vec<WorkerRecord>, ids: &IdAllocator) -> Result<(), RosterError> {
        let saved = match self.persistence.save_last_id(ids.last).await {
            Ok(()) => self.persistence.save(&next).await,
            Err(e) => Err(e),
        };
        if let Err(e) = saved {
            log::error!("Failed to save workers, change rolled back: {}", e);
            return Err(e.into());
        }
        *self.records.write().await = Some(next);
        Ok(())
    }

    fn notify(&self, event: RosterEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}
