//! In-memory implementation of the `EventStore` trait.
//!
//! Holds every event in one insertion-ordered log behind a mutex. The
//! version check and the append happen under the same lock, so the store
//! offers the same all-or-nothing append semantics as the PostgreSQL store.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use chronicle_core::error::DomainError;
use chronicle_core::store::{EventStore, NewEvent, StoredEvent};

type StreamKey = (String, String);

#[derive(Debug, Default)]
struct Inner {
    log: Vec<StoredEvent>,
    versions: HashMap<StreamKey, i64>,
    event_ids: HashSet<Uuid>,
}

/// Event store that keeps all streams in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events across all streams.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store lock is poisoned.
    pub fn len(&self) -> Result<usize, DomainError> {
        Ok(self.lock()?.log.len())
    }

    /// Returns `true` if no events have been stored.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.lock()?.log.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, DomainError> {
        self.inner
            .lock()
            .map_err(|_| DomainError::Infrastructure("in-memory event store lock poisoned".into()))
    }

    fn select(
        &self,
        limit: u32,
        filter: impl Fn(&StoredEvent) -> bool,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .lock()?
            .log
            .iter()
            .filter(|event| filter(event))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[instrument(skip(self, events), fields(events_len = events.len()))]
    async fn save_events(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        events: &[NewEvent],
        expected_version: i64,
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut inner = self.lock()?;
        let key = (aggregate_type.to_owned(), aggregate_id.to_owned());
        let current_version = inner.versions.get(&key).copied().unwrap_or(0);
        if current_version != expected_version {
            warn!(current_version, "rejected append with stale expected version");
            return Err(DomainError::ConcurrencyConflict {
                aggregate_type: aggregate_type.to_owned(),
                aggregate_id: aggregate_id.to_owned(),
                expected: expected_version,
                actual: current_version,
            });
        }

        let mut batch_ids = HashSet::with_capacity(events.len());
        if let Some(duplicate) = events
            .iter()
            .map(|event| event.event_id)
            .find(|id| inner.event_ids.contains(id) || !batch_ids.insert(*id))
        {
            warn!(%duplicate, "rejected append with duplicate event id");
            return Err(DomainError::Infrastructure(format!(
                "duplicate event id {duplicate}"
            )));
        }

        let mut next_version = current_version;
        for event in events {
            next_version += 1;
            let position = i64::try_from(inner.log.len())
                .map_err(|e| DomainError::Infrastructure(e.to_string()))?
                + 1;
            inner.log.push(StoredEvent {
                position,
                event_id: event.event_id,
                aggregate_type: aggregate_type.to_owned(),
                aggregate_id: aggregate_id.to_owned(),
                event_type: event.event_type.clone(),
                event_data: event.event_data.clone(),
                event_version: event.event_version,
                aggregate_version: next_version,
                metadata: event.metadata.clone(),
                occurred_at: event.occurred_at,
            });
        }
        inner.versions.insert(key, next_version);
        inner.event_ids.extend(batch_ids);

        debug!(new_version = next_version, "events appended");
        Ok(())
    }

    async fn get_events(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        // The log is append-only, so stream order equals insertion order.
        self.select(u32::MAX, |event| {
            event.aggregate_type == aggregate_type && event.aggregate_id == aggregate_id
        })
    }

    async fn get_all_events(
        &self,
        from_event_id: Option<Uuid>,
        limit: u32,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let after = match from_event_id {
            None => 0,
            Some(event_id) => {
                let cursor = self
                    .lock()?
                    .log
                    .iter()
                    .find(|event| event.event_id == event_id)
                    .map(|event| event.position);
                match cursor {
                    Some(position) => position,
                    None => return Ok(Vec::new()),
                }
            }
        };
        self.select(limit, |event| event.position > after)
    }

    async fn get_events_by_type(
        &self,
        event_type: &str,
        limit: u32,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.select(limit, |event| event.event_type == event_type)
    }

    async fn current_version(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<i64, DomainError> {
        let key = (aggregate_type.to_owned(), aggregate_id.to_owned());
        Ok(self.lock()?.versions.get(&key).copied().unwrap_or(0))
    }
}
