//! Test stores — mock `EventStore` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::event::DomainEvent;
use chronicle_core::store::{EventStore, NewEvent, StoredEvent};
use uuid::Uuid;

/// Builds the stored rows a store would return for `events` appended to a
/// fresh stream, with positions and aggregate versions starting at 1.
///
/// # Panics
///
/// Panics if `events` holds more than `i64::MAX` entries.
#[must_use]
pub fn stored_history<E: DomainEvent>(
    aggregate_type: &str,
    aggregate_id: &str,
    events: &[E],
) -> Vec<StoredEvent> {
    events
        .iter()
        .enumerate()
        .map(|(index, event)| {
            let new_event = event.to_new_event();
            let version = i64::try_from(index + 1).unwrap();
            StoredEvent {
                position: version,
                event_id: new_event.event_id,
                aggregate_type: aggregate_type.to_owned(),
                aggregate_id: aggregate_id.to_owned(),
                event_type: new_event.event_type,
                event_data: new_event.event_data,
                event_version: new_event.event_version,
                aggregate_version: version,
                metadata: new_event.metadata,
                occurred_at: new_event.occurred_at,
            }
        })
        .collect()
}

/// One recorded `save_events` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedBatch {
    /// Aggregate type passed to the store.
    pub aggregate_type: String,
    /// Aggregate identifier passed to the store.
    pub aggregate_id: String,
    /// Expected version passed to the store.
    pub expected_version: i64,
    /// Events passed to the store.
    pub events: Vec<NewEvent>,
}

/// An event store that records every `save_events` call and returns a
/// configured history from `get_events`. Saves always succeed.
#[derive(Debug, Default)]
pub struct RecordingEventStore {
    history: Vec<StoredEvent>,
    saved: Mutex<Vec<SavedBatch>>,
}

impl RecordingEventStore {
    /// Create a recording store whose `get_events` returns `history`.
    #[must_use]
    pub fn new(history: Vec<StoredEvent>) -> Self {
        Self {
            history,
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all saved batches.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved_batches(&self) -> Vec<SavedBatch> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn save_events(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        events: &[NewEvent],
        expected_version: i64,
    ) -> Result<(), DomainError> {
        self.saved.lock().unwrap().push(SavedBatch {
            aggregate_type: aggregate_type.to_owned(),
            aggregate_id: aggregate_id.to_owned(),
            expected_version,
            events: events.to_vec(),
        });
        Ok(())
    }

    async fn get_events(
        &self,
        _aggregate_type: &str,
        _aggregate_id: &str,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.history.clone())
    }

    async fn get_all_events(
        &self,
        _from_event_id: Option<Uuid>,
        _limit: u32,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.history.clone())
    }

    async fn get_events_by_type(
        &self,
        event_type: &str,
        _limit: u32,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .history
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn current_version(
        &self,
        _aggregate_type: &str,
        _aggregate_id: &str,
    ) -> Result<i64, DomainError> {
        Ok(self
            .history
            .last()
            .map_or(0, |event| event.aggregate_version))
    }
}

/// An event store that always returns empty results and silently accepts
/// saves. Useful for "aggregate not found" scenarios and creation commands.
#[derive(Debug)]
pub struct EmptyEventStore;

#[async_trait]
impl EventStore for EmptyEventStore {
    async fn save_events(
        &self,
        _aggregate_type: &str,
        _aggregate_id: &str,
        _events: &[NewEvent],
        _expected_version: i64,
    ) -> Result<(), DomainError> {
        Ok(())
    }

    async fn get_events(
        &self,
        _aggregate_type: &str,
        _aggregate_id: &str,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn get_all_events(
        &self,
        _from_event_id: Option<Uuid>,
        _limit: u32,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn get_events_by_type(
        &self,
        _event_type: &str,
        _limit: u32,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn current_version(
        &self,
        _aggregate_type: &str,
        _aggregate_id: &str,
    ) -> Result<i64, DomainError> {
        Ok(0)
    }
}

/// An event store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

fn connection_refused() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

#[async_trait]
impl EventStore for FailingEventStore {
    async fn save_events(
        &self,
        _aggregate_type: &str,
        _aggregate_id: &str,
        _events: &[NewEvent],
        _expected_version: i64,
    ) -> Result<(), DomainError> {
        Err(connection_refused())
    }

    async fn get_events(
        &self,
        _aggregate_type: &str,
        _aggregate_id: &str,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(connection_refused())
    }

    async fn get_all_events(
        &self,
        _from_event_id: Option<Uuid>,
        _limit: u32,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(connection_refused())
    }

    async fn get_events_by_type(
        &self,
        _event_type: &str,
        _limit: u32,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(connection_refused())
    }

    async fn current_version(
        &self,
        _aggregate_type: &str,
        _aggregate_id: &str,
    ) -> Result<i64, DomainError> {
        Err(connection_refused())
    }
}
