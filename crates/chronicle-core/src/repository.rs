//! Aggregate repository.
//!
//! Loads aggregates by replaying their stream and saves them by appending
//! their pending events under an optimistic version check. Conflicts are
//! returned to the caller as-is; reloading and retrying is the caller's
//! decision.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::store::{EventStore, NewEvent};

/// Loads and saves event-sourced aggregates through an [`EventStore`].
#[derive(Clone)]
pub struct AggregateRepository {
    store: Arc<dyn EventStore>,
}

impl AggregateRepository {
    /// Creates a repository backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying event store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Loads the decoded history of one aggregate, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownEventType` or `DomainError::MalformedEvent`
    /// if a stored event cannot be decoded, and `DomainError::Infrastructure`
    /// if the read fails.
    pub async fn events<A: AggregateRoot>(&self, id: &str) -> Result<Vec<A::Event>, DomainError> {
        let stored = self.store.get_events(A::AGGREGATE_TYPE, id).await?;
        let registry = A::Event::registry();
        stored.iter().map(|row| registry.decode(row)).collect()
    }

    /// Rebuilds an aggregate from its full history.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the stream is empty, plus
    /// any error from [`AggregateRepository::events`].
    #[instrument(skip(self), fields(aggregate_type = A::AGGREGATE_TYPE))]
    pub async fn load<A: AggregateRoot>(&self, id: &str) -> Result<A, DomainError> {
        let history = self.events::<A>(id).await?;
        if history.is_empty() {
            return Err(DomainError::AggregateNotFound {
                aggregate_type: A::AGGREGATE_TYPE.to_owned(),
                aggregate_id: id.to_owned(),
            });
        }

        let aggregate = A::reconstitute(history);
        debug!(version = aggregate.version(), "aggregate reconstituted");
        Ok(aggregate)
    }

    /// Persists the aggregate's pending events and marks them committed.
    ///
    /// Does nothing if there are no pending events. On failure the pending
    /// events are left in place.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if another writer committed
    /// to the stream since this aggregate was loaded or last saved, and
    /// `DomainError::Infrastructure` if the write fails.
    #[instrument(
        skip(self, aggregate),
        fields(
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = aggregate.aggregate_id().unwrap_or_default(),
            version = aggregate.version(),
        )
    )]
    pub async fn save<A: AggregateRoot>(&self, aggregate: &mut A) -> Result<(), DomainError> {
        if aggregate.pending_events().is_empty() {
            return Ok(());
        }

        let id = aggregate
            .aggregate_id()
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "{} aggregate has pending events but no identity",
                    A::AGGREGATE_TYPE
                ))
            })?
            .to_owned();
        let expected_version = aggregate.journal().committed_version();
        let events: Vec<NewEvent> = aggregate
            .pending_events()
            .iter()
            .map(DomainEvent::to_new_event)
            .collect();

        self.store
            .save_events(A::AGGREGATE_TYPE, &id, &events, expected_version)
            .await?;

        aggregate.mark_events_as_committed();
        debug!(
            committed = events.len(),
            expected_version, "pending events committed"
        );
        Ok(())
    }
}

impl std::fmt::Debug for AggregateRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateRepository").finish_non_exhaustive()
    }
}
