//! Event store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::{EventData, Metadata};

/// An event ready to be appended; the store assigns its stream position.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Stable event type name.
    pub event_type: String,
    /// Serialized event-specific fields.
    pub event_data: EventData,
    /// Schema version of the event type.
    pub event_version: i32,
    /// Cross-cutting metadata.
    pub metadata: Metadata,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEvent {
    /// Global insertion order across all streams.
    pub position: i64,
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate type of the stream this event belongs to.
    pub aggregate_type: String,
    /// Aggregate this event belongs to.
    pub aggregate_id: String,
    /// Stable event type name for decoder lookup.
    pub event_type: String,
    /// Serialized event-specific fields.
    pub event_data: EventData,
    /// Schema version the event was written with.
    pub event_version: i32,
    /// 1-based sequence number within the aggregate stream.
    pub aggregate_version: i64,
    /// Cross-cutting metadata.
    pub metadata: Metadata,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Durable, append-only storage for aggregate event streams.
///
/// Streams are keyed by `(aggregate_type, aggregate_id)`. Appends are
/// guarded by an optimistic version check that implementations must perform
/// atomically with the insert.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append `events` to a stream if its committed version equals
    /// `expected_version`. Events receive consecutive aggregate versions
    /// starting at `expected_version + 1`. An empty slice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if the stream has moved on,
    /// or `DomainError::Infrastructure` if the write fails. Nothing is
    /// persisted in either case.
    async fn save_events(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        events: &[NewEvent],
        expected_version: i64,
    ) -> Result<(), DomainError>;

    /// Load all events of one stream, ordered by aggregate version.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the read fails.
    async fn get_events(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Load up to `limit` events across all streams in insertion order,
    /// starting after `from_event_id` (or from the beginning). An unknown
    /// `from_event_id` yields no events.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the read fails.
    async fn get_all_events(
        &self,
        from_event_id: Option<Uuid>,
        limit: u32,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Load up to `limit` events of one type across all streams in insertion
    /// order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the read fails.
    async fn get_events_by_type(
        &self,
        event_type: &str,
        limit: u32,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Returns the committed version of a stream, or 0 if it has no events.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the read fails.
    async fn current_version(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<i64, DomainError>;
}
