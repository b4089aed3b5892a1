//! Domain error types.

use thiserror::Error;

/// Top-level error type shared by aggregates, stores and repositories.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No events exist for the requested aggregate.
    #[error("aggregate not found: {aggregate_type}/{aggregate_id}")]
    AggregateNotFound {
        /// The aggregate type that was looked up.
        aggregate_type: String,
        /// The aggregate identifier that was looked up.
        aggregate_id: String,
    },

    /// Optimistic concurrency conflict: another writer committed first.
    #[error(
        "concurrency conflict on {aggregate_type}/{aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The aggregate type that had the conflict.
        aggregate_type: String,
        /// The aggregate that had the conflict.
        aggregate_id: String,
        /// The version the writer based its changes on.
        expected: i64,
        /// The version actually committed in the store.
        actual: i64,
    },

    /// The requested state transition is not allowed in the current state.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Command input failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A stored event type has no registered decoder.
    #[error("unknown event type {event_type:?} for aggregate type {aggregate_type:?}")]
    UnknownEventType {
        /// The aggregate type whose registry was consulted.
        aggregate_type: String,
        /// The unrecognised event type name.
        event_type: String,
    },

    /// Stored event data could not be decoded into its event type.
    #[error("malformed {event_type} event: {reason}")]
    MalformedEvent {
        /// The event type being decoded.
        event_type: String,
        /// What was wrong with the stored data.
        reason: String,
    },

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` when the caller may reload the aggregate and try the
    /// operation again.
    #[must_use]
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}
