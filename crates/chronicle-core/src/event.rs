//! Domain event abstractions.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::DomainError;
use crate::registry::EventRegistry;
use crate::store::NewEvent;

/// Flat key-value representation of an event's own fields.
pub type EventData = serde_json::Map<String, Value>;

/// Open key-value map for cross-cutting concerns (correlation, actor, ...).
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key holding the correlation ID of the originating command.
pub const CORRELATION_ID: &str = "correlation_id";

/// Metadata key holding the ID of the command or event that caused this one.
pub const CAUSATION_ID: &str = "causation_id";

/// Envelope fields common to every domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHeader {
    /// Globally unique event identifier.
    pub event_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
    /// Schema version of the event type this event was written with.
    pub event_version: i32,
    /// Cross-cutting metadata.
    pub metadata: Metadata,
}

impl EventHeader {
    /// Creates a header with a fresh time-ordered ID, schema version 1 and
    /// empty metadata.
    #[must_use]
    pub fn new(occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            occurred_at,
            event_version: 1,
            metadata: Metadata::new(),
        }
    }

    /// Creates a header stamped with the clock's current time.
    #[must_use]
    pub fn now(clock: &dyn Clock) -> Self {
        Self::new(clock.now())
    }

    /// Overrides the generated event ID.
    #[must_use]
    pub fn with_event_id(mut self, event_id: Uuid) -> Self {
        self.event_id = event_id;
        self
    }

    /// Sets the schema version of the event type.
    #[must_use]
    pub fn with_event_version(mut self, event_version: i32) -> Self {
        self.event_version = event_version;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Records the command that caused this event as both correlation and
    /// causation.
    #[must_use]
    pub fn caused_by(self, correlation_id: Uuid) -> Self {
        self.with_metadata(CORRELATION_ID, correlation_id.to_string())
            .with_metadata(CAUSATION_ID, correlation_id.to_string())
    }

    /// Returns the correlation ID, if one was recorded.
    #[must_use]
    pub fn correlation_id(&self) -> Option<Uuid> {
        self.metadata
            .get(CORRELATION_ID)
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }
}

/// Trait that all domain event enums implement.
///
/// Each implementor is a closed set of facts for one aggregate type. The
/// stable `event_type` names are what the store persists; the registry maps
/// them back to variants.
pub trait DomainEvent: Clone + Send + Sync + std::fmt::Debug + Sized + 'static {
    /// Returns the stable event type name (the `event_type` column).
    fn event_type(&self) -> &'static str;

    /// Returns the envelope fields.
    fn header(&self) -> &EventHeader;

    /// Serializes the event-specific fields to a flat map.
    fn to_map(&self) -> EventData;

    /// Returns the registry of decoders for this event family.
    fn registry() -> &'static EventRegistry<Self>;

    /// Reconstructs an event from its type name, envelope and field map.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownEventType` if `event_type` is not
    /// registered and `DomainError::MalformedEvent` if `data` does not match
    /// the event's shape.
    fn from_map(event_type: &str, header: EventHeader, data: &EventData) -> Result<Self, DomainError> {
        Self::registry().decode_parts(event_type, header, data.clone())
    }

    /// Converts this event into the unsaved form handed to an event store.
    fn to_new_event(&self) -> NewEvent {
        let header = self.header();
        NewEvent {
            event_id: header.event_id,
            event_type: self.event_type().to_owned(),
            event_data: self.to_map(),
            event_version: header.event_version,
            metadata: header.metadata.clone(),
            occurred_at: header.occurred_at,
        }
    }
}

/// Encodes an event payload struct as a flat field map.
#[must_use]
pub fn encode_payload<T: Serialize>(payload: &T) -> EventData {
    // Payloads are plain structs with derived `Serialize`; they always encode
    // to a JSON object.
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => map,
        _ => unreachable!("event payloads encode as JSON objects"),
    }
}

/// Decodes an event payload struct from a flat field map.
///
/// # Errors
///
/// Returns `DomainError::MalformedEvent` if a required key is missing or has
/// the wrong shape.
pub fn decode_payload<T: DeserializeOwned>(
    event_type: &str,
    data: EventData,
) -> Result<T, DomainError> {
    serde_json::from_value(Value::Object(data)).map_err(|e| DomainError::MalformedEvent {
        event_type: event_type.to_owned(),
        reason: e.to_string(),
    })
}
