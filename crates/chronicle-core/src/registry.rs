//! Event type registry.
//!
//! Maps the stable type names persisted in the `event_type` column to the
//! functions that rebuild concrete events. Keeping this mapping explicit
//! decouples the stored schema from Rust type and module names.
//!
//! Each registration carries the current schema version of its event type.
//! Rows written with an older version are run through the registered
//! upcasters, one version step at a time, before decoding.

use std::collections::{BTreeMap, HashMap};

use crate::error::DomainError;
use crate::event::{EventData, EventHeader};
use crate::store::StoredEvent;

/// Rebuilds one event variant from its envelope and (upcast) field map.
pub type Decoder<E> = fn(EventHeader, EventData) -> Result<E, DomainError>;

/// Migrates a field map from schema version `n` to `n + 1`.
pub type Upcaster = fn(EventData) -> Result<EventData, String>;

struct Registration<E> {
    schema_version: i32,
    decode: Decoder<E>,
    upcasters: BTreeMap<i32, Upcaster>,
}

/// Registry of decoders for one aggregate's event family.
pub struct EventRegistry<E> {
    aggregate_type: &'static str,
    entries: HashMap<&'static str, Registration<E>>,
}

impl<E> EventRegistry<E> {
    /// Creates an empty registry for the given aggregate type.
    #[must_use]
    pub fn new(aggregate_type: &'static str) -> Self {
        Self {
            aggregate_type,
            entries: HashMap::new(),
        }
    }

    /// Registers `event_type` at its current `schema_version`.
    #[must_use]
    pub fn register(
        mut self,
        event_type: &'static str,
        schema_version: i32,
        decode: Decoder<E>,
    ) -> Self {
        debug_assert!(
            !self.entries.contains_key(event_type),
            "event type {event_type} registered twice"
        );
        self.entries.insert(
            event_type,
            Registration {
                schema_version,
                decode,
                upcasters: BTreeMap::new(),
            },
        );
        self
    }

    /// Registers an upcaster that migrates `event_type` data written at
    /// `from_version` to `from_version + 1`.
    ///
    /// The event type must already be registered.
    #[must_use]
    pub fn upcast(mut self, event_type: &'static str, from_version: i32, upcaster: Upcaster) -> Self {
        debug_assert!(
            self.entries.contains_key(event_type),
            "upcaster for unregistered event type {event_type}"
        );
        if let Some(entry) = self.entries.get_mut(event_type) {
            entry.upcasters.insert(from_version, upcaster);
        }
        self
    }

    /// The aggregate type this registry decodes events for.
    #[must_use]
    pub fn aggregate_type(&self) -> &'static str {
        self.aggregate_type
    }

    /// Returns `true` if `event_type` is registered.
    #[must_use]
    pub fn contains(&self, event_type: &str) -> bool {
        self.entries.contains_key(event_type)
    }

    /// Returns the current schema version of `event_type`.
    #[must_use]
    pub fn schema_version(&self, event_type: &str) -> Option<i32> {
        self.entries.get(event_type).map(|entry| entry.schema_version)
    }

    /// Returns every registered event type name, sorted.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Decodes a stored row into a concrete event.
    ///
    /// # Errors
    ///
    /// See [`EventRegistry::decode_parts`].
    pub fn decode(&self, stored: &StoredEvent) -> Result<E, DomainError> {
        let header = EventHeader {
            event_id: stored.event_id,
            occurred_at: stored.occurred_at,
            event_version: stored.event_version,
            metadata: stored.metadata.clone(),
        };
        self.decode_parts(&stored.event_type, header, stored.event_data.clone())
    }

    /// Decodes an event from its type name, envelope and field map,
    /// upcasting older schema versions first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownEventType` if `event_type` is not
    /// registered, and `DomainError::MalformedEvent` if the data was written
    /// by a newer schema, an upcaster is missing or fails, or the fields do
    /// not match the event's shape.
    pub fn decode_parts(
        &self,
        event_type: &str,
        mut header: EventHeader,
        mut data: EventData,
    ) -> Result<E, DomainError> {
        let entry = self
            .entries
            .get(event_type)
            .ok_or_else(|| DomainError::UnknownEventType {
                aggregate_type: self.aggregate_type.to_owned(),
                event_type: event_type.to_owned(),
            })?;

        let malformed = |reason: String| DomainError::MalformedEvent {
            event_type: event_type.to_owned(),
            reason,
        };

        if header.event_version > entry.schema_version {
            return Err(malformed(format!(
                "written with schema version {}, newest known is {}",
                header.event_version, entry.schema_version
            )));
        }

        while header.event_version < entry.schema_version {
            let upcaster = entry.upcasters.get(&header.event_version).ok_or_else(|| {
                malformed(format!(
                    "no upcaster from schema version {}",
                    header.event_version
                ))
            })?;
            data = upcaster(data).map_err(malformed)?;
            header.event_version += 1;
        }

        (entry.decode)(header, data)
    }
}

impl<E> std::fmt::Debug for EventRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("aggregate_type", &self.aggregate_type)
            .field("event_types", &self.event_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde::{Deserialize, Serialize};
    use serde_json::{Value, json};

    use super::*;
    use crate::event::decode_payload;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tagged {
        name: String,
        tags: Vec<String>,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Tagged(EventHeader, Tagged),
    }

    fn registry() -> EventRegistry<TestEvent> {
        EventRegistry::new("widget")
            .register("widget.tagged", 2, |header, data| {
                Ok(TestEvent::Tagged(
                    header,
                    decode_payload("widget.tagged", data)?,
                ))
            })
            .upcast("widget.tagged", 1, |mut data| {
                data.entry("tags").or_insert_with(|| json!([]));
                Ok(data)
            })
    }

    fn header(version: i32) -> EventHeader {
        EventHeader::new(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
            .with_event_version(version)
    }

    fn data(value: Value) -> EventData {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_decode_current_version() {
        let registry = registry();

        let event = registry
            .decode_parts(
                "widget.tagged",
                header(2),
                data(json!({"name": "w", "tags": ["a"]})),
            )
            .unwrap();

        let TestEvent::Tagged(header, payload) = event;
        assert_eq!(header.event_version, 2);
        assert_eq!(payload.tags, vec!["a".to_owned()]);
    }

    #[test]
    fn test_decode_upcasts_older_version() {
        let registry = registry();

        let event = registry
            .decode_parts("widget.tagged", header(1), data(json!({"name": "w"})))
            .unwrap();

        let TestEvent::Tagged(header, payload) = event;
        assert_eq!(header.event_version, 2);
        assert!(payload.tags.is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "upcaster for unregistered event type widget.renamed")]
    fn test_upcast_before_register_is_caught_in_debug_builds() {
        let _ = EventRegistry::<TestEvent>::new("widget").upcast("widget.renamed", 1, Ok);
    }

    #[test]
    fn test_decode_rejects_unknown_event_type() {
        let registry = registry();

        let result = registry.decode_parts("widget.melted", header(1), EventData::new());

        match result {
            Err(DomainError::UnknownEventType {
                aggregate_type,
                event_type,
            }) => {
                assert_eq!(aggregate_type, "widget");
                assert_eq!(event_type, "widget.melted");
            }
            other => panic!("expected UnknownEventType, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_newer_schema_version() {
        let registry = registry();

        let result = registry.decode_parts(
            "widget.tagged",
            header(3),
            data(json!({"name": "w", "tags": []})),
        );

        assert!(matches!(result, Err(DomainError::MalformedEvent { .. })));
    }

    #[test]
    fn test_decode_rejects_version_without_upcaster() {
        let registry = registry();

        let result = registry.decode_parts("widget.tagged", header(0), data(json!({"name": "w"})));

        match result {
            Err(DomainError::MalformedEvent { reason, .. }) => {
                assert!(reason.contains("no upcaster from schema version 0"));
            }
            other => panic!("expected MalformedEvent, got {other:?}"),
        }
    }

    #[test]
    fn test_event_types_are_sorted() {
        let registry: EventRegistry<TestEvent> = EventRegistry::new("widget")
            .register("widget.b", 1, |_, _| Err(DomainError::Validation("unused".into())))
            .register("widget.a", 1, |_, _| Err(DomainError::Validation("unused".into())));

        assert_eq!(registry.event_types(), vec!["widget.a", "widget.b"]);
        assert_eq!(registry.schema_version("widget.a"), Some(1));
        assert!(!registry.contains("widget.c"));
    }
}
