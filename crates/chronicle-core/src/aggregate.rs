//! Aggregate root abstraction.

use crate::event::DomainEvent;

/// Event-sourcing bookkeeping embedded in every aggregate: the number of
/// events applied so far and the events recorded but not yet committed.
#[derive(Debug, Clone, PartialEq)]
pub struct Journal<E> {
    version: i64,
    pending: Vec<E>,
}

impl<E> Journal<E> {
    /// Creates an empty journal at version 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: 0,
            pending: Vec::new(),
        }
    }

    /// Number of events applied, committed or not.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Events recorded since the last commit.
    #[must_use]
    pub fn pending(&self) -> &[E] {
        &self.pending
    }

    /// The version the aggregate had before its pending events were
    /// recorded, i.e. the last committed version.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn committed_version(&self) -> i64 {
        self.version - self.pending.len() as i64
    }

    fn record(&mut self, event: E) {
        self.pending.push(event);
        self.version += 1;
    }

    fn advance(&mut self) {
        self.version += 1;
    }

    fn commit(&mut self) {
        self.pending.clear();
    }
}

impl<E> Default for Journal<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for aggregate roots whose state is a fold over their events.
///
/// Implementors supply the state transition ([`AggregateRoot::apply`]) and
/// access to their [`Journal`]; recording, replay and commit bookkeeping are
/// provided.
pub trait AggregateRoot: Default + Send + Sync {
    /// The event family this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Stable aggregate type name (the `aggregate_type` column).
    const AGGREGATE_TYPE: &'static str;

    /// Returns the aggregate identifier, assigned by its first event.
    fn aggregate_id(&self) -> Option<&str>;

    /// Mutates state from an accepted event. Must not fail: validation
    /// happens in domain methods before an event is recorded.
    fn apply(&mut self, event: &Self::Event);

    /// Read access to the event-sourcing bookkeeping.
    fn journal(&self) -> &Journal<Self::Event>;

    /// Write access to the event-sourcing bookkeeping.
    fn journal_mut(&mut self) -> &mut Journal<Self::Event>;

    /// Returns the current version (number of events applied).
    fn version(&self) -> i64 {
        self.journal().version()
    }

    /// Applies a new event and queues it for persistence.
    fn record_that(&mut self, event: Self::Event) {
        self.apply(&event);
        self.journal_mut().record(event);
    }

    /// Applies an already-committed event without queueing it.
    fn replay(&mut self, event: &Self::Event) {
        self.apply(event);
        self.journal_mut().advance();
    }

    /// Rebuilds an aggregate by replaying `events` in order.
    fn reconstitute<I>(events: I) -> Self
    where
        I: IntoIterator<Item = Self::Event>,
    {
        let mut aggregate = Self::default();
        for event in events {
            aggregate.replay(&event);
        }
        aggregate
    }

    /// Returns events recorded but not yet committed.
    fn pending_events(&self) -> &[Self::Event] {
        self.journal().pending()
    }

    /// Clears pending events after they were persisted.
    fn mark_events_as_committed(&mut self) {
        self.journal_mut().commit();
    }
}
