//! Shared test doubles and fixtures for Chronicle.

mod clock;
mod store;

pub use clock::{FixedClock, fixed_now};
pub use store::{
    EmptyEventStore, FailingEventStore, RecordingEventStore, SavedBatch, stored_history,
};
