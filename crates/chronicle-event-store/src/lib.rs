//! Chronicle event stores.
//!
//! [`pg_event_store::PgEventStore`] is the durable PostgreSQL store;
//! [`in_memory::InMemoryEventStore`] has the same append semantics for
//! development and tests.

pub mod in_memory;
pub mod pg_event_store;
