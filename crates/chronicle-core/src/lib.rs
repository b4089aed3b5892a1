//! Chronicle Core — event-sourcing abstractions.
//!
//! This crate defines the domain event contract, the aggregate root
//! machinery, the event store port and the aggregate repository that ties
//! them together. It contains no storage driver code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod registry;
pub mod repository;
pub mod store;
