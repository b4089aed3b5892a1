//! Domain model for page publishing.

pub mod aggregates;
pub mod commands;
pub mod events;
