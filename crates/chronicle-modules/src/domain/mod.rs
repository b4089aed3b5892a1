//! Domain model for the module lifecycle.

pub mod aggregates;
pub mod commands;
pub mod events;
