//! Chronicle admin tool: inspect and migrate the event store.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
