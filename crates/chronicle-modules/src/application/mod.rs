//! Application services for the module lifecycle.

pub mod command_handlers;
pub mod query_handlers;
