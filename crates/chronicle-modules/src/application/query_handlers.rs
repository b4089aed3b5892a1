//! Query handlers for the module lifecycle context.
//!
//! Queries rebuild the aggregate from its stream and return read-only
//! views. There are no projections.

use chrono::{DateTime, Utc};
use chronicle_core::aggregate::AggregateRoot;
use chronicle_core::error::DomainError;
use chronicle_core::event::DomainEvent;
use chronicle_core::repository::AggregateRepository;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Module, ModuleStatus};

/// Read-only view of a module aggregate.
#[derive(Debug, Serialize)]
pub struct ModuleView {
    /// The module identifier.
    pub module_id: String,
    /// Human-readable name.
    pub name: String,
    /// Installed release version.
    pub version: String,
    /// Identifiers of required modules.
    pub dependencies: Vec<String>,
    /// Lifecycle status.
    pub status: ModuleStatus,
    /// Reason for the current disabled state, if any.
    pub disabled_reason: Option<String>,
    /// When the module was installed.
    pub installed_at: Option<DateTime<Utc>>,
    /// When the module last changed.
    pub changed_at: Option<DateTime<Utc>>,
    /// Stream version (event count).
    pub stream_version: i64,
}

/// One entry of a module's history.
#[derive(Debug, Serialize)]
pub struct ModuleHistoryEntry {
    /// Event identifier.
    pub event_id: Uuid,
    /// Stable event type name.
    pub event_type: &'static str,
    /// When the event happened.
    pub occurred_at: DateTime<Utc>,
}

/// Retrieves a module by id.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the module has no events, and
/// any decoding or store error.
pub async fn get_module(
    module_id: &str,
    repo: &AggregateRepository,
) -> Result<ModuleView, DomainError> {
    let module: Module = repo.load(module_id).await?;
    Ok(ModuleView {
        module_id: module_id.to_owned(),
        name: module.name().to_owned(),
        version: module.release().to_owned(),
        dependencies: module.dependencies().to_vec(),
        status: module.status(),
        disabled_reason: module.disabled_reason().map(str::to_owned),
        installed_at: module.installed_at(),
        changed_at: module.changed_at(),
        stream_version: module.version(),
    })
}

/// Lists a module's events, oldest first. An unknown module has an empty
/// history.
///
/// # Errors
///
/// Returns any decoding or store error.
pub async fn get_module_history(
    module_id: &str,
    repo: &AggregateRepository,
) -> Result<Vec<ModuleHistoryEntry>, DomainError> {
    let events = repo.events::<Module>(module_id).await?;
    Ok(events
        .iter()
        .map(|event| ModuleHistoryEntry {
            event_id: event.header.event_id,
            event_type: event.event_type(),
            occurred_at: event.header.occurred_at,
        })
        .collect())
}
