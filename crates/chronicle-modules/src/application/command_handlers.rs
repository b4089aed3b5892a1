//! Command handlers for the module lifecycle context.
//!
//! Each handler loads the aggregate, runs the domain method and persists the
//! resulting events. Concurrency conflicts are returned unchanged.

use chronicle_core::aggregate::AggregateRoot;
use chronicle_core::clock::Clock;
use chronicle_core::command::Command;
use chronicle_core::error::DomainError;
use chronicle_core::repository::AggregateRepository;
use tracing::{info, instrument};

use crate::domain::aggregates::Module;
use crate::domain::commands::{
    DisableModule, EnableModule, InstallModule, UninstallModule, UpdateModule,
};
use crate::domain::events::ModuleEvent;

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct ModuleCommandResult {
    /// The module affected by the command.
    pub module_id: String,
    /// Stream version after the command.
    pub version: i64,
    /// Events produced and persisted. Empty when the command was a no-op.
    pub events: Vec<ModuleEvent>,
}

/// Saves whatever `module` recorded and reports it.
async fn commit(
    module_id: &str,
    mut module: Module,
    repo: &AggregateRepository,
) -> Result<ModuleCommandResult, DomainError> {
    let events = module.pending_events().to_vec();
    repo.save(&mut module).await?;
    Ok(ModuleCommandResult {
        module_id: module_id.to_owned(),
        version: module.version(),
        events,
    })
}

/// Handles `InstallModule`: starts a new stream for the module.
///
/// # Errors
///
/// Returns `DomainError::InvalidTransition` if the module already exists,
/// `DomainError::Validation` for bad input, and any store error.
#[instrument(skip_all, fields(command = command.command_type(), module_id = %command.module_id))]
pub async fn handle_install_module(
    command: &InstallModule,
    clock: &dyn Clock,
    repo: &AggregateRepository,
) -> Result<ModuleCommandResult, DomainError> {
    let mut module = match repo.load::<Module>(&command.module_id).await {
        Ok(module) => module,
        Err(DomainError::AggregateNotFound { .. }) => Module::default(),
        Err(err) => return Err(err),
    };

    module.install(
        &command.module_id,
        &command.name,
        &command.version,
        command.dependencies.clone(),
        command.correlation_id,
        clock,
    )?;

    let result = commit(&command.module_id, module, repo).await?;
    info!(version = %command.version, "module installed");
    Ok(result)
}

/// Handles `EnableModule`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the module was never
/// installed, `DomainError::InvalidTransition` if it was uninstalled, and
/// any store error.
#[instrument(skip_all, fields(command = command.command_type(), module_id = %command.module_id))]
pub async fn handle_enable_module(
    command: &EnableModule,
    clock: &dyn Clock,
    repo: &AggregateRepository,
) -> Result<ModuleCommandResult, DomainError> {
    let mut module: Module = repo.load(&command.module_id).await?;

    module.enable(command.correlation_id, clock)?;

    commit(&command.module_id, module, repo).await
}

/// Handles `DisableModule`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the module was never
/// installed, and any store error.
#[instrument(skip_all, fields(command = command.command_type(), module_id = %command.module_id))]
pub async fn handle_disable_module(
    command: &DisableModule,
    clock: &dyn Clock,
    repo: &AggregateRepository,
) -> Result<ModuleCommandResult, DomainError> {
    let mut module: Module = repo.load(&command.module_id).await?;

    module.disable(&command.reason, command.correlation_id, clock);

    commit(&command.module_id, module, repo).await
}

/// Handles `UpdateModule`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the module was never
/// installed, `DomainError::InvalidTransition` or `DomainError::Validation`
/// if the update is rejected, and any store error.
#[instrument(skip_all, fields(command = command.command_type(), module_id = %command.module_id))]
pub async fn handle_update_module(
    command: &UpdateModule,
    clock: &dyn Clock,
    repo: &AggregateRepository,
) -> Result<ModuleCommandResult, DomainError> {
    let mut module: Module = repo.load(&command.module_id).await?;

    module.update(
        &command.version,
        command.dependencies.clone(),
        command.correlation_id,
        clock,
    )?;

    commit(&command.module_id, module, repo).await
}

/// Handles `UninstallModule`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the module was never
/// installed, `DomainError::InvalidTransition` if it is still enabled or
/// already gone, and any store error.
#[instrument(skip_all, fields(command = command.command_type(), module_id = %command.module_id))]
pub async fn handle_uninstall_module(
    command: &UninstallModule,
    clock: &dyn Clock,
    repo: &AggregateRepository,
) -> Result<ModuleCommandResult, DomainError> {
    let mut module: Module = repo.load(&command.module_id).await?;

    module.uninstall(&command.reason, command.correlation_id, clock)?;

    let result = commit(&command.module_id, module, repo).await?;
    info!("module uninstalled");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chronicle_core::event::{CORRELATION_ID, DomainEvent};
    use chronicle_core::store::EventStore;
    use chronicle_event_store::in_memory::InMemoryEventStore;
    use chronicle_test_support::{
        EmptyEventStore, FailingEventStore, FixedClock, RecordingEventStore, fixed_now,
        stored_history,
    };
    use uuid::Uuid;

    use super::*;
    use crate::domain::events::{
        MODULE_AGGREGATE_TYPE, MODULE_ENABLED_EVENT_TYPE, MODULE_INSTALLED_EVENT_TYPE,
    };

    fn install_command(module_id: &str) -> InstallModule {
        InstallModule {
            correlation_id: Uuid::new_v4(),
            module_id: module_id.to_owned(),
            name: "Mod".to_owned(),
            version: "1.0.0".to_owned(),
            dependencies: vec![],
        }
    }

    fn enable_command(module_id: &str) -> EnableModule {
        EnableModule {
            correlation_id: Uuid::new_v4(),
            module_id: module_id.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_handle_install_module_saves_first_event_at_version_zero() {
        // Arrange
        let store = Arc::new(RecordingEventStore::default());
        let repo = AggregateRepository::new(store.clone());
        let clock = FixedClock::default();
        let command = install_command("m1");

        // Act
        let result = handle_install_module(&command, &clock, &repo)
            .await
            .unwrap();

        // Assert
        assert_eq!(result.module_id, "m1");
        assert_eq!(result.version, 1);
        assert_eq!(result.events.len(), 1);

        let saved = store.saved_batches();
        assert_eq!(saved.len(), 1);
        let batch = &saved[0];
        assert_eq!(batch.aggregate_type, MODULE_AGGREGATE_TYPE);
        assert_eq!(batch.aggregate_id, "m1");
        assert_eq!(batch.expected_version, 0);
        assert_eq!(batch.events.len(), 1);

        let event = &batch.events[0];
        assert_eq!(event.event_type, MODULE_INSTALLED_EVENT_TYPE);
        assert_eq!(event.occurred_at, fixed_now());
        assert_eq!(
            event.metadata.get(CORRELATION_ID).and_then(|v| v.as_str()),
            Some(command.correlation_id.to_string().as_str())
        );
    }

    #[tokio::test]
    async fn test_handle_install_module_twice_is_invalid_transition() {
        let repo = AggregateRepository::new(Arc::new(InMemoryEventStore::new()));
        let clock = FixedClock::default();
        handle_install_module(&install_command("m1"), &clock, &repo)
            .await
            .unwrap();

        let result = handle_install_module(&install_command("m1"), &clock, &repo).await;

        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_handle_enable_module_expects_loaded_version() {
        // Arrange
        let clock = FixedClock::default();
        let mut installed = Module::default();
        installed
            .install("m1", "Mod", "1.0.0", vec![], Uuid::new_v4(), &clock)
            .unwrap();
        let history = stored_history(MODULE_AGGREGATE_TYPE, "m1", installed.pending_events());
        let store = Arc::new(RecordingEventStore::new(history));
        let repo = AggregateRepository::new(store.clone());

        // Act
        let result = handle_enable_module(&enable_command("m1"), &clock, &repo)
            .await
            .unwrap();

        // Assert
        assert_eq!(result.version, 2);
        let saved = store.saved_batches();
        assert_eq!(saved[0].expected_version, 1);
        assert_eq!(saved[0].events[0].event_type, MODULE_ENABLED_EVENT_TYPE);
    }

    #[tokio::test]
    async fn test_handle_enable_module_when_enabled_saves_nothing() {
        let store = Arc::new(InMemoryEventStore::new());
        let repo = AggregateRepository::new(store.clone());
        let clock = FixedClock::default();
        handle_install_module(&install_command("m1"), &clock, &repo)
            .await
            .unwrap();
        handle_enable_module(&enable_command("m1"), &clock, &repo)
            .await
            .unwrap();

        let result = handle_enable_module(&enable_command("m1"), &clock, &repo)
            .await
            .unwrap();

        assert!(result.events.is_empty());
        assert_eq!(result.version, 2);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_handle_disable_module_records_reason() {
        let store = Arc::new(InMemoryEventStore::new());
        let repo = AggregateRepository::new(store.clone());
        let clock = FixedClock::default();
        handle_install_module(&install_command("m1"), &clock, &repo)
            .await
            .unwrap();
        handle_enable_module(&enable_command("m1"), &clock, &repo)
            .await
            .unwrap();

        let result = handle_disable_module(
            &DisableModule {
                correlation_id: Uuid::new_v4(),
                module_id: "m1".into(),
                reason: "maintenance".into(),
            },
            &clock,
            &repo,
        )
        .await
        .unwrap();

        assert_eq!(result.version, 3);
        let module: Module = repo.load("m1").await.unwrap();
        assert_eq!(module.disabled_reason(), Some("maintenance"));
        assert_eq!(
            store.current_version(MODULE_AGGREGATE_TYPE, "m1").await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_handle_update_module_moves_release() {
        let repo = AggregateRepository::new(Arc::new(InMemoryEventStore::new()));
        let clock = FixedClock::default();
        handle_install_module(&install_command("m1"), &clock, &repo)
            .await
            .unwrap();

        let result = handle_update_module(
            &UpdateModule {
                correlation_id: Uuid::new_v4(),
                module_id: "m1".into(),
                version: "2.0.0".into(),
                dependencies: vec!["core".into()],
            },
            &clock,
            &repo,
        )
        .await
        .unwrap();

        assert_eq!(result.version, 2);
        let module: Module = repo.load("m1").await.unwrap();
        assert_eq!(module.release(), "2.0.0");
        assert_eq!(module.dependencies(), ["core".to_owned()]);
    }

    #[tokio::test]
    async fn test_handle_uninstall_enabled_module_is_rejected_and_saves_nothing() {
        let store = Arc::new(InMemoryEventStore::new());
        let repo = AggregateRepository::new(store.clone());
        let clock = FixedClock::default();
        handle_install_module(&install_command("m1"), &clock, &repo)
            .await
            .unwrap();
        handle_enable_module(&enable_command("m1"), &clock, &repo)
            .await
            .unwrap();

        let result = handle_uninstall_module(
            &UninstallModule {
                correlation_id: Uuid::new_v4(),
                module_id: "m1".into(),
                reason: "cleanup".into(),
            },
            &clock,
            &repo,
        )
        .await;

        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));
        assert_eq!(store.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_handle_enable_module_for_unknown_module_is_not_found() {
        let repo = AggregateRepository::new(Arc::new(EmptyEventStore));
        let clock = FixedClock::default();

        let result = handle_enable_module(&enable_command("ghost"), &clock, &repo).await;

        match result {
            Err(DomainError::AggregateNotFound {
                aggregate_type,
                aggregate_id,
            }) => {
                assert_eq!(aggregate_type, MODULE_AGGREGATE_TYPE);
                assert_eq!(aggregate_id, "ghost");
            }
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handle_install_module_propagates_store_failure() {
        let repo = AggregateRepository::new(Arc::new(FailingEventStore));
        let clock = FixedClock::default();

        let result = handle_install_module(&install_command("m1"), &clock, &repo).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn test_result_events_carry_event_types() {
        let repo = AggregateRepository::new(Arc::new(InMemoryEventStore::new()));
        let clock = FixedClock::default();

        let result = handle_install_module(&install_command("m1"), &clock, &repo)
            .await
            .unwrap();

        assert_eq!(result.events[0].event_type(), MODULE_INSTALLED_EVENT_TYPE);
    }
}
