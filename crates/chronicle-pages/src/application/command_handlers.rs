//! Command handlers for the page publishing context.

use chronicle_core::aggregate::AggregateRoot;
use chronicle_core::clock::Clock;
use chronicle_core::command::Command;
use chronicle_core::error::DomainError;
use chronicle_core::repository::AggregateRepository;
use tracing::{debug, instrument};

use crate::domain::aggregates::Page;
use crate::domain::commands::{CreatePage, DeletePage, PublishPage, RevisePage, UnpublishPage};

/// Result of a successfully handled command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCommandResult {
    /// The page affected by the command.
    pub page_id: String,
    /// Stream version after the command.
    pub version: i64,
    /// Number of events persisted. Zero when the command was a no-op.
    pub events_written: usize,
}

/// Loads `page_id`, runs `change` against it and saves what it recorded.
async fn execute<F>(
    page_id: &str,
    repo: &AggregateRepository,
    change: F,
) -> Result<PageCommandResult, DomainError>
where
    F: FnOnce(&mut Page) -> Result<(), DomainError>,
{
    let mut page: Page = repo.load(page_id).await?;
    change(&mut page)?;
    save(page_id, page, repo).await
}

async fn save(
    page_id: &str,
    mut page: Page,
    repo: &AggregateRepository,
) -> Result<PageCommandResult, DomainError> {
    let events_written = page.pending_events().len();
    repo.save(&mut page).await?;
    debug!(events_written, version = page.version(), "page saved");
    Ok(PageCommandResult {
        page_id: page_id.to_owned(),
        version: page.version(),
        events_written,
    })
}

/// Handles `CreatePage`.
///
/// # Errors
///
/// Returns `DomainError::InvalidTransition` if the page exists,
/// `DomainError::Validation` for bad input, and any store error.
#[instrument(skip_all, fields(command = command.command_type(), page_id = %command.page_id))]
pub async fn handle_create_page(
    command: &CreatePage,
    clock: &dyn Clock,
    repo: &AggregateRepository,
) -> Result<PageCommandResult, DomainError> {
    let mut page = match repo.load::<Page>(&command.page_id).await {
        Ok(page) => page,
        Err(DomainError::AggregateNotFound { .. }) => Page::default(),
        Err(err) => return Err(err),
    };
    page.create(
        &command.page_id,
        &command.title,
        &command.slug,
        command.correlation_id,
        clock,
    )?;
    save(&command.page_id, page, repo).await
}

/// Handles `RevisePage`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound`, `DomainError::InvalidTransition`,
/// `DomainError::Validation` or any store error.
#[instrument(skip_all, fields(command = command.command_type(), page_id = %command.page_id))]
pub async fn handle_revise_page(
    command: &RevisePage,
    clock: &dyn Clock,
    repo: &AggregateRepository,
) -> Result<PageCommandResult, DomainError> {
    execute(&command.page_id, repo, |page| {
        page.revise(&command.title, &command.body, command.correlation_id, clock)
    })
    .await
}

/// Handles `PublishPage`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound`, `DomainError::InvalidTransition`
/// or any store error.
#[instrument(skip_all, fields(command = command.command_type(), page_id = %command.page_id))]
pub async fn handle_publish_page(
    command: &PublishPage,
    clock: &dyn Clock,
    repo: &AggregateRepository,
) -> Result<PageCommandResult, DomainError> {
    execute(&command.page_id, repo, |page| {
        page.publish(command.correlation_id, clock)
    })
    .await
}

/// Handles `UnpublishPage`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound`, `DomainError::InvalidTransition`
/// or any store error.
#[instrument(skip_all, fields(command = command.command_type(), page_id = %command.page_id))]
pub async fn handle_unpublish_page(
    command: &UnpublishPage,
    clock: &dyn Clock,
    repo: &AggregateRepository,
) -> Result<PageCommandResult, DomainError> {
    execute(&command.page_id, repo, |page| {
        page.unpublish(command.correlation_id, clock)
    })
    .await
}

/// Handles `DeletePage`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound`, `DomainError::InvalidTransition`
/// or any store error.
#[instrument(skip_all, fields(command = command.command_type(), page_id = %command.page_id))]
pub async fn handle_delete_page(
    command: &DeletePage,
    clock: &dyn Clock,
    repo: &AggregateRepository,
) -> Result<PageCommandResult, DomainError> {
    execute(&command.page_id, repo, |page| {
        page.delete(&command.reason, command.correlation_id, clock)
    })
    .await
}
