//! Query handlers for the page publishing context.

use chrono::{DateTime, Utc};
use chronicle_core::aggregate::AggregateRoot;
use chronicle_core::error::DomainError;
use chronicle_core::repository::AggregateRepository;
use serde::Serialize;

use crate::domain::aggregates::{Page, PageStatus};

/// Read-only view of a page aggregate.
#[derive(Debug, Serialize)]
pub struct PageView {
    /// The page identifier.
    pub page_id: String,
    /// Current title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Current body.
    pub body: String,
    /// Revision counter.
    pub revision: u32,
    /// Publication status.
    pub status: PageStatus,
    /// When the page was published, while it is published.
    pub published_at: Option<DateTime<Utc>>,
    /// Stream version (event count).
    pub stream_version: i64,
}

/// Retrieves a page by id.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the page has no events, and
/// any decoding or store error.
pub async fn get_page(page_id: &str, repo: &AggregateRepository) -> Result<PageView, DomainError> {
    let page: Page = repo.load(page_id).await?;
    Ok(PageView {
        page_id: page_id.to_owned(),
        title: page.title().to_owned(),
        slug: page.slug().to_owned(),
        body: page.body().to_owned(),
        revision: page.revision(),
        status: page.status(),
        published_at: page.published_at(),
        stream_version: page.version(),
    })
}
