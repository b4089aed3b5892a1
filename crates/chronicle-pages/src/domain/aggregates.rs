//! Aggregate roots for the page publishing context.

use chrono::{DateTime, Utc};
use chronicle_core::aggregate::{AggregateRoot, Journal};
use chronicle_core::clock::Clock;
use chronicle_core::error::DomainError;
use chronicle_core::event::EventHeader;
use serde::Serialize;
use uuid::Uuid;

use super::events::{
    PAGE_AGGREGATE_TYPE, PageCreated, PageDeleted, PageEvent, PageEventKind, PagePublished,
    PageRevised, PageUnpublished,
};

/// Publication status of a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Not created yet.
    #[default]
    New,
    /// Editable, not visible.
    Draft,
    /// Visible.
    Published,
    /// Removed. Terminal.
    Deleted,
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::New => "new",
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Deleted => "deleted",
        })
    }
}

/// The aggregate root for a content page.
#[derive(Debug, Default, PartialEq)]
pub struct Page {
    id: Option<String>,
    title: String,
    slug: String,
    body: String,
    revision: u32,
    status: PageStatus,
    published_at: Option<DateTime<Utc>>,
    journal: Journal<PageEvent>,
}

/// Slugs are non-empty runs of lowercase ASCII letters, digits and single
/// hyphens, not starting or ending with a hyphen.
fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl Page {
    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the URL slug.
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Returns the body of the latest revision.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the number of revisions made since creation.
    #[must_use]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Returns the publication status.
    #[must_use]
    pub fn status(&self) -> PageStatus {
        self.status
    }

    /// Returns when the page was last published, while it is published.
    #[must_use]
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    fn page_id(&self) -> String {
        self.id.clone().unwrap_or_default()
    }

    fn ensure_live(&self, action: &str) -> Result<(), DomainError> {
        match self.status {
            PageStatus::Draft | PageStatus::Published => Ok(()),
            PageStatus::New => Err(DomainError::InvalidTransition(format!(
                "cannot {action} a page that does not exist"
            ))),
            PageStatus::Deleted => Err(DomainError::InvalidTransition(format!(
                "cannot {action} deleted page {}",
                self.page_id()
            ))),
        }
    }

    fn emit(&mut self, kind: PageEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        self.record_that(PageEvent {
            header: EventHeader::now(clock).caused_by(correlation_id),
            kind,
        });
    }

    /// Creates the page as a draft.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the page already exists,
    /// and `DomainError::Validation` for a blank id or title or a malformed
    /// slug.
    pub fn create(
        &mut self,
        page_id: &str,
        title: &str,
        slug: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.status != PageStatus::New {
            return Err(DomainError::InvalidTransition(format!(
                "page {} already exists",
                self.page_id()
            )));
        }
        if page_id.trim().is_empty() || title.trim().is_empty() {
            return Err(DomainError::Validation(
                "page id and title must not be blank".into(),
            ));
        }
        if !is_valid_slug(slug) {
            return Err(DomainError::Validation(format!("invalid slug {slug:?}")));
        }

        self.emit(
            PageEventKind::Created(PageCreated {
                page_id: page_id.to_owned(),
                title: title.to_owned(),
                slug: slug.to_owned(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Replaces the title and body, bumping the revision counter.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the page does not exist or
    /// was deleted, and `DomainError::Validation` for a blank title.
    pub fn revise(
        &mut self,
        title: &str,
        body: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_live("revise")?;
        if title.trim().is_empty() {
            return Err(DomainError::Validation("page title must not be blank".into()));
        }
        let revision = self.revision.checked_add(1).ok_or_else(|| {
            DomainError::Validation(format!("page {} has too many revisions", self.page_id()))
        })?;

        self.emit(
            PageEventKind::Revised(PageRevised {
                page_id: self.page_id(),
                revision,
                title: title.to_owned(),
                body: body.to_owned(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Publishes the page. Publishing a published page does nothing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the page does not exist or
    /// was deleted.
    pub fn publish(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.ensure_live("publish")?;
        if self.status == PageStatus::Published {
            return Ok(());
        }

        self.emit(
            PageEventKind::Published(PagePublished {
                page_id: self.page_id(),
                revision: self.revision,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Returns the page to draft. Unpublishing a draft does nothing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the page does not exist or
    /// was deleted.
    pub fn unpublish(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_live("unpublish")?;
        if self.status != PageStatus::Published {
            return Ok(());
        }

        self.emit(
            PageEventKind::Unpublished(PageUnpublished {
                page_id: self.page_id(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Deletes a draft page.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless the page is a draft.
    pub fn delete(
        &mut self,
        reason: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_live("delete")?;
        if self.status == PageStatus::Published {
            return Err(DomainError::InvalidTransition(format!(
                "page {} must be unpublished before it is deleted",
                self.page_id()
            )));
        }

        self.emit(
            PageEventKind::Deleted(PageDeleted {
                page_id: self.page_id(),
                reason: reason.to_owned(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }
}

impl AggregateRoot for Page {
    type Event = PageEvent;
    const AGGREGATE_TYPE: &'static str = PAGE_AGGREGATE_TYPE;

    fn aggregate_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            PageEventKind::Created(payload) => {
                self.id = Some(payload.page_id.clone());
                self.title.clone_from(&payload.title);
                self.slug.clone_from(&payload.slug);
                self.status = PageStatus::Draft;
            }
            PageEventKind::Revised(payload) => {
                self.title.clone_from(&payload.title);
                self.body.clone_from(&payload.body);
                self.revision = payload.revision;
            }
            PageEventKind::Published(_) => {
                self.status = PageStatus::Published;
                self.published_at = Some(event.header.occurred_at);
            }
            PageEventKind::Unpublished(_) => {
                self.status = PageStatus::Draft;
                self.published_at = None;
            }
            PageEventKind::Deleted(_) => {
                self.status = PageStatus::Deleted;
            }
        }
    }

    fn journal(&self) -> &Journal<Self::Event> {
        &self.journal
    }

    fn journal_mut(&mut self) -> &mut Journal<Self::Event> {
        &mut self.journal
    }
}
