//! Domain events for the page publishing context.

use std::sync::LazyLock;

use chronicle_core::event::{DomainEvent, EventData, EventHeader, decode_payload, encode_payload};
use chronicle_core::registry::EventRegistry;
use serde::{Deserialize, Serialize};

/// Aggregate type name of page streams.
pub const PAGE_AGGREGATE_TYPE: &str = "page";

/// Event type string for `PageCreated`.
pub const PAGE_CREATED_EVENT_TYPE: &str = "page.created";
/// Event type string for `PageRevised`.
pub const PAGE_REVISED_EVENT_TYPE: &str = "page.revised";
/// Event type string for `PagePublished`.
pub const PAGE_PUBLISHED_EVENT_TYPE: &str = "page.published";
/// Event type string for `PageUnpublished`.
pub const PAGE_UNPUBLISHED_EVENT_TYPE: &str = "page.unpublished";
/// Event type string for `PageDeleted`.
pub const PAGE_DELETED_EVENT_TYPE: &str = "page.deleted";

/// Emitted when a page is created as a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCreated {
    /// The page identifier.
    pub page_id: String,
    /// Initial title.
    pub title: String,
    /// URL slug.
    pub slug: String,
}

/// Emitted when a page's content changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRevised {
    /// The page identifier.
    pub page_id: String,
    /// Revision number, starting at 1 for the first revision.
    pub revision: u32,
    /// New title.
    pub title: String,
    /// New body.
    pub body: String,
}

/// Emitted when a page goes live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePublished {
    /// The page identifier.
    pub page_id: String,
    /// Revision that was published.
    pub revision: u32,
}

/// Emitted when a published page is taken down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageUnpublished {
    /// The page identifier.
    pub page_id: String,
}

/// Emitted when a draft page is deleted. Terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDeleted {
    /// The page identifier.
    pub page_id: String,
    /// Why the page was deleted.
    pub reason: String,
}

/// Event payload variants for the page publishing context.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEventKind {
    /// The page has been created.
    Created(PageCreated),
    /// The page's content has changed.
    Revised(PageRevised),
    /// The page has been published.
    Published(PagePublished),
    /// The page has been unpublished.
    Unpublished(PageUnpublished),
    /// The page has been deleted.
    Deleted(PageDeleted),
}

/// Domain event envelope for the page publishing context.
#[derive(Debug, Clone, PartialEq)]
pub struct PageEvent {
    /// Envelope fields.
    pub header: EventHeader,
    /// Event-specific payload.
    pub kind: PageEventKind,
}

fn event(header: EventHeader, kind: PageEventKind) -> PageEvent {
    PageEvent { header, kind }
}

static REGISTRY: LazyLock<EventRegistry<PageEvent>> = LazyLock::new(|| {
    EventRegistry::new(PAGE_AGGREGATE_TYPE)
        .register(PAGE_CREATED_EVENT_TYPE, 1, |header, data| {
            let payload = decode_payload(PAGE_CREATED_EVENT_TYPE, data)?;
            Ok(event(header, PageEventKind::Created(payload)))
        })
        .register(PAGE_REVISED_EVENT_TYPE, 1, |header, data| {
            let payload = decode_payload(PAGE_REVISED_EVENT_TYPE, data)?;
            Ok(event(header, PageEventKind::Revised(payload)))
        })
        .register(PAGE_PUBLISHED_EVENT_TYPE, 1, |header, data| {
            let payload = decode_payload(PAGE_PUBLISHED_EVENT_TYPE, data)?;
            Ok(event(header, PageEventKind::Published(payload)))
        })
        .register(PAGE_UNPUBLISHED_EVENT_TYPE, 1, |header, data| {
            let payload = decode_payload(PAGE_UNPUBLISHED_EVENT_TYPE, data)?;
            Ok(event(header, PageEventKind::Unpublished(payload)))
        })
        .register(PAGE_DELETED_EVENT_TYPE, 1, |header, data| {
            let payload = decode_payload(PAGE_DELETED_EVENT_TYPE, data)?;
            Ok(event(header, PageEventKind::Deleted(payload)))
        })
});

impl DomainEvent for PageEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            PageEventKind::Created(_) => PAGE_CREATED_EVENT_TYPE,
            PageEventKind::Revised(_) => PAGE_REVISED_EVENT_TYPE,
            PageEventKind::Published(_) => PAGE_PUBLISHED_EVENT_TYPE,
            PageEventKind::Unpublished(_) => PAGE_UNPUBLISHED_EVENT_TYPE,
            PageEventKind::Deleted(_) => PAGE_DELETED_EVENT_TYPE,
        }
    }

    fn header(&self) -> &EventHeader {
        &self.header
    }

    fn to_map(&self) -> EventData {
        match &self.kind {
            PageEventKind::Created(payload) => encode_payload(payload),
            PageEventKind::Revised(payload) => encode_payload(payload),
            PageEventKind::Published(payload) => encode_payload(payload),
            PageEventKind::Unpublished(payload) => encode_payload(payload),
            PageEventKind::Deleted(payload) => encode_payload(payload),
        }
    }

    fn registry() -> &'static EventRegistry<Self> {
        &REGISTRY
    }
}
