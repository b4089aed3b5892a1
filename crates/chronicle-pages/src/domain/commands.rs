//! Commands for the page publishing context.

use chronicle_core::command::Command;
use uuid::Uuid;

/// Command to create a draft page.
#[derive(Debug, Clone)]
pub struct CreatePage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The page identifier.
    pub page_id: String,
    /// Initial title.
    pub title: String,
    /// URL slug.
    pub slug: String,
}

/// Command to replace a page's title and body.
#[derive(Debug, Clone)]
pub struct RevisePage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The page identifier.
    pub page_id: String,
    /// New title.
    pub title: String,
    /// New body.
    pub body: String,
}

/// Command to publish a page.
#[derive(Debug, Clone)]
pub struct PublishPage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The page identifier.
    pub page_id: String,
}

/// Command to take a page down.
#[derive(Debug, Clone)]
pub struct UnpublishPage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The page identifier.
    pub page_id: String,
}

/// Command to delete a draft page.
#[derive(Debug, Clone)]
pub struct DeletePage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The page identifier.
    pub page_id: String,
    /// Why the page is being deleted.
    pub reason: String,
}

macro_rules! impl_command {
    ($($command:ty => $name:literal),+ $(,)?) => {
        $(
            impl Command for $command {
                fn command_type(&self) -> &'static str {
                    $name
                }

                fn correlation_id(&self) -> Uuid {
                    self.correlation_id
                }
            }
        )+
    };
}

impl_command! {
    CreatePage => "page.create_page",
    RevisePage => "page.revise_page",
    PublishPage => "page.publish_page",
    UnpublishPage => "page.unpublish_page",
    DeletePage => "page.delete_page",
}
