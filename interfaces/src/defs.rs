use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One piece of content pulled from one source during one polling cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamItem {
    /// Stable key used only for de-duplication (entry id, permalink, post id).
    pub identity: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Locator of the source this item came from, credentials redacted.
    pub source_locator: String,
    /// Feed title or timeline author, when the document names one.
    pub source_name: Option<String>,
    pub link: Option<String>,
}

impl StreamItem {
    /// Name to show next to the item: the document's own name, else the locator.
    pub fn display_source(&self) -> &str {
        self.source_name.as_deref().unwrap_or(&self.source_locator)
    }
}

/// Raw result of fetching a locator.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub body: String,
    pub content_type: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub http_status: Option<u16>,
}

impl FetchedDocument {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
            fetched_at: Utc::now(),
            http_status: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Shared by every source fetched in a cycle, so calls may overlap.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch one locator. The locator may carry `user:password@` credentials.
    async fn fetch(&self, locator: &str) -> anyhow::Result<FetchedDocument>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn fetch(&self, locator: &str) -> anyhow::Result<FetchedDocument> {
        (**self).fetch(locator).await
    }
}

/// Receives the merged stream, one item at a time, in emission order.
pub trait ItemSink {
    fn emit(&mut self, item: &StreamItem) -> anyhow::Result<()>;

    /// Called once after every item of a cycle has been emitted.
    fn end_cycle(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
