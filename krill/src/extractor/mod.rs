pub mod syndication;
pub mod timeline;

use crate::types::{FeedFormat, Result, StreamItem};
use chrono::{DateTime, Utc};
use url::Url;

/// A fetched document after format detection.
#[derive(Debug)]
pub enum Document {
    Syndication(feed_rs::model::Feed),
    SocialTimeline(String),
}

impl Document {
    pub fn format(&self) -> FeedFormat {
        match self {
            Document::Syndication(_) => FeedFormat::Syndication,
            Document::SocialTimeline(_) => FeedFormat::SocialTimeline,
        }
    }
}

/// What an extractor needs to know about where a document came from.
#[derive(Debug, Clone)]
pub struct ExtractContext {
    /// Redacted locator stamped onto every item.
    pub source_locator: String,
    /// Locator without credentials, for resolving relative links.
    pub base_url: Option<Url>,
    /// Timestamp for items whose own time is missing or unreadable.
    pub fetched_at: DateTime<Utc>,
}

impl ExtractContext {
    pub fn new(locator: &str, display_locator: &str, fetched_at: DateTime<Utc>) -> Self {
        let base_url = Url::parse(locator).ok().map(|mut url| {
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url
        });
        Self {
            source_locator: display_locator.to_string(),
            base_url,
            fetched_at,
        }
    }

    /// Resolve `href` against the source, dropping any fragment.
    pub fn absolute_link(&self, href: &str) -> Option<String> {
        let mut url = match &self.base_url {
            Some(base) => base.join(href).ok()?,
            None => Url::parse(href).ok()?,
        };
        url.set_fragment(None);
        Some(url.to_string())
    }
}

/// Turn a detected document into items, preserving document order.
pub fn extract(document: Document, context: &ExtractContext) -> Result<Vec<StreamItem>> {
    match document {
        Document::Syndication(feed) => Ok(syndication::extract_entries(feed, context)),
        Document::SocialTimeline(html) => timeline::extract_posts(&html, context),
    }
}
