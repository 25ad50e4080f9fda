use crate::extractor::syndication::parse_feed;
use crate::extractor::Document;
use crate::types::{AggregatorError, FeedFormat, FetchedDocument, Result};
use tracing::debug;

/// Classify a fetched document.
///
/// A cached hint skips sniffing. Without one, anything feed-rs accepts is
/// syndication and everything else is handed to the timeline extractor, which
/// reports a parse error if it recognizes nothing.
pub fn detect(fetched: &FetchedDocument, hint: Option<FeedFormat>, locator: &str) -> Result<Document> {
    match hint {
        Some(FeedFormat::Syndication) => parse_feed(&fetched.body)
            .map(Document::Syndication)
            .map_err(|e| AggregatorError::Parse {
                locator: locator.to_string(),
                message: format!("Failed to parse feed: {}", e),
            }),
        Some(FeedFormat::SocialTimeline) => Ok(Document::SocialTimeline(fetched.body.clone())),
        None => Ok(sniff(fetched, locator)),
    }
}

fn sniff(fetched: &FetchedDocument, locator: &str) -> Document {
    match parse_feed(&fetched.body) {
        Ok(feed) => Document::Syndication(feed),
        Err(e) => {
            debug!(
                "{} is not a feed ({}, served as {}), trying timeline markup",
                locator,
                e,
                fetched.content_type.as_deref().unwrap_or("unknown type")
            );
            Document::SocialTimeline(fetched.body.clone())
        }
    }
}
