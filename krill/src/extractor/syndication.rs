use super::ExtractContext;
use crate::text::html_to_text;
use crate::types::StreamItem;
use feed_rs::model::{Entry, Feed};
use feed_rs::parser::{self, ParseFeedError};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Parse RSS, Atom, RDF or JSON Feed content.
pub fn parse_feed(content: &str) -> std::result::Result<Feed, ParseFeedError> {
    debug!("Parsing feed content ({} bytes)", content.len());
    parser::parse(content.as_bytes())
}

pub fn extract_entries(feed: Feed, context: &ExtractContext) -> Vec<StreamItem> {
    let feed_title = feed
        .title
        .map(|t| html_to_text(&t.content))
        .filter(|t| !t.is_empty());

    let total = feed.entries.len();
    let items: Vec<StreamItem> = feed
        .entries
        .into_iter()
        .filter_map(|entry| entry_to_item(entry, feed_title.as_deref(), context))
        .collect();

    if items.len() < total {
        debug!(
            "Skipped {} unusable entries from {}",
            total - items.len(),
            context.source_locator
        );
    }
    items
}

fn entry_to_item(entry: Entry, feed_title: Option<&str>, context: &ExtractContext) -> Option<StreamItem> {
    let title = entry
        .title
        .map(|t| html_to_text(&t.content))
        .unwrap_or_default();

    // Prefer the summary; fall back to the full content body
    let summary = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .map(|html| html_to_text(&html))
        .unwrap_or_default();

    let link = entry.links.first().map(|l| l.href.clone());

    if title.is_empty() && summary.is_empty() && link.is_none() {
        return None;
    }

    let identity = if entry.id.trim().is_empty() {
        fallback_identity(&title, link.as_deref().unwrap_or(""))
    } else {
        entry.id
    };

    let text = match (title.is_empty(), summary.is_empty()) {
        (false, false) => format!("{} - {}", title, summary),
        (false, true) => title,
        (true, _) => summary,
    };

    let timestamp = entry
        .published
        .or(entry.updated)
        .unwrap_or(context.fetched_at);

    Some(StreamItem {
        identity,
        text,
        timestamp,
        source_locator: context.source_locator.clone(),
        source_name: feed_title.map(str::to_string),
        link,
    })
}

/// Identity for entries that carry no id of their own.
pub fn fallback_identity(title: &str, link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\n");
    hasher.update(link.as_bytes());
    format!("{:x}", hasher.finalize())
}
