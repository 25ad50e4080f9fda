use std::sync::OnceLock;
use std::time::Duration;

// Core item and collaborator types live in the interfaces crate
pub use interfaces::defs::{FetchedDocument, ItemSink, StreamItem, Transport};

use crate::text::redact_locator;

/// The closed set of document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedFormat {
    /// RSS, Atom, RDF or JSON Feed
    Syndication,
    /// An HTML page listing social-media posts
    SocialTimeline,
}

impl std::fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedFormat::Syndication => write!(f, "syndication"),
            FeedFormat::SocialTimeline => write!(f, "social timeline"),
        }
    }
}

/// A configured source. The locator never changes; the detected format is
/// remembered after the first successful extraction.
#[derive(Debug)]
pub struct SourceDescriptor {
    locator: String,
    display_locator: String,
    format_hint: OnceLock<FeedFormat>,
}

impl SourceDescriptor {
    pub fn new(locator: impl Into<String>) -> Self {
        let locator = locator.into();
        let display_locator = redact_locator(&locator);
        Self {
            locator,
            display_locator,
            format_hint: OnceLock::new(),
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Locator with any embedded password masked, for logs and output.
    pub fn display_locator(&self) -> &str {
        &self.display_locator
    }

    /// `None` until the format has been detected once.
    pub fn format_hint(&self) -> Option<FeedFormat> {
        self.format_hint.get().copied()
    }

    /// Records the detected format. Later calls are no-ops.
    pub fn remember_format(&self, format: FeedFormat) {
        let _ = self.format_hint.set(format);
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    /// Zero disables redirect following
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("krill/{}", env!("CARGO_PKG_VERSION")),
            timeout_seconds: 30,
            max_retries: 0,
            retry_delay_seconds: 2,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Start-to-start time between cycles. Zero means a single pull.
    pub update_interval: Duration,
    /// Upper bound on one source's fetch within a cycle.
    pub fetch_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl AggregatorConfig {
    pub fn single_pull(&self) -> bool {
        self.update_interval.is_zero()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("Unable to retrieve data from '{locator}': {message}")]
    Fetch { locator: String, message: String },

    #[error("Timed out after {seconds}s fetching '{locator}'")]
    Timeout { locator: String, seconds: u64 },

    #[error("Unable to parse document from '{locator}': {message}")]
    Parse { locator: String, message: String },

    #[error("Error while compiling regular expression '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No sources configured")]
    NoSources,

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
