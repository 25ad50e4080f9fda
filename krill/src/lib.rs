pub mod aggregator;
pub mod config;
pub mod detector;
pub mod excerpt;
pub mod extractor;
pub mod fetcher;
pub mod filter;
pub mod ledger;
pub mod output;
pub mod sources;
pub mod text;
pub mod timestamps;
pub mod types;

pub use aggregator::{CycleReport, FeedAggregator, RunSummary};
pub use config::Cli;
pub use fetcher::Fetcher;
pub use filter::FilterSet;
pub use ledger::DedupLedger;
pub use output::{ConsoleSink, JsonSink};
pub use types::*;
