use crate::types::{AggregatorConfig, FetchConfig};
use clap::{ArgAction, ArgGroup, Parser};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "krill", version, about = "Read and filter web feeds.")]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .multiple(true)
        .args(["sources", "sources_file"])
))]
pub struct Cli {
    /// URLs to pull data from
    #[arg(short = 's', long = "sources", num_args = 1.., value_name = "URL")]
    pub sources: Vec<String>,

    /// File (plain list or OPML) from which to load source URLs
    #[arg(short = 'S', long = "sources-file", value_name = "FILE")]
    pub sources_file: Option<PathBuf>,

    /// Patterns used to select feed items to print
    #[arg(short = 'f', long = "filters", num_args = 1.., value_name = "REGEX")]
    pub filters: Vec<String>,

    /// File from which to load filter patterns
    #[arg(short = 'F', long = "filters-file", value_name = "FILE")]
    pub filters_file: Option<PathBuf>,

    /// Time between successive feed updates, 0 for a single pull only
    #[arg(short = 'u', long = "update-interval", default_value_t = 300, value_name = "SECONDS")]
    pub update_interval: u64,

    /// Per-source fetch timeout
    #[arg(long, default_value_t = 30, env = "KRILL_TIMEOUT", value_name = "SECONDS")]
    pub timeout: u64,

    /// Extra attempts for a failed fetch within one cycle
    #[arg(long, default_value_t = 0, value_name = "N")]
    pub retries: u32,

    /// Redirects to follow per fetch, 0 to follow none
    #[arg(long = "max-redirects", default_value_t = 5, value_name = "N")]
    pub max_redirects: usize,

    #[arg(long = "user-agent", env = "KRILL_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Print one JSON object per item instead of formatted text
    #[arg(long)]
    pub json: bool,

    #[arg(long = "no-color")]
    pub no_color: bool,

    /// More log output on stderr (-v, -vv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn fetch_config(&self) -> FetchConfig {
        let defaults = FetchConfig::default();
        FetchConfig {
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            timeout_seconds: self.timeout,
            max_retries: self.retries,
            max_redirects: self.max_redirects,
            ..defaults
        }
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        // Retries happen inside one fetch, so the outer bound has to cover them
        let attempts = u64::from(self.retries) + 1;
        AggregatorConfig {
            update_interval: Duration::from_secs(self.update_interval),
            fetch_timeout: Duration::from_secs(self.timeout.saturating_mul(attempts)),
        }
    }

    /// `-v` flags win over `RUST_LOG`; without either only warnings show.
    pub fn log_filter(&self) -> EnvFilter {
        match self.verbose {
            0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("krill=warn")),
            1 => EnvFilter::new("krill=info"),
            _ => EnvFilter::new("krill=debug"),
        }
    }
}
