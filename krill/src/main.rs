use anyhow::Context;
use clap::Parser;
use console::style;
use krill::sources::{self, ListKind};
use krill::{Cli, ConsoleSink, FeedAggregator, Fetcher, FilterSet, JsonSink, RunSummary};
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.log_filter())
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let locators = sources::collect(&cli.sources, cli.sources_file.as_deref(), ListKind::Sources)
        .context("Unable to load sources")?;
    let patterns = sources::collect(&cli.filters, cli.filters_file.as_deref(), ListKind::Filters)
        .context("Unable to load filter patterns")?;
    let filters = FilterSet::compile(&patterns)?;

    info!("Following {} sources with {} filter patterns", locators.len(), filters.len());

    let fetcher = Fetcher::new(cli.fetch_config())?;
    let config = cli.aggregator_config();
    let aggregator = FeedAggregator::from_locators(&locators, fetcher, filters.clone(), config);
    for source in aggregator.sources() {
        debug!("Source: {}", source.display_locator());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let summary: RunSummary = if cli.json {
        let mut sink = JsonSink::new(std::io::stdout());
        aggregator.run(&mut sink, shutdown_rx).await?
    } else {
        let colors = !cli.no_color && console::colors_enabled();
        println!("{}", style(format!("krill {}", env!("CARGO_PKG_VERSION"))).bold().force_styling(colors));
        let mut sink = ConsoleSink::new(std::io::stdout(), filters, colors);
        aggregator.run(&mut sink, shutdown_rx).await?
    };

    info!("Stopped after {} cycles, {} items emitted", summary.cycles, summary.emitted);

    if aggregator.config().single_pull() && summary.last_cycle_failed {
        error!("No source could be read");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
