use crate::detector::detect;
use crate::extractor::{extract, ExtractContext};
use crate::filter::FilterSet;
use crate::ledger::DedupLedger;
use crate::types::{
    AggregatorConfig, AggregatorError, FetchedDocument, ItemSink, Result, SourceDescriptor, StreamItem, Transport,
};
use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What one source contributed to a cycle.
#[derive(Debug, Default)]
struct SourceYield {
    kept: Vec<StreamItem>,
    duplicates: usize,
    filtered_out: usize,
}

/// Result of one polling cycle, items already in emission order.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub items: Vec<StreamItem>,
    pub failures: Vec<AggregatorError>,
    pub sources_ok: usize,
    pub duplicates: usize,
    pub filtered_out: usize,
}

impl CycleReport {
    /// True when there were sources and none of them could be read.
    pub fn all_failed(&self) -> bool {
        self.sources_ok == 0 && !self.failures.is_empty()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub emitted: usize,
    /// Whether the last completed cycle failed for every source.
    pub last_cycle_failed: bool,
}

/// Polls every source once per cycle and feeds the merged, de-duplicated,
/// filtered result to a sink.
pub struct FeedAggregator<T: Transport> {
    sources: Vec<SourceDescriptor>,
    transport: T,
    ledger: DedupLedger,
    filters: FilterSet,
    config: AggregatorConfig,
}

impl<T: Transport> FeedAggregator<T> {
    pub fn new(sources: Vec<SourceDescriptor>, transport: T, filters: FilterSet, config: AggregatorConfig) -> Self {
        Self {
            sources,
            transport,
            ledger: DedupLedger::new(),
            filters,
            config,
        }
    }

    pub fn from_locators<S: AsRef<str>>(
        locators: &[S],
        transport: T,
        filters: FilterSet,
        config: AggregatorConfig,
    ) -> Self {
        let sources = locators.iter().map(|l| SourceDescriptor::new(l.as_ref())).collect();
        Self::new(sources, transport, filters, config)
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Fetch, extract, de-duplicate and filter every source concurrently,
    /// then merge by timestamp. Ties keep source order, then document order.
    pub async fn run_cycle(&self) -> CycleReport {
        info!("Fetching {} sources", self.sources.len());

        let outcomes = join_all(self.sources.iter().map(|source| self.process_source(source))).await;

        let mut report = CycleReport::default();
        for (source, outcome) in self.sources.iter().zip(outcomes) {
            match outcome {
                Ok(yielded) => {
                    debug!(
                        "{}: {} new, {} already seen, {} filtered out",
                        source.display_locator(),
                        yielded.kept.len(),
                        yielded.duplicates,
                        yielded.filtered_out
                    );
                    report.sources_ok += 1;
                    report.duplicates += yielded.duplicates;
                    report.filtered_out += yielded.filtered_out;
                    report.items.extend(yielded.kept);
                }
                Err(e) => {
                    warn!("{}", e);
                    report.failures.push(e);
                }
            }
        }

        // sort_by_key is stable, so equal timestamps keep their collection order
        report.items.sort_by_key(|item| item.timestamp);

        info!(
            "Cycle finished: {} items to emit from {}/{} sources ({} already seen, {} filtered out)",
            report.items.len(),
            report.sources_ok,
            self.sources.len(),
            report.duplicates,
            report.filtered_out
        );
        report
    }

    async fn process_source(&self, source: &SourceDescriptor) -> Result<SourceYield> {
        let fetched = self.fetch(source).await?;

        let document = detect(&fetched, source.format_hint(), source.display_locator())?;
        let format = document.format();
        let context = ExtractContext::new(source.locator(), source.display_locator(), fetched.fetched_at);
        let items = extract(document, &context)?;

        if source.format_hint().is_none() {
            debug!("{} detected as {}", source.display_locator(), format);
            source.remember_format(format);
        }

        let mut yielded = SourceYield::default();
        for item in items {
            if !self.ledger.mark_and_check(&item.identity).await {
                yielded.duplicates += 1;
                continue;
            }
            if !self.filters.matches(&item) {
                yielded.filtered_out += 1;
                continue;
            }
            yielded.kept.push(item);
        }
        Ok(yielded)
    }

    async fn fetch(&self, source: &SourceDescriptor) -> Result<FetchedDocument> {
        let locator = source.display_locator();
        match tokio::time::timeout(self.config.fetch_timeout, self.transport.fetch(source.locator())).await {
            Ok(Ok(document)) => Ok(document),
            Ok(Err(e)) => Err(match e.downcast::<AggregatorError>() {
                Ok(err) => err,
                Err(other) => AggregatorError::Fetch {
                    locator: locator.to_string(),
                    message: format!("{:#}", other),
                },
            }),
            Err(_) => Err(AggregatorError::Timeout {
                locator: locator.to_string(),
                seconds: self.config.fetch_timeout.as_secs(),
            }),
        }
    }

    /// Hand a finished cycle to the sink in order.
    pub fn emit<S: ItemSink>(&self, report: &CycleReport, sink: &mut S) -> Result<usize> {
        for item in &report.items {
            sink.emit(item)
                .map_err(|e| AggregatorError::General(format!("output failed: {:#}", e)))?;
        }
        sink.end_cycle()
            .map_err(|e| AggregatorError::General(format!("output failed: {:#}", e)))?;
        Ok(report.items.len())
    }

    /// Run cycles until a single pull completes or `shutdown` turns true.
    ///
    /// Cycles start `update_interval` apart, measured start to start; a cycle
    /// that overruns is followed immediately by the next. A shutdown during a
    /// cycle abandons it without emitting anything from it.
    pub async fn run<S: ItemSink>(&self, sink: &mut S, mut shutdown: watch::Receiver<bool>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        loop {
            if *shutdown.borrow() {
                break;
            }

            let cycle_started = Instant::now();
            let report = tokio::select! {
                report = self.run_cycle() => report,
                _ = wait_for_shutdown(&mut shutdown) => {
                    info!("Shutdown requested, abandoning the current cycle");
                    break;
                }
            };

            summary.cycles += 1;
            summary.emitted += self.emit(&report, sink)?;
            summary.last_cycle_failed = report.all_failed();

            if self.config.single_pull() {
                break;
            }

            let next_cycle = cycle_started + self.config.update_interval;
            debug!("Next cycle in {:?}", next_cycle.saturating_duration_since(Instant::now()));
            tokio::select! {
                _ = tokio::time::sleep_until(next_cycle) => {}
                _ = wait_for_shutdown(&mut shutdown) => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        Ok(summary)
    }
}

/// Resolves once the flag is true. A dropped sender never triggers shutdown.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
