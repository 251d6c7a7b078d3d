//! Poll orchestration
//!
//! Drives one fetch-decode-extract pass per scrape and owns the registry
//! plus the exporter's own health counters. Decoding completes before
//! extraction starts, so a failed poll mutates nothing and the registry
//! keeps its last-known-good values.

use std::time::Instant;

use tracing::{debug, warn};

use crate::collector::{decode, AuthMode, Fetcher};
use crate::error::ScrapeError;
use crate::extractor::{self, ExtractReport, RuleTable, TargetKind};
use crate::registry::{format_value, Counter, Gauge, Registry};

/// The exporter's own health metrics, rendered after the target gauges.
#[derive(Debug, Default)]
pub struct ScrapeStats {
    scrapes: Counter,
    failures: Counter,
    suppressed: Counter,
    last_duration_seconds: Gauge,
    last_success_timestamp: Gauge,
}

impl ScrapeStats {
    fn record_success(&self, duration_seconds: f64, report: &ExtractReport) {
        self.scrapes.inc();
        self.suppressed.inc_by(report.suppressed as u64);
        self.last_duration_seconds.set(duration_seconds);
        self.last_success_timestamp.set_to_current_time();
    }

    fn record_failure(&self, duration_seconds: f64) {
        self.scrapes.inc();
        self.failures.inc();
        self.last_duration_seconds.set(duration_seconds);
    }

    /// Total polls attempted
    pub fn scrapes(&self) -> u64 {
        self.scrapes.get()
    }

    /// Polls that failed in fetch or decode
    pub fn failures(&self) -> u64 {
        self.failures.get()
    }

    /// Expected fields found absent or unusable across all polls
    pub fn suppressed(&self) -> u64 {
        self.suppressed.get()
    }

    /// Render the stats block in exposition format.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(512);

        out.push_str("# HELP hadoop_exporter_scrapes_total Total number of polls of the target endpoint\n");
        out.push_str("# TYPE hadoop_exporter_scrapes_total counter\n");
        out.push_str(&format!("hadoop_exporter_scrapes_total {}\n", self.scrapes.get()));

        out.push_str("# HELP hadoop_exporter_scrape_failures_total Polls that failed before extraction\n");
        out.push_str("# TYPE hadoop_exporter_scrape_failures_total counter\n");
        out.push_str(&format!(
            "hadoop_exporter_scrape_failures_total {}\n",
            self.failures.get()
        ));

        out.push_str("# HELP hadoop_exporter_fields_suppressed_total Expected fields absent or unusable in polled beans\n");
        out.push_str("# TYPE hadoop_exporter_fields_suppressed_total counter\n");
        out.push_str(&format!(
            "hadoop_exporter_fields_suppressed_total {}\n",
            self.suppressed.get()
        ));

        out.push_str("# HELP hadoop_exporter_last_scrape_duration_seconds Duration of the most recent poll\n");
        out.push_str("# TYPE hadoop_exporter_last_scrape_duration_seconds gauge\n");
        out.push_str(&format!(
            "hadoop_exporter_last_scrape_duration_seconds {}\n",
            format_value(self.last_duration_seconds.get())
        ));

        out.push_str("# HELP hadoop_exporter_last_scrape_success_timestamp_seconds Unix time of the last successful poll\n");
        out.push_str("# TYPE hadoop_exporter_last_scrape_success_timestamp_seconds gauge\n");
        out.push_str(&format!(
            "hadoop_exporter_last_scrape_success_timestamp_seconds {}\n",
            format_value(self.last_success_timestamp.get())
        ));

        out
    }
}

/// One target endpoint plus everything needed to poll it.
pub struct Poller {
    fetcher: Fetcher,
    auth: AuthMode,
    url: String,
    table: RuleTable,
    registry: Registry,
    stats: ScrapeStats,
}

impl Poller {
    /// Build a poller for one target. Gauge families are registered up
    /// front so metadata does not depend on what the first poll returns.
    pub fn new(fetcher: Fetcher, auth: AuthMode, url: String, kind: TargetKind) -> Self {
        let table = RuleTable::for_target(kind);
        let registry = Registry::new(table.namespace);
        for spec in table.specs() {
            registry.register(spec);
        }

        Self {
            fetcher,
            auth,
            url,
            table,
            registry,
            stats: ScrapeStats::default(),
        }
    }

    /// Run one poll. On failure the registry is untouched and the failure
    /// counter advances; the caller still renders last-known-good values.
    pub async fn poll(&self) -> Result<ExtractReport, ScrapeError> {
        let start = Instant::now();

        let result: Result<ExtractReport, ScrapeError> = async {
            let body = self.fetcher.fetch(&self.url, &self.auth).await?;
            let beans = decode(&body)?;
            Ok(extractor::apply(&beans, &self.table, &self.registry))
        }
        .await;

        let elapsed = start.elapsed().as_secs_f64();
        match &result {
            Ok(report) => {
                self.stats.record_success(elapsed, report);
                debug!(
                    matched = report.matched,
                    suppressed = report.suppressed,
                    elapsed_seconds = elapsed,
                    "poll complete"
                );
            }
            Err(err) => {
                self.stats.record_failure(elapsed);
                warn!(stage = err.stage(), error = %err, "poll failed, keeping previous values");
            }
        }

        result
    }

    /// Target gauges followed by the exporter's own stats block.
    pub fn render(&self) -> String {
        let mut out = self.registry.render();
        out.push_str(&self.stats.render());
        out
    }

    /// Target endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Health counters
    pub fn stats(&self) -> &ScrapeStats {
        &self.stats
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }
}
