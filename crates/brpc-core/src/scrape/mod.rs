//! Scrape orchestration.
//!
//! One [`ScrapeOrchestrator::collect`] call is one scrape cycle:
//!
//! ```text
//!   reset_cycle() on every collector
//!          │
//!          ▼
//!   JoinSet: one task per (collector, metric kind), bounded by a semaphore
//!          │              (panics are caught per task and dropped)
//!          ▼
//!   latency read per collector, after the pool drains
//!          │
//!          ▼
//!   ScrapeSnapshot ──► MetricSet + "behind highest" deltas + exporter_health
//! ```
//!
//! Cycles never overlap: a scrape that arrives mid-cycle waits for the running one.

use crate::{
    collectors::{EndpointCollector, MetricKind, MetricValue},
    config::ScrapeConfig,
    metrics::{MetricFamily, MetricSet},
};
use std::{
    collections::BTreeMap,
    ops::Sub,
    sync::Arc,
    time::Instant,
};
use tokio::{
    sync::{Mutex, Semaphore},
    task::JoinSet,
};
use tracing::{debug, error};

/// Values extracted for each collector during one cycle, indexed like the collectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeSnapshot {
    endpoints: Vec<BTreeMap<MetricKind, MetricValue>>,
}

impl ScrapeSnapshot {
    fn with_endpoints(count: usize) -> Self {
        Self { endpoints: vec![BTreeMap::new(); count] }
    }

    fn insert(&mut self, index: usize, kind: MetricKind, value: MetricValue) {
        if let Some(values) = self.endpoints.get_mut(index) {
            values.insert(kind, value);
        }
    }

    #[must_use]
    pub fn get(&self, index: usize, kind: MetricKind) -> Option<&MetricValue> {
        self.endpoints.get(index)?.get(&kind)
    }

    fn alive(&self, index: usize) -> bool {
        matches!(self.get(index, MetricKind::Alive), Some(MetricValue::Flag(true)))
    }

    fn count(&self, kind: MetricKind) -> Vec<(usize, u64)> {
        (0..self.endpoints.len())
            .filter_map(|i| match self.get(i, kind) {
                Some(MetricValue::Count(v)) => Some((i, *v)),
                _ => None,
            })
            .collect()
    }

    fn gauge(&self, kind: MetricKind) -> Vec<(usize, f64)> {
        (0..self.endpoints.len())
            .filter_map(|i| match self.get(i, kind) {
                Some(MetricValue::Gauge(v)) => Some((i, *v)),
                _ => None,
            })
            .collect()
    }
}

/// Distance of every reported value from the highest one.
///
/// Endpoints that reported nothing are neither part of the maximum nor of the output.
#[must_use]
pub fn behind_highest<T>(reported: &[(usize, T)]) -> Vec<(usize, T)>
where
    T: Copy + PartialOrd + Sub<Output = T>,
{
    let Some(highest) = reported
        .iter()
        .map(|(_, v)| *v)
        .reduce(|max, v| if v > max { v } else { max })
    else {
        return Vec::new();
    };

    reported.iter().map(|(i, v)| (*i, highest - *v)).collect()
}

/// Drives every collector once per scrape and assembles the metric set.
pub struct ScrapeOrchestrator {
    collectors: Vec<Arc<dyn EndpointCollector>>,
    config: ScrapeConfig,
    cycle: Mutex<()>,
}

impl std::fmt::Debug for ScrapeOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeOrchestrator")
            .field("collectors", &self.collectors.len())
            .field("config", &self.config)
            .finish()
    }
}

impl ScrapeOrchestrator {
    #[must_use]
    pub fn new(collectors: Vec<Arc<dyn EndpointCollector>>, config: ScrapeConfig) -> Self {
        Self { collectors, config, cycle: Mutex::new(()) }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    #[must_use]
    pub fn collectors(&self) -> &[Arc<dyn EndpointCollector>] {
        &self.collectors
    }

    /// Worker pool size: one slot per (collector, pooled metric kind) unless capped.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        let natural = self.collectors.len() * MetricKind::POOLED.len();
        self.config.max_workers.map_or(natural, |cap| natural.min(cap)).max(1)
    }

    /// Runs one scrape cycle.
    pub async fn collect(&self) -> MetricSet {
        let started = Instant::now();
        let snapshot = self.snapshot().await;
        let metrics = self.assemble(&snapshot);

        debug!(
            collectors = self.collectors.len(),
            samples = metrics.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "scrape complete"
        );
        metrics
    }

    /// Extracts every metric of every collector into a snapshot.
    pub async fn snapshot(&self) -> ScrapeSnapshot {
        let _cycle = self.cycle.lock().await;

        for collector in &self.collectors {
            collector.reset_cycle();
        }

        let mut snapshot = ScrapeSnapshot::with_endpoints(self.collectors.len());

        if self.config.gate_on_alive {
            let alive: Vec<_> = (0..self.collectors.len()).map(|i| (i, MetricKind::Alive)).collect();
            self.extract(alive, &mut snapshot).await;

            let dependent = (0..self.collectors.len())
                .filter(|i| snapshot.alive(*i))
                .flat_map(|i| {
                    MetricKind::POOLED
                        .into_iter()
                        .filter(|kind| *kind != MetricKind::Alive)
                        .map(move |kind| (i, kind))
                })
                .collect();
            self.extract(dependent, &mut snapshot).await;
        } else {
            let all = (0..self.collectors.len())
                .flat_map(|i| MetricKind::POOLED.into_iter().map(move |kind| (i, kind)))
                .collect();
            self.extract(all, &mut snapshot).await;
        }

        for (i, collector) in self.collectors.iter().enumerate() {
            if self.config.gate_on_alive && !snapshot.alive(i) {
                continue;
            }
            if let Some(latency) = collector.latency() {
                snapshot.insert(i, MetricKind::Latency, MetricValue::Elapsed(latency));
            }
        }

        snapshot
    }

    async fn extract(&self, pairs: Vec<(usize, MetricKind)>, snapshot: &mut ScrapeSnapshot) {
        let permits = Arc::new(Semaphore::new(self.pool_size()));
        let mut tasks = JoinSet::new();

        for (index, kind) in pairs {
            let collector = self.collectors[index].clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok()?;
                let value = collector.extract(kind).await?;
                Some((index, kind, value))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some((index, kind, value))) => snapshot.insert(index, kind, value),
                Ok(None) => {}
                Err(e) => error!(error = %e, "metric extraction task failed"),
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn assemble(&self, snapshot: &ScrapeSnapshot) -> MetricSet {
        let mut metrics = MetricSet::new();
        let labels = |i: usize| -> Vec<(&'static str, String)> {
            self.collectors[i]
                .endpoint()
                .labels()
                .pairs()
                .map(|(name, value)| (name, value.to_string()))
                .collect()
        };

        for i in 0..self.collectors.len() {
            for kind in MetricKind::ALL {
                let Some(value) = snapshot.get(i, kind) else {
                    continue;
                };
                match (kind, value) {
                    (MetricKind::Alive, MetricValue::Flag(up)) => {
                        metrics.push(MetricFamily::Health, labels(i), f64::from(u8::from(*up)));
                    }
                    (MetricKind::BlockHeight, MetricValue::Count(v)) => {
                        metrics.push(MetricFamily::BlockHeight, labels(i), *v as f64);
                    }
                    (MetricKind::ClientVersion, MetricValue::Text(version)) => {
                        let mut info = labels(i);
                        info.push(("client_version", version.clone()));
                        metrics.push(MetricFamily::ClientVersion, info, 1.0);
                    }
                    (MetricKind::Disconnects, MetricValue::Count(v)) => {
                        metrics.push(MetricFamily::Disconnects, labels(i), *v as f64);
                    }
                    (MetricKind::HeadsReceived, MetricValue::Count(v)) => {
                        metrics.push(MetricFamily::HeadCount, labels(i), *v as f64);
                    }
                    (MetricKind::TotalDifficulty, MetricValue::Gauge(v)) => {
                        metrics.push(MetricFamily::TotalDifficulty, labels(i), *v);
                    }
                    (MetricKind::Latency, MetricValue::Elapsed(elapsed)) => {
                        metrics.push(MetricFamily::Latency, labels(i), elapsed.as_secs_f64() * 1000.0);
                    }
                    (kind, value) => {
                        error!(metric = kind.as_str(), value = ?value, "metric value of unexpected shape");
                    }
                }
            }
        }

        for (i, delta) in behind_highest(&snapshot.count(MetricKind::BlockHeight)) {
            metrics.push(MetricFamily::BlockHeightBehindHighest, labels(i), delta as f64);
        }
        for (i, delta) in behind_highest(&snapshot.gauge(MetricKind::TotalDifficulty)) {
            metrics.push(MetricFamily::DifficultyBehindHighest, labels(i), delta);
        }

        metrics.push(MetricFamily::ExporterHealth, Vec::new(), 1.0);
        metrics
    }
}
