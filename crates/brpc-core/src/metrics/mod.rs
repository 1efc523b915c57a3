//! # Metric snapshot and Prometheus rendering
//!
//! A scrape produces a [`MetricSet`]: every sample that could be determined this
//! cycle, grouped by [`MetricFamily`]. Nothing is registered globally. Rendering
//! builds a throwaway Prometheus recorder, replays the set into it through
//! [`metrics::with_local_recorder`], and returns the text exposition, so a sample
//! that was not collected this cycle can never leak into the output.
//!
//! ## Families
//!
//! | Family | Type | Labels |
//! |--------|------|--------|
//! | `health` | gauge | endpoint |
//! | `head_count` | counter | endpoint |
//! | `disconnects` | gauge | endpoint |
//! | `block_height` | gauge | endpoint |
//! | `client_version` | info gauge | endpoint + `version` |
//! | `total_difficulty` | gauge | endpoint |
//! | `latency` | gauge (ms) | endpoint |
//! | `block_height_behind_highest` | gauge | endpoint |
//! | `difficulty_behind_highest` | gauge | endpoint |
//! | `exporter_health` | gauge | none |

use metrics::{counter, describe_counter, describe_gauge, gauge, Label};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::BTreeMap;

/// Content type of [`MetricSet::render`] output.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Default metric name prefix.
pub const DEFAULT_NAMESPACE: &str = "brpc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Gauge,
    Counter,
}

/// Exported metric families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricFamily {
    Health,
    HeadCount,
    Disconnects,
    BlockHeight,
    ClientVersion,
    TotalDifficulty,
    Latency,
    BlockHeightBehindHighest,
    DifficultyBehindHighest,
    ExporterHealth,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 10] = [
        Self::Health,
        Self::HeadCount,
        Self::Disconnects,
        Self::BlockHeight,
        Self::ClientVersion,
        Self::TotalDifficulty,
        Self::Latency,
        Self::BlockHeightBehindHighest,
        Self::DifficultyBehindHighest,
        Self::ExporterHealth,
    ];

    /// Name without the namespace prefix.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::HeadCount => "head_count",
            Self::Disconnects => "disconnects",
            Self::BlockHeight => "block_height",
            Self::ClientVersion => "client_version",
            Self::TotalDifficulty => "total_difficulty",
            Self::Latency => "latency",
            Self::BlockHeightBehindHighest => "block_height_behind_highest",
            Self::DifficultyBehindHighest => "difficulty_behind_highest",
            Self::ExporterHealth => "exporter_health",
        }
    }

    #[must_use]
    pub fn help(self) -> &'static str {
        match self {
            Self::Health => {
                "Returns 1 if rpc websocket server established a connection with the probe client."
            }
            Self::HeadCount => "Heads received total.",
            Self::Disconnects => "How many times rpc has disconnected.",
            Self::BlockHeight => "Latest observed block_height.",
            Self::ClientVersion => "Client version for the particular RPC endpoint.",
            Self::TotalDifficulty => {
                "Total canonical chain difficulty observed from the first to the latest block."
            }
            Self::Latency => "Latency of the rpc connection.",
            Self::BlockHeightBehindHighest => {
                "Difference between block heights relative to the max block height"
            }
            Self::DifficultyBehindHighest => {
                "Delta compared between highest total difficulty of the latest block in the pool."
            }
            Self::ExporterHealth => "Returns 1 while the exporter process is able to serve scrapes.",
        }
    }

    #[must_use]
    pub fn metric_type(self) -> MetricType {
        match self {
            Self::HeadCount => MetricType::Counter,
            _ => MetricType::Gauge,
        }
    }

    /// Fully qualified name, e.g. `brpc_block_height`.
    #[must_use]
    pub fn qualified_name(self, namespace: &str) -> String {
        if namespace.is_empty() {
            self.name().to_string()
        } else {
            format!("{namespace}_{}", self.name())
        }
    }
}

/// One labelled value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

impl Sample {
    #[must_use]
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.iter().find(|(key, _)| *key == name).map(|(_, value)| value.as_str())
    }
}

/// Every sample collected during one scrape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    families: BTreeMap<MetricFamily, Vec<Sample>>,
}

impl MetricSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, family: MetricFamily, labels: Vec<(&'static str, String)>, value: f64) {
        self.families.entry(family).or_default().push(Sample { labels, value });
    }

    /// Samples of `family`; empty when nothing was collected for it.
    #[must_use]
    pub fn samples(&self, family: MetricFamily) -> &[Sample] {
        self.families.get(&family).map_or(&[], Vec::as_slice)
    }

    /// Families with at least one sample.
    pub fn families(&self) -> impl Iterator<Item = MetricFamily> + '_ {
        self.families.iter().filter(|(_, samples)| !samples.is_empty()).map(|(family, _)| *family)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.families.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the Prometheus text exposition with every name prefixed by `namespace`.
    #[must_use]
    pub fn render(&self, namespace: &str) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            for (family, samples) in &self.families {
                let name = family.qualified_name(namespace);
                match family.metric_type() {
                    MetricType::Gauge => describe_gauge!(name.clone(), family.help()),
                    MetricType::Counter => describe_counter!(name.clone(), family.help()),
                }

                for sample in samples {
                    let labels: Vec<Label> = sample
                        .labels
                        .iter()
                        .map(|(key, value)| Label::new(*key, value.clone()))
                        .collect();
                    match family.metric_type() {
                        MetricType::Gauge => gauge!(name.clone(), labels).set(sample.value),
                        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                        MetricType::Counter => {
                            counter!(name.clone(), labels).absolute(sample.value as u64);
                        }
                    }
                }
            }
        });

        handle.render()
    }
}
