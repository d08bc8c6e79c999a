//! Roster builder: turns the stats, manifest and telemetry resources into
//! ship records. Every stage degrades on its own; the result is never empty.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;

use renderer::SpriteCache;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collab::Collaborators;
use crate::record::ShipRecord;
use crate::stats::{FleetTelemetry, Manifest, StatsTable, TickerStatus};

/// Flown when the manifest is unavailable.
pub const FALLBACK_TICKERS: [&str; 8] = ["RKLB", "LUNR", "ASTS", "ACHR", "JOBY", "PL", "BKSY", "RDW"];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("failed to read {resource}: {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {resource}: {source}")]
    Parse {
        resource: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Where roster resources come from.
pub trait RosterSource {
    fn fetch(&self, resource: &str) -> impl Future<Output = Result<String, FetchError>>;
}

/// Static JSON files under a data directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RosterSource for DirSource {
    async fn fetch(&self, resource: &str) -> Result<String, FetchError> {
        let path = self.root.join(resource);
        std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FetchError::NotFound(path.display().to_string())
            } else {
                FetchError::Io {
                    resource: path.display().to_string(),
                    source,
                }
            }
        })
    }
}

/// In-memory resources.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    resources: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource: &str, body: impl Into<String>) -> Self {
        self.resources.insert(resource.to_string(), body.into());
        self
    }
}

impl RosterSource for MemorySource {
    async fn fetch(&self, resource: &str) -> Result<String, FetchError> {
        self.resources
            .get(resource)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(resource.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub stats_resource: String,
    pub manifest_resource: String,
    /// Optional; missing telemetry is expected.
    pub telemetry_resource: String,
    /// Size of the elite set (top tickers by one-day return).
    pub elite_count: usize,
    pub fallback_tickers: Vec<String>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            stats_resource: "stats.json".into(),
            manifest_resource: "manifest.json".into(),
            telemetry_resource: "fleet.json".into(),
            elite_count: 3,
            fallback_tickers: FALLBACK_TICKERS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Multiplier applied to `fit` from the one-day return.
pub fn fit_bias(d1: Option<f64>) -> f32 {
    match d1.filter(|d| d.is_finite()) {
        Some(d) => (1.0 + d / 10.0).clamp(0.75, 1.25) as f32,
        None => 1.0,
    }
}

#[derive(Debug, Clone, Default)]
pub struct RosterBuilder {
    config: RosterConfig,
}

async fn fetch_json<S, T>(source: &S, resource: &str, parse: fn(&str) -> Result<T, serde_json::Error>) -> Result<T, FetchError>
where
    S: RosterSource + ?Sized,
{
    let body = source.fetch(resource).await?;
    parse(&body).map_err(|source| FetchError::Parse {
        resource: resource.to_string(),
        source,
    })
}

impl RosterBuilder {
    pub fn new(config: RosterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    /// Build the roster and preload every sprite it references.
    pub async fn build<S>(&self, source: &S, collaborators: &Collaborators, sprites: &SpriteCache) -> Vec<ShipRecord>
    where
        S: RosterSource + ?Sized,
    {
        let cfg = &self.config;

        let stats = match fetch_json(source, &cfg.stats_resource, StatsTable::from_json).await {
            Ok(stats) => stats,
            Err(e) => {
                log::warn!("Stats unavailable, flying without them: {}", e);
                StatsTable::default()
            }
        };
        let elite: HashSet<String> = stats.top_by_daily_return(cfg.elite_count).into_iter().collect();

        let manifest = match fetch_json(source, &cfg.manifest_resource, Manifest::from_json).await {
            Ok(m) if m.flyable().next().is_some() => Some(m),
            Ok(_) => {
                log::warn!("Manifest lists no flyable tickers, using fallback roster");
                None
            }
            Err(e) => {
                log::warn!("Manifest unavailable, using fallback roster: {}", e);
                None
            }
        };

        let telemetry = match fetch_json(source, &cfg.telemetry_resource, FleetTelemetry::from_json).await {
            Ok(t) => t,
            Err(FetchError::NotFound(_)) => {
                log::debug!("No fleet telemetry");
                FleetTelemetry::default()
            }
            Err(e) => {
                log::warn!("Ignoring fleet telemetry: {}", e);
                FleetTelemetry::default()
            }
        };

        let entries: Vec<(String, TickerStatus)> = match &manifest {
            Some(m) => m.flyable().map(|e| (e.ticker.clone(), e.status)).collect(),
            None => cfg
                .fallback_tickers
                .iter()
                .map(|t| (t.trim().to_uppercase(), TickerStatus::Active))
                .filter(|(t, _)| !t.is_empty())
                .collect(),
        };

        let mut records: Vec<ShipRecord> = entries
            .into_iter()
            .map(|(ticker, status)| {
                let ticker_stats = stats.get(&ticker).cloned().unwrap_or_default();
                let mut record = ShipRecord::from_stats(ticker.as_str(), &ticker_stats);
                let signal = telemetry.get(&ticker).map_or(1.0, |entry| entry.signal.fit_bias());
                let fit = record.fit * fit_bias(ticker_stats.d1) * signal;
                record = record
                    .with_fit(fit)
                    .elite(elite.contains(&ticker))
                    .benchmark(status == TickerStatus::Benchmark);
                if let Some(missions) = &collaborators.missions {
                    record = record
                        .mission(missions.has_mission(&ticker))
                        .support(missions.is_support(&ticker));
                }
                if let Some(entry) = telemetry.get(&ticker) {
                    record = record.with_visual(entry.visual);
                }
                record
            })
            .collect();

        if records.is_empty() {
            records = FALLBACK_TICKERS.iter().map(|t| ShipRecord::new(*t)).collect();
        }

        // Flagged ships first, so a mode's ship cap drops plain ones.
        records.sort_by_key(|r| !(r.is_benchmark || r.has_mission || r.is_elite || r.is_support));

        let report = sprites.preload_sprites_for_tickers(records.iter().map(|r| r.ticker.as_str())).await;
        log::info!(
            "Roster: {} ships ({} elite, {} missions), sprites {} loaded / {} failed",
            records.len(),
            records.iter().filter(|r| r.is_elite).count(),
            records.iter().filter(|r| r.has_mission).count(),
            report.loaded,
            report.failed
        );
        records
    }
}
