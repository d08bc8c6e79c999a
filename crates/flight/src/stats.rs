//! Ingestion of the static JSON resources the roster is built from.
//!
//! The resources have no enforced schema, so every numeric field is read
//! leniently: numbers and numeric strings are accepted, anything else
//! (null, garbage, NaN) becomes `None` once, here, instead of at every use.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
            _ => None,
        })
        .filter(|v| v.is_finite()))
}

/// Per-ticker performance statistics. Returns are percentages.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TickerStats {
    #[serde(default, deserialize_with = "lenient_number", alias = "return1d", alias = "daily")]
    pub d1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", alias = "return1w", alias = "weekly")]
    pub w1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", alias = "return1m", alias = "monthly")]
    pub m1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", alias = "return1y", alias = "yearly")]
    pub y1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", alias = "price")]
    pub current: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", alias = "high52w", alias = "yearHigh")]
    pub high52: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", alias = "low52w", alias = "yearLow")]
    pub low52: Option<f64>,
}

impl TickerStats {
    /// Position of the current price inside the 52-week range, 0..=100.
    pub fn range_position(&self) -> Option<f64> {
        let (cur, hi, lo) = (self.current?, self.high52?, self.low52?);
        if hi > lo {
            Some(((cur - lo) / (hi - lo) * 100.0).clamp(0.0, 100.0))
        } else {
            None
        }
    }
}

/// Ticker → statistics.
#[derive(Debug, Clone, Default)]
pub struct StatsTable {
    entries: HashMap<String, TickerStats>,
}

impl StatsTable {
    /// Parse a JSON object of ticker records. Malformed entries are skipped.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for (ticker, value) in raw {
            match serde_json::from_value::<TickerStats>(value) {
                Ok(stats) => {
                    entries.insert(ticker.to_uppercase(), stats);
                }
                Err(e) => log::debug!("Skipping stats for {}: {}", ticker, e),
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, ticker: &str) -> Option<&TickerStats> {
        self.entries.get(ticker)
    }

    pub fn insert(&mut self, ticker: &str, stats: TickerStats) {
        self.entries.insert(ticker.to_string(), stats);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `n` tickers with the best one-day return, best first.
    /// Tickers without a finite one-day return are ignored.
    pub fn top_by_daily_return(&self, n: usize) -> Vec<String> {
        let mut ranked: Vec<(&String, f64)> = self
            .entries
            .iter()
            .filter_map(|(t, s)| s.d1.map(|d| (t, d)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.into_iter().take(n).map(|(t, _)| t.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickerStatus {
    #[default]
    Active,
    /// Not yet unlocked; not flown.
    Locked,
    /// Index reference ship.
    Benchmark,
}

impl TickerStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOCKED" => TickerStatus::Locked,
            "BENCHMARK" => TickerStatus::Benchmark,
            _ => TickerStatus::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub ticker: String,
    pub status: TickerStatus,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Plain(String),
    Full {
        #[serde(alias = "symbol")]
        ticker: String,
        #[serde(default)]
        status: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawManifest {
    Tickers {
        tickers: Vec<RawEntry>,
        #[serde(default)]
        benchmarks: Vec<RawEntry>,
    },
    Symbols {
        symbols: Vec<RawEntry>,
        #[serde(default)]
        benchmarks: Vec<RawEntry>,
    },
    List(Vec<RawEntry>),
}

/// Tracked tickers and their status.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Accepts `{"tickers": [...]}`, `{"symbols": [...]}` or a bare array; entries
    /// are either ticker strings or `{"ticker", "status"}` objects. A sibling
    /// `"benchmarks"` list is read as benchmark entries after the main list.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawManifest = serde_json::from_str(json)?;
        let (list, benchmarks) = match raw {
            RawManifest::Tickers { tickers, benchmarks } => (tickers, benchmarks),
            RawManifest::Symbols { symbols, benchmarks } => (symbols, benchmarks),
            RawManifest::List(list) => (list, Vec::new()),
        };
        let tagged = list
            .into_iter()
            .map(|raw| (raw, TickerStatus::Active))
            .chain(benchmarks.into_iter().map(|raw| (raw, TickerStatus::Benchmark)));
        let mut entries: Vec<ManifestEntry> = Vec::new();
        for (raw, plain_status) in tagged {
            let entry = match raw {
                RawEntry::Plain(ticker) => ManifestEntry {
                    ticker: ticker.trim().to_uppercase(),
                    status: plain_status,
                },
                RawEntry::Full { ticker, status } => ManifestEntry {
                    ticker: ticker.trim().to_uppercase(),
                    status: status.as_deref().map(TickerStatus::parse).unwrap_or(plain_status),
                },
            };
            if !entry.ticker.is_empty() && !entries.iter().any(|e| e.ticker == entry.ticker) {
                entries.push(entry);
            }
        }
        Ok(Self { entries })
    }

    /// Entries that should fly (everything not locked).
    pub fn flyable(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(|e| e.status != TickerStatus::Locked)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum SignalState {
    Bull,
    Bear,
    #[default]
    Neutral,
}

impl From<String> for SignalState {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "bull" => SignalState::Bull,
            "bear" => SignalState::Bear,
            _ => SignalState::Neutral,
        }
    }
}

impl SignalState {
    /// Multiplier applied to `fit` from the indicator signal.
    pub fn fit_bias(self) -> f32 {
        match self {
            SignalState::Bull => 1.1,
            SignalState::Bear => 0.9,
            SignalState::Neutral => 1.0,
        }
    }
}

/// Rendering hints computed offline from indicator data.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct VisualParams {
    /// 0.2..1
    pub glow: f32,
    /// 0..0.3
    pub jitter: f32,
    /// 0..1
    pub thrust: f32,
    /// 0..1
    pub damage: f32,
}

impl VisualParams {
    fn sanitized(self) -> Self {
        let clean = |v: f32, hi: f32| if v.is_finite() { v.clamp(0.0, hi) } else { 0.0 };
        Self {
            glow: clean(self.glow, 1.0),
            jitter: clean(self.jitter, 1.0),
            thrust: clean(self.thrust, 1.0),
            damage: clean(self.damage, 1.0),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawTelemetryShip {
    ticker: String,
    #[serde(default, rename = "signalState")]
    signal_state: SignalState,
    #[serde(default)]
    visual: VisualParams,
}

#[derive(Debug, Clone, Deserialize)]
struct RawFleet {
    #[serde(default)]
    ships: Vec<RawTelemetryShip>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetryEntry {
    pub signal: SignalState,
    pub visual: VisualParams,
}

/// Fleet telemetry (`fleet.json`): per-ticker signal state and visual hints.
#[derive(Debug, Clone, Default)]
pub struct FleetTelemetry {
    entries: HashMap<String, TelemetryEntry>,
}

impl FleetTelemetry {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawFleet = serde_json::from_str(json)?;
        let entries = raw
            .ships
            .into_iter()
            .map(|s| {
                (
                    s.ticker.trim().to_uppercase(),
                    TelemetryEntry {
                        signal: s.signal_state,
                        visual: s.visual.sanitized(),
                    },
                )
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn get(&self, ticker: &str) -> Option<&TelemetryEntry> {
        self.entries.get(ticker)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
