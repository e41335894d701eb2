//! xsn-schemas
//!
//! Shared data model for the rebalance pipeline. Plain serde-able structs
//! only — no behavior beyond small constructors/accessors. Every map keyed by
//! symbol is a BTree collection so iteration order is deterministic.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One end-of-period observation for an instrument.
///
/// `close` is the period close price. `shares_outstanding` and `book_equity`
/// are the latest-known fundamentals as of the same period.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub close: f64,
    pub shares_outstanding: f64,
    pub book_equity: f64,
}

impl Observation {
    pub fn new(close: f64, shares_outstanding: f64, book_equity: f64) -> Self {
        Self {
            close,
            shares_outstanding,
            book_equity,
        }
    }
}

/// Immutable per-cycle snapshot of instrument time series.
///
/// Observations are ordered oldest → newest; the last element is the latest.
/// Owned by the data collaborator, read-only to the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentPanel {
    pub asof: NaiveDate,
    pub series: BTreeMap<String, Vec<Observation>>,
}

impl InstrumentPanel {
    pub fn new(asof: NaiveDate) -> Self {
        Self {
            asof,
            series: BTreeMap::new(),
        }
    }

    pub fn insert_series<S: Into<String>>(&mut self, symbol: S, observations: Vec<Observation>) {
        self.series.insert(symbol.into(), observations);
    }

    pub fn series(&self, symbol: &str) -> Option<&[Observation]> {
        self.series.get(symbol).map(|v| v.as_slice())
    }

    /// Latest observation for a symbol, if any history exists.
    pub fn latest(&self, symbol: &str) -> Option<&Observation> {
        self.series.get(symbol).and_then(|v| v.last())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &String> {
        self.series.keys()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// External risk-factor loadings matrix: symbol → one exposure per dimension.
///
/// Opaque to the engine beyond its shape: every row must carry exactly
/// `dimensions` entries (validated where consumed).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskLoadings {
    pub dimensions: usize,
    pub exposures: BTreeMap<String, Vec<f64>>,
}

impl RiskLoadings {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            exposures: BTreeMap::new(),
        }
    }

    pub fn insert<S: Into<String>>(&mut self, symbol: S, row: Vec<f64>) {
        self.exposures.insert(symbol.into(), row);
    }

    pub fn row(&self, symbol: &str) -> Option<&[f64]> {
        self.exposures.get(symbol).map(|v| v.as_slice())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.exposures.contains_key(symbol)
    }
}

/// Canonical weight map type (symbol → signed fraction of portfolio).
pub type WeightMap = BTreeMap<String, f64>;

/// Helper to build a WeightMap with minimal boilerplate.
pub fn weights<I, S>(items: I) -> WeightMap
where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
{
    let mut m = WeightMap::new();
    for (sym, w) in items {
        m.insert(sym.into(), w);
    }
    m
}

/// How a rebalance cycle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleOutcome {
    /// Target weights were computed and submitted to the execution sink.
    Submitted,
    /// Degenerate-but-non-fatal cycle: empty basket or empty signal
    /// intersection. Nothing was submitted; previous weights stay in effect.
    NoOp,
}

/// Summary of one completed rebalance cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub asof: NaiveDate,
    /// Content hash of the engine configuration that produced these weights.
    pub config_hash: String,
    pub universe_size: usize,
    pub long_count: usize,
    pub short_count: usize,
    pub position_count: usize,
    pub gross_weight: f64,
    pub net_weight: f64,
    /// One-way turnover vs the externally supplied current holdings.
    pub turnover_one_way: f64,
    pub outcome: CycleOutcome,
}
