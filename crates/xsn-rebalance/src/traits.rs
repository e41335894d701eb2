//! Collaborator contracts. The engine owns no IO: data, execution and
//! observability live behind these traits, supplied by the embedding system.

use chrono::NaiveDate;

use xsn_factors::Field;
use xsn_schemas::{InstrumentPanel, RiskLoadings, WeightMap};

/// A panel or loadings fetch failed, or returned insufficient history.
/// Aborts the current cycle; previous weights remain in effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataUnavailable {
    pub detail: String,
}

impl DataUnavailable {
    pub fn new<S: Into<String>>(detail: S) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for DataUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "data unavailable: {}", self.detail)
    }
}

impl std::error::Error for DataUnavailable {}

/// The execution system rejected a weight submission. Surfaced as a
/// cycle-level failure; the engine does not retry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitRejected {
    pub reason: String,
}

impl std::fmt::Display for SubmitRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "submission rejected: {}", self.reason)
    }
}

impl std::error::Error for SubmitRejected {}

/// Synchronous market/fundamental data provider. Each call returns a fresh
/// immutable snapshot; the engine never mutates or caches beyond one cycle.
pub trait DataProvider {
    fn fetch_panel(
        &self,
        asof: NaiveDate,
        fields: &[Field],
        window: usize,
    ) -> Result<InstrumentPanel, DataUnavailable>;

    fn fetch_risk_loadings(&self, asof: NaiveDate) -> Result<RiskLoadings, DataUnavailable>;

    /// Opaque current-holdings snapshot; consumed only for the turnover
    /// metric, never fed back into weight computation.
    fn fetch_holdings(&self, asof: NaiveDate) -> Result<WeightMap, DataUnavailable>;
}

/// Target-weight hand-off to the external order system.
pub trait ExecutionSink {
    fn submit_target_weights(&mut self, weights: &WeightMap) -> Result<(), SubmitRejected>;
}

/// Fire-and-forget observability sink; no return contract is relied upon.
pub trait MetricsSink {
    fn record(&mut self, name: &str, value: f64);
}
