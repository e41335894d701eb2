//! xsn-testkit
//!
//! Deterministic fixtures and fake collaborators for scenario tests.
//! Cross-crate scenarios that need the whole stack live in this crate's
//! tests/ directory; the library itself ships panel builders, file loaders
//! and recording collaborator implementations.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::fs;

use xsn_factors::Field;
use xsn_rebalance::{
    DataProvider, DataUnavailable, ExecutionSink, MetricsSink, SubmitRejected,
};
use xsn_schemas::{InstrumentPanel, Observation, RiskLoadings, WeightMap};

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

/// Builder for synthetic panels with minimal boilerplate.
pub struct PanelBuilder {
    panel: InstrumentPanel,
}

impl PanelBuilder {
    pub fn new(asof: NaiveDate) -> Self {
        Self {
            panel: InstrumentPanel::new(asof),
        }
    }

    pub fn series<S: Into<String>>(mut self, symbol: S, observations: Vec<Observation>) -> Self {
        self.panel.insert_series(symbol, observations);
        self
    }

    /// Linear close walk with constant fundamentals.
    pub fn linear_series<S: Into<String>>(
        self,
        symbol: S,
        start_close: f64,
        step: f64,
        len: usize,
        shares_outstanding: f64,
        book_equity: f64,
    ) -> Self {
        let observations = (0..len)
            .map(|i| {
                Observation::new(
                    start_close + step * i as f64,
                    shares_outstanding,
                    book_equity,
                )
            })
            .collect();
        self.series(symbol, observations)
    }

    pub fn build(self) -> InstrumentPanel {
        self.panel
    }
}

/// Loadings matrix with every row equal to `value` across `dims` dimensions.
pub fn uniform_loadings<S: AsRef<str>>(symbols: &[S], dims: usize, value: f64) -> RiskLoadings {
    let mut loadings = RiskLoadings::new(dims);
    for sym in symbols {
        loadings.insert(sym.as_ref(), vec![value; dims]);
    }
    loadings
}

// ---------------------------------------------------------------------------
// File loaders
// ---------------------------------------------------------------------------

/// Load a panel from CSV rows `symbol,close,shares_outstanding,book_equity`
/// (header row required). Rows append per symbol in file order,
/// oldest first.
pub fn load_panel_csv(path: &str, asof: NaiveDate) -> Result<InstrumentPanel> {
    let mut rdr = csv::Reader::from_path(path).with_context(|| format!("open panel csv: {path}"))?;
    let mut panel = InstrumentPanel::new(asof);

    for rec in rdr.records() {
        let rec = rec?;
        let symbol = rec[0].to_string();
        let close: f64 = rec[1].parse().context("parse close")?;
        let shares: f64 = rec[2].parse().context("parse shares_outstanding")?;
        let book: f64 = rec[3].parse().context("parse book_equity")?;
        if !(close.is_finite() && shares.is_finite() && book.is_finite()) {
            bail!("non-finite observation for '{symbol}'");
        }
        panel
            .series
            .entry(symbol)
            .or_default()
            .push(Observation::new(close, shares, book));
    }

    if panel.is_empty() {
        bail!("panel csv contained no rows: {path}");
    }
    Ok(panel)
}

/// Load a current-holdings weight map from JSON (`{"SYM": weight, ...}`).
pub fn load_holdings_json(path: &str) -> Result<WeightMap> {
    let s = fs::read_to_string(path).with_context(|| format!("read holdings: {path}"))?;
    let holdings: WeightMap = serde_json::from_str(&s).context("parse holdings json")?;
    Ok(holdings)
}

// ---------------------------------------------------------------------------
// Fake collaborators
// ---------------------------------------------------------------------------

/// Data provider serving one fixed snapshot for every as-of date.
pub struct StaticDataProvider {
    pub panel: InstrumentPanel,
    pub loadings: RiskLoadings,
    pub holdings: WeightMap,
}

impl DataProvider for StaticDataProvider {
    fn fetch_panel(
        &self,
        _asof: NaiveDate,
        _fields: &[Field],
        _window: usize,
    ) -> Result<InstrumentPanel, DataUnavailable> {
        Ok(self.panel.clone())
    }

    fn fetch_risk_loadings(&self, _asof: NaiveDate) -> Result<RiskLoadings, DataUnavailable> {
        Ok(self.loadings.clone())
    }

    fn fetch_holdings(&self, _asof: NaiveDate) -> Result<WeightMap, DataUnavailable> {
        Ok(self.holdings.clone())
    }
}

/// Data provider whose every fetch fails, for abort-path scenarios.
pub struct UnavailableDataProvider;

impl DataProvider for UnavailableDataProvider {
    fn fetch_panel(
        &self,
        asof: NaiveDate,
        _fields: &[Field],
        _window: usize,
    ) -> Result<InstrumentPanel, DataUnavailable> {
        Err(DataUnavailable::new(format!("no panel for {asof}")))
    }

    fn fetch_risk_loadings(&self, asof: NaiveDate) -> Result<RiskLoadings, DataUnavailable> {
        Err(DataUnavailable::new(format!("no loadings for {asof}")))
    }

    fn fetch_holdings(&self, asof: NaiveDate) -> Result<WeightMap, DataUnavailable> {
        Err(DataUnavailable::new(format!("no holdings for {asof}")))
    }
}

/// Execution sink that records every submission; optionally rejects.
#[derive(Default)]
pub struct RecordingExecutionSink {
    pub submissions: Vec<WeightMap>,
    pub reject_with: Option<String>,
}

impl ExecutionSink for RecordingExecutionSink {
    fn submit_target_weights(&mut self, weights: &WeightMap) -> Result<(), SubmitRejected> {
        if let Some(reason) = &self.reject_with {
            return Err(SubmitRejected {
                reason: reason.clone(),
            });
        }
        self.submissions.push(weights.clone());
        Ok(())
    }
}

/// Metrics sink that records every emission in order.
#[derive(Default)]
pub struct RecordingMetricsSink {
    pub records: Vec<(String, f64)>,
}

impl MetricsSink for RecordingMetricsSink {
    fn record(&mut self, name: &str, value: f64) {
        self.records.push((name.to_string(), value));
    }
}

impl RecordingMetricsSink {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.records
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}
