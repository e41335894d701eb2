use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use xsn_allocation::{
    check_weights, gross_weight, net_weight, one_way_turnover, optimize, AllocationError,
    Constraint, ConstraintSet,
};
use xsn_config::EngineConfig;
use xsn_factors::{
    canonical_registry, evaluate_all, FactorError, FactorParams, Field, MARKET_CAP,
};
use xsn_schemas::{CycleOutcome, CycleReport, InstrumentPanel, RiskLoadings, WeightMap};
use xsn_signal::{combine, rank, Direction, SignalError, TiePolicy};
use xsn_universe::{select_basket, select_universe, BucketPredicate, UniverseError};

use crate::traits::{DataProvider, ExecutionSink, MetricsSink};

/// Tolerance used by the post-solve compliance gate.
const VERIFY_TOL: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Cycle-level failures. The engine performs no retries internally; callers
/// decide between retry-with-relaxed-constraints, skip-cycle and fail-loud.
#[derive(Clone, Debug, PartialEq)]
pub enum CycleError {
    /// Configuration failed validation or hashing at construction time.
    MalformedConfig { detail: String },
    /// A configured signal factor is not in the registry.
    UnknownFactor { name: String },
    /// Panel/loadings/holdings fetch failed; the cycle aborts cleanly.
    DataUnavailable { detail: String },
    /// `rebalance` was invoked without a pre-open snapshot.
    NotRefreshed,
    /// Forwarded from the factor library.
    Factor(FactorError),
    /// Forwarded from the signal combiner.
    Signal(SignalError),
    /// Forwarded from basket selection.
    Universe(UniverseError),
    /// Forwarded from the optimizer; `AllocationError::Infeasible` stays
    /// distinguishable from numerical failures for caller policy.
    Allocation(AllocationError),
    /// The solved weights failed the post-solve compliance gate.
    VerificationFailed { violations: Vec<String> },
    /// The execution system rejected the submission.
    SubmitRejected { reason: String },
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedConfig { detail } => write!(f, "malformed config: {detail}"),
            Self::UnknownFactor { name } => {
                write!(f, "signal factor '{name}' not present in the registry")
            }
            Self::DataUnavailable { detail } => write!(f, "data unavailable: {detail}"),
            Self::NotRefreshed => write!(f, "rebalance invoked without a pre-open snapshot"),
            Self::Factor(e) => write!(f, "factor evaluation: {e}"),
            Self::Signal(e) => write!(f, "signal combination: {e}"),
            Self::Universe(e) => write!(f, "basket selection: {e}"),
            Self::Allocation(e) => write!(f, "allocation: {e}"),
            Self::VerificationFailed { violations } => {
                write!(f, "solved weights failed verification: {}", violations.join("; "))
            }
            Self::SubmitRejected { reason } => write!(f, "submission rejected: {reason}"),
        }
    }
}

impl std::error::Error for CycleError {}

impl From<FactorError> for CycleError {
    fn from(e: FactorError) -> Self {
        Self::Factor(e)
    }
}

impl From<SignalError> for CycleError {
    fn from(e: SignalError) -> Self {
        Self::Signal(e)
    }
}

impl From<UniverseError> for CycleError {
    fn from(e: UniverseError) -> Self {
        Self::Universe(e)
    }
}

impl From<AllocationError> for CycleError {
    fn from(e: AllocationError) -> Self {
        Self::Allocation(e)
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Per-cycle snapshot cached between the pre-open refresh and the rebalance.
struct CycleSnapshot {
    asof: NaiveDate,
    panel: InstrumentPanel,
    loadings: RiskLoadings,
    holdings: WeightMap,
}

/// Sequences one rebalance cycle end to end.
///
/// Exactly one entry point per external trigger: `pre_open_refresh`,
/// `rebalance`, `end_of_day_record`. No state survives a completed cycle
/// beyond the last report kept for end-of-day metrics.
pub struct RebalanceOrchestrator<D, E, M> {
    config: EngineConfig,
    config_hash: String,
    data: D,
    execution: E,
    metrics: M,
    snapshot: Option<CycleSnapshot>,
    last_report: Option<CycleReport>,
}

impl<D, E, M> RebalanceOrchestrator<D, E, M>
where
    D: DataProvider,
    E: ExecutionSink,
    M: MetricsSink,
{
    pub fn new(config: EngineConfig, data: D, execution: E, metrics: M) -> Result<Self, CycleError> {
        config
            .validate()
            .map_err(|e| CycleError::MalformedConfig {
                detail: format!("{e:#}"),
            })?;
        let config_hash =
            xsn_config::config_hash(&config).map_err(|e| CycleError::MalformedConfig {
                detail: format!("{e:#}"),
            })?;
        Ok(Self {
            config,
            config_hash,
            data,
            execution,
            metrics,
            snapshot: None,
            last_report: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn execution(&self) -> &E {
        &self.execution
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Trigger 1: fetch and cache the cycle's immutable data snapshot.
    pub fn pre_open_refresh(&mut self, asof: NaiveDate) -> Result<(), CycleError> {
        let registry = canonical_registry(&self.factor_params());
        let window = registry.iter().map(|d| d.window).max().unwrap_or(1);
        let mut fields: Vec<Field> = Vec::new();
        for def in &registry {
            for field in def.fields {
                if !fields.contains(field) {
                    fields.push(*field);
                }
            }
        }

        let panel = self
            .data
            .fetch_panel(asof, &fields, window)
            .map_err(|e| CycleError::DataUnavailable { detail: e.detail })?;
        let loadings = self
            .data
            .fetch_risk_loadings(asof)
            .map_err(|e| CycleError::DataUnavailable { detail: e.detail })?;
        let holdings = self
            .data
            .fetch_holdings(asof)
            .map_err(|e| CycleError::DataUnavailable { detail: e.detail })?;

        info!(
            %asof,
            instruments = panel.len(),
            risk_dimensions = loadings.dimensions,
            "pre-open snapshot cached"
        );
        self.snapshot = Some(CycleSnapshot {
            asof,
            panel,
            loadings,
            holdings,
        });
        Ok(())
    }

    /// Trigger 2: run the full pipeline and emit target weights.
    ///
    /// The snapshot is consumed whether the cycle completes or aborts; a new
    /// pre-open refresh starts the next cycle from fresh data.
    pub fn rebalance(&mut self) -> Result<CycleReport, CycleError> {
        let snapshot = self.snapshot.take().ok_or(CycleError::NotRefreshed)?;
        let cycle_id = Uuid::new_v4();

        let registry = canonical_registry(&self.factor_params());
        let factor_values = evaluate_all(&registry, &snapshot.panel)?;

        // Tradability: a finite positive latest close and a loadings row.
        // Any richer notion of tradability belongs to the data provider.
        let tradable: BTreeSet<String> = snapshot
            .panel
            .series
            .iter()
            .filter(|(sym, series)| {
                series
                    .last()
                    .map(|o| o.close.is_finite() && o.close > 0.0)
                    .unwrap_or(false)
                    && snapshot.loadings.contains(sym)
            })
            .map(|(sym, _)| sym.clone())
            .collect();

        let cap_values = factor_values
            .get(MARKET_CAP)
            .ok_or_else(|| CycleError::UnknownFactor {
                name: MARKET_CAP.to_string(),
            })?;
        let cap_rank = rank(cap_values, &tradable, Direction::Ascending, TiePolicy::AverageRank);

        let bucket = BucketPredicate::new(
            self.config.cap_bucket_lower,
            self.config.cap_bucket_upper,
        );
        let universe = select_universe(&tradable, &cap_rank, &bucket);

        let mut ranked = Vec::with_capacity(self.config.signal_factors.len());
        for name in &self.config.signal_factors {
            let values = factor_values
                .get(name)
                .ok_or_else(|| CycleError::UnknownFactor { name: name.clone() })?;
            ranked.push(rank(
                values,
                &tradable,
                Direction::Ascending,
                TiePolicy::AverageRank,
            ));
        }
        let combined = combine(&ranked, self.config.factor_weights.as_deref())?;

        if combined.is_empty() {
            warn!(cycle_id = %cycle_id, "empty signal intersection; cycle is a no-op");
            return Ok(self.finish_noop(cycle_id, &snapshot, universe.len()));
        }

        let basket = select_basket(&universe, &combined, self.config.basket_size)?;
        if basket.is_empty() {
            warn!(
                cycle_id = %cycle_id,
                universe = universe.len(),
                "basket is empty after selection; cycle is a no-op"
            );
            return Ok(self.finish_noop(cycle_id, &snapshot, universe.len()));
        }

        let basket_scores: BTreeMap<String, f64> = basket
            .members()
            .into_iter()
            .map(|sym| {
                let score = combined[&sym];
                (sym, score)
            })
            .collect();

        let set = self.constraint_set(snapshot.loadings.dimensions)?;
        let weights = optimize(&basket_scores, &snapshot.loadings, &set)?;

        let violations = check_weights(&weights, &snapshot.loadings, &set, VERIFY_TOL);
        if !violations.is_empty() {
            return Err(CycleError::VerificationFailed {
                violations: violations.iter().map(|v| v.to_string()).collect(),
            });
        }

        let turnover = one_way_turnover(&snapshot.holdings, &weights);
        self.execution
            .submit_target_weights(&weights)
            .map_err(|e| CycleError::SubmitRejected { reason: e.reason })?;

        let report = CycleReport {
            cycle_id,
            asof: snapshot.asof,
            config_hash: self.config_hash.clone(),
            universe_size: universe.len(),
            long_count: basket.longs.len(),
            short_count: basket.shorts.len(),
            position_count: weights.len(),
            gross_weight: gross_weight(&weights),
            net_weight: net_weight(&weights),
            turnover_one_way: turnover,
            outcome: CycleOutcome::Submitted,
        };
        info!(
            cycle_id = %cycle_id,
            asof = %report.asof,
            universe = report.universe_size,
            longs = report.long_count,
            shorts = report.short_count,
            gross = report.gross_weight,
            turnover = report.turnover_one_way,
            "rebalance cycle submitted"
        );
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Trigger 3: emit observability metrics for the last completed cycle.
    /// Pure side effect; nothing feeds back into engine state.
    pub fn end_of_day_record(&mut self) {
        match &self.last_report {
            Some(report) => {
                self.metrics
                    .record("position_count", report.position_count as f64);
                self.metrics.record("gross_weight", report.gross_weight);
                self.metrics.record("net_weight", report.net_weight);
                self.metrics
                    .record("turnover_one_way", report.turnover_one_way);
                self.metrics
                    .record("universe_size", report.universe_size as f64);
            }
            None => warn!("end-of-day record with no completed cycle"),
        }
    }

    fn factor_params(&self) -> FactorParams {
        FactorParams {
            momentum_window: self.config.momentum_window,
        }
    }

    fn constraint_set(&self, risk_dimensions: usize) -> Result<ConstraintSet, CycleError> {
        let band = self
            .config
            .band_width()
            .map_err(|e| CycleError::MalformedConfig {
                detail: format!("{e:#}"),
            })?;
        let bound = self.config.resolved_position_bound();

        let mut constraints = vec![
            Constraint::GrossExposureCap {
                limit: self.config.gross_cap,
            },
            Constraint::DollarNeutral,
        ];
        for dimension in 0..risk_dimensions {
            constraints.push(Constraint::RiskExposureBand { dimension, band });
        }
        constraints.push(Constraint::PositionBounds {
            short_max: bound,
            long_max: bound,
        });
        Ok(ConstraintSet::new(constraints))
    }

    fn finish_noop(
        &mut self,
        cycle_id: Uuid,
        snapshot: &CycleSnapshot,
        universe_size: usize,
    ) -> CycleReport {
        let report = CycleReport {
            cycle_id,
            asof: snapshot.asof,
            config_hash: self.config_hash.clone(),
            universe_size,
            long_count: 0,
            short_count: 0,
            position_count: 0,
            gross_weight: 0.0,
            net_weight: 0.0,
            // Nothing submitted: previous holdings stay, no turnover.
            turnover_one_way: 0.0,
            outcome: CycleOutcome::NoOp,
        };
        self.last_report = Some(report.clone());
        report
    }
}
