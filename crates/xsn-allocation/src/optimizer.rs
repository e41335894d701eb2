//! Allocation optimizer: lowers a constraint set onto the LP interface.
//!
//! Each instrument's signed weight is split into non-negative long/short
//! parts (w = p − n) so gross exposure stays linear: gross = Σ(p + n). The
//! objective maximizes Σ w_i · score_i.
//!
//! Infeasibility is surfaced explicitly, in three forms:
//! - structural pre-checks that cannot be satisfied by any portfolio
//!   (zero gross cap, zero position bound against a neutral book),
//! - solver-reported infeasibility,
//! - a degenerate all-zero solution despite a real score spread (over-tight
//!   risk bands leave only the zero portfolio).
//! Solver iteration caps and unbounded programs surface as `Numerical`,
//! distinct from infeasibility.

use std::collections::BTreeMap;

use xsn_schemas::{RiskLoadings, WeightMap};

use crate::constraints::{Constraint, ConstraintSet};
use crate::solver::{solve, LinearConstraint, LinearProgram, Relation, SolveOutcome};

/// Weights below this magnitude are snapped to exactly zero.
const SNAP_EPS: f64 = 1e-10;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced during allocation.
#[derive(Clone, Debug, PartialEq)]
pub enum AllocationError {
    /// A combined score is NaN or infinite.
    InvalidScore { symbol: String },
    /// A basket instrument has no loadings row.
    MissingLoadings { symbol: String },
    /// A loadings row does not match the declared dimension count.
    LoadingDimensionMismatch {
        symbol: String,
        expected: usize,
        got: usize,
    },
    /// A loadings entry is NaN or infinite.
    InvalidLoading { symbol: String },
    /// A constraint is structurally invalid (negative limit, NaN, unknown
    /// risk dimension). Fatal at configuration time.
    MalformedConstraint { detail: String },
    /// The constraint set admits no usable portfolio.
    Infeasible { detail: String },
    /// The solver failed numerically (iteration cap, unbounded program).
    Numerical { detail: String },
}

impl std::fmt::Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidScore { symbol } => {
                write!(f, "invalid (NaN/inf) combined score for '{symbol}'")
            }
            Self::MissingLoadings { symbol } => {
                write!(f, "no risk loadings for basket instrument '{symbol}'")
            }
            Self::LoadingDimensionMismatch {
                symbol,
                expected,
                got,
            } => {
                write!(
                    f,
                    "loadings row for '{symbol}' has {got} dimensions, expected {expected}"
                )
            }
            Self::InvalidLoading { symbol } => {
                write!(f, "invalid (NaN/inf) risk loading for '{symbol}'")
            }
            Self::MalformedConstraint { detail } => write!(f, "malformed constraint: {detail}"),
            Self::Infeasible { detail } => write!(f, "infeasible constraint set: {detail}"),
            Self::Numerical { detail } => write!(f, "numerical failure: {detail}"),
        }
    }
}

impl std::error::Error for AllocationError {}

// ---------------------------------------------------------------------------
// Optimizer
// ---------------------------------------------------------------------------

/// Solve for target weights over the basket.
///
/// `scores` must be restricted to the basket (longs ∪ shorts); every basket
/// instrument receives a weight in the output (zero is a valid, distinct-
/// from-absent value). An empty basket yields an empty map.
pub fn optimize(
    scores: &BTreeMap<String, f64>,
    loadings: &RiskLoadings,
    set: &ConstraintSet,
) -> Result<WeightMap, AllocationError> {
    if scores.is_empty() {
        return Ok(WeightMap::new());
    }

    validate_inputs(scores, loadings)?;
    validate_constraints(scores, loadings, set)?;

    let symbols: Vec<&String> = scores.keys().collect();
    let k = symbols.len();

    // Variables: longs p_0..p_{k-1} then shorts n_0..n_{k-1}; w_i = p_i - n_i.
    let mut objective = vec![0.0; 2 * k];
    for (i, sym) in symbols.iter().enumerate() {
        objective[i] = scores[*sym];
        objective[k + i] = -scores[*sym];
    }

    let mut lp_rows: Vec<LinearConstraint> = Vec::new();
    for constraint in set.iter() {
        match constraint {
            Constraint::GrossExposureCap { limit } => {
                lp_rows.push(LinearConstraint {
                    coefficients: vec![1.0; 2 * k],
                    relation: Relation::LessEq,
                    rhs: *limit,
                });
            }
            Constraint::DollarNeutral => {
                let mut coefficients = vec![1.0; 2 * k];
                for c in coefficients.iter_mut().skip(k) {
                    *c = -1.0;
                }
                lp_rows.push(LinearConstraint {
                    coefficients,
                    relation: Relation::Eq,
                    rhs: 0.0,
                });
            }
            Constraint::RiskExposureBand { dimension, band } => {
                let mut coefficients = vec![0.0; 2 * k];
                for (i, sym) in symbols.iter().enumerate() {
                    // Rows validated in validate_inputs.
                    let loading = loadings.row(sym).map_or(0.0, |row| row[*dimension]);
                    coefficients[i] = loading;
                    coefficients[k + i] = -loading;
                }
                let negated: Vec<f64> = coefficients.iter().map(|v| -v).collect();
                lp_rows.push(LinearConstraint {
                    coefficients,
                    relation: Relation::LessEq,
                    rhs: *band,
                });
                lp_rows.push(LinearConstraint {
                    coefficients: negated,
                    relation: Relation::LessEq,
                    rhs: *band,
                });
            }
            Constraint::PositionBounds {
                short_max,
                long_max,
            } => {
                for i in 0..k {
                    let mut long_row = vec![0.0; 2 * k];
                    long_row[i] = 1.0;
                    lp_rows.push(LinearConstraint {
                        coefficients: long_row,
                        relation: Relation::LessEq,
                        rhs: *long_max,
                    });
                    let mut short_row = vec![0.0; 2 * k];
                    short_row[k + i] = 1.0;
                    lp_rows.push(LinearConstraint {
                        coefficients: short_row,
                        relation: Relation::LessEq,
                        rhs: *short_max,
                    });
                }
            }
        }
    }

    let lp = LinearProgram {
        maximize: objective,
        constraints: lp_rows,
    };

    let variables = match solve(&lp) {
        SolveOutcome::Optimal { variables, .. } => variables,
        SolveOutcome::Infeasible => {
            return Err(AllocationError::Infeasible {
                detail: "no portfolio satisfies every constraint simultaneously".to_string(),
            })
        }
        SolveOutcome::Unbounded => {
            return Err(AllocationError::Numerical {
                detail: "objective unbounded under the supplied constraints".to_string(),
            })
        }
        SolveOutcome::IterationLimit => {
            return Err(AllocationError::Numerical {
                detail: "solver hit its iteration cap before converging".to_string(),
            })
        }
        SolveOutcome::MalformedProgram => {
            return Err(AllocationError::Numerical {
                detail: "solver rejected the lowered program".to_string(),
            })
        }
    };

    let mut weights = WeightMap::new();
    for (i, sym) in symbols.iter().enumerate() {
        let w = variables[i] - variables[k + i];
        let w = if w.abs() < SNAP_EPS { 0.0 } else { w };
        weights.insert((*sym).clone(), w);
    }

    // A zero book despite a real score spread means the constraints admit
    // only the zero portfolio (e.g. over-tight risk bands). Surface it
    // instead of returning degenerate weights.
    let spread = score_spread(scores);
    if spread > SNAP_EPS && weights.values().all(|w| *w == 0.0) {
        return Err(AllocationError::Infeasible {
            detail: "only the zero portfolio satisfies the constraint set".to_string(),
        });
    }

    Ok(weights)
}

fn score_spread(scores: &BTreeMap<String, f64>) -> f64 {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in scores.values() {
        min = min.min(*v);
        max = max.max(*v);
    }
    max - min
}

fn validate_inputs(
    scores: &BTreeMap<String, f64>,
    loadings: &RiskLoadings,
) -> Result<(), AllocationError> {
    for (sym, score) in scores {
        if !score.is_finite() {
            return Err(AllocationError::InvalidScore {
                symbol: sym.clone(),
            });
        }
        let row = loadings
            .row(sym)
            .ok_or_else(|| AllocationError::MissingLoadings {
                symbol: sym.clone(),
            })?;
        if row.len() != loadings.dimensions {
            return Err(AllocationError::LoadingDimensionMismatch {
                symbol: sym.clone(),
                expected: loadings.dimensions,
                got: row.len(),
            });
        }
        if !row.iter().all(|v| v.is_finite()) {
            return Err(AllocationError::InvalidLoading {
                symbol: sym.clone(),
            });
        }
    }
    Ok(())
}

fn validate_constraints(
    scores: &BTreeMap<String, f64>,
    loadings: &RiskLoadings,
    set: &ConstraintSet,
) -> Result<(), AllocationError> {
    let neutral = set.iter().any(|c| matches!(c, Constraint::DollarNeutral));

    for constraint in set.iter() {
        match constraint {
            Constraint::GrossExposureCap { limit } => {
                if !limit.is_finite() || *limit < 0.0 {
                    return Err(AllocationError::MalformedConstraint {
                        detail: format!("gross exposure cap {limit} must be finite and >= 0"),
                    });
                }
                if *limit == 0.0 {
                    return Err(AllocationError::Infeasible {
                        detail: "gross exposure cap of zero forbids any position".to_string(),
                    });
                }
            }
            Constraint::DollarNeutral => {}
            Constraint::RiskExposureBand { dimension, band } => {
                if !band.is_finite() || *band < 0.0 {
                    return Err(AllocationError::MalformedConstraint {
                        detail: format!("risk band {band} must be finite and >= 0"),
                    });
                }
                if *dimension >= loadings.dimensions {
                    return Err(AllocationError::MalformedConstraint {
                        detail: format!(
                            "risk dimension {dimension} out of range (loadings carry {})",
                            loadings.dimensions
                        ),
                    });
                }
            }
            Constraint::PositionBounds {
                short_max,
                long_max,
            } => {
                if !short_max.is_finite()
                    || !long_max.is_finite()
                    || *short_max < 0.0
                    || *long_max < 0.0
                {
                    return Err(AllocationError::MalformedConstraint {
                        detail: format!(
                            "position bounds [-{short_max}, {long_max}] must be finite and >= 0"
                        ),
                    });
                }
                // A dollar-neutral book with one side pinned to zero can only
                // be the zero portfolio.
                if neutral && !scores.is_empty() && (*short_max == 0.0 || *long_max == 0.0) {
                    return Err(AllocationError::Infeasible {
                        detail: format!(
                            "position bound of zero ({}) contradicts dollar neutrality",
                            if *short_max == 0.0 { "short" } else { "long" }
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}
