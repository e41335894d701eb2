//! Declarative constraint set plus after-the-fact verification.
//!
//! The `Constraint` variants are plain data: the optimizer lowers them into
//! LP rows, and `check_weights` re-checks a solved weight map against the
//! same set within tolerance. The check is a compliance gate separate from
//! the solver; a violation on a solve reported optimal indicates a numerical
//! problem, not a policy decision.

use std::collections::BTreeSet;

use xsn_schemas::{RiskLoadings, WeightMap};

// ---------------------------------------------------------------------------
// Constraint / ConstraintSet
// ---------------------------------------------------------------------------

/// One declarative allocation constraint.
#[derive(Clone, Debug, PartialEq)]
pub enum Constraint {
    /// Σ |w_i| ≤ limit.
    GrossExposureCap { limit: f64 },
    /// Σ w_i = 0, exact (within solver tolerance).
    DollarNeutral,
    /// |Σ w_i · loading_i[dimension]| ≤ band.
    RiskExposureBand { dimension: usize, band: f64 },
    /// Per-instrument box: -short_max ≤ w_i ≤ long_max.
    PositionBounds { short_max: f64, long_max: f64 },
}

/// An ordered collection of constraints. Constraints are independent of each
/// other's satisfiability; the set as a whole may be infeasible.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self { constraints }
    }

    /// The reference configuration: gross ≤ `gross_cap`, dollar-neutral,
    /// one symmetric band per risk dimension, box = 1 / `position_count`
    /// per instrument.
    pub fn reference(position_count: usize, gross_cap: f64, bands: &[f64]) -> Self {
        let box_bound = if position_count == 0 {
            0.0
        } else {
            1.0 / position_count as f64
        };
        let mut constraints = vec![
            Constraint::GrossExposureCap { limit: gross_cap },
            Constraint::DollarNeutral,
        ];
        for (dimension, band) in bands.iter().enumerate() {
            constraints.push(Constraint::RiskExposureBand {
                dimension,
                band: *band,
            });
        }
        constraints.push(Constraint::PositionBounds {
            short_max: box_bound,
            long_max: box_bound,
        });
        Self { constraints }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Weight metrics
// ---------------------------------------------------------------------------

/// Σ |w_i|.
pub fn gross_weight(weights: &WeightMap) -> f64 {
    weights.values().map(|w| w.abs()).sum()
}

/// Σ w_i.
pub fn net_weight(weights: &WeightMap) -> f64 {
    weights.values().sum()
}

/// One-way turnover between two weight maps: ½ Σ |target_i − current_i| over
/// the union of keys (absent = flat).
pub fn one_way_turnover(current: &WeightMap, target: &WeightMap) -> f64 {
    let symbols: BTreeSet<&String> = current.keys().chain(target.keys()).collect();
    let two_way: f64 = symbols
        .into_iter()
        .map(|sym| {
            let cur = current.get(sym).copied().unwrap_or(0.0);
            let tgt = target.get(sym).copied().unwrap_or(0.0);
            (tgt - cur).abs()
        })
        .sum();
    two_way / 2.0
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// A single constraint breach detected during post-solve verification.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintViolation {
    GrossExceeded {
        actual: f64,
        limit: f64,
    },
    NotDollarNeutral {
        net: f64,
    },
    RiskBandExceeded {
        dimension: usize,
        actual: f64,
        band: f64,
    },
    PositionOutOfBounds {
        symbol: String,
        weight: f64,
        lower: f64,
        upper: f64,
    },
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GrossExceeded { actual, limit } => {
                write!(f, "gross weight {actual:.6} exceeds cap {limit:.6}")
            }
            Self::NotDollarNeutral { net } => {
                write!(f, "net weight {net:.6} violates dollar neutrality")
            }
            Self::RiskBandExceeded {
                dimension,
                actual,
                band,
            } => {
                write!(
                    f,
                    "risk dimension {dimension} exposure {actual:.6} outside band ±{band:.6}"
                )
            }
            Self::PositionOutOfBounds {
                symbol,
                weight,
                lower,
                upper,
            } => {
                write!(
                    f,
                    "weight {weight:.6} for '{symbol}' outside [{lower:.6}, {upper:.6}]"
                )
            }
        }
    }
}

/// Re-check solved weights against a constraint set within `tol`.
///
/// Loadings rows are assumed validated by the optimizer; an absent row
/// contributes zero exposure here.
pub fn check_weights(
    weights: &WeightMap,
    loadings: &RiskLoadings,
    set: &ConstraintSet,
    tol: f64,
) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();

    for constraint in set.iter() {
        match constraint {
            Constraint::GrossExposureCap { limit } => {
                let gross = gross_weight(weights);
                if gross > limit + tol {
                    violations.push(ConstraintViolation::GrossExceeded {
                        actual: gross,
                        limit: *limit,
                    });
                }
            }
            Constraint::DollarNeutral => {
                let net = net_weight(weights);
                if net.abs() > tol {
                    violations.push(ConstraintViolation::NotDollarNeutral { net });
                }
            }
            Constraint::RiskExposureBand { dimension, band } => {
                let exposure: f64 = weights
                    .iter()
                    .map(|(sym, w)| {
                        let loading = loadings
                            .row(sym)
                            .and_then(|row| row.get(*dimension))
                            .copied()
                            .unwrap_or(0.0);
                        w * loading
                    })
                    .sum();
                if exposure.abs() > band + tol {
                    violations.push(ConstraintViolation::RiskBandExceeded {
                        dimension: *dimension,
                        actual: exposure,
                        band: *band,
                    });
                }
            }
            Constraint::PositionBounds {
                short_max,
                long_max,
            } => {
                for (sym, w) in weights {
                    if *w > long_max + tol || *w < -short_max - tol {
                        violations.push(ConstraintViolation::PositionOutOfBounds {
                            symbol: sym.clone(),
                            weight: *w,
                            lower: -short_max,
                            upper: *long_max,
                        });
                    }
                }
            }
        }
    }

    violations
}
