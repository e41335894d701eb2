//! xsn-signal
//!
//! Cross-sectional ranking and signal combination.
//! - Rank-normalized scores in [0, 1] over an eligibility mask
//! - Average-rank tie handling, symbol as the stable secondary key
//! - Inner-join weighted sum across factors
//! - Deterministic: identical inputs always produce identical outputs,
//!   independent of input enumeration order

mod combiner;
mod ranker;

pub use combiner::{combine, SignalError};
pub use ranker::{rank, Direction, TiePolicy};

use std::collections::BTreeMap;

/// Rank-normalized scores: symbol → value in [0, 1]. Exactly the instruments
/// present in both the factor values and the mask appear; all others are
/// absent, never zero.
pub type RankedScore = BTreeMap<String, f64>;

/// Combined scores: symbol → weighted rank sum over the inner join of all
/// contributing factors.
pub type CombinedScore = BTreeMap<String, f64>;
