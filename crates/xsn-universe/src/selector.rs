use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Configuration-time failures in basket selection. Scarcity is NOT an
/// error — too few eligible names shrinks the baskets instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UniverseError {
    /// Requested basket size is zero.
    ZeroBasketSize,
    /// Requested basket size is odd; the basket splits evenly long/short.
    OddBasketSize { size: usize },
}

impl std::fmt::Display for UniverseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroBasketSize => write!(f, "basket size must be > 0"),
            Self::OddBasketSize { size } => {
                write!(f, "basket size {size} must be even (equal long/short split)")
            }
        }
    }
}

impl std::error::Error for UniverseError {}

// ---------------------------------------------------------------------------
// BucketPredicate
// ---------------------------------------------------------------------------

/// Market-cap-rank bucket: rank strictly greater than `lower_exclusive` and
/// at most `upper_inclusive`, on the normalized [0, 1] cap rank.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BucketPredicate {
    pub lower_exclusive: f64,
    pub upper_inclusive: f64,
}

impl BucketPredicate {
    pub fn new(lower_exclusive: f64, upper_inclusive: f64) -> Self {
        Self {
            lower_exclusive,
            upper_inclusive,
        }
    }

    /// Accepts every rank, including 0.0.
    pub fn full() -> Self {
        Self {
            lower_exclusive: -1.0,
            upper_inclusive: 1.0,
        }
    }

    pub fn contains(&self, rank: f64) -> bool {
        rank > self.lower_exclusive && rank <= self.upper_inclusive
    }
}

// ---------------------------------------------------------------------------
// Universe
// ---------------------------------------------------------------------------

/// Intersect tradability with the cap-rank bucket.
///
/// An instrument without a cap rank is ineligible (absence is not neutral).
pub fn select_universe(
    tradable: &BTreeSet<String>,
    cap_rank: &BTreeMap<String, f64>,
    bucket: &BucketPredicate,
) -> BTreeSet<String> {
    tradable
        .iter()
        .filter(|sym| {
            cap_rank
                .get(*sym)
                .map(|rank| bucket.contains(*rank))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Basket
// ---------------------------------------------------------------------------

/// Disjoint long/short candidate sets, each in selection order: `longs` best
/// combined score first, `shorts` worst first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Basket {
    pub longs: Vec<String>,
    pub shorts: Vec<String>,
}

impl Basket {
    pub fn position_count(&self) -> usize {
        self.longs.len() + self.shorts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.longs.is_empty() && self.shorts.is_empty()
    }

    /// All basket members (longs ∪ shorts).
    pub fn members(&self) -> BTreeSet<String> {
        self.longs.iter().chain(self.shorts.iter()).cloned().collect()
    }
}

/// Pick top-K longs and bottom-K shorts from one sorted ordering.
///
/// Candidates are universe ∩ combined-score keys, sorted by
/// (score descending, symbol ascending). Longs are the head, shorts are the
/// tail of the SAME ordering — disjoint by construction. Per-side size is
/// `target_size / 2`, shrunk to `floor(candidates / 2)` when the universe is
/// too small; fewer than two candidates leaves one or both sides empty.
pub fn select_basket(
    universe: &BTreeSet<String>,
    combined: &BTreeMap<String, f64>,
    target_size: usize,
) -> Result<Basket, UniverseError> {
    if target_size == 0 {
        return Err(UniverseError::ZeroBasketSize);
    }
    if target_size % 2 != 0 {
        return Err(UniverseError::OddBasketSize { size: target_size });
    }

    let mut candidates: Vec<(&String, f64)> = combined
        .iter()
        .filter(|(sym, _)| universe.contains(*sym))
        .map(|(sym, score)| (sym, *score))
        .collect();

    candidates.sort_by(|a, b| {
        let score = b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal);
        if score != std::cmp::Ordering::Equal {
            return score;
        }
        a.0.cmp(b.0)
    });

    let per_side = (target_size / 2).min(candidates.len() / 2);

    let longs: Vec<String> = candidates[..per_side]
        .iter()
        .map(|(sym, _)| (*sym).clone())
        .collect();
    let shorts: Vec<String> = candidates[candidates.len() - per_side..]
        .iter()
        .rev()
        .map(|(sym, _)| (*sym).clone())
        .collect();

    Ok(Basket { longs, shorts })
}
