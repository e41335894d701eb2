use std::collections::{BTreeMap, BTreeSet};

use crate::RankedScore;

// ---------------------------------------------------------------------------
// Ranking policy
// ---------------------------------------------------------------------------

/// Sort direction for the cross-section.
///
/// `Ascending`: larger factor values receive larger scores (bigger is
/// better). `Descending` inverts that.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// How tied factor values are scored.
///
/// Only average-rank is implemented: every member of a tied run receives the
/// mean of the positional ranks the run occupies. The enum keeps the policy
/// explicit at call sites and leaves room for alternatives.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TiePolicy {
    #[default]
    AverageRank,
}

// ---------------------------------------------------------------------------
// Ranker
// ---------------------------------------------------------------------------

/// Rank a factor cross-section over an eligibility mask.
///
/// Scores are positional ranks normalized to [0, 1]; a single-element
/// cross-section scores 0.5. Only instruments present in both `values` and
/// `mask` are scored (non-finite values are treated as undefined and
/// excluded). Ties resolve by the tie policy over runs of exactly equal
/// values; ordering within the sort uses symbol ascending as the stable
/// secondary key, so the output never depends on input enumeration order.
pub fn rank(
    values: &BTreeMap<String, f64>,
    mask: &BTreeSet<String>,
    direction: Direction,
    policy: TiePolicy,
) -> RankedScore {
    let mut entries: Vec<(&String, f64)> = values
        .iter()
        .filter(|(sym, v)| mask.contains(*sym) && v.is_finite())
        .map(|(sym, v)| (sym, *v))
        .collect();

    entries.sort_by(|a, b| {
        let val = match direction {
            Direction::Ascending => a.1.partial_cmp(&b.1),
            Direction::Descending => b.1.partial_cmp(&a.1),
        }
        // Values are finite by the filter above.
        .unwrap_or(std::cmp::Ordering::Equal);
        if val != std::cmp::Ordering::Equal {
            return val;
        }
        a.0.cmp(b.0)
    });

    let n = entries.len();
    let mut out = RankedScore::new();
    if n == 0 {
        return out;
    }
    if n == 1 {
        out.insert(entries[0].0.clone(), 0.5);
        return out;
    }

    let TiePolicy::AverageRank = policy;
    let denom = (n - 1) as f64;
    let mut i = 0;
    while i < n {
        // Extent of the run of exactly equal values starting at i.
        let mut j = i + 1;
        while j < n && entries[j].1 == entries[i].1 {
            j += 1;
        }
        // Positional ranks i..j collapse to their mean.
        let avg = (i + j - 1) as f64 / 2.0;
        let score = avg / denom;
        for entry in &entries[i..j] {
            out.insert(entry.0.clone(), score);
        }
        i = j;
    }
    out
}
