use crate::{CombinedScore, RankedScore};

/// Errors produced during signal combination.
///
/// An empty key intersection is NOT an error — it yields an empty combined
/// score (degenerate-but-non-fatal cycle, decided by the caller).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalError {
    /// The factor list is empty.
    NoFactors,
    /// Per-factor weights were supplied but their count does not match the
    /// factor count.
    WeightCountMismatch { factors: usize, weights: usize },
    /// A supplied per-factor weight is NaN or infinite.
    InvalidWeight { index: usize },
}

impl std::fmt::Display for SignalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoFactors => write!(f, "factor list must not be empty"),
            Self::WeightCountMismatch { factors, weights } => {
                write!(f, "{weights} weights supplied for {factors} factors")
            }
            Self::InvalidWeight { index } => {
                write!(f, "invalid (NaN/inf) weight at index {index}")
            }
        }
    }
}

impl std::error::Error for SignalError {}

/// Combine ranked factors into one score per instrument.
///
/// Inner-join semantics: only instruments present in *all* contributing
/// factors appear in the output; an instrument missing from any factor is
/// excluded entirely. `weights` defaults to uniform (plain rank sum).
pub fn combine(
    factors: &[RankedScore],
    weights: Option<&[f64]>,
) -> Result<CombinedScore, SignalError> {
    if factors.is_empty() {
        return Err(SignalError::NoFactors);
    }
    if let Some(w) = weights {
        if w.len() != factors.len() {
            return Err(SignalError::WeightCountMismatch {
                factors: factors.len(),
                weights: w.len(),
            });
        }
        for (i, v) in w.iter().enumerate() {
            if !v.is_finite() {
                return Err(SignalError::InvalidWeight { index: i });
            }
        }
    }

    let weight_at = |i: usize| weights.map_or(1.0, |w| w[i]);

    let mut out = CombinedScore::new();
    'symbols: for (symbol, first_score) in &factors[0] {
        let mut sum = weight_at(0) * first_score;
        for (i, factor) in factors.iter().enumerate().skip(1) {
            match factor.get(symbol) {
                Some(score) => sum += weight_at(i) * score,
                None => continue 'symbols,
            }
        }
        out.insert(symbol.clone(), sum);
    }
    Ok(out)
}
