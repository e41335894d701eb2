use std::collections::BTreeMap;

use xsn_schemas::{InstrumentPanel, Observation};

use crate::FactorValue;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while evaluating factor definitions.
///
/// These are configuration-time failures: a malformed definition fails every
/// cycle identically and is never retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FactorError {
    /// A definition declares a window of zero periods.
    ZeroWindow { name: String },
    /// Two definitions in the same registry share a name.
    DuplicateName { name: String },
}

impl std::fmt::Display for FactorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroWindow { name } => {
                write!(f, "factor '{name}' declares a zero-length window")
            }
            Self::DuplicateName { name } => {
                write!(f, "factor name '{name}' appears twice in the registry")
            }
        }
    }
}

impl std::error::Error for FactorError {}

// ---------------------------------------------------------------------------
// FactorDefinition
// ---------------------------------------------------------------------------

/// Panel fields a factor reads. Declared per definition so a caller can
/// check data coverage before fetching a cycle snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    Close,
    SharesOutstanding,
    BookEquity,
}

/// A declarative factor definition.
///
/// `compute` is a pure function over exactly `window` observations, oldest
/// first. It returns `None` when the value is undefined for that instrument
/// (e.g. a zero denominator); undefined values are excluded downstream, never
/// defaulted.
#[derive(Clone)]
pub struct FactorDefinition {
    pub name: &'static str,
    pub fields: &'static [Field],
    pub window: usize,
    pub compute: fn(&[Observation]) -> Option<f64>,
}

impl std::fmt::Debug for FactorDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactorDefinition")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("window", &self.window)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate one definition over a panel.
///
/// Instruments with fewer than `window` observations are absent from the
/// output. The compute function receives the most recent `window`
/// observations; a `None` or non-finite result also leaves the instrument
/// absent.
pub fn evaluate(def: &FactorDefinition, panel: &InstrumentPanel) -> Result<FactorValue, FactorError> {
    if def.window == 0 {
        return Err(FactorError::ZeroWindow {
            name: def.name.to_string(),
        });
    }

    let mut out = FactorValue::new();
    for (symbol, series) in &panel.series {
        if series.len() < def.window {
            continue;
        }
        let tail = &series[series.len() - def.window..];
        if let Some(v) = (def.compute)(tail) {
            if v.is_finite() {
                out.insert(symbol.clone(), v);
            }
        }
    }
    Ok(out)
}

/// Evaluate a whole registry in one panel pass.
///
/// Output: factor name → factor values. Registry names must be unique.
pub fn evaluate_all(
    registry: &[FactorDefinition],
    panel: &InstrumentPanel,
) -> Result<BTreeMap<String, FactorValue>, FactorError> {
    let mut out = BTreeMap::new();
    for def in registry {
        let values = evaluate(def, panel)?;
        if out.insert(def.name.to_string(), values).is_some() {
            return Err(FactorError::DuplicateName {
                name: def.name.to_string(),
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn asof() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn obs(close: f64) -> Observation {
        Observation::new(close, 1_000.0, 10_000.0)
    }

    fn last_close(window: &[Observation]) -> Option<f64> {
        window.last().map(|o| o.close)
    }

    fn def(window: usize) -> FactorDefinition {
        FactorDefinition {
            name: "last_close",
            fields: &[Field::Close],
            window,
            compute: last_close,
        }
    }

    #[test]
    fn zero_window_is_rejected() {
        let panel = InstrumentPanel::new(asof());
        assert_eq!(
            evaluate(&def(0), &panel).unwrap_err(),
            FactorError::ZeroWindow {
                name: "last_close".to_string()
            }
        );
    }

    #[test]
    fn short_history_is_absent_not_zero() {
        let mut panel = InstrumentPanel::new(asof());
        panel.insert_series("AAPL", vec![obs(1.0), obs(2.0)]);
        panel.insert_series("MSFT", vec![obs(3.0)]);

        let values = evaluate(&def(2), &panel).unwrap();
        assert_eq!(values.get("AAPL"), Some(&2.0));
        // One observation < window of two: absent, not defaulted.
        assert!(!values.contains_key("MSFT"));
    }

    #[test]
    fn compute_sees_exactly_the_window_tail() {
        fn first_close(window: &[Observation]) -> Option<f64> {
            window.first().map(|o| o.close)
        }
        let d = FactorDefinition {
            name: "first_close",
            fields: &[Field::Close],
            window: 2,
            compute: first_close,
        };

        let mut panel = InstrumentPanel::new(asof());
        panel.insert_series("AAPL", vec![obs(1.0), obs(2.0), obs(3.0)]);

        let values = evaluate(&d, &panel).unwrap();
        // Window of 2 over [1,2,3] → tail [2,3]; first element is 2.
        assert_eq!(values["AAPL"], 2.0);
    }

    #[test]
    fn non_finite_results_are_excluded() {
        fn div_by_zero(_: &[Observation]) -> Option<f64> {
            Some(1.0 / 0.0)
        }
        let d = FactorDefinition {
            name: "bad",
            fields: &[],
            window: 1,
            compute: div_by_zero,
        };
        let mut panel = InstrumentPanel::new(asof());
        panel.insert_series("AAPL", vec![obs(1.0)]);

        let values = evaluate(&d, &panel).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn evaluate_all_rejects_duplicate_names() {
        let mut panel = InstrumentPanel::new(asof());
        panel.insert_series("AAPL", vec![obs(1.0)]);

        let registry = vec![def(1), def(1)];
        assert_eq!(
            evaluate_all(&registry, &panel).unwrap_err(),
            FactorError::DuplicateName {
                name: "last_close".to_string()
            }
        );
    }
}
