use xsn_schemas::Observation;

use crate::definition::{FactorDefinition, Field};

/// Factor names used by the canonical registry.
pub const MARKET_CAP: &str = "market_cap";
pub const MOMENTUM: &str = "momentum";
pub const BOOK_TO_MARKET: &str = "book_to_market";
pub const EWMA_OSC: &str = "ewma_osc";

/// Fast/slow EWMA windows for the oscillator factor.
pub const EWMA_FAST_WINDOW: usize = 12;
pub const EWMA_SLOW_WINDOW: usize = 26;
/// Both EWMAs share one decay: alpha = 2 / (1 + span).
pub const EWMA_DECAY_SPAN: f64 = 15.0;

/// Tunable windows for the canonical registry. Defaults mirror the reference
/// configuration; tests shrink the momentum window to keep fixtures small.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FactorParams {
    pub momentum_window: usize,
}

impl Default for FactorParams {
    fn default() -> Self {
        Self {
            momentum_window: 100,
        }
    }
}

/// The canonical factor registry.
pub fn canonical_registry(params: &FactorParams) -> Vec<FactorDefinition> {
    vec![
        FactorDefinition {
            name: MARKET_CAP,
            fields: &[Field::Close, Field::SharesOutstanding],
            window: 1,
            compute: market_cap,
        },
        FactorDefinition {
            name: MOMENTUM,
            fields: &[Field::Close],
            window: params.momentum_window,
            compute: momentum,
        },
        FactorDefinition {
            name: BOOK_TO_MARKET,
            fields: &[Field::Close, Field::SharesOutstanding, Field::BookEquity],
            window: 1,
            compute: book_to_market,
        },
        FactorDefinition {
            name: EWMA_OSC,
            fields: &[Field::Close],
            window: EWMA_SLOW_WINDOW,
            compute: ewma_oscillator,
        },
    ]
}

// ---------------------------------------------------------------------------
// Factor functions
// ---------------------------------------------------------------------------

fn market_cap(window: &[Observation]) -> Option<f64> {
    let o = window.last()?;
    Some(o.shares_outstanding * o.close)
}

/// Window return anchored on the latest close:
/// (close[latest] - close[window_start]) / close[latest].
fn momentum(window: &[Observation]) -> Option<f64> {
    let first = window.first()?;
    let last = window.last()?;
    if last.close == 0.0 {
        return None;
    }
    Some((last.close - first.close) / last.close)
}

fn book_to_market(window: &[Observation]) -> Option<f64> {
    let o = window.last()?;
    let cap = o.shares_outstanding * o.close;
    if cap == 0.0 {
        return None;
    }
    Some(o.book_equity / cap)
}

/// Normalized fast/slow EWMA difference: (ewma_fast - ewma_slow) / ewma_slow.
/// The fast EWMA runs over the tail EWMA_FAST_WINDOW closes, the slow over
/// the whole EWMA_SLOW_WINDOW slice; both use the shared decay.
fn ewma_oscillator(window: &[Observation]) -> Option<f64> {
    if window.len() < EWMA_SLOW_WINDOW {
        return None;
    }
    let closes: Vec<f64> = window.iter().map(|o| o.close).collect();
    let alpha = 2.0 / (1.0 + EWMA_DECAY_SPAN);
    let slow = ewma(&closes, alpha)?;
    let fast = ewma(&closes[closes.len() - EWMA_FAST_WINDOW..], alpha)?;
    if slow == 0.0 {
        return None;
    }
    Some((fast - slow) / slow)
}

/// e[0] = x[0]; e[t] = alpha * x[t] + (1 - alpha) * e[t-1].
fn ewma(xs: &[f64], alpha: f64) -> Option<f64> {
    let mut iter = xs.iter();
    let mut e = *iter.next()?;
    for x in iter {
        e = alpha * x + (1.0 - alpha) * e;
    }
    Some(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::evaluate;
    use chrono::NaiveDate;
    use xsn_schemas::InstrumentPanel;

    fn asof() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn obs(close: f64, shares: f64, book: f64) -> Observation {
        Observation::new(close, shares, book)
    }

    #[test]
    fn market_cap_is_latest_shares_times_close() {
        let v = market_cap(&[obs(50.0, 2_000.0, 0.0)]).unwrap();
        assert_eq!(v, 100_000.0);
    }

    #[test]
    fn momentum_is_window_return_on_latest_close() {
        let window = vec![obs(80.0, 0.0, 0.0), obs(90.0, 0.0, 0.0), obs(100.0, 0.0, 0.0)];
        let v = momentum(&window).unwrap();
        assert!((v - 0.2).abs() < 1e-12, "got {v}");
    }

    #[test]
    fn momentum_with_zero_latest_close_is_undefined() {
        let window = vec![obs(80.0, 0.0, 0.0), obs(0.0, 0.0, 0.0)];
        assert!(momentum(&window).is_none());
    }

    #[test]
    fn book_to_market_divides_by_cap() {
        let v = book_to_market(&[obs(10.0, 100.0, 500.0)]).unwrap();
        assert!((v - 0.5).abs() < 1e-12);
    }

    #[test]
    fn book_to_market_with_zero_cap_is_undefined() {
        assert!(book_to_market(&[obs(0.0, 100.0, 500.0)]).is_none());
    }

    #[test]
    fn ewma_of_constant_series_is_the_constant() {
        let xs = vec![5.0; 26];
        let e = ewma(&xs, 0.125).unwrap();
        assert!((e - 5.0).abs() < 1e-12);
    }

    #[test]
    fn ewma_oscillator_positive_in_uptrend() {
        // Rising closes: fast EWMA (recent tail) sits above slow EWMA.
        let window: Vec<Observation> = (1..=26).map(|i| obs(i as f64, 0.0, 0.0)).collect();
        let v = ewma_oscillator(&window).unwrap();
        assert!(v > 0.0, "got {v}");
    }

    #[test]
    fn ewma_oscillator_flat_series_is_zero() {
        let window = vec![obs(10.0, 0.0, 0.0); 26];
        let v = ewma_oscillator(&window).unwrap();
        assert!(v.abs() < 1e-12, "got {v}");
    }

    #[test]
    fn registry_momentum_respects_param_window() {
        let registry = canonical_registry(&FactorParams { momentum_window: 3 });
        let mom = registry.iter().find(|d| d.name == MOMENTUM).unwrap();
        assert_eq!(mom.window, 3);

        let mut panel = InstrumentPanel::new(asof());
        panel.insert_series(
            "AAPL",
            vec![
                obs(100.0, 1.0, 1.0),
                obs(110.0, 1.0, 1.0),
                obs(125.0, 1.0, 1.0),
            ],
        );
        let values = evaluate(mom, &panel).unwrap();
        assert!((values["AAPL"] - 0.2).abs() < 1e-12);
    }
}
