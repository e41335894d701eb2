//! Pipeline scenario: two ranked factors over ten instruments, combined
//! equally, selected into a four-name basket, allocated under the reference
//! constraint set. Expected baskets and weight invariants are hand-computed.

use std::collections::{BTreeMap, BTreeSet};

use xsn_allocation::{gross_weight, net_weight, optimize, Constraint, ConstraintSet};
use xsn_schemas::RiskLoadings;
use xsn_signal::{combine, rank, Direction, TiePolicy};
use xsn_universe::select_basket;

const TOL: f64 = 1e-6;

fn symbols() -> Vec<String> {
    (0..10).map(|i| format!("SYM{i:02}")).collect()
}

#[test]
fn scenario_ranked_signals_to_weights() {
    let syms = symbols();
    let mask: BTreeSet<String> = syms.iter().cloned().collect();

    // Factor 1 orders SYM00..SYM09 ascending; factor 2 agrees, so the
    // combined ordering is unambiguous.
    let factor1: BTreeMap<String, f64> = syms
        .iter()
        .enumerate()
        .map(|(i, s)| (s.clone(), (i + 1) as f64))
        .collect();
    let factor2: BTreeMap<String, f64> = syms
        .iter()
        .enumerate()
        .map(|(i, s)| (s.clone(), (i + 1) as f64 * 10.0))
        .collect();

    let r1 = rank(&factor1, &mask, Direction::Ascending, TiePolicy::AverageRank);
    let r2 = rank(&factor2, &mask, Direction::Ascending, TiePolicy::AverageRank);
    let combined = combine(&[r1, r2], None).unwrap();

    // Equal-weight rank sum: SYM09 tops out at 2.0, SYM00 bottoms at 0.0.
    assert!((combined["SYM09"] - 2.0).abs() < TOL);
    assert!(combined["SYM00"].abs() < TOL);

    let basket = select_basket(&mask, &combined, 4).unwrap();
    assert_eq!(basket.longs, vec!["SYM09", "SYM08"]);
    assert_eq!(basket.shorts, vec!["SYM00", "SYM01"]);

    // Restrict scores to the basket and allocate.
    let basket_scores: BTreeMap<String, f64> = basket
        .members()
        .into_iter()
        .map(|sym| {
            let score = combined[&sym];
            (sym, score)
        })
        .collect();

    let mut loadings = RiskLoadings::new(1);
    for sym in basket_scores.keys() {
        loadings.insert(sym.clone(), vec![1.0]);
    }

    let set = ConstraintSet::new(vec![
        Constraint::GrossExposureCap { limit: 1.0 },
        Constraint::DollarNeutral,
        Constraint::RiskExposureBand {
            dimension: 0,
            band: 0.05,
        },
        Constraint::PositionBounds {
            short_max: 0.25,
            long_max: 0.25,
        },
    ]);

    let weights = optimize(&basket_scores, &loadings, &set).unwrap();

    assert_eq!(weights.len(), 4);
    assert!(net_weight(&weights).abs() < TOL, "net = {}", net_weight(&weights));
    assert!(gross_weight(&weights) <= 1.0 + TOL);
    for (sym, w) in &weights {
        assert!(w.abs() <= 0.25 + TOL, "{sym} weight {w} outside ±0.25");
    }
    // The score gradient puts the best names long and the worst short.
    assert!(weights["SYM09"] > TOL);
    assert!(weights["SYM08"] > TOL);
    assert!(weights["SYM00"] < -TOL);
    assert!(weights["SYM01"] < -TOL);
}
