use std::collections::BTreeMap;

use xsn_allocation::{check_weights, gross_weight, net_weight, optimize, ConstraintSet};
use xsn_schemas::RiskLoadings;

const TOL: f64 = 1e-6;

fn basket_scores(n: usize) -> BTreeMap<String, f64> {
    (0..n)
        .map(|i| (format!("SYM{i:02}"), (n - i) as f64 / n as f64))
        .collect()
}

fn spread_loadings(symbols: &[String], dims: usize) -> RiskLoadings {
    let mut l = RiskLoadings::new(dims);
    for (i, sym) in symbols.iter().enumerate() {
        // Deterministic, non-uniform rows so the bands actually bind on
        // something other than the neutrality constraint.
        let row: Vec<f64> = (0..dims)
            .map(|d| ((i + d) % 3) as f64 * 0.5 - 0.5)
            .collect();
        l.insert(sym.clone(), row);
    }
    l
}

#[test]
fn scenario_feasible_solve_satisfies_every_constraint() {
    let scores = basket_scores(10);
    let symbols: Vec<String> = scores.keys().cloned().collect();
    let loadings = spread_loadings(&symbols, 2);
    let set = ConstraintSet::reference(10, 1.0, &[0.10, 0.10]);

    let weights = optimize(&scores, &loadings, &set).unwrap();

    // Dollar neutrality is exact within numerical tolerance.
    assert!(
        net_weight(&weights).abs() < TOL,
        "net = {}",
        net_weight(&weights)
    );
    // Gross exposure bound.
    assert!(
        gross_weight(&weights) <= 1.0 + TOL,
        "gross = {}",
        gross_weight(&weights)
    );
    // Per-instrument box.
    for (sym, w) in &weights {
        assert!(
            *w <= 0.1 + TOL && *w >= -0.1 - TOL,
            "{sym} weight {w} outside box"
        );
    }
    // The compliance gate agrees.
    assert!(check_weights(&weights, &loadings, &set, TOL).is_empty());
    // The book is actually deployed, not degenerate.
    assert!(gross_weight(&weights) > 0.1);
}

#[test]
fn scenario_scarce_basket_still_solves() {
    // Two names: the thinnest basket that can hold a neutral book.
    let scores = basket_scores(2);
    let symbols: Vec<String> = scores.keys().cloned().collect();
    let loadings = spread_loadings(&symbols, 1);
    let set = ConstraintSet::reference(2, 1.0, &[1.0]);

    let weights = optimize(&scores, &loadings, &set).unwrap();
    assert_eq!(weights.len(), 2);
    assert!(net_weight(&weights).abs() < TOL);
    assert!(gross_weight(&weights) <= 1.0 + TOL);
}
