//! Narrow LP interface and the in-crate solver behind it.
//!
//! The solver is a dense two-phase primal simplex over the standard form
//! (maximize c·x, rows of ≤/=/≥, x ≥ 0). Pivot selection uses Bland's rule
//! (smallest-index entering column, smallest-basis-variable tie-break on the
//! ratio test), so the solve cannot cycle and repeated calls with identical
//! inputs produce identical results. Callers depend only on `solve`; the
//! formulation never leaks solver internals.

/// Row relation in a linear constraint.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Relation {
    LessEq,
    Eq,
    GreaterEq,
}

/// One linear constraint row: `coefficients · x <relation> rhs`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearConstraint {
    pub coefficients: Vec<f64>,
    pub relation: Relation,
    pub rhs: f64,
}

/// A linear program over non-negative variables.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearProgram {
    /// Objective coefficients; the solver maximizes `maximize · x`.
    pub maximize: Vec<f64>,
    pub constraints: Vec<LinearConstraint>,
}

/// Result of one solve.
#[derive(Clone, Debug, PartialEq)]
pub enum SolveOutcome {
    Optimal { variables: Vec<f64>, objective: f64 },
    /// No point satisfies every constraint simultaneously.
    Infeasible,
    /// The objective can grow without bound under the constraints.
    Unbounded,
    /// The pivot cap was hit before convergence.
    IterationLimit,
    /// Structurally invalid input (row length mismatch, non-finite entry).
    MalformedProgram,
}

const EPS: f64 = 1e-9;
/// Phase-1 artificial-variable residual above which the program is declared
/// infeasible.
const FEAS_EPS: f64 = 1e-7;
const MAX_ITERATIONS: usize = 20_000;

/// Solve a linear program.
pub fn solve(lp: &LinearProgram) -> SolveOutcome {
    let n = lp.maximize.len();
    if !lp.maximize.iter().all(|c| c.is_finite()) {
        return SolveOutcome::MalformedProgram;
    }
    for c in &lp.constraints {
        if c.coefficients.len() != n
            || !c.coefficients.iter().all(|v| v.is_finite())
            || !c.rhs.is_finite()
        {
            return SolveOutcome::MalformedProgram;
        }
    }

    // Normalize rows to non-negative rhs.
    let mut rows: Vec<(Vec<f64>, Relation, f64)> = lp
        .constraints
        .iter()
        .map(|c| (c.coefficients.clone(), c.relation, c.rhs))
        .collect();
    for (coeffs, relation, rhs) in rows.iter_mut() {
        if *rhs < 0.0 {
            for v in coeffs.iter_mut() {
                *v = -*v;
            }
            *rhs = -*rhs;
            *relation = match *relation {
                Relation::LessEq => Relation::GreaterEq,
                Relation::GreaterEq => Relation::LessEq,
                Relation::Eq => Relation::Eq,
            };
        }
    }

    let m = rows.len();
    let slack_count = rows
        .iter()
        .filter(|(_, rel, _)| *rel != Relation::Eq)
        .count();
    let artificial_count = rows
        .iter()
        .filter(|(_, rel, _)| *rel != Relation::LessEq)
        .count();
    let real_cols = n + slack_count;
    let total_cols = real_cols + artificial_count;

    // Tableau: one row per constraint, columns [structural | slack | artificial].
    let mut a = vec![vec![0.0; total_cols]; m];
    let mut b = vec![0.0; m];
    let mut basis = vec![0usize; m];

    let mut next_slack = n;
    let mut next_artificial = real_cols;
    for (i, (coeffs, relation, rhs)) in rows.iter().enumerate() {
        a[i][..n].copy_from_slice(coeffs);
        b[i] = *rhs;
        match relation {
            Relation::LessEq => {
                a[i][next_slack] = 1.0;
                basis[i] = next_slack;
                next_slack += 1;
            }
            Relation::GreaterEq => {
                a[i][next_slack] = -1.0;
                next_slack += 1;
                a[i][next_artificial] = 1.0;
                basis[i] = next_artificial;
                next_artificial += 1;
            }
            Relation::Eq => {
                a[i][next_artificial] = 1.0;
                basis[i] = next_artificial;
                next_artificial += 1;
            }
        }
    }

    let mut iterations = 0usize;

    // Phase 1: drive artificials to zero.
    if artificial_count > 0 {
        let mut r = vec![0.0; total_cols];
        let mut z = 0.0;
        for i in 0..m {
            if basis[i] >= real_cols {
                for j in 0..total_cols {
                    r[j] += a[i][j];
                }
                z -= b[i];
            }
        }
        // Basic columns have zero reduced cost by construction; the artificial
        // columns' own -1 objective cancels the +1 accumulated above.
        for i in 0..m {
            if basis[i] >= real_cols {
                r[basis[i]] = 0.0;
            }
        }

        match run_simplex(&mut a, &mut b, &mut basis, &mut r, &mut z, &mut iterations) {
            Status::Optimal => {}
            Status::Unbounded => return SolveOutcome::MalformedProgram,
            Status::IterationLimit => return SolveOutcome::IterationLimit,
        }
        if z < -FEAS_EPS {
            return SolveOutcome::Infeasible;
        }

        // Pivot remaining artificials out of the basis; rows that cannot be
        // pivoted are redundant and get dropped.
        let mut i = 0;
        while i < a.len() {
            if basis[i] >= real_cols {
                match (0..real_cols).find(|&j| a[i][j].abs() > EPS) {
                    Some(j) => pivot(&mut a, &mut b, &mut basis, i, j),
                    None => {
                        a.remove(i);
                        b.remove(i);
                        basis.remove(i);
                        continue;
                    }
                }
            }
            i += 1;
        }
        for row in a.iter_mut() {
            row.truncate(real_cols);
        }
    }

    // Phase 2: the real objective.
    let cost = |j: usize| -> f64 {
        if j < n {
            lp.maximize[j]
        } else {
            0.0
        }
    };
    let mut r = vec![0.0; real_cols];
    let mut z = 0.0;
    for j in 0..real_cols {
        r[j] = cost(j);
    }
    for i in 0..a.len() {
        let cb = cost(basis[i]);
        if cb != 0.0 {
            for j in 0..real_cols {
                r[j] -= cb * a[i][j];
            }
            z += cb * b[i];
        }
    }

    match run_simplex(&mut a, &mut b, &mut basis, &mut r, &mut z, &mut iterations) {
        Status::Optimal => {}
        Status::Unbounded => return SolveOutcome::Unbounded,
        Status::IterationLimit => return SolveOutcome::IterationLimit,
    }

    let mut variables = vec![0.0; n];
    for i in 0..a.len() {
        if basis[i] < n {
            let v = b[i];
            variables[basis[i]] = if v.abs() < EPS { 0.0 } else { v };
        }
    }
    SolveOutcome::Optimal {
        variables,
        objective: z,
    }
}

enum Status {
    Optimal,
    Unbounded,
    IterationLimit,
}

fn run_simplex(
    a: &mut Vec<Vec<f64>>,
    b: &mut Vec<f64>,
    basis: &mut Vec<usize>,
    r: &mut [f64],
    z: &mut f64,
    iterations: &mut usize,
) -> Status {
    loop {
        // Bland: smallest-index column with positive reduced cost.
        let Some(col) = (0..r.len()).find(|&j| r[j] > EPS) else {
            return Status::Optimal;
        };

        // Ratio test; ties resolve to the smallest basis variable index.
        let mut leaving: Option<(usize, f64)> = None;
        for i in 0..a.len() {
            if a[i][col] > EPS {
                let ratio = b[i] / a[i][col];
                let take = match leaving {
                    None => true,
                    Some((cur, best)) => {
                        ratio < best - EPS
                            || ((ratio - best).abs() <= EPS && basis[i] < basis[cur])
                    }
                };
                if take {
                    leaving = Some((i, ratio));
                }
            }
        }
        let Some((row, _)) = leaving else {
            return Status::Unbounded;
        };

        let rf = r[col];
        pivot(a, b, basis, row, col);
        for j in 0..r.len() {
            r[j] -= rf * a[row][j];
        }
        *z += rf * b[row];

        *iterations += 1;
        if *iterations > MAX_ITERATIONS {
            return Status::IterationLimit;
        }
    }
}

/// Gauss-Jordan pivot on (row, col): normalize the pivot row, eliminate the
/// column from every other row, update the basis.
fn pivot(a: &mut [Vec<f64>], b: &mut [f64], basis: &mut [usize], row: usize, col: usize) {
    let p = a[row][col];
    for v in a[row].iter_mut() {
        *v /= p;
    }
    b[row] /= p;

    let pivot_row = a[row].clone();
    let pivot_b = b[row];
    for i in 0..a.len() {
        if i == row {
            continue;
        }
        let f = a[i][col];
        if f != 0.0 {
            for j in 0..a[i].len() {
                a[i][j] -= f * pivot_row[j];
            }
            b[i] -= f * pivot_b;
        }
    }
    basis[row] = col;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le(coefficients: Vec<f64>, rhs: f64) -> LinearConstraint {
        LinearConstraint {
            coefficients,
            relation: Relation::LessEq,
            rhs,
        }
    }

    fn eq(coefficients: Vec<f64>, rhs: f64) -> LinearConstraint {
        LinearConstraint {
            coefficients,
            relation: Relation::Eq,
            rhs,
        }
    }

    fn ge(coefficients: Vec<f64>, rhs: f64) -> LinearConstraint {
        LinearConstraint {
            coefficients,
            relation: Relation::GreaterEq,
            rhs,
        }
    }

    fn optimal(outcome: SolveOutcome) -> (Vec<f64>, f64) {
        match outcome {
            SolveOutcome::Optimal {
                variables,
                objective,
            } => (variables, objective),
            other => panic!("expected optimal, got {other:?}"),
        }
    }

    #[test]
    fn box_constrained_maximum() {
        let lp = LinearProgram {
            maximize: vec![1.0, 1.0],
            constraints: vec![le(vec![1.0, 0.0], 1.0), le(vec![0.0, 1.0], 2.0)],
        };
        let (x, obj) = optimal(solve(&lp));
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((x[1] - 2.0).abs() < 1e-9);
        assert!((obj - 3.0).abs() < 1e-9);
    }

    #[test]
    fn equality_row_binds_exactly() {
        // maximize x s.t. x + y = 1, x ≤ 0.4
        let lp = LinearProgram {
            maximize: vec![1.0, 0.0],
            constraints: vec![eq(vec![1.0, 1.0], 1.0), le(vec![1.0, 0.0], 0.4)],
        };
        let (x, obj) = optimal(solve(&lp));
        assert!((x[0] - 0.4).abs() < 1e-9);
        assert!((x[1] - 0.6).abs() < 1e-9);
        assert!((obj - 0.4).abs() < 1e-9);
    }

    #[test]
    fn contradictory_rows_are_infeasible() {
        let lp = LinearProgram {
            maximize: vec![1.0],
            constraints: vec![le(vec![1.0], 1.0), ge(vec![1.0], 2.0)],
        };
        assert_eq!(solve(&lp), SolveOutcome::Infeasible);
    }

    #[test]
    fn missing_cap_is_unbounded() {
        let lp = LinearProgram {
            maximize: vec![1.0],
            constraints: vec![],
        };
        assert_eq!(solve(&lp), SolveOutcome::Unbounded);
    }

    #[test]
    fn negative_rhs_rows_are_normalized() {
        // -x ≤ -1 is x ≥ 1; minimizing x via maximize(-x) lands on the bound.
        let lp = LinearProgram {
            maximize: vec![-1.0],
            constraints: vec![le(vec![-1.0], -1.0), le(vec![1.0], 3.0)],
        };
        let (x, obj) = optimal(solve(&lp));
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((obj + 1.0).abs() < 1e-9);
    }

    #[test]
    fn redundant_equality_rows_do_not_break_the_solve() {
        let lp = LinearProgram {
            maximize: vec![1.0, 1.0],
            constraints: vec![
                eq(vec![1.0, 1.0], 1.0),
                eq(vec![2.0, 2.0], 2.0),
                le(vec![1.0, 0.0], 0.25),
            ],
        };
        let (x, obj) = optimal(solve(&lp));
        assert!((x[0] + x[1] - 1.0).abs() < 1e-9);
        assert!((obj - 1.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_identical_solves_are_deterministic() {
        let lp = LinearProgram {
            maximize: vec![1.0, 1.0, 1.0],
            // Fully degenerate: every variable interchangeable.
            constraints: vec![le(vec![1.0, 1.0, 1.0], 1.0)],
        };
        let first = solve(&lp);
        let second = solve(&lp);
        assert_eq!(first, second);
    }

    #[test]
    fn row_length_mismatch_is_malformed() {
        let lp = LinearProgram {
            maximize: vec![1.0, 1.0],
            constraints: vec![le(vec![1.0], 1.0)],
        };
        assert_eq!(solve(&lp), SolveOutcome::MalformedProgram);
    }

    #[test]
    fn nan_coefficient_is_malformed() {
        let lp = LinearProgram {
            maximize: vec![f64::NAN],
            constraints: vec![],
        };
        assert_eq!(solve(&lp), SolveOutcome::MalformedProgram);
    }
}
