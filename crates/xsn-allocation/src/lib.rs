//! xsn-allocation
//!
//! Constrained allocation: combined scores in, target weights out.
//! - Constraints are declarative, inspectable data composed into a set
//! - The formulation is a linear program (alpha objective, linear
//!   constraints) lowered onto a narrow solver interface
//! - Infeasibility is surfaced explicitly, never as silent zero weights
//! - Post-solve verification re-checks every constraint as a compliance gate
//! - Pure deterministic logic (no IO, no time, no broker wiring)

pub mod constraints;
pub mod optimizer;
pub mod solver;

pub use constraints::{
    check_weights, gross_weight, net_weight, one_way_turnover, Constraint, ConstraintSet,
    ConstraintViolation,
};
pub use optimizer::{optimize, AllocationError};
pub use solver::{solve, LinearConstraint, LinearProgram, Relation, SolveOutcome};
