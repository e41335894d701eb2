//! xsn-factors
//!
//! Factor library: raw per-instrument factor values from panel snapshots.
//! - Factor definitions are declarative records (fields, window, pure fn)
//! - Missing/short history yields an absent value, never zero
//! - Non-finite results (zero denominators etc.) yield an absent value
//! - Pure deterministic logic (no IO, no time, no broker wiring)

mod canonical;
mod definition;

pub use canonical::{
    canonical_registry, FactorParams, BOOK_TO_MARKET, EWMA_DECAY_SPAN, EWMA_FAST_WINDOW,
    EWMA_OSC, EWMA_SLOW_WINDOW, MARKET_CAP, MOMENTUM,
};
pub use definition::{evaluate, evaluate_all, FactorDefinition, FactorError, Field};

use std::collections::BTreeMap;

/// Raw factor values: symbol → value. Instruments without a defined value
/// are absent from the map (absence ≠ neutral).
pub type FactorValue = BTreeMap<String, f64>;
