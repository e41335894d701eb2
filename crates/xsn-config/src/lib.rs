//! xsn-config
//!
//! Engine configuration: YAML load, structural validation, content hashing.
//! Validation failures are configuration-time errors — they fail the load
//! loudly and are never retried. The content hash ties every cycle report to
//! the exact configuration that produced it.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;

/// Versioned risk-neutralization tolerance table: policy version → symmetric
/// band width applied to every risk dimension.
pub type RiskBandTable = BTreeMap<String, f64>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Total target position count N (even; N/2 long, N/2 short).
    #[serde(default = "default_basket_size")]
    pub basket_size: usize,

    /// Gross exposure cap G: Σ |w_i| ≤ G.
    #[serde(default = "default_gross_cap")]
    pub gross_cap: f64,

    /// Per-position box bound; defaults to 1 / basket_size when absent.
    #[serde(default)]
    pub position_bound: Option<f64>,

    /// Momentum factor lookback window, in periods.
    #[serde(default = "default_momentum_window")]
    pub momentum_window: usize,

    /// Factor names feeding the combined signal, in combination order.
    #[serde(default = "default_signal_factors")]
    pub signal_factors: Vec<String>,

    /// Optional per-factor weights; uniform when absent. Count must match
    /// `signal_factors`.
    #[serde(default)]
    pub factor_weights: Option<Vec<f64>>,

    /// Market-cap bucket on the normalized [0, 1] cap rank:
    /// rank > lower (exclusive) and rank ≤ upper (inclusive).
    #[serde(default = "default_bucket_lower")]
    pub cap_bucket_lower: f64,
    #[serde(default = "default_bucket_upper")]
    pub cap_bucket_upper: f64,

    /// Active risk-neutralization policy version.
    #[serde(default = "default_band_version")]
    pub risk_band_version: String,

    /// The versioned tolerance table itself.
    #[serde(default = "default_band_table")]
    pub risk_band_versions: RiskBandTable,
}

fn default_basket_size() -> usize {
    100
}

fn default_gross_cap() -> f64 {
    1.0
}

fn default_momentum_window() -> usize {
    100
}

fn default_signal_factors() -> Vec<String> {
    vec![
        "momentum".to_string(),
        "book_to_market".to_string(),
        "ewma_osc".to_string(),
    ]
}

fn default_bucket_lower() -> f64 {
    0.0
}

fn default_bucket_upper() -> f64 {
    1.0
}

fn default_band_version() -> String {
    "v1".to_string()
}

fn default_band_table() -> RiskBandTable {
    let mut t = RiskBandTable::new();
    t.insert("v1".to_string(), 0.05);
    t
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            basket_size: default_basket_size(),
            gross_cap: default_gross_cap(),
            position_bound: None,
            momentum_window: default_momentum_window(),
            signal_factors: default_signal_factors(),
            factor_weights: None,
            cap_bucket_lower: default_bucket_lower(),
            cap_bucket_upper: default_bucket_upper(),
            risk_band_version: default_band_version(),
            risk_band_versions: default_band_table(),
        }
    }
}

impl EngineConfig {
    /// Structural validation. Every failure here is fatal configuration
    /// error territory — callers must not retry.
    pub fn validate(&self) -> Result<()> {
        if self.basket_size == 0 {
            bail!("basket_size must be > 0");
        }
        if self.basket_size % 2 != 0 {
            bail!(
                "basket_size {} must be even (equal long/short split)",
                self.basket_size
            );
        }
        if !self.gross_cap.is_finite() || self.gross_cap <= 0.0 {
            bail!("gross_cap {} must be finite and > 0", self.gross_cap);
        }
        if let Some(bound) = self.position_bound {
            if !bound.is_finite() || bound <= 0.0 {
                bail!("position_bound {bound} must be finite and > 0");
            }
        }
        if self.momentum_window < 2 {
            bail!(
                "momentum_window {} must span at least 2 periods",
                self.momentum_window
            );
        }
        if self.signal_factors.is_empty() {
            bail!("signal_factors must not be empty");
        }
        if let Some(weights) = &self.factor_weights {
            if weights.len() != self.signal_factors.len() {
                bail!(
                    "{} factor_weights supplied for {} signal_factors",
                    weights.len(),
                    self.signal_factors.len()
                );
            }
            if !weights.iter().all(|w| w.is_finite()) {
                bail!("factor_weights must be finite");
            }
        }
        if !(-1.0..=1.0).contains(&self.cap_bucket_lower)
            || !(0.0..=1.0).contains(&self.cap_bucket_upper)
            || self.cap_bucket_lower >= self.cap_bucket_upper
        {
            bail!(
                "cap bucket ({}, {}] must satisfy -1 <= lower < upper <= 1",
                self.cap_bucket_lower,
                self.cap_bucket_upper
            );
        }
        let band = self.band_width()?;
        if !band.is_finite() || band < 0.0 {
            bail!(
                "risk band {} for version '{}' must be finite and >= 0",
                band,
                self.risk_band_version
            );
        }
        Ok(())
    }

    /// Band width for the active policy version.
    pub fn band_width(&self) -> Result<f64> {
        self.risk_band_versions
            .get(&self.risk_band_version)
            .copied()
            .with_context(|| {
                format!(
                    "risk_band_version '{}' not present in the tolerance table",
                    self.risk_band_version
                )
            })
    }

    /// Per-position box bound: explicit override, else 1 / basket_size.
    pub fn resolved_position_bound(&self) -> f64 {
        self.position_bound
            .unwrap_or(1.0 / self.basket_size as f64)
    }
}

/// Parse and validate a YAML configuration string.
pub fn from_yaml_str(s: &str) -> Result<EngineConfig> {
    let config: EngineConfig = serde_yaml::from_str(s).context("parse engine config yaml")?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a YAML configuration file.
pub fn load_yaml(path: &str) -> Result<EngineConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("read engine config: {path}"))?;
    from_yaml_str(&s)
}

/// Content hash of the effective configuration: sha256 over the canonical
/// JSON serialization (struct field order is fixed, maps are BTree-ordered).
pub fn config_hash(config: &EngineConfig) -> Result<String> {
    let canonical = serde_json::to_vec(config).context("serialize engine config")?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}
