//! Over-tight risk bands: each basket member loads its own risk dimension
//! and the tolerance table pins every exposure to zero, so only the zero
//! portfolio satisfies the set. The cycle must surface infeasibility rather
//! than submit degenerate weights.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use xsn_allocation::AllocationError;
use xsn_config::EngineConfig;
use xsn_rebalance::{CycleError, RebalanceOrchestrator};
use xsn_schemas::{RiskLoadings, WeightMap};
use xsn_testkit::{PanelBuilder, RecordingExecutionSink, RecordingMetricsSink, StaticDataProvider};

fn asof() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
}

#[test]
fn scenario_tight_bands_surface_infeasibility() {
    let symbols: Vec<String> = (0..10).map(|i| format!("SYM{i:02}")).collect();

    let mut builder = PanelBuilder::new(asof());
    for (i, sym) in symbols.iter().enumerate() {
        let step = 0.2 * (i + 1) as f64;
        let book = 1_000.0 * (i + 1) as f64;
        builder = builder.linear_series(sym.clone(), 100.0, step, 26, 1_000.0, book);
    }

    // Basket members (best two, worst two) each load a dedicated dimension.
    let pinned: BTreeMap<&str, usize> =
        [("SYM09", 0), ("SYM08", 1), ("SYM00", 2), ("SYM01", 3)]
            .into_iter()
            .collect();
    let mut loadings = RiskLoadings::new(4);
    for sym in &symbols {
        let mut row = vec![0.0; 4];
        if let Some(d) = pinned.get(sym.as_str()) {
            row[*d] = 1.0;
        }
        loadings.insert(sym.clone(), row);
    }

    let mut bands = xsn_config::RiskBandTable::new();
    bands.insert("tight".to_string(), 0.0);
    let config = EngineConfig {
        basket_size: 4,
        momentum_window: 5,
        signal_factors: vec!["momentum".to_string(), "book_to_market".to_string()],
        cap_bucket_lower: -1.0,
        cap_bucket_upper: 1.0,
        risk_band_version: "tight".to_string(),
        risk_band_versions: bands,
        ..EngineConfig::default()
    };

    let mut orchestrator = RebalanceOrchestrator::new(
        config,
        StaticDataProvider {
            panel: builder.build(),
            loadings,
            holdings: WeightMap::new(),
        },
        RecordingExecutionSink::default(),
        RecordingMetricsSink::default(),
    )
    .unwrap();

    orchestrator.pre_open_refresh(asof()).unwrap();
    let err = orchestrator.rebalance().unwrap_err();

    // Distinctly infeasible — not a numerical error, not silent zeros.
    assert!(
        matches!(
            &err,
            CycleError::Allocation(AllocationError::Infeasible { .. })
        ),
        "expected infeasible, got {err:?}"
    );
    assert!(orchestrator.execution().submissions.is_empty());
}
