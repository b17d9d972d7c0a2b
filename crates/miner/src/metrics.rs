use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, Histogram, IntCounterVec,
};

pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "miner_runs_total",
        "Mining runs grouped by outcome (complete or partial)",
        &["outcome"]
    )
    .expect("miner runs total")
});

pub static RECORDS_PARSED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "miner_records_parsed_total",
        "Records parsed grouped by record kind",
        &["kind"]
    )
    .expect("miner records parsed")
});

pub static RECORDS_SKIPPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "miner_records_skipped_total",
        "Malformed records skipped grouped by record kind",
        &["kind"]
    )
    .expect("miner records skipped")
});

pub static RUN_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "miner_run_duration_seconds",
        "Duration of mining runs in seconds",
        vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]
    )
    .expect("miner run duration histogram")
});
