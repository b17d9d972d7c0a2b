use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, register_int_counter_vec,
    CounterVec, Histogram, IntCounter, IntCounterVec,
};

pub static REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "fetcher_requests_total",
        "Requests issued by outcome",
        &["outcome"]
    )
    .expect("fetcher requests metric")
});

pub static RETRIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "fetcher_retries_total",
        "Retries of the same request by reason",
        &["reason"]
    )
    .expect("fetcher retries metric")
});

pub static SLEEP_SECONDS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fetcher_sleep_seconds_total",
        "Seconds spent pausing by reason",
        &["reason"]
    )
    .expect("fetcher sleep metric")
});

pub static PAGES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "fetcher_pages_total",
        "Non-empty pages returned to callers"
    )
    .expect("fetcher pages metric")
});

pub static LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "fetcher_request_latency_seconds",
        "Latency of individual requests"
    )
    .expect("fetcher latency metric")
});
