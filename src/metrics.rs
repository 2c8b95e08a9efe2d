// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{
    counter, describe_counter, describe_histogram, histogram, increment_counter, Unit,
};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
pub enum Unit {}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! increment_counter {
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
use crate::{counter, describe_counter, describe_histogram, histogram, increment_counter};

/// Registers descriptions for every metric emitted by the SDK. Call once at startup.
pub fn describe_metrics() {
    describe_counter!(
        "gas_blocks_scanned_total",
        Unit::Count,
        "Blocks fetched and classified, labeled by outcome (scanned, skipped)."
    );
    describe_counter!(
        "gas_samples_recorded_total",
        Unit::Count,
        "Gas samples appended to the ledger, labeled by kind (method, deployment)."
    );
    describe_counter!(
        "gas_unresolved_calls_total",
        Unit::Count,
        "Contract calls no resolution strategy could attribute."
    );
    describe_counter!(
        "gas_resolutions_total",
        Unit::Count,
        "Successful identity resolutions, labeled by strategy."
    );
    describe_counter!("rpc_errors_total", Unit::Count, "Failed or timed out RPC calls.");
    describe_histogram!(
        "rpc_call_latency_ms",
        Unit::Milliseconds,
        "RPC call latency in milliseconds, labeled by method."
    );
}

pub fn increment_blocks(outcome: &str) {
    counter!("gas_blocks_scanned_total", 1, "outcome" => outcome.to_string());
}

pub fn increment_samples_recorded(kind: &str) {
    counter!("gas_samples_recorded_total", 1, "kind" => kind.to_string());
}

pub fn increment_unresolved_calls() {
    increment_counter!("gas_unresolved_calls_total");
}

pub fn increment_resolution(strategy: &str) {
    counter!("gas_resolutions_total", 1, "strategy" => strategy.to_string());
}

pub fn increment_rpc_error(method: &str) {
    counter!("rpc_errors_total", 1, "method" => method.to_string());
}

pub fn record_rpc_call_latency(method: &str, duration: std::time::Duration) {
    histogram!("rpc_call_latency_ms", duration.as_millis() as f64,
               "method" => method.to_string());
}
