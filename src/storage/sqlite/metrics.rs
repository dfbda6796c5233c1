//! Metrics recording for knowledge store transactions.

use std::time::Instant;

/// Records count and latency of a store transaction.
///
/// 1. `learngraph_store_operations_total` - counter by operation and status
/// 2. `learngraph_store_operation_duration_ms` - latency histogram
///
/// `status` is `"success"` or `"error"`.
pub fn record_operation_metrics(operation: &'static str, start: Instant, status: &'static str) {
    metrics::counter!(
        "learngraph_store_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "learngraph_store_operation_duration_ms",
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Maps a result to the status label used by [`record_operation_metrics`].
pub const fn status_label<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() { "success" } else { "error" }
}
