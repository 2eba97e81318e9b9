//! Shared metrics recording for store backends.

use crate::Result;
use std::time::Instant;

/// Records operation metrics for storage operations.
///
/// This function records two metrics for each operation:
/// 1. `storage_operations_total` - Counter for operation count by status
/// 2. `storage_operation_duration_ms` - Histogram for operation latency
///
/// # Examples
///
/// ```ignore
/// use std::time::Instant;
/// use vectorvault::storage::record_operation_metrics;
///
/// let start = Instant::now();
/// // ... perform operation ...
/// record_operation_metrics("sqlite", "search", start, "success");
/// ```
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "storage_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "storage_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Records metrics for a finished operation and passes its result through.
pub fn observe<T>(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    result: Result<T>,
) -> Result<T> {
    let status = if result.is_ok() { "success" } else { "error" };
    record_operation_metrics(backend, operation, start, status);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_record_operation_metrics_without_recorder() {
        // No recorder installed: recording must be a silent no-op
        record_operation_metrics("file", "insert", Instant::now(), "success");
    }

    #[test]
    fn test_observe_passes_result_through() {
        let ok = observe("file", "get", Instant::now(), Ok(5));
        assert_eq!(ok.unwrap(), 5);

        let err: Result<()> = observe(
            "file",
            "get",
            Instant::now(),
            Err(Error::NotReady("closed".to_string())),
        );
        assert!(matches!(err, Err(Error::NotReady(_))));
    }
}
