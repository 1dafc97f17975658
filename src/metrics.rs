//! Prometheus metrics for the scan loop and order routing.
//!
//! Counters and histograms go through the `metrics` facade; [`install_recorder`]
//! installs the Prometheus recorder whose handle renders `/metrics`.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Scan cycle latency metric name.
pub const METRIC_SCAN_LATENCY: &str = "scan_cycle_latency_ms";
/// Order submission latency metric name.
pub const METRIC_ORDER_SUBMIT_LATENCY: &str = "order_submit_latency_ms";
/// Completed scans counter metric name.
pub const METRIC_SCANS: &str = "scans_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Trades executed counter metric name.
pub const METRIC_TRADES_EXECUTED: &str = "trades_executed_total";
/// Orders submitted counter metric name.
pub const METRIC_ORDERS_SUBMITTED: &str = "orders_submitted_total";
/// Orders failed counter metric name.
pub const METRIC_ORDERS_FAILED: &str = "orders_failed_total";
/// Compensating cancels counter metric name.
pub const METRIC_COMPENSATING_CANCELS: &str = "compensating_cancels_total";
/// Failed compensating cancels counter metric name.
pub const METRIC_CANCEL_FAILURES: &str = "cancel_failures_total";
/// Gateway errors counter metric name.
pub const METRIC_GATEWAY_ERRORS: &str = "gateway_errors_total";

/// Initialize all metric descriptions.
/// Call this once at startup, after the recorder is installed.
pub fn init_metrics() {
    describe_histogram!(METRIC_SCAN_LATENCY, "Scan cycle latency in milliseconds");
    describe_histogram!(
        METRIC_ORDER_SUBMIT_LATENCY,
        "Order submission latency in milliseconds"
    );

    describe_counter!(METRIC_SCANS, "Total number of completed scans");
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total number of arbitrage opportunities detected"
    );
    describe_counter!(METRIC_TRADES_EXECUTED, "Total number of hedged trades executed");
    describe_counter!(METRIC_ORDERS_SUBMITTED, "Total number of orders submitted");
    describe_counter!(METRIC_ORDERS_FAILED, "Total number of orders that failed");
    describe_counter!(
        METRIC_COMPENSATING_CANCELS,
        "Total number of cancels issued after a failed leg"
    );
    describe_counter!(
        METRIC_CANCEL_FAILURES,
        "Total number of compensating cancels that did not succeed"
    );
    describe_counter!(METRIC_GATEWAY_ERRORS, "Total number of gateway errors");

    debug!("Metrics initialized");
}

/// Install the global Prometheus recorder and return its render handle.
pub fn install_recorder() -> Result<PrometheusHandle, String> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("failed to install Prometheus recorder: {}", e))?;
    init_metrics();
    Ok(handle)
}

/// Record order submission latency.
pub fn record_order_submit_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_ORDER_SUBMIT_LATENCY).record(latency_ms);
}

/// Increment completed scans counter.
pub fn inc_scans() {
    counter!(METRIC_SCANS).increment(1);
}

/// Add to the opportunities detected counter.
pub fn add_opportunities_detected(count: u64) {
    counter!(METRIC_OPPORTUNITIES_DETECTED).increment(count);
}

/// Increment trades executed counter.
pub fn inc_trades_executed() {
    counter!(METRIC_TRADES_EXECUTED).increment(1);
}

/// Increment order submitted counter.
pub fn inc_orders_submitted() {
    counter!(METRIC_ORDERS_SUBMITTED).increment(1);
}

/// Increment orders failed counter.
pub fn inc_orders_failed() {
    counter!(METRIC_ORDERS_FAILED).increment(1);
}

/// Increment compensating cancels counter.
pub fn inc_compensating_cancels() {
    counter!(METRIC_COMPENSATING_CANCELS).increment(1);
}

/// Increment failed compensating cancels counter.
pub fn inc_cancel_failures() {
    counter!(METRIC_CANCEL_FAILURES).increment(1);
}

/// Increment gateway errors counter.
pub fn inc_gateway_errors(operation: &'static str) {
    counter!(METRIC_GATEWAY_ERRORS, "operation" => operation).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric_name).record(self.elapsed_ms());
    }
}

/// Create a latency timer for one scan cycle.
pub fn timer_scan() -> LatencyTimer {
    LatencyTimer::new(METRIC_SCAN_LATENCY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn latency_timer_measures_time() {
        let timer = LatencyTimer::new("test_metric");
        sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 9.0);
    }

    #[test]
    fn recording_without_recorder_is_a_noop() {
        inc_scans();
        add_opportunities_detected(3);
        inc_gateway_errors("list_markets");
        record_order_submit_latency(Instant::now());
    }
}
