use slotflow::observability::{LogConfig, SlotMetrics};
use std::sync::Arc;

#[test]
fn test_metrics_creation() {
    let metrics = SlotMetrics::new("/blocks/evaluator");
    assert_eq!(metrics.block(), "/blocks/evaluator");
    assert_eq!(metrics.calls(), 0);
    assert_eq!(metrics.errors_count(), 0);
    assert_eq!(metrics.avg_latency_us(), 0);
}

#[test]
fn test_metrics_increment() {
    let metrics = Arc::new(SlotMetrics::new("/blocks/evaluator"));

    metrics.record_call();
    metrics.record_call();
    assert_eq!(metrics.calls(), 2);

    metrics.record_error();
    metrics.record_emissions(3);
    assert_eq!(metrics.errors_count(), 1);
    assert_eq!(metrics.emissions(), 3);
}

#[tokio::test]
async fn test_metrics_latency_tracking() {
    let metrics = SlotMetrics::new("/blocks/evaluator");

    let start = metrics.start_call();
    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    metrics.finish_call(start);

    let avg_latency = metrics.avg_latency_us();
    assert!(avg_latency >= 10_000); // At least 10ms in microseconds
}

#[test]
fn test_snapshot_report() {
    let metrics = SlotMetrics::new("/blocks/evaluator");
    metrics.record_call();
    metrics.record_emissions(1);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.calls, 1);
    assert_eq!(
        snapshot.to_string(),
        "[/blocks/evaluator] calls: 1, errors: 0, emissions: 1, avg latency: 0μs"
    );
}

#[test]
fn test_log_config_defaults() {
    let config: LogConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, LogConfig::default());
    assert_eq!(config.level, "INFO");
    assert!(config.filter.is_none());
}
