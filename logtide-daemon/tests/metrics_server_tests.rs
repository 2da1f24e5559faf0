//! Integration tests for the Prometheus metrics endpoint.
//!
//! The global recorder can be installed once per process, so the
//! installing test and the rejection tests are serialized.

use logtide_core::config::MetricsConfig;
use logtide_daemon::metrics_server;
use serial_test::serial;

fn config(port: u16, endpoint: &str) -> MetricsConfig {
    MetricsConfig {
        enabled: true,
        listen_addr: "127.0.0.1".to_owned(),
        port,
        endpoint: endpoint.to_owned(),
    }
}

#[test]
#[serial]
fn install_rejects_unsupported_endpoint_without_installing() {
    let err = metrics_server::install_metrics_recorder(&config(19181, "/prom"))
        .expect_err("custom endpoint must be rejected");
    assert!(err.to_string().contains("/prom"));
}

#[test]
#[serial]
fn install_then_second_install_fails() {
    let config = config(19182, "/metrics");

    metrics_server::install_metrics_recorder(&config)
        .expect("first install should succeed");
    metrics::counter!(logtide_core::metrics::PIPELINE_RECORDS_READ_TOTAL).increment(1);

    let err = metrics_server::install_metrics_recorder(&config)
        .expect_err("global recorder can only be installed once");
    assert!(err.to_string().contains("failed to install metrics recorder"));
}
