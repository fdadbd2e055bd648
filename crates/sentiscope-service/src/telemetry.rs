//! Logging and metrics setup

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins unless `verbose` is set.
pub fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("sentiscope=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sentiscope=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Install the Prometheus recorder and return the handle for `/metrics`
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "sentiscope_predictions_total",
        "Predictions served, by sentiment label"
    );
    metrics::describe_counter!(
        "sentiscope_prediction_errors_total",
        "Predictions that failed inside the pipeline"
    );
    metrics::describe_counter!(
        "sentiscope_zero_feature_inputs_total",
        "Non-empty inputs with no known vocabulary terms"
    );
    metrics::describe_histogram!(
        "sentiscope_prediction_latency_us",
        metrics::Unit::Microseconds,
        "Prediction latency in microseconds"
    );
    metrics::describe_counter!(
        "sentiscope_artifact_downloads_total",
        "Artifacts downloaded at startup"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
