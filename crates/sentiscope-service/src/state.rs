//! Application context shared by the request handlers

use metrics_exporter_prometheus::PrometheusHandle;
use sentiscope_classifiers::SentimentPipeline;
use std::sync::Arc;

/// Everything a handler needs; built once by the startup sequence
#[derive(Clone)]
pub struct AppContext {
    pub pipeline: Arc<SentimentPipeline>,
    pub service_version: Arc<str>,
    pub model_version: Arc<str>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppContext {
    pub fn new(
        pipeline: SentimentPipeline,
        service_version: impl Into<Arc<str>>,
        model_version: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            service_version: service_version.into(),
            model_version: model_version.into(),
            metrics_handle: None,
        }
    }

    /// Attach the Prometheus handle rendered by `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
