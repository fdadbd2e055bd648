//! Startup sequence
//!
//! `Uninitialized -> ResolvingArtifacts -> LoadingModel -> Ready`. Any error
//! before `Ready` is terminal: the caller gets a `StartupError` and must not
//! bind its listener.

use crate::config::ServiceConfig;
use crate::state::AppContext;
use sentiscope_classifiers::{
    load_handles, ArtifactFetcher, ArtifactResolver, ArtifactsConfig, HttpFetcher,
    SentimentPipeline,
};
use sentiscope_core::{AcquisitionError, LoadError};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};

/// Where the startup sequence currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPhase {
    Uninitialized,
    ResolvingArtifacts,
    LoadingModel,
    Ready,
    /// Terminal; carries the phase that failed
    Failed(FailedPhase),
}

/// Phase in which startup stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedPhase {
    ResolvingArtifacts,
    LoadingModel,
}

impl fmt::Display for StartupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::ResolvingArtifacts => f.write_str("resolving_artifacts"),
            Self::LoadingModel => f.write_str("loading_model"),
            Self::Ready => f.write_str("ready"),
            Self::Failed(FailedPhase::ResolvingArtifacts) => f.write_str("failed(resolving_artifacts)"),
            Self::Failed(FailedPhase::LoadingModel) => f.write_str("failed(loading_model)"),
        }
    }
}

/// Fatal startup failure
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("artifact resolution failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("model loading failed: {0}")]
    Load(#[from] LoadError),

    #[error("startup already ran (phase: {0})")]
    AlreadyRan(StartupPhase),
}

/// Drives resolution and loading exactly once
pub struct Startup<F = HttpFetcher> {
    config: ServiceConfig,
    artifacts: ArtifactsConfig,
    resolver: ArtifactResolver<F>,
    phase: StartupPhase,
}

impl Startup<HttpFetcher> {
    /// Startup that downloads missing artifacts over HTTP
    pub fn from_config(config: ServiceConfig) -> Result<Self, StartupError> {
        let artifacts = config.artifacts();
        let resolver = ArtifactResolver::http(
            artifacts.source.clone(),
            Duration::from_secs(artifacts.download_timeout_secs),
        )?;
        Ok(Self::with_resolver(config, resolver))
    }
}

impl<F: ArtifactFetcher> Startup<F> {
    pub fn with_resolver(config: ServiceConfig, resolver: ArtifactResolver<F>) -> Self {
        let artifacts = config.artifacts();
        Self {
            config,
            artifacts,
            resolver,
            phase: StartupPhase::Uninitialized,
        }
    }

    pub fn phase(&self) -> StartupPhase {
        self.phase
    }

    /// Resolve artifacts, load both handles and build the handler context
    pub async fn run(&mut self) -> Result<AppContext, StartupError> {
        if self.phase != StartupPhase::Uninitialized {
            return Err(StartupError::AlreadyRan(self.phase));
        }

        let start = Instant::now();

        self.transition(StartupPhase::ResolvingArtifacts);
        let report = self.resolver.ensure_artifacts(&self.artifacts.specs()).await;
        info!(
            downloads = report.downloads(),
            complete = report.is_complete(),
            "Artifact resolution finished"
        );
        if let Err(e) = report.require_all() {
            return Err(self.fail(FailedPhase::ResolvingArtifacts, e.into()));
        }

        self.transition(StartupPhase::LoadingModel);
        let pipeline = match self.load() {
            Ok(pipeline) => pipeline,
            Err(e) => return Err(self.fail(FailedPhase::LoadingModel, e.into())),
        };

        info!(
            model = pipeline.model().name(),
            kind = pipeline.model().kind(),
            classes = ?pipeline.model().classes(),
            vectorizer = pipeline.vectorizer().name(),
            features = pipeline.vectorizer().dimension(),
            has_normalizer = pipeline.vectorizer().normalizer().is_some(),
            "Model loaded"
        );

        let context = AppContext::new(
            pipeline,
            self.config.service_version(),
            self.config.model_version.as_str(),
        );

        self.transition(StartupPhase::Ready);
        info!(elapsed_ms = start.elapsed().as_millis() as u64, "Startup complete");

        Ok(context)
    }

    fn load(&self) -> Result<SentimentPipeline, LoadError> {
        let (model, vectorizer) =
            load_handles(self.artifacts.model_path(), self.artifacts.vectorizer_path())?;
        SentimentPipeline::new(model, vectorizer)
    }

    fn transition(&mut self, next: StartupPhase) {
        info!(from = %self.phase, to = %next, "Startup phase");
        self.phase = next;
    }

    fn fail(&mut self, phase: FailedPhase, err: StartupError) -> StartupError {
        error!(phase = %self.phase, error = %err, "Startup failed");
        self.phase = StartupPhase::Failed(phase);
        err
    }
}
