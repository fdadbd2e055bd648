//! Sentiscope Classifiers
//!
//! Everything between "artifacts on a release page" and "a sentiment label":
//! - Artifact resolution: download-if-missing from a versioned release
//! - Model loading: decode the classifier and vectorizer artifacts once
//! - Prediction: normalize, vectorize, classify and derive confidence
//!
//! Handles are immutable after load and shared freely across threads.

pub mod artifacts;
pub mod classifier;
pub mod config;
pub mod model_loader;
pub mod pipeline;
pub mod vectorizer;

pub use artifacts::{
    ArtifactFetcher, ArtifactOutcome, ArtifactResolution, ArtifactResolver, ByteStream,
    HttpFetcher, ResolutionReport,
};
pub use classifier::{Classifier, ClassifierArtifact, GaussianNb, LinearSvc, LogisticRegression};
pub use config::{ArtifactSource, ArtifactSpec, ArtifactsConfig, LATEST_VERSION};
pub use model_loader::{load_handles, ModelArtifact, ModelHandle, VectorizerHandle};
pub use pipeline::{SentimentPipeline, HIGH_CONFIDENCE_THRESHOLD};
pub use vectorizer::{CountVectorizer, NormalizerSpec, TextNormalizer, VectorizerArtifact};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::artifacts::{ArtifactResolver, ResolutionReport};
    pub use crate::classifier::Classifier;
    pub use crate::config::{ArtifactSource, ArtifactSpec, ArtifactsConfig};
    pub use crate::model_loader::{load_handles, ModelHandle, VectorizerHandle};
    pub use crate::pipeline::SentimentPipeline;
}
