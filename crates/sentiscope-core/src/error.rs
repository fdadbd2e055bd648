//! Error types for sentiscope
//!
//! Startup errors (`AcquisitionError`, `LoadError`) are fatal: the service must
//! not start serving. `PredictionError` is recovered per request.

use std::path::PathBuf;

/// Failure while resolving an artifact from its remote source
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    /// Connection, TLS, timeout or body-stream failure
    #[error("failed to fetch {url}: {message}")]
    Network { url: String, message: String },

    /// The server answered with a non-success status
    #[error("fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Creating directories or writing the destination file failed
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured base URL / repository could not form a valid URL
    #[error("invalid artifact source: {0}")]
    InvalidSource(String),
}

impl AcquisitionError {
    pub fn network(url: impl Into<String>, msg: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            message: msg.to_string(),
        }
    }

    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_source(msg: impl Into<String>) -> Self {
        Self::InvalidSource(msg.into())
    }
}

/// Failure while deserializing a present artifact
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Artifact file does not exist
    #[error("artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Artifact exists but could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File extension does not map to a known serialization
    #[error("unsupported artifact format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Bytes are not a valid artifact document
    #[error("failed to decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    /// Artifact was written by an incompatible training pipeline release
    #[error("{} has format version {found}, supported version is {supported}", path.display())]
    IncompatibleFormat {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    /// Decoded artifact violates a structural invariant
    #[error("invalid {artifact} artifact: {message}")]
    Invalid { artifact: String, message: String },

    /// Vectorizer and classifier disagree on feature dimensionality
    #[error("vectorizer produces {vectorizer} features but classifier expects {classifier}")]
    DimensionMismatch { vectorizer: usize, classifier: usize },
}

impl LoadError {
    pub fn decode(path: impl Into<PathBuf>, msg: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            message: msg.to_string(),
        }
    }

    pub fn invalid(artifact: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Invalid {
            artifact: artifact.into(),
            message: msg.into(),
        }
    }
}

/// Per-request failure inside the prediction pipeline
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    /// Classifier produced no probabilities at all
    #[error("classifier returned an empty probability distribution")]
    EmptyDistribution,

    /// Classifier produced a NaN, infinite or out-of-range probability
    #[error("classifier returned invalid probability {0}")]
    InvalidProbability(f64),

    /// Probability vector length disagrees with the class count
    #[error("probability distribution has {got} entries for {expected} classes")]
    DistributionShape { expected: usize, got: usize },

    /// Feature vector does not fit the classifier
    #[error("feature vector has dimension {got}, classifier expects {expected}")]
    FeatureDimension { expected: usize, got: usize },
}
