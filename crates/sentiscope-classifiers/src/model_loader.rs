//! Artifact deserialization and the loaded-once model / vectorizer handles

use crate::classifier::{Classifier, ClassifierArtifact};
use crate::vectorizer::{CountVectorizer, TextNormalizer, VectorizerArtifact};
use sentiscope_core::{Label, LoadError, PredictionError, SparseVector};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Artifact schema version this build understands
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// On-disk serialization, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Yaml,
}

impl ArtifactFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(Self::Json),
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Some(Self::Yaml)
            }
            _ => None,
        }
    }

    fn decode<T: DeserializeOwned>(self, path: &Path, text: &str) -> Result<T, LoadError> {
        match self {
            Self::Json => serde_json::from_str(text).map_err(|e| LoadError::decode(path, e)),
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| LoadError::decode(path, e)),
        }
    }
}

/// Serialized classifier document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,

    #[serde(default)]
    pub name: Option<String>,

    pub classifier: ClassifierArtifact,
}

#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: u32,
}

/// Read and decode an artifact document
///
/// The format version is checked before the full document is decoded so an
/// artifact from a newer training release reports a version error rather
/// than a schema error.
pub fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let format =
        ArtifactFormat::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat(path.to_path_buf()))?;

    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let header: ArtifactHeader = format.decode(path, &text)?;
    if header.format_version != SUPPORTED_FORMAT_VERSION {
        return Err(LoadError::IncompatibleFormat {
            path: path.to_path_buf(),
            found: header.format_version,
            supported: SUPPORTED_FORMAT_VERSION,
        });
    }

    format.decode(path, &text)
}

/// Loaded classifier, read-only and cheap to clone
#[derive(Clone)]
pub struct ModelHandle {
    name: String,
    classifier: Arc<dyn Classifier>,
}

impl ModelHandle {
    pub fn new(name: impl Into<String>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            name: name.into(),
            classifier,
        }
    }

    /// Load a classifier artifact from disk
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        info!(path = %path.display(), "Loading classifier artifact");
        let artifact: ModelArtifact = read_artifact(path)?;
        let name = artifact.name.unwrap_or_else(|| stem(path));
        let classifier = artifact.classifier.into_classifier()?;

        info!(
            model = %name,
            kind = classifier.name(),
            features = classifier.n_features(),
            classes = ?classifier.classes(),
            "Classifier loaded"
        );

        Ok(Self {
            name,
            classifier: Arc::from(classifier),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        self.classifier.name()
    }

    pub fn classes(&self) -> &[Label] {
        self.classifier.classes()
    }

    pub fn n_features(&self) -> usize {
        self.classifier.n_features()
    }

    pub fn predict(&self, x: &SparseVector) -> Result<Label, PredictionError> {
        self.classifier.predict(x)
    }

    pub fn predict_proba(&self, x: &SparseVector) -> Result<Option<Vec<f64>>, PredictionError> {
        self.classifier.predict_proba(x)
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("n_features", &self.n_features())
            .finish()
    }
}

/// Loaded vectorizer, read-only and cheap to clone
#[derive(Debug, Clone)]
pub struct VectorizerHandle {
    name: String,
    vectorizer: Arc<CountVectorizer>,
}

impl VectorizerHandle {
    pub fn new(name: impl Into<String>, vectorizer: CountVectorizer) -> Self {
        Self {
            name: name.into(),
            vectorizer: Arc::new(vectorizer),
        }
    }

    /// Load a vectorizer artifact from disk
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        info!(path = %path.display(), "Loading vectorizer artifact");
        let artifact: VectorizerArtifact = read_artifact(path)?;
        let name = artifact.name.clone().unwrap_or_else(|| stem(path));
        let vectorizer = CountVectorizer::from_artifact(artifact)?;

        info!(
            vectorizer = %name,
            features = vectorizer.dimension(),
            normalizer = vectorizer.normalizer().is_some(),
            "Vectorizer loaded"
        );

        Ok(Self::new(name, vectorizer))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> usize {
        self.vectorizer.dimension()
    }

    pub fn normalizer(&self) -> Option<&TextNormalizer> {
        self.vectorizer.normalizer()
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        self.vectorizer.transform(text)
    }
}

/// Fail with `DimensionMismatch` when the pair cannot work together
pub fn check_compatible(model: &ModelHandle, vectorizer: &VectorizerHandle) -> Result<(), LoadError> {
    if model.n_features() != vectorizer.dimension() {
        return Err(LoadError::DimensionMismatch {
            vectorizer: vectorizer.dimension(),
            classifier: model.n_features(),
        });
    }
    Ok(())
}

/// Load both artifacts; any failure fails the whole load
pub fn load_handles(
    model_path: &Path,
    vectorizer_path: &Path,
) -> Result<(ModelHandle, VectorizerHandle), LoadError> {
    let model = ModelHandle::load(model_path)?;
    let vectorizer = VectorizerHandle::load(vectorizer_path)?;
    check_compatible(&model, &vectorizer)?;
    Ok((model, vectorizer))
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}
