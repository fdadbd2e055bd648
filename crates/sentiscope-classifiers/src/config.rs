//! Configuration for artifact locations and their remote source

use sentiscope_core::AcquisitionError;
use std::path::{Path, PathBuf};
use url::Url;

/// Version tag that selects the "latest release" URL shape
pub const LATEST_VERSION: &str = "latest";

/// Where missing artifacts are downloaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    /// Release host, e.g. `https://github.com`
    pub base_url: String,

    /// Repository identifier, `<owner>/<name>`
    pub repository: String,

    /// Release tag, or `latest`
    pub version: String,
}

impl Default for ArtifactSource {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            repository: default_repository(),
            version: default_version(),
        }
    }
}

impl ArtifactSource {
    pub fn new(
        base_url: impl Into<String>,
        repository: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            repository: repository.into(),
            version: version.into(),
        }
    }

    /// Whether the configured tag is the `latest` sentinel
    pub fn is_latest(&self) -> bool {
        self.version.trim() == LATEST_VERSION
    }

    /// Build the download URL for one artifact file
    ///
    /// - latest: `<base>/<repo>/releases/latest/download/<file>`
    /// - tagged: `<base>/<repo>/releases/download/v<version>/<file>`
    pub fn url_for(&self, file_name: &str) -> Result<String, AcquisitionError> {
        let base = Url::parse(self.base_url.trim())
            .map_err(|e| AcquisitionError::invalid_source(format!("base url {:?}: {e}", self.base_url)))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(AcquisitionError::invalid_source(format!(
                "base url must be http(s), got {:?}",
                base.scheme()
            )));
        }

        let repository = self.repository.trim().trim_matches('/');
        if repository.split('/').filter(|s| !s.is_empty()).count() != 2 {
            return Err(AcquisitionError::invalid_source(format!(
                "repository must look like <owner>/<name>, got {:?}",
                self.repository
            )));
        }

        if file_name.is_empty() {
            return Err(AcquisitionError::invalid_source("artifact file name is empty"));
        }

        let base = base.as_str().trim_end_matches('/');
        let url = if self.is_latest() {
            format!("{base}/{repository}/releases/latest/download/{file_name}")
        } else {
            let version = self.version.trim();
            let version = version.strip_prefix('v').unwrap_or(version);
            if version.is_empty() {
                return Err(AcquisitionError::invalid_source("version tag is empty"));
            }
            format!("{base}/{repository}/releases/download/v{version}/{file_name}")
        };

        Url::parse(&url).map_err(|e| AcquisitionError::invalid_source(format!("{url}: {e}")))?;
        Ok(url)
    }
}

/// A single artifact the service needs on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    /// Logical name used in logs and reports
    pub name: String,

    /// Where the artifact lives locally
    pub local_path: PathBuf,

    /// File name of the release asset
    pub file_name: String,
}

impl ArtifactSpec {
    /// Create a spec whose release asset has the same file name as the local path
    pub fn new(name: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        let local_path = local_path.into();
        let file_name = local_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        Self {
            name: name.into(),
            local_path,
            file_name,
        }
    }

    pub fn exists(&self) -> bool {
        self.local_path.exists()
    }
}

/// Artifact configuration
#[derive(Debug, Clone)]
pub struct ArtifactsConfig {
    /// Classifier artifact path
    pub model_path: PathBuf,

    /// Vectorizer artifact path
    pub vectorizer_path: PathBuf,

    /// Remote release source
    pub source: ArtifactSource,

    /// Overall timeout for a single artifact download
    pub download_timeout_secs: u64,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            vectorizer_path: default_vectorizer_path(),
            source: ArtifactSource::default(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

impl ArtifactsConfig {
    /// Model artifact spec
    pub fn model_spec(&self) -> ArtifactSpec {
        ArtifactSpec::new("model", &self.model_path)
    }

    /// Vectorizer artifact spec
    pub fn vectorizer_spec(&self) -> ArtifactSpec {
        ArtifactSpec::new("vectorizer", &self.vectorizer_path)
    }

    /// Both specs, model first
    pub fn specs(&self) -> Vec<ArtifactSpec> {
        vec![self.model_spec(), self.vectorizer_spec()]
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn vectorizer_path(&self) -> &Path {
        &self.vectorizer_path
    }
}

fn default_base_url() -> String {
    "https://github.com".to_string()
}

fn default_repository() -> String {
    "remla25-team2/model-training".to_string()
}

fn default_version() -> String {
    LATEST_VERSION.to_string()
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/SentimentModel.json")
}

fn default_vectorizer_path() -> PathBuf {
    PathBuf::from("bow/c1_BoW_Sentiment_Model.json")
}

fn default_download_timeout_secs() -> u64 {
    120
}
