//! Artifact resolution: download-if-missing for the model and vectorizer
//!
//! Presence on disk is trusted as-is. Missing artifacts are fetched once from
//! the configured release source, streamed chunk by chunk into a `.part`
//! sibling and renamed into place. No retries, no checksums.

use crate::config::{ArtifactSource, ArtifactSpec};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use sentiscope_core::AcquisitionError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

/// Stream of body chunks for one download
pub type ByteStream = BoxStream<'static, Result<Bytes, AcquisitionError>>;

/// Transport used to fetch release assets
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Open `url` and return its body as a chunk stream.
    ///
    /// Non-success statuses must be reported as errors here, before any
    /// bytes are handed out.
    async fn open(&self, url: &str) -> Result<ByteStream, AcquisitionError>;
}

/// `reqwest`-backed fetcher with bounded connect and request timeouts
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, AcquisitionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .timeout(timeout)
            .user_agent(concat!("sentiscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AcquisitionError::invalid_source(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn open(&self, url: &str) -> Result<ByteStream, AcquisitionError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AcquisitionError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::status(url, status.as_u16()));
        }

        let url = url.to_string();
        let stream = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| AcquisitionError::network(url.clone(), e)));

        Ok(stream.boxed())
    }
}

/// What happened to one artifact during resolution
#[derive(Debug)]
pub enum ArtifactOutcome {
    /// Already on disk, nothing fetched
    Present,

    /// Fetched from `url`
    Downloaded { url: String, bytes: u64 },

    /// Resolution failed
    Failed(AcquisitionError),
}

impl ArtifactOutcome {
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Per-artifact result of one resolution pass
#[derive(Debug)]
pub struct ArtifactResolution {
    pub name: String,
    pub path: PathBuf,
    pub outcome: ArtifactOutcome,
}

/// Outcomes for every requested artifact, in request order
#[derive(Debug, Default)]
pub struct ResolutionReport {
    pub entries: Vec<ArtifactResolution>,
}

impl ResolutionReport {
    /// True when every artifact is available locally
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.outcome.is_available())
    }

    /// Number of artifacts that were downloaded
    pub fn downloads(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, ArtifactOutcome::Downloaded { .. }))
            .count()
    }

    /// Look up an outcome by artifact name
    pub fn outcome(&self, name: &str) -> Option<&ArtifactOutcome> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.outcome)
    }

    /// Fail with the first error, if any artifact could not be resolved
    pub fn require_all(self) -> Result<(), AcquisitionError> {
        for entry in self.entries {
            if let ArtifactOutcome::Failed(err) = entry.outcome {
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Ensures artifacts exist locally, fetching missing ones
pub struct ArtifactResolver<F = HttpFetcher> {
    source: ArtifactSource,
    fetcher: F,
}

impl ArtifactResolver<HttpFetcher> {
    /// Resolver that downloads over HTTP with the given timeout
    pub fn http(source: ArtifactSource, timeout: Duration) -> Result<Self, AcquisitionError> {
        Ok(Self::new(source, HttpFetcher::new(timeout)?))
    }
}

impl<F: ArtifactFetcher> ArtifactResolver<F> {
    pub fn new(source: ArtifactSource, fetcher: F) -> Self {
        Self { source, fetcher }
    }

    pub fn source(&self) -> &ArtifactSource {
        &self.source
    }

    /// Resolve every spec independently
    ///
    /// A failure for one artifact does not stop the others; the caller decides
    /// whether an incomplete report is fatal.
    pub async fn ensure_artifacts(&self, specs: &[ArtifactSpec]) -> ResolutionReport {
        let mut report = ResolutionReport::default();

        for spec in specs {
            let outcome = if spec.exists() {
                debug!(artifact = %spec.name, path = %spec.local_path.display(), "Artifact present, skipping download");
                ArtifactOutcome::Present
            } else {
                match self.download(spec).await {
                    Ok((url, bytes)) => {
                        info!(artifact = %spec.name, path = %spec.local_path.display(), bytes, "Downloaded artifact");
                        metrics::counter!("sentiscope_artifact_downloads_total", "artifact" => spec.name.clone())
                            .increment(1);
                        ArtifactOutcome::Downloaded { url, bytes }
                    }
                    Err(e) => {
                        error!(artifact = %spec.name, error = %e, "Failed to resolve artifact");
                        ArtifactOutcome::Failed(e)
                    }
                }
            };

            report.entries.push(ArtifactResolution {
                name: spec.name.clone(),
                path: spec.local_path.clone(),
                outcome,
            });
        }

        report
    }

    async fn download(&self, spec: &ArtifactSpec) -> Result<(String, u64), AcquisitionError> {
        let url = self.source.url_for(&spec.file_name)?;
        info!(artifact = %spec.name, %url, "Fetching artifact");

        let stream = self.fetcher.open(&url).await?;
        let bytes = write_stream(stream, &spec.local_path).await?;
        Ok((url, bytes))
    }
}

/// Write a chunk stream to `dest`, creating parent directories
///
/// Data lands in `<dest>.part` first and is renamed only after the whole body
/// was written, so an interrupted download never looks present.
pub async fn write_stream(mut stream: ByteStream, dest: &Path) -> Result<u64, AcquisitionError> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AcquisitionError::filesystem(parent, e))?;
    }

    let part = part_path(dest);
    let result = async {
        let mut file = tokio::fs::File::create(&part)
            .await
            .map_err(|e| AcquisitionError::filesystem(&part, e))?;

        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| AcquisitionError::filesystem(&part, e))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| AcquisitionError::filesystem(&part, e))?;
        file.sync_all()
            .await
            .map_err(|e| AcquisitionError::filesystem(&part, e))?;
        Ok::<u64, AcquisitionError>(written)
    }
    .await;

    match result {
        Ok(written) => match tokio::fs::rename(&part, dest).await {
            Ok(()) => Ok(written),
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(AcquisitionError::filesystem(dest, e))
            }
        },
        Err(e) => {
            let _ = tokio::fs::remove_file(&part).await;
            Err(e)
        }
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves fixed bodies and records every URL it is asked for
    #[derive(Default)]
    struct RecordingFetcher {
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
        fail_with_status: Option<u16>,
    }

    #[async_trait]
    impl ArtifactFetcher for RecordingFetcher {
        async fn open(&self, url: &str) -> Result<ByteStream, AcquisitionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());

            if let Some(status) = self.fail_with_status {
                return Err(AcquisitionError::status(url, status));
            }

            let chunks = vec![Ok(Bytes::from_static(b"{\"a\":")), Ok(Bytes::from_static(b"1}"))];
            Ok(stream::iter(chunks).boxed())
        }
    }

    fn specs_in(dir: &Path) -> Vec<ArtifactSpec> {
        vec![
            ArtifactSpec::new("model", dir.join("models/SentimentModel.json")),
            ArtifactSpec::new("vectorizer", dir.join("bow/c1_BoW_Sentiment_Model.json")),
        ]
    }

    #[tokio::test]
    async fn test_present_artifacts_are_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let specs = specs_in(dir.path());
        for spec in &specs {
            std::fs::create_dir_all(spec.local_path.parent().unwrap()).unwrap();
            std::fs::write(&spec.local_path, b"{}").unwrap();
        }

        let resolver = ArtifactResolver::new(ArtifactSource::default(), RecordingFetcher::default());
        let report = resolver.ensure_artifacts(&specs).await;

        assert!(report.is_complete());
        assert_eq!(report.downloads(), 0);
        assert_eq!(resolver.fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_artifacts_use_latest_url() {
        let dir = tempfile::tempdir().unwrap();
        let specs = specs_in(dir.path());

        let source = ArtifactSource::new("https://github.com", "org/model-training", "latest");
        let resolver = ArtifactResolver::new(source, RecordingFetcher::default());
        let report = resolver.ensure_artifacts(&specs).await;

        assert!(report.is_complete());
        assert_eq!(report.downloads(), 2);

        let urls = resolver.fetcher.urls.lock().unwrap().clone();
        assert_eq!(
            urls,
            vec![
                "https://github.com/org/model-training/releases/latest/download/SentimentModel.json",
                "https://github.com/org/model-training/releases/latest/download/c1_BoW_Sentiment_Model.json",
            ]
        );

        for spec in &specs {
            assert_eq!(std::fs::read(&spec.local_path).unwrap(), b"{\"a\":1}");
            assert!(!part_path(&spec.local_path).exists());
        }
    }

    #[tokio::test]
    async fn test_only_missing_artifact_is_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let specs = specs_in(dir.path());
        std::fs::create_dir_all(specs[1].local_path.parent().unwrap()).unwrap();
        std::fs::write(&specs[1].local_path, b"{}").unwrap();

        let source = ArtifactSource::new("https://github.com", "org/model-training", "2.3.0");
        let resolver = ArtifactResolver::new(source, RecordingFetcher::default());
        let report = resolver.ensure_artifacts(&specs).await;

        assert!(matches!(report.outcome("model"), Some(ArtifactOutcome::Downloaded { .. })));
        assert!(matches!(report.outcome("vectorizer"), Some(ArtifactOutcome::Present)));
        assert_eq!(
            resolver.fetcher.urls.lock().unwrap().as_slice(),
            ["https://github.com/org/model-training/releases/download/v2.3.0/SentimentModel.json"]
        );
    }

    #[tokio::test]
    async fn test_failures_are_reported_per_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let specs = specs_in(dir.path());

        let fetcher = RecordingFetcher {
            fail_with_status: Some(404),
            ..Default::default()
        };
        let resolver = ArtifactResolver::new(ArtifactSource::default(), fetcher);
        let report = resolver.ensure_artifacts(&specs).await;

        // Both attempted independently
        assert_eq!(resolver.fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(!report.is_complete());
        assert!(specs.iter().all(|s| !s.local_path.exists()));

        let err = report.require_all().unwrap_err();
        assert!(matches!(err, AcquisitionError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_interrupted_stream_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/dir/model.json");

        let chunks: Vec<Result<Bytes, AcquisitionError>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(AcquisitionError::network("http://x", "connection reset")),
        ];
        let err = write_stream(stream::iter(chunks).boxed(), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, AcquisitionError::Network { .. }));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
        assert!(dest.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn test_failed_rename_removes_part_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory at the destination makes the rename fail
        let dest = dir.path().join("model.json");
        std::fs::create_dir_all(dest.join("occupied")).unwrap();

        let chunks: Vec<Result<Bytes, AcquisitionError>> = vec![Ok(Bytes::from_static(b"{}"))];
        let err = write_stream(stream::iter(chunks).boxed(), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, AcquisitionError::Filesystem { .. }));
        assert!(dest.is_dir());
        assert!(!part_path(&dest).exists());
    }
}
