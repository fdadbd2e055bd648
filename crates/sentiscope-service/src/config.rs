//! Service configuration
//!
//! Layered: serde defaults, then an optional YAML file, then environment
//! variables (`PORT`, `MODEL_VERSION`, `MODEL_REPO`, ...), then CLI flags.

use crate::cli::Cli;
use config::{builder::DefaultState, ConfigBuilder, Environment, File, FileFormat};
use sentiscope_classifiers::{ArtifactSource, ArtifactsConfig, LATEST_VERSION};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Listen address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Release tag to download artifacts from, or `latest`
    #[serde(default = "default_model_version")]
    pub model_version: String,

    /// Repository publishing the trained artifacts
    #[serde(default = "default_model_repo")]
    pub model_repo: String,

    /// Release host
    #[serde(default = "default_model_base_url")]
    pub model_base_url: String,

    /// Local classifier artifact path
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Local vectorizer artifact path
    #[serde(default = "default_vectorizer_path")]
    pub vectorizer_path: PathBuf,

    /// Reported by `/version`; defaults to the package version
    #[serde(default)]
    pub service_version: Option<String>,

    /// Timeout for each artifact download
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let artifacts = ArtifactsConfig::default();
        Self {
            host: default_host(),
            port: default_port(),
            model_version: default_model_version(),
            model_repo: default_model_repo(),
            model_base_url: default_model_base_url(),
            model_path: artifacts.model_path,
            vectorizer_path: artifacts.vectorizer_path,
            service_version: None,
            download_timeout_secs: artifacts.download_timeout_secs,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from file, environment and CLI overrides
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(File::new(&cli.config, FileFormat::Yaml).required(false))
            .add_source(Environment::default());

        let mut config = Self::from_builder(builder)?;

        // Apply CLI overrides
        if let Some(host) = &cli.host {
            config.host = host.clone();
        }

        if let Some(port) = cli.port {
            config.port = port;
        }

        Ok(config)
    }

    /// Build from an arbitrary source stack
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }

    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, config::ConfigError> {
        Self::from_builder(config::Config::builder().add_source(File::from_str(yaml, FileFormat::Yaml)))
    }

    /// Socket address to bind
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Version string reported by the version endpoints
    pub fn service_version(&self) -> String {
        self.service_version
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
    }

    /// Artifact locations and release source
    pub fn artifacts(&self) -> ArtifactsConfig {
        ArtifactsConfig {
            model_path: self.model_path.clone(),
            vectorizer_path: self.vectorizer_path.clone(),
            source: ArtifactSource::new(&self.model_base_url, &self.model_repo, &self.model_version),
            download_timeout_secs: self.download_timeout_secs,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_model_version() -> String {
    LATEST_VERSION.to_string()
}

fn default_model_repo() -> String {
    ArtifactSource::default().repository
}

fn default_model_base_url() -> String {
    ArtifactSource::default().base_url
}

fn default_model_path() -> PathBuf {
    ArtifactsConfig::default().model_path
}

fn default_vectorizer_path() -> PathBuf {
    ArtifactsConfig::default().vectorizer_path
}

fn default_download_timeout_secs() -> u64 {
    ArtifactsConfig::default().download_timeout_secs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_yaml("").unwrap();
        assert_eq!(config.port, 5001);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.model_version, "latest");
        assert_eq!(config.model_repo, "remla25-team2/model-training");
        assert_eq!(config.model_path, PathBuf::from("models/SentimentModel.json"));
        assert_eq!(
            config.vectorizer_path,
            PathBuf::from("bow/c1_BoW_Sentiment_Model.json")
        );
        assert_eq!(config.service_version(), env!("CARGO_PKG_VERSION"));
        assert_eq!(config.listen_addr().unwrap().port(), 5001);
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = r#"
port: 8080
model_version: "2.3.0"
model_repo: org/model-training
service_version: 1.4.2-rc.1
model_path: /srv/models/SentimentModel.json
"#;

        let config = ServiceConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.service_version(), "1.4.2-rc.1");

        let artifacts = config.artifacts();
        assert_eq!(artifacts.model_path, PathBuf::from("/srv/models/SentimentModel.json"));
        assert_eq!(
            artifacts.source.url_for("SentimentModel.json").unwrap(),
            "https://github.com/org/model-training/releases/download/v2.3.0/SentimentModel.json"
        );
    }

    #[test]
    fn test_string_port_is_accepted() {
        // Environment values always arrive as strings
        let config = ServiceConfig::from_builder(
            config::Config::builder().set_override("port", "6000").unwrap(),
        )
        .unwrap();
        assert_eq!(config.port, 6000);
    }

    #[test]
    fn test_blank_service_version_falls_back() {
        let config = ServiceConfig {
            service_version: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(config.service_version(), env!("CARGO_PKG_VERSION"));
    }
}
