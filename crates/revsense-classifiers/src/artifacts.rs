//! Artifact resolution for pre-trained backends
//!
//! Backends are produced by offline training runs and consumed here as
//! immutable files: vectorizer state, model parameters, label decoders,
//! tokenizers and weights. Every lookup failure is reported as a
//! `StartupFailure` for the backend that asked for the file.

use hf_hub::{api::sync::Api, Repo, RepoType};
use revsense_core::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a backend's artifacts live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Directory on the local file system
    LocalDir(PathBuf),

    /// Model repository on the Hugging Face Hub
    HuggingFace {
        repo_id: String,
        revision: Option<String>,
    },
}

/// Device type for tensor inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// CPU inference (always available)
    Cpu,
    /// CUDA GPU inference (if available)
    Cuda(usize),
    /// Metal (Apple Silicon)
    Metal(usize),
}

impl Default for DeviceType {
    fn default() -> Self {
        Self::Cpu
    }
}

/// Resolves and reads the artifacts of a single backend
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    backend: String,
    source: ArtifactSource,
}

impl ArtifactStore {
    pub fn new(backend: impl Into<String>, source: ArtifactSource) -> Self {
        Self {
            backend: backend.into(),
            source,
        }
    }

    /// Artifacts in a local directory
    pub fn local(backend: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self::new(backend, ArtifactSource::LocalDir(dir.into()))
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn source(&self) -> &ArtifactSource {
        &self.source
    }

    /// Resolve an artifact to a readable local path
    pub fn resolve(&self, file: &Path) -> Result<PathBuf> {
        match &self.source {
            ArtifactSource::LocalDir(dir) => {
                let path = if file.is_absolute() {
                    file.to_path_buf()
                } else {
                    dir.join(file)
                };

                if !path.is_file() {
                    return Err(Error::startup(
                        &self.backend,
                        format!("required artifact not found: {}", path.display()),
                    ));
                }
                Ok(path)
            }
            ArtifactSource::HuggingFace { repo_id, revision } => {
                let filename = file.to_str().ok_or_else(|| {
                    Error::startup(
                        &self.backend,
                        format!("artifact name is not valid UTF-8: {}", file.display()),
                    )
                })?;

                let api = Api::new().map_err(|e| {
                    Error::startup(&self.backend, format!("failed to initialize HF API: {e}"))
                })?;

                let repo = api.repo(Repo::with_revision(
                    repo_id.clone(),
                    RepoType::Model,
                    revision.clone().unwrap_or_else(|| "main".to_string()),
                ));

                debug!(backend = %self.backend, repo = %repo_id, file = filename, "fetching artifact");

                repo.get(filename).map_err(|e| {
                    Error::startup(
                        &self.backend,
                        format!("failed to download {filename} from {repo_id}: {e}"),
                    )
                })
            }
        }
    }

    /// Resolve and parse a JSON artifact
    pub fn read_json<T: DeserializeOwned>(&self, file: &Path) -> Result<T> {
        let path = self.resolve(file)?;
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::startup(
                &self.backend,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::startup(
                &self.backend,
                format!("artifact {} does not match the expected schema: {e}", path.display()),
            )
        })
    }
}
