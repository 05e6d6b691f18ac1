//! Configuration for classifier backends

use crate::artifacts::{ArtifactSource, DeviceType};
use crate::classifier::BackendKind;
use crate::lexicon::{DEFAULT_NEGATIVE_TERMS, DEFAULT_POSITIVE_TERMS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Configuration for all classifier backends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Backend used when a request names none
    #[serde(default = "default_backend")]
    pub default_backend: String,

    /// Backend configurations by name
    #[serde(default = "default_backends")]
    pub backends: BTreeMap<String, BackendSpec>,

    /// Default device for tensor backends
    #[serde(default)]
    pub default_device: DeviceSpec,

    /// Directory holding local artifacts when a backend names no source
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
}

/// Backend configuration, tagged by backend family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BackendSpec {
    NaiveBayes {
        #[serde(default)]
        source: Option<SourceSpec>,
        #[serde(default = "nb_vectorizer")]
        vectorizer: PathBuf,
        #[serde(default = "nb_model")]
        model: PathBuf,
        #[serde(default = "nb_labels")]
        labels: PathBuf,
    },

    LinearSvm {
        #[serde(default)]
        source: Option<SourceSpec>,
        #[serde(default = "svm_vectorizer")]
        vectorizer: PathBuf,
        #[serde(default = "svm_model")]
        model: PathBuf,
        #[serde(default = "svm_labels")]
        labels: PathBuf,
    },

    Sequence {
        #[serde(default)]
        source: Option<SourceSpec>,
        #[serde(default = "seq_weights")]
        weights: PathBuf,
        #[serde(default = "seq_tokenizer")]
        tokenizer: PathBuf,
        #[serde(default = "seq_config")]
        config: PathBuf,
        #[serde(default = "seq_labels")]
        labels: PathBuf,
        /// Device override
        #[serde(default)]
        device: Option<DeviceSpec>,
    },

    Lexicon {
        #[serde(default)]
        positive: Option<Vec<String>>,
        #[serde(default)]
        negative: Option<Vec<String>>,
    },
}

/// Artifact source specification (for config files)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    /// Local directory
    Local { dir: PathBuf },

    /// Hugging Face Hub
    HuggingFace {
        repo_id: String,
        #[serde(default)]
        revision: Option<String>,
    },
}

/// Device specification (for config files)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda { index: Option<usize> },
    Metal { index: Option<usize> },
}

impl DeviceSpec {
    /// Convert to DeviceType
    pub fn to_device_type(&self) -> DeviceType {
        match self {
            DeviceSpec::Cpu => DeviceType::Cpu,
            DeviceSpec::Cuda { index } => DeviceType::Cuda(index.unwrap_or(0)),
            DeviceSpec::Metal { index } => DeviceType::Metal(index.unwrap_or(0)),
        }
    }
}

impl BackendSpec {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::NaiveBayes { .. } => BackendKind::NaiveBayes,
            Self::LinearSvm { .. } => BackendKind::LinearSvm,
            Self::Sequence { .. } => BackendKind::Sequence,
            Self::Lexicon { .. } => BackendKind::Lexicon,
        }
    }

    /// Configured artifact source, if the backend has artifacts at all
    pub fn source(&self) -> Option<&SourceSpec> {
        match self {
            Self::NaiveBayes { source, .. }
            | Self::LinearSvm { source, .. }
            | Self::Sequence { source, .. } => source.as_ref(),
            Self::Lexicon { .. } => None,
        }
    }

    /// Lexicon with the built-in term lists
    pub fn default_lexicon() -> Self {
        Self::Lexicon {
            positive: None,
            negative: None,
        }
    }
}

impl SourceSpec {
    pub fn to_artifact_source(&self) -> ArtifactSource {
        match self {
            SourceSpec::Local { dir } => ArtifactSource::LocalDir(dir.clone()),
            SourceSpec::HuggingFace { repo_id, revision } => ArtifactSource::HuggingFace {
                repo_id: repo_id.clone(),
                revision: revision.clone(),
            },
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            default_backend: default_backend(),
            backends: default_backends(),
            default_device: DeviceSpec::Cpu,
            models_dir: default_models_dir(),
        }
    }
}

impl ClassifierConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }

    /// Artifact source for a backend, falling back to `models_dir`
    pub fn artifact_source(&self, name: &str) -> Option<ArtifactSource> {
        let spec = self.backends.get(name)?;
        Some(
            spec.source()
                .map(SourceSpec::to_artifact_source)
                .unwrap_or_else(|| ArtifactSource::LocalDir(self.models_dir.clone())),
        )
    }

    /// Device for a backend, honouring per-backend overrides
    pub fn device_for(&self, name: &str) -> DeviceType {
        match self.backends.get(name) {
            Some(BackendSpec::Sequence {
                device: Some(device),
                ..
            }) => device.to_device_type(),
            _ => self.default_device.to_device_type(),
        }
    }

    /// Get all backend names
    pub fn backend_names(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }
}

fn default_backend() -> String {
    "lexicon".to_string()
}

fn default_backends() -> BTreeMap<String, BackendSpec> {
    BTreeMap::from([("lexicon".to_string(), BackendSpec::default_lexicon())])
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn nb_vectorizer() -> PathBuf {
    PathBuf::from("naive_bayes_tfidf.json")
}

fn nb_model() -> PathBuf {
    PathBuf::from("naive_bayes_model.json")
}

fn nb_labels() -> PathBuf {
    PathBuf::from("naive_bayes_label_encoder.json")
}

fn svm_vectorizer() -> PathBuf {
    PathBuf::from("svm_tfidf.json")
}

fn svm_model() -> PathBuf {
    PathBuf::from("svm_model.json")
}

fn svm_labels() -> PathBuf {
    PathBuf::from("svm_label_encoder.json")
}

fn seq_weights() -> PathBuf {
    PathBuf::from("lstm_model.safetensors")
}

fn seq_tokenizer() -> PathBuf {
    PathBuf::from("lstm_tokenizer.json")
}

fn seq_config() -> PathBuf {
    PathBuf::from("lstm_config.json")
}

fn seq_labels() -> PathBuf {
    PathBuf::from("lstm_label_encoder.json")
}

/// Term lists for a lexicon spec, falling back to the built-in ones
pub(crate) fn lexicon_terms(
    positive: &Option<Vec<String>>,
    negative: &Option<Vec<String>>,
) -> (Vec<String>, Vec<String>) {
    let or_default = |terms: &Option<Vec<String>>, default: &[&str]| {
        terms
            .clone()
            .unwrap_or_else(|| default.iter().map(|t| t.to_string()).collect())
    };
    (
        or_default(positive, DEFAULT_POSITIVE_TERMS),
        or_default(negative, DEFAULT_NEGATIVE_TERMS),
    )
}
