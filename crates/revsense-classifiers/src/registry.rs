//! Classifier registry initialization and management

use crate::artifacts::ArtifactStore;
use crate::classifier::{ClassificationResult, Classifier};
use crate::config::{lexicon_terms, BackendSpec, ClassifierConfig};
use crate::lexicon::LexiconClassifier;
use crate::linear_svm::LinearSvmClassifier;
use crate::naive_bayes::NaiveBayesClassifier;
use revsense_core::{Error, Result, SentimentLabel};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of loading the configured backends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Backends that loaded, sorted by name
    pub loaded: Vec<String>,

    /// Backends that failed to load with the reason, sorted by name
    pub failed: Vec<(String, String)>,
}

impl InitReport {
    /// True when every configured backend loaded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Registry of loaded sentiment backends.
///
/// Loaded once at startup and read-only afterwards; wrap it in a
/// [`SharedRegistry`] to hand it to concurrent callers.
pub struct ClassifierRegistry {
    /// Backend used when a request names none
    default_backend: String,

    /// Loaded backends by name
    backends: HashMap<String, Arc<dyn Classifier>>,

    /// Configured backends that failed to load, with the reason
    failed: HashMap<String, String>,
}

impl ClassifierRegistry {
    /// Create an empty registry
    pub fn new(default_backend: impl Into<String>) -> Self {
        Self {
            default_backend: default_backend.into(),
            backends: HashMap::new(),
            failed: HashMap::new(),
        }
    }

    /// Load every configured backend.
    ///
    /// Individual failures are recorded and reported; the call itself only
    /// fails when the default backend or every backend fails to load.
    pub fn init(config: &ClassifierConfig) -> Result<(Self, InitReport)> {
        info!("Initializing {} classifier backends", config.backends.len());

        let mut registry = Self::new(config.default_backend.clone());
        let mut report = InitReport::default();

        for (name, spec) in &config.backends {
            match load_backend(name, spec, config) {
                Ok(backend) => {
                    info!(backend = %name, kind = spec.kind().as_str(), "loaded backend");
                    registry.backends.insert(name.clone(), backend);
                    report.loaded.push(name.clone());
                }
                Err(e) => {
                    warn!(backend = %name, error = %e, "failed to load backend");
                    let reason = match e {
                        Error::StartupFailure { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    registry.failed.insert(name.clone(), reason.clone());
                    report.failed.push((name.clone(), reason));
                }
            }
        }

        info!(
            "Initialized {}/{} backends",
            report.loaded.len(),
            config.backends.len()
        );

        if report.loaded.is_empty() {
            return Err(Error::startup(
                &config.default_backend,
                "no classifier backend could be loaded",
            ));
        }

        if !registry.backends.contains_key(&config.default_backend) {
            let reason = registry
                .failed
                .get(&config.default_backend)
                .cloned()
                .unwrap_or_else(|| "default backend is not configured".to_string());
            return Err(Error::startup(&config.default_backend, reason));
        }

        Ok((registry, report))
    }

    /// Load configuration from a YAML file and initialize
    pub fn from_file(path: impl AsRef<Path>) -> Result<(Self, InitReport)> {
        let config = load_config(path)?;
        Self::init(&config)
    }

    /// Register an already-built backend, replacing any previous one of that name
    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn Classifier>) {
        let name = name.into();
        debug!(backend = %name, "registering backend");
        self.failed.remove(&name);
        self.backends.insert(name, backend);
    }

    /// Remove a backend, returning it if it was loaded
    pub fn unload(&mut self, name: &str) -> Option<Arc<dyn Classifier>> {
        self.failed.remove(name);
        self.backends.remove(name)
    }

    /// Drop every backend
    pub fn clear(&mut self) {
        self.backends.clear();
        self.failed.clear();
    }

    /// Change the default backend; it must be loaded
    pub fn set_default_backend(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.get(&name)?;
        self.default_backend = name;
        Ok(())
    }

    pub fn default_backend(&self) -> &str {
        &self.default_backend
    }

    /// Look up a backend by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Classifier>> {
        if let Some(backend) = self.backends.get(name) {
            return Ok(Arc::clone(backend));
        }

        match self.failed.get(name) {
            Some(reason) => Err(Error::BackendUnavailable {
                backend: name.to_string(),
                reason: reason.clone(),
            }),
            None => Err(Error::invalid_argument(format!(
                "unknown classifier backend '{name}'"
            ))),
        }
    }

    /// Fail unless all the named backends are loaded
    pub fn require(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.get(name)?;
        }
        Ok(())
    }

    /// Names of loaded backends, sorted
    pub fn backend_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of configured backends that failed to load, sorted
    pub fn failed_backends(&self) -> Vec<String> {
        let mut names: Vec<String> = self.failed.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    /// Get the number of loaded backends
    pub fn count(&self) -> usize {
        self.backends.len()
    }

    /// Classify text with the named backend, or the default one.
    ///
    /// Empty or whitespace-only text is neutral and never reaches a backend.
    pub fn classify(&self, text: &str, backend: Option<&str>) -> Result<ClassificationResult> {
        let name = backend.unwrap_or(&self.default_backend);
        let classifier = self.get(name)?;

        if text.trim().is_empty() {
            let mut result = ClassificationResult::empty_text();
            result.metadata.backend = Some(name.to_string());
            return Ok(result);
        }

        let result = classifier.classify(text)?;
        if !classifier.labels().contains(&result.label) {
            return Err(Error::classifier(format!(
                "backend '{name}' produced label '{}' outside its label set",
                result.label
            )));
        }

        metrics::counter!("revsense_classifications_total", "backend" => name.to_string())
            .increment(1);
        metrics::histogram!("revsense_classification_latency_us", "backend" => name.to_string())
            .record(result.latency_us as f64);

        Ok(result)
    }

    /// Classify text and keep only the label
    pub fn classify_label(&self, text: &str, backend: Option<&str>) -> Result<SentimentLabel> {
        self.classify(text, backend).map(|result| result.label)
    }
}

/// Build one backend from its configuration
pub fn load_backend(
    name: &str,
    spec: &BackendSpec,
    config: &ClassifierConfig,
) -> Result<Arc<dyn Classifier>> {
    let store = || {
        config
            .artifact_source(name)
            .map(|source| ArtifactStore::new(name, source))
            .ok_or_else(|| Error::startup(name, "backend is not configured"))
    };

    match spec {
        BackendSpec::NaiveBayes {
            vectorizer,
            model,
            labels,
            ..
        } => Ok(Arc::new(NaiveBayesClassifier::from_artifacts(
            &store()?,
            vectorizer,
            model,
            labels,
        )?)),

        BackendSpec::LinearSvm {
            vectorizer,
            model,
            labels,
            ..
        } => Ok(Arc::new(LinearSvmClassifier::from_artifacts(
            &store()?,
            vectorizer,
            model,
            labels,
        )?)),

        #[cfg(feature = "ml-models")]
        BackendSpec::Sequence {
            weights,
            tokenizer,
            config: model_config,
            labels,
            ..
        } => Ok(Arc::new(crate::sequence::SequenceClassifier::from_artifacts(
            &store()?,
            weights,
            tokenizer,
            model_config,
            labels,
            config.device_for(name),
        )?)),

        #[cfg(not(feature = "ml-models"))]
        BackendSpec::Sequence { .. } => {
            let _ = store;
            Err(Error::startup(
                name,
                "sequence backends require the 'ml-models' feature",
            ))
        }

        BackendSpec::Lexicon { positive, negative } => {
            let (positive, negative) = lexicon_terms(positive, negative);
            Ok(Arc::new(LexiconClassifier::with_terms(
                name, &positive, &negative,
            )?))
        }
    }
}

/// Load classifier configuration from file
pub fn load_config(path: impl AsRef<Path>) -> Result<ClassifierConfig> {
    ClassifierConfig::from_file(path.as_ref())
        .map_err(|e| Error::config(format!("Failed to load classifiers config: {}", e)))
}

/// Thread-safe handle to a loaded registry
pub struct SharedRegistry {
    registry: Arc<ClassifierRegistry>,
}

impl SharedRegistry {
    /// Create a new shared registry
    pub fn new(registry: ClassifierRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Get reference to the registry
    pub fn registry(&self) -> &ClassifierRegistry {
        &self.registry
    }

    pub fn classify(&self, text: &str, backend: Option<&str>) -> Result<ClassificationResult> {
        self.registry.classify(text, backend)
    }
}

impl Clone for SharedRegistry {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceSpec;
    use std::path::PathBuf;

    fn config_with_missing_nb(dir: &Path) -> ClassifierConfig {
        let mut config = ClassifierConfig::default();
        config.backends.insert(
            "nb".to_string(),
            BackendSpec::NaiveBayes {
                source: Some(SourceSpec::Local {
                    dir: dir.to_path_buf(),
                }),
                vectorizer: PathBuf::from("naive_bayes_tfidf.json"),
                model: PathBuf::from("naive_bayes_model.json"),
                labels: PathBuf::from("naive_bayes_label_encoder.json"),
            },
        );
        config
    }

    #[test]
    fn test_default_config_loads_lexicon() {
        let (registry, report) = ClassifierRegistry::init(&ClassifierConfig::default()).unwrap();
        assert!(report.is_complete());
        assert_eq!(registry.backend_names(), vec!["lexicon".to_string()]);
        assert_eq!(
            registry.classify_label("great value", None).unwrap(),
            SentimentLabel::Positive
        );
    }

    #[test]
    fn test_partial_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_missing_nb(dir.path());

        let (registry, report) = ClassifierRegistry::init(&config).unwrap();
        assert_eq!(report.loaded, vec!["lexicon".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "nb");
        assert_eq!(registry.failed_backends(), vec!["nb".to_string()]);

        let err = registry.classify("great", Some("nb")).unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable { .. }));
        assert!(registry.require(&["lexicon"]).is_ok());
        assert!(registry.require(&["lexicon", "nb"]).is_err());
    }

    #[test]
    fn test_failed_default_backend_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_missing_nb(dir.path());
        config.default_backend = "nb".to_string();

        let err = ClassifierRegistry::init(&config).err().unwrap();
        match err {
            Error::StartupFailure { backend, reason } => {
                assert_eq!(backend, "nb");
                assert!(reason.contains("naive_bayes"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unconfigured_default_backend_is_fatal() {
        let mut config = ClassifierConfig::default();
        config.default_backend = "svm".to_string();
        assert!(matches!(
            ClassifierRegistry::init(&config),
            Err(Error::StartupFailure { .. })
        ));
    }

    #[test]
    fn test_no_backends_is_fatal() {
        let mut config = ClassifierConfig::default();
        config.backends.clear();
        assert!(ClassifierRegistry::init(&config).is_err());
    }

    #[test]
    fn test_unknown_backend_is_invalid_argument() {
        let (registry, _) = ClassifierRegistry::init(&ClassifierConfig::default()).unwrap();
        let err = registry.classify("text", Some("bert")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        // empty text still validates the backend name
        let err = registry.classify("", Some("bert")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_empty_text_is_neutral() {
        let (registry, _) = ClassifierRegistry::init(&ClassifierConfig::default()).unwrap();
        let result = registry.classify("   \n", None).unwrap();
        assert_eq!(result.label, SentimentLabel::Neutral);
        assert!(result.metadata.short_circuited);
        assert_eq!(result.metadata.backend.as_deref(), Some("lexicon"));
    }

    #[test]
    fn test_register_unload_and_default() {
        let mut registry = ClassifierRegistry::new("lexicon");
        registry.register("lexicon", Arc::new(LexiconClassifier::new().unwrap()));
        registry.register("words", Arc::new(LexiconClassifier::with_name("words").unwrap()));
        assert_eq!(registry.count(), 2);

        registry.set_default_backend("words").unwrap();
        assert_eq!(registry.default_backend(), "words");
        assert!(registry.set_default_backend("missing").is_err());

        assert!(registry.unload("words").is_some());
        assert!(!registry.is_loaded("words"));
        registry.clear();
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_shared_registry_clone() {
        let (registry, _) = ClassifierRegistry::init(&ClassifierConfig::default()).unwrap();
        let shared = SharedRegistry::new(registry);
        let other = shared.clone();
        assert_eq!(
            other.classify("awful", None).unwrap().label,
            SentimentLabel::Negative
        );
        assert_eq!(shared.registry().count(), 1);
    }
}
