//! Application configuration

use revsense_classifiers::ClassifierConfig;
use revsense_recommender::{JsonLinesSource, RecommenderConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Classifier backends
    #[serde(default)]
    pub classifiers: ClassifierConfig,

    /// Ranking parameters
    #[serde(default)]
    pub recommender: RecommenderConfig,

    /// Where observations and recommendations live
    #[serde(default)]
    pub data: DataConfig,
}

impl AppConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &Path, cli: &crate::Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(observations) = &cli.observations {
            config.data.observations = observations.clone();
        }

        if let Some(catalog) = &cli.catalog {
            config.data.catalog = Some(catalog.clone());
        }

        if let Some(backend) = &cli.default_backend {
            config.classifiers.default_backend = backend.clone();
        }

        if let Some(seed) = cli.seed {
            config.recommender.sampling_seed = Some(seed);
        }

        config.recommender.validate()?;
        Ok(config)
    }
}

/// Data file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// JSON-lines file of sentiment observations
    #[serde(default = "default_observations")]
    pub observations: PathBuf,

    /// Product catalog, one id per line
    #[serde(default)]
    pub catalog: Option<PathBuf>,

    /// JSON file of stored recommendations
    #[serde(default = "default_store")]
    pub store: PathBuf,
}

impl DataConfig {
    pub fn source(&self) -> JsonLinesSource {
        let source = JsonLinesSource::new(&self.observations);
        match &self.catalog {
            Some(catalog) => source.with_catalog(catalog),
            None => source,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            observations: default_observations(),
            catalog: None,
            store: default_store(),
        }
    }
}

fn default_observations() -> PathBuf {
    PathBuf::from("./data/observations.jsonl")
}

fn default_store() -> PathBuf {
    PathBuf::from("./data/recommendations.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from(["revsense", "refresh"]);

        let config = AppConfig::load(&dir.path().join("absent.yaml"), &cli).unwrap();
        assert_eq!(config.classifiers.default_backend, "lexicon");
        assert_eq!(config.recommender, RecommenderConfig::default());
        assert_eq!(config.data.store, PathBuf::from("./data/recommendations.json"));
    }

    #[test]
    fn test_file_values_and_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revsense.yaml");
        std::fs::write(
            &path,
            r#"
recommender:
  anonymous_top_k: 3
  exploration_sample_size: 50
data:
  observations: /var/lib/revsense/observations.jsonl
  store: /var/lib/revsense/recs.json
"#,
        )
        .unwrap();

        let cli = Cli::parse_from([
            "revsense",
            "--catalog",
            "catalog.txt",
            "--seed",
            "9",
            "classify",
            "--text",
            "great",
        ]);
        let config = AppConfig::load(&path, &cli).unwrap();

        assert_eq!(config.recommender.anonymous_top_k, 3);
        assert_eq!(config.recommender.exploration_sample_size, 50);
        assert_eq!(config.recommender.known_user_top_k, 10);
        assert_eq!(config.recommender.sampling_seed, Some(9));
        assert_eq!(
            config.data.observations,
            PathBuf::from("/var/lib/revsense/observations.jsonl")
        );
        assert_eq!(config.data.catalog, Some(PathBuf::from("catalog.txt")));
    }

    #[test]
    fn test_invalid_recommender_settings_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revsense.yaml");
        std::fs::write(&path, "recommender:\n  known_user_top_k: 0\n").unwrap();

        let cli = Cli::parse_from(["revsense", "refresh"]);
        assert!(AppConfig::load(&path, &cli).is_err());
    }
}
