//! Recommender configuration

use revsense_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Products drawn from the positive pool when anonymous sentiment is not positive
pub const DEFAULT_EXPLORATION_SAMPLE_SIZE: usize = 100;

/// Added to the similarity sum in the collaborative-filtering denominator
pub const SIMILARITY_EPSILON: f64 = 1e-9;

pub const DEFAULT_KNOWN_USER_TOP_K: usize = 10;

pub const DEFAULT_ANONYMOUS_TOP_K: usize = 5;

pub const DEFAULT_LABEL_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderConfig {
    /// Result size for known users
    #[serde(default = "default_known_user_top_k")]
    pub known_user_top_k: usize,

    /// Result size for cold-start and anonymous requests
    #[serde(default = "default_anonymous_top_k")]
    pub anonymous_top_k: usize,

    /// Exploration sample size for non-positive anonymous sentiment
    #[serde(default = "default_exploration_sample_size")]
    pub exploration_sample_size: usize,

    /// Fixed seed for exploration sampling; unset draws from OS entropy
    #[serde(default)]
    pub sampling_seed: Option<u64>,

    #[serde(default = "default_similarity_epsilon")]
    pub similarity_epsilon: f64,

    /// Most recent observations kept when building a snapshot
    #[serde(default = "default_max_observations")]
    pub max_observations: usize,

    /// Most recent seen products used to score a known user
    #[serde(default = "default_max_seen_items")]
    pub max_seen_items: usize,

    /// Snapshot rebuild period for the refresh job
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Reviews classified per batch when labeling
    #[serde(default = "default_label_batch_size")]
    pub label_batch_size: usize,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            known_user_top_k: default_known_user_top_k(),
            anonymous_top_k: default_anonymous_top_k(),
            exploration_sample_size: default_exploration_sample_size(),
            sampling_seed: None,
            similarity_epsilon: default_similarity_epsilon(),
            max_observations: default_max_observations(),
            max_seen_items: default_max_seen_items(),
            refresh_interval_secs: default_refresh_interval_secs(),
            label_batch_size: default_label_batch_size(),
        }
    }
}

impl RecommenderConfig {
    /// Reject settings that would make every request fail or loop
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("known_user_top_k", self.known_user_top_k),
            ("anonymous_top_k", self.anonymous_top_k),
            ("exploration_sample_size", self.exploration_sample_size),
            ("max_observations", self.max_observations),
            ("max_seen_items", self.max_seen_items),
            ("label_batch_size", self.label_batch_size),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(Error::config(format!("{name} must be greater than zero")));
        }
        if self.refresh_interval_secs == 0 {
            return Err(Error::config("refresh_interval_secs must be greater than zero"));
        }
        if !(self.similarity_epsilon.is_finite() && self.similarity_epsilon > 0.0) {
            return Err(Error::config("similarity_epsilon must be a small positive number"));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

fn default_known_user_top_k() -> usize {
    DEFAULT_KNOWN_USER_TOP_K
}

fn default_anonymous_top_k() -> usize {
    DEFAULT_ANONYMOUS_TOP_K
}

fn default_exploration_sample_size() -> usize {
    DEFAULT_EXPLORATION_SAMPLE_SIZE
}

fn default_similarity_epsilon() -> f64 {
    SIMILARITY_EPSILON
}

fn default_max_observations() -> usize {
    1_000_000
}

fn default_max_seen_items() -> usize {
    200
}

fn default_refresh_interval_secs() -> u64 {
    300
}

fn default_label_batch_size() -> usize {
    DEFAULT_LABEL_BATCH_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RecommenderConfig::default();
        assert_eq!(config.known_user_top_k, 10);
        assert_eq!(config.anonymous_top_k, 5);
        assert_eq!(config.exploration_sample_size, DEFAULT_EXPLORATION_SAMPLE_SIZE);
        assert_eq!(config.label_batch_size, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RecommenderConfig = serde_json::from_str(r#"{"sampling_seed": 7}"#).unwrap();
        assert_eq!(config.sampling_seed, Some(7));
        assert_eq!(config.anonymous_top_k, 5);
        assert_eq!(config.refresh_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = RecommenderConfig {
            anonymous_top_k: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = RecommenderConfig {
            similarity_epsilon: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
