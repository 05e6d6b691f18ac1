//! TF-IDF feature extraction for the bag-of-words backends
//!
//! Reproduces the exported vectorizer state of the training pipeline: word
//! tokens of two or more characters, optional lowercasing, n-grams joined by a
//! single space, raw or sublinear term frequency, IDF weighting and optional
//! L2 normalisation.

use regex::Regex;
use revsense_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sparse feature vector: `(column, value)` pairs sorted by column
pub type SparseFeatures = Vec<(usize, f64)>;

/// Serialized vectorizer state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerState {
    /// Term to column index
    pub vocabulary: HashMap<String, usize>,

    /// Inverse document frequency per column; absent means plain term counts
    #[serde(default)]
    pub idf: Option<Vec<f64>>,

    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),

    #[serde(default = "default_true")]
    pub lowercase: bool,

    #[serde(default)]
    pub sublinear_tf: bool,

    #[serde(default)]
    pub norm: Norm,
}

/// Output normalisation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    #[default]
    L2,
    None,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_true() -> bool {
    true
}

/// Validated TF-IDF vectorizer
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    state: VectorizerState,
    token_pattern: Regex,
}

impl TfidfVectorizer {
    /// Validate a loaded state for `backend`
    pub fn from_state(backend: &str, state: VectorizerState) -> Result<Self> {
        let n_features = state.vocabulary.len();
        if n_features == 0 {
            return Err(Error::startup(backend, "vectorizer vocabulary is empty"));
        }

        let mut columns = vec![false; n_features];
        for (term, &column) in &state.vocabulary {
            match columns.get_mut(column) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(Error::startup(
                        backend,
                        format!("vectorizer column {column} is assigned twice (term '{term}')"),
                    ))
                }
                None => {
                    return Err(Error::startup(
                        backend,
                        format!(
                            "vectorizer term '{term}' maps to column {column}, beyond {n_features} features"
                        ),
                    ))
                }
            }
        }

        if let Some(idf) = &state.idf {
            if idf.len() != n_features {
                return Err(Error::startup(
                    backend,
                    format!(
                        "vectorizer has {} idf weights for {} features",
                        idf.len(),
                        n_features
                    ),
                ));
            }
        }

        let (min_n, max_n) = state.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(Error::startup(
                backend,
                format!("invalid ngram_range ({min_n}, {max_n})"),
            ));
        }

        let token_pattern = Regex::new(r"\b\w\w+\b")
            .map_err(|e| Error::internal(format!("failed to build token pattern: {e}")))?;

        Ok(Self {
            state,
            token_pattern,
        })
    }

    /// Number of feature columns
    pub fn n_features(&self) -> usize {
        self.state.vocabulary.len()
    }

    /// Tokenize and expand to the configured n-grams
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let text = if self.state.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let tokens: Vec<&str> = self
            .token_pattern
            .find_iter(&text)
            .map(|m| m.as_str())
            .collect();

        let (min_n, max_n) = self.state.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            terms.extend(tokens.windows(n).map(|window| window.join(" ")));
        }
        terms
    }

    /// Transform text into a sparse TF-IDF vector
    pub fn transform(&self, text: &str) -> SparseFeatures {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in self.analyze(text) {
            if let Some(&column) = self.state.vocabulary.get(&term) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut features: SparseFeatures = counts
            .into_iter()
            .map(|(column, tf)| {
                let tf = if self.state.sublinear_tf {
                    1.0 + tf.ln()
                } else {
                    tf
                };
                let weight = match &self.state.idf {
                    Some(idf) => tf * idf[column],
                    None => tf,
                };
                (column, weight)
            })
            .collect();
        features.sort_by_key(|(column, _)| *column);

        if self.state.norm == Norm::L2 {
            let norm = features.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, value) in &mut features {
                    *value /= norm;
                }
            }
        }

        features
    }
}

/// Dot product of a sparse vector with a dense weight row
pub(crate) fn sparse_dot(features: &[(usize, f64)], weights: &[f64]) -> f64 {
    features
        .iter()
        .map(|(column, value)| value * weights[*column])
        .sum()
}
