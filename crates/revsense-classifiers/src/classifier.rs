//! Classifier trait and common types

use revsense_core::{Result, SentimentLabel};
use serde::{Deserialize, Serialize};

/// Trait implemented by every sentiment backend.
///
/// Implementations are pure: the same text against the same loaded
/// artifacts always yields the same result.
pub trait Classifier: Send + Sync {
    /// Classify the given text
    fn classify(&self, text: &str) -> Result<ClassificationResult>;

    /// Get the backend name
    fn name(&self) -> &str;

    /// Get the backend family
    fn kind(&self) -> BackendKind;

    /// Labels this backend can produce, in decoder order
    fn labels(&self) -> &[SentimentLabel];
}

/// Backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// TF-IDF features with a multinomial naive Bayes model
    NaiveBayes,
    /// TF-IDF features with a linear max-margin model
    LinearSvm,
    /// Tokenizer plus embedding/LSTM network
    Sequence,
    /// Keyword lexicon, no artifacts
    Lexicon,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NaiveBayes => "naive-bayes",
            Self::LinearSvm => "linear-svm",
            Self::Sequence => "sequence",
            Self::Lexicon => "lexicon",
        }
    }
}

/// Result of classification
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// Decoded label
    pub label: SentimentLabel,

    /// Confidence of the chosen label (0.0-1.0)
    pub score: f32,

    /// Additional metadata
    pub metadata: ClassificationMetadata,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Create a new classification result
    pub fn new(label: SentimentLabel, score: f32) -> Self {
        Self {
            label,
            score,
            metadata: ClassificationMetadata::default(),
            latency_us: 0,
        }
    }

    /// Result for text that carries no content
    pub fn empty_text() -> Self {
        let mut result = Self::new(SentimentLabel::Neutral, 1.0);
        result.metadata.short_circuited = true;
        result
    }

    /// Check if score exceeds threshold
    pub fn exceeds_threshold(&self, threshold: f32) -> bool {
        self.score >= threshold
    }
}

/// Metadata about classification
#[derive(Debug, Clone, Default)]
pub struct ClassificationMetadata {
    /// Backend that produced the result
    pub backend: Option<String>,

    /// All class scores, in decoder order
    pub all_scores: Option<Vec<(SentimentLabel, f32)>>,

    /// True when no backend was invoked (empty input)
    pub short_circuited: bool,
}

/// Index of the largest value; the first index wins ties.
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Numerically stable softmax
pub(crate) fn softmax(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![1.0 / values.len().max(1) as f64; values.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

pub(crate) fn sigmoid(value: f64) -> f64 {
    1.0 / (1.0 + (-value).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_first_wins_ties() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), Some(1));
        assert_eq!(argmax(&[-3.0, -1.0, -2.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let total: f64 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_empty_text_result() {
        let result = ClassificationResult::empty_text();
        assert_eq!(result.label, SentimentLabel::Neutral);
        assert!(result.metadata.short_circuited);
        assert!(result.exceeds_threshold(0.5));
    }
}
