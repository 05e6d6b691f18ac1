//! Label decoding for model outputs

use revsense_core::{Error, Result, SentimentLabel};

/// Fixed mapping from a model's class index to a sentiment label.
///
/// Built from the exported label encoder classes, in encoder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDecoder {
    labels: Vec<SentimentLabel>,
}

impl LabelDecoder {
    /// Build a decoder from raw class names as exported by the training run
    pub fn from_classes(backend: &str, classes: &[String]) -> Result<Self> {
        let labels = classes
            .iter()
            .map(|class| {
                class.parse::<SentimentLabel>().map_err(|_| {
                    Error::startup(backend, format!("label decoder has unknown class '{class}'"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(backend, labels)
    }

    /// Build a decoder from already-typed labels
    pub fn new(backend: &str, labels: Vec<SentimentLabel>) -> Result<Self> {
        if !(2..=3).contains(&labels.len()) {
            return Err(Error::startup(
                backend,
                format!("label decoder must have 2 or 3 classes, found {}", labels.len()),
            ));
        }

        for (idx, label) in labels.iter().enumerate() {
            if labels[..idx].contains(label) {
                return Err(Error::startup(
                    backend,
                    format!("label decoder lists '{label}' more than once"),
                ));
            }
        }

        Ok(Self { labels })
    }

    /// Fail unless the model produces exactly as many classes as the decoder knows
    pub fn expect_classes(&self, backend: &str, classes: usize) -> Result<()> {
        if classes != self.labels.len() {
            return Err(Error::startup(
                backend,
                format!(
                    "label count mismatch: model produces {} classes, decoder has {}",
                    classes,
                    self.labels.len()
                ),
            ));
        }
        Ok(())
    }

    /// Decode a class index
    pub fn decode(&self, index: usize) -> Result<SentimentLabel> {
        self.labels.get(index).copied().ok_or_else(|| {
            Error::classifier(format!(
                "class index {index} outside decoder range 0..{}",
                self.labels.len()
            ))
        })
    }

    /// Pair every class with a score, in decoder order
    pub fn zip_scores(&self, scores: &[f64]) -> Vec<(SentimentLabel, f32)> {
        self.labels
            .iter()
            .copied()
            .zip(scores.iter().map(|s| *s as f32))
            .collect()
    }

    pub fn labels(&self) -> &[SentimentLabel] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
