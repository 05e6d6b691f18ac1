//! Linear max-margin backend over TF-IDF features

use crate::artifacts::ArtifactStore;
use crate::classifier::{
    argmax, sigmoid, softmax, BackendKind, ClassificationMetadata, ClassificationResult,
    Classifier,
};
use crate::labels::LabelDecoder;
use crate::vectorizer::{sparse_dot, TfidfVectorizer, VectorizerState};
use revsense_core::{Error, Result, SentimentLabel};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// Exported decision function parameters.
///
/// A single row is a binary model whose positive margin selects class 1;
/// otherwise there is one one-vs-rest row per class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvmParams {
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

pub struct LinearSvmClassifier {
    name: String,
    vectorizer: TfidfVectorizer,
    params: LinearSvmParams,
    labels: LabelDecoder,
}

impl LinearSvmClassifier {
    pub fn new(
        name: impl Into<String>,
        vectorizer: TfidfVectorizer,
        params: LinearSvmParams,
        labels: LabelDecoder,
    ) -> Result<Self> {
        let name = name.into();
        let rows = params.coef.len();

        if rows == 0 || params.intercept.len() != rows {
            return Err(Error::startup(
                &name,
                format!(
                    "coef has {} rows but intercept has {} entries",
                    rows,
                    params.intercept.len()
                ),
            ));
        }

        let classes = if rows == 1 { 2 } else { rows };
        labels.expect_classes(&name, classes)?;

        let n_features = vectorizer.n_features();
        if let Some(row) = params.coef.iter().find(|row| row.len() != n_features) {
            return Err(Error::startup(
                &name,
                format!(
                    "coef row has {} columns, vectorizer has {} features",
                    row.len(),
                    n_features
                ),
            ));
        }

        Ok(Self {
            name,
            vectorizer,
            params,
            labels,
        })
    }

    pub fn from_artifacts(
        store: &ArtifactStore,
        vectorizer: &Path,
        model: &Path,
        labels: &Path,
    ) -> Result<Self> {
        let name = store.backend();
        let state: VectorizerState = store.read_json(vectorizer)?;
        let params: LinearSvmParams = store.read_json(model)?;
        let classes: Vec<String> = store.read_json(labels)?;

        let vectorizer = TfidfVectorizer::from_state(name, state)?;
        let labels = LabelDecoder::from_classes(name, &classes)?;
        Self::new(name, vectorizer, params, labels)
    }

    /// Signed margin per decision row
    fn decision_function(&self, text: &str) -> Vec<f64> {
        let features = self.vectorizer.transform(text);
        self.params
            .coef
            .iter()
            .zip(&self.params.intercept)
            .map(|(row, bias)| sparse_dot(&features, row) + bias)
            .collect()
    }
}

impl Classifier for LinearSvmClassifier {
    fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();
        let decisions = self.decision_function(text);

        let (index, scores) = if let [margin] = decisions.as_slice() {
            let p = sigmoid(*margin);
            (usize::from(*margin > 0.0), vec![1.0 - p, p])
        } else {
            let index = argmax(&decisions)
                .ok_or_else(|| Error::classifier("linear model has no decision rows"))?;
            (index, softmax(&decisions))
        };

        Ok(ClassificationResult {
            label: self.labels.decode(index)?,
            score: scores[index] as f32,
            metadata: ClassificationMetadata {
                backend: Some(self.name.clone()),
                all_scores: Some(self.labels.zip_scores(&scores)),
                ..Default::default()
            },
            latency_us: start.elapsed().as_micros() as u64,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::LinearSvm
    }

    fn labels(&self) -> &[SentimentLabel] {
        self.labels.labels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::Norm;

    fn vectorizer() -> TfidfVectorizer {
        TfidfVectorizer::from_state(
            "svm",
            VectorizerState {
                vocabulary: [("love".to_string(), 0), ("broken".to_string(), 1)]
                    .into_iter()
                    .collect(),
                idf: Some(vec![1.2, 1.5]),
                ngram_range: (1, 2),
                lowercase: true,
                sublinear_tf: true,
                norm: Norm::L2,
            },
        )
        .unwrap()
    }

    fn binary_labels() -> LabelDecoder {
        LabelDecoder::new(
            "svm",
            vec![SentimentLabel::Negative, SentimentLabel::Positive],
        )
        .unwrap()
    }

    #[test]
    fn test_binary_margin() {
        let params = LinearSvmParams {
            coef: vec![vec![2.0, -2.0]],
            intercept: vec![0.1],
        };
        let classifier = LinearSvmClassifier::new("svm", vectorizer(), params, binary_labels()).unwrap();

        let result = classifier.classify("I love it").unwrap();
        assert_eq!(result.label, SentimentLabel::Positive);
        assert!(result.score > 0.5);

        let result = classifier.classify("arrived broken").unwrap();
        assert_eq!(result.label, SentimentLabel::Negative);
        assert!(result.score > 0.5);

        // no known terms: the intercept alone decides
        assert_eq!(
            classifier.classify("no opinion").unwrap().label,
            SentimentLabel::Positive
        );
    }

    #[test]
    fn test_binary_zero_margin_is_class_zero() {
        let params = LinearSvmParams {
            coef: vec![vec![1.0, -1.0]],
            intercept: vec![0.0],
        };
        let classifier = LinearSvmClassifier::new("svm", vectorizer(), params, binary_labels()).unwrap();
        assert_eq!(
            classifier.classify("nothing here").unwrap().label,
            SentimentLabel::Negative
        );
    }

    #[test]
    fn test_one_vs_rest() {
        let params = LinearSvmParams {
            coef: vec![vec![-1.0, 1.0], vec![0.0, 0.0], vec![1.0, -1.0]],
            intercept: vec![0.0, 0.2, 0.0],
        };
        let labels = LabelDecoder::new("svm", SentimentLabel::ALL.to_vec()).unwrap();
        let classifier = LinearSvmClassifier::new("svm", vectorizer(), params, labels).unwrap();

        assert_eq!(classifier.classify("love").unwrap().label, SentimentLabel::Positive);
        assert_eq!(classifier.classify("broken").unwrap().label, SentimentLabel::Negative);
        assert_eq!(classifier.classify("meh").unwrap().label, SentimentLabel::Neutral);
    }

    #[test]
    fn test_binary_model_requires_two_labels() {
        let params = LinearSvmParams {
            coef: vec![vec![1.0, -1.0]],
            intercept: vec![0.0],
        };
        let labels = LabelDecoder::new("svm", SentimentLabel::ALL.to_vec()).unwrap();
        let err = LinearSvmClassifier::new("svm", vectorizer(), params, labels)
            .err()
            .unwrap();
        assert!(matches!(err, Error::StartupFailure { .. }));
    }
}
