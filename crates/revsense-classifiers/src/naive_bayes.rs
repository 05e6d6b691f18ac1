//! Multinomial naive Bayes backend over TF-IDF features

use crate::artifacts::ArtifactStore;
use crate::classifier::{
    argmax, softmax, BackendKind, ClassificationMetadata, ClassificationResult, Classifier,
};
use crate::labels::LabelDecoder;
use crate::vectorizer::{sparse_dot, TfidfVectorizer, VectorizerState};
use revsense_core::{Error, Result, SentimentLabel};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// Exported model parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayesParams {
    /// Log prior per class
    pub class_log_prior: Vec<f64>,

    /// Log probability of each feature given the class, `[classes][features]`
    pub feature_log_prob: Vec<Vec<f64>>,
}

pub struct NaiveBayesClassifier {
    name: String,
    vectorizer: TfidfVectorizer,
    params: NaiveBayesParams,
    labels: LabelDecoder,
}

impl NaiveBayesClassifier {
    /// Assemble a backend from already-loaded parts, validating their shapes
    pub fn new(
        name: impl Into<String>,
        vectorizer: TfidfVectorizer,
        params: NaiveBayesParams,
        labels: LabelDecoder,
    ) -> Result<Self> {
        let name = name.into();
        let classes = params.class_log_prior.len();

        if params.feature_log_prob.len() != classes {
            return Err(Error::startup(
                &name,
                format!(
                    "class_log_prior has {} classes but feature_log_prob has {} rows",
                    classes,
                    params.feature_log_prob.len()
                ),
            ));
        }
        labels.expect_classes(&name, classes)?;

        let n_features = vectorizer.n_features();
        if let Some(row) = params
            .feature_log_prob
            .iter()
            .find(|row| row.len() != n_features)
        {
            return Err(Error::startup(
                &name,
                format!(
                    "feature_log_prob row has {} columns, vectorizer has {} features",
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

    /// Load vectorizer, parameters and label decoder from an artifact store
    pub fn from_artifacts(
        store: &ArtifactStore,
        vectorizer: &Path,
        model: &Path,
        labels: &Path,
    ) -> Result<Self> {
        let name = store.backend();
        let state: VectorizerState = store.read_json(vectorizer)?;
        let params: NaiveBayesParams = store.read_json(model)?;
        let classes: Vec<String> = store.read_json(labels)?;

        let vectorizer = TfidfVectorizer::from_state(name, state)?;
        let labels = LabelDecoder::from_classes(name, &classes)?;
        Self::new(name, vectorizer, params, labels)
    }

    /// Joint log likelihood per class
    fn joint_log_likelihood(&self, text: &str) -> Vec<f64> {
        let features = self.vectorizer.transform(text);
        self.params
            .class_log_prior
            .iter()
            .zip(&self.params.feature_log_prob)
            .map(|(prior, row)| prior + sparse_dot(&features, row))
            .collect()
    }
}

impl Classifier for NaiveBayesClassifier {
    fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();

        let jll = self.joint_log_likelihood(text);
        let index = argmax(&jll)
            .ok_or_else(|| Error::classifier("naive Bayes model has no classes"))?;
        let probabilities = softmax(&jll);

        Ok(ClassificationResult {
            label: self.labels.decode(index)?,
            score: probabilities[index] as f32,
            metadata: ClassificationMetadata {
                backend: Some(self.name.clone()),
                all_scores: Some(self.labels.zip_scores(&probabilities)),
                ..Default::default()
            },
            latency_us: start.elapsed().as_micros() as u64,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::NaiveBayes
    }

    fn labels(&self) -> &[SentimentLabel] {
        self.labels.labels()
    }
}
