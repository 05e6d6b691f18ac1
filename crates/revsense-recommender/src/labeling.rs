//! Batch labeling of unlabeled reviews into sentiment observations

use chrono::{DateTime, Utc};
use revsense_classifiers::ClassifierRegistry;
use revsense_core::{Error, ProductId, Result, SentimentObservation, UserId};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// A review waiting for a sentiment label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlabeledReview {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub text: String,

    /// Review time; labeling time when absent
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Classify `reviews` in batches of `batch_size`.
///
/// The backend is resolved before any review is classified. Any classifier
/// error aborts the whole run; no default label is ever substituted.
pub fn label_reviews(
    registry: &ClassifierRegistry,
    backend: Option<&str>,
    reviews: &[UnlabeledReview],
    batch_size: usize,
) -> Result<Vec<SentimentObservation>> {
    if batch_size == 0 {
        return Err(Error::invalid_argument("batch size must be at least 1"));
    }
    let backend = backend.unwrap_or(registry.default_backend());
    registry.get(backend)?;

    let start = Instant::now();
    let total_batches = reviews.len().div_ceil(batch_size);
    let mut observations = Vec::with_capacity(reviews.len());

    for (batch_idx, batch) in reviews.chunks(batch_size).enumerate() {
        for review in batch {
            let label = registry.classify_label(&review.text, Some(backend))?;
            let timestamp = review.created_at.unwrap_or_else(Utc::now);
            observations.push(SentimentObservation::at(
                review.user_id.clone(),
                review.product_id.clone(),
                label,
                timestamp,
            ));
        }

        info!(
            batch = batch_idx + 1,
            batches = total_batches,
            labeled = observations.len(),
            total = reviews.len(),
            "labeled batch"
        );
    }

    info!(
        backend = backend,
        labeled = observations.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "labeling complete"
    );
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use revsense_classifiers::LexiconClassifier;
    use revsense_core::SentimentLabel;
    use std::sync::Arc;

    fn registry() -> ClassifierRegistry {
        let mut registry = ClassifierRegistry::new("lexicon");
        registry.register("lexicon", Arc::new(LexiconClassifier::new().unwrap()));
        registry
    }

    fn review(user: &str, product: &str, text: &str) -> UnlabeledReview {
        UnlabeledReview {
            user_id: UserId::parse(user).unwrap(),
            product_id: ProductId::parse(product).unwrap(),
            text: text.to_string(),
            created_at: None,
        }
    }

    #[test]
    fn test_labels_every_review_across_batches() {
        let reviews = vec![
            review("u1", "p1", "excellent product, love it"),
            review("u2", "p1", "terrible, broke after a day"),
            review("u3", "p2", ""),
        ];

        let observations = label_reviews(&registry(), None, &reviews, 2).unwrap();
        let labels: Vec<SentimentLabel> = observations.iter().map(|o| o.sentiment).collect();
        assert_eq!(
            labels,
            vec![
                SentimentLabel::Positive,
                SentimentLabel::Negative,
                SentimentLabel::Neutral
            ]
        );
        assert_eq!(observations[1].user_id.as_str(), "u2");
    }

    #[test]
    fn test_keeps_review_timestamp() {
        let created = Utc.with_ymd_and_hms(2023, 6, 1, 8, 30, 0).unwrap();
        let mut r = review("u1", "p1", "great");
        r.created_at = Some(created);

        let observations = label_reviews(&registry(), Some("lexicon"), &[r], 10).unwrap();
        assert_eq!(observations[0].timestamp, created);
    }

    #[test]
    fn test_rejects_zero_batch_and_unknown_backend() {
        let reviews = vec![review("u1", "p1", "great")];
        assert!(matches!(
            label_reviews(&registry(), None, &reviews, 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            label_reviews(&registry(), Some("svm"), &[], 10),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_deserializes_without_timestamp() {
        let review: UnlabeledReview =
            serde_json::from_str(r#"{"user_id":"u1","product_id":"p1","text":"ok"}"#).unwrap();
        assert!(review.created_at.is_none());
    }
}
