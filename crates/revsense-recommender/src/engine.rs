//! Recommendation engine
//!
//! Known users with a seen set are scored by item-based collaborative
//! filtering over the current snapshot. Everyone else (anonymous requests,
//! unknown users, users without history) gets sentiment-filtered
//! popularity: a positive sentiment ranks the whole positive pool, any other
//! sentiment ranks an exploration sample of it.

use crate::config::RecommenderConfig;
use crate::sampling::SamplingPolicy;
use crate::snapshot::{Snapshot, SnapshotHandle};
use crate::store::RecommendationStore;
use revsense_classifiers::SharedRegistry;
use revsense_core::{
    Error, ProductId, Recommendation, RecommendationResult, RecommendationStrategy, Result,
    SentimentLabel, UserId,
};
use std::collections::HashSet;
use tracing::{debug, info};

/// One recommendation request
#[derive(Debug, Clone, Default)]
pub struct RecommendRequest {
    /// Known user to personalise for
    pub user_id: Option<UserId>,

    /// Free text to classify for anonymous and cold-start requests
    pub text: Option<String>,

    /// Classifier backend; the registry default when unset
    pub backend: Option<String>,

    /// Result size; the mode default when unset
    pub k: Option<i64>,
}

impl RecommendRequest {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn for_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn with_k(mut self, k: i64) -> Self {
        self.k = Some(k);
        self
    }
}

pub struct Recommender {
    registry: SharedRegistry,
    snapshots: SnapshotHandle,
    config: RecommenderConfig,
    sampling: SamplingPolicy,
}

impl Recommender {
    pub fn new(
        registry: SharedRegistry,
        snapshots: SnapshotHandle,
        config: RecommenderConfig,
    ) -> Result<Self> {
        config.validate()?;
        let sampling = SamplingPolicy::new(config.exploration_sample_size, config.sampling_seed);
        Ok(Self {
            registry,
            snapshots,
            config,
            sampling,
        })
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    pub fn snapshots(&self) -> &SnapshotHandle {
        &self.snapshots
    }

    /// Produce a ranked recommendation for a known user or free text
    pub fn recommend(&self, request: &RecommendRequest) -> Result<RecommendationResult> {
        // one snapshot for the whole computation
        let snapshot = self.snapshots.load();
        self.recommend_on(&snapshot, request)
    }

    fn recommend_on(
        &self,
        snapshot: &Snapshot,
        request: &RecommendRequest,
    ) -> Result<RecommendationResult> {
        let k = validate_k(request.k)?;
        if let Some(backend) = &request.backend {
            self.registry.registry().get(backend)?;
        }

        let result = match &request.user_id {
            Some(user) if snapshot.matrix().row(user).is_some_and(|row| !row.is_empty()) => {
                self.known_user(snapshot, user, k.unwrap_or(self.config.known_user_top_k))
            }
            user => {
                if let Some(user) = user {
                    debug!(user = %user, "no history for user, using cold-start ranking");
                }
                self.anonymous(
                    snapshot,
                    request.text.as_deref(),
                    request.backend.as_deref(),
                    k.unwrap_or(self.config.anonymous_top_k),
                )?
            }
        };

        metrics::counter!("revsense_recommendations_total", "strategy" => result.strategy.as_str())
            .increment(1);
        Ok(result)
    }

    /// Collaborative filtering over the user's seen set, or positive
    /// popularity outside it when the similarity matrix is degenerate
    fn known_user(&self, snapshot: &Snapshot, user: &UserId, k: usize) -> RecommendationResult {
        let matrix = snapshot.matrix();
        let similarity = snapshot.similarity();
        let seen = self.capped_seen_set(snapshot, user);

        if similarity.is_empty() {
            debug!(user = %user, "similarity matrix is degenerate, ranking by popularity");
            let excluded: HashSet<&ProductId> = matrix.seen_products(user).into_iter().collect();
            return RecommendationResult {
                user_sentiment: None,
                ranked_product_ids: snapshot.popularity().top_excluding(&excluded, k),
                is_cold_start: false,
                strategy: RecommendationStrategy::PopularityFallback,
            };
        }

        let all_seen: HashSet<&ProductId> = matrix.seen_products(user).into_iter().collect();
        let mut scored: Vec<(f64, &ProductId)> = matrix
            .products()
            .iter()
            .filter(|candidate| !all_seen.contains(candidate))
            .map(|candidate| {
                let (weighted, total) = seen.iter().fold((0.0, 0.0), |(w, t), (item, pref)| {
                    let sim = similarity.similarity(candidate, item);
                    (w + sim * pref, t + sim.abs())
                });
                let score = if total == 0.0 {
                    0.0
                } else {
                    weighted / (total + self.config.similarity_epsilon)
                };
                (score, candidate)
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        info!(
            user = %user,
            seen = seen.len(),
            candidates = scored.len(),
            "collaborative filtering"
        );

        RecommendationResult {
            user_sentiment: None,
            ranked_product_ids: scored
                .into_iter()
                .take(k)
                .map(|(_, product)| product.clone())
                .collect(),
            is_cold_start: false,
            strategy: RecommendationStrategy::CollaborativeFiltering,
        }
    }

    /// Seen products with preferences, capped to the most recent
    /// `max_seen_items`
    fn capped_seen_set<'a>(
        &self,
        snapshot: &'a Snapshot,
        user: &UserId,
    ) -> Vec<(&'a ProductId, f64)> {
        let matrix = snapshot.matrix();
        let Some(row) = matrix.row(user) else {
            return Vec::new();
        };

        let mut seen: Vec<_> = row
            .iter()
            .map(|(idx, cell)| (&matrix.products()[*idx], cell))
            .collect();
        if seen.len() > self.config.max_seen_items {
            seen.sort_by(|a, b| {
                b.1.last_seen
                    .cmp(&a.1.last_seen)
                    .then_with(|| a.0.cmp(b.0))
            });
            seen.truncate(self.config.max_seen_items);
        }

        seen.into_iter()
            .map(|(product, cell)| (product, cell.preference))
            .collect()
    }

    /// Sentiment-filtered popularity
    fn anonymous(
        &self,
        snapshot: &Snapshot,
        text: Option<&str>,
        backend: Option<&str>,
        k: usize,
    ) -> Result<RecommendationResult> {
        let popularity = snapshot.popularity();

        let sentiment = match text {
            Some(text) => Some(self.registry.classify(text, backend)?.label),
            None => None,
        };

        let pool = popularity.pool();
        let candidates = match sentiment {
            Some(label) if !label.is_positive() => self.sampling.sample(&pool),
            _ => pool,
        };

        debug!(
            sentiment = sentiment.map(SentimentLabel::as_str),
            candidates = candidates.len(),
            "sentiment popularity"
        );

        Ok(RecommendationResult {
            user_sentiment: sentiment,
            ranked_product_ids: popularity.rank(&candidates, k),
            is_cold_start: true,
            strategy: RecommendationStrategy::SentimentPopularity,
        })
    }

    /// Recompute and store the recommendations of one user
    pub fn refresh_user(
        &self,
        user: &UserId,
        store: &dyn RecommendationStore,
    ) -> Result<Vec<Recommendation>> {
        let snapshot = self.snapshots.load();
        self.refresh_user_on(&snapshot, user, store)
    }

    fn refresh_user_on(
        &self,
        snapshot: &Snapshot,
        user: &UserId,
        store: &dyn RecommendationStore,
    ) -> Result<Vec<Recommendation>> {
        let result = self.recommend_on(snapshot, &RecommendRequest::for_user(user.clone()))?;
        let rows = result.to_rows(user);
        store.replace(user, rows.clone())?;
        Ok(rows)
    }

    /// Recompute and store the recommendations of every user in the snapshot.
    ///
    /// Every user is ranked against the snapshot current at the start of the
    /// run, even when a newer one is published meanwhile.
    pub fn refresh_all(&self, store: &dyn RecommendationStore) -> Result<usize> {
        let snapshot = self.snapshots.load();
        let users = snapshot.matrix().users();

        for user in users {
            self.refresh_user_on(&snapshot, user, store)?;
        }

        info!(users = users.len(), "refreshed stored recommendations");
        Ok(users.len())
    }
}

/// `None` means the mode default; anything below 1 is rejected
fn validate_k(k: Option<i64>) -> Result<Option<usize>> {
    match k {
        None => Ok(None),
        Some(k) if k <= 0 => Err(Error::invalid_argument(format!(
            "k must be a positive integer, got {k}"
        ))),
        Some(k) => usize::try_from(k)
            .map(Some)
            .map_err(|_| Error::invalid_argument(format!("k is too large: {k}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_k() {
        assert_eq!(validate_k(None).unwrap(), None);
        assert_eq!(validate_k(Some(3)).unwrap(), Some(3));
        assert!(matches!(validate_k(Some(0)), Err(Error::InvalidArgument(_))));
        assert!(matches!(validate_k(Some(-4)), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_request_builders() {
        let request = RecommendRequest::for_text("great")
            .with_backend("nb")
            .with_k(3);
        assert_eq!(request.text.as_deref(), Some("great"));
        assert_eq!(request.backend.as_deref(), Some("nb"));
        assert_eq!(request.k, Some(3));
        assert!(request.user_id.is_none());
    }
}
