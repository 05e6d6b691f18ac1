//! Positive-observation popularity ranking

use revsense_core::{ProductId, SentimentObservation};
use std::collections::{BTreeMap, HashSet};

/// Positive observation count per product
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositivePopularity {
    counts: BTreeMap<ProductId, u32>,
}

impl PositivePopularity {
    pub fn build(observations: &[SentimentObservation]) -> Self {
        let mut counts = BTreeMap::new();
        for obs in observations {
            if obs.sentiment.is_positive() {
                *counts.entry(obs.product_id.clone()).or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    pub fn count(&self, product: &ProductId) -> u32 {
        self.counts.get(product).copied().unwrap_or(0)
    }

    /// Products with at least one positive observation, ascending by id
    pub fn pool(&self) -> Vec<ProductId> {
        self.counts.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Rank `candidates` by positive count descending, then id ascending.
    ///
    /// Candidates without a positive observation are dropped.
    pub fn rank<'a>(
        &self,
        candidates: impl IntoIterator<Item = &'a ProductId>,
        k: usize,
    ) -> Vec<ProductId> {
        let mut scored: Vec<(u32, &ProductId)> = candidates
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|product| {
                let count = self.count(product);
                (count > 0).then_some((count, product))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .take(k)
            .map(|(_, product)| product.clone())
            .collect()
    }

    /// Top `k` of the whole positive pool, skipping `excluded`
    pub fn top_excluding(&self, excluded: &HashSet<&ProductId>, k: usize) -> Vec<ProductId> {
        self.rank(self.counts.keys().filter(|p| !excluded.contains(p)), k)
    }
}
