//! Immutable recommendation snapshots and their publication
//!
//! A [`Snapshot`] bundles the preference matrix, the similarity matrix and
//! the popularity counts derived from one observation set. Readers take an
//! `Arc` to the current snapshot and keep it for the whole computation;
//! rebuilds construct a complete new snapshot and swap it in.

use crate::aggregator::{SignalAggregator, UserItemMatrix};
use crate::popularity::PositivePopularity;
use crate::similarity::{ItemSimilarityIndex, ItemSimilarityMatrix};
use crate::source::ObservationSource;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use revsense_core::{ProductId, Result, SentimentObservation};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Snapshot {
    matrix: UserItemMatrix,
    similarity: ItemSimilarityMatrix,
    popularity: PositivePopularity,
    observation_count: usize,
    built_at: DateTime<Utc>,
}

impl Snapshot {
    /// Derive every structure from one observation set
    pub fn build(observations: &[SentimentObservation], catalog: &[ProductId]) -> Self {
        let matrix = SignalAggregator::build_with_catalog(observations, catalog);
        let similarity = ItemSimilarityIndex::compute(&matrix);
        let popularity = PositivePopularity::build(observations);

        Self {
            matrix,
            similarity,
            popularity,
            observation_count: observations.len(),
            built_at: Utc::now(),
        }
    }

    /// Snapshot with no observations
    pub fn empty() -> Self {
        Self::build(&[], &[])
    }

    pub fn matrix(&self) -> &UserItemMatrix {
        &self.matrix
    }

    pub fn similarity(&self) -> &ItemSimilarityMatrix {
        &self.similarity
    }

    pub fn popularity(&self) -> &PositivePopularity {
        &self.popularity
    }

    pub fn observation_count(&self) -> usize {
        self.observation_count
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

/// Shared pointer to the current snapshot
#[derive(Clone)]
pub struct SnapshotHandle {
    current: Arc<RwLock<Arc<Snapshot>>>,
}

impl SnapshotHandle {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// The snapshot to use for one computation
    pub fn load(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Replace the current snapshot; in-flight readers keep the old one
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write() = Arc::clone(&snapshot);

        metrics::counter!("revsense_snapshot_rebuilds_total").increment(1);
        info!(
            observations = snapshot.observation_count(),
            users = snapshot.matrix().n_users(),
            products = snapshot.matrix().n_products(),
            similarity_empty = snapshot.similarity().is_empty(),
            "published snapshot"
        );
        snapshot
    }
}

impl Default for SnapshotHandle {
    fn default() -> Self {
        Self::new(Snapshot::empty())
    }
}

/// Builds snapshots from an observation source
pub struct SnapshotBuilder {
    source: Arc<dyn ObservationSource>,
    max_observations: usize,
}

impl SnapshotBuilder {
    pub fn new(source: Arc<dyn ObservationSource>, max_observations: usize) -> Self {
        Self {
            source,
            max_observations,
        }
    }

    /// Pull the source and build a snapshot from at most `max_observations`
    /// of the most recent observations
    pub fn build(&self) -> Result<Snapshot> {
        let start = Instant::now();
        let mut observations = self.source.observations()?;
        let catalog = self.source.catalog()?;

        if observations.len() > self.max_observations {
            let excess = observations.len() - self.max_observations;
            warn!(
                total = observations.len(),
                kept = self.max_observations,
                "observation set exceeds max_observations, dropping the oldest"
            );
            observations.sort_by_key(|obs| obs.timestamp);
            observations.drain(..excess);
        }

        let snapshot = Snapshot::build(&observations, &catalog);
        info!(
            observations = snapshot.observation_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built snapshot"
        );
        Ok(snapshot)
    }

    /// Build and publish through `handle`
    pub fn rebuild(&self, handle: &SnapshotHandle) -> Result<Arc<Snapshot>> {
        Ok(handle.publish(self.build()?))
    }
}
