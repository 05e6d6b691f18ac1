//! revsense Recommender
//!
//! Turns sentiment observations into ranked product lists:
//! - [`SignalAggregator`] builds the user-item preference matrix
//! - [`ItemSimilarityIndex`] derives pairwise item cosine similarity
//! - [`Recommender`] ranks by collaborative filtering for known users and by
//!   sentiment-filtered popularity for anonymous and cold-start requests
//!
//! All derived structures live in an immutable [`Snapshot`]; rebuilds publish
//! a new snapshot through a [`SnapshotHandle`] and never touch the one an
//! in-flight request is using.

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod labeling;
pub mod popularity;
pub mod refresh;
pub mod sampling;
pub mod similarity;
pub mod snapshot;
pub mod source;
pub mod store;

pub use aggregator::{PreferenceCell, SignalAggregator, UserItemMatrix};
pub use config::{RecommenderConfig, DEFAULT_EXPLORATION_SAMPLE_SIZE, SIMILARITY_EPSILON};
pub use engine::{RecommendRequest, Recommender};
pub use labeling::{label_reviews, UnlabeledReview};
pub use popularity::PositivePopularity;
pub use refresh::RefreshJob;
pub use sampling::SamplingPolicy;
pub use similarity::{cosine, ItemSimilarityIndex, ItemSimilarityMatrix};
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotHandle};
pub use source::{InMemorySource, JsonLinesSource, ObservationSource};
pub use store::{InMemoryStore, JsonFileStore, RecommendationStore};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::RecommenderConfig;
    pub use crate::engine::{RecommendRequest, Recommender};
    pub use crate::snapshot::{Snapshot, SnapshotBuilder, SnapshotHandle};
    pub use crate::store::RecommendationStore;
}
