//! revsense Core
//!
//! Core types and error handling shared across revsense components.
//!
//! This crate provides:
//! - Sentiment labels and their numeric preference mapping
//! - Validated user and product identifiers
//! - Observation and recommendation records exchanged with the storage layer
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    ProductId, Recommendation, RecommendationResult, RecommendationStrategy, SentimentLabel,
    SentimentObservation, UserId,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{
        ProductId, Recommendation, RecommendationResult, SentimentLabel, SentimentObservation,
        UserId,
    };
}
