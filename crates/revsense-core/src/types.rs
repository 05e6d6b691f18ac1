//! Core types for revsense

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentiment class assigned to a piece of review text.
///
/// Two-class backends only ever produce `Positive` and `Negative`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    /// All labels in encoder order
    pub const ALL: [SentimentLabel; 3] = [Self::Negative, Self::Neutral, Self::Positive];

    /// Preference value used by the user-item matrix
    pub fn value(self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Neutral => 0.0,
            Self::Negative => -1.0,
        }
    }

    /// Canonical lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Self::Positive)
    }
}

impl Default for SentimentLabel {
    fn default() -> Self {
        Self::Neutral
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = Error;

    /// Accepts the spellings found in exported label encoders and review
    /// tables: `positive`/`pos`/`1`/`true`/`yes`, `negative`/`neg`/`0`/
    /// `false`/`no` and `neutral`/`neu`, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" | "1" | "true" | "yes" => Ok(Self::Positive),
            "negative" | "neg" | "0" | "false" | "no" => Ok(Self::Negative),
            "neutral" | "neu" => Ok(Self::Neutral),
            other => Err(Error::invalid_argument(format!(
                "unrecognised sentiment label '{other}'"
            ))),
        }
    }
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate an identifier
            pub fn parse(raw: &str) -> Result<Self> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(Error::invalid_argument(concat!($kind, " id must not be empty")));
                }
                if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
                    return Err(Error::invalid_argument(format!(
                        "{} id '{}' contains whitespace or control characters",
                        $kind, trimmed
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

identifier!(
    /// Identifier of a reviewer
    UserId,
    "user"
);

identifier!(
    /// Identifier of a product in the catalog
    ProductId,
    "product"
);

/// One classified review: who said what about which product, and when.
///
/// Observations are append-only; every aggregate is rebuilt from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentObservation {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub sentiment: SentimentLabel,
    pub timestamp: DateTime<Utc>,
}

impl SentimentObservation {
    /// Create an observation stamped with the current time
    pub fn new(user_id: UserId, product_id: ProductId, sentiment: SentimentLabel) -> Self {
        Self::at(user_id, product_id, sentiment, Utc::now())
    }

    /// Create an observation with an explicit timestamp
    pub fn at(
        user_id: UserId,
        product_id: ProductId,
        sentiment: SentimentLabel,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            product_id,
            sentiment,
            timestamp,
        }
    }
}

/// A persisted recommendation row. Rows for a user are replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub user_id: UserId,
    pub product_id: ProductId,
    /// 1-based position in the ranked list
    pub rank: u32,
}

/// Which ranking path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStrategy {
    /// Item-based collaborative filtering over the user's seen set
    CollaborativeFiltering,
    /// Known user, but the similarity index was degenerate
    PopularityFallback,
    /// Cold-start or anonymous request ranked by positive popularity
    SentimentPopularity,
}

impl RecommendationStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CollaborativeFiltering => "collaborative_filtering",
            Self::PopularityFallback => "popularity_fallback",
            Self::SentimentPopularity => "sentiment_popularity",
        }
    }
}

/// Output of a recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    /// Sentiment of the supplied text, when text was classified
    pub user_sentiment: Option<SentimentLabel>,

    /// Product ids, best first
    pub ranked_product_ids: Vec<ProductId>,

    /// True when no personal history was used
    pub is_cold_start: bool,

    pub strategy: RecommendationStrategy,
}

impl RecommendationResult {
    /// Convert the ranking into persistable rows for `user_id`
    pub fn to_rows(&self, user_id: &UserId) -> Vec<Recommendation> {
        self.ranked_product_ids
            .iter()
            .enumerate()
            .map(|(idx, product_id)| Recommendation {
                user_id: user_id.clone(),
                product_id: product_id.clone(),
                rank: idx as u32 + 1,
            })
            .collect()
    }
}
