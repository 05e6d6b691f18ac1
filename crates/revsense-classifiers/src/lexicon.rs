//! Keyword lexicon backend
//!
//! Needs no trained artifacts, which makes it the backend that is always
//! available. Whole-word hits from the positive and negative lists are
//! counted; the side with more hits wins and a tie is neutral.

use crate::classifier::{BackendKind, ClassificationMetadata, ClassificationResult, Classifier};
use aho_corasick::{AhoCorasick, MatchKind};
use revsense_core::{Error, Result, SentimentLabel};
use std::time::Instant;

pub const DEFAULT_POSITIVE_TERMS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "love",
    "amazing",
    "wonderful",
    "happy",
    "fantastic",
    "awesome",
    "best",
    "perfect",
    "recommend",
];

pub const DEFAULT_NEGATIVE_TERMS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "hate",
    "horrible",
    "worst",
    "sad",
    "angry",
    "disappointed",
    "poor",
    "broken",
    "refund",
];

pub struct LexiconClassifier {
    name: String,
    positive: AhoCorasick,
    negative: AhoCorasick,
}

impl LexiconClassifier {
    pub fn new() -> Result<Self> {
        Self::with_name("lexicon")
    }

    pub fn with_name(name: impl Into<String>) -> Result<Self> {
        Self::with_terms(name, DEFAULT_POSITIVE_TERMS, DEFAULT_NEGATIVE_TERMS)
    }

    pub fn with_terms<S: AsRef<str>>(
        name: impl Into<String>,
        positive: &[S],
        negative: &[S],
    ) -> Result<Self> {
        let name = name.into();
        if positive.is_empty() || negative.is_empty() {
            return Err(Error::startup(
                &name,
                "lexicon needs at least one positive and one negative term",
            ));
        }

        let positive = build_matcher(&name, positive, "positive")?;
        let negative = build_matcher(&name, negative, "negative")?;

        Ok(Self {
            name,
            positive,
            negative,
        })
    }

    fn count_hits(matcher: &AhoCorasick, text: &str) -> usize {
        matcher
            .find_iter(text)
            .filter(|m| is_word_boundary(text, m.start(), m.end()))
            .count()
    }
}

fn build_matcher<S: AsRef<str>>(backend: &str, terms: &[S], side: &str) -> Result<AhoCorasick> {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(terms.iter().map(|t| t.as_ref()))
        .map_err(|e| Error::startup(backend, format!("failed to build {side} term matcher: {e}")))
}

/// Match must not sit inside a longer word ("good" in "goodbye")
fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

impl Classifier for LexiconClassifier {
    fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();

        let positive_hits = Self::count_hits(&self.positive, text) as f32;
        let negative_hits = Self::count_hits(&self.negative, text) as f32;
        let total = positive_hits + negative_hits;

        let positive_share = if total == 0.0 {
            0.5
        } else {
            positive_hits / total
        };

        let (label, score) = if positive_hits > negative_hits {
            (SentimentLabel::Positive, positive_share)
        } else if negative_hits > positive_hits {
            (SentimentLabel::Negative, 1.0 - positive_share)
        } else {
            (SentimentLabel::Neutral, 0.5)
        };

        Ok(ClassificationResult {
            label,
            score,
            metadata: ClassificationMetadata {
                backend: Some(self.name.clone()),
                all_scores: Some(vec![
                    (SentimentLabel::Negative, 1.0 - positive_share),
                    (SentimentLabel::Positive, positive_share),
                ]),
                ..Default::default()
            },
            latency_us: start.elapsed().as_micros() as u64,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Lexicon
    }

    fn labels(&self) -> &[SentimentLabel] {
        &SentimentLabel::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_and_negative() {
        let classifier = LexiconClassifier::new().unwrap();

        let result = classifier.classify("Great phone, I LOVE it").unwrap();
        assert_eq!(result.label, SentimentLabel::Positive);
        assert_eq!(result.score, 1.0);

        let result = classifier.classify("terrible battery, awful screen").unwrap();
        assert_eq!(result.label, SentimentLabel::Negative);
    }

    #[test]
    fn test_tie_is_neutral() {
        let classifier = LexiconClassifier::new().unwrap();
        assert_eq!(
            classifier.classify("good camera but bad battery").unwrap().label,
            SentimentLabel::Neutral
        );
        assert_eq!(
            classifier.classify("arrived on tuesday").unwrap().label,
            SentimentLabel::Neutral
        );
    }

    #[test]
    fn test_whole_words_only() {
        let classifier = LexiconClassifier::new().unwrap();
        // "goodbye" and "badge" contain lexicon terms but are not hits
        assert_eq!(
            classifier.classify("goodbye badge").unwrap().label,
            SentimentLabel::Neutral
        );
    }

    #[test]
    fn test_custom_terms() {
        let classifier =
            LexiconClassifier::with_terms("custom", &["sturdy"], &["flimsy"]).unwrap();
        assert_eq!(classifier.name(), "custom");
        assert_eq!(
            classifier.classify("Sturdy build").unwrap().label,
            SentimentLabel::Positive
        );
        assert!(LexiconClassifier::with_terms::<&str>("empty", &[], &["flimsy"]).is_err());
    }
}
