//! Property tests for the preference and similarity matrices

use proptest::prelude::*;
use revsense_core::{ProductId, SentimentLabel, SentimentObservation, UserId};
use revsense_recommender::{ItemSimilarityIndex, SignalAggregator};

fn label() -> impl Strategy<Value = SentimentLabel> {
    prop_oneof![
        Just(SentimentLabel::Positive),
        Just(SentimentLabel::Neutral),
        Just(SentimentLabel::Negative),
    ]
}

fn observations() -> impl Strategy<Value = Vec<SentimentObservation>> {
    prop::collection::vec((0u8..8, 0u8..12, label()), 0..80).prop_map(|triples| {
        triples
            .into_iter()
            .map(|(user, product, sentiment)| {
                SentimentObservation::new(
                    UserId::parse(&format!("user-{user}")).unwrap(),
                    ProductId::parse(&format!("item-{product:02}")).unwrap(),
                    sentiment,
                )
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn similarity_is_symmetric(obs in observations()) {
        let sim = ItemSimilarityIndex::compute(&SignalAggregator::build(&obs));
        for i in 0..sim.len() {
            for j in 0..sim.len() {
                prop_assert!((sim.at(i, j) - sim.at(j, i)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn similarity_is_bounded_and_self_is_one(obs in observations()) {
        let matrix = SignalAggregator::build(&obs);
        let sim = ItemSimilarityIndex::compute(&matrix);
        for (i, product) in sim.products().iter().enumerate() {
            prop_assert!((sim.at(i, i) - 1.0).abs() < 1e-9);
            prop_assert_eq!(sim.index_of(product), Some(i));
            for j in 0..sim.len() {
                let value = sim.at(i, j);
                prop_assert!(value.is_finite());
                prop_assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&value));
            }
        }
    }

    #[test]
    fn only_products_with_signal_are_indexed(obs in observations()) {
        let matrix = SignalAggregator::build(&obs);
        let sim = ItemSimilarityIndex::compute(&matrix);
        if sim.is_empty() {
            return Ok(());
        }
        for product in matrix.products() {
            let has_signal = matrix
                .users()
                .iter()
                .any(|user| matrix.preference(user, product) != 0.0);
            prop_assert_eq!(sim.index_of(product).is_some(), has_signal);
            if !has_signal {
                prop_assert_eq!(sim.similarity(product, product), 0.0);
            }
        }
    }

    #[test]
    fn rebuild_is_idempotent(obs in observations()) {
        let first = SignalAggregator::build(&obs);
        let second = SignalAggregator::build(&obs);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            ItemSimilarityIndex::compute(&first),
            ItemSimilarityIndex::compute(&second)
        );
    }

    #[test]
    fn preferences_stay_in_range(obs in observations()) {
        let matrix = SignalAggregator::build(&obs);
        for user in matrix.users() {
            for product in matrix.products() {
                let value = matrix.preference(user, product);
                prop_assert!((-1.0..=1.0).contains(&value));
            }
        }
    }
}

#[test]
fn single_positive_observation_has_full_preference() {
    let u1 = UserId::parse("u1").unwrap();
    let p1 = ProductId::parse("p1").unwrap();
    let matrix = SignalAggregator::build(&[SentimentObservation::new(
        u1.clone(),
        p1.clone(),
        SentimentLabel::Positive,
    )]);

    assert_eq!(matrix.preference(&u1, &p1), 1.0);
    assert!(SignalAggregator::build(&[]).is_empty());
}
