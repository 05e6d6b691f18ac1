//! Snapshot build and recommendation latency over synthetic observations
//!
//! Run with: cargo bench -p revsense-recommender

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use revsense_classifiers::{ClassifierRegistry, LexiconClassifier, SharedRegistry};
use revsense_core::{ProductId, SentimentLabel, SentimentObservation, UserId};
use revsense_recommender::{
    ItemSimilarityIndex, RecommendRequest, Recommender, RecommenderConfig, SignalAggregator,
    Snapshot, SnapshotHandle,
};
use std::sync::Arc;

fn synthetic(users: usize, products: usize, per_user: usize) -> Vec<SentimentObservation> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut observations = Vec::with_capacity(users * per_user);
    for user in 0..users {
        let user_id = UserId::parse(&format!("user-{user:05}")).unwrap();
        for _ in 0..per_user {
            let product = rng.gen_range(0..products);
            let sentiment = match rng.gen_range(0..10) {
                0..=5 => SentimentLabel::Positive,
                6..=7 => SentimentLabel::Neutral,
                _ => SentimentLabel::Negative,
            };
            observations.push(SentimentObservation::new(
                user_id.clone(),
                ProductId::parse(&format!("item-{product:04}")).unwrap(),
                sentiment,
            ));
        }
    }
    observations
}

fn bench_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("item_similarity");
    for &(users, products) in &[(200, 50), (1_000, 200), (2_000, 500)] {
        let matrix = SignalAggregator::build(&synthetic(users, products, 8));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{users}x{products}")),
            &matrix,
            |b, matrix| b.iter(|| ItemSimilarityIndex::compute(black_box(matrix))),
        );
    }
    group.finish();
}

fn bench_recommend(c: &mut Criterion) {
    let observations = synthetic(1_000, 200, 8);
    let handle = SnapshotHandle::new(Snapshot::build(&observations, &[]));
    let mut registry = ClassifierRegistry::new("lexicon");
    registry.register("lexicon", Arc::new(LexiconClassifier::new().unwrap()));
    let recommender = Recommender::new(
        SharedRegistry::new(registry),
        handle,
        RecommenderConfig {
            sampling_seed: Some(1),
            ..Default::default()
        },
    )
    .unwrap();

    let known = RecommendRequest::for_user(UserId::parse("user-00042").unwrap());
    let anonymous = RecommendRequest::for_text("the battery is awful");

    let mut group = c.benchmark_group("recommend");
    group.bench_function("known_user", |b| {
        b.iter(|| recommender.recommend(black_box(&known)).unwrap())
    });
    group.bench_function("anonymous_negative", |b| {
        b.iter(|| recommender.recommend(black_box(&anonymous)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_similarity, bench_recommend);
criterion_main!(benches);
