//! Subcommand implementations

use crate::config::AppConfig;
use anyhow::{Context, Result};
use revsense_classifiers::{ClassifierRegistry, SharedRegistry};
use revsense_core::UserId;
use revsense_recommender::source::{read_json_lines, write_json_lines};
use revsense_recommender::{
    label_reviews, JsonFileStore, RecommendRequest, RecommendationStore, Recommender, RefreshJob,
    SnapshotBuilder, SnapshotHandle, UnlabeledReview,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Load every configured backend; fails when the default backend is unusable
fn init_registry(config: &AppConfig) -> Result<SharedRegistry> {
    let (registry, report) = ClassifierRegistry::init(&config.classifiers)?;
    if !report.is_complete() {
        for (backend, reason) in &report.failed {
            warn!(backend = %backend, reason = %reason, "classifier backend unavailable");
        }
    }
    Ok(SharedRegistry::new(registry))
}

fn snapshot_builder(config: &AppConfig) -> SnapshotBuilder {
    SnapshotBuilder::new(
        Arc::new(config.data.source()),
        config.recommender.max_observations,
    )
}

/// Recommender over a snapshot built from the configured observations
fn build_recommender(config: &AppConfig) -> Result<Recommender> {
    let registry = init_registry(config)?;
    let snapshot = snapshot_builder(config)
        .build()
        .with_context(|| format!("reading {}", config.data.observations.display()))?;
    let handle = SnapshotHandle::new(snapshot);
    Ok(Recommender::new(registry, handle, config.recommender.clone())?)
}

pub fn classify(config: &AppConfig, text: &str, backend: Option<&str>) -> Result<()> {
    let registry = init_registry(config)?;
    let result = registry.classify(text, backend)?;

    info!(
        backend = result.metadata.backend.as_deref().unwrap_or_default(),
        score = result.score,
        latency_us = result.latency_us,
        "classified"
    );
    println!("{}", result.label);
    Ok(())
}

pub fn recommend(
    config: &AppConfig,
    user: Option<&str>,
    text: Option<&str>,
    backend: Option<&str>,
    k: Option<i64>,
) -> Result<()> {
    let recommender = build_recommender(config)?;

    let request = RecommendRequest {
        user_id: user.map(UserId::parse).transpose()?,
        text: text.map(str::to_string),
        backend: backend.map(str::to_string),
        k,
    };
    let result = recommender.recommend(&request)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub fn label(
    config: &AppConfig,
    reviews: &Path,
    out: &Path,
    backend: Option<&str>,
    append: bool,
) -> Result<()> {
    let registry = init_registry(config)?;
    let reviews: Vec<UnlabeledReview> = read_json_lines(reviews)
        .with_context(|| format!("reading {}", reviews.display()))?;

    let observations = label_reviews(
        registry.registry(),
        backend,
        &reviews,
        config.recommender.label_batch_size,
    )?;
    write_json_lines(out, &observations, append)
        .with_context(|| format!("writing {}", out.display()))?;

    println!("labeled {} reviews into {}", observations.len(), out.display());
    Ok(())
}

pub fn refresh(config: &AppConfig, store: &Path) -> Result<()> {
    let recommender = build_recommender(config)?;
    let store = JsonFileStore::open(store)?;

    let users = recommender.refresh_all(&store)?;
    println!(
        "stored recommendations for {users} users in {}",
        store.path().display()
    );
    Ok(())
}

pub async fn watch(config: &AppConfig, store: PathBuf, interval_secs: u64) -> Result<()> {
    if interval_secs == 0 {
        anyhow::bail!("refresh interval must be greater than zero");
    }

    let registry = init_registry(config)?;
    let handle = SnapshotHandle::default();
    let recommender = Arc::new(Recommender::new(
        registry,
        handle.clone(),
        config.recommender.clone(),
    )?);
    let store: Arc<dyn RecommendationStore> = Arc::new(JsonFileStore::open(&store)?);

    let cancel = CancellationToken::new();
    let task = RefreshJob::new(
        Arc::new(snapshot_builder(config)),
        handle,
        Duration::from_secs(interval_secs),
    )
    .with_store(recommender, store)
    .spawn(cancel.clone());

    shutdown_signal().await?;
    warn!("Shutdown signal received, stopping refresh job...");
    cancel.cancel();
    task.await?;

    info!("Refresh job stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    tokio::select! {
        res = signal::ctrl_c() => res,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    signal::ctrl_c().await
}
