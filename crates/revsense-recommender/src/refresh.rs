//! Periodic snapshot rebuild
//!
//! The job is the only writer of the published snapshot. Each tick pulls the
//! observation source, builds a fresh snapshot off the async runtime and
//! publishes it; optionally it then recomputes the stored recommendations of
//! every known user.

use crate::engine::Recommender;
use crate::snapshot::{SnapshotBuilder, SnapshotHandle};
use crate::store::RecommendationStore;
use revsense_core::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct RefreshJob {
    builder: Arc<SnapshotBuilder>,
    handle: SnapshotHandle,
    interval: Duration,
    persist: Option<(Arc<Recommender>, Arc<dyn RecommendationStore>)>,
}

impl RefreshJob {
    pub fn new(builder: Arc<SnapshotBuilder>, handle: SnapshotHandle, interval: Duration) -> Self {
        Self {
            builder,
            handle,
            interval,
            persist: None,
        }
    }

    /// Also refresh stored recommendations after each publication
    pub fn with_store(
        mut self,
        recommender: Arc<Recommender>,
        store: Arc<dyn RecommendationStore>,
    ) -> Self {
        self.persist = Some((recommender, store));
        self
    }

    /// Run one rebuild (and store refresh) now
    pub async fn run_once(&self) -> Result<()> {
        let builder = Arc::clone(&self.builder);
        let snapshot = tokio::task::spawn_blocking(move || builder.build())
            .await
            .map_err(|e| Error::internal(format!("snapshot build task failed: {e}")))??;
        self.handle.publish(snapshot);

        if let Some((recommender, store)) = &self.persist {
            let recommender = Arc::clone(recommender);
            let store = Arc::clone(store);
            let users = tokio::task::spawn_blocking(move || recommender.refresh_all(store.as_ref()))
                .await
                .map_err(|e| Error::internal(format!("store refresh task failed: {e}")))??;
            debug!(users, "stored recommendations refreshed");
        }
        Ok(())
    }

    /// Spawn the loop; the first rebuild happens immediately
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = self.interval.as_secs(), "refresh job started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("refresh job stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once().await {
                            warn!(error = %e, "refresh failed, keeping previous snapshot");
                        }
                    }
                }
            }
        })
    }
}
