//! revsense
//!
//! Command-line front end for the sentiment-driven recommendation engine.
//! Classifies review text, labels review batches into observations, answers
//! recommendation requests and keeps the stored per-user rankings fresh.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

mod commands;
mod config;

use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "revsense")]
#[command(about = "Sentiment-driven product recommendations", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "revsense.yaml", global = true)]
    config: PathBuf,

    /// Observations file (JSON lines), overrides `data.observations`
    #[arg(long, global = true)]
    observations: Option<PathBuf>,

    /// Product catalog file, overrides `data.catalog`
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Default classifier backend, overrides `classifiers.default_backend`
    #[arg(long, global = true)]
    default_backend: Option<String>,

    /// Fixed exploration sampling seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify one piece of text and print its sentiment label
    Classify {
        #[arg(short, long)]
        text: String,

        #[arg(short, long)]
        backend: Option<String>,
    },

    /// Recommend products for a known user or for free text
    Recommend {
        #[arg(short, long, required_unless_present = "text")]
        user: Option<String>,

        #[arg(short, long)]
        text: Option<String>,

        #[arg(short, long)]
        backend: Option<String>,

        /// Number of products to return
        #[arg(short, long, allow_hyphen_values = true)]
        k: Option<i64>,
    },

    /// Classify unlabeled reviews into sentiment observations
    Label {
        /// Unlabeled reviews (JSON lines)
        #[arg(long)]
        reviews: PathBuf,

        /// Output observations file (JSON lines)
        #[arg(long)]
        out: PathBuf,

        #[arg(short, long)]
        backend: Option<String>,

        /// Append to the output instead of replacing it
        #[arg(long)]
        append: bool,
    },

    /// Recompute and store recommendations for every known user
    Refresh {
        /// Recommendation store, overrides `data.store`
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Rebuild snapshots and stored recommendations until interrupted
    Watch {
        /// Recommendation store, overrides `data.store`
        #[arg(long)]
        store: Option<PathBuf>,

        /// Seconds between rebuilds, overrides `recommender.refresh_interval_secs`
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);
    describe_metrics();

    // Load configuration
    let config = AppConfig::load(&cli.config, &cli)?;
    debug!(
        config = %cli.config.display(),
        backends = config.classifiers.backends.len(),
        observations = %config.data.observations.display(),
        "configuration loaded"
    );

    match &cli.command {
        Command::Classify { text, backend } => {
            commands::classify(&config, text, backend.as_deref())
        }
        Command::Recommend {
            user,
            text,
            backend,
            k,
        } => commands::recommend(
            &config,
            user.as_deref(),
            text.as_deref(),
            backend.as_deref(),
            *k,
        ),
        Command::Label {
            reviews,
            out,
            backend,
            append,
        } => commands::label(&config, reviews, out, backend.as_deref(), *append),
        Command::Refresh { store } => {
            let store = store.as_ref().unwrap_or(&config.data.store);
            commands::refresh(&config, store)
        }
        Command::Watch { store, interval } => {
            let store = store.clone().unwrap_or_else(|| config.data.store.clone());
            let interval = interval.unwrap_or(config.recommender.refresh_interval_secs);
            info!(store = %store.display(), interval_secs = interval, "watching observations");
            commands::watch(&config, store, interval).await
        }
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("revsense=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("revsense=info"))
    };

    // stdout carries command output
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Register metric descriptions for an embedding recorder
fn describe_metrics() {
    metrics::describe_counter!(
        "revsense_classifications_total",
        "Total number of texts classified by backend"
    );
    metrics::describe_histogram!(
        "revsense_classification_latency_us",
        metrics::Unit::Microseconds,
        "Classification latency in microseconds by backend"
    );
    metrics::describe_counter!(
        "revsense_recommendations_total",
        "Total number of recommendation results by strategy"
    );
    metrics::describe_counter!(
        "revsense_snapshot_rebuilds_total",
        "Total number of published snapshots"
    );
}
