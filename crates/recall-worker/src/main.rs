use anyhow::{Context, Result};
use recall_core::ArcFaceEngine;
use recall_worker::{run_bridge, spawn_worker, Config};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// JSON lines in on stdin, JSON lines out on stdout. Logs go to stderr.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    tracing::info!(
        model = %config.arcface_model_path(),
        gallery_dir = %config.gallery_dir.display(),
        threshold = config.similarity_threshold,
        descriptors_per_identity = config.descriptors_per_identity,
        "recalld starting"
    );

    let model_path = config.arcface_model_path();
    let gallery_dir = config.gallery_dir.clone();
    let activation_key = config.activation_key.clone();
    let (worker, events) = spawn_worker(config.session(), config.channel_capacity, move || {
        ArcFaceEngine::load(&model_path, gallery_dir, activation_key.as_deref())
    })
    .context("starting recognition worker")?;

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = run_bridge(stdin, stdout, worker, events) => {
            result.context("recalld bridge")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("recalld shutting down");
        }
    }

    Ok(())
}
