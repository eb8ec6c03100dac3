mod filter;
mod keys;
mod pipeline;
mod storage;

use filter::FilterError;
use pipeline::PipelineStats;
use sharpframe_common::config::Config;
use sharpframe_producer::SourceError;
use std::path::PathBuf;
use std::time::Instant;
use storage::{DirectorySink, StorageError};
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        input = config.input.path.display().to_string(),
        mode = config.input.mode,
        output = config.output.dir.display().to_string(),
        filter = config.filter.primary,
        target_height = config.filter.target_height,
        mask_size = config.filter.mask_size,
        threshold = config.filter.threshold,
        "starting sharpframe"
    );

    let started = Instant::now();
    match run(&config) {
        Ok(stats) => {
            info!(
                processed = stats.processed,
                saved = stats.saved,
                blurry = stats.blurry,
                elapsed_secs = format!("{:.1}", started.elapsed().as_secs_f64()),
                "done"
            );
        }
        Err(e) => {
            error!(error = %e, "sharpframe failed");
            std::process::exit(1);
        }
    }
}

fn run(config: &Config) -> Result<PipelineStats, AppError> {
    let classifier = filter::from_config(&config.filter)?;
    let mut sink = DirectorySink::from_config(&config.output)?;
    let mut source = sharpframe_producer::open(&config.input)?;

    info!(dir = sink.dir().display().to_string(), "exporting sharp frames");
    let stats = pipeline::run(source.as_mut(), classifier.as_ref(), &mut sink)?;
    Ok(stats)
}
