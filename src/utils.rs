use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use mharvest::extractor;

const LOG_FILE_NAME: &str = "mharvest.log";

/// Install the stderr logger, plus a file logger when `log_dir` is given.
///
/// The returned guard must live until the program exits so buffered file
/// output gets flushed.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(level);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory '{}'", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(level);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install logger")?;

    Ok(guard)
}

/// Make sure the external tools are reachable.
///
/// A missing `yt-dlp` is fatal; a missing `ffmpeg` only warns, since the
/// conversion step will report its own failure per track.
pub async fn check_external_tools(yt_dlp: &Path) -> Result<()> {
    let version = extractor::probe_tool(yt_dlp, "--version")
        .await
        .with_context(|| format!("yt-dlp is required ({})", yt_dlp.display()))?;
    info!("Using yt-dlp {}", version);

    match extractor::probe_tool(&PathBuf::from("ffmpeg"), "-version").await {
        Ok(version) => info!("Using {}", version),
        Err(e) => warn!("ffmpeg not found, audio conversion will fail: {:#}", e),
    }

    Ok(())
}
