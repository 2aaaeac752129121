use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing::info;

use mharvest::config::{self, DelayWindow, HarvestConfig};
use mharvest::{harvest, YtDlp};

mod utils;

/// Download tracks or playlists as tagged Opus files, filed by artist and album
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Track or playlist URL
    url: String,
    /// Netscape cookie file for authenticated extraction
    cookies: Option<PathBuf>,
    /// Library root (defaults to $MHARVEST_OUTPUT_DIR or ./Musica)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Directory downloads land in before being filed
    #[arg(long, default_value = ".")]
    staging_dir: PathBuf,
    /// Minimum pause between downloads, in seconds
    #[arg(long, default_value_t = config::DEFAULT_MIN_DELAY_SECS)]
    min_delay: f64,
    /// Maximum pause between downloads, in seconds
    #[arg(long, default_value_t = config::DEFAULT_MAX_DELAY_SECS)]
    max_delay: f64,
    /// yt-dlp executable
    #[arg(long, default_value = "yt-dlp")]
    yt_dlp: PathBuf,
    /// Also write logs to <LOG_DIR>/mharvest.log
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    // Load environment variables from a .env file if present
    dotenv().ok();
    let cli = Cli::parse();
    let url = cli.url;
    let _log_guard = utils::init_logging(cli.verbose, cli.log_dir.as_deref())?;

    let defaults = HarvestConfig::default();
    let config = HarvestConfig {
        output_root: cli
            .output_dir
            .map(|dir| PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).into_owned()))
            .unwrap_or(defaults.output_root),
        staging_dir: cli.staging_dir,
        delay: DelayWindow {
            min_secs: cli.min_delay,
            max_secs: cli.max_delay,
        },
        yt_dlp: cli.yt_dlp,
        ..defaults
    }
    .with_cookies(cli.cookies);

    info!("Library root: {}", config.output_root.display());

    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    rt.block_on(async {
        utils::check_external_tools(&config.yt_dlp).await?;
        let extractor = YtDlp::new(config.yt_dlp.clone(), config.cookies.clone());
        harvest(&extractor, &url, &config).await
    })
    .map(|summary| {
        info!(
            "Done: {} downloaded, {} skipped, {} failed",
            summary.downloaded, summary.skipped, summary.failed
        );
    })
}
