use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::utils;

/// Default lower bound of the pause between downloads, in seconds
pub const DEFAULT_MIN_DELAY_SECS: f64 = 5.0;

/// Default upper bound of the pause between downloads, in seconds
pub const DEFAULT_MAX_DELAY_SECS: f64 = 15.0;

/// Uniform window the pause between downloads is drawn from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayWindow {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl Default for DelayWindow {
    fn default() -> Self {
        Self {
            min_secs: DEFAULT_MIN_DELAY_SECS,
            max_secs: DEFAULT_MAX_DELAY_SECS,
        }
    }
}

impl DelayWindow {
    pub fn none() -> Self {
        Self {
            min_secs: 0.0,
            max_secs: 0.0,
        }
    }

    /// Draw a pause from the window. Inverted or negative bounds collapse to the lower one.
    pub fn sample(&self) -> Duration {
        let min = self.min_secs.max(0.0);
        let max = self.max_secs.max(0.0);
        let secs = if max > min {
            rand::random_range(min..=max)
        } else {
            min
        };
        Duration::from_secs_f64(secs)
    }
}

/// Settings for one harvesting run
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Library root, `<root>/<Artist>/<Album>/<file>`
    pub output_root: PathBuf,
    /// Where downloads land before being filed
    pub staging_dir: PathBuf,
    /// Netscape cookie file for authenticated extraction
    pub cookies: Option<PathBuf>,
    pub delay: DelayWindow,
    pub yt_dlp: PathBuf,
    /// Value of the encoder tag
    pub encoder_tag: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            output_root: utils::get_default_output_dir(),
            staging_dir: PathBuf::from("."),
            cookies: None,
            delay: DelayWindow::default(),
            yt_dlp: PathBuf::from("yt-dlp"),
            encoder_tag: default_encoder_tag(),
        }
    }
}

impl HarvestConfig {
    /// Keep a cookie file only if it exists, logging which mode the run uses
    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookies = match cookies {
            Some(path) if path.exists() => {
                info!("Downloading with cookies ({})", path.display());
                Some(path)
            }
            Some(path) => {
                warn!(
                    "Cookie file {} not found, downloading without cookies",
                    path.display()
                );
                None
            }
            None => {
                info!("Downloading without cookies");
                None
            }
        };
        self
    }
}

pub fn default_encoder_tag() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
