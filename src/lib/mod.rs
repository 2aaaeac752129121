//! # Music Harvester Core Library
//!
//! Downloads audio tracks through an external extractor, derives tags from the
//! metadata it reports, embeds them (cover art included) into Opus files and
//! files the results under `<root>/<Artist>/<Album>/`. Tracks already present
//! under the root are recognised by the `[<id>]` marker in their file name and
//! are not downloaded again.

pub mod audio;
pub mod batch;
pub mod config;
pub mod cover_art;
pub mod directory;
pub mod extractor;
pub mod metadata;
pub mod record;
pub mod tagging;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{harvest, BatchSummary};
pub use config::{DelayWindow, HarvestConfig};
pub use extractor::{Extractor, YtDlp};
