use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::audio;
use crate::metadata::{self, DerivedTags, SINGLES_FOLDER, UNKNOWN_ARTIST_FOLDER};
use crate::record::TrackRecord;
use crate::tagging;
use crate::utils;

/// Artist name used when nothing better is known
pub const FALLBACK_ARTIST: &str = "Unknown Artist";

/// Check whether a track with this id is already somewhere under `output_root`.
///
/// Any `.opus` file whose name contains `[<id>]` counts, wherever it was filed.
/// Unreadable parts of the tree are logged and skipped.
pub fn is_already_downloaded(output_root: &Path, track_id: &str) -> bool {
    if !output_root.exists() {
        return false;
    }

    let marker = audio::id_marker(track_id);

    readable_entries(output_root)
        .filter(|entry| entry.file_type().is_file())
        .any(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| audio::is_opus_file(name) && name.contains(&marker))
        })
}

/// Walk `root`, logging entries that cannot be read instead of failing
fn readable_entries(root: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(root).into_iter().filter_map(|entry| match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("Skipping unreadable path during duplicate scan: {}", e);
            None
        }
    })
}

/// Album directory for a track: `<root>/<Artist>/<Album>`, never with empty components
pub fn album_directory(output_root: &Path, artist: &str, album_folder: &str) -> PathBuf {
    output_root
        .join(utils::path_component_or(artist, UNKNOWN_ARTIST_FOLDER))
        .join(utils::path_component_or(album_folder, SINGLES_FOLDER))
}

/// Move `source` into `<root>/<Artist>/<Album>/`, replacing a file of the same name.
///
/// Returns the destination path.
pub fn place_file(
    source: &Path,
    output_root: &Path,
    artist: &str,
    album_folder: &str,
) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("File '{}' has no filename", source.display()))?;

    let album_path = album_directory(output_root, artist, album_folder);
    fs::create_dir_all(&album_path).with_context(|| {
        format!(
            "Failed to create album directory '{}'",
            album_path.display()
        )
    })?;

    let dest_path = album_path.join(file_name);
    if dest_path.exists() {
        fs::remove_file(&dest_path).with_context(|| {
            format!("Failed to replace existing file '{}'", dest_path.display())
        })?;
    }

    utils::move_file(source, &dest_path)?;

    Ok(dest_path)
}

/// Outcome of tagging and filing one downloaded track.
/// The phases fail independently.
#[derive(Debug)]
pub struct TrackReport {
    pub tagging: Result<()>,
    pub placement: Result<PathBuf>,
}

impl TrackReport {
    pub fn is_placed(&self) -> bool {
        self.placement.is_ok()
    }
}

/// Tag a downloaded file and move it into the library.
///
/// Names for filing are derived before the file is touched, so a tagging
/// failure still files the track under its real artist and album. Placement
/// always runs.
pub async fn tag_and_place(
    audio_path: &Path,
    record: &TrackRecord,
    output_root: &Path,
    encoder: &str,
) -> TrackReport {
    let derived = metadata::derive_tags_with_cover(record, encoder).await;
    finish_track(audio_path, &derived, output_root)
}

/// Write already derived tags, then file the track
pub fn finish_track(audio_path: &Path, derived: &DerivedTags, output_root: &Path) -> TrackReport {
    let file_label = audio_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| audio_path.display().to_string());

    let tagging = tagging::write_opus_tags(audio_path, &derived.tags);
    match &tagging {
        Ok(()) => info!("Tags applied to: {}", file_label),
        Err(e) => warn!("Tagging failed, moving the file anyway: {:#}", e),
    }

    let artist = if derived.artist.is_empty() {
        FALLBACK_ARTIST
    } else {
        derived.artist.as_str()
    };

    let placement = place_file(audio_path, output_root, artist, derived.album_folder());
    match &placement {
        Ok(dest) => info!("Moved to: {}", dest.display()),
        Err(e) => error!("Failed to move {}: {:#}", audio_path.display(), e),
    }

    TrackReport { tagging, placement }
}
