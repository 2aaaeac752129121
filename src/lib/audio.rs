use std::path::{Path, PathBuf};

/// Extension of every file the library holds.
/// The extractor converts downloads to Ogg Opus before they reach us.
pub const AUDIO_EXTENSION: &str = "opus";

/// Fallback title for entries that arrive without one
pub const FALLBACK_TRACK_TITLE: &str = "track";

/// Check if a file path carries the library audio extension
pub fn is_opus_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext == AUDIO_EXTENSION)
}

/// The `[<id>]` marker embedded in every file name
pub fn id_marker(track_id: &str) -> String {
    format!("[{}]", track_id)
}

/// File stem used for a download: `<Title> [<ID>]`
pub fn staging_stem(title: &str, track_id: &str) -> String {
    format!("{} {}", title, id_marker(track_id))
}

/// Full path of the converted file the extractor leaves behind for `stem`
pub fn staged_audio_path(staging_dir: &Path, stem: &str) -> PathBuf {
    staging_dir.join(format!("{}.{}", stem, AUDIO_EXTENSION))
}
