use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder returned by [`sanitize_name`] when nothing usable is left
pub const UNKNOWN_NAME: &str = "Unknown";

/// Name of the library folder created under the working directory
pub const DEFAULT_LIBRARY_FOLDER: &str = "Musica";

/// Punctuation allowed to survive sanitization, besides ASCII letters and digits
const SAFE_PUNCTUATION: &[char] = &[' ', '.', '-', '_', '(', ')'];

/// Resolve the default output root.
///
/// `MHARVEST_OUTPUT_DIR` wins when set (tilde-expanded), otherwise `<cwd>/Musica`.
pub fn get_default_output_dir() -> PathBuf {
    match std::env::var("MHARVEST_OUTPUT_DIR") {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(shellexpand::tilde(&dir).into_owned()),
        _ => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(DEFAULT_LIBRARY_FOLDER),
    }
}

/// Strip everything that is not safe in a path component.
///
/// Keeps ASCII letters, digits and `SAFE_PUNCTUATION`, then trims surrounding
/// whitespace. The result may be empty.
pub fn strip_unsafe_chars(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || SAFE_PUNCTUATION.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Sanitize a name to be safe for the filesystem.
///
/// Absent input, or input with nothing safe left in it, maps to `Unknown`.
pub fn sanitize_name(name: Option<&str>) -> String {
    let cleaned = name.map(strip_unsafe_chars).unwrap_or_default();
    if cleaned.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        cleaned
    }
}

/// Clean a directory component, falling back to `sentinel` when it ends up empty
pub fn path_component_or(name: &str, sentinel: &str) -> String {
    let cleaned = strip_unsafe_chars(name);
    if cleaned.is_empty() {
        sentinel.to_string()
    } else {
        cleaned
    }
}

/// Move a file, copying across filesystems when a plain rename is refused
pub fn move_file(source: &Path, dest: &Path) -> Result<()> {
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }

    fs::copy(source, dest).with_context(|| {
        format!(
            "Failed to copy '{}' to '{}'",
            source.display(),
            dest.display()
        )
    })?;
    fs::remove_file(source)
        .with_context(|| format!("Failed to remove '{}' after copying", source.display()))?;

    Ok(())
}
