//! Boundary to the external download engine.
//!
//! The engine lists collections, downloads single tracks and converts them to
//! Opus. [`YtDlp`] drives the `yt-dlp` executable; tests plug in their own
//! [`Extractor`].

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::audio::AUDIO_EXTENSION;
use crate::record::{CollectionEntry, Resolution, TrackRecord};

#[allow(async_fn_in_trait)]
pub trait Extractor {
    /// List the entries behind a URL without downloading anything
    async fn resolve(&self, url: &str) -> Result<Resolution>;

    /// Download one entry to `<staging_dir>/<stem>.opus` and return its metadata
    async fn download(&self, url: &str, staging_dir: &Path, stem: &str) -> Result<TrackRecord>;
}

/// `yt-dlp` driven through its command line
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    cookies: Option<PathBuf>,
}

impl YtDlp {
    pub fn new(program: PathBuf, cookies: Option<PathBuf>) -> Self {
        Self { program, cookies }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        // User and system yt-dlp config files could change the output template or format
        cmd.args(["--ignore-config", "--quiet", "--no-warnings"]);
        if let Some(cookies) = &self.cookies {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd
    }

    async fn run_json(&self, mut cmd: Command, url: &str) -> Result<Value> {
        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} failed for {} ({}): {}",
                self.program.display(),
                url,
                output.status,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("No metadata returned for {}", url))?;

        serde_json::from_str(line).with_context(|| format!("Invalid metadata JSON for {}", url))
    }
}

impl Extractor for YtDlp {
    async fn resolve(&self, url: &str) -> Result<Resolution> {
        let mut cmd = self.command();
        cmd.args(["--flat-playlist", "--dump-single-json"]).arg(url);
        let info = self.run_json(cmd, url).await?;
        parse_resolution(info, url)
    }

    async fn download(&self, url: &str, staging_dir: &Path, stem: &str) -> Result<TrackRecord> {
        let template = staging_dir.join(format!("{}.%(ext)s", stem));
        debug!(url = %url, template = %template.display(), "Starting download");

        let mut cmd = self.command();
        cmd.args([
            "--format",
            "bestaudio/best",
            "--extract-audio",
            "--audio-format",
            AUDIO_EXTENSION,
            "--no-playlist",
            "--no-simulate",
            "--dump-json",
            "--output",
        ])
        .arg(&template)
        .arg(url);

        let info = self.run_json(cmd, url).await?;
        serde_json::from_value(info).with_context(|| format!("Unexpected metadata for {}", url))
    }
}

/// Flatten resolver output into entries.
///
/// Collections contribute their non-null entries and `playlist_count` (or the
/// entry count) as total; anything else is a single track with a total of 1.
pub fn parse_resolution(info: Value, source_url: &str) -> Result<Resolution> {
    if let Some(entries) = info.get("entries").and_then(Value::as_array) {
        let parsed = entries
            .iter()
            .filter(|e| !e.is_null())
            .map(|e| serde_json::from_value::<CollectionEntry>(e.clone()))
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid collection entry")?;

        let total = info
            .get("playlist_count")
            .and_then(Value::as_u64)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or_else(|| u32::try_from(entries.len()).unwrap_or(u32::MAX));

        return Ok(Resolution {
            entries: parsed,
            total,
        });
    }

    let single: CollectionEntry =
        serde_json::from_value(info).context("Invalid track metadata")?;
    let entry = CollectionEntry {
        url: None,
        webpage_url: single
            .webpage_url
            .clone()
            .or_else(|| Some(source_url.to_string())),
        ..single
    };

    Ok(Resolution {
        entries: vec![entry],
        total: 1,
    })
}

/// Run `<program> <version_flag>` and return the first line it prints
pub async fn probe_tool(program: &Path, version_flag: &str) -> Result<String> {
    let output = Command::new(program)
        .arg(version_flag)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await
        .with_context(|| format!("'{}' is not available", program.display()))?;

    if !output.status.success() {
        anyhow::bail!("'{}' exited with {}", program.display(), output.status);
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_resolution_playlist() -> Result<()> {
        let info = json!({
            "_type": "playlist",
            "playlist_count": 5,
            "entries": [
                {"id": "a1", "title": "One", "url": "https://v.example/watch?v=a1"},
                null,
                {"id": "b2", "title": "Two", "url": "https://v.example/watch?v=b2"}
            ]
        });
        let resolution = parse_resolution(info, "https://v.example/playlist?list=x")?;

        assert_eq!(resolution.total, 5);
        assert_eq!(resolution.entries.len(), 2);
        assert_eq!(resolution.entries[1].track_id(), Some("b2"));
        Ok(())
    }

    #[test]
    fn test_parse_resolution_playlist_without_count() -> Result<()> {
        let info = json!({"entries": [{"id": "a1"}, {"id": "b2"}, {"id": "c3"}]});
        assert_eq!(parse_resolution(info, "u")?.total, 3);
        Ok(())
    }

    #[test]
    fn test_parse_resolution_huge_count_saturates() -> Result<()> {
        let info = json!({"playlist_count": 5_000_000_000u64, "entries": [{"id": "a1"}]});
        assert_eq!(parse_resolution(info, "u")?.total, u32::MAX);
        Ok(())
    }

    #[test]
    fn test_command_ignores_user_config() {
        let ytdlp = YtDlp::new(PathBuf::from("yt-dlp"), Some(PathBuf::from("cookies.txt")));
        let cmd = ytdlp.command();
        let args: Vec<_> = cmd.as_std().get_args().collect();

        assert_eq!(args.first().copied(), Some(std::ffi::OsStr::new("--ignore-config")));
        assert!(args.contains(&std::ffi::OsStr::new("--cookies")));
        assert!(args.contains(&std::ffi::OsStr::new("cookies.txt")));
    }

    #[test]
    fn test_parse_resolution_single() -> Result<()> {
        let info = json!({
            "id": "dQw4w9WgXcQ",
            "title": "Song",
            "webpage_url": "https://v.example/watch?v=dQw4w9WgXcQ",
            "url": "https://media.example/stream.webm"
        });
        let resolution = parse_resolution(info, "https://v.example/watch?v=dQw4w9WgXcQ&t=3")?;

        assert_eq!(resolution.total, 1);
        let entry = &resolution.entries[0];
        assert_eq!(entry.track_id(), Some("dQw4w9WgXcQ"));
        assert_eq!(entry.download_url(), Some("https://v.example/watch?v=dQw4w9WgXcQ"));
        Ok(())
    }

    #[test]
    fn test_parse_resolution_single_uses_source_url() -> Result<()> {
        let info = json!({"id": "x", "title": "Song"});
        let resolution = parse_resolution(info, "https://v.example/watch?v=x")?;
        assert_eq!(
            resolution.entries[0].download_url(),
            Some("https://v.example/watch?v=x")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_probe_tool_missing_program() {
        let result = probe_tool(Path::new("/nonexistent/mharvest-tool"), "--version").await;
        assert!(result.is_err());
    }
}
