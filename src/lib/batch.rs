use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::audio;
use crate::config::HarvestConfig;
use crate::directory;
use crate::extractor::Extractor;
use crate::record::CollectionEntry;
use crate::utils;

/// Counters for one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum EntryOutcome {
    Skipped,
    Placed,
    Failed,
}

/// Download, tag and file everything behind `url`.
///
/// Only a failure to resolve `url` itself is returned as an error; problems
/// with individual entries are logged and counted.
pub async fn harvest<E: Extractor>(
    extractor: &E,
    url: &str,
    config: &HarvestConfig,
) -> Result<BatchSummary> {
    info!("Fetching track list from: {}", url);
    let resolution = extractor
        .resolve(url)
        .await
        .with_context(|| format!("Failed to resolve {}", url))?;

    info!(
        entries = resolution.entries.len(),
        total = resolution.total,
        "Resolved track list"
    );

    let mut summary = BatchSummary::default();

    for entry in &resolution.entries {
        let outcome = process_entry(extractor, entry, resolution.total, config).await;
        match outcome {
            EntryOutcome::Skipped => summary.skipped += 1,
            EntryOutcome::Placed => summary.downloaded += 1,
            EntryOutcome::Failed => summary.failed += 1,
        }

        if !matches!(outcome, EntryOutcome::Skipped) {
            let pause = config.delay.sample();
            if !pause.is_zero() {
                info!("Waiting {:.1} seconds...", pause.as_secs_f64());
                tokio::time::sleep(pause).await;
            }
        }
    }

    info!(
        downloaded = summary.downloaded,
        skipped = summary.skipped,
        failed = summary.failed,
        "Finished processing {}",
        url
    );

    Ok(summary)
}

async fn process_entry<E: Extractor>(
    extractor: &E,
    entry: &CollectionEntry,
    total: u32,
    config: &HarvestConfig,
) -> EntryOutcome {
    let (Some(track_url), Some(track_id)) = (entry.download_url(), entry.track_id()) else {
        debug!(?entry, "Ignoring entry without id or url");
        return EntryOutcome::Skipped;
    };

    let display_title = entry.title.as_deref().unwrap_or(utils::UNKNOWN_NAME);

    if directory::is_already_downloaded(&config.output_root, track_id) {
        info!("Skipping (already downloaded): {}", display_title);
        return EntryOutcome::Skipped;
    }

    let title = utils::sanitize_name(Some(
        entry.title.as_deref().unwrap_or(audio::FALLBACK_TRACK_TITLE),
    ));
    let stem = audio::staging_stem(&title, track_id);
    let staged_path = audio::staged_audio_path(&config.staging_dir, &stem);

    info!("Downloading: {}", display_title);
    let mut record = match extractor
        .download(track_url, &config.staging_dir, &stem)
        .await
    {
        Ok(record) => record,
        Err(e) => {
            error!("Failed to download {}: {:#}", display_title, e);
            return EntryOutcome::Failed;
        }
    };
    record.n_entries = Some(total);

    if !staged_path.exists() {
        error!(
            "Download finished but {} was not produced",
            staged_path.display()
        );
        return EntryOutcome::Failed;
    }

    let report = directory::tag_and_place(
        &staged_path,
        &record,
        &config.output_root,
        &config.encoder_tag,
    )
    .await;

    if report.is_placed() {
        EntryOutcome::Placed
    } else {
        EntryOutcome::Failed
    }
}
