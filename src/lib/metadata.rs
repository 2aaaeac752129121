use crate::cover_art::{self, CoverArt};
use crate::record::TrackRecord;
use crate::utils::UNKNOWN_NAME;

/// Album folder used for tracks released on their own
pub const SINGLES_FOLDER: &str = "Singles";

/// Artist folder used when the artist name sanitizes to nothing
pub const UNKNOWN_ARTIST_FOLDER: &str = "Unknown_Artist";

/// Year used in a synthesized copyright line when no date is known
pub const DEFAULT_COPYRIGHT_YEAR: &str = "2024";

/// Descriptions are cut to this many characters
pub const DESCRIPTION_LIMIT: usize = 500;

/// Vorbis comment field names written by the tagger
pub mod keys {
    pub const TITLE: &str = "TITLE";
    pub const ARTIST: &str = "ARTIST";
    pub const ALBUM_ARTIST: &str = "ALBUMARTIST";
    pub const ALBUM: &str = "ALBUM";
    pub const ENCODED_BY: &str = "ENCODEDBY";
    pub const DATE: &str = "DATE";
    pub const ORIGINAL_DATE: &str = "ORIGINALDATE";
    pub const COMPOSER: &str = "COMPOSER";
    pub const ORGANIZATION: &str = "ORGANIZATION";
    pub const PUBLISHER: &str = "PUBLISHER";
    pub const COPYRIGHT: &str = "COPYRIGHT";
    pub const ISRC: &str = "ISRC";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const LANGUAGE: &str = "LANGUAGE";
    pub const SOURCE_URL: &str = "WOAS";
    pub const TRACK_NUMBER: &str = "TRACKNUMBER";
    pub const TRACK_TOTAL: &str = "TRACKTOTAL";
}

/// Ordered tag values plus an optional cover.
/// Only keys with a concrete value are ever stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    fields: Vec<(&'static str, String)>,
    pub picture: Option<CoverArt>,
}

impl TagSet {
    /// Store `value` under `key`, replacing any earlier value. Empty values are dropped.
    pub fn set(&mut self, key: &'static str, value: impl Into<String>) {
        let value = value.into();
        self.fields.retain(|(k, _)| *k != key);
        if !value.is_empty() {
            self.fields.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Tags for one track along with the names used to file it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedTags {
    pub tags: TagSet,
    /// Primary artist, never empty
    pub artist: String,
    /// Real album name; `None` marks a single
    pub album: Option<String>,
}

impl DerivedTags {
    pub fn is_single(&self) -> bool {
        self.album.is_none()
    }

    /// Directory name for the album level, before sanitization
    pub fn album_folder(&self) -> &str {
        self.album.as_deref().unwrap_or(SINGLES_FOLDER)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Format an 8-digit `YYYYMMDD` string as `YYYY-MM-DD`
pub fn format_date(raw: &str) -> Option<String> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}-{}-{}", &raw[..4], &raw[4..6], &raw[6..]))
}

/// Primary artist: explicit artist field, then uploader, then `Unknown`
pub fn primary_artist(record: &TrackRecord) -> String {
    record
        .artist
        .primary()
        .or_else(|| non_empty(&record.uploader).map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_NAME.to_string())
}

/// Organization named at the end of a copyright line such as `(C) 2023 Label Name`
fn organization_from_copyright(copyright: &str) -> Option<&str> {
    let parts: Vec<&str> = copyright.splitn(3, ' ').collect();
    if parts.len() > 2 {
        parts.last().copied().filter(|p| !p.is_empty())
    } else {
        None
    }
}

/// Derive the tag set and filing names from a record.
///
/// Pure: the cover is left empty, see [`derive_tags_with_cover`].
pub fn derive_tags(record: &TrackRecord, encoder: &str) -> DerivedTags {
    let mut tags = TagSet::default();

    let title = non_empty(&record.title).unwrap_or(UNKNOWN_NAME);
    let artist = primary_artist(record);
    let raw_album = non_empty(&record.album);

    // An album named like the track is a single
    let album = raw_album
        .filter(|a| a.to_lowercase() != title.to_lowercase())
        .map(str::to_string);

    let date = [&record.release_date, &record.upload_date]
        .into_iter()
        .filter_map(|d| non_empty(d).and_then(format_date))
        .next();

    tags.set(keys::TITLE, title);
    tags.set(keys::ARTIST, artist.as_str());
    tags.set(
        keys::ALBUM_ARTIST,
        non_empty(&record.album_artist).unwrap_or(&artist),
    );
    tags.set(keys::ALBUM, raw_album.unwrap_or(title));
    tags.set(keys::ENCODED_BY, encoder);

    if let Some(date) = &date {
        tags.set(keys::DATE, date.as_str());
        tags.set(keys::ORIGINAL_DATE, date.as_str());
    }

    if let Some(composer) = non_empty(&record.composer).or(non_empty(&record.creator)) {
        tags.set(keys::COMPOSER, composer);
    }

    let copyright = non_empty(&record.copyright);
    if let Some(label) = non_empty(&record.record_label) {
        tags.set(keys::ORGANIZATION, label);
        tags.set(keys::PUBLISHER, label);
    } else if let Some(org) = copyright.and_then(organization_from_copyright) {
        tags.set(keys::ORGANIZATION, org);
    }

    match copyright {
        Some(line) => tags.set(keys::COPYRIGHT, line),
        None => {
            let year = date
                .as_deref()
                .map(|d| &d[..4])
                .unwrap_or(DEFAULT_COPYRIGHT_YEAR);
            tags.set(keys::COPYRIGHT, format!("(C) {} {}", year, artist));
        }
    }

    if let Some(isrc) = non_empty(&record.isrc) {
        tags.set(keys::ISRC, isrc);
    }
    if let Some(description) = non_empty(&record.description) {
        tags.set(
            keys::DESCRIPTION,
            description.chars().take(DESCRIPTION_LIMIT).collect::<String>(),
        );
    }
    if let Some(language) = non_empty(&record.language) {
        tags.set(keys::LANGUAGE, language);
    }
    if let Some(url) = non_empty(&record.webpage_url) {
        tags.set(keys::SOURCE_URL, url);
    }

    let track_number = record
        .track_number
        .filter(|n| *n > 0)
        .or(record.playlist_index.filter(|n| *n > 0));
    if let Some(number) = track_number {
        tags.set(keys::TRACK_NUMBER, number.to_string());
    }
    if let Some(total) = record.n_entries.filter(|n| *n > 1) {
        tags.set(keys::TRACK_TOTAL, total.to_string());
    }

    DerivedTags {
        tags,
        artist,
        album,
    }
}

/// Derive tags and attach the processed cover, when one can be produced
pub async fn derive_tags_with_cover(record: &TrackRecord, encoder: &str) -> DerivedTags {
    let mut derived = derive_tags(record, encoder);
    derived.tags.picture = cover_art::cover_from_thumbnails(&record.thumbnails).await;
    derived
}
