//! Records handed over by the extractor.
//!
//! Field names follow the JSON the extractor emits so a record can be
//! deserialized straight from its output.

use serde::{Deserialize, Deserializer};

/// Treat an explicit `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The artist field arrives either as a plain string or as a list of names
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ArtistField {
    List(Vec<String>),
    Scalar(String),
    #[default]
    Absent,
}

impl ArtistField {
    /// Primary artist: first list element, or the text before the first comma
    pub fn primary(&self) -> Option<String> {
        match self {
            ArtistField::List(names) => names.first().filter(|n| !n.is_empty()).cloned(),
            ArtistField::Scalar(name) => name
                .split(',')
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            ArtistField::Absent => None,
        }
    }
}

/// A candidate cover image
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl Thumbnail {
    pub fn new(url: &str, width: u32, height: u32) -> Self {
        Self {
            url: url.to_string(),
            width: Some(width),
            height: Some(height),
        }
    }

    pub fn width(&self) -> u32 {
        self.width.unwrap_or(0)
    }

    pub fn height(&self) -> u32 {
        self.height.unwrap_or(0)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }
}

/// Everything known about one track after it was downloaded
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: ArtistField,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub album_artist: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub composer: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub record_label: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub isrc: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub playlist_index: Option<u32>,
    /// Size of the collection the track came from, set by the batch runner
    #[serde(default)]
    pub n_entries: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub thumbnails: Vec<Thumbnail>,
}

/// Flat entry of a collection listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
}

impl CollectionEntry {
    /// URL to download from, preferring the flat `url`
    pub fn download_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or(self.webpage_url.as_deref())
            .filter(|u| !u.is_empty())
    }

    pub fn track_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Flattened result of resolving a URL: a collection or a single track
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub entries: Vec<CollectionEntry>,
    pub total: u32,
}
