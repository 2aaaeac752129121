use anyhow::{Context, Result};
use lofty::config::{ParseOptions, WriteOptions};
use lofty::file::AudioFile;
use lofty::ogg::{OggPictureStorage, OpusFile, VorbisComments};
use lofty::picture::{MimeType, Picture, PictureInformation, PictureType};
use lofty::tag::TagExt;
use std::fs::File;
use std::path::Path;
use tracing::debug;

use crate::cover_art::CoverArt;
use crate::metadata::TagSet;

/// Colour depth declared for embedded JPEG covers
const COVER_COLOR_DEPTH: u32 = 24;

/// Build the picture and its block description for an embedded front cover
pub fn front_cover(cover: &CoverArt) -> (Picture, PictureInformation) {
    let picture = Picture::new_unchecked(
        PictureType::CoverFront,
        Some(MimeType::Jpeg),
        None,
        cover.data.clone(),
    );
    let info = PictureInformation {
        width: cover.width,
        height: cover.height,
        color_depth: COVER_COLOR_DEPTH,
        num_colors: 0,
    };
    (picture, info)
}

/// Copy a tag set into Vorbis comments, replacing fields of the same name.
///
/// The cover is stored as a base64 `METADATA_BLOCK_PICTURE` by lofty. Any
/// front cover already present is replaced, other picture types are kept.
pub fn apply_tags(tags: &TagSet, comments: &mut VorbisComments) -> Result<()> {
    for (key, value) in tags.fields() {
        comments.insert(key.to_string(), value.to_string());
    }

    if let Some(cover) = &tags.picture {
        let (picture, info) = front_cover(cover);
        comments.remove_picture_type(PictureType::CoverFront);
        comments
            .insert_picture(picture, Some(info))
            .context("Failed to embed cover art")?;
    }

    Ok(())
}

/// Open an Ogg Opus file, write the tag set into it and save.
///
/// Fails if the file cannot be read or is not a valid Opus stream.
pub fn write_opus_tags(path: &Path, tags: &TagSet) -> Result<()> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    let mut opus = OpusFile::read_from(&mut file, ParseOptions::new())
        .with_context(|| format!("'{}' is not a valid Opus file", path.display()))?;
    drop(file);

    let comments = opus.vorbis_comments_mut();
    apply_tags(tags, comments)?;
    comments
        .save_to_path(path, WriteOptions::default())
        .with_context(|| format!("Failed to save tags to '{}'", path.display()))?;

    debug!(fields = tags.len(), cover = tags.picture.is_some(), "Wrote tags to {}", path.display());
    Ok(())
}
