//! Cover art selection and normalization.
//!
//! Picks the best thumbnail the extractor reported, downloads it and turns it
//! into a square JPEG no larger than `MAX_COVER_EDGE` on either side.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView};
use std::time::Duration;
use tracing::{debug, warn};

use crate::record::Thumbnail;

/// Longest edge allowed for embedded covers
pub const MAX_COVER_EDGE: u32 = 800;

/// JPEG quality used when re-encoding covers
pub const JPEG_QUALITY: u8 = 85;

/// Timeout for a single cover download
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Width and height may differ by this many pixels and still count as square
const SQUARE_TOLERANCE: u32 = 2;

const USER_AGENT: &str = concat!("mharvest/", env!("CARGO_PKG_VERSION"));

/// The thumbnail chosen as cover
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverChoice {
    pub url: String,
    pub square: bool,
}

/// A processed cover ready to embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub fn is_square(thumb: &Thumbnail) -> bool {
    thumb.width() > 0 && thumb.width().abs_diff(thumb.height()) <= SQUARE_TOLERANCE
}

/// Choose a cover among the candidate thumbnails.
///
/// The largest square thumbnail wins. Without one, the largest thumbnail of
/// any shape is used, defaulting to the last entry when no area beats zero.
/// Ties keep the first candidate seen.
pub fn select_cover(thumbnails: &[Thumbnail]) -> Option<CoverChoice> {
    let mut max_area = 0;
    let mut best_square: Option<&Thumbnail> = None;

    for thumb in thumbnails.iter().filter(|t| is_square(t)) {
        if thumb.area() > max_area {
            max_area = thumb.area();
            best_square = Some(thumb);
        }
    }

    if let Some(thumb) = best_square {
        return Some(CoverChoice {
            url: thumb.url.clone(),
            square: true,
        });
    }

    let mut best = thumbnails.last()?;
    for thumb in thumbnails {
        if thumb.area() > max_area {
            max_area = thumb.area();
            best = thumb;
        }
    }

    Some(CoverChoice {
        url: best.url.clone(),
        square: false,
    })
}

/// Download raw image bytes
pub async fn fetch_image_bytes(url: &str) -> Result<Vec<u8>> {
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch cover art from {}", url))?
        .error_for_status()
        .with_context(|| format!("Cover art request to {} was rejected", url))?;

    let bytes = response
        .bytes()
        .await
        .context("Failed to read cover art data")?;

    Ok(bytes.to_vec())
}

/// Turn encoded image bytes into a square, bounded JPEG.
///
/// Transparent and palette images are flattened to RGB, non-square images are
/// center-cropped to their shorter side, and anything larger than
/// `MAX_COVER_EDGE` is shrunk with a Lanczos filter. Small images are never
/// enlarged.
pub fn normalize_image(bytes: &[u8]) -> Result<CoverArt> {
    let mut img = image::load_from_memory(bytes).context("Failed to decode cover image")?;

    if !matches!(img.color(), ColorType::Rgb8 | ColorType::L8) {
        img = DynamicImage::ImageRgb8(img.to_rgb8());
    }

    let (width, height) = img.dimensions();
    if width != height {
        let side = width.min(height);
        let left = (width - side) / 2;
        let top = (height - side) / 2;
        img = img.crop_imm(left, top, side, side);
    }

    if img.width() > MAX_COVER_EDGE || img.height() > MAX_COVER_EDGE {
        img = img.resize(MAX_COVER_EDGE, MAX_COVER_EDGE, FilterType::Lanczos3);
    }

    let mut data = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut data, JPEG_QUALITY))
        .context("Failed to encode cover as JPEG")?;

    Ok(CoverArt {
        data,
        width: img.width(),
        height: img.height(),
    })
}

/// Fetch and normalize a cover. Never fails: problems are logged and yield `None`.
pub async fn normalize_cover(url: Option<&str>) -> Option<CoverArt> {
    let url = url.filter(|u| !u.is_empty())?;

    let result = match fetch_image_bytes(url).await {
        Ok(bytes) => normalize_image(&bytes),
        Err(e) => Err(e),
    };

    match result {
        Ok(cover) => {
            debug!(url = %url, width = cover.width, height = cover.height, "Processed cover art");
            Some(cover)
        }
        Err(e) => {
            warn!("Failed to process cover art from {}: {:#}", url, e);
            None
        }
    }
}

/// Select the best thumbnail and turn it into an embeddable cover
pub async fn cover_from_thumbnails(thumbnails: &[Thumbnail]) -> Option<CoverArt> {
    let choice = select_cover(thumbnails)?;
    if !choice.square {
        debug!(url = %choice.url, "No square thumbnail available, cropping the largest one");
    }
    normalize_cover(Some(&choice.url)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb, Rgba};
    use std::io::Cursor;

    fn encode_png(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("png encoding should succeed");
        buf
    }

    #[test]
    fn test_select_cover_prefers_largest_square() {
        let thumbs = vec![
            Thumbnail::new("a", 300, 300),
            Thumbnail::new("b", 500, 250),
            Thumbnail::new("c", 600, 600),
        ];
        assert_eq!(
            select_cover(&thumbs),
            Some(CoverChoice {
                url: "c".into(),
                square: true
            })
        );
    }

    #[test]
    fn test_select_cover_square_beats_larger_rectangle() {
        let thumbs = vec![
            Thumbnail::new("wide", 1280, 720),
            Thumbnail::new("almost", 544, 542),
        ];
        let choice = select_cover(&thumbs).unwrap();
        assert_eq!(choice.url, "almost");
        assert!(choice.square);
    }

    #[test]
    fn test_select_cover_falls_back_to_largest_area() {
        let thumbs = vec![Thumbnail::new("a", 500, 250), Thumbnail::new("b", 600, 300)];
        assert_eq!(
            select_cover(&thumbs),
            Some(CoverChoice {
                url: "b".into(),
                square: false
            })
        );
    }

    #[test]
    fn test_select_cover_ties_keep_first() {
        let thumbs = vec![
            Thumbnail::new("first", 400, 200),
            Thumbnail::new("second", 200, 400),
            Thumbnail::new("small", 10, 5),
        ];
        assert_eq!(select_cover(&thumbs).unwrap().url, "first");
    }

    #[test]
    fn test_select_cover_without_dimensions_uses_last() {
        let thumbs = vec![
            Thumbnail {
                url: "first".into(),
                ..Default::default()
            },
            Thumbnail {
                url: "last".into(),
                ..Default::default()
            },
        ];
        let choice = select_cover(&thumbs).unwrap();
        assert_eq!(choice.url, "last");
        assert!(!choice.square);
    }

    #[test]
    fn test_select_cover_empty() {
        assert_eq!(select_cover(&[]), None);
    }

    #[test]
    fn test_normalize_image_crops_landscape() -> Result<()> {
        let source = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(1000, 600, Rgb([10, 20, 30])));
        let cover = normalize_image(&encode_png(&source))?;

        assert_eq!((cover.width, cover.height), (600, 600));
        let decoded = image::load_from_memory_with_format(&cover.data, ImageFormat::Jpeg)?;
        assert_eq!(decoded.dimensions(), (600, 600));
        Ok(())
    }

    #[test]
    fn test_normalize_image_shrinks_large_images() -> Result<()> {
        let source = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(1200, 2000, Rgb([200, 0, 0])));
        let cover = normalize_image(&encode_png(&source))?;
        assert_eq!((cover.width, cover.height), (MAX_COVER_EDGE, MAX_COVER_EDGE));
        Ok(())
    }

    #[test]
    fn test_normalize_image_never_enlarges() -> Result<()> {
        let source = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(120, 120, Rgb([0, 0, 0])));
        let cover = normalize_image(&encode_png(&source))?;
        assert_eq!((cover.width, cover.height), (120, 120));
        Ok(())
    }

    #[test]
    fn test_normalize_image_flattens_alpha() -> Result<()> {
        let source =
            DynamicImage::ImageRgba8(ImageBuffer::from_pixel(64, 48, Rgba([255, 0, 0, 128])));
        let cover = normalize_image(&encode_png(&source))?;
        assert_eq!((cover.width, cover.height), (48, 48));
        assert!(cover.data.starts_with(&[0xFF, 0xD8, 0xFF]));
        Ok(())
    }

    #[test]
    fn test_normalize_image_rejects_garbage() {
        assert!(normalize_image(b"definitely-not-an-image").is_err());
    }

    #[tokio::test]
    async fn test_normalize_cover_absent_url() {
        assert_eq!(normalize_cover(None).await, None);
        assert_eq!(normalize_cover(Some("")).await, None);
    }

    #[tokio::test]
    async fn test_normalize_cover_unreachable_host_degrades() {
        assert_eq!(normalize_cover(Some("http://127.0.0.1:9/cover.jpg")).await, None);
    }
}
