//! Metadata extraction and quality analysis.
//!
//! The pixel-level codec is a collaborator behind the [`ImageCodec`] trait;
//! this module turns its output into the catalog's [`ImageData`]/[`ExifData`]
//! shape and scores print suitability from pixel counts.

use crate::error::{CatalogError, Result};
use crate::photo::{reduce_aspect_ratio, ExifData, GpsCoordinates, ImageData, Orientation};
use chrono::NaiveDateTime;
use exif::{In, Tag};
use image::GenericImageView;
use std::io::Cursor;
use std::sync::Arc;

/// Default DPI when the image carries no resolution metadata
pub const DEFAULT_DPI: i32 = 72;
/// Default color space when none is declared
pub const DEFAULT_COLOR_SPACE: &str = "sRGB";

/// Raw facts the codec reads out of image bytes
#[derive(Debug, Clone, Default)]
pub struct DecodedInfo {
    pub width: u32,
    pub height: u32,
    pub dpi: Option<u32>,
    pub color_space: Option<String>,
    pub has_transparency: bool,
    pub exif: Option<ExifData>,
}

/// Decode/re-encode collaborator. Failures surface as
/// [`CatalogError::Processing`] and never abort sibling files.
#[cfg_attr(test, mockall::automock)]
pub trait ImageCodec: Send + Sync {
    /// Decode dimensions, format properties and EXIF from raw bytes
    fn decode_info(&self, bytes: &[u8]) -> Result<DecodedInfo>;

    /// Render a thumbnail no larger than `max_edge` on its longest side,
    /// encoded as JPEG
    fn render_thumbnail(&self, bytes: &[u8], max_edge: u32) -> Result<Vec<u8>>;
}

/// Derives catalog metadata from codec output
pub struct MetadataExtractor {
    codec: Arc<dyn ImageCodec>,
}

impl MetadataExtractor {
    pub fn new(codec: Arc<dyn ImageCodec>) -> Self {
        Self { codec }
    }

    /// Decode raw bytes into the catalog's image data plus optional EXIF
    pub fn extract(&self, bytes: &[u8]) -> Result<(ImageData, Option<ExifData>)> {
        let info = self.codec.decode_info(bytes)?;
        Ok((image_data_from(&info), info.exif))
    }

    /// [`extract`](Self::extract) on a blocking worker thread. Decoding a
    /// full-resolution original is CPU-bound and would stall the async
    /// runtime if run inline.
    pub async fn extract_blocking(&self, bytes: Vec<u8>) -> Result<(ImageData, Option<ExifData>)> {
        let codec = Arc::clone(&self.codec);
        tokio::task::spawn_blocking(move || -> Result<(ImageData, Option<ExifData>)> {
            let info = codec.decode_info(&bytes)?;
            Ok((image_data_from(&info), info.exif))
        })
        .await
        .map_err(|err| CatalogError::Processing(format!("decode task failed: {err}")))?
    }
}

/// Map decoded facts onto [`ImageData`], applying the documented defaults
pub fn image_data_from(info: &DecodedInfo) -> ImageData {
    ImageData {
        width: info.width as i32,
        height: info.height as i32,
        orientation: Orientation::from_dimensions(info.width, info.height),
        aspect_ratio: reduce_aspect_ratio(info.width, info.height),
        dpi: info.dpi.map(|d| d as i32).unwrap_or(DEFAULT_DPI),
        color_space: info
            .color_space
            .clone()
            .unwrap_or_else(|| DEFAULT_COLOR_SPACE.to_string()),
        has_transparency: info.has_transparency,
    }
}

/// Outcome of quality analysis
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    /// 0.0 - 10.0
    pub quality_score: f32,
    /// Print sizes the pixel count supports
    pub recommended_print_sizes: Vec<String>,
    /// Suggested when the score falls below 6.0
    pub enhancement_recommended: bool,
}

/// Scores print suitability from the pixel-count threshold table:
/// >= 3000x2400 supports 4x6/5x7/8x10, >= 2400x1800 supports 4x6/5x7,
/// >= 1800x1200 supports 4x6 only.
pub struct QualityAnalyzer;

impl QualityAnalyzer {
    pub fn analyze(width: u32, height: u32) -> QualityReport {
        let pixels = width as u64 * height as u64;

        let (quality_score, recommended_print_sizes): (f32, Vec<&str>) =
            if pixels >= 3000 * 2400 {
                let score = if pixels >= 4000 * 3000 { 9.5 } else { 8.5 };
                (score, vec!["4x6", "5x7", "8x10"])
            } else if pixels >= 2400 * 1800 {
                (7.0, vec!["4x6", "5x7"])
            } else if pixels >= 1800 * 1200 {
                (5.5, vec!["4x6"])
            } else {
                (3.0, vec![])
            };

        QualityReport {
            quality_score,
            recommended_print_sizes: recommended_print_sizes
                .into_iter()
                .map(String::from)
                .collect(),
            enhancement_recommended: quality_score < 6.0,
        }
    }
}

/// Codec backed by the `image` and `kamadak-exif` crates
pub struct DefaultCodec;

impl ImageCodec for DefaultCodec {
    fn decode_info(&self, bytes: &[u8]) -> Result<DecodedInfo> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| CatalogError::Processing(format!("decode failed: {}", e)))?;

        let (width, height) = img.dimensions();
        let exif = parse_exif(bytes);
        let dpi = exif.as_ref().and_then(|_| exif_dpi(bytes));

        Ok(DecodedInfo {
            width,
            height,
            dpi,
            color_space: None,
            has_transparency: img.color().has_alpha(),
            exif,
        })
    }

    fn render_thumbnail(&self, bytes: &[u8], max_edge: u32) -> Result<Vec<u8>> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| CatalogError::Processing(format!("decode failed: {}", e)))?;

        // JPEG has no alpha channel; flatten before encoding.
        let thumbnail = image::DynamicImage::ImageRgb8(img.thumbnail(max_edge, max_edge).to_rgb8());

        let mut buffer = Vec::new();
        thumbnail
            .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Jpeg)
            .map_err(|e| CatalogError::Processing(format!("thumbnail encode failed: {}", e)))?;

        Ok(buffer)
    }
}

/// Read the EXIF block, if any. Absent or unparseable EXIF is not an error.
fn parse_exif(bytes: &[u8]) -> Option<ExifData> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;

    let captured_at = field_string(&exif, Tag::DateTimeOriginal).and_then(|raw| {
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    });

    let gps = match (
        gps_coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S"),
        gps_coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W"),
    ) {
        (Some(latitude), Some(longitude)) => Some(GpsCoordinates {
            latitude,
            longitude,
        }),
        _ => None,
    };

    Some(ExifData {
        camera_make: field_string(&exif, Tag::Make),
        camera_model: field_string(&exif, Tag::Model),
        lens_model: field_string(&exif, Tag::LensModel),
        iso: exif
            .get_field(Tag::PhotographicSensitivity, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0)),
        aperture: field_string(&exif, Tag::FNumber),
        shutter_speed: field_string(&exif, Tag::ExposureTime),
        focal_length: field_string(&exif, Tag::FocalLength),
        captured_at,
        gps,
    })
}

fn field_string(exif: &exif::Exif, tag: Tag) -> Option<String> {
    exif.get_field(tag, In::PRIMARY).map(|field| {
        field
            .display_value()
            .to_string()
            .trim_matches('"')
            .to_string()
    })
}

fn exif_dpi(bytes: &[u8]) -> Option<u32> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif.get_field(Tag::XResolution, In::PRIMARY)?;
    match &field.value {
        exif::Value::Rational(values) if !values.is_empty() => {
            Some(values[0].to_f64().round() as u32)
        }
        _ => None,
    }
}

/// Convert a degrees/minutes/seconds rational triple into decimal degrees,
/// negated when the hemisphere reference matches `negative_ref`.
fn gps_coordinate(exif: &exif::Exif, tag: Tag, ref_tag: Tag, negative_ref: &str) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let rationals = match &field.value {
        exif::Value::Rational(values) if values.len() >= 3 => values,
        _ => return None,
    };

    let degrees = rationals[0].to_f64()
        + rationals[1].to_f64() / 60.0
        + rationals[2].to_f64() / 3600.0;

    let reference = exif
        .get_field(ref_tag, In::PRIMARY)
        .map(|f| f.display_value().to_string())
        .unwrap_or_default();

    Some(if reference.contains(negative_ref) {
        -degrees
    } else {
        degrees
    })
}
