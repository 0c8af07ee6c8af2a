//! Image decoding and encoding.
//!
//! Thin layer over the `image` crate turning uploaded bytes into a
//! [`PixelGrid`] and back. Encoding goes through the format's
//! `ImageEncoder` directly so output bytes depend only on
//! `(grid, format, quality)`.
//!
//! ## Formats
//!
//! | Format | Decode | Encode | Quality |
//! |--------|--------|--------|---------|
//! | PNG    | yes    | yes    | ignored |
//! | JPEG   | yes    | yes    | 0.0-1.0 |
//! | WebP   | yes    | lossless | ignored |
//! | GIF, BMP | yes  | no     | - |

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageEncoder, ImageReader, Limits};
use tracing::debug;

use crate::config::ToolkitConfig;
use crate::error::{Error, Result};
use crate::grid::PixelGrid;

/// Widest decoded sample layout (`Rgba32F`); sizes the decoder allocation cap.
const MAX_DECODED_BYTES_PER_PIXEL: u64 = 16;

/// Output container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::WebP => "webp",
        }
    }

    /// Parse a MIME type such as `image/jpeg` (parameters are ignored).
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// True when `quality` changes the encoded output.
    pub fn is_lossy(self) -> bool {
        matches!(self, ImageFormat::Jpeg)
    }
}

/// Map an upload MIME type to the decoder format, rejecting anything the
/// widgets never accepted.
fn decoder_format(mime: &str) -> Result<image::ImageFormat> {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/png" => Ok(image::ImageFormat::Png),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Ok(image::ImageFormat::Jpeg),
        "image/webp" => Ok(image::ImageFormat::WebP),
        "image/gif" => Ok(image::ImageFormat::Gif),
        "image/bmp" => Ok(image::ImageFormat::Bmp),
        _ => Err(Error::Decode(format!("unsupported image type: {mime}"))),
    }
}

/// Decode an uploaded buffer with default limits.
pub fn decode(bytes: &[u8], mime_type: Option<&str>) -> Result<PixelGrid> {
    decode_with_config(bytes, mime_type, &ToolkitConfig::default())
}

/// Decode an uploaded buffer into an RGBA grid.
///
/// # Arguments
/// * `bytes` - Encoded image
/// * `mime_type` - Declared type; `None` sniffs the format from the bytes
/// * `config` - Supplies the decoded pixel ceiling
///
/// # Errors
/// `Decode` for empty, corrupt, unsupported or over-limit input.
pub fn decode_with_config(
    bytes: &[u8],
    mime_type: Option<&str>,
    config: &ToolkitConfig,
) -> Result<PixelGrid> {
    if bytes.is_empty() {
        return Err(Error::Decode("empty input".into()));
    }

    let mut reader = match mime_type {
        Some(mime) => ImageReader::with_format(Cursor::new(bytes), decoder_format(mime)?),
        None => ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| Error::Decode(e.to_string()))?,
    };
    if reader.format().is_none() {
        return Err(Error::Decode("unrecognized image format".into()));
    }

    let mut limits = Limits::default();
    limits.max_alloc = Some(
        config
            .max_decoded_pixels
            .saturating_mul(MAX_DECODED_BYTES_PER_PIXEL),
    );
    reader.limits(limits);

    let decoder = reader
        .into_decoder()
        .map_err(|e| Error::Decode(e.to_string()))?;
    // header dimensions, checked before any pixel buffer is allocated
    let (header_width, header_height) = decoder.dimensions();
    if u64::from(header_width) * u64::from(header_height) > config.max_decoded_pixels {
        return Err(Error::Decode(format!(
            "{}x{} exceeds the {} pixel limit",
            header_width, header_height, config.max_decoded_pixels
        )));
    }

    let image = DynamicImage::from_decoder(decoder).map_err(|e| Error::Decode(e.to_string()))?;
    let (width, height) = (image.width() as usize, image.height() as usize);

    let grid = PixelGrid::from_raw(width, height, image.to_rgba8().into_raw())
        .map_err(|e| Error::Decode(e.to_string()))?;
    debug!(width, height, bytes = bytes.len(), "decoded image");
    Ok(grid)
}

/// Encode a grid.
///
/// # Arguments
/// * `grid` - Pixels to encode
/// * `format` - Output container
/// * `quality` - 0.0-1.0, clamped; only JPEG uses it (default 0.92)
///
/// # Returns
/// Encoded bytes, identical for identical arguments
pub fn encode(grid: &PixelGrid, format: ImageFormat, quality: Option<f32>) -> Result<Vec<u8>> {
    grid.ensure_non_empty()?;
    let width = u32::try_from(grid.width())
        .map_err(|_| Error::Encode("width exceeds u32".into()))?;
    let height = u32::try_from(grid.height())
        .map_err(|_| Error::Encode("height exceeds u32".into()))?;

    let mut out = Vec::new();
    match format {
        ImageFormat::Png => {
            PngEncoder::new(&mut out)
                .write_image(grid.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(|e| Error::Encode(e.to_string()))?;
        }
        ImageFormat::Jpeg => {
            let q = jpeg_quality(quality);
            let rgb: Vec<u8> = grid
                .as_raw()
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            JpegEncoder::new_with_quality(&mut out, q)
                .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
                .map_err(|e| Error::Encode(e.to_string()))?;
        }
        ImageFormat::WebP => {
            WebPEncoder::new_lossless(&mut out)
                .write_image(grid.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(|e| Error::Encode(e.to_string()))?;
        }
    }

    debug!(?format, width, height, bytes = out.len(), "encoded image");
    Ok(out)
}

/// Map canvas-style quality (0.0-1.0) to the JPEG encoder's 1-100 scale.
fn jpeg_quality(quality: Option<f32>) -> u8 {
    let q = quality.filter(|q| !q.is_nan()).unwrap_or(0.92).clamp(0.0, 1.0);
    ((q * 100.0).round() as u8).max(1)
}
