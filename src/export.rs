//! Download naming and compression reporting.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::codec::ImageFormat;

/// Distinguishes exported files that share a base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTag {
    /// `-YYYYMMDD-HHMMSS`
    Timestamp(DateTime<Utc>),
    /// `-<suffix>`, sanitized like the base name
    Suffix(String),
}

impl FileTag {
    pub fn now() -> Self {
        FileTag::Timestamp(Utc::now())
    }
}

const FALLBACK_NAME: &str = "image";

/// Name for a downloaded image.
///
/// The extension (if any) and directory part of `base` are dropped,
/// characters outside `[A-Za-z0-9._-]` become `-`, and an empty result
/// falls back to `image`.
///
/// # Example
/// `export_filename("My Photo.jpeg", &FileTag::Suffix("blur".into()), ImageFormat::Png)`
/// gives `My-Photo-blur.png`.
pub fn export_filename(base: &str, tag: &FileTag, format: ImageFormat) -> String {
    let name = base.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(base);
    let stem = match name.rfind('.') {
        Some(i) => &name[..i],
        None => name,
    };
    let mut stem = sanitize(stem);
    if stem.is_empty() {
        stem = FALLBACK_NAME.to_string();
    }

    let tag = match tag {
        FileTag::Timestamp(at) => at.format("%Y%m%d-%H%M%S").to_string(),
        FileTag::Suffix(suffix) => sanitize(suffix),
    };
    if tag.is_empty() {
        format!("{stem}.{}", format.extension())
    } else {
        format!("{stem}-{tag}.{}", format.extension())
    }
}

fn sanitize(name: &str) -> String {
    name.replace(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')), "-")
}

/// Input and output sizes of a compress/convert run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeReport {
    pub original_bytes: u64,
    pub encoded_bytes: u64,
}

impl SizeReport {
    pub fn new(original_bytes: u64, encoded_bytes: u64) -> Self {
        Self { original_bytes, encoded_bytes }
    }

    /// Percent saved relative to the original; negative when the output
    /// grew. 0.0 for an empty original.
    pub fn savings_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.encoded_bytes as f64 / self.original_bytes as f64) * 100.0
    }
}
