//! Toolkit configuration.
//!
//! All tunables live in [`ToolkitConfig`]. `Default` gives values suitable
//! for interactive browser previews; hosts can override any subset from JSON
//! since every struct is `#[serde(default)]`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Decoded pixel ceiling (`width * height`); larger uploads are rejected.
    pub max_decoded_pixels: u64,
    /// JPEG quality (0.0-1.0) used when `export` is called without one.
    pub default_jpeg_quality: f32,
    /// Palette extraction sampling width in pixels.
    pub palette_sample_width: usize,
    /// Per-channel quantization bucket size for palette extraction.
    pub palette_bucket_size: u8,
    /// Number of dominant colors returned by palette extraction.
    pub palette_size: usize,
    /// Most commits kept for undo; the oldest are dropped first.
    pub max_history: usize,
    /// Byte budget for the undo history.
    pub max_history_bytes: u64,
    /// Remote image service settings.
    pub remote: RemoteConfig,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            max_decoded_pixels: 40_000_000,
            default_jpeg_quality: 0.92,
            palette_sample_width: 100,
            palette_bucket_size: 40,
            palette_size: 5,
            max_history: 20,
            max_history_bytes: 512 * 1024 * 1024,
            remote: RemoteConfig::default(),
        }
    }
}

/// Remote AI image service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Endpoint receiving JSON edit requests.
    pub endpoint: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Largest accepted reply body in bytes.
    pub max_response_bytes: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/v1/images/edit".to_string(),
            timeout_secs: 60,
            connect_timeout_secs: 8,
            max_response_bytes: 32 * 1024 * 1024,
        }
    }
}

impl ToolkitConfig {
    /// Parse a (possibly partial) JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| Error::InvalidInput(format!("config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no operation could work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_decoded_pixels == 0 {
            return Err(Error::InvalidInput("max_decoded_pixels must be > 0".into()));
        }
        if self.palette_sample_width == 0 || self.palette_bucket_size == 0 {
            return Err(Error::InvalidInput(
                "palette sampling width and bucket size must be > 0".into(),
            ));
        }
        if self.remote.timeout_secs == 0 {
            return Err(Error::InvalidInput("remote timeout must be > 0".into()));
        }
        Ok(())
    }
}
