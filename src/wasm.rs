//! WebAssembly exports for the browser widgets.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. Images cross
//! the boundary as flat RGBA bytes (the layout of canvas `ImageData.data`)
//! plus width and height. Errors surface as JavaScript exceptions carrying
//! the error message.

use rand::rngs::StdRng;
use rand::SeedableRng;
use wasm_bindgen::prelude::*;

use crate::analysis::{extract_palette, Histogram};
use crate::codec::{encode, ImageFormat};
use crate::compositor::{composite, Transform};
use crate::config::ToolkitConfig;
use crate::error::Error;
use crate::filters;
use crate::grid::{PixelGrid, Point};

fn to_grid(data: &[u8], width: usize, height: usize) -> Result<PixelGrid, JsValue> {
    PixelGrid::from_raw(width, height, data.to_vec()).map_err(to_js)
}

fn to_js(error: Error) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn finish(result: crate::error::Result<PixelGrid>) -> Result<Vec<u8>, JsValue> {
    result.map(PixelGrid::into_raw).map_err(to_js)
}

// ============================================================================
// Tonal
// ============================================================================

/// Scale RGB by `percent` (0-200).
///
/// # Arguments
/// * `data` - Flat array of RGBA bytes (length = width * height * 4)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `percent` - 100 is unchanged
///
/// # Returns
/// Flat array of RGBA bytes
#[wasm_bindgen]
pub fn brightness_wasm(data: &[u8], width: usize, height: usize, percent: f32) -> Result<Vec<u8>, JsValue> {
    finish(filters::brightness(&to_grid(data, width, height)?, percent))
}

#[wasm_bindgen]
pub fn contrast_wasm(data: &[u8], width: usize, height: usize, percent: f32) -> Result<Vec<u8>, JsValue> {
    finish(filters::contrast(&to_grid(data, width, height)?, percent))
}

#[wasm_bindgen]
pub fn red_eye_wasm(data: &[u8], width: usize, height: usize) -> Result<Vec<u8>, JsValue> {
    finish(filters::red_eye(&to_grid(data, width, height)?))
}

// ============================================================================
// Blur / Sharpen / Noise
// ============================================================================

#[wasm_bindgen]
pub fn gaussian_blur_wasm(data: &[u8], width: usize, height: usize, radius: f32) -> Result<Vec<u8>, JsValue> {
    finish(filters::gaussian_blur(&to_grid(data, width, height)?, radius))
}

#[wasm_bindgen]
pub fn box_blur_wasm(data: &[u8], width: usize, height: usize, radius: usize) -> Result<Vec<u8>, JsValue> {
    finish(filters::box_blur(&to_grid(data, width, height)?, radius))
}

#[wasm_bindgen]
pub fn sharpen_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    amount: f32,
    radius: f32,
    threshold: u8,
) -> Result<Vec<u8>, JsValue> {
    finish(filters::unsharp_mask(&to_grid(data, width, height)?, amount, radius, threshold))
}

/// Add uniform noise; `seed` makes the result reproducible.
#[wasm_bindgen]
pub fn add_noise_wasm(data: &[u8], width: usize, height: usize, amount: f32, seed: u32) -> Result<Vec<u8>, JsValue> {
    let mut rng = StdRng::seed_from_u64(seed as u64);
    finish(filters::add_noise(&to_grid(data, width, height)?, amount, &mut rng))
}

#[wasm_bindgen]
pub fn remove_noise_wasm(data: &[u8], width: usize, height: usize, amount: f32) -> Result<Vec<u8>, JsValue> {
    finish(filters::remove_noise(&to_grid(data, width, height)?, amount))
}

// ============================================================================
// Stylize / Geometry
// ============================================================================

#[wasm_bindgen]
pub fn pixelate_wasm(data: &[u8], width: usize, height: usize, block_size: usize) -> Result<Vec<u8>, JsValue> {
    finish(filters::pixelate(&to_grid(data, width, height)?, block_size))
}

#[wasm_bindgen]
pub fn halftone_wasm(data: &[u8], width: usize, height: usize, dot_size: usize, dark: bool) -> Result<Vec<u8>, JsValue> {
    let theme = if dark { filters::HalftoneTheme::Dark } else { filters::HalftoneTheme::Light };
    finish(filters::halftone(&to_grid(data, width, height)?, dot_size, theme))
}

#[wasm_bindgen]
pub fn glitch_wasm(data: &[u8], width: usize, height: usize, intensity: u32, seed: u32) -> Result<Vec<u8>, JsValue> {
    let mut rng = StdRng::seed_from_u64(seed as u64);
    finish(filters::glitch(&to_grid(data, width, height)?, intensity, &mut rng))
}

/// Lens distortion around `(center_x, center_y)`, given as fractions.
#[wasm_bindgen]
pub fn lens_distortion_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    strength: f32,
    center_x: f32,
    center_y: f32,
) -> Result<Vec<u8>, JsValue> {
    finish(filters::lens_distort(&to_grid(data, width, height)?, strength, Point::new(center_x, center_y)))
}

#[wasm_bindgen]
pub fn mirror_left_wasm(data: &[u8], width: usize, height: usize) -> Result<Vec<u8>, JsValue> {
    finish(filters::mirror_left(&to_grid(data, width, height)?))
}

#[wasm_bindgen]
pub fn mirror_right_wasm(data: &[u8], width: usize, height: usize) -> Result<Vec<u8>, JsValue> {
    finish(filters::mirror_right(&to_grid(data, width, height)?))
}

/// Absolute difference; the result is `max(width_a, width_b)` wide and
/// `max(height_a, height_b)` tall.
#[wasm_bindgen]
pub fn difference_wasm(
    a: &[u8],
    width_a: usize,
    height_a: usize,
    b: &[u8],
    width_b: usize,
    height_b: usize,
) -> Result<Vec<u8>, JsValue> {
    let a = to_grid(a, width_a, height_a)?;
    let b = to_grid(b, width_b, height_b)?;
    finish(filters::difference(&a, &b))
}

// ============================================================================
// Compositing
// ============================================================================

/// Draw `overlay` onto `base` (no clip).
#[wasm_bindgen]
pub fn composite_wasm(
    base: &[u8],
    base_width: usize,
    base_height: usize,
    overlay: &[u8],
    overlay_width: usize,
    overlay_height: usize,
    scale: f32,
    offset_x: f32,
    offset_y: f32,
    rotation_deg: f32,
    opacity: f32,
) -> Result<Vec<u8>, JsValue> {
    let base = to_grid(base, base_width, base_height)?;
    let overlay = to_grid(overlay, overlay_width, overlay_height)?;
    let transform = Transform { scale, offset_x, offset_y, rotation_deg, opacity };
    finish(composite(&base, &overlay, &transform, None))
}

// ============================================================================
// Analysis / Encoding
// ============================================================================

/// Histogram as 768 counts: 256 red, then green, then blue.
#[wasm_bindgen]
pub fn histogram_wasm(data: &[u8], width: usize, height: usize) -> Result<Vec<u32>, JsValue> {
    let hist = Histogram::compute(&to_grid(data, width, height)?);
    Ok(hist.red.iter().chain(&hist.green).chain(&hist.blue).copied().collect())
}

/// Dominant colors as a JSON array of `{"color": "#rrggbb", "weight": n}`.
#[wasm_bindgen]
pub fn palette_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    bucket_size: u8,
    count: usize,
) -> Result<String, JsValue> {
    let sample_width = ToolkitConfig::default().palette_sample_width;
    let palette = extract_palette(&to_grid(data, width, height)?, sample_width, bucket_size, count).map_err(to_js)?;
    serde_json::to_string(&palette).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Encode to `image/png`, `image/jpeg` or `image/webp`.
#[wasm_bindgen]
pub fn encode_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    mime_type: &str,
    quality: f32,
) -> Result<Vec<u8>, JsValue> {
    let format = ImageFormat::from_mime_type(mime_type)
        .ok_or_else(|| JsValue::from_str(&format!("unsupported output type {mime_type}")))?;
    encode(&to_grid(data, width, height)?, format, Some(quality)).map_err(to_js)
}
