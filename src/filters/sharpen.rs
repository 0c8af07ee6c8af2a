//! Sharpen filter: Unsharp Mask.
//!
//! Detail is the difference between the image and its Gaussian blur; the
//! mask adds a multiple of that detail back. The threshold leaves smooth
//! areas alone so noise and JPEG blocking are not amplified.

use rayon::prelude::*;

use crate::error::Result;
use crate::grid::{PixelGrid, CHANNELS};

use super::core::{clamp_u8, gaussian_blur_premultiplied};

/// Apply unsharp mask.
///
/// # Arguments
/// * `grid` - Source image
/// * `amount` - Sharpening amount, 0.0-5.0 (1.0 = 100%)
/// * `radius` - Blur sigma for the mask, 0.5-10.0
/// * `threshold` - Minimum |detail| to sharpen, 0-255
///
/// # Returns
/// Sharpened image; alpha unchanged
pub fn unsharp_mask(grid: &PixelGrid, amount: f32, radius: f32, threshold: u8) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let amount = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, 5.0) };
    if amount == 0.0 {
        return Ok(grid.clone());
    }
    let radius = if radius.is_nan() { 1.0 } else { radius.clamp(0.5, 10.0) };

    let (width, height) = grid.dimensions();
    let blurred = gaussian_blur_premultiplied(grid, radius);
    let src = grid.as_raw();
    let soft = blurred.as_raw();
    let row_len = width * CHANNELS;
    let threshold = threshold as f32;

    let mut out = vec![0u8; src.len()];
    out.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let base = y * row_len;
            for (i, d) in row.iter_mut().enumerate() {
                let orig = src[base + i];
                if i % CHANNELS == 3 {
                    *d = orig;
                    continue;
                }
                let diff = orig as f32 - soft[base + i] as f32;
                *d = if diff.abs() > threshold {
                    clamp_u8(orig as f32 + diff * amount)
                } else {
                    orig
                };
            }
        });

    Ok(PixelGrid::from_raw_unchecked(width, height, out))
}
