//! Noise filters: Add Noise, Remove Noise.
//!
//! Noise is drawn from a caller-supplied `rand::Rng`; seed it with
//! `StdRng::seed_from_u64` for reproducible output. Removal is a Gaussian
//! blur whose strength grows with `amount`.

use rand::Rng;

use crate::error::Result;
use crate::grid::{PixelGrid, CHANNELS};

use super::core::{clamp_u8, gaussian_blur_premultiplied};

pub const MAX_NOISE_AMOUNT: f32 = 255.0;
pub const MAX_DENOISE_AMOUNT: f32 = 100.0;

/// Blur sigma per unit of removal amount (amount 100 -> sigma 5).
const DENOISE_SIGMA_PER_AMOUNT: f32 = 0.05;

// ============================================================================
// Add Noise
// ============================================================================

/// Add uniform noise to the color channels.
///
/// # Arguments
/// * `grid` - Source image
/// * `amount` - 0-255 (clamped); each of R, G, B gets an independent
///   offset in `[-amount/2, amount/2]`. 0 returns an exact copy.
/// * `rng` - Random source
///
/// # Returns
/// Noisy image; alpha unchanged
pub fn add_noise<R: Rng + ?Sized>(grid: &PixelGrid, amount: f32, rng: &mut R) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let amount = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, MAX_NOISE_AMOUNT) };
    if amount == 0.0 {
        return Ok(grid.clone());
    }

    let half = amount / 2.0;
    let (width, height) = grid.dimensions();
    let mut out = grid.as_raw().to_vec();
    for px in out.chunks_exact_mut(CHANNELS) {
        for v in px.iter_mut().take(3) {
            let noise: f32 = rng.gen_range(-half..=half);
            *v = clamp_u8(*v as f32 + noise);
        }
    }

    Ok(PixelGrid::from_raw_unchecked(width, height, out))
}

// ============================================================================
// Remove Noise
// ============================================================================

/// Smooth out noise with a Gaussian blur.
///
/// # Arguments
/// * `grid` - Source image
/// * `amount` - 0-100 (clamped); blur sigma is `amount / 20`, 0 returns a copy
pub fn remove_noise(grid: &PixelGrid, amount: f32) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let amount = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, MAX_DENOISE_AMOUNT) };
    if amount == 0.0 {
        return Ok(grid.clone());
    }
    Ok(gaussian_blur_premultiplied(grid, amount * DENOISE_SIGMA_PER_AMOUNT))
}
