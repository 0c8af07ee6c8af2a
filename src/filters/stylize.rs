//! Stylize filters: Halftone, Glitch.
//!
//! These are artistic effect filters. Halftone is deterministic; glitch
//! draws from a caller-supplied random generator, so a fixed seed gives a
//! reproducible result and production callers can seed from entropy.

use rand::Rng;
use rayon::prelude::*;

use crate::error::Result;
use crate::grid::{PixelGrid, CHANNELS};

use super::core::{luminance, render_rows};

// ============================================================================
// Halftone
// ============================================================================

/// Background/dot colors for the halftone filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HalftoneTheme {
    /// Black dots on white paper.
    #[default]
    Light,
    /// White dots on black.
    Dark,
}

impl HalftoneTheme {
    fn colors(self) -> ([u8; 4], [u8; 4]) {
        const WHITE: [u8; 4] = [255, 255, 255, 255];
        const BLACK: [u8; 4] = [0, 0, 0, 255];
        match self {
            HalftoneTheme::Light => (WHITE, BLACK),
            HalftoneTheme::Dark => (BLACK, WHITE),
        }
    }
}

/// Smallest and largest accepted dot cell.
pub const MIN_DOT_SIZE: usize = 2;
pub const MAX_DOT_SIZE: usize = 64;

/// Render an image as a grid of dots.
///
/// Each `dot_size x dot_size` cell becomes one filled circle centered in
/// the cell, radius `(1 - luminance / 255) * dot_size / 2`, so darker
/// cells get larger dots. Edge cells are averaged over their clipped area.
///
/// # Arguments
/// * `grid` - Source image
/// * `dot_size` - Cell edge in pixels, 2-64 (clamped)
/// * `theme` - Background/dot colors
///
/// # Returns
/// Opaque image with same dimensions
pub fn halftone(grid: &PixelGrid, dot_size: usize, theme: HalftoneTheme) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let cell = dot_size.clamp(MIN_DOT_SIZE, MAX_DOT_SIZE);
    let input = grid.view();
    let (height, width, _) = input.dim();
    let cells_x = width.div_ceil(cell);
    let cells_y = height.div_ceil(cell);

    let radii: Vec<f32> = (0..cells_x * cells_y)
        .into_par_iter()
        .map(|i| {
            let x0 = (i % cells_x) * cell;
            let y0 = (i / cells_x) * cell;
            let x1 = (x0 + cell).min(width);
            let y1 = (y0 + cell).min(height);
            let mut sum = 0.0f32;
            for y in y0..y1 {
                for x in x0..x1 {
                    sum += luminance(input[[y, x, 0]], input[[y, x, 1]], input[[y, x, 2]]);
                }
            }
            // whole levels, so pure white really yields a zero radius
            let lum = (sum / ((x1 - x0) * (y1 - y0)) as f32).round();
            (1.0 - lum / 255.0) * cell as f32 / 2.0
        })
        .collect();

    let (background, dot) = theme.colors();
    let half = cell as f32 / 2.0;

    Ok(render_rows(width, height, |x, y| {
        let (cx, cy) = (x / cell, y / cell);
        let radius = radii[cy * cells_x + cx];
        // distance from pixel center to cell center
        let dx = (x - cx * cell) as f32 + 0.5 - half;
        let dy = (y - cy * cell) as f32 + 0.5 - half;
        if radius > 0.0 && dx * dx + dy * dy <= radius * radius {
            dot
        } else {
            background
        }
    }))
}

// ============================================================================
// Glitch
// ============================================================================

pub const MIN_GLITCH_INTENSITY: u32 = 1;
pub const MAX_GLITCH_INTENSITY: u32 = 40;

/// Digital glitch effect.
///
/// Stage 1 samples the red and blue channels of every pixel from
/// independent random horizontal offsets in `[-intensity, intensity]`
/// (edge-clamped) while green stays put. Stage 2 walks the rows; at each
/// row, with probability `intensity / 100`, a band of
/// `1..=max(1, intensity / 2)` rows is redrawn shifted horizontally by a
/// random amount in `[-intensity / 2, intensity / 2]`. Pixels the shifted
/// band does not cover keep their stage-1 value.
///
/// # Arguments
/// * `grid` - Source image
/// * `intensity` - 1-40 (clamped)
/// * `rng` - Random source
pub fn glitch<R: Rng + ?Sized>(grid: &PixelGrid, intensity: u32, rng: &mut R) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let intensity = intensity.clamp(MIN_GLITCH_INTENSITY, MAX_GLITCH_INTENSITY) as i64;
    let (width, height) = grid.dimensions();
    let src = grid.as_raw();
    let row_len = width * CHANNELS;
    let max_x = width as i64 - 1;

    // Stage 1: channel offsets
    let mut shifted = vec![0u8; src.len()];
    for y in 0..height {
        let row = &src[y * row_len..(y + 1) * row_len];
        let dst = &mut shifted[y * row_len..(y + 1) * row_len];
        for x in 0..width {
            let dr = rng.gen_range(-intensity..=intensity);
            let db = rng.gen_range(-intensity..=intensity);
            let rx = (x as i64 + dr).clamp(0, max_x) as usize;
            let bx = (x as i64 + db).clamp(0, max_x) as usize;
            let o = x * CHANNELS;
            dst[o] = row[rx * CHANNELS];
            dst[o + 1] = row[o + 1];
            dst[o + 2] = row[bx * CHANNELS + 2];
            dst[o + 3] = row[o + 3];
        }
    }

    // Stage 2: scan-line block displacement
    let mut out = shifted.clone();
    let probability = intensity as f64 / 100.0;
    let max_band = (intensity / 2).max(1) as usize;
    let max_shift = intensity / 2;
    let mut y = 0;
    while y < height {
        if rng.gen_bool(probability) {
            let band = rng.gen_range(1..=max_band).min(height - y);
            let shift = rng.gen_range(-max_shift..=max_shift);
            for by in y..y + band {
                let row = &shifted[by * row_len..(by + 1) * row_len];
                let dst = &mut out[by * row_len..(by + 1) * row_len];
                for x in 0..width {
                    let sx = x as i64 - shift;
                    if (0..width as i64).contains(&sx) {
                        let s = sx as usize * CHANNELS;
                        dst[x * CHANNELS..(x + 1) * CHANNELS].copy_from_slice(&row[s..s + CHANNELS]);
                    }
                }
            }
            y += band;
        } else {
            y += 1;
        }
    }

    Ok(PixelGrid::from_raw_unchecked(width, height, out))
}
