//! Color adjustment filters: Brightness, Contrast, Red-eye reduction.
//!
//! These are pixel-wise operations that don't require spatial context.
//! Brightness and contrast follow the canvas `filter` formulas so previews
//! match the browser within rounding. Alpha is always preserved.

use crate::error::Result;
use crate::grid::PixelGrid;

use super::core::{clamp_u8, map_pixels};

// ============================================================================
// Brightness
// ============================================================================

/// Scale every color channel linearly.
///
/// # Arguments
/// * `grid` - Source image
/// * `percent` - 0-200 (clamped), 100 = no change, 0 = black
///
/// # Returns
/// `round(channel * percent / 100)`, saturated to 0-255
pub fn brightness(grid: &PixelGrid, percent: f32) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let factor = clamp_percent(percent) / 100.0;
    Ok(map_pixels(grid, |[r, g, b, a]| {
        [
            clamp_u8(r as f32 * factor),
            clamp_u8(g as f32 * factor),
            clamp_u8(b as f32 * factor),
            a,
        ]
    }))
}

// ============================================================================
// Contrast
// ============================================================================

/// Stretch or compress channels around mid-gray.
///
/// # Arguments
/// * `grid` - Source image
/// * `percent` - 0-200 (clamped), 100 = no change, 0 = flat gray
///
/// # Returns
/// `round((channel - 128) * percent / 100 + 128)`, saturated to 0-255
pub fn contrast(grid: &PixelGrid, percent: f32) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let factor = clamp_percent(percent) / 100.0;
    let adjust = move |v: u8| clamp_u8((v as f32 - 128.0) * factor + 128.0);
    Ok(map_pixels(grid, |[r, g, b, a]| [adjust(r), adjust(g), adjust(b), a]))
}

fn clamp_percent(percent: f32) -> f32 {
    if percent.is_nan() {
        100.0
    } else {
        percent.clamp(0.0, 200.0)
    }
}

// ============================================================================
// Red-eye
// ============================================================================

/// Red channel must exceed this for a pixel to count as red-eye.
pub const RED_EYE_MIN_RED: u8 = 150;
/// Green and blue must stay below this.
pub const RED_EYE_MAX_OTHER: u8 = 80;

/// Darken and desaturate strongly red pixels.
///
/// Threshold heuristic, not detection: any pixel with `R > 150`, `G < 80`
/// and `B < 80` becomes gray at half its channel average, wherever it is
/// in the frame.
pub fn red_eye(grid: &PixelGrid) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    Ok(map_pixels(grid, |[r, g, b, a]| {
        if r > RED_EYE_MIN_RED && g < RED_EYE_MAX_OTHER && b < RED_EYE_MAX_OTHER {
            let avg = (r as f32 + g as f32 + b as f32) / 3.0;
            let v = clamp_u8(avg * 0.5);
            [v, v, v, a]
        } else {
            [r, g, b, a]
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    // ========================================================================
    // Brightness Tests
    // ========================================================================

    #[test]
    fn test_brightness_half_red() {
        let grid = PixelGrid::filled(100, 100, [255, 0, 0, 255]);
        let out = brightness(&grid, 50.0).unwrap();
        assert!(out.as_raw().chunks(4).all(|px| px == [128, 0, 0, 255]));
    }

    #[test]
    fn test_brightness_identity() {
        let grid = PixelGrid::from_fn(6, 4, |x, y| [x as u8 * 40, y as u8 * 60, 77, 200]);
        assert_eq!(brightness(&grid, 100.0).unwrap(), grid);
    }

    #[test]
    fn test_brightness_saturates_and_clamps() {
        let grid = PixelGrid::filled(1, 1, [200, 10, 0, 90]);
        // 500% clamps to 200%
        let out = brightness(&grid, 500.0).unwrap();
        assert_eq!(out.get(0, 0), Some([255, 20, 0, 90]));
        let out = brightness(&grid, -10.0).unwrap();
        assert_eq!(out.get(0, 0), Some([0, 0, 0, 90]));
    }

    // ========================================================================
    // Contrast Tests
    // ========================================================================

    #[test]
    fn test_contrast_identity() {
        let grid = PixelGrid::from_fn(5, 5, |x, y| [(x * 50) as u8, (y * 50) as u8, 128, 255]);
        assert_eq!(contrast(&grid, 100.0).unwrap(), grid);
    }

    #[test]
    fn test_contrast_formula() {
        let grid = PixelGrid::filled(1, 1, [228, 28, 128, 255]);
        let out = contrast(&grid, 150.0).unwrap();
        // (228-128)*1.5+128 = 278 -> 255, (28-128)*1.5+128 = -22 -> 0
        assert_eq!(out.get(0, 0), Some([255, 0, 128, 255]));
        let flat = contrast(&grid, 0.0).unwrap();
        assert_eq!(flat.get(0, 0), Some([128, 128, 128, 255]));
    }

    // ========================================================================
    // Red-eye Tests
    // ========================================================================

    #[test]
    fn test_red_eye_threshold() {
        let grid = PixelGrid::from_fn(3, 1, |x, _| match x {
            0 => [200, 40, 30, 255],
            1 => [150, 40, 30, 255], // R not > 150
            _ => [220, 80, 10, 255], // G not < 80
        });
        let out = red_eye(&grid).unwrap();
        // avg(200,40,30) = 90, half = 45
        assert_eq!(out.get(0, 0), Some([45, 45, 45, 255]));
        assert_eq!(out.get(1, 0), grid.get(1, 0));
        assert_eq!(out.get(2, 0), grid.get(2, 0));
    }

    #[test]
    fn test_empty_grid_rejected() {
        let empty = PixelGrid::new(0, 0);
        assert!(matches!(brightness(&empty, 50.0), Err(Error::InvalidInput(_))));
        assert!(matches!(contrast(&empty, 50.0), Err(Error::InvalidInput(_))));
        assert!(matches!(red_eye(&empty), Err(Error::InvalidInput(_))));
    }
}
