//! Lens (barrel / pincushion) distortion.
//!
//! For every output pixel the offset from the distortion center is
//! converted to polar form, with the radius normalized by the frame's
//! half-diagonal. The radius is remapped with
//! `r' = r * (1 - strength * (r - 1))` and the source pixel nearest to the
//! remapped position is copied. Positions outside the source stay fully
//! transparent.

use crate::error::Result;
use crate::grid::{PixelGrid, Point};

use super::core::render_rows;

/// Apply lens distortion.
///
/// # Arguments
/// * `grid` - Source image
/// * `strength` - 0.0-1.0 (clamped); 0.0 returns an exact copy
/// * `center` - Distortion center as fractions of width/height (0.0-1.0)
///
/// # Returns
/// Distorted image with same dimensions
pub fn lens_distort(grid: &PixelGrid, strength: f32, center: Point) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let strength = if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) };
    if strength == 0.0 {
        return Ok(grid.clone());
    }

    let (width, height) = grid.dimensions();
    let input = grid.view();
    let fraction = |v: f32| if v.is_nan() { 0.5 } else { v.clamp(0.0, 1.0) };
    let cx = fraction(center.x) * (width as f32 - 1.0);
    let cy = fraction(center.y) * (height as f32 - 1.0);
    let half_diag = ((width * width + height * height) as f32).sqrt() / 2.0;

    Ok(render_rows(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let r = (dx * dx + dy * dy).sqrt() / half_diag;
        let theta = dy.atan2(dx);
        let remapped = r * (1.0 - strength * (r - 1.0)) * half_diag;

        let sx = (cx + remapped * theta.cos()).round();
        let sy = (cy + remapped * theta.sin()).round();
        if sx < 0.0 || sy < 0.0 || sx >= width as f32 || sy >= height as f32 {
            return [0, 0, 0, 0];
        }
        let (sx, sy) = (sx as usize, sy as usize);
        [input[[sy, sx, 0]], input[[sy, sx, 1]], input[[sy, sx, 2]], input[[sy, sx, 3]]]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(size: usize) -> PixelGrid {
        PixelGrid::from_fn(size, size, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 { [255, 255, 255, 255] } else { [0, 0, 0, 255] }
        })
    }

    #[test]
    fn test_zero_strength_is_identity() {
        let grid = checker(20);
        assert_eq!(lens_distort(&grid, 0.0, Point::new(0.5, 0.5)).unwrap(), grid);
    }

    #[test]
    fn test_center_pixel_is_fixed() {
        let grid = PixelGrid::from_fn(21, 21, |x, y| [x as u8, y as u8, 0, 255]);
        let out = lens_distort(&grid, 0.8, Point::new(0.5, 0.5)).unwrap();
        assert_eq!(out.get(10, 10), grid.get(10, 10));
        assert_eq!(out.dimensions(), (21, 21));
    }

    #[test]
    fn test_samples_outward_inside_frame() {
        // r < 1 inside the frame, so r' > r and pixels are pulled from
        // further out: the column sampled for x=15 lies right of 15.
        let grid = PixelGrid::from_fn(21, 21, |x, _| [x as u8 * 10, 0, 0, 255]);
        let out = lens_distort(&grid, 1.0, Point::new(0.5, 0.5)).unwrap();
        let sampled = out.get(15, 10).unwrap()[0] / 10;
        assert!(sampled > 15, "sampled column {sampled}");
    }

    #[test]
    fn test_out_of_bounds_is_transparent() {
        let grid = PixelGrid::filled(30, 30, [9, 9, 9, 255]);
        let out = lens_distort(&grid, 1.0, Point::new(0.5, 0.5)).unwrap();
        // near the edge midpoints the remapped radius exceeds the frame
        assert_eq!(out.get(0, 15), Some([0, 0, 0, 0]));
        assert_eq!(out.get(15, 15), Some([9, 9, 9, 255]));
    }
}
