//! Image difference (absolute-difference blend).
//!
//! Both images are placed at the top-left of a canvas as large as the
//! bigger of each dimension. Where an image does not reach, its sample is
//! black. The result is opaque.

use crate::error::Result;
use crate::grid::PixelGrid;

use super::core::render_rows;

/// Per-channel `|a - b|` of two images.
///
/// # Returns
/// Opaque grid of size `max(wA, wB) x max(hA, hB)`
pub fn difference(a: &PixelGrid, b: &PixelGrid) -> Result<PixelGrid> {
    a.ensure_non_empty()?;
    b.ensure_non_empty()?;
    let width = a.width().max(b.width());
    let height = a.height().max(b.height());
    const BLACK: [u8; 4] = [0, 0, 0, 255];

    Ok(render_rows(width, height, |x, y| {
        let pa = a.get(x, y).unwrap_or(BLACK);
        let pb = b.get(x, y).unwrap_or(BLACK);
        [pa[0].abs_diff(pb[0]), pa[1].abs_diff(pb[1]), pa[2].abs_diff(pb[2]), 255]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_difference_is_black() {
        let grid = PixelGrid::from_fn(7, 3, |x, y| [(x * 30) as u8, (y * 70) as u8, 200, 128]);
        let out = difference(&grid, &grid).unwrap();
        assert_eq!(out.dimensions(), (7, 3));
        assert!(out.as_raw().chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn test_channel_delta() {
        let a = PixelGrid::filled(1, 1, [10, 200, 50, 255]);
        let b = PixelGrid::filled(1, 1, [30, 100, 50, 255]);
        assert_eq!(difference(&a, &b).unwrap().get(0, 0), Some([20, 100, 0, 255]));
    }

    #[test]
    fn test_mismatched_sizes_pad_with_black() {
        let a = PixelGrid::filled(4, 2, [100, 100, 100, 255]);
        let b = PixelGrid::filled(2, 3, [40, 40, 40, 255]);
        let out = difference(&a, &b).unwrap();
        assert_eq!(out.dimensions(), (4, 3));
        assert_eq!(out.get(0, 0), Some([60, 60, 60, 255]));
        assert_eq!(out.get(3, 0), Some([100, 100, 100, 255])); // only a
        assert_eq!(out.get(1, 2), Some([40, 40, 40, 255])); // only b
        assert_eq!(out.get(3, 2), Some([0, 0, 0, 255])); // neither
    }
}
