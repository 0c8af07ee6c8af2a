//! Symmetry mirroring about the vertical midline.
//!
//! The left half is columns `0..ceil(width / 2)`, so for odd widths the
//! midline column belongs to the left half.
//!
//! - Left-mirrored: left half kept, right half = left half flipped.
//! - Right-mirrored: right half kept, left half = right half flipped. The
//!   midline column of an odd width has no partner and is kept as is.

use crate::error::Result;
use crate::grid::PixelGrid;

use super::core::render_rows;

/// Both mirror variants of one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetryPair {
    pub left: PixelGrid,
    pub right: PixelGrid,
}

/// Width of the left half (includes the midline for odd widths).
#[inline]
pub fn left_half_width(width: usize) -> usize {
    width.div_ceil(2)
}

/// Mirror the left half onto the right.
pub fn mirror_left(grid: &PixelGrid) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let (width, height) = grid.dimensions();
    let split = left_half_width(width);
    Ok(remap_columns(grid, width, height, |x| if x < split { x } else { width - 1 - x }))
}

/// Mirror the right half onto the left.
pub fn mirror_right(grid: &PixelGrid) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let (width, height) = grid.dimensions();
    let split = left_half_width(width);
    Ok(remap_columns(grid, width, height, |x| if x < split { width - 1 - x } else { x }))
}

/// Produce both variants.
pub fn symmetry(grid: &PixelGrid) -> Result<SymmetryPair> {
    Ok(SymmetryPair {
        left: mirror_left(grid)?,
        right: mirror_right(grid)?,
    })
}

fn remap_columns<F>(grid: &PixelGrid, width: usize, height: usize, source_x: F) -> PixelGrid
where
    F: Fn(usize) -> usize + Sync,
{
    let input = grid.view();
    render_rows(width, height, |x, y| {
        let sx = source_x(x);
        [input[[y, sx, 0]], input[[y, sx, 1]], input[[y, sx, 2]], input[[y, sx, 3]]]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(width: usize) -> PixelGrid {
        PixelGrid::from_fn(width, 2, |x, y| [x as u8, y as u8, 0, 255])
    }

    fn reds(grid: &PixelGrid) -> Vec<u8> {
        (0..grid.width()).map(|x| grid.get(x, 0).unwrap()[0]).collect()
    }

    #[test]
    fn test_even_width() {
        let pair = symmetry(&columns(6)).unwrap();
        assert_eq!(reds(&pair.left), vec![0, 1, 2, 2, 1, 0]);
        assert_eq!(reds(&pair.right), vec![5, 4, 3, 3, 4, 5]);
    }

    #[test]
    fn test_odd_width_midline_belongs_left() {
        let pair = symmetry(&columns(5)).unwrap();
        assert_eq!(reds(&pair.left), vec![0, 1, 2, 1, 0]);
        assert_eq!(reds(&pair.right), vec![4, 3, 2, 3, 4]);
    }

    #[test]
    fn test_left_half_preserved() {
        let grid = PixelGrid::from_fn(9, 4, |x, y| [(x * 20 + y) as u8, 3, 4, 255]);
        let left = mirror_left(&grid).unwrap();
        let split = left_half_width(9);
        for y in 0..4 {
            for x in 0..split {
                assert_eq!(left.get(x, y), grid.get(x, y));
                assert_eq!(left.get(8 - x, y), grid.get(x, y));
            }
        }
    }

    #[test]
    fn test_single_column() {
        let grid = columns(1);
        let pair = symmetry(&grid).unwrap();
        assert_eq!(pair.left, grid);
        assert_eq!(pair.right, grid);
    }
}
