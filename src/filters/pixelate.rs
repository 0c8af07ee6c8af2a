//! Pixelation (mosaic) filter.
//!
//! The grid is divided into `block_size x block_size` blocks starting at the
//! top-left corner. Each block is replaced by the average of the pixels it
//! covers; blocks on the right and bottom edges are clipped to the grid,
//! never wrapped.

use rayon::prelude::*;

use crate::error::Result;
use crate::grid::{PixelGrid, CHANNELS};

/// Largest accepted block size.
pub const MAX_BLOCK_SIZE: usize = 200;

/// Pixelate an image.
///
/// # Arguments
/// * `grid` - Source image
/// * `block_size` - Block edge in pixels, 1-200 (clamped); 1 is the identity
///
/// # Returns
/// Mosaic image with same dimensions
pub fn pixelate(grid: &PixelGrid, block_size: usize) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let block = block_size.clamp(1, MAX_BLOCK_SIZE);
    if block == 1 {
        return Ok(grid.clone());
    }

    let input = grid.view();
    let (height, width, _) = input.dim();
    let blocks_x = width.div_ceil(block);
    let blocks_y = height.div_ceil(block);

    // Downsample: one averaged RGBA per block
    let averages: Vec<[u8; 4]> = (0..blocks_x * blocks_y)
        .into_par_iter()
        .map(|i| {
            let (bx, by) = (i % blocks_x, i / blocks_x);
            let x0 = bx * block;
            let y0 = by * block;
            let x1 = (x0 + block).min(width);
            let y1 = (y0 + block).min(height);
            let mut sum = [0u64; 4];
            for y in y0..y1 {
                for x in x0..x1 {
                    for c in 0..CHANNELS {
                        sum[c] += input[[y, x, c]] as u64;
                    }
                }
            }
            let n = ((x1 - x0) * (y1 - y0)) as u64;
            [0, 1, 2, 3].map(|c| ((sum[c] + n / 2) / n) as u8)
        })
        .collect();

    // Upsample with nearest neighbor
    let row_len = width * CHANNELS;
    let mut out = vec![0u8; height * row_len];
    out.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let by = y / block;
            for (x, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
                px.copy_from_slice(&averages[by * blocks_x + x / block]);
            }
        });

    Ok(PixelGrid::from_raw_unchecked(width, height, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_one_is_identity() {
        let grid = PixelGrid::from_fn(5, 4, |x, y| [(x * 13) as u8, (y * 31) as u8, 9, 255]);
        assert_eq!(pixelate(&grid, 1).unwrap(), grid);
        assert_eq!(pixelate(&grid, 0).unwrap(), grid);
    }

    #[test]
    fn test_blocks_are_uniform_averages() {
        let grid = PixelGrid::from_fn(4, 2, |x, _| [(x * 10) as u8, 0, 0, 255]);
        let out = pixelate(&grid, 2).unwrap();
        // block 0 covers x 0..2 -> (0+10)/2 = 5, block 1 covers 20,30 -> 25
        for y in 0..2 {
            assert_eq!(out.get(0, y).unwrap()[0], 5);
            assert_eq!(out.get(1, y).unwrap()[0], 5);
            assert_eq!(out.get(2, y).unwrap()[0], 25);
            assert_eq!(out.get(3, y).unwrap()[0], 25);
        }
    }

    #[test]
    fn test_edge_blocks_are_clipped() {
        let grid = PixelGrid::from_fn(5, 1, |x, _| [if x == 4 { 200 } else { 0 }, 0, 0, 255]);
        let out = pixelate(&grid, 4).unwrap();
        assert_eq!(out.dimensions(), (5, 1));
        // the last block holds only x=4, so it keeps its own value
        assert_eq!(out.get(4, 0).unwrap()[0], 200);
        assert_eq!(out.get(0, 0).unwrap()[0], 0);
    }
}
