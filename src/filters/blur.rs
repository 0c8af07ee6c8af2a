//! Blur filters for RGBA images.
//!
//! Gaussian blur matches the canvas `blur(Npx)` filter, where `N` is the
//! standard deviation. Box blur averages a square window clipped to the
//! image, which keeps edge pixels from darkening.

use rayon::prelude::*;

use crate::error::Result;
use crate::grid::{PixelGrid, CHANNELS};

use super::core::gaussian_blur_premultiplied;

/// Largest accepted blur radius.
pub const MAX_BLUR_RADIUS: f32 = 50.0;

const BOX_BAND_ROWS: usize = 64;

/// Apply Gaussian blur.
///
/// # Arguments
/// * `grid` - Source image
/// * `radius` - Standard deviation in pixels, 0-50 (clamped); 0 copies the input
///
/// # Returns
/// Blurred image with same dimensions
pub fn gaussian_blur(grid: &PixelGrid, radius: f32) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let sigma = if radius.is_nan() { 0.0 } else { radius.clamp(0.0, MAX_BLUR_RADIUS) };
    Ok(gaussian_blur_premultiplied(grid, sigma))
}

/// Apply box blur.
///
/// Two separable sliding-window passes, O(1) per pixel regardless of the
/// radius; every output pixel is the mean of the `(2r+1) x (2r+1)` window
/// intersected with the image.
///
/// # Arguments
/// * `grid` - Source image
/// * `radius` - Window radius in pixels, 0-50 (clamped)
pub fn box_blur(grid: &PixelGrid, radius: usize) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let r = radius.min(MAX_BLUR_RADIUS as usize);
    if r == 0 {
        return Ok(grid.clone());
    }

    let input = grid.view();
    let (height, width, _) = input.dim();
    let row_len = width * CHANNELS;

    // Horizontal pass: running window sums (u32) per row
    let mut sums = vec![0u32; height * row_len];
    sums.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for c in 0..CHANNELS {
                let mut s: u32 = (0..=r.min(width - 1)).map(|sx| input[[y, sx, c]] as u32).sum();
                for x in 0..width {
                    row[x * CHANNELS + c] = s;
                    if x + r + 1 < width {
                        s += input[[y, x + r + 1, c]] as u32;
                    }
                    if x >= r {
                        s -= input[[y, x - r, c]] as u32;
                    }
                }
            }
        });

    let counts_x: Vec<u32> = (0..width)
        .map(|x| (x.min(r) + (width - 1 - x).min(r) + 1) as u32)
        .collect();
    let sum_row = |y: usize| &sums[y * row_len..(y + 1) * row_len];

    // Vertical pass in bands of rows; each band primes its own accumulator
    let mut out = vec![0u8; height * row_len];
    out.par_chunks_mut(BOX_BAND_ROWS * row_len)
        .enumerate()
        .for_each(|(band, rows)| {
            let first = band * BOX_BAND_ROWS;
            let mut acc = vec![0u32; row_len];
            for sy in first.saturating_sub(r)..=(first + r).min(height - 1) {
                acc.iter_mut().zip(sum_row(sy)).for_each(|(a, s)| *a += s);
            }

            for (i, row) in rows.chunks_mut(row_len).enumerate() {
                let y = first + i;
                let count_y = (y.min(r) + (height - 1 - y).min(r) + 1) as u32;
                for (x, count_x) in counts_x.iter().enumerate() {
                    let area = count_y * count_x;
                    for c in 0..CHANNELS {
                        let k = x * CHANNELS + c;
                        row[k] = ((acc[k] + area / 2) / area) as u8;
                    }
                }
                if y + r + 1 < height {
                    acc.iter_mut().zip(sum_row(y + r + 1)).for_each(|(a, s)| *a += s);
                }
                if y >= r {
                    acc.iter_mut().zip(sum_row(y - r)).for_each(|(a, s)| *a -= s);
                }
            }
        });

    Ok(PixelGrid::from_raw_unchecked(width, height, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_zero_radius_is_copy() {
        let grid = PixelGrid::from_fn(4, 4, |x, y| [(x * 60) as u8, (y * 60) as u8, 3, 255]);
        assert_eq!(gaussian_blur(&grid, 0.0).unwrap(), grid);
        assert_eq!(gaussian_blur(&grid, -5.0).unwrap(), grid);
    }

    #[test]
    fn test_gaussian_smooths_edge() {
        let grid = PixelGrid::from_fn(10, 1, |x, _| if x < 5 { [0, 0, 0, 255] } else { [255, 255, 255, 255] });
        let out = gaussian_blur(&grid, 2.0).unwrap();
        let left = out.get(4, 0).unwrap()[0];
        let right = out.get(5, 0).unwrap()[0];
        assert!(left > 0 && left < 128, "left of edge = {left}");
        assert!(right > 128 && right < 255, "right of edge = {right}");
    }

    #[test]
    fn test_box_blur_averages_window() {
        let grid = PixelGrid::from_fn(3, 1, |x, _| [(x * 90) as u8, 0, 0, 255]);
        let out = box_blur(&grid, 1).unwrap();
        // x=0: (0+90)/2 = 45, x=1: (0+90+180)/3 = 90, x=2: (90+180)/2 = 135
        assert_eq!(out.get(0, 0).unwrap()[0], 45);
        assert_eq!(out.get(1, 0).unwrap()[0], 90);
        assert_eq!(out.get(2, 0).unwrap()[0], 135);
        assert_eq!(out.get(1, 0).unwrap()[3], 255);
    }

    #[test]
    fn test_box_blur_matches_window_mean() {
        // taller than one band of rows
        let (width, height, r) = (9usize, 150usize, 3usize);
        let grid = PixelGrid::from_fn(width, height, |x, y| {
            [(x * 31 + y * 7) as u8, (y * 13) as u8, (x * y) as u8, (200 + x) as u8]
        });
        let out = box_blur(&grid, r).unwrap();
        for y in 0..height {
            for x in 0..width {
                let (x0, x1) = (x.saturating_sub(r), (x + r).min(width - 1));
                let (y0, y1) = (y.saturating_sub(r), (y + r).min(height - 1));
                let area = ((x1 - x0 + 1) * (y1 - y0 + 1)) as u32;
                let expected: Vec<u8> = (0..CHANNELS)
                    .map(|c| {
                        let sum: u32 = (y0..=y1)
                            .flat_map(|sy| (x0..=x1).map(move |sx| (sx, sy)))
                            .map(|(sx, sy)| grid.get(sx, sy).unwrap()[c] as u32)
                            .sum();
                        ((sum + area / 2) / area) as u8
                    })
                    .collect();
                assert_eq!(out.get(x, y).unwrap().to_vec(), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_box_blur_radius_wider_than_image() {
        let grid = PixelGrid::from_fn(3, 2, |x, y| [(x * 30 + y * 90) as u8, 0, 0, 255]);
        let out = box_blur(&grid, 50).unwrap();
        // every window covers the whole image: mean of 0,30,60,90,120,150 = 75
        assert!(out.as_raw().chunks(4).all(|px| px == [75, 0, 0, 255]));
    }

    #[test]
    fn test_box_blur_flat_and_dimensions() {
        let grid = PixelGrid::filled(7, 5, [10, 20, 30, 255]);
        let out = box_blur(&grid, 3).unwrap();
        assert_eq!(out, grid);
        assert_eq!(box_blur(&grid, 0).unwrap(), grid);
    }
}
