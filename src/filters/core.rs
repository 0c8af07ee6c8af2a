//! Core utilities shared by the filter primitives.
//!
//! - Gaussian kernel generation
//! - Row-parallel pixel mapping
//! - Separable Gaussian blur with premultiplied alpha
//! - Source-over blending and luminance

use ndarray::Array3;
use rayon::prelude::*;

use crate::grid::{PixelGrid, CHANNELS};

/// ITU-R BT.601 luma weights, as used by canvas-based halftone tools.
pub const LUMA_R: f32 = 0.299;
pub const LUMA_G: f32 = 0.587;
pub const LUMA_B: f32 = 0.114;

/// Luminance (0-255) of an RGB triple.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32
}

/// Round and saturate a channel value.
#[inline]
pub fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Generate a 1D Gaussian kernel.
///
/// # Arguments
/// * `sigma` - Standard deviation of the Gaussian
///
/// # Returns
/// Normalized 1D kernel as Vec<f32>
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }

    // Kernel size = 6 sigma (covers 99.7% of distribution), ensure odd
    let kernel_size = ((sigma * 6.0).ceil() as usize) | 1;
    let half = kernel_size / 2;

    let mut kernel: Vec<f32> = (0..kernel_size)
        .map(|i| {
            let x = i as f32 - half as f32;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }

    kernel
}

/// Apply `f` to every pixel, one rayon task per row.
///
/// The grid must be non-empty.
pub fn map_pixels<F>(grid: &PixelGrid, f: F) -> PixelGrid
where
    F: Fn([u8; 4]) -> [u8; 4] + Sync,
{
    let (width, height) = grid.dimensions();
    let row_len = width * CHANNELS;
    let src = grid.as_raw();
    let mut out = vec![0u8; src.len()];

    out.par_chunks_mut(row_len)
        .zip(src.par_chunks(row_len))
        .for_each(|(dst, row)| {
            for (d, s) in dst.chunks_exact_mut(CHANNELS).zip(row.chunks_exact(CHANNELS)) {
                d.copy_from_slice(&f([s[0], s[1], s[2], s[3]]));
            }
        });

    PixelGrid::from_raw_unchecked(width, height, out)
}

/// Build a grid by evaluating `f(x, y)` in parallel, one rayon task per row.
///
/// `width` must be non-zero.
pub fn render_rows<F>(width: usize, height: usize, f: F) -> PixelGrid
where
    F: Fn(usize, usize) -> [u8; 4] + Sync,
{
    let row_len = width * CHANNELS;
    let mut out = vec![0u8; row_len * height];

    out.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, d) in row.chunks_exact_mut(CHANNELS).enumerate() {
                d.copy_from_slice(&f(x, y));
            }
        });

    PixelGrid::from_raw_unchecked(width, height, out)
}

/// Separable Gaussian blur over all four channels.
///
/// Color is blurred premultiplied by alpha so transparent pixels do not
/// bleed their (undefined) RGB into neighbors. Edges are clamped.
///
/// # Arguments
/// * `grid` - Non-empty source grid
/// * `sigma` - Standard deviation in pixels; `<= 0` copies the input
pub fn gaussian_blur_premultiplied(grid: &PixelGrid, sigma: f32) -> PixelGrid {
    if sigma <= 0.0 {
        return grid.clone();
    }
    let input = grid.view();
    let (height, width, _) = input.dim();
    let kernel = gaussian_kernel_1d(sigma);
    let half = kernel.len() as isize / 2;
    let row_len = width * CHANNELS;

    // Pass 1: horizontal, premultiplied f32
    let mut temp = vec![0.0f32; height * row_len];
    temp.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                let mut sum = [0.0f32; 4];
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sx = (x as isize + ki as isize - half).clamp(0, width as isize - 1) as usize;
                    let a = input[[y, sx, 3]] as f32 / 255.0;
                    for c in 0..3 {
                        sum[c] += input[[y, sx, c]] as f32 * a * kv;
                    }
                    sum[3] += a * kv;
                }
                row[x * CHANNELS..(x + 1) * CHANNELS].copy_from_slice(&sum);
            }
        });

    let temp = Array3::from_shape_vec((height, width, CHANNELS), temp)
        .expect("Shape mismatch in gaussian blur temp");

    // Pass 2: vertical, then unpremultiply
    let mut out = vec![0u8; height * row_len];
    out.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                let mut sum = [0.0f32; 4];
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sy = (y as isize + ki as isize - half).clamp(0, height as isize - 1) as usize;
                    for c in 0..CHANNELS {
                        sum[c] += temp[[sy, x, c]] * kv;
                    }
                }
                let alpha = sum[3];
                let px = &mut row[x * CHANNELS..(x + 1) * CHANNELS];
                if alpha > 0.001 {
                    for c in 0..3 {
                        px[c] = clamp_u8(sum[c] / alpha);
                    }
                }
                px[3] = clamp_u8(alpha * 255.0);
            }
        });

    PixelGrid::from_raw_unchecked(width, height, out)
}

/// Blend a color onto an existing pixel using Porter-Duff "over".
///
/// `src_a` already includes any layer opacity.
#[inline]
pub fn blend_over_u8(dst: &mut [u8; 4], src_r: u8, src_g: u8, src_b: u8, src_a: u8) {
    if src_a == 0 {
        return;
    }
    if src_a == 255 {
        *dst = [src_r, src_g, src_b, 255];
        return;
    }

    let src_af = src_a as f32 / 255.0;
    let dst_af = dst[3] as f32 / 255.0;
    let out_a = src_af + dst_af * (1.0 - src_af);

    if out_a > 0.0 {
        let mix = |s: u8, d: u8| (s as f32 * src_af + d as f32 * dst_af * (1.0 - src_af)) / out_a;
        dst[0] = clamp_u8(mix(src_r, dst[0]));
        dst[1] = clamp_u8(mix(src_g, dst[1]));
        dst[2] = clamp_u8(mix(src_b, dst[2]));
        dst[3] = clamp_u8(out_a * 255.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_normalized_and_odd() {
        let kernel = gaussian_kernel_1d(2.0);
        assert_eq!(kernel.len() % 2, 1);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(gaussian_kernel_1d(0.0), vec![1.0]);
    }

    #[test]
    fn test_luminance_weights() {
        assert!((luminance(255, 255, 255) - 255.0).abs() < 0.01);
        assert_eq!(luminance(0, 0, 0), 0.0);
        assert!((luminance(255, 0, 0) - 76.245).abs() < 0.01);
    }

    #[test]
    fn test_map_pixels_visits_every_pixel() {
        let grid = PixelGrid::from_fn(5, 3, |x, y| [x as u8, y as u8, 0, 255]);
        let out = map_pixels(&grid, |[r, g, b, a]| [g, r, b, a]);
        assert_eq!(out.get(4, 2), Some([2, 4, 0, 255]));
    }

    #[test]
    fn test_render_rows() {
        let out = render_rows(3, 2, |x, y| [x as u8, y as u8, 1, 2]);
        assert_eq!(out.get(2, 1), Some([2, 1, 1, 2]));
    }

    #[test]
    fn test_blur_keeps_flat_image() {
        let grid = PixelGrid::filled(9, 7, [200, 100, 50, 255]);
        let out = gaussian_blur_premultiplied(&grid, 2.5);
        assert_eq!(out, grid);
    }

    #[test]
    fn test_blur_ignores_transparent_rgb() {
        // Transparent red neighbors must not tint the opaque blue pixel
        let grid = PixelGrid::from_fn(3, 1, |x, _| {
            if x == 1 { [0, 0, 255, 255] } else { [255, 0, 0, 0] }
        });
        let out = gaussian_blur_premultiplied(&grid, 1.0);
        let center = out.get(1, 0).unwrap();
        assert_eq!(center[0], 0);
        assert_eq!(center[2], 255);
        assert!(center[3] < 255);
    }

    #[test]
    fn test_blend_over() {
        let mut dst = [0, 0, 255, 255];
        blend_over_u8(&mut dst, 255, 0, 0, 0);
        assert_eq!(dst, [0, 0, 255, 255]);

        blend_over_u8(&mut dst, 255, 0, 0, 255);
        assert_eq!(dst, [255, 0, 0, 255]);

        let mut half = [0, 0, 0, 255];
        blend_over_u8(&mut half, 255, 255, 255, 128);
        assert!((half[0] as i32 - 128).abs() <= 1);
        assert_eq!(half[3], 255);
    }
}
