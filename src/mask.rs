//! Selection masks for the object eraser and AI edit tools.
//!
//! A mask is one byte per pixel, row-major: 255 = selected, 0 = not
//! selected. Masks are painted from free-hand brush strokes or read back
//! from an RGBA image, and sent to the remote service as a white-on-black
//! image.

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::filters::core::luminance;
use crate::grid::{PixelGrid, Point, CHANNELS};

pub const SELECTED: u8 = 255;
pub const UNSELECTED: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Mask {
    /// Empty (nothing selected) mask.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![UNSELECTED; width * height],
        }
    }

    /// Wrap raw mask bytes; any non-zero byte counts as selected.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::InvalidInput(format!(
                "mask buffer has {} bytes, expected {width}x{height}",
                data.len()
            )));
        }
        let data = data
            .into_iter()
            .map(|v| if v > 0 { SELECTED } else { UNSELECTED })
            .collect();
        Ok(Self { width, height, data })
    }

    /// Rasterize a brush stroke.
    ///
    /// Every pixel whose center lies within `brush_radius` of the polyline
    /// through `points` is selected. A single point paints one disc.
    ///
    /// # Arguments
    /// * `width`, `height` - Mask size
    /// * `points` - Stroke in pixel coordinates
    /// * `brush_radius` - Brush radius in pixels (must be finite and >= 0)
    pub fn from_path(width: usize, height: usize, points: &[Point], brush_radius: f32) -> Result<Self> {
        if !brush_radius.is_finite() || brush_radius < 0.0 {
            return Err(Error::InvalidInput(format!("brush radius {brush_radius} must be >= 0")));
        }
        let mut mask = Self::new(width, height);
        match points {
            [] => {}
            [p] => mask.paint_segment(*p, *p, brush_radius),
            _ => {
                for pair in points.windows(2) {
                    mask.paint_segment(pair[0], pair[1], brush_radius);
                }
            }
        }
        Ok(mask)
    }

    /// Read a painted mask back from an image: a pixel is selected when it
    /// is not fully transparent and its luminance is at least 128.
    pub fn from_grid(grid: &PixelGrid) -> Self {
        let (width, height) = grid.dimensions();
        let data = grid
            .as_raw()
            .par_chunks(CHANNELS)
            .map(|px| {
                if px[3] > 0 && luminance(px[0], px[1], px[2]) >= 128.0 {
                    SELECTED
                } else {
                    UNSELECTED
                }
            })
            .collect();
        Self { width, height, data }
    }

    /// Opaque white-on-black rendering.
    pub fn to_grid(&self) -> PixelGrid {
        let mut out = Vec::with_capacity(self.data.len() * CHANNELS);
        for &v in &self.data {
            out.extend_from_slice(&[v, v, v, 255]);
        }
        PixelGrid::from_raw_unchecked(self.width, self.height, out)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn is_selected(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x] == SELECTED
    }

    /// Number of selected pixels.
    pub fn selected_count(&self) -> usize {
        self.data.iter().filter(|&&v| v == SELECTED).count()
    }

    /// Bounding box of the selection as `(x, y, width, height)`.
    pub fn bounds(&self) -> Option<(usize, usize, usize, usize)> {
        let mut min_x = self.width;
        let mut min_y = self.height;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut any = false;

        for (y, row) in self.data.chunks(self.width.max(1)).enumerate() {
            for (x, &v) in row.iter().enumerate() {
                if v == SELECTED {
                    any = true;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }

        any.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Swap selected and unselected.
    pub fn invert(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| SELECTED - v).collect(),
        }
    }

    fn paint_segment(&mut self, a: Point, b: Point, radius: f32) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let clamp_x = |v: f32| v.floor().clamp(0.0, (self.width - 1) as f32) as usize;
        let clamp_y = |v: f32| v.floor().clamp(0.0, (self.height - 1) as f32) as usize;
        let x0 = clamp_x(a.x.min(b.x) - radius);
        let x1 = clamp_x(a.x.max(b.x) + radius);
        let y0 = clamp_y(a.y.min(b.y) - radius);
        let y1 = clamp_y(a.y.max(b.y) + radius);

        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len_sq = dx * dx + dy * dy;
        let r_sq = radius * radius;

        for y in y0..=y1 {
            for x in x0..=x1 {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;
                // closest point on the segment
                let t = if len_sq > 0.0 {
                    (((px - a.x) * dx + (py - a.y) * dy) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let qx = a.x + t * dx - px;
                let qy = a.y + t * dy - py;
                if qx * qx + qy * qy <= r_sq {
                    self.data[y * self.width + x] = SELECTED;
                }
            }
        }
    }
}

/// Replace every selected pixel of `grid` with `fill`.
///
/// # Errors
/// `InvalidInput` when the mask and grid sizes differ.
pub fn apply_mask(grid: &PixelGrid, mask: &Mask, fill: [u8; 4]) -> Result<PixelGrid> {
    let (width, height) = grid.dimensions();
    if (mask.width, mask.height) != (width, height) {
        return Err(Error::InvalidInput(format!(
            "mask is {}x{} but image is {width}x{height}",
            mask.width, mask.height
        )));
    }
    let mut out = grid.as_raw().to_vec();
    out.par_chunks_mut(CHANNELS)
        .zip(mask.data.par_iter())
        .for_each(|(px, &m)| {
            if m == SELECTED {
                px.copy_from_slice(&fill);
            }
        });
    Ok(PixelGrid::from_raw_unchecked(width, height, out))
}
