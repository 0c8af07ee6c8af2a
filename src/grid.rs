//! In-memory RGBA pixel grid.
//!
//! A [`PixelGrid`] wraps an `ndarray::Array3<u8>` of shape
//! `(height, width, 4)` in standard (row-major) layout, so the backing
//! storage is exactly the flat RGBA buffer a browser canvas hands out.
//! Grids are immutable from the outside: every filter builds a new one.

use ndarray::{Array3, ArrayView3};

use crate::error::{Error, Result};

/// Number of samples per pixel.
pub const CHANNELS: usize = 4;

/// Decoded image as a `width x height` array of RGBA samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    data: Array3<u8>,
}

/// A point in grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl PixelGrid {
    /// Create a fully transparent grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: Array3::zeros((height, width, CHANNELS)),
        }
    }

    /// Create a grid filled with a single RGBA color.
    pub fn filled(width: usize, height: usize, rgba: [u8; 4]) -> Self {
        let mut data = Array3::zeros((height, width, CHANNELS));
        for mut px in data.lanes_mut(ndarray::Axis(2)) {
            for c in 0..CHANNELS {
                px[c] = rgba[c];
            }
        }
        Self { data }
    }

    /// Wrap a flat row-major RGBA buffer.
    ///
    /// # Errors
    /// `InvalidInput` when `buffer.len() != width * height * 4`.
    pub fn from_raw(width: usize, height: usize, buffer: Vec<u8>) -> Result<Self> {
        let expected = width * height * CHANNELS;
        if buffer.len() != expected {
            return Err(Error::InvalidInput(format!(
                "buffer holds {} bytes, {}x{} RGBA needs {}",
                buffer.len(),
                width,
                height,
                expected
            )));
        }
        let data = Array3::from_shape_vec((height, width, CHANNELS), buffer)
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self { data })
    }

    /// Wrap an `(height, width, 4)` array.
    ///
    /// # Errors
    /// `InvalidInput` when the array does not have exactly 4 channels.
    pub fn from_array(data: Array3<u8>) -> Result<Self> {
        if data.dim().2 != CHANNELS {
            return Err(Error::InvalidInput(format!(
                "expected 4 channels, got {}",
                data.dim().2
            )));
        }
        // Re-own in standard layout so the flat-buffer view stays valid.
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        Ok(Self { data })
    }

    /// Build a grid by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> [u8; 4],
    {
        let mut data = Array3::zeros((height, width, CHANNELS));
        for y in 0..height {
            for x in 0..width {
                let px = f(x, y);
                for c in 0..CHANNELS {
                    data[[y, x, c]] = px[c];
                }
            }
        }
        Self { data }
    }

    pub(crate) fn from_array_unchecked(data: Array3<u8>) -> Self {
        debug_assert_eq!(data.dim().2, CHANNELS);
        debug_assert!(data.is_standard_layout());
        Self { data }
    }

    /// Internal constructor for buffers sized by the filter loops themselves.
    pub(crate) fn from_raw_unchecked(width: usize, height: usize, buffer: Vec<u8>) -> Self {
        let data = Array3::from_shape_vec((height, width, CHANNELS), buffer)
            .expect("Shape mismatch in filter output buffer");
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    /// RGBA sample at `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some([
            self.data[[y, x, 0]],
            self.data[[y, x, 1]],
            self.data[[y, x, 2]],
            self.data[[y, x, 3]],
        ])
    }

    /// Read-only `(height, width, 4)` view for filter loops.
    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// Flat row-major RGBA buffer.
    pub fn as_raw(&self) -> &[u8] {
        self.data
            .as_slice()
            .expect("pixel grid is always in standard layout")
    }

    /// Consume the grid and return the flat RGBA buffer.
    pub fn into_raw(self) -> Vec<u8> {
        self.data.into_raw_vec_and_offset().0
    }

    pub fn into_array(self) -> Array3<u8> {
        self.data
    }

    /// Reject 0x0 (or degenerate) grids.
    pub fn ensure_non_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidInput(format!(
                "grid of size {}x{} has no pixels",
                self.width(),
                self.height()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_checks_length() {
        assert!(PixelGrid::from_raw(2, 2, vec![0; 16]).is_ok());
        let err = PixelGrid::from_raw(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_raw_layout_is_row_major() {
        let grid = PixelGrid::from_fn(3, 2, |x, y| [x as u8, y as u8, 7, 255]);
        let raw = grid.as_raw();
        assert_eq!(raw.len(), 3 * 2 * 4);
        // pixel (2, 1) lives at (1 * 3 + 2) * 4
        assert_eq!(&raw[20..24], &[2, 1, 7, 255]);
        assert_eq!(grid.get(2, 1), Some([2, 1, 7, 255]));
        assert_eq!(grid.get(3, 0), None);
    }

    #[test]
    fn test_from_array_rejects_rgb() {
        let rgb = Array3::<u8>::zeros((2, 2, 3));
        assert!(PixelGrid::from_array(rgb).is_err());
    }

    #[test]
    fn test_from_array_normalizes_layout() {
        let arr = Array3::<u8>::from_shape_fn((3, 2, 4), |(y, x, c)| (y * 10 + x + c) as u8);
        let flipped = arr.slice(ndarray::s![..;-1, .., ..]).to_owned();
        let grid = PixelGrid::from_array(flipped).unwrap();
        assert_eq!(grid.as_raw().len(), 24);
        assert_eq!(grid.get(0, 0), Some([20, 21, 22, 23]));
    }

    #[test]
    fn test_empty_grid_is_rejected() {
        assert!(PixelGrid::new(0, 0).ensure_non_empty().is_err());
        assert!(PixelGrid::new(0, 5).ensure_non_empty().is_err());
        assert!(PixelGrid::new(1, 1).ensure_non_empty().is_ok());
    }

    #[test]
    fn test_filled() {
        let grid = PixelGrid::filled(4, 3, [1, 2, 3, 4]);
        assert_eq!(grid.dimensions(), (4, 3));
        assert!(grid.as_raw().chunks(4).all(|px| px == [1, 2, 3, 4]));
    }
}
