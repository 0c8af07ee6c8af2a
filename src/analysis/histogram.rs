//! RGB histogram.

use rayon::prelude::*;
use serde::Serialize;

use crate::grid::{PixelGrid, CHANNELS};

/// Counts of each 0-255 value per color channel. Alpha is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    #[serde(with = "counts")]
    pub red: [u32; 256],
    #[serde(with = "counts")]
    pub green: [u32; 256],
    #[serde(with = "counts")]
    pub blue: [u32; 256],
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            red: [0; 256],
            green: [0; 256],
            blue: [0; 256],
        }
    }
}

impl Histogram {
    /// Count every pixel of `grid`, rows in parallel.
    pub fn compute(grid: &PixelGrid) -> Self {
        let width = grid.width();
        if grid.is_empty() {
            return Self::default();
        }
        grid.as_raw()
            .par_chunks(width * CHANNELS)
            .fold(Self::default, |mut hist, row| {
                for px in row.chunks_exact(CHANNELS) {
                    hist.red[px[0] as usize] += 1;
                    hist.green[px[1] as usize] += 1;
                    hist.blue[px[2] as usize] += 1;
                }
                hist
            })
            .reduce(Self::default, |mut a, b| {
                for i in 0..256 {
                    a.red[i] += b.red[i];
                    a.green[i] += b.green[i];
                    a.blue[i] += b.blue[i];
                }
                a
            })
    }

    /// Number of pixels counted (equal for every channel).
    pub fn total(&self) -> u64 {
        self.red.iter().map(|&c| c as u64).sum()
    }

    /// Tallest bar across all channels, for scaling a display.
    pub fn peak(&self) -> u32 {
        self.red
            .iter()
            .chain(&self.green)
            .chain(&self.blue)
            .copied()
            .max()
            .unwrap_or(0)
    }
}

// serde only derives arrays up to 32 elements
mod counts {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(values: &[u32; 256], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sums_match_pixel_count() {
        let grid = PixelGrid::from_fn(17, 11, |x, y| [(x * 13) as u8, (y * 29) as u8, (x ^ y) as u8, 0]);
        let hist = Histogram::compute(&grid);
        let total = |c: &[u32; 256]| c.iter().map(|&v| v as u64).sum::<u64>();
        assert_eq!(total(&hist.red), 17 * 11);
        assert_eq!(total(&hist.green), 17 * 11);
        assert_eq!(total(&hist.blue), 17 * 11);
        assert_eq!(hist.total(), 17 * 11);
    }

    #[test]
    fn test_flat_color_single_bin() {
        let grid = PixelGrid::filled(5, 4, [10, 20, 30, 255]);
        let hist = Histogram::compute(&grid);
        assert_eq!(hist.red[10], 20);
        assert_eq!(hist.green[20], 20);
        assert_eq!(hist.blue[30], 20);
        assert_eq!(hist.peak(), 20);
    }

    #[test]
    fn test_empty_grid() {
        let hist = Histogram::compute(&PixelGrid::new(0, 0));
        assert_eq!(hist.total(), 0);
    }

    #[test]
    fn test_serializes_full_arrays() {
        let hist = Histogram::compute(&PixelGrid::filled(1, 1, [0, 0, 0, 255]));
        let value = serde_json::to_value(&hist).unwrap();
        assert_eq!(value["red"].as_array().unwrap().len(), 256);
        assert_eq!(value["red"][0], 1);
    }
}
