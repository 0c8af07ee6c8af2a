//! Dominant-color palette by bucket quantization.
//!
//! The image is first reduced to at most `sample_width` columns (nearest
//! sampling, aspect preserved) so the cost does not grow with the upload.
//! Each opaque-enough sample falls into the bucket
//! `(r / size, g / size, b / size)`; buckets are ranked by count, ties by
//! bucket key, and each reports the mean color of its members.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::config::ToolkitConfig;
use crate::error::{Error, Result};
use crate::grid::PixelGrid;

/// One palette color and the number of sampled pixels behind it.
///
/// Serializes as `{"color": "#rrggbb", "weight": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaletteEntry {
    #[serde(serialize_with = "color_as_hex")]
    pub color: [u8; 3],
    pub weight: u32,
}

impl PaletteEntry {
    /// `#rrggbb`, lowercase.
    pub fn hex(&self) -> String {
        hex_color(self.color)
    }
}

fn hex_color([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn color_as_hex<S: Serializer>(color: &[u8; 3], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex_color(*color))
}

#[derive(Default)]
struct Bucket {
    count: u32,
    sum: [u64; 3],
}

/// Extract a palette with the sizes from `config`.
pub fn palette_with_config(grid: &PixelGrid, config: &ToolkitConfig) -> Result<Vec<PaletteEntry>> {
    extract_palette(
        grid,
        config.palette_sample_width,
        config.palette_bucket_size,
        config.palette_size,
    )
}

/// Extract the `count` dominant colors.
///
/// # Arguments
/// * `grid` - Source image
/// * `sample_width` - Maximum width of the sampled copy (at least 1)
/// * `bucket_size` - Width of each quantization bin per channel (at least 1)
/// * `count` - Number of entries to return at most
///
/// # Returns
/// Entries sorted by weight, heaviest first. Fully transparent images give
/// an empty palette.
pub fn extract_palette(
    grid: &PixelGrid,
    sample_width: usize,
    bucket_size: u8,
    count: usize,
) -> Result<Vec<PaletteEntry>> {
    grid.ensure_non_empty()?;
    if sample_width == 0 || bucket_size == 0 {
        return Err(Error::InvalidInput(
            "palette sample width and bucket size must be positive".into(),
        ));
    }

    let (width, height) = grid.dimensions();
    let sw = width.min(sample_width);
    let sh = ((height as f64 * sw as f64 / width as f64).round() as usize).max(1);
    let input = grid.view();

    let mut buckets: HashMap<[u8; 3], Bucket> = HashMap::new();
    for y in 0..sh {
        let sy = (((y as f64 + 0.5) * height as f64 / sh as f64) as usize).min(height - 1);
        for x in 0..sw {
            let sx = (((x as f64 + 0.5) * width as f64 / sw as f64) as usize).min(width - 1);
            if input[[sy, sx, 3]] == 0 {
                continue;
            }
            let rgb = [input[[sy, sx, 0]], input[[sy, sx, 1]], input[[sy, sx, 2]]];
            let key = rgb.map(|v| v / bucket_size);
            let bucket = buckets.entry(key).or_default();
            bucket.count += 1;
            for c in 0..3 {
                bucket.sum[c] += rgb[c] as u64;
            }
        }
    }

    let mut ranked: Vec<([u8; 3], Bucket)> = buckets.into_iter().collect();
    ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(&b.0)));

    Ok(ranked
        .into_iter()
        .take(count)
        .map(|(_, bucket)| {
            let n = bucket.count as u64;
            PaletteEntry {
                color: bucket.sum.map(|s| ((s + n / 2) / n) as u8),
                weight: bucket.count,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_blue_split(width: usize, height: usize) -> PixelGrid {
        PixelGrid::from_fn(width, height, |x, _| {
            if x < width / 2 { [255, 0, 0, 255] } else { [0, 0, 255, 255] }
        })
    }

    #[test]
    fn test_entry_serializes_hex_color() {
        let entry = PaletteEntry { color: [255, 8, 0], weight: 42 };
        let value = serde_json::to_value(entry).unwrap();
        assert_eq!(value, serde_json::json!({"color": "#ff0800", "weight": 42}));
    }

    #[test]
    fn test_red_blue_split() {
        let palette = extract_palette(&red_blue_split(240, 60), 100, 40, 5).unwrap();
        assert_eq!(palette.len(), 2);
        let hexes: Vec<String> = palette.iter().map(PaletteEntry::hex).collect();
        assert!(hexes.contains(&"#ff0000".to_string()));
        assert!(hexes.contains(&"#0000ff".to_string()));
        // 100 sampled columns, 25 sampled rows
        assert_eq!(palette[0].weight + palette[1].weight, 100 * 25);
    }

    #[test]
    fn test_deterministic() {
        let grid = PixelGrid::from_fn(150, 90, |x, y| [(x * 3) as u8, (y * 2) as u8, ((x + y) % 256) as u8, 255]);
        let a = extract_palette(&grid, 100, 40, 5).unwrap();
        let b = extract_palette(&grid, 100, 40, 5).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert!(a.windows(2).all(|w| w[0].weight >= w[1].weight));
    }

    #[test]
    fn test_bucket_average() {
        // 10 and 30 share bucket 0 at size 40
        let grid = PixelGrid::from_fn(2, 1, |x, _| if x == 0 { [10, 10, 10, 255] } else { [30, 30, 30, 255] });
        let palette = extract_palette(&grid, 100, 40, 5).unwrap();
        assert_eq!(palette, vec![PaletteEntry { color: [20, 20, 20], weight: 2 }]);
        assert_eq!(palette[0].hex(), "#141414");
    }

    #[test]
    fn test_transparent_pixels_skipped() {
        let grid = PixelGrid::from_fn(4, 4, |x, _| if x == 0 { [0, 255, 0, 255] } else { [255, 0, 0, 0] });
        let palette = extract_palette(&grid, 100, 40, 5).unwrap();
        assert_eq!(palette.len(), 1);
        assert_eq!(palette[0].hex(), "#00ff00");
        assert_eq!(palette[0].weight, 4);

        let clear = PixelGrid::new(3, 3);
        assert!(extract_palette(&clear, 100, 40, 5).unwrap().is_empty());
    }

    #[test]
    fn test_ties_break_by_bucket_key() {
        let grid = PixelGrid::from_fn(2, 1, |x, _| if x == 0 { [200, 0, 0, 255] } else { [0, 0, 200, 255] });
        let palette = extract_palette(&grid, 100, 40, 5).unwrap();
        assert_eq!(palette[0].hex(), "#0000c8");
        assert_eq!(palette[1].hex(), "#c80000");
    }

    #[test]
    fn test_config_sizes() {
        let grid = red_blue_split(20, 20);
        let config = ToolkitConfig { palette_size: 1, ..ToolkitConfig::default() };
        assert_eq!(palette_with_config(&grid, &config).unwrap().len(), 1);
        assert!(extract_palette(&grid, 0, 40, 5).is_err());
    }
}
