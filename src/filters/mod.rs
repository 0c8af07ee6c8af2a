//! Filter primitives for the editing tools.
//!
//! ## Image Format
//!
//! Every filter works on a [`PixelGrid`]: RGBA u8, shape `(H, W, 4)`.
//! Filters never mutate their input; each returns a new grid with the
//! same dimensions (except [`difference`], which covers both inputs).
//! A 0x0 grid is rejected with `InvalidInput`.
//!
//! ## Architecture
//!
//! - **Pure** - Output depends only on the input and parameters (plus the
//!   injected random generator for glitch and noise)
//! - **Clamped** - Out-of-range parameters are brought into range
//! - **Alpha preservation** - Alpha is kept unless a filter says otherwise
//! - **Thread-safe** - Row loops run on rayon
//!
//! ## Filter Categories
//!
//! - **Tonal**: brightness, contrast, red_eye
//! - **Blur**: gaussian_blur, box_blur, remove_noise
//! - **Detail**: unsharp_mask, add_noise
//! - **Stylize**: pixelate, halftone, glitch
//! - **Geometry**: lens_distort, mirror_left, mirror_right
//! - **Comparison**: difference

use rand::Rng;

use crate::error::Result;
use crate::grid::{PixelGrid, Point};
use crate::params::{FilterId, FilterParameters};

pub mod core;
pub mod color_adjust;
pub mod blur;
pub mod sharpen;
pub mod pixelate;
pub mod stylize;
pub mod distort;
pub mod noise;
pub mod symmetry;
pub mod difference;

pub use blur::{box_blur, gaussian_blur};
pub use color_adjust::{brightness, contrast, red_eye};
pub use difference::difference;
pub use distort::lens_distort;
pub use noise::{add_noise, remove_noise};
pub use pixelate::pixelate;
pub use sharpen::unsharp_mask;
pub use stylize::{glitch, halftone, HalftoneTheme};
pub use symmetry::{mirror_left, mirror_right, symmetry, SymmetryPair};

/// Run one filter with its stored parameters.
///
/// `params` is expected to belong to `id`; knobs it does not carry read as
/// 0.0 and are clamped by the filter itself.
///
/// # Arguments
/// * `id` - Filter to run
/// * `grid` - Source image
/// * `params` - Knob values (already clamped by [`FilterParameters::set`])
/// * `rng` - Random source for glitch and noise; untouched otherwise
pub fn apply_filter<R: Rng + ?Sized>(
    id: FilterId,
    grid: &PixelGrid,
    params: &FilterParameters,
    rng: &mut R,
) -> Result<PixelGrid> {
    match id {
        FilterId::Brightness => brightness(grid, params.get("percent")),
        FilterId::Contrast => contrast(grid, params.get("percent")),
        FilterId::GaussianBlur => gaussian_blur(grid, params.get("radius")),
        FilterId::BoxBlur => box_blur(grid, params.get("radius") as usize),
        FilterId::Sharpen => unsharp_mask(
            grid,
            params.get("amount"),
            params.get("radius"),
            params.get("threshold") as u8,
        ),
        FilterId::Pixelate => pixelate(grid, params.get("block_size") as usize),
        FilterId::Halftone => {
            let theme = if params.get("dark") >= 0.5 {
                HalftoneTheme::Dark
            } else {
                HalftoneTheme::Light
            };
            halftone(grid, params.get("dot_size") as usize, theme)
        }
        FilterId::Glitch => glitch(grid, params.get("intensity") as u32, rng),
        FilterId::LensDistortion => lens_distort(
            grid,
            params.get("strength"),
            Point::new(params.get("center_x"), params.get("center_y")),
        ),
        FilterId::NoiseAdd => add_noise(grid, params.get("amount"), rng),
        FilterId::NoiseRemove => remove_noise(grid, params.get("amount")),
        FilterId::RedEye => red_eye(grid),
        FilterId::MirrorLeft => mirror_left(grid),
        FilterId::MirrorRight => mirror_right(grid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample() -> PixelGrid {
        PixelGrid::from_fn(13, 9, |x, y| [(x * 19) as u8, (y * 27) as u8, ((x + y) * 9) as u8, 255])
    }

    #[test]
    fn test_every_filter_preserves_dimensions() {
        let grid = sample();
        for id in FilterId::ALL {
            let params = FilterParameters::defaults(id);
            let mut rng = StdRng::seed_from_u64(1);
            let out = apply_filter(id, &grid, &params, &mut rng).unwrap();
            assert_eq!(out.dimensions(), grid.dimensions(), "{id:?}");
        }
    }

    #[test]
    fn test_identity_defaults() {
        let grid = sample();
        let mut rng = StdRng::seed_from_u64(1);
        for id in [FilterId::Brightness, FilterId::Contrast, FilterId::GaussianBlur, FilterId::BoxBlur, FilterId::NoiseRemove] {
            let out = apply_filter(id, &grid, &FilterParameters::defaults(id), &mut rng).unwrap();
            assert_eq!(out, grid, "{id:?}");
        }
    }

    #[test]
    fn test_dispatch_uses_parameters() {
        let grid = PixelGrid::filled(4, 4, [255, 0, 0, 255]);
        let params = FilterParameters::from_values(FilterId::Brightness, [("percent", 50.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let out = apply_filter(FilterId::Brightness, &grid, &params, &mut rng).unwrap();
        assert_eq!(out.get(0, 0), Some([128, 0, 0, 255]));
    }

    #[test]
    fn test_halftone_toggle_selects_theme() {
        let grid = PixelGrid::filled(8, 8, [255, 255, 255, 255]);
        let params = FilterParameters::from_values(FilterId::Halftone, [("dark", 1.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let out = apply_filter(FilterId::Halftone, &grid, &params, &mut rng).unwrap();
        // white input leaves no dots, so the dark background shows everywhere
        assert_eq!(out.get(4, 4), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_randomized_filters_follow_seed() {
        let grid = sample();
        for id in FilterId::ALL.into_iter().filter(|id| id.is_randomized()) {
            let params = FilterParameters::defaults(id);
            let a = apply_filter(id, &grid, &params, &mut StdRng::seed_from_u64(77)).unwrap();
            let b = apply_filter(id, &grid, &params, &mut StdRng::seed_from_u64(77)).unwrap();
            assert_eq!(a, b, "{id:?}");
        }
    }

    #[test]
    fn test_empty_grid_is_rejected() {
        let empty = PixelGrid::new(0, 0);
        let mut rng = StdRng::seed_from_u64(1);
        for id in FilterId::ALL {
            assert!(apply_filter(id, &empty, &FilterParameters::defaults(id), &mut rng).is_err(), "{id:?}");
        }
    }
}
