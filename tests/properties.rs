//! Property tests over random small images.

use pixeltools::analysis::{extract_palette, Histogram};
use pixeltools::codec::{decode, encode, ImageFormat};
use pixeltools::compositor::{composite, Transform};
use pixeltools::filters::{self, apply_filter, symmetry::left_half_width};
use pixeltools::{FilterId, FilterParameters, PixelGrid, Point};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn arb_grid() -> impl Strategy<Value = PixelGrid> {
    (1usize..24, 1usize..24).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<u8>(), w * h * 4)
            .prop_map(move |data| PixelGrid::from_raw(w, h, data).unwrap())
    })
}

fn arb_filter() -> impl Strategy<Value = FilterId> {
    prop::sample::select(FilterId::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_filters_preserve_dimensions(grid in arb_grid(), id in arb_filter(), seed in any::<u64>()) {
        let mut params = FilterParameters::defaults(id);
        // push every knob to its maximum to exercise clamping paths
        for spec in id.specs() {
            params.set(spec.key, spec.max + 10.0).unwrap();
        }
        let out = apply_filter(id, &grid, &params, &mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert_eq!(out.dimensions(), grid.dimensions());
    }

    #[test]
    fn prop_identity_parameters(grid in arb_grid()) {
        prop_assert_eq!(filters::brightness(&grid, 100.0).unwrap(), grid.clone());
        prop_assert_eq!(filters::contrast(&grid, 100.0).unwrap(), grid.clone());
        prop_assert_eq!(filters::pixelate(&grid, 1).unwrap(), grid.clone());
        prop_assert_eq!(filters::lens_distort(&grid, 0.0, Point::new(0.3, 0.8)).unwrap(), grid.clone());
        let mut rng = StdRng::seed_from_u64(0);
        prop_assert_eq!(filters::add_noise(&grid, 0.0, &mut rng).unwrap(), grid.clone());
    }

    #[test]
    fn prop_histogram_sums(grid in arb_grid()) {
        let hist = Histogram::compute(&grid);
        let n = grid.pixel_count() as u64;
        prop_assert_eq!(hist.red.iter().map(|&c| c as u64).sum::<u64>(), n);
        prop_assert_eq!(hist.green.iter().map(|&c| c as u64).sum::<u64>(), n);
        prop_assert_eq!(hist.blue.iter().map(|&c| c as u64).sum::<u64>(), n);
    }

    #[test]
    fn prop_palette_deterministic(grid in arb_grid()) {
        let a = extract_palette(&grid, 100, 40, 5).unwrap();
        let b = extract_palette(&grid, 100, 40, 5).unwrap();
        prop_assert!(a.len() <= 5);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_difference_with_self_is_black(grid in arb_grid()) {
        let out = filters::difference(&grid, &grid).unwrap();
        prop_assert!(out.as_raw().chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn prop_symmetry_mirrors(grid in arb_grid()) {
        let pair = filters::symmetry(&grid).unwrap();
        let (w, h) = grid.dimensions();
        let split = left_half_width(w);
        for y in 0..h {
            for x in 0..w {
                prop_assert_eq!(pair.left.get(x, y), pair.left.get(w - 1 - x, y));
                prop_assert_eq!(pair.right.get(x, y), pair.right.get(w - 1 - x, y));
                if x < split {
                    prop_assert_eq!(pair.left.get(x, y), grid.get(x, y));
                } else {
                    prop_assert_eq!(pair.right.get(x, y), grid.get(x, y));
                }
            }
        }
    }

    #[test]
    fn prop_png_round_trip(grid in arb_grid()) {
        let bytes = encode(&grid, ImageFormat::Png, None).unwrap();
        prop_assert_eq!(decode(&bytes, Some("image/png")).unwrap(), grid);
    }

    #[test]
    fn prop_zero_opacity_composite_is_base(base in arb_grid(), overlay in arb_grid(), dx in -10.0f32..10.0, rot in 0.0f32..360.0) {
        let transform = Transform { scale: 1.3, offset_x: dx, offset_y: -dx, rotation_deg: rot, opacity: 0.0 };
        prop_assert_eq!(composite(&base, &overlay, &transform, None).unwrap(), base);
    }
}
