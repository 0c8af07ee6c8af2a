//! Read-only views derived from an image.
//!
//! - **histogram** - per-channel value counts for the levels display
//! - **palette** - dominant colors by bucket quantization

pub mod histogram;
pub mod palette;

pub use histogram::Histogram;
pub use palette::{extract_palette, PaletteEntry};
