//! pixeltools
//!
//! Image filters, compositing and a parameter-driven preview loop shared by
//! the browser media-editing widgets, with Python bindings via PyO3 and
//! WASM bindings for JavaScript.
//!
//! ## Image Format
//! Every operation works on a [`PixelGrid`]: RGBA u8, shape
//! `(height, width, 4)`, row-major with a top-left origin. Transforms never
//! mutate their input; each returns a new grid.
//!
//! ## Data Flow
//! upload bytes → [`codec::decode`] → [`PixelGrid`] → [`filters`] →
//! [`compositor`] → [`codec::encode`] → download bytes.
//! [`preview::PreviewSession`] re-runs the filter step on every parameter
//! change and keeps commit/undo history.
//!
//! ## Features
//! - `remote` (default): HTTP client for the AI image-editing service
//! - `python`: PyO3/numpy bindings operating on `(H, W, 4)` arrays
//! - `wasm`: wasm-bindgen exports operating on flat RGBA buffers

pub mod error;
pub mod grid;
pub mod config;
pub mod codec;
pub mod params;
pub mod filters;
pub mod analysis;
pub mod compositor;
pub mod mask;
pub mod export;
pub mod preview;

#[cfg(feature = "remote")]
pub mod remote;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use codec::ImageFormat;
pub use config::{RemoteConfig, ToolkitConfig};
pub use error::{Error, Result};
pub use grid::{PixelGrid, Point};
pub use params::{FilterId, FilterParameters};
pub use preview::PreviewSession;

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;
    use pyo3::types::PyBytes;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::analysis::{extract_palette, Histogram};
    use crate::codec::{self, ImageFormat};
    use crate::compositor::{self, Transform};
    use crate::config::ToolkitConfig;
    use crate::error::Error;
    use crate::filters;
    use crate::grid::{PixelGrid, Point};

    impl From<Error> for PyErr {
        fn from(error: Error) -> Self {
            PyValueError::new_err(error.to_string())
        }
    }

    fn to_grid(image: PyReadonlyArray3<'_, u8>) -> PyResult<PixelGrid> {
        Ok(PixelGrid::from_array(image.as_array().to_owned())?)
    }

    fn to_py<'py>(py: Python<'py>, grid: crate::error::Result<PixelGrid>) -> PyResult<Bound<'py, PyArray3<u8>>> {
        Ok(grid?.into_array().into_pyarray(py))
    }

    // ========================================================================
    // Tonal
    // ========================================================================

    /// Scale RGB by `percent` (0-200, 100 unchanged).
    #[pyfunction]
    #[pyo3(signature = (image, percent=100.0))]
    pub fn brightness<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        percent: f32,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, filters::brightness(&to_grid(image)?, percent))
    }

    /// Scale distance from mid-gray by `percent` (0-200, 100 unchanged).
    #[pyfunction]
    #[pyo3(signature = (image, percent=100.0))]
    pub fn contrast<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        percent: f32,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, filters::contrast(&to_grid(image)?, percent))
    }

    #[pyfunction]
    pub fn red_eye<'py>(py: Python<'py>, image: PyReadonlyArray3<'py, u8>) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, filters::red_eye(&to_grid(image)?))
    }

    // ========================================================================
    // Blur / Sharpen / Noise
    // ========================================================================

    #[pyfunction]
    pub fn gaussian_blur<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        radius: f32,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, filters::gaussian_blur(&to_grid(image)?, radius))
    }

    #[pyfunction]
    pub fn box_blur<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        radius: usize,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, filters::box_blur(&to_grid(image)?, radius))
    }

    /// Unsharp mask.
    ///
    /// # Arguments
    /// * `image` - RGBA image
    /// * `amount` - 0.0-5.0
    /// * `radius` - Blur sigma, 0.5-10.0
    /// * `threshold` - Minimum difference to sharpen (0-255)
    #[pyfunction]
    #[pyo3(signature = (image, amount=1.0, radius=1.0, threshold=0))]
    pub fn sharpen<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        amount: f32,
        radius: f32,
        threshold: u8,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, filters::unsharp_mask(&to_grid(image)?, amount, radius, threshold))
    }

    #[pyfunction]
    #[pyo3(signature = (image, amount, seed=0))]
    pub fn add_noise<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        amount: f32,
        seed: u64,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let mut rng = StdRng::seed_from_u64(seed);
        to_py(py, filters::add_noise(&to_grid(image)?, amount, &mut rng))
    }

    #[pyfunction]
    pub fn remove_noise<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        amount: f32,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, filters::remove_noise(&to_grid(image)?, amount))
    }

    // ========================================================================
    // Stylize / Geometry
    // ========================================================================

    #[pyfunction]
    pub fn pixelate<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        block_size: usize,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, filters::pixelate(&to_grid(image)?, block_size))
    }

    #[pyfunction]
    #[pyo3(signature = (image, dot_size=8, dark=false))]
    pub fn halftone<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        dot_size: usize,
        dark: bool,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let theme = if dark { filters::HalftoneTheme::Dark } else { filters::HalftoneTheme::Light };
        to_py(py, filters::halftone(&to_grid(image)?, dot_size, theme))
    }

    #[pyfunction]
    #[pyo3(signature = (image, intensity=10, seed=0))]
    pub fn glitch<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        intensity: u32,
        seed: u64,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let mut rng = StdRng::seed_from_u64(seed);
        to_py(py, filters::glitch(&to_grid(image)?, intensity, &mut rng))
    }

    #[pyfunction]
    #[pyo3(signature = (image, strength=0.5, center_x=0.5, center_y=0.5))]
    pub fn lens_distortion<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        strength: f32,
        center_x: f32,
        center_y: f32,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, filters::lens_distort(&to_grid(image)?, strength, Point::new(center_x, center_y)))
    }

    #[pyfunction]
    pub fn mirror_left<'py>(py: Python<'py>, image: PyReadonlyArray3<'py, u8>) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, filters::mirror_left(&to_grid(image)?))
    }

    #[pyfunction]
    pub fn mirror_right<'py>(py: Python<'py>, image: PyReadonlyArray3<'py, u8>) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, filters::mirror_right(&to_grid(image)?))
    }

    #[pyfunction]
    pub fn difference<'py>(
        py: Python<'py>,
        a: PyReadonlyArray3<'py, u8>,
        b: PyReadonlyArray3<'py, u8>,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, filters::difference(&to_grid(a)?, &to_grid(b)?))
    }

    // ========================================================================
    // Compositing
    // ========================================================================

    #[pyfunction]
    #[pyo3(signature = (base, overlay, offset_x=0.0, offset_y=0.0, scale=1.0, rotation_deg=0.0, opacity=1.0))]
    pub fn composite<'py>(
        py: Python<'py>,
        base: PyReadonlyArray3<'py, u8>,
        overlay: PyReadonlyArray3<'py, u8>,
        offset_x: f32,
        offset_y: f32,
        scale: f32,
        rotation_deg: f32,
        opacity: f32,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let transform = Transform { scale, offset_x, offset_y, rotation_deg, opacity };
        to_py(py, compositor::composite(&to_grid(base)?, &to_grid(overlay)?, &transform, None))
    }

    #[pyfunction]
    pub fn circular_avatar<'py>(py: Python<'py>, image: PyReadonlyArray3<'py, u8>) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, compositor::circular_avatar(&to_grid(image)?))
    }

    // ========================================================================
    // Analysis / Codec
    // ========================================================================

    /// Per-channel value counts as `(red, green, blue)` lists of 256.
    #[pyfunction]
    pub fn histogram(image: PyReadonlyArray3<'_, u8>) -> PyResult<(Vec<u32>, Vec<u32>, Vec<u32>)> {
        let hist = Histogram::compute(&to_grid(image)?);
        Ok((hist.red.to_vec(), hist.green.to_vec(), hist.blue.to_vec()))
    }

    /// Dominant colors as `[("#rrggbb", weight), ...]`.
    #[pyfunction]
    #[pyo3(signature = (image, count=5, bucket_size=40))]
    pub fn palette(image: PyReadonlyArray3<'_, u8>, count: usize, bucket_size: u8) -> PyResult<Vec<(String, u32)>> {
        let sample_width = ToolkitConfig::default().palette_sample_width;
        let entries = extract_palette(&to_grid(image)?, sample_width, bucket_size, count)?;
        Ok(entries.iter().map(|e| (e.hex(), e.weight)).collect())
    }

    #[pyfunction]
    #[pyo3(signature = (data, mime_type=None))]
    pub fn decode<'py>(py: Python<'py>, data: &[u8], mime_type: Option<&str>) -> PyResult<Bound<'py, PyArray3<u8>>> {
        to_py(py, codec::decode(data, mime_type))
    }

    /// Encode to `image/png`, `image/jpeg` or `image/webp`.
    #[pyfunction]
    #[pyo3(signature = (image, mime_type="image/png", quality=None))]
    pub fn encode<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        mime_type: &str,
        quality: Option<f32>,
    ) -> PyResult<Bound<'py, PyBytes>> {
        let format = ImageFormat::from_mime_type(mime_type)
            .ok_or_else(|| PyValueError::new_err(format!("unsupported output type {mime_type}")))?;
        let bytes = codec::encode(&to_grid(image)?, format, quality)?;
        Ok(PyBytes::new(py, &bytes))
    }

    #[pymodule]
    pub fn pixeltools(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Tonal
        m.add_function(wrap_pyfunction!(brightness, m)?)?;
        m.add_function(wrap_pyfunction!(contrast, m)?)?;
        m.add_function(wrap_pyfunction!(red_eye, m)?)?;

        // Blur, sharpen, noise
        m.add_function(wrap_pyfunction!(gaussian_blur, m)?)?;
        m.add_function(wrap_pyfunction!(box_blur, m)?)?;
        m.add_function(wrap_pyfunction!(sharpen, m)?)?;
        m.add_function(wrap_pyfunction!(add_noise, m)?)?;
        m.add_function(wrap_pyfunction!(remove_noise, m)?)?;

        // Stylize and geometry
        m.add_function(wrap_pyfunction!(pixelate, m)?)?;
        m.add_function(wrap_pyfunction!(halftone, m)?)?;
        m.add_function(wrap_pyfunction!(glitch, m)?)?;
        m.add_function(wrap_pyfunction!(lens_distortion, m)?)?;
        m.add_function(wrap_pyfunction!(mirror_left, m)?)?;
        m.add_function(wrap_pyfunction!(mirror_right, m)?)?;
        m.add_function(wrap_pyfunction!(difference, m)?)?;

        // Compositing
        m.add_function(wrap_pyfunction!(composite, m)?)?;
        m.add_function(wrap_pyfunction!(circular_avatar, m)?)?;

        // Analysis and codec
        m.add_function(wrap_pyfunction!(histogram, m)?)?;
        m.add_function(wrap_pyfunction!(palette, m)?)?;
        m.add_function(wrap_pyfunction!(decode, m)?)?;
        m.add_function(wrap_pyfunction!(encode, m)?)?;

        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::pixeltools;
