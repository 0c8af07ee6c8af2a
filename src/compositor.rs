//! Layer compositing for overlays, logos, frames and avatars.
//!
//! ## Overlay placement
//!
//! An overlay is scaled and rotated about its own center, then translated
//! so that its unrotated, scaled top-left corner sits at
//! `(offset_x, offset_y)` on the base. Every base pixel is mapped back into
//! overlay space (inverse transform) and sampled bilinearly, then blended
//! with Porter-Duff "over" using `alpha * opacity`.
//!
//! With scale 1, rotation 0 and integer offsets the inverse mapping lands
//! exactly on overlay pixel centers, so an opaque overlay is reproduced
//! bit-exactly inside its footprint.

use ndarray::s;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filters::core::blend_over_u8;
use crate::grid::{PixelGrid, CHANNELS};

// ============================================================================
// Types
// ============================================================================

/// Placement of an overlay on its base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub rotation_deg: f32,
    /// 0.0-1.0 (clamped)
    pub opacity: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            rotation_deg: 0.0,
            opacity: 1.0,
        }
    }
}

impl Transform {
    /// Identity placement at an offset.
    pub fn at(offset_x: f32, offset_y: f32) -> Self {
        Self { offset_x, offset_y, ..Self::default() }
    }

    fn validate(&self) -> Result<()> {
        let finite = [self.scale, self.offset_x, self.offset_y, self.rotation_deg, self.opacity]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.scale <= 0.0 {
            return Err(Error::InvalidInput(format!("invalid overlay transform {self:?}")));
        }
        Ok(())
    }
}

/// Region of the result that stays visible; everything else is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Clip {
    Circle { cx: f32, cy: f32, radius: f32 },
    Rect { x: f32, y: f32, width: f32, height: f32 },
}

impl Clip {
    /// Whether the pixel whose top-left corner is `(x, y)` is inside.
    /// The pixel center is tested.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        let px = x as f32 + 0.5;
        let py = y as f32 + 0.5;
        match *self {
            Clip::Circle { cx, cy, radius } => {
                let dx = px - cx;
                let dy = py - cy;
                dx * dx + dy * dy <= radius * radius
            }
            Clip::Rect { x: left, y: top, width, height } => {
                px >= left && px < left + width && py >= top && py < top + height
            }
        }
    }
}

/// Nine named overlay positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    Center,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

impl Anchor {
    pub const ALL: [Anchor; 9] = [
        Anchor::TopLeft,
        Anchor::TopCenter,
        Anchor::TopRight,
        Anchor::MiddleLeft,
        Anchor::Center,
        Anchor::MiddleRight,
        Anchor::BottomLeft,
        Anchor::BottomCenter,
        Anchor::BottomRight,
    ];
}

/// Outline drawn by [`draw_border`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderShape {
    /// Along the image edges.
    Rect,
    /// Along the largest centered circle.
    Circle,
}

// ============================================================================
// Composite
// ============================================================================

/// Draw `overlay` onto `base`.
///
/// # Arguments
/// * `base` - Background; defines the output size
/// * `overlay` - Layer to place
/// * `transform` - Scale, offset, rotation and opacity of the overlay
/// * `clip` - Optional visible region of the result
///
/// # Returns
/// New grid the size of `base`
pub fn composite(
    base: &PixelGrid,
    overlay: &PixelGrid,
    transform: &Transform,
    clip: Option<&Clip>,
) -> Result<PixelGrid> {
    base.ensure_non_empty()?;
    overlay.ensure_non_empty()?;
    transform.validate()?;

    let (width, height) = base.dimensions();
    let (ow, oh) = overlay.dimensions();
    let opacity = transform.opacity.clamp(0.0, 1.0);
    let scale = transform.scale;
    let (sin, cos) = transform.rotation_deg.to_radians().sin_cos();
    let half_w = ow as f32 / 2.0;
    let half_h = oh as f32 / 2.0;
    // overlay center in base coordinates
    let center_x = transform.offset_x + half_w * scale;
    let center_y = transform.offset_y + half_h * scale;
    let src = overlay.view();

    let mut out = base.as_raw().to_vec();
    let row_len = width * CHANNELS;

    out.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                let o = x * CHANNELS;
                let px = &mut row[o..o + CHANNELS];

                if opacity > 0.0 {
                    let dx = x as f32 + 0.5 - center_x;
                    let dy = y as f32 + 0.5 - center_y;
                    // inverse rotation, then inverse scale
                    let u = (dx * cos + dy * sin) / scale + half_w - 0.5;
                    let v = (-dx * sin + dy * cos) / scale + half_h - 0.5;
                    if let Some([r, g, b, a]) = sample_bilinear(&src, ow, oh, u, v) {
                        let alpha = (a as f32 * opacity).round() as u8;
                        let mut dst = [px[0], px[1], px[2], px[3]];
                        blend_over_u8(&mut dst, r, g, b, alpha);
                        px.copy_from_slice(&dst);
                    }
                }

                if let Some(clip) = clip {
                    if !clip.contains(x, y) {
                        px.copy_from_slice(&[0, 0, 0, 0]);
                    }
                }
            }
        });

    Ok(PixelGrid::from_raw_unchecked(width, height, out))
}

/// Bilinear sample at pixel-index coordinates `(u, v)`.
///
/// Returns `None` outside the overlay footprint. Color is interpolated
/// premultiplied so transparent neighbors do not darken edges.
fn sample_bilinear(
    src: &ndarray::ArrayView3<u8>,
    width: usize,
    height: usize,
    u: f32,
    v: f32,
) -> Option<[u8; 4]> {
    if u < -0.5 || v < -0.5 || u >= width as f32 - 0.5 || v >= height as f32 - 0.5 {
        return None;
    }
    let u = u.clamp(0.0, (width - 1) as f32);
    let v = v.clamp(0.0, (height - 1) as f32);
    let x0 = u.floor() as usize;
    let y0 = v.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = u - x0 as f32;
    let fy = v - y0 as f32;

    let mut sum = [0.0f32; 4];
    for (sx, sy, w) in [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x1, y0, fx * (1.0 - fy)),
        (x0, y1, (1.0 - fx) * fy),
        (x1, y1, fx * fy),
    ] {
        if w == 0.0 {
            continue;
        }
        let a = src[[sy, sx, 3]] as f32;
        for c in 0..3 {
            sum[c] += src[[sy, sx, c]] as f32 * a * w;
        }
        sum[3] += a * w;
    }

    if sum[3] <= 0.0 {
        return Some([0, 0, 0, 0]);
    }
    let color = |c: usize| (sum[c] / sum[3]).round().clamp(0.0, 255.0) as u8;
    Some([color(0), color(1), color(2), sum[3].round().clamp(0.0, 255.0) as u8])
}

// ============================================================================
// Anchored placement
// ============================================================================

/// Top-left offset that puts an `overlay_size` box at `anchor` on a
/// `base_size` canvas, `margin` pixels from the touching edges.
pub fn anchor_offset(
    base_size: (usize, usize),
    overlay_size: (f32, f32),
    anchor: Anchor,
    margin: f32,
) -> (f32, f32) {
    let (bw, bh) = (base_size.0 as f32, base_size.1 as f32);
    let (ow, oh) = overlay_size;
    let left = margin;
    let center_x = (bw - ow) / 2.0;
    let right = bw - ow - margin;
    let top = margin;
    let middle_y = (bh - oh) / 2.0;
    let bottom = bh - oh - margin;

    match anchor {
        Anchor::TopLeft => (left, top),
        Anchor::TopCenter => (center_x, top),
        Anchor::TopRight => (right, top),
        Anchor::MiddleLeft => (left, middle_y),
        Anchor::Center => (center_x, middle_y),
        Anchor::MiddleRight => (right, middle_y),
        Anchor::BottomLeft => (left, bottom),
        Anchor::BottomCenter => (center_x, bottom),
        Anchor::BottomRight => (right, bottom),
    }
}

/// Place a logo or watermark at a named position.
///
/// # Arguments
/// * `base` - Background image
/// * `overlay` - Logo/watermark
/// * `anchor` - Named position
/// * `margin` - Distance from the touching edges in pixels
/// * `scale` - Overlay scale factor
/// * `opacity` - 0.0-1.0
pub fn place(
    base: &PixelGrid,
    overlay: &PixelGrid,
    anchor: Anchor,
    margin: f32,
    scale: f32,
    opacity: f32,
) -> Result<PixelGrid> {
    let scaled = (overlay.width() as f32 * scale, overlay.height() as f32 * scale);
    let (offset_x, offset_y) = anchor_offset(base.dimensions(), scaled, anchor, margin);
    let transform = Transform { scale, offset_x, offset_y, rotation_deg: 0.0, opacity };
    composite(base, overlay, &transform, None)
}

// ============================================================================
// Crop, clip and border
// ============================================================================

/// Crop a rectangle, clipped to the image.
///
/// # Errors
/// `InvalidInput` when the rectangle does not overlap the image.
pub fn crop(grid: &PixelGrid, x: i64, y: i64, width: usize, height: usize) -> Result<PixelGrid> {
    let (gw, gh) = (grid.width() as i64, grid.height() as i64);
    let x0 = x.clamp(0, gw);
    let y0 = y.clamp(0, gh);
    let x1 = x.saturating_add(width as i64).clamp(0, gw);
    let y1 = y.saturating_add(height as i64).clamp(0, gh);
    if x1 <= x0 || y1 <= y0 {
        return Err(Error::InvalidInput(format!(
            "crop {width}x{height} at ({x}, {y}) is outside the {gw}x{gh} image"
        )));
    }
    let view = grid
        .view()
        .slice(s![y0 as usize..y1 as usize, x0 as usize..x1 as usize, ..])
        .to_owned();
    PixelGrid::from_array(view)
}

/// Clear everything outside `clip`.
pub fn apply_clip(grid: &PixelGrid, clip: &Clip) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let (width, height) = grid.dimensions();
    let mut out = grid.as_raw().to_vec();
    out.par_chunks_mut(width * CHANNELS)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
                if !clip.contains(x, y) {
                    px.copy_from_slice(&[0, 0, 0, 0]);
                }
            }
        });
    Ok(PixelGrid::from_raw_unchecked(width, height, out))
}

/// Crop to the centered square and keep only the inscribed circle.
pub fn circular_avatar(grid: &PixelGrid) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    let (width, height) = grid.dimensions();
    let side = width.min(height);
    let square = crop(
        grid,
        ((width - side) / 2) as i64,
        ((height - side) / 2) as i64,
        side,
        side,
    )?;
    let half = side as f32 / 2.0;
    apply_clip(&square, &Clip::Circle { cx: half, cy: half, radius: half })
}

/// Draw a border of `thickness` pixels in `color` (blended over).
///
/// `Rect` paints the outermost `thickness` rows and columns. `Circle` paints
/// the ring of the largest centered circle, `thickness` pixels wide.
pub fn draw_border(
    grid: &PixelGrid,
    shape: BorderShape,
    thickness: f32,
    color: [u8; 4],
) -> Result<PixelGrid> {
    grid.ensure_non_empty()?;
    if !thickness.is_finite() || thickness < 0.0 {
        return Err(Error::InvalidInput(format!("border thickness {thickness} must be >= 0")));
    }
    let (width, height) = grid.dimensions();
    let (wf, hf) = (width as f32, height as f32);
    let radius = wf.min(hf) / 2.0;
    let [r, g, b, a] = color;

    let mut out = grid.as_raw().to_vec();
    out.par_chunks_mut(width * CHANNELS)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
                let cx = x as f32 + 0.5;
                let cy = y as f32 + 0.5;
                let on_border = match shape {
                    BorderShape::Rect => {
                        cx < thickness || cy < thickness || cx > wf - thickness || cy > hf - thickness
                    }
                    BorderShape::Circle => {
                        let d = ((cx - wf / 2.0).powi(2) + (cy - hf / 2.0).powi(2)).sqrt();
                        d <= radius && d >= radius - thickness
                    }
                };
                if on_border {
                    let mut dst = [px[0], px[1], px[2], px[3]];
                    blend_over_u8(&mut dst, r, g, b, a);
                    px.copy_from_slice(&dst);
                }
            }
        });
    Ok(PixelGrid::from_raw_unchecked(width, height, out))
}
