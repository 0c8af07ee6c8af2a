//! Parameter-driven preview loop.
//!
//! A [`PreviewSession`] keeps three images:
//!
//! - **original** - as decoded, restored by [`PreviewSession::reset`]
//! - **current** - the committed state every preview starts from
//! - **result** - `current` run through the selected filter
//!
//! Every parameter change re-renders `result` synchronously. Randomized
//! filters draw from a generator seeded with the session seed, so moving a
//! slider back and forth gives a stable preview until [`PreviewSession::reseed`].
//!
//! The undo history is bounded by `max_history` entries and
//! `max_history_bytes`; the oldest commits are dropped first, but the most
//! recent one is always kept.
//!
//! Every mutating operation computes its new state first and only then
//! stores it, so a failed call leaves the session untouched.
//!
//! ## Remote edits
//!
//! Remote results arrive asynchronously. [`PreviewSession::begin_remote`]
//! hands out a ticket holding the session generation; `reset`, `load`,
//! `undo` and applying a remote result advance the generation, and
//! [`PreviewSession::complete_remote`] drops results whose ticket is stale.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::analysis::{palette::palette_with_config, Histogram, PaletteEntry};
use crate::codec::{decode_with_config, encode, ImageFormat};
use crate::compositor::{composite, Clip, Transform};
use crate::config::ToolkitConfig;
use crate::error::Result;
use crate::filters::apply_filter;
use crate::grid::PixelGrid;
use crate::params::{FilterId, FilterParameters};

#[cfg(feature = "remote")]
use crate::error::Error;
#[cfg(feature = "remote")]
use crate::mask::Mask;
#[cfg(feature = "remote")]
use crate::remote::{RemoteInput, RemoteRequest};

const DEFAULT_SEED: u64 = 0x5eed;

/// Layer drawn over the result on export (frames, stickers, logos).
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayer {
    pub grid: PixelGrid,
    pub transform: Transform,
    pub clip: Option<Clip>,
}

/// Proof of which session state a remote request was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteTicket {
    generation: u64,
}

pub struct PreviewSession {
    config: ToolkitConfig,
    original: PixelGrid,
    current: PixelGrid,
    result: PixelGrid,
    params: FilterParameters,
    history: VecDeque<PixelGrid>,
    history_bytes: u64,
    overlay: Option<OverlayLayer>,
    seed: u64,
    generation: u64,
}

impl PreviewSession {
    /// Decode an upload and start a session on it.
    pub fn open(bytes: &[u8], mime_type: Option<&str>, config: ToolkitConfig) -> Result<Self> {
        config.validate()?;
        let grid = decode_with_config(bytes, mime_type, &config)?;
        Self::with_config(grid, config)
    }

    /// Start a session on an already decoded image with default config.
    pub fn from_grid(grid: PixelGrid) -> Result<Self> {
        Self::with_config(grid, ToolkitConfig::default())
    }

    pub fn with_config(grid: PixelGrid, config: ToolkitConfig) -> Result<Self> {
        grid.ensure_non_empty()?;
        let (width, height) = grid.dimensions();
        info!(width, height, "preview session started");
        Ok(Self {
            config,
            original: grid.clone(),
            current: grid.clone(),
            result: grid,
            params: FilterParameters::defaults(FilterId::Brightness),
            history: VecDeque::new(),
            history_bytes: 0,
            overlay: None,
            seed: DEFAULT_SEED,
            generation: 0,
        })
    }

    /// Replace the image with a new upload, keeping filter and overlay.
    pub fn load(&mut self, bytes: &[u8], mime_type: Option<&str>) -> Result<()> {
        let grid = decode_with_config(bytes, mime_type, &self.config)?;
        let result = self.render(&grid, &self.params)?;
        info!(width = grid.width(), height = grid.height(), "image replaced");
        self.original = grid.clone();
        self.current = grid;
        self.result = result;
        self.clear_history();
        self.generation += 1;
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn original(&self) -> &PixelGrid {
        &self.original
    }

    pub fn current(&self) -> &PixelGrid {
        &self.current
    }

    /// Latest preview.
    ///
    /// After `commit`, `undo` or `reset` this is the committed image itself,
    /// not the reset parameters applied to it. The next `set_parameter`,
    /// `select_filter` or `reseed` renders from the parameters again.
    pub fn result(&self) -> &PixelGrid {
        &self.result
    }

    pub fn filter(&self) -> FilterId {
        self.params.filter()
    }

    pub fn parameters(&self) -> &FilterParameters {
        &self.params
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Bytes held by the undo history.
    pub fn history_bytes(&self) -> u64 {
        self.history_bytes
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn overlay(&self) -> Option<&OverlayLayer> {
        self.overlay.as_ref()
    }

    // ========================================================================
    // Filter selection and parameters
    // ========================================================================

    /// Switch filters; parameters start at the new filter's defaults.
    pub fn select_filter(&mut self, id: FilterId) -> Result<()> {
        let params = FilterParameters::defaults(id);
        let result = self.render(&self.current, &params)?;
        debug!(filter = ?id, "filter selected");
        self.params = params;
        self.result = result;
        Ok(())
    }

    /// Set one knob and re-render.
    ///
    /// # Returns
    /// The stored (clamped) value
    ///
    /// # Errors
    /// `InvalidInput` for an unknown key or NaN; nothing changes.
    pub fn set_parameter(&mut self, key: &str, value: f32) -> Result<f32> {
        let mut params = self.params.clone();
        let stored = params.set(key, value)?;
        let result = self.render(&self.current, &params)?;
        self.params = params;
        self.result = result;
        Ok(stored)
    }

    /// New seed for randomized filters; re-renders.
    pub fn reseed(&mut self, seed: u64) -> Result<()> {
        let previous = std::mem::replace(&mut self.seed, seed);
        match self.render(&self.current, &self.params) {
            Ok(result) => {
                self.result = result;
                Ok(())
            }
            Err(e) => {
                self.seed = previous;
                Err(e)
            }
        }
    }

    fn render(&self, source: &PixelGrid, params: &FilterParameters) -> Result<PixelGrid> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        apply_filter(params.filter(), source, params, &mut rng)
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Make the preview the new committed image.
    ///
    /// The previous image goes onto the undo history. Parameters return to
    /// the filter's defaults and the preview restarts from the committed
    /// image.
    pub fn commit(&mut self) {
        let committed = self.result.clone();
        let previous = std::mem::replace(&mut self.current, committed);
        self.push_history(previous);
        self.params = FilterParameters::defaults(self.params.filter());
        info!(history = self.history.len(), "preview committed");
    }

    /// Restore the image before the last commit.
    ///
    /// # Returns
    /// `false` when there was nothing to undo
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.pop_back() else {
            return false;
        };
        self.history_bytes = self.history_bytes.saturating_sub(grid_bytes(&previous));
        self.result = previous.clone();
        self.current = previous;
        self.params = FilterParameters::defaults(self.params.filter());
        self.generation += 1;
        debug!(history = self.history.len(), "undo");
        true
    }

    /// Back to the decoded image; history is cleared.
    pub fn reset(&mut self) {
        self.current = self.original.clone();
        self.result = self.original.clone();
        self.clear_history();
        self.params = FilterParameters::defaults(self.params.filter());
        self.generation += 1;
        info!("session reset");
    }

    fn push_history(&mut self, grid: PixelGrid) {
        if self.config.max_history == 0 {
            return;
        }
        self.history_bytes += grid_bytes(&grid);
        self.history.push_back(grid);

        while self.history.len() > self.config.max_history {
            self.drop_oldest();
        }
        while self.history_bytes > self.config.max_history_bytes && self.history.len() > 1 {
            self.drop_oldest();
        }
    }

    fn drop_oldest(&mut self) {
        if let Some(removed) = self.history.pop_front() {
            self.history_bytes = self.history_bytes.saturating_sub(grid_bytes(&removed));
            debug!(history = self.history.len(), "oldest commit dropped from history");
        }
    }

    fn clear_history(&mut self) {
        self.history.clear();
        self.history_bytes = 0;
    }

    // ========================================================================
    // Overlay and export
    // ========================================================================

    pub fn set_overlay(&mut self, overlay: Option<OverlayLayer>) -> Result<()> {
        if let Some(layer) = &overlay {
            layer.grid.ensure_non_empty()?;
        }
        self.overlay = overlay;
        Ok(())
    }

    /// The preview with the overlay layer (if any) drawn on top.
    pub fn flattened(&self) -> Result<PixelGrid> {
        match &self.overlay {
            Some(layer) => composite(&self.result, &layer.grid, &layer.transform, layer.clip.as_ref()),
            None => Ok(self.result.clone()),
        }
    }

    /// Encode the flattened preview.
    ///
    /// `quality` falls back to the configured default JPEG quality.
    pub fn export(&self, format: ImageFormat, quality: Option<f32>) -> Result<Vec<u8>> {
        let image = self.flattened()?;
        let quality = quality.unwrap_or(self.config.default_jpeg_quality);
        let bytes = encode(&image, format, Some(quality))?;
        info!(format = ?format, bytes = bytes.len(), "exported");
        Ok(bytes)
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    pub fn histogram(&self) -> Histogram {
        Histogram::compute(&self.result)
    }

    pub fn palette(&self) -> Result<Vec<PaletteEntry>> {
        palette_with_config(&self.result, &self.config)
    }

    // ========================================================================
    // Remote edits
    // ========================================================================

    pub fn begin_remote(&self) -> RemoteTicket {
        RemoteTicket {
            generation: self.generation,
        }
    }

    /// Apply the outcome of a remote edit.
    ///
    /// # Returns
    /// `Ok(true)` when the image was applied as a new commit, `Ok(false)`
    /// when the ticket was stale and the outcome was dropped
    ///
    /// # Errors
    /// The outcome's own error, or `Decode` for an unreadable image. The
    /// session is unchanged in both cases.
    pub fn complete_remote(&mut self, ticket: RemoteTicket, outcome: Result<Vec<u8>>) -> Result<bool> {
        if ticket.generation != self.generation {
            debug!(ticket = ticket.generation, current = self.generation, "stale remote result dropped");
            return Ok(false);
        }
        let bytes = outcome?;
        let grid = decode_with_config(&bytes, None, &self.config)?;
        info!(width = grid.width(), height = grid.height(), "remote result applied");

        let previous = std::mem::replace(&mut self.current, grid.clone());
        self.push_history(previous);
        self.result = grid;
        self.params = FilterParameters::defaults(self.params.filter());
        self.generation += 1;
        Ok(true)
    }

    /// Build a request for the committed image (sent as PNG).
    ///
    /// # Errors
    /// `InvalidInput` when the mask size differs from the image.
    #[cfg(feature = "remote")]
    pub fn remote_request(&self, input: RemoteInput, mask: Option<&Mask>) -> Result<RemoteRequest> {
        let mask = match mask {
            Some(mask) => {
                if (mask.width(), mask.height()) != self.current.dimensions() {
                    return Err(Error::InvalidInput(format!(
                        "mask is {}x{} but image is {}x{}",
                        mask.width(),
                        mask.height(),
                        self.current.width(),
                        self.current.height()
                    )));
                }
                Some(encode(&mask.to_grid(), ImageFormat::Png, None)?)
            }
            None => None,
        };
        Ok(RemoteRequest {
            image: encode(&self.current, ImageFormat::Png, None)?,
            mime_type: ImageFormat::Png.mime_type().to_string(),
            input,
            mask,
        })
    }
}

fn grid_bytes(grid: &PixelGrid) -> u64 {
    grid.as_raw().len() as u64
}
