//! Error taxonomy shared by every module.
//!
//! Local filter primitives only ever fail with [`Error::InvalidInput`]
//! (empty grids, NaN parameters, mismatched masks). Decode and transport
//! failures come from the edges of the toolkit and are surfaced to the host
//! UI as readable messages; nothing is retried automatically.

/// Toolkit-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed, unsupported or over-limit input image.
    #[error("decode error: {0}")]
    Decode(String),

    /// The encoder rejected the pixel data.
    #[error("encode error: {0}")]
    Encode(String),

    /// Zero-size grid, unknown parameter, NaN value or mismatched dimensions.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The remote image service could not be reached or answered badly.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote image service answered but produced no image.
    #[error("no image produced: {0}")]
    EmptyResult(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for failures caused by the remote service rather than local data.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::EmptyResult(_))
    }
}

impl From<Error> for String {
    fn from(error: Error) -> Self {
        error.to_string()
    }
}
