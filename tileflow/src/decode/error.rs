//! Error types for tile decoding.

use thiserror::Error;

/// Errors that can occur while decoding a tile payload.
///
/// All variants describe a property of the payload itself, so a decode
/// failure is never worth retrying with the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload was empty.
    #[error("Empty tile payload")]
    Empty,

    /// The payload's format is not supported by the decoder.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The payload is not a valid image of the expected format.
    #[error("Malformed image data: {0}")]
    Malformed(String),

    /// The decoded image has unusable dimensions.
    #[error("Invalid tile dimensions {width}×{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// The payload declares dimensions beyond the decoder's limits.
    #[error("Tile exceeds decode limits: {0}")]
    TooLarge(String),

    /// Pixel buffer length does not match the dimensions.
    #[error("Pixel buffer of {actual} bytes does not match {width}×{height} RGBA")]
    BufferMismatch {
        width: u32,
        height: u32,
        actual: usize,
    },

    /// The decode worker pool could not be created.
    #[error("Failed to start decode workers: {0}")]
    Pool(String),
}
