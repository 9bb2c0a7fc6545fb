//! Tile decoder trait and the `image`-crate implementation.

use std::io::Cursor;

use image::{ImageError, ImageFormat, ImageReader, Limits};

use super::error::DecodeError;
use super::tile::DecodedImage;

/// Largest accepted tile edge in pixels.
pub const MAX_TILE_DIMENSION: u32 = 4096;

/// Decodes tile payloads into RGBA8 pixels.
///
/// Implementations must be `Send + Sync` so a single decoder can be shared
/// with decode worker threads.
pub trait TileDecoder: Send + Sync {
    /// Decode `bytes`, using `format_hint` (e.g. `"png"`) to pick the codec.
    fn decode(&self, bytes: &[u8], format_hint: &str) -> Result<DecodedImage, DecodeError>;
}

/// Decoder backed by the `image` crate.
///
/// A known format hint selects the codec directly; an unknown or empty hint
/// falls back to content sniffing.
#[derive(Debug, Clone, Default)]
pub struct ImageTileDecoder;

impl ImageTileDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl TileDecoder for ImageTileDecoder {
    fn decode(&self, bytes: &[u8], format_hint: &str) -> Result<DecodedImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut reader = ImageReader::new(Cursor::new(bytes));
        match ImageFormat::from_extension(format_hint) {
            Some(format) => reader.set_format(format),
            None => {
                reader = reader
                    .with_guessed_format()
                    .map_err(|e| DecodeError::Malformed(e.to_string()))?;
            }
        }
        reader.limits(tile_limits());

        let image = reader.decode().map_err(|e| match e {
            ImageError::Unsupported(unsupported) => {
                DecodeError::UnsupportedFormat(unsupported.to_string())
            }
            ImageError::Limits(limit) => DecodeError::TooLarge(limit.to_string()),
            other => DecodeError::Malformed(other.to_string()),
        })?;

        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        DecodedImage::new(width, height, rgba.into_raw())
    }
}

/// Reject oversized tiles from their header, before any pixels are allocated.
fn tile_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_TILE_DIMENSION);
    limits.max_image_height = Some(MAX_TILE_DIMENSION);
    limits
}
