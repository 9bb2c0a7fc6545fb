//! Decoded tile images.

use super::error::DecodeError;
use crate::tile::TileSpec;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Raw output of a decoder: straight-alpha RGBA8 pixels, row-major.
#[derive(Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Build an image, checking the buffer against the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(DecodeError::BufferMismatch {
                width,
                height,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }
}

/// A decoded, ready-to-composite tile.
///
/// Immutable once built and deliberately not `Clone`: a tile has exactly one
/// consumer, and drawing it into a surface consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct DecodedTile {
    spec: TileSpec,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedTile {
    /// Attach a decoded image to the tile it belongs to.
    pub fn new(spec: TileSpec, image: DecodedImage) -> Self {
        Self {
            spec,
            width: image.width,
            height: image.height,
            pixels: image.pixels,
        }
    }

    /// Build a tile from raw RGBA8 pixels.
    pub fn from_rgba(
        spec: TileSpec,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Self, DecodeError> {
        Ok(Self::new(spec, DecodedImage::new(width, height, pixels)?))
    }

    /// A tile filled with a single colour.
    pub fn solid(spec: TileSpec, width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, DecodeError> {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * BYTES_PER_PIXEL)
            .collect();
        Self::from_rgba(spec, width, height, pixels)
    }

    pub fn spec(&self) -> TileSpec {
        self.spec
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Straight-alpha RGBA8 pixels, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Size of the pixel buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    /// Give up the tile and keep its pixel buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_rejects_zero_dimensions() {
        assert_eq!(
            DecodedImage::new(0, 4, Vec::new()),
            Err(DecodeError::InvalidDimensions {
                width: 0,
                height: 4
            })
        );
    }

    #[test]
    fn test_image_rejects_short_buffer() {
        assert!(matches!(
            DecodedImage::new(2, 2, vec![0; 15]),
            Err(DecodeError::BufferMismatch { actual: 15, .. })
        ));
    }

    #[test]
    fn test_solid_tile() {
        let spec = TileSpec::new(1, 3, 2, 5);
        let tile = DecodedTile::solid(spec, 2, 3, [10, 20, 30, 255]).unwrap();

        assert_eq!(tile.spec(), spec);
        assert_eq!(tile.width(), 2);
        assert_eq!(tile.height(), 3);
        assert_eq!(tile.byte_size(), 24);
        assert_eq!(&tile.pixels()[..4], &[10, 20, 30, 255]);
        assert_eq!(&tile.pixels()[20..], &[10, 20, 30, 255]);
    }
}
