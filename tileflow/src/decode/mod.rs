//! Tile payload decoding.
//!
//! The [`TileDecoder`] trait turns raw tile bytes into RGBA8 pixels. The
//! coordinator holds an `Arc<dyn TileDecoder>` and either calls it inline or
//! hands it to a [`DecodePool`].
//!
//! ```text
//! raw bytes + format hint ──► TileDecoder ──► DecodedImage ──► DecodedTile
//!                                  │
//!                                  └──► DecodeError (never retried)
//! ```
//!
//! # Example
//!
//! ```
//! use tileflow::decode::{ImageTileDecoder, TileDecoder, DecodeError};
//!
//! let decoder = ImageTileDecoder::new();
//! assert_eq!(decoder.decode(&[], "png"), Err(DecodeError::Empty));
//! ```

mod decoder;
mod error;
mod pool;
mod tile;

pub use decoder::{ImageTileDecoder, TileDecoder, MAX_TILE_DIMENSION};
pub use error::DecodeError;
pub use pool::{DecodeOutcome, DecodePool};
pub use tile::{DecodedImage, DecodedTile, BYTES_PER_PIXEL};
