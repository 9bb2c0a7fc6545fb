//! Decoded tile cache.
//!
//! Holds decoded tiles between the coordinator's `TileReady` event and the
//! frame that draws them. The compositor only sees the [`PurgeableCache`]
//! seam and uses it to drop off-screen tiles when the host is hidden.

mod memory;
mod traits;

pub use memory::{DecodedTileCache, TileCacheStats, DEFAULT_DECODE_CACHE_BYTES};
pub use traits::PurgeableCache;
