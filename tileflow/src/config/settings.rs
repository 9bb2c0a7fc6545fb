//! Pipeline configuration structs.

use std::time::Duration;

use crate::decode::{DecodeError, DecodePool};
use crate::network::TileSource;
use crate::surface::SurfaceSize;

/// Complete configuration of a tile pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub source: TileSourceConfig,
    pub network: NetworkConfig,
    pub decode: DecodeConfig,
    pub cache: CacheConfig,
    pub surface: SurfaceConfig,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: TileSourceConfig) -> Self {
        self.source = source;
        self
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn with_decode(mut self, decode: DecodeConfig) -> Self {
        self.decode = decode;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_surface(mut self, surface: SurfaceConfig) -> Self {
        self.surface = surface;
        self
    }
}

/// Where tiles come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSourceConfig {
    /// URL with `{map}`, `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,
    /// Format hint handed to the decoder.
    pub image_format: String,
}

impl TileSourceConfig {
    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    pub fn with_image_format(mut self, format: impl Into<String>) -> Self {
        self.image_format = format.into();
        self
    }

    pub fn tile_source(&self) -> TileSource {
        TileSource::new(self.url_template.clone(), self.image_format.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Per-transfer HTTP timeout.
    pub timeout_secs: u64,
    /// Age after which a pending request is failed by `expire_stale`.
    pub expiry_secs: u64,
    /// Largest response body accepted for one tile.
    pub max_payload_bytes: usize,
}

impl NetworkConfig {
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_expiry_secs(mut self, secs: u64) -> Self {
        self.expiry_secs = secs;
        self
    }

    pub fn with_max_payload_bytes(mut self, bytes: usize) -> Self {
        self.max_payload_bytes = bytes;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Decode worker threads. `0` decodes inline on the owning thread.
    pub workers: usize,
}

impl DecodeConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Build the configured pool, or `None` for inline decoding.
    pub fn build_pool(&self) -> Result<Option<DecodePool>, DecodeError> {
        if self.workers == 0 {
            return Ok(None);
        }
        DecodePool::new(self.workers).map(Some)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Byte budget of the decoded tile cache.
    pub max_bytes: usize,
}

impl CacheConfig {
    pub fn with_max_bytes(mut self, bytes: usize) -> Self {
        self.max_bytes = bytes;
        self
    }
}

/// Frame geometry. `width` and `height` size the frame when no explicit
/// tile grid is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    /// Edge length tiles are drawn at.
    pub tile_size: u32,
}

impl SurfaceConfig {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }

    /// Columns and rows of tiles needed to cover the configured frame.
    pub fn grid_extent(&self) -> (u32, u32) {
        let tile_size = self.tile_size.max(1);
        (
            self.width.div_ceil(tile_size),
            self.height.div_ceil(tile_size),
        )
    }
}
