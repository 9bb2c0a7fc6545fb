//! Default values for every configuration setting.

use crate::cache::DEFAULT_DECODE_CACHE_BYTES;
use crate::network::{
    DEFAULT_IMAGE_FORMAT, DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_TRANSFER_TIMEOUT_SECS,
    DEFAULT_URL_TEMPLATE,
};

use super::settings::{
    CacheConfig, DecodeConfig, NetworkConfig, PipelineConfig, SurfaceConfig, TileSourceConfig,
};

/// Requests pending longer than this are expired.
pub const DEFAULT_EXPIRY_SECS: u64 = 60;

/// Decode inline on the owning thread.
pub const DEFAULT_DECODE_WORKERS: usize = 0;

pub const DEFAULT_TILE_SIZE: u32 = 256;
pub const DEFAULT_SURFACE_WIDTH: u32 = 3 * DEFAULT_TILE_SIZE;
pub const DEFAULT_SURFACE_HEIGHT: u32 = 3 * DEFAULT_TILE_SIZE;

impl Default for TileSourceConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            image_format: DEFAULT_IMAGE_FORMAT.to_string(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TRANSFER_TIMEOUT_SECS,
            expiry_secs: DEFAULT_EXPIRY_SECS,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_DECODE_WORKERS,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_DECODE_CACHE_BYTES,
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_SURFACE_WIDTH,
            height: DEFAULT_SURFACE_HEIGHT,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: TileSourceConfig::default(),
            network: NetworkConfig::default(),
            decode: DecodeConfig::default(),
            cache: CacheConfig::default(),
            surface: SurfaceConfig::default(),
        }
    }
}
