//! Pipeline configuration.
//!
//! Settings are grouped per concern ([`TileSourceConfig`], [`NetworkConfig`],
//! [`DecodeConfig`], [`CacheConfig`], [`SurfaceConfig`]) inside one
//! [`PipelineConfig`]. [`ConfigFile`] reads and writes them as INI at
//! `~/.tileflow/config.ini`.
//!
//! ```ini
//! [source]
//! url_template = https://tile.openstreetmap.org/{z}/{x}/{y}.png
//! image_format = png
//!
//! [decode]
//! workers = 0
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use defaults::{
    DEFAULT_DECODE_WORKERS, DEFAULT_EXPIRY_SECS, DEFAULT_SURFACE_HEIGHT, DEFAULT_SURFACE_WIDTH,
    DEFAULT_TILE_SIZE,
};
pub use file::{config_directory, config_file_path, ConfigFile, ConfigFileError};
pub use settings::{
    CacheConfig, DecodeConfig, NetworkConfig, PipelineConfig, SurfaceConfig, TileSourceConfig,
};
pub use size::{format_size, parse_size, SizeParseError};
