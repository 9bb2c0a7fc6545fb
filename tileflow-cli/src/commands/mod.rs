//! CLI command implementations.
//!
//! - [`config`] - write or show the configuration file
//! - [`fetch`] - fetch a grid of tiles and write the composited frame

pub mod config;
pub mod fetch;

use std::path::Path;

use tileflow::config::ConfigFile;

use crate::error::CliError;

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let file = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(file)
}
