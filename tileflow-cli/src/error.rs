//! CLI error handling with user-facing messages.

use std::path::PathBuf;
use std::process;

use thiserror::Error;
use tileflow::config::ConfigFileError;
use tileflow::decode::DecodeError;
use tileflow::network::NetworkError;
use tileflow::surface::SurfaceError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigFileError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(std::io::Error),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Compositing failed: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("No frame was presented")]
    NoFrame,

    #[error("Failed to write '{}': {source}", .path.display())]
    FileWrite {
        path: PathBuf,
        source: image::ImageError,
    },
}

impl CliError {
    /// Print the error and exit with status 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Config(ConfigFileError::InvalidValue { .. }) = self {
            eprintln!();
            eprintln!("Run `tileflow config init --force` to write a fresh default file.");
        }

        process::exit(1)
    }
}
