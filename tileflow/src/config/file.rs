//! Loading and saving `~/.tileflow/config.ini`.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::{debug, info};

use super::settings::PipelineConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    #[error("Failed to write config file {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Config file already exists: {0}")]
    AlreadyExists(PathBuf),
}

/// A configuration together with the file it belongs to.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    config: PipelineConfig,
    on_disk: bool,
}

impl ConfigFile {
    /// Load from `~/.tileflow/config.ini`.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self {
                path: path.to_path_buf(),
                config: PipelineConfig::default(),
                on_disk: false,
            });
        }

        let ini = Ini::load_from_file(path)?;
        let config = super::parser::parse_ini(&ini)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(Self {
            path: path.to_path_buf(),
            config,
            on_disk: true,
        })
    }

    /// Write a default config file at `path`.
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub fn init(path: &Path, force: bool) -> Result<Self, ConfigFileError> {
        if path.exists() && !force {
            return Err(ConfigFileError::AlreadyExists(path.to_path_buf()));
        }
        let mut file = Self {
            path: path.to_path_buf(),
            config: PipelineConfig::default(),
            on_disk: false,
        };
        file.save()?;
        info!(path = %path.display(), "Wrote default config file");
        Ok(file)
    }

    /// Write the configuration to its path, creating parent directories.
    pub fn save(&mut self) -> Result<(), ConfigFileError> {
        let write_error = |source| ConfigFileError::WriteError {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(&self.path, super::writer::to_config_string(&self.config))
            .map_err(write_error)?;
        self.on_disk = true;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    pub fn into_config(self) -> PipelineConfig {
        self.config
    }

    /// Whether the configuration was read from (or written to) disk.
    pub fn is_on_disk(&self) -> bool {
        self.on_disk
    }

    /// The effective configuration rendered as INI text.
    pub fn render(&self) -> String {
        super::writer::to_config_string(&self.config)
    }
}

/// `~/.tileflow`, or `./.tileflow` when no home directory is known.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tileflow")
}

/// `~/.tileflow/config.ini`.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
