//! Configuration loading for chordsplit.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/chordsplit/config.toml` (system)
//! 2. `~/.config/chordsplit/config.toml` (user)
//! 3. `./chordsplit.toml`, or the path given with `--config`
//! 4. Environment variables (`CHORDSPLIT_*`, `RUST_LOG`)
//!
//! Each file only overrides the keys it sets.
//!
//! # Example Config
//!
//! ```toml
//! [chords]
//! tolerance_ticks = 3
//! min_notes = 2
//!
//! [output]
//! suffix = ".split.mid"
//! overwrite = true
//!
//! [logging]
//! level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files, discover_config_files_with_override, ConfigSources};
pub use sections::{ChordsConfig, LoggingConfig, OutputConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Complete chordsplit configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SplitConfig {
    #[serde(default)]
    pub chords: ChordsConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SplitConfig {
    /// Load configuration from the standard locations and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, with `config_path` replacing `./chordsplit.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report which files and variables contributed.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = SplitConfig::default();

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::FileRead {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                });
            }
        }

        for path in loader::discover_config_files_with_override(config_path) {
            loader::load_into(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources)?;
        config.validate()?;

        Ok((config, sources))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chords.min_notes < 1 {
            return Err(ConfigError::Invalid {
                key: "chords.min_notes".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.output.suffix.is_empty() {
            return Err(ConfigError::Invalid {
                key: "output.suffix".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# chordsplit configuration\n\n");

        output.push_str("[chords]\n");
        output.push_str(&format!("tolerance_ticks = {}\n", self.chords.tolerance_ticks));
        output.push_str(&format!("min_notes = {}\n", self.chords.min_notes));

        output.push_str("\n[output]\n");
        output.push_str(&format!("suffix = \"{}\"\n", self.output.suffix));
        output.push_str(&format!("overwrite = {}\n", self.output.overwrite));

        output.push_str("\n[logging]\n");
        output.push_str(&format!("level = \"{}\"\n", self.logging.level));

        output
    }
}
