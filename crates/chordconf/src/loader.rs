//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, SplitConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local file.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/chordsplit/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("chordsplit/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("chordsplit.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file and apply the keys it sets on top of `config`.
pub fn load_into(config: &mut SplitConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

/// Overlay a TOML document. Keys that are absent leave `config` untouched.
fn apply_toml(config: &mut SplitConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(chords) = table.get("chords").and_then(|v| v.as_table()) {
        if let Some(v) = chords.get("tolerance_ticks") {
            config.chords.tolerance_ticks = non_negative(v, "chords.tolerance_ticks", path)?;
        }
        if let Some(v) = chords.get("min_notes") {
            config.chords.min_notes = non_negative(v, "chords.min_notes", path)? as usize;
        }
    }

    if let Some(output) = table.get("output").and_then(|v| v.as_table()) {
        if let Some(v) = output.get("suffix") {
            config.output.suffix = string(v, "output.suffix", path)?;
        }
        if let Some(v) = output.get("overwrite") {
            config.output.overwrite = v.as_bool().ok_or_else(|| ConfigError::Parse {
                path: path.to_path_buf(),
                message: format!("output.overwrite must be true or false, got {v}"),
            })?;
        }
    }

    if let Some(logging) = table.get("logging").and_then(|v| v.as_table()) {
        if let Some(v) = logging.get("level") {
            config.logging.level = string(v, "logging.level", path)?;
        }
    }

    Ok(())
}

fn non_negative(value: &toml::Value, key: &str, path: &Path) -> Result<u64, ConfigError> {
    match value.as_integer() {
        Some(v) if v >= 0 => Ok(v as u64),
        _ => Err(ConfigError::Parse {
            path: path.to_path_buf(),
            message: format!("{key} must be a non-negative integer, got {value}"),
        }),
    }
}

fn string(value: &toml::Value, key: &str, path: &Path) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::Parse {
            path: path.to_path_buf(),
            message: format!("{key} must be a string, got {value}"),
        })
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(
    config: &mut SplitConfig,
    sources: &mut ConfigSources,
) -> Result<(), ConfigError> {
    apply_overrides_from(config, sources, |key| env::var(key).ok())
}

/// Same as [`apply_env_overrides`], reading variables through `lookup`.
pub fn apply_overrides_from<F>(
    config: &mut SplitConfig,
    sources: &mut ConfigSources,
    lookup: F,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("CHORDSPLIT_TOLERANCE_TICKS") {
        config.chords.tolerance_ticks = parse_env("CHORDSPLIT_TOLERANCE_TICKS", &v)?;
        sources.env_overrides.push("CHORDSPLIT_TOLERANCE_TICKS".to_string());
    }
    if let Some(v) = lookup("CHORDSPLIT_MIN_NOTES") {
        config.chords.min_notes = parse_env("CHORDSPLIT_MIN_NOTES", &v)?;
        sources.env_overrides.push("CHORDSPLIT_MIN_NOTES".to_string());
    }
    if let Some(v) = lookup("CHORDSPLIT_OUTPUT_SUFFIX") {
        config.output.suffix = v;
        sources.env_overrides.push("CHORDSPLIT_OUTPUT_SUFFIX".to_string());
    }

    if let Some(v) = lookup("CHORDSPLIT_LOG_LEVEL") {
        config.logging.level = v;
        sources.env_overrides.push("CHORDSPLIT_LOG_LEVEL".to_string());
    }
    // RUST_LOG wins over our own variable
    if let Some(v) = lookup("RUST_LOG") {
        config.logging.level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        message: format!("expected a non-negative integer, got {value:?}"),
    })
}
