//! Configuration sections.

use serde::{Deserialize, Serialize};

/// Chord detection parameters passed through to the splitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordsConfig {
    /// Maximum start distance (ticks) for notes to count as one chord.
    /// Default: 3
    #[serde(default = "ChordsConfig::default_tolerance_ticks")]
    pub tolerance_ticks: u64,

    /// Smallest group reported as a chord.
    /// Default: 2
    #[serde(default = "ChordsConfig::default_min_notes")]
    pub min_notes: usize,
}

impl ChordsConfig {
    fn default_tolerance_ticks() -> u64 {
        3
    }

    fn default_min_notes() -> usize {
        2
    }
}

impl Default for ChordsConfig {
    fn default() -> Self {
        Self {
            tolerance_ticks: Self::default_tolerance_ticks(),
            min_notes: Self::default_min_notes(),
        }
    }
}

/// Where and how results are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Appended to the input path when no output path is given.
    /// Default: .split.mid
    #[serde(default = "OutputConfig::default_suffix")]
    pub suffix: String,

    /// Replace an existing output file.
    /// Default: true
    #[serde(default = "OutputConfig::default_overwrite")]
    pub overwrite: bool,
}

impl OutputConfig {
    fn default_suffix() -> String {
        ".split.mid".to_string()
    }

    fn default_overwrite() -> bool {
        true
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: Self::default_suffix(),
            overwrite: Self::default_overwrite(),
        }
    }
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or a full
    /// `tracing` filter string).
    /// Default: info
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}
