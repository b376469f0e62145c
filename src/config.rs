use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::analysis::EnergyModel;
use crate::error::ConfigError;

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults — the config file is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Directory of track documents (overrides XDG default).
    pub library_dir: Option<PathBuf>,
    /// Number of parallel workers for library loading. 0 = auto-detect.
    pub workers: usize,
    /// Transition matching settings.
    pub matching: MatchConfig,
    /// How the per-section energy proxy is derived.
    pub energy: EnergyModel,
}

/// Everything the matching core is parameterised by.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    /// Sections taken from each end of a track.
    pub k: usize,
    /// Release-year window (+/-) used to search for candidates.
    pub year_window: u32,
    /// Maximum number of candidates fetched per search.
    pub limit: usize,
    /// Only keep candidates released in exactly the seed's year.
    pub same_year_only: bool,
    pub weights: Weights,
    pub spans: Spans,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            k: 2,
            year_window: 5,
            limit: 25,
            same_year_only: true,
            weights: Weights::default(),
            spans: Spans::default(),
        }
    }
}

/// Relative importance of each delta in the combined score.
/// Tempo and energy are the primary signals, loudness is secondary.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct Weights {
    pub tempo: f64,
    pub loudness: f64,
    pub energy: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            tempo: 0.3,
            loudness: 0.2,
            energy: 0.5,
        }
    }
}

/// Delta size that counts as "one unit" for each dimension.
/// Puts BPM, dB and the 0-1 energy proxy on a comparable scale before weighting.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct Spans {
    /// BPM
    pub tempo: f64,
    /// dB
    pub loudness: f64,
    pub energy: f64,
}

impl Default for Spans {
    fn default() -> Self {
        Self {
            tempo: 50.0,
            loudness: 30.0,
            energy: 1.0,
        }
    }
}

impl MatchConfig {
    /// Reject configurations the scorer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        for (name, value) in [
            ("tempo", self.weights.tempo),
            ("loudness", self.weights.loudness),
            ("energy", self.weights.energy),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        for (name, value) in [
            ("tempo", self.spans.tempo),
            ("loudness", self.spans.loudness),
            ("energy", self.spans.energy),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidSpan { name, value });
            }
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load config from `~/.config/yeardj/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Parse config text.
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Resolve worker count: 0 → auto-detect (cores / 2, min 1).
    pub fn resolve_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2);
            (cores / 2).max(1)
        }
    }

    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default library directory using XDG data directory.
pub fn default_library_dir() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        dirs.data_dir().join("library")
    } else {
        // Fallback: current directory
        PathBuf::from("library")
    }
}
