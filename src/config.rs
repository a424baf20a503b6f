//! Engine-wide configuration, loaded from an optional TOML file.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\strumrack-engine\config.toml
//! - macOS: ~/Library/Application Support/strumrack-engine/config.toml
//! - Linux: ~/.config/strumrack-engine/config.toml
//!
//! None of this persists a musical document (banks/patterns stay the
//! caller's responsibility per the player/pattern core's scope) — it only
//! carries engine defaults: ring buffer sizing, resampler quality, the
//! player slot ceiling and the sequencer's clock resolution.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::player::SrcQuality;

/// Engine-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Player engine defaults.
    pub player: PlayerDefaults,

    /// Sequencer pattern-core defaults.
    pub sequencer: SequencerDefaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player: PlayerDefaults::default(),
            sequencer: SequencerDefaults::default(),
        }
    }
}

/// Defaults applied to a newly created [`crate::player::Player`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerDefaults {
    /// Decoder chunk size in frames (§3.1 `buffer_size`).
    pub buffer_size: usize,

    /// Ring size multiplier (§3.1 `buffer_count`), minimum 2.
    pub buffer_count: usize,

    /// Default resampler quality tier.
    pub src_quality: SrcQuality,

    /// Maximum number of concurrently open player slots (§2 "up to N").
    pub max_players: usize,
}

impl Default for PlayerDefaults {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            buffer_count: 4,
            src_quality: SrcQuality::Medium,
            max_players: 16,
        }
    }
}

/// Defaults applied to a newly created [`crate::pattern::Pattern`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerDefaults {
    /// Pulses-per-quarter-note clock resolution (glossary: PPQN).
    pub ppqn: u32,

    /// Default beats-in-pattern for a freshly created pattern.
    pub default_beats: u32,

    /// Default steps-per-beat for a freshly created pattern.
    pub default_steps_per_beat: u32,
}

impl Default for SequencerDefaults {
    fn default() -> Self {
        Self {
            ppqn: crate::pattern::PPQN,
            default_beats: 4,
            default_steps_per_beat: 4,
        }
    }
}

/// Get the config directory path.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("strumrack-engine"))
}

/// Get the full path to the config file.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk.
///
/// Returns the default config if the file doesn't exist or can't be
/// parsed; this is a realtime-adjacent engine, not an interactive app, so
/// it never fails startup over a bad config file — it logs and falls back.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!(target: "config", "could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!(target: "config", path = ?path, "no config file found, using defaults");
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!(target: "config", path = ?path, "loaded config");
                config
            }
            Err(e) => {
                tracing::error!(target: "config", path = ?path, error = %e, "failed to parse config file, using defaults");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!(target: "config", path = ?path, error = %e, "failed to read config file, using defaults");
            Config::default()
        }
    }
}

/// Save configuration to disk, creating the config directory if needed.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    let path = dir.join("config.toml");

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::CreateDir(dir.clone(), e))?;

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename).
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, &path)
        .map_err(|e| ConfigError::Rename(temp_path, path.clone(), e))?;

    tracing::info!(target: "config", path = ?path, "saved config");
    Ok(())
}

/// Configuration load/save errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[player]"));
        assert!(toml.contains("[sequencer]"));
    }

    #[test]
    fn config_roundtrip() {
        let mut config = Config::default();
        config.player.max_players = 8;
        config.sequencer.ppqn = 96;

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.player.max_players, 8);
        assert_eq!(parsed.sequencer.ppqn, 96);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let toml = r#"
[player]
max_players = 4
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.player.max_players, 4);
        assert_eq!(config.player.buffer_size, 4096);
        assert_eq!(config.sequencer.ppqn, crate::pattern::PPQN);
    }
}
