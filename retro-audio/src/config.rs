//! Audio configuration (`audio.toml`)
//!
//! Settings are stored in TOML format in the platform-specific config
//! directory. Missing keys fall back to their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AudioError;
use crate::resample::ResampleMode;

/// Config file name inside [`config_dir`]
pub const CONFIG_FILE: &str = "audio.toml";

/// Audio engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Requested device rate; `None` uses the core's nominal rate
    #[serde(default)]
    pub sample_rate: Option<u32>,
    /// Rates tried, in order, after the requested one (default: 48000, 44100)
    #[serde(default = "default_fallback_rates")]
    pub fallback_rates: Vec<u32>,
    /// Output gain: 0 = mute, 1 = unity, >1 amplifies with clipping (default: 1.0)
    #[serde(default = "default_gain")]
    pub gain: f32,
    /// Interpolation used when rates differ (default: cubic)
    #[serde(default)]
    pub resampler: ResampleMode,
    /// Device buffer size request in frames (default: 512)
    #[serde(default = "default_buffer_frames")]
    pub buffer_frames: u32,
    /// Ring buffer length in seconds of device audio (default: 2.0)
    #[serde(default = "default_ring_seconds")]
    pub ring_seconds: f32,
}

fn default_fallback_rates() -> Vec<u32> {
    vec![48000, 44100]
}
fn default_gain() -> f32 {
    1.0
}
fn default_buffer_frames() -> u32 {
    512
}
fn default_ring_seconds() -> f32 {
    2.0
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: None,
            fallback_rates: default_fallback_rates(),
            gain: default_gain(),
            resampler: ResampleMode::default(),
            buffer_frames: default_buffer_frames(),
            ring_seconds: default_ring_seconds(),
        }
    }
}

impl AudioConfig {
    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::Config`] naming the first offending key.
    pub fn validate(&self) -> Result<(), AudioError> {
        if !self.gain.is_finite() || self.gain < 0.0 {
            return Err(AudioError::Config(format!(
                "gain must be a finite value >= 0 (got {})",
                self.gain
            )));
        }
        if !self.ring_seconds.is_finite() || self.ring_seconds <= 0.0 {
            return Err(AudioError::Config(format!(
                "ring_seconds must be > 0 (got {})",
                self.ring_seconds
            )));
        }
        if self.buffer_frames == 0 {
            return Err(AudioError::Config("buffer_frames must be > 0".to_string()));
        }
        if self.sample_rate == Some(0) || self.fallback_rates.contains(&0) {
            return Err(AudioError::Config("sample rates must be > 0".to_string()));
        }
        Ok(())
    }

    /// Order in which device rates are tried
    ///
    /// The configured override (or else the core's nominal rate) comes first,
    /// followed by the fallback list. Duplicates and zeros are skipped.
    pub fn candidate_rates(&self, nominal: Option<u32>) -> Vec<u32> {
        let mut rates = Vec::with_capacity(self.fallback_rates.len() + 1);
        let first = self.sample_rate.or(nominal);
        for rate in first.into_iter().chain(self.fallback_rates.iter().copied()) {
            if rate > 0 && !rates.contains(&rate) {
                rates.push(rate);
            }
        }
        rates
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\RetroAudio\config`
/// On macOS: `~/Library/Application Support/io.retroaudio.RetroAudio`
/// On Linux: `~/.config/RetroAudio`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.retroaudio", "", "RetroAudio")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from the platform config directory.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> AudioConfig {
    config_dir()
        .and_then(|dir| load_from(&dir.join(CONFIG_FILE)).ok())
        .unwrap_or_default()
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns [`AudioError::Config`] if the file cannot be read or parsed.
pub fn load_from(path: &Path) -> Result<AudioConfig, AudioError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AudioError::Config(format!("{}: {}", path.display(), e)))?;
    toml::from_str(&content).map_err(|e| AudioError::Config(format!("{}: {}", path.display(), e)))
}

/// Saves the configuration to the platform config directory.
///
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save(config: &AudioConfig) -> std::io::Result<()> {
    match config_dir() {
        Some(dir) => save_to(config, &dir.join(CONFIG_FILE)),
        None => Ok(()),
    }
}

/// Saves the configuration to a specific file, creating parent directories.
pub fn save_to(config: &AudioConfig, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config).map_err(std::io::Error::other)?;
    std::fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================================
    // Default value tests
    // =============================================================

    #[test]
    fn test_config_default() {
        let config = AudioConfig::default();
        assert_eq!(config.sample_rate, None);
        assert_eq!(config.fallback_rates, vec![48000, 44100]);
        assert!((config.gain - 1.0).abs() < f32::EPSILON);
        assert_eq!(config.resampler, ResampleMode::Cubic);
        assert_eq!(config.buffer_frames, 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config: AudioConfig = toml::from_str("").unwrap();
        assert_eq!(config, AudioConfig::default());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml_str = r#"
gain = 0.5
resampler = "linear"
"#;
        let config: AudioConfig = toml::from_str(toml_str).unwrap();
        assert!((config.gain - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.resampler, ResampleMode::Linear);
        // rest should default
        assert_eq!(config.fallback_rates, vec![48000, 44100]);
        assert_eq!(config.buffer_frames, 512);
    }

    #[test]
    fn test_unknown_resampler_is_rejected() {
        assert!(toml::from_str::<AudioConfig>("resampler = \"sinc\"").is_err());
    }

    // =============================================================
    // Validation tests
    // =============================================================

    #[test]
    fn test_validate_rejects_negative_gain() {
        let config = AudioConfig {
            gain: -0.1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AudioError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_nan_gain() {
        let config = AudioConfig {
            gain: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_allows_amplification() {
        let config = AudioConfig {
            gain: 8.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_rates() {
        let config = AudioConfig {
            fallback_rates: vec![48000, 0],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AudioConfig {
            sample_rate: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_ring() {
        let config = AudioConfig {
            ring_seconds: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    // =============================================================
    // Candidate rate tests
    // =============================================================

    #[test]
    fn test_candidates_start_with_nominal_rate() {
        let config = AudioConfig::default();
        assert_eq!(config.candidate_rates(Some(32040)), vec![32040, 48000, 44100]);
    }

    #[test]
    fn test_candidates_without_nominal_rate() {
        let config = AudioConfig::default();
        assert_eq!(config.candidate_rates(None), vec![48000, 44100]);
    }

    #[test]
    fn test_candidates_override_wins_and_dedups() {
        let config = AudioConfig {
            sample_rate: Some(44100),
            ..Default::default()
        };
        assert_eq!(config.candidate_rates(Some(32040)), vec![44100, 48000]);
    }

    // =============================================================
    // File tests
    // =============================================================

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = AudioConfig {
            sample_rate: Some(32000),
            fallback_rates: vec![44100],
            gain: 0.25,
            resampler: ResampleMode::Linear,
            buffer_frames: 1024,
            ring_seconds: 0.5,
        };

        save_to(&config, &path).unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, AudioError::Config(_)));
    }

    #[test]
    fn test_load_from_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "gain = \"loud\"").unwrap();
        assert!(load_from(&path).is_err());
    }
}
