//! Engine configuration and resolution presets.
//!
//! Two presets cover the common deployments: the standard preset trades
//! temporal resolution for noise resilience (large FFT chunks), the
//! high-resolution preset shrinks chunks and tolerances for fast beep
//! patterns with sub-100 ms gaps. `EngineConfig::from_profiles` folds the
//! per-profile resolution overrides down to the finest values any loaded
//! profile needs, so one pipeline serves the whole profile set.

use serde::{Deserialize, Serialize};

use crate::profile::AlarmProfile;
pub use crate::profile::ResolutionConfig;

/// Default minimum tone duration in seconds.
pub const DEFAULT_MIN_TONE_DURATION: f64 = 0.1;
/// Default maximum bridged dropout in seconds.
pub const DEFAULT_DROPOUT_TOLERANCE: f64 = 0.15;

/// High-resolution preset minimum tone duration (50 ms).
pub const HIGHRES_MIN_TONE_DURATION: f64 = 0.05;
/// High-resolution preset dropout tolerance (50 ms).
pub const HIGHRES_DROPOUT_TOLERANCE: f64 = 0.05;

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Default FFT chunk size in samples.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;
/// Chunk size cap when any profile needs high resolution.
pub const HIGHRES_MAX_CHUNK_SIZE: usize = 2048;

/// Complete configuration for the detection engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Audio sample rate in Hz.
    pub sample_rate: u32,
    /// FFT chunk size in samples.
    pub chunk_size: usize,
    /// Minimum tone duration to register (seconds).
    pub min_tone_duration: f64,
    /// Maximum gap before a tone is considered ended (seconds).
    pub dropout_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard(DEFAULT_SAMPLE_RATE)
    }
}

impl EngineConfig {
    /// Standard preset for noisy environments.
    pub fn standard(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            chunk_size: DEFAULT_CHUNK_SIZE,
            min_tone_duration: DEFAULT_MIN_TONE_DURATION,
            dropout_tolerance: DEFAULT_DROPOUT_TOLERANCE,
        }
    }

    /// High-resolution preset for patterns with <100 ms gaps between tones.
    pub fn high_resolution(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            chunk_size: HIGHRES_MAX_CHUNK_SIZE,
            min_tone_duration: HIGHRES_MIN_TONE_DURATION,
            dropout_tolerance: HIGHRES_DROPOUT_TOLERANCE,
        }
    }

    /// Recommended constructor: resolution computed from the profile set.
    ///
    /// Takes the finest `min_tone_duration` / `dropout_tolerance` any
    /// profile asks for. When a profile demands finer-than-standard
    /// resolution the chunk size is capped at 2048 samples so tone edges
    /// land in the right chunk.
    pub fn from_profiles(profiles: &[AlarmProfile], sample_rate: u32, chunk_size: usize) -> Self {
        let (min_tone_duration, dropout_tolerance) = compute_finest_resolution(profiles);

        let chunk_size = if min_tone_duration < DEFAULT_MIN_TONE_DURATION
            || dropout_tolerance < DEFAULT_DROPOUT_TOLERANCE
        {
            chunk_size.min(HIGHRES_MAX_CHUNK_SIZE)
        } else {
            chunk_size
        };

        Self {
            sample_rate,
            chunk_size,
            min_tone_duration,
            dropout_tolerance,
        }
    }

    /// Duration of one chunk in seconds.
    pub fn chunk_duration(&self) -> f64 {
        self.chunk_size as f64 / self.sample_rate as f64
    }
}

/// Fold per-profile resolution overrides down to the finest values.
///
/// A single event generator serves every loaded profile, so it has to run
/// at the resolution of the most demanding one.
pub fn compute_finest_resolution(profiles: &[AlarmProfile]) -> (f64, f64) {
    let mut finest_min_tone = DEFAULT_MIN_TONE_DURATION;
    let mut finest_dropout = DEFAULT_DROPOUT_TOLERANCE;

    for profile in profiles {
        if let Some(resolution) = &profile.resolution {
            finest_min_tone = finest_min_tone.min(resolution.min_tone_duration);
            finest_dropout = finest_dropout.min(resolution.dropout_tolerance);
        }
    }

    (finest_min_tone, finest_dropout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Range, Segment};

    fn profile_with_resolution(name: &str, resolution: Option<ResolutionConfig>) -> AlarmProfile {
        AlarmProfile {
            name: name.to_string(),
            segments: vec![Segment::Tone {
                frequency: Range::new(2900.0, 3100.0),
                duration: Range::new(0.4, 0.6),
                min_magnitude: 0.05,
            }],
            confirmation_cycles: 1,
            reset_timeout: 10.0,
            resolution,
            window_duration: None,
            eval_frequency: None,
        }
    }

    #[test]
    fn test_default_config_is_standard() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.min_tone_duration, DEFAULT_MIN_TONE_DURATION);
        assert_eq!(config.dropout_tolerance, DEFAULT_DROPOUT_TOLERANCE);
    }

    #[test]
    fn test_high_resolution_preset() {
        let config = EngineConfig::high_resolution(44_100);
        assert_eq!(config.chunk_size, 2048);
        assert_eq!(config.min_tone_duration, 0.05);
        assert_eq!(config.dropout_tolerance, 0.05);
    }

    #[test]
    fn test_finest_resolution_defaults_without_overrides() {
        let profiles = vec![profile_with_resolution("a", None)];
        let (min_tone, dropout) = compute_finest_resolution(&profiles);
        assert_eq!(min_tone, DEFAULT_MIN_TONE_DURATION);
        assert_eq!(dropout, DEFAULT_DROPOUT_TOLERANCE);
    }

    #[test]
    fn test_finest_resolution_takes_minimum() {
        let profiles = vec![
            profile_with_resolution("a", None),
            profile_with_resolution(
                "b",
                Some(ResolutionConfig {
                    min_tone_duration: 0.03,
                    dropout_tolerance: 0.04,
                }),
            ),
            profile_with_resolution(
                "c",
                Some(ResolutionConfig {
                    min_tone_duration: 0.08,
                    dropout_tolerance: 0.02,
                }),
            ),
        ];
        let (min_tone, dropout) = compute_finest_resolution(&profiles);
        assert_eq!(min_tone, 0.03);
        assert_eq!(dropout, 0.02);
    }

    #[test]
    fn test_from_profiles_caps_chunk_size_for_high_res() {
        let profiles = vec![profile_with_resolution(
            "fast",
            Some(ResolutionConfig::high_resolution()),
        )];
        let config = EngineConfig::from_profiles(&profiles, 44_100, 4096);
        assert_eq!(config.chunk_size, 2048, "chunk size should be capped");
        assert_eq!(config.min_tone_duration, 0.05);
    }

    #[test]
    fn test_from_profiles_keeps_explicit_small_chunk() {
        let profiles = vec![profile_with_resolution(
            "fast",
            Some(ResolutionConfig {
                min_tone_duration: 0.03,
                dropout_tolerance: 0.03,
            }),
        )];
        let config = EngineConfig::from_profiles(&profiles, 44_100, 1024);
        assert_eq!(config.chunk_size, 1024);
    }

    #[test]
    fn test_chunk_duration() {
        let config = EngineConfig {
            sample_rate: 44_100,
            chunk_size: 1024,
            min_tone_duration: 0.1,
            dropout_tolerance: 0.15,
        };
        let expected = 1024.0 / 44_100.0;
        assert!((config.chunk_duration() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::high_resolution(48_000);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
