// Profile model - alarm pattern definitions
//
// An AlarmProfile describes one repetitive tone/silence pattern (a T3 smoke
// alarm, a CO detector chirp, an appliance beep) as an ordered list of
// segments with frequency and duration tolerances. Profiles are loaded from
// YAML files, validated once, and never mutated by the detection pipeline.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// Inclusive numeric interval used for both frequencies (Hz) and durations (s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// True when `value` falls within `[min, max]`.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Arithmetic midpoint, used when estimating pattern durations.
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// One step in an alarm pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    /// A sustained tone within a frequency band.
    Tone {
        frequency: Range,
        duration: Range,
        #[serde(default = "default_min_magnitude")]
        min_magnitude: f32,
    },
    /// A gap between tones.
    Silence { duration: Range },
    /// Wildcard step. Parsed for precise diagnostics but rejected at
    /// validation - no shipped profile uses it.
    Any { duration: Range },
}

fn default_min_magnitude() -> f32 {
    0.05
}

impl Segment {
    /// Expected duration range of this step.
    pub fn duration(&self) -> &Range {
        match self {
            Segment::Tone { duration, .. } => duration,
            Segment::Silence { duration } => duration,
            Segment::Any { duration } => duration,
        }
    }
}

/// Per-profile resolution override for the event generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Minimum duration for a detected tone to be valid (seconds).
    pub min_tone_duration: f64,
    /// Maximum in-tone gap bridged without closing the tone (seconds).
    pub dropout_tolerance: f64,
}

impl ResolutionConfig {
    /// Standard preset for noisy environments.
    pub fn standard() -> Self {
        Self {
            min_tone_duration: crate::config::DEFAULT_MIN_TONE_DURATION,
            dropout_tolerance: crate::config::DEFAULT_DROPOUT_TOLERANCE,
        }
    }

    /// High-resolution preset for fast beep patterns with <100 ms gaps.
    pub fn high_resolution() -> Self {
        Self {
            min_tone_duration: crate::config::HIGHRES_MIN_TONE_DURATION,
            dropout_tolerance: crate::config::HIGHRES_DROPOUT_TOLERANCE,
        }
    }
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Definition of an alarm pattern.
///
/// `segments` is the ordered tone/silence sequence of one pattern cycle;
/// `confirmation_cycles` is how many consecutive cycles must be observed
/// before a match is reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmProfile {
    pub name: String,
    pub segments: Vec<Segment>,
    #[serde(default = "default_confirmation_cycles")]
    pub confirmation_cycles: u32,
    /// Seconds before an active alarm flag auto-clears.
    #[serde(default = "default_reset_timeout")]
    pub reset_timeout: f64,
    /// Optional event-generator resolution override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionConfig>,
    /// Optional sliding-window size override (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_duration: Option<f64>,
    /// Optional evaluation interval override (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_frequency: Option<f64>,
}

fn default_confirmation_cycles() -> u32 {
    1
}

fn default_reset_timeout() -> f64 {
    10.0
}

impl AlarmProfile {
    /// Check structural invariants: non-empty segment list, ordered ranges,
    /// positive durations, tone frequency bounds present and ordered.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.segments.is_empty() {
            return Err(ProfileError::EmptySegments {
                profile: self.name.clone(),
            });
        }
        if self.confirmation_cycles < 1 {
            return Err(ProfileError::InvalidConfirmationCycles {
                profile: self.name.clone(),
                cycles: self.confirmation_cycles,
            });
        }

        for (index, segment) in self.segments.iter().enumerate() {
            let duration = segment.duration();
            if duration.min > duration.max {
                return Err(ProfileError::InvertedRange {
                    profile: self.name.clone(),
                    segment: index,
                    min: duration.min,
                    max: duration.max,
                });
            }
            if duration.min < 0.0 || duration.max <= 0.0 {
                return Err(ProfileError::NonPositiveDuration {
                    profile: self.name.clone(),
                    segment: index,
                });
            }

            match segment {
                Segment::Tone { frequency, .. } => {
                    if frequency.min > frequency.max {
                        return Err(ProfileError::InvertedRange {
                            profile: self.name.clone(),
                            segment: index,
                            min: frequency.min,
                            max: frequency.max,
                        });
                    }
                    if frequency.min <= 0.0 {
                        return Err(ProfileError::InvalidFrequency {
                            profile: self.name.clone(),
                            segment: index,
                        });
                    }
                }
                Segment::Silence { .. } => {}
                Segment::Any { .. } => {
                    return Err(ProfileError::UnsupportedSegment {
                        profile: self.name.clone(),
                        segment: index,
                    });
                }
            }
        }

        Ok(())
    }

    /// Tone segments in pattern order.
    pub fn tone_segments(&self) -> impl Iterator<Item = (&Range, &Range)> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Tone {
                frequency, duration, ..
            } => Some((frequency, duration)),
            _ => None,
        })
    }

    /// Silence segments in pattern order.
    pub fn silence_segments(&self) -> impl Iterator<Item = &Range> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Silence { duration } => Some(duration),
            _ => None,
        })
    }
}

/// On-disk profile file: either a single profile document or a
/// `profiles:` list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfileFile {
    Many { profiles: Vec<AlarmProfile> },
    One(AlarmProfile),
}

/// Load and validate every profile in a YAML file.
///
/// Accepts both a single profile document and a `profiles:` list. Names
/// must be unique across the returned set.
pub fn load_profiles_from_yaml<P: AsRef<Path>>(path: P) -> Result<Vec<AlarmProfile>, ProfileError> {
    let contents = fs::read_to_string(&path)?;
    let parsed: ProfileFile = serde_yaml::from_str(&contents)?;

    let profiles = match parsed {
        ProfileFile::Many { profiles } => profiles,
        ProfileFile::One(profile) => vec![profile],
    };

    validate_profile_set(&profiles)?;

    log::info!(
        "Loaded {} profile(s) from {:?}: {:?}",
        profiles.len(),
        path.as_ref(),
        profiles.iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
    );

    Ok(profiles)
}

/// Serialize one profile back to YAML (tuning workflows).
pub fn save_profile_to_yaml<P: AsRef<Path>>(
    profile: &AlarmProfile,
    path: P,
) -> Result<(), ProfileError> {
    profile.validate()?;
    let yaml = serde_yaml::to_string(profile)?;
    fs::write(path, yaml)?;
    Ok(())
}

/// Validate every profile and reject duplicate names.
pub fn validate_profile_set(profiles: &[AlarmProfile]) -> Result<(), ProfileError> {
    let mut seen = std::collections::HashSet::new();
    for profile in profiles {
        profile.validate()?;
        if !seen.insert(profile.name.as_str()) {
            return Err(ProfileError::DuplicateName {
                name: profile.name.clone(),
            });
        }
    }
    Ok(())
}
