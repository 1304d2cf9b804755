// Error types for profile loading and audio capture.
//
// Detection itself never fails: malformed chunks degrade to silence and
// panicking callbacks are swallowed. Errors surface only at the edges -
// profile load/validation and the audio capture collaborator.

use std::fmt;

/// Profile file or structure rejected at load time.
#[derive(Debug)]
pub enum ProfileError {
    /// Profile has no segments.
    EmptySegments { profile: String },
    /// A range with `min > max`.
    InvertedRange {
        profile: String,
        segment: usize,
        min: f64,
        max: f64,
    },
    /// A segment duration that is zero or negative.
    NonPositiveDuration { profile: String, segment: usize },
    /// A tone segment with a non-positive frequency bound.
    InvalidFrequency { profile: String, segment: usize },
    /// An `any` segment - parsed but not supported by the matcher.
    UnsupportedSegment { profile: String, segment: usize },
    /// `confirmation_cycles` below 1.
    InvalidConfirmationCycles { profile: String, cycles: u32 },
    /// Two profiles share a name.
    DuplicateName { name: String },
    /// Underlying file read/write failure.
    Io(std::io::Error),
    /// YAML syntax or shape mismatch.
    Parse(serde_yaml::Error),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::EmptySegments { profile } => {
                write!(f, "profile '{}' has no segments", profile)
            }
            ProfileError::InvertedRange {
                profile,
                segment,
                min,
                max,
            } => write!(
                f,
                "profile '{}' segment {} has inverted range ({} > {})",
                profile, segment, min, max
            ),
            ProfileError::NonPositiveDuration { profile, segment } => write!(
                f,
                "profile '{}' segment {} has a non-positive duration",
                profile, segment
            ),
            ProfileError::InvalidFrequency { profile, segment } => write!(
                f,
                "profile '{}' segment {} has a non-positive frequency bound",
                profile, segment
            ),
            ProfileError::UnsupportedSegment { profile, segment } => write!(
                f,
                "profile '{}' segment {} uses the unsupported 'any' type",
                profile, segment
            ),
            ProfileError::InvalidConfirmationCycles { profile, cycles } => write!(
                f,
                "profile '{}' requires confirmation_cycles >= 1 (got {})",
                profile, cycles
            ),
            ProfileError::DuplicateName { name } => {
                write!(f, "duplicate profile name '{}'", name)
            }
            ProfileError::Io(err) => write!(f, "profile file I/O error: {}", err),
            ProfileError::Parse(err) => write!(f, "profile file parse error: {}", err),
        }
    }
}

impl std::error::Error for ProfileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProfileError::Io(err) => Some(err),
            ProfileError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProfileError {
    fn from(err: std::io::Error) -> Self {
        ProfileError::Io(err)
    }
}

impl From<serde_yaml::Error> for ProfileError {
    fn from(err: serde_yaml::Error) -> Self {
        ProfileError::Parse(err)
    }
}

/// Audio capture / decoding errors from the collaborator layer.
#[derive(Debug)]
pub enum AudioError {
    /// No input device available on the default host.
    NoInputDevice,
    /// Input stream could not be configured.
    StreamConfig { reason: String },
    /// Input stream could not be opened.
    StreamOpenFailed { reason: String },
    /// Input stream failed to start.
    StreamStartFailed { reason: String },
    /// Sample format the capture layer cannot convert.
    UnsupportedFormat { format: String },
    /// WAV file could not be read or decoded.
    WavRead { reason: String },
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::NoInputDevice => write!(f, "no default audio input device found"),
            AudioError::StreamConfig { reason } => {
                write!(f, "failed to configure input stream: {}", reason)
            }
            AudioError::StreamOpenFailed { reason } => {
                write!(f, "failed to open audio stream: {}", reason)
            }
            AudioError::StreamStartFailed { reason } => {
                write!(f, "failed to start audio stream: {}", reason)
            }
            AudioError::UnsupportedFormat { format } => {
                write!(f, "unsupported sample format: {}", format)
            }
            AudioError::WavRead { reason } => write!(f, "failed to read WAV file: {}", reason),
        }
    }
}

impl std::error::Error for AudioError {}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        AudioError::WavRead {
            reason: err.to_string(),
        }
    }
}
