// Event types flowing between the pipeline stages.

use serde::{Deserialize, Serialize};

/// A closed tone observation produced by the event generator.
///
/// `timestamp` is the tone start in seconds of stream time; `duration` is
/// the accumulated time the tone was visible in the spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneEvent {
    /// Start time in seconds since stream start.
    pub timestamp: f64,
    /// Tone duration in seconds.
    pub duration: f64,
    /// Interpolated tone frequency in Hz.
    pub frequency: f64,
    /// Strongest FFT magnitude seen over the tone's lifetime.
    pub magnitude: f32,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
}

impl ToneEvent {
    /// End time of the tone in seconds.
    pub fn end_time(&self) -> f64 {
        self.timestamp + self.duration
    }
}

/// Terminal output of the pipeline: a profile's pattern was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatchEvent {
    /// Evaluation time at which the match was confirmed (seconds).
    pub timestamp: f64,
    /// Estimated total duration covered by the matched cycles (seconds).
    pub duration: f64,
    /// Name of the matched profile.
    pub profile_name: String,
    /// Number of complete pattern cycles observed.
    pub cycle_count: u32,
}
