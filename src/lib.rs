// Tonewatch - real-time acoustic alarm pattern detection
//
// Streams mono PCM chunks through an FFT peak monitor, a frequency
// prefilter, an event generator, and a sliding-window pattern matcher, and
// fires callbacks when a configured alarm pattern (smoke alarm T3, CO
// detector T4, appliance beeps) is heard.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod matcher;
pub mod profile;
pub mod telemetry;
pub mod testing;

// Re-exports for convenience
pub use config::{compute_finest_resolution, EngineConfig};
pub use engine::{DetectionSink, Engine};
pub use error::{AudioError, ProfileError};
pub use events::{PatternMatchEvent, ToneEvent};
pub use profile::{
    load_profiles_from_yaml, save_profile_to_yaml, AlarmProfile, Range, ResolutionConfig, Segment,
};
