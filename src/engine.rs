// Engine - orchestrates the full detection pipeline
//
// Audio chunk -> SpectralMonitor -> FrequencyFilter -> EventGenerator ->
// WindowedMatcher -> DetectionSink callbacks. The engine is single-threaded
// and synchronous: one `process_chunk` call per chunk, completing well
// inside the chunk's real-time budget, never suspending.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::sync::broadcast;

use crate::analysis::{EventGenerator, FrequencyFilter, SpectralMonitor};
use crate::config::EngineConfig;
use crate::error::ProfileError;
use crate::events::PatternMatchEvent;
use crate::matcher::WindowedMatcher;
use crate::profile::{validate_profile_set, AlarmProfile};
use crate::telemetry;

/// Capacity of the match broadcast channel.
const MATCH_CHANNEL_CAPACITY: usize = 64;

/// Receives detection callbacks on the caller's thread.
///
/// `on_detection` fires once per alarm episode with just the profile name;
/// `on_match` carries the full match event. Panics inside either are
/// caught, logged, and swallowed - they never affect detection progress.
pub trait DetectionSink: Send {
    fn on_detection(&mut self, profile_name: &str) {
        let _ = profile_name;
    }

    fn on_match(&mut self, event: &PatternMatchEvent) {
        let _ = event;
    }
}

/// Acoustic alarm detection engine.
///
/// Owns one complete pipeline. Multiple engines may run in parallel (one
/// per sample-rate regime); they share only immutable profile data.
pub struct Engine {
    config: EngineConfig,
    dsp: SpectralMonitor,
    freq_filter: FrequencyFilter,
    generator: EventGenerator,
    matcher: WindowedMatcher,
    sink: Option<Box<dyn DetectionSink>>,
    match_tx: broadcast::Sender<PatternMatchEvent>,

    current_time: f64,
    alarm_active: bool,
    /// Time the alarm flag was set, for the lazy auto-clear.
    alarm_set_time: f64,
    /// Seconds after which the flag clears (matched profile's reset_timeout).
    alarm_clear_after: f64,
}

impl Engine {
    /// Build an engine for a validated profile set.
    ///
    /// Construction is refused when any profile fails validation.
    pub fn new(profiles: Vec<AlarmProfile>, config: EngineConfig) -> Result<Self, ProfileError> {
        validate_profile_set(&profiles)?;

        let (match_tx, _) = broadcast::channel(MATCH_CHANNEL_CAPACITY);

        log::info!(
            "Engine initialized with {} profile(s): {:?} (chunk={}@{} Hz, min_tone={:.3}s, dropout={:.3}s)",
            profiles.len(),
            profiles.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            config.chunk_size,
            config.sample_rate,
            config.min_tone_duration,
            config.dropout_tolerance
        );

        Ok(Self {
            dsp: SpectralMonitor::new(config.sample_rate, config.chunk_size),
            freq_filter: FrequencyFilter::new(&profiles),
            generator: EventGenerator::new(
                config.sample_rate,
                config.chunk_size,
                config.min_tone_duration,
                config.dropout_tolerance,
            ),
            matcher: WindowedMatcher::new(profiles),
            sink: None,
            match_tx,
            config,
            current_time: 0.0,
            alarm_active: false,
            alarm_set_time: 0.0,
            alarm_clear_after: 10.0,
        })
    }

    /// Convenience constructor: resolution derived from the profiles.
    pub fn from_profiles(profiles: Vec<AlarmProfile>) -> Result<Self, ProfileError> {
        let config = EngineConfig::from_profiles(
            &profiles,
            crate::config::DEFAULT_SAMPLE_RATE,
            crate::config::DEFAULT_CHUNK_SIZE,
        );
        Self::new(profiles, config)
    }

    /// Install the detection sink.
    pub fn with_sink(mut self, sink: Box<dyn DetectionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Subscribe to every fired `PatternMatchEvent`.
    ///
    /// Unlike the sink, subscribers also see matches logged while the alarm
    /// flag is already set.
    pub fn subscribe(&self) -> broadcast::Receiver<PatternMatchEvent> {
        self.match_tx.subscribe()
    }

    /// Process a single audio chunk through the pipeline.
    ///
    /// Returns true when a pattern match fired during this chunk. Chunks of
    /// the wrong length contribute no peaks but still advance time.
    pub fn process_chunk(&mut self, chunk: &[i16]) -> bool {
        self.current_time += self.config.chunk_duration();
        telemetry::hub().record_chunk();

        // Lazy auto-clear of the alarm flag (no timer thread needed)
        if self.alarm_active && self.current_time - self.alarm_set_time >= self.alarm_clear_after {
            log::info!("Auto-clearing alarm state");
            self.alarm_active = false;
        }

        let peaks = self.dsp.process(chunk);
        let peaks = self.freq_filter.filter_peaks(peaks);
        telemetry::hub().record_peaks(peaks.len());

        let events = self.generator.process(&peaks, self.current_time);
        telemetry::hub().record_events(events.len());
        for event in events {
            self.matcher.add_event(event);
        }

        let matches = self.matcher.evaluate(self.current_time);
        let detected = !matches.is_empty();
        for m in matches {
            self.trigger_alarm(m);
        }

        detected
    }

    /// Close all active tones, run a final evaluation, and report matches.
    ///
    /// Call at end of stream so patterns ending right at the boundary are
    /// still found.
    pub fn flush(&mut self) -> bool {
        let events = self.generator.flush();
        telemetry::hub().record_events(events.len());
        for event in events {
            self.matcher.add_event(event);
        }

        // Step past the throttle so the final evaluation always runs
        let matches = self.matcher.evaluate(self.current_time + 1.0);
        let detected = !matches.is_empty();
        for m in matches {
            self.trigger_alarm(m);
        }
        detected
    }

    /// Discard all pipeline state (tones, buffered events, alarm flag).
    pub fn reset(&mut self) {
        self.generator.reset();
        self.matcher.reset();
        self.current_time = 0.0;
        self.alarm_active = false;
        log::info!("Engine state reset");
    }

    /// Stream time in seconds.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// True while an alarm episode is being suppressed.
    pub fn alarm_active(&self) -> bool {
        self.alarm_active
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn trigger_alarm(&mut self, m: PatternMatchEvent) {
        log::info!("MATCH: {} (cycles {})", m.profile_name, m.cycle_count);
        telemetry::hub().record_match();

        // Broadcast every match; subscribers handle their own dedup
        let _ = self.match_tx.send(m.clone());

        if self.alarm_active {
            // Same ongoing alarm; callbacks already fired
            return;
        }

        log::warn!(
            "ALARM DETECTED: [{}] at t={:.2}s",
            m.profile_name,
            m.timestamp
        );

        self.alarm_active = true;
        self.alarm_set_time = self.current_time;
        self.alarm_clear_after = self.reset_timeout_for(&m.profile_name).unwrap_or(10.0);

        if let Some(sink) = self.sink.as_mut() {
            let name = m.profile_name.clone();
            if catch_unwind(AssertUnwindSafe(|| sink.on_detection(&name))).is_err() {
                log::error!("on_detection callback panicked; continuing");
            }
            if catch_unwind(AssertUnwindSafe(|| sink.on_match(&m))).is_err() {
                log::error!("on_match callback panicked; continuing");
            }
        }
    }

    fn reset_timeout_for(&self, profile_name: &str) -> Option<f64> {
        self.matcher
            .profiles()
            .iter()
            .find(|p| p.name == profile_name)
            .map(|p| p.reset_timeout)
    }
}
