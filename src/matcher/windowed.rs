// WindowedMatcher - sliding-window pattern search over buffered events
//
// Buffers all relevant events and periodically slides a per-profile time
// window over recent history, counting how many complete pattern cycles the
// window contains. Trying every starting index makes the search immune to
// leading noise bursts; asymmetric duration tolerances (x0.5..x1.5 for
// tones, x0.5..x2.0 for gaps) absorb reverb and brief microphone dropouts
// while still rejecting wildly wrong timings.

use crate::events::{PatternMatchEvent, ToneEvent};
use crate::matcher::buffer::EventBuffer;
use crate::profile::{AlarmProfile, Range};

/// Tone duration tolerance below the profile minimum.
const TONE_DURATION_SLACK_LOW: f64 = 0.5;
/// Tone duration tolerance above the profile maximum.
const TONE_DURATION_SLACK_HIGH: f64 = 1.5;
/// Gap tolerance below the profile minimum.
const GAP_SLACK_LOW: f64 = 0.5;
/// Gap tolerance above the profile maximum.
const GAP_SLACK_HIGH: f64 = 2.0;

/// Evaluation interval cap in seconds.
const MAX_EVAL_INTERVAL: f64 = 0.5;

/// Derived window parameters for one profile.
#[derive(Debug, Clone, Copy)]
pub struct WindowConfig {
    /// Total sliding-window size in seconds.
    pub window_duration: f64,
    /// Minimum interval between evaluations in seconds.
    pub eval_frequency: f64,
    /// Expected duration of one pattern cycle in seconds.
    pub pattern_duration: f64,
}

impl WindowConfig {
    /// Compute window parameters from a profile.
    ///
    /// The pattern duration is the sum of segment duration midpoints. The
    /// window holds `confirmation_cycles` patterns plus 50% slack for noise;
    /// shorter patterns are evaluated more often. Profile overrides win.
    fn for_profile(profile: &AlarmProfile) -> Self {
        let pattern_duration: f64 = profile
            .segments
            .iter()
            .map(|segment| segment.duration().midpoint())
            .sum();

        let window_duration = profile.window_duration.unwrap_or_else(|| {
            pattern_duration * profile.confirmation_cycles as f64 * 1.5
        });

        let eval_frequency = profile
            .eval_frequency
            .unwrap_or_else(|| MAX_EVAL_INTERVAL.min(pattern_duration / 4.0));

        Self {
            window_duration,
            eval_frequency,
            pattern_duration,
        }
    }
}

/// Per-profile evaluation state.
#[derive(Debug)]
struct ProfileState {
    config: WindowConfig,
    last_eval_time: f64,
    last_match_time: f64,
}

/// Pattern matcher using sliding-window analysis.
pub struct WindowedMatcher {
    profiles: Vec<AlarmProfile>,
    states: Vec<ProfileState>,
    event_buffer: EventBuffer,
}

impl WindowedMatcher {
    /// Initialize with the profiles to match against.
    pub fn new(profiles: Vec<AlarmProfile>) -> Self {
        let states = profiles
            .iter()
            .map(|profile| {
                let config = WindowConfig::for_profile(profile);
                log::debug!(
                    "[{}] window={:.1}s eval={:.2}s pattern={:.2}s",
                    profile.name,
                    config.window_duration,
                    config.eval_frequency,
                    config.pattern_duration
                );
                ProfileState {
                    config,
                    last_eval_time: 0.0,
                    last_match_time: f64::NEG_INFINITY,
                }
            })
            .collect();

        Self {
            profiles,
            states,
            event_buffer: EventBuffer::new(),
        }
    }

    /// Buffer a new tone event for windowed analysis.
    pub fn add_event(&mut self, event: ToneEvent) {
        log::debug!(
            "Buffered event: {:.0} Hz at t={:.2}s",
            event.frequency,
            event.timestamp
        );
        self.event_buffer.add(event);
    }

    /// Evaluate all profiles; call after each chunk.
    ///
    /// Each profile only actually evaluates once its `eval_frequency`
    /// interval has elapsed.
    pub fn evaluate(&mut self, current_time: f64) -> Vec<PatternMatchEvent> {
        let mut matches = Vec::new();

        for (profile, state) in self.profiles.iter().zip(self.states.iter_mut()) {
            if current_time - state.last_eval_time < state.config.eval_frequency {
                continue;
            }
            state.last_eval_time = current_time;

            let window_events = self
                .event_buffer
                .get_window(current_time, state.config.window_duration);
            if window_events.is_empty() {
                continue;
            }

            if let Some(event) =
                match_pattern_in_window(&window_events, profile, state, current_time)
            {
                matches.push(event);
            }
        }

        matches
    }

    /// The profiles this matcher was built with.
    pub fn profiles(&self) -> &[AlarmProfile] {
        &self.profiles
    }

    /// Window configuration derived for a profile, by name.
    pub fn window_config(&self, profile_name: &str) -> Option<WindowConfig> {
        self.profiles
            .iter()
            .position(|p| p.name == profile_name)
            .map(|i| self.states[i].config)
    }

    /// Reset all evaluation state and drop buffered events.
    pub fn reset(&mut self) {
        self.event_buffer.clear();
        for state in &mut self.states {
            state.last_eval_time = 0.0;
            state.last_match_time = f64::NEG_INFINITY;
        }
    }
}

/// Search one profile's window for enough pattern cycles.
fn match_pattern_in_window(
    events: &[ToneEvent],
    profile: &AlarmProfile,
    state: &mut ProfileState,
    current_time: f64,
) -> Option<PatternMatchEvent> {
    // Only events inside some tone band of this profile are relevant
    let freq_ranges: Vec<Range> = profile
        .tone_segments()
        .map(|(frequency, _)| *frequency)
        .collect();
    if freq_ranges.is_empty() {
        return None;
    }

    let mut relevant: Vec<ToneEvent> = events
        .iter()
        .filter(|event| freq_ranges.iter().any(|r| r.contains(event.frequency)))
        .copied()
        .collect();
    if relevant.is_empty() {
        return None;
    }

    relevant.sort_by(|a, b| {
        a.timestamp
            .partial_cmp(&b.timestamp)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    log::debug!(
        "[{}] evaluating {} relevant event(s) in window",
        profile.name,
        relevant.len()
    );

    // Try every starting index so leading noise cannot mask the pattern
    let best_cycles = (0..relevant.len())
        .map(|start| count_pattern_cycles(&relevant[start..], profile))
        .max()
        .unwrap_or(0);

    if best_cycles < profile.confirmation_cycles {
        return None;
    }

    // Suppress duplicates of the same ongoing pattern
    if current_time - state.last_match_time < state.config.pattern_duration {
        log::debug!("[{}] suppressing duplicate detection", profile.name);
        return None;
    }
    state.last_match_time = current_time;

    log::info!(
        "[{}] pattern matched, {} cycle(s) found",
        profile.name,
        best_cycles
    );

    Some(PatternMatchEvent {
        timestamp: current_time,
        duration: state.config.pattern_duration * best_cycles as f64,
        profile_name: profile.name.clone(),
        cycle_count: best_cycles,
    })
}

/// Count complete pattern cycles matched greedily from the first event.
fn count_pattern_cycles(events: &[ToneEvent], profile: &AlarmProfile) -> u32 {
    let tone_segments: Vec<(&Range, &Range)> = profile.tone_segments().collect();
    let silence_segments: Vec<&Range> = profile.silence_segments().collect();

    if events.is_empty() || tone_segments.is_empty() {
        return 0;
    }

    let mut cycle_count = 0;
    let mut index = 0;

    while index < events.len() {
        let mut cycle_matched = true;

        for (segment_index, (frequency, duration)) in tone_segments.iter().enumerate() {
            let Some(event) = events.get(index) else {
                cycle_matched = false;
                break;
            };

            if !frequency.contains(event.frequency) {
                cycle_matched = false;
                break;
            }

            if !tone_duration_acceptable(event.duration, duration) {
                cycle_matched = false;
                break;
            }

            // Gap to the next event, checked between tones within a cycle
            if segment_index < tone_segments.len() - 1 && index + 1 < events.len() {
                if let Some(silence) = silence_segments.get(segment_index) {
                    let gap = events[index + 1].timestamp - events[index].end_time();
                    let gap_min = silence.min * GAP_SLACK_LOW;
                    let gap_max = silence.max * GAP_SLACK_HIGH;
                    if gap < gap_min || gap > gap_max {
                        cycle_matched = false;
                        break;
                    }
                }
            }

            index += 1;
        }

        if !cycle_matched {
            break;
        }
        cycle_count += 1;
    }

    cycle_count
}

/// Plain containment preferred; otherwise the relaxed interval.
fn tone_duration_acceptable(observed: f64, expected: &Range) -> bool {
    if expected.contains(observed) {
        return true;
    }
    let relaxed_min = expected.min * TONE_DURATION_SLACK_LOW;
    let relaxed_max = expected.max * TONE_DURATION_SLACK_HIGH;
    relaxed_min <= observed && observed <= relaxed_max
}
