// EventGenerator - per-chunk peaks to discrete tone events
//
// Bridges the DSP layer (frequency peaks) and the pattern matcher (audio
// events). Responsibilities:
// - Continuity: stitch peaks across chunks into one tone per frequency
// - Dropout tolerance: bridge short gaps without splitting a tone
// - Debouncing: drop tones shorter than the configured minimum
// - Chronological release: never emit an event that could be preceded by a
//   later-closing tone with an earlier start
// - Coalescing: merge released events that overlap by more than half of the
//   shorter one

use crate::analysis::spectral::Peak;
use crate::events::ToneEvent;

/// Peaks within this many Hz of an active tone extend it.
const FREQUENCY_TOLERANCE: f64 = 50.0;

/// A tone currently being tracked across chunks.
#[derive(Debug, Clone)]
struct ActiveTone {
    start_time: f64,
    frequency: f64,
    max_magnitude: f32,
    last_seen_time: f64,
    samples_count: u32,
}

/// Converts continuous spectral peaks into discrete `ToneEvent`s.
pub struct EventGenerator {
    chunk_duration: f64,
    min_tone_duration: f64,
    dropout_tolerance: f64,
    active_tones: Vec<ActiveTone>,
    /// Closed events awaiting safe chronological release, sorted by start.
    pending_output: Vec<ToneEvent>,
}

impl EventGenerator {
    /// Create a generator for the given chunk geometry and resolution.
    pub fn new(
        sample_rate: u32,
        chunk_size: usize,
        min_tone_duration: f64,
        dropout_tolerance: f64,
    ) -> Self {
        Self {
            chunk_duration: chunk_size as f64 / sample_rate as f64,
            min_tone_duration,
            dropout_tolerance,
            active_tones: Vec::new(),
            pending_output: Vec::new(),
        }
    }

    /// Process the peaks of one chunk and return events that are safe to emit.
    ///
    /// `timestamp` is the end time of the chunk in seconds. Events are only
    /// emitted after the dropout timer has expired, so there is inherent
    /// latency equal to `dropout_tolerance`.
    pub fn process(&mut self, peaks: &[Peak], timestamp: f64) -> Vec<ToneEvent> {
        // 1. Match peaks against active tones (or open new ones)
        let mut matched = vec![false; self.active_tones.len()];

        for peak in peaks {
            let hit = self
                .active_tones
                .iter()
                .position(|tone| (peak.frequency - tone.frequency).abs() < FREQUENCY_TOLERANCE);

            match hit {
                Some(index) => {
                    let tone = &mut self.active_tones[index];
                    tone.max_magnitude = tone.max_magnitude.max(peak.magnitude);
                    tone.last_seen_time = timestamp;
                    tone.samples_count += 1;
                    if index < matched.len() {
                        matched[index] = true;
                    }
                }
                None => {
                    self.active_tones.push(ActiveTone {
                        start_time: timestamp,
                        frequency: peak.frequency,
                        max_magnitude: peak.magnitude,
                        last_seen_time: timestamp,
                        samples_count: 1,
                    });
                    matched.push(true);
                }
            }
        }

        // 2. Sweep: close tones whose dropout timer expired
        let mut survivors = Vec::with_capacity(self.active_tones.len());
        let mut closed = Vec::new();

        for (index, tone) in self.active_tones.drain(..).enumerate() {
            if matched[index] {
                survivors.push(tone);
                continue;
            }

            let gap = timestamp - tone.last_seen_time;
            if gap > self.dropout_tolerance {
                if let Some(event) = close_tone(&tone, self.chunk_duration, self.min_tone_duration)
                {
                    closed.push(event);
                }
            } else {
                // Within dropout tolerance, keep waiting
                survivors.push(tone);
            }
        }
        self.active_tones = survivors;

        // 3. Buffer closed events sorted by start time
        if !closed.is_empty() {
            self.pending_output.extend(closed);
            self.pending_output.sort_by(|a, b| {
                a.timestamp
                    .partial_cmp(&b.timestamp)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        // 4. Safe release: a still-open tone may close into an event with an
        // earlier start than anything buffered, so only release events that
        // start before every active tone
        let ready = self.release_safe_events();

        // 5. Coalesce overlapping events
        coalesce(ready)
    }

    /// Close every active tone and drain all pending output.
    ///
    /// Call at end of stream; tones that never saw their dropout expire are
    /// treated as closed.
    pub fn flush(&mut self) -> Vec<ToneEvent> {
        for tone in self.active_tones.drain(..) {
            if let Some(event) = close_tone(&tone, self.chunk_duration, self.min_tone_duration) {
                self.pending_output.push(event);
            }
        }
        self.pending_output.sort_by(|a, b| {
            a.timestamp
                .partial_cmp(&b.timestamp)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        coalesce(std::mem::take(&mut self.pending_output))
    }

    /// Drop all tracked state.
    pub fn reset(&mut self) {
        self.active_tones.clear();
        self.pending_output.clear();
    }

    /// Number of tones currently being tracked.
    pub fn active_tone_count(&self) -> usize {
        self.active_tones.len()
    }

    fn release_safe_events(&mut self) -> Vec<ToneEvent> {
        if self.active_tones.is_empty() {
            return std::mem::take(&mut self.pending_output);
        }

        let min_active_start = self
            .active_tones
            .iter()
            .map(|tone| tone.start_time)
            .fold(f64::INFINITY, f64::min);

        let split = self
            .pending_output
            .iter()
            .take_while(|event| event.timestamp < min_active_start)
            .count();

        self.pending_output.drain(..split).collect()
    }
}

/// Turn an expired active tone into an event, or None when debounced.
fn close_tone(tone: &ActiveTone, chunk_duration: f64, min_tone_duration: f64) -> Option<ToneEvent> {
    let duration = tone.samples_count as f64 * chunk_duration;
    if duration < min_tone_duration {
        log::debug!(
            "Debounced {:.0} Hz transient ({:.3}s < {:.3}s)",
            tone.frequency,
            duration,
            min_tone_duration
        );
        return None;
    }

    let event = ToneEvent {
        timestamp: tone.start_time,
        duration,
        frequency: tone.frequency,
        magnitude: tone.max_magnitude,
        confidence: 1.0,
    };
    log::debug!(
        "Generated tone: {:.0} Hz, {:.2}s at t={:.2}s",
        event.frequency,
        event.duration,
        event.timestamp
    );
    Some(event)
}

/// Merge adjacent events that overlap by more than 50% of the shorter one,
/// keeping the longer event.
fn coalesce(events: Vec<ToneEvent>) -> Vec<ToneEvent> {
    if events.len() < 2 {
        return events;
    }

    let mut result = Vec::with_capacity(events.len());
    let mut iter = events.into_iter();
    let mut current = iter.next().expect("length checked above");

    for next in iter {
        let overlap = (current.end_time().min(next.end_time()) - next.timestamp).max(0.0);
        let min_duration = current.duration.min(next.duration);

        if overlap > 0.5 * min_duration {
            if next.duration > current.duration {
                current = next;
            }
        } else {
            result.push(current);
            current = next;
        }
    }

    result.push(current);
    result
}
