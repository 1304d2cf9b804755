// EventBuffer - bounded time-ordered store of recent tone events

use std::collections::VecDeque;

use crate::events::ToneEvent;

/// Default retention window in seconds.
pub const DEFAULT_RETENTION: f64 = 60.0;

/// Append-only, time-ordered ring of recent `ToneEvent`s.
///
/// Events arrive in chronological order from the generator; anything older
/// than the retention window relative to the newest event is pruned on
/// insert, so memory stays bounded without a background task.
#[derive(Debug)]
pub struct EventBuffer {
    events: VecDeque<ToneEvent>,
    retention: f64,
}

impl EventBuffer {
    /// Buffer with the default 60 s retention.
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Buffer with an explicit retention window in seconds.
    pub fn with_retention(retention: f64) -> Self {
        Self {
            events: VecDeque::new(),
            retention,
        }
    }

    /// Insert an event and prune anything past the retention window.
    pub fn add(&mut self, event: ToneEvent) {
        let cutoff = event.timestamp - self.retention;
        self.events.push_back(event);
        while let Some(front) = self.events.front() {
            if front.timestamp < cutoff {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    /// Events with `timestamp` in `(end_time - duration, end_time]`, oldest
    /// first.
    pub fn get_window(&self, end_time: f64, duration: f64) -> Vec<ToneEvent> {
        let start = end_time - duration;
        self.events
            .iter()
            .filter(|event| event.timestamp > start && event.timestamp <= end_time)
            .copied()
            .collect()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when no events are buffered.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(timestamp: f64) -> ToneEvent {
        ToneEvent {
            timestamp,
            duration: 0.5,
            frequency: 3000.0,
            magnitude: 1.0,
            confidence: 1.0,
        }
    }

    #[test]
    fn test_window_bounds_are_half_open() {
        let mut buffer = EventBuffer::new();
        for t in [1.0, 2.0, 3.0, 4.0] {
            buffer.add(event(t));
        }

        // (1.0, 3.0]: excludes 1.0, includes 3.0
        let window = buffer.get_window(3.0, 2.0);
        let timestamps: Vec<f64> = window.iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![2.0, 3.0]);
    }

    #[test]
    fn test_window_preserves_order() {
        let mut buffer = EventBuffer::new();
        for t in [0.5, 1.5, 2.5] {
            buffer.add(event(t));
        }
        let window = buffer.get_window(10.0, 10.0);
        assert_eq!(window.len(), 3);
        assert!(window.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_old_events_pruned_on_add() {
        let mut buffer = EventBuffer::with_retention(10.0);
        buffer.add(event(1.0));
        buffer.add(event(2.0));
        assert_eq!(buffer.len(), 2);

        // 1.0 and 2.0 are both older than 15.0 - 10.0
        buffer.add(event(15.0));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.get_window(15.0, 10.0).len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut buffer = EventBuffer::new();
        buffer.add(event(1.0));
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
