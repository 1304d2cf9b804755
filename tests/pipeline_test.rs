//! End-to-end pipeline tests against synthesized PCM audio.
//!
//! Covers the detection scenarios that matter in the field: a clean T3
//! smoke-alarm pattern, wrong frequency, wrong timing, pure noise, leading
//! noise before the pattern, and a fast four-beep pattern that needs
//! per-profile resolution overrides.

use tonewatch::analysis::{EventGenerator, FrequencyFilter, SpectralMonitor};
use tonewatch::engine::Engine;
use tonewatch::events::{PatternMatchEvent, ToneEvent};
use tonewatch::matcher::WindowedMatcher;
use tonewatch::profile::{AlarmProfile, Range, ResolutionConfig, Segment};
use tonewatch::{testing, EngineConfig};

const SAMPLE_RATE: u32 = 44_100;
const CHUNK_SIZE: usize = 1024;
const AMPLITUDE: f32 = 0.5;

fn tone_segment(duration: Range) -> Segment {
    Segment::Tone {
        frequency: Range::new(2900.0, 3100.0),
        duration,
        min_magnitude: 0.05,
    }
}

/// T3 smoke alarm: three 0.5 s beeps 0.5 s apart, then a ~2 s rest.
fn t3_profile() -> AlarmProfile {
    let beep = tone_segment(Range::new(0.4, 0.6));
    let gap = Segment::Silence {
        duration: Range::new(0.3, 0.7),
    };
    let rest = Segment::Silence {
        duration: Range::new(1.5, 2.5),
    };
    AlarmProfile {
        name: "smoke_t3".to_string(),
        segments: vec![beep.clone(), gap.clone(), beep.clone(), gap, beep, rest],
        confirmation_cycles: 2,
        reset_timeout: 10.0,
        resolution: None,
        window_duration: None,
        eval_frequency: None,
    }
}

/// Fast T4: four short beeps with short gaps, then a 2 s rest.
fn fast_t4_profile() -> AlarmProfile {
    let beep = tone_segment(Range::new(0.03, 0.08));
    let gap = Segment::Silence {
        duration: Range::new(0.03, 0.08),
    };
    let rest = Segment::Silence {
        duration: Range::new(1.5, 2.5),
    };
    AlarmProfile {
        name: "fast_t4".to_string(),
        segments: vec![
            beep.clone(),
            gap.clone(),
            beep.clone(),
            gap.clone(),
            beep.clone(),
            gap,
            beep,
            rest,
        ],
        confirmation_cycles: 2,
        reset_timeout: 10.0,
        resolution: Some(ResolutionConfig {
            min_tone_duration: 0.03,
            dropout_tolerance: 0.03,
        }),
        window_duration: None,
        eval_frequency: None,
    }
}

/// T3-timed audio: `cycles` groups of three beeps (grid 0.5 s on, 0.5 s
/// off) with a 1.5 s rest after each group.
fn t3_audio(frequency: f64, tone_duration: f64, cycles: u32) -> Vec<f32> {
    let mut signal = Vec::new();
    for _ in 0..cycles {
        for beep in 0..3 {
            signal.extend(testing::sine(frequency, tone_duration, SAMPLE_RATE));
            // Keep the 1.0 s beep period regardless of tone length
            signal.extend(testing::silence(1.0 - tone_duration, SAMPLE_RATE));
            if beep == 2 {
                signal.extend(testing::silence(1.0, SAMPLE_RATE));
            }
        }
    }
    signal
}

/// Run audio through a fresh engine and collect every broadcast match.
fn run_detection(signal: &[f32], profiles: Vec<AlarmProfile>) -> Vec<PatternMatchEvent> {
    let config = EngineConfig {
        sample_rate: SAMPLE_RATE,
        chunk_size: CHUNK_SIZE,
        min_tone_duration: tonewatch::config::compute_finest_resolution(&profiles).0,
        dropout_tolerance: tonewatch::config::compute_finest_resolution(&profiles).1,
    };
    let mut engine = Engine::new(profiles, config).expect("profiles must validate");
    let mut rx = engine.subscribe();

    for chunk in testing::to_i16_chunks(signal, AMPLITUDE, CHUNK_SIZE) {
        engine.process_chunk(&chunk);
    }
    engine.flush();

    let mut matches = Vec::new();
    while let Ok(event) = rx.try_recv() {
        matches.push(event);
    }
    matches
}

#[test]
fn e1_clean_t3_pattern_is_detected() {
    let signal = t3_audio(3000.0, 0.5, 3);
    let matches = run_detection(&signal, vec![t3_profile()]);

    assert!(
        !matches.is_empty(),
        "expected at least one T3 match in clean audio"
    );
    assert!(matches.iter().all(|m| m.profile_name == "smoke_t3"));
    assert!(matches.iter().all(|m| m.cycle_count >= 2));
}

#[test]
fn e2_wrong_frequency_does_not_match() {
    let signal = t3_audio(1500.0, 0.5, 3);
    let matches = run_detection(&signal, vec![t3_profile()]);
    assert!(
        matches.is_empty(),
        "1.5 kHz tones must not match a 3 kHz profile: {:?}",
        matches
    );
}

#[test]
fn e3_too_short_tones_do_not_match() {
    // Same beep grid, but tones far below the profile's duration range
    let signal = t3_audio(3000.0, 0.15, 3);
    let matches = run_detection(&signal, vec![t3_profile()]);
    assert!(
        matches.is_empty(),
        "0.15s tones must not satisfy a 0.4-0.6s profile: {:?}",
        matches
    );
}

#[test]
fn e4_white_noise_does_not_match() {
    let noise = testing::white_noise(5.0, SAMPLE_RATE, 42);
    let matches = run_detection(&noise, vec![t3_profile()]);
    assert!(matches.is_empty(), "white noise matched: {:?}", matches);
}

#[test]
fn e5_leading_noise_does_not_mask_pattern() {
    let mut signal = Vec::new();
    signal.extend(testing::silence(0.3, SAMPLE_RATE));
    // A long in-band tone and a stray short beep before the real pattern
    signal.extend(testing::sine(3050.0, 1.0, SAMPLE_RATE));
    signal.extend(testing::silence(0.4, SAMPLE_RATE));
    signal.extend(testing::sine(3080.0, 0.2, SAMPLE_RATE));
    signal.extend(testing::silence(0.4, SAMPLE_RATE));
    signal.extend(t3_audio(3000.0, 0.5, 3));

    let matches = run_detection(&signal, vec![t3_profile()]);
    assert!(
        !matches.is_empty(),
        "leading noise must not prevent detection"
    );
}

#[test]
fn e6_fast_t4_with_high_resolution_overrides() {
    // Chunk-aligned fixture: 2048-sample beeps and gaps (46.4 ms each),
    // rest padded to a whole number of chunks
    let beep_samples = 2 * CHUNK_SIZE;
    let rest_samples = 86 * CHUNK_SIZE;

    let mut signal = Vec::new();
    for _ in 0..3 {
        for beep in 0..4 {
            signal.extend(testing::sine_samples(3000.0, beep_samples, SAMPLE_RATE));
            if beep < 3 {
                signal.extend(testing::silence_samples(beep_samples));
            }
        }
        signal.extend(testing::silence_samples(rest_samples));
    }

    let profiles = vec![fast_t4_profile()];
    let config = EngineConfig::from_profiles(&profiles, SAMPLE_RATE, CHUNK_SIZE);
    assert_eq!(config.min_tone_duration, 0.03, "profile override applies");
    assert_eq!(config.dropout_tolerance, 0.03);

    let matches = run_detection(&signal, profiles);
    assert!(
        !matches.is_empty(),
        "fast T4 pattern should match with high-resolution overrides"
    );
    assert!(matches.iter().all(|m| m.profile_name == "fast_t4"));
}

/// Manual pipeline run mirroring the engine wiring, to observe the
/// intermediate tone events.
fn run_manual_pipeline(
    signal: &[f32],
    profiles: Vec<AlarmProfile>,
) -> (Vec<ToneEvent>, Vec<PatternMatchEvent>) {
    let dsp = SpectralMonitor::new(SAMPLE_RATE, CHUNK_SIZE);
    let freq_filter = FrequencyFilter::new(&profiles);
    let mut generator = EventGenerator::new(SAMPLE_RATE, CHUNK_SIZE, 0.1, 0.15);
    let mut matcher = WindowedMatcher::new(profiles);

    let chunk_duration = CHUNK_SIZE as f64 / SAMPLE_RATE as f64;
    let mut all_events = Vec::new();
    let mut all_matches = Vec::new();

    for (i, chunk) in testing::to_i16_chunks(signal, AMPLITUDE, CHUNK_SIZE)
        .iter()
        .enumerate()
    {
        let timestamp = (i + 1) as f64 * chunk_duration;
        let peaks = freq_filter.filter_peaks(dsp.process(chunk));
        let events = generator.process(&peaks, timestamp);
        for event in &events {
            matcher.add_event(*event);
        }
        all_events.extend(events);
        all_matches.extend(matcher.evaluate(timestamp));
    }

    (all_events, all_matches)
}

#[test]
fn tone_events_are_chronological_and_debounced() {
    let signal = t3_audio(3000.0, 0.5, 3);
    let (events, matches) = run_manual_pipeline(&signal, vec![t3_profile()]);

    assert!(
        events.len() >= 6,
        "expected the beeps to surface as events, got {}",
        events.len()
    );
    for pair in events.windows(2) {
        assert!(
            pair[0].timestamp <= pair[1].timestamp,
            "events out of order: {:?}",
            pair
        );
    }
    for event in &events {
        assert!(
            event.duration >= 0.1,
            "sub-minimum event leaked: {:?}",
            event
        );
        assert!(
            (event.frequency - 3000.0).abs() < 50.0,
            "unexpected frequency: {:?}",
            event
        );
    }
    assert!(!matches.is_empty());
}

#[test]
fn two_profiles_detected_independently() {
    // T3 audio followed by fast T4 audio; each profile fires on its own
    let mut signal = t3_audio(3000.0, 0.5, 3);
    let t3_only = run_detection(&signal, vec![t3_profile(), fast_t4_profile()]);
    assert!(t3_only.iter().any(|m| m.profile_name == "smoke_t3"));
    assert!(
        !t3_only.iter().any(|m| m.profile_name == "fast_t4"),
        "T3 audio must not look like fast T4: {:?}",
        t3_only
    );

    // Appending unrelated low-frequency tones must change nothing
    signal.extend(testing::sine(500.0, 1.0, SAMPLE_RATE));
    let with_tail = run_detection(&signal, vec![t3_profile(), fast_t4_profile()]);
    assert!(with_tail.iter().any(|m| m.profile_name == "smoke_t3"));
}
