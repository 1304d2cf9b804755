//! Deterministic PCM builders for tests, benchmarks, and the CLI.
//!
//! The detection pipeline is exercised end-to-end against synthetic audio:
//! pure tones with short attack/release envelopes (avoiding click
//! transients that would smear the spectrum), silence, and seeded white
//! noise. Everything here is reproducible - noise takes an explicit seed.

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Attack/release envelope length in seconds.
const ENVELOPE_SECONDS: f64 = 0.01;

/// Pure sine tone with a 10 ms attack/release envelope, unit amplitude.
pub fn sine(frequency: f64, duration: f64, sample_rate: u32) -> Vec<f32> {
    let total = (duration * sample_rate as f64) as usize;
    let attack = ((ENVELOPE_SECONDS * sample_rate as f64) as usize).min(total / 2);

    (0..total)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let mut sample = (2.0 * std::f64::consts::PI * frequency * t).sin();
            if attack > 0 {
                if i < attack {
                    sample *= i as f64 / attack as f64;
                } else if i >= total - attack {
                    sample *= (total - i) as f64 / attack as f64;
                }
            }
            sample as f32
        })
        .collect()
}

/// Digital silence.
pub fn silence(duration: f64, sample_rate: u32) -> Vec<f32> {
    vec![0.0; (duration * sample_rate as f64) as usize]
}

/// Silence of an exact sample count, for chunk-aligned fixtures.
pub fn silence_samples(samples: usize) -> Vec<f32> {
    vec![0.0; samples]
}

/// Sine tone of an exact sample count (no envelope), for chunk-aligned
/// fixtures.
pub fn sine_samples(frequency: f64, samples: usize, sample_rate: u32) -> Vec<f32> {
    (0..samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Uniform white noise in [-1, 1], deterministic per seed.
pub fn white_noise(duration: f64, sample_rate: u32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..(duration * sample_rate as f64) as usize)
        .map(|_| rng.gen_range(-1.0..1.0))
        .collect()
}

/// Mix noise into a signal at the given relative level.
pub fn mix_noise(signal: &[f32], level: f32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    signal
        .iter()
        .map(|&s| s + rng.gen_range(-1.0f32..1.0) * level)
        .collect()
}

/// Scale a float signal by `amplitude` and quantize to int16.
pub fn to_i16(signal: &[f32], amplitude: f32) -> Vec<i16> {
    signal
        .iter()
        .map(|&s| {
            let value = (s * amplitude * 32767.0).clamp(-32768.0, 32767.0);
            value as i16
        })
        .collect()
}

/// Scale, quantize, and split into fixed-size chunks; the trailing partial
/// chunk is dropped, matching real capture behavior.
pub fn to_i16_chunks(signal: &[f32], amplitude: f32, chunk_size: usize) -> Vec<Vec<i16>> {
    to_i16(signal, amplitude)
        .chunks_exact(chunk_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}
