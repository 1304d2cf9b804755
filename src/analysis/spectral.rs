// SpectralMonitor - windowed FFT peak extraction
//
// Turns fixed-size int16 chunks into a short ranked list of spectral peaks.
// Alarm tones are narrow, so candidate bins must be sharp local maxima above
// an adaptive noise floor; parabolic interpolation then refines the peak
// frequency well below bin width (a 1024-point bin at 44.1 kHz is ~43 Hz
// wide while alarm profiles are specified to +/-50 Hz).

use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::{Arc, Mutex};

/// Maximum number of peaks reported per chunk.
const MAX_PEAKS: usize = 5;

/// Peak must exceed the average of its +/-2 bin neighbors by this factor.
const MIN_SHARPNESS: f32 = 1.5;

/// Adaptive threshold is this multiple of the spectrum median.
const NOISE_FLOOR_FACTOR: f32 = 3.0;

/// Default absolute magnitude floor.
pub const DEFAULT_MIN_MAGNITUDE: f32 = 0.05;

/// A spectral peak detected in FFT analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Interpolated frequency in Hz.
    pub frequency: f64,
    /// Magnitude of the center bin.
    pub magnitude: f32,
    /// Index of the center bin in the magnitude spectrum.
    pub bin_index: usize,
}

/// Monitors audio chunks for spectral peaks.
pub struct SpectralMonitor {
    fft_planner: Arc<Mutex<FftPlanner<f32>>>,
    sample_rate: u32,
    chunk_size: usize,
    min_magnitude: f32,
    /// Hann window of length `chunk_size` (pre-computed).
    window: Vec<f32>,
}

impl SpectralMonitor {
    /// Create a monitor for the given chunk geometry.
    pub fn new(sample_rate: u32, chunk_size: usize) -> Self {
        Self::with_min_magnitude(sample_rate, chunk_size, DEFAULT_MIN_MAGNITUDE)
    }

    /// Create a monitor with an explicit absolute magnitude floor.
    pub fn with_min_magnitude(sample_rate: u32, chunk_size: usize, min_magnitude: f32) -> Self {
        // Pre-compute Hann window to reduce spectral leakage
        let window = (0..chunk_size)
            .map(|i| {
                0.5 * (1.0
                    - ((2.0 * std::f32::consts::PI * i as f32) / (chunk_size as f32 - 1.0)).cos())
            })
            .collect();

        Self {
            fft_planner: Arc::new(Mutex::new(FftPlanner::new())),
            sample_rate,
            chunk_size,
            min_magnitude,
            window,
        }
    }

    /// Process one audio chunk and return significant peaks, strongest first.
    ///
    /// Chunks of the wrong length yield an empty list; the caller advances
    /// time as if the chunk were silence.
    pub fn process(&self, chunk: &[i16]) -> Vec<Peak> {
        if chunk.len() != self.chunk_size {
            log::debug!(
                "Dropping chunk of {} samples (expected {})",
                chunk.len(),
                self.chunk_size
            );
            return Vec::new();
        }

        let spectrum = self.magnitude_spectrum(chunk);

        let max_magnitude = spectrum.iter().copied().fold(0.0f32, f32::max);
        if max_magnitude <= 0.0 {
            return Vec::new();
        }

        // Adaptive floor: the median resists a few strong tones dominating
        let noise_floor = median(&spectrum);
        let threshold = self.min_magnitude.max(NOISE_FLOOR_FACTOR * noise_floor);
        if max_magnitude < threshold {
            return Vec::new();
        }

        let mut peaks = Vec::new();

        // Skip DC and Nyquist edge bins; each candidate needs +/-2 neighbors
        for i in 2..spectrum.len().saturating_sub(2) {
            let magnitude = spectrum[i];
            if magnitude < threshold {
                continue;
            }

            // Local maximum
            if magnitude <= spectrum[i - 1] || magnitude <= spectrum[i + 1] {
                continue;
            }

            // Sharpness: narrow tones stand clear of their neighborhood,
            // broadband bursts do not
            let neighbors_avg = ((spectrum[i - 2] + spectrum[i - 1] + spectrum[i + 1]
                + spectrum[i + 2])
                / 4.0)
                .max(1e-6);
            if magnitude / neighbors_avg <= MIN_SHARPNESS {
                continue;
            }

            let frequency = self.interpolate_frequency(&spectrum, i);
            peaks.push(Peak {
                frequency,
                magnitude,
                bin_index: i,
            });
        }

        // Sort by magnitude descending, keep the strongest few
        peaks.sort_by(|a, b| {
            b.magnitude
                .partial_cmp(&a.magnitude)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        peaks.truncate(MAX_PEAKS);
        peaks
    }

    /// Normalize, window, FFT, and return the positive-frequency magnitudes.
    fn magnitude_spectrum(&self, chunk: &[i16]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = chunk
            .iter()
            .zip(self.window.iter())
            .map(|(&sample, &w)| Complex::new((sample as f32 / 32768.0) * w, 0.0))
            .collect();

        let mut planner = self.fft_planner.lock().unwrap();
        let fft = planner.plan_fft_forward(self.chunk_size);
        fft.process(&mut buffer);

        buffer[..self.chunk_size / 2 + 1]
            .iter()
            .map(|c| c.norm())
            .collect()
    }

    /// Parabolic interpolation over the peak bin and its neighbors.
    ///
    /// Fits a parabola through (i-1, i, i+1) magnitudes; the vertex offset
    /// gives the sub-bin position of the true peak.
    fn interpolate_frequency(&self, spectrum: &[f32], i: usize) -> f64 {
        let alpha = spectrum[i - 1];
        let beta = spectrum[i];
        let gamma = spectrum[i + 1];

        let denominator = alpha - 2.0 * beta + gamma;
        let delta = if denominator.abs() > f32::EPSILON {
            (alpha - gamma) / (2.0 * denominator)
        } else {
            0.0
        };

        let true_bin = i as f64 + delta as f64;
        true_bin * self.sample_rate as f64 / self.chunk_size as f64
    }
}

/// Median of a magnitude spectrum.
fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted: Vec<f32> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
