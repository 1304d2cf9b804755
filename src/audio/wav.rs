// WAV chunk source - offline analysis input
//
// Decodes a WAV file into the mono int16 sample stream the engine expects.
// Multi-channel files are downmixed by taking the first channel; float
// files are rescaled to the int16 range.

use std::path::Path;

use crate::error::AudioError;

/// Decoded WAV audio ready to be chunked into the engine.
pub struct WavChunkSource {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl WavChunkSource {
    /// Load and decode a WAV file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AudioError> {
        let mut reader = hound::WavReader::open(&path)?;
        let spec = reader.spec();

        let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 16) => reader
                .samples::<i16>()
                .collect::<Result<Vec<_>, _>>()?,
            (hound::SampleFormat::Int, bits) if bits < 16 => {
                let shift = 16 - bits;
                reader
                    .samples::<i16>()
                    .map(|s| s.map(|v| v << shift))
                    .collect::<Result<Vec<_>, _>>()?
            }
            (hound::SampleFormat::Int, bits) => {
                let shift = bits as u32 - 16;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| (v >> shift) as i16))
                    .collect::<Result<Vec<_>, _>>()?
            }
            (hound::SampleFormat::Float, _) => reader
                .samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * 32767.0) as i16))
                .collect::<Result<Vec<_>, _>>()?,
        };

        // Downmix: keep the first channel
        let channels = spec.channels.max(1) as usize;
        let samples = if channels > 1 {
            samples.into_iter().step_by(channels).collect()
        } else {
            samples
        };

        log::info!(
            "Loaded {:?}: {} samples at {} Hz ({} channel(s) in source)",
            path.as_ref(),
            samples.len(),
            spec.sample_rate,
            spec.channels
        );

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    /// Source sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Total decoded duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Fixed-size chunks; the trailing partial chunk is dropped.
    pub fn chunks(&self, chunk_size: usize) -> impl Iterator<Item = &[i16]> {
        self.samples.chunks_exact(chunk_size)
    }
}
