// AudioListener - microphone capture feeding the engine
//
// The cpal callback thread never touches the engine: samples cross to a
// processing thread over a lock-free SPSC ring, where they are assembled
// into fixed-size chunks and pushed through the pipeline. Overruns drop
// samples rather than block the audio thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, PopError, RingBuffer};

use crate::engine::Engine;
use crate::error::AudioError;

/// Ring capacity in seconds of audio.
const RING_SECONDS: u32 = 2;

/// Captures microphone input and drives an engine on a worker thread.
///
/// The engine is handed back by `stop()`, so its state (and stats) can be
/// inspected after capture ends.
pub struct AudioListener {
    stream: cpal::Stream,
    shutdown: Arc<AtomicBool>,
    dropped_samples: Arc<AtomicU64>,
    worker: Option<JoinHandle<Engine>>,
}

impl AudioListener {
    /// Open the default input device and start capturing into `engine`.
    pub fn start(engine: Engine) -> Result<Self, AudioError> {
        let sample_rate = engine.config().sample_rate;
        let chunk_size = engine.config().chunk_size;

        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(AudioError::NoInputDevice)?;

        let default_config = device
            .default_input_config()
            .map_err(|e| AudioError::StreamConfig {
                reason: format!("{:?}", e),
            })?;
        let channels = default_config.channels() as usize;

        let stream_config = cpal::StreamConfig {
            channels: default_config.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (mut producer, consumer) =
            RingBuffer::<i16>::new((sample_rate * RING_SECONDS) as usize);
        let dropped_samples = Arc::new(AtomicU64::new(0));
        let dropped_in_callback = Arc::clone(&dropped_samples);

        let err_fn = |err| log::error!("Input stream error: {}", err);

        // Mono downmix: take the first channel of each frame
        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        for frame in data.chunks(channels) {
                            let sample = (frame[0].clamp(-1.0, 1.0) * 32767.0) as i16;
                            if producer.push(sample).is_err() {
                                dropped_in_callback.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| AudioError::StreamOpenFailed {
                    reason: format!("{:?}", e),
                })?,
            cpal::SampleFormat::I16 => device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        for frame in data.chunks(channels) {
                            if producer.push(frame[0]).is_err() {
                                dropped_in_callback.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| AudioError::StreamOpenFailed {
                    reason: format!("{:?}", e),
                })?,
            other => {
                return Err(AudioError::UnsupportedFormat {
                    format: format!("{:?}", other),
                })
            }
        };

        stream.play().map_err(|e| AudioError::StreamStartFailed {
            reason: format!("{:?}", e),
        })?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = spawn_processing_thread(engine, consumer, chunk_size, Arc::clone(&shutdown));

        log::info!(
            "Listener started: capturing at {} Hz, chunk size {}",
            sample_rate,
            chunk_size
        );

        Ok(Self {
            stream,
            shutdown,
            dropped_samples,
            worker: Some(worker),
        })
    }

    /// Samples dropped because the ring was full.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples.load(Ordering::Relaxed)
    }

    /// Stop capture, tear down the stream, and hand the engine back.
    ///
    /// In-flight samples that never filled a chunk are discarded.
    pub fn stop(mut self) -> Engine {
        log::info!("Listener stopping");
        self.shutdown.store(true, Ordering::SeqCst);
        drop(self.stream);

        let worker = self.worker.take().expect("worker present until stop");
        match worker.join() {
            Ok(engine) => engine,
            Err(panic) => {
                log::error!("Processing thread panicked during capture");
                std::panic::resume_unwind(panic);
            }
        }
    }
}

/// Consume ring samples, assemble chunks, drive the engine.
fn spawn_processing_thread(
    mut engine: Engine,
    mut consumer: Consumer<i16>,
    chunk_size: usize,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<Engine> {
    thread::spawn(move || {
        let mut chunk: Vec<i16> = Vec::with_capacity(chunk_size);

        loop {
            match consumer.pop() {
                Ok(sample) => {
                    chunk.push(sample);
                    if chunk.len() == chunk_size {
                        engine.process_chunk(&chunk);
                        chunk.clear();
                    }
                }
                Err(PopError::Empty) => {
                    if shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    thread::sleep(std::time::Duration::from_millis(1));
                }
            }
        }

        engine
    })
}
