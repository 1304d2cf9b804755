// tonewatch CLI - profile validation, WAV analysis, live monitoring
//
// Offline workflow: `validate` a profile file, `synth` a test WAV from a
// beep pattern, `analyze` it, then point `listen` at a microphone.

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tonewatch::audio::{AudioListener, WavChunkSource};
use tonewatch::engine::{DetectionSink, Engine};
use tonewatch::events::PatternMatchEvent;
use tonewatch::profile::load_profiles_from_yaml;
use tonewatch::{telemetry, testing, EngineConfig};

#[derive(Parser, Debug)]
#[command(name = "tonewatch", about = "Acoustic alarm pattern detector")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a profile file and report what it contains
    Validate {
        /// Profile YAML file
        profiles: PathBuf,
    },
    /// Run detection over a WAV file and print matches
    Analyze {
        /// Profile YAML file
        profiles: PathBuf,
        /// WAV file to analyze
        wav: PathBuf,
        /// Print matches as JSON lines instead of text
        #[arg(long)]
        json: bool,
        /// Override the FFT chunk size
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Monitor the default microphone until Enter is pressed
    Listen {
        /// Profile YAML file
        profiles: PathBuf,
        /// Capture sample rate in Hz
        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,
    },
    /// Write a synthetic beep-pattern WAV for pipeline testing
    Synth {
        /// Output WAV path
        output: PathBuf,
        /// Beep frequency in Hz
        #[arg(long, default_value_t = 3000.0)]
        frequency: f64,
        /// Beeps per group
        #[arg(long, default_value_t = 3)]
        beeps: u32,
        /// Beep duration in seconds
        #[arg(long, default_value_t = 0.5)]
        beep_duration: f64,
        /// Gap between beeps in seconds
        #[arg(long, default_value_t = 0.5)]
        gap_duration: f64,
        /// Rest after each group in seconds
        #[arg(long, default_value_t = 1.5)]
        rest_duration: f64,
        /// Number of groups
        #[arg(long, default_value_t = 3)]
        groups: u32,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { profiles } => run_validate(&profiles),
        Commands::Analyze {
            profiles,
            wav,
            json,
            chunk_size,
        } => run_analyze(&profiles, &wav, json, chunk_size),
        Commands::Listen {
            profiles,
            sample_rate,
        } => run_listen(&profiles, sample_rate),
        Commands::Synth {
            output,
            frequency,
            beeps,
            beep_duration,
            gap_duration,
            rest_duration,
            groups,
        } => run_synth(
            &output,
            frequency,
            beeps,
            beep_duration,
            gap_duration,
            rest_duration,
            groups,
        ),
    }
}

fn run_validate(path: &PathBuf) -> Result<ExitCode> {
    let profiles = load_profiles_from_yaml(path)
        .with_context(|| format!("loading profiles from {}", path.display()))?;

    for profile in &profiles {
        println!(
            "{}: {} segment(s), {} confirmation cycle(s), reset {:.0}s",
            profile.name,
            profile.segments.len(),
            profile.confirmation_cycles,
            profile.reset_timeout
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// Sink that prints each detection as it fires.
struct PrintSink {
    json: bool,
}

impl DetectionSink for PrintSink {
    fn on_detection(&mut self, profile_name: &str) {
        if !self.json {
            println!("ALARM: {}", profile_name);
        }
    }

    fn on_match(&mut self, event: &PatternMatchEvent) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(err) => eprintln!("failed to serialize match: {}", err),
            }
        } else {
            println!(
                "  matched {} at t={:.2}s ({} cycles, ~{:.1}s)",
                event.profile_name, event.timestamp, event.cycle_count, event.duration
            );
        }
    }
}

fn run_analyze(
    profiles_path: &PathBuf,
    wav_path: &PathBuf,
    json: bool,
    chunk_size: Option<usize>,
) -> Result<ExitCode> {
    let profiles = load_profiles_from_yaml(profiles_path)
        .with_context(|| format!("loading profiles from {}", profiles_path.display()))?;

    let source = WavChunkSource::load(wav_path)
        .with_context(|| format!("reading {}", wav_path.display()))?;

    let config = EngineConfig::from_profiles(
        &profiles,
        source.sample_rate(),
        chunk_size.unwrap_or(tonewatch::config::DEFAULT_CHUNK_SIZE),
    );

    let mut engine = Engine::new(profiles, config)
        .context("building engine")?
        .with_sink(Box::new(PrintSink { json }));

    let mut detected = false;
    for chunk in source.chunks(config.chunk_size) {
        detected |= engine.process_chunk(chunk);
    }
    detected |= engine.flush();

    let stats = telemetry::hub().snapshot();
    eprintln!(
        "Processed {:.1}s: {} chunk(s), {} event(s), {} match(es)",
        source.duration(),
        stats.chunks_processed,
        stats.events_generated,
        stats.matches_fired
    );

    // Exit code 0 when a pattern was found, 2 otherwise (scriptable)
    Ok(if detected {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn run_listen(profiles_path: &PathBuf, sample_rate: u32) -> Result<ExitCode> {
    let profiles = load_profiles_from_yaml(profiles_path)
        .with_context(|| format!("loading profiles from {}", profiles_path.display()))?;

    let config =
        EngineConfig::from_profiles(&profiles, sample_rate, tonewatch::config::DEFAULT_CHUNK_SIZE);
    let engine = Engine::new(profiles, config)
        .context("building engine")?
        .with_sink(Box::new(PrintSink { json: false }));

    let listener = AudioListener::start(engine).context("starting capture")?;
    println!("Listening... press Enter to stop.");

    let stdin = std::io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line).ok();

    let engine = listener.stop();
    println!(
        "Stopped after {:.1}s of audio.",
        engine.current_time()
    );

    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::too_many_arguments)]
fn run_synth(
    output: &PathBuf,
    frequency: f64,
    beeps: u32,
    beep_duration: f64,
    gap_duration: f64,
    rest_duration: f64,
    groups: u32,
) -> Result<ExitCode> {
    const SAMPLE_RATE: u32 = 44_100;

    let mut signal: Vec<f32> = Vec::new();
    for _ in 0..groups {
        for beep in 0..beeps {
            signal.extend(testing::sine(frequency, beep_duration, SAMPLE_RATE));
            if beep < beeps - 1 {
                signal.extend(testing::silence(gap_duration, SAMPLE_RATE));
            }
        }
        signal.extend(testing::silence(rest_duration, SAMPLE_RATE));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(output, spec)
        .with_context(|| format!("creating {}", output.display()))?;
    for sample in testing::to_i16(&signal, 0.5) {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    println!(
        "Wrote {} ({:.1}s at {} Hz)",
        output.display(),
        signal.len() as f64 / SAMPLE_RATE as f64,
        SAMPLE_RATE
    );

    Ok(ExitCode::SUCCESS)
}
