//! Retro Player - engine driver
//!
//! Runs a synthetic emulation core through the retro-audio engine, either
//! live on the default output device or headless into a WAV file.
//!
//! # Usage
//!
//! ```bash
//! retro-player                                  # 5s of 440 Hz at 32040.5 Hz / 60.0988 fps
//! retro-player --core-rate 44100 --fps 60 --seconds 2
//! retro-player --resampler linear --gain 0.5
//! retro-player --wav out.wav --device-rate 48000 --device-format f32
//! RUST_LOG=retro_audio=debug retro-player       # per-second stream statistics
//! ```

mod session;
mod synth;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use retro_audio::config;
use retro_audio::{
    AudioConfig, AudioEngine, QueueBackend, ResampleMode, SampleFormat, StreamStats, nominal_rate,
};

use session::Delivery;
use synth::ToneCore;

#[derive(Parser)]
#[command(name = "retro-player")]
#[command(author, version, about = "Drive the retro-audio engine from a synthetic core")]
struct Args {
    /// Sample rate the core reports (may be fractional)
    #[arg(long, default_value = "32040.5")]
    core_rate: f64,

    /// Emulated frames per second
    #[arg(long, default_value = "60.0988")]
    fps: f64,

    /// Tone frequency in Hz
    #[arg(long, default_value = "440")]
    tone: f64,

    /// Length of the session in seconds
    #[arg(long, short = 's', default_value = "5")]
    seconds: f64,

    /// Config file (default: audio.toml in the platform config directory)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Write the effective configuration back to the platform config directory
    #[arg(long)]
    save_config: bool,

    // === Config overrides ===
    /// Device sample rate to request first
    #[arg(long)]
    rate: Option<u32>,

    /// Output gain (0 = mute, 1 = unity)
    #[arg(long, short = 'g')]
    gain: Option<f32>,

    /// Interpolation used when core and device rates differ
    #[arg(long, value_enum)]
    resampler: Option<ResamplerArg>,

    /// Push one stereo frame at a time instead of one batch per frame
    #[arg(long)]
    per_sample: bool,

    // === Headless rendering ===
    /// Render to this WAV file instead of playing
    #[arg(long, short = 'w')]
    wav: Option<PathBuf>,

    /// Rate the headless device grants, whatever is requested
    #[arg(long, requires = "wav")]
    device_rate: Option<u32>,

    /// Sample format the headless device grants
    #[arg(long, value_enum, requires = "wav")]
    device_format: Option<FormatArg>,

    /// Channel count the headless device grants (1 or 2)
    #[arg(long, requires = "wav")]
    device_channels: Option<u16>,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum ResamplerArg {
    Linear,
    Cubic,
}

impl From<ResamplerArg> for ResampleMode {
    fn from(arg: ResamplerArg) -> Self {
        match arg {
            ResamplerArg::Linear => ResampleMode::Linear,
            ResamplerArg::Cubic => ResampleMode::Cubic,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum FormatArg {
    I16,
    F32,
}

impl From<FormatArg> for SampleFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::I16 => SampleFormat::I16,
            FormatArg::F32 => SampleFormat::F32,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    if !args.core_rate.is_finite() || args.core_rate <= 0.0 {
        bail!("--core-rate must be > 0 (got {})", args.core_rate);
    }
    if !args.fps.is_finite() || args.fps <= 0.0 {
        bail!("--fps must be > 0 (got {})", args.fps);
    }
    if !args.seconds.is_finite() || args.seconds < 0.0 {
        bail!("--seconds must be >= 0 (got {})", args.seconds);
    }

    let nominal = nominal_rate(args.core_rate);
    let source_rate = nominal.unwrap_or_else(|| {
        warn!("Core rate {} is unusable; samples pass through", args.core_rate);
        0
    });
    let rates = config.candidate_rates(nominal);
    let frames = (args.seconds * args.fps).round() as u64;
    let delivery = if args.per_sample {
        Delivery::PerSample
    } else {
        Delivery::Batch
    };

    info!(
        "Core: {} Hz ({} Hz nominal) at {} fps, {} frames",
        args.core_rate, source_rate, args.fps, frames
    );

    let mut core = ToneCore::new(args.core_rate, args.fps, args.tone);

    let stats = match &args.wav {
        Some(path) => {
            let mut backend = QueueBackend::new();
            if let Some(rate) = args.device_rate {
                backend = backend.grant_rate(rate);
            }
            if let Some(format) = args.device_format {
                backend = backend.grant_format(format.into());
            }
            if let Some(channels) = args.device_channels {
                backend = backend.grant_channels(channels);
            }

            let mut engine = AudioEngine::with_config(backend, &config);
            engine
                .open_first(&rates)
                .context("Failed to open headless audio device")?;
            let summary = session::render_wav(
                &mut core,
                &mut engine,
                source_rate,
                frames,
                config.buffer_frames,
                delivery,
                path,
            )?;
            summary.stats
        }
        None => {
            let mut engine = AudioEngine::with_default_output(&config);
            if let Err(e) = engine.open_first(&rates) {
                warn!("Audio disabled: {}", e);
            }
            session::play(&mut core, &mut engine, source_rate, frames, delivery)?
        }
    };

    log_stats(&stats);
    Ok(())
}

/// Load the config file and apply command-line overrides
fn load_config(args: &Args) -> Result<AudioConfig> {
    let mut config = match &args.config {
        Some(path) => config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => config::load(),
    };

    if let Some(rate) = args.rate {
        config.sample_rate = Some(rate);
    }
    if let Some(gain) = args.gain {
        config.gain = gain;
    }
    if let Some(resampler) = args.resampler {
        config.resampler = resampler.into();
    }
    config.validate().context("Invalid audio configuration")?;

    if args.save_config {
        config::save(&config).context("Failed to save config")?;
        if let Some(dir) = config::config_dir() {
            info!("Saved config to {}", dir.join(config::CONFIG_FILE).display());
        }
    }

    Ok(config)
}

fn log_stats(stats: &StreamStats) {
    info!(
        "Stream: pushed={} pulled={} underruns={} silence={} overruns={} discarded={} dropped_batches={}",
        stats.samples_pushed,
        stats.samples_pulled,
        stats.underruns,
        stats.silence_inserted,
        stats.overruns,
        stats.samples_discarded,
        stats.dropped_batches
    );
}
