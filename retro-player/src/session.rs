//! Driving the engine from the synthetic core
//!
//! Two ways to run a session:
//! - [`play`]: real-time on the default output device, paced by the core's
//!   frame rate
//! - [`render_wav`]: as fast as possible through a [`QueueBackend`], pulling
//!   device buffers in step with emulated time and writing them to a WAV file

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use hound::{WavSpec, WavWriter};
use tracing::{info, warn};

use retro_audio::{
    AudioBackend, AudioEngine, CpalBackend, DeviceSpec, QueueBackend, SampleFormat, StreamStats,
};

use crate::synth::ToneCore;

/// How the core's audio reaches the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// One `push` per emulated frame
    Batch,
    /// One `push_frame` per stereo frame
    PerSample,
}

/// Hand one emulated frame of audio to the engine
fn feed<B: AudioBackend>(
    core: &mut ToneCore,
    engine: &mut AudioEngine<B>,
    source_rate: u32,
    delivery: Delivery,
) -> Result<()> {
    let batch = core.run_frame();
    match delivery {
        Delivery::Batch => engine.push(batch, batch.len() / 2, source_rate)?,
        Delivery::PerSample => {
            for frame in batch.chunks_exact(2) {
                engine.push_frame(frame[0], frame[1], source_rate)?;
            }
        }
    }
    Ok(())
}

/// Play `frames` emulated frames in real time
///
/// Runs even if no device could be opened; the engine then discards audio.
pub fn play(
    core: &mut ToneCore,
    engine: &mut AudioEngine<CpalBackend>,
    source_rate: u32,
    frames: u64,
    delivery: Delivery,
) -> Result<StreamStats> {
    if !engine.is_open() {
        warn!("No audio device open; running silent");
    }

    let frame_time = Duration::from_secs_f64(1.0 / core.fps());
    let start = Instant::now();
    let mut deadline = start;

    for _ in 0..frames {
        feed(core, engine, source_rate, delivery)?;

        deadline += frame_time;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
    }

    info!(
        "Played {} frames in {:.2}s",
        frames,
        start.elapsed().as_secs_f64()
    );
    Ok(engine.stats())
}

/// Result of a headless render
#[derive(Debug, Clone, Copy)]
pub struct RenderSummary {
    pub device: DeviceSpec,
    /// Device frames written to the file
    pub device_frames: u64,
    pub stats: StreamStats,
}

/// Render `frames` emulated frames to a WAV file
///
/// The engine must already be open. Each emulated frame advances device time
/// by `device_rate / fps` frames; whenever a whole device buffer of
/// `buffer_frames` is due it is drained, exactly as a device would pull it.
/// The file takes the negotiated rate, channel count and sample format.
pub fn render_wav(
    core: &mut ToneCore,
    engine: &mut AudioEngine<QueueBackend>,
    source_rate: u32,
    frames: u64,
    buffer_frames: u32,
    delivery: Delivery,
    path: &Path,
) -> Result<RenderSummary> {
    let Some(device) = engine.device_spec() else {
        bail!("audio engine is not open");
    };
    if buffer_frames == 0 {
        bail!("buffer_frames must be > 0");
    }

    let wav_spec = match device.format {
        SampleFormat::I16 => WavSpec {
            channels: device.channels,
            sample_rate: device.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        },
        SampleFormat::F32 => WavSpec {
            channels: device.channels,
            sample_rate: device.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        },
    };
    let mut writer = WavWriter::create(path, wav_spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let handle = engine.backend().handle();
    let chunk_len = buffer_frames as usize * device.channels as usize;
    let mut pcm_i16 = vec![0i16; chunk_len];
    let mut pcm_f32 = vec![0f32; chunk_len];

    let device_frames_per_frame = device.sample_rate as f64 / core.fps();
    let mut owed = 0.0;
    let mut device_frames = 0u64;

    for _ in 0..frames {
        feed(core, engine, source_rate, delivery)?;

        owed += device_frames_per_frame;
        while owed >= buffer_frames as f64 {
            owed -= buffer_frames as f64;
            match device.format {
                SampleFormat::I16 => {
                    handle.drain_i16(&mut pcm_i16);
                    for &sample in &pcm_i16 {
                        writer.write_sample(sample)?;
                    }
                }
                SampleFormat::F32 => {
                    handle.drain_f32(&mut pcm_f32);
                    for &sample in &pcm_f32 {
                        writer.write_sample(sample)?;
                    }
                }
            }
            device_frames += buffer_frames as u64;
        }
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finalize {}", path.display()))?;

    info!(
        "Rendered {} device frames ({:.2}s) to {}",
        device_frames,
        device_frames as f64 / device.sample_rate as f64,
        path.display()
    );

    Ok(RenderSummary {
        device,
        device_frames,
        stats: engine.stats(),
    })
}
