//! Rate-adapting audio engine
//!
//! # Architecture
//!
//! ```text
//! Emulation Thread                                     Device Pull Context
//!     │                                                        │
//! [push(batch, core_rate)]                                     │
//!     │                                                        │
//! [resample → downmix → format]                                │
//!     │                                                        │
//! [lock]──►[ring.write]──────(StreamShared)──────►[lock]──►[ring.read]
//!                                                              │
//!                                                  [zero-fill shortfall]
//!                                                  [apply gain]
//! ```
//!
//! The engine is `Closed` until [`AudioEngine::open`] succeeds and returns to
//! `Closed` on [`AudioEngine::shutdown`]. Opening at the rate already open is
//! a no-op; opening at another rate closes first.

mod callback;
mod stream;


pub use callback::StreamContext;

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::backend::{AudioBackend, CpalBackend, PlaybackStream};
use crate::config::AudioConfig;
use crate::convert::{downmix_stereo_to_mono, i16_slice_to_f32};
use crate::device::{ChannelLayout, DeviceSpec, SampleFormat, StreamRequest};
use crate::error::AudioError;
use crate::metrics::{MetricsLog, StreamStats};
use crate::resample::{ResampleMode, resample_interleaved};

use stream::{DeviceRing, StreamShared};

/// Round a core's reported sample rate to whole Hz
///
/// Returns `None` for rates that are not finite or round to zero.
pub fn nominal_rate(timing_rate: f64) -> Option<u32> {
    if !timing_rate.is_finite() {
        return None;
    }
    let rounded = timing_rate.round();
    (rounded >= 1.0 && rounded <= u32::MAX as f64).then_some(rounded as u32)
}

/// An open device and the rate it was opened for
struct OpenDevice<S> {
    requested_rate: u32,
    spec: DeviceSpec,
    stream: S,
}

/// Producer-facing audio engine
///
/// Owned by the emulation side; all methods take it by reference from the
/// thread the core runs on. The device pull path only ever sees the shared
/// stream state through a [`StreamContext`].
pub struct AudioEngine<B: AudioBackend = CpalBackend> {
    backend: B,
    shared: Arc<StreamShared>,
    device: Option<OpenDevice<B::Stream>>,
    resample_mode: ResampleMode,
    buffer_frames: u32,
    ring_seconds: f32,
    metrics_log: MetricsLog,
}

impl AudioEngine<CpalBackend> {
    /// Engine on the default cpal host
    pub fn with_default_output(config: &AudioConfig) -> Self {
        Self::with_config(CpalBackend::new(), config)
    }
}

impl<B: AudioBackend> AudioEngine<B> {
    /// Closed engine with default settings
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, &AudioConfig::default())
    }

    /// Closed engine using gain, resampler and buffer sizes from `config`
    pub fn with_config(backend: B, config: &AudioConfig) -> Self {
        let mut engine = Self {
            backend,
            shared: Arc::new(StreamShared::new(1.0)),
            device: None,
            resample_mode: config.resampler,
            buffer_frames: config.buffer_frames.max(1),
            ring_seconds: config.ring_seconds,
            metrics_log: MetricsLog::new(),
        };
        engine.set_gain(config.gain);
        engine
    }

    /// Open a device at `rate`
    ///
    /// The backend may grant a different rate, format or channel count; the
    /// returned spec is what the engine will feed. On failure the engine is
    /// left closed and the caller may retry with another rate.
    pub fn open(&mut self, rate: u32) -> Result<DeviceSpec, AudioError> {
        if rate == 0 {
            return Err(AudioError::unavailable(rate, "sample rate must be > 0"));
        }

        if let Some(device) = &self.device {
            if device.requested_rate == rate || device.spec.sample_rate == rate {
                return Ok(device.spec);
            }
            debug!(
                "Reopening audio device: {} Hz -> {} Hz",
                device.spec.sample_rate, rate
            );
            self.shutdown();
        }

        let request = StreamRequest::native(rate, self.buffer_frames);
        let spec = self.backend.negotiate(&request)?;
        if !spec.is_supported() {
            return Err(AudioError::UnsupportedFormat {
                source_channels: request.channels,
                device_channels: spec.channels,
                format: spec.format,
            });
        }

        // The ring must exist before the first pull
        let ring = DeviceRing::allocate(&spec, self.ring_seconds);
        let capacity = ring.capacity();
        *self.shared.lock_ring() = Some(ring);

        let stream = match self
            .backend
            .start(&spec, &request, StreamContext::new(&self.shared))
        {
            Ok(stream) => stream,
            Err(e) => {
                *self.shared.lock_ring() = None;
                return Err(e);
            }
        };

        info!(
            "Opened audio device: rate={} format={:?} channels={} ring_capacity(samples)={}",
            spec.sample_rate, spec.format, spec.channels, capacity
        );

        self.device = Some(OpenDevice {
            requested_rate: rate,
            spec,
            stream,
        });
        Ok(spec)
    }

    /// Try each rate in order until one opens
    ///
    /// Returns the last error if every candidate fails.
    pub fn open_first(&mut self, rates: &[u32]) -> Result<DeviceSpec, AudioError> {
        let mut last_err = None;
        for &rate in rates.iter().filter(|&&r| r > 0) {
            debug!("Trying audio init at {} Hz", rate);
            match self.open(rate) {
                Ok(spec) => {
                    info!("Audio initialized at {} Hz", spec.sample_rate);
                    return Ok(spec);
                }
                Err(e) => {
                    warn!("Audio init failed at {} Hz: {}", rate, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| AudioError::unavailable(0, "no candidate sample rates")))
    }

    /// Queue interleaved stereo frames produced at `source_rate`
    ///
    /// At most `frames` frames are taken from `samples`. A `source_rate` of 0
    /// means "unknown" and skips resampling. No-op while closed.
    pub fn push(&mut self, samples: &[i16], frames: usize, source_rate: u32) -> Result<(), AudioError> {
        let len = frames.saturating_mul(2).min(samples.len());
        self.push_interleaved(&samples[..len], ChannelLayout::Stereo, source_rate)
    }

    /// Queue a single stereo frame
    pub fn push_frame(&mut self, left: i16, right: i16, source_rate: u32) -> Result<(), AudioError> {
        self.push_interleaved(&[left, right], ChannelLayout::Stereo, source_rate)
    }

    /// Queue interleaved samples with an explicit source layout
    ///
    /// Never blocks on the device; if the ring is full the oldest queued
    /// audio is discarded. A mono source cannot feed a stereo device: the
    /// batch is dropped and [`AudioError::UnsupportedFormat`] returned.
    pub fn push_interleaved(
        &mut self,
        samples: &[i16],
        layout: ChannelLayout,
        source_rate: u32,
    ) -> Result<(), AudioError> {
        let Some(spec) = self.device.as_ref().map(|d| d.spec) else {
            return Ok(());
        };

        let src_channels = layout.channels() as usize;
        let frames = samples.len() / src_channels;
        if frames == 0 {
            return Ok(());
        }
        let samples = &samples[..frames * src_channels];

        if layout == ChannelLayout::Mono && spec.channels != 1 {
            let dropped = self.shared.counters.record_dropped_batch();
            if dropped <= 10 || dropped.is_multiple_of(100) {
                warn!(
                    "Dropping mono batch: no upmix to {} channels defined ({} dropped so far)",
                    spec.channels, dropped
                );
            }
            return Err(AudioError::UnsupportedFormat {
                source_channels: layout.channels(),
                device_channels: spec.channels,
                format: spec.format,
            });
        }

        let resampled = if source_rate != 0 && source_rate != spec.sample_rate {
            resample_interleaved(
                samples,
                src_channels,
                source_rate,
                spec.sample_rate,
                self.resample_mode,
            )
        } else {
            Cow::Borrowed(samples)
        };

        let device_samples = if src_channels == 2 && spec.channels == 1 {
            Cow::Owned(downmix_stereo_to_mono(&resampled))
        } else {
            resampled
        };

        let (written, discarded, fill, capacity) = match spec.format {
            SampleFormat::I16 => {
                let mut ring = self.shared.lock_ring();
                let Some(DeviceRing::I16(ring)) = ring.as_mut() else {
                    return Ok(());
                };
                let discarded = ring.write(&device_samples);
                (device_samples.len(), discarded, ring.len(), ring.capacity())
            }
            SampleFormat::F32 => {
                let converted = i16_slice_to_f32(&device_samples);
                let mut ring = self.shared.lock_ring();
                let Some(DeviceRing::F32(ring)) = ring.as_mut() else {
                    return Ok(());
                };
                let discarded = ring.write(&converted);
                (converted.len(), discarded, ring.len(), ring.capacity())
            }
        };

        if discarded > 0 {
            trace!("Audio buffer full: discarded {} samples", discarded);
        }
        self.shared.counters.record_push(written, discarded);
        self.metrics_log
            .maybe_log(&self.shared.counters, fill, capacity);

        Ok(())
    }

    /// Stop and release the device
    ///
    /// Idempotent: does nothing when already closed.
    pub fn shutdown(&mut self) {
        let Some(device) = self.device.take() else {
            return;
        };
        if let Err(e) = device.stream.pause() {
            warn!("Failed to pause audio stream: {}", e);
        }
        drop(device.stream);
        if let Some(ring) = self.shared.lock_ring().take() {
            self.shared.counters.record_flush(ring.len());
        }
        info!("Audio device closed ({} Hz)", device.spec.sample_rate);
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Negotiated spec, or `None` while closed
    pub fn device_spec(&self) -> Option<DeviceSpec> {
        self.device.as_ref().map(|d| d.spec)
    }

    /// Device sample rate, or 0 while closed
    pub fn sample_rate(&self) -> u32 {
        self.device.as_ref().map_or(0, |d| d.spec.sample_rate)
    }

    pub fn gain(&self) -> f32 {
        self.shared.gain()
    }

    /// Set the output gain applied at pull time
    ///
    /// Negative values mute; non-finite values are ignored.
    pub fn set_gain(&mut self, gain: f32) {
        if !gain.is_finite() {
            warn!("Ignoring non-finite gain {}", gain);
            return;
        }
        self.shared.set_gain(gain.max(0.0));
    }

    pub fn resample_mode(&self) -> ResampleMode {
        self.resample_mode
    }

    pub fn set_resample_mode(&mut self, mode: ResampleMode) {
        self.resample_mode = mode;
    }

    /// Samples currently queued for the device (0 while closed)
    pub fn buffered_samples(&self) -> usize {
        self.shared.lock_ring().as_ref().map_or(0, DeviceRing::len)
    }

    pub fn stats(&self) -> StreamStats {
        self.shared.counters.snapshot()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: AudioBackend> Drop for AudioEngine<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
