//! Retro Audio: rate-adapting audio streaming for emulator frontends
//!
//! An emulation core produces interleaved int16 audio in irregular batches at
//! its own nominal rate. A hardware device pulls fixed-size buffers at its
//! own clock. The [`AudioEngine`] sits between the two:
//!
//! - batches are resampled to the device rate ([`resample`])
//! - converted to the device layout and format ([`convert`])
//! - queued in a fixed-capacity ring that drops the oldest audio on overflow
//!   ([`RingBuffer`])
//! - drained by the device pull path, which pads underruns with silence and
//!   applies the output gain
//!
//! # Usage
//!
//! ```no_run
//! use retro_audio::{AudioConfig, AudioEngine};
//!
//! let config = AudioConfig::default();
//! let mut engine = AudioEngine::with_default_output(&config);
//! engine.open_first(&config.candidate_rates(Some(32040)))?;
//!
//! // From the emulation loop, whenever the core produced audio
//! let batch: Vec<i16> = vec![0; 534 * 2];
//! engine.push(&batch, 534, 32040)?;
//! # Ok::<(), retro_audio::AudioError>(())
//! ```

pub mod backend;
pub mod config;
pub mod convert;
mod device;
mod engine;
mod error;
mod metrics;
pub mod resample;
mod ring;

pub use backend::{AudioBackend, CpalBackend, PlaybackStream, QueueBackend, QueueHandle};
pub use config::AudioConfig;
pub use device::{ChannelLayout, DeviceSpec, SampleFormat, StreamRequest};
pub use engine::{AudioEngine, StreamContext, nominal_rate};
pub use error::AudioError;
pub use metrics::StreamStats;
pub use resample::ResampleMode;
pub use ring::{MIN_CAPACITY, RingBuffer};
