//! Platform audio backends
//!
//! Opening a device is split in two so the engine can size its ring buffer
//! from the granted spec before any pull can happen:
//!
//! 1. [`AudioBackend::negotiate`] picks a device configuration close to the
//!    request and reports what was granted.
//! 2. [`AudioBackend::start`] builds the stream for that spec and starts the
//!    pull cycle, handing it a [`StreamContext`].

mod output;
mod queue;

pub use output::CpalBackend;
pub use queue::{QueueBackend, QueueHandle, QueueStream};

use crate::device::{DeviceSpec, StreamRequest};
use crate::engine::StreamContext;
use crate::error::AudioError;

/// A source of output devices
pub trait AudioBackend {
    /// Running stream; dropping it releases the device
    type Stream: PlaybackStream;

    /// Choose a configuration for `request` and report what was granted
    fn negotiate(&mut self, request: &StreamRequest) -> Result<DeviceSpec, AudioError>;

    /// Start pulling audio for a spec returned by [`negotiate`](Self::negotiate)
    fn start(
        &mut self,
        spec: &DeviceSpec,
        request: &StreamRequest,
        context: StreamContext,
    ) -> Result<Self::Stream, AudioError>;
}

/// Control over a running stream
pub trait PlaybackStream {
    /// Stop the pull cycle
    fn pause(&self) -> Result<(), AudioError>;
}
