//! Polling backend with no device thread
//!
//! Instead of a platform callback, the host drains the stream itself through
//! a [`QueueHandle`], with the same device-lock discipline as a real
//! callback. Used for headless rendering and for exercising the engine
//! without audio hardware. Negotiation can be scripted to refuse rates or to
//! grant a different rate, format or channel count than requested.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::device::{DeviceSpec, SampleFormat, StreamRequest};
use crate::engine::StreamContext;
use crate::error::AudioError;

use super::{AudioBackend, PlaybackStream};

/// Context of the currently running queue stream, if any
#[derive(Debug, Default)]
struct Slot {
    context: Mutex<Option<StreamContext>>,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, Option<StreamContext>> {
        self.context.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Backend whose stream is drained explicitly by the host
#[derive(Debug, Default)]
pub struct QueueBackend {
    slot: Arc<Slot>,
    grant_rate: Option<u32>,
    grant_format: Option<SampleFormat>,
    grant_channels: Option<u16>,
    refused_rates: Vec<u32>,
}

impl QueueBackend {
    /// A backend that grants exactly what is requested
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant this rate regardless of the request
    pub fn grant_rate(mut self, rate: u32) -> Self {
        self.grant_rate = Some(rate);
        self
    }

    /// Grant this sample format regardless of the request
    pub fn grant_format(mut self, format: SampleFormat) -> Self {
        self.grant_format = Some(format);
        self
    }

    /// Grant this channel count regardless of the request
    pub fn grant_channels(mut self, channels: u16) -> Self {
        self.grant_channels = Some(channels);
        self
    }

    /// Fail negotiation at `rate`
    pub fn refuse_rate(mut self, rate: u32) -> Self {
        self.refused_rates.push(rate);
        self
    }

    /// Handle for draining whichever stream is currently running
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl AudioBackend for QueueBackend {
    type Stream = QueueStream;

    fn negotiate(&mut self, request: &StreamRequest) -> Result<DeviceSpec, AudioError> {
        if self.refused_rates.contains(&request.sample_rate) {
            return Err(AudioError::unavailable(
                request.sample_rate,
                "rate refused by queue backend",
            ));
        }
        let spec = DeviceSpec {
            sample_rate: self.grant_rate.unwrap_or(request.sample_rate),
            format: self.grant_format.unwrap_or(request.format),
            channels: self.grant_channels.unwrap_or(request.channels),
        };
        debug!("Queue backend granted {:?}", spec);
        Ok(spec)
    }

    fn start(
        &mut self,
        _spec: &DeviceSpec,
        _request: &StreamRequest,
        context: StreamContext,
    ) -> Result<Self::Stream, AudioError> {
        *self.slot.lock() = Some(context);
        Ok(QueueStream {
            slot: Arc::clone(&self.slot),
        })
    }
}

/// Running queue stream; pausing or dropping it detaches the handle
#[derive(Debug)]
pub struct QueueStream {
    slot: Arc<Slot>,
}

impl PlaybackStream for QueueStream {
    fn pause(&self) -> Result<(), AudioError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

impl Drop for QueueStream {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}

/// Host-side drain for a [`QueueBackend`]
///
/// Cloneable and usable from any thread. Draining while no stream is running
/// yields silence.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    slot: Arc<Slot>,
}

impl QueueHandle {
    fn context(&self) -> Option<StreamContext> {
        self.slot.lock().clone()
    }

    /// Whether a stream is currently running
    pub fn is_active(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Pull one int16 device buffer
    pub fn drain_i16(&self, out: &mut [i16]) {
        match self.context() {
            Some(context) => context.fill_i16(out),
            None => out.fill(0),
        }
    }

    /// Pull one float device buffer
    pub fn drain_f32(&self, out: &mut [f32]) {
        match self.context() {
            Some(context) => context.fill_f32(out),
            None => out.fill(0.0),
        }
    }

    /// Pull one buffer of raw native-endian sample bytes
    pub fn drain_bytes(&self, format: SampleFormat, bytes: &mut [u8]) {
        match self.context() {
            Some(context) => context.fill_bytes(format, bytes),
            None => bytes.fill(0),
        }
    }
}
