//! Device pull path
//!
//! Backends never see the engine itself. They get a [`StreamContext`], a
//! weak handle to the engine's shared stream state, and call one of its
//! `fill_*` methods whenever the device wants more audio. Filling always
//! completes: missing audio becomes silence, and a context whose engine is
//! gone fills the whole buffer with zeros.

use std::sync::{Arc, Weak};

use tracing::trace;

use crate::convert::{apply_gain_f32, apply_gain_i16};
use crate::device::SampleFormat;

use super::stream::{DeviceRing, StreamShared};

/// Pull-side handle passed to [`AudioBackend::start`](crate::AudioBackend::start)
#[derive(Debug, Clone)]
pub struct StreamContext {
    shared: Weak<StreamShared>,
}

impl StreamContext {
    pub(crate) fn new(shared: &Arc<StreamShared>) -> Self {
        Self {
            shared: Arc::downgrade(shared),
        }
    }

    /// Fill an int16 device buffer
    pub fn fill_i16(&self, out: &mut [i16]) {
        let Some(shared) = self.shared.upgrade() else {
            out.fill(0);
            return;
        };

        let delivered = {
            let mut ring = shared.lock_ring();
            match ring.as_mut() {
                Some(DeviceRing::I16(ring)) => Some(ring.read(out)),
                _ => None,
            }
        };

        let Some(delivered) = delivered else {
            trace!("Pull on closed or mismatched int16 stream; emitting silence");
            out.fill(0);
            return;
        };

        out[delivered..].fill(0);
        shared.counters.record_pull(delivered, out.len());
        apply_gain_i16(&mut out[..delivered], shared.gain());
    }

    /// Fill a float device buffer
    pub fn fill_f32(&self, out: &mut [f32]) {
        let Some(shared) = self.shared.upgrade() else {
            out.fill(0.0);
            return;
        };

        let delivered = {
            let mut ring = shared.lock_ring();
            match ring.as_mut() {
                Some(DeviceRing::F32(ring)) => Some(ring.read(out)),
                _ => None,
            }
        };

        let Some(delivered) = delivered else {
            trace!("Pull on closed or mismatched float stream; emitting silence");
            out.fill(0.0);
            return;
        };

        out[delivered..].fill(0.0);
        shared.counters.record_pull(delivered, out.len());
        apply_gain_f32(&mut out[..delivered], shared.gain());
    }

    /// Fill a raw byte buffer of native-endian samples
    ///
    /// `bytes.len() / sample_size` samples are produced; a trailing partial
    /// sample is zeroed.
    pub fn fill_bytes(&self, format: SampleFormat, bytes: &mut [u8]) {
        let size = format.sample_size();
        let count = bytes.len() / size;
        match format {
            SampleFormat::I16 => {
                let mut samples = vec![0i16; count];
                self.fill_i16(&mut samples);
                for (chunk, sample) in bytes.chunks_exact_mut(size).zip(&samples) {
                    chunk.copy_from_slice(&sample.to_ne_bytes());
                }
            }
            SampleFormat::F32 => {
                let mut samples = vec![0f32; count];
                self.fill_f32(&mut samples);
                for (chunk, sample) in bytes.chunks_exact_mut(size).zip(&samples) {
                    chunk.copy_from_slice(&sample.to_ne_bytes());
                }
            }
        }
        bytes[count * size..].fill(0);
    }
}
