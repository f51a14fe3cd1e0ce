//! State shared between the producer and the device pull context

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

use crate::device::{DeviceSpec, SampleFormat};
use crate::metrics::StreamCounters;
use crate::ring::RingBuffer;

/// Ring buffer holding samples already in the device's format
#[derive(Debug)]
pub(crate) enum DeviceRing {
    I16(RingBuffer<i16>),
    F32(RingBuffer<f32>),
}

impl DeviceRing {
    /// Allocate a ring holding `seconds` of audio for `spec`
    pub fn allocate(spec: &DeviceSpec, seconds: f32) -> Self {
        match spec.format {
            SampleFormat::I16 => Self::I16(RingBuffer::for_stream(
                spec.sample_rate,
                spec.channels,
                seconds,
            )),
            SampleFormat::F32 => Self::F32(RingBuffer::for_stream(
                spec.sample_rate,
                spec.channels,
                seconds,
            )),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::I16(ring) => ring.len(),
            Self::F32(ring) => ring.len(),
        }
    }

    pub fn capacity(&self) -> usize {
        match self {
            Self::I16(ring) => ring.capacity(),
            Self::F32(ring) => ring.capacity(),
        }
    }
}

/// The engine's half of the stream, reachable from the pull callback
///
/// `ring` is `None` while the engine is closed. The lock around it is the
/// device lock: every ring `write` and `read` happens under it.
#[derive(Debug)]
pub(crate) struct StreamShared {
    ring: Mutex<Option<DeviceRing>>,
    /// f32 bits; read without further synchronization in the pull path
    gain: AtomicU32,
    pub counters: StreamCounters,
}

impl StreamShared {
    pub fn new(gain: f32) -> Self {
        Self {
            ring: Mutex::new(None),
            gain: AtomicU32::new(gain.to_bits()),
            counters: StreamCounters::default(),
        }
    }

    /// Take the device lock, recovering from a poisoned mutex
    pub fn lock_ring(&self) -> MutexGuard<'_, Option<DeviceRing>> {
        self.ring.lock().unwrap_or_else(|e| {
            warn!("Audio ring mutex poisoned; continuing");
            e.into_inner()
        })
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.store(gain.to_bits(), Ordering::Relaxed);
    }
}
