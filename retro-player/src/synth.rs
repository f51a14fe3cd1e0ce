//! Synthetic emulation core
//!
//! Stands in for a real core: produces a stereo sine tone and hands it out
//! one emulated frame at a time. With a fractional frame rate the number of
//! frames per batch varies (533 or 534 at 32040.5 Hz and 60.0988 fps), which
//! is the irregular batching a real core produces.

use std::f64::consts::TAU;

/// Peak level of the left channel; the right channel plays at half of it
const AMPLITUDE: f64 = 0.25 * i16::MAX as f64;

pub struct ToneCore {
    timing_rate: f64,
    fps: f64,
    step: f64,
    phase: f64,
    owed_frames: f64,
    batch: Vec<i16>,
}

impl ToneCore {
    /// `timing_rate` and `fps` must be positive.
    pub fn new(timing_rate: f64, fps: f64, frequency: f64) -> Self {
        Self {
            timing_rate,
            fps,
            step: TAU * frequency / timing_rate,
            phase: 0.0,
            owed_frames: 0.0,
            batch: Vec::with_capacity((timing_rate / fps).ceil() as usize * 2 + 2),
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Run one emulated frame and return the interleaved stereo audio it made
    pub fn run_frame(&mut self) -> &[i16] {
        self.owed_frames += self.timing_rate / self.fps;
        let frames = self.owed_frames.floor();
        self.owed_frames -= frames;

        self.batch.clear();
        for _ in 0..frames as usize {
            let level = self.phase.sin() * AMPLITUDE;
            self.batch.push(level as i16);
            self.batch.push((level * 0.5) as i16);
            self.phase += self.step;
            if self.phase >= TAU {
                self.phase -= TAU;
            }
        }
        &self.batch
    }
}
