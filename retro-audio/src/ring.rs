//! Fixed-capacity circular sample buffer with overwrite-oldest semantics
//!
//! One slot is always left empty so that `head == tail` unambiguously means
//! "empty"; at most `capacity - 1` samples are resident.
//!
//! The buffer is not synchronized. Producer and consumer share it through
//! the engine's stream lock, held for the whole of each `write`/`read`.

/// Smallest capacity the engine allocates, in samples
pub const MIN_CAPACITY: usize = 512;

/// Circular buffer of interleaved samples
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: Box<[T]>,
    /// Next write position
    head: usize,
    /// Next read position
    tail: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a zeroed buffer of `capacity` slots (holds `capacity - 1` samples)
    ///
    /// Capacities below 2 are raised to 2 so the buffer can hold at least one
    /// sample.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity.max(2)].into_boxed_slice(),
            head: 0,
            tail: 0,
        }
    }

    /// Create a buffer holding `seconds` of audio at `rate` and `channels`
    ///
    /// Stores at least [`MIN_CAPACITY`] samples. The storable count is a
    /// whole number of frames, so discarding the oldest audio on overflow
    /// never splits a frame and channels stay aligned.
    pub fn for_stream(rate: u32, channels: u16, seconds: f32) -> Self {
        let samples = (rate as f64 * channels as f64 * seconds.max(0.0) as f64) as usize;
        let usable = samples
            .max(MIN_CAPACITY)
            .next_multiple_of(channels.max(1) as usize);
        Self::new(usable + 1)
    }

    /// Total slots, including the one that is always kept empty
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of unread samples
    pub fn len(&self) -> usize {
        (self.head + self.capacity() - self.tail) % self.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Samples that can be written without discarding anything
    pub fn free(&self) -> usize {
        self.capacity() - 1 - self.len()
    }

    /// Drop all resident samples
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }

    /// Append samples, discarding the oldest resident ones if space runs out
    ///
    /// New data is never rejected. If `samples` alone exceeds the usable
    /// capacity only its newest `capacity - 1` samples are kept. Returns the
    /// number of samples lost (old resident ones plus any truncated input).
    pub fn write(&mut self, samples: &[T]) -> usize {
        let usable = self.capacity() - 1;
        let (src, truncated) = if samples.len() > usable {
            (&samples[samples.len() - usable..], samples.len() - usable)
        } else {
            (samples, 0)
        };
        if src.is_empty() {
            return truncated;
        }

        let free = self.free();
        let deficit = src.len().saturating_sub(free);
        if deficit > 0 {
            self.tail = (self.tail + deficit) % self.capacity();
        }

        // Two-segment copy: head..end, then wrap to the start
        let first = src.len().min(self.capacity() - self.head);
        self.data[self.head..self.head + first].copy_from_slice(&src[..first]);
        if src.len() > first {
            self.data[..src.len() - first].copy_from_slice(&src[first..]);
        }
        self.head = (self.head + src.len()) % self.capacity();

        deficit + truncated
    }

    /// Copy up to `dst.len()` resident samples into `dst`
    ///
    /// Returns the number copied. Never blocks and never pads; the caller
    /// decides what fills the remainder.
    pub fn read(&mut self, dst: &mut [T]) -> usize {
        let count = dst.len().min(self.len());
        if count == 0 {
            return 0;
        }

        let first = count.min(self.capacity() - self.tail);
        dst[..first].copy_from_slice(&self.data[self.tail..self.tail + first]);
        if count > first {
            dst[first..count].copy_from_slice(&self.data[..count - first]);
        }
        self.tail = (self.tail + count) % self.capacity();

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(range: std::ops::Range<i32>) -> Vec<i16> {
        range.map(|v| v as i16).collect()
    }

    #[test]
    fn test_new_buffer_is_empty() {
        let ring = RingBuffer::<i16>::new(16);
        assert_eq!(ring.capacity(), 16);
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.free(), 15);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let mut ring = RingBuffer::new(1024);
        let input = seq(0..1023);
        assert_eq!(ring.write(&input), 0);
        assert_eq!(ring.len(), 1023);

        let mut out = vec![0i16; 1023];
        assert_eq!(ring.read(&mut out), 1023);
        assert_eq!(out, input);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_roundtrip_across_wrap_boundary() {
        let mut ring = RingBuffer::new(10);
        let mut scratch = [0i16; 7];
        ring.write(&seq(0..7));
        ring.read(&mut scratch);

        // head and tail now sit at 7; the next write wraps
        let input = seq(100..108);
        assert_eq!(ring.write(&input), 0);
        let mut out = [0i16; 8];
        assert_eq!(ring.read(&mut out), 8);
        assert_eq!(&out[..], &input[..]);
    }

    #[test]
    fn test_oversized_write_keeps_newest() {
        let mut ring = RingBuffer::new(1024);
        let input = seq(0..2000);
        let lost = ring.write(&input);
        assert_eq!(lost, 2000 - 1023);
        assert_eq!(ring.len(), 1023);

        let mut out = vec![0i16; 1023];
        assert_eq!(ring.read(&mut out), 1023);
        assert_eq!(out, &input[2000 - 1023..]);
    }

    #[test]
    fn test_overflow_discards_oldest_resident() {
        let mut ring = RingBuffer::new(8);
        ring.write(&seq(0..5));
        let lost = ring.write(&seq(5..10));
        assert_eq!(lost, 3);
        assert_eq!(ring.len(), 7);

        let mut out = [0i16; 7];
        ring.read(&mut out);
        assert_eq!(&out[..], &seq(3..10)[..]);
    }

    #[test]
    fn test_capacity_plus_m_reads_latest() {
        let capacity = 64;
        let mut ring = RingBuffer::new(capacity);
        for chunk in seq(0..capacity as i32 + 37).chunks(13) {
            ring.write(chunk);
        }
        let mut out = vec![0i16; capacity - 1];
        assert_eq!(ring.read(&mut out), capacity - 1);
        assert_eq!(out, seq(38..capacity as i32 + 37));
    }

    #[test]
    fn test_read_from_empty_returns_zero() {
        let mut ring = RingBuffer::<i16>::new(32);
        let mut out = [55i16; 8];
        assert_eq!(ring.read(&mut out), 0);
        // read never pads
        assert!(out.iter().all(|&s| s == 55));
    }

    #[test]
    fn test_partial_read() {
        let mut ring = RingBuffer::new(32);
        ring.write(&seq(0..4));
        let mut out = [0i16; 10];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(&out[..4], &seq(0..4)[..]);
    }

    #[test]
    fn test_clear_resets_cursors() {
        let mut ring = RingBuffer::new(16);
        ring.write(&seq(0..10));
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.free(), 15);
    }

    #[test]
    fn test_for_stream_sizing() {
        // One extra slot on top of the storable samples
        assert_eq!(RingBuffer::<i16>::for_stream(48000, 2, 2.0).capacity(), 192_001);
        assert_eq!(RingBuffer::<f32>::for_stream(44100, 1, 2.0).capacity(), 88_201);
        assert_eq!(RingBuffer::<i16>::for_stream(100, 1, 2.0).capacity(), MIN_CAPACITY + 1);
    }

    #[test]
    fn test_for_stream_stores_whole_frames() {
        for channels in 1..=2u16 {
            for rate in [100, 8000, 22050, 32041, 44100, 48000] {
                let ring = RingBuffer::<i16>::for_stream(rate, channels, 0.37);
                let usable = ring.capacity() - 1;
                assert!(usable >= MIN_CAPACITY);
                assert_eq!(usable % channels as usize, 0, "rate={rate} channels={channels}");
            }
        }
    }

    #[test]
    fn test_stereo_overflow_keeps_channels_aligned() {
        let mut ring = RingBuffer::<i16>::for_stream(100, 2, 2.0);
        let frames: Vec<i16> = (1..=200).flat_map(|n| [n as i16, -(n as i16)]).collect();
        ring.write(&frames);
        let lost = ring.write(&frames);
        assert_eq!(lost % 2, 0);

        let mut out = [0i16; 6];
        assert_eq!(ring.read(&mut out), 6);
        for frame in out.chunks_exact(2) {
            assert!(frame[0] > 0 && frame[1] < 0, "frame {frame:?} is swapped");
            assert_eq!(frame[0], -frame[1]);
        }
    }

    #[test]
    fn test_tiny_capacity_is_raised() {
        let mut ring = RingBuffer::new(0);
        assert_eq!(ring.capacity(), 2);
        ring.write(&[1i16, 2, 3]);
        let mut out = [0i16; 2];
        assert_eq!(ring.read(&mut out), 1);
        assert_eq!(out[0], 3);
    }
}
