//! Device and stream descriptions exchanged with backends

/// Sample formats the engine can deliver to a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Signed 16-bit integer
    I16,
    /// 32-bit float normalized to [-1.0, 1.0]
    F32,
}

impl SampleFormat {
    /// Size of one sample in bytes
    pub fn sample_size(self) -> usize {
        match self {
            SampleFormat::I16 => 2,
            SampleFormat::F32 => 4,
        }
    }
}

/// Channel layout of the audio handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelLayout {
    Mono,
    #[default]
    Stereo,
}

impl ChannelLayout {
    pub fn channels(self) -> u16 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

/// What the engine asks a backend for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub sample_rate: u32,
    pub format: SampleFormat,
    pub channels: u16,
    /// Preferred device buffer size in frames
    pub buffer_frames: u32,
}

impl StreamRequest {
    /// The engine's native request: interleaved stereo int16
    pub fn native(sample_rate: u32, buffer_frames: u32) -> Self {
        Self {
            sample_rate,
            format: SampleFormat::I16,
            channels: 2,
            buffer_frames,
        }
    }
}

/// What a backend actually granted
///
/// May differ from the [`StreamRequest`] in every field; all conversion
/// downstream of the resampler follows this spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSpec {
    pub sample_rate: u32,
    pub format: SampleFormat,
    pub channels: u16,
}

impl DeviceSpec {
    /// Whether the engine has a conversion path to this spec at all
    pub fn is_supported(&self) -> bool {
        self.sample_rate > 0 && matches!(self.channels, 1 | 2)
    }
}
