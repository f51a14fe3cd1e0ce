//! Audio engine errors

/// Errors reported by the audio engine and its backends.
///
/// Buffer underruns and overruns are not errors. The stream pads with
/// silence or discards the oldest samples and counts both in
/// [`StreamStats`](crate::StreamStats).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AudioError {
    /// No output device could be opened at the requested rate
    #[error("audio device unavailable at {rate} Hz: {reason}")]
    DeviceUnavailable { rate: u32, reason: String },

    /// Negotiated device layout has no conversion path from the source
    #[error(
        "unsupported format: {source_channels}ch source cannot feed a {device_channels}ch {format:?} device"
    )]
    UnsupportedFormat {
        source_channels: u16,
        device_channels: u16,
        format: crate::SampleFormat,
    },

    /// Running stream could not be controlled
    #[error("audio stream error: {0}")]
    Stream(String),

    /// Invalid or unreadable configuration
    #[error("invalid audio config: {0}")]
    Config(String),
}

impl AudioError {
    pub(crate) fn unavailable(rate: u32, reason: impl std::fmt::Display) -> Self {
        Self::DeviceUnavailable {
            rate,
            reason: reason.to_string(),
        }
    }
}
