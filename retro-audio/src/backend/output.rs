//! Audio output using cpal
//!
//! The callback reads straight from the engine's ring through a
//! [`StreamContext`]; conversion to the device format already happened on
//! the producer side.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, info};

use crate::device::{DeviceSpec, SampleFormat, StreamRequest};
use crate::engine::StreamContext;
use crate::error::AudioError;

use super::{AudioBackend, PlaybackStream};

/// Device configuration selected during negotiation
struct PendingStream {
    device: cpal::Device,
    config: cpal::StreamConfig,
}

/// Output through the host's default cpal device
pub struct CpalBackend {
    host: cpal::Host,
    pending: Option<PendingStream>,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
            pending: None,
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of one supported cpal config range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConfigRange {
    channels: u16,
    min_rate: u32,
    max_rate: u32,
    format: SampleFormat,
}

fn map_format(format: cpal::SampleFormat) -> Option<SampleFormat> {
    match format {
        cpal::SampleFormat::I16 => Some(SampleFormat::I16),
        cpal::SampleFormat::F32 => Some(SampleFormat::F32),
        _ => None,
    }
}

/// Pick the best range containing the requested rate
///
/// Preference: the requested format and channel count, then stereo in the
/// other format, then mono int16, then mono float.
fn choose_range(ranges: &[ConfigRange], request: &StreamRequest) -> Option<usize> {
    let other = match request.format {
        SampleFormat::I16 => SampleFormat::F32,
        SampleFormat::F32 => SampleFormat::I16,
    };
    let preferences = [
        (request.format, request.channels),
        (other, 2),
        (SampleFormat::I16, 1),
        (SampleFormat::F32, 1),
    ];

    preferences.iter().find_map(|&(format, channels)| {
        ranges.iter().position(|r| {
            r.format == format
                && r.channels == channels
                && (r.min_rate..=r.max_rate).contains(&request.sample_rate)
        })
    })
}

fn buffer_size(supported: &cpal::SupportedBufferSize, frames: u32) -> cpal::BufferSize {
    match supported {
        cpal::SupportedBufferSize::Range { min, max } if (*min..=*max).contains(&frames) => {
            cpal::BufferSize::Fixed(frames)
        }
        _ => cpal::BufferSize::Default,
    }
}

impl AudioBackend for CpalBackend {
    type Stream = cpal::Stream;

    fn negotiate(&mut self, request: &StreamRequest) -> Result<DeviceSpec, AudioError> {
        let rate = request.sample_rate;
        self.pending = None;

        let device = self
            .host
            .default_output_device()
            .ok_or_else(|| AudioError::unavailable(rate, "no audio output device available"))?;

        let supported: Vec<cpal::SupportedStreamConfigRange> = device
            .supported_output_configs()
            .map_err(|e| AudioError::unavailable(rate, format!("failed to query configs: {}", e)))?
            .collect();

        let ranges: Vec<(usize, ConfigRange)> = supported
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                Some((
                    i,
                    ConfigRange {
                        channels: r.channels(),
                        min_rate: r.min_sample_rate().0,
                        max_rate: r.max_sample_rate().0,
                        format: map_format(r.sample_format())?,
                    },
                ))
            })
            .collect();
        let summaries: Vec<ConfigRange> = ranges.iter().map(|(_, r)| *r).collect();

        let (config, format) = if let Some(pos) = choose_range(&summaries, request) {
            let range = &supported[ranges[pos].0];
            let mut config: cpal::StreamConfig =
                range.clone().with_sample_rate(cpal::SampleRate(rate)).config();
            config.buffer_size = buffer_size(range.buffer_size(), request.buffer_frames);
            (config, summaries[pos].format)
        } else {
            // Nothing covers the rate: accept the device default and let the
            // resampler absorb the difference
            let default = device.default_output_config().map_err(|e| {
                AudioError::unavailable(rate, format!("failed to get default output config: {}", e))
            })?;
            let format = map_format(default.sample_format()).ok_or_else(|| {
                AudioError::unavailable(
                    rate,
                    format!("unsupported sample format: {:?}", default.sample_format()),
                )
            })?;
            if !matches!(default.channels(), 1 | 2) {
                return Err(AudioError::unavailable(
                    rate,
                    format!("unsupported channel count: {}", default.channels()),
                ));
            }
            (default.config(), format)
        };

        let spec = DeviceSpec {
            sample_rate: config.sample_rate.0,
            format,
            channels: config.channels,
        };

        debug!(
            "Negotiated {:?} (requested {} Hz, buffer {:?}) on {}",
            spec,
            rate,
            config.buffer_size,
            device.name().unwrap_or_else(|_| "<unnamed device>".to_string())
        );

        self.pending = Some(PendingStream { device, config });
        Ok(spec)
    }

    fn start(
        &mut self,
        spec: &DeviceSpec,
        _request: &StreamRequest,
        context: StreamContext,
    ) -> Result<Self::Stream, AudioError> {
        let rate = spec.sample_rate;
        let PendingStream { device, config } = self
            .pending
            .take()
            .ok_or_else(|| AudioError::unavailable(rate, "stream started before negotiation"))?;

        let err_fn = |err: cpal::StreamError| error!("Audio stream error: {}", err);

        let stream = match spec.format {
            SampleFormat::I16 => device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| context.fill_i16(data),
                err_fn,
                None,
            ),
            SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| context.fill_f32(data),
                err_fn,
                None,
            ),
        }
        .map_err(|e| AudioError::unavailable(rate, format!("failed to build audio stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::unavailable(rate, format!("failed to play audio stream: {}", e)))?;

        info!("Audio stream started at {}Hz", rate);
        Ok(stream)
    }
}

impl PlaybackStream for cpal::Stream {
    fn pause(&self) -> Result<(), AudioError> {
        StreamTrait::pause(self).map_err(|e| AudioError::Stream(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(format: SampleFormat, channels: u16, min_rate: u32, max_rate: u32) -> ConfigRange {
        ConfigRange {
            channels,
            min_rate,
            max_rate,
            format,
        }
    }

    #[test]
    fn test_prefers_exact_native_config() {
        let ranges = [
            range(SampleFormat::F32, 2, 8000, 192000),
            range(SampleFormat::I16, 2, 8000, 192000),
        ];
        let request = StreamRequest::native(48000, 512);
        assert_eq!(choose_range(&ranges, &request), Some(1));
    }

    #[test]
    fn test_falls_back_to_float_stereo() {
        let ranges = [
            range(SampleFormat::I16, 1, 8000, 192000),
            range(SampleFormat::F32, 2, 44100, 48000),
        ];
        let request = StreamRequest::native(44100, 512);
        assert_eq!(choose_range(&ranges, &request), Some(1));
    }

    #[test]
    fn test_falls_back_to_mono() {
        let ranges = [
            range(SampleFormat::F32, 1, 8000, 96000),
            range(SampleFormat::I16, 1, 8000, 96000),
        ];
        let request = StreamRequest::native(32000, 512);
        assert_eq!(choose_range(&ranges, &request), Some(1));
    }

    #[test]
    fn test_rate_outside_all_ranges() {
        let ranges = [range(SampleFormat::I16, 2, 44100, 48000)];
        let request = StreamRequest::native(32040, 512);
        assert_eq!(choose_range(&ranges, &request), None);
    }

    #[test]
    fn test_multichannel_ranges_are_ignored() {
        let ranges = [range(SampleFormat::I16, 6, 8000, 192000)];
        let request = StreamRequest::native(48000, 512);
        assert_eq!(choose_range(&ranges, &request), None);
    }

    #[test]
    fn test_fixed_buffer_only_inside_supported_range() {
        let supported = cpal::SupportedBufferSize::Range { min: 64, max: 4096 };
        assert_eq!(buffer_size(&supported, 512), cpal::BufferSize::Fixed(512));
        assert_eq!(buffer_size(&supported, 8192), cpal::BufferSize::Default);
        assert_eq!(
            buffer_size(&cpal::SupportedBufferSize::Unknown, 512),
            cpal::BufferSize::Default
        );
    }
}
