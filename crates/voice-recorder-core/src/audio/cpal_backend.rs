use crate::{
    AudioError, CoreResult,
    audio::{
        ActiveStream, AudioBackend, BlockCallback, ErrorCallback, LoadedAudio, Resampler,
        StreamFormat,
    },
};

use std::{
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use cpal::{
    BufferSize, Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig,
    SupportedStreamConfigRange,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument};

/// Default-device backend built on CPAL.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl CpalBackend {
    /// Create a backend that uses the host's default input and output devices.
    pub fn new() -> Self {
        Self
    }
}

/// Open CPAL stream; dropping it stops the device and its callbacks.
struct CpalStream {
    stream: Stream,
}

impl ActiveStream for CpalStream {
    fn close(self: Box<Self>) {
        if let Err(e) = self.stream.pause() {
            debug!(error = %e, "Failed to pause stream before closing");
        }
        drop(self.stream);
    }
}

impl AudioBackend for CpalBackend {
    #[track_caller]
    #[instrument(skip(self, on_block, on_error))]
    fn open_input(
        &self,
        format: StreamFormat,
        on_block: BlockCallback,
        on_error: ErrorCallback,
    ) -> CoreResult<Box<dyn ActiveStream>> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceOrFileError {
                reason: "No microphone found".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let sample_format = supported_input_format(&device, format)?;

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: format.sample_rate,
            buffer_size: BufferSize::Default,
        };

        let stream = match sample_format {
            SampleFormat::F32 => build_input::<f32>(&device, &config, on_block, on_error)?,
            SampleFormat::I16 => build_input::<i16>(&device, &config, on_block, on_error)?,
            SampleFormat::U16 => build_input::<u16>(&device, &config, on_block, on_error)?,
            other => {
                return Err(AudioError::DeviceOrFileError {
                    reason: format!("Unsupported input sample format: {:?}", other),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        stream.play().map_err(|e| AudioError::DeviceOrFileError {
            reason: format!("Failed to start input stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(
            device_id = ?device.id(),
            sample_rate = format.sample_rate,
            channels = format.channels,
            "Input device opened"
        );

        Ok(Box::new(CpalStream { stream }))
    }

    #[track_caller]
    #[instrument(skip(self, audio, halt, on_error))]
    fn open_output(
        &self,
        audio: Arc<LoadedAudio>,
        halt: Arc<AtomicBool>,
        on_error: ErrorCallback,
    ) -> CoreResult<Box<dyn ActiveStream>> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceOrFileError {
                reason: "No output device found".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceOrFileError {
                reason: format!("Failed to get output config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let file_format = audio.format();
        let device_rate = supported.sample_rate();

        // Resample once up front; the callback only copies.
        let samples: Arc<[f32]> = if device_rate != file_format.sample_rate {
            let mut resampler =
                Resampler::new(file_format.sample_rate, device_rate, file_format.channels)?;
            Arc::from(resampler.resample(audio.samples())?)
        } else {
            audio.shared_samples()
        };

        let config = StreamConfig {
            channels: file_format.channels,
            sample_rate: device_rate,
            buffer_size: BufferSize::Default,
        };

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_output::<f32>(&device, &config, samples, halt, on_error)?,
            SampleFormat::I16 => build_output::<i16>(&device, &config, samples, halt, on_error)?,
            SampleFormat::U16 => build_output::<u16>(&device, &config, samples, halt, on_error)?,
            other => {
                return Err(AudioError::DeviceOrFileError {
                    reason: format!("Unsupported output sample format: {:?}", other),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        stream.play().map_err(|e| AudioError::DeviceOrFileError {
            reason: format!("Failed to start output stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(
            device_id = ?device.id(),
            file_rate = file_format.sample_rate,
            device_rate = device_rate,
            channels = file_format.channels,
            "Output device opened"
        );

        Ok(Box::new(CpalStream { stream }))
    }
}

#[track_caller]
fn supported_input_format(device: &Device, format: StreamFormat) -> CoreResult<SampleFormat> {
    let ranges = device
        .supported_input_configs()
        .map_err(|e| AudioError::DeviceOrFileError {
            reason: format!("Failed to query input configs: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    pick_input_format(ranges, format)
}

/// Sample format of a config range covering `format`, preferring F32.
///
/// # Errors
///
/// `DeviceOrFileError` naming the requested rate and channel count when no
/// range covers them.
#[track_caller]
pub(crate) fn pick_input_format<I>(ranges: I, format: StreamFormat) -> CoreResult<SampleFormat>
where
    I: IntoIterator<Item = SupportedStreamConfigRange>,
{
    let matching: Vec<SampleFormat> = ranges
        .into_iter()
        .filter(|range| {
            range.channels() == format.channels
                && range.min_sample_rate() <= format.sample_rate
                && format.sample_rate <= range.max_sample_rate()
        })
        .map(|range| range.sample_format())
        .collect();

    matching
        .iter()
        .copied()
        .find(|f| *f == SampleFormat::F32)
        .or_else(|| matching.first().copied())
        .ok_or_else(|| AudioError::DeviceOrFileError {
            reason: format!(
                "Input device does not support {} Hz with {} channel(s); \
                 change [audio] sample_rate/channels in the config",
                format.sample_rate, format.channels
            ),
            location: ErrorLocation::from(Location::caller()),
        })
}

#[track_caller]
fn build_input<T>(
    device: &Device,
    config: &StreamConfig,
    mut on_block: BlockCallback,
    mut on_error: ErrorCallback,
) -> CoreResult<Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    // Reused between callbacks; only grows when the device buffer does.
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                scratch.clear();
                scratch.extend(data.iter().map(|&s| f32::from_sample(s)));
                on_block(&scratch);
            },
            move |err| {
                error!("Audio input stream error: {}", err);
                on_error(err.to_string());
            },
            None,
        )
        .map_err(|e| AudioError::DeviceOrFileError {
            reason: format!("Failed to build input stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
}

#[track_caller]
fn build_output<T>(
    device: &Device,
    config: &StreamConfig,
    samples: Arc<[f32]>,
    halt: Arc<AtomicBool>,
    mut on_error: ErrorCallback,
) -> CoreResult<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut cursor = 0usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if halt.load(Ordering::Acquire) {
                    data.fill(T::EQUILIBRIUM);
                    return;
                }
                for slot in data.iter_mut() {
                    let value = samples.get(cursor).copied().unwrap_or(0.0);
                    cursor = (cursor + 1).min(samples.len());
                    *slot = T::from_sample(value);
                }
            },
            move |err| {
                error!("Audio output stream error: {}", err);
                on_error(err.to_string());
            },
            None,
        )
        .map_err(|e| AudioError::DeviceOrFileError {
            reason: format!("Failed to build output stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
}
