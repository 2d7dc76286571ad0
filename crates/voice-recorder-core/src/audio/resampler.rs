use crate::{AudioError, CoreResult};

use std::panic::Location;

use audioadapter_buffers::direct::InterleavedSlice;
use error_location::ErrorLocation;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};
use tracing::{debug, instrument};

/// Converts a whole interleaved buffer from one sample rate to another.
///
/// Used once per playback when the output device cannot run at the file's
/// native rate.
pub struct Resampler {
    resampler: Fft<f32>,
    input_rate: u32,
    output_rate: u32,
    channels: usize,
    chunk_size: usize,
}

impl Resampler {
    #[track_caller]
    #[instrument]
    pub fn new(input_rate: u32, output_rate: u32, channels: u16) -> CoreResult<Self> {
        let chunk_size = 1024;
        let sub_chunks = 2;
        let channels = usize::from(channels.max(1));

        let resampler = Fft::<f32>::new(
            input_rate as usize,
            output_rate as usize,
            chunk_size,
            sub_chunks,
            channels,
            FixedSync::Input,
        )
        .map_err(|e| AudioError::ResamplingError {
            reason: format!("Failed to create resampler: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        debug!(
            input_rate = input_rate,
            output_rate = output_rate,
            channels = channels,
            "Resampler initialized"
        );

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            channels,
            chunk_size,
        })
    }

    /// Resample interleaved `samples`, returning interleaved output.
    ///
    /// The filter delay is removed and the tail flushed, so the output is
    /// aligned with the input and has the length implied by the rate ratio.
    #[track_caller]
    #[instrument(skip(self, samples))]
    pub fn resample(&mut self, samples: &[f32]) -> CoreResult<Vec<f32>> {
        let channels = self.channels;
        let input_frames = samples.len() / channels;
        if input_frames == 0 {
            return Ok(Vec::new());
        }
        let samples = &samples[..input_frames * channels];

        let expected_frames = (input_frames as u64 * u64::from(self.output_rate)
            / u64::from(self.input_rate)) as usize;
        let delay = self.resampler.output_delay();
        let wanted = (expected_frames + delay) * channels;

        let mut output = Vec::with_capacity(wanted);
        let mut chunk = vec![0.0f32; self.chunk_size * channels];
        let mut produced = vec![0.0f32; self.resampler.output_frames_max() * channels];
        let mut offset = 0;

        // Past the end of the input, zero chunks push the delayed tail out.
        while output.len() < wanted {
            let take = (samples.len() - offset).min(chunk.len());
            chunk[..take].copy_from_slice(&samples[offset..offset + take]);
            chunk[take..].fill(0.0);
            offset += take;

            let frames = self.process_chunk(&chunk, &mut produced)?;
            if frames == 0 {
                break;
            }
            output.extend_from_slice(&produced[..frames * channels]);
        }

        output.drain(..(delay * channels).min(output.len()));
        output.truncate(expected_frames * channels);

        debug!(
            input_frames,
            output_frames = output.len() / channels,
            delay_frames = delay,
            "Resampled audio"
        );

        Ok(output)
    }

    /// Run one full input chunk; returns the number of frames written.
    #[track_caller]
    fn process_chunk(&mut self, chunk: &[f32], produced: &mut [f32]) -> CoreResult<usize> {
        let input = InterleavedSlice::new(chunk, self.channels, self.chunk_size).map_err(|e| {
            AudioError::ResamplingError {
                reason: format!("Invalid input chunk: {}", e),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let capacity = produced.len() / self.channels;
        let mut output = InterleavedSlice::new_mut(produced, self.channels, capacity).map_err(
            |e| AudioError::ResamplingError {
                reason: format!("Invalid output buffer: {}", e),
                location: ErrorLocation::from(Location::caller()),
            },
        )?;

        let (_, frames) = self
            .resampler
            .process_into_buffer(&input, &mut output, None)
            .map_err(|e| AudioError::ResamplingError {
                reason: format!("Resampling failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(frames)
    }
}
