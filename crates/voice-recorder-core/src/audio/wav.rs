//! WAV container I/O.
//!
//! Recordings are written as 32-bit IEEE float WAV so the `f32` blocks the
//! engine moves around land on disk without quantization. The loader also
//! accepts integer PCM files and normalizes them to `f32`.

use crate::{AudioError, CoreResult, audio::StreamFormat};

use std::{
    fs::File,
    io::BufWriter,
    panic::Location,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use error_location::ErrorLocation;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::{debug, info, instrument};

/// A PCM file on disk and its layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFileHandle {
    /// Location of the file.
    pub path: PathBuf,
    /// Sample rate and channel count.
    pub format: StreamFormat,
    /// Number of complete frames in the file.
    pub frames: u64,
}

impl AudioFileHandle {
    /// Playback length of the file.
    pub fn duration(&self) -> Duration {
        self.format.frames_to_duration(self.frames)
    }
}

/// A fully decoded file, shared between the playback worker and the device.
#[derive(Debug, Clone)]
pub struct LoadedAudio {
    handle: AudioFileHandle,
    samples: Arc<[f32]>,
}

impl LoadedAudio {
    /// Header information of the decoded file.
    pub fn handle(&self) -> &AudioFileHandle {
        &self.handle
    }

    /// Sample rate and channel count.
    pub fn format(&self) -> StreamFormat {
        self.handle.format
    }

    /// Playback length.
    pub fn duration(&self) -> Duration {
        self.handle.duration()
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Cheap shared handle to the interleaved samples.
    pub fn shared_samples(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }
}

/// Sequential writer for a freshly created recording.
pub(crate) struct WavFileWriter {
    writer: WavWriter<BufWriter<File>>,
    path: PathBuf,
    format: StreamFormat,
    samples_written: u64,
}

impl WavFileWriter {
    /// Wrap an already exclusively-created file.
    #[track_caller]
    pub(crate) fn new(file: File, path: &Path, format: StreamFormat) -> CoreResult<Self> {
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let writer = WavWriter::new(BufWriter::new(file), spec).map_err(|e| {
            AudioError::DeviceOrFileError {
                reason: format!("Failed to write WAV header to {:?}: {}", path, e),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            format,
            samples_written: 0,
        })
    }

    #[track_caller]
    pub(crate) fn write_block(&mut self, block: &[f32]) -> CoreResult<()> {
        for &sample in block {
            self.writer
                .write_sample(sample)
                .map_err(|e| AudioError::DeviceOrFileError {
                    reason: format!("Failed to write sample to {:?}: {}", self.path, e),
                    location: ErrorLocation::from(Location::caller()),
                })?;
        }
        self.samples_written += block.len() as u64;
        Ok(())
    }

    /// Patch the header and close the file.
    #[track_caller]
    pub(crate) fn finalize(self) -> CoreResult<AudioFileHandle> {
        let Self {
            writer,
            path,
            format,
            samples_written,
        } = self;

        writer
            .finalize()
            .map_err(|e| AudioError::DeviceOrFileError {
                reason: format!("Failed to finalize {:?}: {}", path, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let frames = samples_written / u64::from(format.channels.max(1));
        debug!(path = ?path, frames, "WAV finalized");

        Ok(AudioFileHandle {
            path,
            format,
            frames,
        })
    }
}

/// Read only the header of a WAV file.
#[track_caller]
#[instrument]
pub fn read_header(path: &Path) -> CoreResult<AudioFileHandle> {
    let reader = open_reader(path)?;
    let spec = reader.spec();

    Ok(AudioFileHandle {
        path: path.to_path_buf(),
        format: StreamFormat {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        },
        frames: u64::from(reader.duration()),
    })
}

/// Decode an entire WAV file into memory.
#[track_caller]
#[instrument]
pub fn load(path: &Path) -> CoreResult<LoadedAudio> {
    let reader = open_reader(path)?;
    let spec = reader.spec();

    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(AudioError::DecodeError {
            path: path.to_path_buf(),
            reason: format!(
                "Invalid layout: {} Hz, {} channels",
                spec.sample_rate, spec.channels
            ),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let decode_err = |e: hound::Error| AudioError::DecodeError {
        path: path.to_path_buf(),
        reason: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    };

    let mut samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(decode_err)?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(decode_err)?
        }
    };

    // Drop a trailing partial frame so frame math stays exact.
    let channels = usize::from(spec.channels);
    samples.truncate(samples.len() - samples.len() % channels);

    let handle = AudioFileHandle {
        path: path.to_path_buf(),
        format: StreamFormat {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        },
        frames: (samples.len() / channels) as u64,
    };

    info!(
        path = ?path,
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        duration_ms = handle.duration().as_millis(),
        "Audio file loaded"
    );

    Ok(LoadedAudio {
        handle,
        samples: Arc::from(samples),
    })
}

#[track_caller]
fn open_reader(path: &Path) -> CoreResult<WavReader<std::io::BufReader<File>>> {
    WavReader::open(path).map_err(|e| AudioError::DecodeError {
        path: path.to_path_buf(),
        reason: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}
