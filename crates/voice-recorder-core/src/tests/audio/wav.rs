use crate::{AudioError, StreamFormat, audio::wav::WavFileWriter, load_audio, read_audio_header};

use std::{fs, fs::OpenOptions, time::Duration};

use tempfile::TempDir;

const MONO_8K: StreamFormat = StreamFormat {
    sample_rate: 8_000,
    channels: 1,
};
const STEREO_8K: StreamFormat = StreamFormat {
    sample_rate: 8_000,
    channels: 2,
};

/// WHAT: Blocks written through the writer load back sample-for-sample
/// WHY: Float WAV keeps recordings lossless between capture and playback
#[test]
fn given_written_blocks_when_loading_then_samples_match_exactly() {
    // Given: A writer over a freshly created file
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Recording_2026-01-01-13-00-00.wav");
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .unwrap();
    let mut writer = WavFileWriter::new(file, &path, STEREO_8K).unwrap();
    let first: Vec<f32> = (0..64).map(|i| i as f32 / 64.0).collect();
    let second: Vec<f32> = (0..32).map(|i| -(i as f32) / 32.0).collect();

    // When: Writing two blocks and finalizing
    writer.write_block(&first).unwrap();
    writer.write_block(&second).unwrap();
    let handle = writer.finalize().unwrap();

    // Then: The loaded samples are the concatenation of the blocks
    let loaded = load_audio(&path).unwrap();
    let expected: Vec<f32> = first.iter().chain(second.iter()).copied().collect();
    assert_eq!(loaded.samples(), expected.as_slice());
    assert_eq!(handle.frames, 48);
    assert_eq!(loaded.handle(), &handle);
}

/// WHAT: Duration is frames divided by sample rate
/// WHY: Progress reporting uses the file duration as its upper bound
#[test]
fn given_half_second_file_when_reading_header_then_duration_is_half_second() {
    // Given: 4000 mono frames at 8kHz
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("half.wav");
    crate::tests::support::write_wav(&path, MONO_8K, &vec![0.1; 4_000]);

    // When: Reading the header
    let handle = read_audio_header(&path).unwrap();

    // Then: Layout and duration come from the header
    assert_eq!(handle.format, MONO_8K);
    assert_eq!(handle.frames, 4_000);
    assert_eq!(handle.duration(), Duration::from_millis(500));
}

/// WHAT: 16-bit integer files are normalized to the -1.0..1.0 range
/// WHY: Files produced by other tools must still play
#[test]
fn given_int16_file_when_loading_then_samples_normalized() {
    // Given: A 16-bit PCM file with full-scale values
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("int16.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for value in [i16::MIN, 0, 16_384] {
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();

    // When: Loading
    let loaded = load_audio(&path).unwrap();

    // Then: Values are scaled to floats
    assert_eq!(loaded.samples(), &[-1.0, 0.0, 0.5]);
}

/// WHAT: A file that is not WAV fails with DecodeError
/// WHY: Unreadable recordings must be reported without starting playback
#[test]
fn given_garbage_file_when_loading_then_decode_error() {
    // Given: A text file with a .wav name
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.wav");
    fs::write(&path, b"definitely not a riff header").unwrap();

    // When: Loading
    let result = load_audio(&path);

    // Then: DecodeError names the file
    match result {
        Err(AudioError::DecodeError { path: failed, .. }) => assert_eq!(failed, path),
        other => panic!("Expected DecodeError, got {:?}", other),
    }
}

/// WHAT: A missing file fails with DecodeError
/// WHY: Catalog entries may point at files deleted behind our back
#[test]
fn given_missing_file_when_loading_then_decode_error() {
    // Given: A path that does not exist
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gone.wav");

    // When / Then: Loading fails
    assert!(matches!(
        load_audio(&path),
        Err(AudioError::DecodeError { .. })
    ));
}
