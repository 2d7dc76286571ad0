use crate::audio::Resampler;

// Test constants
const DEVICE_SAMPLE_RATE: u32 = 48000;
const FILE_SAMPLE_RATE: u32 = 44100;
const STEREO: u16 = 2;
const MONO: u16 = 1;
const LEVEL_TOLERANCE: f32 = 0.05;
const TEST_SIGNAL_AMPLITUDE: f32 = 0.5;
const TONE_FREQUENCY_FACTOR: f32 = 0.05;
const MAX_AMPLITUDE: f32 = 1.5;

/// WHAT: Resampler converts a one-second stereo file rate to the device rate
/// WHY: Playback must render at the output device's native rate
#[test]
fn given_44k_stereo_when_resampling_to_48k_then_frame_count_approximately_correct() {
    // Given: Resampler configured for 44.1kHz -> 48kHz stereo
    let mut resampler = Resampler::new(FILE_SAMPLE_RATE, DEVICE_SAMPLE_RATE, STEREO).unwrap();
    let input = vec![TEST_SIGNAL_AMPLITUDE; FILE_SAMPLE_RATE as usize * usize::from(STEREO)];

    // When: Resampling one second of audio
    let output = resampler.resample(&input).unwrap();

    // Then: Output stays interleaved and is exactly one second at 48kHz
    assert_eq!(output.len() % usize::from(STEREO), 0);
    assert_eq!(output.len() / usize::from(STEREO), DEVICE_SAMPLE_RATE as usize);
    assert!(output.iter().all(|&s| s.is_finite()));
}

/// WHAT: A constant signal keeps its level in the middle of the output
/// WHY: The filter delay must be removed, not shift audio later in time
#[test]
fn given_constant_signal_when_resampling_then_level_preserved() {
    // Given: One second of a constant stereo level
    let mut resampler = Resampler::new(FILE_SAMPLE_RATE, DEVICE_SAMPLE_RATE, STEREO).unwrap();
    let input = vec![TEST_SIGNAL_AMPLITUDE; FILE_SAMPLE_RATE as usize * usize::from(STEREO)];

    // When: Resampling
    let output = resampler.resample(&input).unwrap();

    // Then: Samples around the midpoint carry the input level
    let middle = output.len() / 2;
    assert!(
        output[middle - 64..middle + 64]
            .iter()
            .all(|&s| (s - TEST_SIGNAL_AMPLITUDE).abs() < LEVEL_TOLERANCE)
    );
}

/// WHAT: Empty samples return empty output
/// WHY: Zero-length recordings must still be playable
#[test]
fn given_empty_samples_when_resampling_then_empty_output() {
    // Given: Resampler and empty input
    let mut resampler = Resampler::new(DEVICE_SAMPLE_RATE, FILE_SAMPLE_RATE, STEREO).unwrap();
    let empty: Vec<f32> = vec![];

    // When: Resampling empty data
    let output = resampler.resample(&empty).unwrap();

    // Then: Output is also empty
    assert!(output.is_empty());
}

/// WHAT: Resampling a mono tone keeps samples bounded
/// WHY: Playback must not introduce clipping artifacts
#[test]
fn given_mono_tone_when_resampling_then_output_bounded() {
    // Given: Resampler and a short tone
    let mut resampler = Resampler::new(FILE_SAMPLE_RATE, DEVICE_SAMPLE_RATE, MONO).unwrap();
    let input: Vec<f32> = (0..8820)
        .map(|i| (i as f32 * TONE_FREQUENCY_FACTOR).sin() * TEST_SIGNAL_AMPLITUDE)
        .collect();

    // When: Resampling the signal
    let output = resampler.resample(&input).unwrap();

    // Then: Output is non-empty, finite and bounded
    assert!(!output.is_empty());
    assert!(
        output
            .iter()
            .all(|&s| s.is_finite() && s.abs() <= MAX_AMPLITUDE)
    );
}
