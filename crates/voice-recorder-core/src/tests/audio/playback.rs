use crate::{
    AudioError, CompletionReason, PlaybackStream, SessionEvent, SessionSettings, StreamKind,
    StreamState,
    tests::support::{ScriptedBackend, collect_until_finished, test_settings, write_silence},
};

use std::{
    fs, thread,
    time::{Duration, Instant},
};

use crossbeam_channel::unbounded;
use tempfile::TempDir;

const EVENT_TIMEOUT: Duration = Duration::from_secs(3);

/// WHAT: Progress ticks are monotonic, share one duration, and end at it
/// WHY: The UI draws a progress bar straight from these ticks
#[test]
fn given_short_file_when_playing_to_end_then_monotonic_progress_and_end_of_stream() {
    // Given: A 300ms file
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.wav");
    let settings = test_settings();
    write_silence(&path, settings.format, 0.3);
    let backend = ScriptedBackend::new();
    let (events_tx, events_rx) = unbounded();
    let mut stream = PlaybackStream::new(backend.clone(), events_tx, settings);

    // When: Playing until completion
    stream.start(&path).unwrap();
    let events = collect_until_finished(&events_rx, EVENT_TIMEOUT);

    // Then: Ticks never go backwards, the last one is (duration, duration)
    let duration = stream.duration().unwrap();
    let ticks: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Progress(tick) => Some(*tick),
            SessionEvent::Finished(_) => None,
        })
        .collect();
    assert!(ticks.len() > 2, "Expected several ticks, got {}", ticks.len());
    assert!(ticks.windows(2).all(|w| w[0].elapsed <= w[1].elapsed));
    assert!(ticks.iter().all(|t| t.duration == duration));
    assert!(ticks.iter().all(|t| t.elapsed <= t.duration));
    assert!(ticks.iter().all(|t| t.stream_id == stream.id()));
    assert_eq!(ticks.last().unwrap().elapsed, duration);

    match events.last() {
        Some(SessionEvent::Finished(done)) => {
            assert_eq!(done.kind, StreamKind::Playback);
            assert_eq!(done.reason, CompletionReason::EndOfStream);
            assert_eq!(done.path, path);
        }
        other => panic!("Expected completion, got {:?}", other),
    }
    assert!(!stream.is_running());
    assert_eq!(backend.outputs_opened(), 1);
}

/// WHAT: Stopping mid-file completes with Stopped and silences the device
/// WHY: Stop must cut playback immediately, not at the end of the file
#[test]
fn given_long_file_when_stopping_early_then_stopped_completion() {
    // Given: A 5 second file that is playing
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("long.wav");
    let settings = test_settings();
    write_silence(&path, settings.format, 5.0);
    let backend = ScriptedBackend::new();
    let (events_tx, events_rx) = unbounded();
    let mut stream = PlaybackStream::new(backend.clone(), events_tx, settings);
    stream.start(&path).unwrap();
    thread::sleep(Duration::from_millis(50));

    // When: Stopping
    stream.stop().unwrap();

    // Then: Completion is Stopped, no tick reached the end, output was halted
    let events: Vec<_> = events_rx.try_iter().collect();
    let duration = stream.duration().unwrap();
    assert!(events.iter().all(|event| match event {
        SessionEvent::Progress(tick) => tick.elapsed < duration,
        SessionEvent::Finished(_) => true,
    }));
    match events.last() {
        Some(SessionEvent::Finished(done)) => assert_eq!(done.reason, CompletionReason::Stopped),
        other => panic!("Expected completion, got {:?}", other),
    }
    assert_eq!(stream.state(), StreamState::Stopped);
    assert!(backend.output_halted());
}

/// WHAT: Stopping a stream that never started does nothing
/// WHY: Stop is called defensively from every UI path
#[test]
fn given_idle_stream_when_stopping_then_ok_and_no_events() {
    // Given: A fresh stream
    let backend = ScriptedBackend::new();
    let (events_tx, events_rx) = unbounded();
    let mut stream = PlaybackStream::new(backend, events_tx, test_settings());

    // When: Stopping
    let result = stream.stop();

    // Then: Nothing happens
    assert!(result.is_ok());
    assert_eq!(stream.state(), StreamState::Idle);
    assert!(events_rx.try_recv().is_err());
}

/// WHAT: An unreadable file fails start without opening the device
/// WHY: A broken recording must not leave a silent playback running
#[test]
fn given_unreadable_file_when_starting_then_decode_error_and_no_device() {
    // Given: A corrupt file
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupt.wav");
    fs::write(&path, b"RIFF but not really").unwrap();
    let backend = ScriptedBackend::new();
    let (events_tx, events_rx) = unbounded();
    let mut stream = PlaybackStream::new(backend.clone(), events_tx, test_settings());

    // When: Starting
    let result = stream.start(&path);

    // Then: DecodeError, no output opened, no events
    assert!(matches!(result, Err(AudioError::DecodeError { .. })));
    assert_eq!(backend.outputs_opened(), 0);
    assert_eq!(stream.state(), StreamState::Stopped);
    assert!(events_rx.try_recv().is_err());
}

/// WHAT: A missing output device fails start synchronously
/// WHY: The caller must see device errors as a start error, not an event
#[test]
fn given_no_output_device_when_starting_then_device_error() {
    // Given: A valid file and a backend without speakers
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ok.wav");
    let settings = test_settings();
    write_silence(&path, settings.format, 0.2);
    let backend = ScriptedBackend::failing_output();
    let (events_tx, events_rx) = unbounded();
    let mut stream = PlaybackStream::new(backend, events_tx, settings);

    // When: Starting
    let result = stream.start(&path);

    // Then: DeviceOrFileError and nothing running
    assert!(matches!(result, Err(AudioError::DeviceOrFileError { .. })));
    assert!(!stream.is_running());
    assert!(events_rx.try_recv().is_err());
}

/// WHAT: A device failure while rendering completes playback as failed
/// WHY: Output devices can disappear at any time
#[test]
fn given_playing_stream_when_device_fails_then_failed_completion() {
    // Given: A long file that is playing
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("long.wav");
    let settings = test_settings();
    write_silence(&path, settings.format, 5.0);
    let backend = ScriptedBackend::new();
    let (events_tx, events_rx) = unbounded();
    let mut stream = PlaybackStream::new(backend.clone(), events_tx, settings);
    stream.start(&path).unwrap();

    // When: The output reports an error
    backend.fail_output_stream("headphones removed");
    let events = collect_until_finished(&events_rx, EVENT_TIMEOUT);

    // Then: The completion carries the failure
    match events.last() {
        Some(SessionEvent::Finished(done)) => {
            assert!(done.reason.is_failure());
            assert_eq!(
                done.reason,
                CompletionReason::Failed("headphones removed".to_string())
            );
        }
        other => panic!("Expected completion, got {:?}", other),
    }
    stream.stop().unwrap();
}

/// WHAT: A device that hangs on close makes stop time out but still end Stopped
/// WHY: A wedged driver must not freeze the control thread
#[test]
fn given_device_slow_to_close_when_stopping_then_stop_timeout_and_stopped() {
    // Given: A long file on a device that takes 600ms to close, 100ms bound
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("long.wav");
    let settings = SessionSettings {
        stop_timeout: Duration::from_millis(100),
        ..test_settings()
    };
    write_silence(&path, settings.format, 5.0);
    let backend = ScriptedBackend::slow_close(Duration::from_millis(600));
    let (events_tx, events_rx) = unbounded();
    let mut stream = PlaybackStream::new(backend, events_tx, settings);
    stream.start(&path).unwrap();

    // When: Stopping
    let started = Instant::now();
    let result = stream.stop();
    let waited = started.elapsed();

    // Then: StopTimeout within the bound, stream forced to Stopped
    match result {
        Err(AudioError::StopTimeout { kind, timeout, .. }) => {
            assert_eq!(kind, StreamKind::Playback);
            assert_eq!(timeout, Duration::from_millis(100));
        }
        other => panic!("Expected StopTimeout, got {:?}", other),
    }
    assert!(waited < Duration::from_millis(500), "stop waited {waited:?}");
    assert_eq!(stream.state(), StreamState::Stopped);
    assert!(!stream.is_running());

    // And: A second stop is a no-op, the abandoned worker still reports Stopped
    stream.stop().unwrap();
    let events = collect_until_finished(&events_rx, EVENT_TIMEOUT);
    assert!(matches!(
        events.last(),
        Some(SessionEvent::Finished(done)) if done.reason == CompletionReason::Stopped
    ));
}
