//! In-memory device backends for exercising the session engine without
//! audio hardware.

use crate::{
    ActiveStream, AudioBackend, AudioError, BlockCallback, CoreResult, ErrorCallback, LoadedAudio,
    SessionEvent, SessionSettings, StreamFormat,
};

use std::{
    f32::consts::TAU,
    panic::Location,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::Receiver;
use error_location::ErrorLocation;

type Slot<T> = Arc<Mutex<Option<T>>>;

/// Settings with a fast tick so tests stay short.
pub(crate) fn test_settings() -> SessionSettings {
    SessionSettings {
        format: StreamFormat {
            sample_rate: 8_000,
            channels: 2,
        },
        tick_interval: Duration::from_millis(10),
        stop_timeout: Duration::from_secs(2),
        queue_capacity: 1024,
    }
}

/// Backend whose input is fed by the test (or by a tone generator) and whose
/// output renders nothing.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    input: Slot<BlockCallback>,
    input_error: Slot<ErrorCallback>,
    output_error: Slot<ErrorCallback>,
    fail_input: AtomicBool,
    fail_output: AtomicBool,
    tone_hz: Option<f32>,
    burst: Vec<Vec<f32>>,
    close_delay: Duration,
    outputs_opened: AtomicUsize,
    output_halted: Arc<AtomicBool>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Input produces a real-time sine tone once opened.
    pub(crate) fn with_tone(frequency_hz: f32) -> Arc<Self> {
        Arc::new(Self {
            tone_hz: Some(frequency_hz),
            ..Self::default()
        })
    }

    /// Input delivers `blocks` back to back inside `open_input`, before the
    /// writer has taken anything off the queue.
    pub(crate) fn with_burst(blocks: Vec<Vec<f32>>) -> Arc<Self> {
        Arc::new(Self {
            burst: blocks,
            ..Self::default()
        })
    }

    /// Devices take `delay` to close.
    pub(crate) fn slow_close(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            close_delay: delay,
            ..Self::default()
        })
    }

    pub(crate) fn failing_input() -> Arc<Self> {
        let backend = Self::default();
        backend.fail_input.store(true, Ordering::SeqCst);
        Arc::new(backend)
    }

    pub(crate) fn failing_output() -> Arc<Self> {
        let backend = Self::default();
        backend.fail_output.store(true, Ordering::SeqCst);
        Arc::new(backend)
    }

    /// Deliver one block through the device callback. False once closed.
    pub(crate) fn push_block(&self, block: &[f32]) -> bool {
        push_into(&self.input, block)
    }

    /// Report an asynchronous input device failure.
    pub(crate) fn fail_input_stream(&self, reason: &str) {
        if let Some(on_error) = self.input_error.lock().unwrap().as_mut() {
            on_error(reason.to_string());
        }
    }

    /// Report an asynchronous output device failure.
    pub(crate) fn fail_output_stream(&self, reason: &str) {
        if let Some(on_error) = self.output_error.lock().unwrap().as_mut() {
            on_error(reason.to_string());
        }
    }

    pub(crate) fn input_is_open(&self) -> bool {
        self.input.lock().unwrap().is_some()
    }

    pub(crate) fn outputs_opened(&self) -> usize {
        self.outputs_opened.load(Ordering::SeqCst)
    }

    pub(crate) fn output_halted(&self) -> bool {
        self.output_halted.load(Ordering::SeqCst)
    }
}

fn push_into(slot: &Slot<BlockCallback>, block: &[f32]) -> bool {
    match slot.lock().unwrap().as_mut() {
        Some(on_block) => {
            on_block(block);
            true
        }
        None => false,
    }
}

struct ScriptedInput {
    input: Slot<BlockCallback>,
    input_error: Slot<ErrorCallback>,
    generator: Option<(Arc<AtomicBool>, JoinHandle<()>)>,
    close_delay: Duration,
}

impl ActiveStream for ScriptedInput {
    fn close(mut self: Box<Self>) {
        thread::sleep(self.close_delay);
        if let Some((stop, handle)) = self.generator.take() {
            stop.store(true, Ordering::SeqCst);
            let _ = handle.join();
        }
        self.input.lock().unwrap().take();
        self.input_error.lock().unwrap().take();
    }
}

struct ScriptedOutput {
    output_error: Slot<ErrorCallback>,
    halt: Arc<AtomicBool>,
    halted: Arc<AtomicBool>,
    close_delay: Duration,
}

impl ActiveStream for ScriptedOutput {
    fn close(self: Box<Self>) {
        thread::sleep(self.close_delay);
        self.halted
            .store(self.halt.load(Ordering::SeqCst), Ordering::SeqCst);
        self.output_error.lock().unwrap().take();
    }
}

impl AudioBackend for ScriptedBackend {
    #[track_caller]
    fn open_input(
        &self,
        format: StreamFormat,
        on_block: BlockCallback,
        on_error: ErrorCallback,
    ) -> CoreResult<Box<dyn ActiveStream>> {
        if self.fail_input.load(Ordering::SeqCst) {
            return Err(AudioError::DeviceOrFileError {
                reason: "No microphone found".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        *self.input.lock().unwrap() = Some(on_block);
        *self.input_error.lock().unwrap() = Some(on_error);

        for block in &self.burst {
            push_into(&self.input, block);
        }

        let generator = self.tone_hz.map(|hz| {
            let stop = Arc::new(AtomicBool::new(false));
            let handle = spawn_tone(Arc::clone(&self.input), Arc::clone(&stop), format, hz);
            (stop, handle)
        });

        Ok(Box::new(ScriptedInput {
            input: Arc::clone(&self.input),
            input_error: Arc::clone(&self.input_error),
            generator,
            close_delay: self.close_delay,
        }))
    }

    #[track_caller]
    fn open_output(
        &self,
        _audio: Arc<LoadedAudio>,
        halt: Arc<AtomicBool>,
        on_error: ErrorCallback,
    ) -> CoreResult<Box<dyn ActiveStream>> {
        if self.fail_output.load(Ordering::SeqCst) {
            return Err(AudioError::DeviceOrFileError {
                reason: "No output device found".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.outputs_opened.fetch_add(1, Ordering::SeqCst);
        *self.output_error.lock().unwrap() = Some(on_error);

        Ok(Box::new(ScriptedOutput {
            output_error: Arc::clone(&self.output_error),
            halt,
            halted: Arc::clone(&self.output_halted),
            close_delay: self.close_delay,
        }))
    }
}

/// Deliver 10ms sine blocks in real time until `stop` is set.
fn spawn_tone(
    input: Slot<BlockCallback>,
    stop: Arc<AtomicBool>,
    format: StreamFormat,
    frequency_hz: f32,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let frames_per_block = (format.sample_rate / 100) as usize;
        let channels = usize::from(format.channels);
        let block_period = Duration::from_millis(10);
        let started = Instant::now();
        let mut frame_index = 0usize;
        let mut blocks_sent = 0u32;

        while !stop.load(Ordering::SeqCst) {
            let mut block = Vec::with_capacity(frames_per_block * channels);
            for _ in 0..frames_per_block {
                let t = frame_index as f32 / format.sample_rate as f32;
                let value = (TAU * frequency_hz * t).sin() * 0.5;
                block.extend(std::iter::repeat_n(value, channels));
                frame_index += 1;
            }
            push_into(&input, &block);
            blocks_sent += 1;

            let next_due = started + block_period * blocks_sent;
            if let Some(wait) = next_due.checked_duration_since(Instant::now()) {
                thread::sleep(wait);
            }
        }
    })
}

/// Write a float WAV with the given interleaved samples.
pub(crate) fn write_wav(path: &Path, format: StreamFormat, samples: &[f32]) {
    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

/// Write `seconds` of a constant-level stereo file.
pub(crate) fn write_silence(path: &Path, format: StreamFormat, seconds: f32) {
    let frames = (format.sample_rate as f32 * seconds) as usize;
    let samples = vec![0.25f32; frames * usize::from(format.channels)];
    write_wav(path, format, &samples);
}

/// Collect events until a completion arrives or `timeout` passes.
pub(crate) fn collect_until_finished(
    events: &Receiver<SessionEvent>,
    timeout: Duration,
) -> Vec<SessionEvent> {
    let deadline = Instant::now() + timeout;
    let mut collected = Vec::new();

    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match events.recv_timeout(remaining) {
            Ok(event) => {
                let finished = matches!(event, SessionEvent::Finished(_));
                collected.push(event);
                if finished {
                    break;
                }
            }
            Err(_) => break,
        }
    }

    collected
}
