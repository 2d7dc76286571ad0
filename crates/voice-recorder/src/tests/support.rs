//! Device backend that records a fixed set of blocks, for exercising the
//! recorder flows without audio hardware.

use std::{
    sync::{Arc, atomic::AtomicBool},
    time::Duration,
};

use chrono::{NaiveDate, NaiveDateTime};
use voice_recorder_core::{
    ActiveStream, AudioBackend, BlockCallback, CoreResult, ErrorCallback, LoadedAudio,
    SessionSettings, StreamFormat,
};

pub(crate) const BLOCKS: usize = 20;
pub(crate) const BLOCK_LEN: usize = 160;

/// 8 kHz stereo with a fast tick; 20 blocks of 160 samples are 200ms.
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

pub(crate) fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 19)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}

/// Input delivers `BLOCKS` sawtooth blocks as soon as it opens; output
/// renders nothing.
pub(crate) struct FixedInputBackend;

impl FixedInputBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

struct NullStream;

impl ActiveStream for NullStream {
    fn close(self: Box<Self>) {}
}

impl AudioBackend for FixedInputBackend {
    fn open_input(
        &self,
        _format: StreamFormat,
        mut on_block: BlockCallback,
        _on_error: ErrorCallback,
    ) -> CoreResult<Box<dyn ActiveStream>> {
        let block: Vec<f32> = (0..BLOCK_LEN).map(|i| (i % 40) as f32 / 40.0 - 0.5).collect();
        for _ in 0..BLOCKS {
            on_block(&block);
        }
        Ok(Box::new(NullStream))
    }

    fn open_output(
        &self,
        _audio: Arc<LoadedAudio>,
        _halt: Arc<AtomicBool>,
        _on_error: ErrorCallback,
    ) -> CoreResult<Box<dyn ActiveStream>> {
        Ok(Box::new(NullStream))
    }
}
