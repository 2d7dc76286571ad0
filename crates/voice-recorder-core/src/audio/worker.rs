use crate::{AudioError, CoreResult, audio::StreamKind};

use std::{
    panic::Location,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use error_location::ErrorLocation;
use tracing::{debug, error};

/// A dedicated stream thread that can be joined with a bound.
///
/// The thread owns the sending half of a zero-capacity channel that is never
/// written to. When the thread exits (normally or by unwinding) the sender
/// drops, which is what `join` waits on with a timeout before the real join.
pub(crate) struct Worker {
    handle: JoinHandle<()>,
    exited: Receiver<()>,
    kind: StreamKind,
}

impl Worker {
    #[track_caller]
    pub(crate) fn spawn<F>(kind: StreamKind, name: &str, body: F) -> CoreResult<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let (exit_guard, exited) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _exit_guard = exit_guard;
                body();
            })
            .map_err(|e| AudioError::DeviceOrFileError {
                reason: format!("Failed to spawn {} worker: {}", kind, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(Self {
            handle,
            exited,
            kind,
        })
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait up to `timeout` for the thread to exit, then join it.
    ///
    /// On timeout the thread is abandoned (detached) and `StopTimeout` is
    /// returned; the caller must treat the stream as stopped.
    #[track_caller]
    pub(crate) fn join(self, timeout: Duration) -> CoreResult<()> {
        match self.exited.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                error!(kind = %self.kind, timeout_ms = timeout.as_millis(), "Worker did not stop in time");
                Err(AudioError::StopTimeout {
                    kind: self.kind,
                    timeout,
                    location: ErrorLocation::from(Location::caller()),
                })
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                self.handle
                    .join()
                    .map_err(|_| AudioError::DeviceOrFileError {
                        reason: format!("{} worker panicked", self.kind),
                        location: ErrorLocation::from(Location::caller()),
                    })?;
                debug!(kind = %self.kind, "Worker joined");
                Ok(())
            }
        }
    }
}
