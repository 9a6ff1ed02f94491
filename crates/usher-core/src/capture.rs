//! Decoder adapter: turns a live frame source into decoded credential text.
//!
//! The core never inspects pixel data. A [`FrameSource`] hands over raw
//! frame buffers (only ever the most recent one; stale frames are dropped
//! at the source), and a [`FrameDecoder`] is the external capability that
//! turns a frame into text.
//!
//! A [`ScanFeed`] polls on its own thread at a fixed short interval and
//! delivers at most one decoded string per explicit start. Stopping the
//! feed, explicitly or by dropping it, terminates the thread and releases
//! the capture device on every exit path, since the thread owns the source.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// How often the feed examines the latest available frame.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Capture failures, each surfaced once and never retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// No capture device is available.
    #[error("no capture device available")]
    Unavailable,
    /// The operator denied access to the capture device.
    #[error("capture permission denied")]
    PermissionDenied,
    /// The device exists but cannot be used right now.
    #[error("capture device busy or unsupported: {reason}")]
    Busy { reason: String },
}

/// One raw frame from a capture device.
///
/// The buffer is opaque to the core; only the decoder looks inside.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw frame bytes in whatever encoding the source produces.
    pub bytes: Vec<u8>,
    /// When the frame was captured.
    pub captured_at: DateTime<Utc>,
}

/// A live source of camera frames.
///
/// Acquiring the device happens when the source is constructed; dropping
/// the source releases it. `latest_frame` returns only the most recent
/// available frame, or `None` when nothing new is ready yet.
pub trait FrameSource: Send {
    fn latest_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
}

/// External frame-decoding capability.
///
/// Returns the decoded text, or `None` when the frame holds no readable
/// credential.
pub trait FrameDecoder: Send {
    fn decode(&self, frame: &Frame) -> Option<String>;
}

/// What a feed delivers to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A credential was decoded; the feed has stopped.
    Decoded(String),
    /// Capture failed; the feed has stopped. Reported exactly once.
    Failed(CaptureError),
}

/// A single scanning pass: poll, decode once, stop.
///
/// The sequence is restartable in the sense that a fresh feed can be
/// started after this one ends, but one feed never yields more than one
/// decode ("one decode per explicit start").
pub struct ScanFeed {
    events: Receiver<FeedEvent>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ScanFeed {
    /// Starts polling the source on a background thread.
    #[must_use]
    pub fn start<S, D>(mut source: S, decoder: D) -> Self
    where
        S: FrameSource + 'static,
        D: FrameDecoder + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        // Capacity 1: the feed sends at most one event before exiting.
        let (tx, rx) = mpsc::sync_channel(1);

        let worker = std::thread::spawn(move || {
            run_feed(&mut source, &decoder, &tx, &stop_flag);
            // Thread exit drops the source, releasing the capture device.
        });

        Self {
            events: rx,
            stop,
            worker: Some(worker),
        }
    }

    /// Waits up to `timeout` for the feed's single event.
    ///
    /// Returns `None` on timeout or if the feed was stopped without
    /// producing anything.
    pub fn next_event(&self, timeout: Duration) -> Option<FeedEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Stops the feed and releases the capture device.
    ///
    /// Idempotent; also performed on drop.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("scan feed worker panicked");
            }
        }
    }
}

impl Drop for ScanFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_feed<S: FrameSource, D: FrameDecoder>(
    source: &mut S,
    decoder: &D,
    tx: &SyncSender<FeedEvent>,
    stop: &AtomicBool,
) {
    loop {
        if stop.load(Ordering::Acquire) {
            return;
        }
        match source.latest_frame() {
            Err(error) => {
                tracing::debug!(%error, "capture failed, stopping feed");
                let _ = tx.send(FeedEvent::Failed(error));
                return;
            }
            Ok(Some(frame)) => {
                if let Some(text) = decoder.decode(&frame) {
                    tracing::debug!(captured_at = %frame.captured_at, "frame decoded");
                    let _ = tx.send(FeedEvent::Decoded(text));
                    return;
                }
            }
            Ok(None) => {}
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
