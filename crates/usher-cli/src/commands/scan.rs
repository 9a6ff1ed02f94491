//! Interactive scan session command.
//!
//! Binds one scan session to one event. With `--frames` and `--decoder`,
//! each round starts a capture feed: a capture tool drops frames into the
//! directory, the newest file is treated as the latest available frame, and
//! the external decoder command turns it into credential text. Manual entry
//! feeds the same single-flight pipeline, so camera and keyboard input
//! cannot race each other.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result, bail};
use chrono::Utc;

use usher_core::capture::{CaptureError, FeedEvent, Frame, FrameDecoder, FrameSource, ScanFeed};
use usher_core::checkin::{CheckInError, ScanOutcome, ScanResult};
use usher_core::credential::Credential;
use usher_core::session::ScanSession;
use usher_core::types::{EventId, OrganizerId};
use usher_db::Database;

/// How long one feed start waits for a decode before giving up.
const FEED_TIMEOUT: Duration = Duration::from_secs(10);

pub fn run<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    db: &mut Database,
    organizer: &OrganizerId,
    event: &str,
    frames: Option<&Path>,
    decoder: Option<&str>,
) -> Result<()> {
    let event = EventId::new(event)?;
    let mut session = match ScanSession::start(db, event.clone(), organizer.clone()) {
        Ok(session) => session,
        Err(CheckInError::Unauthorized) => bail!("event {event} not found for this organizer"),
        Err(error) => return Err(error).context("could not open scan session"),
    };

    let tally = session.tally();
    writeln!(output, "Scanning for event {event}")?;
    writeln!(output, "Checked in: {} of {}", tally.checked_in, tally.total)?;

    let mut camera = frames.zip(decoder);
    loop {
        if camera.is_some() {
            writeln!(output, "Press Enter to scan, type a credential, or 'q' to quit")?;
        } else {
            writeln!(output, "Enter credential, or 'q' to quit")?;
        }
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line == "q" {
            break;
        }

        let decoded = if line.is_empty() {
            let Some((frames_dir, decoder_cmd)) = camera else {
                continue;
            };
            match scan_once(frames_dir, decoder_cmd) {
                Some(FeedEvent::Decoded(text)) => text,
                Some(FeedEvent::Failed(error)) => {
                    // Reported once; manual entry stays available.
                    writeln!(output, "Capture failed: {error}")?;
                    writeln!(output, "Falling back to manual entry.")?;
                    camera = None;
                    continue;
                }
                None => {
                    writeln!(output, "No credential detected")?;
                    continue;
                }
            }
        } else {
            line.to_string()
        };

        let credential = match Credential::new(decoded) {
            Ok(credential) => credential,
            Err(error) => {
                writeln!(output, "Ignoring scan: {error}")?;
                continue;
            }
        };

        match session.process(credential) {
            Ok(outcome) => report(output, &outcome)?,
            Err(CheckInError::Unauthorized) => {
                bail!("event {event} not found for this organizer");
            }
            Err(error @ CheckInError::Storage(_)) => {
                writeln!(output, "Transient storage error, scan again: {error}")?;
            }
        }
        let tally = session.tally();
        writeln!(output, "Checked in: {} of {}", tally.checked_in, tally.total)?;
    }

    let history: Vec<&ScanOutcome> = session.history().collect();
    if !history.is_empty() {
        writeln!(output, "Recent scans (newest first):")?;
        for outcome in history {
            let name = outcome
                .registration
                .as_ref()
                .map_or("unknown", |r| r.name.as_str());
            writeln!(
                output,
                "  {} {} {}",
                outcome.at.to_rfc3339(),
                outcome.result,
                if outcome.result == ScanResult::NotFound {
                    outcome.credential.as_str()
                } else {
                    name
                },
            )?;
        }
    }
    Ok(())
}

/// One explicit feed start: poll, decode at most once, release the source.
fn scan_once(frames_dir: &Path, decoder_cmd: &str) -> Option<FeedEvent> {
    let source = DirFrameSource::new(frames_dir.to_path_buf());
    let decoder = CommandDecoder::new(decoder_cmd);
    let feed = ScanFeed::start(source, decoder);
    feed.next_event(FEED_TIMEOUT)
    // Dropping the feed stops the worker and releases the source.
}

fn report<W: Write>(output: &mut W, outcome: &ScanOutcome) -> Result<()> {
    match outcome.result {
        ScanResult::Success => {
            let name = outcome
                .registration
                .as_ref()
                .map_or("unknown", |r| r.name.as_str());
            writeln!(output, "[OK] {name} checked in")?;
        }
        ScanResult::Duplicate => {
            let name = outcome
                .registration
                .as_ref()
                .map_or("unknown", |r| r.name.as_str());
            let at = outcome
                .registration
                .as_ref()
                .and_then(|r| r.checked_in_at)
                .map_or_else(|| "unknown time".to_string(), |t| t.to_rfc3339());
            writeln!(output, "[DUP] {name} already checked in at {at}")?;
        }
        ScanResult::NotFound => {
            writeln!(
                output,
                "[??] no registration matches {}",
                outcome.credential
            )?;
        }
    }
    Ok(())
}

/// Frame source backed by a directory a capture tool writes frames into.
///
/// Only the newest file is ever examined; older frames are simply never
/// read, which is this source's way of dropping stale frames.
struct DirFrameSource {
    dir: PathBuf,
}

impl DirFrameSource {
    const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl FrameSource for DirFrameSource {
    fn latest_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let entries = std::fs::read_dir(&self.dir).map_err(map_io)?;
        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for entry in entries {
            let entry = entry.map_err(map_io)?;
            let metadata = entry.metadata().map_err(map_io)?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().map_err(map_io)?;
            if newest.as_ref().is_none_or(|(seen, _)| modified > *seen) {
                newest = Some((modified, entry.path()));
            }
        }
        let Some((_, path)) = newest else {
            return Ok(None);
        };
        let bytes = std::fs::read(&path).map_err(map_io)?;
        Ok(Some(Frame {
            bytes,
            captured_at: Utc::now(),
        }))
    }
}

fn map_io(error: std::io::Error) -> CaptureError {
    match error.kind() {
        std::io::ErrorKind::NotFound => CaptureError::Unavailable,
        std::io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
        _ => CaptureError::Busy {
            reason: error.to_string(),
        },
    }
}

/// External decoder command: frame bytes on stdin, decoded text on stdout.
struct CommandDecoder {
    program: String,
    args: Vec<String>,
}

impl CommandDecoder {
    fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            args: parts.collect(),
        }
    }
}

impl FrameDecoder for CommandDecoder {
    fn decode(&self, frame: &Frame) -> Option<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .ok()?;
        {
            let mut stdin = child.stdin.take()?;
            stdin.write_all(&frame.bytes).ok()?;
        }
        let decoded = child.wait_with_output().ok()?;
        if !decoded.status.success() {
            return None;
        }
        let text = String::from_utf8(decoded.stdout).ok()?;
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}
