//! Replays a recorded signal stream into a pair of sources.
//!
//! Input is JSON Lines, one event per line:
//!
//! ```text
//! {"type":"screen","kind":"off","at":0}
//! {"type":"motion","z":21.4,"at":350}
//! ```
//!
//! `at` may be omitted, in which case the event is stamped with the replay
//! clock when the line is read. This lets a live device log be piped in.
//! Blank lines and lines starting with `#` are skipped.

use super::types::{MotionSample, ScreenToggleEvent, ScreenToggleKind, SignalEvent};
use super::{ManualSource, SourceError};
use crate::clock::{Clock, MonotonicClock, Timestamp};
use serde::Deserialize;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Longest single sleep while pacing, so `stop` is noticed promptly.
const PACE_SLICE: Duration = Duration::from_millis(50);

/// Counters for one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Non-blank, non-comment lines read
    pub lines: u64,
    /// Events handed to a subscriber
    pub delivered: u64,
    /// Events read while nobody was subscribed
    pub dropped: u64,
    /// Lines that did not parse
    pub malformed: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ReplayLine {
    Screen {
        kind: ScreenToggleKind,
        at: Option<Timestamp>,
    },
    Motion {
        #[serde(alias = "z_axis_acceleration")]
        z: f64,
        at: Option<Timestamp>,
    },
}

fn parse_line(line: &str, clock: &dyn Clock) -> Result<SignalEvent, serde_json::Error> {
    let parsed: ReplayLine = serde_json::from_str(line)?;
    Ok(match parsed {
        ReplayLine::Screen { kind, at } => SignalEvent::Screen(ScreenToggleEvent::new(
            kind,
            at.unwrap_or_else(|| clock.now_ms()),
        )),
        ReplayLine::Motion { z, at } => {
            SignalEvent::Motion(MotionSample::new(z, at.unwrap_or_else(|| clock.now_ms())))
        }
    })
}

/// Feeds a recorded stream into a screen source and a motion source from a
/// background thread.
pub struct ReplaySource {
    screen: Arc<ManualSource<ScreenToggleEvent>>,
    motion: Arc<ManualSource<MotionSample>>,
    clock: Arc<dyn Clock>,
    realtime: bool,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<ReplayStats>>,
    last_stats: Option<ReplayStats>,
}

impl ReplaySource {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            screen: Arc::new(ManualSource::new("screen-replay")),
            motion: Arc::new(ManualSource::new("motion-replay")),
            clock,
            realtime: false,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            last_stats: None,
        }
    }

    /// Sleep between events according to their timestamps.
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// The source screen-toggle subscribers attach to.
    pub fn screen_source(&self) -> Arc<ManualSource<ScreenToggleEvent>> {
        self.screen.clone()
    }

    /// The source motion-sample subscribers attach to.
    pub fn motion_source(&self) -> Arc<ManualSource<MotionSample>> {
        self.motion.clone()
    }

    /// Start replaying `reader` in a background thread.
    pub fn start<R>(&mut self, reader: R) -> Result<(), SourceError>
    where
        R: BufRead + Send + 'static,
    {
        if self.running.load(Ordering::SeqCst) {
            return Err(SourceError::AlreadyRunning);
        }
        // Each run gets its own flag. A thread detached by `stop` keeps the
        // old one, so it can never emit into or end a later run.
        let running = Arc::new(AtomicBool::new(true));
        self.running = running.clone();
        self.last_stats = None;

        let screen = self.screen.clone();
        let motion = self.motion.clone();
        let clock = self.clock.clone();
        let realtime = self.realtime;

        let handle = thread::Builder::new()
            .name("panic-gesture-replay".into())
            .spawn(move || {
                let stats = run_replay(reader, &screen, &motion, clock.as_ref(), realtime, &running);
                running.store(false, Ordering::SeqCst);
                stats
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                SourceError::Io(e.to_string())
            })?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Check if the replay thread is still reading.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Block until the stream is exhausted and return its counters.
    pub fn wait(&mut self) -> Option<ReplayStats> {
        if let Some(handle) = self.thread_handle.take() {
            match handle.join() {
                Ok(stats) => self.last_stats = Some(stats),
                Err(_) => tracing::error!("replay thread panicked"),
            }
        }
        self.last_stats
    }

    /// Stop replaying.
    ///
    /// A thread blocked reading its input (e.g. an idle stdin) is detached
    /// rather than joined; it exits at its next line without emitting.
    pub fn stop(&mut self) -> Option<ReplayStats> {
        self.running.store(false, Ordering::SeqCst);
        let finished = self.thread_handle.as_ref().map(JoinHandle::is_finished);
        match finished {
            Some(true) => self.wait(),
            Some(false) => {
                self.thread_handle = None;
                self.last_stats
            }
            None => self.last_stats,
        }
    }
}

impl Default for ReplaySource {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_replay<R: BufRead>(
    reader: R,
    screen: &ManualSource<ScreenToggleEvent>,
    motion: &ManualSource<MotionSample>,
    clock: &dyn Clock,
    realtime: bool,
    running: &AtomicBool,
) -> ReplayStats {
    let mut stats = ReplayStats::default();
    let mut previous_at: Option<Timestamp> = None;

    for line in reader.lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("replay input failed: {e}");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        stats.lines += 1;

        let event = match parse_line(trimmed, clock) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(line = stats.lines, "skipping malformed replay line: {e}");
                stats.malformed += 1;
                continue;
            }
        };

        if realtime {
            if let Some(previous) = previous_at {
                pace(event.timestamp().saturating_sub(previous), running);
            }
            if !running.load(Ordering::SeqCst) {
                break;
            }
        }
        previous_at = Some(event.timestamp());

        let delivered = match event {
            SignalEvent::Screen(e) => screen.emit(e),
            SignalEvent::Motion(s) => motion.emit(s),
        };
        if delivered {
            stats.delivered += 1;
        } else {
            stats.dropped += 1;
        }
    }

    tracing::debug!(
        lines = stats.lines,
        delivered = stats.delivered,
        malformed = stats.malformed,
        "replay finished"
    );
    stats
}

fn pace(gap_ms: i64, running: &AtomicBool) {
    let mut remaining = Duration::from_millis(gap_ms.max(0) as u64);
    while !remaining.is_zero() && running.load(Ordering::SeqCst) {
        let slice = remaining.min(PACE_SLICE);
        thread::sleep(slice);
        remaining -= slice;
    }
}
