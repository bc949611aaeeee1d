// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The in-progress recording.
//!
//! A session buffers events with their tick deltas until it is closed by a
//! split, an idle timeout, a disconnect or shutdown. Closing writes the take
//! and resets to "no session", so the next fed event starts a new file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::export::{RecordedEvent, RecordingWriter, Take, TrackEvent};
use super::naming::RecordingNamer;
use crate::config::RecordingConfig;
use crate::error::Result;
use crate::midi::MidiMessage;
use crate::timing::{clamp_tempo, seconds_to_ticks, Clock};

/// Why a take was closed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CloseReason {
    /// No events for at least the idle timeout
    Idle(Duration),
    /// Split chord or pause
    Split,
    /// Disconnect or shutdown
    Forced,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Idle(elapsed) => write!(f, "idle {}s", elapsed.as_secs()),
            CloseReason::Split => write!(f, "split"),
            CloseReason::Forced => write!(f, "forced"),
        }
    }
}

/// State of an open take
#[derive(Debug)]
struct ActiveTake {
    path: PathBuf,
    initial_tempo_us: u32,
    tempo_us: u32,
    events: Vec<RecordedEvent>,
    last_event: Instant,
}

/// Owner of the (at most one) open recording
pub struct RecordingSession {
    clock: Arc<dyn Clock>,
    writer: Arc<dyn RecordingWriter>,
    namer: RecordingNamer,
    ticks_per_beat: u16,
    default_tempo_us: u32,
    active: Option<ActiveTake>,
}

impl RecordingSession {
    /// Create a session manager with no open take
    pub fn new(
        config: &RecordingConfig,
        clock: Arc<dyn Clock>,
        writer: Arc<dyn RecordingWriter>,
    ) -> Self {
        Self {
            clock,
            writer,
            namer: RecordingNamer::new(&config.directory, &config.extension),
            ticks_per_beat: config.ticks_per_beat,
            default_tempo_us: config.default_tempo_us,
            active: None,
        }
    }

    /// Whether a take is open
    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Path the open take will be written to
    pub fn current_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|t| t.path.as_path())
    }

    /// Tempo in effect for the next event
    pub fn current_tempo(&self) -> u32 {
        self.active
            .as_ref()
            .map_or(self.default_tempo_us, |t| t.tempo_us)
    }

    /// Number of events appended to the open take
    pub fn event_count(&self) -> usize {
        self.active.as_ref().map_or(0, |t| t.events.len())
    }

    /// Open a new take. No-op if one is already open.
    pub fn start(&mut self) {
        if self.active.is_some() {
            return;
        }

        // The file itself is only created when the take is closed
        if let Err(e) = self.namer.ensure_directory() {
            warn!("Could not create recordings directory: {}", e);
        }

        let path = self.namer.next_path();
        info!("[REC] Started: {}", display_name(&path));
        self.active = Some(ActiveTake {
            path,
            initial_tempo_us: self.default_tempo_us,
            tempo_us: self.default_tempo_us,
            events: Vec::new(),
            last_event: self.clock.now(),
        });
    }

    /// Append an event, opening a take first if none is open.
    ///
    /// A tempo change is timed with the tempo it replaces and takes effect
    /// for the events after it. Out-of-range tempos are clamped to what the
    /// file can store, so later deltas match the tempo written.
    pub fn feed(&mut self, message: MidiMessage) {
        if self.active.is_none() {
            info!("[REC] First activity detected, starting new recording");
            self.start();
        }

        let now = self.clock.now();
        let ticks_per_beat = self.ticks_per_beat;
        let Some(take) = self.active.as_mut() else {
            return;
        };

        let elapsed = now.saturating_duration_since(take.last_event);
        let delta_ticks = seconds_to_ticks(elapsed, take.tempo_us, ticks_per_beat);
        take.last_event = now;

        let (message, new_tempo) = match message {
            MidiMessage::SetTempo { micros_per_beat } => {
                let tempo = clamp_tempo(micros_per_beat);
                (
                    MidiMessage::SetTempo {
                        micros_per_beat: tempo,
                    },
                    Some(tempo),
                )
            }
            other => (other, None),
        };

        take.events.push(RecordedEvent {
            event: TrackEvent::Midi(message),
            delta_ticks,
            tempo_us: take.tempo_us,
        });

        if let Some(tempo) = new_tempo {
            debug!("Tempo change {} -> {} us/beat", take.tempo_us, tempo);
            take.tempo_us = tempo;
        }
    }

    /// Time since the last appended event, or `None` with no open take
    pub fn time_since_last_event(&self) -> Option<Duration> {
        self.active
            .as_ref()
            .map(|t| self.clock.now().saturating_duration_since(t.last_event))
    }

    /// Close the take if it has been idle for at least `threshold`.
    ///
    /// Returns `Ok(true)` when a take was closed. The idle gap becomes the
    /// trailing delta of the file.
    pub fn stop_if_idle(&mut self, threshold: Duration) -> Result<bool> {
        let Some(elapsed) = self.time_since_last_event() else {
            return Ok(false);
        };
        if elapsed < threshold {
            return Ok(false);
        }
        self.finalize(elapsed, CloseReason::Idle(elapsed))?;
        Ok(true)
    }

    /// Close the take now, keeping the gap since the last event.
    pub fn split_now(&mut self) -> Result<Option<PathBuf>> {
        let Some(elapsed) = self.time_since_last_event() else {
            return Ok(None);
        };
        self.finalize(elapsed, CloseReason::Split)
    }

    /// Close the take with no trailing gap. No-op with no open take.
    pub fn force_close(&mut self) -> Result<Option<PathBuf>> {
        self.finalize(Duration::ZERO, CloseReason::Forced)
    }

    /// Append end-of-track, write the file and reset.
    ///
    /// State is reset before the write result is returned, so a failed write
    /// loses that take but never blocks the next one.
    fn finalize(&mut self, trailing: Duration, reason: CloseReason) -> Result<Option<PathBuf>> {
        let Some(mut take) = self.active.take() else {
            return Ok(None);
        };

        take.events.push(RecordedEvent {
            event: TrackEvent::EndOfTrack,
            delta_ticks: seconds_to_ticks(trailing, take.tempo_us, self.ticks_per_beat),
            tempo_us: take.tempo_us,
        });

        let file = Take {
            ticks_per_beat: self.ticks_per_beat,
            initial_tempo_us: take.initial_tempo_us,
            events: take.events,
        };

        self.writer.write(&take.path, &file)?;
        info!("[REC] Closed ({}): {}", reason, display_name(&take.path));
        Ok(Some(take.path))
    }
}

impl fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingSession")
            .field("ticks_per_beat", &self.ticks_per_beat)
            .field("default_tempo_us", &self.default_tempo_us)
            .field("active", &self.active)
            .finish()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
