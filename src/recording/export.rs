// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Standard MIDI file export.
//!
//! Writes a finished take as a format 1 file with a single track. The file
//! is written next to its destination with a `.tmp` suffix and renamed into
//! place, so a failed write never leaves a partial file at the final path.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{RecorderError, Result};
use crate::midi::{encode_vlq, messages, MidiMessage};

/// An event stored in a take
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEvent {
    /// A message received from the device
    Midi(MidiMessage),
    /// Marks the end of the take
    EndOfTrack,
}

impl TrackEvent {
    fn to_smf_bytes(&self) -> Option<Vec<u8>> {
        match self {
            TrackEvent::Midi(msg) => msg.to_smf_bytes(),
            TrackEvent::EndOfTrack => Some(vec![messages::META, messages::META_END_OF_TRACK, 0x00]),
        }
    }
}

/// One appended event with its delta from the previous one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// The event
    pub event: TrackEvent,
    /// Ticks since the previous event (or since the take started)
    pub delta_ticks: u32,
    /// Tempo in effect when the delta was computed
    pub tempo_us: u32,
}

/// A finished take, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Take {
    /// Ticks per beat (file header division)
    pub ticks_per_beat: u16,
    /// Tempo at tick 0
    pub initial_tempo_us: u32,
    /// Events in arrival order
    pub events: Vec<RecordedEvent>,
}

/// Serializer for finished takes.
///
/// Implementations must be atomic from the caller's point of view: either
/// the complete file appears at `path` or nothing does.
pub trait RecordingWriter: Send + Sync {
    fn write(&self, path: &Path, take: &Take) -> Result<()>;
}

/// Standard MIDI file writer
#[derive(Debug, Clone)]
pub struct SmfWriter {
    /// Name written to the track name meta event
    track_name: String,
}

impl SmfWriter {
    /// Create a new writer
    pub fn new(track_name: impl Into<String>) -> Self {
        Self {
            track_name: track_name.into(),
        }
    }

    /// Encode a take to bytes
    pub fn encode(&self, take: &Take) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.write_header(&mut buffer, take.ticks_per_beat);
        self.write_track(&mut buffer, take);
        buffer
    }

    /// Write MIDI file header chunk
    fn write_header(&self, out: &mut Vec<u8>, ppqn: u16) {
        // MThd
        out.extend_from_slice(b"MThd");
        // Chunk length (always 6)
        out.extend_from_slice(&6u32.to_be_bytes());
        // Format 1, one track
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        // PPQN
        out.extend_from_slice(&ppqn.to_be_bytes());
    }

    /// Write the track chunk
    fn write_track(&self, out: &mut Vec<u8>, take: &Take) {
        let mut track_data = Vec::new();

        // Tempo and name at tick 0
        if let Some(tempo) = (MidiMessage::SetTempo {
            micros_per_beat: take.initial_tempo_us,
        })
        .to_smf_bytes()
        {
            track_data.push(0x00);
            track_data.extend_from_slice(&tempo);
        }

        let name = self.track_name.as_bytes();
        track_data.push(0x00);
        track_data.extend_from_slice(&[messages::META, messages::META_TRACK_NAME]);
        track_data.extend(encode_vlq(name.len() as u32));
        track_data.extend_from_slice(name);

        // Deltas of events without a file form carry over to the next event
        let mut carried = 0u32;
        let mut ended = false;
        for recorded in &take.events {
            let delta = carried.saturating_add(recorded.delta_ticks);
            match recorded.event.to_smf_bytes() {
                Some(bytes) => {
                    track_data.extend(encode_vlq(delta.min(crate::timing::MAX_DELTA_TICKS)));
                    track_data.extend_from_slice(&bytes);
                    carried = 0;
                }
                None => carried = delta,
            }
            if recorded.event == TrackEvent::EndOfTrack {
                ended = true;
                break;
            }
        }

        if !ended {
            track_data.extend(encode_vlq(carried.min(crate::timing::MAX_DELTA_TICKS)));
            track_data.extend_from_slice(&[messages::META, messages::META_END_OF_TRACK, 0x00]);
        }

        // MTrk
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        out.extend_from_slice(&track_data);
    }
}

impl Default for SmfWriter {
    fn default() -> Self {
        Self::new("Live Recording")
    }
}

impl RecordingWriter for SmfWriter {
    fn write(&self, path: &Path, take: &Take) -> Result<()> {
        let bytes = self.encode(take);
        write_atomic(path, &bytes)
    }
}

/// Temporary path used while writing `path`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write bytes to `path` via a temporary file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path(path);

    let result = (|| -> io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp);
        return Err(RecorderError::io(path, source));
    }
    Ok(())
}
