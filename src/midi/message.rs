// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Parsed MIDI events as delivered by an input device.
//!
//! A [`MidiMessage`] is immutable once received. The same type carries tempo
//! changes so a recording can follow tempo from any source.

use super::messages;

/// Parsed MIDI message types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note On: channel (0-15), note (0-127), velocity (1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Control Change: channel (0-15), controller (0-127), value (0-127)
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Program Change: channel (0-15), program (0-127)
    ProgramChange { channel: u8, program: u8 },
    /// Pitch Bend: channel (0-15), value (-8192 to 8191)
    PitchBend { channel: u8, value: i16 },
    /// Channel Aftertouch: channel (0-15), pressure (0-127)
    ChannelAftertouch { channel: u8, pressure: u8 },
    /// Poly Aftertouch: channel (0-15), note (0-127), pressure (0-127)
    PolyAftertouch { channel: u8, note: u8, pressure: u8 },
    /// System exclusive, including the leading 0xF0 and trailing 0xF7
    SysEx(Vec<u8>),
    /// Tempo change in microseconds per beat
    SetTempo { micros_per_beat: u32 },
    /// MIDI Clock tick
    TimingClock,
    /// Start playback
    Start,
    /// Continue playback
    Continue,
    /// Stop playback
    Stop,
    /// Unknown/unparsed message
    Unknown(Vec<u8>),
}

impl MidiMessage {
    /// Parse raw MIDI bytes into a MidiMessage
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }

        let status = data[0];

        match status {
            messages::TIMING_CLOCK => return Some(MidiMessage::TimingClock),
            messages::START => return Some(MidiMessage::Start),
            messages::CONTINUE => return Some(MidiMessage::Continue),
            messages::STOP => return Some(MidiMessage::Stop),
            messages::SYSEX_START => return Some(MidiMessage::SysEx(data.to_vec())),
            _ => {}
        }

        // Channel messages
        let msg_type = status & 0xF0;
        let channel = status & 0x0F;

        match msg_type {
            messages::NOTE_OFF if data.len() >= 3 => Some(MidiMessage::NoteOff {
                channel,
                note: data[1] & 0x7F,
                velocity: data[2] & 0x7F,
            }),
            messages::NOTE_ON if data.len() >= 3 => {
                let velocity = data[2] & 0x7F;
                // Note On with velocity 0 is equivalent to Note Off
                if velocity == 0 {
                    Some(MidiMessage::NoteOff {
                        channel,
                        note: data[1] & 0x7F,
                        velocity: 0,
                    })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note: data[1] & 0x7F,
                        velocity,
                    })
                }
            }
            messages::CONTROL_CHANGE if data.len() >= 3 => Some(MidiMessage::ControlChange {
                channel,
                controller: data[1] & 0x7F,
                value: data[2] & 0x7F,
            }),
            messages::PROGRAM_CHANGE if data.len() >= 2 => Some(MidiMessage::ProgramChange {
                channel,
                program: data[1] & 0x7F,
            }),
            messages::PITCH_BEND if data.len() >= 3 => {
                let lsb = (data[1] & 0x7F) as i16;
                let msb = (data[2] & 0x7F) as i16;
                let value = ((msb << 7) | lsb) - 8192;
                Some(MidiMessage::PitchBend { channel, value })
            }
            messages::CHANNEL_AFTERTOUCH if data.len() >= 2 => {
                Some(MidiMessage::ChannelAftertouch {
                    channel,
                    pressure: data[1] & 0x7F,
                })
            }
            messages::POLY_AFTERTOUCH if data.len() >= 3 => Some(MidiMessage::PolyAftertouch {
                channel,
                note: data[1] & 0x7F,
                pressure: data[2] & 0x7F,
            }),
            _ => Some(MidiMessage::Unknown(data.to_vec())),
        }
    }

    /// Convenience constructor for a note-on on channel 1
    pub fn note_on(note: u8, velocity: u8) -> Self {
        MidiMessage::NoteOn {
            channel: 0,
            note,
            velocity,
        }
    }

    /// Convenience constructor for a note-off on channel 1
    pub fn note_off(note: u8) -> Self {
        MidiMessage::NoteOff {
            channel: 0,
            note,
            velocity: 0,
        }
    }

    /// Note number of a Note On / Note Off
    pub fn note(&self) -> Option<u8> {
        match self {
            MidiMessage::NoteOn { note, .. } | MidiMessage::NoteOff { note, .. } => Some(*note),
            _ => None,
        }
    }

    /// Note number of a Note On that actually sounds (velocity > 0)
    pub fn struck_note(&self) -> Option<u8> {
        match self {
            MidiMessage::NoteOn { note, velocity, .. } if *velocity > 0 => Some(*note),
            _ => None,
        }
    }

    /// Check if this is a clock-related message
    pub fn is_clock_message(&self) -> bool {
        matches!(
            self,
            MidiMessage::TimingClock
                | MidiMessage::Start
                | MidiMessage::Continue
                | MidiMessage::Stop
        )
    }

    /// Whether this message can be stored in a MIDI file track
    pub fn is_recordable(&self) -> bool {
        match self {
            MidiMessage::Unknown(_) => false,
            MidiMessage::SysEx(data) => data.len() >= 2,
            other => !other.is_clock_message(),
        }
    }

    /// Encode the message as it appears in a file track (without delta time).
    ///
    /// Returns `None` for messages that have no file representation.
    pub fn to_smf_bytes(&self) -> Option<Vec<u8>> {
        let bytes = match *self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => vec![
                messages::NOTE_ON | (channel & 0x0F),
                note & 0x7F,
                velocity & 0x7F,
            ],
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => vec![
                messages::NOTE_OFF | (channel & 0x0F),
                note & 0x7F,
                velocity & 0x7F,
            ],
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => vec![
                messages::CONTROL_CHANGE | (channel & 0x0F),
                controller & 0x7F,
                value & 0x7F,
            ],
            MidiMessage::ProgramChange { channel, program } => {
                vec![messages::PROGRAM_CHANGE | (channel & 0x0F), program & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let raw = (value.clamp(-8192, 8191) + 8192) as u16;
                vec![
                    messages::PITCH_BEND | (channel & 0x0F),
                    (raw & 0x7F) as u8,
                    ((raw >> 7) & 0x7F) as u8,
                ]
            }
            MidiMessage::ChannelAftertouch { channel, pressure } => {
                vec![messages::CHANNEL_AFTERTOUCH | (channel & 0x0F), pressure & 0x7F]
            }
            MidiMessage::PolyAftertouch {
                channel,
                note,
                pressure,
            } => vec![
                messages::POLY_AFTERTOUCH | (channel & 0x0F),
                note & 0x7F,
                pressure & 0x7F,
            ],
            MidiMessage::SetTempo { micros_per_beat } => {
                let us = crate::timing::clamp_tempo(micros_per_beat);
                vec![
                    messages::META,
                    messages::META_TEMPO,
                    0x03,
                    ((us >> 16) & 0xFF) as u8,
                    ((us >> 8) & 0xFF) as u8,
                    (us & 0xFF) as u8,
                ]
            }
            MidiMessage::SysEx(ref data) => {
                if data.len() < 2 {
                    return None;
                }
                // F0 <length> <payload after F0>
                let payload = &data[1..];
                let mut out = vec![messages::SYSEX_START];
                out.extend(encode_vlq(payload.len() as u32));
                out.extend_from_slice(payload);
                out
            }
            _ => return None,
        };
        Some(bytes)
    }
}

/// Encode a variable-length quantity
pub fn encode_vlq(mut value: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(4);

    bytes.push((value & 0x7F) as u8);
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    bytes
}
