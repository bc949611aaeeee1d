// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input abstraction layer.
//!
//! This module provides a trait-based abstraction for MIDI input devices,
//! so the recorder can run against midir in production and against an
//! in-memory backend in tests.

pub mod message;
pub mod midir_backend;

use crate::error::Result;

pub use message::{encode_vlq, MidiMessage};
pub use midir_backend::{print_sources, MidirBackend};

/// Callback invoked from the driver's delivery thread for every message.
pub type EventCallback = Box<dyn FnMut(MidiMessage) + Send + 'static>;

/// Trait for MIDI input backends.
///
/// Implementations enumerate input devices and open one for callback-driven
/// delivery.
pub trait DeviceBackend: Send + Sync {
    /// Names of the input devices currently present, in system order.
    fn list_device_names(&self) -> Result<Vec<String>>;

    /// Open the named device and deliver its messages to `on_event`.
    ///
    /// # Returns
    /// * `Ok(connection)` on success
    /// * `Err(RecorderError::Connection)` if the device is absent or busy
    fn open(&self, name: &str, on_event: EventCallback) -> Result<Box<dyn DeviceConnection>>;
}

/// An open device connection. Dropping or closing it stops delivery.
pub trait DeviceConnection: Send {
    /// Name of the device this connection is bound to.
    fn name(&self) -> &str;

    /// Close the connection. May block until the delivery thread stops.
    fn close(self: Box<Self>);
}

/// Pick the device to record from.
///
/// With no filter the first device wins; otherwise the first whose name
/// contains the filter, case-insensitively.
pub fn pick_device(names: &[String], filter: Option<&str>) -> Option<String> {
    match filter {
        None => names.first().cloned(),
        Some(filter) => {
            let needle = filter.to_lowercase();
            names
                .iter()
                .find(|n| n.to_lowercase().contains(&needle))
                .cloned()
        }
    }
}

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_AFTERTOUCH: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_AFTERTOUCH: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;

    // System Real-Time Messages
    pub const TIMING_CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;

    // System Common Messages
    pub const SYSEX_START: u8 = 0xF0;

    // File meta events
    pub const META: u8 = 0xFF;
    pub const META_TRACK_NAME: u8 = 0x03;
    pub const META_END_OF_TRACK: u8 = 0x2F;
    pub const META_TEMPO: u8 = 0x51;
}
