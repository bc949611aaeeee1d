// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! midir input backend.
//!
//! This module provides the production [`DeviceBackend`], built on midir so
//! the recorder runs on ALSA, Core MIDI and WinMM alike.

use midir::{Ignore, MidiInput, MidiInputConnection};
use tracing::debug;

use super::{DeviceBackend, DeviceConnection, EventCallback, MidiMessage};
use crate::error::{RecorderError, Result};

/// Input port name registered with the system MIDI service.
const PORT_NAME: &str = "chordrec-input";

/// midir-backed device enumeration and connection.
#[derive(Debug, Clone)]
pub struct MidirBackend {
    client_name: String,
}

impl MidirBackend {
    /// Create a backend that registers with the given client name.
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn client(&self) -> Result<MidiInput> {
        MidiInput::new(&self.client_name)
            .map_err(|e| RecorderError::Connection(format!("Failed to create MIDI client: {}", e)))
    }
}

impl Default for MidirBackend {
    fn default() -> Self {
        Self::new("chordrec")
    }
}

impl DeviceBackend for MidirBackend {
    fn list_device_names(&self) -> Result<Vec<String>> {
        let input = self.client()?;
        let names = input
            .ports()
            .iter()
            .filter_map(|port| input.port_name(port).ok())
            .collect();
        Ok(names)
    }

    fn open(&self, name: &str, mut on_event: EventCallback) -> Result<Box<dyn DeviceConnection>> {
        let mut input = self.client()?;
        // Clock and active sensing have no place in a recording
        input.ignore(Ignore::TimeAndActiveSense);

        let port = input
            .ports()
            .into_iter()
            .find(|p| input.port_name(p).map_or(false, |n| n == name))
            .ok_or_else(|| RecorderError::Connection(format!("MIDI source '{}' not found", name)))?;

        let connection = input
            .connect(
                &port,
                PORT_NAME,
                move |_timestamp_us, data, _| match MidiMessage::parse(data) {
                    Some(msg) => on_event(msg),
                    None => debug!("Ignoring empty MIDI packet"),
                },
                (),
            )
            .map_err(|e| {
                RecorderError::Connection(format!("Failed to connect to '{}': {}", name, e))
            })?;

        Ok(Box::new(MidirConnection {
            name: name.to_string(),
            inner: connection,
        }))
    }
}

/// An open midir input connection.
pub struct MidirConnection {
    name: String,
    inner: MidiInputConnection<()>,
}

impl DeviceConnection for MidirConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn close(self: Box<Self>) {
        let _ = self.inner.close();
    }
}

/// Print all available MIDI sources to stdout
pub fn print_sources(backend: &dyn DeviceBackend) {
    match backend.list_device_names() {
        Ok(names) if !names.is_empty() => {
            println!("Available MIDI sources (inputs):");
            for (i, name) in names.iter().enumerate() {
                println!("  {}: {}", i, name);
            }
        }
        Ok(_) => println!("No MIDI sources detected yet. Waiting..."),
        Err(e) => println!("Could not list MIDI sources: {}", e),
    }
}
