// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! CHORDREC - hands-free MIDI recorder.
//!
//! Listens to a MIDI input device and writes everything played to Standard
//! MIDI files. The performer controls it from the keyboard itself:
//!
//! - the split chord (A7 B7 C8 by default) closes the current file
//! - the pause chord (A0 B0 C1 by default) closes it and stops recording
//!   until the chord is played again
//! - a recording with no activity for a minute is closed automatically
//! - unplugging the device closes the current file
//!
//! The first event after any of these starts a new file.

pub mod config;
pub mod control;
pub mod error;
pub mod midi;
pub mod orchestrator;
pub mod recording;
pub mod timing;

pub use config::RecorderConfig;
pub use error::{RecorderError, Result};
pub use orchestrator::Orchestrator;
