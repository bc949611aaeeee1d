// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Control system for on-keyboard commands.
//!
//! The performer controls the recorder by playing chords on the device
//! itself; this module turns incoming notes into control actions.

pub mod chord;

pub use chord::{ChordAction, ChordDetector, ChordOutcome};
