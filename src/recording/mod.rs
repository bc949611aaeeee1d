// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording and export system.
//!
//! This module provides:
//! - The live recording session (wall clock to ticks)
//! - Standard MIDI file export with atomic writes
//! - Recording file naming

pub mod export;
pub mod naming;
pub mod session;

pub use export::{RecordedEvent, RecordingWriter, SmfWriter, Take, TrackEvent};
pub use naming::RecordingNamer;
pub use session::{CloseReason, RecordingSession};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::RecordingConfig;
    use crate::timing::SystemClock;

    #[test]
    fn test_session_creation() {
        let session = RecordingSession::new(
            &RecordingConfig::default(),
            Arc::new(SystemClock),
            Arc::new(SmfWriter::default()),
        );
        assert!(!session.is_open());
        assert_eq!(session.current_tempo(), 500_000);
    }

    #[test]
    fn test_writer_creation() {
        let writer = SmfWriter::new("Live Recording");
        let bytes = writer.encode(&Take {
            ticks_per_beat: 480,
            initial_tempo_us: 500_000,
            events: Vec::new(),
        });
        assert_eq!(&bytes[0..4], b"MThd");
    }
}
