// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for the recorder.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the device, recording and configuration layers.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// A device could not be enumerated, opened, or has gone away.
    #[error("MIDI connection error: {0}")]
    Connection(String),

    /// Writing a recording to disk failed.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RecorderError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RecorderError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecorderError>;
