// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for the recorder.
//!
//! Every setting has a default, so an empty file (or no file at all) gives
//! the stock behaviour: first available device, `recordings/` in the working
//! directory, the top three white keys of an 88-key keyboard to split and the
//! bottom three to pause.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::RecorderError;

/// Root configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecorderConfig {
    /// Device selection and presence polling
    #[serde(default)]
    pub device: DeviceConfig,
    /// Output files and session timing
    #[serde(default)]
    pub recording: RecordingConfig,
    /// Control chords
    #[serde(default)]
    pub triggers: TriggerConfig,
}

impl RecorderConfig {
    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a configuration from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: RecorderConfig =
            toml::from_str(text).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Check value ranges and chord definitions
    pub fn validate(&self) -> std::result::Result<(), RecorderError> {
        self.recording.validate()?;
        self.triggers.validate()?;
        if self.device.scan_interval_ms == 0
            || self.device.connected_poll_ms == 0
            || self.device.retry_backoff_ms == 0
        {
            return Err(RecorderError::Config(
                "device polling intervals must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Device selection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// Case-insensitive substring of the device to use (None = first available)
    #[serde(default)]
    pub name_filter: Option<String>,
    /// Wait between scans while no device is connected
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,
    /// Wait between presence checks while connected
    #[serde(default = "default_connected_poll_ms")]
    pub connected_poll_ms: u64,
    /// Wait after a failed open or a disconnect
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_scan_interval_ms() -> u64 {
    2000
}
fn default_connected_poll_ms() -> u64 {
    500
}
fn default_retry_backoff_ms() -> u64 {
    1000
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name_filter: None,
            scan_interval_ms: default_scan_interval_ms(),
            connected_poll_ms: default_connected_poll_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl DeviceConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn connected_poll(&self) -> Duration {
        Duration::from_millis(self.connected_poll_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Output and session settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingConfig {
    /// Directory recordings are written to (created on demand)
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// File extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Ticks per beat written to the file header
    #[serde(default = "default_ticks_per_beat")]
    pub ticks_per_beat: u16,
    /// Tempo every session starts with, in microseconds per beat
    #[serde(default = "default_tempo_us")]
    pub default_tempo_us: u32,
    /// Inactivity after which an open recording is closed
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: f64,
    /// How often the idle watchdog checks
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,
    /// Name written to the track name meta event
    #[serde(default = "default_track_name")]
    pub track_name: String,
}

fn default_directory() -> PathBuf {
    PathBuf::from("recordings")
}
fn default_extension() -> String {
    "mid".to_string()
}
fn default_ticks_per_beat() -> u16 {
    480
}
fn default_tempo_us() -> u32 {
    crate::timing::DEFAULT_TEMPO_US
}
fn default_idle_timeout_secs() -> f64 {
    60.0
}
fn default_watchdog_interval_ms() -> u64 {
    500
}
fn default_track_name() -> String {
    "Live Recording".to_string()
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            extension: default_extension(),
            ticks_per_beat: default_ticks_per_beat(),
            default_tempo_us: default_tempo_us(),
            idle_timeout_secs: default_idle_timeout_secs(),
            watchdog_interval_ms: default_watchdog_interval_ms(),
            track_name: default_track_name(),
        }
    }
}

impl RecordingConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.idle_timeout_secs)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    fn validate(&self) -> std::result::Result<(), RecorderError> {
        if self.ticks_per_beat == 0 || self.ticks_per_beat > 0x7FFF {
            return Err(RecorderError::Config(format!(
                "ticks_per_beat must be 1..=32767, got {}",
                self.ticks_per_beat
            )));
        }
        if self.default_tempo_us == 0 || self.default_tempo_us > crate::timing::MAX_TEMPO_US {
            return Err(RecorderError::Config(format!(
                "default_tempo_us must be 1..=16777215, got {}",
                self.default_tempo_us
            )));
        }
        if self.idle_timeout_secs <= 0.0
            || Duration::try_from_secs_f64(self.idle_timeout_secs).is_err()
        {
            return Err(RecorderError::Config(format!(
                "idle_timeout_secs must be a positive number of seconds, got {}",
                self.idle_timeout_secs
            )));
        }
        if self.watchdog_interval_ms == 0 {
            return Err(RecorderError::Config(
                "watchdog_interval_ms must be non-zero".into(),
            ));
        }
        if self.extension.is_empty() || self.extension.contains(['/', '\\', '.']) {
            return Err(RecorderError::Config(format!(
                "invalid file extension '{}'",
                self.extension
            )));
        }
        Ok(())
    }
}

/// Control chord settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerConfig {
    /// Notes that close the current recording (A7, B7, C8)
    #[serde(default = "default_split_notes")]
    pub split_notes: BTreeSet<u8>,
    /// Notes that toggle pause (A0, B0, C1)
    #[serde(default = "default_pause_notes")]
    pub pause_notes: BTreeSet<u8>,
    /// All chord notes must arrive within this window
    #[serde(default = "default_chord_window_ms")]
    pub chord_window_ms: u64,
    /// Chord notes are kept out of the recording for this long after a trigger
    #[serde(default = "default_suppress_ms")]
    pub suppress_ms: u64,
}

fn default_split_notes() -> BTreeSet<u8> {
    [105, 107, 108].into_iter().collect()
}
fn default_pause_notes() -> BTreeSet<u8> {
    [21, 23, 24].into_iter().collect()
}
fn default_chord_window_ms() -> u64 {
    150
}
fn default_suppress_ms() -> u64 {
    2000
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            split_notes: default_split_notes(),
            pause_notes: default_pause_notes(),
            chord_window_ms: default_chord_window_ms(),
            suppress_ms: default_suppress_ms(),
        }
    }
}

impl TriggerConfig {
    pub fn chord_window(&self) -> Duration {
        Duration::from_millis(self.chord_window_ms)
    }

    pub fn suppress_for(&self) -> Duration {
        Duration::from_millis(self.suppress_ms)
    }

    fn validate(&self) -> std::result::Result<(), RecorderError> {
        for (label, notes) in [("split", &self.split_notes), ("pause", &self.pause_notes)] {
            if notes.is_empty() {
                return Err(RecorderError::Config(format!(
                    "{} chord needs at least one note",
                    label
                )));
            }
            if let Some(bad) = notes.iter().find(|n| **n > 127) {
                return Err(RecorderError::Config(format!(
                    "{} chord note {} is out of range 0..=127",
                    label, bad
                )));
            }
        }
        // A chord contained in the other would always fire first
        if self.split_notes.is_subset(&self.pause_notes)
            || self.pause_notes.is_subset(&self.split_notes)
        {
            return Err(RecorderError::Config(
                "split and pause chords must differ and neither may contain the other".into(),
            ));
        }
        if self.chord_window_ms == 0 {
            return Err(RecorderError::Config(
                "chord_window_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
