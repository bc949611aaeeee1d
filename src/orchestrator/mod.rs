// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recorder orchestration.
//!
//! The [`Orchestrator`] owns the recording session, the chord detector, the
//! pause flag and the bound device behind one mutex. Three callers share it:
//! the driver's delivery thread (`handle_event`), the idle watchdog
//! (`watchdog_tick`) and the device presence loop (`presence_tick`).
//!
//! Device open and close run with the lock released: closing a driver
//! connection can wait for the delivery thread, which may itself be waiting
//! for the lock.

pub mod runner;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::{DeviceConfig, RecorderConfig};
use crate::control::{ChordAction, ChordDetector};
use crate::midi::{pick_device, DeviceBackend, DeviceConnection, EventCallback, MidiMessage};
use crate::recording::{RecordingSession, RecordingWriter, SmfWriter};
use crate::timing::{Clock, SystemClock};

pub use runner::run;

/// Mutable recorder state, only reachable through the orchestrator's lock
struct RecorderState {
    session: RecordingSession,
    detector: ChordDetector,
    paused: bool,
    connection: Option<Box<dyn DeviceConnection>>,
}

/// Coordinates event handling, idle closing and device presence
pub struct Orchestrator {
    state: Mutex<RecorderState>,
    backend: Arc<dyn DeviceBackend>,
    clock: Arc<dyn Clock>,
    device: DeviceConfig,
    idle_timeout: Duration,
    watchdog_interval: Duration,
}

impl Orchestrator {
    /// Create an orchestrator with explicit clock and writer
    pub fn new(
        config: &RecorderConfig,
        backend: Arc<dyn DeviceBackend>,
        clock: Arc<dyn Clock>,
        writer: Arc<dyn RecordingWriter>,
    ) -> Arc<Self> {
        let session = RecordingSession::new(&config.recording, clock.clone(), writer);
        Arc::new(Self {
            state: Mutex::new(RecorderState {
                session,
                detector: ChordDetector::new(&config.triggers),
                paused: false,
                connection: None,
            }),
            backend,
            clock,
            device: config.device.clone(),
            idle_timeout: config.recording.idle_timeout(),
            watchdog_interval: config.recording.watchdog_interval(),
        })
    }

    /// Create an orchestrator on the system clock writing MIDI files
    pub fn with_backend(config: &RecorderConfig, backend: Arc<dyn DeviceBackend>) -> Arc<Self> {
        Self::new(
            config,
            backend,
            Arc::new(SystemClock),
            Arc::new(SmfWriter::new(config.recording.track_name.clone())),
        )
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        // A panic elsewhere must not stop recording
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Route one incoming device message.
    pub fn handle_event(&self, message: MidiMessage) {
        if !message.is_recordable() {
            debug!("Dropping non-recordable message {:?}", message);
            return;
        }

        let mut state = self.lock();
        let outcome = state.detector.process(&message, self.clock.now());

        match outcome.action {
            Some(ChordAction::TogglePause) => {
                if state.paused {
                    state.paused = false;
                    info!("[CTL] Resumed");
                } else {
                    // Pausing always closes the current take first
                    if let Err(e) = state.session.split_now() {
                        error!("[ERR] Closing recording before pause: {}", e);
                    }
                    state.paused = true;
                    info!("[CTL] Paused (play the pause chord again to resume)");
                }
                return;
            }
            Some(ChordAction::Split) => {
                info!("[CTL] Split triggered by chord");
                if let Err(e) = state.session.split_now() {
                    error!("[ERR] Split: {}", e);
                }
                return;
            }
            None => {}
        }

        if outcome.suppress {
            debug!("Suppressed chord note {:?}", message);
            return;
        }

        if state.paused {
            return;
        }

        state.session.feed(message);
    }

    /// One idle watchdog check
    pub fn watchdog_tick(&self) {
        let mut state = self.lock();
        if let Err(e) = state.session.stop_if_idle(self.idle_timeout) {
            error!("[ERR] Watchdog: {}", e);
        }
    }

    /// One presence loop iteration. Returns how long to wait before the next.
    pub fn presence_tick(self: &Arc<Self>) -> Duration {
        let bound = self.lock().connection.as_ref().map(|c| c.name().to_string());
        match bound {
            None => self.try_connect(),
            Some(name) => self.check_presence(&name),
        }
    }

    fn try_connect(self: &Arc<Self>) -> Duration {
        let names = match self.backend.list_device_names() {
            Ok(names) => names,
            Err(e) => {
                warn!("[ERR] Could not list MIDI sources: {}", e);
                return self.device.scan_interval();
            }
        };

        let Some(name) = pick_device(&names, self.device.name_filter.as_deref()) else {
            return self.device.scan_interval();
        };

        let weak = Arc::downgrade(self);
        let on_event: EventCallback = Box::new(move |message| {
            if let Some(orchestrator) = weak.upgrade() {
                orchestrator.handle_event(message);
            }
        });

        match self.backend.open(&name, on_event) {
            Ok(connection) => {
                info!("[DEV] Listening on: {}", name);
                let stale = self.lock().connection.replace(connection);
                if let Some(stale) = stale {
                    stale.close();
                }
                self.device.connected_poll()
            }
            Err(e) => {
                error!("[ERR] Could not open '{}': {}", name, e);
                self.device.retry_backoff()
            }
        }
    }

    fn check_presence(&self, name: &str) -> Duration {
        let present = match self.backend.list_device_names() {
            Ok(names) => names.iter().any(|n| n == name),
            Err(e) => {
                warn!("[ERR] Could not list MIDI sources: {}", e);
                false
            }
        };
        if present {
            return self.device.connected_poll();
        }

        info!("[DEV] Device disconnected: {}", name);
        self.disconnect();
        self.device.retry_backoff()
    }

    /// Close the device connection (if any), then force-close the recording.
    fn disconnect(&self) {
        let connection = self.lock().connection.take();
        if let Some(connection) = connection {
            connection.close();
        }
        if let Err(e) = self.lock().session.force_close() {
            error!("[ERR] Closing recording: {}", e);
        }
    }

    /// Release the device and write any open recording. Safe to call twice.
    pub fn shutdown(&self) {
        self.disconnect();
    }

    /// Whether recording is paused
    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    /// Whether a recording is open
    pub fn has_session(&self) -> bool {
        self.lock().session.is_open()
    }

    /// Time since the last recorded event, if a recording is open
    pub fn time_since_last_event(&self) -> Option<Duration> {
        self.lock().session.time_since_last_event()
    }

    /// Name of the bound device
    pub fn connected_device(&self) -> Option<String> {
        self.lock().connection.as_ref().map(|c| c.name().to_string())
    }

    /// Watchdog period
    pub fn watchdog_interval(&self) -> Duration {
        self.watchdog_interval
    }

    /// Presence retry backoff
    pub fn retry_backoff(&self) -> Duration {
        self.device.retry_backoff()
    }
}
