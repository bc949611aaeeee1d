// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Monotonic clocks and wall-time to tick conversion.
//!
//! Recording time is measured with `Instant`s from a [`Clock`], so tests can
//! drive a [`ManualClock`] across long idle gaps without sleeping.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Largest delta a Standard MIDI File variable-length quantity can hold.
pub const MAX_DELTA_TICKS: u32 = 0x0FFF_FFFF;

/// Microseconds per beat at 120 BPM.
pub const DEFAULT_TEMPO_US: u32 = 500_000;

/// Largest tempo a set-tempo meta event can hold (24 bits).
pub const MAX_TEMPO_US: u32 = 0x00FF_FFFF;

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    /// Current monotonic reading.
    fn now(&self) -> Instant;
}

/// Clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    /// Move the clock forward by a number of milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Convert an elapsed wall-clock duration to ticks.
///
/// `ticks = round(seconds / (tempo_us / 1e6) * ticks_per_beat)`, never
/// negative and capped at [`MAX_DELTA_TICKS`].
pub fn seconds_to_ticks(elapsed: Duration, tempo_us: u32, ticks_per_beat: u16) -> u32 {
    if tempo_us == 0 {
        return 0;
    }
    let seconds_per_beat = tempo_us as f64 / 1_000_000.0;
    let ticks = (elapsed.as_secs_f64() / seconds_per_beat * ticks_per_beat as f64).round();
    if ticks <= 0.0 || !ticks.is_finite() {
        0
    } else if ticks >= MAX_DELTA_TICKS as f64 {
        MAX_DELTA_TICKS
    } else {
        ticks as u32
    }
}

/// Convert a tick count back to seconds at a given tempo.
pub fn ticks_to_seconds(ticks: u32, tempo_us: u32, ticks_per_beat: u16) -> f64 {
    if ticks_per_beat == 0 {
        return 0.0;
    }
    ticks as f64 / ticks_per_beat as f64 * (tempo_us as f64 / 1_000_000.0)
}

/// Clamp a tempo to the range a set-tempo meta event can carry.
pub fn clamp_tempo(tempo_us: u32) -> u32 {
    tempo_us.clamp(1, MAX_TEMPO_US)
}
