// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing module.
//!
//! This module provides the monotonic clock abstraction and the
//! conversions between elapsed time and file ticks.

pub mod clock;

pub use clock::{
    clamp_tempo, seconds_to_ticks, ticks_to_seconds, Clock, ManualClock, SystemClock,
    DEFAULT_TEMPO_US, MAX_DELTA_TICKS, MAX_TEMPO_US,
};
