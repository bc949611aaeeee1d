// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Control chord detection.
//!
//! A chord fires when every one of its notes has been struck inside a short
//! rolling window, in any order. Once fired, the chord's notes are suppressed
//! for a grace period so neither the chord itself nor its key releases end up
//! in a recording.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use crate::config::TriggerConfig;
use crate::midi::MidiMessage;

/// Control action requested by a chord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordAction {
    /// Close the current recording
    Split,
    /// Toggle between recording-enabled and paused
    TogglePause,
}

/// Result of running one message through the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordOutcome {
    /// Drop this message instead of recording it
    pub suppress: bool,
    /// Action triggered by this message, if any
    pub action: Option<ChordAction>,
}

impl ChordOutcome {
    /// Ordinary musical event
    pub const PASS: ChordOutcome = ChordOutcome {
        suppress: false,
        action: None,
    };

    /// Suppressed chord note, no action
    pub const SUPPRESS: ChordOutcome = ChordOutcome {
        suppress: true,
        action: None,
    };

    fn trigger(action: ChordAction) -> Self {
        ChordOutcome {
            suppress: true,
            action: Some(action),
        }
    }
}

/// Sliding-window chord matcher with note suppression
#[derive(Debug, Clone)]
pub struct ChordDetector {
    split_notes: BTreeSet<u8>,
    pause_notes: BTreeSet<u8>,
    window: Duration,
    suppress_for: Duration,
    /// Recent struck notes, oldest first
    recent: VecDeque<(Instant, u8)>,
    /// note -> suppression expiry
    suppressed_until: HashMap<u8, Instant>,
}

impl ChordDetector {
    /// Create a detector from trigger settings
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            split_notes: config.split_notes.clone(),
            pause_notes: config.pause_notes.clone(),
            window: config.chord_window(),
            suppress_for: config.suppress_for(),
            recent: VecDeque::new(),
            suppressed_until: HashMap::new(),
        }
    }

    /// Run a message through the detector at time `now`.
    pub fn process(&mut self, message: &MidiMessage, now: Instant) -> ChordOutcome {
        self.prune_suppressed(now);

        if let Some(note) = message.note() {
            if self.suppressed_until.contains_key(&note) {
                return ChordOutcome::SUPPRESS;
            }
        }

        let Some(note) = message.struck_note() else {
            return ChordOutcome::PASS;
        };

        self.recent.push_back((now, note));
        self.prune_window(now);

        let seen: HashSet<u8> = self.recent.iter().map(|(_, n)| *n).collect();

        if self.split_notes.iter().all(|n| seen.contains(n)) {
            self.arm(ChordAction::Split, now);
            return ChordOutcome::trigger(ChordAction::Split);
        }

        if self.pause_notes.iter().all(|n| seen.contains(n)) {
            self.arm(ChordAction::TogglePause, now);
            return ChordOutcome::trigger(ChordAction::TogglePause);
        }

        ChordOutcome::PASS
    }

    /// Whether a note is currently suppressed
    pub fn is_suppressed(&self, note: u8, now: Instant) -> bool {
        self.suppressed_until
            .get(&note)
            .map_or(false, |expiry| *expiry > now)
    }

    /// Number of struck notes currently inside the window
    pub fn window_len(&self) -> usize {
        self.recent.len()
    }

    fn arm(&mut self, action: ChordAction, now: Instant) {
        let notes = match action {
            ChordAction::Split => &self.split_notes,
            ChordAction::TogglePause => &self.pause_notes,
        };
        let expiry = now + self.suppress_for;
        for note in notes {
            self.suppressed_until.insert(*note, expiry);
        }
        self.recent.clear();
    }

    fn prune_suppressed(&mut self, now: Instant) {
        self.suppressed_until.retain(|_, expiry| *expiry > now);
    }

    fn prune_window(&mut self, now: Instant) {
        while let Some((at, _)) = self.recent.front() {
            if now.saturating_duration_since(*at) > self.window {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }
}
