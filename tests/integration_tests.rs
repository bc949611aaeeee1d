// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for CHORDREC
//!
//! These tests drive the orchestrator end to end: a mock device backend
//! delivers messages, a manual clock stands in for wall time, and the real
//! MIDI file writer produces files that are decoded again with midly.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chordrec::config::RecorderConfig;
use chordrec::error::{RecorderError, Result};
use chordrec::midi::{DeviceBackend, DeviceConnection, EventCallback, MidiMessage};
use chordrec::recording::SmfWriter;
use chordrec::timing::{ticks_to_seconds, ManualClock};
use chordrec::Orchestrator;
use midly::{MetaMessage, Smf, Timing, TrackEventKind};

/// Backend with a pluggable device list and a handle on the open callback
#[derive(Default)]
struct FakeKeyboard {
    names: Mutex<Vec<String>>,
    callback: Mutex<Option<EventCallback>>,
    opens: Mutex<usize>,
    closes: Arc<Mutex<usize>>,
}

impl FakeKeyboard {
    fn plugged_in() -> Arc<Self> {
        let keyboard = FakeKeyboard::default();
        keyboard.plug();
        Arc::new(keyboard)
    }

    fn plug(&self) {
        *self.names.lock().unwrap() = vec!["USB MIDI Keyboard".to_string()];
    }

    fn unplug(&self) {
        self.names.lock().unwrap().clear();
    }

    fn play(&self, message: MidiMessage) {
        if let Some(cb) = self.callback.lock().unwrap().as_mut() {
            cb(message);
        }
    }
}

struct FakeConnection {
    name: String,
    closes: Arc<Mutex<usize>>,
}

impl DeviceConnection for FakeConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn close(self: Box<Self>) {
        *self.closes.lock().unwrap() += 1;
    }
}

impl DeviceBackend for FakeKeyboard {
    fn list_device_names(&self) -> Result<Vec<String>> {
        Ok(self.names.lock().unwrap().clone())
    }

    fn open(&self, name: &str, on_event: EventCallback) -> Result<Box<dyn DeviceConnection>> {
        if !self.names.lock().unwrap().iter().any(|n| n == name) {
            return Err(RecorderError::Connection(format!("'{}' is gone", name)));
        }
        *self.opens.lock().unwrap() += 1;
        *self.callback.lock().unwrap() = Some(on_event);
        Ok(Box::new(FakeConnection {
            name: name.to_string(),
            closes: self.closes.clone(),
        }))
    }
}

struct Rig {
    orchestrator: Arc<Orchestrator>,
    keyboard: Arc<FakeKeyboard>,
    clock: Arc<ManualClock>,
    dir: tempfile::TempDir,
}

impl Rig {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RecorderConfig::default();
        config.recording.directory = dir.path().join("recordings");
        Self::with_config(config, dir)
    }

    fn with_config(config: RecorderConfig, dir: tempfile::TempDir) -> Self {
        let keyboard = FakeKeyboard::plugged_in();
        let clock = Arc::new(ManualClock::new());
        let orchestrator = Orchestrator::new(
            &config,
            keyboard.clone(),
            clock.clone(),
            Arc::new(SmfWriter::new(config.recording.track_name.clone())),
        );
        orchestrator.presence_tick();
        Self {
            orchestrator,
            keyboard,
            clock,
            dir,
        }
    }

    fn play(&self, message: MidiMessage) {
        self.keyboard.play(message);
    }

    fn wait_ms(&self, ms: u64) {
        self.clock.advance_ms(ms);
    }

    fn recordings(&self) -> Vec<PathBuf> {
        let dir = self.dir.path().join("recordings");
        let mut files: Vec<PathBuf> = match fs::read_dir(&dir) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        };
        files.sort();
        files
    }
}

/// A decoded track event: (delta ticks, kind)
#[derive(Debug, Clone, PartialEq)]
enum Decoded {
    NoteOn(u8, u8),
    NoteOff(u8),
    Tempo(u32),
    TrackName(String),
    EndOfTrack,
    Other,
}

fn decode(path: &Path) -> (u16, Vec<(u32, Decoded)>) {
    let bytes = fs::read(path).unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    let ppqn = match smf.header.timing {
        Timing::Metrical(t) => t.as_int(),
        Timing::Timecode(..) => panic!("unexpected timecode division"),
    };
    assert_eq!(smf.tracks.len(), 1);

    let events = smf.tracks[0]
        .iter()
        .map(|event| {
            let kind = match event.kind {
                TrackEventKind::Midi { message, .. } => match message {
                    midly::MidiMessage::NoteOn { key, vel } => Decoded::NoteOn(key.as_int(), vel.as_int()),
                    midly::MidiMessage::NoteOff { key, .. } => Decoded::NoteOff(key.as_int()),
                    _ => Decoded::Other,
                },
                TrackEventKind::Meta(MetaMessage::Tempo(t)) => Decoded::Tempo(t.as_int()),
                TrackEventKind::Meta(MetaMessage::TrackName(name)) => {
                    Decoded::TrackName(String::from_utf8_lossy(name).into_owned())
                }
                TrackEventKind::Meta(MetaMessage::EndOfTrack) => Decoded::EndOfTrack,
                _ => Decoded::Other,
            };
            (event.delta.as_int(), kind)
        })
        .collect();
    (ppqn, events)
}

/// Events after the leading tempo and track name
fn body(events: &[(u32, Decoded)]) -> &[(u32, Decoded)] {
    &events[2..]
}

#[test]
fn test_file_layout() {
    let rig = Rig::new();
    rig.play(MidiMessage::note_on(60, 100));
    rig.wait_ms(500);
    rig.play(MidiMessage::note_off(60));
    rig.orchestrator.shutdown();

    let files = rig.recordings();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("REC") && name.ends_with(".mid"), "{}", name);
    assert_eq!(name.len(), "REC20260101_120000.mid".len());

    let (ppqn, events) = decode(&files[0]);
    assert_eq!(ppqn, 480);
    assert_eq!(events[0], (0, Decoded::Tempo(500_000)));
    assert_eq!(events[1], (0, Decoded::TrackName("Live Recording".into())));
    assert_eq!(
        body(&events),
        &[
            (0, Decoded::NoteOn(60, 100)),
            (480, Decoded::NoteOff(60)),
            (0, Decoded::EndOfTrack),
        ]
    );
}

#[test]
fn test_round_trip_timing() {
    let rig = Rig::new();
    let delays_ms = [0u64, 100, 350, 500, 1_250, 10, 3, 7_777];

    for (i, delay) in delays_ms.iter().enumerate() {
        rig.wait_ms(*delay);
        rig.play(MidiMessage::note_on(40 + i as u8, 64));
    }
    rig.orchestrator.shutdown();

    let files = rig.recordings();
    let (ppqn, events) = decode(&files[0]);
    let one_tick = ticks_to_seconds(1, 500_000, ppqn);

    for (delay, (delta, _)) in delays_ms.iter().zip(body(&events)) {
        let decoded = ticks_to_seconds(*delta, 500_000, ppqn);
        let expected = *delay as f64 / 1000.0;
        assert!(
            (decoded - expected).abs() <= one_tick,
            "delay {}ms decoded as {}s",
            delay,
            decoded
        );
    }
}

#[test]
fn test_watchdog_closes_idle_file_and_next_event_starts_new_one() {
    let rig = Rig::new();
    rig.play(MidiMessage::note_on(60, 100));
    rig.wait_ms(200);
    rig.play(MidiMessage::note_off(60));

    // 61 seconds of silence, with the watchdog ticking every half second
    for _ in 0..122 {
        rig.wait_ms(500);
        rig.orchestrator.watchdog_tick();
    }
    assert!(!rig.orchestrator.has_session());
    assert_eq!(rig.recordings().len(), 1);

    rig.play(MidiMessage::note_on(62, 100));
    assert!(rig.orchestrator.has_session());
    rig.orchestrator.shutdown();

    let files = rig.recordings();
    assert_eq!(files.len(), 2);

    let (_, first) = decode(&files[0]);
    let first = body(&first);
    assert_eq!(first[0], (0, Decoded::NoteOn(60, 100)));
    assert_eq!(first[1], (192, Decoded::NoteOff(60)));
    // Closed by the tick that saw 60s of idle time
    assert_eq!(first[2], (57_600, Decoded::EndOfTrack));

    let (_, second) = decode(&files[1]);
    assert_eq!(body(&second)[0], (0, Decoded::NoteOn(62, 100)));
}

#[test]
fn test_tempo_change_affects_only_later_deltas() {
    let rig = Rig::new();
    rig.play(MidiMessage::note_on(60, 100));
    rig.wait_ms(500);
    rig.play(MidiMessage::note_off(60));
    rig.wait_ms(500);
    rig.play(MidiMessage::SetTempo {
        micros_per_beat: 250_000,
    });
    rig.wait_ms(500);
    rig.play(MidiMessage::note_on(62, 100));
    rig.orchestrator.shutdown();

    let (_, events) = decode(&rig.recordings()[0]);
    assert_eq!(
        body(&events),
        &[
            (0, Decoded::NoteOn(60, 100)),
            (480, Decoded::NoteOff(60)),
            (480, Decoded::Tempo(250_000)),
            (960, Decoded::NoteOn(62, 100)),
            (0, Decoded::EndOfTrack),
        ]
    );
}

#[test]
fn test_oversized_tempo_matches_file_deltas() {
    let rig = Rig::new();
    rig.play(MidiMessage::SetTempo {
        micros_per_beat: 0x0200_0000,
    });
    rig.wait_ms(10_000);
    rig.play(MidiMessage::note_on(60, 100));
    rig.orchestrator.shutdown();

    let (ppqn, events) = decode(&rig.recordings()[0]);
    let body = body(&events);
    let (_, Decoded::Tempo(file_tempo)) = body[0] else {
        panic!("expected a tempo event, got {:?}", body[0]);
    };
    assert_eq!(file_tempo, 0x00FF_FFFF);

    // The delta after the tempo event decodes with the tempo the file stores
    let decoded = ticks_to_seconds(body[1].0, file_tempo, ppqn);
    let one_tick = ticks_to_seconds(1, file_tempo, ppqn);
    assert!((decoded - 10.0).abs() <= one_tick, "decoded {}s", decoded);
}

#[test]
fn test_split_chord_in_any_order_fires_once() {
    let orders = [
        [105u8, 107, 108],
        [105, 108, 107],
        [107, 105, 108],
        [107, 108, 105],
        [108, 105, 107],
        [108, 107, 105],
    ];

    for order in orders {
        let rig = Rig::new();
        rig.play(MidiMessage::note_on(60, 100));
        rig.wait_ms(1_000);

        for note in order {
            rig.play(MidiMessage::note_on(note, 80));
            rig.wait_ms(70);
        }
        assert!(!rig.orchestrator.has_session(), "order {:?}", order);
        assert_eq!(rig.recordings().len(), 1);

        // Key releases and quick re-strikes inside the grace period stay out
        for note in order {
            rig.play(MidiMessage::note_off(note));
            rig.play(MidiMessage::note_on(note, 80));
            rig.wait_ms(400);
        }
        assert!(!rig.orchestrator.has_session(), "order {:?}", order);
        assert_eq!(rig.recordings().len(), 1);
    }
}

#[test]
fn test_spaced_chord_notes_never_split() {
    let rig = Rig::new();
    for round in 0..3 {
        for note in [105u8, 107, 108] {
            rig.play(MidiMessage::note_on(note, 80));
            rig.wait_ms(160 + round * 40);
        }
    }
    assert!(rig.orchestrator.has_session());
    rig.orchestrator.shutdown();

    let files = rig.recordings();
    assert_eq!(files.len(), 1);
    let (_, events) = decode(&files[0]);
    let notes = body(&events)
        .iter()
        .filter(|(_, e)| matches!(e, Decoded::NoteOn(..)))
        .count();
    assert_eq!(notes, 9);
}

#[test]
fn test_pause_resume_cycle() {
    let rig = Rig::new();
    rig.play(MidiMessage::note_on(60, 100));
    rig.wait_ms(100);

    for note in [21u8, 23, 24] {
        rig.play(MidiMessage::note_on(note, 80));
    }
    assert!(rig.orchestrator.is_paused());
    assert_eq!(rig.recordings().len(), 1);

    // Nothing is recorded while paused
    rig.wait_ms(3_000);
    rig.play(MidiMessage::note_on(64, 100));
    rig.play(MidiMessage::note_off(64));
    assert!(!rig.orchestrator.has_session());

    for note in [21u8, 23, 24] {
        rig.play(MidiMessage::note_on(note, 80));
    }
    assert!(!rig.orchestrator.is_paused());
    assert!(!rig.orchestrator.has_session());

    rig.wait_ms(100);
    rig.play(MidiMessage::note_on(67, 100));
    rig.orchestrator.shutdown();

    let files = rig.recordings();
    assert_eq!(files.len(), 2);
    let (_, second) = decode(&files[1]);
    assert_eq!(body(&second)[0], (0, Decoded::NoteOn(67, 100)));
}

#[test]
fn test_shutdown_twice_writes_once() {
    let rig = Rig::new();
    rig.play(MidiMessage::note_on(60, 100));
    rig.orchestrator.shutdown();
    rig.orchestrator.shutdown();
    assert_eq!(rig.recordings().len(), 1);
    assert_eq!(*rig.keyboard.closes.lock().unwrap(), 1);
}

#[test]
fn test_unplug_closes_and_replug_reconnects() {
    let rig = Rig::new();
    assert_eq!(
        rig.orchestrator.connected_device().as_deref(),
        Some("USB MIDI Keyboard")
    );

    rig.play(MidiMessage::note_on(60, 100));
    rig.wait_ms(5_000);
    rig.keyboard.unplug();
    assert_eq!(rig.orchestrator.presence_tick(), Duration::from_secs(1));
    assert!(!rig.orchestrator.has_session());
    assert_eq!(rig.orchestrator.connected_device(), None);

    let (_, events) = decode(&rig.recordings()[0]);
    // Disconnect assumes no trailing gap
    assert_eq!(body(&events).last(), Some(&(0, Decoded::EndOfTrack)));

    // Still unplugged: keep scanning
    assert_eq!(rig.orchestrator.presence_tick(), Duration::from_secs(2));

    rig.keyboard.plug();
    assert_eq!(rig.orchestrator.presence_tick(), Duration::from_millis(500));
    assert_eq!(*rig.keyboard.opens.lock().unwrap(), 2);

    rig.play(MidiMessage::note_on(62, 100));
    rig.orchestrator.shutdown();
    assert_eq!(rig.recordings().len(), 2);
}

#[test]
fn test_device_filter_selects_matching_source() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = RecorderConfig::default();
    config.recording.directory = dir.path().join("recordings");
    config.device.name_filter = Some("organ".into());

    let rig = Rig::with_config(config, dir);
    assert_eq!(rig.orchestrator.connected_device(), None);
}

#[test]
fn test_failed_write_does_not_wedge_recording() {
    let dir = tempfile::tempdir().unwrap();
    // A plain file where the recordings directory should be
    let blocked = dir.path().join("recordings");
    fs::write(&blocked, b"not a directory").unwrap();

    let mut config = RecorderConfig::default();
    config.recording.directory = blocked.clone();
    let rig = Rig::with_config(config, dir);

    rig.play(MidiMessage::note_on(60, 100));
    rig.wait_ms(1_000);
    for note in [105u8, 107, 108] {
        rig.play(MidiMessage::note_on(note, 80));
    }
    assert!(!rig.orchestrator.has_session());

    // The next take still starts
    rig.wait_ms(3_000);
    rig.play(MidiMessage::note_on(62, 100));
    assert!(rig.orchestrator.has_session());
    assert!(blocked.is_file());
}
