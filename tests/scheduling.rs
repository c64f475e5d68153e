// Integration test: Click scheduling through the metronome
//
// Drives the metronome with a hand-stepped audio clock the way the tick
// driver would, and records every click handed to the sound source.

use band_metronome::sequencer::tempo::Subdivision;
use band_metronome::{AudioClock, ManualClock, Metronome, NoteEvent, SoundAsset, SoundSource};
use std::sync::{Arc, Mutex};

const TICK: f64 = 0.025;

#[derive(Default)]
struct RecordingSource {
    clicks: Vec<(f64, bool)>,
}

impl SoundSource for RecordingSource {
    fn play_click(&mut self, time: f64, accented: bool) {
        self.clicks.push((time, accented));
    }

    fn install_sounds(&mut self, _asset: Arc<SoundAsset>) {}
}

type TestMetronome = Metronome<ManualClock, RecordingSource>;

fn setup() -> (ManualClock, TestMetronome, Arc<Mutex<Vec<NoteEvent>>>) {
    let clock = ManualClock::new();
    let mut metronome = Metronome::new(clock.clone(), RecordingSource::default());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    metronome.on_beat(Box::new(move |event| sink.lock().unwrap().push(*event)));
    (clock, metronome, events)
}

/// Tick every 25ms for `seconds` of audio time
fn run_for(clock: &ManualClock, metronome: &mut TestMetronome, seconds: f64) {
    let ticks = (seconds / TICK).round() as usize;
    for _ in 0..ticks {
        metronome.tick();
        clock.advance(TICK);
    }
}

#[test]
fn test_note_spacing_matches_bpm() {
    for bpm in [30, 60, 97, 120, 181, 240, 300] {
        let (clock, mut metronome, events) = setup();
        metronome.set_bpm(bpm);
        metronome.start();
        run_for(&clock, &mut metronome, 8.0);

        let events = events.lock().unwrap();
        assert!(events.len() >= 3, "bpm {} produced {} notes", bpm, events.len());

        let expected = 60.0 / bpm as f64;
        for pair in events.windows(2) {
            let gap = pair[1].time - pair[0].time;
            assert!(
                (gap - expected).abs() < 1e-9,
                "bpm {}: gap {} instead of {}",
                bpm,
                gap,
                expected
            );
        }
    }
}

#[test]
fn test_beat_index_cycles_without_skipping() {
    for beats in 2..=12i64 {
        let (clock, mut metronome, events) = setup();
        metronome.set_bpm(300);
        metronome.set_time_signature(beats, Subdivision::Quarter);
        metronome.start();
        run_for(&clock, &mut metronome, 6.0);

        let events = events.lock().unwrap();
        assert!(events.len() as i64 > beats * 2);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.beat_index as i64, i as i64 % beats);
            assert_eq!(event.accented, event.beat_index == 0);
            assert_eq!(event.beats_per_cycle.get() as i64, beats);
        }
    }
}

#[test]
fn test_no_accent_when_disabled() {
    let (clock, mut metronome, events) = setup();
    metronome.set_accent_first_beat(false);
    metronome.start();
    run_for(&clock, &mut metronome, 4.0);

    assert!(events.lock().unwrap().iter().all(|e| !e.accented));
    assert!(metronome.sound().clicks.iter().all(|(_, accented)| !accented));
}

#[test]
fn test_notes_are_emitted_ahead_of_time() {
    let (clock, mut metronome, events) = setup();
    metronome.start();

    for _ in 0..200 {
        let now = clock.now();
        let seen_before = events.lock().unwrap().len();
        metronome.tick();
        let events = events.lock().unwrap();
        for event in &events[seen_before..] {
            // Never later than one tick behind, never beyond the lookahead window
            assert!(event.time >= now - 1e-9);
            assert!(event.time < now + 0.1);
        }
        drop(events);
        clock.advance(TICK);
    }
}

#[test]
fn test_mute_keeps_the_sequence() {
    let (clock_a, mut unmuted, events_a) = setup();
    let (clock_b, mut muted, events_b) = setup();
    unmuted.start();
    muted.start();

    for step in 0..160 {
        if step == 40 {
            muted.set_muted(true);
        }
        if step == 120 {
            muted.set_muted(false);
        }
        unmuted.tick();
        muted.tick();
        clock_a.advance(TICK);
        clock_b.advance(TICK);
    }

    let events_a = events_a.lock().unwrap();
    let events_b = events_b.lock().unwrap();
    assert_eq!(*events_a, *events_b);

    // Only the clicks inside the muted stretch are missing
    let muted_from = 40.0 * TICK;
    let muted_until = 120.0 * TICK;
    let audible: Vec<f64> = muted.sound().clicks.iter().map(|(t, _)| *t).collect();
    let expected: Vec<f64> = unmuted
        .sound()
        .clicks
        .iter()
        .map(|(t, _)| *t)
        .filter(|t| *t < muted_from || *t >= muted_until + 0.1)
        .collect();
    assert!(audible.len() < unmuted.sound().clicks.len());
    for t in expected {
        assert!(audible.contains(&t), "click at {} missing", t);
    }
    assert_eq!(muted.schedule_state(), unmuted.schedule_state());
}

#[test]
fn test_stop_then_start_resets_schedule() {
    let (clock, mut metronome, events) = setup();
    metronome.start();
    run_for(&clock, &mut metronome, 1.3);
    assert!(metronome.schedule_state().beat_index != 0);

    metronome.stop();
    let stopped = metronome.schedule_state();
    assert!(!stopped.running);
    assert_eq!(stopped.beat_index, 0);

    // Stopped metronome emits nothing
    let before = events.lock().unwrap().len();
    run_for(&clock, &mut metronome, 1.0);
    assert_eq!(events.lock().unwrap().len(), before);

    clock.set(5.0);
    metronome.start();
    let state = metronome.schedule_state();
    assert!(state.running);
    assert_eq!(state.beat_index, 0);
    assert!((state.next_note_time - 5.0).abs() < 1e-9);

    metronome.tick();
    let events = events.lock().unwrap();
    let first = events[before];
    assert!((first.time - 5.0).abs() < 1e-9);
    assert_eq!(first.beat_index, 0);
}

#[test]
fn test_time_signature_change_mid_play() {
    let (clock, mut metronome, events) = setup();
    metronome.set_bpm(100);
    metronome.start();
    run_for(&clock, &mut metronome, 1.0);

    let next_before = metronome.schedule_state().next_note_time;
    metronome.set_time_signature(3, Subdivision::Eighth);

    let state = metronome.schedule_state();
    assert_eq!(state.beat_index, 0);
    assert_eq!(state.next_note_time, next_before);
    assert_eq!(metronome.bpm().get(), 100);

    let seen = events.lock().unwrap().len();
    run_for(&clock, &mut metronome, 3.0);
    let events = events.lock().unwrap();
    let after: Vec<u8> = events[seen..].iter().map(|e| e.beat_index).collect();
    assert_eq!(&after[..4], &[0, 1, 2, 0]);
    assert!(events[seen..].iter().all(|e| e.subdivision == Subdivision::Eighth));
}

#[test]
fn test_smooth_tempo_change_takes_next_interval() {
    let (clock, mut metronome, events) = setup();
    metronome.set_bpm(60);
    metronome.start();
    run_for(&clock, &mut metronome, 0.5);
    // Note at 0.0 emitted, 1.0 pending
    metronome.set_bpm(120);
    run_for(&clock, &mut metronome, 2.0);

    let times: Vec<f64> = events.lock().unwrap().iter().map(|e| e.time).collect();
    assert!((times[1] - 1.0).abs() < 1e-9);
    assert!((times[2] - 1.5).abs() < 1e-9);
}

#[test]
fn test_stalled_driver_does_not_burst() {
    let (clock, mut metronome, events) = setup();
    metronome.start();
    run_for(&clock, &mut metronome, 1.0);
    let seen = events.lock().unwrap().len();

    // Driver stalls for 3 seconds
    clock.advance(3.0);
    metronome.tick();

    let events = events.lock().unwrap();
    let late = &events[seen..];
    assert!(late.len() <= 1, "burst of {} notes", late.len());
    // Cycle phase is kept: 4/4 at 120 BPM, note at 4.0s is a downbeat
    if let Some(event) = late.first() {
        let beats_elapsed = (event.time / 0.5).round() as u64;
        assert_eq!(event.beat_index as u64, beats_elapsed % 4);
    }
}
