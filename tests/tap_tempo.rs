// Integration test: Tap tempo through the metronome

use band_metronome::sequencer::tap_tempo::{TapState, TapTempo};
use band_metronome::{AudioClock, Bpm, ManualClock, Metronome, SoundAsset, SoundSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

struct Silent;

impl SoundSource for Silent {
    fn play_click(&mut self, _time: f64, _accented: bool) {}
    fn install_sounds(&mut self, _asset: Arc<SoundAsset>) {}
}

#[test]
fn test_steady_taps_estimate_120() {
    let mut metronome = Metronome::new(ManualClock::new(), Silent);
    let estimates: Vec<Option<u16>> = [0.0, 500.0, 1000.0, 1500.0]
        .iter()
        .map(|&t| metronome.register_tap(t).map(Bpm::get))
        .collect();

    assert_eq!(estimates, vec![None, Some(120), Some(120), Some(120)]);
    assert_eq!(metronome.bpm().get(), 120);
}

#[test]
fn test_single_tap_changes_nothing() {
    let mut metronome = Metronome::new(ManualClock::new(), Silent);
    metronome.set_bpm(90);
    assert_eq!(metronome.register_tap(10_000.0), None);
    assert_eq!(metronome.bpm().get(), 90);
}

#[test]
fn test_long_gap_starts_new_session() {
    let mut metronome = Metronome::new(ManualClock::new(), Silent);
    metronome.register_tap(0.0);
    assert_eq!(metronome.register_tap(500.0).map(Bpm::get), Some(120));

    // 2500ms gap: new session, no estimate until the next tap
    assert_eq!(metronome.register_tap(3000.0), None);
    assert_eq!(metronome.bpm().get(), 120);
    assert_eq!(metronome.register_tap(3500.0).map(Bpm::get), Some(120));
}

#[test]
fn test_short_gap_keeps_session() {
    let mut metronome = Metronome::new(ManualClock::new(), Silent);
    // 500, 500, 1500 -> mean 833.3ms -> 72 BPM
    let last = [0.0, 500.0, 1000.0, 2500.0]
        .iter()
        .map(|&t| metronome.register_tap(t))
        .last()
        .flatten();
    assert_eq!(last.map(Bpm::get), Some(72));
}

#[test]
fn test_jittered_taps_average_out() {
    let mut rng = StdRng::seed_from_u64(7);

    for target in [60u16, 96, 128, 175, 240] {
        let interval = 60_000.0 / target as f64;
        let mut metronome = Metronome::new(ManualClock::new(), Silent);

        let mut estimate = None;
        for i in 0..16 {
            let jitter: f64 = rng.gen_range(-15.0..15.0);
            estimate = metronome.register_tap(i as f64 * interval + jitter);
        }

        // Span error is at most 30ms over 15 intervals
        let bpm = estimate.map(Bpm::get).unwrap_or(0);
        let tolerance = (target as f64 * 0.02).ceil() as u16 + 1;
        assert!(
            bpm.abs_diff(target) <= tolerance,
            "target {} estimated {}",
            target,
            bpm
        );
    }
}

#[test]
fn test_out_of_order_taps_do_not_corrupt_average() {
    let mut metronome = Metronome::new(ManualClock::new(), Silent);
    metronome.register_tap(0.0);
    metronome.register_tap(500.0);
    metronome.register_tap(1000.0);

    // Skewed timestamps report the current estimate and are dropped
    assert_eq!(metronome.register_tap(900.0).map(Bpm::get), Some(120));
    assert_eq!(metronome.register_tap(1000.0).map(Bpm::get), Some(120));
    assert_eq!(metronome.register_tap(1500.0).map(Bpm::get), Some(120));
}

#[test]
fn test_rejected_tap_while_idle_stays_idle() {
    let mut metronome = Metronome::new(ManualClock::new(), Silent);
    assert_eq!(metronome.register_tap(f64::NAN), None);
    assert_eq!(metronome.tap_state(), TapState::Idle);
}

#[test]
fn test_session_expiry_keeps_last_five() {
    let mut tapper = TapTempo::default();
    for i in 0..12 {
        tapper.register(i as f64 * 300.0);
    }
    assert!(tapper.expire(3300.0 + 2500.0));

    let kept: Vec<f64> = tapper.taps().collect();
    assert_eq!(kept, vec![2100.0, 2400.0, 2700.0, 3000.0, 3300.0]);
    assert_eq!(tapper.last_estimate().map(Bpm::get), Some(200));
}

#[test]
fn test_tap_while_playing_pulls_next_note_in() {
    let clock = ManualClock::new();
    let mut metronome = Metronome::new(clock.clone(), Silent);
    metronome.set_bpm(40);
    metronome.start();
    metronome.tick();
    assert!((metronome.schedule_state().next_note_time - 1.5).abs() < 1e-9);

    clock.set(0.3);
    metronome.register_tap(100.0);
    metronome.register_tap(400.0);

    // 200 BPM now, next click 50ms from now instead of 1.2s away
    assert_eq!(metronome.bpm().get(), 200);
    let next = metronome.schedule_state().next_note_time;
    assert!((next - (clock.now() + 0.05)).abs() < 1e-9);

    // Emitted times keep increasing
    clock.set(0.35);
    metronome.tick();
    assert!(metronome.schedule_state().next_note_time > next);
}
