// Tap tempo - BPM estimation from human taps

use super::tempo::Bpm;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Tap session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TapState {
    #[default]
    Idle,
    Tapping,
}

/// Result of registering one tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// First tap of a new session, nothing to estimate yet
    SessionStarted,
    /// New estimate over the whole session
    Estimate(Bpm),
    /// Timestamp not after the previous tap (clock skew, double event)
    Rejected,
}

/// Tap tempo tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapTempoConfig {
    /// Gap (ms) after which a tap starts a new session
    pub session_timeout_ms: f64,
    /// Taps kept once a session ends
    pub retained_taps: usize,
    /// Hard bound on taps held during one session
    pub max_session_taps: usize,
}

impl Default for TapTempoConfig {
    fn default() -> Self {
        Self {
            session_timeout_ms: 2000.0,
            retained_taps: 5,
            max_session_taps: 64,
        }
    }
}

/// Tap tempo estimator
///
/// The estimate is the mean of all consecutive intervals in the current
/// session, not just the latest pair, so one mistimed tap is smoothed out.
#[derive(Debug, Clone)]
pub struct TapTempo {
    config: TapTempoConfig,
    state: TapState,
    taps: VecDeque<f64>,
    last_estimate: Option<Bpm>,
}

impl TapTempo {
    pub fn new(config: TapTempoConfig) -> Self {
        Self {
            config,
            state: TapState::Idle,
            taps: VecDeque::with_capacity(config.max_session_taps),
            last_estimate: None,
        }
    }

    pub fn state(&self) -> TapState {
        self.state
    }

    /// Tap count of the current session (or what was retained from the last one)
    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    /// Retained tap timestamps, oldest first
    pub fn taps(&self) -> impl Iterator<Item = f64> + '_ {
        self.taps.iter().copied()
    }

    /// Last BPM computed, kept for display after the session ends
    pub fn last_estimate(&self) -> Option<Bpm> {
        self.last_estimate
    }

    /// Estimate of the active session, `None` when idle or with a single tap
    pub fn session_estimate(&self) -> Option<Bpm> {
        match self.state {
            TapState::Tapping if self.taps.len() >= 2 => self.last_estimate,
            _ => None,
        }
    }

    /// Register a tap at `timestamp_ms`
    pub fn register(&mut self, timestamp_ms: f64) -> TapOutcome {
        if !timestamp_ms.is_finite() {
            trace!(timestamp_ms, "rejected non-finite tap");
            return TapOutcome::Rejected;
        }

        if let Some(&previous) = self.taps.back() {
            if timestamp_ms <= previous {
                trace!(timestamp_ms, previous, "rejected non-monotonic tap");
                return TapOutcome::Rejected;
            }
        }

        self.expire(timestamp_ms);

        if self.state == TapState::Idle {
            self.taps.clear();
            self.taps.push_back(timestamp_ms);
            self.state = TapState::Tapping;
            debug!(timestamp_ms, "tap session started");
            return TapOutcome::SessionStarted;
        }

        if self.taps.len() >= self.config.max_session_taps.max(2) {
            self.taps.pop_front();
        }
        self.taps.push_back(timestamp_ms);

        match self.estimate() {
            Some(bpm) => {
                self.last_estimate = Some(bpm);
                debug!(bpm = bpm.get(), taps = self.taps.len(), "tap tempo estimate");
                TapOutcome::Estimate(bpm)
            }
            None => TapOutcome::Rejected,
        }
    }

    /// End the session if more than the timeout has passed since the last tap
    /// Returns true when a session was closed
    pub fn expire(&mut self, now_ms: f64) -> bool {
        if self.state != TapState::Tapping {
            return false;
        }

        let Some(&last) = self.taps.back() else {
            self.state = TapState::Idle;
            return true;
        };

        if now_ms - last <= self.config.session_timeout_ms {
            return false;
        }

        while self.taps.len() > self.config.retained_taps {
            self.taps.pop_front();
        }
        self.state = TapState::Idle;
        debug!(retained = self.taps.len(), "tap session ended");
        true
    }

    /// Forget taps and the displayed estimate
    pub fn reset(&mut self) {
        self.taps.clear();
        self.state = TapState::Idle;
        self.last_estimate = None;
    }

    /// round(60000 / mean interval); the mean of consecutive intervals equals
    /// the total span divided by the number of intervals
    fn estimate(&self) -> Option<Bpm> {
        let (first, last) = (self.taps.front()?, self.taps.back()?);
        let intervals = self.taps.len().checked_sub(1).filter(|n| *n > 0)?;
        let mean_interval = (last - first) / intervals as f64;
        if mean_interval <= 0.0 {
            return None;
        }
        Bpm::from_f64(60_000.0 / mean_interval)
    }
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new(TapTempoConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tap_all(tapper: &mut TapTempo, taps: &[f64]) -> Vec<TapOutcome> {
        taps.iter().map(|&t| tapper.register(t)).collect()
    }

    #[test]
    fn test_steady_taps_give_120() {
        let mut tapper = TapTempo::default();
        let outcomes = tap_all(&mut tapper, &[0.0, 500.0, 1000.0, 1500.0]);

        assert_eq!(outcomes[0], TapOutcome::SessionStarted);
        assert_eq!(
            outcomes[3],
            TapOutcome::Estimate(Bpm::clamped(120))
        );
        assert_eq!(tapper.state(), TapState::Tapping);
    }

    #[test]
    fn test_single_tap_has_no_estimate() {
        let mut tapper = TapTempo::default();
        assert_eq!(tapper.register(1234.0), TapOutcome::SessionStarted);
        assert_eq!(tapper.session_estimate(), None);
        assert_eq!(tapper.last_estimate(), None);
    }

    #[test]
    fn test_average_over_whole_session() {
        let mut tapper = TapTempo::default();
        // Intervals 500, 500, 800 -> mean 600ms -> 100 BPM
        let outcomes = tap_all(&mut tapper, &[0.0, 500.0, 1000.0, 1800.0]);
        assert_eq!(outcomes[3], TapOutcome::Estimate(Bpm::clamped(100)));
    }

    #[test]
    fn test_gap_over_timeout_starts_new_session() {
        let mut tapper = TapTempo::default();
        let outcomes = tap_all(&mut tapper, &[0.0, 500.0, 3000.0]);

        assert_eq!(outcomes[1], TapOutcome::Estimate(Bpm::clamped(120)));
        assert_eq!(outcomes[2], TapOutcome::SessionStarted);
        assert_eq!(tapper.tap_count(), 1);
        // Previous estimate stays on display
        assert_eq!(tapper.last_estimate(), Some(Bpm::clamped(120)));
        assert_eq!(tapper.session_estimate(), None);

        assert_eq!(
            tapper.register(3400.0),
            TapOutcome::Estimate(Bpm::clamped(150))
        );
    }

    #[test]
    fn test_gap_equal_to_timeout_continues_session() {
        let mut tapper = TapTempo::default();
        let outcomes = tap_all(&mut tapper, &[0.0, 2000.0]);
        assert_eq!(outcomes[1], TapOutcome::Estimate(Bpm::clamped(30)));
    }

    #[test]
    fn test_rejects_duplicate_and_backwards_taps() {
        let mut tapper = TapTempo::default();
        tap_all(&mut tapper, &[1000.0, 1500.0]);

        assert_eq!(tapper.register(1500.0), TapOutcome::Rejected);
        assert_eq!(tapper.register(1200.0), TapOutcome::Rejected);
        assert_eq!(tapper.register(f64::NAN), TapOutcome::Rejected);
        assert_eq!(tapper.tap_count(), 2);

        // Average untouched by the rejected taps
        assert_eq!(
            tapper.register(2000.0),
            TapOutcome::Estimate(Bpm::clamped(120))
        );
    }

    #[test]
    fn test_rejected_first_tap_does_not_start_session() {
        let mut tapper = TapTempo::default();
        assert_eq!(tapper.register(f64::INFINITY), TapOutcome::Rejected);
        assert_eq!(tapper.state(), TapState::Idle);
    }

    #[test]
    fn test_expire_keeps_recent_taps() {
        let mut tapper = TapTempo::default();
        let taps: Vec<f64> = (0..8).map(|i| i as f64 * 400.0).collect();
        tap_all(&mut tapper, &taps);
        assert_eq!(tapper.tap_count(), 8);

        assert!(!tapper.expire(2800.0 + 2000.0));
        assert!(tapper.expire(2800.0 + 2001.0));
        assert_eq!(tapper.state(), TapState::Idle);

        let kept: Vec<f64> = tapper.taps().collect();
        assert_eq!(kept, vec![1200.0, 1600.0, 2000.0, 2400.0, 2800.0]);
        assert_eq!(tapper.last_estimate(), Some(Bpm::clamped(150)));
    }

    #[test]
    fn test_session_is_bounded() {
        let mut tapper = TapTempo::new(TapTempoConfig {
            max_session_taps: 4,
            ..TapTempoConfig::default()
        });
        let taps: Vec<f64> = (0..10).map(|i| i as f64 * 250.0).collect();
        let outcomes = tap_all(&mut tapper, &taps);

        assert_eq!(tapper.tap_count(), 4);
        assert_eq!(outcomes[9], TapOutcome::Estimate(Bpm::clamped(240)));
    }

    #[test]
    fn test_estimates_are_clamped() {
        let mut tapper = TapTempo::default();
        // 50ms apart -> 1200 BPM -> clamped
        let outcomes = tap_all(&mut tapper, &[0.0, 50.0]);
        assert_eq!(outcomes[1], TapOutcome::Estimate(Bpm::clamped(300)));
    }

    #[test]
    fn test_reset() {
        let mut tapper = TapTempo::default();
        tap_all(&mut tapper, &[0.0, 500.0]);
        tapper.reset();
        assert_eq!(tapper.state(), TapState::Idle);
        assert_eq!(tapper.tap_count(), 0);
        assert_eq!(tapper.last_estimate(), None);
    }
}
