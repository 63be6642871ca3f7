//! Desired versus observed body power mode.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::LinkConfig;

/// Body power mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerMode {
    /// Full sensor streaming and motor control.
    #[default]
    Active,
    /// Reduced power; the body stops streaming valid sensor data.
    Calm,
}

impl PowerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerMode::Active => "active",
            PowerMode::Calm => "calm",
        }
    }
}

impl fmt::Display for PowerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mismatch that outlived its allowed settling time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerAnomaly {
    pub desired: PowerMode,
    pub observed: PowerMode,
    /// How long the mismatch has lasted.
    pub elapsed: Duration,
}

/// Tracks the requested mode, the mode the body reports, and whether a
/// mismatch has already been warned about.
///
/// The tracker never changes the desired mode on its own.
#[derive(Debug, Clone)]
pub struct PowerTracker {
    desired: PowerMode,
    observed: PowerMode,
    last_set: Instant,
    mismatch_since: Option<Instant>,
    warned: bool,
}

impl PowerTracker {
    pub fn new(now: Instant) -> Self {
        Self {
            desired: PowerMode::Active,
            observed: PowerMode::Active,
            last_set: now,
            mismatch_since: None,
            warned: false,
        }
    }

    pub fn desired(&self) -> PowerMode {
        self.desired
    }

    pub fn observed(&self) -> PowerMode {
        self.observed
    }

    /// When the desired mode was last changed.
    pub fn last_set(&self) -> Instant {
        self.last_set
    }

    /// True while the body has not yet reported the desired mode.
    pub fn transition_pending(&self) -> bool {
        self.desired != self.observed
    }

    /// Change the desired mode. Re-arms the anomaly warning.
    ///
    /// Returns false when `mode` was already desired.
    pub fn set_desired(&mut self, mode: PowerMode, now: Instant) -> bool {
        if mode == self.desired {
            return false;
        }
        self.desired = mode;
        self.last_set = now;
        self.warned = false;
        self.mismatch_since = self.transition_pending().then_some(now);
        true
    }

    /// Record the mode reported by the latest data frame.
    pub fn observe(&mut self, mode: PowerMode, now: Instant) {
        self.observed = mode;
        if mode == self.desired {
            self.mismatch_since = None;
            self.warned = false;
        } else if self.mismatch_since.is_none() {
            self.mismatch_since = Some(now);
        }
    }

    /// Settling time allowed for the current transition.
    fn allowed_lag(&self, config: &LinkConfig) -> Duration {
        match self.desired {
            PowerMode::Active => config.calm_to_active_timeout(),
            PowerMode::Calm => config.active_to_calm_timeout(),
        }
    }

    /// Returns an anomaly the first time a mismatch outlasts its timeout.
    ///
    /// Later calls return `None` until the mismatch resolves or the desired
    /// mode changes.
    pub fn check(&mut self, now: Instant, config: &LinkConfig) -> Option<PowerAnomaly> {
        if self.warned {
            return None;
        }
        let since = self.mismatch_since?;
        let elapsed = now.saturating_duration_since(since);
        if elapsed <= self.allowed_lag(config) {
            return None;
        }
        self.warned = true;
        Some(PowerAnomaly {
            desired: self.desired,
            observed: self.observed,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn matching_modes_never_warn() {
        let t0 = Instant::now();
        let cfg = LinkConfig::default();
        let mut tracker = PowerTracker::new(t0);
        tracker.observe(PowerMode::Active, t0);
        assert_eq!(tracker.check(t0 + ms(60_000), &cfg), None);
    }

    #[test]
    fn stuck_in_calm_warns_once() {
        let t0 = Instant::now();
        let cfg = LinkConfig::default();
        let mut tracker = PowerTracker::new(t0);

        let mut warnings = 0;
        for tick in 0..500u64 {
            let now = t0 + ms(tick * 5);
            tracker.observe(PowerMode::Calm, now);
            if tracker.check(now, &cfg).is_some() {
                warnings += 1;
            }
        }
        assert_eq!(warnings, 1);
    }

    #[test]
    fn timeout_depends_on_direction() {
        let t0 = Instant::now();
        let cfg = LinkConfig::default();
        let mut tracker = PowerTracker::new(t0);
        tracker.set_desired(PowerMode::Calm, t0);

        // Active -> Calm is allowed five seconds.
        assert_eq!(tracker.check(t0 + ms(4_000), &cfg), None);
        let anomaly = tracker.check(t0 + ms(5_001), &cfg).unwrap();
        assert_eq!(anomaly.desired, PowerMode::Calm);
        assert_eq!(anomaly.observed, PowerMode::Active);
    }

    #[test]
    fn resolution_rearms_warning() {
        let t0 = Instant::now();
        let cfg = LinkConfig::default();
        let mut tracker = PowerTracker::new(t0);

        tracker.observe(PowerMode::Calm, t0);
        assert!(tracker.check(t0 + ms(1_500), &cfg).is_some());
        assert!(tracker.check(t0 + ms(3_000), &cfg).is_none());

        tracker.observe(PowerMode::Active, t0 + ms(3_100));
        tracker.observe(PowerMode::Calm, t0 + ms(3_200));
        assert!(tracker.check(t0 + ms(3_300), &cfg).is_none());
        assert!(tracker.check(t0 + ms(4_300), &cfg).is_some());
    }

    #[test]
    fn desired_change_rearms_warning() {
        let t0 = Instant::now();
        let cfg = LinkConfig::default();
        let mut tracker = PowerTracker::new(t0);

        tracker.observe(PowerMode::Calm, t0);
        assert!(tracker.check(t0 + ms(1_500), &cfg).is_some());

        assert!(tracker.set_desired(PowerMode::Calm, t0 + ms(2_000)));
        assert!(!tracker.transition_pending());
        assert!(!tracker.set_desired(PowerMode::Calm, t0 + ms(2_100)));

        assert!(tracker.set_desired(PowerMode::Active, t0 + ms(3_000)));
        assert!(tracker.transition_pending());
        assert!(tracker.check(t0 + ms(3_500), &cfg).is_none());
        assert!(tracker.check(t0 + ms(4_100), &cfg).is_some());
    }
}
