//! Invalid proximity reading counters and their periodic report.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Why the proximity sensor rejected a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxFailure {
    Sigma,
    Signal,
    MinRange,
    Phase,
    Hardware,
}

impl ProxFailure {
    /// Classify a non-zero `range_status`. Zero means the reading is valid.
    pub fn from_range_status(status: u8) -> Option<Self> {
        match status {
            0 => None,
            1 => Some(ProxFailure::Sigma),
            2 => Some(ProxFailure::Signal),
            3 => Some(ProxFailure::MinRange),
            4 => Some(ProxFailure::Phase),
            _ => Some(ProxFailure::Hardware),
        }
    }
}

impl fmt::Display for ProxFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProxFailure::Sigma => "sigma",
            ProxFailure::Signal => "signal",
            ProxFailure::MinRange => "min_range",
            ProxFailure::Phase => "phase",
            ProxFailure::Hardware => "hardware",
        };
        f.write_str(name)
    }
}

/// Per-category invalid reading counts since the last report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvalidProxCounts {
    pub sigma: u32,
    pub signal: u32,
    pub min_range: u32,
    pub phase: u32,
    pub hardware: u32,
}

impl InvalidProxCounts {
    /// Count one reading. Returns the category, or `None` for a valid one.
    pub fn record(&mut self, range_status: u8) -> Option<ProxFailure> {
        let failure = ProxFailure::from_range_status(range_status)?;
        let slot = match failure {
            ProxFailure::Sigma => &mut self.sigma,
            ProxFailure::Signal => &mut self.signal,
            ProxFailure::MinRange => &mut self.min_range,
            ProxFailure::Phase => &mut self.phase,
            ProxFailure::Hardware => &mut self.hardware,
        };
        *slot = slot.saturating_add(1);
        Some(failure)
    }

    pub fn get(&self, failure: ProxFailure) -> u32 {
        match failure {
            ProxFailure::Sigma => self.sigma,
            ProxFailure::Signal => self.signal,
            ProxFailure::MinRange => self.min_range,
            ProxFailure::Phase => self.phase,
            ProxFailure::Hardware => self.hardware,
        }
    }

    pub fn total(&self) -> u64 {
        [
            self.sigma,
            self.signal,
            self.min_range,
            self.phase,
            self.hardware,
        ]
        .iter()
        .map(|&n| u64::from(n))
        .sum()
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

/// Counts plus the schedule for flushing them.
#[derive(Debug, Clone)]
pub struct ProxReport {
    counts: InvalidProxCounts,
    period: Duration,
    last_flush: Instant,
}

impl ProxReport {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            counts: InvalidProxCounts::default(),
            period,
            last_flush: now,
        }
    }

    pub fn record(&mut self, range_status: u8) -> Option<ProxFailure> {
        self.counts.record(range_status)
    }

    pub fn counts(&self) -> &InvalidProxCounts {
        &self.counts
    }

    /// True once a full period has passed since the last flush.
    pub fn due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_flush) >= self.period
    }

    /// Take the counts and reset them to zero.
    pub fn flush(&mut self, now: Instant) -> InvalidProxCounts {
        self.last_flush = now;
        std::mem::take(&mut self.counts)
    }
}
