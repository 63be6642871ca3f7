use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spine_frame::FrameConfig;

use crate::error::{LinkError, Result};

/// Timing and cadence knobs for the handshake and the per-tick session.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Give up on the first data frame after this long.
    pub handshake_timeout_ms: u64,
    /// Poll wait per handshake read attempt.
    pub handshake_poll_ms: u64,
    /// Re-send the mode change after this many empty handshake polls.
    pub mode_change_resend_polls: u32,
    /// Poll wait per steady-state read attempt.
    pub poll_timeout_ms: u64,
    /// Consecutive silent polls that make the link fatal.
    pub poll_timeout_threshold: u8,
    /// Bytes one read attempt may scan before yielding.
    pub scan_budget: usize,
    /// Minimum time between outbound slots.
    pub min_send_spacing_us: u64,
    /// In calm mode, send lights on every Nth outbound slot.
    pub calm_light_interval: u32,
    /// Allowed lag for the body to report active after we ask for it.
    pub calm_to_active_timeout_ms: u64,
    /// Allowed lag for the body to report calm after we ask for it.
    pub active_to_calm_timeout_ms: u64,
    /// Period of the invalid-reading report.
    pub report_period_secs: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: 2_000,
            handshake_poll_ms: 1,
            mode_change_resend_polls: 50,
            poll_timeout_ms: 1_000,
            poll_timeout_threshold: 5,
            scan_budget: spine_frame::codec::DEFAULT_SCAN_BUDGET,
            min_send_spacing_us: 5_000,
            calm_light_interval: 12,
            calm_to_active_timeout_ms: 1_000,
            active_to_calm_timeout_ms: 5_000,
            report_period_secs: 24 * 60 * 60,
        }
    }
}

impl LinkConfig {
    /// Parse a JSON document, filling missing keys with defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| LinkError::Config(format!("{}: {err}", path.display())))?;
        Self::from_json(&text)
    }

    /// Reject values that would disable a safety check.
    pub fn validate(&self) -> Result<()> {
        if self.poll_timeout_threshold == 0 {
            return Err(LinkError::Config(
                "poll_timeout_threshold must be at least 1".to_string(),
            ));
        }
        if self.calm_light_interval == 0 {
            return Err(LinkError::Config(
                "calm_light_interval must be at least 1".to_string(),
            ));
        }
        if self.mode_change_resend_polls == 0 {
            return Err(LinkError::Config(
                "mode_change_resend_polls must be at least 1".to_string(),
            ));
        }
        if self.scan_budget < spine_frame::MAX_FRAME_LEN {
            return Err(LinkError::Config(format!(
                "scan_budget must be at least {} bytes",
                spine_frame::MAX_FRAME_LEN
            )));
        }
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn handshake_poll(&self) -> Duration {
        Duration::from_millis(self.handshake_poll_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn min_send_spacing(&self) -> Duration {
        Duration::from_micros(self.min_send_spacing_us)
    }

    pub fn calm_to_active_timeout(&self) -> Duration {
        Duration::from_millis(self.calm_to_active_timeout_ms)
    }

    pub fn active_to_calm_timeout(&self) -> Duration {
        Duration::from_millis(self.active_to_calm_timeout_ms)
    }

    pub fn report_period(&self) -> Duration {
        Duration::from_secs(self.report_period_secs)
    }

    /// Reader settings derived from this config.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            poll_timeout: self.poll_timeout(),
            scan_budget: self.scan_budget,
        }
    }
}
