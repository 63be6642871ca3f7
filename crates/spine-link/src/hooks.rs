//! Callbacks into the systems that consume link events.

use std::fmt;

use serde::Serialize;
use spine_frame::{BodyToHead, ContactData, VersionInfo};

use crate::report::InvalidProxCounts;

/// Fault conditions surfaced to the user-visible fault display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "code")]
pub enum FaultCode {
    /// No frame arrived from the body during startup.
    NoBody,
    /// The body only answered with bootloader frames.
    BootloaderOnly,
    /// The line went silent during steady-state operation.
    SpineTimeout,
    /// The body latched a non-zero fail code.
    Body(u16),
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultCode::NoBody => f.write_str("no body"),
            FaultCode::BootloaderOnly => f.write_str("body bootloader only"),
            FaultCode::SpineTimeout => f.write_str("spine timeout"),
            FaultCode::Body(code) => write!(f, "body fault 0x{code:04x}"),
        }
    }
}

/// Consumers of link events.
///
/// All methods default to doing nothing, so implementors only override
/// what they care about. Hooks run synchronously on the ticking thread.
pub trait LinkHooks {
    /// A new sensor snapshot is available.
    fn on_sensor_data(&mut self, _data: &BodyToHead) {}

    /// The body reported its version.
    fn on_version(&mut self, _info: &VersionInfo) {}

    /// Charge-contact traffic arrived from the body.
    fn on_contact_data(&mut self, _data: &ContactData) {}

    /// Charge-contact text to send after the next actuator frame, if any.
    fn contact_response(&mut self) -> Option<ContactData> {
        None
    }

    /// Show a fault to the user.
    fn show_fault(&mut self, _fault: FaultCode) {}

    /// Periodic invalid proximity reading counts.
    fn report_invalid_prox(&mut self, _counts: &InvalidProxCounts) {}
}

/// Hooks that ignore every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl LinkHooks for NoopHooks {}

impl<H: LinkHooks + ?Sized> LinkHooks for &mut H {
    fn on_sensor_data(&mut self, data: &BodyToHead) {
        (**self).on_sensor_data(data)
    }

    fn on_version(&mut self, info: &VersionInfo) {
        (**self).on_version(info)
    }

    fn on_contact_data(&mut self, data: &ContactData) {
        (**self).on_contact_data(data)
    }

    fn contact_response(&mut self) -> Option<ContactData> {
        (**self).contact_response()
    }

    fn show_fault(&mut self, fault: FaultCode) {
        (**self).show_fault(fault)
    }

    fn report_invalid_prox(&mut self, counts: &InvalidProxCounts) {
        (**self).report_invalid_prox(counts)
    }
}
