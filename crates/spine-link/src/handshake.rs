//! Startup handshake: wait for the first frame and classify the body.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::Serialize;
use spine_frame::{Message, ReadOutcome};
use spine_transport::Transport;
use tracing::{debug, error, info, warn};

use crate::error::{LinkError, Result};
use crate::hooks::{FaultCode, LinkHooks};
use crate::link::SpineLink;
use crate::session::LinkSession;

/// What is running on the other end of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationState {
    /// The body application is streaming data frames.
    Running,
    /// Only bootloader frames arrived; the application is missing or broken.
    BootloaderOnly,
}

impl ApplicationState {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationState::Running => "running",
            ApplicationState::BootloaderOnly => "bootloader_only",
        }
    }

    /// Fails with [`LinkError::BootloaderOnly`] unless the application runs.
    pub fn require_running(self) -> Result<()> {
        match self {
            ApplicationState::Running => Ok(()),
            ApplicationState::BootloaderOnly => Err(LinkError::BootloaderOnly),
        }
    }
}

/// Ask the body to start streaming and block until it answers.
///
/// Sends a mode change, then polls until a data frame (`Running`) or a boot
/// frame (`BootloaderOnly`) arrives. Version and contact frames seen on the
/// way are recorded and forwarded but do not end the wait. The mode change
/// is re-sent after every run of idle polls.
///
/// Returns [`LinkError::Timeout`] when the configured handshake timeout
/// passes, after showing [`FaultCode::NoBody`], or when `shutdown` is set,
/// without showing a fault. `shutdown` is checked once per poll.
pub fn wait_for_first_frame<R, W, H>(
    link: &mut SpineLink<R, W>,
    session: &mut LinkSession,
    hooks: &mut H,
    shutdown: &AtomicBool,
) -> Result<ApplicationState>
where
    R: Transport,
    W: Write,
    H: LinkHooks + ?Sized,
{
    let timeout = session.config().handshake_timeout();
    let poll = session.config().handshake_poll();
    let resend_after = session.config().mode_change_resend_polls;

    let start = Instant::now();
    link.send(&Message::ModeChange)?;
    debug!(?timeout, "waiting for first body frame");

    let mut idle_polls = 0u32;
    loop {
        let elapsed = start.elapsed();
        if shutdown.load(Ordering::Relaxed) {
            info!("shutdown requested during handshake");
            return Err(LinkError::Timeout(elapsed));
        }
        if elapsed >= timeout {
            error!(?elapsed, "no frame from body");
            hooks.show_fault(FaultCode::NoBody);
            return Err(LinkError::Timeout(elapsed));
        }

        match link.read_frame_within(poll)? {
            ReadOutcome::Frame(frame) => match frame.message {
                Message::BodyData(data) => {
                    session.accept_body_data(*data, hooks, Instant::now());
                    info!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        "body application running"
                    );
                    session.request_version(link)?;
                    return Ok(ApplicationState::Running);
                }
                Message::BootFrame(boot) => {
                    session.accept_boot_frame(&boot, hooks);
                    warn!("body answered from its bootloader");
                    hooks.show_fault(FaultCode::BootloaderOnly);
                    return Ok(ApplicationState::BootloaderOnly);
                }
                Message::Version(info) => session.record_version(info, hooks),
                Message::ContactData(data) => hooks.on_contact_data(&data),
                other => debug!(
                    payload_type = %other.payload_type(),
                    "ignoring frame during handshake"
                ),
            },
            ReadOutcome::TimedOut => {
                idle_polls += 1;
                if idle_polls >= resend_after {
                    idle_polls = 0;
                    debug!("re-sending mode change");
                    link.send(&Message::ModeChange)?;
                }
            }
            ReadOutcome::Discarded { .. } | ReadOutcome::Pending => {}
        }
    }
}
