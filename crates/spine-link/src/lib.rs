//! Head-side session management for the spine link.
//!
//! Run [`wait_for_first_frame`] once at startup to learn whether the body
//! application is alive, then call [`LinkSession::step`] once per control
//! tick. The session owns all link state; events reach the rest of the
//! system through [`LinkHooks`].

pub mod config;
pub mod error;
pub mod handshake;
pub mod hooks;
pub mod link;
pub mod power;
pub mod report;
pub mod session;

pub use config::LinkConfig;
pub use error::{LinkError, Result};
pub use handshake::{wait_for_first_frame, ApplicationState};
pub use hooks::{FaultCode, LinkHooks, NoopHooks};
pub use link::SpineLink;
pub use power::{PowerAnomaly, PowerMode, PowerTracker};
pub use report::{InvalidProxCounts, ProxFailure, ProxReport};
pub use session::{Inbound, LinkSession, TickStatus, VersionTicket};
