use std::fmt;
use std::io;

use spine_frame::FrameError;
use spine_link::LinkError;
use spine_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        TransportError::UnsupportedBaud(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        FrameError::Codec(_)
        | FrameError::LengthMismatch { .. }
        | FrameError::InvalidForDirection { .. }
        | FrameError::UnknownPayloadType(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Transport(err) => transport_error(context, err),
        LinkError::Frame(err) => frame_error(context, err),
        LinkError::Timeout(_) | LinkError::PollTimeout { .. } => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        LinkError::BootloaderOnly => {
            CliError::new(HEALTH_CHECK_FAILED, format!("{context}: {err}"))
        }
        LinkError::Config(_) | LinkError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn missing_device_is_a_transport_error() {
        let err = TransportError::Open {
            path: "/dev/missing".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(transport_error("open", err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn link_errors_map_to_exit_codes() {
        assert_eq!(link_error("x", LinkError::BootloaderOnly).code, HEALTH_CHECK_FAILED);
        assert_eq!(
            link_error("x", LinkError::Timeout(Duration::from_secs(2))).code,
            TIMEOUT
        );
        assert_eq!(
            link_error("x", LinkError::Config("bad".into())).code,
            DATA_INVALID
        );
        assert_eq!(
            link_error("x", LinkError::Frame(FrameError::UnknownPayloadType(1))).code,
            DATA_INVALID
        );
    }
}
