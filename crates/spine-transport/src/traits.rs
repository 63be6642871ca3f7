use std::io::{Read, Write};
use std::time::Duration;

/// A non-blocking byte pipe to the body.
///
/// `read` follows `EAGAIN` semantics: `Err(WouldBlock)` or `Ok(0)` mean
/// "no data right now", any other error is fatal for the device. Waiting
/// for data is done exclusively through [`Transport::poll_readable`], so
/// the worst-case time spent blocked is always bounded by its timeout.
pub trait Transport: Read + Write {
    /// Wait until the transport has bytes to read, or `timeout` elapses.
    ///
    /// Returns `Ok(false)` when the wait timed out with nothing to read.
    fn poll_readable(&mut self, timeout: Duration) -> std::io::Result<bool>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn poll_readable(&mut self, timeout: Duration) -> std::io::Result<bool> {
        (**self).poll_readable(timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn poll_readable(&mut self, timeout: Duration) -> std::io::Result<bool> {
        (**self).poll_readable(timeout)
    }
}

/// Unix socket pairs stand in for the serial line in loopback setups.
///
/// The stream must be switched to non-blocking mode with
/// `set_nonblocking(true)` to get the `EAGAIN` read contract.
#[cfg(unix)]
impl Transport for std::os::unix::net::UnixStream {
    fn poll_readable(&mut self, timeout: Duration) -> std::io::Result<bool> {
        use std::os::fd::AsRawFd;
        poll_fd(self.as_raw_fd(), timeout)
    }
}

/// Wait for `POLLIN` on a raw descriptor. Hang-up and error conditions also
/// report ready so the following `read` can surface them.
#[cfg(unix)]
pub(crate) fn poll_fd(fd: std::os::fd::RawFd, timeout: Duration) -> std::io::Result<bool> {
    let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    loop {
        // SAFETY: `pfd` is a valid, writable pollfd and we pass a count of 1.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        return Ok(rc > 0);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{ErrorKind, Read, Write};
    use std::os::unix::net::UnixStream;
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn poll_times_out_without_data() {
        let (mut left, _right) = UnixStream::pair().unwrap();
        left.set_nonblocking(true).unwrap();

        let start = Instant::now();
        let ready = left.poll_readable(Duration::from_millis(20)).unwrap();

        assert!(!ready);
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn poll_reports_pending_bytes() {
        let (mut left, mut right) = UnixStream::pair().unwrap();
        left.set_nonblocking(true).unwrap();
        right.write_all(&[0xAA]).unwrap();

        assert!(left.poll_readable(Duration::from_millis(100)).unwrap());
        let mut buf = [0u8; 1];
        assert_eq!(left.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 0xAA);
    }

    #[test]
    fn nonblocking_read_reports_would_block() {
        let (mut left, _right) = UnixStream::pair().unwrap();
        left.set_nonblocking(true).unwrap();

        let mut buf = [0u8; 4];
        let err = left.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
    }

    #[test]
    fn mutable_reference_forwards_poll() {
        let (mut left, mut right) = UnixStream::pair().unwrap();
        left.set_nonblocking(true).unwrap();
        right.write_all(b"x").unwrap();

        let mut borrowed = &mut left;
        assert!(Transport::poll_readable(&mut borrowed, Duration::from_millis(100)).unwrap());
    }
}
