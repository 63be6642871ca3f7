//! Scripted in-memory transport for exercising the link without hardware.
//!
//! Inbound traffic is a queue of steps: byte chunks, poll timeouts and
//! injected errors. Clones share state, so a test can keep one handle to
//! feed bytes and inspect what was written while the code under test owns
//! another.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::rc::Rc;
use std::time::Duration;

use crate::traits::Transport;

#[derive(Debug)]
enum Step {
    Data(Vec<u8>),
    Timeout,
    Fail(ErrorKind),
}

#[derive(Debug, Default)]
struct Shared {
    inbound: VecDeque<Step>,
    outbound: Vec<u8>,
    writes: usize,
    polls: usize,
}

/// A transport whose inbound side replays a script.
///
/// When the script is empty the line is silent: reads report `WouldBlock`
/// and polls time out immediately without sleeping.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    shared: Rc<RefCell<Shared>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be delivered by subsequent reads.
    pub fn push_bytes(&self, bytes: impl AsRef<[u8]>) {
        let bytes = bytes.as_ref();
        if !bytes.is_empty() {
            self.shared
                .borrow_mut()
                .inbound
                .push_back(Step::Data(bytes.to_vec()));
        }
    }

    /// Queue a poll that expires with no data.
    pub fn push_timeout(&self) {
        self.shared.borrow_mut().inbound.push_back(Step::Timeout);
    }

    /// Queue a read error of the given kind.
    pub fn push_error(&self, kind: ErrorKind) {
        self.shared.borrow_mut().inbound.push_back(Step::Fail(kind));
    }

    /// Drain everything written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.shared.borrow_mut().outbound)
    }

    /// Number of `write` calls observed.
    pub fn write_calls(&self) -> usize {
        self.shared.borrow().writes
    }

    /// Number of `poll_readable` calls observed.
    pub fn poll_count(&self) -> usize {
        self.shared.borrow().polls
    }

    /// True once every scripted step has been consumed.
    pub fn is_drained(&self) -> bool {
        self.shared.borrow().inbound.is_empty()
    }
}

impl Read for ScriptedTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut guard = self.shared.borrow_mut();
        let shared = &mut *guard;
        match shared.inbound.front_mut() {
            Some(Step::Data(chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                chunk.drain(..n);
                if chunk.is_empty() {
                    shared.inbound.pop_front();
                }
                Ok(n)
            }
            Some(Step::Fail(kind)) => {
                let kind = *kind;
                shared.inbound.pop_front();
                Err(std::io::Error::from(kind))
            }
            Some(Step::Timeout) | None => Err(std::io::Error::from(ErrorKind::WouldBlock)),
        }
    }
}

impl Write for ScriptedTransport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut shared = self.shared.borrow_mut();
        shared.writes += 1;
        shared.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Transport for ScriptedTransport {
    fn poll_readable(&mut self, _timeout: Duration) -> std::io::Result<bool> {
        let mut guard = self.shared.borrow_mut();
        let shared = &mut *guard;
        shared.polls += 1;
        match shared.inbound.front() {
            Some(Step::Timeout) => {
                shared.inbound.pop_front();
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }
}
