//! Scripted in-memory transport for the unit tests.
//!
//! Reads are served from a queue of steps: data chunks, timeouts and I/O
//! failures. Every written byte and every read parameter change is recorded.
//! Clones share the same state so a test can keep a handle on the transport
//! after moving it into a session.

use std::{cell::RefCell, collections::VecDeque, io, rc::Rc, time::Duration};

use super::Transport;
use crate::error::TransportError;

enum Step {
    Data(Vec<u8>),
    Timeout,
    Fail,
}

#[derive(Default)]
struct State {
    steps: VecDeque<Step>,
    written: Vec<u8>,
    writes: usize,
    read_params: Vec<(usize, Duration)>,
    fail_writes: bool,
}

#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Rc<RefCell<State>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be returned by the next reads.
    pub(crate) fn reply(&self, data: &[u8]) -> &Self {
        self.state
            .borrow_mut()
            .steps
            .push_back(Step::Data(data.to_vec()));
        self
    }

    /// Queue a read timeout.
    pub(crate) fn timeout(&self) -> &Self {
        self.state.borrow_mut().steps.push_back(Step::Timeout);
        self
    }

    /// Queue an I/O failure on read.
    pub(crate) fn fail(&self) -> &Self {
        self.state.borrow_mut().steps.push_back(Step::Fail);
        self
    }

    /// Make every following write fail.
    pub(crate) fn fail_writes(&self) {
        self.state.borrow_mut().fail_writes = true;
    }

    pub(crate) fn written(&self) -> Vec<u8> {
        self.state.borrow().written.clone()
    }

    /// Number of write calls, failed ones included.
    pub(crate) fn writes(&self) -> usize {
        self.state.borrow().writes
    }

    pub(crate) fn read_params(&self) -> Vec<(usize, Duration)> {
        self.state.borrow().read_params.clone()
    }

    /// `true` once every queued step was consumed.
    pub(crate) fn exhausted(&self) -> bool {
        self.state.borrow().steps.is_empty()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        let mut state = self.state.borrow_mut();
        state.writes += 1;
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged").into());
        }
        state.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut state = self.state.borrow_mut();
        match state.steps.pop_front() {
            // A silent probe looks like a timeout.
            None | Some(Step::Timeout) => Err(TransportError::Timeout),
            Some(Step::Fail) => {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged").into())
            }
            Some(Step::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    let rest = data.split_off(n);
                    state.steps.push_front(Step::Data(rest));
                }
                Ok(n)
            }
        }
    }

    fn set_read_params(
        &mut self,
        min_bytes: usize,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        self.state
            .borrow_mut()
            .read_params
            .push((min_bytes, timeout));
        Ok(())
    }
}
