//! The transport plus the mode bookkeeping, and the request/response
//! primitives every command is built on.
//!
//! The primitives never look at the mode: callers check it through
//! [`Session::require`](super::Session) before using them.

use log::{info, warn};

use super::{Mode, PROTOCOL_VERSION};
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::utils::trace_bytes;

// =============================================================================
// Crate-Public Interface
// =============================================================================

pub(crate) struct Link<T> {
    pub(crate) transport: T,
    pub(crate) mode: Mode,
    /// Protocol version of the current mode, 0 when no mode is established.
    pub(crate) version: u8,
}

impl<T: Transport> Link<T> {
    pub(crate) fn new(transport: T) -> Self {
        Link {
            transport,
            mode: Mode::Closed,
            version: 0,
        }
    }

    pub(crate) fn commit(&mut self, mode: Mode) {
        info!("{} mode -> {} mode", self.mode, mode);
        self.mode = mode;
        self.version = 1;
    }

    pub(crate) fn clear_mode(&mut self) {
        self.mode = Mode::Unknown;
        self.version = 0;
    }

    /// Run the steps of a mode transition. The transition either commits
    /// `target` or leaves the probe in [`Mode::Unknown`].
    pub(crate) fn transition<F>(&mut self, target: Mode, steps: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        match steps(self) {
            Ok(()) => {
                self.commit(target);
                Ok(())
            }
            Err(err) => {
                warn!("transition to {} mode failed: {}", target, err);
                self.clear_mode();
                Err(err)
            }
        }
    }

    pub(crate) fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        trace_bytes("->", data);
        self.transport.write_all(data)?;
        Ok(())
    }

    pub(crate) fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.transport.read_exact(buf)?;
        trace_bytes("<-", buf);
        Ok(())
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_bytes(&mut buf)?;
        Ok(buf[0])
    }

    /// Write one byte, read one byte back.
    pub(crate) fn exchange_byte(&mut self, cmd: u8) -> Result<u8> {
        self.write_bytes(&[cmd])?;
        self.read_byte()
    }

    /// Write one byte and require `expected` back.
    pub(crate) fn exchange_byte_and_expect(
        &mut self,
        op: &'static str,
        cmd: u8,
        expected: u8,
    ) -> Result<()> {
        let got = self.exchange_byte(cmd)?;
        if got != expected {
            return Err(Error::UnexpectedResponse { op, got, expected });
        }
        Ok(())
    }

    /// Read a mode version string, `magic` followed by the version digit, and
    /// check it.
    pub(crate) fn expect_version_string(&mut self, magic: &'static str) -> Result<()> {
        let mut buf = [0u8; 8];
        let response = &mut buf[..magic.len() + 1];
        self.read_bytes(response)?;
        check_version_string(magic, response)
    }
}

pub(crate) fn check_version_string(magic: &'static str, response: &[u8]) -> Result<()> {
    if response.len() != magic.len() + 1 || !response.starts_with(magic.as_bytes()) {
        return Err(Error::Framing {
            expected: magic,
            got: response.to_vec(),
        });
    }

    let version = response[magic.len()];
    if version != PROTOCOL_VERSION {
        return Err(Error::UnsupportedVersion {
            protocol: magic,
            version: char::from(version),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
