//! The byte channel between the host and the probe.
//!
//! The driver only needs a duplex channel with blocking reads bounded by a
//! timeout. [`Transport`] captures that contract; [`SerialTransport`] is the
//! implementation used with a real probe plugged on a serial port.

#[cfg(test)]
pub(crate) mod mock;
mod serial;

use std::{io, time::Duration};

use crate::error::TransportError;

pub use serial::{available_ports, SerialTransport};

// =============================================================================
// Public Interface
// =============================================================================

/// A duplex byte channel with a settable read timeout.
///
/// Implementations report a timed-out read as [`TransportError::Timeout`] so
/// that callers never have to guess whether an I/O error was a timeout.
pub trait Transport {
    /// Write some bytes, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError>;

    /// Read some bytes, returning how many were received. Partial reads are
    /// allowed.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Configure how reads block: return once `min_bytes` are available or
    /// after `timeout` has elapsed.
    fn set_read_params(&mut self, min_bytes: usize, timeout: Duration)
        -> Result<(), TransportError>;

    /// Write the whole buffer, blocking across partial writes.
    fn write_all(&mut self, mut buf: &[u8]) -> Result<(), TransportError> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => {
                    return Err(TransportError::Io(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "probe accepted no data",
                    )))
                }
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }

    /// Fill the whole buffer, blocking across partial reads until every byte
    /// arrived or a read fails.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..])? {
                0 => {
                    return Err(TransportError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "probe channel closed",
                    )))
                }
                n => filled += n,
            }
        }
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        (**self).write(buf)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).read(buf)
    }

    fn set_read_params(
        &mut self,
        min_bytes: usize,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        (**self).set_read_params(min_bytes, timeout)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
