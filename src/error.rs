//! Errors reported by the probe driver.
//!
//! Every failure the driver can report is one variant of [`Error`]. Transport
//! level failures are classified once, at the transport boundary, into
//! [`TransportError`]; in particular a read timeout is always
//! [`TransportError::Timeout`] and never needs to be recognized by inspecting
//! an I/O error.

use std::{fmt, io};

use thiserror::Error;

use crate::session::Mode;

/// Convenience alias used by all fallible driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the byte channel connecting the host to the probe.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A read did not complete within the configured timeout.
    #[error("read timed out")]
    Timeout,
    /// The serial port driver failed, e.g. while changing the port settings.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(io::Error),
}
impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout,
            _ => TransportError::Io(err),
        }
    }
}

/// Which half of a non-strict register transaction failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    /// Device address, register address and payload being written.
    Write,
    /// Device address with the read bit being written, then data read back.
    Read,
}
impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Write => f.write_str("write"),
            Phase::Read => f.write_str("read"),
        }
    }
}

/// Everything that can go wrong while driving the probe.
#[derive(Debug, Error)]
pub enum Error {
    /// The operation needs the probe in a specific mode and it is not.
    #[error("{op}: need to be in {required} mode, currently in {current} mode")]
    WrongMode {
        op: &'static str,
        required: Mode,
        current: Mode,
    },

    /// The operation cannot be issued at all from the current mode.
    #[error("{op}: not possible while in {current} mode")]
    ModeNotAllowed { op: &'static str, current: Mode },

    /// A mode version string did not start with the expected magic.
    #[error("expected version string \"{expected}x\", got {got:02x?}")]
    Framing { expected: &'static str, got: Vec<u8> },

    /// The probe speaks a protocol version this driver does not support.
    #[error("only {protocol} version 1 is supported, probe uses version {version:?}")]
    UnsupportedVersion { protocol: &'static str, version: char },

    /// A command was answered with something other than the expected byte.
    #[error("{op}: unexpected response from probe, got {got:#04x}, want {expected:#04x}")]
    UnexpectedResponse {
        op: &'static str,
        got: u8,
        expected: u8,
    },

    /// The byte channel to the probe failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No answer to the binary-mode handshake after all attempts.
    #[error("no suitable response after {attempts} handshake attempts")]
    RetriesExhausted { attempts: usize },

    /// Stray bytes kept arriving after the handshake.
    #[error("probe kept sending data after the handshake ({len} bytes drained)")]
    DrainOverflow { len: usize },

    /// A buffer is larger than what the protocol can carry.
    #[error("{what} of {len} bytes requested, maximum of {max} supported")]
    Bounds {
        what: &'static str,
        len: usize,
        max: usize,
    },

    /// Only 7-bit addressing is supported by this operation.
    #[error("only 7 bit addressing is supported, got a {bits} bit address")]
    AddressWidth { bits: u8 },

    /// The address does not fit its declared width.
    #[error("address {addr:#x} does not fit in {bits} bits")]
    InvalidAddress { addr: u16, bits: u8 },

    /// The addressed device did not acknowledge a written byte.
    #[error("NACK received")]
    NackReceived,

    /// A bulk write was not acknowledged at some point.
    #[error("no such device (NACK during bulk write)")]
    NoSuchDevice,

    /// The data byte was read, but acknowledging it failed. The byte is
    /// suspect.
    #[error("read {data:#04x} but could not (N)ACK it")]
    AckAfterRead {
        data: u8,
        #[source]
        source: Box<Error>,
    },

    /// Returning to bit-bang mode before leaving binary mode failed.
    #[error("could not enter bitbang mode to close connection")]
    CloseAborted(#[source] Box<Error>),

    /// One phase of a non-strict register transaction failed. Nothing is known
    /// about how many bytes were transferred.
    #[error("{phase} phase of the transaction failed")]
    Transaction {
        phase: Phase,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// `true` for the mode precondition failures.
    pub fn is_mode_error(&self) -> bool {
        matches!(self, Error::WrongMode { .. } | Error::ModeNotAllowed { .. })
    }

    /// `true` when the root cause is an addressed device not acknowledging,
    /// something callers may want to retry at the application level.
    pub fn is_nack(&self) -> bool {
        match self {
            Error::NackReceived | Error::NoSuchDevice => true,
            Error::Transaction { source, .. } => source.is_nack(),
            _ => false,
        }
    }

    /// `true` when a read timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Timeout))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
