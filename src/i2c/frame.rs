//! Header of the bulk write-then-read frame.
//!
//! ```text
//! +--------+-------------+-------------+-----------------+
//! |  0x08  | wlen (u16)  | rlen (u16)  | wlen data bytes |
//! +--------+-------------+-------------+-----------------+
//! ```
//!
//! Both lengths are big-endian. The probe answers with a status byte, `0x01`
//! when every written byte was acknowledged, followed by the `rlen` bytes read
//! when the status is OK.

use super::CMD_WRITE_THEN_READ;
use crate::error::{Error, Result};

/// Largest write payload of a single frame.
pub const MAX_WRITE: usize = 4096;
/// Largest read of a single frame.
pub const MAX_READ: usize = 4096;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BulkHeader {
    pub write_len: u16,
    pub read_len: u16,
}

impl BulkHeader {
    /// Encoded size of the header.
    pub const LEN: usize = 5;

    /// Header for a write of `write_len` bytes followed by a read of
    /// `read_len` bytes.
    pub fn new(write_len: usize, read_len: usize) -> Result<Self> {
        check_bounds(write_len, read_len)?;
        Ok(BulkHeader {
            write_len: write_len as u16,
            read_len: read_len as u16,
        })
    }

    pub fn encode(&self) -> [u8; Self::LEN] {
        let w = self.write_len.to_be_bytes();
        let r = self.read_len.to_be_bytes();
        [CMD_WRITE_THEN_READ, w[0], w[1], r[0], r[1]]
    }

    pub fn decode(bytes: &[u8; Self::LEN]) -> Result<Self> {
        if bytes[0] != CMD_WRITE_THEN_READ {
            return Err(Error::UnexpectedResponse {
                op: "decode bulk header",
                got: bytes[0],
                expected: CMD_WRITE_THEN_READ,
            });
        }
        let write_len = u16::from_be_bytes([bytes[1], bytes[2]]);
        let read_len = u16::from_be_bytes([bytes[3], bytes[4]]);
        Self::new(usize::from(write_len), usize::from(read_len))
    }
}

fn check_bounds(write_len: usize, read_len: usize) -> Result<()> {
    if write_len > MAX_WRITE {
        return Err(Error::Bounds {
            what: "write",
            len: write_len,
            max: MAX_WRITE,
        });
    }
    if read_len > MAX_READ {
        return Err(Error::Bounds {
            what: "read",
            len: read_len,
            max: MAX_READ,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
