//! Fast, non-strict register transactions over the bulk write-then-read
//! command.

use std::ops::Deref;

use log::debug;

use super::{Addr, BulkHeader, I2c, I2cMaster, MAX_READ, MAX_WRITE};
use crate::error::{Error, Phase, Result};
use crate::session::{Mode, ANS_OK};
use crate::transport::Transport;

/// The probe in I2C mode, with a fast but not completely faithful
/// [`transact_8x8`](I2cMaster::transact_8x8).
///
/// One register transaction results in *two* transactions on the bus: the
/// register address and payload are written, then the data is read in a
/// separate transaction. Before using it, make sure no other master can talk
/// in between and that the device behaves the same when a write-then-read is
/// split in two. In exchange, expect substantial speed gains.
///
/// All strict primitives stay available through [`Deref`] to [`I2c`].
pub struct NonStrictI2c<'s, T: Transport> {
    i2c: I2c<'s, T>,
}

impl<'s, T: Transport> Clone for NonStrictI2c<'s, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'s, T: Transport> Copy for NonStrictI2c<'s, T> {}

impl<'s, T: Transport> From<I2c<'s, T>> for NonStrictI2c<'s, T> {
    fn from(i2c: I2c<'s, T>) -> Self {
        NonStrictI2c { i2c }
    }
}

impl<'s, T: Transport> Deref for NonStrictI2c<'s, T> {
    type Target = I2c<'s, T>;

    fn deref(&self) -> &Self::Target {
        &self.i2c
    }
}

impl<'s, T: Transport> NonStrictI2c<'s, T> {
    /// Write `w` on the bus, then read `r.len()` bytes, in one bulk frame.
    /// `w` is expected to start with the addressed device.
    ///
    /// Any status other than OK is reported as [`Error::NoSuchDevice`]: the
    /// probe does not tell which written byte was not acknowledged. Both
    /// lengths are limited to 4096 bytes and checked before anything is sent.
    pub fn write_then_read(&self, w: &[u8], r: &mut [u8]) -> Result<()> {
        let mut link = self.session().require("i2c write then read", Mode::I2c)?;
        let header = BulkHeader::new(w.len(), r.len())?;

        let mut frame = Vec::with_capacity(BulkHeader::LEN + w.len());
        frame.extend_from_slice(&header.encode());
        frame.extend_from_slice(w);
        link.write_bytes(&frame)?;

        // The probe would answer 0x00 right after the header when a length is
        // out of its bounds. The bounds are checked above, so the status byte
        // read here is the outcome of the write.
        let status = link.read_byte()?;
        if status != ANS_OK {
            return Err(Error::NoSuchDevice);
        }

        if !r.is_empty() {
            link.read_bytes(r)?;
        }
        Ok(())
    }
}

impl<'s, T: Transport> I2cMaster for NonStrictI2c<'s, T> {
    fn start(&self) -> Result<()> {
        self.i2c.start()
    }

    fn stop(&self) -> Result<()> {
        self.i2c.stop()
    }

    fn read_byte(&self, ack: bool) -> Result<u8> {
        self.i2c.read_byte(ack)
    }

    fn write_byte(&self, byte: u8) -> Result<()> {
        self.i2c.write_byte(byte)
    }

    /// Register transaction split in a write frame and a read frame. On
    /// failure nothing is known about how many bytes went through, the error
    /// only tells which phase failed.
    fn transact_8x8(
        &self,
        addr: Addr,
        regaddr: u8,
        w: &[u8],
        r: &mut [u8],
    ) -> Result<(usize, usize)> {
        self.session().require("i2c transact", Mode::I2c)?;
        let base = addr.seven_bit()?;

        // The write frame also carries the device and register addresses.
        let max_write = MAX_WRITE - 2;
        if w.len() > max_write {
            return Err(Error::Bounds {
                what: "write",
                len: w.len(),
                max: max_write,
            });
        }
        if r.len() > MAX_READ {
            return Err(Error::Bounds {
                what: "read",
                len: r.len(),
                max: MAX_READ,
            });
        }

        debug!(
            "nonstrict transact_8x8 addr {} regaddr {:#04x} len(w) {} len(r) {}",
            addr,
            regaddr,
            w.len(),
            r.len()
        );

        let mut wbuf = Vec::with_capacity(w.len() + 2);
        wbuf.push(base << 1);
        wbuf.push(regaddr);
        wbuf.extend_from_slice(w);
        self.write_then_read(&wbuf, &mut [])
            .map_err(|err| Error::Transaction {
                phase: Phase::Write,
                source: Box::new(err),
            })?;

        self.write_then_read(&[base << 1 | 1], r)
            .map_err(|err| Error::Transaction {
                phase: Phase::Read,
                source: Box::new(err),
            })?;

        Ok((w.len(), r.len()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::transport::mock::MockTransport;

    fn i2c_session(mock: &MockTransport) -> Session<MockTransport> {
        Session::in_mode(mock.clone(), Mode::I2c)
    }

    #[test]
    fn enter_non_strict_mode() {
        let mock = MockTransport::new();
        mock.reply(b"I2C1").reply(&[0x01]);
        let session = Session::in_mode(mock.clone(), Mode::BitBang);
        let i2c = session.enter_non_strict_i2c_mode().unwrap();

        i2c.start().unwrap();

        assert_eq!(session.mode(), Mode::I2c);
        assert_eq!(mock.written(), vec![0x02, 0x02]);
    }

    #[test]
    fn write_then_read_frame() {
        let mock = MockTransport::new();
        mock.reply(&[0x01, 0xca, 0xfe]);
        let session = i2c_session(&mock);
        let i2c = NonStrictI2c::from(I2c::from_session(&session));

        let mut r = [0u8; 2];
        i2c.write_then_read(&[0xa0, 0x10], &mut r).unwrap();

        assert_eq!(r, [0xca, 0xfe]);
        assert_eq!(
            mock.written(),
            vec![0x08, 0x00, 0x02, 0x00, 0x02, 0xa0, 0x10]
        );
        assert!(mock.exhausted());
    }

    #[test]
    fn write_then_read_nack_skips_the_read() {
        let mock = MockTransport::new();
        mock.reply(&[0x00, 0xca, 0xfe]);
        let session = i2c_session(&mock);
        let i2c = NonStrictI2c::from(I2c::from_session(&session));

        let mut r = [0u8; 2];
        let err = i2c.write_then_read(&[0xa0], &mut r).unwrap_err();

        assert!(matches!(err, Error::NoSuchDevice));
        assert_eq!(r, [0, 0]);
        assert!(!mock.exhausted());
    }

    #[test]
    fn write_then_read_bounds_are_checked_before_sending() {
        let mock = MockTransport::new();
        let session = i2c_session(&mock);
        let i2c = NonStrictI2c::from(I2c::from_session(&session));

        let err = i2c
            .write_then_read(&vec![0u8; MAX_WRITE + 1], &mut [])
            .unwrap_err();
        assert!(matches!(err, Error::Bounds { what: "write", len: 4097, max: 4096 }));

        let err = i2c
            .write_then_read(&[0xa1], &mut vec![0u8; MAX_READ + 1])
            .unwrap_err();
        assert!(matches!(err, Error::Bounds { what: "read", .. }));

        assert_eq!(mock.writes(), 0);
    }

    #[test]
    fn write_then_read_write_failure_is_fatal() {
        let mock = MockTransport::new();
        mock.fail_writes();
        mock.reply(&[0x01]);
        let session = i2c_session(&mock);
        let i2c = NonStrictI2c::from(I2c::from_session(&session));

        assert!(matches!(
            i2c.write_then_read(&[0xa0], &mut []),
            Err(Error::Transport(_))
        ));
    }

    #[test]
    fn write_then_read_needs_i2c_mode() {
        let mock = MockTransport::new();
        let session = Session::in_mode(mock.clone(), Mode::BitBang);
        let i2c = NonStrictI2c::from(I2c::from_session(&session));

        assert!(i2c
            .write_then_read(&[0xa0], &mut [])
            .unwrap_err()
            .is_mode_error());
        assert!(i2c
            .transact_8x8(Addr::SevenBit(0x50), 0, &[], &mut [])
            .unwrap_err()
            .is_mode_error());
        assert_eq!(mock.writes(), 0);
    }

    #[test]
    fn register_transaction_in_two_frames() {
        let mock = MockTransport::new();
        mock.reply(&[0x01]).reply(&[0x01, 1, 2, 3, 4]);
        let session = i2c_session(&mock);
        let i2c = NonStrictI2c::from(I2c::from_session(&session));

        let mut r = [0u8; 4];
        let counts = i2c
            .transact_8x8(Addr::SevenBit(0x50), 0x10, &[0xaa, 0xbb], &mut r)
            .unwrap();

        assert_eq!(counts, (2, 4));
        assert_eq!(r, [1, 2, 3, 4]);
        assert_eq!(
            mock.written(),
            vec![
                0x08, 0x00, 0x04, 0x00, 0x00, 0xa0, 0x10, 0xaa, 0xbb, // write phase
                0x08, 0x00, 0x01, 0x00, 0x04, 0xa1, // read phase
            ]
        );
    }

    #[test]
    fn register_transaction_read_phase_failure() {
        let mock = MockTransport::new();
        mock.reply(&[0x01]).reply(&[0x00]);
        let session = i2c_session(&mock);
        let i2c = NonStrictI2c::from(I2c::from_session(&session));

        let mut r = [0u8; 4];
        let err = i2c
            .transact_8x8(Addr::SevenBit(0x50), 0x10, &[0xaa, 0xbb], &mut r)
            .unwrap_err();

        match err {
            Error::Transaction { phase, ref source } => {
                assert_eq!(phase, Phase::Read);
                assert!(matches!(**source, Error::NoSuchDevice));
            }
            ref other => panic!("unexpected {:?}", other),
        }
        assert!(err.is_nack());
    }

    #[test]
    fn register_transaction_write_phase_failure_skips_read() {
        let mock = MockTransport::new();
        mock.reply(&[0x00]);
        let session = i2c_session(&mock);
        let i2c = NonStrictI2c::from(I2c::from_session(&session));

        let err = i2c
            .transact_8x8(Addr::SevenBit(0x50), 0x10, &[], &mut [0u8; 1])
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Transaction {
                phase: Phase::Write,
                ..
            }
        ));
        assert_eq!(mock.written(), vec![0x08, 0x00, 0x02, 0x00, 0x00, 0xa0, 0x10]);
    }

    #[test]
    fn register_transaction_limits() {
        let mock = MockTransport::new();
        let session = i2c_session(&mock);
        let i2c = NonStrictI2c::from(I2c::from_session(&session));

        assert!(matches!(
            i2c.transact_8x8(Addr::TenBit(0x150), 0x10, &[], &mut []),
            Err(Error::AddressWidth { bits: 10 })
        ));
        assert!(matches!(
            i2c.transact_8x8(Addr::SevenBit(0x50), 0x10, &vec![0u8; 4095], &mut []),
            Err(Error::Bounds { what: "write", max: 4094, .. })
        ));
        assert!(matches!(
            i2c.transact_8x8(Addr::SevenBit(0x50), 0x10, &[], &mut vec![0u8; 4097]),
            Err(Error::Bounds { what: "read", .. })
        ));
        assert_eq!(mock.writes(), 0);
    }
}
