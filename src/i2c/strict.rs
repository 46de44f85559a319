//! Entering I2C mode and the primitive bus operations.

use log::info;

use super::{
    I2cMaster, NonStrictI2c, CMD_ACK, CMD_BULK_WRITE, CMD_ENTER_I2C, CMD_NACK, CMD_READ,
    CMD_START, CMD_STOP, I2C_MAGIC,
};
use crate::error::{Error, Result};
use crate::session::{Mode, Session, ANS_OK};
use crate::transport::Transport;

/// The probe in I2C mode.
///
/// The handle stays usable only while the session is in I2C mode. Every
/// operation checks the session's mode first, so a handle outliving a mode
/// change fails with a mode error instead of sending anything.
pub struct I2c<'s, T: Transport> {
    session: &'s Session<T>,
}

impl<'s, T: Transport> Clone for I2c<'s, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'s, T: Transport> Copy for I2c<'s, T> {}

impl<T: Transport> Session<T> {
    /// Switch the probe to I2C mode. Only possible from bit-bang mode; a
    /// failed switch leaves the session in [`Mode::Unknown`].
    pub fn enter_i2c_mode(&self) -> Result<I2c<'_, T>> {
        let mut link = self.require("enter I2C mode", Mode::BitBang)?;
        link.transition(Mode::I2c, |link| {
            link.write_bytes(&[CMD_ENTER_I2C])?;
            link.expect_version_string(I2C_MAGIC)
        })?;
        Ok(I2c { session: self })
    }

    /// Switch the probe to I2C mode, allowing the faster but non-strict
    /// register transactions. See [`NonStrictI2c`].
    pub fn enter_non_strict_i2c_mode(&self) -> Result<NonStrictI2c<'_, T>> {
        self.enter_i2c_mode().map(NonStrictI2c::from)
    }
}

impl<'s, T: Transport> I2c<'s, T> {
    /// The session this handle drives.
    pub fn session(&self) -> &'s Session<T> {
        self.session
    }

    pub fn start(&self) -> Result<()> {
        self.session
            .require("i2c start", Mode::I2c)?
            .exchange_byte_and_expect("i2c start", CMD_START, ANS_OK)
    }

    pub fn stop(&self) -> Result<()> {
        self.session
            .require("i2c stop", Mode::I2c)?
            .exchange_byte_and_expect("i2c stop", CMD_STOP, ANS_OK)
    }

    /// Read a byte off the bus and ACK or NACK it.
    ///
    /// When the (N)ACK fails the byte was still read; it is handed back in
    /// [`Error::AckAfterRead`] but should be treated as suspect.
    pub fn read_byte(&self, ack: bool) -> Result<u8> {
        let mut link = self.session.require("i2c read byte", Mode::I2c)?;
        let data = link.exchange_byte(CMD_READ)?;

        let cmd = if ack { CMD_ACK } else { CMD_NACK };
        link.exchange_byte_and_expect("i2c read byte", cmd, ANS_OK)
            .map_err(|err| Error::AckAfterRead {
                data,
                source: Box::new(err),
            })?;
        Ok(data)
    }

    /// Write a byte on the bus, through a one byte bulk write.
    pub fn write_byte(&self, byte: u8) -> Result<()> {
        let mut link = self.session.require("i2c write byte", Mode::I2c)?;
        link.exchange_byte_and_expect("i2c write byte", CMD_BULK_WRITE, ANS_OK)?;
        match link.exchange_byte(byte)? {
            0x00 => Ok(()),
            _ => Err(Error::NackReceived),
        }
    }

    /// Probe every 7-bit address in `range` with a start, the write address
    /// and a stop, returning the addresses that acknowledged.
    pub fn scan(&self, range: std::ops::RangeInclusive<u8>) -> Result<Vec<u8>> {
        let mut found = vec![];
        for addr in range.filter(|addr| *addr <= 0x7f) {
            self.start()?;
            let answered = match self.write_byte(addr << 1) {
                Ok(()) => true,
                Err(Error::NackReceived) => false,
                Err(err) => return Err(err),
            };
            self.stop()?;
            if answered {
                info!("device found at {:#04x}", addr);
                found.push(addr);
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
impl<'s, T: Transport> I2c<'s, T> {
    /// A handle on a session whatever mode it is in.
    pub(crate) fn from_session(session: &'s Session<T>) -> Self {
        I2c { session }
    }
}

impl<'s, T: Transport> I2cMaster for I2c<'s, T> {
    fn start(&self) -> Result<()> {
        I2c::start(self)
    }

    fn stop(&self) -> Result<()> {
        I2c::stop(self)
    }

    fn read_byte(&self, ack: bool) -> Result<u8> {
        I2c::read_byte(self, ack)
    }

    fn write_byte(&self, byte: u8) -> Result<()> {
        I2c::write_byte(self, byte)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::Addr;
    use crate::transport::mock::MockTransport;

    #[test]
    fn enter_i2c_mode_from_bitbang() {
        let mock = MockTransport::new();
        mock.reply(b"I2C1");
        let session = Session::in_mode(mock.clone(), Mode::BitBang);

        session.enter_i2c_mode().unwrap();

        assert_eq!(session.mode(), Mode::I2c);
        assert_eq!(session.mode_version(), 1);
        assert_eq!(mock.written(), vec![0x02]);
    }

    #[test]
    fn enter_i2c_mode_only_from_bitbang() {
        for mode in &[Mode::Closed, Mode::Unknown, Mode::I2c, Mode::Spi] {
            let mock = MockTransport::new();
            let session = Session::in_mode(mock.clone(), *mode);
            let err = session.enter_i2c_mode().err().unwrap();
            assert!(matches!(
                err,
                Error::WrongMode {
                    required: Mode::BitBang,
                    ..
                }
            ));
            assert_eq!(mock.writes(), 0);
        }
    }

    #[test]
    fn enter_i2c_mode_failure_clears_mode() {
        let mock = MockTransport::new();
        mock.reply(b"I2C2");
        let session = Session::in_mode(mock.clone(), Mode::BitBang);

        assert!(matches!(
            session.enter_i2c_mode().err().unwrap(),
            Error::UnsupportedVersion { protocol: "I2C", version: '2' }
        ));
        assert_eq!(session.mode(), Mode::Unknown);
    }

    #[test]
    fn start_and_stop() {
        let mock = MockTransport::new();
        mock.reply(b"I2C1").reply(&[0x01, 0x01]);
        let session = Session::in_mode(mock.clone(), Mode::BitBang);
        let i2c = session.enter_i2c_mode().unwrap();

        i2c.start().unwrap();
        i2c.stop().unwrap();

        assert_eq!(mock.written(), vec![0x02, 0x02, 0x03]);
    }

    #[test]
    fn start_protocol_error_keeps_mode() {
        let mock = MockTransport::new();
        mock.reply(&[0x00]);
        let session = Session::in_mode(mock.clone(), Mode::I2c);
        let i2c = I2c::from_session(&session);

        let err = i2c.start().unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedResponse {
                op: "i2c start",
                got: 0x00,
                expected: 0x01
            }
        ));
        assert!(!err.is_mode_error());
        assert_eq!(session.mode(), Mode::I2c);
    }

    #[test]
    fn stale_handle_sends_nothing() {
        let mock = MockTransport::new();
        mock.reply(b"I2C1").reply(b"BBIO1");
        let session = Session::in_mode(mock.clone(), Mode::BitBang);
        let i2c = session.enter_i2c_mode().unwrap();
        session.enter_bitbang_mode().unwrap();
        let writes = mock.writes();

        assert!(i2c.start().unwrap_err().is_mode_error());
        assert!(i2c.stop().unwrap_err().is_mode_error());
        assert!(i2c.read_byte(true).unwrap_err().is_mode_error());
        assert!(i2c.write_byte(0xab).unwrap_err().is_mode_error());
        assert_eq!(mock.writes(), writes);
    }

    #[test]
    fn read_byte_with_ack_and_nack() {
        let mock = MockTransport::new();
        mock.reply(&[0x5a, 0x01, 0xa5, 0x01]);
        let session = Session::in_mode(mock.clone(), Mode::I2c);
        let i2c = I2c::from_session(&session);

        assert_eq!(i2c.read_byte(true).unwrap(), 0x5a);
        assert_eq!(i2c.read_byte(false).unwrap(), 0xa5);
        assert_eq!(mock.written(), vec![0x04, 0x06, 0x04, 0x07]);
    }

    #[test]
    fn read_byte_keeps_data_when_ack_fails() {
        let mock = MockTransport::new();
        mock.reply(&[0x5a, 0x00]);
        let session = Session::in_mode(mock.clone(), Mode::I2c);
        let i2c = I2c::from_session(&session);

        match i2c.read_byte(true) {
            Err(Error::AckAfterRead { data, source }) => {
                assert_eq!(data, 0x5a);
                assert!(matches!(*source, Error::UnexpectedResponse { got: 0x00, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn write_byte_ack() {
        let mock = MockTransport::new();
        mock.reply(&[0x01, 0x00]);
        let session = Session::in_mode(mock.clone(), Mode::I2c);
        let i2c = I2c::from_session(&session);

        i2c.write_byte(0xab).unwrap();
        assert_eq!(mock.written(), vec![0x10, 0xab]);
    }

    #[test]
    fn write_byte_nack() {
        let mock = MockTransport::new();
        mock.reply(&[0x01, 0x01]);
        let session = Session::in_mode(mock.clone(), Mode::I2c);
        let i2c = I2c::from_session(&session);

        let err = i2c.write_byte(0xab).unwrap_err();
        assert!(matches!(err, Error::NackReceived));
        assert!(err.is_nack());
    }

    #[test]
    fn write_byte_rejected_bulk_command() {
        let mock = MockTransport::new();
        mock.reply(&[0x00]);
        let session = Session::in_mode(mock.clone(), Mode::I2c);
        let i2c = I2c::from_session(&session);

        assert!(matches!(
            i2c.write_byte(0xab),
            Err(Error::UnexpectedResponse { op: "i2c write byte", .. })
        ));
        assert_eq!(mock.written(), vec![0x10]);
    }

    #[test]
    fn strict_register_transaction() {
        let mock = MockTransport::new();
        mock.reply(&[
            0x01, // start
            0x01, 0x00, // address + W
            0x01, 0x00, // register
            0x01, 0x00, // payload
            0x01, // repeated start
            0x01, 0x00, // address + R
            0xde, 0x01, // read + ack
            0xad, 0x01, // read + nack
            0x01, // stop
        ]);
        let session = Session::in_mode(mock.clone(), Mode::I2c);
        let i2c = I2c::from_session(&session);

        let mut r = [0u8; 2];
        let counts = i2c
            .transact_8x8(Addr::SevenBit(0x50), 0x10, &[0x42], &mut r)
            .unwrap();

        assert_eq!(counts, (1, 2));
        assert_eq!(r, [0xde, 0xad]);
        assert_eq!(
            mock.written(),
            vec![
                0x02, 0x10, 0xa0, 0x10, 0x10, 0x10, 0x42, 0x02, 0x10, 0xa1, 0x04, 0x06, 0x04,
                0x07, 0x03
            ]
        );
    }

    #[test]
    fn strict_transaction_stops_after_nack() {
        let mock = MockTransport::new();
        mock.reply(&[0x01, 0x01, 0x01, 0x01]);
        let session = Session::in_mode(mock.clone(), Mode::I2c);
        let i2c = I2c::from_session(&session);

        let err = i2c
            .transact_8x8(Addr::SevenBit(0x50), 0x10, &[], &mut [0u8; 1])
            .unwrap_err();

        assert!(err.is_nack());
        assert_eq!(mock.written(), vec![0x02, 0x10, 0xa0, 0x03]);
    }

    #[test]
    fn scan_reports_acknowledging_devices() {
        let mock = MockTransport::new();
        mock.reply(&[
            0x01, 0x01, 0x01, 0x01, // 0x50: nack
            0x01, 0x01, 0x00, 0x01, // 0x51: ack
        ]);
        let session = Session::in_mode(mock.clone(), Mode::I2c);
        let i2c = I2c::from_session(&session);

        assert_eq!(i2c.scan(0x50..=0x51).unwrap(), vec![0x51]);
        assert_eq!(
            mock.written(),
            vec![0x02, 0x10, 0xa0, 0x03, 0x02, 0x10, 0xa2, 0x03]
        );
    }
}
