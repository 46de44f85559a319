//! I2C mode of the probe.
//!
//! [`Session::enter_i2c_mode`](crate::Session::enter_i2c_mode) yields an
//! [`I2c`] handle driving the bus one primitive at a time (start, stop, byte
//! read and byte write). Register transactions assembled from those
//! primitives are faithful to the bus but need many round trips.
//!
//! [`Session::enter_non_strict_i2c_mode`](crate::Session::enter_non_strict_i2c_mode)
//! yields a [`NonStrictI2c`] handle which additionally uses the probe's bulk
//! write-then-read command. Its [`transact_8x8`](I2cMaster::transact_8x8)
//! turns one register transaction into *two* bus transactions, a write and a
//! read, which is much faster but only correct when no other master is on the
//! bus and the device does not care about the missing repeated start.
//!
//! **Example** - Reading 4 bytes from register `0x10` of device `0x50`:
//! ```no_run
//! use bpcom::{Addr, I2cMaster, Session, SerialTransport, SettingsBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
//! let session = Session::with_policy(SerialTransport::open(&settings)?, settings.handshake);
//! session.open()?;
//! let i2c = session.enter_non_strict_i2c_mode()?;
//! let mut data = [0u8; 4];
//! i2c.transact_8x8(Addr::SevenBit(0x50), 0x10, &[], &mut data)?;
//! session.close()?;
//! # Ok(())
//! # }
//! ```

mod addr;
mod frame;
mod non_strict;
mod strict;

use log::warn;

use crate::error::Result;

pub use addr::Addr;
pub use frame::{BulkHeader, MAX_READ, MAX_WRITE};
pub use non_strict::NonStrictI2c;
pub use strict::I2c;

pub(crate) const I2C_MAGIC: &str = "I2C";

pub(crate) const CMD_ENTER_I2C: u8 = 0x02;
pub(crate) const CMD_START: u8 = 0x02;
pub(crate) const CMD_STOP: u8 = 0x03;
pub(crate) const CMD_READ: u8 = 0x04;
pub(crate) const CMD_ACK: u8 = 0x06;
pub(crate) const CMD_NACK: u8 = 0x07;
pub(crate) const CMD_WRITE_THEN_READ: u8 = 0x08;
/// Bulk write, the low nibble holds the byte count minus one.
pub(crate) const CMD_BULK_WRITE: u8 = 0x10;

// =============================================================================
// Public Interface
// =============================================================================

/// An I2C bus master.
pub trait I2cMaster {
    /// Issue a (repeated) start condition.
    fn start(&self) -> Result<()>;

    /// Issue a stop condition.
    fn stop(&self) -> Result<()>;

    /// Read one byte, then ACK it when `ack` is set or NACK it otherwise.
    fn read_byte(&self, ack: bool) -> Result<u8>;

    /// Write one byte. A NACK from the device is
    /// [`Error::NackReceived`](crate::Error::NackReceived).
    fn write_byte(&self, byte: u8) -> Result<()>;

    /// Write `w` to register `regaddr` of the device at `addr`, then read
    /// `r.len()` bytes back, as one bus transaction with a repeated start.
    /// Returns how many bytes were written and read.
    ///
    /// Only 7-bit addresses are supported. When anything fails after the
    /// start condition, a stop is attempted before the error is returned.
    fn transact_8x8(
        &self,
        addr: Addr,
        regaddr: u8,
        w: &[u8],
        r: &mut [u8],
    ) -> Result<(usize, usize)> {
        let base = addr.seven_bit()?;
        self.start()?;
        match strict_transact(self, base, regaddr, w, r) {
            Ok(()) => {
                self.stop()?;
                Ok((w.len(), r.len()))
            }
            Err(err) => {
                if let Err(stop_err) = self.stop() {
                    warn!("stop after failed transaction: {}", stop_err);
                }
                Err(err)
            }
        }
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// Everything between the start and the stop of a register transaction.
fn strict_transact<M: I2cMaster + ?Sized>(
    bus: &M,
    base: u8,
    regaddr: u8,
    w: &[u8],
    r: &mut [u8],
) -> Result<()> {
    bus.write_byte(base << 1)?;
    bus.write_byte(regaddr)?;
    for byte in w {
        bus.write_byte(*byte)?;
    }

    if !r.is_empty() {
        bus.start()?;
        bus.write_byte(base << 1 | 1)?;
        let last = r.len() - 1;
        for (i, slot) in r.iter_mut().enumerate() {
            *slot = bus.read_byte(i != last)?;
        }
    }
    Ok(())
}
