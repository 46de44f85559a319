//! I2C device addresses.

use std::fmt;

use crate::error::{Error, Result};

/// The address of a device on the I2C bus, without the read/write bit.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Addr {
    SevenBit(u8),
    TenBit(u16),
}

impl Addr {
    /// The address value.
    pub fn base(&self) -> u16 {
        match *self {
            Addr::SevenBit(addr) => u16::from(addr),
            Addr::TenBit(addr) => addr,
        }
    }

    /// Width of the address in bits.
    pub fn bits(&self) -> u8 {
        match self {
            Addr::SevenBit(_) => 7,
            Addr::TenBit(_) => 10,
        }
    }

    /// The address as a 7-bit value, for operations that do not support
    /// anything else.
    pub(crate) fn seven_bit(&self) -> Result<u8> {
        match *self {
            Addr::SevenBit(addr) if addr <= 0x7f => Ok(addr),
            Addr::SevenBit(addr) => Err(Error::InvalidAddress {
                addr: u16::from(addr),
                bits: 7,
            }),
            Addr::TenBit(_) => Err(Error::AddressWidth { bits: 10 }),
        }
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x} ({} bit)", self.base(), self.bits())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seven_bit_only() {
        assert_eq!(Addr::SevenBit(0x50).seven_bit().unwrap(), 0x50);
        assert!(matches!(
            Addr::SevenBit(0x80).seven_bit(),
            Err(Error::InvalidAddress { addr: 0x80, bits: 7 })
        ));
        assert!(matches!(
            Addr::TenBit(0x150).seven_bit(),
            Err(Error::AddressWidth { bits: 10 })
        ));
    }

    #[test]
    fn display() {
        assert_eq!(Addr::SevenBit(0x50).to_string(), "0x50 (7 bit)");
        assert_eq!(Addr::TenBit(0x150).to_string(), "0x150 (10 bit)");
    }
}
