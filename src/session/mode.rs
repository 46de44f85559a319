//! Operating modes of the probe.

use std::fmt;

/// The operating modes the probe can be in, as far as the host knows.
///
/// `Spi`, `Uart`, `OneWire` and `Raw` exist on the probe but no protocol is
/// spoken for them, so a session never enters them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Mode {
    /// No binary session was established.
    Closed,
    /// The probe state cannot be trusted after a failed transition. Only
    /// [`Session::open`](super::Session::open) gets out of it.
    Unknown,
    BitBang,
    Spi,
    I2c,
    Uart,
    OneWire,
    Raw,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Closed => "closed",
            Mode::Unknown => "unknown",
            Mode::BitBang => "bitbang",
            Mode::Spi => "SPI",
            Mode::I2c => "I2C",
            Mode::Uart => "UART",
            Mode::OneWire => "1-Wire",
            Mode::Raw => "raw",
        };
        f.write_str(name)
    }
}
