//! Binary-mode session with the probe.
//!
//! A [`Session`] owns the transport and is the single source of truth for the
//! mode the probe is in. Mode handles, like the I2C ones, only borrow the
//! session and check its mode again before every command they issue.
//!
//! The following state diagram summarizes the modes a session goes through:
//!
//! ```text
//!      .--------.   open    .---------.  enter_i2c_mode  .-----.
//!      | Closed |---------->| BitBang |----------------->| I2C |
//!      '--------'           '---------'<-----------------'-----'
//!                            |   ^     enter_bitbang_mode   |
//!                  failed    |   |  open                    |  failed
//!                transition  v   |                          |  transition
//!                          .---------.                      |
//!                          | Unknown |<---------------------'
//!                          '---------'
//! ```
//!
//! **Example** - Opening a session and leaving binary mode again:
//! ```no_run
//! use bpcom::{Session, SerialTransport, SettingsBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
//! let transport = SerialTransport::open(&settings)?;
//! let session = Session::with_policy(transport, settings.handshake);
//! session.open()?;
//! session.close()?;
//! # Ok(())
//! # }
//! ```

mod link;
mod manager;
mod mode;

pub(crate) use link::Link;
pub use manager::Session;
pub use mode::Mode;

/// Only version 1 of every mode protocol is spoken.
pub(crate) const PROTOCOL_VERSION: u8 = b'1';

/// Magic of the bit-bang mode version string, `BBIO1`.
pub(crate) const BBIO_MAGIC: &str = "BBIO";

/// Enter (or reset to) binary bit-bang mode.
pub(crate) const CMD_RESET_BITBANG: u8 = 0x00;

/// Leave binary mode back to the text terminal.
pub(crate) const CMD_EXIT: u8 = 0x0f;

/// Positive answer to most commands.
pub(crate) const ANS_OK: u8 = 0x01;
