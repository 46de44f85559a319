//! Bpcom drives a [Bus Pirate](http://dangerousprototypes.com/docs/Bus_Pirate)
//! probe over its binary protocol, from the host side of a serial connection,
//! and talks I2C through it.
//!
//! The probe is always in exactly one operating mode. The host tracks that mode
//! in a [`Session`], which owns the serial [`Transport`] and is the only place
//! the mode is ever changed:
//!
//! * A session starts `Closed`. [`Session::open`] synchronizes with the probe,
//!   whatever it was doing, and leaves it in binary bit-bang mode.
//! * Every other mode is entered from bit-bang mode and the probe must go back
//!   to bit-bang mode before leaving binary mode with [`Session::close`].
//! * A mode transition either completes, or leaves the session in the
//!   `Unknown` mode where nothing but [`Session::open`] is accepted. The host
//!   never guesses what the probe is doing after a failed transition.
//!
//! Entering a mode hands out a handle, like [`I2c`], that borrows the session.
//! Handles carry no mode of their own: each command first checks the session
//! mode, so a handle kept across a mode change fails without sending anything.
//!
//! All exchanges are strict request/response pairs over the serial line, with
//! no pipelining. A session is not thread-safe; share a probe between threads
//! by putting the session behind a lock.

mod error;
mod i2c;
mod session;
mod settings;
mod transport;
mod utils;

pub use error::{Error, Phase, Result, TransportError};
pub use i2c::{Addr, BulkHeader, I2c, I2cMaster, NonStrictI2c, MAX_READ, MAX_WRITE};
pub use session::{Mode, Session};
pub use settings::{HandshakePolicy, Settings, SettingsBuilder};
pub use transport::{available_ports, SerialTransport, Transport};
