//! Settings related to the serial port used to reach the probe and to the
//! binary-mode handshake.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values.

use std::time::Duration;

pub use serialport::{DataBits, FlowControl, Parity, StopBits};

// =============================================================================
// Public Interface
// =============================================================================

/// How hard the handshake tries to get the probe into binary mode, and how
/// long the transport waits for data at each step.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HandshakePolicy {
    /// Total number of `0x00` probes sent before giving up.
    pub max_attempts: usize,
    /// Read timeout while probing for the `BBIO1` answer.
    pub probe_timeout: Duration,
    /// Read timeout used to drain stray bytes after the handshake, and kept for
    /// ordinary operation afterwards.
    pub drain_timeout: Duration,
    /// Size of the buffer stray bytes are drained into.
    pub drain_len: usize,
}
impl Default for HandshakePolicy {
    fn default() -> Self {
        HandshakePolicy {
            max_attempts: 20,
            probe_timeout: Duration::from_millis(100),
            drain_timeout: Duration::from_millis(300),
            drain_len: 2048,
        }
    }
}

/// Groups all settings related to the serial port used by `bpcom` and acts as
/// a [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for the settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// The port name, usually the device path.
    pub path: Option<String>,
    /// The baud rate in symbols-per-second.
    pub baud_rate: u32,
    /// Number of bits used to represent a character sent on the line.
    pub data_bits: DataBits,
    /// The type of signalling to use for controlling data transfer.
    pub flow_control: FlowControl,
    /// The type of parity to use for error checking.
    pub parity: Parity,
    /// Number of bits to use to signal the end of a character.
    pub stop_bits: StopBits,

    /// Retry and timeout policy for the binary-mode handshake.
    pub handshake: HandshakePolicy,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set. The probe talks 8N1 at 115200 baud out of the box.
///
/// **Example**
///
/// ```
/// let settings = bpcom::SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
/// assert_eq!(settings.baud_rate, 115_200);
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    settings: Settings,
}
impl SettingsBuilder {
    /// Start building the settings using default values and no path for the
    /// port.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the path to the serial port
    pub fn path<'a>(mut self, path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.path = Some(path.into().as_ref().to_owned());
        self
    }

    /// Set the baud rate in symbols-per-second
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = baud_rate;
        self
    }

    /// Set the number of bits used to represent a character sent on the line
    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.settings.data_bits = data_bits;
        self
    }

    /// Set the type of signalling to use for controlling data transfer
    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.settings.flow_control = flow_control;
        self
    }

    /// Set the type of parity to use for error checking
    pub fn parity(mut self, parity: Parity) -> Self {
        self.settings.parity = parity;
        self
    }

    /// Set the number of bits to use to signal the end of a character
    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.settings.stop_bits = stop_bits;
        self
    }

    /// Set the number of handshake probes sent before giving up
    pub fn handshake_attempts(mut self, attempts: usize) -> Self {
        self.settings.handshake.max_attempts = attempts;
        self
    }

    /// Set the read timeout used while probing for binary mode
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.settings.handshake.probe_timeout = timeout;
        self
    }

    /// Set the read timeout used to drain stray bytes and for ordinary
    /// operation
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.settings.handshake.drain_timeout = timeout;
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            path: None,
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            handshake: HandshakePolicy::default(),
            _private_use_builder: (),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            path: None,
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            handshake: HandshakePolicy {
                max_attempts: 20,
                probe_timeout: Duration::from_millis(100),
                drain_timeout: Duration::from_millis(300),
                drain_len: 2048,
            },
            _private_use_builder: (),
        }
    )
}

#[test]
fn path() {
    let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
    assert_eq!(settings.path.unwrap(), "/dev/ttyUSB0");
}

#[test]
fn baud_rate() {
    let baud_rate = 1_000_000;
    let settings = SettingsBuilder::new().baud_rate(baud_rate).finalize();
    assert_eq!(settings.baud_rate, baud_rate);
}

#[test]
fn data_bits() {
    let data_bits = DataBits::Seven;
    let settings = SettingsBuilder::new().data_bits(data_bits).finalize();
    assert_eq!(settings.data_bits, data_bits);
}

#[test]
fn flow_control() {
    let flow_control = FlowControl::Hardware;
    let settings = SettingsBuilder::new().flow_control(flow_control).finalize();
    assert_eq!(settings.flow_control, flow_control);
}

#[test]
fn stop_bits() {
    let stop_bits = StopBits::Two;
    let settings = SettingsBuilder::new().stop_bits(stop_bits).finalize();
    assert_eq!(settings.stop_bits, stop_bits);
}

#[test]
fn parity() {
    let parity = Parity::Even;
    let settings = SettingsBuilder::new().parity(parity).finalize();
    assert_eq!(settings.parity, parity);
}

#[test]
fn handshake_policy() {
    let settings = SettingsBuilder::new()
        .handshake_attempts(3)
        .probe_timeout(Duration::from_millis(10))
        .drain_timeout(Duration::from_millis(50))
        .finalize();
    assert_eq!(settings.handshake.max_attempts, 3);
    assert_eq!(settings.handshake.probe_timeout, Duration::from_millis(10));
    assert_eq!(settings.handshake.drain_timeout, Duration::from_millis(50));
    assert_eq!(settings.handshake.drain_len, 2048);
}
