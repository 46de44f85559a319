//! Serial port transport.

use std::io::{Read, Write};
use std::time::Duration;

use log::{debug, info, trace};
use serialport::{SerialPort, SerialPortType};

use super::Transport;
use crate::{error::TransportError, Settings};

//==============================================================================
// Public Interface
//==============================================================================

/// A probe reached through a serial port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open the port named in `settings` and configure it.
    ///
    /// The device node may show up a little after the probe is plugged, so
    /// opening is retried a few times before giving up.
    pub fn open(settings: &Settings) -> Result<Self, TransportError> {
        use retry::{delay, retry_with_index};

        let path = settings.path.clone().ok_or_else(|| {
            serialport::Error::new(serialport::ErrorKind::InvalidInput, "no serial port given")
        })?;

        let result = retry_with_index(
            delay::Fixed::from_millis(1000).take(4),
            |index| -> Result<Box<dyn SerialPort>, serialport::Error> {
                debug!("Trying to connect {}", index);
                serialport::new(&path, settings.baud_rate)
                    .data_bits(settings.data_bits)
                    .stop_bits(settings.stop_bits)
                    .parity(settings.parity)
                    .flow_control(settings.flow_control)
                    .timeout(settings.handshake.drain_timeout)
                    .open()
            },
        );
        let mut port = match result {
            Ok(port) => port,
            Err(retry::Error::Operation {
                error,
                total_delay,
                tries,
            }) => {
                info!(
                    "Failed to open the port after {:?} and {} tries: {}",
                    total_delay, tries, error,
                );
                return Err(error.into());
            }
            Err(retry::Error::Internal(_)) => {
                info!("Internal retry error while opening port");
                return Err(serialport::Error::new(
                    serialport::ErrorKind::Unknown,
                    "internal error while retrying to open the port",
                )
                .into());
            }
        };

        // Some drivers ignore the builder values on open.
        port.set_baud_rate(settings.baud_rate)?;
        port.set_data_bits(settings.data_bits)?;
        port.set_stop_bits(settings.stop_bits)?;
        port.set_parity(settings.parity)?;
        port.set_flow_control(settings.flow_control)?;

        info!(
            "Connected to {} at {} baud",
            port.name().unwrap_or_else(|| path.clone()),
            port.baud_rate()?
        );
        debug!("data_bits    : {:#?}", port.data_bits()?);
        debug!("stop_bits    : {:#?}", port.stop_bits()?);
        debug!("parity       : {:#?}", port.parity()?);
        debug!("flow control : {:#?}", port.flow_control()?);

        if port.baud_rate()? != settings.baud_rate {
            return Err(serialport::Error::new(
                serialport::ErrorKind::InvalidInput,
                format!("baud rate {} is not supported by the port", settings.baud_rate),
            )
            .into());
        }

        Ok(SerialTransport { port })
    }

    /// Give back the underlying port.
    pub fn into_inner(self) -> Box<dyn SerialPort> {
        self.port
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        Ok(Write::write(&mut self.port, buf)?)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(Read::read(&mut self.port, buf)?)
    }

    /// The serial port has no notion of a minimum byte count; reads return as
    /// soon as some data is there, which `read_exact` copes with.
    fn set_read_params(
        &mut self,
        min_bytes: usize,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        trace!("read params: min {} bytes, timeout {:?}", min_bytes, timeout);
        self.port.set_timeout(timeout)?;
        Ok(())
    }
}

/// Enumerates the serial devices on the system. USB ports carry the
/// manufacturer and product after the port name, separated by a `:`.
pub fn available_ports() -> Vec<String> {
    let mut ports = vec![];
    match serialport::available_ports() {
        Ok(found) => {
            for p in found {
                match p.port_type {
                    // USB ports give us more info about the connected serial
                    // controller
                    SerialPortType::UsbPort(info) => {
                        let extended_name = format!(
                            "{}: ({} / {})",
                            p.port_name,
                            info.manufacturer.as_ref().map_or("", String::as_str),
                            info.product.as_ref().map_or("", String::as_str)
                        );
                        ports.push(extended_name);
                    }
                    _ => {
                        ports.push(p.port_name);
                    }
                }
            }
        }
        Err(ref e) => {
            info!("error: {}", e.to_string());
        }
    }
    ports
}
