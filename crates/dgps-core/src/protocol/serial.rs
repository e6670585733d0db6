//! Serial port handling
//!
//! Opens the receiver's serial device as an async stream and enumerates the
//! ports a receiver may be attached to.

use serialport::{SerialPortInfo, SerialPortType};
use std::time::Duration;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use super::{channel::io_runtime, Channel, TransportError};

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl PortInfo {
    /// True if the port sits behind a USB adapter
    pub fn is_usb(&self) -> bool {
        self.vid.is_some()
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => Self {
                name: info.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            _ => Self {
                name: info.port_name,
                vid: None,
                pid: None,
                manufacturer: None,
                product: None,
            },
        }
    }
}

/// Order USB adapters first, then by name
fn sort_ports(ports: &mut [PortInfo]) {
    ports.sort_by(|a, b| b.is_usb().cmp(&a.is_usb()).then_with(|| a.name.cmp(&b.name)));
}

/// List serial ports a receiver may be connected to
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(PortInfo::from).collect(),
        Err(e) => {
            tracing::warn!("list_ports: enumeration failed: {}", e);
            Vec::new()
        }
    };
    sort_ports(&mut ports);
    ports
}

/// Open `name` at `baud_rate`, 8N1 without flow control, as a channel with
/// the given response timeout.
pub(crate) fn open_channel(
    name: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Channel<SerialStream>, TransportError> {
    let runtime = io_runtime()?;

    // The stream registers with the reactor of the runtime it is opened in
    let stream = {
        let _guard = runtime.enter();
        tokio_serial::new(name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| TransportError::OpenFailed {
                port: name.to_string(),
                reason: e.to_string(),
            })?
    };

    tracing::debug!("open_channel: opened {} at {} baud", name, baud_rate);
    Ok(Channel::from_parts(runtime, stream, timeout))
}
