use anyhow::{Context, Result};
use serialport::SerialPortType;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    info!("Listing available serial ports...\n");
    let ports = serialport::available_ports().context("Failed to list serial ports")?;

    if ports.is_empty() {
        info!("No serial ports found.");
    }
    for (i, port) in ports.iter().enumerate() {
        info!("Port #{}: {}", i + 1, port.port_name);
        match &port.port_type {
            SerialPortType::UsbPort(usb) => {
                info!("  USB VID: {:#06x}, PID: {:#06x}", usb.vid, usb.pid);
                info!(
                    "  Manufacturer: {}",
                    usb.manufacturer.as_deref().unwrap_or("<Not available>")
                );
                info!("  Product: {}", usb.product.as_deref().unwrap_or("<Not available>"));
                info!(
                    "  Serial: {}",
                    usb.serial_number.as_deref().unwrap_or("<Not available>")
                );
            }
            other => info!("  Type: {:?}", other),
        }
        info!("---");
    }
    Ok(())
}
