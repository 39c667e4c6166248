use log::info;
use vend_serial::{
    ports::{available_ports, PortKind},
    serial::SerialError,
};

fn main() -> Result<(), SerialError> {
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    let ports = available_ports()?;
    if ports.is_empty() {
        info!("No serial ports found");
    }

    for port in ports {
        match port.kind {
            PortKind::Usb { vid, pid, product } => info!(
                "{} (USB {:04x}:{:04x} {})",
                port.name,
                vid,
                pid,
                product.unwrap_or_default()
            ),
            kind => info!("{} ({:?})", port.name, kind),
        }
    }

    Ok(())
}
