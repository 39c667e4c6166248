//! Discovering serial ports and following them as devices come and go.

use log::debug;
use serialport::SerialPortType;

use crate::stream::SerialError;

/// A serial port present on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub kind: PortKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortKind {
    Usb {
        vid: u16,
        pid: u16,
        product: Option<String>,
    },
    Pci,
    Bluetooth,
    Unknown,
}

impl From<SerialPortType> for PortKind {
    fn from(port_type: SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(info) => PortKind::Usb {
                vid: info.vid,
                pid: info.pid,
                product: info.product,
            },
            SerialPortType::PciPort => PortKind::Pci,
            SerialPortType::BluetoothPort => PortKind::Bluetooth,
            SerialPortType::Unknown => PortKind::Unknown,
        }
    }
}

/// Lists the serial ports of this machine in display order.
pub fn available_ports() -> Result<Vec<PortInfo>, SerialError> {
    let mut ports: Vec<PortInfo> = tokio_serial::available_ports()?
        .into_iter()
        .map(|port| PortInfo {
            name: port.port_name,
            kind: port.port_type.into(),
        })
        .collect();

    ports.sort_by_key(|port| port_number(&port.name));
    debug!("Found {} serial ports", ports.len());

    Ok(ports)
}

fn port_names() -> Result<Vec<String>, SerialError> {
    Ok(available_ports()?.into_iter().map(|port| port.name).collect())
}

/// Number after the three letter prefix of names like `COM12`, or 0.
fn port_number(name: &str) -> i32 {
    name.get(3..)
        .and_then(|number| number.trim().parse().ok())
        .unwrap_or(0)
}

/// Sorts port names so that `COM2` comes before `COM10`.
///
/// Names without a number after their first three characters sort as 0,
/// keeping their relative order.
pub fn ordered_port_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
    names.sort_by_key(|name| port_number(name));
    names
}

/// Result of a [`PortWatcher::refresh`] that saw the port list change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortChange {
    /// All ports, in display order.
    pub ports: Vec<String>,
    /// The port that should be selected, `None` if there are no ports left.
    pub selected: Option<String>,
}

/// Remembers the last seen port list and picks a port when it changes.
#[derive(Debug, Clone, Default)]
pub struct PortWatcher {
    known: Vec<String>,
}

impl PortWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ports seen by the last refresh, in display order.
    pub fn known(&self) -> &[String] {
        &self.known
    }

    /// Compares `ports` with the previous list.
    ///
    /// Returns `None` when nothing was plugged in or removed. Otherwise a
    /// newly plugged in port wins, unless `port_open` is set and the current
    /// selection is still present. Failing both, the last port is selected.
    pub fn refresh(
        &mut self,
        ports: &[String],
        current_selection: Option<&str>,
        port_open: bool,
    ) -> Option<PortChange> {
        let removed = self.known.iter().any(|known| !ports.contains(known));
        let added: Vec<&String> = ports
            .iter()
            .filter(|port| !self.known.contains(port))
            .collect();

        if !removed && added.is_empty() {
            return None;
        }

        let newest = added.into_iter().max().cloned();
        let ports = ordered_port_names(ports.iter().cloned());
        let current = current_selection
            .filter(|current| ports.iter().any(|port| port == current))
            .map(str::to_string);
        let last = ports.last().cloned();

        let selected = if port_open {
            current.or(newest).or(last)
        } else {
            newest.or(current).or(last)
        };

        debug!("Port list changed, selecting {:?}", selected);
        self.known = ports.clone();

        Some(PortChange { ports, selected })
    }

    /// Picks the port to connect to from `ports`.
    ///
    /// Follows [`refresh`](Self::refresh) when the list changed. Otherwise
    /// keeps `current_selection` if it is still present, or the last port.
    pub fn choose(
        &mut self,
        ports: &[String],
        current_selection: Option<&str>,
        port_open: bool,
    ) -> Result<String, SerialError> {
        let selected = match self.refresh(ports, current_selection, port_open) {
            Some(change) => change.selected,
            None => current_selection
                .filter(|current| self.known.iter().any(|port| port == current))
                .map(str::to_string)
                .or_else(|| self.known.last().cloned()),
        };

        selected.ok_or(SerialError::NoPorts)
    }

    /// Lists the ports of this machine and picks one with [`choose`](Self::choose).
    pub fn select_port(
        &mut self,
        current_selection: Option<&str>,
        port_open: bool,
    ) -> Result<String, SerialError> {
        let ports = port_names()?;
        self.choose(&ports, current_selection, port_open)
    }

    /// Lists the ports of this machine and refreshes with them.
    pub fn poll(
        &mut self,
        current_selection: Option<&str>,
        port_open: bool,
    ) -> Result<Option<PortChange>, SerialError> {
        let ports = port_names()?;
        Ok(self.refresh(&ports, current_selection, port_open))
    }
}
