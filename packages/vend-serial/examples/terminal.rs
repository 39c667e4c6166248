//! Interactive terminal for a vending machine on a serial port.
//!
//! Each line is `index command [data]`. The frame is sent and the reply is
//! printed. `dtr on|off`, `rts on|off` and `pins` control the modem lines.

use log::{error, info, warn};
use rustyline::{error::ReadlineError, DefaultEditor};
use vend_serial::{
    commands::Request,
    ports::PortWatcher,
    protocol::Frame,
    serial::{SerialConnection, SerialError},
    settings::Settings,
    terminal::{hex_dump, log_line, LogKind},
    Connection,
};

const SETTINGS_FILE: &str = "vend-terminal.ini";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    let mut settings = Settings::load(SETTINGS_FILE)?;
    if let Some(port) = std::env::args().nth(1) {
        settings.serial.port_name = port;
    }

    let selected = if settings.serial.port_name.is_empty() {
        None
    } else {
        Some(settings.serial.port_name.as_str())
    };
    let port_name = PortWatcher::new().select_port(selected, false)?;

    let mut connection = SerialConnection::open(&port_name, &settings.serial, settings.frame)?;
    settings.serial.port_name = port_name;
    settings.save(SETTINGS_FILE)?;
    info!("Pins: {}", connection.pin_state()?);

    let mut editor = DefaultEditor::new()?;
    let mut pins = connection.pin_state()?;
    loop {
        let line = match editor.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let _ = editor.add_history_entry(line.as_str());

        if let Err(e) = run_line(&mut connection, &settings, line.trim()).await {
            log_line(LogKind::Error, &e.to_string());
        }

        let now = connection.pin_state()?;
        for (pin, level) in now.changes(&pins) {
            log_line(LogKind::Incoming, &format!("{} = {}", pin, level));
        }
        pins = now;
    }

    connection.close().await?;
    Ok(())
}

async fn run_line(
    connection: &mut SerialConnection,
    settings: &Settings,
    line: &str,
) -> Result<(), SerialError> {
    let mut words = line.splitn(3, ' ');
    let (Some(first), second, rest) = (words.next(), words.next(), words.next()) else {
        return Ok(());
    };

    match (first, second) {
        ("", _) => {}
        ("pins", None) => info!("{}", connection.pin_state()?),
        ("dtr", Some(level)) => {
            let level = level == "on";
            connection.set_dtr(level)?;
            if settings.serial.clears_log_on_dtr(level) {
                // Clear the screen and home the cursor.
                print!("\x1b[2J\x1b[H");
                log_line(LogKind::Normal, "Log cleared on DTR");
            }
        }
        ("rts", Some(level)) => connection.set_rts(level == "on")?,
        (index, Some(command)) => {
            let frame = Frame::parse(index, command, rest.unwrap_or_default())?;
            log_line(
                LogKind::Outgoing,
                &format!("Data sent: {}", hex_dump(&frame.to_bytes(settings.frame.hex_case))),
            );

            let reply = connection
                .execute_command(Request {
                    timeout: settings.serial.timeout(),
                    ..Request::new(frame)
                })
                .await?;
            log_line(
                LogKind::Incoming,
                &format!(
                    "index {} command {} data {:?} checksum {}",
                    reply.index,
                    reply.command,
                    reply.data,
                    reply.incoming_checksum_text()
                ),
            );
            if reply.verify_checksum().is_err() {
                warn!("Reply checksum does not match");
            }
        }
        _ => error!("Expected `index command [data]`"),
    }

    Ok(())
}
