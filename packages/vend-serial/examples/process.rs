//! Decodes frames from a hex dump given on the command line or on stdin.
//!
//! ```sh
//! cargo run --example process -- "02 30 30 35 20 31 30 37 31 03 34 30 39 31"
//! ```

use std::io::Read;

use log::error;
use vend_serial::{
    protocol::ScanAdvance,
    settings::FrameOptions,
    terminal::{log_line, process_dump, LogKind},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mut options = FrameOptions::default();
    if let Some(position) = args.iter().position(|arg| arg == "--advance") {
        let name = args.get(position + 1).cloned().unwrap_or_default();
        options.advance = name.parse::<ScanAdvance>()?;
        args.drain(position..(position + 2).min(args.len()));
    }

    let dump = if args.is_empty() {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        args.join(" ")
    };

    let processed = process_dump(&dump, &options)?;
    for report in &processed.reports {
        report.log();
    }
    if let Some(e) = processed.error {
        error!("Stopped decoding: {}", e);
    }
    log_line(
        LogKind::Normal,
        &format!("{} frames processed", processed.reports.len()),
    );

    Ok(())
}
