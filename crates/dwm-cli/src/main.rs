//! `dwm` - print position reports from a DWM1001 module.
//!
//! Usage:
//!   dwm --port /dev/ttyACM0 listener
//!   dwm --port /dev/ttyACM0 passive-tag --count 10
//!   dwm --config dwm.yaml active-tag --json
//!   dwm system-info

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dwm_driver::{
    ActiveTag, DriverConfig, DriverError, DriverResult, Listener, PassiveTag, Position,
    SelfReportFormat, SerialTransport, TagId,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Print position reports from a DWM1001 module.
#[derive(Parser, Debug)]
#[command(name = "dwm", version, about)]
struct Args {
    /// YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port (overrides the configuration file).
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (overrides the configuration file).
    #[arg(short, long)]
    baud: Option<u32>,

    /// Stop after this many reports.
    #[arg(short = 'n', long, global = true)]
    count: Option<u64>,

    /// Print reports as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Listen to all tags in range.
    Listener,
    /// Listen to all tags, naming them with the DW prefix.
    PassiveTag,
    /// Print this tag's own position.
    ActiveTag {
        /// Expect the legacy four-field report without the POS discriminator.
        #[arg(long)]
        legacy: bool,
    },
    /// Print the module's address and label.
    SystemInfo,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = load_config(&args)?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    info!(
        "Opening {} at {} baud",
        config.serial.port, config.serial.baud_rate
    );
    let transport = SerialTransport::open(&config.serial)?;

    match args.command {
        Command::Listener => {
            let mut listener = Listener::new(transport, config.timings)?;
            listener.start_reporting()?;
            let result = stream_reports(args.count, &running, || {
                let (tag, position) = listener.next_report()?;
                print_tag_report(&tag, &position, args.json);
                Ok(())
            });
            finish(result, listener.stop_reporting(), listener.shutdown())?;
        }
        Command::PassiveTag => {
            let mut tag = PassiveTag::new(transport, config.timings)?;
            tag.start_reporting()?;
            let result = stream_reports(args.count, &running, || {
                let (id, position) = tag.next_report()?;
                print_tag_report(&id, &position, args.json);
                Ok(())
            });
            finish(result, tag.stop_reporting(), tag.shutdown())?;
        }
        Command::ActiveTag { legacy } => {
            let format = if legacy {
                SelfReportFormat::Legacy
            } else {
                config.self_report_format
            };
            let mut tag = ActiveTag::new(transport, config.timings, format)?;
            tag.start_reporting()?;
            let result = stream_reports(args.count, &running, || {
                let position = tag.position()?;
                print_position(&position, args.json);
                Ok(())
            });
            finish(result, tag.stop_reporting(), tag.shutdown())?;
        }
        Command::SystemInfo => {
            let mut listener = Listener::new(transport, config.timings)?;
            let info = listener.system_info();
            listener.shutdown()?;
            let info = info?;
            if args.json {
                println!("{}", serde_json::to_string(&info)?);
            } else {
                println!("address: {}", info.uwb_address);
                println!("label:   {}", info.label);
            }
        }
    }

    Ok(())
}

/// Build the configuration from the optional file and command-line overrides.
fn load_config(args: &Args) -> DriverResult<DriverConfig> {
    let mut config = match &args.config {
        Some(path) => DriverConfig::from_yaml_file(path)?,
        None => DriverConfig::default(),
    };
    if let Some(port) = &args.port {
        config.serial.port = port.clone();
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    config.validate()?;
    Ok(config)
}

/// Pull reports until `count` is reached or Ctrl-C is pressed.
///
/// Lines that fail to parse are skipped; transport failures end the stream.
fn stream_reports<F>(count: Option<u64>, running: &AtomicBool, mut next: F) -> DriverResult<()>
where
    F: FnMut() -> DriverResult<()>,
{
    let mut received = 0u64;
    while running.load(Ordering::SeqCst) {
        if count.is_some_and(|n| received >= n) {
            break;
        }
        match next() {
            Ok(()) => received += 1,
            Err(DriverError::Parse(e)) => warn!("Skipping malformed report: {}", e),
            Err(e) => return Err(e),
        }
    }
    info!("Received {} reports", received);
    Ok(())
}

/// Report the streaming error first, then any cleanup error.
fn finish(result: DriverResult<()>, stop: DriverResult<()>, shutdown: DriverResult<()>) -> DriverResult<()> {
    if let Err(e) = &stop {
        warn!("Failed to stop reporting: {}", e);
    }
    result?;
    shutdown
}

fn print_tag_report(tag: &TagId, position: &Position, json: bool) {
    if json {
        println!("{}", serde_json::json!({ "tag": tag, "position": position }));
    } else {
        println!("{}: {}", tag, position);
    }
}

fn print_position(position: &Position, json: bool) {
    if json {
        println!("{}", serde_json::json!({ "position": position }));
    } else {
        println!("{}", position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwm_driver::ParseError;

    #[test]
    fn test_stream_reports_stops_at_count() {
        let running = AtomicBool::new(true);
        let mut calls = 0;
        stream_reports(Some(3), &running, || {
            calls += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_stream_reports_skips_parse_errors() {
        let running = AtomicBool::new(true);
        let mut calls = 0;
        stream_reports(Some(2), &running, || {
            calls += 1;
            if calls == 1 {
                Err(DriverError::Parse(ParseError::WrongDiscriminator("dwm>".to_string())))
            } else {
                Ok(())
            }
        })
        .unwrap();
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_stream_reports_ends_on_transport_error() {
        let running = AtomicBool::new(true);
        let result = stream_reports(None, &running, || {
            Err(DriverError::Transport(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "timed out",
            )))
        });
        assert!(matches!(result, Err(DriverError::Transport(_))));
    }

    #[test]
    fn test_stream_reports_honours_ctrl_c() {
        let running = AtomicBool::new(false);
        let mut calls = 0;
        stream_reports(None, &running, || {
            calls += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from(["dwm", "--port", "/dev/ttyUSB3", "--baud", "9600", "listener"]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB3");
        assert_eq!(config.serial.baud_rate, 9600);
    }

    #[test]
    fn test_cli_parses_active_tag_legacy() {
        let args = Args::parse_from(["dwm", "active-tag", "--legacy"]);
        assert!(matches!(args.command, Command::ActiveTag { legacy: true }));
    }
}
