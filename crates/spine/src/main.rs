mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "spine", version, about = "Head/body serial link driver and diagnostics")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        global = true,
        env = "SPINE_LOG_LEVEL"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            std::process::exit(exit::USAGE);
        }
        Err(err) => err.exit(),
    };
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_probe_with_defaults() {
        let cli = Cli::try_parse_from(["spine", "probe"]).expect("probe args should parse");
        match cli.command {
            Command::Probe(args) => {
                assert_eq!(args.serial.device.to_str(), Some("/dev/ttyHS0"));
                assert_eq!(args.serial.baud, 3_000_000);
            }
            other => panic!("expected probe, got {other:?}"),
        }
    }

    #[test]
    fn parses_monitor_flags() {
        let cli = Cli::try_parse_from([
            "spine",
            "--format",
            "json",
            "monitor",
            "/dev/ttyUSB0",
            "--baud",
            "115200",
            "--ticks",
            "200",
            "--calm",
            "--every",
            "10",
        ])
        .expect("monitor args should parse");

        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        match cli.command {
            Command::Monitor(args) => {
                assert_eq!(args.ticks, Some(200));
                assert!(args.calm);
                assert_eq!(args.every, 10);
                assert_eq!(args.serial.baud, 115_200);
            }
            other => panic!("expected monitor, got {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_every() {
        let err = Cli::try_parse_from(["spine", "monitor", "--every", "0"])
            .expect_err("zero interval should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
