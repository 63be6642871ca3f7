use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use spine_frame::{BodyToHead, ContactData, VersionInfo};
use spine_link::{FaultCode, InvalidProxCounts, LinkConfig, LinkHooks, SpineLink};
use spine_transport::{SerialConfig, SerialPort};
use tracing::{debug, error};

use crate::exit::{link_error, CliError, CliResult, DATA_INVALID, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod monitor;
pub mod probe;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the startup handshake and report what the body is running.
    Probe(ProbeArgs),
    /// Handshake, then drive the link and print sensor snapshots.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Probe(args) => probe::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SerialArgs {
    /// Serial device connected to the body.
    #[arg(default_value = spine_transport::DEFAULT_DEVICE)]
    pub device: PathBuf,
    /// Line rate in bits per second.
    #[arg(long, default_value_t = spine_transport::DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// JSON file overriding link timing defaults.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl SerialArgs {
    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            device: self.device.clone(),
            baud_rate: self.baud,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub serial: SerialArgs,
    /// Handshake timeout (e.g. 2s, 500ms). Defaults to the link config value.
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub serial: SerialArgs,
    /// Stop after N ticks. Runs until Ctrl-C otherwise.
    #[arg(long)]
    pub ticks: Option<u64>,
    /// Request calm mode after the handshake.
    #[arg(long)]
    pub calm: bool,
    /// Print a snapshot every N ticks.
    #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(u64).range(1..))]
    pub every: u64,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Defaults, overlaid by `--config` when given.
pub fn load_link_config(path: Option<&Path>) -> CliResult<LinkConfig> {
    let config = match path {
        Some(path) => LinkConfig::load(path).map_err(|err| link_error("config", err))?,
        None => LinkConfig::default(),
    };
    config
        .validate()
        .map_err(|err| CliError::new(DATA_INVALID, format!("config: {err}")))?;
    Ok(config)
}

pub fn open_link(
    serial: &SerialArgs,
    config: &LinkConfig,
) -> CliResult<SpineLink<SerialPort, SerialPort>> {
    SpineLink::open(&serial.serial_config(), config).map_err(|err| link_error("open failed", err))
}

pub fn install_ctrlc_handler() -> CliResult<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(shutdown)
}

/// Hooks for a terminal session: faults are logged and remembered, the
/// rest is logged at debug.
#[derive(Debug, Default)]
pub struct ConsoleHooks {
    pub faults: Vec<FaultCode>,
    pub reports: Vec<InvalidProxCounts>,
    pub contact_frames: u64,
}

impl LinkHooks for ConsoleHooks {
    fn on_sensor_data(&mut self, data: &BodyToHead) {
        debug!(framecounter = data.framecounter, flags = data.flags, "sensor data");
    }

    fn on_version(&mut self, info: &VersionInfo) {
        debug!(ein = %info.ein_hex(), "version report");
    }

    fn on_contact_data(&mut self, data: &ContactData) {
        self.contact_frames += 1;
        debug!(text = %String::from_utf8_lossy(data.text()), "contact data");
    }

    fn show_fault(&mut self, fault: FaultCode) {
        error!(%fault, "fault");
        self.faults.push(fault);
    }

    fn report_invalid_prox(&mut self, counts: &InvalidProxCounts) {
        self.reports.push(*counts);
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
