use std::time::{Duration, Instant};

use serde::Serialize;
use spine_frame::{ReaderStats, VersionInfo};
use spine_link::{wait_for_first_frame, ApplicationState, LinkError, LinkSession};
use tracing::debug;

use crate::cmd::{
    install_ctrlc_handler, load_link_config, open_link, parse_duration, ConsoleHooks, ProbeArgs,
};
use crate::exit::{link_error, CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{or_unknown, print_record, OutputFormat};

/// How long to keep the link running for the version reply.
const VERSION_WAIT: Duration = Duration::from_millis(500);

#[derive(Serialize)]
struct VersionOutput {
    hw_revision: u32,
    hw_model: u32,
    ein: String,
    app_version: String,
}

impl From<&VersionInfo> for VersionOutput {
    fn from(info: &VersionInfo) -> Self {
        Self {
            hw_revision: info.hw_revision,
            hw_model: info.hw_model,
            ein: info.ein_hex(),
            app_version: info.app_version_str(),
        }
    }
}

#[derive(Serialize)]
struct ProbeOutput {
    device: String,
    baud_rate: u32,
    state: ApplicationState,
    handshake_ms: u64,
    version: Option<VersionOutput>,
    reader: ReaderStats,
    frames_sent: u64,
}

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = load_link_config(args.serial.config.as_deref())?;
    if let Some(timeout) = &args.timeout {
        config.handshake_timeout_ms = parse_duration(timeout)?.as_millis() as u64;
    }

    let mut link = open_link(&args.serial, &config)?;
    let shutdown = install_ctrlc_handler()?;
    let mut hooks = ConsoleHooks::default();
    let mut session = LinkSession::new(config, Instant::now());

    let start = Instant::now();
    let state = wait_for_first_frame(&mut link, &mut session, &mut hooks, &shutdown)
        .map_err(|err| link_error("handshake failed", err))?;
    let handshake_ms = start.elapsed().as_millis() as u64;

    if state == ApplicationState::Running {
        // The handshake already asked for the version; keep ticking until
        // the reply lands.
        let deadline = Instant::now() + VERSION_WAIT;
        while session.latest_version().is_none() && Instant::now() < deadline {
            match session.step(&mut link, &mut hooks, Instant::now()) {
                Ok(_) => {}
                Err(LinkError::PollTimeout { consecutive }) => {
                    debug!(consecutive, "no version reply");
                    break;
                }
                Err(err) => return Err(link_error("version request failed", err)),
            }
        }
    }

    let out = ProbeOutput {
        device: args.serial.device.display().to_string(),
        baud_rate: args.serial.baud,
        state,
        handshake_ms,
        version: session.latest_version().map(VersionOutput::from),
        reader: link.reader_stats(),
        frames_sent: link.frames_sent(),
    };
    print_probe(&out, format);

    match state {
        ApplicationState::Running => Ok(SUCCESS),
        ApplicationState::BootloaderOnly => Ok(HEALTH_CHECK_FAILED),
    }
}

fn print_probe(out: &ProbeOutput, format: OutputFormat) {
    let version = out.version.as_ref();
    let rows = [
        ("Device", out.device.clone()),
        ("Baud", out.baud_rate.to_string()),
        ("Body", out.state.as_str().to_string()),
        ("Handshake", format!("{}ms", out.handshake_ms)),
        ("App version", or_unknown(version.map(|v| v.app_version.as_str()))),
        ("HW revision", or_unknown(version.map(|v| v.hw_revision))),
        ("HW model", or_unknown(version.map(|v| v.hw_model))),
        ("EIN", or_unknown(version.map(|v| v.ein.as_str()))),
        ("Frames read", out.reader.frames.to_string()),
        ("CRC errors", out.reader.crc_errors.to_string()),
        ("Frames sent", out.frames_sent.to_string()),
    ];
    print_record(out, "Spine probe", &rows, format);
}
