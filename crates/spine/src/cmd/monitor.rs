use std::sync::atomic::Ordering;
use std::thread;
use std::time::Instant;

use serde::Serialize;
use spine_frame::payload::CLIFF_COUNT;
use spine_frame::{PayloadType, ReaderStats};
use spine_link::{
    wait_for_first_frame, ApplicationState, FaultCode, Inbound, InvalidProxCounts, LinkError,
    LinkSession, PowerMode, TickStatus,
};
use tracing::info;

use crate::cmd::{install_ctrlc_handler, load_link_config, open_link, ConsoleHooks, MonitorArgs};
use crate::exit::{link_error, CliResult, SUCCESS};
use crate::output::{print_json, print_record, OutputFormat};

#[derive(Serialize)]
struct SnapshotOutput {
    tick: u64,
    inbound: Inbound,
    sent: Option<PayloadType>,
    desired_mode: PowerMode,
    observed_mode: PowerMode,
    commander_active: bool,
    framecounter: u32,
    fail_code: u16,
    battery_raw: i16,
    cliff: [u16; CLIFF_COUNT],
    prox_mm: u16,
    prox_status: u8,
    touch: u16,
    consecutive_poll_timeouts: u8,
}

#[derive(Serialize)]
struct SummaryOutput {
    ticks: u64,
    reader: ReaderStats,
    frames_sent: u64,
    invalid_prox: InvalidProxCounts,
    reports_flushed: usize,
    contact_frames: u64,
    faults: Vec<FaultCode>,
    link_lost: bool,
}

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let config = load_link_config(args.serial.config.as_deref())?;
    let tick_interval = config.min_send_spacing();

    let mut link = open_link(&args.serial, &config)?;
    let shutdown = install_ctrlc_handler()?;
    let mut hooks = ConsoleHooks::default();
    let mut session = LinkSession::new(config, Instant::now());

    wait_for_first_frame(&mut link, &mut session, &mut hooks, &shutdown)
        .and_then(ApplicationState::require_running)
        .map_err(|err| link_error("handshake failed", err))?;

    if args.calm {
        session.set_desired_power_mode(PowerMode::Calm, Instant::now());
    }

    let mut ticks = 0u64;
    let mut lost = None;
    let mut next = Instant::now();
    while !shutdown.load(Ordering::SeqCst) {
        if args.ticks.is_some_and(|limit| ticks >= limit) {
            break;
        }

        match session.step(&mut link, &mut hooks, Instant::now()) {
            Ok(status) => {
                if ticks % args.every == 0 {
                    print_snapshot(&snapshot(ticks, &status, &session), format);
                }
            }
            Err(err @ LinkError::PollTimeout { .. }) => {
                lost = Some(err);
                break;
            }
            Err(err) => return Err(link_error("tick failed", err)),
        }
        ticks += 1;

        next += tick_interval;
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        } else {
            next = now;
        }
    }

    info!(ticks, "stopping monitor");
    let invalid_prox = session.finish(&mut hooks, Instant::now());
    let summary = SummaryOutput {
        ticks,
        reader: link.reader_stats(),
        frames_sent: link.frames_sent(),
        invalid_prox,
        reports_flushed: hooks.reports.len(),
        contact_frames: hooks.contact_frames,
        faults: hooks.faults.clone(),
        link_lost: lost.is_some(),
    };
    print_summary(&summary, format);

    match lost {
        Some(err) => Err(link_error("spine link lost", err)),
        None => Ok(SUCCESS),
    }
}

fn snapshot(tick: u64, status: &TickStatus, session: &LinkSession) -> SnapshotOutput {
    let data = session.sensor_data();
    SnapshotOutput {
        tick,
        inbound: status.inbound,
        sent: status.sent,
        desired_mode: session.desired_power_mode(),
        observed_mode: session.observed_power_mode(),
        commander_active: status.commander_active,
        framecounter: data.framecounter,
        fail_code: data.fail_code,
        battery_raw: data.battery.main_voltage,
        cliff: data.cliff_sense,
        prox_mm: data.proximity.range_mm,
        prox_status: data.proximity.range_status,
        touch: session.last_valid_touch(),
        consecutive_poll_timeouts: session.consecutive_poll_timeouts(),
    }
}

fn print_snapshot(out: &SnapshotOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "tick={} mode={}/{} fc={} fail=0x{:04x} batt={} cliff={:?} prox={}mm({}) touch={} timeouts={}",
                out.tick,
                out.observed_mode,
                out.desired_mode,
                out.framecounter,
                out.fail_code,
                out.battery_raw,
                out.cliff,
                out.prox_mm,
                out.prox_status,
                out.touch,
                out.consecutive_poll_timeouts,
            );
        }
    }
}

fn print_summary(out: &SummaryOutput, format: OutputFormat) {
    let faults = if out.faults.is_empty() {
        "none".to_string()
    } else {
        out.faults
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let rows = [
        ("Ticks", out.ticks.to_string()),
        ("Frames read", out.reader.frames.to_string()),
        ("CRC errors", out.reader.crc_errors.to_string()),
        ("Poll timeouts", out.reader.poll_timeouts.to_string()),
        ("Bytes read", out.reader.bytes_read.to_string()),
        ("Frames sent", out.frames_sent.to_string()),
        ("Invalid prox", out.invalid_prox.total().to_string()),
        ("Reports", out.reports_flushed.to_string()),
        ("Contact frames", out.contact_frames.to_string()),
        ("Faults", faults),
        ("Link lost", out.link_lost.to_string()),
    ];
    print_record(out, "Monitor summary", &rows, format);
}
