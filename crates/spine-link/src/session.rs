use std::io::Write;
use std::time::Instant;

use serde::Serialize;
use spine_frame::{
    BodyToHead, BootFrame, HeadToBody, LightState, Message, PayloadType, ReadOutcome, VersionInfo,
};
use spine_transport::Transport;
use tracing::{debug, error, info, trace, warn};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::hooks::{FaultCode, LinkHooks};
use crate::link::SpineLink;
use crate::power::{PowerMode, PowerTracker};
use crate::report::{InvalidProxCounts, ProxReport};

/// What one tick got from the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Inbound {
    /// A validated frame was dispatched.
    Frame { payload_type: PayloadType },
    /// A frame failed its checksum.
    Discarded,
    /// The poll expired with no data.
    TimedOut { consecutive: u8 },
    /// The read gave up mid-stream; the partial frame is kept.
    Pending,
}

/// Summary of one [`LinkSession::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickStatus {
    pub inbound: Inbound,
    /// The actuator-side frame sent this tick, if the slot was used.
    pub sent: Option<PayloadType>,
    /// The charge-contact commander owns the body; sensor data may be stale.
    pub commander_active: bool,
}

/// Marks the version reports that existed when a request was made.
///
/// Redeem with [`LinkSession::version_for`] once a newer report arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionTicket(u64);

/// All mutable link state, owned by the thread that ticks the control loop.
pub struct LinkSession {
    config: LinkConfig,
    have_valid_application: bool,
    head_data: HeadToBody,
    sensor_data: BodyToHead,
    power: PowerTracker,
    consecutive_poll_timeouts: u8,
    last_send: Option<Instant>,
    calm_slots: u32,
    commander_active: bool,
    last_fail_code: u16,
    mic_warned: bool,
    last_valid_touch: u16,
    prox_report: ProxReport,
    version: Option<VersionInfo>,
    versions_received: u64,
}

impl LinkSession {
    pub fn new(config: LinkConfig, now: Instant) -> Self {
        let prox_report = ProxReport::new(config.report_period(), now);
        Self {
            config,
            have_valid_application: false,
            head_data: HeadToBody::default(),
            sensor_data: BodyToHead::default(),
            power: PowerTracker::new(now),
            consecutive_poll_timeouts: 0,
            last_send: None,
            calm_slots: 0,
            commander_active: false,
            last_fail_code: 0,
            mic_warned: false,
            last_valid_touch: 0,
            prox_report,
            version: None,
            versions_received: 0,
        }
    }

    /// Run one control tick: send on the outbound slot if due, make exactly
    /// one read attempt, then run the periodic checks.
    ///
    /// Returns `Err(LinkError::PollTimeout)` on the tick where consecutive
    /// silent polls reach the configured threshold. The session stays usable
    /// and the caller decides whether to keep ticking.
    pub fn step<R, W, H>(
        &mut self,
        link: &mut SpineLink<R, W>,
        hooks: &mut H,
        now: Instant,
    ) -> Result<TickStatus>
    where
        R: Transport,
        W: Write,
        H: LinkHooks + ?Sized,
    {
        self.head_data.framecounter = self.head_data.framecounter.wrapping_add(1);

        let sent = self.send_outbound(link, hooks, now)?;
        let inbound = self.poll_inbound(link, hooks, now)?;

        if let Some(anomaly) = self.power.check(now, &self.config) {
            warn!(
                desired = %anomaly.desired,
                observed = %anomaly.observed,
                elapsed_ms = anomaly.elapsed.as_millis() as u64,
                "body power mode does not match request"
            );
        }

        if self.prox_report.due(now) {
            self.flush_report(hooks, now);
        }

        if let Inbound::TimedOut { consecutive } = inbound {
            if consecutive == self.config.poll_timeout_threshold {
                error!(consecutive, "spine silent, raising fault");
                hooks.show_fault(FaultCode::SpineTimeout);
                return Err(LinkError::PollTimeout { consecutive });
            }
        }

        Ok(TickStatus {
            inbound,
            sent,
            commander_active: self.commander_active,
        })
    }

    fn full_frame_due(&self) -> bool {
        self.commander_active
            || self.power.desired() == PowerMode::Active
            || self.power.transition_pending()
    }

    fn send_outbound<R, W, H>(
        &mut self,
        link: &mut SpineLink<R, W>,
        hooks: &mut H,
        now: Instant,
    ) -> Result<Option<PayloadType>>
    where
        R: Transport,
        W: Write,
        H: LinkHooks + ?Sized,
    {
        if let Some(last) = self.last_send {
            if now.saturating_duration_since(last) < self.config.min_send_spacing() {
                return Ok(None);
            }
        }
        self.last_send = Some(now);

        let sent = if self.full_frame_due() {
            self.calm_slots = 0;
            self.head_data
                .set_calm_requested(self.power.desired() == PowerMode::Calm);
            link.send(&Message::HeadData(self.head_data.clone()))?;
            Some(PayloadType::DataFrame)
        } else {
            self.calm_slots += 1;
            if self.calm_slots >= self.config.calm_light_interval {
                self.calm_slots = 0;
                link.send(&Message::LightState(LightState::from(&self.head_data)))?;
                Some(PayloadType::LightState)
            } else {
                None
            }
        };

        if let Some(response) = hooks.contact_response() {
            link.send(&Message::ContactData(response))?;
        }
        Ok(sent)
    }

    fn poll_inbound<R, W, H>(
        &mut self,
        link: &mut SpineLink<R, W>,
        hooks: &mut H,
        now: Instant,
    ) -> Result<Inbound>
    where
        R: Transport,
        W: Write,
        H: LinkHooks + ?Sized,
    {
        let inbound = match link.read_frame()? {
            ReadOutcome::Frame(frame) => {
                self.consecutive_poll_timeouts = 0;
                let payload_type = frame.payload_type();
                self.dispatch(frame.message, hooks, now);
                Inbound::Frame { payload_type }
            }
            // Bytes arrived, so the line is alive even without a frame.
            ReadOutcome::Discarded { .. } => {
                self.consecutive_poll_timeouts = 0;
                Inbound::Discarded
            }
            ReadOutcome::Pending => {
                self.consecutive_poll_timeouts = 0;
                Inbound::Pending
            }
            ReadOutcome::TimedOut => {
                self.consecutive_poll_timeouts = self.consecutive_poll_timeouts.saturating_add(1);
                debug!(
                    consecutive = self.consecutive_poll_timeouts,
                    "spine poll timed out"
                );
                Inbound::TimedOut {
                    consecutive: self.consecutive_poll_timeouts,
                }
            }
        };
        Ok(inbound)
    }

    fn dispatch<H: LinkHooks + ?Sized>(&mut self, message: Message, hooks: &mut H, now: Instant) {
        match message {
            Message::BodyData(data) => self.accept_body_data(*data, hooks, now),
            Message::BootFrame(boot) => self.accept_boot_frame(&boot, hooks),
            Message::Version(info) => self.record_version(info, hooks),
            Message::ContactData(data) => hooks.on_contact_data(&data),
            Message::Ack(ack) => debug!(status = ack.status, "body ack"),
            other => debug!(payload_type = %other.payload_type(), "ignoring unexpected frame"),
        }
    }

    pub(crate) fn accept_body_data<H: LinkHooks + ?Sized>(
        &mut self,
        data: BodyToHead,
        hooks: &mut H,
        now: Instant,
    ) {
        self.sensor_data = data;
        self.have_valid_application = true;

        let valid = self.sensor_data.sensors_valid();
        let observed = if valid {
            PowerMode::Active
        } else {
            PowerMode::Calm
        };
        self.power.observe(observed, now);

        let fail_code = self.sensor_data.fail_code;
        if fail_code != self.last_fail_code {
            if fail_code != 0 {
                error!(fail_code, "body reported a fault");
                hooks.show_fault(FaultCode::Body(fail_code));
            }
            self.last_fail_code = fail_code;
        }

        let mic_error = self.sensor_data.mic_error;
        if mic_error.iter().any(|&bits| bits != 0) {
            if !self.mic_warned {
                warn!(?mic_error, "microphone data has stuck bits");
                self.mic_warned = true;
            }
        } else {
            self.mic_warned = false;
        }

        if valid {
            let status = self.sensor_data.proximity.range_status;
            if let Some(failure) = self.prox_report.record(status) {
                trace!(%failure, status, "invalid proximity reading");
            }
            // 0xFFFF marks a touch reading the body could not take.
            let touch = self.sensor_data.touch_level[0];
            if touch != u16::MAX {
                self.last_valid_touch = touch;
            }
        }

        hooks.on_sensor_data(&self.sensor_data);
    }

    pub(crate) fn accept_boot_frame<H: LinkHooks + ?Sized>(
        &mut self,
        boot: &BootFrame,
        hooks: &mut H,
    ) {
        self.sensor_data = BodyToHead::from_boot_frame(boot);
        hooks.on_sensor_data(&self.sensor_data);
    }

    pub(crate) fn record_version<H: LinkHooks + ?Sized>(
        &mut self,
        info: VersionInfo,
        hooks: &mut H,
    ) {
        info!(
            hw_revision = info.hw_revision,
            hw_model = info.hw_model,
            app_version = %info.app_version_str(),
            "body version"
        );
        self.versions_received += 1;
        hooks.on_version(&info);
        self.version = Some(info);
    }

    /// Ask the body for its version.
    pub fn request_version<R: Transport, W: Write>(
        &mut self,
        link: &mut SpineLink<R, W>,
    ) -> Result<VersionTicket> {
        link.send(&Message::VersionRequest)?;
        Ok(VersionTicket(self.versions_received))
    }

    /// The version report that arrived after `ticket` was issued, if any.
    pub fn version_for(&self, ticket: VersionTicket) -> Option<&VersionInfo> {
        if self.versions_received > ticket.0 {
            self.version.as_ref()
        } else {
            None
        }
    }

    /// The most recent version report.
    pub fn latest_version(&self) -> Option<&VersionInfo> {
        self.version.as_ref()
    }

    fn flush_report<H: LinkHooks + ?Sized>(
        &mut self,
        hooks: &mut H,
        now: Instant,
    ) -> InvalidProxCounts {
        let counts = self.prox_report.flush(now);
        info!(
            sigma = counts.sigma,
            signal = counts.signal,
            min_range = counts.min_range,
            phase = counts.phase,
            hardware = counts.hardware,
            "invalid proximity readings"
        );
        hooks.report_invalid_prox(&counts);
        counts
    }

    /// Final report flush at shutdown.
    pub fn finish<H: LinkHooks + ?Sized>(
        &mut self,
        hooks: &mut H,
        now: Instant,
    ) -> InvalidProxCounts {
        self.flush_report(hooks, now)
    }

    /// Request a power mode. Takes effect on the next outbound slot.
    pub fn set_desired_power_mode(&mut self, mode: PowerMode, now: Instant) {
        if self.power.set_desired(mode, now) {
            info!(%mode, "power mode requested");
        }
    }

    pub fn desired_power_mode(&self) -> PowerMode {
        self.power.desired()
    }

    /// The mode implied by the latest data frame.
    pub fn observed_power_mode(&self) -> PowerMode {
        self.power.observed()
    }

    pub fn power(&self) -> &PowerTracker {
        &self.power
    }

    /// While active, full actuator frames go out even in calm mode.
    pub fn set_commander_active(&mut self, active: bool) {
        self.commander_active = active;
    }

    pub fn commander_active(&self) -> bool {
        self.commander_active
    }

    pub fn have_valid_application(&self) -> bool {
        self.have_valid_application
    }

    /// The latest sensor snapshot. After a boot frame only the button is real.
    pub fn sensor_data(&self) -> &BodyToHead {
        &self.sensor_data
    }

    pub fn head_data(&self) -> &HeadToBody {
        &self.head_data
    }

    /// Actuator values for the next outbound slot.
    pub fn head_data_mut(&mut self) -> &mut HeadToBody {
        &mut self.head_data
    }

    pub fn consecutive_poll_timeouts(&self) -> u8 {
        self.consecutive_poll_timeouts
    }

    /// Last capacitive touch reading the body marked as valid.
    pub fn last_valid_touch(&self) -> u16 {
        self.last_valid_touch
    }

    pub fn invalid_prox_counts(&self) -> &InvalidProxCounts {
        self.prox_report.counts()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::BytesMut;
    use spine_frame::payload::RUNNING_FLAGS_SENSORS_VALID;
    use spine_frame::{encode_frame, ContactData, Direction, FrameReader};
    use spine_transport::mock::ScriptedTransport;

    use super::*;

    type TestLink = SpineLink<ScriptedTransport, ScriptedTransport>;

    #[derive(Default)]
    struct Recorder {
        faults: Vec<FaultCode>,
        sensor_frames: usize,
        versions: usize,
        contact: Vec<ContactData>,
        reports: Vec<InvalidProxCounts>,
        response: Option<ContactData>,
    }

    impl LinkHooks for Recorder {
        fn on_sensor_data(&mut self, _data: &BodyToHead) {
            self.sensor_frames += 1;
        }

        fn on_version(&mut self, _info: &VersionInfo) {
            self.versions += 1;
        }

        fn on_contact_data(&mut self, data: &ContactData) {
            self.contact.push(data.clone());
        }

        fn contact_response(&mut self) -> Option<ContactData> {
            self.response.take()
        }

        fn show_fault(&mut self, fault: FaultCode) {
            self.faults.push(fault);
        }

        fn report_invalid_prox(&mut self, counts: &InvalidProxCounts) {
            self.reports.push(*counts);
        }
    }

    fn setup(config: LinkConfig) -> (ScriptedTransport, TestLink, LinkSession, Instant) {
        let wire = ScriptedTransport::new();
        let link = SpineLink::new(wire.clone(), wire.clone(), &config);
        let t0 = Instant::now();
        (wire, link, LinkSession::new(config, t0), t0)
    }

    fn tick(n: u64) -> Duration {
        Duration::from_millis(5 * n)
    }

    fn body_wire(message: &Message) -> Vec<u8> {
        let mut out = BytesMut::new();
        encode_frame(Direction::BodyToHead, message, &mut out).unwrap();
        out.to_vec()
    }

    fn data_frame(active: bool, fail_code: u16) -> Vec<u8> {
        body_wire(&Message::BodyData(Box::new(BodyToHead {
            flags: if active { RUNNING_FLAGS_SENSORS_VALID } else { 0 },
            fail_code,
            ..BodyToHead::default()
        })))
    }

    fn sent_messages(wire: &ScriptedTransport) -> Vec<Message> {
        let replay = ScriptedTransport::new();
        replay.push_bytes(wire.take_written());
        let mut reader = FrameReader::new(replay, Direction::HeadToBody);
        let mut out = Vec::new();
        while let ReadOutcome::Frame(frame) = reader.read_frame().unwrap() {
            out.push(frame.message);
        }
        out
    }

    #[test]
    fn silent_line_escalates_exactly_at_threshold() {
        let (_wire, mut link, mut session, t0) = setup(LinkConfig::default());
        let mut hooks = Recorder::default();

        for n in 1..=4u8 {
            let status = session.step(&mut link, &mut hooks, t0 + tick(n.into())).unwrap();
            assert_eq!(status.inbound, Inbound::TimedOut { consecutive: n });
            assert!(hooks.faults.is_empty());
        }

        let err = session.step(&mut link, &mut hooks, t0 + tick(5)).unwrap_err();
        assert!(matches!(err, LinkError::PollTimeout { consecutive: 5 }));
        assert_eq!(hooks.faults, vec![FaultCode::SpineTimeout]);

        // Still silent: keeps counting without re-firing.
        let status = session.step(&mut link, &mut hooks, t0 + tick(6)).unwrap();
        assert_eq!(status.inbound, Inbound::TimedOut { consecutive: 6 });
        assert_eq!(hooks.faults.len(), 1);
    }

    #[test]
    fn frame_resets_timeout_counter_and_rearms_escalation() {
        let (wire, mut link, mut session, t0) = setup(LinkConfig::default());
        let mut hooks = Recorder::default();

        for n in 1..=3 {
            session.step(&mut link, &mut hooks, t0 + tick(n)).unwrap();
        }
        assert_eq!(session.consecutive_poll_timeouts(), 3);

        wire.push_bytes(data_frame(true, 0));
        session.step(&mut link, &mut hooks, t0 + tick(4)).unwrap();
        assert_eq!(session.consecutive_poll_timeouts(), 0);

        let mut fatal = 0;
        for n in 5..=9 {
            if session.step(&mut link, &mut hooks, t0 + tick(n)).is_err() {
                fatal += 1;
            }
        }
        assert_eq!(fatal, 1);
        assert_eq!(session.consecutive_poll_timeouts(), 5);
    }

    #[test]
    fn checksum_failures_do_not_count_as_timeouts() {
        let (wire, mut link, mut session, t0) = setup(LinkConfig::default());
        let mut hooks = Recorder::default();

        let mut bad = data_frame(true, 0);
        bad[20] ^= 0xff;
        wire.push_bytes(bad);

        let status = session.step(&mut link, &mut hooks, t0).unwrap();
        assert_eq!(status.inbound, Inbound::Discarded);
        assert_eq!(session.consecutive_poll_timeouts(), 0);
        assert_eq!(hooks.sensor_frames, 0);
    }

    #[test]
    fn corrupt_frame_breaks_silent_run() {
        let (wire, mut link, mut session, t0) = setup(LinkConfig::default());
        let mut hooks = Recorder::default();

        for n in 1..=4 {
            session.step(&mut link, &mut hooks, t0 + tick(n)).unwrap();
        }
        assert_eq!(session.consecutive_poll_timeouts(), 4);

        let mut bad = data_frame(true, 0);
        bad[20] ^= 0xff;
        wire.push_bytes(bad);
        let status = session.step(&mut link, &mut hooks, t0 + tick(5)).unwrap();
        assert_eq!(status.inbound, Inbound::Discarded);
        assert_eq!(session.consecutive_poll_timeouts(), 0);

        let status = session.step(&mut link, &mut hooks, t0 + tick(6)).unwrap();
        assert_eq!(status.inbound, Inbound::TimedOut { consecutive: 1 });
        assert!(hooks.faults.is_empty());
    }

    #[test]
    fn garbage_stream_breaks_silent_run() {
        let config = LinkConfig::default();
        let budget = config.scan_budget;
        let (wire, mut link, mut session, t0) = setup(config);
        let mut hooks = Recorder::default();

        for n in 1..=4 {
            session.step(&mut link, &mut hooks, t0 + tick(n)).unwrap();
        }
        wire.push_bytes(vec![0u8; budget]);
        let status = session.step(&mut link, &mut hooks, t0 + tick(5)).unwrap();
        assert_eq!(status.inbound, Inbound::Pending);
        assert_eq!(session.consecutive_poll_timeouts(), 0);

        let status = session.step(&mut link, &mut hooks, t0 + tick(6)).unwrap();
        assert_eq!(status.inbound, Inbound::TimedOut { consecutive: 1 });
        assert!(hooks.faults.is_empty());
    }

    #[test]
    fn data_frame_sets_observed_mode_and_snapshot() {
        let (wire, mut link, mut session, t0) = setup(LinkConfig::default());
        let mut hooks = Recorder::default();
        assert!(!session.have_valid_application());

        wire.push_bytes(data_frame(false, 0));
        let status = session.step(&mut link, &mut hooks, t0).unwrap();
        assert_eq!(
            status.inbound,
            Inbound::Frame {
                payload_type: PayloadType::DataFrame
            }
        );
        assert_eq!(session.observed_power_mode(), PowerMode::Calm);
        assert!(session.have_valid_application());

        wire.push_bytes(data_frame(true, 0));
        session.step(&mut link, &mut hooks, t0 + tick(1)).unwrap();
        assert_eq!(session.observed_power_mode(), PowerMode::Active);
        assert_eq!(hooks.sensor_frames, 2);
    }

    #[test]
    fn active_mode_sends_full_frame_every_slot() {
        let (wire, mut link, mut session, t0) = setup(LinkConfig::default());
        let mut hooks = Recorder::default();

        let first = session.step(&mut link, &mut hooks, t0).unwrap();
        assert_eq!(first.sent, Some(PayloadType::DataFrame));
        // Inside the minimum spacing: the slot is skipped.
        let early = session
            .step(&mut link, &mut hooks, t0 + Duration::from_millis(2))
            .unwrap();
        assert_eq!(early.sent, None);
        let second = session.step(&mut link, &mut hooks, t0 + tick(1)).unwrap();
        assert_eq!(second.sent, Some(PayloadType::DataFrame));

        let sent = sent_messages(&wire);
        assert_eq!(sent.len(), 2);
        match (&sent[0], &sent[1]) {
            (Message::HeadData(a), Message::HeadData(b)) => {
                assert!(!a.calm_requested());
                assert!(b.framecounter > a.framecounter);
            }
            other => panic!("expected two head frames, got {other:?}"),
        }
    }

    #[test]
    fn calm_mode_sends_lights_every_nth_slot() {
        let (wire, mut link, mut session, t0) = setup(LinkConfig::default());
        let mut hooks = Recorder::default();
        session.set_desired_power_mode(PowerMode::Calm, t0);

        // Until the body reports calm, full frames carry the calm request.
        wire.push_bytes(data_frame(false, 0));
        let status = session.step(&mut link, &mut hooks, t0).unwrap();
        assert_eq!(status.sent, Some(PayloadType::DataFrame));
        match sent_messages(&wire).as_slice() {
            [Message::HeadData(head)] => assert!(head.calm_requested()),
            other => panic!("expected one head frame, got {other:?}"),
        }

        for n in 1..=24 {
            wire.push_bytes(data_frame(false, 0));
            session.step(&mut link, &mut hooks, t0 + tick(n)).unwrap();
        }
        let sent = sent_messages(&wire);
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| matches!(m, Message::LightState(_))));

        session.set_commander_active(true);
        let status = session.step(&mut link, &mut hooks, t0 + tick(25)).unwrap();
        assert_eq!(status.sent, Some(PayloadType::DataFrame));
        assert!(status.commander_active);
    }

    #[test]
    fn body_fault_is_shown_once_per_change() {
        let (wire, mut link, mut session, t0) = setup(LinkConfig::default());
        let mut hooks = Recorder::default();

        for (n, code) in [0x12, 0x12, 0x12, 0, 0x12].into_iter().enumerate() {
            wire.push_bytes(data_frame(true, code));
            session.step(&mut link, &mut hooks, t0 + tick(n as u64)).unwrap();
        }
        assert_eq!(hooks.faults, vec![FaultCode::Body(0x12), FaultCode::Body(0x12)]);
    }

    #[test]
    fn contact_data_flows_both_ways() {
        let (wire, mut link, mut session, t0) = setup(LinkConfig::default());
        let mut hooks = Recorder {
            response: Some(ContactData::from_bytes(b"ok")),
            ..Recorder::default()
        };

        let inbound = ContactData::from_bytes(b"hello");
        wire.push_bytes(body_wire(&Message::ContactData(inbound.clone())));
        session.step(&mut link, &mut hooks, t0).unwrap();

        assert_eq!(hooks.contact, vec![inbound]);
        let sent = sent_messages(&wire);
        assert!(matches!(sent.as_slice(), [Message::HeadData(_), Message::ContactData(_)]));
    }

    #[test]
    fn version_ticket_is_released_by_newer_report() {
        let (wire, mut link, mut session, t0) = setup(LinkConfig::default());
        let mut hooks = Recorder::default();

        let ticket = session.request_version(&mut link).unwrap();
        assert!(session.version_for(ticket).is_none());
        assert!(matches!(sent_messages(&wire).as_slice(), [Message::VersionRequest]));

        let info = VersionInfo {
            hw_revision: 7,
            ..VersionInfo::default()
        };
        wire.push_bytes(body_wire(&Message::Version(info.clone())));
        session.step(&mut link, &mut hooks, t0).unwrap();

        assert_eq!(session.version_for(ticket), Some(&info));
        assert_eq!(hooks.versions, 1);

        let later = session.request_version(&mut link).unwrap();
        assert!(session.version_for(later).is_none());
        assert_eq!(session.latest_version(), Some(&info));
    }

    #[test]
    fn boot_frame_is_not_a_power_signal() {
        let (wire, mut link, mut session, t0) = setup(LinkConfig::default());
        let mut hooks = Recorder::default();

        wire.push_bytes(body_wire(&Message::BootFrame(BootFrame {
            button_pressed: true,
        })));
        session.step(&mut link, &mut hooks, t0).unwrap();

        assert_eq!(session.observed_power_mode(), PowerMode::Active);
        assert_eq!(session.sensor_data().touch_level[1], u16::MAX);
        assert!(!session.have_valid_application());
    }

    #[test]
    fn invalid_prox_readings_are_reported_and_reset() {
        let config = LinkConfig {
            report_period_secs: 60,
            ..LinkConfig::default()
        };
        let (wire, mut link, mut session, t0) = setup(config);
        let mut hooks = Recorder::default();

        let mut body = BodyToHead {
            flags: RUNNING_FLAGS_SENSORS_VALID,
            ..BodyToHead::default()
        };
        body.proximity.range_status = 2;
        for n in 0..3 {
            wire.push_bytes(body_wire(&Message::BodyData(Box::new(body.clone()))));
            session.step(&mut link, &mut hooks, t0 + tick(n)).unwrap();
        }
        assert_eq!(session.invalid_prox_counts().signal, 3);
        assert!(hooks.reports.is_empty());

        // Period elapsed: flushed even though this tick saw no frame.
        session
            .step(&mut link, &mut hooks, t0 + Duration::from_secs(61))
            .unwrap();
        assert_eq!(hooks.reports.len(), 1);
        assert_eq!(hooks.reports[0].signal, 3);
        assert!(session.invalid_prox_counts().is_zero());

        let last = session.finish(&mut hooks, t0 + Duration::from_secs(62));
        assert!(last.is_zero());
        assert_eq!(hooks.reports.len(), 2);
    }

    #[test]
    fn calm_frames_do_not_count_prox_readings() {
        let (wire, mut link, mut session, t0) = setup(LinkConfig::default());
        let mut hooks = Recorder::default();

        let mut body = BodyToHead::default();
        body.proximity.range_status = 1;
        body.touch_level[0] = 300;
        wire.push_bytes(body_wire(&Message::BodyData(Box::new(body))));
        session.step(&mut link, &mut hooks, t0).unwrap();

        assert!(session.invalid_prox_counts().is_zero());
        assert_eq!(session.last_valid_touch(), 0);
    }
}
