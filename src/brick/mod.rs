//! Brick command engine
//!
//! [`Brick`] owns one [`Transport`] and turns high level requests into
//! telegrams. Two usage modes are supported:
//!
//! - **Prepare, then execute**: `prepare_*` returns an assembled [`Telegram`]
//!   that can be stored and sent any number of times with or without a
//!   confirmation from the brick.
//! - **Direct**: `play_tone`, `set_motor` and friends prepare and execute in one
//!   step, always asking for confirmation.
//!
//! ```rust,no_run
//! use nxt_direct::{Brick, Motor};
//!
//! fn demo() -> nxt_direct::Result<()> {
//!     let mut brick = Brick::open()?;
//!     brick.play_tone(700, 1000)?;
//!
//!     // Fire-and-forget replay of a prepared command
//!     let mut forward = brick.prepare_set_motor(Motor::B, 50);
//!     brick.execute(&mut forward, false)?;
//!
//!     println!("Battery: {} mV", brick.get_battery_level()?);
//!     Ok(())
//! }
//! ```
//!
//! The protocol is stateless request / optional reply; nothing is tracked
//! between calls beyond the open transport.

pub mod command;
pub mod reply;
pub mod types;

pub use reply::Reply;
pub use types::{
    DeviceInfo, Motor, OutputMode, OutputSettings, OutputState, RateReport, RegulationMode,
    RunState, Versions,
};

use crate::config::UsbConfig;
use crate::error::ProtocolFault;
use crate::telegram::{HEADER_LEN, MAX_TELEGRAM_LEN, Telegram};
use crate::timer::Stopwatch;
use crate::transport::Transport;
use crate::transport::usb::UsbTransport;
use crate::Result;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Wall-clock window of [`Brick::msg_rate_check`].
pub const RATE_CHECK_WINDOW: Duration = Duration::from_secs(10);

/// Command engine bound to one brick.
///
/// Dropping the brick drops its transport, which releases the link.
pub struct Brick<T: Transport = UsbTransport> {
    transport: T,
}

impl Brick<UsbTransport> {
    /// Connect to the first brick found on the USB bus.
    pub fn open() -> Result<Self> {
        Ok(Self::new(UsbTransport::open()?))
    }

    /// Connect to the first brick found on the USB bus with explicit timeouts.
    pub fn open_with(config: UsbConfig) -> Result<Self> {
        Ok(Self::new(UsbTransport::open_with(config)?))
    }
}

impl<T: Transport> Brick<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send a prepared telegram.
    ///
    /// `with_feedback` clears the no-response bit so the brick confirms the
    /// command; the reply is read and validated before returning. Without
    /// feedback the bit is set and nothing is read.
    ///
    /// Telegrams without a payload or longer than the device limit are rejected
    /// before anything is written.
    pub fn execute(&mut self, telegram: &mut Telegram, with_feedback: bool) -> Result<Option<Reply>> {
        check_size(telegram)?;
        telegram.set_reply_requested(with_feedback);

        if with_feedback { self.exchange(telegram).map(Some) } else { self.send(telegram).map(|_| None) }
    }

    fn send(&mut self, telegram: &Telegram) -> Result<()> {
        trace!(
            type_byte = telegram.type_byte(),
            command = telegram.command(),
            len = telegram.len(),
            "Sending telegram"
        );
        self.transport.write(telegram.as_bytes())
    }

    fn exchange(&mut self, telegram: &Telegram) -> Result<Reply> {
        self.send(telegram)?;
        let bytes = self.transport.read()?;
        let command = telegram.command().unwrap_or_default();

        Reply::parse(&bytes, command).inspect_err(|e| {
            warn!(command, reply_len = bytes.len(), error = %e, "Rejected brick reply");
        })
    }

    /// Send a query that always needs its reply.
    ///
    /// Queries may be header-only, so only the upper size limit applies here.
    fn request(&mut self, mut telegram: Telegram) -> Result<Reply> {
        let len = telegram.len();
        if len > MAX_TELEGRAM_LEN {
            return Err(ProtocolFault::TelegramTooLong { len, max: MAX_TELEGRAM_LEN }.into());
        }
        telegram.set_reply_requested(true);
        self.exchange(&telegram)
    }

    fn confirm(&mut self, mut telegram: Telegram) -> Result<()> {
        self.execute(&mut telegram, true).map(|_| ())
    }

    pub fn prepare_play_tone(&self, tone_hz: u16, duration_ms: u16) -> Telegram {
        command::play_tone(tone_hz, duration_ms)
    }

    /// Speed-regulated run at `power` percent until the next command.
    pub fn prepare_set_motor(&self, motor: Motor, power: i8) -> Telegram {
        command::set_motor(motor, power)
    }

    pub fn prepare_set_output_state(&self, motor: Motor, settings: &OutputSettings) -> Telegram {
        command::set_output_state(motor, settings)
    }

    pub fn prepare_stop_motor(&self, motor: Motor, brake: bool) -> Telegram {
        command::stop_motor(motor, brake)
    }

    pub fn prepare_reset_motor_position(&self, motor: Motor, relative: bool) -> Telegram {
        command::reset_motor_position(motor, relative)
    }

    pub fn prepare_stop_sound_playback(&self) -> Telegram {
        command::stop_sound_playback()
    }

    pub fn prepare_keep_alive(&self) -> Telegram {
        command::keep_alive()
    }

    pub fn prepare_get_output_state(&self, motor: Motor) -> Telegram {
        command::get_output_state(motor)
    }

    pub fn prepare_get_battery_level(&self) -> Telegram {
        command::get_battery_level()
    }

    pub fn prepare_get_firmware_version(&self) -> Telegram {
        command::get_firmware_version()
    }

    pub fn prepare_get_device_info(&self) -> Telegram {
        command::get_device_info()
    }

    // Commands with a payload go through `prepare_*` and `execute`. Header-only
    // ones (stop sound and every read-back) are too short for `execute` and use
    // `request` instead.

    /// Play a tone, confirmed by the brick.
    pub fn play_tone(&mut self, tone_hz: u16, duration_ms: u16) -> Result<()> {
        let telegram = self.prepare_play_tone(tone_hz, duration_ms);
        self.confirm(telegram)
    }

    /// Run `motor` at `power` percent, confirmed by the brick.
    ///
    /// With a non-zero `duration_ms` this blocks for that long and then brakes
    /// the motor. Zero leaves it running until the next command. Use
    /// [`set_output_state`](Self::set_output_state) with
    /// [`OutputSettings::run`] to stop after a number of degrees instead.
    pub fn set_motor(&mut self, motor: Motor, power: i8, duration_ms: u32) -> Result<()> {
        let telegram = self.prepare_set_motor(motor, power);
        self.confirm(telegram)?;
        if duration_ms == 0 {
            return Ok(());
        }

        trace!(%motor, power, duration_ms, "Running motor for a fixed time");
        std::thread::sleep(Duration::from_millis(u64::from(duration_ms)));
        self.stop_motor(motor, true)
    }

    pub fn set_output_state(&mut self, motor: Motor, settings: &OutputSettings) -> Result<()> {
        let telegram = self.prepare_set_output_state(motor, settings);
        self.confirm(telegram)
    }

    pub fn stop_motor(&mut self, motor: Motor, brake: bool) -> Result<()> {
        let telegram = self.prepare_stop_motor(motor, brake);
        self.confirm(telegram)
    }

    pub fn reset_motor_position(&mut self, motor: Motor, relative: bool) -> Result<()> {
        let telegram = self.prepare_reset_motor_position(motor, relative);
        self.confirm(telegram)
    }

    pub fn stop_sound_playback(&mut self) -> Result<()> {
        self.request(command::stop_sound_playback()).map(|_| ())
    }

    /// Keep the brick awake; returns its sleep time limit in ms.
    pub fn keep_alive(&mut self) -> Result<u32> {
        self.request(command::keep_alive())?.sleep_time_limit()
    }

    /// Battery voltage in millivolts.
    pub fn get_battery_level(&mut self) -> Result<u16> {
        self.request(command::get_battery_level())?.battery_millivolts()
    }

    /// Tachometer and drive state of one output port.
    pub fn get_motor_state(&mut self, motor: Motor) -> Result<OutputState> {
        self.request(command::get_output_state(motor))?.output_state()
    }

    pub fn get_version(&mut self) -> Result<Versions> {
        self.request(command::get_firmware_version())?.versions()
    }

    pub fn get_device_info(&mut self) -> Result<DeviceInfo> {
        self.request(command::get_device_info())?.device_info()
    }

    /// Play short confirmed tones for ten seconds and report the achieved rate.
    ///
    /// Instrumentation only; the rate says nothing about future calls.
    pub fn msg_rate_check(&mut self) -> Result<RateReport> {
        self.msg_rate_check_for(RATE_CHECK_WINDOW)
    }

    /// [`msg_rate_check`](Self::msg_rate_check) over a custom window. At least one call is made.
    pub fn msg_rate_check_for(&mut self, window: Duration) -> Result<RateReport> {
        debug!(window_ms = window.as_millis() as u64, "Starting message rate check");
        let watch = Stopwatch::new();
        let mut calls = 0u64;

        loop {
            self.play_tone(440, 1)?;
            calls += 1;
            if watch.elapsed() >= window {
                break;
            }
        }

        let report = RateReport { calls, elapsed: watch.elapsed() };
        info!(
            calls,
            elapsed_ms = report.elapsed.as_millis() as u64,
            calls_per_second = report.calls_per_second(),
            "Message rate check finished"
        );
        Ok(report)
    }
}

fn check_size(telegram: &Telegram) -> Result<()> {
    let len = telegram.len();
    if len <= HEADER_LEN {
        return Err(ProtocolFault::TelegramTooShort { len }.into());
    }
    if len > MAX_TELEGRAM_LEN {
        return Err(ProtocolFault::TelegramTooLong { len, max: MAX_TELEGRAM_LEN }.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::TelegramType;
    use crate::test_utils::{MockTransport, MockUsbBus, UsbEvent, UsbStep};
    use crate::transport::status::UsbStatus;
    use crate::NxtError;

    #[test]
    fn execute_without_feedback_writes_once_and_never_reads() {
        let transport = MockTransport::new();
        let log = transport.log();
        let mut brick = Brick::new(transport);

        let mut telegram = brick.prepare_play_tone(440, 100);
        let reply = brick.execute(&mut telegram, false).unwrap();

        assert_eq!(reply, None);
        assert_eq!(log.writes().len(), 1);
        assert_eq!(log.reads(), 0);
        assert_eq!(log.writes()[0][0], 0x80);
    }

    #[test]
    fn execute_with_feedback_writes_then_reads_once() {
        let transport = MockTransport::new().with_reply(vec![0x02, 0x03, 0x00]);
        let log = transport.log();
        let mut brick = Brick::new(transport);

        let mut telegram = brick.prepare_play_tone(440, 100);
        let reply = brick.execute(&mut telegram, true).unwrap().unwrap();

        assert_eq!(reply.command(), 0x03);
        assert_eq!(log.writes().len(), 1);
        assert_eq!(log.reads(), 1);
        assert_eq!(log.writes()[0][0], 0x00);
    }

    #[test]
    fn prepared_telegram_replays_with_either_setting() {
        let transport = MockTransport::new();
        let log = transport.log();
        let mut brick = Brick::new(transport);

        let mut telegram = brick.prepare_set_motor(Motor::C, 30);
        brick.execute(&mut telegram, false).unwrap();
        brick.execute(&mut telegram, true).unwrap();
        brick.execute(&mut telegram, false).unwrap();

        let writes = log.writes();
        assert_eq!(writes.iter().map(|w| w[0]).collect::<Vec<_>>(), vec![0x80, 0x00, 0x80]);
        assert!(writes.iter().all(|w| w[1..] == writes[0][1..]));
        assert_eq!(log.reads(), 1);
    }

    #[test]
    fn reply_for_another_command_is_a_protocol_error() {
        let transport = MockTransport::new().with_reply(vec![0x02, 0x04, 0x00]);
        let mut brick = Brick::new(transport);

        let err = brick.play_tone(440, 100).unwrap_err();
        assert_eq!(
            err.protocol_fault(),
            Some(ProtocolFault::CommandMismatch { expected: 0x03, found: 0x04 })
        );
    }

    #[test]
    fn execute_rejects_a_reply_for_another_command() {
        let transport = MockTransport::new().with_reply(vec![0x02, 0x06, 0x00]);
        let log = transport.log();
        let mut brick = Brick::new(transport);

        let mut telegram = brick.prepare_set_motor(Motor::A, 40);
        let err = brick.execute(&mut telegram, true).unwrap_err();
        assert_eq!(
            err.protocol_fault(),
            Some(ProtocolFault::CommandMismatch { expected: 0x04, found: 0x06 })
        );
        assert_eq!(log.writes().len(), 1);
        assert_eq!(log.reads(), 1);
    }

    #[test]
    fn timed_set_motor_runs_then_brakes_after_the_duration() {
        let transport = MockTransport::new();
        let log = transport.log();
        let mut brick = Brick::new(transport);

        let watch = Stopwatch::new();
        brick.set_motor(Motor::B, 50, 30).unwrap();
        assert!(watch.elapsed() >= Duration::from_millis(30));

        let writes = log.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], command::set_motor(Motor::B, 50).into_vec());
        assert_eq!(&writes[0][8..], &[0x00, 0x00, 0x00, 0x00]);
        assert_eq!(writes[1], command::stop_motor(Motor::B, true).into_vec());
        assert_eq!(log.reads(), 2);
    }

    #[test]
    fn untimed_set_motor_sends_one_run() {
        let transport = MockTransport::new();
        let log = transport.log();
        let mut brick = Brick::new(transport);

        brick.set_motor(Motor::C, -20, 0).unwrap();
        assert_eq!(log.writes(), vec![command::set_motor(Motor::C, -20).into_vec()]);
    }

    #[test]
    fn timed_set_motor_skips_the_wait_when_the_run_is_rejected() {
        let transport = MockTransport::new().with_reply(vec![0x02, 0x04, 0x93]);
        let log = transport.log();
        let mut brick = Brick::new(transport);

        let watch = Stopwatch::new();
        assert!(brick.set_motor(Motor::A, 50, 60_000).is_err());
        assert!(watch.elapsed() < Duration::from_secs(1));
        assert_eq!(log.writes().len(), 1);
    }

    #[test]
    fn dropping_the_brick_drops_its_transport_once() {
        let transport = MockTransport::new().failing_reads(UsbStatus::Pipe);
        let log = transport.log();
        let mut brick = Brick::new(transport);

        assert!(brick.play_tone(440, 10).is_err());
        assert_eq!(log.drops(), 0);
        drop(brick);
        assert_eq!(log.drops(), 1);
    }

    #[test]
    fn header_only_telegrams_never_reach_the_transport() {
        let transport = MockTransport::new();
        let log = transport.log();
        let mut brick = Brick::new(transport);

        for bytes in [vec![], vec![0x00], vec![0x00, 0x03]] {
            let len = bytes.len();
            for feedback in [true, false] {
                let mut telegram = Telegram::from_raw(bytes.clone());
                let err = brick.execute(&mut telegram, feedback).unwrap_err();
                assert_eq!(err.protocol_fault(), Some(ProtocolFault::TelegramTooShort { len }));
            }
        }
        assert!(log.writes().is_empty());
        assert_eq!(log.reads(), 0);
    }

    #[test]
    fn header_only_queries_still_go_out_as_read_backs() {
        let transport = MockTransport::new().with_reply(vec![0x02, 0x0D, 0x00, 0x10, 0x27, 0x00, 0x00]);
        let log = transport.log();
        let mut brick = Brick::new(transport);

        let mut telegram = brick.prepare_keep_alive();
        assert!(brick.execute(&mut telegram, true).is_err());
        assert!(log.writes().is_empty());

        assert_eq!(brick.keep_alive().unwrap(), 10_000);
        assert_eq!(log.writes(), vec![vec![0x00, 0x0D]]);
    }

    #[test]
    fn oversized_telegrams_are_rejected() {
        let transport = MockTransport::new();
        let log = transport.log();
        let mut brick = Brick::new(transport);

        let mut telegram = Telegram::from_raw(vec![0u8; MAX_TELEGRAM_LEN + 1]);
        let err = brick.execute(&mut telegram, false).unwrap_err();
        assert_eq!(
            err.protocol_fault(),
            Some(ProtocolFault::TelegramTooLong { len: 65, max: 64 })
        );
        assert!(log.writes().is_empty());

        let mut telegram = Telegram::from_raw(vec![0u8; MAX_TELEGRAM_LEN]);
        assert!(brick.execute(&mut telegram, false).is_ok());
    }

    #[test]
    fn prepared_tone_decodes_back_to_its_arguments() {
        let brick = Brick::new(MockTransport::new());
        let telegram = brick.prepare_play_tone(700, 1000);

        assert_eq!(telegram.telegram_type(), Some(TelegramType::DirectWithResponse));
        assert_eq!(telegram.command(), Some(0x03));
        let payload = telegram.payload();
        assert_eq!(u16::from_le_bytes([payload[0], payload[1]]), 700);
        assert_eq!(u16::from_le_bytes([payload[2], payload[3]]), 1000);
    }

    #[test]
    fn write_failure_propagates_without_reading() {
        let transport = MockTransport::new().failing_writes(UsbStatus::Pipe);
        let log = transport.log();
        let mut brick = Brick::new(transport);

        let err = brick.play_tone(700, 1000).unwrap_err();
        assert_eq!(err, NxtError::transport("bulk write", UsbStatus::Pipe));
        assert_eq!(log.reads(), 0);
    }

    #[test]
    fn read_failure_propagates() {
        let transport = MockTransport::new().failing_reads(UsbStatus::Timeout);
        let mut brick = Brick::new(transport);

        let err = brick.get_battery_level().unwrap_err();
        assert_eq!(err.usb_status(), Some(UsbStatus::Timeout));
    }

    #[test]
    fn read_backs_request_replies_and_decode_them() {
        let transport = MockTransport::new()
            .with_reply(vec![0x02, 0x0B, 0x00, 0x40, 0x1F])
            .with_reply(vec![0x02, 0x88, 0x00, 0x7C, 0x01, 0x05, 0x01])
            .with_reply(vec![0x02, 0x0D, 0x00, 0x60, 0xEA, 0x00, 0x00]);
        let log = transport.log();
        let mut brick = Brick::new(transport);

        assert_eq!(brick.get_battery_level().unwrap(), 8000);
        assert_eq!(brick.get_version().unwrap().firmware_minor, 5);
        assert_eq!(brick.keep_alive().unwrap(), 60_000);

        let writes = log.writes();
        assert_eq!(writes[0], vec![0x00, 0x0B]);
        assert_eq!(writes[1], vec![0x01, 0x88]);
        assert_eq!(writes[2], vec![0x00, 0x0D]);
        assert_eq!(log.reads(), 3);
    }

    #[test]
    fn device_rejection_surfaces_status() {
        let transport = MockTransport::new().with_reply(vec![0x02, 0x04, 0x93]);
        let mut brick = Brick::new(transport);

        let err = brick.set_motor(Motor::A, 50, 0).unwrap_err();
        assert_eq!(
            err.protocol_fault(),
            Some(ProtocolFault::DeviceStatus { command: 0x04, status: 0x93 })
        );
    }

    #[test]
    fn rate_check_makes_at_least_one_confirmed_call() {
        let transport = MockTransport::new();
        let log = transport.log();
        let mut brick = Brick::new(transport);

        let report = brick.msg_rate_check_for(Duration::ZERO).unwrap();
        assert_eq!(report.calls, 1);
        assert_eq!(log.writes(), vec![vec![0x00, 0x03, 0xB8, 0x01, 0x01, 0x00]]);
        assert_eq!(log.reads(), 1);
    }

    #[test]
    fn rate_check_counts_calls_over_the_window() {
        let transport = MockTransport::new();
        let log = transport.log();
        let mut brick = Brick::new(transport);

        let report = brick.msg_rate_check_for(Duration::from_millis(20)).unwrap();
        assert!(report.elapsed >= Duration::from_millis(20));
        assert_eq!(report.calls as usize, log.writes().len());
        assert!(report.calls_per_second() > 0.0);
    }

    #[test]
    fn rate_check_stops_on_first_error() {
        let transport = MockTransport::new().failing_writes(UsbStatus::NoDevice);
        let mut brick = Brick::new(transport);
        assert!(brick.msg_rate_check_for(Duration::from_secs(60)).is_err());
    }

    #[test]
    fn teardown_releases_usb_once_even_after_failures() {
        let bus = MockUsbBus::with_device()
            .failing_at(UsbStep::Write, rusb::Error::NoDevice)
            .failing_at(UsbStep::Read, rusb::Error::NoDevice);
        let log = bus.log();
        let transport = UsbTransport::with_bus(bus, UsbConfig::default()).unwrap();
        let mut brick = Brick::new(transport);

        assert!(brick.play_tone(440, 10).is_err());
        assert!(brick.get_battery_level().is_err());
        let mut telegram = brick.prepare_stop_motor(Motor::A, true);
        assert_eq!(
            brick.execute(&mut telegram, false).unwrap_err().usb_status(),
            Some(UsbStatus::NoDevice)
        );
        drop(brick);

        let events = log.events();
        assert_eq!(events.iter().filter(|e| **e == UsbEvent::DeviceClosed).count(), 1);
        assert_eq!(events.iter().filter(|e| **e == UsbEvent::ContextExit).count(), 1);
        assert_eq!(events.last(), Some(&UsbEvent::ContextExit));
    }

    #[test]
    fn works_over_a_boxed_transport() {
        let transport: Box<dyn Transport> = Box::new(MockTransport::new());
        let mut brick = Brick::new(transport);
        brick.stop_sound_playback().unwrap();
        brick.reset_motor_position(Motor::B, false).unwrap();
    }

    #[test]
    #[ignore = "nxt_brick_required"]
    fn talks_to_a_real_brick() {
        let _ = tracing_subscriber::fmt::try_init();
        let mut brick = Brick::open().expect("Failed to open NXT brick");

        let versions = brick.get_version().unwrap();
        let info = brick.get_device_info().unwrap();
        tracing::info!(%versions, name = %info.name, "Connected");

        brick.play_tone(700, 200).unwrap();
        assert!(brick.get_battery_level().unwrap() > 0);
    }
}
