//! End-to-end checks of the command engine through the public API.
//!
//! Runs against a scripted in-memory link so no brick is needed.

use nxt_direct::telegram::opcode::direct;
use nxt_direct::{
    Brick, DriverConfig, Motor, NxtDriver, NxtError, ProtocolFault, Telegram, TelegramType,
    Transport, UsbStatus,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Wire {
    sent: Vec<Vec<u8>>,
    reads: usize,
    inbound: VecDeque<Vec<u8>>,
}

/// Link that records outbound frames and answers from a queue.
#[derive(Debug, Clone, Default)]
struct ScriptedLink {
    wire: Arc<Mutex<Wire>>,
    unplugged: bool,
}

impl ScriptedLink {
    fn answering(replies: &[&[u8]]) -> Self {
        let link = Self::default();
        link.wire.lock().unwrap().inbound.extend(replies.iter().map(|r| r.to_vec()));
        link
    }

    fn unplugged() -> Self {
        Self { unplugged: true, ..Self::default() }
    }

    fn sent(&self) -> Vec<Vec<u8>> {
        self.wire.lock().unwrap().sent.clone()
    }

    fn reads(&self) -> usize {
        self.wire.lock().unwrap().reads
    }
}

impl Transport for ScriptedLink {
    fn write(&mut self, frame: &[u8]) -> nxt_direct::Result<()> {
        if self.unplugged {
            return Err(NxtError::transport("bulk write", UsbStatus::NoDevice));
        }
        self.wire.lock().unwrap().sent.push(frame.to_vec());
        Ok(())
    }

    fn read(&mut self) -> nxt_direct::Result<Vec<u8>> {
        let mut wire = self.wire.lock().unwrap();
        wire.reads += 1;
        wire.inbound.pop_front().ok_or(NxtError::transport("bulk read", UsbStatus::Timeout))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

#[test]
fn tone_round_trip_matches_the_wire_format() {
    init_tracing();
    let link = ScriptedLink::answering(&[&[0x02, direct::PLAY_TONE, 0x00]]);
    let mut brick = Brick::new(link.clone());

    brick.play_tone(700, 1000).unwrap();

    assert_eq!(link.sent(), vec![vec![0x00, 0x03, 0xBC, 0x02, 0xE8, 0x03]]);
    assert_eq!(link.reads(), 1);
}

#[test]
fn prepared_telegram_can_be_replayed_without_confirmation() {
    init_tracing();
    let link = ScriptedLink::default();
    let mut brick = Brick::new(link.clone());

    let mut forward = brick.prepare_set_motor(Motor::A, 75);
    for _ in 0..3 {
        assert_eq!(brick.execute(&mut forward, false).unwrap(), None);
    }

    let sent = link.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|frame| frame[0] == 0x80 && frame[1] == 0x04));
    assert_eq!(link.reads(), 0);
}

#[test]
fn reply_type_and_status_are_validated() {
    init_tracing();
    let link = ScriptedLink::answering(&[&[0x00, 0x03, 0x00], &[0x02, 0x03], &[], &[0x02, 0x03, 0xBD]]);
    let mut brick = Brick::new(link);

    let faults: Vec<_> = (0..4)
        .map(|_| brick.play_tone(440, 10).unwrap_err().protocol_fault())
        .collect();
    assert_eq!(
        faults,
        vec![
            Some(ProtocolFault::UnexpectedReplyType { found: 0x00 }),
            Some(ProtocolFault::TruncatedReply { expected: 3, actual: 2 }),
            Some(ProtocolFault::EmptyReply),
            Some(ProtocolFault::DeviceStatus { command: 0x03, status: 0xBD }),
        ]
    );
}

#[test]
fn size_limits_are_checked_before_the_link() {
    init_tracing();
    let link = ScriptedLink::default();
    let mut brick = Brick::new(link.clone());

    let mut header_only = Telegram::from_raw(vec![TelegramType::DirectWithResponse.as_byte(), 0x0B]);
    let err = brick.execute(&mut header_only, true).unwrap_err();
    assert_eq!(err.protocol_fault(), Some(ProtocolFault::TelegramTooShort { len: 2 }));

    let mut oversized = Telegram::from_raw(vec![0u8; 65]);
    let err = brick.execute(&mut oversized, false).unwrap_err();
    assert!(matches!(err, NxtError::Protocol(ProtocolFault::TelegramTooLong { len: 65, .. })));

    assert!(link.sent().is_empty());
}

#[test]
fn missing_reply_surfaces_as_a_transport_error() {
    init_tracing();
    let link = ScriptedLink::default();
    let mut brick = Brick::new(link);

    let err = brick.get_device_info().unwrap_err();
    assert_eq!(err, NxtError::transport("bulk read", UsbStatus::Timeout));
    assert!(err.is_retryable());
}

#[test]
fn unplugged_brick_fails_every_operation() {
    init_tracing();
    let mut brick = Brick::new(ScriptedLink::unplugged());

    let results = [
        brick.play_tone(440, 10).map(|_| ()),
        brick.stop_motor(Motor::All, false),
        brick.get_battery_level().map(|_| ()),
        brick.msg_rate_check().map(|_| ()),
    ];
    for result in results {
        assert_eq!(result.unwrap_err().usb_status(), Some(UsbStatus::NoDevice));
    }
}

#[test]
fn driver_reads_encoders_and_throttles_battery() {
    init_tracing();
    let mut state = vec![0x02, 0x06, 0x00, 0x00, 0x19, 0x07, 0x01, 0x00, 0x20];
    state.extend_from_slice(&0u32.to_le_bytes());
    state.extend_from_slice(&1234i32.to_le_bytes());
    state.extend_from_slice(&0i32.to_le_bytes());
    state.extend_from_slice(&1234i32.to_le_bytes());

    let link = ScriptedLink::answering(&[
        &[0x02, 0x04, 0x00],
        state.as_slice(),
        &[0x02, 0x0B, 0x00, 0xD0, 0x1C],
    ]);
    let mut driver = NxtDriver::new(Brick::new(link.clone()), DriverConfig::default());

    assert_eq!(driver.set_speed(Motor::A, 0.125).unwrap(), 25);
    let states = driver.motor_states(&[Motor::A]).unwrap();
    assert_eq!(states[0].1.power, 25);
    assert_eq!(states[0].1.tacho_count, 1234);

    assert_eq!(driver.poll_battery().unwrap(), Some(7.376));
    assert_eq!(driver.poll_battery().unwrap(), None);
    assert_eq!(link.sent().len(), 3);
}
