//! Reply telegram validation and decoding
//!
//! Every reply starts with `[0x02, command, status]`. A reply is accepted only
//! when it carries the reply type, echoes the command that was sent and reports
//! status zero; anything else is a protocol error.

use super::types::{DeviceInfo, Motor, OutputMode, OutputState, RegulationMode, RunState, Versions};
use crate::error::ProtocolFault;
use crate::telegram::TelegramType;
use crate::Result;

/// Type, command and status bytes.
pub const REPLY_HEADER_LEN: usize = 3;

const BATTERY_LEVEL_LEN: usize = 2;
const KEEP_ALIVE_LEN: usize = 4;
const OUTPUT_STATE_LEN: usize = 22;
const FIRMWARE_VERSION_LEN: usize = 4;
const DEVICE_NAME_LEN: usize = 15;
const BLUETOOTH_ADDRESS_LEN: usize = 7;
const DEVICE_INFO_LEN: usize = DEVICE_NAME_LEN + BLUETOOTH_ADDRESS_LEN + 8;

/// A validated confirmation from the brick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    command: u8,
    payload: Vec<u8>,
}

impl Reply {
    /// Validate `bytes` as the reply to `expected_command`.
    pub fn parse(bytes: &[u8], expected_command: u8) -> Result<Self> {
        if bytes.is_empty() {
            return Err(ProtocolFault::EmptyReply.into());
        }
        if bytes.len() < REPLY_HEADER_LEN {
            return Err(ProtocolFault::TruncatedReply {
                expected: REPLY_HEADER_LEN,
                actual: bytes.len(),
            }
            .into());
        }
        if bytes[0] != TelegramType::Reply.as_byte() {
            return Err(ProtocolFault::UnexpectedReplyType { found: bytes[0] }.into());
        }
        if bytes[1] != expected_command {
            return Err(
                ProtocolFault::CommandMismatch { expected: expected_command, found: bytes[1] }
                    .into(),
            );
        }
        if bytes[2] != 0 {
            return Err(ProtocolFault::DeviceStatus { command: bytes[1], status: bytes[2] }.into());
        }

        Ok(Self { command: bytes[1], payload: bytes[REPLY_HEADER_LEN..].to_vec() })
    }

    pub fn command(&self) -> u8 {
        self.command
    }

    /// Bytes after the status byte.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Battery voltage in millivolts.
    pub fn battery_millivolts(&self) -> Result<u16> {
        let mut fields = self.fields(BATTERY_LEVEL_LEN)?;
        Ok(fields.word())
    }

    /// Current sleep time limit in milliseconds.
    pub fn sleep_time_limit(&self) -> Result<u32> {
        let mut fields = self.fields(KEEP_ALIVE_LEN)?;
        Ok(fields.long())
    }

    pub fn output_state(&self) -> Result<OutputState> {
        let mut fields = self.fields(OUTPUT_STATE_LEN)?;
        let port = fields.byte();
        let motor = Motor::from_port(port).ok_or(ProtocolFault::UnknownPort { port })?;

        Ok(OutputState {
            motor,
            power: fields.byte() as i8,
            mode: OutputMode(fields.byte()),
            regulation: RegulationMode::from_byte(fields.byte()),
            turn_ratio: fields.byte() as i8,
            run_state: RunState::from_byte(fields.byte()),
            tacho_limit: fields.long(),
            tacho_count: fields.long() as i32,
            block_tacho_count: fields.long() as i32,
            rotation_count: fields.long() as i32,
        })
    }

    pub fn versions(&self) -> Result<Versions> {
        let mut fields = self.fields(FIRMWARE_VERSION_LEN)?;
        let protocol_minor = fields.byte();
        let protocol_major = fields.byte();
        let firmware_minor = fields.byte();
        let firmware_major = fields.byte();
        Ok(Versions { protocol_major, protocol_minor, firmware_major, firmware_minor })
    }

    pub fn device_info(&self) -> Result<DeviceInfo> {
        let mut fields = self.fields(DEVICE_INFO_LEN)?;

        let raw_name = fields.take(DEVICE_NAME_LEN);
        let name_end = raw_name.iter().position(|&b| b == 0).unwrap_or(raw_name.len());
        let name = String::from_utf8_lossy(&raw_name[..name_end]).into_owned();

        let raw_address = fields.take(BLUETOOTH_ADDRESS_LEN);
        let mut bluetooth_address = [0u8; 6];
        bluetooth_address.copy_from_slice(&raw_address[..6]);

        Ok(DeviceInfo {
            name,
            bluetooth_address,
            signal_strength: fields.long(),
            free_flash: fields.long(),
        })
    }

    fn fields(&self, needed: usize) -> Result<Fields<'_>> {
        if self.payload.len() < needed {
            return Err(ProtocolFault::TruncatedReply {
                expected: REPLY_HEADER_LEN + needed,
                actual: REPLY_HEADER_LEN + self.payload.len(),
            }
            .into());
        }
        Ok(Fields { bytes: &self.payload })
    }
}

/// Little-endian field cursor. Callers check the length up front.
struct Fields<'a> {
    bytes: &'a [u8],
}

impl<'a> Fields<'a> {
    fn take(&mut self, n: usize) -> &'a [u8] {
        let (head, rest) = self.bytes.split_at(n);
        self.bytes = rest;
        head
    }

    fn byte(&mut self) -> u8 {
        self.take(1)[0]
    }

    fn word(&mut self) -> u16 {
        let b = self.take(2);
        u16::from_le_bytes([b[0], b[1]])
    }

    fn long(&mut self) -> u32 {
        let b = self.take(4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }
}
