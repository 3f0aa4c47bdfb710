//! Telegram builders for the commands the engine knows
//!
//! Builders only assemble bytes. They all produce "with response" telegrams;
//! [`Brick::execute`](super::Brick::execute) settles the reply bit at send time.

use super::types::{Motor, OutputSettings};
use crate::telegram::opcode::{direct, system};
use crate::telegram::{Buffer, Telegram, TelegramType};

fn direct_command(command: u8, payload: &Buffer) -> Telegram {
    Telegram::new(TelegramType::DirectWithResponse, command, payload)
}

fn system_command(command: u8) -> Telegram {
    Telegram::new(TelegramType::SystemWithResponse, command, &Buffer::new())
}

/// PLAYTONE: frequency in Hz, duration in ms.
pub fn play_tone(tone_hz: u16, duration_ms: u16) -> Telegram {
    direct_command(direct::PLAY_TONE, &Buffer::new().append_word(tone_hz).append_word(duration_ms))
}

/// SETOUTPUTSTATE with explicit settings.
pub fn set_output_state(motor: Motor, settings: &OutputSettings) -> Telegram {
    let payload = Buffer::with_capacity(10)
        .append_byte(motor.port())
        .append_byte(settings.power as u8)
        .append_byte(settings.mode.value())
        .append_byte(settings.regulation.as_byte())
        .append_byte(settings.turn_ratio as u8)
        .append_byte(settings.run_state.as_byte())
        .append_long(settings.tacho_limit);
    direct_command(direct::SET_OUTPUT_STATE, &payload)
}

/// Speed-regulated run of `motor` at `power` percent until the next command.
pub fn set_motor(motor: Motor, power: i8) -> Telegram {
    set_output_state(motor, &OutputSettings::run(power, 0))
}

pub fn stop_motor(motor: Motor, brake: bool) -> Telegram {
    set_output_state(motor, &OutputSettings::stop(brake))
}

/// GETOUTPUTSTATE for a single port.
pub fn get_output_state(motor: Motor) -> Telegram {
    direct_command(direct::GET_OUTPUT_STATE, &Buffer::new().append_byte(motor.port()))
}

/// RESETMOTORPOSITION; `relative` resets only the block counter.
pub fn reset_motor_position(motor: Motor, relative: bool) -> Telegram {
    let payload = Buffer::new().append_byte(motor.port()).append_byte(u8::from(relative));
    direct_command(direct::RESET_MOTOR_POSITION, &payload)
}

pub fn get_battery_level() -> Telegram {
    direct_command(direct::GET_BATTERY_LEVEL, &Buffer::new())
}

pub fn stop_sound_playback() -> Telegram {
    direct_command(direct::STOP_SOUND_PLAYBACK, &Buffer::new())
}

pub fn keep_alive() -> Telegram {
    direct_command(direct::KEEP_ALIVE, &Buffer::new())
}

pub fn get_firmware_version() -> Telegram {
    system_command(system::GET_FIRMWARE_VERSION)
}

pub fn get_device_info() -> Telegram {
    system_command(system::GET_DEVICE_INFO)
}
