//! Command opcodes from the NXT direct and system command reference

/// Direct commands (type byte 0x00 / 0x80)
pub mod direct {
    pub const PLAY_TONE: u8 = 0x03;
    pub const SET_OUTPUT_STATE: u8 = 0x04;
    pub const GET_OUTPUT_STATE: u8 = 0x06;
    pub const RESET_MOTOR_POSITION: u8 = 0x0A;
    pub const GET_BATTERY_LEVEL: u8 = 0x0B;
    pub const STOP_SOUND_PLAYBACK: u8 = 0x0C;
    pub const KEEP_ALIVE: u8 = 0x0D;
}

/// System commands (type byte 0x01 / 0x81)
pub mod system {
    pub const GET_FIRMWARE_VERSION: u8 = 0x88;
    pub const GET_DEVICE_INFO: u8 = 0x9B;
}
