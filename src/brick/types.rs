//! Value types carried by brick commands and replies

use std::fmt;
use std::time::Duration;

/// Output port of a motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motor {
    A,
    B,
    C,
    /// All three ports at once. Only valid for commands, not for state queries.
    All,
}

impl Motor {
    pub fn port(self) -> u8 {
        match self {
            Motor::A => 0x00,
            Motor::B => 0x01,
            Motor::C => 0x02,
            Motor::All => 0xFF,
        }
    }

    pub fn from_port(port: u8) -> Option<Self> {
        match port {
            0x00 => Some(Motor::A),
            0x01 => Some(Motor::B),
            0x02 => Some(Motor::C),
            0xFF => Some(Motor::All),
            _ => None,
        }
    }
}

impl fmt::Display for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Motor::A => f.write_str("A"),
            Motor::B => f.write_str("B"),
            Motor::C => f.write_str("C"),
            Motor::All => f.write_str("All"),
        }
    }
}

/// Output mode bit set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OutputMode(pub u8);

impl OutputMode {
    pub const COAST: OutputMode = OutputMode(0x00);
    pub const MOTOR_ON: OutputMode = OutputMode(0x01);
    pub const BRAKE: OutputMode = OutputMode(0x02);
    pub const REGULATED: OutputMode = OutputMode(0x04);

    pub fn contains(self, other: OutputMode) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for OutputMode {
    type Output = OutputMode;

    fn bitor(self, rhs: OutputMode) -> OutputMode {
        OutputMode(self.0 | rhs.0)
    }
}

/// Closed-loop regulation applied to an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegulationMode {
    Idle,
    MotorSpeed,
    MotorSync,
    /// Value not in the command reference.
    Other(u8),
}

impl RegulationMode {
    pub fn as_byte(self) -> u8 {
        match self {
            RegulationMode::Idle => 0x00,
            RegulationMode::MotorSpeed => 0x01,
            RegulationMode::MotorSync => 0x02,
            RegulationMode::Other(byte) => byte,
        }
    }

    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => RegulationMode::Idle,
            0x01 => RegulationMode::MotorSpeed,
            0x02 => RegulationMode::MotorSync,
            other => RegulationMode::Other(other),
        }
    }
}

/// Run state of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    RampUp,
    Running,
    RampDown,
    /// Value not in the command reference.
    Other(u8),
}

impl RunState {
    pub fn as_byte(self) -> u8 {
        match self {
            RunState::Idle => 0x00,
            RunState::RampUp => 0x10,
            RunState::Running => 0x20,
            RunState::RampDown => 0x40,
            RunState::Other(byte) => byte,
        }
    }

    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => RunState::Idle,
            0x10 => RunState::RampUp,
            0x20 => RunState::Running,
            0x40 => RunState::RampDown,
            other => RunState::Other(other),
        }
    }
}

/// Arguments of a SETOUTPUTSTATE command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSettings {
    /// -100..=100 percent
    pub power: i8,
    pub mode: OutputMode,
    pub regulation: RegulationMode,
    /// -100..=100, only meaningful with motor sync regulation
    pub turn_ratio: i8,
    pub run_state: RunState,
    /// Degrees of rotation before the output stops; 0 runs until the next command
    pub tacho_limit: u32,
}

impl OutputSettings {
    /// Speed-regulated run at `power`, braking when `power` is zero.
    pub fn run(power: i8, tacho_limit: u32) -> Self {
        if power == 0 {
            return Self::stop(true);
        }
        Self {
            power: power.clamp(-100, 100),
            mode: OutputMode::MOTOR_ON | OutputMode::BRAKE | OutputMode::REGULATED,
            regulation: RegulationMode::MotorSpeed,
            turn_ratio: 0,
            run_state: RunState::Running,
            tacho_limit,
        }
    }

    /// Stop the output, holding position when `brake` is set and coasting otherwise.
    pub fn stop(brake: bool) -> Self {
        let (mode, run_state) = if brake {
            (OutputMode::MOTOR_ON | OutputMode::BRAKE, RunState::Running)
        } else {
            (OutputMode::COAST, RunState::Idle)
        };
        Self {
            power: 0,
            mode,
            regulation: RegulationMode::Idle,
            turn_ratio: 0,
            run_state,
            tacho_limit: 0,
        }
    }
}

/// Decoded GETOUTPUTSTATE reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputState {
    pub motor: Motor,
    pub power: i8,
    pub mode: OutputMode,
    pub regulation: RegulationMode,
    pub turn_ratio: i8,
    pub run_state: RunState,
    /// Current limit on a movement in progress, if any
    pub tacho_limit: u32,
    /// Internal count; number of counts since last reset of the motor counter
    pub tacho_count: i32,
    /// Current position relative to last programmed movement
    pub block_tacho_count: i32,
    /// Current position relative to last reset of the rotation sensor
    pub rotation_count: i32,
}

/// Protocol and firmware versions reported by the brick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Versions {
    pub protocol_major: u8,
    pub protocol_minor: u8,
    pub firmware_major: u8,
    pub firmware_minor: u8,
}

impl fmt::Display for Versions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "protocol {}.{} firmware {}.{}",
            self.protocol_major, self.protocol_minor, self.firmware_major, self.firmware_minor
        )
    }
}

/// Brick identity and radio details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub bluetooth_address: [u8; 6],
    pub signal_strength: u32,
    pub free_flash: u32,
}

/// Outcome of a message rate check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateReport {
    pub calls: u64,
    pub elapsed: Duration,
}

impl RateReport {
    pub fn calls_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.calls as f64 / secs } else { 0.0 }
    }

    /// Mean round trip per call.
    pub fn mean_call_time(&self) -> Duration {
        if self.calls == 0 {
            return Duration::ZERO;
        }
        self.elapsed.div_f64(self.calls as f64)
    }
}
