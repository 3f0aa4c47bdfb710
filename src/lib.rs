//! Direct-command driver for the Lego Mindstorms NXT brick over USB.
//!
//! The brick speaks a small request / optional-reply protocol: every command
//! is one telegram of at most 64 bytes, and the sender decides per telegram
//! whether the brick has to confirm it.
//!
//! # Features
//!
//! - **Telegrams**: little-endian payload assembly, reply bit handling
//! - **USB transport**: libusb bulk transfers with scoped device release
//! - **Command engine**: tones, motors, battery, tachometers, versions
//! - **Driver facade**: speed-to-power conversion and throttled battery polling
//!
//! ## Example
//!
//! ```rust,no_run
//! use nxt_direct::{DriverConfig, Motor, NxtDriver};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DriverConfig::load("nxt.yaml")?;
//!     let mut driver = NxtDriver::open(config)?;
//!
//!     driver.set_speed(Motor::B, 0.25)?;
//!     for (motor, state) in driver.motor_states(&[Motor::B, Motor::C])? {
//!         println!("{motor}: {} ticks", state.tacho_count);
//!     }
//!     if let Some(volts) = driver.poll_battery()? {
//!         println!("Battery: {volts:.2} V");
//!     }
//!     driver.stop()?;
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;

// Protocol layers
pub mod brick;
pub mod telegram;
pub mod transport;

// Host-side helpers
pub mod config;
pub mod driver;
pub mod timer;

// Core exports
pub use error::*;

pub use brick::{
    Brick, DeviceInfo, Motor, OutputMode, OutputSettings, OutputState, RateReport, Reply,
    RegulationMode, RunState, Versions,
};
pub use config::{ConfigError, DriverConfig, UsbConfig};
pub use driver::NxtDriver;
pub use telegram::{Buffer, Telegram, TelegramType};
pub use timer::Stopwatch;
pub use transport::Transport;
pub use transport::status::UsbStatus;
pub use transport::usb::UsbTransport;
