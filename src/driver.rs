//! Host driver facade
//!
//! [`NxtDriver`] sits between a robot control loop and the [`Brick`]: it maps
//! linear speeds to motor power, reads encoders for a set of motors and keeps
//! battery queries down to one per configured interval. It never sleeps; the
//! caller runs its own loop at [`NxtDriver::period`].

use crate::brick::{Brick, Motor, OutputState};
use crate::config::DriverConfig;
use crate::timer::Stopwatch;
use crate::transport::Transport;
use crate::transport::usb::UsbTransport;
use crate::Result;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Robot-facing wrapper around one brick.
pub struct NxtDriver<T: Transport = UsbTransport> {
    brick: Brick<T>,
    config: DriverConfig,
    /// `None` until the first battery poll.
    battery_timer: Option<Stopwatch>,
}

impl NxtDriver<UsbTransport> {
    /// Open the first brick on the bus using the configured USB timeouts.
    pub fn open(config: DriverConfig) -> Result<Self> {
        let brick = Brick::open_with(config.usb)?;
        Ok(Self::new(brick, config))
    }
}

impl<T: Transport> NxtDriver<T> {
    /// Wrap `brick`. A config that fails [`DriverConfig::validate`] is kept
    /// as given; its durations saturate rather than panic.
    pub fn new(brick: Brick<T>, config: DriverConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!(error = %e, "Driver config failed validation");
        }
        info!(
            max_power = config.max_power,
            max_speed = config.max_speed,
            period = config.period,
            "NXT driver ready"
        );
        Self { brick, config, battery_timer: None }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn brick(&self) -> &Brick<T> {
        &self.brick
    }

    pub fn brick_mut(&mut self) -> &mut Brick<T> {
        &mut self.brick
    }

    /// Control loop cadence.
    pub fn period(&self) -> Duration {
        self.config.period_duration()
    }

    /// Motor power in percent for a linear speed in m/s.
    ///
    /// Speeds beyond `max_speed` in either direction saturate at `max_power`.
    pub fn power_for_speed(&self, speed: f64) -> i8 {
        let DriverConfig { max_power, max_speed, .. } = self.config;
        if speed.is_nan() || max_speed.is_nan() || max_speed <= 0.0 {
            return 0;
        }
        let ratio = (speed / max_speed).clamp(-1.0, 1.0);
        (ratio * max_power.clamp(0.0, 100.0)).round() as i8
    }

    /// Run `motor` at `speed` m/s. Returns the power that was sent.
    pub fn set_speed(&mut self, motor: Motor, speed: f64) -> Result<i8> {
        let power = self.power_for_speed(speed);
        trace!(%motor, speed, power, "Setting motor speed");
        self.brick.set_motor(motor, power, 0)?;
        Ok(power)
    }

    /// Brake every motor.
    pub fn stop(&mut self) -> Result<()> {
        debug!("Stopping all motors");
        self.brick.stop_motor(Motor::All, true)
    }

    /// Read the output state of each motor in order. Stops at the first failure.
    pub fn motor_states(&mut self, motors: &[Motor]) -> Result<Vec<(Motor, OutputState)>> {
        motors.iter().map(|&motor| Ok((motor, self.brick.get_motor_state(motor)?))).collect()
    }

    /// Battery voltage in volts, at most once per `battery_poll_interval`.
    ///
    /// The first call always queries the brick. Between polls this returns
    /// `Ok(None)` without touching the transport.
    pub fn poll_battery(&mut self) -> Result<Option<f32>> {
        let interval = self.config.battery_poll_duration();
        if self.battery_timer.is_some_and(|timer| timer.elapsed() < interval) {
            return Ok(None);
        }

        // A failed query still waits a full interval before the next attempt.
        self.battery_timer.get_or_insert_with(Stopwatch::new).reset();
        let millivolts = self.brick.get_battery_level()?;
        let volts = f32::from(millivolts) / 1000.0;
        debug!(millivolts, volts, "Battery level");
        Ok(Some(volts))
    }
}
