//! USB bulk transport to an NXT brick
//!
//! The brick exposes one configuration with a single data interface carrying a
//! bulk OUT and a bulk IN endpoint. Opening the transport walks the same steps
//! as the Lego reference driver:
//!
//! 1. initialize a libusb context
//! 2. open the first device matching the Lego vendor / NXT product ids
//! 3. select configuration 1
//! 4. claim interface 0
//! 5. reset the device
//!
//! Any failing step drops what was already acquired before the error is
//! returned, so a caller either gets a fully usable transport or nothing.
//!
//! libusb access goes through the small [`UsbBus`] / [`UsbDevice`] seam, which
//! `rusb` implements and which tests replace with a recording mock.

use super::Transport;
use crate::config::UsbConfig;
use crate::telegram::MAX_TELEGRAM_LEN;
use crate::transport::status::UsbStatus;
use crate::{NxtError, Result};
use std::time::Duration;
use tracing::{debug, trace};

/// Lego Group USB vendor id
pub const NXT_VENDOR_ID: u16 = 0x0694;
/// NXT brick USB product id
pub const NXT_PRODUCT_ID: u16 = 0x0002;
/// The brick's only configuration
pub const NXT_CONFIGURATION: u8 = 1;
/// The brick's only data interface
pub const NXT_INTERFACE: u8 = 0;
/// Host to brick
pub const BULK_OUT_ENDPOINT: u8 = 0x01;
/// Brick to host
pub const BULK_IN_ENDPOINT: u8 = 0x82;

/// Driver context able to open devices by vendor and product id.
pub trait UsbBus {
    type Device: UsbDevice;

    /// Open the first device matching the ids, if any is attached.
    fn open_device(&self, vendor_id: u16, product_id: u16) -> Option<Self::Device>;
}

/// An opened device handle.
pub trait UsbDevice {
    fn configure(&mut self, configuration: u8) -> rusb::Result<()>;
    fn claim(&mut self, interface: u8) -> rusb::Result<()>;
    fn reset_device(&mut self) -> rusb::Result<()>;
    fn bulk_write(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> rusb::Result<usize>;
    fn bulk_read(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize>;
}

impl UsbBus for rusb::Context {
    type Device = rusb::DeviceHandle<rusb::Context>;

    fn open_device(&self, vendor_id: u16, product_id: u16) -> Option<Self::Device> {
        rusb::UsbContext::open_device_with_vid_pid(self, vendor_id, product_id)
    }
}

impl<C: rusb::UsbContext> UsbDevice for rusb::DeviceHandle<C> {
    fn configure(&mut self, configuration: u8) -> rusb::Result<()> {
        self.set_active_configuration(configuration)
    }

    fn claim(&mut self, interface: u8) -> rusb::Result<()> {
        self.claim_interface(interface)
    }

    fn reset_device(&mut self) -> rusb::Result<()> {
        self.reset()
    }

    fn bulk_write(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> rusb::Result<usize> {
        self.write_bulk(endpoint, data, timeout)
    }

    fn bulk_read(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize> {
        self.read_bulk(endpoint, buf, timeout)
    }
}

/// Transport over the brick's USB bulk endpoints.
///
/// Dropping the transport closes the device handle and then releases the driver
/// context, whatever happened to earlier transfers.
pub struct UsbTransport<B: UsbBus = rusb::Context> {
    // Field order matters: the handle is dropped before its context.
    device: B::Device,
    bus: B,
    config: UsbConfig,
}

impl UsbTransport<rusb::Context> {
    /// Open the first NXT brick on the bus with default timeouts.
    pub fn open() -> Result<Self> {
        Self::open_with(UsbConfig::default())
    }

    /// Open the first NXT brick on the bus.
    pub fn open_with(config: UsbConfig) -> Result<Self> {
        let context = rusb::Context::new().map_err(|e| NxtError::transport("context init", e))?;
        Self::with_bus(context, config)
    }
}

impl<B: UsbBus> UsbTransport<B> {
    /// Open and prepare the brick through an already initialized driver context.
    ///
    /// The context is consumed: on error it is released along with any handle
    /// opened so far.
    pub fn with_bus(bus: B, config: UsbConfig) -> Result<Self> {
        debug!(
            vendor_id = NXT_VENDOR_ID,
            product_id = NXT_PRODUCT_ID,
            "Looking for NXT brick on the USB bus"
        );

        let mut device = bus.open_device(NXT_VENDOR_ID, NXT_PRODUCT_ID).ok_or_else(|| {
            debug!("No NXT brick attached");
            NxtError::device_not_found(NXT_VENDOR_ID, NXT_PRODUCT_ID)
        })?;

        device
            .configure(NXT_CONFIGURATION)
            .map_err(|e| NxtError::transport("set configuration", e))?;
        device.claim(NXT_INTERFACE).map_err(|e| NxtError::transport("claim interface", e))?;
        device.reset_device().map_err(|e| NxtError::transport("device reset", e))?;

        debug!(
            configuration = NXT_CONFIGURATION,
            interface = NXT_INTERFACE,
            "NXT brick opened and claimed"
        );
        Ok(Self { device, bus, config })
    }

    pub fn config(&self) -> &UsbConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B: UsbBus> Transport for UsbTransport<B> {
    fn write(&mut self, frame: &[u8]) -> Result<()> {
        let transferred = self
            .device
            .bulk_write(BULK_OUT_ENDPOINT, frame, self.config.write_timeout())
            .map_err(|e| NxtError::transport("bulk write", e))?;
        trace!(requested = frame.len(), transferred, "Bulk write");

        if transferred != frame.len() {
            debug!(requested = frame.len(), transferred, "Short bulk write");
            return Err(NxtError::transport("bulk write", UsbStatus::Io));
        }
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<u8>> {
        let mut buf = [0u8; MAX_TELEGRAM_LEN];
        let transferred = self
            .device
            .bulk_read(BULK_IN_ENDPOINT, &mut buf, self.config.read_timeout())
            .map_err(|e| NxtError::transport("bulk read", e))?;
        trace!(transferred, head = ?&buf[..transferred.min(3)], "Bulk read");

        Ok(buf[..transferred].to_vec())
    }
}

impl<B: UsbBus> Drop for UsbTransport<B> {
    fn drop(&mut self) {
        debug!("Releasing NXT USB handle and driver context");
    }
}
