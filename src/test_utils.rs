//! Test doubles for the transport and USB driver layers
//!
//! - [`MockTransport`] records frames written by a [`Brick`](crate::Brick) and
//!   plays back scripted replies.
//! - [`MockUsbBus`] stands in for the libusb context so [`UsbTransport`]
//!   construction, transfers and teardown can be checked without hardware.
//!
//! Both hand out a log handle before being moved into the code under test.

use crate::telegram::{MAX_TELEGRAM_LEN, TelegramType};
use crate::transport::Transport;
use crate::transport::status::UsbStatus;
use crate::transport::usb::{UsbBus, UsbDevice};
use crate::{NxtError, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Success reply echoing the command of `frame`.
fn ack_for(frame: &[u8]) -> Vec<u8> {
    vec![TelegramType::Reply.as_byte(), frame.get(1).copied().unwrap_or_default(), 0x00]
}

#[derive(Debug, Default)]
struct TransportState {
    writes: Vec<Vec<u8>>,
    reads: usize,
    replies: VecDeque<Vec<u8>>,
    write_failure: Option<UsbStatus>,
    read_failure: Option<UsbStatus>,
    drops: usize,
}

/// Scripted in-memory transport.
///
/// Reads return queued replies in order; once the queue is empty every read
/// acknowledges the last written command with status zero.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Rc<RefCell<TransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw reply frame.
    pub fn with_reply(self, reply: Vec<u8>) -> Self {
        self.state.borrow_mut().replies.push_back(reply);
        self
    }

    pub fn failing_writes(self, reason: UsbStatus) -> Self {
        self.state.borrow_mut().write_failure = Some(reason);
        self
    }

    pub fn failing_reads(self, reason: UsbStatus) -> Self {
        self.state.borrow_mut().read_failure = Some(reason);
        self
    }

    pub fn log(&self) -> TransportLog {
        TransportLog { state: Rc::clone(&self.state) }
    }
}

impl Transport for MockTransport {
    fn write(&mut self, frame: &[u8]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(reason) = state.write_failure {
            return Err(NxtError::transport("bulk write", reason));
        }
        state.writes.push(frame.to_vec());
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<u8>> {
        let mut state = self.state.borrow_mut();
        state.reads += 1;
        if let Some(reason) = state.read_failure {
            return Err(NxtError::transport("bulk read", reason));
        }
        if let Some(reply) = state.replies.pop_front() {
            return Ok(reply);
        }
        Ok(state.writes.last().map(|frame| ack_for(frame)).unwrap_or_default())
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.state.borrow_mut().drops += 1;
    }
}

/// Read side of a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct TransportLog {
    state: Rc<RefCell<TransportState>>,
}

impl TransportLog {
    /// Every frame successfully written, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.borrow().writes.clone()
    }

    /// Number of read attempts, failed ones included.
    pub fn reads(&self) -> usize {
        self.state.borrow().reads
    }

    /// Number of times the transport was dropped.
    pub fn drops(&self) -> usize {
        self.state.borrow().drops
    }
}

/// Recorded interaction with the mock USB driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsbEvent {
    ContextInit,
    ContextExit,
    DeviceOpened,
    DeviceClosed,
    Configured(u8),
    Claimed(u8),
    Reset,
    BulkWrite { endpoint: u8, data: Vec<u8> },
    BulkRead { endpoint: u8 },
}

/// Driver call that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsbStep {
    Configure,
    Claim,
    Reset,
    Write,
    Read,
}

#[derive(Debug, Default)]
struct UsbState {
    events: Vec<UsbEvent>,
    timeouts: Vec<Duration>,
    failures: Vec<(UsbStep, rusb::Error)>,
    inbound: VecDeque<Vec<u8>>,
    last_written: Option<Vec<u8>>,
    short_write: Option<usize>,
}

impl UsbState {
    fn failure(&self, step: UsbStep) -> rusb::Result<()> {
        match self.failures.iter().find(|(s, _)| *s == step) {
            Some((_, error)) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Mock libusb context. Creating it counts as context init, dropping it as exit.
#[derive(Debug)]
pub struct MockUsbBus {
    device_present: bool,
    state: Rc<RefCell<UsbState>>,
}

impl MockUsbBus {
    pub fn with_device() -> Self {
        Self::build(true)
    }

    pub fn without_device() -> Self {
        Self::build(false)
    }

    fn build(device_present: bool) -> Self {
        let state = Rc::new(RefCell::new(UsbState::default()));
        state.borrow_mut().events.push(UsbEvent::ContextInit);
        Self { device_present, state }
    }

    pub fn failing_at(self, step: UsbStep, error: rusb::Error) -> Self {
        self.state.borrow_mut().failures.push((step, error));
        self
    }

    /// Report only `transferred` bytes for every bulk write.
    pub fn short_writes(self, transferred: usize) -> Self {
        self.state.borrow_mut().short_write = Some(transferred);
        self
    }

    /// Queue an inbound frame. With nothing queued, reads acknowledge the last write.
    pub fn with_inbound(self, frame: Vec<u8>) -> Self {
        self.state.borrow_mut().inbound.push_back(frame);
        self
    }

    pub fn log(&self) -> UsbLog {
        UsbLog { state: Rc::clone(&self.state) }
    }
}

impl UsbBus for MockUsbBus {
    type Device = MockUsbDevice;

    fn open_device(&self, _vendor_id: u16, _product_id: u16) -> Option<MockUsbDevice> {
        if !self.device_present {
            return None;
        }
        self.state.borrow_mut().events.push(UsbEvent::DeviceOpened);
        Some(MockUsbDevice { state: Rc::clone(&self.state) })
    }
}

impl Drop for MockUsbBus {
    fn drop(&mut self) {
        self.state.borrow_mut().events.push(UsbEvent::ContextExit);
    }
}

/// Handle opened by a [`MockUsbBus`]. Dropping it counts as closing the device.
#[derive(Debug)]
pub struct MockUsbDevice {
    state: Rc<RefCell<UsbState>>,
}

impl MockUsbDevice {
    fn step(&mut self, step: UsbStep, event: UsbEvent) -> rusb::Result<()> {
        let mut state = self.state.borrow_mut();
        state.events.push(event);
        state.failure(step)
    }
}

impl UsbDevice for MockUsbDevice {
    fn configure(&mut self, configuration: u8) -> rusb::Result<()> {
        self.step(UsbStep::Configure, UsbEvent::Configured(configuration))
    }

    fn claim(&mut self, interface: u8) -> rusb::Result<()> {
        self.step(UsbStep::Claim, UsbEvent::Claimed(interface))
    }

    fn reset_device(&mut self) -> rusb::Result<()> {
        self.step(UsbStep::Reset, UsbEvent::Reset)
    }

    fn bulk_write(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> rusb::Result<usize> {
        self.step(UsbStep::Write, UsbEvent::BulkWrite { endpoint, data: data.to_vec() })?;
        let mut state = self.state.borrow_mut();
        state.timeouts.push(timeout);
        state.last_written = Some(data.to_vec());
        Ok(state.short_write.map_or(data.len(), |n| n.min(data.len())))
    }

    fn bulk_read(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize> {
        self.step(UsbStep::Read, UsbEvent::BulkRead { endpoint })?;
        let mut state = self.state.borrow_mut();
        state.timeouts.push(timeout);

        let frame = match state.inbound.pop_front() {
            Some(frame) => frame,
            None => match &state.last_written {
                Some(written) => ack_for(written),
                None => return Err(rusb::Error::Timeout),
            },
        };
        if frame.len() > buf.len().min(MAX_TELEGRAM_LEN) {
            return Err(rusb::Error::Overflow);
        }
        buf[..frame.len()].copy_from_slice(&frame);
        Ok(frame.len())
    }
}

impl Drop for MockUsbDevice {
    fn drop(&mut self) {
        self.state.borrow_mut().events.push(UsbEvent::DeviceClosed);
    }
}

/// Read side of a [`MockUsbBus`].
#[derive(Debug, Clone)]
pub struct UsbLog {
    state: Rc<RefCell<UsbState>>,
}

impl UsbLog {
    pub fn events(&self) -> Vec<UsbEvent> {
        self.state.borrow().events.clone()
    }

    /// Timeout passed to every successful bulk transfer, in order.
    pub fn timeouts(&self) -> Vec<Duration> {
        self.state.borrow().timeouts.clone()
    }
}
