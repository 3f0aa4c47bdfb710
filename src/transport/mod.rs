//! Byte transports between this process and a brick
//!
//! A transport only moves raw frames; it knows nothing about telegram types or
//! opcodes. USB is the implemented link. A Bluetooth serial link would plug in
//! here by implementing [`Transport`].
//!
//! Every call blocks until the link reports completion, failure or a driver
//! level timeout. Transports are not internally synchronized: `&mut self` on
//! both methods means one caller at a time.

pub mod status;
pub mod usb;

use crate::Result;

/// Capability to send and receive whole frames.
pub trait Transport {
    /// Send `frame` as one link-layer transfer.
    ///
    /// A transfer the link reports as incomplete is an error; nothing is resent.
    fn write(&mut self, frame: &[u8]) -> Result<()>;

    /// Block until one inbound frame of at most
    /// [`MAX_TELEGRAM_LEN`](crate::telegram::MAX_TELEGRAM_LEN) bytes arrives and
    /// return exactly the bytes received.
    fn read(&mut self) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, frame: &[u8]) -> Result<()> {
        (**self).write(frame)
    }

    fn read(&mut self) -> Result<Vec<u8>> {
        (**self).read()
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, frame: &[u8]) -> Result<()> {
        (**self).write(frame)
    }

    fn read(&mut self) -> Result<Vec<u8>> {
        (**self).read()
    }
}
