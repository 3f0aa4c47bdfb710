//! Closed mapping of USB driver status codes
//!
//! libusb reports failures as negative integers and `rusb` wraps them in its own
//! error enum. Neither escapes the transport: both are folded into [`UsbStatus`],
//! which is total over every input, including codes added by future driver
//! releases.

use std::fmt;

/// Reason carried by a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsbStatus {
    Success,
    Io,
    InvalidParam,
    Access,
    NoDevice,
    NotFound,
    Busy,
    Timeout,
    Overflow,
    Pipe,
    Interrupted,
    NoMem,
    NotSupported,
    Other,
    /// A status code outside the documented libusb range.
    Unrecognized(i32),
}

impl UsbStatus {
    /// Map a raw libusb status code.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => UsbStatus::Success,
            -1 => UsbStatus::Io,
            -2 => UsbStatus::InvalidParam,
            -3 => UsbStatus::Access,
            -4 => UsbStatus::NoDevice,
            -5 => UsbStatus::NotFound,
            -6 => UsbStatus::Busy,
            -7 => UsbStatus::Timeout,
            -8 => UsbStatus::Overflow,
            -9 => UsbStatus::Pipe,
            -10 => UsbStatus::Interrupted,
            -11 => UsbStatus::NoMem,
            -12 => UsbStatus::NotSupported,
            -99 => UsbStatus::Other,
            other => UsbStatus::Unrecognized(other),
        }
    }

    /// libusb's symbolic name for this status.
    pub fn name(self) -> &'static str {
        match self {
            UsbStatus::Success => "LIBUSB_SUCCESS",
            UsbStatus::Io => "LIBUSB_ERROR_IO",
            UsbStatus::InvalidParam => "LIBUSB_ERROR_INVALID_PARAM",
            UsbStatus::Access => "LIBUSB_ERROR_ACCESS",
            UsbStatus::NoDevice => "LIBUSB_ERROR_NO_DEVICE",
            UsbStatus::NotFound => "LIBUSB_ERROR_NOT_FOUND",
            UsbStatus::Busy => "LIBUSB_ERROR_BUSY",
            UsbStatus::Timeout => "LIBUSB_ERROR_TIMEOUT",
            UsbStatus::Overflow => "LIBUSB_ERROR_OVERFLOW",
            UsbStatus::Pipe => "LIBUSB_ERROR_PIPE",
            UsbStatus::Interrupted => "LIBUSB_ERROR_INTERRUPTED",
            UsbStatus::NoMem => "LIBUSB_ERROR_NO_MEM",
            UsbStatus::NotSupported => "LIBUSB_ERROR_NOT_SUPPORTED",
            UsbStatus::Other => "LIBUSB_ERROR_OTHER",
            UsbStatus::Unrecognized(_) => "LIBUSB_ERROR_UNKNOWN",
        }
    }

    /// Human readable description.
    pub fn description(self) -> &'static str {
        match self {
            UsbStatus::Success => "success",
            UsbStatus::Io => "input/output error",
            UsbStatus::InvalidParam => "invalid parameter",
            UsbStatus::Access => "access denied (insufficient permissions)",
            UsbStatus::NoDevice => "no such device (it may have been disconnected)",
            UsbStatus::NotFound => "entity not found",
            UsbStatus::Busy => "resource busy",
            UsbStatus::Timeout => "operation timed out",
            UsbStatus::Overflow => "buffer overflow",
            UsbStatus::Pipe => "pipe error",
            UsbStatus::Interrupted => "system call interrupted",
            UsbStatus::NoMem => "insufficient memory",
            UsbStatus::NotSupported => "operation not supported on this platform",
            UsbStatus::Other => "other error",
            UsbStatus::Unrecognized(_) => "unrecognized status code",
        }
    }
}

impl fmt::Display for UsbStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsbStatus::Unrecognized(code) => {
                write!(f, "{} ({}: {})", self.description(), self.name(), code)
            }
            _ => write!(f, "{} ({})", self.description(), self.name()),
        }
    }
}

impl From<rusb::Error> for UsbStatus {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Io => UsbStatus::Io,
            rusb::Error::InvalidParam => UsbStatus::InvalidParam,
            rusb::Error::Access => UsbStatus::Access,
            rusb::Error::NoDevice => UsbStatus::NoDevice,
            rusb::Error::NotFound => UsbStatus::NotFound,
            rusb::Error::Busy => UsbStatus::Busy,
            rusb::Error::Timeout => UsbStatus::Timeout,
            rusb::Error::Overflow => UsbStatus::Overflow,
            rusb::Error::Pipe => UsbStatus::Pipe,
            rusb::Error::Interrupted => UsbStatus::Interrupted,
            rusb::Error::NoMem => UsbStatus::NoMem,
            rusb::Error::NotSupported => UsbStatus::NotSupported,
            // Other, plus rusb's own descriptor parsing failure which has no libusb code
            _ => UsbStatus::Other,
        }
    }
}
