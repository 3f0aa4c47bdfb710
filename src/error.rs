//! Error types for brick communication.
//!
//! Every failure the protocol core can produce falls into one of three kinds:
//!
//! - **Device not found**: no NXT brick on the USB bus when the transport is opened
//! - **Transport errors**: the USB link rejected or could not complete a transfer
//! - **Protocol errors**: a telegram violated the frame size limits, or the
//!   brick's confirmation reply failed validation
//!
//! Nothing in the core retries, logs-and-continues or exits. Errors propagate to
//! the immediate caller, which decides what to do with them:
//!
//! ```rust
//! use nxt_direct::{NxtError, UsbStatus};
//!
//! let error = NxtError::transport("bulk write", UsbStatus::Timeout);
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use crate::transport::status::UsbStatus;
use thiserror::Error;

/// Result type alias for brick operations.
pub type Result<T, E = NxtError> = std::result::Result<T, E>;

/// Main error type for brick operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NxtError {
    #[error("No NXT brick found on the USB bus (vendor {vendor_id:#06x}, product {product_id:#06x})")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("USB {operation} failed: {reason}")]
    Transport { operation: &'static str, reason: UsbStatus },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolFault),
}

/// What exactly was wrong with a telegram or a reply.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolFault {
    #[error("telegram of {len} bytes has no payload after the two-byte header")]
    TelegramTooShort { len: usize },

    #[error("telegram of {len} bytes exceeds the {max}-byte device limit")]
    TelegramTooLong { len: usize, max: usize },

    #[error("brick sent an empty reply")]
    EmptyReply,

    #[error("reply of {actual} bytes is shorter than the expected {expected}")]
    TruncatedReply { expected: usize, actual: usize },

    #[error("reply carries telegram type {found:#04x} instead of the reply type")]
    UnexpectedReplyType { found: u8 },

    #[error("reply echoes command {found:#04x}, expected {expected:#04x}")]
    CommandMismatch { expected: u8, found: u8 },

    #[error("reply refers to unknown output port {port:#04x}")]
    UnknownPort { port: u8 },

    #[error("brick rejected command {command:#04x} with status {status:#04x}")]
    DeviceStatus { command: u8, status: u8 },
}

impl NxtError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// The core itself never retries; this is guidance for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            NxtError::DeviceNotFound { .. } => true,
            NxtError::Transport { reason, .. } => matches!(
                reason,
                UsbStatus::Timeout | UsbStatus::Busy | UsbStatus::Interrupted | UsbStatus::Io
            ),
            NxtError::Protocol(fault) => matches!(fault, ProtocolFault::DeviceStatus { .. }),
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            NxtError::DeviceNotFound { .. } => vec![
                "Check that the brick is switched on and plugged in",
                "Check udev rules or permissions for the Lego USB device",
                "Make sure no other program holds the brick",
            ],
            NxtError::Transport { reason: UsbStatus::Access, .. } => vec![
                "Run with permissions to access the USB device",
                "Install a udev rule for vendor 0694 product 0002",
            ],
            NxtError::Transport { reason: UsbStatus::Busy, .. } => vec![
                "Another program has claimed the brick's interface",
                "Close other NXT tools and reconnect",
            ],
            NxtError::Transport { reason: UsbStatus::NoDevice, .. } => vec![
                "The brick was disconnected or switched off",
                "Reconnect the brick and open a new transport",
            ],
            NxtError::Transport { .. } => vec![
                "Retry the operation",
                "Unplug and reconnect the brick",
                "Increase the USB transfer timeouts",
            ],
            NxtError::Protocol(ProtocolFault::DeviceStatus { .. }) => vec![
                "Check the command arguments against the brick's limits",
                "Retry once the brick has finished its current action",
            ],
            NxtError::Protocol(_) => vec![
                "Check the telegram size before executing it",
                "Check the brick firmware version",
                "Drain stale replies by reopening the transport",
            ],
        }
    }

    /// Helper constructor for transport errors.
    pub fn transport(operation: &'static str, reason: impl Into<UsbStatus>) -> Self {
        NxtError::Transport { operation, reason: reason.into() }
    }

    /// Helper constructor for a missing brick.
    pub fn device_not_found(vendor_id: u16, product_id: u16) -> Self {
        NxtError::DeviceNotFound { vendor_id, product_id }
    }

    /// Returns the mapped USB reason when this is a transport error.
    pub fn usb_status(&self) -> Option<UsbStatus> {
        match self {
            NxtError::Transport { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Returns the protocol fault when this is a protocol error.
    pub fn protocol_fault(&self) -> Option<ProtocolFault> {
        match self {
            NxtError::Protocol(fault) => Some(*fault),
            _ => None,
        }
    }
}
