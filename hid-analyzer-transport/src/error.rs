//! Error types for enumeration, connection and report I/O

use thiserror::Error;

use crate::hex::HexError;
use crate::types::ReportKind;

/// Raw platform failures from the HID subsystem
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device disconnected")]
    Disconnected,

    #[error("Communication timeout")]
    Timeout,

    // HID-specific errors
    #[error("HID error: {0}")]
    HidError(String),

    #[error("HID permission denied: {0}")]
    HidPermissionDenied(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Lowercased fragments of platform errors meaning the device went away
///
/// hidapi only hands out message text, so this is a best-effort match; the
/// receive loop also faults after a streak of errors and on removal.
const DEVICE_GONE_MESSAGES: &[&str] = &[
    // Linux hidraw
    "no such device",
    "enodev",
    "device disconnected",
    // macOS IOKit
    "device not configured",
    "0xe00002d8",
    "0xe00002c0",
    // Windows: ERROR_DEVICE_NOT_CONNECTED, ERROR_INVALID_HANDLE, ERROR_DEVICE_REMOVED
    "the device is not connected",
    "0x0000048f",
    "invalid handle",
    "the handle is invalid",
    "0x00000651",
];

impl TransportError {
    /// Whether the handle is unusable and further I/O on it can only fail
    pub fn is_fatal(&self) -> bool {
        match self {
            TransportError::Disconnected | TransportError::DeviceNotFound(_) => true,
            TransportError::HidError(msg) => {
                let msg = msg.to_ascii_lowercase();
                DEVICE_GONE_MESSAGES.iter().any(|m| msg.contains(m))
            }
            _ => false,
        }
    }
}

impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") || msg.contains("EACCES") {
            TransportError::HidPermissionDenied(msg)
        } else {
            TransportError::HidError(msg)
        }
    }
}

/// Failures while opening a device for a session
#[derive(Error, Debug, Clone)]
pub enum ConnectError {
    /// The path no longer resolves to an attached device
    #[error("Could not find HID device at {0}")]
    DeviceNotFound(String),

    /// The platform refused to open the device
    #[error("Failed to open HID device: {0}")]
    OpenFailed(#[source] TransportError),
}

/// Errors surfaced to the operator for a single command
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error("Enumeration failed: {0}")]
    Enumeration(#[source] TransportError),

    #[error("Invalid VID:PID filter '{0}'")]
    InvalidFilter(String),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("This device has no {0} Report support!")]
    UnsupportedReport(ReportKind),

    #[error("{kind} Report Length Exceed: {len} bytes, device accepts {max}")]
    PayloadTooLarge {
        kind: ReportKind,
        len: usize,
        max: usize,
    },

    #[error(transparent)]
    MalformedHex(#[from] HexError),

    #[error("Write not acknowledged within {0} ms")]
    WriteTimeout(u64),

    #[error("Write failed: {0}")]
    WriteFailed(#[source] TransportError),

    #[error("Read failed: {0}")]
    ReadFailed(#[source] TransportError),

    #[error("Session is not open")]
    NotOpen,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(TransportError::Disconnected.is_fatal());
        assert!(TransportError::HidError("hid_read: No such device".into()).is_fatal());
        assert!(!TransportError::Timeout.is_fatal());
        assert!(!TransportError::HidError("Broken pipe".into()).is_fatal());
    }

    #[test]
    fn test_fatal_platform_unplug_messages() {
        let windows = "hid_read_timeout/GetOverlappedResult: (0x0000048F) The device is not connected.";
        assert!(TransportError::HidError(windows.into()).is_fatal());
        assert!(TransportError::HidError("hid_write: (0x00000006) The handle is invalid.".into()).is_fatal());
        assert!(TransportError::HidError("IOHIDDeviceSetReport failed: (0xE00002D8)".into()).is_fatal());
        assert!(!TransportError::HidPermissionDenied("Permission denied".into()).is_fatal());
    }

    #[test]
    fn test_unsupported_report_message() {
        let err = SessionError::UnsupportedReport(ReportKind::Feature);
        assert_eq!(err.to_string(), "This device has no Feature Report support!");
    }
}
