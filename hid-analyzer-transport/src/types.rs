//! Common types for the device-session layer

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::SessionError;

/// HID report type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportKind {
    /// Device-to-host, pushed continuously
    Input,
    /// Host-to-device
    Output,
    /// Bidirectional, on demand
    Feature,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportKind::Input => "Input",
            ReportKind::Output => "Output",
            ReportKind::Feature => "Feature",
        })
    }
}

/// Identity and string descriptors of an attached device
///
/// String descriptors are best-effort and empty when unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Device release number (bcdDevice)
    pub version_id: u16,
    /// Platform device path, stable while the device stays attached
    pub path: String,
    pub product_name: String,
    pub manufacturer_name: String,
    pub serial_number: String,
}

impl DeviceDescriptor {
    /// `VID_xxxx PID_xxxx REV_xxxx`
    pub fn identity(&self) -> String {
        format!(
            "VID_{:04X} PID_{:04X} REV_{:04X}",
            self.vendor_id, self.product_id, self.version_id
        )
    }

    /// Filter matching exactly this device's VID/PID
    pub fn filter(&self) -> DeviceFilter {
        DeviceFilter::exact(self.vendor_id, self.product_id)
    }

    /// Whether `other` is the same physical device as this one
    ///
    /// VID/PID must agree. A serial number identifies the device wherever it
    /// re-enumerates; without one only the same path counts, since platforms
    /// hand a freed path to the next device that attaches.
    pub fn same_device(&self, other: &DeviceDescriptor) -> bool {
        if self.vendor_id != other.vendor_id || self.product_id != other.product_id {
            return false;
        }
        if self.serial_number.is_empty() {
            self.path == other.path
        } else {
            self.serial_number == other.serial_number
        }
    }
}

/// Device-declared report layout
///
/// Lengths are data bytes without the report-id byte. A length of 0 means the
/// device has no report of that type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceCapabilities {
    pub input_report_byte_length: usize,
    pub output_report_byte_length: usize,
    pub feature_report_byte_length: usize,
    pub usage: u16,
    pub usage_page: u16,
    /// Whether reports on the wire carry a leading report id
    pub numbered_reports: bool,
}

impl DeviceCapabilities {
    /// Data length for a report type
    pub fn report_length(&self, kind: ReportKind) -> usize {
        match kind {
            ReportKind::Input => self.input_report_byte_length,
            ReportKind::Output => self.output_report_byte_length,
            ReportKind::Feature => self.feature_report_byte_length,
        }
    }
}

/// Enumerated device: descriptor plus capabilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredDevice {
    pub descriptor: DeviceDescriptor,
    pub capabilities: DeviceCapabilities,
}

/// Vendor/product restriction for enumeration
///
/// Parses and prints as `VVVV:PPPP` (hex).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
}

impl DeviceFilter {
    /// Match every device
    pub fn any() -> Self {
        Self::default()
    }

    /// Match one VID/PID pair
    pub fn exact(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id: Some(vendor_id),
            product_id: Some(product_id),
        }
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id.map_or(true, |v| v == vendor_id)
            && self.product_id.map_or(true, |p| p == product_id)
    }
}

impl FromStr for DeviceFilter {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SessionError::InvalidFilter(s.to_string());
        let parse_id = |part: &str| -> Result<u16, SessionError> {
            let part = part.trim();
            let part = part
                .strip_prefix("0x")
                .or_else(|| part.strip_prefix("0X"))
                .unwrap_or(part);
            if part.is_empty() || part.len() > 4 {
                return Err(invalid());
            }
            u16::from_str_radix(part, 16).map_err(|_| invalid())
        };

        let (vid, pid) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self::exact(parse_id(vid)?, parse_id(pid)?))
    }
}

impl fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.vendor_id, self.product_id) {
            (Some(v), Some(p)) => write!(f, "{v:04X}:{p:04X}"),
            (Some(v), None) => write!(f, "{v:04X}:*"),
            (None, Some(p)) => write!(f, "*:{p:04X}"),
            (None, None) => f.write_str("*:*"),
        }
    }
}

/// One HID report: id plus fixed-length data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub report_id: u8,
    pub payload: Vec<u8>,
}

impl Report {
    pub fn new(report_id: u8, payload: Vec<u8>) -> Self {
        Self { report_id, payload }
    }

    /// Split a wire buffer `[id, data...]`
    pub fn from_wire(buf: &[u8]) -> Self {
        match buf.split_first() {
            Some((id, data)) => Self::new(*id, data.to_vec()),
            None => Self::new(0, Vec::new()),
        }
    }

    /// Wire buffer with the leading report-id byte
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.payload.len() + 1);
        buf.push(self.report_id);
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Bytes on the wire, counting the report id
    pub fn wire_len(&self) -> usize {
        self.payload.len() + 1
    }
}

/// Input report with its arrival time
#[derive(Debug, Clone)]
pub struct ReceivedReport {
    /// Seconds since the session opened
    pub timestamp: f64,
    pub report: Report,
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
    /// Attach/detach monitoring and the control worker are armed
    Monitoring,
    /// Unrecoverable I/O; reconnect required
    Faulted,
}

/// Notifications published by an open session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    InputReport(ReceivedReport),
    Inserted,
    Removed,
    Faulted(String),
}
