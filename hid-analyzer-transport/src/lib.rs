//! Device-session layer for USB HID report analysis
//!
//! This crate enumerates attached HID devices, opens one as a session and
//! exchanges input, output and feature reports with it while writing every
//! transaction to an ordered log:
//!
//! - [`hex`]: payload text codec
//! - [`HidDiscovery`]: enumeration with optional VID/PID filter
//! - [`DeviceSession`]: validated report I/O, the input receive loop and
//!   attach/detach monitoring
//! - [`EventSink`]: the transaction log channel

pub mod error;
pub mod event_sink;
pub mod hex;
pub mod report_layout;
pub mod session;
pub mod types;

mod discovery;
mod hid_device;
mod monitor;
mod reader;

pub use discovery::{enumerate, DeviceDiscovery, HidDiscovery, OpenedDevice};
pub use error::{ConnectError, SessionError, TransportError};
pub use event_sink::{transaction_line, Direction, Emphasis, EventLog, EventSink, LogRecord};
pub use hid_device::HidTransport;
pub use session::{DeviceSession, SessionConfig};
pub use types::{
    DeviceCapabilities, DeviceDescriptor, DeviceFilter, DiscoveredDevice, ReceivedReport, Report,
    ReportKind, SessionEvent, SessionState,
};

use std::sync::Arc;

/// Raw report I/O on one open device
///
/// All buffers are wire buffers: byte 0 is the report id, followed by the
/// report data. Calls block; the session runs them on its own threads.
pub trait Transport: Send + Sync {
    /// Wait up to `timeout_ms` for the next input report
    ///
    /// # Returns
    /// Number of bytes written to `buf`, 0 on timeout
    fn read_input(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError>;

    /// Send an output report
    fn write_output(&self, data: &[u8]) -> Result<usize, TransportError>;

    /// Read a feature report; `buf[0]` selects the report id
    ///
    /// # Returns
    /// Number of bytes read, including the report id
    fn get_feature(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Send a feature report
    fn send_feature(&self, data: &[u8]) -> Result<(), TransportError>;
}

/// Type alias for a shared transport
pub type BoxedTransport = Arc<dyn Transport>;
