//! Device enumeration and opening

use std::sync::Arc;

use async_trait::async_trait;
use hidapi::{DeviceInfo, HidApi, HidDevice};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ConnectError, SessionError, TransportError};
use crate::hid_device::HidTransport;
use crate::report_layout::{self, ReportLengths};
use crate::types::{DeviceCapabilities, DeviceDescriptor, DeviceFilter, DiscoveredDevice};
use crate::BoxedTransport;

/// Upper bound on a HID report descriptor
const MAX_REPORT_DESCRIPTOR_SIZE: usize = 4096;

/// A device opened for a session
pub struct OpenedDevice {
    pub descriptor: DeviceDescriptor,
    pub capabilities: DeviceCapabilities,
    pub transport: BoxedTransport,
}

/// Device discovery abstraction
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// List attached devices matching `filter`, in platform order
    async fn list_devices(
        &self,
        filter: DeviceFilter,
    ) -> Result<Vec<DiscoveredDevice>, TransportError>;

    /// Open the device at `path` for simultaneous read and write
    async fn open_device(&self, path: &str) -> Result<OpenedDevice, ConnectError>;

    /// Check whether the device `descriptor` describes is still attached
    ///
    /// Matched with [`DeviceDescriptor::same_device`], so another device
    /// taking over the path does not count.
    async fn is_present(&self, descriptor: &DeviceDescriptor) -> Result<bool, TransportError>;
}

/// Enumerate devices, mapping platform failures to [`SessionError::Enumeration`]
///
/// An empty list is a valid outcome. The order is only meaningful within one
/// call; re-resolve by path across calls.
pub async fn enumerate(
    discovery: &dyn DeviceDiscovery,
    filter: DeviceFilter,
) -> Result<Vec<DiscoveredDevice>, SessionError> {
    let mut devices = discovery
        .list_devices(filter)
        .await
        .map_err(SessionError::Enumeration)?;
    devices.retain(|d| filter.matches(d.descriptor.vendor_id, d.descriptor.product_id));
    info!("Found {} devices matching {}", devices.len(), filter);
    Ok(devices)
}

/// hidapi-backed discovery
pub struct HidDiscovery {
    api: Mutex<HidApi>,
}

impl HidDiscovery {
    /// Initialize the platform HID library
    pub fn new() -> Result<Self, TransportError> {
        let api = HidApi::new()?;
        Ok(Self {
            api: Mutex::new(api),
        })
    }

    fn descriptor_from_info(info: &DeviceInfo) -> DeviceDescriptor {
        DeviceDescriptor {
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            version_id: info.release_number(),
            path: info.path().to_string_lossy().to_string(),
            product_name: info.product_string().unwrap_or_default().to_string(),
            manufacturer_name: info.manufacturer_string().unwrap_or_default().to_string(),
            serial_number: info.serial_number().unwrap_or_default().to_string(),
        }
    }

    /// Tally report lengths from an open handle's report descriptor
    fn read_report_lengths(device: &HidDevice) -> Result<ReportLengths, TransportError> {
        let mut buf = [0u8; MAX_REPORT_DESCRIPTOR_SIZE];
        let len = device.get_report_descriptor(&mut buf)?;
        Ok(report_layout::scan(&buf[..len]))
    }

    fn capabilities(info: &DeviceInfo, lengths: ReportLengths) -> DeviceCapabilities {
        DeviceCapabilities {
            input_report_byte_length: lengths.input,
            output_report_byte_length: lengths.output,
            feature_report_byte_length: lengths.feature,
            usage: info.usage(),
            usage_page: info.usage_page(),
            numbered_reports: lengths.numbered,
        }
    }

    /// Best-effort capability probe during enumeration
    fn probe(api: &HidApi, info: &DeviceInfo) -> DeviceCapabilities {
        let lengths = info
            .open_device(api)
            .map_err(TransportError::from)
            .and_then(|device| Self::read_report_lengths(&device));

        match lengths {
            Ok(lengths) => Self::capabilities(info, lengths),
            Err(e) => {
                debug!(
                    "No report layout for {:04X}:{:04X} ({}): {}",
                    info.vendor_id(),
                    info.product_id(),
                    info.path().to_string_lossy(),
                    e
                );
                Self::capabilities(info, ReportLengths::default())
            }
        }
    }
}

#[async_trait]
impl DeviceDiscovery for HidDiscovery {
    async fn list_devices(
        &self,
        filter: DeviceFilter,
    ) -> Result<Vec<DiscoveredDevice>, TransportError> {
        let mut api = self.api.lock();
        api.refresh_devices()?;

        let mut devices = Vec::new();
        for info in api.device_list() {
            if !filter.matches(info.vendor_id(), info.product_id()) {
                continue;
            }

            let descriptor = Self::descriptor_from_info(info);
            let capabilities = Self::probe(&api, info);

            debug!(
                "Found device: {} usage={:04X}:{:04X} path={}",
                descriptor.identity(),
                capabilities.usage_page,
                capabilities.usage,
                descriptor.path
            );

            devices.push(DiscoveredDevice {
                descriptor,
                capabilities,
            });
        }

        Ok(devices)
    }

    async fn open_device(&self, path: &str) -> Result<OpenedDevice, ConnectError> {
        let mut api = self.api.lock();
        api.refresh_devices()
            .map_err(|e| ConnectError::OpenFailed(e.into()))?;

        let info = api
            .device_list()
            .find(|d| d.path().to_string_lossy() == path)
            .cloned()
            .ok_or_else(|| ConnectError::DeviceNotFound(path.to_string()))?;

        let open = || {
            info.open_device(&api)
                .map_err(|e| ConnectError::OpenFailed(e.into()))
        };
        let control = open()?;
        let input = open()?;

        let lengths = match Self::read_report_lengths(&control) {
            Ok(lengths) => lengths,
            Err(e) => {
                warn!("Could not read report descriptor for {}: {}", path, e);
                ReportLengths::default()
            }
        };

        let descriptor = Self::descriptor_from_info(&info);
        let capabilities = Self::capabilities(&info, lengths);

        info!(
            "Opened {} (in={} out={} feature={})",
            descriptor.identity(),
            capabilities.input_report_byte_length,
            capabilities.output_report_byte_length,
            capabilities.feature_report_byte_length
        );

        Ok(OpenedDevice {
            descriptor,
            capabilities,
            transport: Arc::new(HidTransport::new(input, control, lengths.numbered)),
        })
    }

    async fn is_present(&self, descriptor: &DeviceDescriptor) -> Result<bool, TransportError> {
        let mut api = self.api.lock();
        api.refresh_devices()?;
        let present = api
            .device_list()
            .any(|info| descriptor.same_device(&Self::descriptor_from_info(info)));
        Ok(present)
    }
}
