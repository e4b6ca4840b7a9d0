//! Device selection on the command line
//!
//! A device is named either by its platform path or by its 1-based row in
//! the `list` table. Rows are positional, so an index is only resolved
//! against a fresh enumeration taken right before connecting.

use std::fmt;
use std::str::FromStr;

use hid_analyzer_transport::DiscoveredDevice;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Device index starts at 1")]
    ZeroIndex,

    #[error("No device at index {index}, {count} listed")]
    NoSuchIndex { index: usize, count: usize },

    #[error("Empty device selector")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// 1-based row of the device table
    Index(usize),
    /// Platform device path
    Path(String),
}

impl DeviceSelector {
    /// Whether resolving needs an enumeration
    pub fn needs_enumeration(&self) -> bool {
        matches!(self, DeviceSelector::Index(_))
    }

    /// Resolve to a device path
    ///
    /// Paths are returned as given; the connect step reports a missing device.
    pub fn resolve(&self, devices: &[DiscoveredDevice]) -> Result<String, SelectorError> {
        match self {
            DeviceSelector::Path(path) => Ok(path.clone()),
            DeviceSelector::Index(index) => index
                .checked_sub(1)
                .and_then(|i| devices.get(i))
                .map(|d| d.descriptor.path.clone())
                .ok_or(SelectorError::NoSuchIndex {
                    index: *index,
                    count: devices.len(),
                }),
        }
    }
}

impl FromStr for DeviceSelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SelectorError::Empty);
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = s.parse::<usize>() {
                if index == 0 {
                    return Err(SelectorError::ZeroIndex);
                }
                return Ok(DeviceSelector::Index(index));
            }
        }
        Ok(DeviceSelector::Path(s.to_string()))
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Index(i) => write!(f, "#{i}"),
            DeviceSelector::Path(p) => f.write_str(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hid_analyzer_transport::{DeviceCapabilities, DeviceDescriptor};

    fn device(path: &str) -> DiscoveredDevice {
        DiscoveredDevice {
            descriptor: DeviceDescriptor {
                vendor_id: 0x046D,
                product_id: 0xC52B,
                version_id: 0x1201,
                path: path.into(),
                product_name: String::new(),
                manufacturer_name: String::new(),
                serial_number: String::new(),
            },
            capabilities: DeviceCapabilities::default(),
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("2".parse::<DeviceSelector>().unwrap(), DeviceSelector::Index(2));
        assert_eq!(
            "/dev/hidraw3".parse::<DeviceSelector>().unwrap(),
            DeviceSelector::Path("/dev/hidraw3".into())
        );
        assert_eq!("0".parse::<DeviceSelector>(), Err(SelectorError::ZeroIndex));
        assert_eq!(" ".parse::<DeviceSelector>(), Err(SelectorError::Empty));
    }

    #[test]
    fn test_resolve() {
        let devices = vec![device("/dev/hidraw0"), device("/dev/hidraw1")];

        assert_eq!(DeviceSelector::Index(2).resolve(&devices).unwrap(), "/dev/hidraw1");
        assert_eq!(
            DeviceSelector::Index(3).resolve(&devices),
            Err(SelectorError::NoSuchIndex { index: 3, count: 2 })
        );
        // Paths are not checked against the listing
        assert_eq!(
            DeviceSelector::Path("/dev/hidraw9".into())
                .resolve(&devices)
                .unwrap(),
            "/dev/hidraw9"
        );
    }
}
