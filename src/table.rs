//! Device table rows
//!
//! One row per enumerated device: index, `VID_xxxx PID_xxxx REV_xxxx`
//! identity, the descriptor strings, the three report lengths, usage and
//! usage page, and the platform path.

use hid_analyzer_transport::{DeviceCapabilities, DeviceDescriptor, DiscoveredDevice};
use serde::Serialize;

const HEADERS: [&str; 11] = [
    "#",
    "Device",
    "Product",
    "Manufacturer",
    "Serial",
    "In",
    "Out",
    "Feature",
    "Usage",
    "Page",
    "Path",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRow {
    pub index: usize,
    pub identity: String,
    pub product: String,
    pub manufacturer: String,
    pub serial: String,
    pub input_report_length: usize,
    pub output_report_length: usize,
    pub feature_report_length: usize,
    pub usage: String,
    pub usage_page: String,
    pub path: String,
}

impl DeviceRow {
    pub fn new(index: usize, device: &DiscoveredDevice) -> Self {
        let d = &device.descriptor;
        let c = &device.capabilities;
        Self {
            index,
            identity: d.identity(),
            product: d.product_name.clone(),
            manufacturer: d.manufacturer_name.clone(),
            serial: d.serial_number.clone(),
            input_report_length: c.input_report_byte_length,
            output_report_length: c.output_report_byte_length,
            feature_report_length: c.feature_report_byte_length,
            usage: format!("{:02X}", c.usage),
            usage_page: format!("{:04X}", c.usage_page),
            path: d.path.clone(),
        }
    }

    fn cells(&self) -> [String; 11] {
        [
            self.index.to_string(),
            self.identity.clone(),
            self.product.clone(),
            self.manufacturer.clone(),
            self.serial.clone(),
            self.input_report_length.to_string(),
            self.output_report_length.to_string(),
            self.feature_report_length.to_string(),
            self.usage.clone(),
            self.usage_page.clone(),
            self.path.clone(),
        ]
    }
}

/// Rows for an enumeration, numbered from 1
pub fn rows(devices: &[DiscoveredDevice]) -> Vec<DeviceRow> {
    devices
        .iter()
        .enumerate()
        .map(|(i, d)| DeviceRow::new(i + 1, d))
        .collect()
}

/// Render rows as a left-aligned text table with a header line
pub fn render(rows: &[DeviceRow]) -> String {
    let cells: Vec<[String; 11]> = rows.iter().map(DeviceRow::cells).collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, HEADERS.iter().copied(), &widths);
    for row in &cells {
        push_line(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Multi-line summary of an open device
pub fn describe(descriptor: &DeviceDescriptor, capabilities: &DeviceCapabilities) -> Vec<String> {
    vec![
        descriptor.identity(),
        format!("Product:      {}", descriptor.product_name),
        format!("Manufacturer: {}", descriptor.manufacturer_name),
        format!("Serial:       {}", descriptor.serial_number),
        format!(
            "Reports:      input {}, output {}, feature {}{}",
            capabilities.input_report_byte_length,
            capabilities.output_report_byte_length,
            capabilities.feature_report_byte_length,
            if capabilities.numbered_reports {
                " (numbered)"
            } else {
                ""
            }
        ),
        format!(
            "Usage:        {:02X} page {:04X}",
            capabilities.usage, capabilities.usage_page
        ),
        format!("Path:         {}", descriptor.path),
        format!("Filter:       {}", descriptor.filter()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receiver() -> DiscoveredDevice {
        DiscoveredDevice {
            descriptor: DeviceDescriptor {
                vendor_id: 0x046D,
                product_id: 0xC52B,
                version_id: 0x1201,
                path: "/dev/hidraw2".into(),
                product_name: "USB Receiver".into(),
                manufacturer_name: "Logitech".into(),
                serial_number: String::new(),
            },
            capabilities: DeviceCapabilities {
                input_report_byte_length: 19,
                output_report_byte_length: 19,
                feature_report_byte_length: 0,
                usage: 0x02,
                usage_page: 0xFF00,
                numbered_reports: true,
            },
        }
    }

    #[test]
    fn test_row_columns() {
        let row = DeviceRow::new(1, &receiver());
        assert_eq!(row.identity, "VID_046D PID_C52B REV_1201");
        assert_eq!(row.usage, "02");
        assert_eq!(row.usage_page, "FF00");
        assert_eq!(row.output_report_length, 19);
    }

    #[test]
    fn test_render_aligns_columns() {
        let text = render(&rows(&[receiver(), receiver()]));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("#  Device"));
        assert!(lines[1].starts_with("1  VID_046D PID_C52B REV_1201  USB Receiver"));
        assert!(lines[2].starts_with("2  "));
        assert!(lines[1].ends_with("/dev/hidraw2"));
        // Path column starts at the same offset on every line
        let offset = lines[0].find("Path").unwrap();
        assert_eq!(lines[1].find("/dev/hidraw2").unwrap(), offset);
    }

    #[test]
    fn test_empty_table_is_header_only() {
        assert_eq!(render(&[]).lines().count(), 1);
    }

    #[test]
    fn test_describe_mentions_lengths() {
        let d = receiver();
        let lines = describe(&d.descriptor, &d.capabilities);
        assert_eq!(lines[0], "VID_046D PID_C52B REV_1201");
        assert!(lines.iter().any(|l| l.contains("input 19, output 19, feature 0 (numbered)")));
        assert_eq!(lines.last().unwrap(), "Filter:       046D:C52B");
    }
}
