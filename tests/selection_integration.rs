//! Integration tests for device selection and the device table.
//!
//! These exercise the public pieces the CLI chains together: parsing a
//! filter and a selector, building table rows from an enumeration, and
//! resolving a row number back to the device path that gets connected.

use hid_analyzer::command_line::ShellCommand;
use hid_analyzer::config::AnalyzerConfig;
use hid_analyzer::selector::{DeviceSelector, SelectorError};
use hid_analyzer::table;
use hid_analyzer_transport::{
    DeviceCapabilities, DeviceDescriptor, DeviceFilter, DiscoveredDevice,
};

fn device(vid: u16, pid: u16, path: &str, output: usize) -> DiscoveredDevice {
    DiscoveredDevice {
        descriptor: DeviceDescriptor {
            vendor_id: vid,
            product_id: pid,
            version_id: 0x0100,
            path: path.into(),
            product_name: format!("Device {path}"),
            manufacturer_name: "Acme".into(),
            serial_number: "0001".into(),
        },
        capabilities: DeviceCapabilities {
            input_report_byte_length: 8,
            output_report_byte_length: output,
            feature_report_byte_length: 0,
            usage: 0x06,
            usage_page: 0x0001,
            numbered_reports: false,
        },
    }
}

fn attached() -> Vec<DiscoveredDevice> {
    vec![
        device(0x046D, 0xC52B, "/dev/hidraw0", 8),
        device(0x1050, 0x0407, "/dev/hidraw1", 64),
        device(0x046D, 0xC52B, "/dev/hidraw2", 19),
    ]
}

// ── filter → rows → selector ──

#[test]
fn filtered_rows_are_renumbered_from_one() {
    let filter: DeviceFilter = "046d:c52b".parse().unwrap();
    let matching: Vec<_> = attached()
        .into_iter()
        .filter(|d| filter.matches(d.descriptor.vendor_id, d.descriptor.product_id))
        .collect();

    let rows = table::rows(&matching);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].index, 1);
    assert_eq!(rows[1].index, 2);
    assert_eq!(rows[1].path, "/dev/hidraw2");

    // Row 2 of the filtered table is the third attached device
    let selector: DeviceSelector = "2".parse().unwrap();
    assert_eq!(selector.resolve(&matching).unwrap(), "/dev/hidraw2");
}

#[test]
fn index_past_the_listing_is_an_error() {
    let selector: DeviceSelector = "4".parse().unwrap();
    assert_eq!(
        selector.resolve(&attached()),
        Err(SelectorError::NoSuchIndex { index: 4, count: 3 })
    );
}

#[test]
fn config_filter_drives_index_selection() {
    let config: AnalyzerConfig = toml::from_str("default_filter = \"1050:0407\"").unwrap();
    let filter = config.filter().unwrap();
    let matching: Vec<_> = attached()
        .into_iter()
        .filter(|d| filter.matches(d.descriptor.vendor_id, d.descriptor.product_id))
        .collect();

    assert_eq!(
        DeviceSelector::Index(1).resolve(&matching).unwrap(),
        "/dev/hidraw1"
    );
}

// ── table output ──

#[test]
fn json_rows_carry_every_column() {
    let rows = table::rows(&attached());
    let value = serde_json::to_value(&rows).unwrap();
    let first = &value[0];

    assert_eq!(first["index"], 1);
    assert_eq!(first["identity"], "VID_046D PID_C52B REV_0100");
    assert_eq!(first["product"], "Device /dev/hidraw0");
    assert_eq!(first["manufacturer"], "Acme");
    assert_eq!(first["serial"], "0001");
    assert_eq!(first["input_report_length"], 8);
    assert_eq!(first["output_report_length"], 8);
    assert_eq!(first["feature_report_length"], 0);
    assert_eq!(first["usage"], "06");
    assert_eq!(first["usage_page"], "0001");
    assert_eq!(first["path"], "/dev/hidraw0");
}

#[test]
fn text_table_lists_every_device() {
    let text = table::render(&table::rows(&attached()));
    assert_eq!(text.lines().count(), 4);
    assert!(text.contains("VID_1050 PID_0407 REV_0100"));
    assert!(text.lines().last().unwrap().ends_with("/dev/hidraw2"));
}

// ── shell line → transfer ──

#[test]
fn shell_line_fits_selected_device() {
    let devices = attached();
    let target = &devices[0];

    let Some(ShellCommand::WriteOutput { report_id, payload }) =
        ShellCommand::parse("out 1 AA-BB-CC").unwrap()
    else {
        panic!("expected an output write");
    };
    assert_eq!(report_id, 1);
    assert!(payload.len() <= target.capabilities.output_report_byte_length);
}
