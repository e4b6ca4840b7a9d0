//! Headless operator shell for the HID analyzer
//!
//! The device-session layer lives in `hid-analyzer-transport`; this crate
//! holds the pieces the command line is built from:
//! - `config`: TOML settings file
//! - `selector`: picking a device by list index or path
//! - `table`: device table rows
//! - `render`: colored transaction log lines
//! - `command_line`: interactive shell command parsing

pub mod command_line;
pub mod config;
pub mod render;
pub mod selector;
pub mod table;
