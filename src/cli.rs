// CLI definitions using clap

use clap::{Parser, Subcommand};
use hid_analyzer::command_line::parse_report_id;
use hid_analyzer::selector::DeviceSelector;
use hid_analyzer_transport::DeviceFilter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hid-analyzer")]
#[command(author, version, about = "USB HID report analyzer")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/hid-analyzer/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Print log lines without color
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List attached HID devices
    #[command(visible_aliases = ["ls", "l"])]
    List {
        /// Only devices matching VID:PID (hex, e.g. 046D:C52B)
        #[arg(short, long)]
        filter: Option<DeviceFilter>,
        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stream input reports until Ctrl-C
    #[command(visible_alias = "m")]
    Monitor {
        /// Device path, or row number from `list`
        device: DeviceSelector,
    },

    /// Send one output report
    #[command(visible_alias = "out")]
    WriteOutput {
        /// Device path, or row number from `list`
        device: DeviceSelector,
        /// Report id (decimal or 0x hex)
        #[arg(long, default_value = "0", value_parser = parse_report_id)]
        id: u8,
        /// Payload hex, e.g. "AA-BB-CC"; zero-padded to the report length
        #[arg(default_value = "")]
        payload: String,
    },

    /// Read one feature report
    #[command(visible_alias = "getf")]
    ReadFeature {
        /// Device path, or row number from `list`
        device: DeviceSelector,
        /// Report id (decimal or 0x hex)
        #[arg(long, default_value = "0", value_parser = parse_report_id)]
        id: u8,
    },

    /// Send one feature report
    #[command(visible_alias = "setf")]
    WriteFeature {
        /// Device path, or row number from `list`
        device: DeviceSelector,
        /// Report id (decimal or 0x hex)
        #[arg(long, default_value = "0", value_parser = parse_report_id)]
        id: u8,
        /// Payload hex; zero-extended to the report length
        #[arg(default_value = "")]
        payload: String,
    },

    /// Interactive session with one device
    #[command(visible_alias = "sh")]
    Shell {
        /// Device path, or row number from `list`
        device: DeviceSelector,
    },

    /// Show the effective configuration
    Config {
        /// Write the configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_write_output_args() {
        let cli = Cli::try_parse_from([
            "hid-analyzer",
            "write-output",
            "2",
            "--id",
            "0x01",
            "AA-BB-CC",
        ])
        .unwrap();
        match cli.command {
            Commands::WriteOutput {
                device,
                id,
                payload,
            } => {
                assert_eq!(device, DeviceSelector::Index(2));
                assert_eq!(id, 1);
                assert_eq!(payload, "AA-BB-CC");
            }
            _ => panic!("expected write-output"),
        }
    }

    #[test]
    fn test_list_filter_is_validated() {
        let cli = Cli::try_parse_from(["hid-analyzer", "list", "--filter", "046D:C52B"]).unwrap();
        match cli.command {
            Commands::List { filter, json } => {
                assert_eq!(filter, Some(DeviceFilter::exact(0x046D, 0xC52B)));
                assert!(!json);
            }
            _ => panic!("expected list"),
        }
        assert!(Cli::try_parse_from(["hid-analyzer", "list", "--filter", "nope"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["hid-analyzer", "monitor", "/dev/hidraw0", "--no-color"]).unwrap();
        assert!(cli.no_color);
        assert_eq!(cli.log_level, "warn");
    }
}
