//! Command handlers for the CLI application.
//!
//! - `report`: monitor and the one-shot report transactions
//! - `shell`: interactive session
//! - `utility`: utility commands (list, config)

pub mod report;
pub mod shell;
pub mod utility;

use std::path::PathBuf;
use std::sync::Arc;

use hid_analyzer::config::AnalyzerConfig;
use hid_analyzer::render::render_record;
use hid_analyzer::selector::DeviceSelector;
use hid_analyzer_transport::{
    enumerate, DeviceDiscovery, DeviceSession, EventLog, EventSink, HidDiscovery, LogRecord,
    SessionError, TransportError,
};
use tracing::info;

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Everything a command needs besides its own arguments
pub struct Context {
    pub config: AnalyzerConfig,
    pub config_path: PathBuf,
    pub color: bool,
}

impl Context {
    pub fn new(config: AnalyzerConfig, config_path: PathBuf, no_color: bool) -> Self {
        let color = config.color && !no_color;
        Self {
            config,
            config_path,
            color,
        }
    }

    pub fn discovery(&self) -> anyhow::Result<Arc<dyn DeviceDiscovery>> {
        Ok(init_discovery(HidDiscovery::new)?)
    }

    pub fn print(&self, record: &LogRecord) {
        println!("{}", render_record(record, self.color));
    }

    pub fn print_all(&self, records: Vec<LogRecord>) {
        for record in records {
            self.print(&record);
        }
    }
}

/// Bring up a discovery backend
///
/// A platform HID library that fails to start means nothing can be listed,
/// so the failure is reported as [`SessionError::Enumeration`] like any
/// other listing failure.
fn init_discovery<D>(
    init: impl FnOnce() -> Result<D, TransportError>,
) -> Result<Arc<dyn DeviceDiscovery>, SessionError>
where
    D: DeviceDiscovery + 'static,
{
    let discovery = init().map_err(SessionError::Enumeration)?;
    Ok(Arc::new(discovery))
}

/// An open session together with its transaction log
pub struct OpenSession {
    pub session: DeviceSession,
    pub sink: EventSink,
    pub log: EventLog,
}

/// Resolve `selector` and connect
///
/// Row numbers are resolved against a fresh enumeration using the configured
/// default filter, the same listing `list` prints without `--filter`.
pub async fn open_session(ctx: &Context, selector: &DeviceSelector) -> anyhow::Result<OpenSession> {
    let discovery = ctx.discovery()?;

    let devices = if selector.needs_enumeration() {
        enumerate(discovery.as_ref(), ctx.config.filter()?).await?
    } else {
        Vec::new()
    };
    let path = selector.resolve(&devices)?;
    info!("Opening {} ({})", path, selector);

    let (sink, log) = EventSink::channel();
    let session =
        DeviceSession::connect(discovery, &path, sink.clone(), ctx.config.session_config()).await?;
    Ok(OpenSession { session, sink, log })
}
