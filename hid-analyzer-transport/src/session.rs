//! Device session: one open device, validated report I/O, receive loop and
//! attach/detach monitoring
//!
//! ```text
//!   connect ──► Open ──► Monitoring ──► (disconnect) ──► Closed
//!                 │           │
//!                 └───────────┴──► Faulted (receive failure or removal)
//! ```
//!
//! Output and feature transfers go through a control worker thread that owns
//! the control handle; the caller awaits the worker's reply (bounded by the
//! write timeout for writes). The receive loop runs on its own thread with its
//! own handle, so a read and a write can be outstanding together.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::discovery::DeviceDiscovery;
use crate::error::{ConnectError, SessionError, TransportError};
use crate::event_sink::{Direction, EventSink};
use crate::monitor::spawn_presence_monitor;
use crate::reader::spawn_receive_loop;
use crate::types::{
    DeviceCapabilities, DeviceDescriptor, ReceivedReport, Report, ReportKind, SessionEvent,
    SessionState,
};
use crate::Transport;

/// Session timing and buffering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Bound on output/feature writes
    pub write_timeout_ms: u64,
    /// Idle wake-up period of the receive loop
    pub read_poll_ms: u64,
    /// Presence poll period for attach/detach
    pub monitor_interval_ms: u64,
    /// Pause after a transient receive error
    pub error_backoff_ms: u64,
    /// Back-to-back receive errors after which the session faults
    pub max_read_errors: u32,
    /// Session event channel depth
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            write_timeout_ms: 3000,
            read_poll_ms: 50,
            monitor_interval_ms: 500,
            error_backoff_ms: 100,
            max_read_errors: 8,
            event_capacity: 256,
        }
    }
}

impl SessionConfig {
    /// `read_poll_ms` as a hidapi read timeout
    ///
    /// Zero would make every read non-blocking and negative means block
    /// forever, so the value is kept within `1..=i32::MAX`.
    pub fn read_poll_timeout(&self) -> i32 {
        i32::try_from(self.read_poll_ms.max(1)).unwrap_or(i32::MAX)
    }
}

/// State shared with the receive loop and the presence monitor
pub(crate) struct SessionShared {
    pub(crate) descriptor: DeviceDescriptor,
    pub(crate) capabilities: DeviceCapabilities,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) sink: EventSink,
    pub(crate) config: SessionConfig,
    pub(crate) opened_at: Instant,
    /// Receive loop is armed
    pub(crate) receiving: AtomicBool,
    /// Bumped on teardown; completions from an older generation are dropped
    generation: AtomicU64,
    state: Mutex<SessionState>,
    events: Mutex<Option<broadcast::Sender<SessionEvent>>>,
}

impl SessionShared {
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Whether work started under `generation` may still act
    pub(crate) fn is_live(&self, generation: u64) -> bool {
        self.generation() == generation
            && matches!(self.state(), SessionState::Open | SessionState::Monitoring)
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        if let Some(tx) = self.events.lock().as_ref() {
            // No subscribers is fine
            let _ = tx.send(event);
        }
    }

    /// Move to `Faulted` unless the session was already torn down
    ///
    /// Only the first fault of a generation is logged and published.
    pub(crate) fn fault(&self, generation: u64, reason: String) {
        {
            let mut state = self.state.lock();
            if self.generation() != generation
                || matches!(*state, SessionState::Closed | SessionState::Faulted)
            {
                return;
            }
            *state = SessionState::Faulted;
        }
        warn!("Session faulted: {}", reason);
        self.sink.error(reason.clone());
        self.publish(SessionEvent::Faulted(reason));
    }
}

/// Work for the control worker
enum ControlRequest {
    WriteOutput {
        data: Vec<u8>,
        reply: oneshot::Sender<Result<usize, TransportError>>,
    },
    GetFeature {
        buf: Vec<u8>,
        reply: oneshot::Sender<Result<Vec<u8>, TransportError>>,
    },
    SendFeature {
        data: Vec<u8>,
        reply: oneshot::Sender<Result<(), TransportError>>,
    },
}

fn spawn_control_worker(
    transport: Arc<dyn Transport>,
    mut requests: mpsc::UnboundedReceiver<ControlRequest>,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("hid-control-worker".into())
        .spawn(move || {
            debug!("Control worker started");
            while let Some(request) = requests.blocking_recv() {
                // A caller that timed out has dropped its receiver; send fails quietly
                match request {
                    ControlRequest::WriteOutput { data, reply } => {
                        let _ = reply.send(transport.write_output(&data));
                    }
                    ControlRequest::GetFeature { mut buf, reply } => {
                        let result = transport.get_feature(&mut buf).map(|len| {
                            buf.truncate(len);
                            buf
                        });
                        let _ = reply.send(result);
                    }
                    ControlRequest::SendFeature { data, reply } => {
                        let _ = reply.send(transport.send_feature(&data));
                    }
                }
            }
            debug!("Control worker exiting");
        })
        .map(|_| ())
}

/// An open device
///
/// Exactly one session owns a device handle. Dropping the session disconnects
/// it.
pub struct DeviceSession {
    shared: Arc<SessionShared>,
    control_tx: Option<mpsc::UnboundedSender<ControlRequest>>,
    monitor: Option<tokio::task::JoinHandle<()>>,
}

impl DeviceSession {
    /// Open the device at `path` and arm attach/detach monitoring
    ///
    /// Must be called from within a tokio runtime.
    pub async fn connect(
        discovery: Arc<dyn DeviceDiscovery>,
        path: &str,
        sink: EventSink,
        config: SessionConfig,
    ) -> Result<Self, ConnectError> {
        let opened = discovery.open_device(path).await?;
        let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));

        let shared = Arc::new(SessionShared {
            descriptor: opened.descriptor,
            capabilities: opened.capabilities,
            transport: opened.transport,
            sink,
            config,
            opened_at: Instant::now(),
            receiving: AtomicBool::new(false),
            generation: AtomicU64::new(1),
            state: Mutex::new(SessionState::Open),
            events: Mutex::new(Some(events_tx)),
        });

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        spawn_control_worker(Arc::clone(&shared.transport), control_rx).map_err(|e| {
            ConnectError::OpenFailed(TransportError::Internal(format!("control worker: {e}")))
        })?;

        let monitor = spawn_presence_monitor(Arc::clone(&shared), discovery, shared.generation());
        *shared.state.lock() = SessionState::Monitoring;

        info!(
            "Session open: {} at {}",
            shared.descriptor.identity(),
            shared.descriptor.path
        );
        let connected = format!(
            "Connected {} {}",
            shared.descriptor.identity(),
            shared.descriptor.product_name
        );
        shared.sink.neutral(connected.trim_end());

        Ok(Self {
            shared,
            control_tx: Some(control_tx),
            monitor: Some(monitor),
        })
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.shared.descriptor
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.shared.capabilities
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Whether the input receive loop is armed
    pub fn is_receiving(&self) -> bool {
        self.shared.receiving.load(Ordering::SeqCst)
    }

    /// Subscribe to input reports and attach/detach notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        match self.shared.events.lock().as_ref() {
            Some(tx) => tx.subscribe(),
            None => {
                // Closed session: hand out a receiver that reports Closed
                let (tx, rx) = broadcast::channel(1);
                drop(tx);
                rx
            }
        }
    }

    /// Input reports in arrival order, ending when the session closes
    ///
    /// Only reports received after this call are yielded.
    pub fn input_reports(&self) -> impl Stream<Item = ReceivedReport> + Send + 'static {
        futures::stream::unfold(self.subscribe(), |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(SessionEvent::InputReport(report)) => return Some((report, rx)),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(n)) => {
                        warn!("Input report stream lagged, {} events skipped", n);
                        continue;
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Open | SessionState::Monitoring => Ok(()),
            SessionState::Closed | SessionState::Faulted => Err(SessionError::NotOpen),
        }
    }

    fn ensure_supported(&self, kind: ReportKind) -> Result<usize, SessionError> {
        match self.shared.capabilities.report_length(kind) {
            0 => Err(SessionError::UnsupportedReport(kind)),
            len => Ok(len),
        }
    }

    fn ensure_fits(kind: ReportKind, len: usize, max: usize) -> Result<(), SessionError> {
        if len > max {
            return Err(SessionError::PayloadTooLarge { kind, len, max });
        }
        Ok(())
    }

    fn submit(&self, request: ControlRequest) -> Result<(), SessionError> {
        let tx = self.control_tx.as_ref().ok_or(SessionError::NotOpen)?;
        tx.send(request).map_err(|_| SessionError::NotOpen)
    }

    async fn await_write<T>(
        &self,
        reply: oneshot::Receiver<Result<T, TransportError>>,
    ) -> Result<T, SessionError> {
        let timeout_ms = self.shared.config.write_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), reply).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(e))) => Err(SessionError::WriteFailed(e)),
            Ok(Err(_)) => Err(SessionError::WriteFailed(TransportError::Disconnected)),
            Err(_) => Err(SessionError::WriteTimeout(timeout_ms)),
        }
    }

    /// Arm the continuous input receive loop
    ///
    /// Reports are logged and published as they arrive. Reads carry no
    /// timeout; the loop only stops on teardown or a fatal receive error.
    /// Calling this while the loop is armed does nothing.
    pub fn read_input(&self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.ensure_supported(ReportKind::Input)?;

        if self.shared.receiving.swap(true, Ordering::SeqCst) {
            self.shared
                .sink
                .neutral("Hid Input Report Callback Already Running.");
            return Ok(());
        }

        self.shared.sink.neutral("Hid Input Report Callback Started.");
        if let Err(e) = spawn_receive_loop(Arc::clone(&self.shared), self.shared.generation()) {
            self.shared.receiving.store(false, Ordering::SeqCst);
            return Err(SessionError::ReadFailed(TransportError::Internal(format!(
                "receive loop: {e}"
            ))));
        }
        Ok(())
    }

    /// Send an output report
    ///
    /// `payload` is zero-padded to the device's output report length and tagged
    /// with `report_id`.
    pub async fn write_output(&self, report_id: u8, payload: &[u8]) -> Result<(), SessionError> {
        self.ensure_open()?;
        let len = self.ensure_supported(ReportKind::Output)?;
        Self::ensure_fits(ReportKind::Output, payload.len(), len)?;

        let mut data = vec![0u8; len];
        data[..payload.len()].copy_from_slice(payload);
        let report = Report::new(report_id, data);

        let (reply, rx) = oneshot::channel();
        self.submit(ControlRequest::WriteOutput {
            data: report.to_bytes(),
            reply,
        })?;
        self.await_write(rx).await?;

        self.shared
            .sink
            .transaction(Direction::Tx, ReportKind::Output, &report);
        Ok(())
    }

    /// Read a feature report
    ///
    /// Blocks until the device answers; there is no timeout on reads.
    pub async fn read_feature(&self, report_id: u8) -> Result<Report, SessionError> {
        self.ensure_open()?;
        let len = self.ensure_supported(ReportKind::Feature)?;

        let mut buf = vec![0u8; len + 1];
        buf[0] = report_id;

        let (reply, rx) = oneshot::channel();
        self.submit(ControlRequest::GetFeature { buf, reply })?;
        let wire = match rx.await {
            Ok(Ok(wire)) => wire,
            Ok(Err(e)) => return Err(SessionError::ReadFailed(e)),
            Err(_) => return Err(SessionError::ReadFailed(TransportError::Disconnected)),
        };

        let report = Report::from_wire(&wire);
        self.shared
            .sink
            .transaction(Direction::Rx, ReportKind::Feature, &report);
        Ok(report)
    }

    /// Send a feature report
    ///
    /// `payload` is zero-extended to exactly the feature report length.
    pub async fn write_feature(&self, report_id: u8, payload: &[u8]) -> Result<(), SessionError> {
        self.ensure_open()?;
        let len = self.ensure_supported(ReportKind::Feature)?;
        Self::ensure_fits(ReportKind::Feature, payload.len(), len)?;

        let mut data = payload.to_vec();
        data.resize(len, 0);
        let report = Report::new(report_id, data);

        let (reply, rx) = oneshot::channel();
        self.submit(ControlRequest::SendFeature {
            data: report.to_bytes(),
            reply,
        })?;
        self.await_write(rx).await?;

        self.shared
            .sink
            .transaction(Direction::Tx, ReportKind::Feature, &report);
        Ok(())
    }

    /// Tear the session down
    ///
    /// Outstanding receives complete into a retired generation and are
    /// dropped. Idempotent.
    pub fn disconnect(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if *state == SessionState::Closed {
                return;
            }
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            *state = SessionState::Closed;
        }

        // Worker exits once the queue drains
        self.control_tx = None;
        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
        self.shared.events.lock().take();

        info!("Session closed: {}", self.shared.descriptor.identity());
        self.shared
            .sink
            .neutral(format!("Disconnected {}", self.shared.descriptor.identity()));
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}
