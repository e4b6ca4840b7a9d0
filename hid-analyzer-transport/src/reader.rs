//! Input-report receive loop
//!
//! The loop re-arms a read after every completion until the session
//! generation it was started with is retired. Reads wake every
//! `read_poll_ms` when idle so teardown is noticed without a cancel token.
//! A device-gone error, or `max_read_errors` failures in a row, faults the
//! session instead of re-arming.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use crate::event_sink::Direction;
use crate::session::SessionShared;
use crate::types::{ReceivedReport, Report, ReportKind, SessionEvent};

/// Start the receive loop on a dedicated thread
pub(crate) fn spawn_receive_loop(
    shared: Arc<SessionShared>,
    generation: u64,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("hid-input-reader".into())
        .spawn(move || run_receive_loop(&shared, generation))
}

fn run_receive_loop(shared: &SessionShared, generation: u64) {
    let wire_len = shared.capabilities.input_report_byte_length + 1;
    let mut buf = vec![0u8; wire_len];
    let poll_ms = shared.config.read_poll_timeout();
    let max_errors = shared.config.max_read_errors.max(1);
    let mut error_streak = 0u32;

    debug!("Input receive loop started ({} byte reports)", wire_len);

    while shared.is_live(generation) {
        match shared.transport.read_input(&mut buf, poll_ms) {
            Ok(0) => {
                // Idle wake-up, loop re-checks liveness
                error_streak = 0;
            }
            Ok(len) => {
                error_streak = 0;
                // Completion may race teardown; drop it if the session moved on
                if !shared.is_live(generation) {
                    break;
                }
                let timestamp = shared.opened_at.elapsed().as_secs_f64();
                let report = Report::from_wire(&buf[..len.min(wire_len)]);
                shared
                    .sink
                    .transaction(Direction::Rx, ReportKind::Input, &report);
                shared.publish(SessionEvent::InputReport(ReceivedReport { timestamp, report }));
            }
            Err(e) if e.is_fatal() => {
                shared.fault(generation, format!("Input report receive stopped: {e}"));
                break;
            }
            Err(e) => {
                error_streak += 1;
                if error_streak >= max_errors {
                    shared.fault(
                        generation,
                        format!("Input report receive stopped after {error_streak} errors: {e}"),
                    );
                    break;
                }
                warn!("Input report read error: {}", e);
                if shared.is_live(generation) {
                    shared.sink.error(format!("Input report read error: {e}"));
                }
                std::thread::sleep(Duration::from_millis(shared.config.error_backoff_ms));
            }
        }
    }

    shared.receiving.store(false, Ordering::SeqCst);
    debug!("Input receive loop exiting");
}
