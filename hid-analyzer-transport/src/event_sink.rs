//! Ordered transaction log
//!
//! Every emitter appends through one lock, so records reach the consumer in
//! exactly the order they were appended, whatever thread produced them.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::hex;
use crate::types::{Report, ReportKind};

/// Presentation hint attached to a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emphasis {
    #[default]
    Neutral,
    /// Data received from the device
    Info,
    /// Data accepted by the device
    Success,
    Error,
}

/// One line of the transaction log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Append order, starting at 0
    pub seq: u64,
    pub text: String,
    pub emphasis: Emphasis,
}

/// Transfer direction as seen from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

/// Format a transaction line
///
/// `Rx Input Report [9] <-- ID:1, 0102030405060708`
pub fn transaction_line(direction: Direction, kind: ReportKind, report: &Report) -> String {
    let (dir, arrow) = match direction {
        Direction::Rx => ("Rx", "<--"),
        Direction::Tx => ("Tx", "-->"),
    };
    format!(
        "{} {} Report [{}] {} ID:{}, {}",
        dir,
        kind,
        report.wire_len(),
        arrow,
        report.report_id,
        hex::encode(&report.payload, "")
    )
}

struct SinkState {
    next_seq: u64,
    tx: mpsc::UnboundedSender<LogRecord>,
}

/// Sending half of the transaction log; cheap to clone and thread-safe
#[derive(Clone)]
pub struct EventSink {
    state: Arc<Mutex<SinkState>>,
}

/// Receiving half of the transaction log
pub struct EventLog {
    rx: mpsc::UnboundedReceiver<LogRecord>,
}

impl EventSink {
    /// Create a connected sink/log pair
    pub fn channel() -> (EventSink, EventLog) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink {
            state: Arc::new(Mutex::new(SinkState { next_seq: 0, tx })),
        };
        (sink, EventLog { rx })
    }

    /// Append a record
    ///
    /// Appending after the log was dropped is silently ignored.
    pub fn append(&self, text: impl Into<String>, emphasis: Emphasis) {
        let text = text.into();
        debug!("log[{:?}] {}", emphasis, text);

        let mut state = self.state.lock();
        let record = LogRecord {
            seq: state.next_seq,
            text,
            emphasis,
        };
        state.next_seq += 1;
        let _ = state.tx.send(record);
    }

    pub fn neutral(&self, text: impl Into<String>) {
        self.append(text, Emphasis::Neutral);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.append(text, Emphasis::Error);
    }

    /// Append a transaction record; received data is `Info`, sent data `Success`
    pub fn transaction(&self, direction: Direction, kind: ReportKind, report: &Report) {
        let emphasis = match direction {
            Direction::Rx => Emphasis::Info,
            Direction::Tx => Emphasis::Success,
        };
        self.append(transaction_line(direction, kind, report), emphasis);
    }
}

impl EventLog {
    /// Wait for the next record; `None` once every sink is gone
    pub async fn next(&mut self) -> Option<LogRecord> {
        self.rx.recv().await
    }

    /// Take every record appended so far without waiting
    pub fn drain(&mut self) -> Vec<LogRecord> {
        let mut records = Vec::new();
        while let Ok(record) = self.rx.try_recv() {
            records.push(record);
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_line_counts_report_id() {
        let report = Report::new(1, vec![0xAA, 0xBB, 0xCC, 0, 0, 0, 0, 0]);
        assert_eq!(
            transaction_line(Direction::Tx, ReportKind::Output, &report),
            "Tx Output Report [9] --> ID:1, AABBCC0000000000"
        );
        assert_eq!(
            transaction_line(Direction::Rx, ReportKind::Feature, &Report::new(3, vec![0x10])),
            "Rx Feature Report [2] <-- ID:3, 10"
        );
    }

    #[test]
    fn test_records_keep_append_order_across_threads() {
        let (sink, mut log) = EventSink::channel();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        sink.neutral(format!("{t}:{i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let records = log.drain();
        assert_eq!(records.len(), 200);
        assert!(records.windows(2).all(|w| w[0].seq + 1 == w[1].seq));

        // Per-emitter order is preserved
        for t in 0..4 {
            let prefix = format!("{t}:");
            let own: Vec<usize> = records
                .iter()
                .filter_map(|r| r.text.strip_prefix(&prefix))
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(own, (0..50).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_append_after_log_dropped() {
        let (sink, log) = EventSink::channel();
        drop(log);
        sink.error("nobody listening");
    }
}
