//! Transaction log rendering
//!
//! Received data is blue, sent data dark green, errors red; everything else
//! keeps the terminal default.

use crossterm::style::Stylize;
use hid_analyzer_transport::{Emphasis, LogRecord};

pub fn render_record(record: &LogRecord, color: bool) -> String {
    let text = record.text.as_str();
    if !color {
        return text.to_string();
    }
    match record.emphasis {
        Emphasis::Neutral => text.to_string(),
        Emphasis::Info => text.blue().to_string(),
        Emphasis::Success => text.dark_green().to_string(),
        Emphasis::Error => text.red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, emphasis: Emphasis) -> LogRecord {
        LogRecord {
            seq: 0,
            text: text.into(),
            emphasis,
        }
    }

    #[test]
    fn test_plain_when_color_disabled() {
        let r = record("Tx Output Report [9] --> ID:1, AABBCC0000000000", Emphasis::Success);
        assert_eq!(render_record(&r, false), r.text);
    }

    #[test]
    fn test_neutral_is_never_styled() {
        let r = record("Hid Input Report Callback Started.", Emphasis::Neutral);
        assert_eq!(render_record(&r, true), r.text);
    }

    #[test]
    fn test_styled_keeps_text() {
        let r = record("This device has no Feature Report support!", Emphasis::Error);
        assert!(render_record(&r, true).contains(&r.text));
    }
}
