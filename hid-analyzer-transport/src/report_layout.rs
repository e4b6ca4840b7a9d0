//! Report byte lengths from a raw report descriptor
//!
//! hidapi hands out the raw descriptor but not the per-type report lengths a
//! HidP-style capabilities query would give. This walks the short items and
//! tallies `Report Size * Report Count` of each Input/Output/Feature main item
//! per report id. Usages, collections and logical ranges are skipped.

use std::collections::HashMap;

use crate::types::ReportKind;

/// Item type field (bits 2-3 of the prefix)
mod item_type {
    pub const MAIN: u8 = 0;
    pub const GLOBAL: u8 = 1;
}

/// Main item tags
mod main_tag {
    pub const INPUT: u8 = 0x8;
    pub const OUTPUT: u8 = 0x9;
    pub const FEATURE: u8 = 0xB;
}

/// Global item tags
mod global_tag {
    pub const REPORT_SIZE: u8 = 0x7;
    pub const REPORT_ID: u8 = 0x8;
    pub const REPORT_COUNT: u8 = 0x9;
    pub const PUSH: u8 = 0xA;
    pub const POP: u8 = 0xB;
}

/// Long item prefix (never carries report layout)
const LONG_ITEM: u8 = 0xFE;

/// Byte lengths per report type, report-id byte excluded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportLengths {
    pub input: usize,
    pub output: usize,
    pub feature: usize,
    /// Descriptor declares at least one Report ID
    pub numbered: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct Globals {
    report_size: u32,
    report_count: u32,
    report_id: u8,
}

/// Tally report lengths from descriptor bytes
///
/// Truncated trailing items are ignored; whatever was tallied up to that point
/// is returned.
pub fn scan(descriptor: &[u8]) -> ReportLengths {
    let mut globals = Globals::default();
    let mut stack: Vec<Globals> = Vec::new();
    let mut bits: HashMap<(ReportKind, u8), u64> = HashMap::new();
    let mut numbered = false;

    let mut i = 0;
    while i < descriptor.len() {
        let prefix = descriptor[i];

        if prefix == LONG_ITEM {
            let Some(&size) = descriptor.get(i + 1) else {
                break;
            };
            i += 3 + size as usize;
            continue;
        }

        let size = match prefix & 0x03 {
            3 => 4,
            n => n as usize,
        };
        let Some(data) = descriptor.get(i + 1..i + 1 + size) else {
            break;
        };
        let value = data
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32);
        i += 1 + size;

        let tag = prefix >> 4;
        match (prefix >> 2) & 0x03 {
            item_type::MAIN => {
                let kind = match tag {
                    main_tag::INPUT => ReportKind::Input,
                    main_tag::OUTPUT => ReportKind::Output,
                    main_tag::FEATURE => ReportKind::Feature,
                    _ => continue,
                };
                *bits.entry((kind, globals.report_id)).or_default() +=
                    globals.report_size as u64 * globals.report_count as u64;
            }
            item_type::GLOBAL => match tag {
                global_tag::REPORT_SIZE => globals.report_size = value,
                global_tag::REPORT_COUNT => globals.report_count = value,
                global_tag::REPORT_ID => {
                    globals.report_id = value as u8;
                    numbered = true;
                }
                global_tag::PUSH => stack.push(globals),
                global_tag::POP => {
                    if let Some(saved) = stack.pop() {
                        globals = saved;
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    let longest = |kind: ReportKind| -> usize {
        bits.iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, &b)| b.div_ceil(8) as usize)
            .max()
            .unwrap_or(0)
    };

    ReportLengths {
        input: longest(ReportKind::Input),
        output: longest(ReportKind::Output),
        feature: longest(ReportKind::Feature),
        numbered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Boot keyboard: 8-byte input, 1-byte LED output, no report ids
    const BOOT_KEYBOARD: &[u8] = &[
        0x05, 0x01, 0x09, 0x06, 0xA1, 0x01, 0x05, 0x07, 0x19, 0xE0, 0x29, 0xE7, 0x15, 0x00,
        0x25, 0x01, 0x75, 0x01, 0x95, 0x08, 0x81, 0x02, 0x95, 0x01, 0x75, 0x08, 0x81, 0x01,
        0x95, 0x05, 0x75, 0x01, 0x05, 0x08, 0x19, 0x01, 0x29, 0x05, 0x91, 0x02, 0x95, 0x01,
        0x75, 0x03, 0x91, 0x01, 0x95, 0x06, 0x75, 0x08, 0x15, 0x00, 0x25, 0x65, 0x05, 0x07,
        0x19, 0x00, 0x29, 0x65, 0x81, 0x00, 0xC0,
    ];

    #[test]
    fn test_boot_keyboard_lengths() {
        let lengths = scan(BOOT_KEYBOARD);
        assert_eq!(
            lengths,
            ReportLengths {
                input: 8,
                output: 1,
                feature: 0,
                numbered: false,
            }
        );
    }

    #[test]
    fn test_numbered_reports_take_longest() {
        // Vendor page, report 1: 8-byte output; report 2: 32-byte output + 4-byte feature
        let desc = [
            0x06, 0x00, 0xFF, 0x09, 0x01, 0xA1, 0x01, // vendor collection
            0x85, 0x01, 0x75, 0x08, 0x95, 0x08, 0x91, 0x02, // id 1: 8 x 8 bits output
            0x85, 0x02, 0x95, 0x20, 0x91, 0x02, // id 2: 32 x 8 bits output
            0x95, 0x04, 0xB1, 0x02, // id 2: 4 x 8 bits feature
            0xC0,
        ];
        let lengths = scan(&desc);
        assert_eq!(lengths.output, 32);
        assert_eq!(lengths.feature, 4);
        assert_eq!(lengths.input, 0);
        assert!(lengths.numbered);
    }

    #[test]
    fn test_push_pop_restores_globals() {
        let desc = [
            0x75, 0x08, 0x95, 0x02, // size 8, count 2
            0xA4, // push
            0x95, 0x10, 0x81, 0x02, // 16 bytes input
            0xB4, // pop -> count back to 2
            0xB1, 0x02, // 2 bytes feature
        ];
        let lengths = scan(&desc);
        assert_eq!(lengths.input, 16);
        assert_eq!(lengths.feature, 2);
    }

    #[test]
    fn test_partial_bits_round_up_and_truncation_tolerated() {
        let desc = [0x75, 0x01, 0x95, 0x03, 0x81, 0x02, 0x95];
        assert_eq!(scan(&desc).input, 1);
        assert_eq!(scan(&[]), ReportLengths::default());
    }
}
