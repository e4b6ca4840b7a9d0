//! Hex text codec for report payloads
//!
//! Payloads are edited as free-form hex (`AA BB-CC`, `aabbcc`) and printed as
//! uppercase pairs.

use std::fmt::Write;

use thiserror::Error;

/// Payload text that is not a whole number of hex bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    #[error("Malformed hex: odd number of digits ({0})")]
    OddLength(usize),

    #[error("Malformed hex: invalid character '{ch}' at position {pos}")]
    InvalidChar { ch: char, pos: usize },
}

/// Encode bytes as uppercase hex pairs joined by `separator`
pub fn encode(bytes: &[u8], separator: &str) -> String {
    let mut out = String::with_capacity(bytes.len() * (2 + separator.len()));
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        let _ = write!(out, "{b:02X}");
    }
    out
}

/// Decode hex text, ignoring whitespace and `-` separators
///
/// Fails on any other non-hex character and on an odd digit count; a trailing
/// nibble is never dropped.
pub fn decode(text: &str) -> Result<Vec<u8>, HexError> {
    let mut digits = Vec::with_capacity(text.len());
    for (pos, ch) in text.trim().chars().enumerate() {
        if ch == '-' || ch.is_whitespace() {
            continue;
        }
        match ch.to_digit(16) {
            Some(d) => digits.push(d as u8),
            None => return Err(HexError::InvalidChar { ch, pos }),
        }
    }

    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }

    Ok(digits.chunks(2).map(|p| (p[0] << 4) | p[1]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode(&[0xAA, 0x0B, 0x00], ""), "AA0B00");
        assert_eq!(encode(&[0xAA, 0x0B, 0x00], "-"), "AA-0B-00");
        assert_eq!(encode(&[], " "), "");
    }

    #[test]
    fn test_decode_separators() {
        assert_eq!(decode("AA-BB-CC").unwrap(), vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(decode(" aa bb\tcc ").unwrap(), vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert_eq!(decode("ABC"), Err(HexError::OddLength(3)));
        assert_eq!(decode("A-B-C"), Err(HexError::OddLength(3)));
    }

    #[test]
    fn test_decode_rejects_non_hex() {
        assert_eq!(
            decode("AG"),
            Err(HexError::InvalidChar { ch: 'G', pos: 1 })
        );
        assert!(decode("0x01").is_err());
    }

    #[test]
    fn test_round_trip_all_bytes() {
        let bytes: Vec<u8> = (0..=255).collect();
        for sep in ["", "-", " "] {
            let text = encode(&bytes, sep);
            assert!(text
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c) || sep.contains(c)));
            assert_eq!(decode(&text).unwrap(), bytes);
        }
    }
}
