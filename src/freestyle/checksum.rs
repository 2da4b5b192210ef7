//! Additive checksum used by FreeStyle text replies.
//!
//! The checksum is the plain sum of all byte values of a message body,
//! transmitted as eight uppercase hexadecimal digits.

use super::error::{FreestyleError, Result};

/// Sum the byte values of a raw message.
pub fn sum_bytes(message: &[u8]) -> u64 {
    message.iter().map(|&b| u64::from(b)).sum()
}

/// Sum the code points of a decoded message.
///
/// Matches [`sum_bytes`] for ASCII text. Replacement characters left by
/// lossy decoding count with their own code point.
pub fn sum_chars(message: &str) -> u64 {
    message.chars().map(|c| u64::from(u32::from(c))).sum()
}

/// Format a checksum the way the device transmits it.
pub fn to_hex(checksum: u64) -> String {
    format!("{checksum:08X}")
}

/// Compare a raw message against its transmitted checksum.
pub fn verify_bytes(message: &[u8], expected_hex: &str) -> Result<()> {
    compare(parse_expected(expected_hex)?, sum_bytes(message))
}

/// Compare a decoded message against its transmitted checksum.
pub fn verify_text(message: &str, expected_hex: &str) -> Result<()> {
    compare(parse_expected(expected_hex)?, sum_chars(message))
}

fn parse_expected(expected_hex: &str) -> Result<u64> {
    u64::from_str_radix(expected_hex, 16)
        .map_err(|_| FreestyleError::InvalidResponse(format!("Malformed checksum {expected_hex:?}")))
}

fn compare(expected: u64, actual: u64) -> Result<()> {
    if expected != actual {
        return Err(FreestyleError::InvalidChecksum { expected, actual });
    }
    Ok(())
}
