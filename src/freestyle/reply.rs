//! Text reply parsing.
//!
//! A complete text reply looks like:
//!
//! ```text
//! <message>CKSM:XXXXXXXX\r\n
//! CMD OK\r\n            (or "CMD Fail!\r\n")
//! ```
//!
//! Multi-record messages additionally end in a `<count>,<checksum>\r\n`
//! footer line. Both structures are scanned from the end with fixed
//! delimiters, so each malformed field is reported on its own.

use super::error::{FreestyleError, Result};

/// Marker preceding the reply checksum.
pub const CHECKSUM_MARKER: &[u8] = b"CKSM:";

/// Line terminator used throughout replies.
pub const LINE_END: &str = "\r\n";

/// Number of hex digits in a transmitted checksum.
pub const CHECKSUM_DIGITS: usize = 8;

/// Status signature of a successful command.
pub const STATUS_OK: &[u8] = b"CMD OK";

/// Status signature of a failed command.
pub const STATUS_FAIL: &[u8] = b"CMD Fail!";

/// Multi-record message sent instead of records when the log has no entries.
pub const LOG_EMPTY: &str = "Log Empty\r\n";

/// Character substituted for bytes that are not ASCII.
pub const PLACEHOLDER: char = char::REPLACEMENT_CHARACTER;

/// Device-reported command status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Fail,
}

/// Parsed text reply.
#[derive(Debug, PartialEq, Eq)]
pub struct Envelope<'a> {
    /// Message body, including its trailing line terminator if any.
    pub message: &'a [u8],
    /// Eight uppercase hex digits.
    pub checksum: &'a str,
    pub status: Status,
}

/// Parsed multi-record message.
#[derive(Debug, PartialEq, Eq)]
pub struct Footer<'a> {
    /// Record lines, ending in a line terminator.
    pub records: &'a str,
    /// Record count announced by the device.
    pub count: usize,
    pub checksum: &'a str,
}

/// How reply bytes are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsciiDecoding {
    /// Fail on the first non-ASCII byte.
    Strict,
    /// Replace every non-ASCII byte with [`PLACEHOLDER`].
    BestEffort,
}

/// Whether the buffer ends in a checksum line followed by a status line.
///
/// Only the tail is inspected, so a status signature inside the message, or
/// a frame boundary inside the final line, does not end reassembly early.
/// The checksum digits are not validated here; [`parse_envelope`] reports
/// malformed ones.
pub fn is_complete(buffer: &[u8]) -> bool {
    let Some(rest) = strip_line(buffer, STATUS_OK).or_else(|| strip_line(buffer, STATUS_FAIL)) else {
        return false;
    };
    let Some(rest) = rest.strip_suffix(LINE_END.as_bytes()) else {
        return false;
    };
    rest.len()
        .checked_sub(CHECKSUM_MARKER.len() + CHECKSUM_DIGITS)
        .is_some_and(|at| rest[at..].starts_with(CHECKSUM_MARKER))
}

/// Split a complete reply into message, checksum and status.
pub fn parse_envelope(buffer: &[u8]) -> Result<Envelope<'_>> {
    let (rest, status) = if let Some(rest) = strip_line(buffer, STATUS_OK) {
        (rest, Status::Ok)
    } else if let Some(rest) = strip_line(buffer, STATUS_FAIL) {
        (rest, Status::Fail)
    } else {
        return Err(invalid("reply does not end in a status line", buffer));
    };

    let rest = rest
        .strip_suffix(LINE_END.as_bytes())
        .ok_or_else(|| invalid("checksum line is not terminated", buffer))?;

    let digits_at = rest
        .len()
        .checked_sub(CHECKSUM_DIGITS)
        .ok_or_else(|| invalid("reply too short for a checksum", buffer))?;
    let (head, digits) = rest.split_at(digits_at);

    let checksum = hex_digits(digits).ok_or_else(|| invalid("malformed checksum", buffer))?;
    let message = head
        .strip_suffix(CHECKSUM_MARKER)
        .ok_or_else(|| invalid("checksum marker missing", buffer))?;

    Ok(Envelope {
        message,
        checksum,
        status,
    })
}

/// Split a multi-record message into record lines, count and checksum.
///
/// The checksum field may carry a `CKSM:` prefix.
pub fn parse_footer(text: &str) -> Result<Footer<'_>> {
    let invalid = |reason: &str| FreestyleError::InvalidResponse(format!("{reason}: {text:?}"));

    let rest = text
        .strip_suffix(LINE_END)
        .ok_or_else(|| invalid("footer is not terminated"))?;
    let split = rest
        .rfind(LINE_END)
        .ok_or_else(|| invalid("no records before footer"))?;
    let (records, footer) = rest.split_at(split + LINE_END.len());

    if records.len() <= LINE_END.len() {
        return Err(invalid("empty record body"));
    }

    let (count, checksum) = footer
        .split_once(',')
        .ok_or_else(|| invalid("footer has no count separator"))?;

    if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("malformed record count"));
    }
    let count = count.parse().map_err(|_| invalid("record count out of range"))?;

    let checksum = checksum.strip_prefix("CKSM:").unwrap_or(checksum);
    let checksum = hex_digits(checksum.as_bytes()).ok_or_else(|| invalid("malformed checksum"))?;

    Ok(Footer {
        records,
        count,
        checksum,
    })
}

/// Decode reply bytes as ASCII text.
pub fn decode_ascii(bytes: &[u8], mode: AsciiDecoding) -> Result<String> {
    match mode {
        AsciiDecoding::Strict => match bytes.iter().position(|b| !b.is_ascii()) {
            Some(position) => Err(FreestyleError::Decoding {
                position,
                byte: bytes[position],
            }),
            None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        },
        AsciiDecoding::BestEffort => Ok(bytes
            .iter()
            .map(|&b| if b.is_ascii() { char::from(b) } else { PLACEHOLDER })
            .collect()),
    }
}

fn strip_line<'a>(buffer: &'a [u8], status: &[u8]) -> Option<&'a [u8]> {
    buffer
        .strip_suffix(LINE_END.as_bytes())?
        .strip_suffix(status)
}

fn hex_digits(digits: &[u8]) -> Option<&str> {
    let valid = digits.len() == CHECKSUM_DIGITS
        && digits
            .iter()
            .all(|&b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b));
    if !valid {
        return None;
    }
    std::str::from_utf8(digits).ok()
}

fn invalid(reason: &str, buffer: &[u8]) -> FreestyleError {
    FreestyleError::InvalidResponse(format!("{reason}: {:?}", String::from_utf8_lossy(buffer)))
}
