//! FreeStyle HID device session.

use std::io;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use tracing::{debug, info, warn};

use super::checksum;
use super::error::{FreestyleError, Result};
use super::frame::{self, Frame, TEXT_CMD};
use super::records::MultiRecords;
use super::reply::{self, AsciiDecoding, LOG_EMPTY, Status};
use super::transport::Transport;

/// Initialization messages sent on connect.
pub const INIT_SEQUENCE: &[u8] = &[0x01];

/// Default number of consecutive stray frames tolerated while waiting for a reply.
pub const DEFAULT_MAX_STRAY_FRAMES: usize = 64;

/// Per-device protocol parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolOptions {
    /// Message type of outbound text commands.
    pub text_cmd: u8,
    /// Message type expected on text replies.
    pub text_reply_cmd: u8,
    /// Message types sent, with empty payloads, when connecting.
    pub init_sequence: Vec<u8>,
    /// Consecutive stray frames tolerated per read; one more fails the read.
    pub max_stray_frames: usize,
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        Self {
            text_cmd: TEXT_CMD,
            text_reply_cmd: TEXT_CMD,
            init_sequence: INIT_SEQUENCE.to_vec(),
            max_stray_frames: DEFAULT_MAX_STRAY_FRAMES,
        }
    }
}

/// Session with a meter speaking the shared FreeStyle HID protocol.
///
/// All operations block until the transport answers. Commands must not be
/// interleaved: each exchange drains its whole reply before returning.
pub struct FreestyleDevice<T: Transport> {
    transport: T,
    options: ProtocolOptions,
}

impl<T: Transport> FreestyleDevice<T> {
    /// Wrap a transport using the default protocol parameters.
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, ProtocolOptions::default())
    }

    pub fn with_options(transport: T, options: ProtocolOptions) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &ProtocolOptions {
        &self.options
    }

    /// Give the transport back to the caller.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Run the initialization sequence.
    ///
    /// Replies are discarded: the serial number some meters return here does
    /// not always match the real one.
    pub fn connect(&mut self) -> Result<()> {
        info!("Initializing FreeStyle HID session");
        for message_type in self.options.init_sequence.clone() {
            self.send_command(message_type, &[])?;
            let reply = self.read_response()?;
            debug!("Discarding init reply: type {:#04x}", reply.message_type);
        }
        info!("FreeStyle HID session ready");
        Ok(())
    }

    /// Nothing to do on the wire.
    pub fn disconnect(&mut self) {
        debug!("Disconnecting from FreeStyle device");
    }

    /// Send one raw frame.
    pub fn send_command(&mut self, message_type: u8, command: &[u8]) -> Result<()> {
        let packet = frame::encode(message_type, command)?;
        debug!("Sending packet: {:02X?}", packet);
        self.transport.write(&packet)?;
        Ok(())
    }

    /// Read the next meaningful frame, skipping stray `22 01 xx` frames.
    pub fn read_response(&mut self) -> Result<Frame> {
        for _ in 0..=self.options.max_stray_frames {
            let packet = self.transport.read()?;
            debug!("Read packet: {:02X?}", packet);

            let frame = frame::decode(&packet)?;
            if !frame.is_stray() {
                return Ok(frame);
            }
            debug!("Skipping stray frame: {:02X?}", frame.payload);
        }

        warn!(
            "More than {} consecutive stray frames tolerated, giving up",
            self.options.max_stray_frames
        );
        Err(FreestyleError::Transport(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("No reply within {} tolerated stray frames", self.options.max_stray_frames),
        )))
    }

    /// Send a text command and return the validated reply text.
    ///
    /// The reply may span several frames. Non-ASCII bytes (typically in the
    /// patient name) are replaced rather than rejected. Trailing line
    /// terminators are kept.
    pub fn send_text_command(&mut self, command: &[u8]) -> Result<String> {
        self.send_command(self.options.text_cmd, command)?;

        let mut full_content = Vec::new();
        loop {
            let Frame { message_type, payload } = self.read_response()?;
            debug!("Received message: type {message_type:#04x} content {payload:02X?}");

            if message_type != self.options.text_reply_cmd {
                return Err(FreestyleError::UnexpectedMessageType {
                    expected: self.options.text_reply_cmd,
                    actual: message_type,
                    content: payload,
                });
            }

            full_content.extend_from_slice(&payload);
            if reply::is_complete(&full_content) {
                break;
            }
        }

        let envelope = reply::parse_envelope(&full_content)?;
        checksum::verify_bytes(envelope.message, envelope.checksum)?;

        if envelope.status == Status::Fail {
            let detail = reply::decode_ascii(envelope.message, AsciiDecoding::BestEffort)?;
            return Err(FreestyleError::InvalidResponse(if detail.is_empty() {
                "Command failed".to_string()
            } else {
                detail
            }));
        }

        if !envelope.message.is_ascii() {
            warn!("Reply contains non-ASCII bytes, substituting placeholders");
        }
        reply::decode_ascii(envelope.message, AsciiDecoding::BestEffort)
    }

    /// Query a multi-record table (readings, events, history).
    pub fn multirecord(&mut self, command: &[u8]) -> Result<MultiRecords> {
        let message = self.send_text_command(command)?;
        debug!("Received multi-record message:\n{message}");

        if message == LOG_EMPTY {
            return Ok(MultiRecords::empty());
        }

        let footer = reply::parse_footer(&message)?;
        checksum::verify_text(footer.records, footer.checksum)?;

        let lines = footer.records.split(reply::LINE_END).filter(|l| !l.is_empty()).count();
        if lines != footer.count {
            warn!("Device announced {} records but sent {lines}", footer.count);
        }

        Ok(MultiRecords::new(footer.records.to_string(), footer.count))
    }

    /// Firmware version string.
    pub fn version(&mut self) -> Result<String> {
        self.query_line(b"$swver?")
    }

    pub fn serial_number(&mut self) -> Result<String> {
        self.query_line(b"$serlnum?")
    }

    /// Patient name stored on the meter, `None` if unset.
    pub fn patient_name(&mut self) -> Result<Option<String>> {
        let name = self.query_line(b"$ptname?")?;
        Ok((!name.is_empty()).then_some(name))
    }

    /// Store a patient name. Only ASCII names are accepted.
    pub fn set_patient_name(&mut self, name: &str) -> Result<()> {
        if !name.is_ascii() {
            return Err(FreestyleError::Encoding(
                "Only ASCII-safe names are supported".to_string(),
            ));
        }
        let mut command = b"$ptname,".to_vec();
        command.extend_from_slice(name.as_bytes());
        self.send_text_command(&command)?;
        Ok(())
    }

    /// Read the meter clock.
    pub fn datetime(&mut self) -> Result<NaiveDateTime> {
        let date = self.query_line(b"$date?")?;
        let time = self.query_line(b"$time?")?;

        let [month, day, year] = parse_fields::<3>(&date)?;
        let [hour, minute] = parse_fields::<2>(&time)?;

        // Year is an offset from 2000. A meter with a dead RTC reports 255
        // for every field.
        i32::try_from(year)
            .ok()
            .and_then(|year| year.checked_add(2000))
            .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .ok_or(FreestyleError::InvalidDateTime)
    }

    /// Set the meter clock and return the value read back.
    pub fn set_datetime(&mut self, datetime: NaiveDateTime) -> Result<NaiveDateTime> {
        let year = datetime.year() - 2000;
        if year < 0 {
            return Err(FreestyleError::Encoding(format!(
                "Year {} predates the device epoch",
                datetime.year()
            )));
        }

        // No leading zeros, so strftime does not fit.
        let date_cmd = format!("$date,{},{},{year}", datetime.month(), datetime.day());
        let time_cmd = format!("$time,{},{}", datetime.hour(), datetime.minute());

        self.send_text_command(date_cmd.as_bytes())?;
        self.send_text_command(time_cmd.as_bytes())?;

        self.datetime()
    }

    /// Set the meter clock to the local time at the moment of the call.
    pub fn set_datetime_now(&mut self) -> Result<NaiveDateTime> {
        self.set_datetime(Local::now().naive_local())
    }

    /// Abbott meters do not allow clearing their memory.
    pub fn zero_log(&mut self) -> Result<()> {
        Err(FreestyleError::NotSupported("erasing the meter log"))
    }

    fn query_line(&mut self, command: &[u8]) -> Result<String> {
        let reply = self.send_text_command(command)?;
        Ok(reply.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Convert a raw ketone reading to mmol/L.
///
/// Meters use the blood glucose factor here, not a real mg/dL conversion.
pub fn convert_ketone_unit(raw_value: f64) -> f64 {
    raw_value / 18.0
}

fn parse_fields<const N: usize>(line: &str) -> Result<[u32; N]> {
    let invalid = || FreestyleError::InvalidResponse(format!("Unexpected clock value {line:?}"));

    let values = line
        .split(',')
        .map(|field| field.trim().parse::<u32>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>>>()?;

    values.try_into().map_err(|_| invalid())
}
