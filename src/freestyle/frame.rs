//! FreeStyle HID frame building and parsing.

use std::io;

use super::error::{FreestyleError, Result};

/// HID report ID, always zero on outbound frames.
pub const REPORT_ID: u8 = 0x00;

/// Size of the length-prefixed command region (1 length byte + payload, zero padded).
pub const COMMAND_REGION: usize = 63;

/// Maximum command payload carried by one frame.
pub const MAX_PAYLOAD: usize = COMMAND_REGION - 1;

/// Total size of every outbound frame: report ID + message type + command region.
pub const FRAME_SIZE: usize = 2 + COMMAND_REGION;

/// Message type used for text commands and their replies.
pub const TEXT_CMD: u8 = 0x60;

/// Message type of the unsolicited `22 01 xx` frames some meters emit.
pub const STRAY_MESSAGE_TYPE: u8 = 0x22;

/// Payload length identifying a stray frame.
pub const STRAY_LENGTH: usize = 1;

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_type: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Whether this is an unsolicited frame that carries no reply content.
    pub fn is_stray(&self) -> bool {
        self.message_type == STRAY_MESSAGE_TYPE && self.payload.len() == STRAY_LENGTH
    }
}

/// Build an outbound frame.
///
/// Frame layout (65 bytes):
/// - Byte 0: report ID (0x00)
/// - Byte 1: message type
/// - Byte 2: payload length
/// - Bytes 3..: payload, zero padded to the end of the frame
pub fn encode(message_type: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FreestyleError::Encoding(format!(
            "Command of {} bytes exceeds frame capacity of {MAX_PAYLOAD} bytes",
            payload.len()
        )));
    }

    let mut frame = Vec::with_capacity(FRAME_SIZE);
    frame.push(REPORT_ID);
    frame.push(message_type);
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);
    frame.resize(FRAME_SIZE, 0);

    Ok(frame)
}

/// Parse an inbound packet.
///
/// Inbound packets carry no report ID: message type at offset 0, length at
/// offset 1, then exactly `length` payload bytes. A packet shorter than its
/// declared length yields whatever payload bytes are present.
pub fn decode(packet: &[u8]) -> Result<Frame> {
    let [message_type, length, rest @ ..] = packet else {
        return Err(FreestyleError::Transport(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("Short packet from device: {} bytes", packet.len()),
        )));
    };

    let end = usize::from(*length).min(rest.len());

    Ok(Frame {
        message_type: *message_type,
        payload: rest[..end].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Strip the report ID so an outbound frame reads like an inbound packet.
    fn as_inbound(frame: &[u8]) -> &[u8] {
        &frame[1..]
    }

    #[test]
    fn test_encode_layout() {
        let frame = encode(TEXT_CMD, b"$swver?").unwrap();
        assert_eq!(frame.len(), FRAME_SIZE);
        assert_eq!(frame[0], REPORT_ID);
        assert_eq!(frame[1], TEXT_CMD);
        assert_eq!(frame[2], 7);
        assert_eq!(&frame[3..10], b"$swver?");
        assert!(frame[10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = encode(0x01, &[]).unwrap();
        assert_eq!(frame.len(), FRAME_SIZE);
        assert_eq!(&frame[..3], &[0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_encode_max_payload() {
        let payload = vec![b'x'; MAX_PAYLOAD];
        let frame = encode(TEXT_CMD, &payload).unwrap();
        assert_eq!(frame.len(), FRAME_SIZE);
        assert_eq!(frame[2] as usize, MAX_PAYLOAD);
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let payload = vec![b'x'; MAX_PAYLOAD + 1];
        let err = encode(TEXT_CMD, &payload).unwrap_err();
        assert!(matches!(err, FreestyleError::Encoding(_)));
    }

    #[test]
    fn test_decode_reverses_encode() {
        for len in [0, 1, 17, MAX_PAYLOAD] {
            let payload: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let frame = encode(0x34, &payload).unwrap();
            let decoded = decode(as_inbound(&frame)).unwrap();
            assert_eq!(decoded.message_type, 0x34);
            assert_eq!(decoded.payload, payload);
        }
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let decoded = decode(&[0x60, 0x02, b'O', b'K', 0xAA, 0xBB]).unwrap();
        assert_eq!(decoded.payload, b"OK");
    }

    #[test]
    fn test_decode_short_packet_is_transport_error() {
        assert!(matches!(decode(&[]), Err(FreestyleError::Transport(_))));
        assert!(matches!(decode(&[0x60]), Err(FreestyleError::Transport(_))));
    }

    #[test]
    fn test_stray_detection() {
        assert!(decode(&[0x22, 0x01, 0x05]).unwrap().is_stray());
        assert!(!decode(&[0x22, 0x02, 0x05, 0x06]).unwrap().is_stray());
        assert!(!decode(&[0x60, 0x01, 0x05]).unwrap().is_stray());
    }
}
