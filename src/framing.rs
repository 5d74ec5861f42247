//! Frame boundary detection over a raw byte stream.
//!
//! The transport hands us arbitrarily sized chunks; this module buffers them
//! and carves out validated MAVLink frames. Length and CRC checks happen in
//! the `mavlink` parser, so anything yielded here is a complete, checksummed
//! frame. Malformed input never ends the stream: the reader skips the bad
//! start marker and scans for the next one.

use bytes::{Buf, BytesMut};
use mavlink::common::MavMessage;
use mavlink::error::MessageReadError;
use mavlink::peek_reader::PeekReader;
use mavlink::{MavHeader, MavlinkVersion};
use std::io::Cursor;
use tracing::warn;

// MAVLink start markers
const STX_V1: u8 = 0xFE;
const STX_V2: u8 = 0xFD;

// Cap on buffered bytes so a garbage stream cannot grow the buffer unbounded
const MAX_BUFFER_SIZE: usize = 256 * 1024;

/// One validated frame: header fields, the decoded message, and the wire
/// version it arrived in.
pub struct TelemetryFrame {
    pub header: MavHeader,
    pub message: MavMessage,
    pub version: MavlinkVersion,
}

enum ParseAttempt {
    Frame(TelemetryFrame, usize),
    NeedMore,
    Invalid,
}

/// Incremental frame reader. Feed bytes with [`push`](FrameReader::push),
/// drain frames with [`next_frame`](FrameReader::next_frame). State is
/// per-connection; create a fresh reader after a reconnect.
pub struct FrameReader {
    buffer: BytesMut,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Appends freshly read transport bytes.
    pub fn push(&mut self, data: &[u8]) {
        if self.buffer.len() + data.len() > MAX_BUFFER_SIZE {
            warn!(
                buffered = self.buffer.len(),
                "frame buffer exceeded cap, dropping buffered bytes"
            );
            self.buffer.clear();
        }
        self.buffer.extend_from_slice(data);
    }

    /// Returns the next complete frame, or `None` once the buffered bytes
    /// hold no further full frame.
    pub fn next_frame(&mut self) -> Option<TelemetryFrame> {
        loop {
            match self.seek_start_marker() {
                Some(skip) => self.buffer.advance(skip),
                None => {
                    self.buffer.clear();
                    return None;
                }
            }

            match self.try_parse_front() {
                ParseAttempt::Frame(frame, consumed) => {
                    self.buffer.advance(consumed);
                    return Some(frame);
                }
                ParseAttempt::NeedMore => return None,
                ParseAttempt::Invalid => {
                    // Bad length or checksum at this marker. Skip it and
                    // resynchronize on the next one.
                    self.buffer.advance(1);
                }
            }
        }
    }

    /// Offset of the first start marker in the buffer, if any.
    fn seek_start_marker(&self) -> Option<usize> {
        self.buffer
            .iter()
            .position(|&b| b == STX_V2 || b == STX_V1)
    }

    /// Attempts to parse one frame at the front of the buffer, trying the v2
    /// layout first and falling back to v1.
    fn try_parse_front(&self) -> ParseAttempt {
        let mut v2_reader = PeekReader::new(Cursor::new(&self.buffer[..]));

        let v2_err = match mavlink::read_v2_msg::<MavMessage, _>(&mut v2_reader) {
            Ok((header, message)) => {
                return ParseAttempt::Frame(
                    TelemetryFrame {
                        header,
                        message,
                        version: MavlinkVersion::V2,
                    },
                    v2_reader.reader_ref().position() as usize,
                );
            }
            Err(e) => e,
        };

        let mut v1_reader = PeekReader::new(Cursor::new(&self.buffer[..]));
        let v1_err = match mavlink::read_v1_msg::<MavMessage, _>(&mut v1_reader) {
            Ok((header, message)) => {
                return ParseAttempt::Frame(
                    TelemetryFrame {
                        header,
                        message,
                        version: MavlinkVersion::V1,
                    },
                    v1_reader.reader_ref().position() as usize,
                );
            }
            Err(e) => e,
        };

        if is_eof(&v2_err) || is_eof(&v1_err) {
            ParseAttempt::NeedMore
        } else {
            ParseAttempt::Invalid
        }
    }
}

fn is_eof(e: &MessageReadError) -> bool {
    match e {
        MessageReadError::Io(io_err) => io_err.kind() == std::io::ErrorKind::UnexpectedEof,
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use mavlink::common::{MavMessage, HEARTBEAT_DATA};
    use mavlink::Message;

    fn heartbeat_frame(sequence: u8) -> Vec<u8> {
        let header = MavHeader {
            system_id: 1,
            component_id: 1,
            sequence,
        };
        let msg = MavMessage::HEARTBEAT(HEARTBEAT_DATA::default());
        let mut buf = Vec::new();
        mavlink::write_v2_msg(&mut buf, header, &msg).expect("write heartbeat");
        buf
    }

    #[test]
    fn test_partial_frame_waits_for_rest() {
        let mut reader = FrameReader::new();
        let frame = heartbeat_frame(0);

        let split = frame.len() / 2;
        reader.push(&frame[..split]);
        assert!(reader.next_frame().is_none());

        reader.push(&frame[split..]);
        let parsed = reader.next_frame().expect("frame after second half");
        assert_eq!(parsed.message.message_id(), 0);
        assert_eq!(parsed.version, MavlinkVersion::V2);
    }

    #[test]
    fn test_leading_garbage_is_skipped() {
        let mut reader = FrameReader::new();
        let mut bytes = vec![0x00, 0x12, 0x34, 0x56];
        bytes.extend_from_slice(&heartbeat_frame(3));

        reader.push(&bytes);
        let parsed = reader.next_frame().expect("frame after garbage prefix");
        assert_eq!(parsed.header.sequence, 3);
        assert!(reader.next_frame().is_none());
    }

    #[test]
    fn test_corrupted_frame_resynchronizes() {
        let mut reader = FrameReader::new();
        let mut bad = heartbeat_frame(1);
        // Flip a payload byte so the checksum no longer matches
        let idx = bad.len() - 3;
        bad[idx] ^= 0xFF;
        bad.extend_from_slice(&heartbeat_frame(2));

        reader.push(&bad);
        let parsed = reader.next_frame().expect("well-formed frame after corrupt one");
        assert_eq!(parsed.header.sequence, 2);
    }

    #[test]
    fn test_v1_frame_parses() {
        let mut reader = FrameReader::new();
        let header = MavHeader::default();
        let msg = MavMessage::HEARTBEAT(HEARTBEAT_DATA::default());
        let mut buf = Vec::new();
        mavlink::write_v1_msg(&mut buf, header, &msg).expect("write v1 heartbeat");

        reader.push(&buf);
        let parsed = reader.next_frame().expect("v1 frame");
        assert_eq!(parsed.version, MavlinkVersion::V1);
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut reader = FrameReader::new();
        let mut bytes = heartbeat_frame(10);
        bytes.extend_from_slice(&heartbeat_frame(11));
        bytes.extend_from_slice(&heartbeat_frame(12));

        reader.push(&bytes);
        for expected in 10..=12 {
            let parsed = reader.next_frame().expect("queued frame");
            assert_eq!(parsed.header.sequence, expected);
        }
        assert!(reader.next_frame().is_none());
    }
}
