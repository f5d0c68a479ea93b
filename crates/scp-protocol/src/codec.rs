//! Tokio codec for SCP records
//!
//! Decodes what a sending peer writes ahead of file content (control lines
//! and status records) and encodes what this side writes.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::ack::{Response, Terminator, ACK, FATAL, WARNING};
use crate::control::{ControlLine, CONTROL_MARKER, MAX_CONTROL_LINE};
use crate::error::ProtocolError;

/// One decoded record from the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// File announcement
    Control(ControlLine),
    /// Status byte, with message for warnings/errors
    Response(Response),
}

/// Codec for the textual part of the SCP exchange
#[derive(Debug, Default)]
pub struct ControlLineCodec {
    /// How far the buffer has already been scanned for a newline
    scanned: usize,
}

impl ControlLineCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self { scanned: 0 }
    }
}

/// Turn one complete text line into a record, dispatching on its first byte
fn decode_line(marker: u8, line: &[u8]) -> Result<Record, ProtocolError> {
    match marker {
        CONTROL_MARKER => {
            let text = std::str::from_utf8(line).map_err(|_| {
                ProtocolError::MalformedControlLine(String::from_utf8_lossy(line).into_owned())
            })?;
            Ok(Record::Control(ControlLine::parse(text)?))
        }
        WARNING | FATAL => {
            let message = String::from_utf8_lossy(&line[1..])
                .trim_end_matches('\n')
                .to_string();
            if marker == FATAL {
                Ok(Record::Response(Response::Fatal(message)))
            } else {
                Ok(Record::Response(Response::Warning(message)))
            }
        }
        other => Err(ProtocolError::UnsupportedRecord(other as char)),
    }
}

impl Decoder for ControlLineCodec {
    type Item = Record;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(&marker) = src.first() else {
            return Ok(None);
        };

        match marker {
            ACK => {
                src.advance(1);
                self.scanned = 0;
                Ok(Some(Record::Response(Response::Ok)))
            }
            CONTROL_MARKER | WARNING | FATAL | b'D' | b'E' | b'T' => {
                let start = self.scanned.min(src.len());
                let newline = src[start..].iter().position(|b| *b == b'\n');
                let Some(offset) = newline else {
                    if src.len() > MAX_CONTROL_LINE {
                        return Err(ProtocolError::ControlLineTooLong {
                            max: MAX_CONTROL_LINE,
                        });
                    }
                    // Need more data
                    self.scanned = src.len();
                    return Ok(None);
                };

                let line_len = start + offset + 1;
                if line_len > MAX_CONTROL_LINE {
                    return Err(ProtocolError::ControlLineTooLong {
                        max: MAX_CONTROL_LINE,
                    });
                }

                self.scanned = 0;
                let line = src.split_to(line_len);
                decode_line(marker, &line).map(Some)
            }
            other => Err(ProtocolError::UnexpectedByte(other)),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(record) = self.decode(src)? {
            return Ok(Some(record));
        }
        if src.is_empty() {
            return Ok(None);
        }

        // Peer closed without a newline; take what is there as the last line
        let marker = src[0];
        let line = src.split_to(src.len());
        self.scanned = 0;
        decode_line(marker, &line).map(Some)
    }
}

impl Encoder<ControlLine> for ControlLineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: ControlLine, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let text = line.to_line();
        dst.reserve(text.len());
        dst.extend_from_slice(text.as_bytes());
        Ok(())
    }
}

impl Encoder<Terminator> for ControlLineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, terminator: Terminator, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(terminator.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::FileMode;
    use futures::StreamExt;
    use tokio_util::codec::FramedRead;

    #[test]
    fn test_decode_control_line() {
        let mut codec = ControlLineCodec::new();
        let mut buf = BytesMut::from(&b"C0644 5 hello.txt\nhello"[..]);

        let record = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(
            record,
            Record::Control(ControlLine::new(FileMode(0o644), 5, "hello.txt"))
        );
        // Content stays in the buffer untouched
        assert_eq!(&buf[..], b"hello");
    }

    #[test]
    fn test_decode_partial_line() {
        let mut codec = ControlLineCodec::new();
        let mut buf = BytesMut::from(&b"C0644 12"[..]);

        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"3 data.bin\n");
        let record = codec.decode(&mut buf).unwrap().unwrap();
        match record {
            Record::Control(line) => {
                assert_eq!(line.size, 123);
                assert_eq!(line.file_name, "data.bin");
            }
            other => panic!("Expected control line, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_responses() {
        let mut codec = ControlLineCodec::new();
        let mut buf = BytesMut::from(&b"\0\x02scp: x: No such file or directory\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Record::Response(Response::Ok))
        );
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Record::Response(Response::Fatal(
                "scp: x: No such file or directory".to_string()
            )))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_unsupported_records() {
        let mut codec = ControlLineCodec::new();
        let mut buf = BytesMut::from(&b"D0755 0 dir\n"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::UnsupportedRecord('D'))
        ));

        let mut buf = BytesMut::from(&b"?"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::UnexpectedByte(b'?'))
        ));
    }

    #[test]
    fn test_decode_too_long() {
        let mut codec = ControlLineCodec::new();
        let mut raw = b"C0644 1 ".to_vec();
        raw.extend(std::iter::repeat(b'a').take(MAX_CONTROL_LINE + 1));
        let mut buf = BytesMut::from(&raw[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::ControlLineTooLong { .. })
        ));
    }

    #[test]
    fn test_decode_eof_without_newline() {
        let mut codec = ControlLineCodec::new();
        let mut buf = BytesMut::from(&b"C0644 3 abc"[..]);
        let record = codec.decode_eof(&mut buf).unwrap().unwrap();
        assert_eq!(
            record,
            Record::Control(ControlLine::new(FileMode(0o644), 3, "abc"))
        );
    }

    #[test]
    fn test_encode() {
        let mut codec = ControlLineCodec::new();
        let mut buf = BytesMut::new();

        codec
            .encode(ControlLine::new(FileMode(0o644), 0, "empty"), &mut buf)
            .unwrap();
        codec.encode(Terminator::Line, &mut buf).unwrap();

        assert_eq!(&buf[..], b"C0644 0 empty\n\0\n");
    }

    #[tokio::test]
    async fn test_framed_read_leaves_content() {
        let input: &[u8] = b"C0600 4 key\nDATA";
        let mut framed = FramedRead::new(input, ControlLineCodec::new());

        let record = framed.next().await.unwrap().unwrap();
        assert!(matches!(record, Record::Control(ref l) if l.size == 4));

        let parts = framed.into_parts();
        let mut rest = parts.read_buf.to_vec();
        rest.extend_from_slice(parts.io);
        assert_eq!(rest, b"DATA");
    }
}
