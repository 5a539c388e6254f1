//! Newline-delimited JSON framing.
//!
//! One JSON document per line. Serialized JSON never contains a raw
//! newline, so no escaping is needed. Decoding is built on
//! [`LinesCodec`] with a maximum line length; malformed frames are surfaced
//! as [`Frame`] variants instead of errors so one bad frame never ends the
//! stream.

use std::io;

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

/// Default maximum request frame, in bytes.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// One decoded frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A complete, non-blank, UTF-8 line with the terminator stripped.
    Line(String),
    /// A line longer than the limit; its bytes were discarded.
    Oversized,
    /// A line that was not valid UTF-8; its bytes were discarded.
    NotUtf8,
}

/// Transport-level framing failure.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Socket read or write failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// Outbound value could not be serialized.
    #[error("failed to serialize frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Codec for newline-delimited JSON frames.
#[derive(Clone, Debug)]
pub struct JsonLinesCodec {
    lines: LinesCodec,
    max_length: usize,
}

impl JsonLinesCodec {
    /// Codec accepting inbound lines of at most `max_length` bytes.
    pub fn new_with_max_length(max_length: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_length),
            max_length,
        }
    }

    /// Configured inbound limit.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn classify(
        result: Result<Option<String>, LinesCodecError>,
    ) -> Result<Option<Frame>, FrameError> {
        match result {
            Ok(Some(line)) => Ok(Some(Frame::Line(line))),
            Ok(None) => Ok(None),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Frame::Oversized)),
            Err(LinesCodecError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
                Ok(Some(Frame::NotUtf8))
            }
            Err(LinesCodecError::Io(e)) => Err(FrameError::Io(e)),
        }
    }
}

impl Default for JsonLinesCodec {
    fn default() -> Self {
        Self::new_with_max_length(DEFAULT_MAX_FRAME_BYTES)
    }
}

fn is_blank(frame: &Option<Frame>) -> bool {
    matches!(frame, Some(Frame::Line(line)) if line.trim().is_empty())
}

impl Decoder for JsonLinesCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        loop {
            let frame = Self::classify(self.lines.decode(buf))?;
            if !is_blank(&frame) {
                return Ok(frame);
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        // An unterminated payload before EOF still counts as a frame.
        loop {
            let frame = Self::classify(self.lines.decode_eof(buf))?;
            if !is_blank(&frame) {
                return Ok(frame);
            }
        }
    }
}

impl<T: Serialize + ?Sized> Encoder<&T> for JsonLinesCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &T, dst: &mut BytesMut) -> Result<(), FrameError> {
        let json = serde_json::to_vec(item)?;
        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_all(codec: &mut JsonLinesCodec, buf: &mut BytesMut) -> Vec<Frame> {
        let mut out = Vec::new();
        while let Some(frame) = codec.decode(buf).unwrap() {
            out.push(frame);
        }
        out
    }

    #[test]
    fn splits_lines() {
        let mut codec = JsonLinesCodec::default();
        let mut buf = BytesMut::from(&b"{\"a\":1}\n{\"b\":2}\r\n{\"c\""[..]);
        assert_eq!(
            decode_all(&mut codec, &mut buf),
            vec![
                Frame::Line("{\"a\":1}".into()),
                Frame::Line("{\"b\":2}".into())
            ]
        );
        assert_eq!(&buf[..], b"{\"c\"");
    }

    #[test]
    fn waits_for_terminator() {
        let mut codec = JsonLinesCodec::default();
        let mut buf = BytesMut::from(&b"{\"command\":"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"\"ping\"}\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Frame::Line("{\"command\":\"ping\"}".into()))
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut codec = JsonLinesCodec::default();
        let mut buf = BytesMut::from(&b"\n  \r\n\t\n{}\n"[..]);
        assert_eq!(decode_all(&mut codec, &mut buf), vec![Frame::Line("{}".into())]);
    }

    #[test]
    fn oversized_line_is_reported_once_then_skipped() {
        let mut codec = JsonLinesCodec::new_with_max_length(8);
        let mut buf = BytesMut::from(&b"0123456789abcdef\n{}\n"[..]);
        assert_eq!(
            decode_all(&mut codec, &mut buf),
            vec![Frame::Oversized, Frame::Line("{}".into())]
        );
    }

    #[test]
    fn oversized_line_split_across_reads() {
        let mut codec = JsonLinesCodec::new_with_max_length(8);
        let mut buf = BytesMut::from(&b"0123456789"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::Oversized));
        buf.extend_from_slice(b"more-garbage");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"tail\n{}\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::Line("{}".into())));
    }

    #[test]
    fn invalid_utf8_is_reported_and_skipped() {
        let mut codec = JsonLinesCodec::default();
        let mut buf = BytesMut::from(&b"\xff\xfe\n{}\n"[..]);
        assert_eq!(
            decode_all(&mut codec, &mut buf),
            vec![Frame::NotUtf8, Frame::Line("{}".into())]
        );
    }

    #[test]
    fn unterminated_payload_at_eof() {
        let mut codec = JsonLinesCodec::default();
        let mut buf = BytesMut::from(&b"{\"command\":\"ping\"}"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(
            codec.decode_eof(&mut buf).unwrap(),
            Some(Frame::Line("{\"command\":\"ping\"}".into()))
        );
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn encode_appends_newline() {
        let mut codec = JsonLinesCodec::default();
        let mut buf = BytesMut::new();
        codec
            .encode(&json!({"success": true, "text": "a\nb"}), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"{\"success\":true,\"text\":\"a\\nb\"}\n");
        assert_eq!(buf.iter().filter(|&&b| b == b'\n').count(), 1);
    }
}
