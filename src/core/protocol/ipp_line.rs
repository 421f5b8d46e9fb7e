// src/core/protocol/ipp_line.rs

//! Implements I++ line framing and the `Encoder` / `Decoder` pair used on the
//! connection.
//!
//! Outbound: `<TAG> <COMMAND>\r\n`. Inbound: `<TAG> <KIND><REST>\r\n`, where
//! the tag occupies the first five characters, offset 5 is a space and offset
//! 6 is the response marker.

use super::response::{Response, ResponseKind};
use crate::core::errors::{IppError, Result};
use crate::core::tags::{TAG_WIDTH, Tag};
use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

/// The CRLF sequence that terminates every line in both directions.
const CRLF: &[u8] = b"\r\n";

/// Offset of the response marker: five tag characters plus one space.
const KIND_OFFSET: usize = TAG_WIDTH + 1;

/// Default upper bound on a single inbound line.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// A tagged command ready to be written to the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCommand {
    pub tag: Tag,
    pub command: String,
}

/// Frames the byte stream into lines on the way in and writes tagged
/// commands on the way out.
///
/// The decoder yields raw lines (terminator stripped) rather than parsed
/// responses: a line that fails to parse must not end the stream, so parsing
/// happens in the receive loop where it can be logged and skipped.
#[derive(Debug)]
pub struct IppLineCodec {
    max_line_length: usize,
    /// Where to resume the newline search, so partial reads are not rescanned.
    next_index: usize,
}

impl Default for IppLineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl IppLineCodec {
    pub fn new(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            next_index: 0,
        }
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }
}

impl Decoder for IppLineCodec {
    type Item = String;
    type Error = IppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let newline = src[self.next_index..].iter().position(|b| *b == b'\n');

        match newline {
            Some(offset) => {
                let end = self.next_index + offset;
                self.next_index = 0;
                if end > self.max_line_length + 1 {
                    return Err(IppError::LineTooLong(self.max_line_length));
                }
                let frame = src.split_to(end + 1);
                let mut line = &frame[..end];
                if let Some(stripped) = line.strip_suffix(b"\r") {
                    line = stripped;
                }
                Ok(Some(String::from_utf8_lossy(line).into_owned()))
            }
            None if src.len() > self.max_line_length + 1 => {
                Err(IppError::LineTooLong(self.max_line_length))
            }
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if !src.is_empty() {
            debug!(
                "Discarding {} bytes of unterminated input at end of stream.",
                src.len()
            );
            src.clear();
            self.next_index = 0;
        }
        Ok(None)
    }
}

impl Encoder<OutboundCommand> for IppLineCodec {
    type Error = IppError;

    fn encode(&mut self, item: OutboundCommand, dst: &mut BytesMut) -> Result<()> {
        check_command_text(&item.command)?;
        let tag = item.tag.to_string();
        dst.reserve(tag.len() + 1 + item.command.len() + CRLF.len());
        dst.put_slice(tag.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(item.command.as_bytes());
        dst.put_slice(CRLF);
        Ok(())
    }
}

/// Rejects command text the wire cannot carry: anything but a single ASCII line.
pub fn check_command_text(command: &str) -> Result<()> {
    if !command.is_ascii() || command.bytes().any(|b| b == b'\r' || b == b'\n') {
        return Err(IppError::InvalidCommand(command.to_string()));
    }
    Ok(())
}

/// Encodes a tagged command as `<tag> <command>\r\n`.
pub fn encode_command(tag: Tag, command: &str) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    IppLineCodec::default().encode(
        OutboundCommand {
            tag,
            command: command.to_string(),
        },
        &mut buf,
    )?;
    Ok(buf.freeze())
}

/// Parses an outbound command line back into its tag and command text.
/// A trailing CRLF is accepted and removed.
pub fn decode_command(line: &str) -> Result<(Tag, String)> {
    let line = line.strip_suffix("\r\n").unwrap_or(line);
    let tag = parse_tag_field(line)?;
    match line.as_bytes().get(TAG_WIDTH) {
        Some(b' ') => Ok((tag, line[TAG_WIDTH + 1..].to_string())),
        _ => Err(IppError::MalformedLine(line.to_string())),
    }
}

/// Encodes a server reply as `<tag> <kind><rest>\r\n`.
pub fn encode_response(tag: Tag, kind: ResponseKind, rest: &str) -> Bytes {
    let tag = tag.to_string();
    let mut buf = BytesMut::with_capacity(tag.len() + 2 + rest.len() + CRLF.len());
    buf.put_slice(tag.as_bytes());
    buf.put_u8(b' ');
    buf.put_u8(kind.marker() as u8);
    buf.put_slice(rest.as_bytes());
    buf.put_slice(CRLF);
    buf.freeze()
}

/// Parses one inbound line (terminator already stripped).
pub fn decode_response(line: &str) -> Result<Response> {
    let tag = parse_tag_field(line)?;
    let bytes = line.as_bytes();

    if bytes.get(TAG_WIDTH) != Some(&b' ') {
        return Err(IppError::MalformedLine(line.to_string()));
    }
    let kind = bytes
        .get(KIND_OFFSET)
        .copied()
        .and_then(ResponseKind::from_marker)
        .ok_or_else(|| IppError::MalformedLine(line.to_string()))?;

    Ok(Response {
        tag,
        kind,
        payload: line[KIND_OFFSET + 1..].trim_start().to_string(),
        raw: line.to_string(),
    })
}

fn parse_tag_field(line: &str) -> Result<Tag> {
    let field = line
        .get(..TAG_WIDTH)
        .ok_or_else(|| IppError::MalformedLine(line.to_string()))?;
    field
        .parse::<Tag>()
        .map_err(|_| IppError::MalformedLine(line.to_string()))
}
