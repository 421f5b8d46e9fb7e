// src/core/protocol/response.rs

//! Parsed inbound messages and the structured view of server error payloads.

use crate::core::tags::Tag;

/// The single-character marker that follows the tag on every inbound line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// `&`: the command was accepted and queued.
    Ack,
    /// `%`: the command finished successfully.
    Complete,
    /// `#`: a data line belonging to the command.
    Data,
    /// `!`: the command failed.
    Error,
}

impl ResponseKind {
    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            b'&' => Some(ResponseKind::Ack),
            b'%' => Some(ResponseKind::Complete),
            b'#' => Some(ResponseKind::Data),
            b'!' => Some(ResponseKind::Error),
            _ => None,
        }
    }

    pub fn marker(&self) -> char {
        match self {
            ResponseKind::Ack => '&',
            ResponseKind::Complete => '%',
            ResponseKind::Data => '#',
            ResponseKind::Error => '!',
        }
    }
}

/// One decoded inbound line.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub tag: Tag,
    pub kind: ResponseKind,
    /// Everything after the marker, leading whitespace removed.
    pub payload: String,
    /// The full line as received, CRLF stripped.
    pub raw: String,
}

/// I++ error numbers that the routines in this crate care about.
pub mod error_codes {
    pub const SURFACE_NOT_FOUND: u16 = 1006;
    pub const AIR_PRESSURE_OUT_OF_RANGE: u16 = 1009;
}

/// Structured contents of an `!` payload.
///
/// Servers send either `Error(severity, code, "command", "text")` or the
/// shorter `code: text`. Anything else is kept verbatim in `text`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerError {
    pub severity: Option<u8>,
    pub code: Option<u16>,
    pub command: Option<String>,
    pub text: String,
}

impl ServerError {
    pub fn parse(payload: &str) -> Self {
        let payload = payload.trim();

        if let Some(inner) = payload
            .strip_prefix("Error(")
            .and_then(|s| s.strip_suffix(')'))
            && let Some(parsed) = Self::parse_error_call(inner)
        {
            return parsed;
        }

        if let Some((code, text)) = payload.split_once(':') {
            let code = code.trim();
            if !code.is_empty()
                && code.bytes().all(|b| b.is_ascii_digit())
                && let Ok(code) = code.parse::<u16>()
            {
                return ServerError {
                    code: Some(code),
                    text: text.trim().to_string(),
                    ..Default::default()
                };
            }
        }

        ServerError {
            text: payload.to_string(),
            ..Default::default()
        }
    }

    fn parse_error_call(inner: &str) -> Option<Self> {
        let (severity, rest) = take_field(inner)?;
        let (code, rest) = take_field(rest)?;
        let (command, rest) = take_field(rest)?;
        let text = unquote(rest.trim());

        Some(ServerError {
            severity: severity.parse().ok(),
            code: code.parse().ok(),
            command: Some(command).filter(|c| !c.is_empty()),
            text,
        })
    }

    pub fn is_code(&self, code: u16) -> bool {
        self.code == Some(code)
    }
}

/// Splits off the next comma-separated field, honouring double quotes so a
/// quoted command like `"GoTo(X(1),Y(2))"` stays in one piece.
fn take_field(s: &str) -> Option<(String, &str)> {
    let s = s.trim_start();
    if let Some(quoted) = s.strip_prefix('"') {
        let end = quoted.find('"')?;
        let field = quoted[..end].to_string();
        let rest = quoted[end + 1..].trim_start();
        let rest = rest.strip_prefix(',').unwrap_or(rest);
        Some((field, rest))
    } else {
        let (field, rest) = s.split_once(',')?;
        Some((field.trim().to_string(), rest))
    }
}

fn unquote(s: &str) -> String {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
        .to_string()
}
