// src/core/errors.rs

//! Defines the primary error type for the protocol engine.

use crate::core::protocol::ServerError;
use crate::core::tags::Tag;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IppError>;

/// A command that ended in the `Error` state, together with everything the
/// server told us about it.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandError {
    pub tag: Tag,
    pub command: String,
    /// The raw `!` lines received for this transaction, in arrival order.
    pub lines: Vec<String>,
    /// The structured form of the first error line.
    pub server: ServerError,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}' failed: {}", self.tag, self.command, self.lines.join(" | "))
    }
}

/// The main error enum.
///
/// Variants split into two families: command-level failures reported by the
/// server (the connection stays usable), and connection-fatal failures after
/// which the caller should reconnect. See [`IppError::is_connection_fatal`].
#[derive(Error, Debug)]
pub enum IppError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Connection to {addr} failed: {reason}")]
    Connect { addr: String, reason: String },

    #[error("Connection to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("Write of {tag} did not complete within {timeout:?}")]
    SendTimeout { tag: Tag, timeout: Duration },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Not connected")]
    NotConnected,

    #[error("Inbound line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("Malformed line: {0:?}")]
    MalformedLine(String),

    #[error("Command text is not a single ASCII line: {0:?}")]
    InvalidCommand(String),

    #[error("Invalid tag: {0:?}")]
    InvalidTag(String),

    #[error("Tag {0} is still in use by an unfinished command")]
    TagInUse(Tag),

    #[error("Command error: {0}")]
    Command(Box<CommandError>),

    #[error("{0} was discarded before it finished")]
    Abandoned(Tag),

    #[error("{0} completed without an error")]
    CompletedWithoutError(Tag),

    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IppError {
    /// Returns true for failures after which the connection must not be reused.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            IppError::Io(_)
                | IppError::Connect { .. }
                | IppError::ConnectTimeout { .. }
                | IppError::SendTimeout { .. }
                | IppError::ConnectionClosed
                | IppError::NotConnected
                | IppError::LineTooLong(_)
        )
    }

    /// Returns the server-side error details when this is a command failure.
    pub fn command_error(&self) -> Option<&CommandError> {
        match self {
            IppError::Command(e) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn connect(addr: &str, e: std::io::Error) -> Self {
        IppError::Connect {
            addr: addr.to_string(),
            reason: e.to_string(),
        }
    }
}

// `std::io::Error` is not cloneable, so it lives behind an Arc. A single
// failure is fanned out to every pending awaiter.
impl Clone for IppError {
    fn clone(&self) -> Self {
        match self {
            IppError::Io(e) => IppError::Io(Arc::clone(e)),
            IppError::Connect { addr, reason } => IppError::Connect {
                addr: addr.clone(),
                reason: reason.clone(),
            },
            IppError::ConnectTimeout { addr, timeout } => IppError::ConnectTimeout {
                addr: addr.clone(),
                timeout: *timeout,
            },
            IppError::SendTimeout { tag, timeout } => IppError::SendTimeout {
                tag: *tag,
                timeout: *timeout,
            },
            IppError::ConnectionClosed => IppError::ConnectionClosed,
            IppError::NotConnected => IppError::NotConnected,
            IppError::LineTooLong(n) => IppError::LineTooLong(*n),
            IppError::MalformedLine(s) => IppError::MalformedLine(s.clone()),
            IppError::InvalidCommand(s) => IppError::InvalidCommand(s.clone()),
            IppError::InvalidTag(s) => IppError::InvalidTag(s.clone()),
            IppError::TagInUse(t) => IppError::TagInUse(*t),
            IppError::Command(e) => IppError::Command(e.clone()),
            IppError::Abandoned(t) => IppError::Abandoned(*t),
            IppError::CompletedWithoutError(t) => IppError::CompletedWithoutError(*t),
            IppError::UnexpectedReply(s) => IppError::UnexpectedReply(s.clone()),
            IppError::Config(s) => IppError::Config(s.clone()),
        }
    }
}

impl PartialEq for IppError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (IppError::Io(e1), IppError::Io(e2)) => e1.kind() == e2.kind(),
            (IppError::MalformedLine(s1), IppError::MalformedLine(s2)) => s1 == s2,
            (IppError::InvalidCommand(s1), IppError::InvalidCommand(s2)) => s1 == s2,
            (IppError::InvalidTag(s1), IppError::InvalidTag(s2)) => s1 == s2,
            (IppError::TagInUse(t1), IppError::TagInUse(t2)) => t1 == t2,
            (IppError::Command(e1), IppError::Command(e2)) => e1 == e2,
            (IppError::Abandoned(t1), IppError::Abandoned(t2)) => t1 == t2,
            (IppError::CompletedWithoutError(t1), IppError::CompletedWithoutError(t2)) => {
                t1 == t2
            }
            (IppError::SendTimeout { tag: t1, .. }, IppError::SendTimeout { tag: t2, .. }) => {
                t1 == t2
            }
            (IppError::LineTooLong(n1), IppError::LineTooLong(n2)) => n1 == n2,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl From<std::io::Error> for IppError {
    fn from(e: std::io::Error) -> Self {
        IppError::Io(Arc::new(e))
    }
}

impl From<CommandError> for IppError {
    fn from(e: CommandError) -> Self {
        IppError::Command(Box::new(e))
    }
}
