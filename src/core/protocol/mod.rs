// src/core/protocol/mod.rs

//! The I++ wire format: line framing, tagged commands and typed replies.

pub mod ipp_line;
pub mod response;

pub use ipp_line::{
    IppLineCodec, OutboundCommand, check_command_text, decode_command, decode_response,
    encode_command, encode_response,
};
pub use response::{Response, ResponseKind, ServerError, error_codes};
