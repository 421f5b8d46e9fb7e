// tests/property/codec_test.rs

//! Property-based tests for line framing.

use bytes::BytesMut;
use ippdme::core::protocol::{IppLineCodec, decode_command, decode_response, encode_command};
use ippdme::core::tags::Tag;
use proptest::prelude::*;
use tokio_util::codec::Decoder;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_command_encoding_round_trip(
        number in 1u32..=99_999,
        command in "[ -~]{0,200}"
    ) {
        let encoded = encode_command(Tag::Normal(number), &command).unwrap();
        let text = std::str::from_utf8(&encoded).unwrap();
        prop_assert!(text.ends_with("\r\n"));
        let (tag, decoded) = decode_command(text).unwrap();
        prop_assert_eq!(tag, Tag::Normal(number));
        prop_assert_eq!(decoded, command);
    }

    #[test]
    fn test_decoder_is_insensitive_to_chunking(
        lines in prop::collection::vec("[ -~]{0,120}", 1..=20),
        chunk in 1usize..=64
    ) {
        let mut stream = Vec::new();
        for line in &lines {
            stream.extend_from_slice(line.as_bytes());
            stream.extend_from_slice(b"\r\n");
        }

        let mut codec = IppLineCodec::default();
        let mut buf = BytesMut::new();
        let mut decoded = Vec::new();
        for piece in stream.chunks(chunk) {
            buf.extend_from_slice(piece);
            while let Some(line) = codec.decode(&mut buf).unwrap() {
                decoded.push(line);
            }
        }

        prop_assert_eq!(decoded, lines);
        prop_assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_response_never_panics(line in "\\PC{0,40}") {
        let _ = decode_response(&line);
    }

    #[test]
    fn test_data_payload_is_preserved(
        number in 1u16..=9_999,
        payload in "[!-~][ -~]{0,80}"
    ) {
        let line = format!("E{number:04} # {payload}");
        let response = decode_response(&line).unwrap();
        prop_assert_eq!(response.tag, Tag::Event(number));
        prop_assert_eq!(response.payload, payload);
        prop_assert_eq!(response.raw, line);
    }
}
