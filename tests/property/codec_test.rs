// tests/property/codec_test.rs

//! Property-based tests for line framing: however the bytes are chunked,
//! the same lines come out.

use buddygate::connection::LineCodec;
use bytes::BytesMut;
use proptest::prelude::*;
use tokio_util::codec::Decoder;

proptest! {
    #[test]
    fn test_chunking_does_not_change_lines(
        lines in prop::collection::vec("[ -~]{0,40}", 1..20),
        crlf in any::<bool>(),
        chunk in 1usize..17,
    ) {
        let terminator = if crlf { "\r\n" } else { "\n" };
        let wire: String = lines.iter().map(|l| format!("{l}{terminator}")).collect();

        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        let mut decoded = Vec::new();
        for piece in wire.as_bytes().chunks(chunk) {
            buf.extend_from_slice(piece);
            while let Some(line) = codec.decode(&mut buf).unwrap() {
                decoded.push(line);
            }
        }

        prop_assert_eq!(decoded, lines);
        prop_assert!(buf.is_empty());
    }
}
