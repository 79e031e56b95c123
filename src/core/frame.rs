//! # Frame Codec
//!
//! Newline-terminated framing over a raw byte stream.
//!
//! Every frame on the wire is an opaque byte sequence terminated by `\r\n`.
//! The terminator is stripped before a payload reaches the message codec and
//! appended after encoding; it is never part of the payload.
//!
//! ## Wire Format
//! ```text
//! [Payload(N)] [0x0D 0x0A]
//! ```
//!
//! ## Invariants
//! - Frames are delimited on the *wire* only: message decoding consumes
//!   fixed-width fields by byte count and never re-scans their contents for
//!   a terminator, so embedded `\r`/`\n` bytes inside a fixed-width field of
//!   an inbound frame are safe by construction.
//! - A frame larger than [`MAX_FRAME_LEN`] is a fatal framing error; the
//!   protocol defines no upper bound, so this guard caps buffering against a
//!   misbehaving peer.
//! - End-of-stream with a partial frame buffered means the terminator never
//!   arrived: reported as [`ProtocolError::ConnectionClosed`].

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;

/// Upper bound on a single frame, terminator included.
///
/// The largest legitimate frame this protocol produces (a purchase carrying a
/// u16-counted barcode list) stays well below this.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// The two-byte frame terminator.
pub const TERMINATOR: &[u8] = b"\r\n";

/// Codec for `\r\n`-terminated binary frames.
///
/// Stateless; one instance per framed half of the connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        match src.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                if pos + 1 > MAX_FRAME_LEN {
                    return Err(ProtocolError::OversizedFrame { max: MAX_FRAME_LEN });
                }
                let mut frame = src.split_to(pos + 1);
                // Strip the LF and the CR preceding it. A bare LF from a
                // sloppy peer is tolerated the same way.
                frame.truncate(pos);
                if frame.last() == Some(&b'\r') {
                    frame.truncate(frame.len() - 1);
                }
                Ok(Some(frame.freeze()))
            }
            None => {
                if src.len() > MAX_FRAME_LEN {
                    return Err(ProtocolError::OversizedFrame { max: MAX_FRAME_LEN });
                }
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            // Bytes left over with no terminator in sight.
            None => Err(ProtocolError::ConnectionClosed),
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        dst.reserve(item.len() + TERMINATOR.len());
        dst.extend_from_slice(&item);
        dst.extend_from_slice(TERMINATOR);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(src: &mut BytesMut) -> Vec<Bytes> {
        let mut codec = FrameCodec;
        let mut out = Vec::new();
        while let Some(frame) = codec.decode(src).expect("decode") {
            out.push(frame);
        }
        out
    }

    #[test]
    fn back_to_back_frames_come_out_in_order() {
        let mut src = BytesMut::from(&b"first\r\nsecond\r\n"[..]);
        let frames = decode_all(&mut src);
        assert_eq!(frames, vec![Bytes::from("first"), Bytes::from("second")]);
        assert!(src.is_empty());
    }

    #[test]
    fn terminator_never_leaks_into_payload() {
        let mut src = BytesMut::from(&b"\x00\x04\r\n"[..]);
        let frames = decode_all(&mut src);
        assert_eq!(frames, vec![Bytes::from(&b"\x00\x04"[..])]);
    }

    #[test]
    fn partial_frame_waits_for_more_data() {
        let mut codec = FrameCodec;
        let mut src = BytesMut::from(&b"incomplete"[..]);
        assert!(codec.decode(&mut src).expect("decode").is_none());
        src.extend_from_slice(b"\r\n");
        assert_eq!(
            codec.decode(&mut src).expect("decode"),
            Some(Bytes::from("incomplete"))
        );
    }

    #[test]
    fn empty_frame_is_an_empty_payload() {
        let mut src = BytesMut::from(&b"\r\n"[..]);
        assert_eq!(decode_all(&mut src), vec![Bytes::new()]);
    }

    #[test]
    fn bare_lf_is_tolerated() {
        let mut src = BytesMut::from(&b"loose\n"[..]);
        assert_eq!(decode_all(&mut src), vec![Bytes::from("loose")]);
    }

    #[test]
    fn embedded_cr_is_not_a_terminator() {
        let mut src = BytesMut::from(&b"a\rb\r\n"[..]);
        assert_eq!(decode_all(&mut src), vec![Bytes::from(&b"a\rb"[..])]);
    }

    #[test]
    fn eof_with_partial_frame_is_an_error() {
        let mut codec = FrameCodec;
        let mut src = BytesMut::from(&b"never terminated"[..]);
        let err = codec.decode_eof(&mut src).expect_err("must fail");
        assert!(matches!(err, ProtocolError::ConnectionClosed));
    }

    #[test]
    fn eof_with_empty_buffer_ends_the_stream() {
        let mut codec = FrameCodec;
        let mut src = BytesMut::new();
        assert!(codec.decode_eof(&mut src).expect("decode_eof").is_none());
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut codec = FrameCodec;
        let mut src = BytesMut::from(vec![0u8; MAX_FRAME_LEN + 1].as_slice());
        let err = codec.decode(&mut src).expect_err("must fail");
        assert!(matches!(err, ProtocolError::OversizedFrame { .. }));
    }

    #[test]
    fn encode_appends_terminator() {
        let mut codec = FrameCodec;
        let mut dst = BytesMut::new();
        codec
            .encode(Bytes::from(&b"\x00\x02abc"[..]), &mut dst)
            .expect("encode");
        assert_eq!(&dst[..], b"\x00\x02abc\r\n");
    }
}
