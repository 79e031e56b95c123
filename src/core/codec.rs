//! # Message Codec
//!
//! Translation between in-memory message values and frame payloads.
//!
//! [`Wire`] is stateless except for the byte order selected at construction;
//! every multi-byte integer field on the wire uses that order. The byte order
//! is a deployment-time choice and must match the peer exactly: there is no
//! negotiation and no implicit default.
//!
//! Encoders produce the payload only; the frame terminator belongs to
//! [`crate::core::frame::FrameCodec`]. Decoders take a terminator-stripped
//! payload and consume fixed-width fields by byte count.

use bytes::{Bytes, BytesMut};

use crate::core::message::{
    CommandId, PurchaseRequest, Response, Status, BARCODE_LEN, BASKET_ID_LEN, RESPONSE_MSG_LEN,
    SESSION_ID_LEN,
};
use crate::error::{ProtocolError, Result};

/// Recognized byte-order option values. Anything else is a construction-time
/// configuration error.
pub const BIG_ENDIAN: &str = "BigEndian";
pub const LITTLE_ENDIAN: &str = "LittleEndian";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Big,
    Little,
}

/// Byte-order-aware encoder/decoder for the four message shapes.
#[derive(Debug, Clone, Copy)]
pub struct Wire {
    order: ByteOrder,
}

impl Wire {
    /// Select the byte order from one of the two recognized option strings.
    pub fn new(endian: &str) -> Result<Self> {
        let order = match endian {
            BIG_ENDIAN => ByteOrder::Big,
            LITTLE_ENDIAN => ByteOrder::Little,
            other => {
                return Err(ProtocolError::Config(format!(
                    "unknown endian option: {other:?} (expected {BIG_ENDIAN} or {LITTLE_ENDIAN})"
                )))
            }
        };
        Ok(Self { order })
    }

    fn put_u16(self, buf: &mut BytesMut, value: u16) {
        let bytes = match self.order {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        };
        buf.extend_from_slice(&bytes);
    }

    fn put_u32(self, buf: &mut BytesMut, value: u32) {
        let bytes = match self.order {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        };
        buf.extend_from_slice(&bytes);
    }

    fn get_u16(self, bytes: &[u8]) -> u16 {
        let pair = [bytes[0], bytes[1]];
        match self.order {
            ByteOrder::Big => u16::from_be_bytes(pair),
            ByteOrder::Little => u16::from_le_bytes(pair),
        }
    }

    fn get_u32(self, bytes: &[u8]) -> u32 {
        let quad = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self.order {
            ByteOrder::Big => u32::from_be_bytes(quad),
            ByteOrder::Little => u32::from_le_bytes(quad),
        }
    }

    /// Encode an Auth request: command id + 32-byte NUL-padded session id.
    pub fn encode_auth(self, session_id: &str) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + SESSION_ID_LEN);
        self.put_u16(&mut buf, CommandId::Auth.wire_value());
        put_fixed(&mut buf, session_id.as_bytes(), SESSION_ID_LEN);
        buf.freeze()
    }

    /// Encode a Heartbeat: command id, no payload.
    pub fn encode_heartbeat(self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2);
        self.put_u16(&mut buf, CommandId::Heartbeat.wire_value());
        buf.freeze()
    }

    /// Encode a PurchaseRequest.
    ///
    /// The length headers announce the *original* string lengths; the fixed
    /// fields themselves truncate on overflow and zero-fill on underflow.
    pub fn encode_purchase<S: AsRef<str>>(self, basket_id: &str, barcodes: &[S]) -> Bytes {
        let mut buf =
            BytesMut::with_capacity(2 + 2 + 4 + BASKET_ID_LEN + barcodes.len() * (2 + BARCODE_LEN));
        self.put_u16(&mut buf, CommandId::PurchaseRequest.wire_value());
        self.put_u16(&mut buf, basket_id.len() as u16);
        self.put_u32(&mut buf, barcodes.len() as u32);
        put_fixed(&mut buf, basket_id.as_bytes(), BASKET_ID_LEN);
        for barcode in barcodes {
            let barcode = barcode.as_ref();
            self.put_u16(&mut buf, barcode.len() as u16);
            put_fixed(&mut buf, barcode.as_bytes(), BARCODE_LEN);
        }
        buf.freeze()
    }

    /// Encode a Response. The client never sends these; the loopback test
    /// peer does.
    pub fn encode_response(self, status: Status, message: &str) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + 2 + RESPONSE_MSG_LEN);
        self.put_u16(&mut buf, CommandId::Response.wire_value());
        self.put_u16(&mut buf, status.wire_value());
        put_fixed(&mut buf, message.as_bytes(), RESPONSE_MSG_LEN);
        buf.freeze()
    }

    /// Read the command id from the first 2 bytes of a frame payload.
    pub fn command_id(self, frame: &[u8]) -> Result<CommandId> {
        if frame.len() < 2 {
            return Err(ProtocolError::ShortFrame {
                need: 2,
                got: frame.len(),
            });
        }
        Ok(CommandId::from_wire(self.get_u16(frame)))
    }

    /// Decode a Response frame payload (command id included).
    pub fn decode_response(self, frame: &[u8]) -> Result<Response> {
        const NEED: usize = 2 + 2 + RESPONSE_MSG_LEN;
        if frame.len() < NEED {
            return Err(ProtocolError::ShortFrame {
                need: NEED,
                got: frame.len(),
            });
        }
        let status = Status::from_wire(self.get_u16(&frame[2..]));
        let message = take_until_nul(&frame[4..4 + RESPONSE_MSG_LEN]);
        Ok(Response { status, message })
    }

    /// Decode an Auth frame payload into the session id it carries.
    pub fn decode_auth(self, frame: &[u8]) -> Result<String> {
        const NEED: usize = 2 + SESSION_ID_LEN;
        if frame.len() < NEED {
            return Err(ProtocolError::ShortFrame {
                need: NEED,
                got: frame.len(),
            });
        }
        let field = &frame[2..2 + SESSION_ID_LEN];
        let trimmed: &[u8] = match field.iter().rposition(|&b| b != 0 && b != b' ') {
            Some(last) => &field[..=last],
            None => &[],
        };
        Ok(String::from_utf8_lossy(trimmed).into_owned())
    }

    /// Decode a PurchaseRequest frame payload.
    ///
    /// Each string comes back as the announced length capped at the fixed
    /// field width, so an over-length original decodes to its truncated
    /// prefix.
    pub fn decode_purchase(self, frame: &[u8]) -> Result<PurchaseRequest> {
        const HEADER: usize = 2 + 2 + 4 + BASKET_ID_LEN;
        if frame.len() < HEADER {
            return Err(ProtocolError::ShortFrame {
                need: HEADER,
                got: frame.len(),
            });
        }
        let basket_len = self.get_u16(&frame[2..]) as usize;
        let count = self.get_u32(&frame[4..]) as usize;
        let basket_id = take_announced(&frame[8..8 + BASKET_ID_LEN], basket_len);

        let mut barcodes = Vec::with_capacity(count.min(64));
        let mut offset = HEADER;
        for _ in 0..count {
            let need = offset + 2 + BARCODE_LEN;
            if frame.len() < need {
                return Err(ProtocolError::ShortFrame {
                    need,
                    got: frame.len(),
                });
            }
            let len = self.get_u16(&frame[offset..]) as usize;
            barcodes.push(take_announced(
                &frame[offset + 2..offset + 2 + BARCODE_LEN],
                len,
            ));
            offset = need;
        }
        Ok(PurchaseRequest {
            basket_id,
            barcodes,
        })
    }
}

/// Write `src` into a fixed-width destination field: truncated when longer,
/// zero-filled for the remainder when shorter.
fn put_fixed(buf: &mut BytesMut, src: &[u8], width: usize) {
    let significant = src.len().min(width);
    buf.extend_from_slice(&src[..significant]);
    buf.resize(buf.len() + (width - significant), 0);
}

/// Significant prefix of a fixed field given its announced length.
fn take_announced(field: &[u8], announced: usize) -> String {
    let significant = announced.min(field.len());
    String::from_utf8_lossy(&field[..significant]).into_owned()
}

/// Fixed field trimmed at its first NUL.
fn take_until_nul(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big() -> Wire {
        Wire::new(BIG_ENDIAN).expect("big endian")
    }

    fn little() -> Wire {
        Wire::new(LITTLE_ENDIAN).expect("little endian")
    }

    #[test]
    fn rejects_unrecognized_endian_option() {
        for bad in ["bigendian", "BE", "network", ""] {
            let err = Wire::new(bad).expect_err("must fail");
            assert!(matches!(err, ProtocolError::Config(_)));
        }
    }

    #[test]
    fn auth_layout_big_endian() {
        let frame = big().encode_auth("abc");
        assert_eq!(frame.len(), 2 + SESSION_ID_LEN);
        assert_eq!(&frame[..2], &[0x00, 0x02]);
        assert_eq!(&frame[2..5], b"abc");
        assert!(frame[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn auth_layout_little_endian() {
        let frame = little().encode_auth("abc");
        assert_eq!(&frame[..2], &[0x02, 0x00]);
    }

    #[test]
    fn auth_session_id_truncates_at_field_width() {
        let long = "x".repeat(SESSION_ID_LEN + 5);
        let frame = big().encode_auth(&long);
        assert_eq!(frame.len(), 2 + SESSION_ID_LEN);
        assert_eq!(big().decode_auth(&frame).expect("decode"), "x".repeat(SESSION_ID_LEN));
    }

    #[test]
    fn heartbeat_is_command_id_only() {
        assert_eq!(&big().encode_heartbeat()[..], &[0x00, 0x04]);
        assert_eq!(&little().encode_heartbeat()[..], &[0x04, 0x00]);
    }

    #[test]
    fn purchase_layout_is_exact() {
        let frame = big().encode_purchase("3345678", &["111", "222"]);
        assert_eq!(frame.len(), 2 + 2 + 4 + BASKET_ID_LEN + 2 * (2 + BARCODE_LEN));
        assert_eq!(&frame[..2], &[0x00, 0x03]); // command
        assert_eq!(&frame[2..4], &[0x00, 0x07]); // basket-id length
        assert_eq!(&frame[4..8], &[0x00, 0x00, 0x00, 0x02]); // barcode count
        assert_eq!(&frame[8..15], b"3345678");
        assert!(frame[15..8 + BASKET_ID_LEN].iter().all(|&b| b == 0));
        let first = 8 + BASKET_ID_LEN;
        assert_eq!(&frame[first..first + 2], &[0x00, 0x03]);
        assert_eq!(&frame[first + 2..first + 5], b"111");
        let second = first + 2 + BARCODE_LEN;
        assert_eq!(&frame[second..second + 2], &[0x00, 0x03]);
        assert_eq!(&frame[second + 2..second + 5], b"222");
    }

    #[test]
    fn purchase_roundtrip_at_boundary_lengths() {
        let wire = big();
        for basket_len in [0usize, 1, 57, 58] {
            let basket = "b".repeat(basket_len);
            for barcode_len in [0usize, 1, 29, 30] {
                let barcodes = vec!["c".repeat(barcode_len)];
                let frame = wire.encode_purchase(&basket, &barcodes);
                let decoded = wire.decode_purchase(&frame).expect("decode");
                assert_eq!(decoded.basket_id, basket);
                assert_eq!(decoded.barcodes, barcodes);
            }
        }
    }

    #[test]
    fn purchase_roundtrip_empty_barcode_list() {
        let wire = little();
        let frame = wire.encode_purchase("basket", &[] as &[&str]);
        let decoded = wire.decode_purchase(&frame).expect("decode");
        assert_eq!(decoded.basket_id, "basket");
        assert!(decoded.barcodes.is_empty());
    }

    #[test]
    fn overlength_fields_truncate_but_announce_original_length() {
        let wire = big();
        let basket = "B".repeat(BASKET_ID_LEN + 1);
        let barcode = "C".repeat(BARCODE_LEN + 1);
        let frame = wire.encode_purchase(&basket, &[barcode.as_str()]);

        // The headers carry the original lengths.
        assert_eq!(&frame[2..4], &(59u16).to_be_bytes());
        let first = 8 + BASKET_ID_LEN;
        assert_eq!(&frame[first..first + 2], &(31u16).to_be_bytes());

        // The fields hold the truncated prefixes, and decode caps the
        // announced length at the field width.
        let decoded = wire.decode_purchase(&frame).expect("decode");
        assert_eq!(decoded.basket_id, "B".repeat(BASKET_ID_LEN));
        assert_eq!(decoded.barcodes, vec!["C".repeat(BARCODE_LEN)]);
    }

    #[test]
    fn embedded_terminator_bytes_survive_fixed_width_decode() {
        // Fields are consumed by byte count, never re-scanned for `\r\n`.
        let wire = big();
        let frame = wire.encode_purchase("bas\r\nket", &["11\r\n22"]);
        let decoded = wire.decode_purchase(&frame).expect("decode");
        assert_eq!(decoded.basket_id, "bas\r\nket");
        assert_eq!(decoded.barcodes, vec!["11\r\n22"]);
    }

    #[test]
    fn byte_order_is_never_inferred() {
        // A big-endian purchase misread as little-endian announces a barcode
        // count of 0x01000000; the decoder runs out of frame long before
        // that, so the mismatch is loud, not silent.
        let frame = big().encode_purchase("3345678", &["111"]);
        assert!(matches!(
            little().decode_purchase(&frame),
            Err(ProtocolError::ShortFrame { .. })
        ));

        // Response status 1 reads back as 256 under the wrong order.
        let response = big().encode_response(Status::Ok, "ready");
        assert_eq!(
            little().decode_response(&response).expect("decode").status,
            Status::Unknown(256)
        );

        assert_eq!(
            big().command_id(&[0x00, 0x01]).expect("command"),
            CommandId::Response
        );
        assert_eq!(
            little().command_id(&[0x00, 0x01]).expect("command"),
            CommandId::Unknown(0x0100)
        );
    }

    #[test]
    fn response_roundtrip_trims_padding() {
        let wire = big();
        let frame = wire.encode_response(Status::ProcessFailed, "dup barcode");
        assert_eq!(frame.len(), 2 + 2 + RESPONSE_MSG_LEN);
        let decoded = wire.decode_response(&frame).expect("decode");
        assert_eq!(decoded.status, Status::ProcessFailed);
        assert_eq!(decoded.message, "dup barcode");
    }

    #[test]
    fn response_with_unknown_status_is_preserved() {
        let wire = big();
        let frame = wire.encode_response(Status::Unknown(9), "odd");
        let decoded = wire.decode_response(&frame).expect("decode");
        assert_eq!(decoded.status, Status::Unknown(9));
    }

    #[test]
    fn short_response_frame_is_rejected() {
        let wire = big();
        let err = wire.decode_response(&[0x00, 0x01, 0x00]).expect_err("short");
        assert!(matches!(err, ProtocolError::ShortFrame { need: 64, got: 3 }));
    }

    #[test]
    fn command_id_needs_two_bytes() {
        let wire = big();
        for frame in [&[][..], &[0x01][..]] {
            let err = wire.command_id(frame).expect_err("short");
            assert!(matches!(err, ProtocolError::ShortFrame { need: 2, .. }));
        }
    }

    #[test]
    fn truncated_purchase_body_is_rejected() {
        let wire = big();
        let frame = wire.encode_purchase("basket", &["111", "222"]);
        // Chop the second barcode's field in half.
        let err = wire
            .decode_purchase(&frame[..frame.len() - 10])
            .expect_err("truncated");
        assert!(matches!(err, ProtocolError::ShortFrame { .. }));
    }
}
