//! Message shapes and wire constants for the basket-purchase protocol.
//!
//! Every frame payload starts with a 2-byte unsigned command identifier.
//! Four message shapes exist:
//!
//! | Command | Id | Body |
//! |---|---|---|
//! | Response | 1 | status (u16) + message (60B, NUL-padded) |
//! | Auth | 2 | session id (32B, NUL-padded) |
//! | PurchaseRequest | 3 | basket-id len (u16) + barcode count (u32) + basket id (58B) + per barcode: len (u16) + 30B |
//! | Heartbeat | 4 | empty |
//!
//! Fixed-width string fields are truncated on overflow and zero-filled on
//! underflow; the length headers always announce the *original* string
//! length so the receiver knows how many of the fixed bytes are significant.

use std::fmt;

/// Width of the session-id field in an Auth frame.
pub const SESSION_ID_LEN: usize = 32;

/// Width of the basket-id field in a PurchaseRequest frame.
pub const BASKET_ID_LEN: usize = 58;

/// Width of each barcode field in a PurchaseRequest frame.
pub const BARCODE_LEN: usize = 30;

/// Width of the message field in a Response frame.
pub const RESPONSE_MSG_LEN: usize = 60;

/// Command identifier carried in the first 2 bytes of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    Response,
    Auth,
    PurchaseRequest,
    Heartbeat,
    /// Any value outside the protocol's four commands. Tolerated and logged
    /// by the dispatcher, never a decode error.
    Unknown(u16),
}

impl CommandId {
    /// Wire value of this command.
    pub fn wire_value(self) -> u16 {
        match self {
            CommandId::Response => 1,
            CommandId::Auth => 2,
            CommandId::PurchaseRequest => 3,
            CommandId::Heartbeat => 4,
            CommandId::Unknown(v) => v,
        }
    }

    /// Classify a wire value.
    pub fn from_wire(value: u16) -> Self {
        match value {
            1 => CommandId::Response,
            2 => CommandId::Auth,
            3 => CommandId::PurchaseRequest,
            4 => CommandId::Heartbeat,
            other => CommandId::Unknown(other),
        }
    }
}

/// Status code carried in a Response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    AuthFailed,
    ProcessFailed,
    InternalServerError,
    /// A status value this client does not recognize. Preserved rather than
    /// rejected, mirroring unknown-command tolerance.
    Unknown(u16),
}

impl Status {
    pub fn wire_value(self) -> u16 {
        match self {
            Status::Ok => 1,
            Status::AuthFailed => 2,
            Status::ProcessFailed => 3,
            Status::InternalServerError => 4,
            Status::Unknown(v) => v,
        }
    }

    pub fn from_wire(value: u16) -> Self {
        match value {
            1 => Status::Ok,
            2 => Status::AuthFailed,
            3 => Status::ProcessFailed,
            4 => Status::InternalServerError,
            other => Status::Unknown(other),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
            Status::AuthFailed => write!(f, "AuthFailed"),
            Status::ProcessFailed => write!(f, "ProcessFailed"),
            Status::InternalServerError => write!(f, "InternalServerError"),
            Status::Unknown(v) => write!(f, "Unknown({v})"),
        }
    }
}

/// Decoded Response frame body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    /// Server message, trimmed at the first NUL of the fixed 60-byte field.
    pub message: String,
}

/// Decoded PurchaseRequest frame body.
///
/// The client only ever encodes purchases; the decoded form exists for the
/// loopback test peer and protocol tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub basket_id: String,
    pub barcodes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_id_wire_values_are_fixed() {
        assert_eq!(CommandId::Response.wire_value(), 1);
        assert_eq!(CommandId::Auth.wire_value(), 2);
        assert_eq!(CommandId::PurchaseRequest.wire_value(), 3);
        assert_eq!(CommandId::Heartbeat.wire_value(), 4);
    }

    #[test]
    fn command_id_classification_roundtrips() {
        for v in [1u16, 2, 3, 4, 0, 99, u16::MAX] {
            assert_eq!(CommandId::from_wire(v).wire_value(), v);
        }
        assert_eq!(CommandId::from_wire(99), CommandId::Unknown(99));
    }

    #[test]
    fn status_classification_preserves_unknown_values() {
        assert_eq!(Status::from_wire(1), Status::Ok);
        assert_eq!(Status::from_wire(4), Status::InternalServerError);
        assert_eq!(Status::from_wire(7), Status::Unknown(7));
        assert_eq!(Status::from_wire(7).wire_value(), 7);
    }
}
