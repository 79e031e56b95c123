//! # Core Protocol Components
//!
//! Frame handling and binary message encoding for the basket-purchase
//! protocol.
//!
//! ## Components
//! - **Frame**: `\r\n`-terminated framing over the byte stream
//! - **Message**: command ids, status codes, and decoded message values
//! - **Codec**: byte-order-aware translation between values and payloads
//!
//! ## Wire Format
//! ```text
//! [CommandId(2)] [Body(N)] [0x0D 0x0A]
//! ```

pub mod codec;
pub mod frame;
pub mod message;
