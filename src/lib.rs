//! # basket-client
//!
//! Load-testing client for the line-delimited binary protocol spoken by the
//! PLC basket-purchase terminal server.
//!
//! The client dials the terminal server over TCP, authenticates once with a
//! session identifier, and then sends purchase requests (a basket id plus a
//! list of barcodes) while consuming asynchronous responses and echoing
//! heartbeats.
//!
//! ## Layers
//! - [`core`]: `\r\n` framing and the byte-order-aware message codec
//! - [`protocol`]: the auth handshake and the inbound frame dispatcher
//! - [`transport`]: TCP dialing with an optional pinned source port
//! - [`service`]: the [`Session`] lifecycle and its two operating modes
//!
//! ## Example
//! ```no_run
//! use basket_client::{Session, SessionConfig};
//!
//! # async fn run() -> basket_client::Result<()> {
//! let config = SessionConfig {
//!     addr: "10.0.0.7:10010".into(),
//!     endian: "BigEndian".into(),
//!     session_id: "floor-3".into(),
//!     local_port: 0,
//! };
//! let mut session = Session::connect(&config).await?;
//! session.purchase("3345678", &["8888351100042"]).await?;
//! let response = session.recv_response().await?;
//! println!("{}: {}", response.status, response.message);
//! session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;

pub use crate::config::{ClientConfig, DriverConfig, SessionConfig};
pub use crate::core::codec::Wire;
pub use crate::core::message::{CommandId, PurchaseRequest, Response, Status};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::dispatcher::SessionEvent;
pub use crate::service::session::{Session, SessionHandle};
