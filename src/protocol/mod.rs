//! Protocol state machines: the auth handshake and the inbound dispatcher.

pub mod dispatcher;
pub mod handshake;
