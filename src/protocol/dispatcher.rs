//! # Read Loop / Dispatcher
//!
//! After a successful handshake the read loop owns the framed read half and
//! continuously pulls inbound frames, classifies each by command id, and
//! reacts:
//!
//! - **Response** → decode the body and emit a [`SessionEvent::Response`].
//!   A malformed body is logged and dropped; it never terminates the loop.
//! - **Heartbeat** → immediately write one identical heartbeat frame back.
//!   This is the only self-initiated write inside the loop, and it goes
//!   through the shared writer lock so it cannot interleave with a purchase
//!   written from the caller task.
//! - anything else → logged as unrecognized and tolerated.
//!
//! The loop has one state, `Running`, and one terminal transition: a
//! stream-level error or the shutdown signal stops it. There is no
//! reconnect; a new Session is a new loop.

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

use crate::core::codec::Wire;
use crate::core::message::{CommandId, Status};
use crate::error::{ProtocolError, Result};
use crate::transport::tcp::{FrameSource, SharedSink};

/// Structured events the loop reports to whatever consumer the operating
/// mode wires up. The core never renders these; it only emits them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A Response frame arrived.
    Response { status: Status, message: String },
    /// A heartbeat was received and echoed back.
    HeartbeatEchoed,
    /// A frame with an unhandled command id arrived and was dropped.
    UnknownCommand(u16),
    /// The loop stopped; carries the reason. Emitted exactly once, last.
    Disconnected { reason: String },
}

/// The background frame consumer for a long-running session.
///
/// Owns the read half by value: while the loop runs, no other reader can
/// exist, which rules out the undefined frame ownership of mixing a direct
/// blocking read with the loop.
pub struct ReadLoop {
    wire: Wire,
    source: FrameSource,
    sink: SharedSink,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ReadLoop {
    pub(crate) fn new(
        wire: Wire,
        source: FrameSource,
        sink: SharedSink,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            wire,
            source,
            sink,
            events,
        }
    }

    /// Consume frames until a stream-level error or the shutdown signal.
    ///
    /// The caller is responsible for closing the session once this returns.
    pub(crate) async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let reason = loop {
            if *shutdown.borrow() {
                break "session closed".to_string();
            }
            tokio::select! {
                _ = shutdown.changed() => break "session closed".to_string(),
                next = self.source.next() => match next {
                    None => {
                        debug!("peer closed the connection");
                        break ProtocolError::ConnectionClosed.to_string();
                    }
                    Some(Err(err)) => {
                        error!(error = %err, "read failed");
                        break err.to_string();
                    }
                    Some(Ok(frame)) => {
                        if let Err(err) = self.dispatch(&frame).await {
                            error!(error = %err, "write failed inside read loop");
                            break err.to_string();
                        }
                    }
                }
            }
        };
        let _ = self.events.send(SessionEvent::Disconnected { reason });
    }

    /// Handle one frame. Only a failed heartbeat echo is fatal; every decode
    /// problem is contained here.
    async fn dispatch(&mut self, frame: &[u8]) -> Result<()> {
        let command = match self.wire.command_id(frame) {
            Ok(command) => command,
            Err(err) => {
                warn!(error = %err, "dropping malformed frame");
                return Ok(());
            }
        };

        match command {
            CommandId::Response => match self.wire.decode_response(frame) {
                Ok(response) => {
                    debug!(status = %response.status, message = %response.message, "response received");
                    let _ = self.events.send(SessionEvent::Response {
                        status: response.status,
                        message: response.message,
                    });
                }
                Err(err) => {
                    warn!(error = %err, "dropping malformed response frame");
                }
            },
            CommandId::Heartbeat => {
                {
                    let mut sink = self.sink.lock().await;
                    sink.send(self.wire.encode_heartbeat()).await?;
                }
                debug!("heartbeat echoed");
                let _ = self.events.send(SessionEvent::HeartbeatEchoed);
            }
            other => {
                warn!(command = other.wire_value(), "unrecognized command");
                let _ = self
                    .events
                    .send(SessionEvent::UnknownCommand(other.wire_value()));
            }
        }
        Ok(())
    }
}
