//! Authentication handshake.
//!
//! The handshake is a hard precondition on every session: send one Auth
//! frame carrying the session identifier, then block on exactly one inbound
//! frame, which must be a Response with status OK. Any deviation (wrong
//! command id, malformed body, non-OK status, an I/O failure) aborts
//! session construction. No purchase traffic is ever written before the
//! handshake succeeds.

use futures::{SinkExt, StreamExt};
use tracing::{debug, instrument};

use crate::core::codec::Wire;
use crate::core::message::{CommandId, Status};
use crate::error::{ProtocolError, Result};
use crate::transport::tcp::{FrameSink, FrameSource};

/// Run the client side of the handshake over freshly framed halves.
///
/// Called before the read loop exists, so the sink is borrowed directly
/// rather than through the writer lock.
#[instrument(skip_all, fields(session_id = %session_id))]
pub async fn authenticate(
    wire: Wire,
    sink: &mut FrameSink,
    source: &mut FrameSource,
    session_id: &str,
) -> Result<()> {
    sink.send(wire.encode_auth(session_id)).await?;
    debug!("auth request sent, awaiting response");

    let frame = match source.next().await {
        Some(Ok(frame)) => frame,
        Some(Err(err)) => return Err(err),
        None => return Err(ProtocolError::ConnectionClosed),
    };

    match wire
        .command_id(&frame)
        .map_err(|err| ProtocolError::Handshake(format!("unreadable auth reply: {err}")))?
    {
        CommandId::Response => {}
        other => {
            return Err(ProtocolError::Handshake(format!(
                "expected a response frame, got command {}",
                other.wire_value()
            )))
        }
    }

    let response = wire
        .decode_response(&frame)
        .map_err(|err| ProtocolError::Handshake(format!("malformed auth response: {err}")))?;

    match response.status {
        Status::Ok => {
            debug!(message = %response.message, "authenticated");
            Ok(())
        }
        status => Err(ProtocolError::AuthRejected(status)),
    }
}
