//! TCP dialing with an optional explicit local source port.
//!
//! PLC deployments often pin the device's source port in the server's
//! allowlist, so the dialer binds locally before connecting. Port 0 keeps the
//! ephemeral-port behavior.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, instrument};

use crate::core::frame::FrameCodec;
use crate::error::{ProtocolError, Result};

/// Framed read half of a connection. Exclusively owned: by the Session in
/// single-shot mode, by the read loop after `Session::start`.
pub type FrameSource = FramedRead<OwnedReadHalf, FrameCodec>;

/// Framed write half of a connection.
pub type FrameSink = FramedWrite<OwnedWriteHalf, FrameCodec>;

/// The write path is a single critical section shared by the caller task
/// (purchases) and the read loop (heartbeat echoes); the lock keeps their
/// frames from interleaving on the wire.
pub type SharedSink = Arc<Mutex<FrameSink>>;

/// Split a connected stream into its framed halves.
pub fn framed(stream: TcpStream) -> (FrameSource, FrameSink) {
    let (read_half, write_half) = stream.into_split();
    (
        FramedRead::new(read_half, FrameCodec),
        FramedWrite::new(write_half, FrameCodec),
    )
}

/// Open a TCP connection to `addr` ("host:port"), bound to `local_port` on
/// the wildcard address (0 = any free port).
#[instrument(skip(addr), fields(addr = %addr))]
pub async fn dial(addr: &str, local_port: u16) -> Result<TcpStream> {
    let remote = lookup_host(addr)
        .await?
        .next()
        .ok_or_else(|| ProtocolError::Config(format!("address resolved to nothing: {addr}")))?;

    let socket = match remote {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    // A fixed source port lingers in TIME_WAIT between runs; reuse keeps
    // repeated invocations from failing to bind.
    socket.set_reuseaddr(true)?;
    let local: IpAddr = match remote {
        SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
        SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
    };
    socket.bind(SocketAddr::new(local, local_port))?;

    let stream = socket.connect(remote).await?;
    debug!(peer = %remote, "tcp connection established");
    Ok(stream)
}
