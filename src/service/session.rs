//! # Session
//!
//! One authenticated TCP connection and its read/write state.
//!
//! A [`Session`] is created by dialing and authenticating in one step;
//! there is no half-initialized state. If either the dial or the handshake
//! fails the caller gets an error and the socket is gone. After that the
//! session supports two mutually exclusive operating modes:
//!
//! - **Single-shot**: call [`Session::purchase`] then [`Session::recv_response`]
//!   for one direct blocking read, bypassing any background machinery.
//! - **Long-running**: call [`Session::start`], which consumes the session,
//!   moves the framed reader into a spawned [`ReadLoop`], and hands back a
//!   clonable [`SessionHandle`] for further purchases. Because `start` takes
//!   the session by value, a direct read concurrent with the loop is a
//!   compile-time impossibility.
//!
//! Closing is idempotent from any task: a compare-and-swap on the shutdown
//! flag guarantees exactly one physical shutdown of the socket no matter how
//! many times or from which contexts `close` is invoked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::config::SessionConfig;
use crate::core::codec::Wire;
use crate::core::message::{CommandId, Response};
use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::{ReadLoop, SessionEvent};
use crate::protocol::handshake;
use crate::transport::tcp::{self, FrameSource, SharedSink};

/// One-shot shutdown signal shared between the caller task and the read
/// loop. The atomic flag arbitrates which invocation performs the physical
/// close; the watch channel is what the loop's `select!` observes.
#[derive(Debug, Clone)]
pub(crate) struct Shutdown {
    inner: Arc<ShutdownInner>,
}

#[derive(Debug)]
struct ShutdownInner {
    closed: AtomicBool,
    tx: watch::Sender<bool>,
}

impl Shutdown {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(ShutdownInner {
                closed: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Claim the close action. Returns `true` for exactly one caller.
    pub(crate) fn begin(&self) -> bool {
        if self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let _ = self.inner.tx.send(true);
            true
        } else {
            false
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.tx.subscribe()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

/// Clonable write-side of a session: purchases and close.
///
/// This is what keeps working after the read loop takes ownership of the
/// reader in long-running mode.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    wire: Wire,
    sink: SharedSink,
    shutdown: Shutdown,
}

impl SessionHandle {
    /// Encode and send one purchase request, flushing the stream.
    ///
    /// Does not wait for the matching response. The protocol has no request
    /// correlation, so callers keep at most one purchase outstanding and
    /// serialize their own calls; the internal writer lock only protects
    /// frame integrity against the loop's heartbeat echoes.
    pub async fn purchase<S: AsRef<str>>(&self, basket_id: &str, barcodes: &[S]) -> Result<()> {
        if self.shutdown.is_closed() {
            return Err(ProtocolError::ConnectionClosed);
        }
        let frame = self.wire.encode_purchase(basket_id, barcodes);
        let mut sink = self.sink.lock().await;
        sink.send(frame).await
    }

    /// Close the session. Idempotent; safe to call concurrently from the
    /// caller and from the read loop's exit path.
    pub async fn close(&self) {
        if !self.shutdown.begin() {
            return;
        }
        debug!("closing session");
        let mut sink = self.sink.lock().await;
        if let Err(err) = sink.get_mut().shutdown().await {
            debug!(error = %err, "socket shutdown after close");
        }
    }

    /// Whether close has been initiated.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_closed()
    }
}

/// An authenticated connection in single-shot mode, owning the reader.
#[derive(Debug)]
pub struct Session {
    handle: SessionHandle,
    source: FrameSource,
}

impl Session {
    /// Dial the configured address and authenticate.
    ///
    /// The byte-order selector is validated before any network activity.
    /// On any failure the partially-opened socket is dropped and no session
    /// is returned.
    #[instrument(skip(config), fields(addr = %config.addr))]
    pub async fn connect(config: &SessionConfig) -> Result<Self> {
        let wire = Wire::new(&config.endian)?;
        let stream = tcp::dial(&config.addr, config.local_port).await?;
        let (mut source, mut sink) = tcp::framed(stream);

        handshake::authenticate(wire, &mut sink, &mut source, &config.session_id).await?;
        info!(addr = %config.addr, "session established");

        Ok(Self {
            handle: SessionHandle {
                wire,
                sink: Arc::new(Mutex::new(sink)),
                shutdown: Shutdown::new(),
            },
            source,
        })
    }

    /// See [`SessionHandle::purchase`].
    pub async fn purchase<S: AsRef<str>>(&self, basket_id: &str, barcodes: &[S]) -> Result<()> {
        self.handle.purchase(basket_id, barcodes).await
    }

    /// Single-shot mode: block on the next frame and decode it as a
    /// Response.
    ///
    /// Bypasses the background loop entirely; a heartbeat or any other
    /// non-response frame arriving here is surfaced as
    /// [`ProtocolError::UnexpectedFrame`].
    pub async fn recv_response(&mut self) -> Result<Response> {
        let frame = match self.source.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => return Err(err),
            None => return Err(ProtocolError::ConnectionClosed),
        };
        match self.handle.wire.command_id(&frame)? {
            CommandId::Response => self.handle.wire.decode_response(&frame),
            other => Err(ProtocolError::UnexpectedFrame(other.wire_value())),
        }
    }

    /// Switch to long-running mode: move the reader into a background
    /// [`ReadLoop`] emitting [`SessionEvent`]s, and return the write-side
    /// handle.
    ///
    /// The loop closes the session itself when it stops, so the returned
    /// join handle is for lifecycle observation only.
    pub fn start(
        self,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let shutdown_rx = self.handle.shutdown.subscribe();
        let read_loop = ReadLoop::new(
            self.handle.wire,
            self.source,
            self.handle.sink.clone(),
            events,
        );
        let closer = self.handle.clone();
        let join = tokio::spawn(async move {
            read_loop.run(shutdown_rx).await;
            closer.close().await;
        });
        (self.handle, join)
    }

    /// See [`SessionHandle::close`].
    pub async fn close(&self) {
        self.handle.close().await;
    }

    /// Whether close has been initiated.
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}
