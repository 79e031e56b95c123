//! Benchmark driver for the basket-purchase terminal client.
//!
//! Two modes built on the same session primitives:
//! - `test-once`: one purchase, one direct blocking read of the response.
//! - `test-many`: a background read loop plus N purchase rounds on a timer,
//!   with outcomes observed through logged session events.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use basket_client::config::ClientConfig;
use basket_client::{Session, SessionEvent, Status};

/// How long to wait for the dial + handshake before giving up. The core has
/// no internal timeouts; deadlines belong to the driver.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Single purchase with a direct blocking response read.
    TestOnce,
    /// Long-running: background read loop plus timed purchase rounds.
    TestMany,
}

/// Load-testing client for the PLC basket-purchase terminal.
#[derive(Parser)]
#[command(name = "basket-client", version)]
struct Cli {
    #[arg(long, value_enum, default_value = "test-once")]
    mode: Mode,

    /// Optional TOML config file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Terminal server address, "host:port".
    #[arg(long)]
    addr: Option<String>,

    /// Packet endian: BigEndian or LittleEndian.
    #[arg(long)]
    endian: Option<String>,

    /// Session identifier sent in the auth handshake.
    #[arg(long)]
    ssid: Option<String>,

    /// Local source port to dial from (0 = ephemeral).
    #[arg(long)]
    local_port: Option<u16>,

    /// Basket id sent with every purchase.
    #[arg(long)]
    basket_id: Option<String>,

    /// Comma-separated barcodes sent with every purchase.
    #[arg(long)]
    barcodes: Option<String>,

    /// Number of purchase rounds in test-many mode.
    #[arg(long)]
    round_times: Option<u32>,

    /// Seconds between rounds in test-many mode.
    #[arg(long)]
    round_period_secs: Option<u64>,

    /// Abort remaining rounds after a failed send.
    #[arg(long)]
    stop_on_error: bool,
}

impl Cli {
    /// File config (or defaults) with CLI overrides applied on top.
    fn into_config(self) -> anyhow::Result<(Mode, ClientConfig)> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ClientConfig::default(),
        };

        if let Some(addr) = self.addr {
            config.session.addr = addr;
        }
        if let Some(endian) = self.endian {
            config.session.endian = endian;
        }
        if let Some(ssid) = self.ssid {
            config.session.session_id = ssid;
        }
        if let Some(local_port) = self.local_port {
            config.session.local_port = local_port;
        }
        if let Some(basket_id) = self.basket_id {
            config.driver.basket_id = basket_id;
        }
        if let Some(barcodes) = self.barcodes {
            config.driver.barcodes = barcodes.split(',').map(str::to_string).collect();
        }
        if let Some(round_times) = self.round_times {
            config.driver.round_times = round_times;
        }
        if let Some(secs) = self.round_period_secs {
            config.driver.round_period = Duration::from_secs(secs);
        }
        if self.stop_on_error {
            config.driver.stop_on_error = true;
        }

        config.validate_strict()?;
        Ok((self.mode, config))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let (mode, config) = Cli::parse().into_config()?;

    info!(addr = %config.session.addr, ?mode, "connecting");
    let session = tokio::time::timeout(CONNECT_TIMEOUT, Session::connect(&config.session))
        .await
        .context("connect timed out")?
        .context("session construction failed")?;

    match mode {
        Mode::TestOnce => test_once(session, &config).await,
        Mode::TestMany => test_many(session, &config).await,
    }
}

async fn test_once(mut session: Session, config: &ClientConfig) -> anyhow::Result<()> {
    let driver = &config.driver;
    let started = Instant::now();
    session
        .purchase(&driver.basket_id, &driver.barcodes)
        .await
        .context("purchase send failed")?;

    let response = session
        .recv_response()
        .await
        .context("reading purchase response failed")?;
    info!(
        status = %response.status,
        message = %response.message,
        elapsed = ?started.elapsed(),
        "purchase completed"
    );
    session.close().await;

    if response.status != Status::Ok {
        bail!(
            "purchase rejected: {} ({})",
            response.status,
            response.message
        );
    }
    Ok(())
}

async fn test_many(session: Session, config: &ClientConfig) -> anyhow::Result<()> {
    let driver = config.driver.clone();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (handle, loop_task) = session.start(events_tx);

    // Round-trip timing: one purchase in flight at a time, so the most
    // recent send instant is enough to attribute a response to.
    let last_send = Arc::new(Mutex::new(Instant::now()));

    let send_clock = Arc::clone(&last_send);
    let consumer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                SessionEvent::Response { status, message } => {
                    let elapsed = send_clock.lock().expect("clock lock").elapsed();
                    match status {
                        Status::Ok => info!(basket = %message, ?elapsed, "basket success"),
                        Status::ProcessFailed => {
                            warn!(basket = %message, ?elapsed, "basket process failed");
                        }
                        other => warn!(status = %other, message = %message, "basket rejected"),
                    }
                }
                SessionEvent::HeartbeatEchoed => info!("handled heartbeat"),
                SessionEvent::UnknownCommand(command) => {
                    warn!(command, "received unknown command");
                }
                SessionEvent::Disconnected { reason } => {
                    warn!(%reason, "session disconnected");
                    break;
                }
            }
        }
    });

    let mut interval = tokio::time::interval(driver.round_period);
    let mut failed_rounds = 0u32;
    for round in 0..driver.round_times {
        interval.tick().await;
        if handle.is_closed() {
            warn!(round, "session closed, stopping rounds");
            break;
        }
        *last_send.lock().expect("clock lock") = Instant::now();
        if let Err(err) = handle.purchase(&driver.basket_id, &driver.barcodes).await {
            failed_rounds += 1;
            error!(round, error = %err, "send failed");
            if driver.stop_on_error {
                break;
            }
        }
    }

    handle.close().await;
    let _ = loop_task.await;
    let _ = consumer.await;

    if failed_rounds > 0 {
        bail!("{failed_rounds} of {} rounds failed to send", driver.round_times);
    }
    Ok(())
}
