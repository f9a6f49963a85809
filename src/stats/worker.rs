//! Buffered statsd-line writer.
//!
//! # Responsibilities
//! - Drain the event queue into a line buffer
//! - Flush on a period, when the buffer fills, and at shutdown
//! - Keep the wire best-effort: send errors log, drop and redial later
//!
//! # Design Decisions
//! - The connection is opened lazily and kept until a send fails
//! - Payloads stay under a single non-jumbo datagram for UDP
//! - A flush period of 0 disables the ticker entirely

use std::io;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::time::{self, Interval};

use crate::config::schema::split_host_port;
use crate::config::{StatsNetwork, StatsSettings};
use crate::lifecycle::Shutdown;

/// Largest payload sent in one flush. Fits a 1500-byte MTU with IP and
/// UDP headers to spare.
const MAX_PAYLOAD: usize = 1432;

/// A single measurement in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Count { bucket: String, delta: i64 },
    Timing { bucket: String, millis: u64 },
}

/// Owns the buffer and the wire side of the stats sink.
pub struct StatsWorker {
    settings: StatsSettings,
    rx: mpsc::Receiver<Event>,
    buffer: String,
    transport: Option<Transport>,
}

impl StatsWorker {
    pub(crate) fn new(settings: StatsSettings, rx: mpsc::Receiver<Event>) -> Self {
        Self {
            settings,
            rx,
            buffer: String::new(),
            transport: None,
        }
    }

    /// Run until shutdown triggers or every client handle is dropped.
    /// Pending events are drained and flushed before returning.
    pub async fn run(mut self, shutdown: Shutdown) {
        tracing::debug!(
            network = %self.settings.network,
            address = %self.settings.address,
            period_ms = self.settings.flush_period_ms,
            "Stats worker starting"
        );

        let mut ticker = self.settings.flush_interval().map(time::interval);
        loop {
            tokio::select! {
                event = self.rx.recv() => match event {
                    Some(event) => self.buffer_event(event).await,
                    None => break,
                },
                _ = tick(ticker.as_mut()) => self.flush().await,
                _ = shutdown.triggered() => break,
            }
        }

        while let Ok(event) = self.rx.try_recv() {
            self.buffer_event(event).await;
        }
        self.flush().await;
        tracing::debug!("Stats worker stopped");
    }

    /// Append one formatted line, flushing first when it would not fit.
    async fn buffer_event(&mut self, event: Event) {
        let line = match event {
            Event::Count { bucket, delta } => {
                format!("{}.{}:{}|c", self.settings.prefix, bucket, delta)
            }
            Event::Timing { bucket, millis } => {
                format!("{}.{}:{}|ms", self.settings.prefix, bucket, millis)
            }
        };
        if line.len() > MAX_PAYLOAD {
            tracing::warn!(length = line.len(), "Dropping oversized stats line");
            return;
        }
        let separator = if self.buffer.is_empty() { 0 } else { 1 };
        if self.buffer.len() + separator + line.len() > MAX_PAYLOAD {
            self.flush().await;
        }
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(&line);
    }

    /// Send the buffered lines, if any. A send error drops the payload
    /// and the connection; the next flush redials.
    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let payload = std::mem::take(&mut self.buffer);
        if self.transport.is_none() {
            match Transport::connect(self.settings.network, &self.settings.address).await {
                Ok(transport) => self.transport = Some(transport),
                Err(err) => {
                    tracing::debug!(
                        error = %err,
                        address = %self.settings.address,
                        "Stats collector unreachable, dropping payload"
                    );
                    return;
                }
            }
        }
        if let Some(transport) = self.transport.as_mut() {
            if let Err(err) = transport.send(payload.as_bytes()).await {
                tracing::debug!(error = %err, "Stats send failed, dropping payload");
                self.transport = None;
            }
        }
    }
}

async fn tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Connected socket to the collector.
enum Transport {
    Udp(UdpSocket),
    Tcp(TcpStream),
}

impl Transport {
    async fn connect(network: StatsNetwork, address: &str) -> io::Result<Self> {
        let target = dial_addr(address)?;
        match network {
            StatsNetwork::Udp => {
                let socket = UdpSocket::bind("0.0.0.0:0").await?;
                socket.connect(target.as_str()).await?;
                Ok(Transport::Udp(socket))
            }
            StatsNetwork::Tcp => {
                let stream = TcpStream::connect(target.as_str()).await?;
                Ok(Transport::Tcp(stream))
            }
        }
    }

    async fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        match self {
            Transport::Udp(socket) => {
                socket.send(payload).await?;
            }
            Transport::Tcp(stream) => {
                stream.write_all(payload).await?;
                stream.write_all(b"\n").await?;
            }
        }
        Ok(())
    }
}

/// Dial target for the collector; an empty host means loopback.
fn dial_addr(address: &str) -> io::Result<String> {
    let (host, port) =
        split_host_port(address).map_err(|reason| io::Error::new(io::ErrorKind::InvalidInput, reason))?;
    if host.is_empty() {
        Ok(format!("127.0.0.1:{}", port))
    } else {
        Ok(address.to_string())
    }
}
