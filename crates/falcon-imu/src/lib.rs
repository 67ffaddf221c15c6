pub mod protocol;
pub mod types;

use anyhow::{bail, Result};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

pub use protocol::{PacketFormat, ProtocolError};
pub use types::{Axis, RawSample};

/// Largest datagram we accept. JSON packets from phone apps stay well below this.
const MAX_DATAGRAM_LEN: usize = 2048;

/// UDP listener for the accelerometer.
///
/// Binds a socket, parses every datagram on a background task, and queues
/// the decoded samples on a bounded channel read through [`SampleStream`].
pub struct ImuClient {
    local_addr: SocketAddr,
    _task: tokio::task::JoinHandle<()>,
}

impl ImuClient {
    /// Bind the sensor socket and start receiving.
    pub async fn bind(
        addr: SocketAddr,
        format: PacketFormat,
        queue_capacity: usize,
    ) -> Result<(Self, SampleStream)> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        tracing::info!(%local_addr, ?format, "Listening for accelerometer packets");

        let (sample_tx, sample_rx) = mpsc::channel(queue_capacity.max(1));
        let task = tokio::spawn(imu_read_loop(socket, format, sample_tx));

        Ok((
            Self {
                local_addr,
                _task: task,
            },
            SampleStream::new(sample_rx),
        ))
    }

    /// Address the socket is actually bound to (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Background task: receive datagrams, parse, queue samples.
async fn imu_read_loop(
    socket: UdpSocket,
    format: PacketFormat,
    sample_tx: mpsc::Sender<RawSample>,
) {
    let mut buf = [0u8; MAX_DATAGRAM_LEN];
    let mut sample_count: u64 = 0;

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((n, peer)) => match format.parse(&buf[..n]) {
                Ok(sample) => match sample_tx.try_send(sample) {
                    Ok(()) => {
                        sample_count += 1;
                        if sample_count % 1000 == 0 {
                            tracing::debug!(sample_count, "Accelerometer packets received");
                        }
                    }
                    Err(TrySendError::Full(_)) => {
                        tracing::trace!("Sample queue full, dropping packet");
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!("Sample receiver dropped, reader exiting");
                        break;
                    }
                },
                Err(e) => {
                    tracing::trace!(?e, %peer, len = n, "Skipping malformed packet");
                }
            },
            Err(e) => {
                tracing::error!(?e, "Accelerometer UDP receive error");
                break;
            }
        }
    }
}

/// Consumer side of the sample queue.
///
/// Two buffering policies are offered: take every sample in order
/// (calibration), or keep only the newest queued sample each tick
/// (real-time recording).
pub struct SampleStream {
    rx: mpsc::Receiver<RawSample>,
}

impl SampleStream {
    pub fn new(rx: mpsc::Receiver<RawSample>) -> Self {
        Self { rx }
    }

    /// Wait for the next sample. `None` once the reader task has exited.
    pub async fn next(&mut self) -> Option<RawSample> {
        self.rx.recv().await
    }

    /// Blocking variant of [`next`](Self::next). Must not be called from
    /// inside an async context; use `spawn_blocking`.
    pub fn blocking_next(&mut self) -> Option<RawSample> {
        self.rx.blocking_recv()
    }

    /// Discard everything currently queued. Returns the number dropped.
    pub fn flush(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }

    /// Latest-packet-wins: drain the queue and return only the newest sample.
    pub fn drain_latest(&mut self) -> Option<RawSample> {
        let mut newest = None;
        loop {
            match self.rx.try_recv() {
                Ok(sample) => newest = Some(sample),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        newest
    }

    /// Drop stale samples, then block until `count` fresh ones have arrived.
    pub fn collect_batch(&mut self, count: usize) -> Result<Vec<RawSample>> {
        let stale = self.flush();
        if stale > 0 {
            tracing::debug!(stale, "Flushed stale samples before batch");
        }

        let mut batch = Vec::with_capacity(count);
        while batch.len() < count {
            match self.blocking_next() {
                Some(sample) => batch.push(sample),
                None => bail!(
                    "Accelerometer stream closed after {} of {} samples",
                    batch.len(),
                    count
                ),
            }
        }
        Ok(batch)
    }
}
