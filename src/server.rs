//! Receiving side: drain a UDP socket through a [`GbnReceiver`] into an
//! output sink.
//!
//! There is no end-of-transfer signal in the protocol, so a [`Server`] runs
//! until its shutdown future resolves (Ctrl-C in the binary).  The sink is
//! flushed after every accepted payload and once more on shutdown, so an
//! interrupted transfer leaves a clean prefix of the file on disk.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;

use log::Level;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::ReceiverConfig;
use crate::error::{Error, Result};
use crate::gbn_receiver::{Delivery, GbnReceiver, ReceiverStats};
use crate::packet;
use crate::simulator::LossModel;
use crate::socket::{self, is_transient, Socket};

/// Bind the wildcard address on `port` (see [`socket::bind_port`]) and write everything received to `output` until
/// `shutdown` resolves.
pub async fn receive_file<F>(
    port: u16,
    output: impl AsRef<Path>,
    config: &ReceiverConfig,
    shutdown: F,
) -> Result<ReceiverStats>
where
    F: Future<Output = ()>,
{
    config.validate()?;
    let loss = config.loss_model()?;
    let socket = socket::bind_port(port).await?;
    let file = File::create(output.as_ref()).await?;

    log::info!(
        "Listening on port {}, writing to '{}', loss={}",
        socket.local_addr.port(),
        output.as_ref().display(),
        config.loss_probability
    );
    let mut server = Server::new(socket, loss, file);
    server.run(shutdown).await
}

/// A receiver bound to one socket and writing to one sink.
#[derive(Debug)]
pub struct Server<L, W> {
    socket: Socket,
    receiver: GbnReceiver<L>,
    sink: W,
}

impl<L, W> Server<L, W>
where
    L: LossModel,
    W: AsyncWrite + Unpin,
{
    pub fn new(socket: Socket, loss: L, sink: W) -> Self {
        Self {
            socket,
            receiver: GbnReceiver::new(loss),
            sink,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    /// Give back the output sink, e.g. to inspect an in-memory buffer.
    pub fn into_sink(self) -> W {
        self.sink
    }

    /// Serve datagrams until `shutdown` resolves, then flush the sink.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<ReceiverStats>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                received = self.socket.recv_from() => match received {
                    Ok((bytes, from)) => self.on_datagram(&bytes, from).await?,
                    // ICMP noise from a vanished peer surfaces on some
                    // platforms as a failed read; it says nothing about us.
                    Err(Error::Io(e)) if is_transient(e.kind()) => {
                        log::debug!("[server] transient receive error: {e}");
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        self.sink.flush().await?;
        let stats = self.receiver.stats();
        log::info!(
            "Shutting down: {} packets ({} bytes) accepted, {} lost",
            stats.accepted,
            stats.bytes,
            stats.lost
        );
        Ok(stats)
    }

    async fn on_datagram(&mut self, bytes: &[u8], from: SocketAddr) -> Result<()> {
        let delivery = self.receiver.on_datagram(bytes);
        let level = log_level(&delivery);

        match &delivery {
            Delivery::Accepted { seq, payload } => {
                self.sink.write_all(payload).await?;
                self.sink.flush().await?;
                log::log!(
                    level,
                    "Packet accepted, sequence number = {seq}, {} bytes",
                    payload.len()
                );
            }
            Delivery::Lost { seq } => log::log!(level, "Packet loss, sequence number = {seq}"),
            Delivery::OutOfOrder { seq, .. } => {
                log::log!(
                    level,
                    "Out-of-order packet, sequence number = {seq}, expected = {}",
                    self.receiver.expected()
                );
            }
            Delivery::Corrupt { seq } => log::debug!("[server] ← seq={seq} failed checksum"),
            Delivery::Malformed => log::debug!("[server] ← {}-byte runt from {from}", bytes.len()),
        }

        if let Some(ack) = delivery.ack() {
            // A failed ACK send is just another lost ACK.
            if let Err(e) = self.socket.send_to(&packet::encode_ack(ack), from).await {
                log::warn!("[server] → ACK seq={ack} to {from} failed: {e}");
            } else {
                log::debug!("[server] → ACK seq={ack}");
            }
        }
        Ok(())
    }
}

/// Accepted, lost and out-of-order packets are part of the operator's view
/// of a transfer; damaged datagrams are diagnostics.
fn log_level(delivery: &Delivery) -> Level {
    match delivery {
        Delivery::Accepted { .. } | Delivery::Lost { .. } | Delivery::OutOfOrder { .. } => {
            Level::Info
        }
        Delivery::Corrupt { .. } | Delivery::Malformed => Level::Debug,
    }
}
