//! Sending side: drive a [`GbnSender`] over a UDP socket until every packet
//! is acknowledged.
//!
//! ```ignore
//! let peer = socket::resolve("127.0.0.1", 7735).await?;
//! let report = client::send_file("input.bin", peer, &SenderConfig::new(64, 500)).await?;
//! println!("{} retransmissions in {:?}", report.retransmissions, report.elapsed);
//! ```
//!
//! One loop iteration mirrors the protocol steps:
//! 1. release every packet the window allows,
//! 2. wait for a datagram, at most until the retransmission deadline,
//! 3. apply it if it is an ACK from the peer,
//! 4. on an expired timer resend the whole outstanding window.

use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::config::SenderConfig;
use crate::error::{Error, Result};
use crate::gbn_sender::{AckOutcome, GbnSender};
use crate::packet;
use crate::socket::{is_transient, Socket};

/// Summary of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferReport {
    pub packets: u32,
    /// Payload bytes delivered (headers excluded).
    pub bytes: u64,
    pub elapsed: Duration,
    pub transmissions: u64,
    pub retransmissions: u64,
    pub timeouts: u64,
    pub acks_received: u64,
    pub ignored_acks: u64,
}

impl TransferReport {
    /// Goodput in bytes per second; zero for an instantaneous transfer.
    pub fn throughput_bps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / secs
        } else {
            0.0
        }
    }
}

/// Read `path` and send its contents to `peer`.
pub async fn send_file(
    path: impl AsRef<Path>,
    peer: SocketAddr,
    config: &SenderConfig,
) -> Result<TransferReport> {
    let path = path.as_ref();
    let data = tokio::fs::read(path).await?;
    log::info!("Loaded '{}': {} bytes", path.display(), data.len());
    send_bytes(&data, peer, config).await
}

/// Send `data` to `peer` from an ephemeral local port.
pub async fn send_bytes(
    data: &[u8],
    peer: SocketAddr,
    config: &SenderConfig,
) -> Result<TransferReport> {
    let local: SocketAddr = if peer.is_ipv4() {
        ([0u8; 4], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };
    let socket = Socket::bind(local).await?;
    Client::new(socket, peer, config.clone())?.transfer(data).await
}

/// A sender bound to one socket and one receiver address.
#[derive(Debug)]
pub struct Client {
    socket: Socket,
    peer: SocketAddr,
    config: SenderConfig,
}

impl Client {
    pub fn new(socket: Socket, peer: SocketAddr, config: SenderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            socket,
            peer,
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    /// Segment `data` by the configured MSS and transfer it.
    pub async fn transfer(&mut self, data: &[u8]) -> Result<TransferReport> {
        let packets = packet::segment(data, self.config.mss)?;
        log::info!(
            "Sending {} bytes in {} packets to {}, window={}",
            data.len(),
            packets.len(),
            self.peer,
            self.config.window_size
        );

        let mut sender = GbnSender::new(packets, self.config.window_size, self.config.rto)?;
        let started = Instant::now();
        self.run(&mut sender).await?;

        let stats = sender.stats();
        let report = TransferReport {
            packets: sender.packet_count(),
            bytes: data.len() as u64,
            elapsed: started.elapsed(),
            transmissions: stats.transmissions,
            retransmissions: stats.retransmissions,
            timeouts: stats.timeouts,
            acks_received: stats.acks_received,
            ignored_acks: stats.ignored_acks,
        };
        log::info!(
            "Done: {:.3}s, {} retransmissions",
            report.elapsed.as_secs_f64(),
            report.retransmissions
        );
        Ok(report)
    }

    /// Drive `sender` until it is idle.
    pub async fn run(&mut self, sender: &mut GbnSender) -> Result<()> {
        while !sender.is_done() {
            while let Some((seq, bytes)) = sender.poll_transmit(Instant::now()) {
                self.socket.send_to(bytes, self.peer).await?;
                log::debug!("[client] → DATA seq={seq}");
            }

            log::trace!(
                "[client] {} base={} next={}",
                sender.state(),
                sender.base(),
                sender.next_to_send()
            );

            let wait = sender.poll_wait(Instant::now()).unwrap_or(self.config.rto);

            match self.socket.recv_timeout(wait).await {
                Ok(Some((bytes, from))) if from == self.peer => apply_datagram(sender, &bytes),
                Ok(Some((_, from))) => {
                    log::debug!("[client] ignoring datagram from stranger {from}");
                }
                Ok(None) => {}
                // A receiver that is not up yet can bounce an ICMP error
                // back; the timer retransmits as for any lost ACK.
                Err(Error::Io(e)) if is_transient(e.kind()) => {
                    log::debug!("[client] transient receive error: {e}");
                }
                Err(e) => return Err(e),
            }

            self.check_timeout(sender).await?;
        }
        Ok(())
    }

    async fn check_timeout(&mut self, sender: &mut GbnSender) -> Result<()> {
        let Some(outstanding) = sender.on_timeout(Instant::now()) else {
            return Ok(());
        };

        log::warn!("Timeout, sequence number = {}", outstanding.start);
        let timeouts = sender.stats().consecutive_timeouts;
        if let Some(limit) = self.config.max_timeouts {
            if timeouts > limit {
                return Err(Error::TooManyTimeouts {
                    base: sender.base(),
                    timeouts,
                });
            }
        }

        log::debug!(
            "[client] retransmitting {} packet(s) from seq={}",
            outstanding.len(),
            outstanding.start
        );
        for seq in outstanding {
            self.socket.send_to(sender.packet(seq), self.peer).await?;
        }
        Ok(())
    }
}

fn apply_datagram(sender: &mut GbnSender, bytes: &[u8]) {
    match sender.on_datagram(bytes, Instant::now()) {
        AckOutcome::Advanced { ack, retired } => {
            log::debug!(
                "[client] ← ACK seq={ack} retired={retired} base={} in_flight={}",
                sender.base(),
                sender.in_flight()
            );
        }
        AckOutcome::Stale { ack } => log::debug!("[client] ← stale ACK seq={ack}"),
        AckOutcome::Premature { ack } => log::debug!("[client] ← premature ACK seq={ack}"),
        AckOutcome::NotAck => log::debug!("[client] ← non-ACK datagram ignored"),
        AckOutcome::Malformed => log::debug!("[client] ← malformed datagram ignored"),
    }
}
