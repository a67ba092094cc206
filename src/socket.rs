//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that owns
//! only byte I/O.  Decoding and every protocol decision live in the state
//! machines; a datagram is handed over exactly as it came off the wire.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

use crate::error::{Error, Result};

/// Largest datagram we are prepared to read.
const MAX_DATAGRAM: usize = 65_535;

#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after the OS assigns an
    /// ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
    buf: Vec<u8>,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self {
            local_addr,
            inner,
            buf: vec![0u8; MAX_DATAGRAM],
        })
    }

    pub async fn send_to(&self, datagram: &[u8], dest: SocketAddr) -> Result<()> {
        self.inner.send_to(datagram, dest).await?;
        Ok(())
    }

    /// Wait for the next datagram.  Returns `(bytes, sender_address)`.
    pub async fn recv_from(&mut self) -> Result<(Vec<u8>, SocketAddr)> {
        let (n, addr) = self.inner.recv_from(&mut self.buf).await?;
        Ok((self.buf[..n].to_vec(), addr))
    }

    /// Like [`recv_from`](Self::recv_from) but gives up after `wait`.
    ///
    /// An elapsed wait is `Ok(None)`: for the sender it is an ordinary
    /// control-flow signal, not an error.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Result<Option<(Vec<u8>, SocketAddr)>> {
        match timeout(wait, self.recv_from()).await {
            Ok(received) => received.map(Some),
            Err(_elapsed) => Ok(None),
        }
    }
}

/// Bind the wildcard address on `port` for both address families.
///
/// `[::]` is dual-stack on the usual platforms, so IPv4 senders arrive as
/// mapped addresses.  Hosts without IPv6 get `0.0.0.0` instead.
pub async fn bind_port(port: u16) -> Result<Socket> {
    match Socket::bind((Ipv6Addr::UNSPECIFIED, port).into()).await {
        Ok(socket) => Ok(socket),
        Err(e) => {
            log::debug!("[socket] no IPv6 wildcard on port {port} ({e}), using IPv4");
            Socket::bind((Ipv4Addr::UNSPECIFIED, port).into()).await
        }
    }
}

/// Resolve `host:port`, preferring an IPv4 address when there are several.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    pick_address(lookup_host((host, port)).await?)
        .ok_or_else(|| Error::Resolve(format!("{host}:{port}")))
}

fn pick_address(addrs: impl IntoIterator<Item = SocketAddr>) -> Option<SocketAddr> {
    let mut first = None;
    for addr in addrs {
        if addr.is_ipv4() {
            return Some(addr);
        }
        first.get_or_insert(addr);
    }
    first
}

/// Receive errors that say nothing about our own socket, such as ICMP
/// port-unreachable noise surfacing on the next read.
pub fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused | ErrorKind::Interrupted
    )
}
