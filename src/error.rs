//! Crate-wide error type.

use thiserror::Error;

use crate::packet::PacketError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Socket or file I/O failure. A read timeout is never reported here.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The sender gave up after too many consecutive timeouts at one `base`.
    #[error("transfer aborted after {timeouts} consecutive timeouts at sequence number {base}")]
    TooManyTimeouts { base: u32, timeouts: u32 },

    #[error("cannot resolve {0}")]
    Resolve(String),
}
