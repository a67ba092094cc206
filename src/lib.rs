//! `gbn-ftp` — reliable, ordered file transfer over UDP using Go-Back-N ARQ.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────┐   DATA (seq, checksum)   ┌────────────────┐
//!  │    Client    │─────────────────────────▶│     Server     │
//!  │  GbnSender   │                          │  LossModel     │
//!  │  window+timer│◀─────────────────────────│  GbnReceiver   │
//!  └──────┬───────┘     cumulative ACKs      └───────┬────────┘
//!         │                                          │
//!  ┌──────▼──────────────────────────────────────────▼────────┐
//!  │          Socket  (thin async wrapper around UdpSocket)   │
//!  └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]       — wire format, Internet checksum, segmentation
//! - [`gbn_sender`]   — GBN sliding-window state machine (no I/O)
//! - [`gbn_receiver`] — GBN in-order delivery state machine (no I/O)
//! - [`timer`]        — the single retransmission deadline
//! - [`simulator`]    — injectable, seedable channel-loss models
//! - [`socket`]       — async UDP socket abstraction
//! - [`client`]       — drives a sender over a socket to completion
//! - [`server`]       — drives a receiver over a socket into a sink
//! - [`config`]       — endpoint settings and validation
//! - [`error`]        — crate error type

pub mod client;
pub mod config;
pub mod error;
pub mod gbn_receiver;
pub mod gbn_sender;
pub mod packet;
pub mod server;
pub mod simulator;
pub mod socket;
pub mod timer;

pub use client::{send_bytes, send_file, Client, TransferReport};
pub use config::{ReceiverConfig, SenderConfig};
pub use error::{Error, Result};
pub use server::{receive_file, Server};
