//! Wire-format definitions for Go-Back-N segments.
//!
//! Every datagram exchanged between sender and receiver is a [`Packet`].
//! This module is responsible for:
//! - Defining the on-wire binary layout (header fields, flags, payload).
//! - Encoding DATA and ACK packets into byte buffers ready for transmission.
//! - Decoding a raw byte slice back into a [`Packet`].
//! - Computing and verifying the RFC 1071 Internet checksum.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           Checksum            |             Flags             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Payload (DATA only) ...                   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total header size: [`HEADER_LEN`] = 8 bytes.
//! The checksum covers the payload only and is zero for ACK packets.

use thiserror::Error;

/// Values of the 16-bit `flags` header field.
///
/// The two patterns are bit complements of each other, so a single flipped
/// bit can never turn one into the other.
pub mod flags {
    /// Segment carries file data (`0101 0101 0101 0101`).
    pub const DATA: u16 = 0x5555;
    /// Segment acknowledges a data sequence number (`1010 1010 1010 1010`).
    pub const ACK: u16 = 0xAAAA;
}

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 8;

// Byte offsets of each field within the serialised header.
const OFF_SEQ: usize = 0;
const OFF_CHECKSUM: usize = 4;
const OFF_FLAGS: usize = 6;

/// A decoded datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Data segment number, or the number being acknowledged.
    pub seq: u32,
    /// Checksum as carried on the wire (not verified by [`decode`]).
    pub checksum: u16,
    /// One of the [`flags`] constants, or garbage if the packet is damaged.
    pub flags: u16,
    pub payload: Vec<u8>,
}

impl Packet {
    /// `true` when the flags field reads exactly [`flags::DATA`].
    pub fn is_data(&self) -> bool {
        self.flags == flags::DATA
    }

    /// `true` when the flags field reads exactly [`flags::ACK`].
    pub fn is_ack(&self) -> bool {
        self.flags == flags::ACK
    }
}

/// Errors that can arise when building or parsing a datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Buffer shorter than the fixed header size.
    #[error("malformed packet: {len} bytes is shorter than the 8-byte header")]
    Malformed { len: usize },
    /// Payload does not fit into one segment.
    #[error("payload of {len} bytes exceeds the MSS of {mss} bytes")]
    PayloadTooLarge { len: usize, mss: usize },
    #[error("MSS must be at least one byte")]
    ZeroMss,
    /// More segments than 32-bit sequence numbers can tell apart.
    #[error("{count} segments exceed the 32-bit sequence number space")]
    TooManySegments { count: usize },
}

fn write_header(buf: &mut [u8], seq: u32, checksum: u16, flags: u16) {
    buf[OFF_SEQ..OFF_SEQ + 4].copy_from_slice(&seq.to_be_bytes());
    buf[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&checksum.to_be_bytes());
    buf[OFF_FLAGS..OFF_FLAGS + 2].copy_from_slice(&flags.to_be_bytes());
}

/// Build a DATA segment: header followed by `payload`.
///
/// Fails if `payload` is longer than `mss`; respecting the MSS when
/// segmenting is the caller's job, this is only the last line of defence.
pub fn encode_data(seq: u32, payload: &[u8], mss: usize) -> Result<Vec<u8>, PacketError> {
    if payload.len() > mss {
        return Err(PacketError::PayloadTooLarge {
            len: payload.len(),
            mss,
        });
    }

    let mut buf = vec![0u8; HEADER_LEN + payload.len()];
    write_header(&mut buf, seq, internet_checksum(payload), flags::DATA);
    buf[HEADER_LEN..].copy_from_slice(payload);
    Ok(buf)
}

/// Build an ACK for `seq`. The checksum field is always zero.
pub fn encode_ack(seq: u32) -> Vec<u8> {
    let mut buf = vec![0u8; HEADER_LEN];
    write_header(&mut buf, seq, 0, flags::ACK);
    buf
}

/// Parse a raw datagram.
///
/// Only the length is checked here: anything with a full header decodes,
/// whatever its flags or checksum say. Use [`verify`] before trusting a
/// DATA payload.
pub fn decode(buf: &[u8]) -> Result<Packet, PacketError> {
    if buf.len() < HEADER_LEN {
        return Err(PacketError::Malformed { len: buf.len() });
    }

    let seq = u32::from_be_bytes([
        buf[OFF_SEQ],
        buf[OFF_SEQ + 1],
        buf[OFF_SEQ + 2],
        buf[OFF_SEQ + 3],
    ]);
    let checksum = u16::from_be_bytes([buf[OFF_CHECKSUM], buf[OFF_CHECKSUM + 1]]);
    let flags = u16::from_be_bytes([buf[OFF_FLAGS], buf[OFF_FLAGS + 1]]);

    Ok(Packet {
        seq,
        checksum,
        flags,
        payload: buf[HEADER_LEN..].to_vec(),
    })
}

/// Check a decoded packet's integrity.
///
/// - DATA: the stored checksum must match one recomputed over the payload.
/// - ACK: always valid; the checksum field is defined as zero and unused.
/// - Anything else: invalid, since the flags themselves are damaged.
pub fn verify(packet: &Packet) -> bool {
    match packet.flags {
        flags::DATA => internet_checksum(&packet.payload) == packet.checksum,
        flags::ACK => true,
        _ => false,
    }
}

/// Split `data` into encoded DATA segments of at most `mss` payload bytes,
/// numbered from 0.
///
/// An empty buffer yields no segments.
pub fn segment(data: &[u8], mss: usize) -> Result<Vec<Vec<u8>>, PacketError> {
    if mss == 0 {
        return Err(PacketError::ZeroMss);
    }
    sequence_space(data.len().div_ceil(mss))?;
    (0u32..)
        .zip(data.chunks(mss))
        .map(|(seq, chunk)| encode_data(seq, chunk, mss))
        .collect()
}

/// Check that `count` segments can be numbered `0..count` without reusing a
/// sequence number, and return `count` as a sequence number.
pub fn sequence_space(count: usize) -> Result<u32, PacketError> {
    u32::try_from(count).map_err(|_| PacketError::TooManySegments { count })
}

/// Compute the Internet checksum (RFC 1071) over `data`.
///
/// Sum consecutive 16-bit big-endian words, folding the carry back in after
/// every addition, and return the one's complement.  An odd trailing byte is
/// padded with a zero byte on the right.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut words = data.chunks_exact(2);

    for word in &mut words {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
        sum = (sum & 0xffff) + (sum >> 16);
    }
    if let Some(&last) = words.remainder().first() {
        sum += u32::from(last) << 8;
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}
