//! Go-Back-N send-side state machine.
//!
//! [`GbnSender`] owns an ordered list of pre-encoded DATA packets and a
//! sliding window over them.  Multiple packets may be outstanding at
//! once; a single retransmission timer covers the oldest one.
//!
//! # Protocol contract
//!
//! - At most `window_size` packets are in flight at once.
//! - ACKs are **cumulative**: ACK `k` retires every packet up to and
//!   including `k`.
//! - ACKs outside `base..next_to_send` are ignored; `base` never moves back.
//! - On timeout **every** outstanding packet from `base` onwards is resent
//!   (go back to N), and the timer is restarted.
//!
//! This module only manages state; all socket I/O is the caller's
//! responsibility.  Time is passed in explicitly so the whole state machine
//! can be driven deterministically.

use std::ops::Range;
use std::time::{Duration, Instant};

use crate::packet::{self, PacketError};
use crate::timer::RetransmitTimer;

// ---------------------------------------------------------------------------
// SenderState
// ---------------------------------------------------------------------------

/// Coarse phase of the sender, derived from the window counters.
///
/// ```text
///            window has room            window full / nothing new
///  SENDING ─────────────────▶ SENDING ───────────────────────────▶ WAITING
///     ▲                                                             │
///     └──────────────── ACK slides window / timeout ────────────────┘
///                                   │
///                       base == packet_count
///                                   ▼
///                                 IDLE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// Every packet acknowledged (or there was nothing to send).  Terminal.
    Idle,
    /// The window has room and unsent packets remain.
    Sending,
    /// Blocked on an ACK or the retransmission timeout.
    Waiting,
}

impl std::fmt::Display for SenderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Sending => "SENDING",
            Self::Waiting => "WAITING",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Window counters and the retransmission timer, kept together.
///
/// ```text
///      base          next_to_send      base + size
///       │                 │                 │
///  ─────┼─────────────────┼─────────────────┼──────▶ seq space
///       │ <── in flight ─▶│ <── sendable ──▶│
/// ```
#[derive(Debug, Clone)]
struct Window {
    /// Oldest unacknowledged sequence number.
    pub base: u32,
    /// Next sequence number never sent before.
    pub next_to_send: u32,
    /// N: maximum number of packets in flight.
    pub size: usize,
    /// Deadline for the packet at `base`; armed iff something is in flight.
    pub timer: RetransmitTimer,
}

impl Window {
    fn new(size: usize, rto: Duration) -> Self {
        Self {
            base: 0,
            next_to_send: 0,
            size,
            timer: RetransmitTimer::new(rto),
        }
    }

    pub fn in_flight(&self) -> usize {
        (self.next_to_send - self.base) as usize
    }

    pub fn has_room(&self) -> bool {
        self.in_flight() < self.size
    }
}

// ---------------------------------------------------------------------------
// Outcomes and counters
// ---------------------------------------------------------------------------

/// What an inbound datagram did to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The window slid forward; `retired` packets were newly acknowledged.
    Advanced { ack: u32, retired: u32 },
    /// ACK for a packet already retired (duplicate or late).
    Stale { ack: u32 },
    /// ACK for a packet that has not been sent yet.
    Premature { ack: u32 },
    /// A well-formed datagram that is not an ACK.
    NotAck,
    /// Shorter than a header.
    Malformed,
}

/// Running totals for one transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// First transmissions plus retransmissions.
    pub transmissions: u64,
    pub retransmissions: u64,
    pub timeouts: u64,
    /// ACKs that moved the window.
    pub acks_received: u64,
    /// Stale, premature, and non-ACK datagrams.
    pub ignored_acks: u64,
    /// Timeouts since the window last moved.
    pub consecutive_timeouts: u32,
}

// ---------------------------------------------------------------------------
// GbnSender
// ---------------------------------------------------------------------------

/// Go-Back-N send-side state for one transfer.
#[derive(Debug)]
pub struct GbnSender {
    packets: Vec<Vec<u8>>,
    count: u32,
    window: Window,
    stats: SenderStats,
}

impl GbnSender {
    /// Create a sender over `packets`, where `packets[i]` is the encoded
    /// DATA packet with sequence number `i`.
    ///
    /// `window_size` must be at least 1; a zero window is clamped to 1.
    /// Fails when there are more packets than sequence numbers.
    pub fn new(
        packets: Vec<Vec<u8>>,
        window_size: usize,
        rto: Duration,
    ) -> Result<Self, PacketError> {
        let count = packet::sequence_space(packets.len())?;
        Ok(Self {
            packets,
            count,
            window: Window::new(window_size.max(1), rto),
            stats: SenderStats::default(),
        })
    }

    pub fn stats(&self) -> SenderStats {
        self.stats
    }

    pub fn base(&self) -> u32 {
        self.window.base
    }

    pub fn next_to_send(&self) -> u32 {
        self.window.next_to_send
    }

    pub fn in_flight(&self) -> usize {
        self.window.in_flight()
    }

    pub fn packet_count(&self) -> u32 {
        self.count
    }

    /// Encoded bytes of packet `seq`, for (re)transmission.
    pub fn packet(&self, seq: u32) -> &[u8] {
        &self.packets[seq as usize]
    }

    pub fn is_done(&self) -> bool {
        self.window.base >= self.packet_count()
    }

    pub fn state(&self) -> SenderState {
        if self.is_done() {
            SenderState::Idle
        } else if self.window.has_room() && self.window.next_to_send < self.packet_count() {
            SenderState::Sending
        } else {
            SenderState::Waiting
        }
    }

    /// Release the next packet the window allows, if any.
    ///
    /// Call repeatedly until it returns `None`.  Arms the timer when the
    /// released packet is the oldest outstanding one.
    pub fn poll_transmit(&mut self, now: Instant) -> Option<(u32, &[u8])> {
        if self.state() != SenderState::Sending {
            return None;
        }

        let seq = self.window.next_to_send;
        if seq == self.window.base {
            self.window.timer.arm(now);
        }
        self.window.next_to_send += 1;
        self.stats.transmissions += 1;
        debug_assert!(self.window.in_flight() <= self.window.size);

        Some((seq, self.packets[seq as usize].as_slice()))
    }

    /// Decode a raw datagram from the receiver and apply it.
    pub fn on_datagram(&mut self, buf: &[u8], now: Instant) -> AckOutcome {
        let outcome = match packet::decode(buf) {
            Ok(pkt) if pkt.is_ack() => return self.on_ack(pkt.seq, now),
            Ok(_) => AckOutcome::NotAck,
            Err(_) => AckOutcome::Malformed,
        };
        self.stats.ignored_acks += 1;
        outcome
    }

    /// Apply a cumulative ACK for sequence number `ack`.
    pub fn on_ack(&mut self, ack: u32, now: Instant) -> AckOutcome {
        let w = &mut self.window;

        if ack < w.base {
            self.stats.ignored_acks += 1;
            return AckOutcome::Stale { ack };
        }
        if ack >= w.next_to_send {
            self.stats.ignored_acks += 1;
            return AckOutcome::Premature { ack };
        }

        let retired = ack + 1 - w.base;
        w.base = ack + 1;
        if w.base == w.next_to_send {
            w.timer.disarm();
        } else {
            w.timer.arm(now);
        }

        self.stats.acks_received += 1;
        self.stats.consecutive_timeouts = 0;
        AckOutcome::Advanced { ack, retired }
    }

    /// Deadline of the retransmission timer, if armed.
    pub fn poll_timeout(&self) -> Option<Instant> {
        self.window.timer.deadline()
    }

    /// How long the caller may block before [`on_timeout`](Self::on_timeout)
    /// is due; zero once overdue, `None` while nothing is in flight.
    pub fn poll_wait(&self, now: Instant) -> Option<Duration> {
        self.window.timer.remaining(now)
    }

    /// Fire the retransmission timer if it has expired.
    ///
    /// Returns the range of sequence numbers the caller must resend — the
    /// whole outstanding window — and restarts the timer.  Returns `None`
    /// when the timer is disarmed or not yet due.
    pub fn on_timeout(&mut self, now: Instant) -> Option<Range<u32>> {
        if !self.window.timer.expired(now) {
            return None;
        }

        let outstanding = self.window.base..self.window.next_to_send;
        let n = u64::from(outstanding.end - outstanding.start);
        self.window.timer.arm(now);

        self.stats.timeouts += 1;
        self.stats.consecutive_timeouts += 1;
        self.stats.retransmissions += n;
        self.stats.transmissions += n;
        Some(outstanding)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const RTO: Duration = Duration::from_millis(500);

    /// Helper: a sender over `n` one-byte packets.
    fn sender(n: u32, window: usize) -> GbnSender {
        let data: Vec<u8> = (0..n).map(|i| i as u8).collect();
        GbnSender::new(packet::segment(&data, 1).unwrap(), window, RTO).unwrap()
    }

    fn drain(s: &mut GbnSender, now: Instant) -> Vec<u32> {
        let mut sent = Vec::new();
        while let Some((seq, _)) = s.poll_transmit(now) {
            sent.push(seq);
        }
        sent
    }

    #[test]
    fn initial_state() {
        let s = sender(10, 4);
        assert_eq!(s.base(), 0);
        assert_eq!(s.next_to_send(), 0);
        assert_eq!(s.state(), SenderState::Sending);
        assert_eq!(s.poll_timeout(), None);
    }

    #[test]
    fn empty_transfer_is_idle() {
        let mut s = GbnSender::new(Vec::new(), 4, RTO).unwrap();
        assert!(s.is_done());
        assert_eq!(s.state(), SenderState::Idle);
        assert!(s.poll_transmit(Instant::now()).is_none());
    }

    #[test]
    fn fills_window_then_waits() {
        let now = Instant::now();
        let mut s = sender(10, 4);
        assert_eq!(drain(&mut s, now), vec![0, 1, 2, 3]);
        assert_eq!(s.in_flight(), 4);
        assert_eq!(s.state(), SenderState::Waiting);
        assert_eq!(s.poll_timeout(), Some(now + RTO));
    }

    #[test]
    fn transmitted_bytes_are_the_encoded_packet() {
        let now = Instant::now();
        let mut s = sender(3, 2);
        let (seq, bytes) = s.poll_transmit(now).unwrap();
        let pkt = packet::decode(bytes).unwrap();
        assert_eq!(seq, 0);
        assert_eq!(pkt.seq, 0);
        assert_eq!(pkt.payload, vec![0]);
    }

    #[test]
    fn window_smaller_than_transfer_remainder() {
        let now = Instant::now();
        let mut s = sender(3, 8);
        assert_eq!(drain(&mut s, now), vec![0, 1, 2]);
        assert_eq!(s.state(), SenderState::Waiting);
    }

    #[test]
    fn ack_slides_window_and_rearms_timer() {
        let t0 = Instant::now();
        let mut s = sender(10, 4);
        drain(&mut s, t0);

        let t1 = t0 + Duration::from_millis(100);
        assert_eq!(
            s.on_ack(0, t1),
            AckOutcome::Advanced { ack: 0, retired: 1 }
        );
        assert_eq!(s.base(), 1);
        assert_eq!(s.poll_timeout(), Some(t1 + RTO));
        assert_eq!(drain(&mut s, t1), vec![4]);
    }

    #[test]
    fn cumulative_ack_retires_several() {
        let now = Instant::now();
        let mut s = sender(10, 4);
        drain(&mut s, now);
        assert_eq!(
            s.on_ack(2, now),
            AckOutcome::Advanced { ack: 2, retired: 3 }
        );
        assert_eq!(s.in_flight(), 1);
    }

    #[test]
    fn ack_of_last_outstanding_disarms_timer() {
        let now = Instant::now();
        let mut s = sender(10, 4);
        drain(&mut s, now);
        s.on_ack(3, now);
        assert_eq!(s.in_flight(), 0);
        assert_eq!(s.poll_timeout(), None);
    }

    #[test]
    fn stale_ack_ignored_without_touching_timer() {
        let t0 = Instant::now();
        let mut s = sender(10, 4);
        drain(&mut s, t0);
        s.on_ack(1, t0);

        let later = t0 + Duration::from_millis(300);
        assert_eq!(s.on_ack(1, later), AckOutcome::Stale { ack: 1 });
        assert_eq!(s.on_ack(0, later), AckOutcome::Stale { ack: 0 });
        assert_eq!(s.base(), 2);
        assert_eq!(s.poll_timeout(), Some(t0 + RTO));
        assert_eq!(s.stats().ignored_acks, 2);
    }

    #[test]
    fn premature_ack_ignored() {
        let now = Instant::now();
        let mut s = sender(10, 4);
        drain(&mut s, now);
        assert_eq!(s.on_ack(4, now), AckOutcome::Premature { ack: 4 });
        assert_eq!(s.on_ack(1000, now), AckOutcome::Premature { ack: 1000 });
        assert_eq!(s.base(), 0);
    }

    #[test]
    fn data_and_malformed_datagrams_ignored() {
        let now = Instant::now();
        let mut s = sender(10, 4);
        drain(&mut s, now);
        let data = packet::encode_data(0, b"x", 1).unwrap();
        assert_eq!(s.on_datagram(&data, now), AckOutcome::NotAck);
        assert_eq!(s.on_datagram(&[0, 0, 0], now), AckOutcome::Malformed);
        assert_eq!(
            s.on_datagram(&packet::encode_ack(0), now),
            AckOutcome::Advanced { ack: 0, retired: 1 }
        );
    }

    #[test]
    fn timeout_resends_whole_outstanding_window() {
        let t0 = Instant::now();
        let mut s = sender(10, 4);
        drain(&mut s, t0);
        s.on_ack(1, t0);
        assert_eq!(drain(&mut s, t0), vec![4, 5]);

        assert_eq!(s.on_timeout(t0 + RTO - Duration::from_millis(1)), None);

        let fire = t0 + RTO;
        assert_eq!(s.on_timeout(fire), Some(2..6));
        assert_eq!(s.poll_timeout(), Some(fire + RTO));
        let stats = s.stats();
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.retransmissions, 4);
        assert_eq!(stats.consecutive_timeouts, 1);
    }

    #[test]
    fn wait_shrinks_towards_the_deadline() {
        let t0 = Instant::now();
        let mut s = sender(10, 4);
        assert_eq!(s.poll_wait(t0), None);

        drain(&mut s, t0);
        assert_eq!(s.poll_wait(t0), Some(RTO));
        assert_eq!(
            s.poll_wait(t0 + Duration::from_millis(200)),
            Some(Duration::from_millis(300))
        );
        assert_eq!(s.poll_wait(t0 + RTO * 2), Some(Duration::ZERO));

        s.on_ack(3, t0);
        assert_eq!(s.poll_wait(t0), None);
    }

    #[test]
    fn timeout_without_outstanding_packets_is_noop() {
        let now = Instant::now();
        let mut s = sender(10, 4);
        assert_eq!(s.on_timeout(now + RTO * 10), None);
        assert_eq!(s.stats().timeouts, 0);
    }

    #[test]
    fn progress_resets_consecutive_timeouts() {
        let t0 = Instant::now();
        let mut s = sender(10, 2);
        drain(&mut s, t0);
        s.on_timeout(t0 + RTO);
        s.on_timeout(t0 + RTO * 2);
        assert_eq!(s.stats().consecutive_timeouts, 2);
        s.on_ack(0, t0 + RTO * 2);
        assert_eq!(s.stats().consecutive_timeouts, 0);
    }

    #[test]
    fn completes_when_last_packet_acked() {
        let now = Instant::now();
        let mut s = sender(5, 8);
        drain(&mut s, now);
        s.on_ack(4, now);
        assert!(s.is_done());
        assert_eq!(s.state(), SenderState::Idle);
        assert_eq!(s.stats().transmissions, 5);
        assert_eq!(s.stats().retransmissions, 0);
    }

    #[test]
    fn zero_window_clamped_to_one() {
        let now = Instant::now();
        let mut s = sender(3, 0);
        assert_eq!(drain(&mut s, now), vec![0]);
    }

    #[test]
    fn state_display() {
        assert_eq!(SenderState::Waiting.to_string(), "WAITING");
    }
}
