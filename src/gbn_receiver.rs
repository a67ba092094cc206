//! Go-Back-N receive-side state machine.
//!
//! [`GbnReceiver`] implements the receiver side of Go-Back-N:
//!
//! - Only **in-order** packets are accepted (`seq == expected`).
//! - Nothing is buffered ahead of `expected`; out-of-order and duplicate
//!   packets are discarded and answered with the last cumulative ACK.
//! - Malformed, lost, and corrupt datagrams are discarded silently and get
//!   no answer at all; the sender's timeout recovers them.
//! - Before the first packet is accepted there is no cumulative ACK to
//!   repeat, so out-of-order packets at that point go unanswered.
//!
//! The channel's loss decision is made here, through an injected
//! [`LossModel`], so tests can script exactly which datagrams disappear.
//!
//! This module only manages state; all socket I/O is the caller's
//! responsibility.

use crate::packet;
use crate::simulator::LossModel;

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// What became of one inbound datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Shorter than a header.
    Malformed,
    /// Dropped by the channel model.
    Lost { seq: u32 },
    /// Checksum or flags did not verify.
    Corrupt { seq: u32 },
    /// In order: append `payload` to the output and acknowledge `seq`.
    Accepted { seq: u32, payload: Vec<u8> },
    /// Not the expected packet.  `ack` repeats the last cumulative ACK, or
    /// is `None` when nothing has been accepted yet.
    OutOfOrder { seq: u32, ack: Option<u32> },
}

impl Delivery {
    /// Sequence number to acknowledge in response, if any.
    pub fn ack(&self) -> Option<u32> {
        match self {
            Self::Accepted { seq, .. } => Some(*seq),
            Self::OutOfOrder { ack, .. } => *ack,
            _ => None,
        }
    }
}

/// Running totals for one receiver session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub accepted: u64,
    /// Payload bytes handed to the output.
    pub bytes: u64,
    pub lost: u64,
    pub corrupt: u64,
    pub malformed: u64,
    pub out_of_order: u64,
    pub acks_sent: u64,
}

// ---------------------------------------------------------------------------
// GbnReceiver
// ---------------------------------------------------------------------------

/// Go-Back-N receive-side state for one session.
#[derive(Debug)]
pub struct GbnReceiver<L> {
    /// Next sequence number the receiver will accept.
    expected: u32,
    loss: L,
    stats: ReceiverStats,
}

impl<L: LossModel> GbnReceiver<L> {
    pub fn new(loss: L) -> Self {
        Self {
            expected: 0,
            loss,
            stats: ReceiverStats::default(),
        }
    }

    pub fn expected(&self) -> u32 {
        self.expected
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    pub fn loss_model(&self) -> &L {
        &self.loss
    }

    /// Process one raw datagram.
    ///
    /// Order of checks: header length, channel loss, integrity, sequence.
    /// Only an in-order, verified DATA packet advances `expected`.
    pub fn on_datagram(&mut self, buf: &[u8]) -> Delivery {
        let pkt = match packet::decode(buf) {
            Ok(pkt) => pkt,
            Err(_) => {
                self.stats.malformed += 1;
                return Delivery::Malformed;
            }
        };

        if self.loss.should_drop() {
            self.stats.lost += 1;
            return Delivery::Lost { seq: pkt.seq };
        }

        if !pkt.is_data() || !packet::verify(&pkt) {
            self.stats.corrupt += 1;
            return Delivery::Corrupt { seq: pkt.seq };
        }

        let delivery = if pkt.seq == self.expected {
            self.expected += 1;
            self.stats.accepted += 1;
            self.stats.bytes += pkt.payload.len() as u64;
            Delivery::Accepted {
                seq: pkt.seq,
                payload: pkt.payload,
            }
        } else {
            self.stats.out_of_order += 1;
            Delivery::OutOfOrder {
                seq: pkt.seq,
                ack: self.expected.checked_sub(1),
            }
        };

        if delivery.ack().is_some() {
            self.stats.acks_sent += 1;
        }
        delivery
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{encode_ack, encode_data};
    use crate::simulator::{NoLoss, Scripted};

    fn data(seq: u32, payload: &[u8]) -> Vec<u8> {
        encode_data(seq, payload, 64).unwrap()
    }

    #[test]
    fn initial_state() {
        let r = GbnReceiver::new(NoLoss);
        assert_eq!(r.expected(), 0);
        assert_eq!(r.stats(), ReceiverStats::default());
    }

    #[test]
    fn in_order_packet_accepted_and_acked() {
        let mut r = GbnReceiver::new(NoLoss);
        let d = r.on_datagram(&data(0, b"hello"));
        assert_eq!(
            d,
            Delivery::Accepted {
                seq: 0,
                payload: b"hello".to_vec()
            }
        );
        assert_eq!(d.ack(), Some(0));
        assert_eq!(r.expected(), 1);
        assert_eq!(r.stats().bytes, 5);
    }

    #[test]
    fn out_of_order_before_first_accept_is_silent() {
        let mut r = GbnReceiver::new(NoLoss);
        let d = r.on_datagram(&data(3, b"early"));
        assert_eq!(d, Delivery::OutOfOrder { seq: 3, ack: None });
        assert_eq!(d.ack(), None);
        assert_eq!(r.expected(), 0);
        assert_eq!(r.stats().acks_sent, 0);
    }

    #[test]
    fn out_of_order_repeats_last_cumulative_ack() {
        let mut r = GbnReceiver::new(NoLoss);
        for seq in 0..3 {
            r.on_datagram(&data(seq, b"x"));
        }
        // 3 went missing; 4 arrives.
        let d = r.on_datagram(&data(4, b"x"));
        assert_eq!(d.ack(), Some(2));
        assert_eq!(r.expected(), 3);
    }

    #[test]
    fn duplicate_is_reacked_not_redelivered() {
        let mut r = GbnReceiver::new(NoLoss);
        r.on_datagram(&data(0, b"a"));
        r.on_datagram(&data(1, b"b"));
        let d = r.on_datagram(&data(0, b"a"));
        assert_eq!(d, Delivery::OutOfOrder { seq: 0, ack: Some(1) });
        assert_eq!(r.stats().accepted, 2);
    }

    #[test]
    fn malformed_datagram_discarded() {
        let mut r = GbnReceiver::new(Scripted::new([]));
        assert_eq!(r.on_datagram(&[1, 2, 3]), Delivery::Malformed);
        // Never reached the loss model.
        assert_eq!(r.loss_model().seen(), 0);
        assert_eq!(r.stats().malformed, 1);
    }

    #[test]
    fn lost_datagram_produces_nothing() {
        let mut r = GbnReceiver::new(Scripted::new([0]));
        let d = r.on_datagram(&data(0, b"gone"));
        assert_eq!(d, Delivery::Lost { seq: 0 });
        assert_eq!(d.ack(), None);
        assert_eq!(r.expected(), 0);

        // The retransmission gets through.
        assert_eq!(r.on_datagram(&data(0, b"gone")).ack(), Some(0));
    }

    #[test]
    fn corrupt_payload_treated_as_loss() {
        let mut r = GbnReceiver::new(NoLoss);
        let mut bytes = data(0, b"payload");
        let last = bytes.len() - 1;
        bytes[last] ^= 0x10;
        let d = r.on_datagram(&bytes);
        assert_eq!(d, Delivery::Corrupt { seq: 0 });
        assert_eq!(d.ack(), None);
        assert_eq!(r.expected(), 0);
    }

    #[test]
    fn stray_ack_treated_as_corrupt() {
        let mut r = GbnReceiver::new(NoLoss);
        assert_eq!(r.on_datagram(&encode_ack(0)), Delivery::Corrupt { seq: 0 });
    }

    #[test]
    fn cumulative_ack_after_drop() {
        // Accept 0..=4, lose 5, then see duplicates and later packets.
        let mut r = GbnReceiver::new(Scripted::new([5]));
        for seq in 0..=5 {
            r.on_datagram(&data(seq, b"z"));
        }
        assert_eq!(r.expected(), 5);
        for seq in [2, 4, 6, 7] {
            assert_eq!(r.on_datagram(&data(seq, b"z")).ack(), Some(4));
        }
    }
}
