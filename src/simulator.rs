//! Lossy-channel model for exercising retransmission.
//!
//! Real networks drop packets.  To exercise the Go-Back-N recovery path
//! without depending on actual network conditions, the receiver consults a
//! [`LossModel`] for every well-formed datagram it reads and silently
//! discards the ones the model drops.
//!
//! | Model          | Behaviour                                           |
//! |----------------|-----------------------------------------------------|
//! | [`NoLoss`]     | Transparent pass-through.                           |
//! | [`Bernoulli`]  | Independent drop with probability `p`, seeded RNG.  |
//! | [`Scripted`]   | Drops exactly the datagram indices it is given.     |
//!
//! Loss is only applied on the receiving side.  A dropped DATA packet and a
//! dropped ACK look the same to the sender (no ACK arrives), so the return
//! path is covered implicitly.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// Decides, datagram by datagram, whether the channel delivers or drops.
pub trait LossModel {
    /// Returns `true` when the next inbound datagram should be dropped.
    fn should_drop(&mut self) -> bool;
}

impl<L: LossModel + ?Sized> LossModel for Box<L> {
    fn should_drop(&mut self) -> bool {
        (**self).should_drop()
    }
}

/// A perfect channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLoss;

impl LossModel for NoLoss {
    fn should_drop(&mut self) -> bool {
        false
    }
}

/// Independent per-datagram loss with a fixed probability.
#[derive(Debug, Clone)]
pub struct Bernoulli {
    probability: f64,
    rng: StdRng,
}

impl Bernoulli {
    /// Loss model seeded from OS entropy.
    pub fn new(probability: f64) -> Result<Self> {
        Self::with_rng(probability, StdRng::from_os_rng())
    }

    /// Reproducible loss model: the same seed yields the same drop sequence.
    pub fn seeded(probability: f64, seed: u64) -> Result<Self> {
        Self::with_rng(probability, StdRng::seed_from_u64(seed))
    }

    fn with_rng(probability: f64, rng: StdRng) -> Result<Self> {
        check_probability(probability)?;
        Ok(Self { probability, rng })
    }
}

impl LossModel for Bernoulli {
    fn should_drop(&mut self) -> bool {
        self.rng.random::<f64>() < self.probability
    }
}

/// Drops a fixed set of datagrams, counted from 0 in arrival order.
///
/// Every datagram with a full header counts, including retransmissions, so
/// `Scripted::new([2])` drops only the first copy of whatever arrives third.
#[derive(Debug, Clone, Default)]
pub struct Scripted {
    drops: BTreeSet<u64>,
    seen: u64,
}

impl Scripted {
    pub fn new(drops: impl IntoIterator<Item = u64>) -> Self {
        Self {
            drops: drops.into_iter().collect(),
            seen: 0,
        }
    }

    /// Number of datagrams the model has been asked about so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

impl LossModel for Scripted {
    fn should_drop(&mut self) -> bool {
        let index = self.seen;
        self.seen += 1;
        self.drops.contains(&index)
    }
}

/// A loss probability must lie in `[0, 1)`: a channel that drops everything
/// can never complete a transfer.
pub fn check_probability(probability: f64) -> Result<()> {
    if (0.0..1.0).contains(&probability) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "loss probability must be in [0, 1), got {probability}"
        )))
    }
}
