//! Transfer parameters for both endpoints.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::simulator::{self, Bernoulli};

/// Retransmission timeout used when none is given.
pub const DEFAULT_RTO: Duration = Duration::from_millis(500);
pub const DEFAULT_WINDOW_SIZE: usize = 64;
pub const DEFAULT_MSS: usize = 500;

/// Sender-side settings.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Go-Back-N window size N: packets allowed in flight at once.
    pub window_size: usize,
    /// Maximum payload bytes per DATA packet.
    pub mss: usize,
    /// Fixed retransmission timeout.
    pub rto: Duration,
    /// Retransmission rounds allowed without the window moving before the
    /// transfer is abandoned. `None` retries forever.
    pub max_timeouts: Option<u32>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            mss: DEFAULT_MSS,
            rto: DEFAULT_RTO,
            max_timeouts: None,
        }
    }
}

impl SenderConfig {
    pub fn new(window_size: usize, mss: usize) -> Self {
        Self {
            window_size,
            mss,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(Error::Config("window size must be at least 1".into()));
        }
        if self.mss == 0 {
            return Err(Error::Config("MSS must be at least 1 byte".into()));
        }
        if self.rto.is_zero() {
            return Err(Error::Config("retransmission timeout must be non-zero".into()));
        }
        Ok(())
    }
}

/// Receiver-side settings.
#[derive(Debug, Clone, Default)]
pub struct ReceiverConfig {
    /// Probability in `[0, 1)` that an inbound datagram is dropped.
    pub loss_probability: f64,
    /// Seed for the loss model; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl ReceiverConfig {
    pub fn new(loss_probability: f64) -> Self {
        Self {
            loss_probability,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        simulator::check_probability(self.loss_probability)
    }

    /// Build the loss model these settings describe.
    pub fn loss_model(&self) -> Result<Bernoulli> {
        match self.seed {
            Some(seed) => Bernoulli::seeded(self.loss_probability, seed),
            None => Bernoulli::new(self.loss_probability),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SenderConfig::default().validate().is_ok());
        assert!(ReceiverConfig::default().validate().is_ok());
        assert_eq!(SenderConfig::default().rto, Duration::from_millis(500));
    }

    #[test]
    fn zero_window_or_mss_rejected() {
        assert!(SenderConfig::new(0, 100).validate().is_err());
        assert!(SenderConfig::new(4, 0).validate().is_err());
        let cfg = SenderConfig {
            rto: Duration::ZERO,
            ..SenderConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loss_probability_bounds() {
        assert!(ReceiverConfig::new(0.0).validate().is_ok());
        assert!(ReceiverConfig::new(0.5).validate().is_ok());
        assert!(ReceiverConfig::new(1.0).validate().is_err());
        assert!(ReceiverConfig::new(-0.01).validate().is_err());
    }

    #[test]
    fn seeded_config_builds_reproducible_model() {
        use crate::simulator::LossModel;

        let cfg = ReceiverConfig {
            loss_probability: 0.5,
            seed: Some(99),
        };
        let mut a = cfg.loss_model().unwrap();
        let mut b = cfg.loss_model().unwrap();
        for _ in 0..64 {
            assert_eq!(a.should_drop(), b.should_drop());
        }
    }
}
