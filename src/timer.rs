//! Retransmission timer.
//!
//! Go-Back-N keeps exactly one timer per window, covering the oldest
//! unacknowledged packet.  [`RetransmitTimer`] holds that single deadline;
//! arming it again simply moves the deadline.
//!
//! The timeout is a fixed configuration constant.  There is no RTT sampling
//! and no exponential back-off.
//!
//! The timer never reads the clock itself: every method takes `now`, which
//! keeps the sender state machine deterministic under test.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RetransmitTimer {
    rto: Duration,
    deadline: Option<Instant>,
}

impl RetransmitTimer {
    pub fn new(rto: Duration) -> Self {
        Self {
            rto,
            deadline: None,
        }
    }

    /// Start (or restart) the timer so that it fires one RTO after `now`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.rto);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `true` once an armed timer's deadline has passed.
    pub fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Time left until the deadline; zero once expired, `None` when disarmed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RTO: Duration = Duration::from_millis(500);

    #[test]
    fn starts_disarmed() {
        let t = RetransmitTimer::new(RTO);
        assert!(!t.is_armed());
        assert!(!t.expired(Instant::now()));
        assert_eq!(t.remaining(Instant::now()), None);
    }

    #[test]
    fn fires_one_rto_after_arming() {
        let now = Instant::now();
        let mut t = RetransmitTimer::new(RTO);
        t.arm(now);
        assert_eq!(t.deadline(), Some(now + RTO));
        assert!(!t.expired(now + RTO - Duration::from_millis(1)));
        assert!(t.expired(now + RTO));
    }

    #[test]
    fn rearming_moves_deadline() {
        let now = Instant::now();
        let mut t = RetransmitTimer::new(RTO);
        t.arm(now);
        t.arm(now + Duration::from_millis(300));
        assert!(!t.expired(now + RTO));
        assert_eq!(
            t.remaining(now + RTO),
            Some(Duration::from_millis(300))
        );
    }

    #[test]
    fn remaining_saturates_at_zero() {
        let now = Instant::now();
        let mut t = RetransmitTimer::new(RTO);
        t.arm(now);
        assert_eq!(t.remaining(now + RTO * 3), Some(Duration::ZERO));
    }

    #[test]
    fn disarm_clears_deadline() {
        let now = Instant::now();
        let mut t = RetransmitTimer::new(RTO);
        t.arm(now);
        t.disarm();
        assert!(!t.expired(now + RTO * 2));
    }
}
