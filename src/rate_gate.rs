//! Per-Action Cooldown Gate
//!
//! Tracks when each class of rate-limited write was last attempted and
//! answers whether the next one may go out now.
//!
//! Moltbook limits:
//! - 1 post per 30 minutes
//! - 1 comment per 20 seconds
//!
//! A 429 from the platform counts as an attempt: callers record it so the
//! next cycle waits out the cooldown instead of retrying immediately.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Promo post cooldown (platform limit)
pub const PROMO_COOLDOWN: Duration = Duration::from_secs(30 * 60);

/// Comment cooldown (platform limit)
pub const COMMENT_COOLDOWN: Duration = Duration::from_secs(20);

/// Class of rate-limited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionClass {
    /// Publishing a promo post
    Promo,
    /// Replying to a comment on one of our posts
    Comment,
    /// Replying to a feed post
    FeedReply,
}

impl ActionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Promo => "promo",
            Self::Comment => "comment",
            Self::FeedReply => "feed_reply",
        }
    }

    /// Minimum spacing between two attempts of this class
    pub fn min_interval(&self) -> Duration {
        match self {
            Self::Promo => PROMO_COOLDOWN,
            Self::Comment | Self::FeedReply => COMMENT_COOLDOWN,
        }
    }

    /// Classes sharing one platform quota share one timestamp.
    /// Feed replies and comment replies both hit the comment endpoint.
    fn slot(&self) -> Self {
        match self {
            Self::Promo => Self::Promo,
            Self::Comment | Self::FeedReply => Self::Comment,
        }
    }
}

/// Last-attempt bookkeeping for every action class
#[derive(Debug, Default)]
pub struct RateGate {
    last_attempt: HashMap<ActionClass, Instant>,
}

impl RateGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an action of this class may proceed now
    pub fn may_act(&self, class: ActionClass) -> bool {
        self.remaining_wait(class).is_zero()
    }

    /// Record an attempt (successful or rate limited) at `at`
    pub fn record_attempt(&mut self, class: ActionClass, at: Instant) {
        debug!("Rate gate: {} attempt recorded", class.as_str());
        self.last_attempt.insert(class.slot(), at);
    }

    /// Record an attempt at the current instant
    pub fn record_now(&mut self, class: ActionClass) {
        self.record_attempt(class, Instant::now());
    }

    /// How long until the class may act again (zero if it may act now)
    pub fn remaining_wait(&self, class: ActionClass) -> Duration {
        match self.last_attempt.get(&class.slot()) {
            Some(last) => class.min_interval().saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Timestamp of the last recorded attempt, if any
    pub fn last_attempt(&self, class: ActionClass) -> Option<Instant> {
        self.last_attempt.get(&class.slot()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ActionClass; 3] = [ActionClass::Promo, ActionClass::Comment, ActionClass::FeedReply];

    #[tokio::test(start_paused = true)]
    async fn test_fresh_gate_allows_everything() {
        let gate = RateGate::new();
        for class in ALL {
            assert!(gate.may_act(class));
            assert_eq!(gate.remaining_wait(class), Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_until_interval_elapses() {
        for class in ALL {
            let mut gate = RateGate::new();
            gate.record_now(class);
            assert!(!gate.may_act(class), "{} should be blocked", class.as_str());

            tokio::time::advance(class.min_interval() - Duration::from_millis(1)).await;
            assert!(!gate.may_act(class), "{} opened early", class.as_str());
            assert_eq!(gate.remaining_wait(class), Duration::from_millis(1));

            tokio::time::advance(Duration::from_millis(1)).await;
            assert!(gate.may_act(class), "{} should be open", class.as_str());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_comment_classes_share_quota() {
        let mut gate = RateGate::new();
        gate.record_now(ActionClass::FeedReply);
        assert!(!gate.may_act(ActionClass::Comment));
        assert!(gate.may_act(ActionClass::Promo));
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_attempt_at_past_instant() {
        let mut gate = RateGate::new();
        let earlier = Instant::now();
        tokio::time::advance(Duration::from_secs(15)).await;
        gate.record_attempt(ActionClass::Comment, earlier);
        assert_eq!(gate.remaining_wait(ActionClass::Comment), Duration::from_secs(5));
        assert_eq!(gate.last_attempt(ActionClass::Comment), Some(earlier));
    }
}
