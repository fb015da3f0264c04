//! Rescan scheduler
//!
//! The host calls `on_tick` with the milliseconds elapsed since the previous
//! tick. Two timers accumulate that time independently: one for the
//! time-gated reset rescan and one for the guild tracker refresh.

use crate::reset::Policy;

/// Accumulates elapsed time and fires once per interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTimer {
    interval_ms: u64,
    elapsed_ms: u64,
}

impl IntervalTimer {
    #[must_use]
    pub fn from_secs(interval_seconds: u32) -> Self {
        Self {
            interval_ms: u64::from(interval_seconds) * 1000,
            elapsed_ms: 0,
        }
    }

    /// Add elapsed time. Returns true, and starts over from zero, once the
    /// interval has been reached.
    pub fn advance(&mut self, diff_ms: u32) -> bool {
        self.elapsed_ms = self.elapsed_ms.saturating_add(u64::from(diff_ms));
        if self.elapsed_ms < self.interval_ms {
            return false;
        }
        self.elapsed_ms = 0;
        true
    }

    /// Change the interval, keeping the time accumulated so far
    pub fn set_interval_secs(&mut self, interval_seconds: u32) {
        self.interval_ms = u64::from(interval_seconds) * 1000;
    }

    #[must_use]
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}

/// Which scans a tick made due
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueScans {
    pub rescan: bool,
    pub guild_refresh: bool,
}

/// The two independent scan timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescanScheduler {
    rescan: IntervalTimer,
    guild_refresh: IntervalTimer,
}

impl RescanScheduler {
    #[must_use]
    pub fn from_policy(policy: &Policy) -> Self {
        Self {
            rescan: IntervalTimer::from_secs(policy.rescan_interval_seconds),
            guild_refresh: IntervalTimer::from_secs(policy.guild_tracker_interval_seconds),
        }
    }

    /// Advance both timers
    pub fn tick(&mut self, diff_ms: u32) -> DueScans {
        DueScans {
            rescan: self.rescan.advance(diff_ms),
            guild_refresh: self.guild_refresh.advance(diff_ms),
        }
    }

    /// Pick up new intervals after a policy reload
    pub fn reconfigure(&mut self, policy: &Policy) {
        self.rescan.set_interval_secs(policy.rescan_interval_seconds);
        self.guild_refresh
            .set_interval_secs(policy.guild_tracker_interval_seconds);
    }

    #[must_use]
    pub fn rescan_timer(&self) -> &IntervalTimer {
        &self.rescan
    }

    #[must_use]
    pub fn guild_refresh_timer(&self) -> &IntervalTimer {
        &self.guild_refresh
    }
}
