//! Tick configuration and per-run counters
//!
//! Each tick:
//! - Reads tag1, tag2 and the exit tag
//! - Computes the sum and hands it to the write dispatcher
//! - Stops the loop when the exit tag reads 1

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PollConfig;
use crate::gateway::TagValue;
use crate::poller::dispatcher::WriteStats;
use crate::poller::signal::StopReason;

/// What happens when a tick fires while the previous one is still reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Wait for the current read; ticks missed meanwhile are skipped.
    /// Writes still run in the background but land in tick order.
    #[default]
    Serialize,
    /// Start a new read on every tick regardless of outstanding ones.
    /// Neither reads nor writes are ordered.
    Overlap,
}

/// Configuration for the poll tick loop
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Interval between ticks
    pub tick_interval: Duration,
    pub overlap: OverlapPolicy,
    /// Stop after this many ticks
    pub max_ticks: Option<u64>,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(crate::config::DEFAULT_INTERVAL_MS),
            overlap: OverlapPolicy::Serialize,
            max_ticks: None,
        }
    }
}

impl TickConfig {
    /// Create a new tick config
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            ..Default::default()
        }
    }

    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// True once `ticks` has reached the configured limit
    pub fn limit_reached(&self, ticks: u64) -> bool {
        self.max_ticks.is_some_and(|max| ticks >= max)
    }
}

impl From<&PollConfig> for TickConfig {
    fn from(config: &PollConfig) -> Self {
        Self {
            tick_interval: config.interval(),
            overlap: config.overlap,
            max_ticks: config.max_ticks,
        }
    }
}

/// Counters kept by the loop between ticks
#[derive(Debug)]
pub struct TickState {
    pub started_at: DateTime<Utc>,
    /// Number of ticks since start
    pub tick_count: u64,
    pub reads_ok: u64,
    pub reads_failed: u64,
    pub last_sum: Option<TagValue>,
}

impl Default for TickState {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            tick_count: 0,
            reads_ok: 0,
            reads_failed: 0,
            last_sum: None,
        }
    }
}

impl TickState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new tick
    pub fn tick(&mut self) {
        self.tick_count += 1;
    }

    pub fn read_ok(&mut self, sum: TagValue) {
        self.reads_ok += 1;
        self.last_sum = Some(sum);
    }

    pub fn read_failed(&mut self) {
        self.reads_failed += 1;
    }

    pub fn into_summary(self, writes: WriteStats, stop_reason: Option<StopReason>) -> PollSummary {
        PollSummary {
            started_at: self.started_at,
            finished_at: Utc::now(),
            ticks: self.tick_count,
            reads_ok: self.reads_ok,
            reads_failed: self.reads_failed,
            last_sum: self.last_sum,
            writes,
            stop_reason,
        }
    }
}

/// What a finished poll run did
#[derive(Debug, Clone)]
pub struct PollSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub ticks: u64,
    pub reads_ok: u64,
    pub reads_failed: u64,
    pub last_sum: Option<TagValue>,
    pub writes: WriteStats,
    pub stop_reason: Option<StopReason>,
}

impl PollSummary {
    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at).to_std().unwrap_or_default()
    }
}
