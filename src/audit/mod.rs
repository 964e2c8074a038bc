//! Stand-up audit.
//!
//! This module holds the audit pipeline and the settings and clock it
//! depends on.

pub mod auditor;
pub mod timing;

pub use auditor::StandupAuditor;

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Source of the current time, in the timezone deadlines are resolved in.
pub trait Clock: Send + Sync {
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;
}

/// Wall clock in the machine's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Which approved message counts when an author has several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationPolicy {
    /// Keep the chronologically latest approved message.
    #[default]
    Latest,
    /// Keep whichever approved message the history listed last.
    LastVisited,
}

/// Everything the auditor needs to know besides the service and clock.
#[derive(Debug, Clone)]
pub struct AuditSettings {
    /// Normalized name of the stand-up channel.
    pub channel_name: String,
    /// Display name of the account whose reaction approves a stand-up.
    pub approver_name: String,
    /// Reaction name that marks approval.
    pub approval_reaction: String,
    /// Members never reported on.
    pub excluded_names: BTreeSet<String>,
    /// Local time of day stand-ups are due.
    pub deadline: NaiveTime,
    /// Maximum number of history messages requested.
    pub history_count: usize,
    /// How far back the history query reaches.
    pub lookback: Duration,
    pub aggregation: AggregationPolicy,
}

#[cfg(test)]
impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            channel_name: "stand-ups".to_string(),
            approver_name: "jetbot".to_string(),
            approval_reaction: "heavy_check_mark".to_string(),
            excluded_names: ["jetbot", "mattbates"]
                .into_iter()
                .map(String::from)
                .collect(),
            deadline: NaiveTime::from_hms_opt(11, 1, 0).unwrap_or(NaiveTime::MIN),
            history_count: 1000,
            lookback: Duration::hours(24),
            aggregation: AggregationPolicy::Latest,
        }
    }
}
