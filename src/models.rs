//! Data models for the stand-up auditor.
//!
//! This module contains the chat-service records the auditor consumes
//! (users, channels, messages) and the per-member outcomes it produces.

use crate::audit::timing::format_duration;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A workspace user as returned by `users.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque user identifier (e.g. `U012AB3CD`).
    pub id: String,
    /// Display handle used for matching the approver and exclusions.
    pub name: String,
    /// Deactivated accounts are ignored by the audit.
    #[serde(default)]
    pub deleted: bool,
}

/// A private channel the token can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub name_normalized: String,
    /// Member identifiers in the order the service reports them.
    #[serde(default)]
    pub members: Vec<String>,
}

impl Channel {
    /// Normalized channel name, falling back to the raw name when the
    /// service did not supply one.
    pub fn normalized_name(&self) -> &str {
        if self.name_normalized.is_empty() {
            &self.name
        } else {
            &self.name_normalized
        }
    }
}

/// An emoji reaction attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
}

/// A single channel message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author identifier. Absent for some bot and system messages.
    #[serde(default)]
    pub user: Option<String>,
    /// Epoch timestamp as a decimal string, e.g. `"1512085950.000216"`.
    pub ts: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

/// Parameters for a channel history query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryParams {
    /// Maximum number of messages to return.
    pub count: usize,
    /// Oldest boundary as a whole-second epoch string.
    pub oldest: String,
    /// Whether a message exactly at `oldest` is included.
    pub inclusive: bool,
}

/// Result of a channel history query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// How a member fared against the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandupStatus {
    /// No approved stand-up in the lookback window.
    Missing,
    /// Posted before the deadline, by the given margin.
    Early(Duration),
    /// Posted at or after the deadline, by the given margin.
    Late(Duration),
}

impl StandupStatus {
    /// Classify an approved stand-up against the deadline.
    pub fn from_margin(deadline: DateTime<FixedOffset>, posted_at: DateTime<Utc>) -> Self {
        let margin = deadline.with_timezone(&Utc) - posted_at;
        if margin > Duration::zero() {
            StandupStatus::Early(margin)
        } else {
            StandupStatus::Late(-margin)
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StandupStatus::Missing => "missing",
            StandupStatus::Early(_) => "early",
            StandupStatus::Late(_) => "late",
        }
    }

    /// Returns an emoji representation of the status.
    pub fn emoji(&self) -> &'static str {
        match self {
            StandupStatus::Missing => "🔴",
            StandupStatus::Early(_) => "🟢",
            StandupStatus::Late(_) => "🟠",
        }
    }
}

impl fmt::Display for StandupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StandupStatus::Missing => write!(f, "no stand-up"),
            StandupStatus::Early(d) => write!(f, "early by {}", format_duration(*d)),
            StandupStatus::Late(d) => write!(f, "late by {}", format_duration(*d)),
        }
    }
}

impl Serialize for StandupStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let margin = match self {
            StandupStatus::Missing => None,
            StandupStatus::Early(d) | StandupStatus::Late(d) => Some(*d),
        };

        let mut state = serializer.serialize_struct("StandupStatus", 3)?;
        state.serialize_field("status", self.label())?;
        state.serialize_field("by", &margin.map(format_duration))?;
        state.serialize_field(
            "by_seconds",
            &margin.map(|d| d.num_milliseconds() as f64 / 1000.0),
        )?;
        state.end()
    }
}

/// Outcome of the audit for one channel member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberOutcome {
    pub user_id: String,
    pub user: String,
    /// Timestamp of the counted stand-up, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub status: StandupStatus,
}

/// Counts of member outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    pub total: usize,
    pub early: usize,
    pub late: usize,
    pub missing: usize,
}

impl OutcomeSummary {
    /// Creates a summary from a list of outcomes.
    pub fn from_outcomes(outcomes: &[MemberOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Self::default()
        };

        for outcome in outcomes {
            match outcome.status {
                StandupStatus::Early(_) => summary.early += 1,
                StandupStatus::Late(_) => summary.late += 1,
                StandupStatus::Missing => summary.missing += 1,
            }
        }

        summary
    }
}

/// The complete result of one audit pass.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub channel_id: String,
    pub channel_name: String,
    pub deadline: DateTime<FixedOffset>,
    pub generated_at: DateTime<FixedOffset>,
    /// Messages returned by the history query.
    pub messages_fetched: usize,
    /// Approved messages that contributed a timestamp.
    pub approved_messages: usize,
    /// Approved messages dropped because their timestamp did not parse.
    pub malformed_timestamps: usize,
    /// Outcomes in channel membership order.
    pub members: Vec<MemberOutcome>,
    pub summary: OutcomeSummary,
}

impl AuditReport {
    pub fn has_missing(&self) -> bool {
        self.summary.missing > 0
    }

    pub fn has_late_or_missing(&self) -> bool {
        self.summary.late > 0 || self.summary.missing > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn outcome(status: StandupStatus) -> MemberOutcome {
        MemberOutcome {
            user_id: "U1".to_string(),
            user: "alice".to_string(),
            posted_at: None,
            status,
        }
    }

    #[test]
    fn test_normalized_name_fallback() {
        let mut channel = Channel {
            id: "G1".to_string(),
            name: "Stand-Ups".to_string(),
            name_normalized: String::new(),
            members: vec![],
        };
        assert_eq!(channel.normalized_name(), "Stand-Ups");

        channel.name_normalized = "stand-ups".to_string();
        assert_eq!(channel.normalized_name(), "stand-ups");
    }

    #[test]
    fn test_message_deserialize_without_reactions() {
        let json = r#"{"type": "message", "user": "U1", "text": "hi", "ts": "1512085950.000216"}"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.user.as_deref(), Some("U1"));
        assert!(message.reactions.is_empty());
    }

    #[test]
    fn test_status_from_margin() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let deadline = offset.with_ymd_and_hms(2024, 3, 4, 11, 1, 0).unwrap();

        let early = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        assert_eq!(
            StandupStatus::from_margin(deadline, early),
            StandupStatus::Early(Duration::minutes(121))
        );

        let late = Utc.with_ymd_and_hms(2024, 3, 4, 12, 30, 0).unwrap();
        assert_eq!(
            StandupStatus::from_margin(deadline, late),
            StandupStatus::Late(Duration::minutes(89))
        );

        let exact = Utc.with_ymd_and_hms(2024, 3, 4, 11, 1, 0).unwrap();
        assert_eq!(
            StandupStatus::from_margin(deadline, exact),
            StandupStatus::Late(Duration::zero())
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(StandupStatus::Missing.to_string(), "no stand-up");
        assert_eq!(
            StandupStatus::Early(Duration::minutes(121)).to_string(),
            "early by 2h1m"
        );
        assert_eq!(
            StandupStatus::Late(Duration::minutes(89)).to_string(),
            "late by 1h29m"
        );
        assert_eq!(
            StandupStatus::Early(Duration::microseconds(500)).to_string(),
            "early by 0.001s"
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(outcome(StandupStatus::Late(Duration::seconds(90)))).unwrap();
        assert_eq!(json["status"], "late");
        assert_eq!(json["by"], "1m30s");
        assert_eq!(json["by_seconds"], 90.0);

        let json = serde_json::to_value(outcome(StandupStatus::Missing)).unwrap();
        assert_eq!(json["status"], "missing");
        assert!(json["by"].is_null());
    }

    #[test]
    fn test_outcome_summary() {
        let outcomes = vec![
            outcome(StandupStatus::Early(Duration::minutes(5))),
            outcome(StandupStatus::Late(Duration::minutes(5))),
            outcome(StandupStatus::Missing),
            outcome(StandupStatus::Missing),
        ];

        let summary = OutcomeSummary::from_outcomes(&outcomes);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.early, 1);
        assert_eq!(summary.late, 1);
        assert_eq!(summary.missing, 2);
    }
}
