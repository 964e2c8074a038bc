//! The stand-up audit pipeline.
//!
//! One pass resolves the stand-up channel and the user directory, pulls the
//! recent channel history, keeps the messages carrying the approver's
//! reaction, and judges every channel member against today's deadline.

use super::timing::{deadline_for, parse_timestamp};
use super::{AggregationPolicy, AuditSettings, Clock};
use crate::models::{
    AuditReport, Channel, HistoryParams, MemberOutcome, Message, OutcomeSummary, StandupStatus,
};
use crate::slack::{ChatService, SlackError};
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Fatal audit failures. Any of these ends the run.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("error getting private channels: {0}")]
    Channels(#[source] SlackError),

    #[error("error getting users: {0}")]
    Users(#[source] SlackError),

    #[error("error retrieving messages: {0}")]
    History(#[source] SlackError),

    #[error("error finding {0} private channel")]
    ChannelNotFound(String),

    #[error("{count} private channels are named {name}")]
    AmbiguousChannel { name: String, count: usize },
}

/// Approved stand-ups found in the history.
#[derive(Debug, Default)]
struct StandupTally {
    last_by_user: HashMap<String, DateTime<Utc>>,
    approved: usize,
    malformed: usize,
}

/// Audits one channel's stand-ups against the daily deadline.
pub struct StandupAuditor<S, C> {
    service: S,
    clock: C,
    settings: AuditSettings,
}

impl<S: ChatService, C: Clock> StandupAuditor<S, C> {
    pub fn new(service: S, clock: C, settings: AuditSettings) -> Self {
        Self {
            service,
            clock,
            settings,
        }
    }

    /// Run one audit pass, logging a line per judged member.
    pub async fn run(&self) -> Result<AuditReport, AuditError> {
        let channel = self.resolve_channel().await?;
        let users = self.resolve_users().await?;
        debug!("Found {} active users", users.len());

        let now = self.clock.now();
        let params = HistoryParams {
            count: self.settings.history_count,
            oldest: (now.timestamp() - self.settings.lookback.num_seconds()).to_string(),
            inclusive: true,
        };

        let history = self
            .service
            .channel_history(&channel.id, &params)
            .await
            .map_err(AuditError::History)?;
        debug!(
            "Found {} messages in the last {} hours",
            history.messages.len(),
            self.settings.lookback.num_hours()
        );

        let approver_ids: HashSet<&str> = users
            .iter()
            .filter(|(_, name)| **name == self.settings.approver_name)
            .map(|(id, _)| id.as_str())
            .collect();
        if approver_ids.is_empty() {
            warn!(
                "Approver {} not found among users; no stand-up can be approved",
                self.settings.approver_name
            );
        }

        let tally = self.collect_standups(&history.messages, &approver_ids);
        debug!(
            "Found {} valid stand-ups in the last {} hours",
            tally.approved,
            self.settings.lookback.num_hours()
        );

        let deadline = deadline_for(&now, self.settings.deadline);
        let members = self.judge_members(&channel, &users, &tally.last_by_user, deadline);
        let summary = OutcomeSummary::from_outcomes(&members);

        Ok(AuditReport {
            channel_id: channel.id,
            channel_name: self.settings.channel_name.clone(),
            deadline,
            generated_at: now.fixed_offset(),
            messages_fetched: history.messages.len(),
            approved_messages: tally.approved,
            malformed_timestamps: tally.malformed,
            members,
            summary,
        })
    }

    async fn resolve_channel(&self) -> Result<Channel, AuditError> {
        let channels = self
            .service
            .list_private_channels()
            .await
            .map_err(AuditError::Channels)?;

        let mut matching: Vec<Channel> = channels
            .into_iter()
            .filter(|c| c.normalized_name() == self.settings.channel_name)
            .collect();

        let mut channel = match matching.len() {
            0 => {
                return Err(AuditError::ChannelNotFound(
                    self.settings.channel_name.clone(),
                ))
            }
            1 => matching.remove(0),
            count => {
                return Err(AuditError::AmbiguousChannel {
                    name: self.settings.channel_name.clone(),
                    count,
                })
            }
        };

        if channel.members.is_empty() {
            channel.members = self
                .service
                .channel_members(&channel.id)
                .await
                .map_err(AuditError::Channels)?;
        }
        debug!("Channel {} has {} members", channel.id, channel.members.len());

        Ok(channel)
    }

    /// Map of user id to display name, deleted users left out.
    async fn resolve_users(&self) -> Result<HashMap<String, String>, AuditError> {
        let users = self
            .service
            .list_users()
            .await
            .map_err(AuditError::Users)?;

        Ok(users
            .into_iter()
            .filter(|u| !u.deleted)
            .map(|u| (u.id, u.name))
            .collect())
    }

    fn collect_standups(
        &self,
        messages: &[Message],
        approver_ids: &HashSet<&str>,
    ) -> StandupTally {
        let mut tally = StandupTally::default();

        for message in messages {
            if !is_approved(message, &self.settings.approval_reaction, approver_ids) {
                continue;
            }

            let Some(ref author) = message.user else {
                debug!("Skipping approved message {} without an author", message.ts);
                continue;
            };

            let timestamp = match parse_timestamp(&message.ts) {
                Ok(ts) => ts,
                Err(e) => {
                    error!("Error parsing timestamp: {}", e);
                    tally.malformed += 1;
                    continue;
                }
            };

            match self.settings.aggregation {
                AggregationPolicy::LastVisited => {
                    tally.last_by_user.insert(author.clone(), timestamp);
                }
                AggregationPolicy::Latest => {
                    tally
                        .last_by_user
                        .entry(author.clone())
                        .and_modify(|kept| *kept = (*kept).max(timestamp))
                        .or_insert(timestamp);
                }
            }
            tally.approved += 1;
        }

        tally
    }

    fn judge_members(
        &self,
        channel: &Channel,
        users: &HashMap<String, String>,
        last_by_user: &HashMap<String, DateTime<Utc>>,
        deadline: DateTime<FixedOffset>,
    ) -> Vec<MemberOutcome> {
        let mut outcomes = Vec::new();

        for user_id in &channel.members {
            let Some(name) = users.get(user_id) else {
                continue;
            };
            if self.settings.excluded_names.contains(name) {
                continue;
            }

            let posted_at = last_by_user.get(user_id).copied();
            let status = match posted_at {
                Some(ts) => StandupStatus::from_margin(deadline, ts),
                None => StandupStatus::Missing,
            };

            match status {
                StandupStatus::Missing => error!(user = %name, "{}", status),
                StandupStatus::Early(_) => info!(user = %name, "stand-up {}", status),
                StandupStatus::Late(_) => warn!(user = %name, "stand-up {}", status),
            }

            outcomes.push(MemberOutcome {
                user_id: user_id.clone(),
                user: name.clone(),
                posted_at,
                status,
            });
        }

        outcomes
    }
}

/// A message is approved when the approval reaction carries an approver.
fn is_approved(message: &Message, reaction_name: &str, approver_ids: &HashSet<&str>) -> bool {
    message
        .reactions
        .iter()
        .filter(|r| r.name == reaction_name)
        .any(|r| r.users.iter().any(|u| approver_ids.contains(u.as_str())))
}
