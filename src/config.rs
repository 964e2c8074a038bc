//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.standup-auditor.toml` files.

use crate::audit::{AggregationPolicy, AuditSettings};
use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".standup-auditor.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Slack API settings.
    #[serde(default)]
    pub slack: SlackConfig,

    /// Audit rules.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Slack Web API settings. The token is only taken from the CLI/environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Web API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum messages fetched from the channel history.
    #[serde(default = "default_history_count")]
    pub history_count: usize,

    /// How many hours of history to inspect.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_seconds: default_timeout(),
            history_count: default_history_count(),
            lookback_hours: default_lookback_hours(),
        }
    }
}

pub fn default_api_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_history_count() -> usize {
    1000
}

fn default_lookback_hours() -> i64 {
    24
}

/// Which channel to audit and how stand-ups are judged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Normalized name of the private stand-up channel.
    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// User whose reaction approves a stand-up.
    #[serde(default = "default_approver_name")]
    pub approver_name: String,

    /// Reaction that marks approval.
    #[serde(default = "default_approval_reaction")]
    pub approval_reaction: String,

    /// Members that are never reported on.
    #[serde(default = "default_excluded_names")]
    pub excluded_names: Vec<String>,

    /// Local deadline, `HH:MM` or `HH:MM:SS`.
    #[serde(default = "default_deadline")]
    pub deadline: String,

    /// `latest` or `last-visited`.
    #[serde(default)]
    pub aggregation: AggregationPolicy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            channel_name: default_channel_name(),
            approver_name: default_approver_name(),
            approval_reaction: default_approval_reaction(),
            excluded_names: default_excluded_names(),
            deadline: default_deadline(),
            aggregation: AggregationPolicy::default(),
        }
    }
}

fn default_channel_name() -> String {
    "stand-ups".to_string()
}

fn default_approver_name() -> String {
    "jetbot".to_string()
}

fn default_approval_reaction() -> String {
    "heavy_check_mark".to_string()
}

fn default_excluded_names() -> Vec<String> {
    vec!["jetbot".to_string(), "mattbates".to_string()]
}

fn default_deadline() -> String {
    "11:01:00".to_string()
}

/// Parse a local time of day written as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .with_context(|| format!("Invalid time of day {:?}, expected HH:MM[:SS]", value))
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.standup-auditor.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref api_url) = args.api_url {
            self.slack.api_url = api_url.clone();
        }
        if let Some(ref channel) = args.channel {
            self.audit.channel_name = channel.clone();
        }
        if let Some(ref deadline) = args.deadline {
            self.audit.deadline = deadline.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Build the auditor settings, validating values that TOML cannot.
    pub fn audit_settings(&self) -> Result<AuditSettings> {
        if self.slack.history_count == 0 {
            bail!("slack.history_count must be at least 1");
        }
        if self.slack.lookback_hours <= 0 {
            bail!("slack.lookback_hours must be at least 1");
        }
        if self.audit.channel_name.trim().is_empty() {
            bail!("audit.channel_name must not be empty");
        }

        let excluded_names: BTreeSet<String> = self.audit.excluded_names.iter().cloned().collect();

        Ok(AuditSettings {
            channel_name: self.audit.channel_name.clone(),
            approver_name: self.audit.approver_name.clone(),
            approval_reaction: self.audit.approval_reaction.clone(),
            excluded_names,
            deadline: parse_time_of_day(&self.audit.deadline)?,
            history_count: self.slack.history_count,
            lookback: Duration::hours(self.slack.lookback_hours),
            aggregation: self.audit.aggregation,
        })
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audit.channel_name, "stand-ups");
        assert_eq!(config.audit.approver_name, "jetbot");
        assert_eq!(config.slack.history_count, 1000);
        assert!(config.audit.excluded_names.contains(&"mattbates".to_string()));
    }

    #[test]
    fn test_default_settings_match_builtin() {
        let settings = Config::default().audit_settings().unwrap();
        let builtin = AuditSettings::default();

        assert_eq!(settings.channel_name, builtin.channel_name);
        assert_eq!(settings.approval_reaction, builtin.approval_reaction);
        assert_eq!(settings.excluded_names, builtin.excluded_names);
        assert_eq!(settings.deadline, builtin.deadline);
        assert_eq!(settings.lookback, builtin.lookback);
        assert_eq!(settings.aggregation, AggregationPolicy::Latest);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[slack]
lookback_hours = 48

[audit]
channel_name = "daily"
excluded_names = ["checkbot"]
deadline = "09:30"
aggregation = "last-visited"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.slack.api_url, "https://slack.com/api");
        assert_eq!(config.slack.lookback_hours, 48);
        assert_eq!(config.audit.channel_name, "daily");
        assert_eq!(config.audit.approver_name, "jetbot");

        let settings = config.audit_settings().unwrap();
        assert_eq!(settings.deadline, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(settings.aggregation, AggregationPolicy::LastVisited);
        assert_eq!(settings.lookback, Duration::hours(48));
        assert!(settings.excluded_names.contains("checkbot"));
        assert!(!settings.excluded_names.contains("mattbates"));
    }

    #[test]
    fn test_merge_with_args() {
        use clap::Parser;

        let args = crate::cli::Args::try_parse_from([
            "standup-auditor",
            "--channel",
            "daily-standup",
            "--deadline",
            "10:15",
            "--api-url",
            "http://localhost:8080/api",
            "--verbose",
        ])
        .unwrap();

        let mut config = Config::default();
        config.audit.approver_name = "checkbot".to_string();
        config.merge_with_args(&args);

        assert_eq!(config.audit.channel_name, "daily-standup");
        assert_eq!(config.audit.deadline, "10:15");
        assert_eq!(config.slack.api_url, "http://localhost:8080/api");
        assert_eq!(config.audit.approver_name, "checkbot");
        assert!(config.general.verbose);
    }

    #[test]
    fn test_invalid_settings() {
        let mut config = Config::default();
        config.audit.deadline = "25:00".to_string();
        assert!(config.audit_settings().is_err());

        let mut config = Config::default();
        config.slack.history_count = 0;
        assert!(config.audit_settings().is_err());
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(
            parse_time_of_day("11:01:00").unwrap(),
            NaiveTime::from_hms_opt(11, 1, 0).unwrap()
        );
        assert_eq!(
            parse_time_of_day("7:05").unwrap(),
            NaiveTime::from_hms_opt(7, 5, 0).unwrap()
        );
        assert!(parse_time_of_day("noon").is_err());
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[audit]\nchannel_name = \"standup\"\n",
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.audit.channel_name, "standup");

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[audit\n").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[slack]"));
        assert!(toml_str.contains("[audit]"));
        assert!(toml_str.contains("aggregation = \"latest\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.audit.deadline, "11:01:00");
    }
}
