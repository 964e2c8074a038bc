//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values. Every flag is optional:
//! a bare invocation runs one audit pass with the configured defaults.

use crate::config::parse_time_of_day;
use crate::models::AuditReport;
use clap::Parser;
use std::path::PathBuf;

/// Standup Auditor - checks who posted an approved stand-up in time
///
/// Reads the recent history of a private Slack channel, keeps the
/// messages approved by a bot reaction, and logs for every member
/// whether their stand-up landed before the daily deadline.
///
/// Examples:
///   SLACK_TOKEN=xoxb-... standup-auditor
///   standup-auditor --deadline 10:30 --verbose
///   standup-auditor --output standups.json --format json
///   standup-auditor --fail-on missing
///   standup-auditor --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Slack API token
    #[arg(long, env = "SLACK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Slack Web API base URL
    #[arg(long, value_name = "URL", env = "SLACK_API_URL")]
    pub api_url: Option<String>,

    /// Normalized name of the private stand-up channel
    #[arg(long, value_name = "NAME")]
    pub channel: Option<String>,

    /// Local deadline for stand-ups (HH:MM or HH:MM:SS)
    #[arg(long, value_name = "TIME")]
    pub deadline: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .standup-auditor.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write an audit report to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Exit with code 2 when members are missing (or late) their stand-up
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .standup-auditor.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Threshold for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FailOnLevel {
    /// Fail when any member has no stand-up
    Missing,
    /// Fail when any member is late or has no stand-up
    Late,
}

impl FailOnLevel {
    /// Whether the report crosses this threshold.
    pub fn is_exceeded(&self, report: &AuditReport) -> bool {
        match self {
            FailOnLevel::Missing => report.has_missing(),
            FailOnLevel::Late => report.has_late_or_missing(),
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Slack API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref deadline) = self.deadline {
            parse_time_of_day(deadline).map_err(|e| e.to_string())?;
        }

        if let Some(ref channel) = self.channel {
            if channel.trim().is_empty() {
                return Err("Channel name must not be empty".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            token: Some("xoxb-test".to_string()),
            api_url: None,
            channel: None,
            deadline: None,
            config: None,
            output: None,
            format: OutputFormat::Markdown,
            fail_on: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_no_arguments_is_valid() {
        let args = Args::try_parse_from(["standup-auditor"]).unwrap();
        assert!(args.validate().is_ok());
        assert_eq!(args.format, OutputFormat::Markdown);
        assert!(args.fail_on.is_none());
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "standup-auditor",
            "--deadline",
            "10:30",
            "--fail-on",
            "late",
            "--format",
            "json",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert_eq!(args.deadline.as_deref(), Some("10:30"));
        assert_eq!(args.fail_on, Some(FailOnLevel::Late));
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.api_url = Some("slack.com/api".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_deadline() {
        let mut args = make_args();
        args.deadline = Some("11h".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
