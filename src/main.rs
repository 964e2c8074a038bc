//! Standup Auditor - daily stand-up checker for Slack
//!
//! Inspects the last day of a private Slack channel, counts the messages
//! approved by a bot reaction, and logs per member whether the stand-up
//! arrived before the deadline.
//!
//! Exit codes:
//!   0 - Success (audit completed, or no --fail-on threshold crossed)
//!   1 - Runtime error (Slack API failure, channel not found, bad config, etc.)
//!   2 - Members found missing/late at or above the --fail-on threshold

mod audit;
mod cli;
mod config;
mod models;
mod report;
mod slack;

use anyhow::{anyhow, Context, Result};
use audit::{StandupAuditor, SystemClock};
use cli::{Args, OutputFormat};
use config::Config;
use slack::{SlackClient, SlackClientConfig};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);

    debug!("Standup Auditor v{}", env!("CARGO_PKG_VERSION"));

    match run_audit(&args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .standup-auditor.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", config::DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging on stderr based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one audit pass. Returns the exit code (0 or 2).
async fn run_audit(args: &Args, config: Config) -> Result<i32> {
    let settings = config.audit_settings()?;

    let token = args
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| anyhow!("No Slack token provided; set SLACK_TOKEN or pass --token"))?;

    let client = SlackClient::new(SlackClientConfig {
        api_url: config.slack.api_url.clone(),
        token,
        timeout_seconds: config.slack.timeout_seconds,
    })?;

    let auditor = StandupAuditor::new(client, SystemClock, settings);
    let report = auditor.run().await?;

    if let Some(ref path) = args.output {
        let content = match args.format {
            OutputFormat::Json => report::generate_json_report(&report)?,
            OutputFormat::Markdown => report::generate_markdown_report(&report),
        };
        report::write_report(&content, path)?;
        info!("Report saved to {}", path.display());
    }

    if let Some(level) = args.fail_on {
        if level.is_exceeded(&report) {
            warn!(
                "Stand-ups below the {:?} threshold: {} late, {} missing",
                level, report.summary.late, report.summary.missing
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(ref config_path) = args.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?.unwrap_or_default()
    };

    config.merge_with_args(args);
    Ok(config)
}
