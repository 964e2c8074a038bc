//! Audit report generation.
//!
//! This module renders an [`AuditReport`] as Markdown or JSON.

use crate::audit::timing::format_duration;
use crate::models::{AuditReport, MemberOutcome, OutcomeSummary, StandupStatus};
use anyhow::{Context, Result};
use chrono::FixedOffset;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AuditReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Stand-up Report: #{}\n\n", report.channel_name));
    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_summary_section(&report.summary));
    output.push_str(&generate_members_section(
        &report.members,
        report.deadline.offset(),
    ));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(report: &AuditReport) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Channel:** {} (`{}`)\n",
        report.channel_name, report.channel_id
    ));
    section.push_str(&format!(
        "- **Deadline:** {}\n",
        report.deadline.format("%Y-%m-%d %H:%M:%S %:z")
    ));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S %:z")
    ));
    section.push_str(&format!(
        "- **Messages Inspected:** {}\n",
        report.messages_fetched
    ));
    section.push_str(&format!(
        "- **Approved Stand-ups:** {}\n",
        report.approved_messages
    ));
    if report.malformed_timestamps > 0 {
        section.push_str(&format!(
            "- **Malformed Timestamps:** {}\n",
            report.malformed_timestamps
        ));
    }
    section.push('\n');

    section
}

fn generate_summary_section(summary: &OutcomeSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "| {} Early | {} Late | {} Missing | **Total** |\n",
        StandupStatus::Early(chrono::Duration::zero()).emoji(),
        StandupStatus::Late(chrono::Duration::zero()).emoji(),
        StandupStatus::Missing.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | **{}** |\n\n",
        summary.early, summary.late, summary.missing, summary.total
    ));

    section
}

/// Posting times are shown in `offset`, the deadline's offset.
fn generate_members_section(members: &[MemberOutcome], offset: &FixedOffset) -> String {
    let mut section = String::new();

    section.push_str("## Members\n\n");

    if members.is_empty() {
        section.push_str("No members to report on.\n\n");
        return section;
    }

    section.push_str("| Member | Status | Posted | Margin |\n");
    section.push_str("|:---|:---|:---|:---|\n");

    for member in members {
        section.push_str(&generate_member_row(member, offset));
    }
    section.push('\n');

    section
}

fn generate_member_row(member: &MemberOutcome, offset: &FixedOffset) -> String {
    let posted = member
        .posted_at
        .map(|ts| ts.with_timezone(offset).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    let margin = match member.status {
        StandupStatus::Missing => "-".to_string(),
        StandupStatus::Early(d) | StandupStatus::Late(d) => format_duration(d),
    };

    format!(
        "| {} | {} {} | {} | {} |\n",
        member.user,
        member.status.emoji(),
        member.status.label(),
        posted,
        margin
    )
}

fn generate_footer() -> String {
    "---\n\n*Report generated by standup-auditor*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AuditReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
