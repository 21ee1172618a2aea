//! Console output
//!
//! Human-readable coloured text, or JSON/YAML for scripts.

use crate::resource::inspect::{OsInfo, Owner, TaggedResource};
use crate::resource::migrate::{MigrationPlan, MigrationReport, StepStatus};
use crate::resource::quota::{QuotaEntry, QuotaUpdate, TenantQuota};
use crate::resource::{CandidateResource, Resolution};
use anyhow::Result;
use clap::ValueEnum;
use crossterm::style::Stylize;
use serde::Serialize;
use std::fmt::Write;

/// Output format selected with `--output`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

/// Render a value: structured formats serialize it, text uses `text`
pub fn render<T, F>(format: OutputFormat, value: &T, text: F) -> Result<String>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> String,
{
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Text => text(value),
    })
}

pub fn candidate_line(candidate: &CandidateResource) -> String {
    let state = candidate
        .state
        .as_deref()
        .map(|s| format!(" [{}]", s.to_uppercase()))
        .unwrap_or_default();
    format!(
        "{}{} {}",
        candidate.name.as_str().bold().blue(),
        state,
        candidate.href
    )
}

pub fn resolution_text(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Found(candidate) => candidate_line(candidate),
        Resolution::Ambiguous(candidates) => {
            let mut out = format!(
                "{}\n",
                format!("{} resources share this name:", candidates.len())
                    .bold()
                    .red()
            );
            for candidate in candidates {
                let _ = writeln!(out, "  {}", candidate_line(candidate));
            }
            out.trim_end().to_string()
        }
        Resolution::NotFound => "Not found".yellow().to_string(),
    }
}

pub fn tags_text(resource: &TaggedResource) -> String {
    let mut out = format!("{}\n", resource.name.as_str().bold().cyan());
    for (category, value) in resource.tags.visible() {
        let value = match category {
            "vmtype" => value.bold().green().to_string(),
            "business_group_id" => value.bold().blue().to_string(),
            "environment" => value.bold().yellow().to_string(),
            "network_location" => value.bold().cyan().to_string(),
            _ => value.to_string(),
        };
        let _ = writeln!(out, "  {} : {}", category, value);
    }
    if resource.tags.vmtype().is_none() {
        let _ = writeln!(out, "  vmtype - {}", "Not found!".bold().yellow());
    }
    let description = resource.description.as_deref().unwrap_or("-");
    let _ = write!(out, "Description: {}", description.bold());
    out
}

pub fn os_text(os: &OsInfo) -> String {
    match &os.product_name {
        Some(product) => format!("{} has OS {}", os.vm_name, product.as_str().bold().magenta()),
        None => format!("Operating system details not found for {}", os.vm_name),
    }
}

pub fn owner_text(owner: &Option<Owner>) -> String {
    match owner {
        Some(owner) => format!(
            "{}\n{}",
            owner.name.as_str().bold().cyan(),
            owner.email.as_deref().unwrap_or("-")
        ),
        None => "No owner recorded".red().to_string(),
    }
}

fn quota_line(label: &str, entry: &Option<QuotaEntry>) -> String {
    match entry {
        Some(e) => format!(
            "{:<8} total {} {};\tused {};\tavailable {}",
            label,
            e.value.to_string().blue(),
            e.kind.unit(),
            e.used.map(|v| v.to_string()).unwrap_or_else(|| "-".into()).yellow(),
            e.available
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".into())
                .green(),
        ),
        None => format!("{:<8} not set", label),
    }
}

pub fn quota_text(quota: &TenantQuota) -> String {
    [
        format!("Tenant {}", quota.tenant_href.as_str().cyan()),
        quota_line("Storage", &quota.storage),
        quota_line("Memory", &quota.memory),
        quota_line("CPU", &quota.cpu),
    ]
    .join("\n")
}

pub fn quota_updates_text(updates: &[QuotaUpdate]) -> String {
    if updates.is_empty() {
        return "No quota changes requested".to_string();
    }
    updates
        .iter()
        .map(|u| {
            format!(
                "{}: {} -> {} {}",
                u.kind.api_name(),
                u.old_value,
                u.new_value.to_string().bold(),
                u.kind.unit()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn plan_text(plan: &MigrationPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Migration plan for {}", plan.vm_name.as_str().bold().cyan());
    let _ = writeln!(out, "  archived: {}", plan.archived.href);
    let _ = writeln!(
        out,
        "  live:     {} [{}]",
        plan.live.href,
        plan.live_state.as_deref().unwrap_or("?").to_uppercase()
    );
    match &plan.service {
        Some(s) => {
            let _ = writeln!(out, "  service:  {} ({})", s.href, s.name);
        }
        None => {
            let _ = writeln!(out, "  service:  {}", "none".yellow());
        }
    }
    if plan.tag_changes.is_empty() {
        let _ = writeln!(out, "  tags:     up to date");
    }
    for (category, value) in &plan.tag_changes {
        let _ = writeln!(out, "  + tag {}={}", category, value.as_str().green());
    }
    if let Some(description) = &plan.description {
        let _ = writeln!(out, "  + description '{}'", description);
    }
    if let Some(name) = &plan.service_rename {
        let _ = writeln!(out, "  + rename service to '{}'", name);
    }
    let _ = write!(out, "  - delete archived VM {}", plan.archived.href);
    out
}

pub fn report_text(report: &MigrationReport) -> String {
    let mut out = format!("Run {} for {}\n", report.run_id, report.vm_name);
    for outcome in &report.steps {
        let status = match &outcome.status {
            StepStatus::Applied => "applied".green().to_string(),
            StepStatus::Declined => "declined".yellow().to_string(),
            StepStatus::Skipped(why) => format!("skipped ({})", why).dark_grey().to_string(),
            StepStatus::Failed(why) => format!("FAILED: {}", why).red().bold().to_string(),
        };
        let _ = writeln!(out, "  {:<20} {}", outcome.step.display_name(), status);
    }
    out.trim_end().to_string()
}
