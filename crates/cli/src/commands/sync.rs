// Writing registered servers into AI client configs

use crate::config::CliConfig;
use anyhow::{Context, Result};
use mcphub_core::platform::{Platform, PlatformStatus, PlatformSync, SyncPlan, SyncReport};
use mcphub_core::registry::ServerRegistry;

/// Requested platforms, or every enabled platform that looks installed
pub fn target_platforms(config: &CliConfig, requested: &[String]) -> Result<Vec<PlatformSync>> {
    if !requested.is_empty() {
        return requested
            .iter()
            .map(|id| config.platform_sync(id.parse::<Platform>()?))
            .collect();
    }

    let mut targets = Vec::new();
    for platform in Platform::ALL {
        if !config.platform_enabled(platform) {
            continue;
        }
        match config.platform_sync(platform) {
            Ok(sync) if sync.detected() => targets.push(sync),
            Ok(sync) => {
                tracing::debug!(platform = %platform, path = %sync.path().display(), "Platform not detected")
            }
            Err(e) => tracing::debug!(platform = %platform, error = %e, "Skipping platform"),
        }
    }
    Ok(targets)
}

pub fn platforms(config: &CliConfig) {
    println!("{:<16} {:<16} {:<9} CONFIG", "ID", "NAME", "DETECTED");
    for platform in Platform::ALL {
        let (path, detected) = match config.platform_sync(platform) {
            Ok(sync) => (sync.path().display().to_string(), sync.detected()),
            Err(_) => ("-".to_string(), false),
        };
        let detected = match (detected, config.platform_enabled(platform)) {
            (_, false) => "disabled",
            (true, true) => "yes",
            (false, true) => "no",
        };
        println!(
            "{:<16} {:<16} {:<9} {}",
            platform.id(),
            platform.display_name(),
            detected,
            path
        );
    }
}

fn describe_plan(plan: &SyncPlan) -> String {
    let mut parts = Vec::new();
    for (label, names) in [
        ("add", &plan.added),
        ("update", &plan.updated),
        ("remove", &plan.removed),
    ] {
        if !names.is_empty() {
            parts.push(format!("{} {}", label, names.join(", ")));
        }
    }
    if parts.is_empty() {
        "up to date".to_string()
    } else {
        parts.join("; ")
    }
}

/// Plan (dry run) or apply the registry to each target.
///
/// The registry is saved after every successful apply, so a failing target
/// never loses track of entries already written to earlier ones.
pub fn sync(
    registry: &mut ServerRegistry,
    targets: &[PlatformSync],
    dry_run: bool,
) -> Result<Vec<SyncReport>> {
    let mut reports = Vec::with_capacity(targets.len());
    for target in targets {
        let report = if dry_run {
            SyncReport {
                platform: target.platform(),
                path: target.path().to_path_buf(),
                plan: target.plan(registry)?,
                backup: None,
                written: false,
            }
        } else {
            let report = target
                .apply(registry)
                .with_context(|| format!("Failed to sync {}", target.platform().display_name()))?;
            registry.save()?;
            report
        };
        reports.push(report);
    }
    Ok(reports)
}

pub fn print_reports(reports: &[SyncReport], dry_run: bool) {
    if reports.is_empty() {
        println!("No platforms detected. Use --platform to choose one explicitly.");
        return;
    }
    for report in reports {
        let prefix = if dry_run { "would " } else { "" };
        let plan = describe_plan(&report.plan);
        let plan = if report.plan.has_changes() {
            format!("{}{}", prefix, plan)
        } else {
            plan
        };
        println!(
            "{:<16} {} ({})",
            report.platform.display_name(),
            plan,
            report.path.display()
        );
        if let Some(backup) = &report.backup {
            println!("{:<16} backup: {}", "", backup.display());
        }
    }
}

pub fn status(registry: &ServerRegistry, targets: &[PlatformSync]) -> Result<Vec<PlatformStatus>> {
    targets.iter().map(|t| t.status(registry)).collect()
}

pub fn print_status(statuses: &[PlatformStatus]) {
    for status in statuses {
        println!("{} ({})", status.platform.display_name(), status.path.display());
        if !status.exists {
            println!("  config file does not exist yet");
        }
        for (label, names) in [
            ("in sync", &status.in_sync),
            ("missing", &status.missing),
            ("outdated", &status.outdated),
            ("stale", &status.stale),
            ("unmanaged", &status.foreign),
        ] {
            if !names.is_empty() {
                println!("  {:<10} {}", label, names.join(", "));
            }
        }
    }
}
