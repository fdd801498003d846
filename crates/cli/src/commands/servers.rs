// Registering, listing and toggling servers

use crate::config::CliConfig;
use anyhow::{Context, Result};
use mcphub_core::manifest::{ServerManifest, MANIFEST_FILE};
use mcphub_core::registry::{BuiltinServer, ServerEntry, ServerRegistry};
use std::collections::BTreeMap;
use std::path::Path;

/// Parse repeated `KEY=VALUE` flags
pub fn parse_env_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("Expected KEY=VALUE, got '{}'", pair))?;
            let key = key.trim();
            anyhow::ensure!(!key.is_empty(), "Empty variable name in '{}'", pair);
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

pub fn list(registry: &ServerRegistry) {
    let servers = registry.list();
    if servers.is_empty() {
        println!("No servers registered. Try `mcphub install docs`.");
        return;
    }

    println!("{:<20} {:<8} {:<9} COMMAND", "NAME", "ENABLED", "SOURCE");
    for server in servers {
        println!(
            "{:<20} {:<8} {:<9} {} {}",
            server.name,
            if server.enabled { "yes" } else { "no" },
            server.source,
            server.command,
            server.args.join(" ")
        );
        if !server.description.is_empty() {
            println!("{:<20} {}", "", server.description);
        }
    }
}

pub struct AddOptions {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<String>,
    pub description: Option<String>,
    pub replace: bool,
}

pub fn add(registry: &mut ServerRegistry, options: AddOptions) -> Result<ServerEntry> {
    let mut entry = ServerEntry::custom(options.name, options.command, options.args);
    entry.env = parse_env_pairs(&options.env)?;
    if let Some(description) = options.description {
        entry.description = description;
    }
    registry.add(entry.clone(), options.replace)?;
    registry.save()?;
    Ok(entry)
}

/// Register one of the builtin `mcphub-mcp` profiles, capturing its env vars from the shell
pub fn install(
    config: &CliConfig,
    registry: &mut ServerRegistry,
    builtin: &str,
    replace: bool,
) -> Result<ServerEntry> {
    let builtin: BuiltinServer = builtin.parse()?;
    let entry = builtin.entry(&config.defaults.mcp_binary);

    let missing: Vec<&str> = builtin
        .env_keys()
        .iter()
        .copied()
        .filter(|key| !entry.env.contains_key(*key))
        .collect();
    if builtin == BuiltinServer::Jira && !entry.env.contains_key("JIRA_URL") {
        tracing::warn!("JIRA_URL is not set; the jira server will fail to start until it is");
    }
    if !missing.is_empty() {
        tracing::info!(server = builtin.profile(), missing = ?missing, "Optional variables not captured");
    }

    registry.add(entry.clone(), replace)?;
    registry.save()?;
    Ok(entry)
}

/// Register a dynamic server from a manifest file or a directory containing one
pub fn install_manifest(
    config: &CliConfig,
    registry: &mut ServerRegistry,
    path: &Path,
    replace: bool,
) -> Result<ServerEntry> {
    let path = if path.is_dir() {
        path.join(MANIFEST_FILE)
    } else {
        path.to_path_buf()
    };
    let path = path
        .canonicalize()
        .with_context(|| format!("Manifest not found: {}", path.display()))?;

    let manifest = ServerManifest::load(&path)?;
    let entry = ServerEntry::from_manifest(&manifest, &path, &config.defaults.mcp_binary);
    registry.add(entry.clone(), replace)?;
    registry.save()?;
    Ok(entry)
}

pub fn remove(registry: &mut ServerRegistry, name: &str) -> Result<ServerEntry> {
    let entry = registry.remove(name)?;
    registry.save()?;
    Ok(entry)
}

pub fn set_enabled(registry: &mut ServerRegistry, name: &str, enabled: bool) -> Result<()> {
    registry.set_enabled(name, enabled)?;
    registry.save()
}
