// Persistent registry of MCP servers managed by mcphub

use crate::manifest::{is_valid_name, ServerManifest};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const REGISTRY_FILE: &str = "servers.toml";

/// Where a registered server came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerSource {
    Builtin,
    Manifest,
    Custom,
}

impl std::fmt::Display for ServerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Builtin => "builtin",
            Self::Manifest => "manifest",
            Self::Custom => "custom",
        };
        f.write_str(s)
    }
}

/// Built-in server profiles shipped with `mcphub-mcp`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinServer {
    Docs,
    Jira,
    Context,
    Generator,
}

impl BuiltinServer {
    pub const ALL: [BuiltinServer; 4] = [Self::Docs, Self::Jira, Self::Context, Self::Generator];

    pub fn profile(&self) -> &'static str {
        match self {
            Self::Docs => "docs",
            Self::Jira => "jira",
            Self::Context => "context",
            Self::Generator => "generator",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Docs => "Convert Markdown to PDF, HTML, DOCX and plain text",
            Self::Jira => "Jira issues, search, comments and workflow transitions",
            Self::Context => "Current time, system and environment context",
            Self::Generator => "Generate and validate command-backed MCP servers",
        }
    }

    /// Environment variables the profile reads, forwarded to platform configs when set
    pub fn env_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Jira => &["JIRA_URL", "JIRA_EMAIL", "JIRA_API_TOKEN", "JIRA_PAT"],
            Self::Docs => &["MCPHUB_OUTPUT_DIR", "MCPHUB_PDF_ENGINE"],
            Self::Context => &["MCPHUB_WEATHER_URL"],
            Self::Generator => &[],
        }
    }

    pub fn entry(&self, mcp_binary: &str) -> ServerEntry {
        let env = self
            .env_keys()
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
            .collect();

        ServerEntry {
            name: self.profile().to_string(),
            command: mcp_binary.to_string(),
            args: vec![self.profile().to_string()],
            description: self.description().to_string(),
            enabled: true,
            source: ServerSource::Builtin,
            added_at: Utc::now(),
            env,
        }
    }
}

impl std::str::FromStr for BuiltinServer {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.profile() == s)
            .with_context(|| {
                format!(
                    "Unknown builtin server '{}' (available: {})",
                    s,
                    Self::ALL.map(|b| b.profile()).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub source: ServerSource,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

impl ServerEntry {
    pub fn custom(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            description: String::new(),
            enabled: true,
            source: ServerSource::Custom,
            added_at: Utc::now(),
            env: BTreeMap::new(),
        }
    }

    /// Entry that serves a manifest through `mcphub-mcp dynamic`
    pub fn from_manifest(manifest: &ServerManifest, manifest_path: &Path, mcp_binary: &str) -> Self {
        Self {
            name: manifest.server.name.clone(),
            command: mcp_binary.to_string(),
            args: vec![
                "dynamic".to_string(),
                "--manifest".to_string(),
                manifest_path.display().to_string(),
            ],
            description: manifest.server.description.clone(),
            enabled: true,
            source: ServerSource::Manifest,
            added_at: Utc::now(),
            env: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_name(&self.name) {
            bail!(
                "Invalid server name '{}': use lowercase letters, digits, '-' and '_'",
                self.name
            );
        }
        if self.command.trim().is_empty() {
            bail!("Server '{}' has an empty command", self.name);
        }
        Ok(())
    }
}

/// Servers plus the names mcphub has written into each platform config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerRegistry {
    #[serde(skip)]
    path: PathBuf,
    #[serde(default)]
    servers: Vec<ServerEntry>,
    #[serde(default)]
    synced: BTreeMap<String, Vec<String>>,
}

impl ServerRegistry {
    /// Load from disk; a missing file is an empty registry
    pub fn load(path: &Path) -> Result<Self> {
        let mut registry: Self = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read registry {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse registry {}", path.display()))?
        } else {
            tracing::debug!(path = %path.display(), "Registry not found, starting empty");
            Self::default()
        };
        registry.path = path.to_path_buf();
        Ok(registry)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create registry directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize registry")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write registry {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a server; an existing name is an error unless `replace` is set
    pub fn add(&mut self, entry: ServerEntry, replace: bool) -> Result<()> {
        entry.validate()?;
        match self.servers.iter_mut().find(|s| s.name == entry.name) {
            Some(existing) if replace => *existing = entry,
            Some(_) => bail!("Server '{}' is already registered", entry.name),
            None => self.servers.push(entry),
        }
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<ServerEntry> {
        let index = self
            .servers
            .iter()
            .position(|s| s.name == name)
            .with_context(|| format!("Server '{}' is not registered", name))?;
        Ok(self.servers.remove(index))
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let entry = self
            .servers
            .iter_mut()
            .find(|s| s.name == name)
            .with_context(|| format!("Server '{}' is not registered", name))?;
        entry.enabled = enabled;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ServerEntry> {
        self.servers.iter().find(|s| s.name == name)
    }

    /// All servers sorted by name
    pub fn list(&self) -> Vec<&ServerEntry> {
        let mut servers: Vec<&ServerEntry> = self.servers.iter().collect();
        servers.sort_by(|a, b| a.name.cmp(&b.name));
        servers
    }

    pub fn enabled(&self) -> Vec<&ServerEntry> {
        self.list().into_iter().filter(|s| s.enabled).collect()
    }

    pub fn synced(&self, platform_id: &str) -> &[String] {
        self.synced
            .get(platform_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set_synced(&mut self, platform_id: &str, mut names: Vec<String>) {
        names.sort();
        names.dedup();
        if names.is_empty() {
            self.synced.remove(platform_id);
        } else {
            self.synced.insert(platform_id.to_string(), names);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_list_remove() {
        let mut registry = ServerRegistry::default();
        registry
            .add(ServerEntry::custom("zeta", "zeta-server", vec![]), false)
            .unwrap();
        registry
            .add(ServerEntry::custom("alpha", "alpha-server", vec!["--stdio".to_string()]), false)
            .unwrap();

        let names: Vec<&str> = registry.list().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        let removed = registry.remove("zeta").unwrap();
        assert_eq!(removed.command, "zeta-server");
        assert!(registry.get("zeta").is_none());
        assert!(registry.remove("zeta").is_err());
    }

    #[test]
    fn test_duplicate_rejected_unless_replace() {
        let mut registry = ServerRegistry::default();
        registry.add(ServerEntry::custom("a", "one", vec![]), false).unwrap();
        assert!(registry.add(ServerEntry::custom("a", "two", vec![]), false).is_err());
        registry.add(ServerEntry::custom("a", "two", vec![]), true).unwrap();
        assert_eq!(registry.get("a").unwrap().command, "two");
    }

    #[test]
    fn test_invalid_entries_rejected() {
        let mut registry = ServerRegistry::default();
        assert!(registry.add(ServerEntry::custom("Bad Name", "x", vec![]), false).is_err());
        assert!(registry.add(ServerEntry::custom("ok", "  ", vec![]), false).is_err());
    }

    #[test]
    fn test_enable_disable() {
        let mut registry = ServerRegistry::default();
        registry.add(ServerEntry::custom("a", "one", vec![]), false).unwrap();
        registry.add(ServerEntry::custom("b", "two", vec![]), false).unwrap();
        registry.set_enabled("a", false).unwrap();

        let enabled: Vec<&str> = registry.enabled().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(enabled, vec!["b"]);
        assert!(registry.set_enabled("missing", true).is_err());
    }

    #[test]
    fn test_persistence_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(REGISTRY_FILE);

        let mut registry = ServerRegistry::load(&path).unwrap();
        let mut entry = ServerEntry::custom("docs", "mcphub-mcp", vec!["docs".to_string()]);
        entry.env.insert("MCPHUB_OUTPUT_DIR".to_string(), "/tmp/out".to_string());
        registry.add(entry.clone(), false).unwrap();
        registry.set_synced("cursor", vec!["docs".to_string(), "docs".to_string()]);
        registry.save().unwrap();

        let loaded = ServerRegistry::load(&path).unwrap();
        assert_eq!(loaded.get("docs"), Some(&entry));
        assert_eq!(loaded.synced("cursor"), &["docs".to_string()]);
        assert!(loaded.synced("vscode").is_empty());
    }

    #[test]
    fn test_builtin_entries() {
        let entry = BuiltinServer::Docs.entry("/usr/local/bin/mcphub-mcp");
        assert_eq!(entry.name, "docs");
        assert_eq!(entry.args, vec!["docs"]);
        assert_eq!(entry.source, ServerSource::Builtin);

        assert_eq!("jira".parse::<BuiltinServer>().unwrap(), BuiltinServer::Jira);
        assert!("nope".parse::<BuiltinServer>().is_err());
    }

    #[test]
    fn test_manifest_entry() {
        let manifest: ServerManifest =
            toml::from_str("[server]\nname = \"git-tools\"\ndescription = \"Git\"\n").unwrap();
        let entry = ServerEntry::from_manifest(&manifest, Path::new("/srv/git/mcphub.toml"), "mcphub-mcp");
        assert_eq!(entry.args, vec!["dynamic", "--manifest", "/srv/git/mcphub.toml"]);
        assert_eq!(entry.source, ServerSource::Manifest);
    }
}
