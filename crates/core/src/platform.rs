// Platform sync - writes registry servers into AI client MCP config files

use crate::registry::{ServerEntry, ServerRegistry};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// AI client platforms that read an MCP server list from a JSON file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    ClaudeDesktop,
    ClaudeCode,
    Cursor,
    Windsurf,
    Vscode,
    Cline,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Self::ClaudeDesktop,
        Self::ClaudeCode,
        Self::Cursor,
        Self::Windsurf,
        Self::Vscode,
        Self::Cline,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::ClaudeDesktop => "claude-desktop",
            Self::ClaudeCode => "claude-code",
            Self::Cursor => "cursor",
            Self::Windsurf => "windsurf",
            Self::Vscode => "vscode",
            Self::Cline => "cline",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ClaudeDesktop => "Claude Desktop",
            Self::ClaudeCode => "Claude Code",
            Self::Cursor => "Cursor",
            Self::Windsurf => "Windsurf",
            Self::Vscode => "VS Code",
            Self::Cline => "Cline",
        }
    }

    /// Top-level key holding the server map
    pub fn servers_key(&self) -> &'static str {
        match self {
            Self::Vscode => "servers",
            _ => "mcpServers",
        }
    }

    /// Default config file location for the current user
    pub fn default_config_path(&self) -> Option<PathBuf> {
        let home = dirs::home_dir();
        let config = dirs::config_dir();
        match self {
            Self::ClaudeDesktop => {
                config.map(|c| c.join("Claude").join("claude_desktop_config.json"))
            }
            Self::ClaudeCode => home.map(|h| h.join(".claude.json")),
            Self::Cursor => home.map(|h| h.join(".cursor").join("mcp.json")),
            Self::Windsurf => home.map(|h| {
                h.join(".codeium")
                    .join("windsurf")
                    .join("mcp_config.json")
            }),
            Self::Vscode => config.map(|c| c.join("Code").join("User").join("mcp.json")),
            Self::Cline => config.map(|c| {
                c.join("Code")
                    .join("User")
                    .join("globalStorage")
                    .join("saoudrizwan.claude-dev")
                    .join("settings")
                    .join("cline_mcp_settings.json")
            }),
        }
    }

    /// JSON entry this platform expects for a server
    pub fn render_entry(&self, entry: &ServerEntry) -> Value {
        let mut value = Map::new();
        if matches!(self, Self::Vscode | Self::ClaudeCode) {
            value.insert("type".into(), json!("stdio"));
        }
        value.insert("command".into(), json!(entry.command));
        value.insert("args".into(), json!(entry.args));
        if !entry.env.is_empty() {
            value.insert("env".into(), json!(entry.env));
        }
        if matches!(self, Self::Cline) {
            value.insert("disabled".into(), json!(false));
        }
        Value::Object(value)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let alias = match normalized.as_str() {
            "claude" => "claude-desktop",
            "code" | "vs-code" => "vscode",
            other => other,
        };
        Platform::ALL
            .into_iter()
            .find(|p| p.id() == alias)
            .with_context(|| format!("Unknown platform '{}'", s))
    }
}

/// Changes a sync would make to one platform config
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncPlan {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
}

impl SyncPlan {
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub platform: Platform,
    pub path: PathBuf,
    pub plan: SyncPlan,
    pub backup: Option<PathBuf>,
    pub written: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformStatus {
    pub platform: Platform,
    pub path: PathBuf,
    pub exists: bool,
    /// Enabled servers whose entry matches
    pub in_sync: Vec<String>,
    /// Enabled servers absent from the config
    pub missing: Vec<String>,
    /// Enabled servers whose entry differs
    pub outdated: Vec<String>,
    /// Servers previously written by mcphub that are no longer enabled
    pub stale: Vec<String>,
    /// Entries not managed by mcphub
    pub foreign: Vec<String>,
}

/// Sync engine bound to one platform config file
pub struct PlatformSync {
    platform: Platform,
    path: PathBuf,
}

impl PlatformSync {
    pub fn new(platform: Platform, path: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            path: path.into(),
        }
    }

    /// Use the platform's default location
    pub fn for_platform(platform: Platform) -> Result<Self> {
        let path = platform.default_config_path().with_context(|| {
            format!("Cannot determine config path for {}", platform.display_name())
        })?;
        Ok(Self::new(platform, path))
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the client looks installed (its config directory exists)
    pub fn detected(&self) -> bool {
        self.path.exists() || self.path.parent().map(Path::exists).unwrap_or(false)
    }

    fn read_document(&self) -> Result<Value> {
        if !self.path.exists() {
            return Ok(Value::Object(Map::new()));
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        if !value.is_object() {
            bail!("{} does not contain a JSON object", self.path.display());
        }
        Ok(value)
    }

    fn current_servers(&self, document: &Value) -> Result<Map<String, Value>> {
        match document.get(self.platform.servers_key()) {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => bail!(
                "'{}' in {} is not an object",
                self.platform.servers_key(),
                self.path.display()
            ),
        }
    }

    /// Desired entry merged over the existing one so user-added keys survive
    fn merged_entry(&self, existing: Option<&Value>, entry: &ServerEntry) -> Value {
        let desired = self.platform.render_entry(entry);
        match (existing, desired) {
            (Some(Value::Object(old)), Value::Object(new)) => {
                let mut merged = old.clone();
                if !new.contains_key("env") {
                    merged.remove("env");
                }
                merged.extend(new);
                Value::Object(merged)
            }
            (_, desired) => desired,
        }
    }

    fn compute(
        &self,
        registry: &ServerRegistry,
        servers: &Map<String, Value>,
    ) -> (SyncPlan, Map<String, Value>) {
        let mut plan = SyncPlan::default();
        let mut next = servers.clone();
        let enabled = registry.enabled();
        let enabled_names: BTreeSet<&str> = enabled.iter().map(|s| s.name.as_str()).collect();

        for entry in &enabled {
            let existing = servers.get(&entry.name);
            let merged = self.merged_entry(existing, entry);
            match existing {
                None => plan.added.push(entry.name.clone()),
                Some(old) if *old == merged => plan.unchanged.push(entry.name.clone()),
                Some(_) => plan.updated.push(entry.name.clone()),
            }
            next.insert(entry.name.clone(), merged);
        }

        for name in registry.synced(self.platform.id()) {
            if !enabled_names.contains(name.as_str()) && next.remove(name).is_some() {
                plan.removed.push(name.clone());
            }
        }

        (plan, next)
    }

    /// Compute changes without touching the file
    pub fn plan(&self, registry: &ServerRegistry) -> Result<SyncPlan> {
        let document = self.read_document()?;
        let servers = self.current_servers(&document)?;
        Ok(self.compute(registry, &servers).0)
    }

    /// Write the enabled servers, backing up the previous file, and record what was synced
    pub fn apply(&self, registry: &mut ServerRegistry) -> Result<SyncReport> {
        let mut document = self.read_document()?;
        let servers = self.current_servers(&document)?;
        let (plan, next) = self.compute(registry, &servers);

        let names: Vec<String> = registry.enabled().iter().map(|s| s.name.clone()).collect();

        if !plan.has_changes() {
            tracing::debug!(platform = %self.platform, "Platform already in sync");
            registry.set_synced(self.platform.id(), names);
            return Ok(SyncReport {
                platform: self.platform,
                path: self.path.clone(),
                plan,
                backup: None,
                written: false,
            });
        }

        let backup = self.backup()?;

        if let Value::Object(map) = &mut document {
            map.insert(self.platform.servers_key().to_string(), Value::Object(next));
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&document)?;
        std::fs::write(&self.path, format!("{}\n", content))
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        registry.set_synced(self.platform.id(), names);

        tracing::info!(
            platform = %self.platform,
            path = %self.path.display(),
            added = plan.added.len(),
            updated = plan.updated.len(),
            removed = plan.removed.len(),
            "Synced platform config"
        );

        Ok(SyncReport {
            platform: self.platform,
            path: self.path.clone(),
            plan,
            backup,
            written: true,
        })
    }

    fn backup(&self) -> Result<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S%3f").to_string();
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "config".to_string());
        let mut backup = self.path.with_file_name(format!("{}.{}.bak", file_name, stamp));
        let mut counter = 1;
        while backup.exists() {
            backup = self
                .path
                .with_file_name(format!("{}.{}-{}.bak", file_name, stamp, counter));
            counter += 1;
        }
        std::fs::copy(&self.path, &backup)
            .with_context(|| format!("Failed to back up {}", self.path.display()))?;
        Ok(Some(backup))
    }

    pub fn status(&self, registry: &ServerRegistry) -> Result<PlatformStatus> {
        let document = self.read_document()?;
        let servers = self.current_servers(&document)?;
        let enabled = registry.enabled();
        let managed: BTreeSet<&str> = registry
            .synced(self.platform.id())
            .iter()
            .map(String::as_str)
            .chain(registry.list().iter().map(|s| s.name.as_str()))
            .collect();

        let mut status = PlatformStatus {
            platform: self.platform,
            path: self.path.clone(),
            exists: self.path.exists(),
            in_sync: Vec::new(),
            missing: Vec::new(),
            outdated: Vec::new(),
            stale: Vec::new(),
            foreign: Vec::new(),
        };

        for entry in &enabled {
            match servers.get(&entry.name) {
                None => status.missing.push(entry.name.clone()),
                Some(old) if *old == self.merged_entry(Some(old), entry) => {
                    status.in_sync.push(entry.name.clone())
                }
                Some(_) => status.outdated.push(entry.name.clone()),
            }
        }

        for name in servers.keys() {
            if enabled.iter().any(|e| &e.name == name) {
                continue;
            }
            if registry.synced(self.platform.id()).contains(name) {
                status.stale.push(name.clone());
            } else if !managed.contains(name.as_str()) {
                status.foreign.push(name.clone());
            }
        }

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServerEntry;
    use tempfile::TempDir;

    fn registry_with(names: &[&str]) -> ServerRegistry {
        let mut registry = ServerRegistry::default();
        for name in names {
            registry
                .add(ServerEntry::custom(*name, "mcphub-mcp", vec![name.to_string()]), false)
                .unwrap();
        }
        registry
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_platform_parsing() {
        assert_eq!("cursor".parse::<Platform>().unwrap(), Platform::Cursor);
        assert_eq!("claude_desktop".parse::<Platform>().unwrap(), Platform::ClaudeDesktop);
        assert_eq!("VS-Code".parse::<Platform>().unwrap(), Platform::Vscode);
        assert!("emacs".parse::<Platform>().is_err());
    }

    #[test]
    fn test_render_entry_shapes() {
        let mut entry = ServerEntry::custom("docs", "mcphub-mcp", vec!["docs".to_string()]);
        assert_eq!(
            Platform::Cursor.render_entry(&entry),
            json!({"command": "mcphub-mcp", "args": ["docs"]})
        );
        assert_eq!(Platform::Vscode.render_entry(&entry)["type"], "stdio");
        assert_eq!(Platform::ClaudeCode.render_entry(&entry)["type"], "stdio");
        assert_eq!(Platform::Cline.render_entry(&entry)["disabled"], false);

        entry.env.insert("A".to_string(), "1".to_string());
        assert_eq!(Platform::Windsurf.render_entry(&entry)["env"]["A"], "1");
    }

    #[test]
    fn test_apply_creates_file_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cursor").join("mcp.json");
        let sync = PlatformSync::new(Platform::Cursor, &path);
        let mut registry = registry_with(&["docs", "jira"]);

        let report = sync.apply(&mut registry).unwrap();
        assert!(report.written);
        assert!(report.backup.is_none());
        assert_eq!(report.plan.added, vec!["docs", "jira"]);

        let doc = read_json(&path);
        assert_eq!(doc["mcpServers"]["docs"]["args"], json!(["docs"]));
        assert_eq!(registry.synced("cursor"), &["docs".to_string(), "jira".to_string()]);
    }

    #[test]
    fn test_apply_preserves_foreign_entries_and_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"theme": "dark", "servers": {"other": {"command": "x"}}}"#,
        )
        .unwrap();
        let sync = PlatformSync::new(Platform::Vscode, &path);
        let mut registry = registry_with(&["docs"]);

        let report = sync.apply(&mut registry).unwrap();
        assert!(report.backup.as_ref().unwrap().exists());

        let doc = read_json(&path);
        assert_eq!(doc["theme"], "dark");
        assert_eq!(doc["servers"]["other"]["command"], "x");
        assert_eq!(doc["servers"]["docs"]["type"], "stdio");
    }

    #[test]
    fn test_disabled_servers_are_removed_only_if_managed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mcp.json");
        let sync = PlatformSync::new(Platform::Windsurf, &path);
        let mut registry = registry_with(&["docs", "jira"]);
        sync.apply(&mut registry).unwrap();

        registry.set_enabled("jira", false).unwrap();
        let plan = sync.plan(&registry).unwrap();
        assert_eq!(plan.removed, vec!["jira"]);
        assert_eq!(plan.unchanged, vec!["docs"]);

        sync.apply(&mut registry).unwrap();
        let doc = read_json(&path);
        assert!(doc["mcpServers"].get("jira").is_none());
        assert_eq!(registry.synced("windsurf"), &["docs".to_string()]);
    }

    #[test]
    fn test_plan_is_dry_run() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mcp.json");
        let sync = PlatformSync::new(Platform::Cursor, &path);
        let registry = registry_with(&["docs"]);

        let plan = sync.plan(&registry).unwrap();
        assert_eq!(plan.added, vec!["docs"]);
        assert!(!path.exists());
    }

    #[test]
    fn test_second_apply_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mcp.json");
        let sync = PlatformSync::new(Platform::Cline, &path);
        let mut registry = registry_with(&["docs"]);
        sync.apply(&mut registry).unwrap();

        let report = sync.apply(&mut registry).unwrap();
        assert!(!report.written);
        assert_eq!(report.plan.unchanged, vec!["docs"]);
    }

    #[test]
    fn test_user_keys_inside_entry_survive() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cline.json");
        std::fs::write(
            &path,
            r#"{"mcpServers": {"docs": {"command": "old", "args": [], "autoApprove": ["list_formats"]}}}"#,
        )
        .unwrap();
        let sync = PlatformSync::new(Platform::Cline, &path);
        let mut registry = registry_with(&["docs"]);

        let report = sync.apply(&mut registry).unwrap();
        assert_eq!(report.plan.updated, vec!["docs"]);
        let doc = read_json(&path);
        assert_eq!(doc["mcpServers"]["docs"]["command"], "mcphub-mcp");
        assert_eq!(doc["mcpServers"]["docs"]["autoApprove"], json!(["list_formats"]));
    }

    #[test]
    fn test_status() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mcp.json");
        std::fs::write(
            &path,
            r#"{"mcpServers": {"docs": {"command": "stale-binary", "args": []}, "mine": {"command": "y"}}}"#,
        )
        .unwrap();
        let sync = PlatformSync::new(Platform::Cursor, &path);
        let registry = registry_with(&["docs", "context"]);

        let status = sync.status(&registry).unwrap();
        assert!(status.exists);
        assert_eq!(status.outdated, vec!["docs"]);
        assert_eq!(status.missing, vec!["context"]);
        assert_eq!(status.foreign, vec!["mine"]);
    }

    #[test]
    fn test_failed_write_does_not_record_synced() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let sync = PlatformSync::new(Platform::Cursor, blocker.join("mcp.json"));
        let mut registry = registry_with(&["docs"]);

        assert!(sync.apply(&mut registry).is_err());
        assert!(registry.synced("cursor").is_empty());
    }

    #[test]
    fn test_backups_in_quick_succession_are_kept() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mcp.json");
        std::fs::write(&path, "{}").unwrap();
        let sync = PlatformSync::new(Platform::Cursor, &path);
        let mut registry = registry_with(&["docs"]);

        let first = sync.apply(&mut registry).unwrap().backup.unwrap();
        registry
            .add(ServerEntry::custom("jira", "mcphub-mcp", vec!["jira".to_string()]), false)
            .unwrap();
        let second = sync.apply(&mut registry).unwrap().backup.unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "{}");
        assert!(read_json(&second)["mcpServers"].get("docs").is_some());
    }

    #[test]
    fn test_invalid_document_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mcp.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let sync = PlatformSync::new(Platform::Cursor, &path);
        assert!(sync.plan(&registry_with(&["docs"])).is_err());
    }
}
