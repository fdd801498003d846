use anyhow::{Context, Result};
use mcphub_core::platform::{Platform, PlatformSync};
use mcphub_core::registry::{ServerRegistry, REGISTRY_FILE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";
pub const HOME_ENV: &str = "MCPHUB_HOME";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Where servers.toml lives; defaults to the mcphub home directory
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Per-platform overrides keyed by platform id
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformConfig>,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(skip)]
    home: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub config_path: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Binary registered for builtin and manifest servers
    #[serde(default = "default_mcp_binary")]
    pub mcp_binary: String,

    #[serde(default = "default_check_timeout")]
    pub check_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_mcp_binary() -> String {
    "mcphub-mcp".to_string()
}

fn default_check_timeout() -> u64 {
    15
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            mcp_binary: default_mcp_binary(),
            check_timeout_secs: default_check_timeout(),
        }
    }
}

/// `$MCPHUB_HOME`, else `<config_dir>/mcphub`
pub fn home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    dirs::config_dir()
        .map(|dir| dir.join("mcphub"))
        .context("Cannot determine a config directory; set MCPHUB_HOME")
}

impl CliConfig {
    /// Load from `path`, or `<home>/config.toml`; a missing file means defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let home = home_dir()?;
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => home.join(CONFIG_FILE),
        };
        Self::load_from(&path, home)
    }

    pub fn load_from(path: &Path, home: PathBuf) -> Result<Self> {
        let mut config: Self = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            tracing::debug!(path = %path.display(), "Configuration file not found, using defaults");
            Self::default()
        };

        for id in config.platforms.keys() {
            id.parse::<Platform>()
                .with_context(|| format!("Unknown platform '{}' in {}", id, path.display()))?;
        }

        config.home = home;
        Ok(config)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| self.home.clone())
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir().join(REGISTRY_FILE)
    }

    pub fn load_registry(&self) -> Result<ServerRegistry> {
        ServerRegistry::load(&self.registry_path())
    }

    fn platform_config(&self, platform: Platform) -> Option<&PlatformConfig> {
        self.platforms.get(platform.id())
    }

    pub fn platform_enabled(&self, platform: Platform) -> bool {
        self.platform_config(platform).map_or(true, |p| p.enabled)
    }

    /// Sync engine for a platform, honouring a configured path override
    pub fn platform_sync(&self, platform: Platform) -> Result<PlatformSync> {
        match self
            .platform_config(platform)
            .and_then(|p| p.config_path.clone())
        {
            Some(path) => Ok(PlatformSync::new(platform, path)),
            None => PlatformSync::for_platform(platform),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config =
            CliConfig::load_from(&temp_dir.path().join("none.toml"), temp_dir.path().into())
                .unwrap();
        assert_eq!(config.defaults.mcp_binary, "mcphub-mcp");
        assert_eq!(config.registry_path(), temp_dir.path().join("servers.toml"));
        assert!(config.platform_enabled(Platform::Cursor));
    }

    #[test]
    fn test_platform_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
data_dir = "/var/lib/mcphub"

[platforms.cursor]
config_path = "/tmp/cursor/mcp.json"

[platforms.windsurf]
enabled = false

[defaults]
mcp_binary = "/opt/mcphub/bin/mcphub-mcp"
"#,
        )
        .unwrap();

        let config = CliConfig::load_from(&path, temp_dir.path().into()).unwrap();
        assert_eq!(config.data_dir(), PathBuf::from("/var/lib/mcphub"));
        assert_eq!(config.defaults.mcp_binary, "/opt/mcphub/bin/mcphub-mcp");
        assert!(!config.platform_enabled(Platform::Windsurf));
        assert!(config.platform_enabled(Platform::Cursor));
        assert_eq!(
            config.platform_sync(Platform::Cursor).unwrap().path(),
            Path::new("/tmp/cursor/mcp.json")
        );
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[platforms.emacs]\nenabled = true\n").unwrap();
        let err = CliConfig::load_from(&path, temp_dir.path().into()).unwrap_err();
        assert!(err.to_string().contains("emacs"));
    }
}
