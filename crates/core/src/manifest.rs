// Server manifests: declarative MCP servers whose tools run local commands

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// File name the generator writes and `install-manifest` expects by default
pub const MANIFEST_FILE: &str = "mcphub.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerManifest {
    pub server: ManifestServer,
    #[serde(default)]
    pub tools: Vec<CommandToolSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestServer {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// A tool that runs `command` with `args`, `{{param}}` placeholders filled from the call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub param_type: ParameterType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    #[default]
    String,
    Number,
    Boolean,
}

impl ParameterType {
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// A command ready to spawn
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout_secs: u64,
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid regex"))
}

/// Check a server or tool name: lowercase letters, digits, `-` and `_`
pub fn is_valid_name(name: &str) -> bool {
    name_pattern().is_match(name)
}

impl ServerManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid manifest {}", path.display()))
    }

    /// Parse and validate manifest TOML
    pub fn from_toml(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content).context("Failed to parse manifest TOML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize manifest")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write manifest {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_name(&self.server.name) {
            bail!(
                "Invalid server name '{}': use lowercase letters, digits, '-' and '_'",
                self.server.name
            );
        }

        let mut seen = HashSet::new();
        for tool in &self.tools {
            if !is_valid_name(&tool.name) {
                bail!("Invalid tool name '{}'", tool.name);
            }
            if !seen.insert(tool.name.as_str()) {
                bail!("Duplicate tool name '{}'", tool.name);
            }
            tool.validate()?;
        }

        Ok(())
    }

    pub fn tool(&self, name: &str) -> Option<&CommandToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }
}

impl CommandToolSpec {
    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            bail!("Tool '{}' has an empty command", self.name);
        }
        if self.timeout_secs == 0 {
            bail!("Tool '{}' must have a non-zero timeout", self.name);
        }

        let mut declared = HashSet::new();
        for param in &self.parameters {
            if param.name.trim().is_empty() {
                bail!("Tool '{}' has a parameter without a name", self.name);
            }
            if !declared.insert(param.name.as_str()) {
                bail!("Tool '{}' declares parameter '{}' twice", self.name, param.name);
            }
            if let Some(default) = &param.default {
                validate_value(param, default)?;
            }
        }

        for placeholder in self.placeholders() {
            if !declared.contains(placeholder.as_str()) {
                bail!(
                    "Tool '{}' uses undeclared parameter '{{{{{}}}}}'",
                    self.name,
                    placeholder
                );
            }
        }

        Ok(())
    }

    /// All placeholder names used by the command and its arguments
    pub fn placeholders(&self) -> Vec<String> {
        let mut names = extract_parameters(&self.command);
        for arg in &self.args {
            names.extend(extract_parameters(arg));
        }
        names.sort();
        names.dedup();
        names
    }

    /// MCP input schema derived from the declared parameters
    pub fn input_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut schema = serde_json::json!({
                "type": param.param_type.json_type(),
                "description": param.description,
            });
            if let Some(default) = &param.default {
                schema["default"] = serde_json::Value::String(default.clone());
            }
            properties.insert(param.name.clone(), schema);
            if param.required && param.default.is_none() {
                required.push(param.name.clone());
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Fill placeholders from call arguments and defaults
    pub fn instantiate(&self, arguments: &serde_json::Value) -> Result<ResolvedCommand> {
        let mut values: HashMap<String, String> = HashMap::new();
        let mut omitted: HashSet<&str> = HashSet::new();

        for param in &self.parameters {
            let provided = arguments.get(&param.name).and_then(value_to_string);
            let value = match provided.or_else(|| param.default.clone()) {
                Some(v) if v.is_empty() && param.required => {
                    bail!("Required parameter '{}' must not be empty", param.name)
                }
                Some(v) => v,
                None if param.required => {
                    bail!("Required parameter '{}' not provided", param.name)
                }
                None => {
                    omitted.insert(param.name.as_str());
                    String::new()
                }
            };
            if !value.is_empty() {
                validate_value(param, &value)?;
            }
            values.insert(param.name.clone(), value);
        }

        let args = self
            .args
            .iter()
            // An argument made only of an omitted optional parameter is dropped
            .filter(|arg| {
                sole_placeholder(arg).map_or(true, |name| !omitted.contains(name))
            })
            .map(|arg| replace_parameters(arg, &values))
            .collect();

        Ok(ResolvedCommand {
            program: replace_parameters(&self.command, &values),
            args,
            working_dir: self.working_dir.clone(),
            timeout_secs: self.timeout_secs,
        })
    }
}

fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn validate_value(param: &ToolParameter, value: &str) -> Result<()> {
    match param.param_type {
        ParameterType::String => Ok(()),
        ParameterType::Number => {
            value
                .parse::<f64>()
                .with_context(|| format!("Parameter '{}' must be a number", param.name))?;
            Ok(())
        }
        ParameterType::Boolean => {
            value
                .parse::<bool>()
                .with_context(|| format!("Parameter '{}' must be true or false", param.name))?;
            Ok(())
        }
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("valid regex"))
}

/// Name of the placeholder when `text` is nothing but one `{{name}}`
fn sole_placeholder(text: &str) -> Option<&str> {
    let caps = placeholder_pattern().captures(text.trim())?;
    let whole = caps.get(0)?;
    (whole.as_str().len() == text.trim().len()).then(|| caps.get(1).map_or("", |m| m.as_str()))
}

/// Replace `{{name}}` placeholders in a single pass; inserted values are not rescanned
pub fn replace_parameters(text: &str, params: &HashMap<String, String>) -> String {
    placeholder_pattern()
        .replace_all(text, |caps: &regex::Captures| match params.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Extract placeholder names from a template string
pub fn extract_parameters(text: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current = String::new();
    let mut in_param = false;

    while let Some(c) = chars.next() {
        if c == '{' && chars.peek() == Some(&'{') {
            chars.next();
            in_param = true;
            current.clear();
        } else if c == '}' && chars.peek() == Some(&'}') && in_param {
            chars.next();
            if !current.trim().is_empty() {
                params.push(current.trim().to_string());
            }
            in_param = false;
            current.clear();
        } else if in_param {
            current.push(c);
        }
    }

    params.sort();
    params.dedup();
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git_log_tool() -> CommandToolSpec {
        CommandToolSpec {
            name: "git_log".to_string(),
            description: "Show recent commits".to_string(),
            command: "git".to_string(),
            args: vec![
                "log".to_string(),
                "-n".to_string(),
                "{{count}}".to_string(),
                "{{path}}".to_string(),
            ],
            parameters: vec![
                ToolParameter {
                    name: "count".to_string(),
                    description: "Number of commits".to_string(),
                    param_type: ParameterType::Number,
                    required: false,
                    default: Some("10".to_string()),
                },
                ToolParameter {
                    name: "path".to_string(),
                    description: "Limit to a path".to_string(),
                    param_type: ParameterType::String,
                    required: false,
                    default: None,
                },
            ],
            timeout_secs: 30,
            working_dir: None,
        }
    }

    fn manifest(tools: Vec<CommandToolSpec>) -> ServerManifest {
        ServerManifest {
            server: ManifestServer {
                name: "git-tools".to_string(),
                version: "0.1.0".to_string(),
                description: "Git helpers".to_string(),
            },
            tools,
        }
    }

    #[test]
    fn test_extract_parameters() {
        let params = extract_parameters("{{b}} and {{ a }} then {{b}}");
        assert_eq!(params, vec!["a", "b"]);
    }

    #[test]
    fn test_instantiate_uses_defaults_and_drops_empty() {
        let resolved = git_log_tool().instantiate(&serde_json::json!({})).unwrap();
        assert_eq!(resolved.program, "git");
        assert_eq!(resolved.args, vec!["log", "-n", "10"]);
    }

    #[test]
    fn test_instantiate_with_arguments() {
        let resolved = git_log_tool()
            .instantiate(&serde_json::json!({"count": 3, "path": "src/; rm -rf /"}))
            .unwrap();
        // Values are substituted into a single argv entry, never a shell
        assert_eq!(resolved.args, vec!["log", "-n", "3", "src/; rm -rf /"]);
    }

    #[test]
    fn test_values_are_not_substituted_twice() {
        let mut tool = git_log_tool();
        tool.args = vec!["{{count}}".to_string(), "{{path}}".to_string()];
        tool.parameters[0].param_type = ParameterType::String;
        let arguments = serde_json::json!({"count": "{{path}}", "path": "x"});

        for _ in 0..50 {
            let resolved = tool.instantiate(&arguments).unwrap();
            assert_eq!(resolved.args, vec!["{{path}}", "x"]);
        }
    }

    #[test]
    fn test_replace_parameters_leaves_unknown_placeholders() {
        let params = HashMap::from([("a".to_string(), "1".to_string())]);
        assert_eq!(
            replace_parameters("--a={{ a }} {{b}}", &params),
            "--a=1 {{b}}"
        );
    }

    #[test]
    fn test_empty_values_and_literal_args() {
        let mut tool = git_log_tool();
        tool.args.insert(1, String::new());
        tool.args.push("--since={{path}}".to_string());

        // Literal empty args and partially templated args survive an omitted parameter
        let resolved = tool.instantiate(&serde_json::json!({})).unwrap();
        assert_eq!(resolved.args, vec!["log", "", "-n", "10", "--since="]);

        // An explicitly empty optional value is passed through as given
        let resolved = tool.instantiate(&serde_json::json!({"path": ""})).unwrap();
        assert_eq!(resolved.args, vec!["log", "", "-n", "10", "", "--since="]);

        tool.parameters[1].required = true;
        let err = tool.instantiate(&serde_json::json!({"path": ""})).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_instantiate_rejects_bad_type() {
        let err = git_log_tool()
            .instantiate(&serde_json::json!({"count": "many"}))
            .unwrap_err();
        assert!(err.to_string().contains("must be a number"));
    }

    #[test]
    fn test_missing_required_parameter() {
        let mut tool = git_log_tool();
        tool.parameters[1].required = true;
        assert!(tool.instantiate(&serde_json::json!({})).is_err());
    }

    #[test]
    fn test_validate_undeclared_placeholder() {
        let mut tool = git_log_tool();
        tool.args.push("{{author}}".to_string());
        let err = manifest(vec![tool]).validate().unwrap_err();
        assert!(err.to_string().contains("undeclared parameter"));
    }

    #[test]
    fn test_validate_duplicate_tools_and_names() {
        assert!(manifest(vec![git_log_tool(), git_log_tool()]).validate().is_err());

        let mut bad = manifest(vec![]);
        bad.server.name = "Bad Name".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_bad_default() {
        let mut tool = git_log_tool();
        tool.parameters[0].default = Some("ten".to_string());
        assert!(manifest(vec![tool]).validate().is_err());
    }

    #[test]
    fn test_input_schema() {
        let mut tool = git_log_tool();
        tool.parameters[1].required = true;
        let schema = tool.input_schema();
        assert_eq!(schema["properties"]["count"]["type"], "number");
        assert_eq!(schema["properties"]["count"]["default"], "10");
        assert_eq!(schema["required"], serde_json::json!(["path"]));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(MANIFEST_FILE);
        let original = manifest(vec![git_log_tool()]);
        original.save(&path).unwrap();

        let loaded = ServerManifest::load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let manifest: ServerManifest = toml::from_str(
            r#"
            [server]
            name = "echo"

            [[tools]]
            name = "say"
            command = "echo"
            args = ["{{text}}"]

            [[tools.parameters]]
            name = "text"
            required = true
            "#,
        )
        .unwrap();
        manifest.validate().unwrap();
        assert_eq!(manifest.server.version, "0.1.0");
        assert_eq!(manifest.tools[0].timeout_secs, 30);
        assert_eq!(manifest.tools[0].parameters[0].param_type, ParameterType::String);
    }
}
