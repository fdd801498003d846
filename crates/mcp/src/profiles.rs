// Server profiles: which tools a `mcphub-mcp` process exposes

use crate::protocol::ServerInfo;
use crate::server::McpServer;
use crate::tools::context::{GetCurrentTimeTool, GetWorldContextTool};
use crate::tools::document::{ConvertMarkdownTool, ListFormatsTool, MarkdownToHtmlTool};
use crate::tools::dynamic::manifest_tools;
use crate::tools::generator::{GenerateServerTool, ValidateManifestTool};
use crate::tools::jira::{jira_tools, JiraHandle};
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use mcphub_core::context::{WorldContext, DEFAULT_WEATHER_URL};
use mcphub_core::document::{ConversionOptions, MermaidMode, PdfEngine};
use mcphub_core::manifest::ServerManifest;
use mcphub_jira::JiraClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Subcommand)]
pub enum Profile {
    /// Markdown to PDF, HTML, DOCX and text
    Docs(DocsArgs),
    /// Jira issues, comments, transitions and projects
    Jira(JiraArgs),
    /// Time, system, environment and weather
    Context(ContextArgs),
    /// Scaffold new command-backed servers
    Generator(GeneratorArgs),
    /// Serve the tools declared in a manifest
    Dynamic(DynamicArgs),
}

#[derive(Debug, Clone, Args)]
pub struct DocsArgs {
    /// Directory relative output paths are written to
    #[arg(long, env = "MCPHUB_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, env = "MCPHUB_PDF_ENGINE", default_value = "weasyprint")]
    pub pdf_engine: PdfEngine,

    /// Binary name or path overriding the engine's default
    #[arg(long, env = "MCPHUB_PDF_COMMAND")]
    pub pdf_command: Option<String>,

    #[arg(long, env = "MCPHUB_MERMAID_CMD", default_value = "mmdc")]
    pub mermaid_command: String,

    /// Default mermaid handling: keep, script or render
    #[arg(long, default_value = "script")]
    pub mermaid: MermaidMode,

    /// CSS file replacing the built-in stylesheet
    #[arg(long)]
    pub stylesheet: Option<PathBuf>,

    #[arg(long, default_value = "A4")]
    pub page_size: String,
}

#[derive(Debug, Clone, Args)]
pub struct JiraArgs {
    /// Jira base URL, e.g. https://acme.atlassian.net
    #[arg(long, env = "JIRA_URL")]
    pub url: Option<String>,

    /// Account email (Jira Cloud, with --api-token)
    #[arg(long, env = "JIRA_EMAIL")]
    pub email: Option<String>,

    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Personal access token (Server / Data Center)
    #[arg(long, env = "JIRA_PAT", hide_env_values = true)]
    pub pat: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

#[derive(Debug, Clone, Args)]
pub struct ContextArgs {
    /// Include a weather section from the default provider
    #[arg(long)]
    pub weather: bool,

    /// Weather endpoint returning wttr.in `format=j1` JSON; implies --weather
    #[arg(long, env = "MCPHUB_WEATHER_URL")]
    pub weather_url: Option<String>,

    #[arg(long, default_value_t = 5)]
    pub timeout: u64,
}

#[derive(Debug, Clone, Args)]
pub struct GeneratorArgs {
    /// Base directory for relative output paths (defaults to the working directory)
    #[arg(long)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct DynamicArgs {
    #[arg(long)]
    pub manifest: PathBuf,
}

impl Profile {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Docs(_) => "docs",
            Self::Jira(_) => "jira",
            Self::Context(_) => "context",
            Self::Generator(_) => "generator",
            Self::Dynamic(_) => "dynamic",
        }
    }

    /// Build the server with this profile's tools registered
    pub fn build(&self) -> Result<McpServer> {
        let server = match self {
            Self::Docs(args) => McpServer::new(ServerInfo::new("mcphub-docs"), docs_registry(args)?)
                .with_instructions(
                    "Convert Markdown into PDF, HTML, DOCX or plain text. \
                     Use list_formats to see which formats need external tools.",
                ),
            Self::Jira(args) => McpServer::new(ServerInfo::new("mcphub-jira"), jira_registry(args)?)
                .with_instructions(
                    "Work with Jira issues. Prefer jira_transition_to_status over chaining \
                     jira_transition_issue calls; confirm before deleting issues.",
                ),
            Self::Context(args) => {
                McpServer::new(ServerInfo::new("mcphub-context"), context_registry(args)?)
            }
            Self::Generator(args) => {
                McpServer::new(ServerInfo::new("mcphub-generator"), generator_registry(args)?)
                    .with_instructions(
                        "Generate servers with generate_server, then register them with \
                         `mcphub install-manifest <path>`.",
                    )
            }
            Self::Dynamic(args) => {
                let manifest = ServerManifest::load(&args.manifest)?;
                let mut registry = ToolRegistry::new();
                for tool in manifest_tools(&manifest) {
                    registry.register(tool);
                }
                let mut info = ServerInfo::new(&manifest.server.name);
                info.version = manifest.server.version.clone();
                McpServer::new(info, registry)
            }
        };

        tracing::info!(
            profile = self.name(),
            tools = server.registry().len(),
            "Server profile ready"
        );
        Ok(server)
    }
}

fn docs_registry(args: &DocsArgs) -> Result<ToolRegistry> {
    let stylesheet = match &args.stylesheet {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read stylesheet {}", path.display()))?,
        ),
        None => None,
    };

    let options = ConversionOptions {
        mermaid: args.mermaid,
        stylesheet,
        pdf_engine: args.pdf_engine,
        pdf_command: args.pdf_command.clone(),
        mermaid_command: args.mermaid_command.clone(),
        page_size: args.page_size.clone(),
        ..Default::default()
    };

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ConvertMarkdownTool::new(
        options.clone(),
        args.output_dir.clone(),
    )));
    registry.register(Arc::new(MarkdownToHtmlTool::new(options.clone())));
    registry.register(Arc::new(ListFormatsTool::new(options)));
    Ok(registry)
}

fn jira_registry(args: &JiraArgs) -> Result<ToolRegistry> {
    let url = args
        .url
        .as_deref()
        .context("Jira URL is required (--url or JIRA_URL)")?;

    let builder = JiraClient::builder()
        .base_url(url)
        .timeout(Duration::from_secs(args.timeout));
    let builder = match (&args.pat, &args.email, &args.api_token) {
        (Some(pat), _, _) => builder.bearer_token(pat),
        (None, Some(email), Some(token)) => builder.basic_auth(email, token),
        _ => anyhow::bail!(
            "Jira credentials are required: JIRA_EMAIL + JIRA_API_TOKEN, or JIRA_PAT"
        ),
    };
    let client = builder.build().context("Invalid Jira configuration")?;
    tracing::info!(url = %client.base_url(), "Jira client configured");

    let mut registry = ToolRegistry::new();
    for tool in jira_tools(JiraHandle::new(Arc::new(client))) {
        registry.register(tool);
    }
    Ok(registry)
}

fn context_registry(args: &ContextArgs) -> Result<ToolRegistry> {
    let weather_url = match (&args.weather_url, args.weather) {
        (Some(url), _) => Some(url.as_str()),
        (None, true) => Some(DEFAULT_WEATHER_URL),
        (None, false) => None,
    };
    let context = WorldContext::with_defaults(weather_url, Duration::from_secs(args.timeout))?;

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(GetWorldContextTool::new(Arc::new(context))));
    registry.register(Arc::new(GetCurrentTimeTool));
    Ok(registry)
}

fn generator_registry(args: &GeneratorArgs) -> Result<ToolRegistry> {
    let base_dir = match &args.base_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to resolve working directory")?,
    };

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(GenerateServerTool::new(base_dir)));
    registry.register(Arc::new(ValidateManifestTool));
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(subcommand)]
        profile: Profile,
    }

    fn parse(args: &[&str]) -> Profile {
        let mut argv = vec!["mcphub-mcp"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().profile
    }

    #[test]
    fn test_docs_profile() {
        let profile = parse(&["docs", "--pdf-engine", "pandoc", "--mermaid", "keep"]);
        match &profile {
            Profile::Docs(args) => {
                assert_eq!(args.pdf_engine, PdfEngine::Pandoc);
                assert_eq!(args.mermaid, MermaidMode::Keep);
            }
            other => panic!("unexpected profile {:?}", other),
        }

        let server = profile.build().unwrap();
        assert_eq!(server.info().name, "mcphub-docs");
        assert!(server.registry().contains("convert_markdown"));
        assert_eq!(server.registry().len(), 3);
    }

    #[test]
    fn test_jira_profile_needs_credentials() {
        let profile = parse(&["jira", "--url", "https://acme.atlassian.net"]);
        if let Profile::Jira(args) = &profile {
            if args.pat.is_some() || args.api_token.is_some() {
                // Credentials leaked in from the environment
                return;
            }
        }
        let err = profile.build().err().unwrap();
        assert!(err.to_string().contains("credentials"));
    }

    #[test]
    fn test_jira_profile_with_token() {
        let profile = parse(&[
            "jira",
            "--url",
            "https://jira.example.com/jira",
            "--pat",
            "secret",
        ]);
        let server = profile.build().unwrap();
        assert_eq!(server.registry().len(), 14);
        assert!(server.registry().contains("jira_transition_to_status"));
    }

    #[test]
    fn test_context_and_generator_profiles() {
        let server = parse(&["context"]).build().unwrap();
        assert!(server.registry().contains("get_world_context"));
        assert!(server.registry().contains("get_current_time"));

        let temp_dir = TempDir::new().unwrap();
        let server = parse(&["generator", "--base-dir", temp_dir.path().to_str().unwrap()])
            .build()
            .unwrap();
        assert!(server.registry().contains("generate_server"));
        assert!(server.registry().contains("validate_manifest"));
    }

    #[test]
    fn test_dynamic_profile_uses_manifest_identity() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mcphub.toml");
        std::fs::write(
            &path,
            "[server]\nname = \"git-tools\"\nversion = \"1.2.0\"\n\n[[tools]]\nname = \"status\"\ncommand = \"git\"\nargs = [\"status\"]\n",
        )
        .unwrap();

        let server = parse(&["dynamic", "--manifest", path.to_str().unwrap()])
            .build()
            .unwrap();
        assert_eq!(server.info().name, "git-tools");
        assert_eq!(server.info().version, "1.2.0");
        assert!(server.registry().contains("status"));
    }

    #[test]
    fn test_dynamic_profile_missing_manifest() {
        let profile = parse(&["dynamic", "--manifest", "/nonexistent/mcphub.toml"]);
        assert!(profile.build().is_err());
    }
}
