use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mcphub_core::document::{MermaidMode, OutputFormat, PdfEngine};
use std::path::PathBuf;
use std::time::Duration;

mod commands;
mod config;

use commands::{check, convert, generate, servers, sync};
use config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "mcphub", version)]
#[command(about = "Install, check and sync MCP servers across AI clients", long_about = None)]
struct Args {
    /// Path to configuration file (default: <config dir>/mcphub/config.toml)
    #[arg(short, long, global = true, env = "MCPHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered servers
    List,

    /// Register an arbitrary stdio server
    Add {
        name: String,
        #[arg(long)]
        command: String,
        /// Argument passed to the command (repeatable)
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,
        /// Environment variable as KEY=VALUE (repeatable)
        #[arg(long)]
        env: Vec<String>,
        #[arg(long)]
        description: Option<String>,
        /// Overwrite an existing server with the same name
        #[arg(long)]
        replace: bool,
    },

    /// Register a builtin server: docs, jira, context or generator
    Install {
        builtin: String,
        #[arg(long)]
        replace: bool,
    },

    /// Register a generated server from its mcphub.toml (or its directory)
    InstallManifest {
        path: PathBuf,
        #[arg(long)]
        replace: bool,
    },

    Remove {
        name: String,
    },

    Enable {
        name: String,
    },

    Disable {
        name: String,
    },

    /// Show supported AI clients and their config files
    Platforms,

    /// Write enabled servers into client configs
    Sync {
        /// Platform id (repeatable); defaults to every detected platform
        #[arg(long = "platform")]
        platforms: Vec<String>,
        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Compare client configs with the registry
    Status {
        #[arg(long = "platform")]
        platforms: Vec<String>,
    },

    /// Start a server and list its tools
    Check {
        name: String,
        /// Seconds to wait for the handshake
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Generate a command-backed server
    Generate {
        name: String,
        #[arg(long)]
        out: PathBuf,
        /// Tool as name=command [args...] (repeatable)
        #[arg(long = "tool")]
        tools: Vec<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        force: bool,
        /// Register the generated server right away
        #[arg(long)]
        install: bool,
    },

    /// Convert a markdown file
    Convert {
        input: PathBuf,
        /// pdf, html, docx or txt (default: from --output, else html)
        #[arg(long)]
        format: Option<OutputFormat>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        /// keep, script or render
        #[arg(long)]
        mermaid: Option<MermaidMode>,
        #[arg(long, env = "MCPHUB_PDF_ENGINE")]
        pdf_engine: Option<PdfEngine>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "mcphub=info,mcphub_core=info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = CliConfig::load(args.config.as_deref())?;
    tracing::info!(registry = %config.registry_path().display(), "Loaded configuration");

    match args.command {
        Command::List => {
            let registry = config.load_registry()?;
            servers::list(&registry);
        }
        Command::Add {
            name,
            command,
            args,
            env,
            description,
            replace,
        } => {
            let mut registry = config.load_registry()?;
            let entry = servers::add(
                &mut registry,
                servers::AddOptions {
                    name,
                    command,
                    args,
                    env,
                    description,
                    replace,
                },
            )?;
            println!("Added '{}'. Run `mcphub sync` to update your clients.", entry.name);
        }
        Command::Install { builtin, replace } => {
            let mut registry = config.load_registry()?;
            let entry = servers::install(&config, &mut registry, &builtin, replace)?;
            println!(
                "Installed '{}' ({} {}). Run `mcphub sync` to update your clients.",
                entry.name,
                entry.command,
                entry.args.join(" ")
            );
        }
        Command::InstallManifest { path, replace } => {
            let mut registry = config.load_registry()?;
            let entry = servers::install_manifest(&config, &mut registry, &path, replace)?;
            println!("Installed '{}' from {}", entry.name, path.display());
        }
        Command::Remove { name } => {
            let mut registry = config.load_registry()?;
            servers::remove(&mut registry, &name)?;
            println!("Removed '{}'. Run `mcphub sync` to drop it from your clients.", name);
        }
        Command::Enable { name } => {
            let mut registry = config.load_registry()?;
            servers::set_enabled(&mut registry, &name, true)?;
            println!("Enabled '{}'", name);
        }
        Command::Disable { name } => {
            let mut registry = config.load_registry()?;
            servers::set_enabled(&mut registry, &name, false)?;
            println!("Disabled '{}'", name);
        }
        Command::Platforms => sync::platforms(&config),
        Command::Sync { platforms, dry_run } => {
            let mut registry = config.load_registry()?;
            let targets = sync::target_platforms(&config, &platforms)?;
            let reports = sync::sync(&mut registry, &targets, dry_run)?;
            sync::print_reports(&reports, dry_run);
        }
        Command::Status { platforms } => {
            let registry = config.load_registry()?;
            let targets = sync::target_platforms(&config, &platforms)?;
            let statuses = sync::status(&registry, &targets)?;
            sync::print_status(&statuses);
        }
        Command::Check { name, timeout } => {
            let registry = config.load_registry()?;
            let entry = registry
                .get(&name)
                .with_context(|| format!("Server '{}' is not registered", name))?;
            let timeout =
                Duration::from_secs(timeout.unwrap_or(config.defaults.check_timeout_secs));
            let report = check::probe(entry, timeout).await?;
            check::print_report(entry, &report);
        }
        Command::Generate {
            name,
            out,
            tools,
            description,
            force,
            install,
        } => {
            let generated = generate::generate(&name, description, &tools, &out, force)?;
            generate::print_generated(&generated);
            if install {
                let mut registry = config.load_registry()?;
                let entry = servers::install_manifest(
                    &config,
                    &mut registry,
                    &generated.manifest_path,
                    force,
                )?;
                println!("Installed '{}'", entry.name);
            }
        }
        Command::Convert {
            input,
            format,
            output,
            title,
            author,
            mermaid,
            pdf_engine,
        } => {
            let path = convert::convert(
                &input,
                convert::ConvertOptions {
                    format,
                    output,
                    title,
                    author,
                    mermaid,
                    pdf_engine,
                },
            )
            .await?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
