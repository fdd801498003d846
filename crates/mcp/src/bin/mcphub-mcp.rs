// Standalone MCP server binary

use anyhow::Result;
use clap::{Parser, ValueEnum};
use mcphub_mcp::Profile;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

#[derive(Debug, Parser)]
#[command(name = "mcphub-mcp", version, about = "mcphub MCP tool servers")]
struct Cli {
    #[arg(long, value_enum, default_value = "stdio", env = "MCPHUB_TRANSPORT")]
    transport: Transport,

    /// Listen address for the HTTP transport
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8765, env = "MCPHUB_PORT")]
    port: u16,

    #[command(subcommand)]
    profile: Profile,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the JSON-RPC stream, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcphub_mcp=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    tracing::info!(profile = cli.profile.name(), "mcphub MCP server starting");

    let server = cli.profile.build()?;

    match cli.transport {
        Transport::Stdio => server.serve_stdio().await?,
        Transport::Http => {
            let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
            server.serve_http(addr).await?;
        }
    }

    Ok(())
}
