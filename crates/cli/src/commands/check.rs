// Spawn a registered server and confirm it speaks MCP

use anyhow::{bail, Context, Result};
use mcphub_core::registry::ServerEntry;
use mcphub_mcp::protocol::{
    InitializeResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult, PROTOCOL_VERSION,
};
use serde_json::{json, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{ChildStdin, ChildStdout, Command};

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub server_name: String,
    pub server_version: String,
    pub protocol_version: String,
    pub tools: Vec<String>,
}

async fn send(stdin: &mut ChildStdin, request: &JsonRpcRequest) -> Result<()> {
    let mut line = serde_json::to_vec(request)?;
    line.push(b'\n');
    stdin.write_all(&line).await?;
    stdin.flush().await?;
    Ok(())
}

/// Read lines until the response carrying `id`, skipping server notifications
async fn receive(lines: &mut Lines<BufReader<ChildStdout>>, id: i64) -> Result<Value> {
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring non-JSON output");
                continue;
            }
        };
        if message.get("id") != Some(&json!(id)) {
            continue;
        }

        let response: JsonRpcResponse =
            serde_json::from_value(message).context("Malformed JSON-RPC response")?;
        if let Some(error) = response.error {
            bail!("Server returned error {}: {}", error.code, error.message);
        }
        return response.result.context("Response has neither result nor error");
    }
    bail!("Server closed stdout before answering request {}", id)
}

async fn handshake(
    stdin: &mut ChildStdin,
    lines: &mut Lines<BufReader<ChildStdout>>,
) -> Result<ProbeReport> {
    let initialize = JsonRpcRequest::new(
        1,
        "initialize",
        Some(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": "mcphub-check", "version": env!("CARGO_PKG_VERSION")}
        })),
    );
    send(stdin, &initialize).await?;
    let init: InitializeResult = serde_json::from_value(receive(lines, 1).await?)
        .context("Unexpected initialize result")?;

    send(stdin, &JsonRpcRequest::notification("notifications/initialized", None)).await?;
    send(stdin, &JsonRpcRequest::new(2, "tools/list", Some(json!({})))).await?;
    let tools: ListToolsResult = serde_json::from_value(receive(lines, 2).await?)
        .context("Unexpected tools/list result")?;

    Ok(ProbeReport {
        server_name: init.server_info.name,
        server_version: init.server_info.version,
        protocol_version: init.protocol_version,
        tools: tools.tools.into_iter().map(|t| t.name).collect(),
    })
}

/// Run `initialize` and `tools/list` against the server, then kill it
pub async fn probe(entry: &ServerEntry, timeout: Duration) -> Result<ProbeReport> {
    let mut child = Command::new(&entry.command)
        .args(&entry.args)
        .envs(&entry.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to start '{}'", entry.command))?;

    let mut stdin = child.stdin.take().context("Child stdin unavailable")?;
    let stdout = child.stdout.take().context("Child stdout unavailable")?;
    let mut lines = BufReader::new(stdout).lines();

    let result = tokio::time::timeout(timeout, handshake(&mut stdin, &mut lines)).await;

    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "Server already exited");
    }

    match result {
        Ok(report) => report,
        Err(_) => bail!(
            "Server '{}' did not answer within {} seconds",
            entry.name,
            timeout.as_secs()
        ),
    }
}

pub fn print_report(entry: &ServerEntry, report: &ProbeReport) {
    println!(
        "{}: OK ({} {}, protocol {})",
        entry.name, report.server_name, report.server_version, report.protocol_version
    );
    println!("{} tools: {}", report.tools.len(), report.tools.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A shell stand-in answering the handshake with canned responses
    fn scripted_server(script: &str) -> ServerEntry {
        ServerEntry::custom("fake", "sh", vec!["-c".to_string(), script.to_string()])
    }

    const INIT: &str = r#"{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{"listChanged":false}},"serverInfo":{"name":"fake","version":"9.9.9"}}}"#;
    const TOOLS: &str = r#"{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"alpha","description":"A","inputSchema":{"type":"object"}},{"name":"beta","description":"B","inputSchema":{"type":"object"}}]}}"#;

    #[tokio::test]
    async fn test_probe_reads_tools() {
        let script = format!(
            "read l; echo 'starting'; echo '{}'; read l; read l; echo '{}'; sleep 5",
            INIT, TOOLS
        );
        let report = probe(&scripted_server(&script), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(report.server_name, "fake");
        assert_eq!(report.server_version, "9.9.9");
        assert_eq!(report.tools, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_probe_reports_rpc_error() {
        let script = r#"read l; echo '{"jsonrpc":"2.0","id":1,"error":{"code":-32603,"message":"boom"}}'"#;
        let err = probe(&scripted_server(script), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_probe_times_out() {
        let err = probe(&scripted_server("sleep 10"), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did not answer"));
    }

    #[tokio::test]
    async fn test_probe_missing_binary() {
        let entry = ServerEntry::custom("ghost", "mcphub-no-such-server", Vec::new());
        assert!(probe(&entry, Duration::from_secs(1)).await.is_err());
    }
}
