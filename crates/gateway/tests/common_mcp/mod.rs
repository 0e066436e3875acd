use anyhow::Context as _;
use futures::StreamExt as _;
use serde_json::json;
use std::time::Duration;
use tokio::io::AsyncBufReadExt as _;
use tokio_util::io::StreamReader;

/// Minimal streamable HTTP MCP client for exercising `/mcp` end to end.
pub struct McpSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl McpSession {
    pub async fn connect(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();

        let init_resp = post_mcp(
            &client,
            &base_url,
            None,
            json!({
                "jsonrpc": "2.0",
                "id": 0,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "ghl-mcp-gateway-integration-tests", "version": "0" }
                }
            }),
        )
        .await?;

        let session_id = init_resp
            .headers()
            .get("Mcp-Session-Id")
            .and_then(|h| h.to_str().ok())
            .context("missing Mcp-Session-Id header")?
            .to_string();

        let init_msg = read_first_json_message(init_resp).await?;
        anyhow::ensure!(init_msg.get("id") == Some(&json!(0)), "unexpected init id");

        let initialized = post_mcp(
            &client,
            &base_url,
            Some(&session_id),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .await?;
        anyhow::ensure!(
            initialized.status().as_u16() == 202,
            "notifications/initialized returned {}",
            initialized.status()
        );

        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    pub async fn request(
        &self,
        id: u64,
        method: &str,
        params: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let resp = post_mcp(
            &self.client,
            &self.base_url,
            Some(&self.session_id),
            json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}),
        )
        .await?;

        tokio::time::timeout(Duration::from_secs(10), read_first_json_message(resp))
            .await
            .context("timeout waiting for MCP response")?
    }
}

/// The envelope carried in a `tools/call` result's single text block, plus its `isError` flag.
pub fn tool_call_envelope(msg: &serde_json::Value) -> anyhow::Result<(serde_json::Value, bool)> {
    let result = msg.get("result").context("tools/call missing result")?;
    let is_error = result
        .get("isError")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    let text = result
        .get("content")
        .and_then(serde_json::Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("text"))
        .and_then(serde_json::Value::as_str)
        .context("tools/call missing result.content[0].text")?;
    let envelope = serde_json::from_str(text).context("tool result text is not JSON")?;
    Ok((envelope, is_error))
}

async fn post_mcp(
    client: &reqwest::Client,
    base_url: &str,
    session_id: Option<&str>,
    body: serde_json::Value,
) -> anyhow::Result<reqwest::Response> {
    let mut req = client
        .post(format!("{base_url}/mcp"))
        .header("Accept", "application/json, text/event-stream")
        .header("Content-Type", "application/json")
        .json(&body);
    if let Some(session_id) = session_id {
        req = req.header("Mcp-Session-Id", session_id);
    }
    req.send()
        .await
        .context("POST /mcp")?
        .error_for_status()
        .context("POST /mcp status")
}

/// First JSON-RPC message from either a JSON body or an event stream. Events with empty data
/// (keep-alive or priming) are skipped.
async fn read_first_json_message(resp: reqwest::Response) -> anyhow::Result<serde_json::Value> {
    let is_json = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if is_json {
        return resp.json().await.context("parse JSON response");
    }

    let byte_stream = resp.bytes_stream().map(|r| r.map_err(std::io::Error::other));
    let reader = StreamReader::new(byte_stream);
    let mut lines = tokio::io::BufReader::new(reader).lines();

    let mut data_lines: Vec<String> = Vec::new();
    while let Some(line) = lines.next_line().await.context("read event stream")? {
        let line = line.trim_end();
        if line.is_empty() {
            let data = data_lines.join("\n");
            data_lines.clear();
            if data.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(&data).context("parse event data as JSON");
        }
        if let Some(v) = line.strip_prefix("data:") {
            data_lines.push(v.trim().to_string());
        }
    }

    anyhow::bail!("event stream ended without a JSON message")
}
