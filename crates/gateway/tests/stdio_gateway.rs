mod common;

use common::{KillOnDrop, gateway_command};
use serde_json::{Value, json};
use std::io::{BufRead as _, BufReader, Write as _};
use std::process::{ChildStdin, Stdio};
use std::sync::mpsc;
use std::time::Duration;

struct StdioGateway {
    stdin: ChildStdin,
    lines: mpsc::Receiver<String>,
    _process: KillOnDrop,
}

impl StdioGateway {
    fn spawn(extra_args: &[&str]) -> Self {
        let mut child = gateway_command()
            .args(["--mode", "stdio", "--base-url", "http://127.0.0.1:9"])
            .args(extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn gateway");
        let stdin = child.stdin.take().expect("stdin");
        let stdout = child.stdout.take().expect("stdout");

        let (tx, lines) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Self {
            stdin,
            lines,
            _process: KillOnDrop(child),
        }
    }

    fn send(&mut self, msg: &Value) {
        writeln!(self.stdin, "{msg}").expect("write");
        self.stdin.flush().expect("flush");
    }

    fn recv(&self) -> Value {
        loop {
            let line = self
                .lines
                .recv_timeout(Duration::from_secs(10))
                .expect("gateway reply");
            if line.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(&line).expect("reply is JSON");
        }
    }

    fn initialize(&mut self) {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "stdio-test", "version": "0" }
            }
        }));
        let reply = self.recv();
        assert_eq!(reply["id"], json!(0));
        assert_eq!(reply["result"]["serverInfo"]["name"], json!("ghl-mcp-gateway"));
        self.send(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}));
    }
}

#[test]
fn stdio_lists_tools() {
    let mut gateway = StdioGateway::spawn(&[]);
    gateway.initialize();

    gateway.send(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": {}}));
    let reply = gateway.recv();
    assert_eq!(reply["id"], json!(1));
    let tools = reply["result"]["tools"].as_array().expect("tools");
    assert_eq!(tools.len(), 26);
    assert!(tools.iter().all(|t| t["inputSchema"]["properties"]["token"].is_object()));
}

#[test]
fn stdio_call_without_credential_reports_authentication_required() {
    let mut gateway = StdioGateway::spawn(&[]);
    gateway.initialize();

    gateway.send(&json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": { "name": "ghl_get_pipelines", "arguments": { "locationId": "loc-1" } }
    }));
    let reply = gateway.recv();
    assert_eq!(reply["id"], json!(2));
    assert_eq!(reply["result"]["isError"], json!(true));

    let text = reply["result"]["content"][0]["text"].as_str().expect("text");
    let envelope: Value = serde_json::from_str(text).expect("envelope");
    assert_eq!(envelope["success"], json!(false));
    assert_eq!(envelope["error"], json!("Authentication Required"));
}
