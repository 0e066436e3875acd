//! MCP surface: list the catalog, forward calls to the dispatcher.

use crate::catalog;
use crate::dispatch::Dispatcher;
use crate::errors::ErrorEnvelope;
use ghl_crm_client::UpstreamEnvelope;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, ErrorData as McpError, Implementation,
    JsonObject, ListToolsResult, PaginatedRequestParams, ProtocolVersion, ServerCapabilities,
    ServerInfo, Tool,
};
use rmcp::{ServerHandler, service::RequestContext};
use serde_json::Value;
use std::sync::Arc;

const INSTRUCTIONS: &str = "Tools for the CRM API: contacts, conversations, calendars, \
opportunities, payments and workflows. Each call accepts an optional `token`; without one the \
server's configured private token is used. Results are JSON envelopes with a `success` flag.";

#[derive(Clone)]
pub struct GatewayMcp {
    dispatcher: Dispatcher,
    tools: Arc<Vec<Tool>>,
}

impl GatewayMcp {
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            tools: Arc::new(catalog::tools()),
        }
    }

    /// Dispatch one call and render it as a tool result.
    pub async fn call(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        let arguments = arguments.map_or(Value::Null, Value::Object);
        tool_result(self.dispatcher.dispatch(name, arguments).await)
    }
}

/// One pretty-printed JSON text block; failures set `isError`.
#[must_use]
pub fn tool_result(outcome: Result<UpstreamEnvelope, ErrorEnvelope>) -> CallToolResult {
    match outcome {
        Ok(envelope) => CallToolResult::success(vec![Content::text(envelope.to_pretty_json())]),
        Err(envelope) => CallToolResult::error(vec![Content::text(envelope.to_pretty_json())]),
    }
}

impl ServerHandler for GatewayMcp {
    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: self.tools.as_ref().clone(),
            ..Default::default()
        }))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move { Ok(self.call(&request.name, request.arguments).await) }
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            protocol_version: ProtocolVersion::LATEST,
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("CRM MCP Gateway".to_string()),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}
