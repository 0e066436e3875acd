//! Gateway failures and their uniform error envelope.

use crate::limiter::DenyReason;
use crate::tool_name::ToolName;
use chrono::{DateTime, Local, Utc};
use ghl_crm_client::UpstreamError;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a dispatched call failed.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{tool}: no access token provided and no default token is configured")]
    MissingCredential { tool: String },

    #[error("rate limit reached for {tool} ({})", reason.describe())]
    RateLimited {
        tool: String,
        reason: DenyReason,
        now: DateTime<Local>,
    },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{tool}: {source}")]
    Upstream {
        tool: ToolName,
        #[source]
        source: UpstreamError,
    },
}

/// Coarse failure class; transports pick their wire status from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorKind {
    MissingCredential,
    RateLimited,
    UnknownTool,
    Validation,
    Upstream(u16),
    #[default]
    Network,
    Webhook,
}

impl ErrorKind {
    /// HTTP status a transport should answer with.
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::MissingCredential => 401,
            Self::RateLimited => 429,
            Self::UnknownTool => 404,
            Self::Validation | Self::Webhook => 400,
            Self::Upstream(status) if (400..=599).contains(&status) => status,
            Self::Upstream(_) | Self::Network => 502,
        }
    }
}

/// `success: false` result. Serialized as the tool result text or the REST response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip)]
    kind: ErrorKind,
}

impl ErrorEnvelope {
    fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: None,
            status: None,
            details: None,
            context: None,
            field: None,
            webhook_type: None,
            retry_after: None,
            timestamp: None,
            kind,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    #[must_use]
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{{\"success\":false,\"error\":{:?}}}", self.error))
    }

    /// A bad or missing argument.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut env = Self::new(ErrorKind::Validation, "Validation Error");
        env.field = Some(field.into());
        env.message = Some(message.into());
        env
    }

    /// A webhook delivery that could not be accepted.
    #[must_use]
    pub fn webhook(webhook_type: impl Into<String>, message: impl Into<String>) -> Self {
        let mut env = Self::new(ErrorKind::Webhook, "Webhook Error");
        env.webhook_type = Some(webhook_type.into());
        env.message = Some(message.into());
        env.timestamp = Some(Utc::now());
        env
    }

    #[must_use]
    pub fn unknown_tool(name: &str) -> Self {
        let mut env = Self::new(ErrorKind::UnknownTool, "Unknown Tool");
        env.message = Some(format!("Unknown tool: {name}"));
        env.context = Some(name.to_string());
        env
    }

    #[must_use]
    pub fn missing_credential(context: Option<&str>) -> Self {
        let mut env = Self::new(ErrorKind::MissingCredential, "Authentication Required");
        env.message = Some(
            "No access token provided. Pass a token or configure a default private token."
                .to_string(),
        );
        env.context = context.map(str::to_string);
        env
    }
}

impl From<GatewayError> for ErrorEnvelope {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::MissingCredential { tool } => Self::missing_credential(Some(&tool)),
            GatewayError::RateLimited { tool, reason, now } => {
                let retry = reason.retry_after_secs(now);
                let mut env = Self::new(ErrorKind::RateLimited, "Rate Limited");
                env.message = Some(match reason {
                    DenyReason::Burst { .. } => format!(
                        "Burst rate limit reached for {tool}. Please try again after {retry} seconds."
                    ),
                    DenyReason::Daily { resets_at } => format!(
                        "Daily rate limit reached for {tool}. The limit resets at {}.",
                        resets_at.to_rfc3339()
                    ),
                });
                env.retry_after = Some(retry);
                env.context = Some(tool);
                env
            }
            GatewayError::UnknownTool(name) => Self::unknown_tool(&name),
            GatewayError::Upstream { tool, source } => normalize_upstream(tool, source),
        }
    }
}

/// Map an upstream failure onto the envelope taxonomy.
#[must_use]
pub fn normalize_upstream(tool: ToolName, err: UpstreamError) -> ErrorEnvelope {
    let context = tool.as_str().to_string();
    match err {
        UpstreamError::InvalidArguments { field, message } => {
            let mut env = ErrorEnvelope::validation(field, message);
            env.context = Some(context);
            env
        }
        UpstreamError::Status {
            status,
            body,
            retry_after,
        } => {
            let (error, message) = status_message(tool, status, &body, retry_after.as_deref());
            let mut env = ErrorEnvelope::new(ErrorKind::Upstream(status), error);
            env.message = Some(message);
            env.status = Some(status);
            env.details = Some(match body {
                Value::Null => Value::Object(Map::new()),
                other => other,
            });
            env.context = Some(context);
            env
        }
        other @ (UpstreamError::Transport(_)
        | UpstreamError::Decode(_)
        | UpstreamError::Config(_)) => {
            let mut env = ErrorEnvelope::new(ErrorKind::Network, other.to_string());
            env.context = Some(context);
            env
        }
    }
}

fn upstream_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn status_message(
    tool: ToolName,
    status: u16,
    body: &Value,
    retry_after: Option<&str>,
) -> (String, String) {
    let (error, message) = match status {
        400 => (
            "Bad Request",
            upstream_message(body).unwrap_or_else(|| {
                "Invalid request parameters. Please check your input.".to_string()
            }),
        ),
        401 => (
            "Unauthorized",
            "Invalid or expired token. Please authenticate again.".to_string(),
        ),
        403 => (
            "Forbidden",
            "Insufficient permissions. Make sure your token has the required scopes.".to_string(),
        ),
        404 => (
            "Not Found",
            format!("The requested {} was not found.", tool.resource_noun()),
        ),
        422 => {
            let mut message = upstream_message(body)
                .unwrap_or_else(|| "The request contains invalid data.".to_string());
            if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
                let pretty = serde_json::to_string_pretty(errors).unwrap_or_default();
                message.push_str("\nErrors: ");
                message.push_str(&pretty);
            }
            ("Unprocessable Entity", message)
        }
        429 => {
            let retry = retry_after.filter(|s| !s.is_empty()).unwrap_or("60");
            (
                "Rate Limited",
                format!("Rate limit exceeded. Please try again after {retry} seconds."),
            )
        }
        500 => (
            "Internal Server Error",
            "Upstream CRM service error. Please try again later.".to_string(),
        ),
        502 => (
            "Bad Gateway",
            "Upstream CRM service is temporarily unavailable.".to_string(),
        ),
        503 => (
            "Service Unavailable",
            "Upstream CRM service is currently down for maintenance.".to_string(),
        ),
        other => {
            return (
                format!("API Error ({other})"),
                upstream_message(body)
                    .unwrap_or_else(|| "An unexpected error occurred.".to_string()),
            );
        }
    };
    (error.to_string(), message)
}
