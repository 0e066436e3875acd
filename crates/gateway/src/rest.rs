//! Plain REST surface.
//!
//! Domain endpoints translate path, query and body into tool arguments and go through the same
//! dispatcher as MCP calls. Success envelopes answer 200; error envelopes answer with the status
//! of their [`ErrorKind`](crate::errors::ErrorKind).

use crate::catalog;
use crate::dispatch::{Dispatcher, TOKEN_ARG};
use crate::errors::ErrorEnvelope;
use crate::tool_name::ToolName;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ghl_crm_client::UpstreamEnvelope;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;

type Args = Map<String, Value>;

#[derive(Clone)]
pub struct RestState {
    dispatcher: Dispatcher,
    default_location: Option<String>,
}

impl RestState {
    #[must_use]
    pub fn new(dispatcher: Dispatcher, default_location: Option<String>) -> Self {
        Self {
            dispatcher,
            default_location,
        }
    }

    /// Fill the credential, then run the tool.
    async fn run(&self, tool: ToolName, headers: &HeaderMap, mut args: Args) -> Response {
        apply_bearer(headers, &mut args);
        respond(self.dispatcher.dispatch(tool.as_str(), Value::Object(args)).await)
    }

    fn location(&self, explicit: Option<Value>) -> Option<Value> {
        explicit
            .filter(|v| v.as_str().is_none_or(|s| !s.is_empty()))
            .or_else(|| self.default_location.clone().map(Value::String))
    }
}

pub fn router(state: RestState) -> Router {
    let ghl = Router::new()
        .route("/contacts", post(create_contact))
        .route("/contacts/search", get(search_contacts))
        .route(
            "/contacts/{id}",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
        .route("/messages", post(send_message))
        .route("/calendars/{id}/slots", get(calendar_slots))
        .route("/appointments", post(create_appointment))
        .route("/workflows/add-contact", post(add_to_workflow))
        .route(
            "/opportunities",
            get(search_opportunities).post(create_opportunity),
        )
        .route("/webhooks/{webhook_type}", post(webhook));

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/api/mcp", post(legacy_mcp))
        .route("/api/tools/{name}", post(execute_tool))
        .route("/api/limits/{name}", get(limits))
        .nest("/api/ghl", ghl)
        .with_state(state)
}

fn respond(outcome: Result<UpstreamEnvelope, ErrorEnvelope>) -> Response {
    match outcome {
        Ok(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
        Err(envelope) => error_response(envelope),
    }
}

fn error_response(envelope: ErrorEnvelope) -> Response {
    let status =
        StatusCode::from_u16(envelope.http_status()).unwrap_or(StatusCode::BAD_GATEWAY);
    let retry_after = envelope.retry_after;
    let mut response = (status, Json(envelope)).into_response();
    if let Some(secs) = retry_after {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    }
    response
}

/// A bearer header overrides any `token` already in the arguments.
fn apply_bearer(headers: &HeaderMap, args: &mut Args) {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        args.insert(TOKEN_ARG.to_string(), Value::String(token.to_string()));
    }
}

/// Empty body reads as `{}`. Anything but a JSON object is a validation failure.
fn parse_body(body: &Bytes) -> Result<Args, ErrorEnvelope> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Args::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ErrorEnvelope::validation(
            "body",
            "Request body must be a JSON object",
        )),
        Err(e) => Err(ErrorEnvelope::validation(
            "body",
            format!("Request body is not valid JSON: {e}"),
        )),
    }
}

/// Query strings carry text; numeric tool arguments must be numbers.
fn numeric_query(query: &HashMap<String, String>, key: &str, args: &mut Args) -> Result<(), ErrorEnvelope> {
    let Some(raw) = query.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) else {
        return Ok(());
    };
    let n: u32 = raw.parse().map_err(|_| {
        ErrorEnvelope::validation(key, format!("{key} must be a non-negative integer"))
    })?;
    args.insert(key.to_string(), json!(n));
    Ok(())
}

fn copy_query(query: &HashMap<String, String>, from: &str, to: &str, args: &mut Args) {
    if let Some(v) = query.get(from).filter(|v| !v.is_empty()) {
        args.insert(to.to_string(), Value::String(v.clone()));
    }
}

/// Take the credential out of a body so it is not forwarded upstream as entity data.
fn split_token(body: &mut Args) -> Args {
    let mut args = Args::new();
    if let Some(token) = body.remove(TOKEN_ARG) {
        args.insert(TOKEN_ARG.to_string(), token);
    }
    args
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "mode": "http",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": "MCP and REST gateway for the CRM API",
        "tools": ToolName::ALL.len(),
        "endpoints": {
            "health": "GET /health",
            "mcp": "POST /mcp (streamable HTTP)",
            "legacyMcp": "POST /api/mcp",
            "executeTool": "POST /api/tools/{name}",
            "limits": "GET /api/limits/{name}",
            "contacts": "POST /api/ghl/contacts, GET /api/ghl/contacts/search, GET|PUT|DELETE /api/ghl/contacts/{id}",
            "messages": "POST /api/ghl/messages",
            "calendars": "GET /api/ghl/calendars/{id}/slots",
            "appointments": "POST /api/ghl/appointments",
            "workflows": "POST /api/ghl/workflows/add-contact",
            "opportunities": "GET|POST /api/ghl/opportunities",
            "webhooks": "POST /api/ghl/webhooks/{webhookType}"
        }
    }))
}

#[derive(Debug, Deserialize)]
struct LegacyRequest {
    method: String,
    #[serde(default)]
    params: Option<LegacyParams>,
}

#[derive(Debug, Deserialize)]
struct LegacyParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

async fn legacy_mcp(State(state): State<RestState>, headers: HeaderMap, body: Bytes) -> Response {
    let request: LegacyRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(ErrorEnvelope::validation("method", e.to_string()));
        }
    };
    match request.method.as_str() {
        "tools/list" => Json(json!({ "tools": catalog::tools() })).into_response(),
        "tools/execute" => {
            let Some(params) = request.params else {
                return error_response(ErrorEnvelope::validation(
                    "params",
                    "params.name is required",
                ));
            };
            let mut args = match params.arguments {
                Some(Value::Object(map)) => map,
                None | Some(Value::Null) => Args::new(),
                Some(_) => {
                    return error_response(ErrorEnvelope::validation(
                        "arguments",
                        "params.arguments must be an object",
                    ));
                }
            };
            apply_bearer(&headers, &mut args);
            respond(state.dispatcher.dispatch(&params.name, Value::Object(args)).await)
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({"error": "Unknown method"}))).into_response(),
    }
}

async fn execute_tool(
    State(state): State<RestState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut args = match parse_body(&body) {
        Ok(args) => args,
        Err(envelope) => return error_response(envelope),
    };
    apply_bearer(&headers, &mut args);
    respond(state.dispatcher.dispatch(&name, Value::Object(args)).await)
}

async fn limits(State(state): State<RestState>, Path(name): Path<String>) -> Response {
    let tool: ToolName = match name.parse() {
        Ok(tool) => tool,
        Err(_) => return error_response(ErrorEnvelope::unknown_tool(&name)),
    };
    let limiter = state.dispatcher.limiter();
    let config = limiter.config();
    Json(json!({
        "tool": tool.as_str(),
        "remaining": limiter.remaining_requests(tool.as_str()),
        "limits": {
            "burst": config.burst_limit,
            "burstWindowSecs": config.burst_window.as_secs(),
            "daily": config.daily_limit,
        }
    }))
    .into_response()
}

async fn create_contact(State(state): State<RestState>, headers: HeaderMap, body: Bytes) -> Response {
    let mut body = match parse_body(&body) {
        Ok(b) => b,
        Err(envelope) => return error_response(envelope),
    };
    let mut args = split_token(&mut body);
    if let Some(location) = state.location(body.remove("locationId")) {
        args.insert("locationId".to_string(), location);
    }
    args.insert("contactData".to_string(), Value::Object(body));
    state.run(ToolName::CreateContact, &headers, args).await
}

async fn search_contacts(
    State(state): State<RestState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut args = Args::new();
    copy_query(&query, TOKEN_ARG, TOKEN_ARG, &mut args);
    copy_query(&query, "q", "query", &mut args);
    if let Some(location) = state.location(query.get("locationId").cloned().map(Value::String)) {
        args.insert("locationId".to_string(), location);
    }
    for key in ["limit", "offset"] {
        if let Err(envelope) = numeric_query(&query, key, &mut args) {
            return error_response(envelope);
        }
    }
    state.run(ToolName::SearchContacts, &headers, args).await
}

async fn get_contact(
    State(state): State<RestState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut args = Args::new();
    copy_query(&query, TOKEN_ARG, TOKEN_ARG, &mut args);
    args.insert("contactId".to_string(), Value::String(id));
    state.run(ToolName::GetContact, &headers, args).await
}

async fn update_contact(
    State(state): State<RestState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut body = match parse_body(&body) {
        Ok(b) => b,
        Err(envelope) => return error_response(envelope),
    };
    let mut args = split_token(&mut body);
    args.insert("contactId".to_string(), Value::String(id));
    args.insert("updateData".to_string(), Value::Object(body));
    state.run(ToolName::UpdateContact, &headers, args).await
}

async fn delete_contact(
    State(state): State<RestState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut args = Args::new();
    copy_query(&query, TOKEN_ARG, TOKEN_ARG, &mut args);
    args.insert("contactId".to_string(), Value::String(id));
    state.run(ToolName::DeleteContact, &headers, args).await
}

async fn send_message(State(state): State<RestState>, headers: HeaderMap, body: Bytes) -> Response {
    let mut args = match parse_body(&body) {
        Ok(b) => b,
        Err(envelope) => return error_response(envelope),
    };
    if let Some(location) = state.location(args.remove("locationId")) {
        args.insert("locationId".to_string(), location);
    }
    state.run(ToolName::SendMessage, &headers, args).await
}

async fn calendar_slots(
    State(state): State<RestState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut args = Args::new();
    copy_query(&query, TOKEN_ARG, TOKEN_ARG, &mut args);
    args.insert("calendarId".to_string(), Value::String(id));
    for key in ["startDate", "endDate", "timezone"] {
        copy_query(&query, key, key, &mut args);
    }
    state.run(ToolName::GetCalendarSlots, &headers, args).await
}

async fn create_appointment(
    State(state): State<RestState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut body = match parse_body(&body) {
        Ok(b) => b,
        Err(envelope) => return error_response(envelope),
    };
    let mut args = split_token(&mut body);
    if let Some(location) = state.location(body.remove("locationId")) {
        body.insert("locationId".to_string(), location);
    }
    args.insert("appointmentData".to_string(), Value::Object(body));
    state.run(ToolName::CreateAppointment, &headers, args).await
}

async fn add_to_workflow(State(state): State<RestState>, headers: HeaderMap, body: Bytes) -> Response {
    let args = match parse_body(&body) {
        Ok(b) => b,
        Err(envelope) => return error_response(envelope),
    };
    state.run(ToolName::AddContactToWorkflow, &headers, args).await
}

async fn search_opportunities(
    State(state): State<RestState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut args = Args::new();
    copy_query(&query, TOKEN_ARG, TOKEN_ARG, &mut args);
    if let Some(location) = state.location(query.get("locationId").cloned().map(Value::String)) {
        args.insert("locationId".to_string(), location);
    }
    for key in ["pipelineId", "query", "assignedTo"] {
        copy_query(&query, key, key, &mut args);
    }
    state.run(ToolName::SearchOpportunities, &headers, args).await
}

async fn create_opportunity(
    State(state): State<RestState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut body = match parse_body(&body) {
        Ok(b) => b,
        Err(envelope) => return error_response(envelope),
    };
    let mut args = split_token(&mut body);
    if let Some(location) = state.location(body.remove("locationId")) {
        body.insert("locationId".to_string(), location);
    }
    args.insert("opportunityData".to_string(), Value::Object(body));
    state.run(ToolName::CreateOpportunity, &headers, args).await
}

async fn webhook(Path(webhook_type): Path<String>, body: Bytes) -> Response {
    match serde_json::from_slice::<Value>(&body) {
        Ok(event) => {
            tracing::info!(
                webhook_type = %webhook_type,
                event_type = event.get("type").and_then(serde_json::Value::as_str).unwrap_or_default(),
                location_id = event.get("locationId").and_then(serde_json::Value::as_str).unwrap_or_default(),
                "webhook received"
            );
            Json(json!({"success": true, "received": webhook_type})).into_response()
        }
        Err(e) => {
            tracing::warn!(webhook_type = %webhook_type, error = %e, "malformed webhook body");
            error_response(ErrorEnvelope::webhook(webhook_type, e.to_string()))
        }
    }
}
