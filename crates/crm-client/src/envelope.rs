//! Uniform success envelope.

use serde::Serialize;
use serde_json::{Map, Value};

/// Success result of one upstream operation.
///
/// Always carries `success: true` plus operation-specific fields. The envelope is passed around
/// as a structured value; it is only rendered to text at a wire edge (see
/// [`UpstreamEnvelope::to_pretty_json`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UpstreamEnvelope {
    payload: Map<String, Value>,
}

impl UpstreamEnvelope {
    #[must_use]
    pub fn success() -> Self {
        let mut payload = Map::new();
        payload.insert("success".to_string(), Value::Bool(true));
        Self { payload }
    }

    /// Add a field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Add a field only when a value is present.
    ///
    /// Absent and `null` values are both omitted, so the envelope never advertises a field the
    /// upstream did not supply.
    #[must_use]
    pub fn with_opt(self, key: &str, value: Option<Value>) -> Self {
        match value {
            Some(Value::Null) | None => self,
            Some(v) => self.with(key, v),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    #[must_use]
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.payload)
    }

    /// Pretty-printed JSON text, as placed into a single tool-protocol content block.
    #[must_use]
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.payload).unwrap_or_else(|_| "{}".to_string())
    }
}

/// The value under `key`, or the whole body when the reply is not wrapped.
///
/// Upstream replies are either wrapped (`{"contacts": [...], "meta": {...}}`) or bare.
/// A missing or `null` key yields the body unchanged.
#[must_use]
pub fn unwrap_field(body: &Value, key: &str) -> Value {
    match body.get(key) {
        Some(v) if !v.is_null() => v.clone(),
        _ => body.clone(),
    }
}

/// Total count of a list reply: `meta.total`, else `total`, else the number of listed items.
#[must_use]
pub fn list_total(body: &Value, items: &Value) -> Option<Value> {
    body.pointer("/meta/total")
        .filter(|v| !v.is_null())
        .or_else(|| body.get("total").filter(|v| !v.is_null()))
        .cloned()
        .or_else(|| items.as_array().map(|a| Value::from(a.len())))
}

/// 1-based page number derived from offset/limit pagination.
#[must_use]
pub fn page_number(offset: u32, limit: u32) -> u32 {
    if limit == 0 {
        return 1;
    }
    offset / limit + 1
}
