//! One module per upstream domain. Each operation takes a typed argument struct, performs exactly
//! one upstream call and shapes the reply into an [`UpstreamEnvelope`](crate::UpstreamEnvelope).

pub mod calendars;
pub mod contacts;
pub mod conversations;
pub mod opportunities;
pub mod payments;
pub mod workflows;

use crate::error::{Result, invalid_arguments};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Default page size for list operations.
pub const DEFAULT_LIMIT: u32 = 20;

pub(crate) fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// Arguments of the location-scoped listings (pipelines, workflows).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationArgs {
    pub location_id: String,
}

/// Read invocation arguments into an operation's argument type.
///
/// Unknown keys (including the credential `token`) are ignored.
///
/// # Errors
///
/// Returns [`UpstreamError::InvalidArguments`](crate::UpstreamError::InvalidArguments) naming the
/// missing field where serde can tell which one it is.
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| invalid_arguments(&e))
}
