//! Tool-name to upstream-operation dispatch.
//!
//! Every call goes through the same steps: resolve the credential, ask the limiter, resolve the
//! tool, run exactly one upstream operation, record the call. Failures leave as [`ErrorEnvelope`]s.

use crate::errors::{ErrorEnvelope, GatewayError};
use crate::limiter::{Admission, RateLimiter};
use crate::tool_name::ToolName;
use ghl_crm_client::operations::parse_args;
use ghl_crm_client::{CrmClient, UpstreamEnvelope};
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument as _;

/// Argument key carrying a per-call access token.
pub const TOKEN_ARG: &str = "token";

#[derive(Clone)]
pub struct Dispatcher {
    client: CrmClient,
    limiter: Arc<RateLimiter>,
    default_token: Option<String>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("client", &self.client)
            .field("has_default_token", &self.default_token.is_some())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// An empty default token counts as no default token.
    #[must_use]
    pub fn new(client: CrmClient, limiter: Arc<RateLimiter>, default_token: Option<String>) -> Self {
        Self {
            client,
            limiter,
            default_token: default_token.filter(|t| !t.trim().is_empty()),
        }
    }

    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    #[must_use]
    pub fn has_default_token(&self) -> bool {
        self.default_token.is_some()
    }

    /// Run one tool call.
    ///
    /// # Errors
    ///
    /// Every failure, local or upstream, is returned as a normalized [`ErrorEnvelope`].
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<UpstreamEnvelope, ErrorEnvelope> {
        let span = tracing::info_span!("dispatch", tool = %name);
        async move {
            match self.try_dispatch(name, arguments).await {
                Ok(envelope) => {
                    tracing::debug!("tool call succeeded");
                    Ok(envelope)
                }
                Err(err) => {
                    let envelope = ErrorEnvelope::from(err);
                    tracing::warn!(
                        status = envelope.status,
                        error = %envelope.error,
                        "tool call failed"
                    );
                    Err(envelope)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_dispatch(&self, name: &str, arguments: Value) -> Result<UpstreamEnvelope, GatewayError> {
        let token = arguments
            .get(TOKEN_ARG)
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.default_token.clone())
            .ok_or_else(|| GatewayError::MissingCredential {
                tool: name.to_string(),
            })?;

        if let Admission::Denied(reason) = self.limiter.check(name) {
            return Err(GatewayError::RateLimited {
                tool: name.to_string(),
                reason,
                now: self.limiter.now(),
            });
        }

        let tool: ToolName = name
            .parse()
            .map_err(|_| GatewayError::UnknownTool(name.to_string()))?;

        let envelope = self
            .invoke(tool, &token, arguments)
            .await
            .map_err(|source| GatewayError::Upstream { tool, source })?;

        self.limiter.record_request(name);
        Ok(envelope)
    }

    async fn invoke(
        &self,
        tool: ToolName,
        token: &str,
        arguments: Value,
    ) -> ghl_crm_client::Result<UpstreamEnvelope> {
        let client = &self.client;
        match tool {
            ToolName::CreateContact => client.create_contact(token, parse_args(arguments)?).await,
            ToolName::SearchContacts => client.search_contacts(token, parse_args(arguments)?).await,
            ToolName::GetContact => client.get_contact(token, parse_args(arguments)?).await,
            ToolName::UpdateContact => client.update_contact(token, parse_args(arguments)?).await,
            ToolName::DeleteContact => client.delete_contact(token, parse_args(arguments)?).await,
            ToolName::AddContactTags => client.add_contact_tags(token, parse_args(arguments)?).await,
            ToolName::RemoveContactTags => {
                client.remove_contact_tags(token, parse_args(arguments)?).await
            }
            ToolName::SendMessage => client.send_message(token, parse_args(arguments)?).await,
            ToolName::GetConversations => {
                client.get_conversations(token, parse_args(arguments)?).await
            }
            ToolName::GetMessages => client.get_messages(token, parse_args(arguments)?).await,
            ToolName::CreateCalendar => client.create_calendar(token, parse_args(arguments)?).await,
            ToolName::CreateAppointment => {
                client.create_appointment(token, parse_args(arguments)?).await
            }
            ToolName::GetCalendarSlots => {
                client.get_calendar_slots(token, parse_args(arguments)?).await
            }
            ToolName::UpdateAppointment => {
                client.update_appointment(token, parse_args(arguments)?).await
            }
            ToolName::CancelAppointment => {
                client.cancel_appointment(token, parse_args(arguments)?).await
            }
            ToolName::CreateOpportunity => {
                client.create_opportunity(token, parse_args(arguments)?).await
            }
            ToolName::SearchOpportunities => {
                client.search_opportunities(token, parse_args(arguments)?).await
            }
            ToolName::UpdateOpportunity => {
                client.update_opportunity(token, parse_args(arguments)?).await
            }
            ToolName::DeleteOpportunity => {
                client.delete_opportunity(token, parse_args(arguments)?).await
            }
            ToolName::GetPipelines => client.get_pipelines(token, parse_args(arguments)?).await,
            ToolName::CreateOrder => client.create_order(token, parse_args(arguments)?).await,
            ToolName::GetTransactions => {
                client.get_transactions(token, parse_args(arguments)?).await
            }
            ToolName::GetOrders => client.get_orders(token, parse_args(arguments)?).await,
            ToolName::AddContactToWorkflow => {
                client.add_contact_to_workflow(token, parse_args(arguments)?).await
            }
            ToolName::RemoveContactFromWorkflow => {
                client
                    .remove_contact_from_workflow(token, parse_args(arguments)?)
                    .await
            }
            ToolName::GetWorkflows => client.get_workflows(token, parse_args(arguments)?).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::limiter::LimiterConfig;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use ghl_crm_client::ClientConfig;
    use ghl_test_support::MockUpstream;
    use serde_json::json;
    use std::time::Duration;

    fn dispatcher(upstream: &MockUpstream, config: LimiterConfig, default_token: Option<&str>) -> Dispatcher {
        let client = CrmClient::new(&ClientConfig {
            base_url: upstream.base_url(),
            ..ClientConfig::default()
        })
        .expect("client");
        Dispatcher::new(
            client,
            Arc::new(RateLimiter::new(config)),
            default_token.map(str::to_string),
        )
    }

    fn contact_app() -> Router {
        Router::new()
            .route(
                "/contacts/{id}",
                get(|headers: HeaderMap| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    axum::Json(json!({"id": "c1", "auth": auth}))
                }),
            )
            .route(
                "/contacts/",
                post(|axum::Json(body): axum::Json<Value>| async move {
                    axum::Json(json!({"id": "c1", "firstName": body["firstName"]}))
                }),
            )
    }

    #[tokio::test]
    async fn missing_credential_never_reaches_upstream() {
        let upstream = MockUpstream::start(contact_app()).await.expect("mock");
        let d = dispatcher(&upstream, LimiterConfig::default(), None);

        let err = d
            .dispatch("ghl_get_contact", json!({"contactId": "c1"}))
            .await
            .expect_err("no token");
        assert_eq!(err.kind(), ErrorKind::MissingCredential);
        assert_eq!(err.error, "Authentication Required");
        assert_eq!(err.context.as_deref(), Some("ghl_get_contact"));
        assert_eq!(upstream.hits(), 0);

        let err = d
            .dispatch("ghl_get_contact", json!({"contactId": "c1", "token": "  "}))
            .await
            .expect_err("blank token");
        assert_eq!(err.kind(), ErrorKind::MissingCredential);
        assert_eq!(upstream.hits(), 0);
    }

    #[tokio::test]
    async fn per_call_token_wins_over_default() {
        let upstream = MockUpstream::start(contact_app()).await.expect("mock");
        let d = dispatcher(&upstream, LimiterConfig::default(), Some("default-tok"));

        let env = d
            .dispatch("ghl_get_contact", json!({"contactId": "c1", "token": "call-tok"}))
            .await
            .expect("ok");
        assert_eq!(env.get("contact").map(|c| &c["auth"]), Some(&json!("Bearer call-tok")));

        let env = d
            .dispatch("ghl_get_contact", json!({"contactId": "c1"}))
            .await
            .expect("ok");
        assert_eq!(env.get("contact").map(|c| &c["auth"]), Some(&json!("Bearer default-tok")));
        assert_eq!(upstream.hits(), 2);
    }

    #[tokio::test]
    async fn create_contact_wraps_upstream_reply() {
        let upstream = MockUpstream::start(contact_app()).await.expect("mock");
        let d = dispatcher(&upstream, LimiterConfig::default(), Some("tok"));

        let env = d
            .dispatch(
                "ghl_create_contact",
                json!({"locationId": "loc-1", "contactData": {"firstName": "Jo"}}),
            )
            .await
            .expect("created");
        assert_eq!(
            env.into_value(),
            json!({"success": true, "contact": {"id": "c1", "firstName": "Jo"}})
        );
    }

    #[tokio::test]
    async fn burst_denial_skips_upstream_and_recording() {
        let upstream = MockUpstream::start(contact_app()).await.expect("mock");
        let config = LimiterConfig {
            burst_limit: 2,
            burst_window: Duration::from_secs(60),
            ..LimiterConfig::default()
        };
        let d = dispatcher(&upstream, config, Some("tok"));
        let args = json!({"contactId": "c1"});

        d.dispatch("ghl_get_contact", args.clone()).await.expect("1st");
        d.dispatch("ghl_get_contact", args.clone()).await.expect("2nd");
        let err = d
            .dispatch("ghl_get_contact", args)
            .await
            .expect_err("3rd denied");
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.http_status(), 429);
        assert!(err.retry_after.is_some());
        assert_eq!(upstream.hits(), 2);
        assert_eq!(d.limiter().remaining_requests("ghl_get_contact").burst, 0);
    }

    #[tokio::test]
    async fn unknown_tool_leaves_no_limiter_state() {
        let upstream = MockUpstream::start(Router::new()).await.expect("mock");
        let d = dispatcher(&upstream, LimiterConfig::default(), Some("tok"));

        let err = d
            .dispatch("ghl_launch_rocket", json!({}))
            .await
            .expect_err("unknown");
        assert_eq!(err.kind(), ErrorKind::UnknownTool);
        assert_eq!(err.message.as_deref(), Some("Unknown tool: ghl_launch_rocket"));

        let remaining = d.limiter().remaining_requests("ghl_launch_rocket");
        assert_eq!(remaining.burst, d.limiter().config().burst_limit);
        assert_eq!(upstream.hits(), 0);
    }

    #[tokio::test]
    async fn upstream_failure_is_normalized_and_not_recorded() {
        let app = Router::new().route(
            "/contacts/{id}",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    axum::Json(json!({"message": "Contact not found"})),
                )
            }),
        );
        let upstream = MockUpstream::start(app).await.expect("mock");
        let d = dispatcher(&upstream, LimiterConfig::default(), Some("tok"));

        let err = d
            .dispatch("ghl_get_contact", json!({"contactId": "missing"}))
            .await
            .expect_err("404");
        assert_eq!(err.error, "Not Found");
        assert_eq!(err.context.as_deref(), Some("ghl_get_contact"));
        assert_eq!(err.status, Some(404));

        let remaining = d.limiter().remaining_requests("ghl_get_contact");
        assert_eq!(remaining.daily, d.limiter().config().daily_limit);
    }

    #[tokio::test]
    async fn missing_argument_is_a_validation_error() {
        let upstream = MockUpstream::start(contact_app()).await.expect("mock");
        let d = dispatcher(&upstream, LimiterConfig::default(), Some("tok"));

        let err = d
            .dispatch("ghl_get_contact", json!({}))
            .await
            .expect_err("validation");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.field.as_deref(), Some("contactId"));
        assert_eq!(upstream.hits(), 0);
    }
}
