//! Orders and transactions. Both listings are scoped by `altId` + `altType=location`.

use crate::client::{CrmClient, Endpoint};
use crate::envelope::{UpstreamEnvelope, unwrap_field};
use crate::error::Result;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderArgs {
    pub order_data: Map<String, Value>,
}

/// Filters shared by the transaction and order listings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQueryArgs {
    pub location_id: String,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub start_after: Option<String>,
    #[serde(default)]
    pub end_before: Option<String>,
}

impl PaymentQueryArgs {
    fn endpoint(&self, resource: &str) -> Endpoint {
        Endpoint::get(&["payments", resource])
            .query("altId", &self.location_id)
            .query("altType", "location")
            .query_opt("contactId", self.contact_id.as_deref())
            .query_opt("startAfter", self.start_after.as_deref())
            .query_opt("endBefore", self.end_before.as_deref())
    }
}

impl CrmClient {
    pub async fn create_order(
        &self,
        token: &str,
        args: CreateOrderArgs,
    ) -> Result<UpstreamEnvelope> {
        let order = self
            .execute(
                Endpoint::post(&["payments", "orders"], Value::Object(args.order_data)),
                token,
            )
            .await?;
        Ok(UpstreamEnvelope::success().with("order", order))
    }

    pub async fn get_transactions(
        &self,
        token: &str,
        args: PaymentQueryArgs,
    ) -> Result<UpstreamEnvelope> {
        let body = self.execute(args.endpoint("transactions"), token).await?;
        Ok(UpstreamEnvelope::success()
            .with("transactions", unwrap_field(&body, "transactions"))
            .with_opt("total", body.get("total").cloned()))
    }

    pub async fn get_orders(
        &self,
        token: &str,
        args: PaymentQueryArgs,
    ) -> Result<UpstreamEnvelope> {
        let body = self.execute(args.endpoint("orders"), token).await?;
        Ok(UpstreamEnvelope::success()
            .with("orders", unwrap_field(&body, "orders"))
            .with_opt("total", body.get("total").cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::parse_args;
    use crate::operations::test_util::mock_upstream;
    use axum::Router;
    use axum::extract::RawQuery;
    use axum::routing::get;
    use serde_json::json;

    #[tokio::test]
    async fn listings_scope_by_location_alt_id() {
        async fn transactions(RawQuery(query): RawQuery) -> axum::Json<Value> {
            let query = query.unwrap_or_default();
            assert!(query.contains("altId=loc-1"));
            assert!(query.contains("altType=location"));
            assert!(query.contains("startAfter=2025-01-01"));
            assert!(!query.contains("contactId"));
            axum::Json(json!({"transactions": [{"id": "t1"}], "total": 1}))
        }

        let app = Router::new()
            .route("/payments/transactions", get(transactions))
            .route(
                "/payments/orders",
                get(|| async { axum::Json(json!({"orders": []})) }),
            );
        let (client, shutdown) = mock_upstream(app).await;

        let args = parse_args(json!({"locationId": "loc-1", "startAfter": "2025-01-01"}))
            .expect("args");
        let env = client.get_transactions("tok", args).await.expect("transactions");
        assert_eq!(env.get("transactions"), Some(&json!([{"id": "t1"}])));
        assert_eq!(env.get("total"), Some(&json!(1)));

        let args = parse_args(json!({"locationId": "loc-1"})).expect("args");
        let env = client.get_orders("tok", args).await.expect("orders");
        assert_eq!(env.into_value(), json!({"success": true, "orders": []}));

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn create_order_posts_order_data_verbatim() {
        let app = Router::new().route(
            "/payments/orders",
            axum::routing::post(|axum::Json(b): axum::Json<Value>| async move { axum::Json(b) }),
        );
        let (client, shutdown) = mock_upstream(app).await;
        let args = parse_args(json!({
            "orderData": {"locationId": "loc-1", "contactId": "c1", "amount": 49.5}
        }))
        .expect("args");
        let env = client.create_order("tok", args).await.expect("order");
        assert_eq!(
            env.get("order"),
            Some(&json!({"locationId": "loc-1", "contactId": "c1", "amount": 49.5}))
        );

        let _ = shutdown.send(());
    }
}
