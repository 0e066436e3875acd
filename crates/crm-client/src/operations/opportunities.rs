//! Opportunities and pipelines.

use super::LocationArgs;
use crate::client::{CrmClient, Endpoint};
use crate::envelope::{UpstreamEnvelope, unwrap_field};
use crate::error::Result;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOpportunityArgs {
    pub opportunity_data: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOpportunitiesArgs {
    pub location_id: String,
    #[serde(default)]
    pub pipeline_id: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOpportunityArgs {
    pub opportunity_id: String,
    pub update_data: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityIdArgs {
    pub opportunity_id: String,
}

impl CrmClient {
    pub async fn create_opportunity(
        &self,
        token: &str,
        args: CreateOpportunityArgs,
    ) -> Result<UpstreamEnvelope> {
        let opportunity = self
            .execute(
                Endpoint::post(&["opportunities", ""], Value::Object(args.opportunity_data)),
                token,
            )
            .await?;
        Ok(UpstreamEnvelope::success().with("opportunity", opportunity))
    }

    /// The search endpoint spells the location filter `location_id`.
    pub async fn search_opportunities(
        &self,
        token: &str,
        args: SearchOpportunitiesArgs,
    ) -> Result<UpstreamEnvelope> {
        let endpoint = Endpoint::get(&["opportunities", "search"])
            .query_opt("pipelineId", args.pipeline_id.as_deref())
            .query_opt("query", args.query.as_deref())
            .query_opt("assignedTo", args.assigned_to.as_deref())
            .query("location_id", &args.location_id);
        let body = self.execute(endpoint, token).await?;
        Ok(UpstreamEnvelope::success()
            .with("opportunities", unwrap_field(&body, "opportunities"))
            .with_opt("total", body.get("total").cloned()))
    }

    pub async fn update_opportunity(
        &self,
        token: &str,
        args: UpdateOpportunityArgs,
    ) -> Result<UpstreamEnvelope> {
        let opportunity = self
            .execute(
                Endpoint::put(
                    &["opportunities", args.opportunity_id.as_str()],
                    Value::Object(args.update_data),
                ),
                token,
            )
            .await?;
        Ok(UpstreamEnvelope::success().with("opportunity", opportunity))
    }

    pub async fn delete_opportunity(
        &self,
        token: &str,
        args: OpportunityIdArgs,
    ) -> Result<UpstreamEnvelope> {
        self.execute(
            Endpoint::delete(&["opportunities", args.opportunity_id.as_str()]),
            token,
        )
        .await?;
        Ok(UpstreamEnvelope::success().with(
            "message",
            format!("Opportunity {} deleted successfully", args.opportunity_id),
        ))
    }

    pub async fn get_pipelines(&self, token: &str, args: LocationArgs) -> Result<UpstreamEnvelope> {
        let endpoint =
            Endpoint::get(&["opportunities", "pipelines"]).query("locationId", &args.location_id);
        let body = self.execute(endpoint, token).await?;
        Ok(UpstreamEnvelope::success().with("pipelines", unwrap_field(&body, "pipelines")))
    }
}
