//! Workflow enrollment.

use super::LocationArgs;
use crate::client::{CrmClient, Endpoint};
use crate::envelope::{UpstreamEnvelope, unwrap_field};
use crate::error::Result;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEnrollmentArgs {
    pub contact_id: String,
    pub workflow_id: String,
}

impl WorkflowEnrollmentArgs {
    fn segments(&self) -> [&str; 4] {
        [
            "contacts",
            self.contact_id.as_str(),
            "workflow",
            self.workflow_id.as_str(),
        ]
    }
}

impl CrmClient {
    pub async fn add_contact_to_workflow(
        &self,
        token: &str,
        args: WorkflowEnrollmentArgs,
    ) -> Result<UpstreamEnvelope> {
        self.execute(Endpoint::post(&args.segments(), json!({})), token)
            .await?;
        Ok(UpstreamEnvelope::success().with(
            "message",
            format!(
                "Contact {} successfully added to workflow {}",
                args.contact_id, args.workflow_id
            ),
        ))
    }

    pub async fn remove_contact_from_workflow(
        &self,
        token: &str,
        args: WorkflowEnrollmentArgs,
    ) -> Result<UpstreamEnvelope> {
        self.execute(Endpoint::delete(&args.segments()), token)
            .await?;
        Ok(UpstreamEnvelope::success().with(
            "message",
            format!(
                "Contact {} successfully removed from workflow {}",
                args.contact_id, args.workflow_id
            ),
        ))
    }

    pub async fn get_workflows(&self, token: &str, args: LocationArgs) -> Result<UpstreamEnvelope> {
        let endpoint = Endpoint::get(&["workflows", ""]).query("locationId", &args.location_id);
        let body = self.execute(endpoint, token).await?;
        Ok(UpstreamEnvelope::success().with("workflows", unwrap_field(&body, "workflows")))
    }
}
