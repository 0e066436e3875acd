//! Contact operations.

use super::default_limit;
use crate::client::{CrmClient, Endpoint};
use crate::envelope::{UpstreamEnvelope, list_total, page_number, unwrap_field};
use crate::error::Result;
use serde::Deserialize;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactArgs {
    pub location_id: String,
    pub contact_data: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchContactsArgs {
    pub location_id: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactIdArgs {
    pub contact_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactArgs {
    pub contact_id: String,
    pub update_data: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactTagsArgs {
    pub contact_id: String,
    pub tags: Vec<String>,
}

impl CrmClient {
    /// `POST /contacts/` with `locationId` merged into the contact fields.
    ///
    /// Keys in `contact_data` win over the top-level `location_id`.
    pub async fn create_contact(
        &self,
        token: &str,
        args: CreateContactArgs,
    ) -> Result<UpstreamEnvelope> {
        let mut body = Map::new();
        body.insert("locationId".to_string(), Value::String(args.location_id));
        body.extend(args.contact_data);

        let contact = self
            .execute(Endpoint::post(&["contacts", ""], Value::Object(body)), token)
            .await?;
        Ok(UpstreamEnvelope::success().with("contact", contact))
    }

    pub async fn search_contacts(
        &self,
        token: &str,
        args: SearchContactsArgs,
    ) -> Result<UpstreamEnvelope> {
        let mut endpoint = Endpoint::get(&["contacts", ""])
            .query("locationId", &args.location_id)
            .query_opt("query", args.query.as_deref())
            .query("limit", args.limit);
        if args.offset > 0 {
            endpoint = endpoint.query("offset", args.offset);
        }

        let body = self.execute(endpoint, token).await?;
        let contacts = unwrap_field(&body, "contacts");
        let total = list_total(&body, &contacts);
        Ok(UpstreamEnvelope::success()
            .with("contacts", contacts)
            .with_opt("total", total)
            .with_opt("meta", body.get("meta").cloned())
            .with("page", page_number(args.offset, args.limit)))
    }

    pub async fn get_contact(&self, token: &str, args: ContactIdArgs) -> Result<UpstreamEnvelope> {
        let contact = self
            .execute(Endpoint::get(&["contacts", args.contact_id.as_str()]), token)
            .await?;
        Ok(UpstreamEnvelope::success().with("contact", contact))
    }

    /// `PUT /contacts/{id}`. The upstream sometimes wraps the entity as `{contact: {...}}`.
    pub async fn update_contact(
        &self,
        token: &str,
        args: UpdateContactArgs,
    ) -> Result<UpstreamEnvelope> {
        let body = self
            .execute(
                Endpoint::put(
                    &["contacts", args.contact_id.as_str()],
                    Value::Object(args.update_data),
                ),
                token,
            )
            .await?;
        Ok(UpstreamEnvelope::success().with("contact", unwrap_field(&body, "contact")))
    }

    pub async fn delete_contact(
        &self,
        token: &str,
        args: ContactIdArgs,
    ) -> Result<UpstreamEnvelope> {
        self.execute(Endpoint::delete(&["contacts", args.contact_id.as_str()]), token)
            .await?;
        Ok(UpstreamEnvelope::success().with(
            "message",
            format!("Contact {} deleted successfully", args.contact_id),
        ))
    }

    pub async fn add_contact_tags(
        &self,
        token: &str,
        args: ContactTagsArgs,
    ) -> Result<UpstreamEnvelope> {
        let body = self
            .execute(
                Endpoint::post(
                    &["contacts", args.contact_id.as_str(), "tags"],
                    json!({ "tags": args.tags }),
                ),
                token,
            )
            .await?;
        let tags = body
            .get("tags")
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| json!(args.tags));
        Ok(UpstreamEnvelope::success()
            .with("tags", tags)
            .with("message", format!("Tags added to contact {}", args.contact_id)))
    }

    pub async fn remove_contact_tags(
        &self,
        token: &str,
        args: ContactTagsArgs,
    ) -> Result<UpstreamEnvelope> {
        self.execute(
            Endpoint::delete(&["contacts", args.contact_id.as_str(), "tags"])
                .body(json!({ "tags": args.tags })),
            token,
        )
        .await?;
        Ok(UpstreamEnvelope::success().with(
            "message",
            format!("Tags removed from contact {}", args.contact_id),
        ))
    }
}
