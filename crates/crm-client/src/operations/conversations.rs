//! Messaging and conversation history.

use super::default_limit;
use crate::client::{CrmClient, Endpoint};
use crate::envelope::{UpstreamEnvelope, unwrap_field};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outbound channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "SMS")]
    Sms,
    Email,
    WhatsApp,
}

impl MessageType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "SMS",
            Self::Email => "Email",
            Self::WhatsApp => "WhatsApp",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageArgs {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub contact_id: String,
    pub location_id: String,
    pub message: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub html_body: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<Value>>,
}

impl SendMessageArgs {
    /// Request body for the chosen channel.
    ///
    /// Text channels carry `message`; email carries subject, HTML and plain-text bodies, with the
    /// HTML body defaulting to the plain message.
    fn into_body(self) -> Value {
        let mut body = Map::new();
        body.insert("type".into(), self.message_type.as_str().into());
        body.insert("contactId".into(), self.contact_id.into());
        body.insert("locationId".into(), self.location_id.into());
        match self.message_type {
            MessageType::Sms | MessageType::WhatsApp => {
                body.insert("message".into(), self.message.into());
            }
            MessageType::Email => {
                if let Some(subject) = self.subject {
                    body.insert("subject".into(), subject.into());
                }
                let html = self.html_body.unwrap_or_else(|| self.message.clone());
                body.insert("htmlBody".into(), html.into());
                body.insert("textBody".into(), self.message.into());
                if let Some(attachments) = self.attachments {
                    body.insert("attachments".into(), attachments.into());
                }
            }
        }
        Value::Object(body)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetConversationsArgs {
    pub location_id: String,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub last_message_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMessagesArgs {
    pub conversation_id: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub last_message_id: Option<String>,
}

impl CrmClient {
    pub async fn send_message(
        &self,
        token: &str,
        args: SendMessageArgs,
    ) -> Result<UpstreamEnvelope> {
        let body = self
            .execute(
                Endpoint::post(&["conversations", "messages"], args.into_body()),
                token,
            )
            .await?;
        Ok(UpstreamEnvelope::success()
            .with_opt("messageId", body.get("messageId").cloned())
            .with_opt("conversationId", body.get("conversationId").cloned())
            .with("status", "sent"))
    }

    pub async fn get_conversations(
        &self,
        token: &str,
        args: GetConversationsArgs,
    ) -> Result<UpstreamEnvelope> {
        let endpoint = Endpoint::get(&["conversations", "search"])
            .query("locationId", &args.location_id)
            .query_opt("contactId", args.contact_id.as_deref())
            .query("limit", args.limit)
            .query_opt("lastMessageId", args.last_message_id.as_deref());
        let body = self.execute(endpoint, token).await?;
        Ok(UpstreamEnvelope::success()
            .with("conversations", unwrap_field(&body, "conversations"))
            .with_opt("total", body.get("total").cloned()))
    }

    pub async fn get_messages(
        &self,
        token: &str,
        args: GetMessagesArgs,
    ) -> Result<UpstreamEnvelope> {
        let endpoint = Endpoint::get(&[
            "conversations",
            args.conversation_id.as_str(),
            "messages",
        ])
        .query("limit", args.limit)
        .query_opt("lastMessageId", args.last_message_id.as_deref());
        let body = self.execute(endpoint, token).await?;
        Ok(UpstreamEnvelope::success()
            .with("messages", unwrap_field(&body, "messages"))
            .with_opt("total", body.get("total").cloned()))
    }
}
