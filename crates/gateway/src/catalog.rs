//! Static tool catalog: name, description, input schema and annotations for every [`ToolName`].

use crate::dispatch::TOKEN_ARG;
use crate::tool_name::ToolName;
use reqwest::Method;
use rmcp::model::{JsonObject, Tool, ToolAnnotations};
use serde_json::{Value, json};
use std::sync::Arc;

const TOKEN_DESCRIPTION: &str = "Access token (optional if GHL_PRIVATE_TOKEN is set)";

/// Every tool, in catalog order.
#[must_use]
pub fn tools() -> Vec<Tool> {
    ToolName::ALL.into_iter().map(tool).collect()
}

#[must_use]
pub fn tool(name: ToolName) -> Tool {
    let mut tool = Tool::new(name.as_str(), description(name), Arc::new(input_schema(name)));
    tool.annotations = Some(annotations_for_method(&name.method()));
    tool
}

/// MCP hints from HTTP verb semantics. Every tool talks to an external system, so
/// `openWorldHint` is always set.
#[must_use]
pub fn annotations_for_method(method: &Method) -> ToolAnnotations {
    let annotations = ToolAnnotations::new().open_world(true);
    if method == Method::GET {
        annotations.read_only(true).destructive(false).idempotent(true)
    } else if method == Method::POST {
        annotations.read_only(false).destructive(false).idempotent(false)
    } else if method == Method::PUT || method == Method::DELETE {
        annotations.read_only(false).destructive(true).idempotent(true)
    } else {
        annotations
    }
}

fn description(name: ToolName) -> &'static str {
    match name {
        ToolName::CreateContact => "Create a new contact in the CRM",
        ToolName::SearchContacts => "Search for contacts in the CRM",
        ToolName::GetContact => "Get a specific contact by ID",
        ToolName::UpdateContact => "Update an existing contact",
        ToolName::DeleteContact => "Delete a contact",
        ToolName::AddContactTags => "Add tags to a contact",
        ToolName::RemoveContactTags => "Remove tags from a contact",
        ToolName::SendMessage => "Send SMS, Email, or WhatsApp message to a contact",
        ToolName::GetConversations => "Get conversations for a location or contact",
        ToolName::GetMessages => "Get messages in a specific conversation",
        ToolName::CreateCalendar => "Create a new calendar",
        ToolName::CreateAppointment => "Create a new appointment in a calendar",
        ToolName::GetCalendarSlots => "Get available time slots for a calendar",
        ToolName::UpdateAppointment => "Update an existing appointment",
        ToolName::CancelAppointment => "Cancel an appointment",
        ToolName::CreateOpportunity => "Create a new sales opportunity",
        ToolName::SearchOpportunities => "Search for opportunities in pipelines",
        ToolName::UpdateOpportunity => "Update an existing opportunity",
        ToolName::DeleteOpportunity => "Delete an opportunity",
        ToolName::GetPipelines => "Get all pipelines for a location",
        ToolName::CreateOrder => "Create a new payment order",
        ToolName::GetTransactions => "Get payment transaction history",
        ToolName::GetOrders => "Get payment orders",
        ToolName::AddContactToWorkflow => "Add a contact to an automation workflow",
        ToolName::RemoveContactFromWorkflow => "Remove a contact from a workflow",
        ToolName::GetWorkflows => "Get all workflows for a location",
    }
}

fn string(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn number(description: &str) -> Value {
    json!({"type": "number", "description": description})
}

/// Page sizes and offsets; the client reads these as unsigned integers.
fn count(description: &str) -> Value {
    json!({"type": "integer", "minimum": 0, "description": description})
}

fn boolean(description: &str) -> Value {
    json!({"type": "boolean", "description": description})
}

fn string_enum(values: &[&str], description: &str) -> Value {
    json!({"type": "string", "enum": values, "description": description})
}

fn string_list(description: &str) -> Value {
    json!({"type": "array", "items": {"type": "string"}, "description": description})
}

fn location_id() -> Value {
    string("Location/Sub-account ID")
}

/// Object schema with the shared optional `token` property appended.
fn object(properties: Value, required: &[&str]) -> JsonObject {
    let mut properties = match properties {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    };
    properties.insert(TOKEN_ARG.to_string(), string(TOKEN_DESCRIPTION));

    let mut schema = JsonObject::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    schema.insert("required".to_string(), json!(required));
    schema
}

const APPOINTMENT_STATUSES: &[&str] = &["new", "confirmed", "cancelled", "showed", "noshow"];
const OPPORTUNITY_STATUSES: &[&str] = &["open", "won", "lost", "abandoned"];

fn contact_fields() -> Value {
    json!({
        "type": "object",
        "description": "Contact information object",
        "properties": {
            "firstName": string("First name"),
            "lastName": string("Last name"),
            "email": string("Email address"),
            "phone": string("Phone number with country code"),
            "address1": string("Street address"),
            "city": string("City"),
            "state": string("State/Province"),
            "postalCode": string("Postal/ZIP code"),
            "country": string("Country code (e.g., US)"),
            "website": string("Website URL"),
            "timezone": string("Timezone (e.g., America/Los_Angeles)"),
            "dnd": boolean("Do Not Disturb status"),
            "tags": string_list("Array of tags"),
            "source": string("Contact source"),
            "assignedTo": string("Assigned user ID"),
            "companyName": string("Company name"),
            "customFields": {
                "type": "array",
                "description": "Custom field values",
                "items": {
                    "type": "object",
                    "properties": {
                        "key": string("Custom field ID"),
                        "field_value": {"description": "Field value"}
                    }
                }
            }
        }
    })
}

fn calendar_fields() -> Value {
    json!({
        "type": "object",
        "description": "Calendar configuration",
        "properties": {
            "name": string("Calendar name"),
            "description": string("Calendar description"),
            "locationId": location_id(),
            "teamMembers": string_list("User IDs who can manage this calendar"),
            "eventTitle": string("Default event title template"),
            "eventType": number("Event type (1 for Round Robin, 2 for Collective)"),
            "slotDuration": number("Duration of each slot in minutes"),
            "slotInterval": number("Interval between slots in minutes"),
            "slotBuffer": number("Buffer time between appointments"),
            "preBuffer": number("Pre-appointment buffer time"),
            "preBufferUnit": string_enum(&["mins", "hours"], "Unit for pre-buffer"),
            "appoinmentPerSlot": number("Max appointments per slot"),
            "appoinmentPerDay": number("Max appointments per day"),
            "openHours": {
                "type": "array",
                "description": "Calendar availability hours",
                "items": {
                    "type": "object",
                    "properties": {
                        "daysOfTheWeek": {
                            "type": "array",
                            "items": {"type": "number"},
                            "description": "Days (1=Monday, 7=Sunday)"
                        },
                        "hours": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "openHour": number("Opening hour (0-23)"),
                                    "openMinute": number("Opening minute (0-59)"),
                                    "closeHour": number("Closing hour (0-23)"),
                                    "closeMinute": number("Closing minute (0-59)")
                                }
                            }
                        }
                    }
                }
            },
            "enableRecurring": boolean("Enable recurring appointments"),
            "formId": string("Associated form ID"),
            "autoConfirm": boolean("Auto-confirm appointments"),
            "allowReschedule": boolean("Allow rescheduling"),
            "allowCancellation": boolean("Allow cancellations")
        },
        "required": ["name", "locationId"]
    })
}

fn payment_filters() -> Value {
    json!({
        "locationId": location_id(),
        "contactId": string("Filter by contact ID (optional)"),
        "startAfter": string("Start date filter (ISO format or YYYY-MM-DD)"),
        "endBefore": string("End date filter (ISO format or YYYY-MM-DD)")
    })
}

fn input_schema(name: ToolName) -> JsonObject {
    match name {
        ToolName::CreateContact => object(
            json!({"locationId": location_id(), "contactData": contact_fields()}),
            &["locationId", "contactData"],
        ),
        ToolName::SearchContacts => object(
            json!({
                "locationId": location_id(),
                "query": string("Search query string"),
                "limit": count("Number of results to return (default: 20, max: 100)"),
                "offset": count("Offset for pagination")
            }),
            &["locationId"],
        ),
        ToolName::GetContact => object(json!({"contactId": string("Contact ID")}), &["contactId"]),
        ToolName::UpdateContact => object(
            json!({
                "contactId": string("Contact ID to update"),
                "updateData": {
                    "type": "object",
                    "description": "Fields to update (same structure as contactData in create)"
                }
            }),
            &["contactId", "updateData"],
        ),
        ToolName::DeleteContact => {
            object(json!({"contactId": string("Contact ID to delete")}), &["contactId"])
        }
        ToolName::AddContactTags => object(
            json!({"contactId": string("Contact ID"), "tags": string_list("Tags to add")}),
            &["contactId", "tags"],
        ),
        ToolName::RemoveContactTags => object(
            json!({"contactId": string("Contact ID"), "tags": string_list("Tags to remove")}),
            &["contactId", "tags"],
        ),
        ToolName::SendMessage => object(
            json!({
                "type": string_enum(&["SMS", "Email", "WhatsApp"], "Message type"),
                "contactId": string("Contact ID to send message to"),
                "locationId": location_id(),
                "message": string("Message content (for SMS/WhatsApp) or email body text"),
                "subject": string("Email subject (required for Email type)"),
                "htmlBody": string("HTML email body (optional for Email type)"),
                "attachments": {
                    "type": "array",
                    "description": "Email attachments (optional for Email type)",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": string("Attachment filename"),
                            "url": string("Attachment URL")
                        }
                    }
                }
            }),
            &["type", "contactId", "locationId", "message"],
        ),
        ToolName::GetConversations => object(
            json!({
                "locationId": location_id(),
                "contactId": string("Filter by specific contact ID (optional)"),
                "limit": count("Number of results (default: 20)"),
                "lastMessageId": string("Pagination cursor - last message ID from previous page")
            }),
            &["locationId"],
        ),
        ToolName::GetMessages => object(
            json!({
                "conversationId": string("Conversation ID"),
                "limit": count("Number of messages to retrieve (default: 20)"),
                "lastMessageId": string("Pagination cursor - last message ID from previous page")
            }),
            &["conversationId"],
        ),
        ToolName::CreateCalendar => {
            object(json!({"calendarData": calendar_fields()}), &["calendarData"])
        }
        ToolName::CreateAppointment => object(
            json!({
                "appointmentData": {
                    "type": "object",
                    "description": "Appointment details",
                    "properties": {
                        "calendarId": string("Calendar ID"),
                        "locationId": location_id(),
                        "contactId": string("Contact ID for the appointment"),
                        "startTime": string("Start time in ISO format (e.g., 2025-07-23T15:00:00Z)"),
                        "endTime": string("End time in ISO format"),
                        "title": string("Appointment title"),
                        "appointmentStatus": string_enum(APPOINTMENT_STATUSES, "Appointment status"),
                        "assignedUserId": string("Assigned user/team member ID"),
                        "address": string("Appointment location address"),
                        "ignoreDateRange": boolean("Ignore calendar date range restrictions"),
                        "toNotify": boolean("Send notifications")
                    },
                    "required": ["calendarId", "locationId", "contactId", "startTime", "endTime"]
                }
            }),
            &["appointmentData"],
        ),
        ToolName::GetCalendarSlots => object(
            json!({
                "calendarId": string("Calendar ID"),
                "startDate": string("Start date (YYYY-MM-DD)"),
                "endDate": string("End date (YYYY-MM-DD)"),
                "timezone": string("Timezone for slots (e.g., America/Los_Angeles)")
            }),
            &["calendarId", "startDate", "endDate"],
        ),
        ToolName::UpdateAppointment => object(
            json!({
                "appointmentId": string("Appointment ID to update"),
                "updateData": {
                    "type": "object",
                    "description": "Fields to update",
                    "properties": {
                        "startTime": string("New start time in ISO format"),
                        "endTime": string("New end time in ISO format"),
                        "title": string("New title"),
                        "appointmentStatus": string_enum(APPOINTMENT_STATUSES, "New status"),
                        "assignedUserId": string("New assigned user ID"),
                        "address": string("New address")
                    }
                }
            }),
            &["appointmentId", "updateData"],
        ),
        ToolName::CancelAppointment => object(
            json!({"appointmentId": string("Appointment ID to cancel")}),
            &["appointmentId"],
        ),
        ToolName::CreateOpportunity => object(
            json!({
                "opportunityData": {
                    "type": "object",
                    "description": "Opportunity details",
                    "properties": {
                        "pipelineId": string("Pipeline ID"),
                        "locationId": location_id(),
                        "name": string("Opportunity name"),
                        "pipelineStageId": string("Pipeline stage ID"),
                        "status": string_enum(OPPORTUNITY_STATUSES, "Opportunity status"),
                        "contactId": string("Associated contact ID"),
                        "monetaryValue": number("Opportunity value in cents"),
                        "assignedTo": string("Assigned user ID"),
                        "notes": string("Internal notes"),
                        "customFields": {
                            "type": "object",
                            "description": "Custom field values as key-value pairs"
                        }
                    },
                    "required": ["pipelineId", "locationId", "name", "pipelineStageId", "contactId"]
                }
            }),
            &["opportunityData"],
        ),
        ToolName::SearchOpportunities => object(
            json!({
                "locationId": location_id(),
                "pipelineId": string("Filter by specific pipeline ID (optional)"),
                "query": string("Search query string"),
                "assignedTo": string("Filter by assigned user ID")
            }),
            &["locationId"],
        ),
        ToolName::UpdateOpportunity => object(
            json!({
                "opportunityId": string("Opportunity ID to update"),
                "updateData": {
                    "type": "object",
                    "description": "Fields to update",
                    "properties": {
                        "name": string("New opportunity name"),
                        "pipelineStageId": string("Move to different stage"),
                        "status": string_enum(OPPORTUNITY_STATUSES, "New status"),
                        "monetaryValue": number("New value in cents"),
                        "assignedTo": string("Reassign to user ID"),
                        "notes": string("Update notes"),
                        "customFields": {"type": "object", "description": "Update custom fields"}
                    }
                }
            }),
            &["opportunityId", "updateData"],
        ),
        ToolName::DeleteOpportunity => object(
            json!({"opportunityId": string("Opportunity ID to delete")}),
            &["opportunityId"],
        ),
        ToolName::GetPipelines | ToolName::GetWorkflows => {
            object(json!({"locationId": location_id()}), &["locationId"])
        }
        ToolName::CreateOrder => object(
            json!({
                "orderData": {
                    "type": "object",
                    "description": "Order details",
                    "properties": {
                        "locationId": location_id(),
                        "contactId": string("Contact ID for the order"),
                        "amount": number("Order amount"),
                        "currency": {"type": "string", "description": "Currency code (e.g., USD)", "default": "USD"},
                        "source": {"type": "string", "description": "Order source", "default": "manual"},
                        "items": {
                            "type": "array",
                            "description": "Order line items",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "name": string("Product/service name"),
                                    "price": number("Item price"),
                                    "quantity": {"type": "number", "description": "Quantity", "default": 1},
                                    "description": string("Item description")
                                },
                                "required": ["name", "price"]
                            }
                        },
                        "couponCode": string("Applied coupon code"),
                        "notes": string("Order notes")
                    },
                    "required": ["locationId", "contactId", "amount"]
                }
            }),
            &["orderData"],
        ),
        ToolName::GetTransactions | ToolName::GetOrders => {
            object(payment_filters(), &["locationId"])
        }
        ToolName::AddContactToWorkflow => object(
            json!({
                "contactId": string("Contact ID to add to workflow"),
                "workflowId": string("Workflow ID to add contact to")
            }),
            &["contactId", "workflowId"],
        ),
        ToolName::RemoveContactFromWorkflow => object(
            json!({
                "contactId": string("Contact ID to remove from workflow"),
                "workflowId": string("Workflow ID to remove contact from")
            }),
            &["contactId", "workflowId"],
        ),
    }
}
