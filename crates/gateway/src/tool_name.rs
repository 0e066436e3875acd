//! The closed set of tools this gateway exposes.

use reqwest::Method;
use std::fmt;
use std::str::FromStr;

/// One supported upstream operation.
///
/// The wire name (`ghl_*`) is the key for admission accounting and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolName {
    CreateContact,
    SearchContacts,
    GetContact,
    UpdateContact,
    DeleteContact,
    AddContactTags,
    RemoveContactTags,
    SendMessage,
    GetConversations,
    GetMessages,
    CreateCalendar,
    CreateAppointment,
    GetCalendarSlots,
    UpdateAppointment,
    CancelAppointment,
    CreateOpportunity,
    SearchOpportunities,
    UpdateOpportunity,
    DeleteOpportunity,
    GetPipelines,
    CreateOrder,
    GetTransactions,
    GetOrders,
    AddContactToWorkflow,
    RemoveContactFromWorkflow,
    GetWorkflows,
}

/// Functional area a tool belongs to; catalog order follows this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Contact,
    Conversation,
    Calendar,
    Opportunity,
    Payment,
    Workflow,
}

impl ToolName {
    /// Every tool, in catalog order.
    pub const ALL: [Self; 26] = [
        Self::CreateContact,
        Self::SearchContacts,
        Self::GetContact,
        Self::UpdateContact,
        Self::DeleteContact,
        Self::AddContactTags,
        Self::RemoveContactTags,
        Self::SendMessage,
        Self::GetConversations,
        Self::GetMessages,
        Self::CreateCalendar,
        Self::CreateAppointment,
        Self::GetCalendarSlots,
        Self::UpdateAppointment,
        Self::CancelAppointment,
        Self::CreateOpportunity,
        Self::SearchOpportunities,
        Self::UpdateOpportunity,
        Self::DeleteOpportunity,
        Self::GetPipelines,
        Self::CreateOrder,
        Self::GetTransactions,
        Self::GetOrders,
        Self::AddContactToWorkflow,
        Self::RemoveContactFromWorkflow,
        Self::GetWorkflows,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateContact => "ghl_create_contact",
            Self::SearchContacts => "ghl_search_contacts",
            Self::GetContact => "ghl_get_contact",
            Self::UpdateContact => "ghl_update_contact",
            Self::DeleteContact => "ghl_delete_contact",
            Self::AddContactTags => "ghl_add_contact_tags",
            Self::RemoveContactTags => "ghl_remove_contact_tags",
            Self::SendMessage => "ghl_send_message",
            Self::GetConversations => "ghl_get_conversations",
            Self::GetMessages => "ghl_get_messages",
            Self::CreateCalendar => "ghl_create_calendar",
            Self::CreateAppointment => "ghl_create_appointment",
            Self::GetCalendarSlots => "ghl_get_calendar_slots",
            Self::UpdateAppointment => "ghl_update_appointment",
            Self::CancelAppointment => "ghl_cancel_appointment",
            Self::CreateOpportunity => "ghl_create_opportunity",
            Self::SearchOpportunities => "ghl_search_opportunities",
            Self::UpdateOpportunity => "ghl_update_opportunity",
            Self::DeleteOpportunity => "ghl_delete_opportunity",
            Self::GetPipelines => "ghl_get_pipelines",
            Self::CreateOrder => "ghl_create_order",
            Self::GetTransactions => "ghl_get_transactions",
            Self::GetOrders => "ghl_get_orders",
            Self::AddContactToWorkflow => "ghl_add_contact_to_workflow",
            Self::RemoveContactFromWorkflow => "ghl_remove_contact_from_workflow",
            Self::GetWorkflows => "ghl_get_workflows",
        }
    }

    #[must_use]
    pub fn domain(self) -> Domain {
        match self {
            Self::CreateContact
            | Self::SearchContacts
            | Self::GetContact
            | Self::UpdateContact
            | Self::DeleteContact
            | Self::AddContactTags
            | Self::RemoveContactTags => Domain::Contact,
            Self::SendMessage | Self::GetConversations | Self::GetMessages => Domain::Conversation,
            Self::CreateCalendar
            | Self::CreateAppointment
            | Self::GetCalendarSlots
            | Self::UpdateAppointment
            | Self::CancelAppointment => Domain::Calendar,
            Self::CreateOpportunity
            | Self::SearchOpportunities
            | Self::UpdateOpportunity
            | Self::DeleteOpportunity
            | Self::GetPipelines => Domain::Opportunity,
            Self::CreateOrder | Self::GetTransactions | Self::GetOrders => Domain::Payment,
            Self::AddContactToWorkflow | Self::RemoveContactFromWorkflow | Self::GetWorkflows => {
                Domain::Workflow
            }
        }
    }

    /// HTTP verb of the upstream call behind this tool.
    #[must_use]
    pub fn method(self) -> Method {
        match self {
            Self::SearchContacts
            | Self::GetContact
            | Self::GetConversations
            | Self::GetMessages
            | Self::GetCalendarSlots
            | Self::SearchOpportunities
            | Self::GetPipelines
            | Self::GetTransactions
            | Self::GetOrders
            | Self::GetWorkflows => Method::GET,
            Self::CreateContact
            | Self::AddContactTags
            | Self::SendMessage
            | Self::CreateCalendar
            | Self::CreateAppointment
            | Self::CreateOpportunity
            | Self::CreateOrder
            | Self::AddContactToWorkflow => Method::POST,
            Self::UpdateContact | Self::UpdateAppointment | Self::UpdateOpportunity => Method::PUT,
            Self::DeleteContact
            | Self::RemoveContactTags
            | Self::CancelAppointment
            | Self::DeleteOpportunity
            | Self::RemoveContactFromWorkflow => Method::DELETE,
        }
    }

    /// Human-readable noun for the entity a tool acts on, used in "not found" messages.
    #[must_use]
    pub fn resource_noun(self) -> &'static str {
        match self.domain() {
            Domain::Contact => "contact",
            Domain::Conversation => "conversation",
            Domain::Calendar => match self {
                Self::CreateCalendar | Self::GetCalendarSlots => "calendar",
                _ => "appointment",
            },
            Domain::Opportunity => match self {
                Self::GetPipelines => "pipeline",
                _ => "opportunity",
            },
            Domain::Payment => match self {
                Self::GetTransactions => "transaction",
                _ => "order",
            },
            Domain::Workflow => "workflow",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known tool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown tool: {0}")]
pub struct UnknownToolName(pub String);

impl FromStr for ToolName {
    type Err = UnknownToolName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownToolName(s.to_string()))
    }
}
