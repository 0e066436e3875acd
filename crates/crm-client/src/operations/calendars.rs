//! Calendars, free slots and appointments.

use crate::client::{CrmClient, Endpoint};
use crate::envelope::UpstreamEnvelope;
use crate::error::Result;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCalendarArgs {
    pub calendar_data: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentArgs {
    pub appointment_data: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSlotsArgs {
    pub calendar_id: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentArgs {
    pub appointment_id: String,
    pub update_data: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentIdArgs {
    pub appointment_id: String,
}

const APPOINTMENTS: [&str; 3] = ["calendars", "events", "appointments"];

impl CrmClient {
    pub async fn create_calendar(
        &self,
        token: &str,
        args: CreateCalendarArgs,
    ) -> Result<UpstreamEnvelope> {
        let calendar = self
            .execute(
                Endpoint::post(&["calendars", ""], Value::Object(args.calendar_data)),
                token,
            )
            .await?;
        Ok(UpstreamEnvelope::success().with("calendar", calendar))
    }

    pub async fn create_appointment(
        &self,
        token: &str,
        args: CreateAppointmentArgs,
    ) -> Result<UpstreamEnvelope> {
        let appointment = self
            .execute(
                Endpoint::post(&APPOINTMENTS, Value::Object(args.appointment_data)),
                token,
            )
            .await?;
        Ok(UpstreamEnvelope::success().with("appointment", appointment))
    }

    /// Free slots in a date range. `totalSlots` is only reported when the upstream returns a list.
    pub async fn get_calendar_slots(
        &self,
        token: &str,
        args: CalendarSlotsArgs,
    ) -> Result<UpstreamEnvelope> {
        let endpoint = Endpoint::get(&["calendars", args.calendar_id.as_str(), "free-slots"])
            .query("startDate", &args.start_date)
            .query("endDate", &args.end_date)
            .query_opt("timezone", args.timezone.as_deref());
        let slots = self.execute(endpoint, token).await?;
        let total = slots.as_array().map(|a| Value::from(a.len()));
        Ok(UpstreamEnvelope::success()
            .with("slots", slots)
            .with_opt("totalSlots", total))
    }

    pub async fn update_appointment(
        &self,
        token: &str,
        args: UpdateAppointmentArgs,
    ) -> Result<UpstreamEnvelope> {
        let [a, b, c] = APPOINTMENTS;
        let appointment = self
            .execute(
                Endpoint::put(
                    &[a, b, c, args.appointment_id.as_str()],
                    Value::Object(args.update_data),
                ),
                token,
            )
            .await?;
        Ok(UpstreamEnvelope::success().with("appointment", appointment))
    }

    pub async fn cancel_appointment(
        &self,
        token: &str,
        args: AppointmentIdArgs,
    ) -> Result<UpstreamEnvelope> {
        let [a, b, c] = APPOINTMENTS;
        self.execute(
            Endpoint::delete(&[a, b, c, args.appointment_id.as_str()]),
            token,
        )
        .await?;
        Ok(UpstreamEnvelope::success().with(
            "message",
            format!("Appointment {} cancelled successfully", args.appointment_id),
        ))
    }
}
