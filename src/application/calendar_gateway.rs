use crate::domain::models::{CalendarEvent, EventHandle, ReminderPolicy, WorkBlock};
use crate::infrastructure::config::CalendarSection;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::{decode_calendar_event, encode_work_block};
use crate::infrastructure::google_calendar_client::{GoogleCalendarClient, ListEventsRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_MAX_RESULTS: u32 = 100;

/// Write side of the calendar seam: one created event per block.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn submit_block(&self, access_token: &str, block: &WorkBlock) -> Result<EventHandle, InfraError>;
}

/// Read side of the calendar seam: events of a time range, in start order.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(
        &self,
        access_token: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, InfraError>;
}

pub struct CalendarGateway<C>
where
    C: GoogleCalendarClient,
{
    calendar_client: Arc<C>,
    calendar_id: String,
    time_zone: Tz,
    reminders: ReminderPolicy,
    max_results: u32,
}

impl<C> CalendarGateway<C>
where
    C: GoogleCalendarClient,
{
    pub fn new(calendar_client: Arc<C>, calendar_id: impl Into<String>) -> Self {
        Self {
            calendar_client,
            calendar_id: calendar_id.into(),
            time_zone: Tz::UTC,
            reminders: ReminderPolicy::default(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn from_config(calendar_client: Arc<C>, calendar: &CalendarSection) -> Result<Self, InfraError> {
        let time_zone = calendar.time_zone.trim().parse::<Tz>().map_err(|error| {
            InfraError::InvalidConfig(format!(
                "unknown calendar.timeZone '{}': {error}",
                calendar.time_zone
            ))
        })?;
        Ok(Self::new(calendar_client, calendar.calendar_id.trim())
            .with_time_zone(time_zone)
            .with_reminders(calendar.reminders.clone())
            .with_max_results(calendar.max_results))
    }

    pub fn with_time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn with_reminders(mut self, reminders: ReminderPolicy) -> Self {
        self.reminders = reminders;
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }
}

#[async_trait]
impl<C> EventSink for CalendarGateway<C>
where
    C: GoogleCalendarClient,
{
    async fn submit_block(&self, access_token: &str, block: &WorkBlock) -> Result<EventHandle, InfraError> {
        let event = encode_work_block(block, self.time_zone.name(), &self.reminders);
        self.calendar_client
            .create_event(access_token, &self.calendar_id, &event)
            .await
    }
}

#[async_trait]
impl<C> EventSource for CalendarGateway<C>
where
    C: GoogleCalendarClient,
{
    async fn fetch_events(
        &self,
        access_token: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, InfraError> {
        let request = ListEventsRequest::chronological(range_start, range_end, self.max_results);
        let listed = self
            .calendar_client
            .list_events(access_token, &self.calendar_id, request)
            .await?;

        let mut events = Vec::with_capacity(listed.len());
        for event in &listed {
            match decode_calendar_event(event, self.time_zone) {
                Ok(Some(decoded)) => events.push(decoded),
                Ok(None) => {}
                // Malformed events are dropped; the rest of the range is still returned.
                Err(error) => warn!(event_id = ?event.id, %error, "skipping undecodable calendar event"),
            }
        }
        debug!(listed = listed.len(), kept = events.len(), "fetched calendar events");
        Ok(events)
    }
}
