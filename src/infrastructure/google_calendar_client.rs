use crate::domain::models::EventHandle;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::GoogleCalendarEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::debug;
use url::Url;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/";
const MAX_PAGE_SIZE: u32 = 2500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrder {
    StartTime,
    Updated,
}

impl EventOrder {
    fn as_query_value(self) -> &'static str {
        match self {
            EventOrder::StartTime => "startTime",
            EventOrder::Updated => "updated",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListEventsRequest {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    pub max_results: u32,
    pub single_events: bool,
    pub order_by: Option<EventOrder>,
}

impl ListEventsRequest {
    /// Expanded recurring instances ordered by start time, the shape the
    /// project filter expects.
    pub fn chronological(time_min: DateTime<Utc>, time_max: DateTime<Utc>, max_results: u32) -> Self {
        Self {
            time_min,
            time_max,
            max_results,
            single_events: true,
            order_by: Some(EventOrder::StartTime),
        }
    }

    fn validate(&self) -> Result<(), InfraError> {
        if self.time_max <= self.time_min {
            return Err(InfraError::Calendar(
                "time_max must be greater than time_min".to_string(),
            ));
        }
        if self.max_results == 0 {
            return Err(InfraError::Calendar("max_results must be > 0".to_string()));
        }
        if self.order_by == Some(EventOrder::StartTime) && !self.single_events {
            return Err(InfraError::Calendar(
                "ordering by startTime requires single_events".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
pub trait GoogleCalendarClient: Send + Sync {
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        request: ListEventsRequest,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError>;

    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &GoogleCalendarEvent,
    ) -> Result<EventHandle, InfraError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestGoogleCalendarClient {
    client: Client,
}

impl ReqwestGoogleCalendarClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::Calendar(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("google calendar api error: http {}", status.as_u16())
        } else {
            format!("google calendar api error: http {}; body={body}", status.as_u16())
        };
        InfraError::Calendar(message)
    }

    fn events_endpoint(calendar_id: &str) -> Result<Url, InfraError> {
        let mut url = Url::parse(CALENDAR_API_BASE)
            .map_err(|error| InfraError::Calendar(format!("invalid calendar api base url: {error}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::Calendar("calendar api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("calendars");
            segments.push(calendar_id);
            segments.push("events");
        }
        Ok(url)
    }
}

#[derive(Debug, serde::Deserialize)]
struct EventsPageResponse {
    items: Option<Vec<GoogleCalendarEvent>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[async_trait]
impl GoogleCalendarClient for ReqwestGoogleCalendarClient {
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        request: ListEventsRequest,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;
        request.validate()?;

        let endpoint = Self::events_endpoint(calendar_id)?;
        let max_results = request.max_results as usize;
        let mut page_token: Option<String> = None;
        let mut events = Vec::new();

        loop {
            let remaining = (max_results - events.len()) as u32;
            let mut req = self
                .client
                .get(endpoint.clone())
                .bearer_auth(access_token)
                .query(&[
                    ("timeMin", request.time_min.to_rfc3339()),
                    ("timeMax", request.time_max.to_rfc3339()),
                    ("maxResults", remaining.min(MAX_PAGE_SIZE).to_string()),
                    ("singleEvents", request.single_events.to_string()),
                ]);
            if let Some(order_by) = request.order_by {
                req = req.query(&[("orderBy", order_by.as_query_value())]);
            }
            if let Some(page_token) = page_token.as_deref() {
                req = req.query(&[("pageToken", page_token)]);
            }

            debug!(calendar_id, page = page_token.is_some(), "listing calendar events");
            let response = req.send().await.map_err(|error| {
                InfraError::Calendar(format!("network error while listing calendar events: {error}"))
            })?;

            let status = response.status();
            let body = response.text().await.map_err(|error| {
                InfraError::Calendar(format!("failed reading events list response: {error}"))
            })?;

            if !status.is_success() {
                return Err(Self::http_error(status, &body));
            }

            let mut parsed: EventsPageResponse = serde_json::from_str(&body).map_err(|error| {
                InfraError::Calendar(format!("invalid events list payload: {error}; body={body}"))
            })?;

            events.extend(parsed.items.take().unwrap_or_default());
            if events.len() >= max_results {
                events.truncate(max_results);
                break;
            }

            if let Some(next_page_token) = parsed.next_page_token.take() {
                page_token = Some(next_page_token);
                continue;
            }
            break;
        }

        Ok(events)
    }

    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &GoogleCalendarEvent,
    ) -> Result<EventHandle, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;

        let endpoint = Self::events_endpoint(calendar_id)?;
        debug!(calendar_id, summary = ?event.summary, "creating calendar event");
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(|error| InfraError::Calendar(format!("network error while creating event: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Calendar(format!("failed reading event create response: {error}")))?;

        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }

        let parsed: GoogleCalendarEvent = serde_json::from_str(&body).map_err(|error| {
            InfraError::Calendar(format!("invalid event create payload: {error}; body={body}"))
        })?;
        let id = parsed
            .id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| InfraError::Calendar("event create response did not include id".to_string()))?;
        Ok(EventHandle {
            id,
            html_link: parsed.html_link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    #[test]
    fn events_endpoint_escapes_calendar_id() {
        let url = ReqwestGoogleCalendarClient::events_endpoint("team@group.calendar.google.com")
            .expect("endpoint");
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/team@group.calendar.google.com/events"
        );

        let url = ReqwestGoogleCalendarClient::events_endpoint("a/b").expect("endpoint");
        assert!(url.as_str().ends_with("/calendars/a%2Fb/events"));
    }

    #[test]
    fn chronological_request_is_valid() {
        let request = ListEventsRequest::chronological(
            fixed_time("2025-03-15T00:00:00Z"),
            fixed_time("2025-03-16T00:00:00Z"),
            100,
        );
        assert!(request.validate().is_ok());
        assert_eq!(request.order_by.map(EventOrder::as_query_value), Some("startTime"));
    }

    #[test]
    fn request_validation_rejects_inverted_range_and_unexpanded_ordering() {
        let mut request = ListEventsRequest::chronological(
            fixed_time("2025-03-16T00:00:00Z"),
            fixed_time("2025-03-15T00:00:00Z"),
            100,
        );
        assert!(request.validate().is_err());

        request.time_max = fixed_time("2025-03-17T00:00:00Z");
        request.single_events = false;
        assert!(request.validate().is_err());

        request.order_by = Some(EventOrder::Updated);
        assert!(request.validate().is_ok());

        request.max_results = 0;
        assert!(request.validate().is_err());
    }

    #[tokio::test]
    async fn calls_reject_empty_access_token_before_network() {
        let client = ReqwestGoogleCalendarClient::new();
        let request = ListEventsRequest::chronological(
            fixed_time("2025-03-15T00:00:00Z"),
            fixed_time("2025-03-16T00:00:00Z"),
            10,
        );
        let result = client.list_events("  ", "primary", request).await;
        assert!(matches!(result, Err(InfraError::Calendar(message)) if message.contains("access token")));
    }
}
