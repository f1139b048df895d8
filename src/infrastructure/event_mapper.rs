use crate::domain::models::{CalendarEvent, ReminderPolicy, WorkBlock};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

const LOCAL_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const STATUS_CONFIRMED: &str = "confirmed";
const STATUS_CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct CalendarEventDateTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CalendarReminderOverride {
    pub method: String,
    pub minutes: u32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CalendarEventReminders {
    #[serde(rename = "useDefault")]
    pub use_default: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<CalendarReminderOverride>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct GoogleCalendarEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "htmlLink", skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default)]
    pub start: CalendarEventDateTime,
    #[serde(default)]
    pub end: CalendarEventDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminders: Option<CalendarEventReminders>,
}

/// Builds the insert payload for one block. Block times are local wall-clock
/// values; `time_zone` tells the calendar how to interpret them.
pub fn encode_work_block(
    block: &WorkBlock,
    time_zone: &str,
    reminders: &ReminderPolicy,
) -> GoogleCalendarEvent {
    GoogleCalendarEvent {
        id: None,
        summary: Some(block.title.clone()),
        description: Some(block.description.clone()),
        status: Some(STATUS_CONFIRMED.to_string()),
        html_link: None,
        start: local_date_time(block.start_time, time_zone),
        end: local_date_time(block.end_time, time_zone),
        reminders: Some(encode_reminders(reminders)),
    }
}

/// Maps a listed event into the read model. Cancelled events and events
/// without an id are not part of the read model and yield `None`.
///
/// All-day events start at local midnight of their date, in the event's own
/// `timeZone` when it has one and in `calendar_time_zone` otherwise.
pub fn decode_calendar_event(
    event: &GoogleCalendarEvent,
    calendar_time_zone: Tz,
) -> Result<Option<CalendarEvent>, InfraError> {
    let is_cancelled = event
        .status
        .as_deref()
        .map(|status| status.eq_ignore_ascii_case(STATUS_CANCELLED))
        .unwrap_or(false);
    if is_cancelled {
        return Ok(None);
    }
    let Some(id) = event
        .id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
    else {
        return Ok(None);
    };

    let start_time = parse_event_time(&event.start, "start", calendar_time_zone)?.ok_or_else(|| {
        InfraError::Calendar(format!("calendar event {id} has no start time"))
    })?;
    let end_time = parse_event_time(&event.end, "end", calendar_time_zone)?;

    Ok(Some(CalendarEvent {
        id,
        title: event.summary.clone(),
        start_time,
        end_time,
        link: event.html_link.clone(),
    }))
}

fn local_date_time(value: NaiveDateTime, time_zone: &str) -> CalendarEventDateTime {
    CalendarEventDateTime {
        date_time: Some(value.format(LOCAL_DATE_TIME_FORMAT).to_string()),
        date: None,
        time_zone: Some(time_zone.to_string()),
    }
}

fn encode_reminders(policy: &ReminderPolicy) -> CalendarEventReminders {
    CalendarEventReminders {
        use_default: policy.use_default,
        overrides: policy
            .overrides
            .iter()
            .map(|reminder| CalendarReminderOverride {
                method: reminder.method.as_str().to_string(),
                minutes: reminder.minutes_before,
            })
            .collect(),
    }
}

fn parse_event_time(
    value: &CalendarEventDateTime,
    field_name: &str,
    calendar_time_zone: Tz,
) -> Result<Option<DateTime<Utc>>, InfraError> {
    if let Some(date_time) = value.date_time.as_deref() {
        return DateTime::parse_from_rfc3339(date_time)
            .map(|parsed| Some(parsed.with_timezone(&Utc)))
            .map_err(|error| {
                InfraError::Calendar(format!(
                    "invalid calendar event {field_name}.dateTime '{date_time}': {error}"
                ))
            });
    }
    if let Some(date) = value.date.as_deref() {
        let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|error| {
            InfraError::Calendar(format!(
                "invalid calendar event {field_name}.date '{date}': {error}"
            ))
        })?;
        let time_zone = value
            .time_zone
            .as_deref()
            .and_then(|name| name.trim().parse::<Tz>().ok())
            .unwrap_or(calendar_time_zone);
        return time_zone
            .from_local_datetime(&parsed.and_time(NaiveTime::MIN))
            .earliest()
            .map(|midnight| Some(midnight.with_timezone(&Utc)))
            .ok_or_else(|| {
                InfraError::Calendar(format!(
                    "calendar event {field_name}.date '{date}' has no midnight in {time_zone}"
                ))
            });
    }
    Ok(None)
}
