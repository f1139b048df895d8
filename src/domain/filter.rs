use crate::domain::models::CalendarEvent;
use crate::domain::project_tag::has_tag;
use chrono::{DateTime, Utc};

/// Keeps the events tagged `[project_code]` that start inside
/// `[range_start, range_end)`, in their original order.
pub fn filter_by_project(
    events: &[CalendarEvent],
    project_code: &str,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Vec<CalendarEvent> {
    events
        .iter()
        .filter(|event| event.start_time >= range_start && event.start_time < range_end)
        .filter(|event| {
            event
                .title
                .as_deref()
                .filter(|title| !title.trim().is_empty())
                .is_some_and(|title| has_tag(title, project_code))
        })
        .cloned()
        .collect()
}
