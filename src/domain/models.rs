use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_START_HOUR: u32 = 10;
pub const DEFAULT_END_HOUR: u32 = 18;
pub const DEFAULT_BLOCK_DURATION_MINUTES: i64 = 45;
pub const DEFAULT_BREAK_DURATION_MINUTES: i64 = 15;
pub const DEFAULT_LUNCH_START_HOUR: u32 = 12;
pub const DEFAULT_LUNCH_END_HOUR: u32 = 13;
const MAX_HOUR: u32 = 24;
/// Longest block or break: one full day.
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid work block configuration: {0}")]
pub struct ConfigurationError(pub String);

/// Caller-supplied scheduling options. Every field is optional; unset fields
/// fall back to the defaults when the config is resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkBlockConfig {
    pub start_hour: Option<u32>,
    pub end_hour: Option<u32>,
    pub block_duration_minutes: Option<i64>,
    pub break_duration_minutes: Option<i64>,
    pub lunch_start_hour: Option<u32>,
    pub lunch_end_hour: Option<u32>,
    pub project_code: Option<String>,
}

impl WorkBlockConfig {
    pub fn with_project_code(mut self, project_code: impl Into<String>) -> Self {
        self.project_code = Some(project_code.into());
        self
    }

    /// Merges defaults into every unset field and validates the result.
    pub fn resolve(&self) -> Result<WorkBlockSettings, ConfigurationError> {
        let settings = WorkBlockSettings {
            start_hour: self.start_hour.unwrap_or(DEFAULT_START_HOUR),
            end_hour: self.end_hour.unwrap_or(DEFAULT_END_HOUR),
            block_duration_minutes: self
                .block_duration_minutes
                .unwrap_or(DEFAULT_BLOCK_DURATION_MINUTES),
            break_duration_minutes: self
                .break_duration_minutes
                .unwrap_or(DEFAULT_BREAK_DURATION_MINUTES),
            lunch_start_hour: self.lunch_start_hour.unwrap_or(DEFAULT_LUNCH_START_HOUR),
            lunch_end_hour: self.lunch_end_hour.unwrap_or(DEFAULT_LUNCH_END_HOUR),
            project_code: self
                .project_code
                .as_deref()
                .map(str::trim)
                .map(ToOwned::to_owned),
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Fully populated, validated scheduling options. Only obtainable through
/// [`WorkBlockConfig::resolve`], so durations are always within
/// `1..=MAX_DURATION_MINUTES`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkBlockSettings {
    start_hour: u32,
    end_hour: u32,
    block_duration_minutes: i64,
    break_duration_minutes: i64,
    lunch_start_hour: u32,
    lunch_end_hour: u32,
    project_code: Option<String>,
}

impl WorkBlockSettings {
    fn validate(&self) -> Result<(), ConfigurationError> {
        validate_duration(self.block_duration_minutes, "blockDurationMinutes")?;
        validate_duration(self.break_duration_minutes, "breakDurationMinutes")?;
        validate_hour(self.start_hour, "startHour")?;
        validate_hour(self.end_hour, "endHour")?;
        validate_hour(self.lunch_start_hour, "lunchStartHour")?;
        validate_hour(self.lunch_end_hour, "lunchEndHour")?;
        if let Some(code) = self.project_code.as_deref() {
            crate::domain::project_tag::validate_project_code(code)?;
        }
        Ok(())
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    pub fn block_duration(&self) -> Duration {
        Duration::minutes(self.block_duration_minutes)
    }

    pub fn block_duration_minutes(&self) -> i64 {
        self.block_duration_minutes
    }

    pub fn break_duration(&self) -> Duration {
        Duration::minutes(self.break_duration_minutes)
    }

    pub fn lunch_start_hour(&self) -> u32 {
        self.lunch_start_hour
    }

    pub fn lunch_end_hour(&self) -> u32 {
        self.lunch_end_hour
    }

    pub fn project_code(&self) -> Option<&str> {
        self.project_code.as_deref()
    }
}

/// One scheduled focus session in local wall-clock time on the target day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkBlock {
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub description: String,
}

impl WorkBlock {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start_time < end && start < self.end_time
    }
}

/// A calendar event as read back from the calendar collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventHandle {
    pub id: String,
    pub html_link: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderMethod {
    Popup,
    Email,
}

impl ReminderMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderMethod::Popup => "popup",
            ReminderMethod::Email => "email",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderOverride {
    pub method: ReminderMethod,
    pub minutes_before: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPolicy {
    pub use_default: bool,
    #[serde(default)]
    pub overrides: Vec<ReminderOverride>,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            use_default: false,
            overrides: vec![ReminderOverride {
                method: ReminderMethod::Popup,
                minutes_before: 10,
            }],
        }
    }
}

/// Local wall-clock instant `hour` hours after midnight of `date`.
/// `hour == 24` lands on the following midnight.
pub fn at_hour(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour))
}

fn validate_duration(value: i64, field_name: &str) -> Result<(), ConfigurationError> {
    if value <= 0 {
        return Err(ConfigurationError(format!("{field_name} must be > 0")));
    }
    if value > MAX_DURATION_MINUTES {
        return Err(ConfigurationError(format!(
            "{field_name} must be at most {MAX_DURATION_MINUTES} minutes"
        )));
    }
    Ok(())
}

fn validate_hour(value: u32, field_name: &str) -> Result<(), ConfigurationError> {
    if value > MAX_HOUR {
        return Err(ConfigurationError(format!(
            "{field_name} must be between 0 and {MAX_HOUR}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_durations_longer_than_a_day() {
        let huge_block = WorkBlockConfig {
            block_duration_minutes: Some(1_000_000_000_000),
            ..WorkBlockConfig::default()
        };
        let huge_break = WorkBlockConfig {
            break_duration_minutes: Some(i64::MAX),
            ..WorkBlockConfig::default()
        };
        let full_day = WorkBlockConfig {
            block_duration_minutes: Some(MAX_DURATION_MINUTES),
            break_duration_minutes: Some(MAX_DURATION_MINUTES),
            ..WorkBlockConfig::default()
        };

        assert!(huge_block.resolve().is_err());
        assert!(huge_break.resolve().is_err());
        assert!(full_day.resolve().is_ok());
    }

    #[test]
    fn resolve_fills_every_default() {
        let settings = WorkBlockConfig::default().resolve().expect("defaults are valid");

        assert_eq!(settings.start_hour(), 10);
        assert_eq!(settings.end_hour(), 18);
        assert_eq!(settings.block_duration_minutes(), 45);
        assert_eq!(settings.break_duration(), Duration::minutes(15));
        assert_eq!(settings.lunch_start_hour(), 12);
        assert_eq!(settings.lunch_end_hour(), 13);
        assert_eq!(settings.project_code(), None);
    }

    #[test]
    fn resolve_keeps_explicit_values() {
        let config = WorkBlockConfig {
            start_hour: Some(8),
            block_duration_minutes: Some(50),
            ..WorkBlockConfig::default()
        }
        .with_project_code(" SIDE ");

        let settings = config.resolve().expect("valid config");
        assert_eq!(settings.start_hour(), 8);
        assert_eq!(settings.end_hour(), 18);
        assert_eq!(settings.block_duration_minutes(), 50);
        assert_eq!(settings.project_code(), Some("SIDE"));
    }

    #[test]
    fn resolve_rejects_non_positive_durations() {
        let zero_block = WorkBlockConfig {
            block_duration_minutes: Some(0),
            ..WorkBlockConfig::default()
        };
        let negative_break = WorkBlockConfig {
            break_duration_minutes: Some(-5),
            ..WorkBlockConfig::default()
        };

        assert!(zero_block.resolve().is_err());
        assert!(negative_break.resolve().is_err());
    }

    #[test]
    fn resolve_rejects_hours_past_midnight() {
        let config = WorkBlockConfig {
            end_hour: Some(25),
            ..WorkBlockConfig::default()
        };
        let error = config.resolve().expect_err("hour out of range");
        assert!(error.to_string().contains("endHour"));
    }

    #[test]
    fn config_deserializes_from_partial_camel_case_json() {
        let config: WorkBlockConfig =
            serde_json::from_str(r#"{"startHour": 9, "projectCode": "PORT"}"#)
                .expect("deserialize config");

        assert_eq!(config.start_hour, Some(9));
        assert_eq!(config.end_hour, None);
        assert_eq!(config.project_code.as_deref(), Some("PORT"));
    }

    #[test]
    fn at_hour_twenty_four_rolls_to_next_midnight() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 15).expect("valid date");
        let next = NaiveDate::from_ymd_opt(2025, 3, 16).expect("valid date");
        assert_eq!(at_hour(date, 24), next.and_time(NaiveTime::MIN));
    }

    #[test]
    fn default_reminder_policy_is_a_ten_minute_popup() {
        let policy = ReminderPolicy::default();
        assert!(!policy.use_default);
        assert_eq!(
            policy.overrides,
            vec![ReminderOverride {
                method: ReminderMethod::Popup,
                minutes_before: 10,
            }]
        );
    }
}
