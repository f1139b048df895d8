use crate::domain::models::{
    ReminderPolicy, WorkBlockConfig, DEFAULT_BLOCK_DURATION_MINUTES,
    DEFAULT_BREAK_DURATION_MINUTES, DEFAULT_END_HOUR, DEFAULT_LUNCH_END_HOUR,
    DEFAULT_LUNCH_START_HOUR, DEFAULT_START_HOUR,
};
use crate::domain::project_tag::validate_project_code;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_JSON: &str = "workblock.json";
const SUPPORTED_SCHEMA: u64 = 1;
const DEFAULT_CALENDAR_ID: &str = "primary";
const DEFAULT_TIME_ZONE: &str = "UTC";
const DEFAULT_MAX_RESULTS: u32 = 100;
const ACCESS_TOKEN_KEYS: &[&str] = &["WORKBLOCK_ACCESS_TOKEN", "GOOGLE_ACCESS_TOKEN"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkHoursSection {
    pub start: u32,
    pub end: u32,
    pub lunch_start: u32,
    pub lunch_end: u32,
}

impl Default for WorkHoursSection {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_HOUR,
            end: DEFAULT_END_HOUR,
            lunch_start: DEFAULT_LUNCH_START_HOUR,
            lunch_end: DEFAULT_LUNCH_END_HOUR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeBlocksSection {
    pub work_duration: i64,
    pub break_duration: i64,
}

impl Default for TimeBlocksSection {
    fn default() -> Self {
        Self {
            work_duration: DEFAULT_BLOCK_DURATION_MINUTES,
            break_duration: DEFAULT_BREAK_DURATION_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarSection {
    pub calendar_id: String,
    pub time_zone: String,
    pub max_results: u32,
    pub reminders: ReminderPolicy,
}

impl Default for CalendarSection {
    fn default() -> Self {
        Self {
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            reminders: ReminderPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub schema: u8,
    #[serde(default)]
    pub work_hours: WorkHoursSection,
    #[serde(default)]
    pub time_blocks: TimeBlocksSection,
    #[serde(default = "default_projects")]
    pub projects: BTreeMap<String, String>,
    #[serde(default)]
    pub calendar: CalendarSection,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            schema: SUPPORTED_SCHEMA as u8,
            work_hours: WorkHoursSection::default(),
            time_blocks: TimeBlocksSection::default(),
            projects: default_projects(),
            calendar: CalendarSection::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), InfraError> {
        self.time_zone()?;
        self.work_block_config(None)
            .resolve()
            .map_err(|error| InfraError::InvalidConfig(error.to_string()))?;
        for code in self.projects.keys() {
            validate_project_code(code)
                .map_err(|error| InfraError::InvalidConfig(error.to_string()))?;
        }
        if self.calendar.calendar_id.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "calendar.calendarId must not be empty".to_string(),
            ));
        }
        if self.calendar.max_results == 0 {
            return Err(InfraError::InvalidConfig(
                "calendar.maxResults must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn time_zone(&self) -> Result<Tz, InfraError> {
        self.calendar.time_zone.trim().parse::<Tz>().map_err(|error| {
            InfraError::InvalidConfig(format!(
                "unknown calendar.timeZone '{}': {error}",
                self.calendar.time_zone
            ))
        })
    }

    /// Scheduling options for one day, tagged with `project_code` when given.
    pub fn work_block_config(&self, project_code: Option<&str>) -> WorkBlockConfig {
        WorkBlockConfig {
            start_hour: Some(self.work_hours.start),
            end_hour: Some(self.work_hours.end),
            block_duration_minutes: Some(self.time_blocks.work_duration),
            break_duration_minutes: Some(self.time_blocks.break_duration),
            lunch_start_hour: Some(self.work_hours.lunch_start),
            lunch_end_hour: Some(self.work_hours.lunch_end),
            project_code: project_code.map(ToOwned::to_owned),
        }
    }

    pub fn require_known_project(&self, project_code: &str) -> Result<(), InfraError> {
        if self.projects.contains_key(project_code) {
            return Ok(());
        }
        let known = self.projects.keys().cloned().collect::<Vec<_>>().join(", ");
        Err(InfraError::InvalidConfig(format!(
            "unknown project code '{project_code}' (configured: {known})"
        )))
    }
}

fn default_projects() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("MAIN".to_string(), "Main job tasks".to_string()),
        ("SIDE".to_string(), "Side job projects".to_string()),
        ("PORT".to_string(), "Portfolio preparation".to_string()),
        ("FAM".to_string(), "Family activities".to_string()),
    ])
}

pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_JSON)
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_path(config_dir);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AgentConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

pub fn load_config(config_dir: &Path) -> Result<AgentConfig, InfraError> {
    let path = config_path(config_dir);
    let raw = fs::read_to_string(&path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }

    let config: AgentConfig = serde_json::from_value(parsed)?;
    config.validate()?;
    Ok(config)
}

pub fn read_access_token() -> Result<String, InfraError> {
    read_access_token_from_lookup(|key| std::env::var(key).ok())
}

pub fn read_access_token_from_lookup<F>(lookup: F) -> Result<String, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    ACCESS_TOKEN_KEYS
        .iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .ok_or_else(|| {
            InfraError::InvalidConfig(format!(
                "missing calendar access token (set one of: {})",
                ACCESS_TOKEN_KEYS.join(", ")
            ))
        })
}
