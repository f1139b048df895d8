use crate::application::bootstrap::{bootstrap_workspace, BootstrapResult};
use crate::application::calendar_gateway::{EventSink, EventSource};
use crate::application::workday::{local_day_range, ScheduleReport, WorkdayError, WorkdayService};
use crate::domain::models::WorkBlock;
use crate::domain::scheduler::generate_blocks;
use crate::infrastructure::activity_log::ActivityLog;
use crate::infrastructure::config::AgentConfig;
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Workday(#[from] WorkdayError),
}

pub struct AppState {
    workspace: BootstrapResult,
    activity_log: ActivityLog,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let workspace = bootstrap_workspace(&workspace_root)?;
        let activity_log = ActivityLog::new(&workspace.logs_dir);
        Ok(Self {
            workspace,
            activity_log,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.workspace.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace.workspace_root
    }

    pub fn time_zone(&self) -> Result<Tz, InfraError> {
        self.workspace.config.time_zone()
    }

    pub fn today(&self) -> Result<NaiveDate, InfraError> {
        Ok(Utc::now().with_timezone(&self.time_zone()?).date_naive())
    }

    pub fn command_error(&self, command: &str, error: &CommandError) -> String {
        self.activity_log.error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.activity_log.info(command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.activity_log.error(command, message);
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScheduledBlockResponse {
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    pub event_id: Option<String>,
    pub html_link: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScheduleDayResponse {
    pub date: String,
    pub dry_run: bool,
    pub events_created: usize,
    pub events_failed: usize,
    pub blocks: Vec<ScheduledBlockResponse>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProjectEventResponse {
    pub id: String,
    pub title: String,
    pub start_time: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProjectResponse {
    pub code: String,
    pub description: String,
}

/// Computes the day's blocks without contacting the calendar.
pub fn plan_day_impl(
    state: &AppState,
    date: Option<String>,
    project_code: Option<String>,
) -> Result<ScheduleDayResponse, CommandError> {
    let date = resolve_schedule_date(date.as_deref(), state.today()?)?;
    let project_code = checked_project_code(state, project_code)?;
    let config = state.config().work_block_config(project_code.as_deref());
    let blocks = generate_blocks(date, &config).map_err(WorkdayError::from)?;

    state.log_info(
        "plan_day",
        &format!("planned {} blocks for {}", blocks.len(), date),
    );
    Ok(ScheduleDayResponse {
        date: date.to_string(),
        dry_run: true,
        events_created: 0,
        events_failed: 0,
        blocks: blocks.iter().map(planned_block_response).collect(),
    })
}

pub async fn schedule_day_impl<G>(
    state: &AppState,
    service: &WorkdayService<G>,
    access_token: &str,
    date: Option<String>,
    project_code: Option<String>,
) -> Result<ScheduleDayResponse, CommandError>
where
    G: EventSink + EventSource + 'static,
{
    let date = resolve_schedule_date(date.as_deref(), state.today()?)?;
    let project_code = checked_project_code(state, project_code)?;
    let config = state.config().work_block_config(project_code.as_deref());
    let report = service.schedule_day(access_token, date, &config).await?;

    state.log_info(
        "schedule_day",
        &format!(
            "created {} of {} blocks for {}",
            report.created(),
            report.submissions.len(),
            date
        ),
    );
    for submission in &report.submissions {
        match &submission.outcome {
            Ok(handle) => state.log_info(
                "schedule_day",
                &format!(
                    "created event {}: {} ({} - {})",
                    handle.id,
                    submission.block.title,
                    submission.block.start_time,
                    submission.block.end_time
                ),
            ),
            Err(error) => state.log_error("schedule_day", &error.to_string()),
        }
    }
    Ok(schedule_response(&report))
}

pub async fn project_events_impl<G>(
    state: &AppState,
    service: &WorkdayService<G>,
    access_token: &str,
    project_code: String,
    from: Option<String>,
    to: Option<String>,
) -> Result<Vec<ProjectEventResponse>, CommandError>
where
    G: EventSink + EventSource + 'static,
{
    let project_code = project_code.trim().to_string();
    state.config().require_known_project(&project_code)?;
    let (range_start, range_end) = resolve_event_window(
        from.as_deref(),
        to.as_deref(),
        state.time_zone()?,
        state.today()?,
    )?;

    let events = service
        .project_events(access_token, &project_code, range_start, range_end)
        .await?;
    state.log_info(
        "project_events",
        &format!(
            "found {} {} events between {} and {}",
            events.len(),
            project_code,
            range_start.to_rfc3339(),
            range_end.to_rfc3339()
        ),
    );

    Ok(events
        .into_iter()
        .map(|event| ProjectEventResponse {
            id: event.id,
            title: event.title.unwrap_or_default(),
            start_time: event.start_time.to_rfc3339(),
            link: event.link,
        })
        .collect())
}

pub fn list_projects_impl(state: &AppState) -> Vec<ProjectResponse> {
    state
        .config()
        .projects
        .iter()
        .map(|(code, description)| ProjectResponse {
            code: code.clone(),
            description: description.clone(),
        })
        .collect()
}

fn checked_project_code(state: &AppState, project_code: Option<String>) -> Result<Option<String>, InfraError> {
    let Some(code) = project_code
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    else {
        return Ok(None);
    };
    state.config().require_known_project(&code)?;
    Ok(Some(code))
}

/// Parses `YYYY-MM-DD`, defaulting to the day after `today`.
pub fn resolve_schedule_date(date: Option<&str>, today: NaiveDate) -> Result<NaiveDate, InfraError> {
    match date.map(str::trim).filter(|value| !value.is_empty()) {
        Some(raw) => parse_date_input(raw, "date"),
        None => today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| InfraError::InvalidConfig("tomorrow is out of range".to_string())),
    }
}

/// `[from, to)` as UTC instants. Dates are local days in `time_zone`; `to`
/// defaults to the end of the `from` day, `from` defaults to `today`.
pub fn resolve_event_window(
    from: Option<&str>,
    to: Option<&str>,
    time_zone: Tz,
    today: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), InfraError> {
    let (start, default_end) = match from {
        Some(raw) => match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(parsed) => {
                let start = parsed.with_timezone(&Utc);
                (start, start + chrono::Duration::days(1))
            }
            Err(_) => local_day_range(parse_date_input(raw, "from")?, time_zone)?,
        },
        None => local_day_range(today, time_zone)?,
    };

    let end = match to {
        Some(raw) => match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            // A bare `to` date is inclusive: the window runs to its end.
            Err(_) => local_day_range(parse_date_input(raw, "to")?, time_zone)?.1,
        },
        None => default_end,
    };

    if end <= start {
        return Err(InfraError::InvalidConfig(
            "to must be later than from".to_string(),
        ));
    }
    Ok((start, end))
}

fn parse_date_input(value: &str, field_name: &str) -> Result<NaiveDate, InfraError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|error| {
        InfraError::InvalidConfig(format!("{field_name} must be YYYY-MM-DD: {error}"))
    })
}

fn planned_block_response(block: &WorkBlock) -> ScheduledBlockResponse {
    ScheduledBlockResponse {
        title: block.title.clone(),
        start_time: block.start_time.to_string(),
        end_time: block.end_time.to_string(),
        event_id: None,
        html_link: None,
        error: None,
    }
}

fn schedule_response(report: &ScheduleReport) -> ScheduleDayResponse {
    let blocks = report
        .submissions
        .iter()
        .map(|submission| {
            let mut response = planned_block_response(&submission.block);
            match &submission.outcome {
                Ok(handle) => {
                    response.event_id = Some(handle.id.clone());
                    response.html_link = handle.html_link.clone();
                }
                Err(error) => response.error = Some(error.source.to_string()),
            }
            response
        })
        .collect();

    ScheduleDayResponse {
        date: report.date.to_string(),
        dry_run: false,
        events_created: report.created(),
        events_failed: report.failed(),
        blocks,
    }
}
