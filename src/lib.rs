pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

use application::calendar_gateway::CalendarGateway;
use application::commands::{
    list_projects_impl, plan_day_impl, project_events_impl, schedule_day_impl, AppState,
    CommandError, ProjectEventResponse, ScheduleDayResponse,
};
use application::workday::{SubmissionMode, WorkdayService};
use cli::{Cli, Command};
use infrastructure::config::read_access_token;
use infrastructure::google_calendar_client::ReqwestGoogleCalendarClient;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

pub use domain::models::{CalendarEvent, ConfigurationError, WorkBlock, WorkBlockConfig};
pub use domain::filter::filter_by_project;
pub use domain::scheduler::generate_blocks;

type GoogleWorkdayService = WorkdayService<CalendarGateway<ReqwestGoogleCalendarClient>>;

pub async fn run(cli: Cli) -> Result<(), String> {
    let workspace_root = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };
    let state = AppState::new(workspace_root).map_err(|error| error.to_string())?;
    info!(workspace = %state.workspace_root().display(), "workspace ready");

    match cli.command {
        Command::Schedule {
            date,
            project,
            sequential,
            concurrency,
            dry_run,
        } => {
            let result = if dry_run {
                plan_day_impl(&state, date, project)
            } else {
                let mode = if sequential {
                    SubmissionMode::Sequential
                } else {
                    SubmissionMode::Concurrent { limit: concurrency }
                };
                schedule_with_google(&state, mode, date, project).await
            };
            let response = result.map_err(|error| state.command_error("schedule", &error))?;
            print_output(cli.json, &response, print_schedule)
        }
        Command::Events { project, from, to } => {
            let result = events_from_google(&state, project, from, to).await;
            let events = result.map_err(|error| state.command_error("events", &error))?;
            print_output(cli.json, &events, |events| print_events(events))
        }
        Command::Projects => {
            let projects = list_projects_impl(&state);
            print_output(cli.json, &projects, |projects| {
                for project in projects {
                    println!("{:<6} {}", project.code, project.description);
                }
            })
        }
    }
}

fn google_service(
    state: &AppState,
    mode: SubmissionMode,
) -> Result<(GoogleWorkdayService, String), CommandError> {
    let access_token = read_access_token()?;
    let client = Arc::new(ReqwestGoogleCalendarClient::new());
    let gateway = CalendarGateway::from_config(client, &state.config().calendar)?;
    let service = WorkdayService::new(Arc::new(gateway)).with_submission_mode(mode);
    Ok((service, access_token))
}

async fn schedule_with_google(
    state: &AppState,
    mode: SubmissionMode,
    date: Option<String>,
    project: Option<String>,
) -> Result<ScheduleDayResponse, CommandError> {
    let (service, access_token) = google_service(state, mode)?;
    schedule_day_impl(state, &service, &access_token, date, project).await
}

async fn events_from_google(
    state: &AppState,
    project: String,
    from: Option<String>,
    to: Option<String>,
) -> Result<Vec<ProjectEventResponse>, CommandError> {
    let (service, access_token) = google_service(state, SubmissionMode::default())?;
    project_events_impl(state, &service, &access_token, project, from, to).await
}

fn print_output<T, F>(json: bool, value: &T, human: F) -> Result<(), String>
where
    T: Serialize,
    F: FnOnce(&T),
{
    if json {
        let rendered = serde_json::to_string_pretty(value).map_err(|error| error.to_string())?;
        println!("{rendered}");
    } else {
        human(value);
    }
    Ok(())
}

fn print_schedule(response: &ScheduleDayResponse) {
    println!("Work blocks for {}:", response.date);
    for block in &response.blocks {
        let status = match (&block.event_id, &block.error) {
            (_, Some(error)) => format!("failed: {error}"),
            (Some(event_id), None) => format!("created {event_id}"),
            (None, None) => "planned".to_string(),
        };
        println!(
            "  {} - {}  {}  ({status})",
            block.start_time, block.end_time, block.title
        );
    }
    if !response.dry_run {
        println!(
            "Created {} events, {} failed",
            response.events_created, response.events_failed
        );
    }
}

fn print_events(events: &[ProjectEventResponse]) {
    if events.is_empty() {
        println!("No matching events.");
        return;
    }
    for event in events {
        println!("  {}  {}", event.start_time, event.title);
        if let Some(link) = &event.link {
            println!("      {link}");
        }
    }
}
