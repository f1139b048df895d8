use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Schedules focus blocks on Google Calendar and lists project-tagged events.
#[derive(Parser, Debug)]
#[command(name = "workblock")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Workspace holding `config/` and `logs/` (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Print command output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit diagnostics as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the day's focus blocks and create one calendar event per block
    Schedule {
        /// Day to schedule as YYYY-MM-DD (default: tomorrow)
        #[arg(short, long)]
        date: Option<String>,
        /// Project code used to tag block titles, e.g. MAIN
        #[arg(short, long)]
        project: Option<String>,
        /// Create events one at a time instead of concurrently
        #[arg(long)]
        sequential: bool,
        /// Maximum concurrent event creations
        #[arg(long, default_value = "4")]
        concurrency: usize,
        /// Print the planned blocks without contacting the calendar
        #[arg(long)]
        dry_run: bool,
    },
    /// List calendar events tagged with a project code
    Events {
        /// Project code to match, e.g. MAIN
        #[arg(short, long)]
        project: String,
        /// Window start as YYYY-MM-DD or RFC 3339 (default: today)
        #[arg(long)]
        from: Option<String>,
        /// Window end as YYYY-MM-DD (inclusive day) or RFC 3339
        #[arg(long)]
        to: Option<String>,
    },
    /// List the configured project codes
    Projects,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_flags_parse() {
        let cli = Cli::try_parse_from([
            "workblock",
            "--workspace",
            "/tmp/ws",
            "schedule",
            "--date",
            "2025-03-15",
            "--project",
            "MAIN",
            "--dry-run",
        ])
        .expect("valid arguments");

        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/ws")));
        match cli.command {
            Command::Schedule {
                date,
                project,
                sequential,
                concurrency,
                dry_run,
            } => {
                assert_eq!(date.as_deref(), Some("2025-03-15"));
                assert_eq!(project.as_deref(), Some("MAIN"));
                assert!(!sequential);
                assert_eq!(concurrency, 4);
                assert!(dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn events_requires_project() {
        assert!(Cli::try_parse_from(["workblock", "events"]).is_err());
        let cli = Cli::try_parse_from([
            "workblock",
            "--json",
            "events",
            "--project",
            "SIDE",
            "--from",
            "2025-03-15",
        ])
            .expect("valid arguments");
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Events { ref project, .. } if project == "SIDE"));
    }
}
