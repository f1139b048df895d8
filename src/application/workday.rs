use crate::application::calendar_gateway::{EventSink, EventSource};
use crate::domain::filter::filter_by_project;
use crate::domain::models::{CalendarEvent, ConfigurationError, EventHandle, WorkBlock, WorkBlockConfig};
use crate::domain::scheduler::generate_blocks;
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{info, warn};

const DEFAULT_SUBMISSION_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum WorkdayError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("failed to retrieve calendar events: {0}")]
    Retrieval(#[source] InfraError),
}

/// Failure to create the calendar event for one block.
#[derive(Debug, Error)]
#[error("failed to submit block #{index} starting {start_time}: {source}")]
pub struct SubmissionError {
    pub index: usize,
    pub start_time: NaiveDateTime,
    #[source]
    pub source: InfraError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    /// One block at a time, in chronological order.
    Sequential,
    /// Up to `limit` submissions in flight; results are still reported per block.
    Concurrent { limit: usize },
}

impl Default for SubmissionMode {
    fn default() -> Self {
        SubmissionMode::Concurrent {
            limit: DEFAULT_SUBMISSION_CONCURRENCY,
        }
    }
}

#[derive(Debug)]
pub struct BlockSubmission {
    pub index: usize,
    pub block: WorkBlock,
    pub outcome: Result<EventHandle, SubmissionError>,
}

#[derive(Debug)]
pub struct ScheduleReport {
    pub date: NaiveDate,
    pub submissions: Vec<BlockSubmission>,
}

impl ScheduleReport {
    pub fn created(&self) -> usize {
        self.submissions
            .iter()
            .filter(|submission| submission.outcome.is_ok())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.submissions.len() - self.created()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SubmissionError> {
        self.submissions
            .iter()
            .filter_map(|submission| submission.outcome.as_ref().err())
    }
}

pub struct WorkdayService<G>
where
    G: EventSink + EventSource + 'static,
{
    gateway: Arc<G>,
    submission_mode: SubmissionMode,
}

impl<G> WorkdayService<G>
where
    G: EventSink + EventSource + 'static,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            submission_mode: SubmissionMode::default(),
        }
    }

    pub fn with_submission_mode(mut self, submission_mode: SubmissionMode) -> Self {
        self.submission_mode = submission_mode;
        self
    }

    /// Computes the blocks for `date` without touching the calendar.
    pub fn plan_day(&self, date: NaiveDate, config: &WorkBlockConfig) -> Result<Vec<WorkBlock>, WorkdayError> {
        Ok(generate_blocks(date, config)?)
    }

    /// Generates the day's blocks and submits one event per block. Individual
    /// submission failures are reported in the result, never as an `Err`.
    pub async fn schedule_day(
        &self,
        access_token: &str,
        date: NaiveDate,
        config: &WorkBlockConfig,
    ) -> Result<ScheduleReport, WorkdayError> {
        let started_at = Instant::now();
        let blocks = self.plan_day(date, config)?;
        let submissions = self.submit_blocks(access_token, blocks).await;
        let report = ScheduleReport { date, submissions };

        info!(
            %date,
            created = report.created(),
            failed = report.failed(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "scheduled work blocks"
        );
        Ok(report)
    }

    pub async fn submit_blocks(&self, access_token: &str, blocks: Vec<WorkBlock>) -> Vec<BlockSubmission> {
        match self.submission_mode {
            SubmissionMode::Sequential => self.submit_sequentially(access_token, blocks).await,
            SubmissionMode::Concurrent { limit } => {
                self.submit_concurrently(access_token, blocks, limit.max(1)).await
            }
        }
    }

    /// Retrieves the events of `[range_start, range_end)` and keeps the ones
    /// tagged with `project_code`.
    pub async fn project_events(
        &self,
        access_token: &str,
        project_code: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, WorkdayError> {
        let events = self
            .gateway
            .fetch_events(access_token, range_start, range_end)
            .await
            .map_err(WorkdayError::Retrieval)?;
        let filtered = filter_by_project(&events, project_code, range_start, range_end);
        info!(
            project_code,
            retrieved = events.len(),
            matched = filtered.len(),
            "filtered project events"
        );
        Ok(filtered)
    }

    async fn submit_sequentially(&self, access_token: &str, blocks: Vec<WorkBlock>) -> Vec<BlockSubmission> {
        let mut submissions = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.into_iter().enumerate() {
            let outcome = self
                .gateway
                .submit_block(access_token, &block)
                .await
                .map_err(|source| submission_error(index, &block, source));
            submissions.push(BlockSubmission {
                index,
                block,
                outcome,
            });
        }
        submissions
    }

    async fn submit_concurrently(
        &self,
        access_token: &str,
        blocks: Vec<WorkBlock>,
        limit: usize,
    ) -> Vec<BlockSubmission> {
        let mut create_tasks: JoinSet<(usize, Result<EventHandle, InfraError>)> = JoinSet::new();
        let mut outcomes: Vec<Option<Result<EventHandle, InfraError>>> =
            (0..blocks.len()).map(|_| None).collect();

        for (index, block) in blocks.iter().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            let access_token = access_token.to_string();
            let block = block.clone();

            create_tasks.spawn(async move {
                let outcome = gateway.submit_block(&access_token, &block).await;
                (index, outcome)
            });

            if create_tasks.len() >= limit {
                collect_outcome(&mut create_tasks, &mut outcomes).await;
            }
        }

        while !create_tasks.is_empty() {
            collect_outcome(&mut create_tasks, &mut outcomes).await;
        }

        blocks
            .into_iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (block, outcome))| {
                let outcome = outcome
                    .unwrap_or_else(|| {
                        Err(InfraError::Calendar(
                            "submission task ended without a result".to_string(),
                        ))
                    })
                    .map_err(|source| submission_error(index, &block, source));
                BlockSubmission {
                    index,
                    block,
                    outcome,
                }
            })
            .collect()
    }
}

async fn collect_outcome(
    create_tasks: &mut JoinSet<(usize, Result<EventHandle, InfraError>)>,
    outcomes: &mut [Option<Result<EventHandle, InfraError>>],
) {
    let Some(join_result) = create_tasks.join_next().await else {
        return;
    };
    match join_result {
        Ok((index, outcome)) => {
            if let Some(slot) = outcomes.get_mut(index) {
                *slot = Some(outcome);
            }
        }
        // The slot stays empty and is reported as failed for its block.
        Err(error) => warn!(%error, "calendar submission task failed to join"),
    }
}

fn submission_error(index: usize, block: &WorkBlock, source: InfraError) -> SubmissionError {
    warn!(index, start = %block.start_time, %source, "block submission failed");
    SubmissionError {
        index,
        start_time: block.start_time,
        source,
    }
}

/// The UTC instants bounding the local calendar day `date` in `time_zone`.
pub fn local_day_range(date: NaiveDate, time_zone: Tz) -> Result<(DateTime<Utc>, DateTime<Utc>), InfraError> {
    let next = date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| InfraError::InvalidConfig(format!("date {date} is out of range")))?;
    Ok((local_midnight(date, time_zone)?, local_midnight(next, time_zone)?))
}

pub fn local_midnight(date: NaiveDate, time_zone: Tz) -> Result<DateTime<Utc>, InfraError> {
    time_zone
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|value| value.with_timezone(&Utc))
        .ok_or_else(|| {
            InfraError::InvalidConfig(format!("midnight of {date} does not exist in {time_zone}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration as StdDuration;

    #[derive(Debug, Default)]
    struct FakeCalendar {
        failing_starts: HashSet<NaiveDateTime>,
        listed: Vec<CalendarEvent>,
        fail_listing: bool,
        submitted: Mutex<Vec<NaiveDateTime>>,
        submit_calls: AtomicUsize,
    }

    #[async_trait]
    impl EventSink for FakeCalendar {
        async fn submit_block(&self, _access_token: &str, block: &WorkBlock) -> Result<EventHandle, InfraError> {
            let call = self.submit_calls.fetch_add(1, Ordering::SeqCst);
            // Early blocks finish last so completion order differs from submission order.
            tokio::time::sleep(StdDuration::from_millis(20u64.saturating_sub(call as u64 * 2))).await;
            self.submitted
                .lock()
                .expect("submitted lock poisoned")
                .push(block.start_time);
            if self.failing_starts.contains(&block.start_time) {
                return Err(InfraError::Calendar("google calendar api error: http 500".to_string()));
            }
            Ok(EventHandle {
                id: format!("evt-{}", block.start_time.format("%H%M")),
                html_link: None,
            })
        }
    }

    #[async_trait]
    impl EventSource for FakeCalendar {
        async fn fetch_events(
            &self,
            _access_token: &str,
            _range_start: DateTime<Utc>,
            _range_end: DateTime<Utc>,
        ) -> Result<Vec<CalendarEvent>, InfraError> {
            if self.fail_listing {
                return Err(InfraError::Calendar("network error while listing calendar events".to_string()));
            }
            Ok(self.listed.clone())
        }
    }

    fn scenario_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).expect("valid date")
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        scenario_date()
            .and_hms_opt(hour, minute, 0)
            .expect("valid time")
    }

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn main_config() -> WorkBlockConfig {
        WorkBlockConfig::default().with_project_code("MAIN")
    }

    #[tokio::test]
    async fn concurrent_submission_correlates_results_with_blocks() {
        let calendar = Arc::new(FakeCalendar::default());
        let service = WorkdayService::new(Arc::clone(&calendar))
            .with_submission_mode(SubmissionMode::Concurrent { limit: 3 });

        let report = service
            .schedule_day("access-token", scenario_date(), &main_config())
            .await
            .expect("valid config");

        assert_eq!(report.submissions.len(), 7);
        assert_eq!(report.created(), 7);
        for (position, submission) in report.submissions.iter().enumerate() {
            assert_eq!(submission.index, position);
            let handle = submission.outcome.as_ref().expect("created");
            assert_eq!(
                handle.id,
                format!("evt-{}", submission.block.start_time.format("%H%M"))
            );
        }
    }

    #[tokio::test]
    async fn failed_block_does_not_stop_remaining_submissions() {
        let calendar = Arc::new(FakeCalendar {
            failing_starts: HashSet::from([at(11, 0), at(15, 0)]),
            ..FakeCalendar::default()
        });
        let service = WorkdayService::new(Arc::clone(&calendar))
            .with_submission_mode(SubmissionMode::Sequential);

        let report = service
            .schedule_day("access-token", scenario_date(), &main_config())
            .await
            .expect("valid config");

        assert_eq!(calendar.submit_calls.load(Ordering::SeqCst), 7);
        assert_eq!(report.created(), 5);
        assert_eq!(report.failed(), 2);
        let failed_indexes = report.failures().map(|error| error.index).collect::<Vec<_>>();
        assert_eq!(failed_indexes, vec![1, 4]);
    }

    #[tokio::test]
    async fn sequential_submission_preserves_chronological_order() {
        let calendar = Arc::new(FakeCalendar::default());
        let service = WorkdayService::new(Arc::clone(&calendar))
            .with_submission_mode(SubmissionMode::Sequential);

        let _ = service
            .schedule_day("access-token", scenario_date(), &main_config())
            .await
            .expect("valid config");

        let submitted = calendar.submitted.lock().expect("submitted lock poisoned").clone();
        let mut sorted = submitted.clone();
        sorted.sort();
        assert_eq!(submitted, sorted);
        assert_eq!(submitted.first(), Some(&at(10, 0)));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_any_submission() {
        let calendar = Arc::new(FakeCalendar::default());
        let service = WorkdayService::new(Arc::clone(&calendar));
        let config = WorkBlockConfig {
            break_duration_minutes: Some(0),
            ..main_config()
        };

        let result = service
            .schedule_day("access-token", scenario_date(), &config)
            .await;

        assert!(matches!(result, Err(WorkdayError::Configuration(_))));
        assert_eq!(calendar.submit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn project_events_filters_retrieved_events() {
        let event = |id: &str, title: &str, start: &str| CalendarEvent {
            id: id.to_string(),
            title: Some(title.to_string()),
            start_time: fixed_time(start),
            end_time: None,
            link: None,
        };
        let calendar = Arc::new(FakeCalendar {
            listed: vec![
                event("a", "[MAIN] Focus Work Block", "2025-03-15T10:00:00Z"),
                event("b", "[SIDE] Focus Work Block", "2025-03-15T11:00:00Z"),
                event("c", "[MAIN] Focus Work Block", "2025-03-15T13:00:00Z"),
            ],
            ..FakeCalendar::default()
        });
        let service = WorkdayService::new(calendar);

        let events = service
            .project_events(
                "access-token",
                "MAIN",
                fixed_time("2025-03-15T00:00:00Z"),
                fixed_time("2025-03-16T00:00:00Z"),
            )
            .await
            .expect("retrieval succeeds");

        let ids = events.iter().map(|event| event.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn retrieval_failure_propagates_as_a_whole() {
        let calendar = Arc::new(FakeCalendar {
            fail_listing: true,
            ..FakeCalendar::default()
        });
        let service = WorkdayService::new(calendar);

        let result = service
            .project_events(
                "access-token",
                "MAIN",
                fixed_time("2025-03-15T00:00:00Z"),
                fixed_time("2025-03-16T00:00:00Z"),
            )
            .await;

        assert!(matches!(result, Err(WorkdayError::Retrieval(_))));
    }

    #[test]
    fn local_day_range_follows_time_zone_offset() {
        let (start, end) =
            local_day_range(scenario_date(), chrono_tz::Asia::Tokyo).expect("valid range");
        assert_eq!(start, fixed_time("2025-03-14T15:00:00Z"));
        assert_eq!(end, fixed_time("2025-03-15T15:00:00Z"));

        let (utc_start, utc_end) = local_day_range(scenario_date(), chrono_tz::UTC).expect("valid range");
        assert_eq!(utc_end - utc_start, chrono::Duration::hours(24));
    }
}
