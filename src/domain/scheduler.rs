use crate::domain::models::{
    at_hour, ConfigurationError, WorkBlock, WorkBlockConfig, WorkBlockSettings,
};
use crate::domain::project_tag::tag_title;
use chrono::{NaiveDate, NaiveDateTime};

pub const FOCUS_BLOCK_TITLE: &str = "Focus Work Block";

/// Partitions the work window of `date` into focus blocks.
///
/// The config is resolved (defaults merged, durations validated) before the
/// loop starts, so an invalid config never yields a partial schedule.
pub fn generate_blocks(
    date: NaiveDate,
    config: &WorkBlockConfig,
) -> Result<Vec<WorkBlock>, ConfigurationError> {
    let settings = config.resolve()?;
    Ok(generate_blocks_with_settings(date, &settings))
}

/// Block generation over already-resolved settings.
///
/// Blocks never overlap the lunch window: a cursor inside lunch jumps to its
/// end, and a block that would run into lunch is dropped in favour of the first
/// block after it. No block ever ends past the end of the work window.
pub fn generate_blocks_with_settings(
    date: NaiveDate,
    settings: &WorkBlockSettings,
) -> Vec<WorkBlock> {
    let window = DayWindow::new(date, settings);
    let block_duration = settings.block_duration();
    let break_duration = settings.break_duration();
    let title = match settings.project_code() {
        Some(code) => tag_title(code, FOCUS_BLOCK_TITLE),
        None => FOCUS_BLOCK_TITLE.to_string(),
    };
    let description = format!(
        "{}-minute focused work session",
        settings.block_duration_minutes()
    );

    let mut blocks = Vec::new();
    let mut cursor = window.start;
    while cursor < window.end {
        if let Some(lunch_end) = window.lunch_end_if_inside(cursor) {
            cursor = lunch_end;
            continue;
        }

        let Some(block_end) = cursor.checked_add_signed(block_duration) else {
            break;
        };
        if let Some(lunch_end) = window.lunch_end_if_straddled(cursor, block_end) {
            cursor = lunch_end;
            continue;
        }
        if block_end > window.end {
            break;
        }

        blocks.push(WorkBlock {
            title: title.clone(),
            start_time: cursor,
            end_time: block_end,
            description: description.clone(),
        });
        match block_end.checked_add_signed(break_duration) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    blocks
}

struct DayWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
    lunch: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl DayWindow {
    fn new(date: NaiveDate, settings: &WorkBlockSettings) -> Self {
        let lunch_start = at_hour(date, settings.lunch_start_hour());
        let lunch_end = at_hour(date, settings.lunch_end_hour());
        Self {
            start: at_hour(date, settings.start_hour()),
            end: at_hour(date, settings.end_hour()),
            // An empty or inverted lunch window never triggers a skip.
            lunch: (lunch_end > lunch_start).then_some((lunch_start, lunch_end)),
        }
    }

    fn lunch_end_if_inside(&self, cursor: NaiveDateTime) -> Option<NaiveDateTime> {
        let (lunch_start, lunch_end) = self.lunch?;
        (cursor >= lunch_start && cursor < lunch_end).then_some(lunch_end)
    }

    fn lunch_end_if_straddled(
        &self,
        cursor: NaiveDateTime,
        block_end: NaiveDateTime,
    ) -> Option<NaiveDateTime> {
        let (lunch_start, lunch_end) = self.lunch?;
        (cursor < lunch_start && block_end > lunch_start).then_some(lunch_end)
    }
}
