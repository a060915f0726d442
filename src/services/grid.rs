use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::models::{DayOfWeek, Lesson};

/// Smallest block the grid will emit for a valid lesson.
pub const MIN_BLOCK_HEIGHT_PX: f64 = 1.0;

#[derive(Debug, Error, PartialEq)]
pub enum GridConfigError {
    #[error("grid needs 6 or 7 day columns, got {0}")]
    DayColumnCount(usize),

    #[error("day column {0} appears more than once")]
    DuplicateDay(DayOfWeek),

    #[error("grid hours must satisfy 0 <= start < end <= 24, got {start}..{end}")]
    HourRange { start: u32, end: u32 },

    #[error("pixels per hour must be a positive number, got {0}")]
    Scale(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    day_columns: Vec<DayOfWeek>,
    grid_start_hour: u32,
    grid_end_hour: u32,
    pixels_per_hour: f64,
}

impl GridConfig {
    pub fn new(
        day_columns: Vec<DayOfWeek>,
        grid_start_hour: u32,
        grid_end_hour: u32,
        pixels_per_hour: f64,
    ) -> Result<Self, GridConfigError> {
        if !(6..=7).contains(&day_columns.len()) {
            return Err(GridConfigError::DayColumnCount(day_columns.len()));
        }
        let mut seen = HashSet::new();
        for day in &day_columns {
            if !seen.insert(*day) {
                return Err(GridConfigError::DuplicateDay(*day));
            }
        }
        if grid_start_hour >= grid_end_hour || grid_end_hour > 24 {
            return Err(GridConfigError::HourRange {
                start: grid_start_hour,
                end: grid_end_hour,
            });
        }
        if !pixels_per_hour.is_finite() || pixels_per_hour <= 0.0 {
            return Err(GridConfigError::Scale(pixels_per_hour));
        }

        Ok(Self {
            day_columns,
            grid_start_hour,
            grid_end_hour,
            pixels_per_hour,
        })
    }

    pub fn day_columns(&self) -> &[DayOfWeek] {
        &self.day_columns
    }

    pub fn grid_start_hour(&self) -> u32 {
        self.grid_start_hour
    }

    pub fn grid_end_hour(&self) -> u32 {
        self.grid_end_hour
    }

    pub fn pixels_per_hour(&self) -> f64 {
        self.pixels_per_hour
    }
}

/// Monday to Saturday, 08:00 to 22:00, 80px per hour.
impl Default for GridConfig {
    fn default() -> Self {
        Self {
            day_columns: DayOfWeek::ALL[..6].to_vec(),
            grid_start_hour: 8,
            grid_end_hour: 22,
            pixels_per_hour: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPlacement {
    pub day_column_index: usize,
    pub top_offset_px: f64,
    pub height_px: f64,
    /// Part of the lesson falls outside the hour window.
    pub clipped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedLesson {
    pub lesson: Lesson,
    #[serde(flatten)]
    pub placement: GridPlacement,
}

/// Project a lesson onto the weekly grid.
///
/// Returns `None` when the lesson's day has no column, its times are invalid,
/// or it lies entirely outside `[grid_start_hour, grid_end_hour]`. Lessons
/// that straddle the window are clipped to it.
pub fn place_lesson(lesson: &Lesson, config: &GridConfig) -> Option<GridPlacement> {
    let day_column_index = config
        .day_columns
        .iter()
        .position(|day| *day == lesson.day_of_week)?;
    let span = lesson.span()?;

    let window_start = config.grid_start_hour * 60;
    let window_end = config.grid_end_hour * 60;
    let start = span.start_minutes().max(window_start);
    let end = span.end_minutes().min(window_end);
    if end <= start {
        return None;
    }

    let pph = config.pixels_per_hour;
    let top_offset_px = f64::from(start - window_start) / 60.0 * pph;
    let height_px = (f64::from(end - start) / 60.0 * pph).max(MIN_BLOCK_HEIGHT_PX);

    Some(GridPlacement {
        day_column_index,
        top_offset_px,
        height_px,
        clipped: start != span.start_minutes() || end != span.end_minutes(),
    })
}

pub fn layout_week(lessons: &[Lesson], config: &GridConfig) -> Vec<PlacedLesson> {
    lessons
        .iter()
        .filter_map(|lesson| {
            place_lesson(lesson, config).map(|placement| PlacedLesson {
                lesson: lesson.clone(),
                placement,
            })
        })
        .collect()
}
