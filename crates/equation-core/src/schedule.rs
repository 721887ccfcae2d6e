use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Serialize;
use serde_json::Value;

use crate::snapshot::SnapshotError;

pub const DAYS_PER_WEEK: usize = 7;
pub const HOURS_PER_DAY: usize = 24;

/// Preset scheduled for a single hour of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    Comfort,
    Eco,
    /// No preset scheduled. Also covers codes the vendor may add later.
    Off,
}

impl ScheduleMode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "C" => Self::Comfort,
            "E" => Self::Eco,
            _ => Self::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comfort => "comfort",
            Self::Eco => "eco",
            Self::Off => "off",
        }
    }
}

/// Weekly hour grid, Monday first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeeklySchedule([[ScheduleMode; HOURS_PER_DAY]; DAYS_PER_WEEK]);

impl WeeklySchedule {
    pub fn new(grid: [[ScheduleMode; HOURS_PER_DAY]; DAYS_PER_WEEK]) -> Self {
        Self(grid)
    }

    pub fn uniform(mode: ScheduleMode) -> Self {
        Self([[mode; HOURS_PER_DAY]; DAYS_PER_WEEK])
    }

    /// Parses the vendor grid. Rows may be 24-char strings or arrays of
    /// one-char strings.
    pub fn from_value(value: &Value) -> Result<Self, SnapshotError> {
        let rows = value
            .as_array()
            .ok_or_else(|| SnapshotError::MissingField("schedule".to_string()))?;
        if rows.len() != DAYS_PER_WEEK {
            return Err(SnapshotError::InvalidScheduleShape {
                rows: rows.len(),
                columns: None,
            });
        }

        let mut grid = [[ScheduleMode::Off; HOURS_PER_DAY]; DAYS_PER_WEEK];
        for (day, row) in rows.iter().enumerate() {
            let codes = row_codes(row)?;
            if codes.len() != HOURS_PER_DAY {
                return Err(SnapshotError::InvalidScheduleShape {
                    rows: rows.len(),
                    columns: Some(codes.len()),
                });
            }
            for (hour, code) in codes.iter().enumerate() {
                grid[day][hour] = ScheduleMode::from_code(code);
            }
        }

        Ok(Self(grid))
    }

    pub fn mode_for(&self, day: usize, hour: usize) -> ScheduleMode {
        self.0[day % DAYS_PER_WEEK][hour % HOURS_PER_DAY]
    }

    pub fn mode_at(&self, now: NaiveDateTime) -> ScheduleMode {
        let day = now.weekday().num_days_from_monday() as usize;
        self.mode_for(day, now.hour() as usize)
    }

    pub fn set(&mut self, day: usize, hour: usize, mode: ScheduleMode) {
        self.0[day % DAYS_PER_WEEK][hour % HOURS_PER_DAY] = mode;
    }
}

fn row_codes(row: &Value) -> Result<Vec<String>, SnapshotError> {
    match row {
        Value::String(s) => Ok(s.chars().map(String::from).collect()),
        Value::Array(cells) => cells
            .iter()
            .map(|cell| {
                cell.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| SnapshotError::MissingField("schedule".to_string()))
            })
            .collect(),
        _ => Err(SnapshotError::MissingField("schedule".to_string())),
    }
}
