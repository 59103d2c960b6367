// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cron-like Backup Schedule
//!
//! Five fields: `minute hour day-of-month month day-of-week`. Each field
//! accepts `*` (or `?`), single values, comma lists, `a-b` ranges and `/n`
//! steps. Day-of-week uses 0-6 with Sunday as 0 (7 is also Sunday). When
//! both day fields are restricted, a day matches if either matches.
//!
//! The `@hourly`, `@daily` and `@weekly` shorthands are accepted.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SEARCH_DAYS: i64 = 366 * 5;
const GAP_SAMPLE_TICKS: usize = 2_000;

/// Schedule parse error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Schedule must have 5 fields, got {0}")]
    FieldCount(usize),

    #[error("Invalid {field} field: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("Value {value} out of range for {field} ({min}-{max})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    values: BTreeSet<u32>,
    wildcard: bool,
}

impl Field {
    fn parse(raw: &str, name: &'static str, min: u32, max: u32) -> Result<Self, ScheduleError> {
        let invalid = || ScheduleError::InvalidField {
            field: name,
            value: raw.to_string(),
        };

        if raw == "*" || raw == "?" {
            return Ok(Self {
                values: (min..=max).collect(),
                wildcard: true,
            });
        }

        let mut values = BTreeSet::new();
        for part in raw.split(',') {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => {
                    let step: u32 = step.parse().map_err(|_| invalid())?;
                    if step == 0 {
                        return Err(invalid());
                    }
                    (range, step)
                }
                None => (part, 1),
            };

            let (start, end) = if range == "*" || range == "?" {
                (min, max)
            } else if let Some((a, b)) = range.split_once('-') {
                let a: u32 = a.parse().map_err(|_| invalid())?;
                let b: u32 = b.parse().map_err(|_| invalid())?;
                (a, b)
            } else {
                let v: u32 = range.parse().map_err(|_| invalid())?;
                // `5/15` means "from 5 to max, every 15"
                if step > 1 {
                    (v, max)
                } else {
                    (v, v)
                }
            };

            for v in [start, end] {
                if v < min || v > max {
                    return Err(ScheduleError::OutOfRange {
                        field: name,
                        value: v,
                        min,
                        max,
                    });
                }
            }
            if start > end {
                return Err(invalid());
            }

            values.extend((start..=end).step_by(step as usize));
        }

        Ok(Self {
            values,
            wildcard: false,
        })
    }

    fn contains(&self, v: u32) -> bool {
        self.values.contains(&v)
    }
}

/// Parsed cron-like schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Schedule {
    expression: String,
    minutes: Field,
    hours: Field,
    days_of_month: Field,
    months: Field,
    days_of_week: Field,
}

impl Schedule {
    pub fn parse(expression: impl AsRef<str>) -> Result<Self, ScheduleError> {
        let expression = expression.as_ref().trim();
        let expanded = match expression {
            "@hourly" => "0 * * * *",
            "@daily" => "0 0 * * *",
            "@weekly" => "0 0 * * 0",
            other => other,
        };

        let fields: Vec<&str> = expanded.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(ScheduleError::FieldCount(fields.len()));
        }

        let mut days_of_week = Field::parse(fields[4], "day-of-week", 0, 7)?;
        if days_of_week.values.remove(&7) {
            days_of_week.values.insert(0);
        }

        Ok(Self {
            expression: expression.to_string(),
            minutes: Field::parse(fields[0], "minute", 0, 59)?,
            hours: Field::parse(fields[1], "hour", 0, 23)?,
            days_of_month: Field::parse(fields[2], "day-of-month", 1, 31)?,
            months: Field::parse(fields[3], "month", 1, 12)?,
            days_of_week,
        })
    }

    /// Daily at the given UTC time; out-of-range values wrap
    pub fn daily_at(hour: u32, minute: u32) -> Self {
        let (hour, minute) = (hour % 24, minute % 60);
        let every = |min: u32, max: u32| Field {
            values: (min..=max).collect(),
            wildcard: true,
        };
        Self {
            expression: format!("{} {} * * *", minute, hour),
            minutes: Field {
                values: BTreeSet::from([minute]),
                wildcard: false,
            },
            hours: Field {
                values: BTreeSet::from([hour]),
                wildcard: false,
            },
            days_of_month: every(1, 31),
            months: every(1, 12),
            days_of_week: every(0, 6),
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        if !self.months.contains(date.month()) {
            return false;
        }
        let dom = self.days_of_month.contains(date.day());
        let dow = self
            .days_of_week
            .contains(date.weekday().num_days_from_sunday());

        match (self.days_of_month.wildcard, self.days_of_week.wildcard) {
            (false, false) => dom || dow,
            _ => dom && dow,
        }
    }

    /// First tick strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(after)
            + Duration::minutes(1);

        let start_date = start.date_naive();
        for offset in 0..SEARCH_DAYS {
            let date = start_date + Duration::days(offset);
            if !self.day_matches(date) {
                continue;
            }
            let first_day = offset == 0;

            for &hour in &self.hours.values {
                if first_day && hour < start.hour() {
                    continue;
                }
                for &minute in &self.minutes.values {
                    if first_day && hour == start.hour() && minute < start.minute() {
                        continue;
                    }
                    if let Some(naive) = date.and_hms_opt(hour, minute, 0) {
                        return Some(Utc.from_utc_datetime(&naive));
                    }
                }
            }
        }
        None
    }

    /// Every tick in `(from, to]`
    pub fn ticks_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let mut ticks = Vec::new();
        let mut cursor = from;
        while let Some(next) = self.next_after(cursor) {
            if next > to {
                break;
            }
            ticks.push(next);
            cursor = next;
        }
        ticks
    }

    /// Widest interval between consecutive ticks, sampled from `from`
    pub fn max_gap_minutes(&self, from: DateTime<Utc>) -> Option<i64> {
        let horizon = from + Duration::days(366);
        let mut previous = self.next_after(from)?;
        let mut widest: Option<i64> = None;

        for _ in 0..GAP_SAMPLE_TICKS {
            let Some(next) = self.next_after(previous) else {
                break;
            };
            let gap = (next - previous).num_minutes();
            widest = Some(widest.map_or(gap, |w| w.max(gap)));
            if next > horizon {
                break;
            }
            previous = next;
        }
        widest
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Schedule {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Schedule> for String {
    fn from(value: Schedule) -> Self {
        value.expression
    }
}
