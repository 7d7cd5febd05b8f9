// src/cron/spec.rs

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CronError {
    #[error("expected 5 cron fields (minute hour day month weekday), found {0}")]
    FieldCount(usize),
}

/// One raw field, classified into the few forms the estimator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// `*`
    Any,
    /// `*/N` with `N > 0`.
    Step(u32),
    /// A plain non-negative integer.
    Exact(u32),
    /// Lists, ranges, names, `*/0` and anything else.
    Other,
}

impl Field {
    pub fn classify(raw: &str) -> Self {
        if raw == "*" {
            return Field::Any;
        }
        if let Some(step) = raw.strip_prefix("*/") {
            return match step.parse::<u32>() {
                Ok(n) if n > 0 => Field::Step(n),
                _ => Field::Other,
            };
        }
        match raw.parse::<u32>() {
            Ok(n) => Field::Exact(n),
            Err(_) => Field::Other,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Field::Any)
    }

    /// The exact value, if it lies in `range`.
    pub fn exact_in(&self, range: std::ops::RangeInclusive<u32>) -> Option<u32> {
        match *self {
            Field::Exact(n) if range.contains(&n) => Some(n),
            _ => None,
        }
    }
}

/// A five-field cron expression, kept as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSpec {
    pub minute: String,
    pub hour: String,
    pub day: String,
    pub month: String,
    pub weekday: String,
}

impl CronSpec {
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, day, month, weekday] = parts.as_slice() else {
            return Err(CronError::FieldCount(parts.len()));
        };

        Ok(Self {
            minute: (*minute).to_string(),
            hour: (*hour).to_string(),
            day: (*day).to_string(),
            month: (*month).to_string(),
            weekday: (*weekday).to_string(),
        })
    }

    pub fn minute_field(&self) -> Field {
        Field::classify(&self.minute)
    }

    pub fn hour_field(&self) -> Field {
        Field::classify(&self.hour)
    }

    pub fn day_field(&self) -> Field {
        Field::classify(&self.day)
    }

    pub fn month_field(&self) -> Field {
        Field::classify(&self.month)
    }

    pub fn weekday_field(&self) -> Field {
        Field::classify(&self.weekday)
    }
}

impl FromStr for CronSpec {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CronSpec::parse(s)
    }
}

impl fmt::Display for CronSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.minute, self.hour, self.day, self.month, self.weekday
        )
    }
}

/// The recurrence shapes the estimator can compute, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    MinuteStep { every: u32 },
    HourStep { every: u32, minute: u32 },
    Hourly { minute: u32 },
    Daily { hour: u32, minute: u32 },
    Weekly { weekday: u32, hour: u32, minute: u32 },
    Monthly { day: u32, hour: u32, minute: u32 },
    Yearly { month: u32, day: u32, hour: u32, minute: u32 },
}

impl Shape {
    /// First matching shape for `spec`, or `None` when it fits none of them.
    pub fn classify(spec: &CronSpec) -> Option<Shape> {
        let minute = spec.minute_field();
        let hour = spec.hour_field();
        let day = spec.day_field();
        let month = spec.month_field();
        let weekday = spec.weekday_field();

        if let Field::Step(every) = minute {
            return Some(Shape::MinuteStep { every });
        }

        let exact_minute = minute.exact_in(0..=59);
        let exact_hour = hour.exact_in(0..=23);

        if let (Field::Step(every), Some(minute)) = (hour, exact_minute) {
            return Some(Shape::HourStep { every, minute });
        }

        let minute = exact_minute?;

        if hour.is_any() {
            return Some(Shape::Hourly { minute });
        }

        let hour = exact_hour?;

        if day.is_any() && month.is_any() && weekday.is_any() {
            return Some(Shape::Daily { hour, minute });
        }

        if day.is_any() {
            return weekday
                .exact_in(0..=6)
                .map(|weekday| Shape::Weekly { weekday, hour, minute });
        }

        let day = day.exact_in(1..=31)?;

        if month.is_any() && weekday.is_any() {
            return Some(Shape::Monthly { day, hour, minute });
        }

        let month = month.exact_in(1..=12)?;
        if weekday.is_any() || matches!(weekday, Field::Exact(_)) {
            return Some(Shape::Yearly {
                month,
                day,
                hour,
                minute,
            });
        }

        None
    }
}
