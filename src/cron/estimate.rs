// src/cron/estimate.rs

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use crate::cron::spec::Shape;

/// How far forward the month/year searches look before giving up.
const MAX_MONTHS_AHEAD: u32 = 48;
const MAX_YEARS_AHEAD: i32 = 8;

impl Shape {
    /// Next occurrence strictly after `now` (seconds are not part of the
    /// schedule, so results always fall on `:00`).
    pub fn next_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let today = now.date();
        let top_of_hour = today.and_hms_opt(now.hour(), 0, 0)?;

        match *self {
            Shape::MinuteStep { every } => {
                let next_minute = (now.minute() + 1).div_ceil(every) * every;
                if next_minute >= 60 {
                    Some(top_of_hour + TimeDelta::hours(1))
                } else {
                    Some(top_of_hour + TimeDelta::minutes(i64::from(next_minute)))
                }
            }
            Shape::HourStep { every, minute } => {
                let next_hour = (now.hour() + 1).div_ceil(every) * every;
                if next_hour >= 24 {
                    today.succ_opt()?.and_hms_opt(0, minute, 0)
                } else {
                    today.and_hms_opt(next_hour, minute, 0)
                }
            }
            Shape::Hourly { minute } => {
                let candidate = top_of_hour + TimeDelta::minutes(i64::from(minute));
                if candidate <= now {
                    Some(candidate + TimeDelta::hours(1))
                } else {
                    Some(candidate)
                }
            }
            Shape::Daily { hour, minute } => {
                let candidate = today.and_hms_opt(hour, minute, 0)?;
                if candidate <= now {
                    Some(candidate + TimeDelta::days(1))
                } else {
                    Some(candidate)
                }
            }
            Shape::Weekly {
                weekday,
                hour,
                minute,
            } => {
                let candidate = today.and_hms_opt(hour, minute, 0)?;
                let current = now.weekday().num_days_from_sunday() as i64;
                let mut days = i64::from(weekday) - current;
                if days < 0 || (days == 0 && candidate <= now) {
                    days += 7;
                }
                Some(candidate + TimeDelta::days(days))
            }
            Shape::Monthly { day, hour, minute } => {
                next_monthly(now, day, hour, minute)
            }
            Shape::Yearly {
                month,
                day,
                hour,
                minute,
            } => next_yearly(now, month, day, hour, minute),
        }
    }
}

/// Walk month by month until one has `day` and the time is still ahead.
fn next_monthly(now: NaiveDateTime, day: u32, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    let (mut year, mut month) = (now.year(), now.month());

    for _ in 0..MAX_MONTHS_AHEAD {
        if let Some(candidate) =
            NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(hour, minute, 0))
        {
            if candidate > now {
                return Some(candidate);
            }
        }

        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }

    None
}

/// Same as [`next_monthly`] for a fixed month; Feb 29 waits for a leap year.
fn next_yearly(
    now: NaiveDateTime,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
) -> Option<NaiveDateTime> {
    (0..MAX_YEARS_AHEAD).find_map(|offset| {
        NaiveDate::from_ymd_opt(now.year() + offset, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .filter(|candidate| *candidate > now)
    })
}
