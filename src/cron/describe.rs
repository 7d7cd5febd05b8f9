// src/cron/describe.rs

use crate::cron::spec::{CronSpec, Field, Shape};

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

impl Shape {
    pub fn describe(&self) -> String {
        match *self {
            Shape::MinuteStep { every } => format!("every {every} minutes"),
            Shape::HourStep { every, minute: 0 } => format!("every {every} hours"),
            Shape::HourStep { every, minute } => {
                format!("every {every} hours at minute {minute}")
            }
            Shape::Hourly { minute } => format!("every hour at minute {minute}"),
            Shape::Daily { hour, minute } => format!("every day at {hour:02}:{minute:02}"),
            Shape::Weekly {
                weekday,
                hour,
                minute,
            } => format!(
                "every {} at {hour:02}:{minute:02}",
                weekday_name(weekday).unwrap_or("?")
            ),
            Shape::Monthly { day, hour, minute } => {
                format!("monthly on day {day} at {hour:02}:{minute:02}")
            }
            Shape::Yearly {
                month,
                day,
                hour,
                minute,
            } => format!(
                "every {} {day} at {hour:02}:{minute:02}",
                month_name(month).unwrap_or("?")
            ),
        }
    }
}

impl CronSpec {
    /// Field-by-field reading for expressions outside the known shapes.
    ///
    /// Returns `None` when every field is a wildcard.
    pub fn describe_fields(&self) -> Option<String> {
        let fields = [
            self.minute_field(),
            self.hour_field(),
            self.day_field(),
            self.month_field(),
            self.weekday_field(),
        ];
        if fields.iter().all(Field::is_any) {
            return None;
        }

        let mut out = String::from("runs ");
        if self.weekday != "*" {
            out.push_str(&describe_weekday(&self.weekday));
        } else if self.day != "*" {
            out.push_str(&format!("monthly on day {}", self.day));
        } else {
            out.push_str("every day");
        }
        if self.month != "*" {
            out.push_str(&format!(", {}", describe_part(&self.month, "month")));
        }
        if self.hour != "*" {
            out.push_str(&format!(", {}", describe_part(&self.hour, "hour")));
        }
        if self.minute != "*" {
            out.push_str(&format!(", {}", describe_part(&self.minute, "minute")));
        }

        Some(out)
    }
}

fn describe_part(raw: &str, unit: &str) -> String {
    match Field::classify(raw) {
        Field::Any => format!("every {unit}"),
        Field::Step(n) => format!("every {n} {unit}s"),
        Field::Exact(n) => format!("{unit} {n}"),
        Field::Other => format!("{unit} {raw}"),
    }
}

fn describe_weekday(raw: &str) -> String {
    match Field::classify(raw) {
        Field::Exact(n) => match weekday_name(n) {
            Some(name) => format!("every {name}"),
            None => format!("weekday {raw}"),
        },
        _ => describe_part(raw, "weekday"),
    }
}

fn weekday_name(n: u32) -> Option<&'static str> {
    WEEKDAYS.get(n as usize).copied()
}

fn month_name(n: u32) -> Option<&'static str> {
    n.checked_sub(1).and_then(|i| MONTHS.get(i as usize)).copied()
}
