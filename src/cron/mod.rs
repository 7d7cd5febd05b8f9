// src/cron/mod.rs

//! Advisory next-occurrence estimator for a restricted cron grammar.
//!
//! Only seven shapes are computed (see [`Shape`]); everything else gets a
//! textual description and no timestamp. The server's scheduler is the
//! authority; disagreement with it is expected.

pub mod describe;
pub mod estimate;
pub mod spec;

use chrono::NaiveDateTime;

pub use spec::{CronError, CronSpec, Field, Shape};

/// Display format for concrete timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fallback when nothing more specific can be said.
pub const ON_SCHEDULE: &str = "runs on schedule";

/// Result of evaluating one expression at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Estimate {
    pub description: String,
    pub next: Option<NaiveDateTime>,
}

impl CronSpec {
    pub fn shape(&self) -> Option<Shape> {
        Shape::classify(self)
    }

    /// Shape description, or `None` for expressions outside the known shapes.
    pub fn describe(&self) -> Option<String> {
        self.shape().map(|shape| shape.describe())
    }

    pub fn next_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        self.shape().and_then(|shape| shape.next_after(now))
    }

    pub fn estimate(&self, now: NaiveDateTime) -> Estimate {
        let description = self
            .describe()
            .or_else(|| self.describe_fields())
            .unwrap_or_else(|| ON_SCHEDULE.to_string());

        Estimate {
            description,
            next: self.next_after(now),
        }
    }
}

/// Parse and estimate in one go.
pub fn estimate(expr: &str, now: NaiveDateTime) -> Result<Estimate, CronError> {
    Ok(CronSpec::parse(expr)?.estimate(now))
}

/// One-line "next run" text for a task list.
pub fn next_run_label(expr: &str, active: bool, now: NaiveDateTime) -> String {
    if !active {
        return "disabled".to_string();
    }

    let spec = match CronSpec::parse(expr) {
        Ok(spec) => spec,
        Err(_) => return "invalid expression format".to_string(),
    };

    if let Some(next) = spec.next_after(now) {
        return next.format(TIMESTAMP_FORMAT).to_string();
    }

    spec.describe()
        .or_else(|| spec.describe_fields())
        .unwrap_or_else(|| ON_SCHEDULE.to_string())
}
