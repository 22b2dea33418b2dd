use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::CampaignStatus;

/// Status is never stored, it is read off the clock. The end instant itself
/// still counts as active, so entries submitted exactly at `end` are taken
/// even though [`time_remaining`] already reads "Ended" then.
pub fn derive_status(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> CampaignStatus {
    if now < start {
        CampaignStatus::Scheduled
    } else if now > end {
        CampaignStatus::Ended
    } else {
        CampaignStatus::Active
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeRemaining {
    #[schema(example = "2d 4h 10m")]
    pub text: String,
    pub is_ended: bool,
    #[schema(example = 42.5)]
    pub percent: f64,
}

pub fn format_countdown(seconds: i64, prefix: &str) -> String {
    if seconds <= 0 {
        return "Ended".to_string();
    }

    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{prefix}{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{prefix}{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{prefix}{minutes}m {secs}s")
    } else {
        format!("{prefix}{secs}s")
    }
}

pub fn time_remaining(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> TimeRemaining {
    if now < start {
        return TimeRemaining {
            text: format_countdown((start - now).num_seconds(), "Starts in "),
            is_ended: false,
            percent: 0.0,
        };
    }

    let seconds = (end - now).num_seconds();
    if seconds <= 0 {
        return TimeRemaining {
            text: "Ended".to_string(),
            is_ended: true,
            percent: 100.0,
        };
    }

    let total = (end - start).num_seconds();
    let percent = if total > 0 {
        ((total - seconds) as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    TimeRemaining {
        text: format_countdown(seconds, ""),
        is_ended: false,
        percent,
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

fn with_remainder(head: String, remainder: i64, unit: &str) -> String {
    if remainder > 0 {
        format!("{head} {remainder} {unit}")
    } else {
        head
    }
}

/// Length of the campaign window as shown in its timeline, e.g. "7 days".
pub fn duration_text(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let span = end - start;
    let minutes = span.num_minutes();
    let hours = span.num_hours();
    let days = span.num_days();

    if minutes < 60 {
        plural(minutes, "minute")
    } else if hours < 24 {
        with_remainder(plural(hours, "hour"), minutes % 60, "min")
    } else if days < 30 {
        with_remainder(plural(days, "day"), hours % 24, "hours")
    } else if days < 365 {
        with_remainder(plural(days / 30, "month"), days % 30, "days")
    } else {
        with_remainder(plural(days / 365, "year"), (days % 365) / 30, "months")
    }
}
