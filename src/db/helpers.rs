use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use super::models::{SessionKind, SessionStatus};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} is negative: {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid {field} '{value}': {err}"))
}

pub fn parse_optional_datetime(value: Option<String>, field: &str) -> Result<Option<DateTime<Utc>>> {
    value.map(|raw| parse_datetime(&raw, field)).transpose()
}

pub fn parse_status(value: &str) -> Result<SessionStatus> {
    match value {
        "Running" => Ok(SessionStatus::Running),
        "Completed" => Ok(SessionStatus::Completed),
        "Cancelled" => Ok(SessionStatus::Cancelled),
        "Interrupted" => Ok(SessionStatus::Interrupted),
        _ => Err(anyhow!("unknown session status '{value}'")),
    }
}

pub fn parse_kind(value: &str) -> Result<SessionKind> {
    match value {
        "Mood" => Ok(SessionKind::Mood),
        "Pose" => Ok(SessionKind::Pose),
        _ => Err(anyhow!("unknown session kind '{value}'")),
    }
}
