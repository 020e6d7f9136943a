//! Query functions over a borrowed connection.

pub mod records;
pub mod sessions;
pub mod users;

use chrono::{DateTime, Utc};

use crate::error::{StoreError, StoreResult};

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidRow(format!("timestamp '{raw}': {e}")))
}
