use chrono::{DateTime, NaiveDateTime};

use crate::error::AppError;

const SQL_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

/// SQL datetime text (UTC) or RFC 3339 to epoch milliseconds.
pub fn to_epoch_millis(value: &str) -> Result<i64, AppError> {
    let value = value.trim();

    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, SQL_DATETIME) {
        return Ok(parsed.and_utc().timestamp_millis());
    }

    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.timestamp_millis())
        .map_err(|e| AppError::MalformedRow(format!("bad date {value:?}: {e}")))
}
