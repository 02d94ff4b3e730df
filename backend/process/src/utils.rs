use std::{fs::read_to_string, path::Path};

use anyhow::Context;
use bank::models::Transaction;
use chrono::DateTime;
use serde::de::DeserializeOwned;

pub fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|time| time.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

pub fn format_transaction(tx: &Transaction) -> String {
    let status = tx
        .status
        .map(|status| format!(" [{status:?}]"))
        .unwrap_or_default();

    format!(
        "{}  {:>8}  {:<20} {}{status}  ({})",
        format_millis(tx.timestamp),
        tx.amount,
        format!("{:?}", tx.kind),
        tx.description,
        tx.id
    )
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;

    serde_json::from_str(&raw).with_context(|| format!("Malformed JSON in {}", path.display()))
}
