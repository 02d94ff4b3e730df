use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9-]+(\.[a-z0-9-]+)+$").expect("email pattern"));

static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Emails are the user key, so every lookup goes through here first.
pub fn normalize_email(input: &str) -> String {
    SPACES.replace_all(input.trim(), "").to_lowercase()
}

pub fn valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

pub fn sanitize_name(input: &str) -> String {
    SPACES.replace_all(input.trim(), " ").into_owned()
}
