//! # Contest Tables
//!
//! Contests live in two tables, one per format, with slightly different
//! columns. The listing endpoint reads both in a single query and normalizes
//! the result:
//!
//! - ids are prefixed per table (`kbc-`, `ff-`) so they stay unique
//! - the format is a literal per table
//! - KBC contests always use a per question timer
//! - snake_case columns become camelCase keys
//! - date columns (`YYYY-MM-DD HH:MM:SS`, UTC) become epoch milliseconds
//!
//! Prize lists are stored as JSON arrays in a text column.
use bank::models::{ContestFormat, ContestStatus, Difficulty, TimerType};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sqlx::{
    FromRow, SqlitePool,
    sqlite::SqlitePoolOptions,
};

use crate::{error::AppError, utils::to_epoch_millis};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kbc_contests (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    category TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    status TEXT NOT NULL,
    entry_fee INTEGER NOT NULL,
    max_participants INTEGER NOT NULL,
    prize_ladder TEXT NOT NULL DEFAULT '[]',
    registration_start_date TEXT NOT NULL,
    registration_end_date TEXT NOT NULL,
    contest_start_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS fastest_finger_contests (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    category TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    status TEXT NOT NULL,
    entry_fee INTEGER NOT NULL,
    max_participants INTEGER NOT NULL,
    prizes TEXT NOT NULL DEFAULT '[]',
    timer_type TEXT NOT NULL,
    total_contest_time INTEGER,
    registration_start_date TEXT NOT NULL,
    registration_end_date TEXT NOT NULL,
    contest_start_date TEXT NOT NULL
);
"#;

const CONTESTS_QUERY: &str = r#"
SELECT 'kbc-' || id AS id, title, category, difficulty, status, entry_fee, max_participants,
       prize_ladder AS prizes, 'KBC' AS format, 'per_question' AS timer_type,
       NULL AS total_contest_time,
       registration_start_date, registration_end_date, contest_start_date
FROM kbc_contests
UNION ALL
SELECT 'ff-' || id AS id, title, category, difficulty, status, entry_fee, max_participants,
       prizes, 'Fastest Finger' AS format, timer_type,
       total_contest_time,
       registration_start_date, registration_end_date, contest_start_date
FROM fastest_finger_contests
ORDER BY contest_start_date, id
"#;

#[derive(FromRow, Debug)]
struct ContestRow {
    id: String,
    title: String,
    category: String,
    difficulty: String,
    status: String,
    entry_fee: i64,
    max_participants: i64,
    prizes: String,
    format: String,
    timer_type: String,
    total_contest_time: Option<i64>,
    registration_start_date: String,
    registration_end_date: String,
    contest_start_date: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContestListing {
    pub id: String,
    pub title: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub status: ContestStatus,
    pub entry_fee: i64,
    pub max_participants: i64,
    #[serde(default)]
    pub prizes: Vec<i64>,
    pub format: ContestFormat,
    pub timer_type: TimerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_contest_time: Option<i64>,
    pub registration_start_date: i64,
    pub registration_end_date: i64,
    pub contest_start_date: i64,
}

impl TryFrom<ContestRow> for ContestListing {
    type Error = AppError;

    fn try_from(row: ContestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            difficulty: parse_label("difficulty", &row.difficulty)?,
            status: parse_label("status", &row.status)?,
            format: parse_label("format", &row.format)?,
            timer_type: parse_label("timer_type", &row.timer_type)?,
            prizes: serde_json::from_str(&row.prizes)
                .map_err(|e| AppError::MalformedRow(format!("{}: prizes {e}", row.id)))?,
            registration_start_date: to_epoch_millis(&row.registration_start_date)?,
            registration_end_date: to_epoch_millis(&row.registration_end_date)?,
            contest_start_date: to_epoch_millis(&row.contest_start_date)?,
            entry_fee: row.entry_fee,
            max_participants: row.max_participants,
            total_contest_time: row.total_contest_time,
            id: row.id,
            title: row.title,
            category: row.category,
        })
    }
}

/// Lazy so the server still starts when the database is down; the listing
/// falls back to the bundled contests until it comes back.
pub fn init_pool(database_url: &str) -> Result<SqlitePool, AppError> {
    Ok(SqlitePoolOptions::new()
        .max_connections(5)
        .connect_lazy(database_url)?)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

pub async fn fetch_contests(pool: &SqlitePool) -> Result<Vec<ContestListing>, AppError> {
    let rows: Vec<ContestRow> = sqlx::query_as(CONTESTS_QUERY).fetch_all(pool).await?;

    rows.into_iter().map(ContestListing::try_from).collect()
}

/// Stored labels use the same spelling as the JSON documents
/// ("Pending Approval", "Fastest Finger", "total_contest").
fn parse_label<T: DeserializeOwned>(column: &str, value: &str) -> Result<T, AppError> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| AppError::MalformedRow(format!("unknown {column} {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_union_normalizes_rows() {
        let pool = memory_pool().await;

        sqlx::raw_sql(
            r#"
            INSERT INTO kbc_contests
                (id, title, category, difficulty, status, entry_fee, max_participants, prize_ladder,
                 registration_start_date, registration_end_date, contest_start_date)
            VALUES
                (7, 'Mega Quiz', 'General', 'Medium', 'Upcoming', 50, 100, '[100,200,500]',
                 '2025-01-01 00:00:00', '2025-01-02 00:00:00', '2025-01-03 00:00:00');

            INSERT INTO fastest_finger_contests
                (id, title, category, difficulty, status, entry_fee, max_participants, prizes,
                 timer_type, total_contest_time,
                 registration_start_date, registration_end_date, contest_start_date)
            VALUES
                (7, 'Speed Round', 'Sports', 'Hard', 'Pending Approval', 0, 20, '[300,100]',
                 'total_contest', 300,
                 '2025-01-01 00:00:00', '2025-01-01 12:00:00', '2025-01-01 13:00:00');
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let contests = fetch_contests(&pool).await.unwrap();
        assert_eq!(contests.len(), 2);

        let ff = &contests[0];
        assert_eq!(ff.id, "ff-7");
        assert_eq!(ff.format, ContestFormat::FastestFinger);
        assert_eq!(ff.status, ContestStatus::PendingApproval);
        assert_eq!(ff.timer_type, TimerType::TotalContest);
        assert_eq!(ff.total_contest_time, Some(300));
        assert_eq!(ff.contest_start_date, 1_735_736_400_000);

        let kbc = &contests[1];
        assert_eq!(kbc.id, "kbc-7");
        assert_eq!(kbc.format, ContestFormat::Kbc);
        assert_eq!(kbc.timer_type, TimerType::PerQuestion);
        assert_eq!(kbc.total_contest_time, None);
        assert_eq!(kbc.prizes, vec![100, 200, 500]);
        assert_eq!(kbc.registration_start_date, 1_735_689_600_000);

        let json = serde_json::to_value(kbc).unwrap();
        assert_eq!(json["entryFee"], 50);
        assert_eq!(json["contestStartDate"], 1_735_862_400_000_i64);
        assert!(json.get("entry_fee").is_none());
    }

    #[tokio::test]
    async fn test_bad_label_is_reported() {
        let pool = memory_pool().await;

        sqlx::raw_sql(
            r#"
            INSERT INTO kbc_contests
                (id, title, category, difficulty, status, entry_fee, max_participants,
                 registration_start_date, registration_end_date, contest_start_date)
            VALUES
                (1, 'Broken', 'General', 'Impossible', 'Upcoming', 0, 1,
                 '2025-01-01 00:00:00', '2025-01-02 00:00:00', '2025-01-03 00:00:00');
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        assert!(matches!(
            fetch_contests(&pool).await,
            Err(AppError::MalformedRow(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_tables() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        assert!(matches!(fetch_contests(&pool).await, Err(AppError::Database(_))));
    }
}
