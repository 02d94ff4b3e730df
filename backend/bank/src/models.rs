//! # Models
//!
//! Persisted documents. Every struct here is written as JSON under one of the
//! fixed store keys, so field names follow the camelCase layout of the stored
//! blobs.
//!
//! - Amounts are whole currency units, signed.
//! - Timestamps are epoch milliseconds.
//! - Lists that grow over time (transactions, history, audit log) are kept
//!   newest first.
use serde::{Deserialize, Serialize};

use crate::permissions::{Role, RolePermissions};

pub const DEFAULT_SIGNUP_BONUS: i64 = 100;
pub const DEFAULT_MIN_WITHDRAWAL: i64 = 10;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Win,
    EntryFee,
    PendingWithdrawal,
    WithdrawalDeclined,
    Refund,
    AdminAdjustment,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Declined,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: i64,
    pub description: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl Transaction {
    /// Pending holds and declined requests never touch the balance.
    pub fn affects_balance(&self) -> bool {
        !matches!(
            self.status,
            Some(TransactionStatus::Pending) | Some(TransactionStatus::Declined)
        )
    }

    pub fn is_pending(&self) -> bool {
        self.status == Some(TransactionStatus::Pending)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub contest_id: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub result: i64,
    pub points_delta: i64,
    pub timestamp: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub banned: bool,
    pub wallet_balance: i64,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub created_at: i64,
}

impl User {
    /// A user with an empty wallet. Registration goes through the ledger so the
    /// signup bonus shows up as a transaction.
    pub fn new(name: &str, email: &str, password: &str, now: i64) -> Self {
        Self {
            email: email.to_string(),
            name: name.to_string(),
            password: password.to_string(),
            role: Role::User,
            banned: false,
            wallet_balance: 0,
            transactions: Vec::new(),
            points: 0,
            history: Vec::new(),
            created_at: now,
        }
    }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.id == id)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContestStatus {
    Draft,
    #[serde(rename = "Pending Approval")]
    PendingApproval,
    Upcoming,
    Live,
    Finished,
    Cancelled,
    Rejected,
}

impl ContestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled | Self::Rejected)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContestFormat {
    #[serde(rename = "KBC")]
    Kbc,
    #[serde(rename = "Fastest Finger")]
    FastestFinger,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerType {
    #[default]
    PerQuestion,
    TotalContest,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    pub id: String,
    pub title: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub status: ContestStatus,
    pub registration_start_date: i64,
    pub registration_end_date: i64,
    pub contest_start_date: i64,
    #[serde(default)]
    pub participants: Vec<String>,
    pub entry_fee: i64,
    pub max_participants: usize,
    pub format: ContestFormat,
    #[serde(default)]
    pub timer_type: TimerType,
    /// Seconds, only meaningful for a total contest timer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_contest_time: Option<i64>,
    /// KBC: prize per ladder level. Fastest Finger: prize per leaderboard rank.
    #[serde(default)]
    pub prizes: Vec<i64>,
    #[serde(default)]
    pub created_by: String,
    /// Prizes and points have been handed out.
    #[serde(default)]
    pub settled: bool,
}

impl Contest {
    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants
    }

    pub fn has_participant(&self, email: &str) -> bool {
        self.participants.iter().any(|p| p == email)
    }
}

/// One participant's outcome, reported when a contest is settled.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContestResult {
    pub email: String,
    /// KBC: ladder levels cleared. Fastest Finger: correct answers.
    pub score: i64,
    pub time_taken_ms: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: i64,
    pub actor: String,
    pub action: String,
    pub details: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub signup_bonus: i64,
    pub min_withdrawal: i64,
    #[serde(default)]
    pub role_permissions: RolePermissions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            signup_bonus: DEFAULT_SIGNUP_BONUS,
            min_withdrawal: DEFAULT_MIN_WITHDRAWAL,
            role_permissions: RolePermissions::default(),
        }
    }
}
