//! # Wallet Ledger
//!
//! Pure state transition over a user's wallet: `(user, action) -> user'`.
//!
//! ## Rules
//! - The input user is never touched, a new value is returned
//! - Every action prepends exactly one transaction, or rewrites one in place
//!   when resolving a pending withdrawal
//! - Callers pass magnitudes, the ledger applies the sign of the transaction type
//! - `wallet_balance` always equals [`computed_balance`] of the transactions
//! - An action that would push the balance out of `i64` range is refused
//!
//! ## Withdrawals
//! A request only places a hold: the transaction is stored negative with a
//! `pending` status and the balance does not move. Approval flips it to a
//! completed withdrawal and debits the stored amount. Decline marks it
//! declined and leaves the balance alone.
//!
//! Funds checks (insufficient balance, open holds) belong to the caller.
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Transaction, TransactionStatus, TransactionType, User};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerAction {
    SignupBonus { amount: i64 },
    Deposit { amount: i64 },
    WithdrawalRequest { amount: i64 },
    WithdrawalApprove { transaction_id: String, updated_by: String },
    WithdrawalDecline { transaction_id: String, updated_by: String },
    EntryFee { contest_id: String, amount: i64 },
    Win { contest_id: String, amount: i64 },
    Refund { contest_id: String, amount: i64 },
    AdminAdjustment { amount: i64, reason: String, updated_by: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Transaction {0} not found")]
    TransactionNotFound(String),

    #[error("Transaction {0} is not pending")]
    NotPending(String),

    #[error("Amount is out of range")]
    Overflow,
}

pub fn apply_action(user: &User, action: &LedgerAction, now: i64) -> Result<User, LedgerError> {
    let mut next = user.clone();

    match action {
        LedgerAction::SignupBonus { amount } => {
            post(&mut next, TransactionType::Deposit, *amount, "Signup bonus".to_string(), now)?;
        }
        LedgerAction::Deposit { amount } => {
            post(&mut next, TransactionType::Deposit, *amount, "Wallet deposit".to_string(), now)?;
        }
        LedgerAction::Win { contest_id, amount } => {
            post(&mut next, TransactionType::Win, *amount, format!("Prize for contest {contest_id}"), now)?;
        }
        LedgerAction::Refund { contest_id, amount } => {
            post(&mut next, TransactionType::Refund, *amount, format!("Refund for contest {contest_id}"), now)?;
        }
        LedgerAction::EntryFee { contest_id, amount } => {
            post(&mut next, TransactionType::EntryFee, *amount, format!("Entry fee for contest {contest_id}"), now)?;
        }
        LedgerAction::AdminAdjustment { amount, reason, updated_by } => {
            let mut tx = new_transaction(TransactionType::AdminAdjustment, *amount, reason.clone(), now);
            tx.updated_by = Some(updated_by.clone());

            next.wallet_balance = credit(next.wallet_balance, tx.amount)?;
            next.transactions.insert(0, tx);
        }
        LedgerAction::WithdrawalRequest { amount } => {
            let mut tx = new_transaction(
                TransactionType::PendingWithdrawal,
                -magnitude(*amount)?,
                "Withdrawal request".to_string(),
                now,
            );
            tx.status = Some(TransactionStatus::Pending);

            next.transactions.insert(0, tx);
        }
        LedgerAction::WithdrawalApprove { transaction_id, updated_by } => {
            let tx = pending_mut(&mut next, transaction_id)?;
            tx.kind = TransactionType::Withdrawal;
            tx.status = Some(TransactionStatus::Completed);
            tx.updated_by = Some(updated_by.clone());
            tx.description = "Withdrawal approved".to_string();

            let amount = tx.amount;
            next.wallet_balance = credit(next.wallet_balance, amount)?;
        }
        LedgerAction::WithdrawalDecline { transaction_id, updated_by } => {
            let tx = pending_mut(&mut next, transaction_id)?;
            tx.kind = TransactionType::WithdrawalDeclined;
            tx.status = Some(TransactionStatus::Declined);
            tx.updated_by = Some(updated_by.clone());
            tx.description = "Withdrawal declined".to_string();
        }
    }

    Ok(next)
}

/// Balance implied by the transaction history. Exact whenever the total fits
/// in an `i64`, whatever order the partial sums take.
pub fn computed_balance(transactions: &[Transaction]) -> i64 {
    transactions
        .iter()
        .filter(|tx| tx.affects_balance())
        .fold(0, |total, tx| total.wrapping_add(tx.amount))
}

/// Total still on hold for pending withdrawals, as a positive number.
pub fn held_amount(transactions: &[Transaction]) -> i64 {
    transactions
        .iter()
        .filter(|tx| tx.is_pending())
        .map(|tx| tx.amount.abs())
        .sum()
}

/// What the user can still spend or withdraw once open holds are honored.
pub fn available_balance(user: &User) -> i64 {
    user.wallet_balance - held_amount(&user.transactions)
}

fn post(user: &mut User, kind: TransactionType, amount: i64, description: String, now: i64) -> Result<(), LedgerError> {
    let amount = match kind {
        TransactionType::EntryFee | TransactionType::Withdrawal => -magnitude(amount)?,
        _ => magnitude(amount)?,
    };

    user.wallet_balance = credit(user.wallet_balance, amount)?;
    user.transactions
        .insert(0, new_transaction(kind, amount, description, now));

    Ok(())
}

fn magnitude(amount: i64) -> Result<i64, LedgerError> {
    amount.checked_abs().ok_or(LedgerError::Overflow)
}

fn credit(balance: i64, amount: i64) -> Result<i64, LedgerError> {
    balance.checked_add(amount).ok_or(LedgerError::Overflow)
}

fn new_transaction(kind: TransactionType, amount: i64, description: String, now: i64) -> Transaction {
    Transaction {
        id: Uuid::new_v4().to_string(),
        kind,
        amount,
        description,
        timestamp: now,
        status: None,
        updated_by: None,
    }
}

fn pending_mut<'a>(user: &'a mut User, transaction_id: &str) -> Result<&'a mut Transaction, LedgerError> {
    let tx = user
        .transactions
        .iter_mut()
        .find(|tx| tx.id == transaction_id)
        .ok_or_else(|| LedgerError::TransactionNotFound(transaction_id.to_string()))?;

    if !tx.is_pending() {
        return Err(LedgerError::NotPending(transaction_id.to_string()));
    }

    Ok(tx)
}
