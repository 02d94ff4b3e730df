//! # Admin Processing
//!
//! Offline maintenance over the persisted documents in a data directory. Runs
//! the same [`Service`] operations the server uses, so every balance change
//! goes through the ledger and every admin action is audited.
//!
//! Stop the server before running commands against its data directory; both
//! keep a full copy of the state in memory and the last writer wins.
//!
//! ## Files
//! - `create-contest` reads one contest document (camelCase, as stored).
//! - `settle` reads a JSON array of `{ "email", "score", "timeTakenMs" }`.
use std::path::PathBuf;

use bank::{
    Service,
    ledger::available_balance,
    models::{Contest, ContestResult},
    ranking::get_rank,
    store::Store,
};
use clap::{Parser, Subcommand};
use tracing::info;

pub mod utils;

use utils::{format_millis, format_transaction, read_json};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Creates the first super admin.
    SeedAdmin { name: String, email: String, password: String },

    /// Creates a user with the signup bonus.
    Register { name: String, email: String, password: String },

    /// Prints a user's balance and transactions.
    Wallet { email: String },

    Deposit { email: String, amount: i64 },

    /// Places a pending withdrawal hold.
    Withdraw { email: String, amount: i64 },

    ApproveWithdrawal {
        #[arg(long = "as")]
        actor: String,
        email: String,
        transaction_id: String,
    },

    DeclineWithdrawal {
        #[arg(long = "as")]
        actor: String,
        email: String,
        transaction_id: String,
    },

    /// Credits (positive) or debits (negative) a wallet.
    Adjust {
        #[arg(long = "as")]
        actor: String,
        email: String,
        #[arg(allow_hyphen_values = true)]
        amount: i64,
        reason: String,
    },

    CreateContest {
        #[arg(long = "as")]
        actor: String,
        file: PathBuf,
    },

    SubmitContest {
        #[arg(long = "as")]
        actor: String,
        id: String,
    },

    ApproveContest {
        #[arg(long = "as")]
        actor: String,
        id: String,
    },

    RejectContest {
        #[arg(long = "as")]
        actor: String,
        id: String,
    },

    /// Cancels an upcoming contest and refunds its participants.
    CancelContest {
        #[arg(long = "as")]
        actor: String,
        id: String,
    },

    /// Registers a user for a contest, charging the entry fee.
    Join { email: String, contest_id: String },

    /// Advances contest statuses to the current time.
    Sweep,

    /// Pays prizes and points for a finished contest.
    Settle {
        #[arg(long = "as")]
        actor: String,
        contest_id: String,
        results: PathBuf,
    },

    /// Lists users whose balance disagrees with their transactions.
    Verify,

    /// Prints the standings.
    Rank,

    Audit {
        #[arg(long = "as")]
        actor: String,
    },
}

/// Runs one command and returns the lines to print.
pub fn run<S: Store>(service: &mut Service<S>, command: Command, now: i64) -> anyhow::Result<Vec<String>> {
    let lines = match command {
        Command::SeedAdmin { name, email, password } => {
            let user = service.seed_super_admin(&name, &email, &password, now)?;
            vec![format!("Seeded super admin {}", user.email)]
        }
        Command::Register { name, email, password } => {
            let user = service.register_user(&name, &email, &password, now)?;
            vec![format!("Registered {} with balance {}", user.email, user.wallet_balance)]
        }
        Command::Wallet { email } => {
            let user = service.user(&email)?;

            let mut lines = vec![format!(
                "{}: balance {}, available {}",
                user.email,
                user.wallet_balance,
                available_balance(user)
            )];
            lines.extend(user.transactions.iter().map(format_transaction));
            lines
        }
        Command::Deposit { email, amount } => {
            let user = service.deposit(&email, amount, now)?;
            vec![format!("{} balance is now {}", user.email, user.wallet_balance)]
        }
        Command::Withdraw { email, amount } => {
            let user = service.request_withdrawal(&email, amount, now)?;
            vec![format!("Withdrawal pending as {}", user.transactions[0].id)]
        }
        Command::ApproveWithdrawal {
            actor,
            email,
            transaction_id,
        } => {
            let user = service.approve_withdrawal(&actor, &email, &transaction_id, now)?;
            vec![format!("Approved, {} balance is now {}", user.email, user.wallet_balance)]
        }
        Command::DeclineWithdrawal {
            actor,
            email,
            transaction_id,
        } => {
            let user = service.decline_withdrawal(&actor, &email, &transaction_id, now)?;
            vec![format!("Declined, {} balance is still {}", user.email, user.wallet_balance)]
        }
        Command::Adjust {
            actor,
            email,
            amount,
            reason,
        } => {
            let user = service.adjust_balance(&actor, &email, amount, &reason, now)?;
            vec![format!("{} balance is now {}", user.email, user.wallet_balance)]
        }
        Command::CreateContest { actor, file } => {
            let draft: Contest = read_json(&file)?;
            let contest = service.create_contest(&actor, draft, now)?;
            vec![format!("Created contest {} ({})", contest.id, contest.title)]
        }
        Command::SubmitContest { actor, id } => {
            let contest = service.submit_contest(&actor, &id, now)?;
            vec![format!("{} is now {:?}", contest.id, contest.status)]
        }
        Command::ApproveContest { actor, id } => {
            let contest = service.approve_contest(&actor, &id, now)?;
            vec![format!("{} is now {:?}", contest.id, contest.status)]
        }
        Command::RejectContest { actor, id } => {
            let contest = service.reject_contest(&actor, &id, now)?;
            vec![format!("{} is now {:?}", contest.id, contest.status)]
        }
        Command::CancelContest { actor, id } => {
            let contest = service.cancel_contest(&actor, &id, now)?;
            vec![format!(
                "{} cancelled, refunded {} participants",
                contest.id,
                contest.participants.len()
            )]
        }
        Command::Join { email, contest_id } => {
            let contest = service.register_for_contest(&email, &contest_id, now)?;
            vec![format!(
                "Joined {} ({}/{})",
                contest.id,
                contest.participants.len(),
                contest.max_participants
            )]
        }
        Command::Sweep => {
            let changed = service.sweep_statuses(now)?;
            vec![format!("{changed} contests changed status")]
        }
        Command::Settle {
            actor,
            contest_id,
            results,
        } => {
            let results: Vec<ContestResult> = read_json(&results)?;
            let contest = service.settle_contest(&actor, &contest_id, &results, now)?;
            vec![format!("Settled {} with {} results", contest.id, results.len())]
        }
        Command::Verify => {
            let broken = service.verify_ledgers();

            if broken.is_empty() {
                vec!["All ledgers consistent".to_string()]
            } else {
                broken
                    .into_iter()
                    .map(|email| format!("Inconsistent ledger: {email}"))
                    .collect()
            }
        }
        Command::Rank => service
            .standings()
            .into_iter()
            .enumerate()
            .map(|(i, user)| {
                format!(
                    "{:>3}. {:<24} {:>6}  {}",
                    i + 1,
                    user.name,
                    user.points,
                    get_rank(user.points)
                )
            })
            .collect(),
        Command::Audit { actor } => service
            .audit_log(&actor)?
            .iter()
            .map(|entry| {
                format!(
                    "{}  {:<20} {:<16} {}",
                    format_millis(entry.timestamp),
                    entry.actor,
                    entry.action,
                    entry.details
                )
            })
            .collect(),
    };

    info!("Command finished");
    Ok(lines)
}
