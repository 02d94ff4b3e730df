//! # Service
//!
//! Every user and admin operation of the platform, over an explicit
//! [`AppState`] backed by a [`Store`].
//!
//! Each operation works on a copy of the state and only swaps it in after the
//! store accepted the full write, so a failed save never leaves memory ahead
//! of disk.
//!
//! Error messages are shown to users as is.
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    ledger::{LedgerAction, LedgerError, apply_action, available_balance, computed_balance},
    lifecycle::{LifecycleError, registration_open, sweep_contest, transition},
    models::{AuditEntry, Contest, ContestFormat, ContestResult, ContestStatus, TimerType, User},
    permissions::{Permission, Role},
    ranking::{apply_result, is_win, ladder_winnings, leaderboard_position, leaderboard_prize},
    state::AppState,
    store::{Store, StoreError},
    utils::{normalize_email, sanitize_name, valid_email},
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("User not found")]
    UserNotFound,

    #[error("Contest not found")]
    ContestNotFound,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This account has been suspended")]
    Banned,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Minimum withdrawal amount is {0}")]
    BelowMinimumWithdrawal(i64),

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Registration for this contest is not currently open")]
    RegistrationClosed,

    #[error("You are already registered for this contest")]
    AlreadyRegistered,

    #[error("This contest is full")]
    ContestFull,

    #[error("A contest with id {0} already exists")]
    DuplicateContest(String),

    #[error("Registration must close before the contest starts")]
    InvalidSchedule,

    #[error("Only finished contests can be settled")]
    NotFinished,

    #[error("This contest has already been settled")]
    AlreadySettled,

    #[error("A super admin already exists")]
    AlreadySeeded,

    #[error("Result for {0} was reported more than once")]
    DuplicateResult(String),

    #[error("Entry fee cannot be negative")]
    InvalidEntryFee,

    #[error("A contest needs room for at least one participant")]
    InvalidCapacity,

    #[error("Total contest time must be greater than zero")]
    InvalidTimer,

    #[error("You do not have permission to perform this action ({0:?})")]
    Forbidden(Permission),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub struct Service<S: Store> {
    store: S,
    state: AppState,
}

impl<S: Store> Service<S> {
    pub fn open(store: S) -> ServiceResult<Self> {
        let state = AppState::load(&store)?;

        info!(
            "Loaded {} users and {} contests",
            state.users.len(),
            state.contests.len()
        );

        Ok(Self { store, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn user(&self, email: &str) -> ServiceResult<&User> {
        self.state
            .user(&normalize_email(email))
            .ok_or(ServiceError::UserNotFound)
    }

    pub fn contest(&self, id: &str) -> ServiceResult<&Contest> {
        self.state.contest(id).ok_or(ServiceError::ContestNotFound)
    }

    // Accounts

    /// Creates the first super admin. Refused once one exists.
    pub fn seed_super_admin(&mut self, name: &str, email: &str, password: &str, now: i64) -> ServiceResult<User> {
        if self.state.users.iter().any(|u| u.role == Role::SuperAdmin) {
            return Err(ServiceError::AlreadySeeded);
        }

        let mut next = self.state.clone();
        let mut admin = new_account(&next, name, email, password, now)?;
        admin.role = Role::SuperAdmin;

        next.users.push(admin.clone());
        audit(&mut next, &admin.email, "seed_super_admin", String::new(), now);
        self.commit(next)?;

        info!("Seeded super admin {}", admin.email);
        Ok(admin)
    }

    pub fn register_user(&mut self, name: &str, email: &str, password: &str, now: i64) -> ServiceResult<User> {
        let mut next = self.state.clone();
        let user = new_account(&next, name, email, password, now)?;

        next.users.push(user.clone());
        self.commit(next)?;

        info!("Registered {}", user.email);
        Ok(user)
    }

    /// Plaintext comparison against the stored record.
    pub fn authenticate(&self, email: &str, password: &str) -> ServiceResult<&User> {
        let user = self
            .state
            .user(&normalize_email(email))
            .filter(|user| user.password == password)
            .ok_or(ServiceError::InvalidCredentials)?;

        if user.banned {
            return Err(ServiceError::Banned);
        }

        Ok(user)
    }

    // Wallet

    pub fn deposit(&mut self, email: &str, amount: i64, now: i64) -> ServiceResult<User> {
        if amount <= 0 {
            return Err(ServiceError::InvalidAmount);
        }

        let email = self.active_user(email)?.email.clone();

        let mut next = self.state.clone();
        let user = post(&mut next, &email, &LedgerAction::Deposit { amount }, now)?;
        self.commit(next)?;

        Ok(user)
    }

    /// Places a hold; the balance only moves once finance approves it.
    pub fn request_withdrawal(&mut self, email: &str, amount: i64, now: i64) -> ServiceResult<User> {
        if amount <= 0 {
            return Err(ServiceError::InvalidAmount);
        }
        if amount < self.state.settings.min_withdrawal {
            return Err(ServiceError::BelowMinimumWithdrawal(
                self.state.settings.min_withdrawal,
            ));
        }

        let user = self.active_user(email)?;
        if available_balance(user) < amount {
            return Err(ServiceError::InsufficientFunds);
        }

        let mut next = self.state.clone();
        let user = post(&mut next, email, &LedgerAction::WithdrawalRequest { amount }, now)?;
        self.commit(next)?;

        info!("Withdrawal of {amount} requested by {}", user.email);
        Ok(user)
    }

    pub fn approve_withdrawal(&mut self, actor: &str, email: &str, transaction_id: &str, now: i64) -> ServiceResult<User> {
        self.resolve_withdrawal(actor, email, transaction_id, true, now)
    }

    pub fn decline_withdrawal(&mut self, actor: &str, email: &str, transaction_id: &str, now: i64) -> ServiceResult<User> {
        self.resolve_withdrawal(actor, email, transaction_id, false, now)
    }

    fn resolve_withdrawal(
        &mut self,
        actor: &str,
        email: &str,
        transaction_id: &str,
        approve: bool,
        now: i64,
    ) -> ServiceResult<User> {
        let actor = self.authorize(actor, Permission::ManageFinances)?.email.clone();

        let action = if approve {
            LedgerAction::WithdrawalApprove {
                transaction_id: transaction_id.to_string(),
                updated_by: actor.clone(),
            }
        } else {
            LedgerAction::WithdrawalDecline {
                transaction_id: transaction_id.to_string(),
                updated_by: actor.clone(),
            }
        };

        let mut next = self.state.clone();
        let user = post(&mut next, email, &action, now)?;

        let verb = if approve { "approve_withdrawal" } else { "decline_withdrawal" };
        audit(&mut next, &actor, verb, format!("{} {transaction_id}", user.email), now);
        self.commit(next)?;

        Ok(user)
    }

    pub fn adjust_balance(&mut self, actor: &str, email: &str, amount: i64, reason: &str, now: i64) -> ServiceResult<User> {
        if amount == 0 {
            return Err(ServiceError::InvalidAmount);
        }

        let actor = self.authorize(actor, Permission::ManageFinances)?.email.clone();

        let mut next = self.state.clone();
        let user = post(
            &mut next,
            email,
            &LedgerAction::AdminAdjustment {
                amount,
                reason: reason.to_string(),
                updated_by: actor.clone(),
            },
            now,
        )?;
        audit(
            &mut next,
            &actor,
            "adjust_balance",
            format!("{} {amount:+} ({reason})", user.email),
            now,
        );
        self.commit(next)?;

        Ok(user)
    }

    // Contests

    pub fn create_contest(&mut self, actor: &str, draft: Contest, now: i64) -> ServiceResult<Contest> {
        let actor = self.authorize(actor, Permission::ManageContests)?.email.clone();

        if draft.registration_start_date > draft.registration_end_date
            || draft.registration_end_date > draft.contest_start_date
        {
            return Err(ServiceError::InvalidSchedule);
        }
        if draft.entry_fee < 0 {
            return Err(ServiceError::InvalidEntryFee);
        }
        if draft.max_participants == 0 {
            return Err(ServiceError::InvalidCapacity);
        }
        if draft.timer_type == TimerType::TotalContest && !draft.total_contest_time.is_some_and(|seconds| seconds > 0) {
            return Err(ServiceError::InvalidTimer);
        }

        let id = if draft.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            draft.id.clone()
        };
        if self.state.contest(&id).is_some() {
            return Err(ServiceError::DuplicateContest(id));
        }

        let contest = Contest {
            id,
            status: ContestStatus::Draft,
            participants: Vec::new(),
            settled: false,
            created_by: actor.clone(),
            ..draft
        };

        let mut next = self.state.clone();
        next.contests.push(contest.clone());
        audit(&mut next, &actor, "create_contest", contest.id.clone(), now);
        self.commit(next)?;

        Ok(contest)
    }

    pub fn submit_contest(&mut self, actor: &str, id: &str, now: i64) -> ServiceResult<Contest> {
        self.move_contest(actor, id, ContestStatus::PendingApproval, Permission::ManageContests, now)
    }

    pub fn approve_contest(&mut self, actor: &str, id: &str, now: i64) -> ServiceResult<Contest> {
        self.move_contest(actor, id, ContestStatus::Upcoming, Permission::ApproveContests, now)
    }

    pub fn reject_contest(&mut self, actor: &str, id: &str, now: i64) -> ServiceResult<Contest> {
        self.move_contest(actor, id, ContestStatus::Rejected, Permission::ApproveContests, now)
    }

    /// Cancels an upcoming contest and refunds every participant's entry fee.
    pub fn cancel_contest(&mut self, actor: &str, id: &str, now: i64) -> ServiceResult<Contest> {
        let actor = self.authorize(actor, Permission::ManageContests)?.email.clone();
        let cancelled = transition(self.contest(id)?, ContestStatus::Cancelled)?;

        let mut next = self.state.clone();
        if let Some(contest) = next.contest_mut(id) {
            *contest = cancelled.clone();
        }

        if cancelled.entry_fee > 0 {
            for email in &cancelled.participants {
                let refund = LedgerAction::Refund {
                    contest_id: cancelled.id.clone(),
                    amount: cancelled.entry_fee,
                };

                if let Err(e) = post(&mut next, email, &refund, now) {
                    warn!("Could not refund {email} for contest {id}: {e}");
                }
            }
        }

        audit(
            &mut next,
            &actor,
            "cancel_contest",
            format!("{id} ({} refunds)", cancelled.participants.len()),
            now,
        );
        self.commit(next)?;

        info!("Cancelled contest {id}");
        Ok(cancelled)
    }

    fn move_contest(
        &mut self,
        actor: &str,
        id: &str,
        to: ContestStatus,
        permission: Permission,
        now: i64,
    ) -> ServiceResult<Contest> {
        let actor = self.authorize(actor, permission)?.email.clone();
        let moved = transition(self.contest(id)?, to)?;

        let mut next = self.state.clone();
        if let Some(contest) = next.contest_mut(id) {
            *contest = moved.clone();
        }
        audit(&mut next, &actor, "contest_status", format!("{id} -> {to:?}"), now);
        self.commit(next)?;

        Ok(moved)
    }

    /// Funds are checked here, before the entry fee ever reaches the ledger.
    pub fn register_for_contest(&mut self, email: &str, contest_id: &str, now: i64) -> ServiceResult<Contest> {
        let user = self.active_user(email)?;
        let contest = self.contest(contest_id)?;

        if !registration_open(contest, now) {
            return Err(ServiceError::RegistrationClosed);
        }
        if contest.has_participant(&user.email) {
            return Err(ServiceError::AlreadyRegistered);
        }
        if contest.is_full() {
            return Err(ServiceError::ContestFull);
        }
        if available_balance(user) < contest.entry_fee {
            return Err(ServiceError::InsufficientFunds);
        }

        let email = user.email.clone();
        let entry_fee = contest.entry_fee;

        let mut next = self.state.clone();
        if entry_fee > 0 {
            let fee = LedgerAction::EntryFee {
                contest_id: contest_id.to_string(),
                amount: entry_fee,
            };
            post(&mut next, &email, &fee, now)?;
        }

        let contest = next.contest_mut(contest_id).ok_or(ServiceError::ContestNotFound)?;
        contest.participants.push(email.clone());
        let contest = contest.clone();
        self.commit(next)?;

        info!("{email} joined contest {contest_id}");
        Ok(contest)
    }

    /// Runs the status sweep over every contest. Only writes when something
    /// changed.
    pub fn sweep_statuses(&mut self, now: i64) -> ServiceResult<usize> {
        let mut next = self.state.clone();
        let mut changed = 0;

        for contest in &mut next.contests {
            if let Some(swept) = sweep_contest(contest, now) {
                info!("Contest {} is now {:?}", swept.id, swept.status);
                *contest = swept;
                changed += 1;
            }
        }

        if changed > 0 {
            self.commit(next)?;
        }

        Ok(changed)
    }

    /// Pays prizes and updates ranking for a finished contest.
    pub fn settle_contest(
        &mut self,
        actor: &str,
        contest_id: &str,
        results: &[ContestResult],
        now: i64,
    ) -> ServiceResult<Contest> {
        let actor = self.authorize(actor, Permission::ManageContests)?.email.clone();
        let contest = self.contest(contest_id)?.clone();

        if contest.status != ContestStatus::Finished {
            return Err(ServiceError::NotFinished);
        }
        if contest.settled {
            return Err(ServiceError::AlreadySettled);
        }

        let results = participant_results(&contest, results)?;
        let mut next = self.state.clone();

        for result in &results {
            let won = is_win(contest.format, result, &results);
            let prize = match contest.format {
                ContestFormat::Kbc => ladder_winnings(&contest.prizes, result.score),
                ContestFormat::FastestFinger => leaderboard_position(&results, &result.email)
                    .map_or(0, |position| leaderboard_prize(&contest.prizes, position)),
            };

            if prize > 0 {
                let win = LedgerAction::Win {
                    contest_id: contest_id.to_string(),
                    amount: prize,
                };
                post(&mut next, &result.email, &win, now)?;
            }

            let user = next.user_mut(&result.email).ok_or(ServiceError::UserNotFound)?;
            *user = apply_result(user, &contest, result, won, now);
        }

        let settled = next.contest_mut(contest_id).ok_or(ServiceError::ContestNotFound)?;
        settled.settled = true;
        let settled = settled.clone();

        audit(&mut next, &actor, "settle_contest", format!("{contest_id} ({} results)", results.len()), now);
        self.commit(next)?;

        Ok(settled)
    }

    // Administration

    pub fn set_banned(&mut self, actor: &str, email: &str, banned: bool, now: i64) -> ServiceResult<User> {
        let actor = self.authorize(actor, Permission::ManageUsers)?.email.clone();

        let mut next = self.state.clone();
        let user = next
            .user_mut(&normalize_email(email))
            .ok_or(ServiceError::UserNotFound)?;
        user.banned = banned;
        let user = user.clone();

        let verb = if banned { "ban_user" } else { "unban_user" };
        audit(&mut next, &actor, verb, user.email.clone(), now);
        self.commit(next)?;

        Ok(user)
    }

    pub fn set_role(&mut self, actor: &str, email: &str, role: Role, now: i64) -> ServiceResult<User> {
        let actor = self.authorize(actor, Permission::ManageRoles)?.email.clone();

        let mut next = self.state.clone();
        let user = next
            .user_mut(&normalize_email(email))
            .ok_or(ServiceError::UserNotFound)?;
        user.role = role;
        let user = user.clone();

        audit(&mut next, &actor, "set_role", format!("{} -> {role:?}", user.email), now);
        self.commit(next)?;

        Ok(user)
    }

    pub fn set_permission(
        &mut self,
        actor: &str,
        role: Role,
        permission: Permission,
        granted: bool,
        now: i64,
    ) -> ServiceResult<()> {
        let actor = self.authorize(actor, Permission::ManageRoles)?.email.clone();

        let mut next = self.state.clone();
        if granted {
            next.settings.role_permissions.grant(role, permission);
        } else {
            next.settings.role_permissions.revoke(role, permission);
        }

        audit(
            &mut next,
            &actor,
            "set_permission",
            format!("{role:?} {permission:?} = {granted}"),
            now,
        );
        self.commit(next)
    }

    pub fn audit_log(&self, actor: &str) -> ServiceResult<&[AuditEntry]> {
        self.authorize(actor, Permission::ViewAuditLog)?;

        Ok(&self.state.audit_log)
    }

    /// Users whose stored balance disagrees with their transaction history.
    pub fn verify_ledgers(&self) -> Vec<String> {
        self.state
            .users
            .iter()
            .filter(|user| user.wallet_balance != computed_balance(&user.transactions))
            .map(|user| user.email.clone())
            .collect()
    }

    /// Users ordered by points, best first.
    pub fn standings(&self) -> Vec<&User> {
        let mut users: Vec<&User> = self.state.users.iter().collect();
        users.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.email.cmp(&b.email)));
        users
    }

    fn active_user(&self, email: &str) -> ServiceResult<&User> {
        let user = self.user(email)?;

        if user.banned {
            return Err(ServiceError::Banned);
        }

        Ok(user)
    }

    fn authorize(&self, actor: &str, permission: Permission) -> ServiceResult<&User> {
        let user = self.active_user(actor)?;

        if !self.state.settings.role_permissions.allows(user.role, permission) {
            warn!("{} denied {permission:?}", user.email);
            return Err(ServiceError::Forbidden(permission));
        }

        Ok(user)
    }

    fn commit(&mut self, next: AppState) -> ServiceResult<()> {
        next.save(&mut self.store)?;
        self.state = next;

        Ok(())
    }
}

fn new_account(state: &AppState, name: &str, email: &str, password: &str, now: i64) -> ServiceResult<User> {
    let name = sanitize_name(name);
    let email = normalize_email(email);

    if name.is_empty() {
        return Err(ServiceError::EmptyName);
    }
    if !valid_email(&email) {
        return Err(ServiceError::InvalidEmail);
    }
    if state.user(&email).is_some() {
        return Err(ServiceError::EmailTaken);
    }

    let user = User::new(&name, &email, password, now);
    let bonus = LedgerAction::SignupBonus {
        amount: state.settings.signup_bonus,
    };

    Ok(apply_action(&user, &bonus, now)?)
}

/// Results of registered participants only, with normalized emails, so
/// strays never take a leaderboard slot. A participant reported twice is
/// refused outright.
fn participant_results(contest: &Contest, results: &[ContestResult]) -> ServiceResult<Vec<ContestResult>> {
    let mut kept: Vec<ContestResult> = Vec::with_capacity(results.len());

    for result in results {
        let email = normalize_email(&result.email);

        if !contest.has_participant(&email) {
            warn!("Ignoring result for {email}, not registered in {}", contest.id);
            continue;
        }
        if kept.iter().any(|r| r.email == email) {
            return Err(ServiceError::DuplicateResult(email));
        }

        kept.push(ContestResult { email, ..result.clone() });
    }

    Ok(kept)
}

/// Runs one ledger action against the user stored in `state`.
fn post(state: &mut AppState, email: &str, action: &LedgerAction, now: i64) -> ServiceResult<User> {
    let user = state
        .user_mut(&normalize_email(email))
        .ok_or(ServiceError::UserNotFound)?;

    *user = apply_action(user, action, now)?;
    Ok(user.clone())
}

fn audit(state: &mut AppState, actor: &str, action: &str, details: String, now: i64) {
    state.audit_log.insert(
        0,
        AuditEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: now,
            actor: actor.to_string(),
            action: action.to_string(),
            details,
        },
    );
}
