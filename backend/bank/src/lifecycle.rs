//! # Contest Lifecycle
//!
//! ```text
//! Draft -> Pending Approval -> Upcoming -> Live -> Finished
//!                 |               |
//!                 v               v
//!              Rejected       Cancelled
//! ```
//!
//! Admins drive everything up to `Upcoming` (and the two terminal side exits).
//! `Upcoming -> Live -> Finished` is driven by the clock through [`sweep`],
//! which the server runs on an interval.
use thiserror::Error;

use crate::models::{Contest, ContestFormat, ContestStatus, TimerType};

/// Grace window after the start when no total contest timer applies.
pub const LIVE_GRACE_MS: i64 = 2 * 60 * 60 * 1000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Contest cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: ContestStatus, to: ContestStatus },
}

/// Instant after which a live contest is over.
pub fn end_boundary(contest: &Contest) -> i64 {
    match (contest.format, contest.timer_type, contest.total_contest_time) {
        (ContestFormat::FastestFinger, TimerType::TotalContest, Some(seconds)) => {
            contest
                .contest_start_date
                .saturating_add(seconds.saturating_mul(1000))
        }
        _ => contest.contest_start_date.saturating_add(LIVE_GRACE_MS),
    }
}

/// Re-evaluates a single contest against the clock. Returns the updated
/// contest only when its status changes.
///
/// Both rules run in order, so a contest whose whole window already passed
/// goes straight to `Finished` and a second pass finds nothing to do.
pub fn sweep_contest(contest: &Contest, now: i64) -> Option<Contest> {
    let mut status = contest.status;

    if status == ContestStatus::Upcoming && now >= contest.contest_start_date {
        status = ContestStatus::Live;
    }

    if status == ContestStatus::Live && now > end_boundary(contest) {
        status = ContestStatus::Finished;
    }

    (status != contest.status).then(|| Contest {
        status,
        ..contest.clone()
    })
}

/// Sweeps a whole snapshot. Unchanged contests are passed through as is.
pub fn sweep(contests: &[Contest], now: i64) -> Vec<Contest> {
    contests
        .iter()
        .map(|contest| sweep_contest(contest, now).unwrap_or_else(|| contest.clone()))
        .collect()
}

pub fn can_transition(from: ContestStatus, to: ContestStatus) -> bool {
    use ContestStatus::*;

    matches!(
        (from, to),
        (Draft, PendingApproval)
            | (PendingApproval, Upcoming)
            | (PendingApproval, Rejected)
            | (Upcoming, Live)
            | (Upcoming, Cancelled)
            | (Live, Finished)
    )
}

pub fn transition(contest: &Contest, to: ContestStatus) -> Result<Contest, LifecycleError> {
    if !can_transition(contest.status, to) {
        return Err(LifecycleError::InvalidTransition {
            from: contest.status,
            to,
        });
    }

    Ok(Contest {
        status: to,
        ..contest.clone()
    })
}

pub fn registration_open(contest: &Contest, now: i64) -> bool {
    contest.status == ContestStatus::Upcoming
        && contest.registration_start_date <= now
        && now <= contest.registration_end_date
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;

    const NOW: i64 = 1_700_000_000_000;

    fn contest(status: ContestStatus, start: i64) -> Contest {
        Contest {
            id: "c1".to_string(),
            title: "General Knowledge".to_string(),
            category: "General".to_string(),
            difficulty: Difficulty::Medium,
            status,
            registration_start_date: start - 86_400_000,
            registration_end_date: start - 60_000,
            contest_start_date: start,
            participants: Vec::new(),
            entry_fee: 50,
            max_participants: 100,
            format: ContestFormat::Kbc,
            timer_type: TimerType::PerQuestion,
            total_contest_time: None,
            prizes: Vec::new(),
            created_by: "admin@example.com".to_string(),
            settled: false,
        }
    }

    #[test]
    fn test_upcoming_goes_live() {
        let c = contest(ContestStatus::Upcoming, NOW - 1);

        let swept = sweep_contest(&c, NOW).unwrap();
        assert_eq!(swept.status, ContestStatus::Live);
    }

    #[test]
    fn test_upcoming_before_start() {
        let c = contest(ContestStatus::Upcoming, NOW + 1);

        assert!(sweep_contest(&c, NOW).is_none());
    }

    #[test]
    fn test_live_finishes_after_grace() {
        let c = contest(ContestStatus::Live, NOW - LIVE_GRACE_MS);
        assert!(sweep_contest(&c, NOW).is_none());

        let swept = sweep_contest(&c, NOW + 1).unwrap();
        assert_eq!(swept.status, ContestStatus::Finished);
    }

    #[test]
    fn test_total_timer_boundary() {
        let mut c = contest(ContestStatus::Live, NOW - 301_000);
        c.format = ContestFormat::FastestFinger;
        c.timer_type = TimerType::TotalContest;
        c.total_contest_time = Some(300);

        assert_eq!(end_boundary(&c), NOW - 1_000);
        assert_eq!(sweep_contest(&c, NOW).unwrap().status, ContestStatus::Finished);

        // the timer only counts for fastest finger contests
        c.format = ContestFormat::Kbc;
        assert!(sweep_contest(&c, NOW).is_none());
    }

    #[test]
    fn test_huge_timer_saturates() {
        let mut c = contest(ContestStatus::Live, NOW - 1_000);
        c.format = ContestFormat::FastestFinger;
        c.timer_type = TimerType::TotalContest;
        c.total_contest_time = Some(i64::MAX / 1000 + 1);

        assert_eq!(end_boundary(&c), i64::MAX);
        assert!(sweep_contest(&c, NOW).is_none());

        c.contest_start_date = i64::MAX - 10;
        c.timer_type = TimerType::PerQuestion;
        assert_eq!(end_boundary(&c), i64::MAX);
    }

    #[test]
    fn test_stale_upcoming_finishes_in_one_pass() {
        let c = contest(ContestStatus::Upcoming, NOW - LIVE_GRACE_MS - 1);

        assert_eq!(sweep_contest(&c, NOW).unwrap().status, ContestStatus::Finished);
    }

    #[test]
    fn test_sweep_idempotent() {
        let snapshot = vec![
            contest(ContestStatus::Upcoming, NOW - 1),
            contest(ContestStatus::Upcoming, NOW + 10),
            contest(ContestStatus::Live, NOW - LIVE_GRACE_MS - 5),
            contest(ContestStatus::Upcoming, NOW - LIVE_GRACE_MS - 5),
            contest(ContestStatus::Draft, NOW - 1),
            contest(ContestStatus::Cancelled, NOW - 1),
        ];

        let once = sweep(&snapshot, NOW);
        let twice = sweep(&once, NOW);

        assert_eq!(once, twice);
        assert_eq!(once[0].status, ContestStatus::Live);
        assert_eq!(once[1], snapshot[1]);
        assert_eq!(once[4], snapshot[4]);
        assert_eq!(once[5], snapshot[5]);
    }

    #[test]
    fn test_admin_transitions() {
        let draft = contest(ContestStatus::Draft, NOW);

        let pending = transition(&draft, ContestStatus::PendingApproval).unwrap();
        assert!(transition(&pending, ContestStatus::Rejected).is_ok());

        let upcoming = transition(&pending, ContestStatus::Upcoming).unwrap();
        assert!(transition(&upcoming, ContestStatus::Cancelled).is_ok());
        assert_eq!(
            transition(&upcoming, ContestStatus::Rejected),
            Err(LifecycleError::InvalidTransition {
                from: ContestStatus::Upcoming,
                to: ContestStatus::Rejected,
            })
        );
        assert!(transition(&draft, ContestStatus::Live).is_err());
    }

    #[test]
    fn test_terminal_states_stay() {
        for from in [ContestStatus::Finished, ContestStatus::Cancelled, ContestStatus::Rejected] {
            for to in [
                ContestStatus::Draft,
                ContestStatus::PendingApproval,
                ContestStatus::Upcoming,
                ContestStatus::Live,
                ContestStatus::Finished,
            ] {
                assert!(!can_transition(from, to));
            }
        }
    }

    #[test]
    fn test_registration_window() {
        let c = contest(ContestStatus::Upcoming, NOW);

        assert!(registration_open(&c, c.registration_start_date));
        assert!(registration_open(&c, c.registration_end_date));
        assert!(!registration_open(&c, c.registration_end_date + 1));
        assert!(!registration_open(&contest(ContestStatus::Draft, NOW), c.registration_start_date));
    }
}
