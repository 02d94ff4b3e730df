//! # Ranking
//!
//! Points and tiers earned from finished contests.
//!
//! ## Points
//! `earned = base + (win ? bonus : penalty)` per difficulty. The penalty
//! always outweighs the base, so a loss never adds points. Totals are floored
//! at zero after every update.
//!
//! ## Wins
//! - KBC: cleared at least one ladder level
//! - Fastest Finger: top 3 by score descending, then time ascending
use std::cmp::Reverse;

use crate::models::{Contest, ContestFormat, ContestResult, Difficulty, HistoryEntry, User};

pub const LEADERBOARD_WINNERS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointsRow {
    pub base: i64,
    pub win_bonus: i64,
    pub loss_penalty: i64,
}

pub const fn points_row(difficulty: Difficulty) -> PointsRow {
    match difficulty {
        Difficulty::Easy => PointsRow {
            base: 10,
            win_bonus: 10,
            loss_penalty: -15,
        },
        Difficulty::Medium => PointsRow {
            base: 20,
            win_bonus: 20,
            loss_penalty: -25,
        },
        Difficulty::Hard => PointsRow {
            base: 30,
            win_bonus: 40,
            loss_penalty: -35,
        },
    }
}

pub fn points_earned(difficulty: Difficulty, is_win: bool) -> i64 {
    let row = points_row(difficulty);

    row.base + if is_win { row.win_bonus } else { row.loss_penalty }
}

/// Tier thresholds, ascending.
pub const RANKS: [(i64, &str); 6] = [
    (0, "Beginner"),
    (100, "Bronze"),
    (250, "Silver"),
    (500, "Gold"),
    (1000, "Platinum"),
    (2000, "Diamond"),
];

pub fn get_rank(points: i64) -> &'static str {
    RANKS
        .iter()
        .rev()
        .find(|(threshold, _)| points >= *threshold)
        .map_or(RANKS[0].1, |(_, name)| *name)
}

/// Results ordered best first: score descending, then time ascending.
pub fn leaderboard(results: &[ContestResult]) -> Vec<&ContestResult> {
    let mut ordered: Vec<&ContestResult> = results.iter().collect();
    ordered.sort_by_key(|result| (Reverse(result.score), result.time_taken_ms));
    ordered
}

/// Zero based leaderboard position of `email`, if it played.
pub fn leaderboard_position(results: &[ContestResult], email: &str) -> Option<usize> {
    leaderboard(results)
        .iter()
        .position(|result| result.email == email)
}

pub fn is_win(format: ContestFormat, result: &ContestResult, results: &[ContestResult]) -> bool {
    match format {
        ContestFormat::Kbc => result.score > 0,
        ContestFormat::FastestFinger => leaderboard_position(results, &result.email)
            .is_some_and(|position| position < LEADERBOARD_WINNERS),
    }
}

/// Prize for the highest ladder level cleared. `prizes[0]` is level one.
pub fn ladder_winnings(prizes: &[i64], levels_cleared: i64) -> i64 {
    if levels_cleared <= 0 {
        return 0;
    }

    let level = (levels_cleared as usize).min(prizes.len());
    level.checked_sub(1).map_or(0, |index| prizes[index])
}

pub fn leaderboard_prize(prizes: &[i64], position: usize) -> i64 {
    prizes.get(position).copied().unwrap_or(0)
}

/// Folds one contest outcome into the user's points and history.
pub fn apply_result(user: &User, contest: &Contest, result: &ContestResult, is_win: bool, now: i64) -> User {
    let points_delta = points_earned(contest.difficulty, is_win);

    let mut next = user.clone();
    next.points = (next.points + points_delta).max(0);
    next.history.insert(
        0,
        HistoryEntry {
            contest_id: contest.id.clone(),
            difficulty: contest.difficulty,
            category: contest.category.clone(),
            result: result.score,
            points_delta,
            timestamp: now,
        },
    );

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContestStatus, TimerType};

    fn result(email: &str, score: i64, time_taken_ms: i64) -> ContestResult {
        ContestResult {
            email: email.to_string(),
            score,
            time_taken_ms,
        }
    }

    #[test]
    fn test_loss_never_positive() {
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert!(points_earned(difficulty, false) <= 0);
            assert!(points_earned(difficulty, true) >= 0);
        }
        assert_eq!(points_earned(Difficulty::Hard, true), 70);
        assert_eq!(points_earned(Difficulty::Easy, false), -5);
    }

    #[test]
    fn test_rank_monotonic() {
        let mut previous = 0;

        for points in (-10..2500).step_by(7) {
            let tier = RANKS
                .iter()
                .position(|(_, name)| *name == get_rank(points))
                .unwrap();
            assert!(tier >= previous);
            previous = tier;
        }

        assert_eq!(get_rank(-3), "Beginner");
        assert_eq!(get_rank(99), "Beginner");
        assert_eq!(get_rank(100), "Bronze");
        assert_eq!(get_rank(5000), "Diamond");
    }

    #[test]
    fn test_leaderboard_order() {
        let results = vec![
            result("a@x.com", 8, 40_000),
            result("b@x.com", 9, 50_000),
            result("c@x.com", 8, 30_000),
            result("d@x.com", 2, 10_000),
        ];

        let order: Vec<&str> = leaderboard(&results)
            .iter()
            .map(|r| r.email.as_str())
            .collect();
        assert_eq!(order, vec!["b@x.com", "c@x.com", "a@x.com", "d@x.com"]);

        assert!(is_win(ContestFormat::FastestFinger, &results[0], &results));
        assert!(!is_win(ContestFormat::FastestFinger, &results[3], &results));
    }

    #[test]
    fn test_kbc_win() {
        let results = vec![result("a@x.com", 0, 0), result("b@x.com", 1, 0)];

        assert!(!is_win(ContestFormat::Kbc, &results[0], &results));
        assert!(is_win(ContestFormat::Kbc, &results[1], &results));
    }

    #[test]
    fn test_ladder_winnings() {
        let ladder = [100, 200, 500, 1000];

        assert_eq!(ladder_winnings(&ladder, 0), 0);
        assert_eq!(ladder_winnings(&ladder, 3), 500);
        assert_eq!(ladder_winnings(&ladder, 9), 1000);
        assert_eq!(ladder_winnings(&[], 2), 0);
        assert_eq!(leaderboard_prize(&ladder, 1), 200);
        assert_eq!(leaderboard_prize(&ladder, 4), 0);
    }

    #[test]
    fn test_points_floor_and_history() {
        let contest = Contest {
            id: "c9".to_string(),
            title: "Science Sprint".to_string(),
            category: "Science".to_string(),
            difficulty: Difficulty::Hard,
            status: ContestStatus::Finished,
            registration_start_date: 0,
            registration_end_date: 0,
            contest_start_date: 0,
            participants: Vec::new(),
            entry_fee: 0,
            max_participants: 10,
            format: ContestFormat::Kbc,
            timer_type: TimerType::PerQuestion,
            total_contest_time: None,
            prizes: Vec::new(),
            created_by: String::new(),
            settled: false,
        };
        let user = User::new("Asha", "a@x.com", "pw", 0);

        let lost = apply_result(&user, &contest, &result("a@x.com", 0, 0), false, 5);
        assert_eq!(lost.points, 0);
        assert_eq!(lost.history[0].points_delta, -5);
        assert_eq!(lost.history[0].contest_id, "c9");

        let won = apply_result(&lost, &contest, &result("a@x.com", 4, 0), true, 6);
        assert_eq!(won.points, 70);
        assert_eq!(won.history.len(), 2);
        assert_eq!(won.history[0].result, 4);
    }
}
