//! Reviewer selection policy.
//!
//! Two pool builders (creation vs. reassignment) feed a single random
//! draw. Randomness is an explicit parameter so callers can inject a
//! seeded generator in tests; there is no process-global RNG here.
//! Pools are computed fresh from the team roster at call time, so
//! membership or activity changes are always picked up.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::Team;

/// Draw up to `n` elements from `pool` without replacement.
///
/// Returns the whole pool (unshuffled) when `n >= pool.len()`; no
/// ordering guarantee otherwise.
pub fn pick_random<T, R: Rng + ?Sized>(rng: &mut R, mut pool: Vec<T>, n: usize) -> Vec<T> {
    if n >= pool.len() {
        return pool;
    }
    pool.shuffle(rng);
    pool.truncate(n);
    pool
}

/// Candidate pool for initial assignment: all active members of the
/// author's team except the author.
pub fn creation_candidates(team: &Team, author_id: &str) -> Vec<String> {
    team.active_members()
        .filter(|m| m.user_id != author_id)
        .map(|m| m.user_id.clone())
        .collect()
}

/// Candidate pool for replacing `outgoing_id` on a pull request: all
/// active members of the outgoing reviewer's team, excluding the PR
/// author, anyone already assigned, and the outgoing reviewer itself.
pub fn reassignment_candidates(
    team: &Team,
    author_id: &str,
    assigned: &[String],
    outgoing_id: &str,
) -> Vec<String> {
    team.active_members()
        .filter(|m| m.user_id != author_id && m.user_id != outgoing_id)
        .filter(|m| !assigned.iter().any(|a| *a == m.user_id))
        .map(|m| m.user_id.clone())
        .collect()
}
