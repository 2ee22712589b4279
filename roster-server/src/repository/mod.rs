//! Entity store abstraction.
//!
//! These traits are the only way services touch persistence. Each
//! call is an atomic unit: the store serializes read-check-write
//! sequences internally (transaction or single critical section), so
//! services never hold an in-process lock across a store call.
//!
//! Two backends exist: `InMemoryStore` for tests and local
//! development, `SqliteStore` for production.

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use roster_core::{AppError, PullRequest, Team, User, UserStats};

#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Create a team and upsert its members' user records. Fails
    /// `TeamExists` if the name is taken.
    async fn create_team(&self, team: &Team) -> Result<(), AppError>;

    /// Fetch a team with its members' live activity state.
    async fn get_team(&self, name: &str) -> Result<Team, AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<User, AppError>;

    async fn set_active(&self, user_id: &str, is_active: bool) -> Result<(), AppError>;

    /// Mark every member of `team_name` inactive. Returns the number
    /// of members affected (matched, whether or not they were
    /// already inactive).
    async fn deactivate_team_members(&self, team_name: &str) -> Result<usize, AppError>;
}

#[async_trait]
pub trait PrRepository: Send + Sync {
    /// Persist a new pull request with its initial reviewer set.
    /// Uniqueness of the id is enforced here, not pre-checked by the
    /// caller, so concurrent creates cannot race past each other.
    async fn create_pr(&self, pr: &PullRequest) -> Result<(), AppError>;

    async fn get_pr(&self, pr_id: &str) -> Result<PullRequest, AppError>;

    /// Atomic conditional OPEN -> MERGED transition. Exactly one of
    /// two concurrent calls wins; the loser gets `PrMerged` and is
    /// expected to fall back to the already-merged result.
    async fn merge_pr(&self, pr_id: &str) -> Result<DateTime<Utc>, AppError>;

    /// Atomically swap `old_id` for `new_id` in the reviewer set.
    /// Fails `NotAssigned` if `old_id` has already been vacated and
    /// `AlreadyAssigned` if `new_id` is already present; either way
    /// the reviewer set is left untouched.
    async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_id: &str,
        new_id: &str,
    ) -> Result<(), AppError>;

    /// All pull requests (any status) reviewed by `user_id`, in
    /// creation order.
    async fn get_prs_by_reviewer(&self, user_id: &str) -> Result<Vec<PullRequest>, AppError>;

    /// Review load for every user, heaviest first.
    async fn get_user_stats(&self) -> Result<Vec<UserStats>, AppError>;

    /// OPEN pull requests with at least one reviewer belonging to
    /// `team_name`.
    async fn get_open_prs_for_team_reviewers(
        &self,
        team_name: &str,
    ) -> Result<Vec<PullRequest>, AppError>;
}
