//! Pull request lifecycle manager.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use roster_core::selection::{creation_candidates, pick_random, reassignment_candidates};
use roster_core::{AppError, PrStatus, PullRequest, UserStats};

use crate::repository::{PrRepository, TeamRepository, UserRepository};

/// Reviewers drawn for a freshly created pull request.
const INITIAL_REVIEWER_COUNT: usize = 2;

pub struct PrService {
    prs: Arc<dyn PrRepository>,
    users: Arc<dyn UserRepository>,
    teams: Arc<dyn TeamRepository>,
    /// Seedable so tests get deterministic draws. The guard is always
    /// dropped before any store call.
    rng: Mutex<StdRng>,
}

impl PrService {
    pub fn new(
        prs: Arc<dyn PrRepository>,
        users: Arc<dyn UserRepository>,
        teams: Arc<dyn TeamRepository>,
    ) -> Self {
        Self::with_rng(prs, users, teams, StdRng::from_entropy())
    }

    pub fn with_rng(
        prs: Arc<dyn PrRepository>,
        users: Arc<dyn UserRepository>,
        teams: Arc<dyn TeamRepository>,
        rng: StdRng,
    ) -> Self {
        Self {
            prs,
            users,
            teams,
            rng: Mutex::new(rng),
        }
    }

    fn draw(&self, pool: Vec<String>, count: usize) -> Vec<String> {
        let mut rng = self.rng.lock().expect("mutex poisoned");
        pick_random(&mut *rng, pool, count)
    }

    /// Create a pull request and assign up to two reviewers from the
    /// author's team. An empty candidate pool is not an error; the PR
    /// simply starts with no reviewers.
    pub async fn create_pr(
        &self,
        id: &str,
        name: &str,
        author_id: &str,
    ) -> Result<PullRequest, AppError> {
        info!("creating pull request {} for author {}", id, author_id);

        let author = self.users.get_user(author_id).await?;
        let team_name = author.team_name.ok_or(AppError::TeamNotFound)?;
        let team = self.teams.get_team(&team_name).await?;

        let reviewers = self.draw(
            creation_candidates(&team, author_id),
            INITIAL_REVIEWER_COUNT,
        );

        let pr = PullRequest {
            id: id.to_string(),
            name: name.to_string(),
            author_id: author_id.to_string(),
            status: PrStatus::Open,
            assigned_reviewers: reviewers,
            created_at: Some(chrono::Utc::now()),
            merged_at: None,
        };

        // Uniqueness of the id is the store's job; a pre-check here
        // would race with concurrent creates.
        self.prs.create_pr(&pr).await?;

        info!(
            "pull request {} created with reviewers {:?}",
            pr.id, pr.assigned_reviewers
        );
        Ok(pr)
    }

    pub async fn get_pr(&self, pr_id: &str) -> Result<PullRequest, AppError> {
        self.prs.get_pr(pr_id).await
    }

    /// Merge a pull request. Merging an already-merged PR is
    /// idempotent: the existing merged state comes back without an
    /// error, including when this call loses a concurrent merge race.
    pub async fn merge_pr(&self, pr_id: &str) -> Result<PullRequest, AppError> {
        let pr = self.prs.get_pr(pr_id).await?;
        if pr.status == PrStatus::Merged {
            return Ok(pr);
        }

        match self.prs.merge_pr(pr_id).await {
            Ok(merged_at) => {
                info!("pull request {} merged", pr_id);
                Ok(PullRequest {
                    status: PrStatus::Merged,
                    merged_at: Some(merged_at),
                    ..pr
                })
            }
            Err(AppError::PrMerged) => self.prs.get_pr(pr_id).await,
            Err(e) => Err(e),
        }
    }

    /// Replace `old_reviewer_id` on an open pull request with a
    /// randomly drawn active member of the outgoing reviewer's team.
    /// Returns the refreshed PR together with the new reviewer's id.
    pub async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> Result<(PullRequest, String), AppError> {
        let pr = self.prs.get_pr(pr_id).await?;
        if pr.status != PrStatus::Open {
            return Err(AppError::PrMerged);
        }
        if !pr.is_reviewer(old_reviewer_id) {
            return Err(AppError::NotAssigned);
        }

        let old_user = self.users.get_user(old_reviewer_id).await?;
        let team_name = old_user.team_name.ok_or(AppError::TeamNotFound)?;
        let team = self.teams.get_team(&team_name).await?;

        let candidates = reassignment_candidates(
            &team,
            &pr.author_id,
            &pr.assigned_reviewers,
            old_reviewer_id,
        );
        if candidates.is_empty() {
            return Err(AppError::NoCandidate);
        }
        let new_reviewer_id = self
            .draw(candidates, 1)
            .into_iter()
            .next()
            .ok_or(AppError::NoCandidate)?;

        self.prs
            .reassign_reviewer(pr_id, old_reviewer_id, &new_reviewer_id)
            .await?;

        info!(
            "pull request {}: reviewer {} replaced by {}",
            pr_id, old_reviewer_id, new_reviewer_id
        );

        let fresh = self.prs.get_pr(pr_id).await?;
        Ok((fresh, new_reviewer_id))
    }

    /// All pull requests (any status) where the user is an assigned
    /// reviewer, in creation order.
    pub async fn prs_by_reviewer(&self, user_id: &str) -> Result<Vec<PullRequest>, AppError> {
        self.users.get_user(user_id).await?;
        self.prs.get_prs_by_reviewer(user_id).await
    }

    pub async fn user_stats(&self) -> Result<Vec<UserStats>, AppError> {
        self.prs.get_user_stats().await
    }
}
