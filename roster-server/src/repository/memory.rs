//! In-memory implementation of the entity store.
//!
//! Backs the test suite and local development. All state is held in
//! a single `RwLock`-protected struct and lost on restart; each trait
//! method takes the lock exactly once, which is what makes the
//! conditional merge and the reviewer swap atomic.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use roster_core::{AppError, PrStatus, PullRequest, Team, TeamMember, User, UserStats};

use super::{PrRepository, TeamRepository, UserRepository};

struct StoredPr {
    pr: PullRequest,
    /// Monotonic creation sequence, used for stable ordering.
    seq: u64,
}

#[derive(Default)]
struct StoreInner {
    /// Team name -> member user ids in roster order.
    rosters: HashMap<String, Vec<String>>,
    users: HashMap<String, User>,
    prs: HashMap<String, StoredPr>,
    next_seq: u64,
}

pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreInner {
    fn assigned_pr_ids(&self, user_id: &str) -> Vec<String> {
        let mut prs: Vec<(&u64, &str)> = self
            .prs
            .values()
            .filter(|stored| stored.pr.is_reviewer(user_id))
            .map(|stored| (&stored.seq, stored.pr.id.as_str()))
            .collect();
        prs.sort_by_key(|(seq, _)| **seq);
        prs.into_iter().map(|(_, id)| id.to_string()).collect()
    }
}

#[async_trait]
impl TeamRepository for InMemoryStore {
    async fn create_team(&self, team: &Team) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if inner.rosters.contains_key(&team.name) {
            return Err(AppError::TeamExists);
        }
        inner.rosters.insert(
            team.name.clone(),
            team.members.iter().map(|m| m.user_id.clone()).collect(),
        );
        for member in &team.members {
            match inner.users.entry(member.user_id.clone()) {
                Entry::Occupied(mut entry) => {
                    // Rebind team and refresh the username; activity
                    // state is preserved for known users.
                    let user = entry.get_mut();
                    user.username = member.username.clone();
                    user.team_name = Some(team.name.clone());
                }
                Entry::Vacant(entry) => {
                    entry.insert(User {
                        user_id: member.user_id.clone(),
                        username: member.username.clone(),
                        team_name: Some(team.name.clone()),
                        is_active: member.is_active,
                    });
                }
            }
        }
        Ok(())
    }

    async fn get_team(&self, name: &str) -> Result<Team, AppError> {
        let inner = self.inner.read().await;
        let roster = inner.rosters.get(name).ok_or(AppError::TeamNotFound)?;
        let members = roster
            .iter()
            .filter_map(|id| inner.users.get(id))
            .filter(|user| user.team_name.as_deref() == Some(name))
            .map(|user| TeamMember {
                user_id: user.user_id.clone(),
                username: user.username.clone(),
                is_active: user.is_active,
            })
            .collect();
        Ok(Team {
            name: name.to_string(),
            members,
        })
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<User, AppError> {
        let inner = self.inner.read().await;
        inner
            .users
            .get(user_id)
            .cloned()
            .ok_or(AppError::UserNotFound)
    }

    async fn set_active(&self, user_id: &str, is_active: bool) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(user_id).ok_or(AppError::UserNotFound)?;
        user.is_active = is_active;
        Ok(())
    }

    async fn deactivate_team_members(&self, team_name: &str) -> Result<usize, AppError> {
        let mut inner = self.inner.write().await;
        let mut count = 0;
        for user in inner.users.values_mut() {
            if user.team_name.as_deref() == Some(team_name) {
                user.is_active = false;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl PrRepository for InMemoryStore {
    async fn create_pr(&self, pr: &PullRequest) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if inner.prs.contains_key(&pr.id) {
            return Err(AppError::PrExists);
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.prs.insert(pr.id.clone(), StoredPr { pr: pr.clone(), seq });
        Ok(())
    }

    async fn get_pr(&self, pr_id: &str) -> Result<PullRequest, AppError> {
        let inner = self.inner.read().await;
        inner
            .prs
            .get(pr_id)
            .map(|stored| stored.pr.clone())
            .ok_or(AppError::PrNotFound)
    }

    async fn merge_pr(&self, pr_id: &str) -> Result<DateTime<Utc>, AppError> {
        let mut inner = self.inner.write().await;
        let stored = inner.prs.get_mut(pr_id).ok_or(AppError::PrNotFound)?;
        match stored.pr.status {
            PrStatus::Merged => Err(AppError::PrMerged),
            PrStatus::Open => {
                let merged_at = Utc::now();
                stored.pr.status = PrStatus::Merged;
                stored.pr.merged_at = Some(merged_at);
                Ok(merged_at)
            }
        }
    }

    async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_id: &str,
        new_id: &str,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let stored = inner.prs.get_mut(pr_id).ok_or(AppError::PrNotFound)?;
        if stored.pr.is_reviewer(new_id) {
            return Err(AppError::AlreadyAssigned);
        }
        let slot = stored
            .pr
            .assigned_reviewers
            .iter()
            .position(|r| r == old_id)
            .ok_or(AppError::NotAssigned)?;
        stored.pr.assigned_reviewers.remove(slot);
        stored.pr.assigned_reviewers.push(new_id.to_string());
        Ok(())
    }

    async fn get_prs_by_reviewer(&self, user_id: &str) -> Result<Vec<PullRequest>, AppError> {
        let inner = self.inner.read().await;
        let mut matches: Vec<&StoredPr> = inner
            .prs
            .values()
            .filter(|stored| stored.pr.is_reviewer(user_id))
            .collect();
        matches.sort_by_key(|stored| stored.seq);
        Ok(matches
            .into_iter()
            .map(|stored| stored.pr.clone())
            .collect())
    }

    async fn get_user_stats(&self) -> Result<Vec<UserStats>, AppError> {
        let inner = self.inner.read().await;
        let mut stats: Vec<UserStats> = inner
            .users
            .values()
            .map(|user| {
                let assigned_prs = inner.assigned_pr_ids(&user.user_id);
                UserStats {
                    user_id: user.user_id.clone(),
                    team_name: user.team_name.clone(),
                    username: user.username.clone(),
                    assignment_count: assigned_prs.len(),
                    assigned_prs,
                }
            })
            .collect();
        // Heaviest reviewers first; user id breaks ties so the
        // output is stable.
        stats.sort_by(|a, b| {
            b.assignment_count
                .cmp(&a.assignment_count)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(stats)
    }

    async fn get_open_prs_for_team_reviewers(
        &self,
        team_name: &str,
    ) -> Result<Vec<PullRequest>, AppError> {
        let inner = self.inner.read().await;
        let team_member_ids: HashSet<&str> = inner
            .users
            .values()
            .filter(|user| user.team_name.as_deref() == Some(team_name))
            .map(|user| user.user_id.as_str())
            .collect();
        let mut matches: Vec<&StoredPr> = inner
            .prs
            .values()
            .filter(|stored| stored.pr.status == PrStatus::Open)
            .filter(|stored| {
                stored
                    .pr
                    .assigned_reviewers
                    .iter()
                    .any(|r| team_member_ids.contains(r.as_str()))
            })
            .collect();
        matches.sort_by_key(|stored| stored.seq);
        Ok(matches
            .into_iter()
            .map(|stored| stored.pr.clone())
            .collect())
    }
}
