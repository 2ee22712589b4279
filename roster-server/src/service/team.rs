//! Team lifecycle manager, including the cascading deactivation.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use roster_core::{AppError, DeactivateTeamReport, Team};

use crate::repository::{PrRepository, TeamRepository, UserRepository};
use crate::service::PrService;

pub struct TeamService {
    teams: Arc<dyn TeamRepository>,
    users: Arc<dyn UserRepository>,
    prs: Arc<dyn PrRepository>,
    pr_service: Arc<PrService>,
    /// Whether a team may be created with no members. Historically
    /// this contract has flipped between versions, so it is policy,
    /// not a fixed rule.
    allow_empty_teams: bool,
}

impl TeamService {
    pub fn new(
        teams: Arc<dyn TeamRepository>,
        users: Arc<dyn UserRepository>,
        prs: Arc<dyn PrRepository>,
        pr_service: Arc<PrService>,
        allow_empty_teams: bool,
    ) -> Self {
        Self {
            teams,
            users,
            prs,
            pr_service,
            allow_empty_teams,
        }
    }

    /// Create a team, binding each member's user record to it.
    pub async fn add_team(&self, team: &Team) -> Result<(), AppError> {
        if team.members.is_empty() && !self.allow_empty_teams {
            return Err(AppError::EmptyTeam);
        }

        let mut seen = HashSet::new();
        for member in &team.members {
            if !seen.insert(member.user_id.as_str()) {
                return Err(AppError::DuplicateUserId);
            }
        }

        // A user belongs to at most one team; pulling a member out of
        // another team is rejected, not silently rebound.
        for member in &team.members {
            match self.users.get_user(&member.user_id).await {
                Ok(user) => {
                    if let Some(existing) = user.team_name {
                        if existing != team.name {
                            return Err(AppError::UserInAnotherTeam);
                        }
                    }
                }
                Err(AppError::UserNotFound) => {}
                Err(e) => return Err(e),
            }
        }

        match self.teams.get_team(&team.name).await {
            Ok(_) => {
                warn!("team {} already exists", team.name);
                return Err(AppError::TeamExists);
            }
            Err(AppError::TeamNotFound) => {}
            Err(e) => return Err(e),
        }

        info!("creating team {} with {} members", team.name, team.members.len());
        self.teams.create_team(team).await
    }

    pub async fn get_team(&self, name: &str) -> Result<Team, AppError> {
        self.teams.get_team(name).await
    }

    /// Cascading deactivation: first try to move this team's reviewer
    /// slots on open pull requests to other members, then mark the
    /// whole roster inactive.
    ///
    /// This is a best-effort batch. A slot with no eligible
    /// replacement (`NoCandidate`) is skipped silently — the team may
    /// be draining entirely — and any other reassignment failure is
    /// logged and skipped. Partial success is reported through the
    /// counts, never as an error.
    pub async fn deactivate_team(&self, name: &str) -> Result<DeactivateTeamReport, AppError> {
        let open_prs = self.prs.get_open_prs_for_team_reviewers(name).await?;

        let mut reassigned_prs = 0;
        for pr in &open_prs {
            for reviewer_id in &pr.assigned_reviewers {
                let user = match self.users.get_user(reviewer_id).await {
                    Ok(user) => user,
                    Err(_) => continue,
                };
                if user.team_name.as_deref() != Some(name) {
                    continue;
                }

                match self.pr_service.reassign_reviewer(&pr.id, reviewer_id).await {
                    Ok((_, new_reviewer)) => {
                        reassigned_prs += 1;
                        info!(
                            "deactivation of {}: moved reviewer {} -> {} on {}",
                            name, reviewer_id, new_reviewer, pr.id
                        );
                    }
                    Err(AppError::NoCandidate) => {}
                    Err(e) => {
                        warn!(
                            "deactivation of {}: failed to reassign {} on {}: {}",
                            name, reviewer_id, pr.id, e
                        );
                    }
                }
            }
        }

        let deactivated_users = self.users.deactivate_team_members(name).await?;

        info!(
            "team {} deactivated: {} users, {} reviewer slots reassigned",
            name, deactivated_users, reassigned_prs
        );
        Ok(DeactivateTeamReport {
            deactivated_users,
            reassigned_prs,
        })
    }
}
