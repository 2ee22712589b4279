pub mod config;
pub mod http;
pub mod repository;
pub mod service;

use std::sync::Arc;

use service::{PrService, TeamService, UserService};

/// Shared application state handed to every HTTP handler.
pub struct AppState {
    pub pr_service: Arc<PrService>,
    pub team_service: Arc<TeamService>,
    pub user_service: Arc<UserService>,
}
