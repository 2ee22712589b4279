//! Domain model and reviewer-selection policy for the roster service.
//!
//! This crate is purely synchronous and I/O-free: it defines the
//! entities (users, teams, pull requests), the typed error taxonomy
//! shared across all layers, and the candidate-pool / random-draw
//! logic that decides who reviews what. Storage and HTTP concerns
//! live in `roster-server`.

pub mod error;
pub mod models;
pub mod selection;

pub use error::{AppError, ErrorCode};
pub use models::{
    DeactivateTeamReport, PrStatus, PullRequest, Team, TeamMember, User, UserStats,
};
