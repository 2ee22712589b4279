//! Typed error taxonomy shared by every layer of the service.
//!
//! Each variant carries a stable machine-readable code (`ErrorCode`)
//! that the HTTP layer maps to a transport status. Storage backends
//! wrap their own failures into `AppError::Storage`, which surfaces
//! as a generic internal error; the core never inspects it beyond
//! logging.

use thiserror::Error;

/// Stable wire codes for the error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    TeamExists,
    PrExists,
    PrMerged,
    InvalidStatus,
    NotAssigned,
    NoCandidate,
    AlreadyAssigned,
    DuplicateUserId,
    UserInAnotherTeam,
    EmptyTeam,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::TeamExists => "TEAM_EXISTS",
            ErrorCode::PrExists => "PR_EXISTS",
            ErrorCode::PrMerged => "PR_MERGED",
            ErrorCode::InvalidStatus => "INVALID_STATUS",
            ErrorCode::NotAssigned => "NOT_ASSIGNED",
            ErrorCode::NoCandidate => "NO_CANDIDATE",
            ErrorCode::AlreadyAssigned => "ALREADY_ASSIGNED",
            ErrorCode::DuplicateUserId => "DUPLICATE_USER_ID",
            ErrorCode::UserInAnotherTeam => "USER_IN_ANOTHER_TEAM",
            ErrorCode::EmptyTeam => "EMPTY_TEAM",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Domain error returned by repositories and services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("team not found")]
    TeamNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("pull request not found")]
    PrNotFound,

    #[error("team already exists")]
    TeamExists,

    #[error("pull request already exists")]
    PrExists,

    #[error("pull request already merged")]
    PrMerged,

    /// A persisted status string was neither OPEN nor MERGED.
    #[error("invalid pull request status: {0}")]
    InvalidStatus(String),

    #[error("reviewer is not assigned to this pull request")]
    NotAssigned,

    #[error("no candidate reviewer available")]
    NoCandidate,

    #[error("new reviewer already assigned")]
    AlreadyAssigned,

    #[error("duplicate user id in member list")]
    DuplicateUserId,

    #[error("user already belongs to another team")]
    UserInAnotherTeam,

    #[error("team must have at least one member")]
    EmptyTeam,

    /// Opaque persistence failure (connectivity, corruption, ...).
    /// Propagated unchanged; callers do not retry.
    #[error("storage failure during {op}: {message}")]
    Storage { op: &'static str, message: String },
}

impl AppError {
    pub fn storage(op: &'static str, message: impl Into<String>) -> Self {
        AppError::Storage {
            op,
            message: message.into(),
        }
    }

    /// The stable machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::TeamNotFound | AppError::UserNotFound | AppError::PrNotFound => {
                ErrorCode::NotFound
            }
            AppError::TeamExists => ErrorCode::TeamExists,
            AppError::PrExists => ErrorCode::PrExists,
            AppError::PrMerged => ErrorCode::PrMerged,
            AppError::InvalidStatus(_) => ErrorCode::InvalidStatus,
            AppError::NotAssigned => ErrorCode::NotAssigned,
            AppError::NoCandidate => ErrorCode::NoCandidate,
            AppError::AlreadyAssigned => ErrorCode::AlreadyAssigned,
            AppError::DuplicateUserId => ErrorCode::DuplicateUserId,
            AppError::UserInAnotherTeam => ErrorCode::UserInAnotherTeam,
            AppError::EmptyTeam => ErrorCode::EmptyTeam,
            AppError::Storage { .. } => ErrorCode::Internal,
        }
    }
}
