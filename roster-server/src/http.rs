//! HTTP surface: route table, request/response shapes, and the
//! domain-error to status-code mapping.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use roster_core::{AppError, ErrorCode, Team};

use crate::AppState;

/// Error as seen by an HTTP client. Validation failures never reach
/// the domain layer, so they get their own variant and code.
#[derive(Debug)]
pub enum ApiError {
    Domain(AppError),
    Validation(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::Domain(err)
    }
}

impl ApiError {
    fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(err) => match err.code() {
                ErrorCode::NotFound => StatusCode::NOT_FOUND,
                ErrorCode::TeamExists
                | ErrorCode::PrExists
                | ErrorCode::PrMerged
                | ErrorCode::NoCandidate
                | ErrorCode::NotAssigned
                | ErrorCode::AlreadyAssigned => StatusCode::CONFLICT,
                ErrorCode::DuplicateUserId
                | ErrorCode::UserInAnotherTeam
                | ErrorCode::EmptyTeam => StatusCode::BAD_REQUEST,
                ErrorCode::InvalidStatus | ErrorCode::Internal => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match &self {
            ApiError::Validation(message) => ("VALIDATION_ERROR", message.clone()),
            // Internal details stay out of the response body.
            ApiError::Domain(err) if err.code() == ErrorCode::Internal => {
                tracing::error!("internal error: {err}");
                ("INTERNAL", "server error".to_string())
            }
            ApiError::Domain(err) => (err.code().as_str(), err.to_string()),
        };
        let body = json!({ "error": { "code": code, "message": message } });
        (status, Json(body)).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/team/add", post(add_team))
        .route("/team/get", get(get_team))
        .route("/team/deactivate", post(deactivate_team))
        .route("/users/setIsActive", post(set_user_active))
        .route("/users/getReview", get(get_prs_by_reviewer))
        .route("/users/stats", get(user_stats))
        .route("/pullRequest/create", post(create_pr))
        .route("/pullRequest/merge", post(merge_pr))
        .route("/pullRequest/reassign", post(reassign_reviewer))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn add_team(
    State(state): State<Arc<AppState>>,
    Json(team): Json<Team>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if team.name.is_empty() {
        return Err(ApiError::validation("team_name is required"));
    }
    for member in &team.members {
        if member.user_id.is_empty() || member.username.is_empty() {
            return Err(ApiError::validation(
                "member user_id and username are required",
            ));
        }
    }

    state.team_service.add_team(&team).await?;
    info!("team {} created via HTTP", team.name);
    Ok(Json(json!({ "status": "ok" })))
}

#[derive(Deserialize)]
struct TeamQuery {
    #[serde(default)]
    team_name: String,
}

async fn get_team(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TeamQuery>,
) -> Result<Json<Team>, ApiError> {
    if query.team_name.is_empty() {
        return Err(ApiError::validation("team_name is required"));
    }
    let team = state.team_service.get_team(&query.team_name).await?;
    Ok(Json(team))
}

#[derive(Deserialize)]
struct DeactivateTeamRequest {
    #[serde(default)]
    team_name: String,
}

async fn deactivate_team(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeactivateTeamRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.team_name.is_empty() {
        return Err(ApiError::validation("team_name is required"));
    }
    let report = state.team_service.deactivate_team(&req.team_name).await?;
    Ok(Json(json!({
        "team_name": req.team_name,
        "deactivated_users": report.deactivated_users,
        "reassigned_prs": report.reassigned_prs,
    })))
}

#[derive(Deserialize)]
struct SetUserActiveRequest {
    #[serde(default)]
    user_id: String,
    is_active: bool,
}

async fn set_user_active(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetUserActiveRequest>,
) -> Result<Json<roster_core::User>, ApiError> {
    if req.user_id.is_empty() {
        return Err(ApiError::validation("user_id is required"));
    }
    let user = state
        .user_service
        .set_active(&req.user_id, req.is_active)
        .await?;
    Ok(Json(user))
}

#[derive(Deserialize)]
struct ReviewerQuery {
    #[serde(default)]
    user_id: String,
}

async fn get_prs_by_reviewer(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReviewerQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if query.user_id.is_empty() {
        return Err(ApiError::validation("user_id is required"));
    }
    let prs = state.pr_service.prs_by_reviewer(&query.user_id).await?;
    Ok(Json(json!({ "pull_requests": prs })))
}

async fn user_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = state.pr_service.user_stats().await?;
    Ok(Json(json!({ "stats": stats })))
}

#[derive(Deserialize)]
struct CreatePrRequest {
    #[serde(default)]
    pull_request_id: String,
    #[serde(default)]
    pull_request_name: String,
    #[serde(default)]
    author_id: String,
}

async fn create_pr(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePrRequest>,
) -> Result<Response, ApiError> {
    if req.pull_request_id.is_empty() || req.pull_request_name.is_empty() {
        return Err(ApiError::validation(
            "pull_request_id and pull_request_name are required",
        ));
    }
    if req.author_id.is_empty() {
        return Err(ApiError::validation("author_id is required"));
    }

    let pr = state
        .pr_service
        .create_pr(&req.pull_request_id, &req.pull_request_name, &req.author_id)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "pr": pr }))).into_response())
}

#[derive(Deserialize)]
struct MergePrRequest {
    #[serde(default)]
    pull_request_id: String,
}

async fn merge_pr(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MergePrRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.pull_request_id.is_empty() {
        return Err(ApiError::validation("pull_request_id is required"));
    }
    let pr = state.pr_service.merge_pr(&req.pull_request_id).await?;
    Ok(Json(json!({ "pr": pr })))
}

#[derive(Deserialize)]
struct ReassignRequest {
    #[serde(default)]
    pull_request_id: String,
    #[serde(default)]
    old_reviewer_id: String,
}

async fn reassign_reviewer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReassignRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.pull_request_id.is_empty() || req.old_reviewer_id.is_empty() {
        return Err(ApiError::validation(
            "pull_request_id and old_reviewer_id are required",
        ));
    }
    let (pr, replaced_by) = state
        .pr_service
        .reassign_reviewer(&req.pull_request_id, &req.old_reviewer_id)
        .await?;
    Ok(Json(json!({ "pr": pr, "replaced_by": replaced_by })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tower::ServiceExt;

    use crate::repository::InMemoryStore;
    use crate::service::{PrService, TeamService, UserService};

    fn app() -> Router {
        let store = Arc::new(InMemoryStore::new());
        let pr_service = Arc::new(PrService::with_rng(
            store.clone(),
            store.clone(),
            store.clone(),
            StdRng::seed_from_u64(17),
        ));
        let team_service = Arc::new(TeamService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            pr_service.clone(),
            false,
        ));
        let user_service = Arc::new(UserService::new(store));
        router(Arc::new(AppState {
            pr_service,
            team_service,
            user_service,
        }))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn add_team_without_name_is_a_validation_error() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/team/add",
            Some(json!({ "team_name": "", "members": [] })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn create_pr_without_author_is_a_validation_error() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/pullRequest/create",
            Some(json!({ "pull_request_id": "pr-1", "pull_request_name": "Fix" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn reassign_without_reviewer_is_a_validation_error() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/pullRequest/reassign",
            Some(json!({ "pull_request_id": "pr-1", "old_reviewer_id": "" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_team_yields_not_found_envelope() {
        let app = app();
        let (status, body) = send(&app, "GET", "/team/get?team_name=ghost", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert!(body["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn team_and_pr_flow_over_http() {
        let app = app();
        let team = json!({
            "team_name": "backend",
            "members": [
                { "user_id": "u1", "username": "alice" },
                { "user_id": "u2", "username": "bob" },
                { "user_id": "u3", "username": "carol" },
            ],
        });

        let (status, body) = send(&app, "POST", "/team/add", Some(team.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        // The same name again comes back as a conflict envelope.
        let (status, body) = send(&app, "POST", "/team/add", Some(team)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "TEAM_EXISTS");

        let (status, body) = send(
            &app,
            "POST",
            "/pullRequest/create",
            Some(json!({
                "pull_request_id": "pr-1",
                "pull_request_name": "Add search",
                "author_id": "u1",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["pr"]["pull_request_id"], "pr-1");
        assert_eq!(body["pr"]["status"], "OPEN");
        assert_eq!(body["pr"]["assigned_reviewers"].as_array().unwrap().len(), 2);

        let (status, body) = send(&app, "GET", "/users/getReview?user_id=u2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pull_requests"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn conflict_codes_map_to_409() {
        for err in [
            AppError::TeamExists,
            AppError::PrExists,
            AppError::PrMerged,
            AppError::NoCandidate,
            AppError::NotAssigned,
            AppError::AlreadyAssigned,
        ] {
            assert_eq!(ApiError::Domain(err).status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn lookup_failures_map_to_404() {
        for err in [
            AppError::TeamNotFound,
            AppError::UserNotFound,
            AppError::PrNotFound,
        ] {
            assert_eq!(ApiError::Domain(err).status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn composition_failures_map_to_400() {
        for err in [
            AppError::DuplicateUserId,
            AppError::UserInAnotherTeam,
            AppError::EmptyTeam,
        ] {
            assert_eq!(ApiError::Domain(err).status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(
            ApiError::validation("nope").status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn storage_failures_map_to_500() {
        let err = AppError::storage("get_pr", "db gone");
        assert_eq!(
            ApiError::Domain(err).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
