use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, Level};

use roster_server::config::Config;
use roster_server::http::router;
use roster_server::repository::SqliteStore;
use roster_server::service::{PrService, TeamService, UserService};
use roster_server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = Config::from_env()?;

    let db_path = config.database_path();
    info!("Using state database: {}", db_path.display());
    let store = Arc::new(SqliteStore::new(&db_path)?);

    let pr_service = Arc::new(PrService::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let team_service = Arc::new(TeamService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        pr_service.clone(),
        config.allow_empty_teams,
    ));
    let user_service = Arc::new(UserService::new(store.clone()));

    let app_state = Arc::new(AppState {
        pr_service,
        team_service,
        user_service,
    });

    let app = router(app_state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
