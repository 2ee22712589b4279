use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// Directory for the SQLite database. Defaults to the current
    /// working directory.
    pub state_dir: PathBuf,
    /// Whether `AddTeam` accepts an empty member list. The contract
    /// here has historically gone both ways, so it is a runtime
    /// policy rather than a hard rule. Defaults to rejecting.
    pub allow_empty_teams: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let allow_empty_teams = env::var("ALLOW_EMPTY_TEAMS")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        Ok(Config {
            port,
            state_dir,
            allow_empty_teams,
        })
    }

    /// Path of the SQLite database file under `state_dir`.
    pub fn database_path(&self) -> PathBuf {
        self.state_dir.join("roster.db")
    }
}
