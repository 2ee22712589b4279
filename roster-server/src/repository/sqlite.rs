//! SQLite implementation of the entity store.
//!
//! This provides persistent storage that survives service restarts.
//!
//! # Schema Versioning
//!
//! The database has a `schema_version` table that tracks the schema
//! version. When the schema needs to change, increment
//! `CURRENT_SCHEMA_VERSION` and add a migration in `run_migrations()`.
//! Migrations run sequentially from the current version to the target
//! version.
//!
//! # Concurrency
//!
//! Synchronous rusqlite calls run inside `tokio::task::spawn_blocking`
//! so they never block the async runtime. Every multi-step operation
//! (create with reviewers, conditional merge, reviewer swap) runs in
//! an immediate transaction, which is what gives the merge its
//! single-writer-wins semantic and the reviewer swap its atomicity.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use roster_core::{AppError, PrStatus, PullRequest, Team, TeamMember, User, UserStats};

use super::{PrRepository, TeamRepository, UserRepository};

/// Current schema version. Increment this when making schema changes
/// and add corresponding migration logic in `run_migrations()`.
const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed entity store.
pub struct SqliteStore {
    /// Database connection. Exposed as `pub(crate)` so tests can
    /// manipulate rows directly (e.g. to plant an invalid status).
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path and bring its
    /// schema up to date.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy().to_string();
        let is_in_memory = path_str == ":memory:";

        if !is_in_memory && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        AppError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| AppError::storage("open database", e.to_string()))?;

        // WAL must actually be enabled; SQLite can silently keep the
        // default journal mode on filesystems without shared-memory
        // support. In-memory databases report "memory", which is fine.
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| AppError::storage("set journal_mode", e.to_string()))?;
        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));
        if !journal_mode_ok {
            return Err(AppError::storage(
                "configure journal_mode",
                format!("expected WAL journal mode, got '{journal_mode}'"),
            ));
        }

        conn.execute_batch(
            r#"
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            PRAGMA foreign_keys = ON;
            "#,
        )
        .map_err(|e| AppError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| AppError::storage("create schema_version table", e.to_string()))?;

        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn new_in_memory() -> Result<Self, AppError> {
        Self::new(":memory:")
    }

    /// Run migrations from `from_version` to `CURRENT_SCHEMA_VERSION`.
    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), AppError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(AppError::storage(
                "schema version",
                format!(
                    "database schema version {from_version} is newer than supported \
                     version {CURRENT_SCHEMA_VERSION}; upgrade the application"
                ),
            ));
        }
        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS teams (
                    name TEXT PRIMARY KEY
                );

                CREATE TABLE IF NOT EXISTS users (
                    user_id TEXT PRIMARY KEY,
                    username TEXT NOT NULL,
                    team_name TEXT,
                    is_active INTEGER NOT NULL DEFAULT 1
                );
                CREATE INDEX IF NOT EXISTS idx_users_team ON users(team_name);

                CREATE TABLE IF NOT EXISTS pull_requests (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    author_id TEXT NOT NULL,
                    status TEXT NOT NULL,
                    created_at TEXT,
                    merged_at TEXT
                );

                CREATE TABLE IF NOT EXISTS pr_reviewers (
                    pr_id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    PRIMARY KEY (pr_id, user_id)
                );
                CREATE INDEX IF NOT EXISTS idx_reviewers_user ON pr_reviewers(user_id);
                "#,
            )
            .map_err(|e| AppError::storage("migration v1", e.to_string()))?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| AppError::storage("update schema version", e.to_string()))?;

        Ok(())
    }

    /// Run a closure against the connection on the blocking pool.
    async fn call<T, F>(&self, op: &'static str, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, AppError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().expect("mutex poisoned");
            f(&mut conn)
        })
        .await
        .map_err(|e| AppError::storage(op, e.to_string()))?
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn parse_timestamp(
    value: Option<String>,
    op: &'static str,
) -> Result<Option<DateTime<Utc>>, AppError> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| AppError::storage(op, format!("bad timestamp '{s}': {e}")))
        })
        .transpose()
}

/// Load a pull request with its reviewer set inside an existing
/// connection/transaction.
fn load_pr(conn: &Connection, pr_id: &str) -> Result<PullRequest, AppError> {
    let row: Option<(String, String, String, String, Option<String>, Option<String>)> = conn
        .query_row(
            "SELECT id, name, author_id, status, created_at, merged_at
             FROM pull_requests WHERE id = ?1",
            params![pr_id],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .optional()
        .map_err(|e| AppError::storage("get_pr", e.to_string()))?;

    let Some((id, name, author_id, status, created_at, merged_at)) = row else {
        return Err(AppError::PrNotFound);
    };

    let mut stmt = conn
        .prepare("SELECT user_id FROM pr_reviewers WHERE pr_id = ?1 ORDER BY rowid")
        .map_err(|e| AppError::storage("get_pr", e.to_string()))?;
    let assigned_reviewers: Vec<String> = stmt
        .query_map(params![pr_id], |row| row.get(0))
        .map_err(|e| AppError::storage("get_pr", e.to_string()))?
        .collect::<Result<_, _>>()
        .map_err(|e| AppError::storage("get_pr", e.to_string()))?;

    Ok(PullRequest {
        id,
        name,
        author_id,
        status: PrStatus::parse(&status)?,
        assigned_reviewers,
        created_at: parse_timestamp(created_at, "get_pr")?,
        merged_at: parse_timestamp(merged_at, "get_pr")?,
    })
}

#[async_trait]
impl TeamRepository for SqliteStore {
    async fn create_team(&self, team: &Team) -> Result<(), AppError> {
        let team = team.clone();
        self.call("create_team", move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| AppError::storage("create_team", e.to_string()))?;

            match tx.execute("INSERT INTO teams (name) VALUES (?1)", params![team.name]) {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => return Err(AppError::TeamExists),
                Err(e) => return Err(AppError::storage("create_team", e.to_string())),
            }

            for member in &team.members {
                // Known users keep their activity state; only the
                // username and team binding are refreshed.
                tx.execute(
                    "INSERT INTO users (user_id, username, team_name, is_active)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(user_id) DO UPDATE SET
                         username = excluded.username,
                         team_name = excluded.team_name",
                    params![member.user_id, member.username, team.name, member.is_active],
                )
                .map_err(|e| AppError::storage("create_team", e.to_string()))?;
            }

            tx.commit()
                .map_err(|e| AppError::storage("create_team", e.to_string()))
        })
        .await
    }

    async fn get_team(&self, name: &str) -> Result<Team, AppError> {
        let name = name.to_string();
        self.call("get_team", move |conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM teams WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| AppError::storage("get_team", e.to_string()))?;
            if exists.is_none() {
                return Err(AppError::TeamNotFound);
            }

            let mut stmt = conn
                .prepare(
                    "SELECT user_id, username, is_active FROM users
                     WHERE team_name = ?1 ORDER BY rowid",
                )
                .map_err(|e| AppError::storage("get_team", e.to_string()))?;
            let members: Vec<TeamMember> = stmt
                .query_map(params![name], |row| {
                    Ok(TeamMember {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        is_active: row.get(2)?,
                    })
                })
                .map_err(|e| AppError::storage("get_team", e.to_string()))?
                .collect::<Result<_, _>>()
                .map_err(|e| AppError::storage("get_team", e.to_string()))?;

            Ok(Team { name, members })
        })
        .await
    }
}

#[async_trait]
impl UserRepository for SqliteStore {
    async fn get_user(&self, user_id: &str) -> Result<User, AppError> {
        let user_id = user_id.to_string();
        self.call("get_user", move |conn| {
            conn.query_row(
                "SELECT user_id, username, team_name, is_active
                 FROM users WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(User {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        team_name: row.get(2)?,
                        is_active: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(|e| AppError::storage("get_user", e.to_string()))?
            .ok_or(AppError::UserNotFound)
        })
        .await
    }

    async fn set_active(&self, user_id: &str, is_active: bool) -> Result<(), AppError> {
        let user_id = user_id.to_string();
        self.call("set_active", move |conn| {
            let changed = conn
                .execute(
                    "UPDATE users SET is_active = ?1 WHERE user_id = ?2",
                    params![is_active, user_id],
                )
                .map_err(|e| AppError::storage("set_active", e.to_string()))?;
            if changed == 0 {
                return Err(AppError::UserNotFound);
            }
            Ok(())
        })
        .await
    }

    async fn deactivate_team_members(&self, team_name: &str) -> Result<usize, AppError> {
        let team_name = team_name.to_string();
        self.call("deactivate_team_members", move |conn| {
            conn.execute(
                "UPDATE users SET is_active = 0 WHERE team_name = ?1",
                params![team_name],
            )
            .map_err(|e| AppError::storage("deactivate_team_members", e.to_string()))
        })
        .await
    }
}

#[async_trait]
impl PrRepository for SqliteStore {
    async fn create_pr(&self, pr: &PullRequest) -> Result<(), AppError> {
        let pr = pr.clone();
        self.call("create_pr", move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| AppError::storage("create_pr", e.to_string()))?;

            let created_at = pr.created_at.map(|ts| ts.to_rfc3339());
            match tx.execute(
                "INSERT INTO pull_requests (id, name, author_id, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![pr.id, pr.name, pr.author_id, pr.status.as_str(), created_at],
            ) {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => return Err(AppError::PrExists),
                Err(e) => return Err(AppError::storage("create_pr", e.to_string())),
            }

            for reviewer in &pr.assigned_reviewers {
                tx.execute(
                    "INSERT INTO pr_reviewers (pr_id, user_id) VALUES (?1, ?2)",
                    params![pr.id, reviewer],
                )
                .map_err(|e| AppError::storage("create_pr", e.to_string()))?;
            }

            tx.commit()
                .map_err(|e| AppError::storage("create_pr", e.to_string()))
        })
        .await
    }

    async fn get_pr(&self, pr_id: &str) -> Result<PullRequest, AppError> {
        let pr_id = pr_id.to_string();
        self.call("get_pr", move |conn| load_pr(conn, &pr_id)).await
    }

    async fn merge_pr(&self, pr_id: &str) -> Result<DateTime<Utc>, AppError> {
        let pr_id = pr_id.to_string();
        self.call("merge_pr", move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| AppError::storage("merge_pr", e.to_string()))?;

            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM pull_requests WHERE id = ?1",
                    params![pr_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| AppError::storage("merge_pr", e.to_string()))?;

            match status.as_deref() {
                None => return Err(AppError::PrNotFound),
                Some("MERGED") => return Err(AppError::PrMerged),
                Some("OPEN") => {}
                Some(other) => return Err(AppError::InvalidStatus(other.to_string())),
            }

            let merged_at = Utc::now();
            tx.execute(
                "UPDATE pull_requests SET status = 'MERGED', merged_at = ?1 WHERE id = ?2",
                params![merged_at.to_rfc3339(), pr_id],
            )
            .map_err(|e| AppError::storage("merge_pr", e.to_string()))?;

            tx.commit()
                .map_err(|e| AppError::storage("merge_pr", e.to_string()))?;
            Ok(merged_at)
        })
        .await
    }

    async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_id: &str,
        new_id: &str,
    ) -> Result<(), AppError> {
        let pr_id = pr_id.to_string();
        let old_id = old_id.to_string();
        let new_id = new_id.to_string();
        self.call("reassign_reviewer", move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| AppError::storage("reassign_reviewer", e.to_string()))?;

            let exists: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM pull_requests WHERE id = ?1",
                    params![pr_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| AppError::storage("reassign_reviewer", e.to_string()))?;
            if exists.is_none() {
                return Err(AppError::PrNotFound);
            }

            let removed = tx
                .execute(
                    "DELETE FROM pr_reviewers WHERE pr_id = ?1 AND user_id = ?2",
                    params![pr_id, old_id],
                )
                .map_err(|e| AppError::storage("reassign_reviewer", e.to_string()))?;
            if removed == 0 {
                // The slot was vacated by a concurrent reassignment.
                return Err(AppError::NotAssigned);
            }

            match tx.execute(
                "INSERT INTO pr_reviewers (pr_id, user_id) VALUES (?1, ?2)",
                params![pr_id, new_id],
            ) {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => return Err(AppError::AlreadyAssigned),
                Err(e) => return Err(AppError::storage("reassign_reviewer", e.to_string())),
            }

            tx.commit()
                .map_err(|e| AppError::storage("reassign_reviewer", e.to_string()))
        })
        .await
    }

    async fn get_prs_by_reviewer(&self, user_id: &str) -> Result<Vec<PullRequest>, AppError> {
        let user_id = user_id.to_string();
        self.call("get_prs_by_reviewer", move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT r.pr_id FROM pr_reviewers r
                     JOIN pull_requests p ON p.id = r.pr_id
                     WHERE r.user_id = ?1 ORDER BY p.rowid",
                )
                .map_err(|e| AppError::storage("get_prs_by_reviewer", e.to_string()))?;
            let pr_ids: Vec<String> = stmt
                .query_map(params![user_id], |row| row.get(0))
                .map_err(|e| AppError::storage("get_prs_by_reviewer", e.to_string()))?
                .collect::<Result<_, _>>()
                .map_err(|e| AppError::storage("get_prs_by_reviewer", e.to_string()))?;

            pr_ids.iter().map(|id| load_pr(conn, id)).collect()
        })
        .await
    }

    async fn get_user_stats(&self) -> Result<Vec<UserStats>, AppError> {
        self.call("get_user_stats", move |conn| {
            let mut stmt = conn
                .prepare("SELECT user_id, username, team_name FROM users ORDER BY rowid")
                .map_err(|e| AppError::storage("get_user_stats", e.to_string()))?;
            let users: Vec<(String, String, Option<String>)> = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
                .map_err(|e| AppError::storage("get_user_stats", e.to_string()))?
                .collect::<Result<_, _>>()
                .map_err(|e| AppError::storage("get_user_stats", e.to_string()))?;

            let mut assigned_stmt = conn
                .prepare(
                    "SELECT r.pr_id FROM pr_reviewers r
                     JOIN pull_requests p ON p.id = r.pr_id
                     WHERE r.user_id = ?1 ORDER BY p.rowid",
                )
                .map_err(|e| AppError::storage("get_user_stats", e.to_string()))?;

            let mut stats = Vec::with_capacity(users.len());
            for (user_id, username, team_name) in users {
                let assigned_prs: Vec<String> = assigned_stmt
                    .query_map(params![user_id], |row| row.get(0))
                    .map_err(|e| AppError::storage("get_user_stats", e.to_string()))?
                    .collect::<Result<_, _>>()
                    .map_err(|e| AppError::storage("get_user_stats", e.to_string()))?;
                stats.push(UserStats {
                    user_id,
                    team_name,
                    username,
                    assignment_count: assigned_prs.len(),
                    assigned_prs,
                });
            }

            stats.sort_by(|a, b| {
                b.assignment_count
                    .cmp(&a.assignment_count)
                    .then_with(|| a.user_id.cmp(&b.user_id))
            });
            Ok(stats)
        })
        .await
    }

    async fn get_open_prs_for_team_reviewers(
        &self,
        team_name: &str,
    ) -> Result<Vec<PullRequest>, AppError> {
        let team_name = team_name.to_string();
        self.call("get_open_prs_for_team_reviewers", move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT DISTINCT r.pr_id FROM pr_reviewers r
                     JOIN users u ON u.user_id = r.user_id
                     JOIN pull_requests p ON p.id = r.pr_id
                     WHERE u.team_name = ?1 AND p.status = 'OPEN'
                     ORDER BY p.rowid",
                )
                .map_err(|e| {
                    AppError::storage("get_open_prs_for_team_reviewers", e.to_string())
                })?;
            let pr_ids: Vec<String> = stmt
                .query_map(params![team_name], |row| row.get(0))
                .map_err(|e| {
                    AppError::storage("get_open_prs_for_team_reviewers", e.to_string())
                })?
                .collect::<Result<_, _>>()
                .map_err(|e| {
                    AppError::storage("get_open_prs_for_team_reviewers", e.to_string())
                })?;

            pr_ids.iter().map(|id| load_pr(conn, id)).collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, active: bool) -> TeamMember {
        TeamMember {
            user_id: id.to_string(),
            username: format!("user-{id}"),
            is_active: active,
        }
    }

    fn backend_team() -> Team {
        Team {
            name: "backend".to_string(),
            members: vec![member("u1", true), member("u2", true), member("u3", true)],
        }
    }

    fn open_pr(id: &str, author: &str, reviewers: &[&str]) -> PullRequest {
        PullRequest {
            id: id.to_string(),
            name: format!("change {id}"),
            author_id: author.to_string(),
            status: PrStatus::Open,
            assigned_reviewers: reviewers.iter().map(|r| r.to_string()).collect(),
            created_at: Some(Utc::now()),
            merged_at: None,
        }
    }

    #[tokio::test]
    async fn create_team_round_trips_and_rejects_duplicates() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.create_team(&backend_team()).await.unwrap();

        let team = store.get_team("backend").await.unwrap();
        assert_eq!(team.members.len(), 3);

        let err = store.create_team(&backend_team()).await.unwrap_err();
        assert_eq!(err, AppError::TeamExists);
    }

    #[tokio::test]
    async fn get_team_missing_is_not_found() {
        let store = SqliteStore::new_in_memory().unwrap();
        let err = store.get_team("ghost").await.unwrap_err();
        assert_eq!(err, AppError::TeamNotFound);
    }

    #[tokio::test]
    async fn create_team_preserves_activity_of_known_users() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.create_team(&backend_team()).await.unwrap();
        store.set_active("u2", false).await.unwrap();

        // Re-adding the same user under a fresh team keeps them inactive.
        store
            .create_team(&Team {
                name: "platform".to_string(),
                members: vec![member("u2", true)],
            })
            .await
            .unwrap();

        let user = store.get_user("u2").await.unwrap();
        assert_eq!(user.team_name.as_deref(), Some("platform"));
        assert!(!user.is_active);
    }

    #[tokio::test]
    async fn pr_round_trip_preserves_reviewers_and_timestamps() {
        let store = SqliteStore::new_in_memory().unwrap();
        let pr = open_pr("pr-1", "u1", &["u2", "u3"]);
        store.create_pr(&pr).await.unwrap();

        let loaded = store.get_pr("pr-1").await.unwrap();
        assert_eq!(loaded.assigned_reviewers, vec!["u2", "u3"]);
        assert_eq!(loaded.status, PrStatus::Open);
        assert!(loaded.created_at.is_some());
        assert!(loaded.merged_at.is_none());
    }

    #[tokio::test]
    async fn duplicate_pr_id_is_rejected_at_the_store() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.create_pr(&open_pr("pr-1", "u1", &["u2"])).await.unwrap();

        let err = store
            .create_pr(&open_pr("pr-1", "u9", &[]))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::PrExists);
    }

    #[tokio::test]
    async fn merge_is_conditional_and_single_winner() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.create_pr(&open_pr("pr-1", "u1", &["u2"])).await.unwrap();

        store.merge_pr("pr-1").await.unwrap();
        let err = store.merge_pr("pr-1").await.unwrap_err();
        assert_eq!(err, AppError::PrMerged);

        let pr = store.get_pr("pr-1").await.unwrap();
        assert_eq!(pr.status, PrStatus::Merged);
        assert!(pr.merged_at.is_some());
    }

    #[tokio::test]
    async fn unrecognized_persisted_status_is_an_invariant_violation() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.create_pr(&open_pr("pr-1", "u1", &["u2"])).await.unwrap();

        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "UPDATE pull_requests SET status = 'DRAFT' WHERE id = 'pr-1'",
                [],
            )
            .unwrap();
        }

        let err = store.get_pr("pr-1").await.unwrap_err();
        assert_eq!(err, AppError::InvalidStatus("DRAFT".to_string()));

        let err = store.merge_pr("pr-1").await.unwrap_err();
        assert_eq!(err, AppError::InvalidStatus("DRAFT".to_string()));
    }

    #[tokio::test]
    async fn reassign_enforces_slot_and_collision_semantics() {
        let store = SqliteStore::new_in_memory().unwrap();
        store
            .create_pr(&open_pr("pr-1", "u1", &["u2", "u3"]))
            .await
            .unwrap();

        let err = store
            .reassign_reviewer("pr-1", "u2", "u3")
            .await
            .unwrap_err();
        assert_eq!(err, AppError::AlreadyAssigned);

        store.reassign_reviewer("pr-1", "u2", "u4").await.unwrap();
        let err = store
            .reassign_reviewer("pr-1", "u2", "u5")
            .await
            .unwrap_err();
        assert_eq!(err, AppError::NotAssigned);

        let pr = store.get_pr("pr-1").await.unwrap();
        assert_eq!(pr.assigned_reviewers, vec!["u3", "u4"]);
    }

    #[tokio::test]
    async fn open_prs_for_team_reviewers_filters_by_status_and_team() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.create_team(&backend_team()).await.unwrap();
        store.create_pr(&open_pr("pr-1", "u1", &["u2"])).await.unwrap();
        store.create_pr(&open_pr("pr-2", "u1", &["u3"])).await.unwrap();
        store.merge_pr("pr-2").await.unwrap();

        let prs = store
            .get_open_prs_for_team_reviewers("backend")
            .await
            .unwrap();
        let ids: Vec<&str> = prs.iter().map(|pr| pr.id.as_str()).collect();
        assert_eq!(ids, vec!["pr-1"]);
    }

    #[tokio::test]
    async fn user_stats_include_unassigned_users() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.create_team(&backend_team()).await.unwrap();
        store
            .create_pr(&open_pr("pr-1", "u1", &["u2", "u3"]))
            .await
            .unwrap();
        store.create_pr(&open_pr("pr-2", "u1", &["u2"])).await.unwrap();

        let stats = store.get_user_stats().await.unwrap();
        assert_eq!(stats[0].user_id, "u2");
        assert_eq!(stats[0].assignment_count, 2);
        let u1 = stats.iter().find(|s| s.user_id == "u1").unwrap();
        assert_eq!(u1.assignment_count, 0);
        assert!(u1.assigned_prs.is_empty());
    }
}
