//! User activity management.

use std::sync::Arc;

use tracing::info;

use roster_core::{AppError, User};

use crate::repository::UserRepository;

pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, AppError> {
        self.users.get_user(user_id).await
    }

    /// Flip a user's active flag. Inactive users keep their existing
    /// review assignments but stop receiving new ones.
    pub async fn set_active(&self, user_id: &str, is_active: bool) -> Result<User, AppError> {
        self.users.set_active(user_id, is_active).await?;
        info!(
            "user {} is now {}",
            user_id,
            if is_active { "active" } else { "inactive" }
        );
        self.users.get_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryStore, TeamRepository};
    use roster_core::{Team, TeamMember};

    #[tokio::test]
    async fn set_active_round_trips() {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_team(&Team {
                name: "backend".to_string(),
                members: vec![TeamMember {
                    user_id: "u1".to_string(),
                    username: "alice".to_string(),
                    is_active: true,
                }],
            })
            .await
            .unwrap();

        let svc = UserService::new(store.clone());
        let user = svc.set_active("u1", false).await.unwrap();
        assert!(!user.is_active);
        assert!(!svc.get_user("u1").await.unwrap().is_active);

        let user = svc.set_active("u1", true).await.unwrap();
        assert!(user.is_active);
    }

    #[tokio::test]
    async fn set_active_for_unknown_user_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let svc = UserService::new(store);
        let err = svc.set_active("ghost", true).await.unwrap_err();
        assert_eq!(err, AppError::UserNotFound);
    }
}
