// In-memory user directory

use crate::domain::user::{NewUser, User, UserChanges};
use crate::errors::{AppError, Result};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug)]
struct DirectoryState {
    users: BTreeMap<i64, User>,
    next_id: i64,
}

/// Users keyed by id, with unique emails
#[derive(Debug)]
pub struct UserDirectory {
    state: RwLock<DirectoryState>,
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl UserDirectory {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(DirectoryState {
                users: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// All users ordered by id
    pub async fn list(&self) -> Vec<User> {
        self.state.read().await.users.values().cloned().collect()
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        self.state
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(user_not_found)
    }

    pub async fn find_by_email(&self, email: &str) -> Option<User> {
        self.state
            .read()
            .await
            .users
            .values()
            .find(|user| user.email == email)
            .cloned()
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;

        if state.users.values().any(|user| user.email == new_user.email) {
            return Err(AppError::Conflict("email already exists".to_string()));
        }

        let id = state.next_id;
        state.next_id += 1;

        let user = User {
            id,
            name: new_user.name,
            email: new_user.email,
            owner_id: new_user.owner_id,
            password_hash: new_user.password_hash,
            created_at: chrono::Utc::now(),
        };
        state.users.insert(id, user.clone());

        tracing::info!(user_id = %id, "User created");

        Ok(user)
    }

    pub async fn update(&self, id: i64, changes: UserChanges) -> Result<User> {
        let mut state = self.state.write().await;

        if let Some(email) = &changes.email {
            if state
                .users
                .values()
                .any(|user| user.id != id && &user.email == email)
            {
                return Err(AppError::Conflict("email already exists".to_string()));
            }
        }

        let user = state.users.get_mut(&id).ok_or_else(user_not_found)?;
        if let Some(name) = changes.name {
            user.name = Some(name);
        }
        if let Some(email) = changes.email {
            user.email = email;
        }

        tracing::info!(user_id = %id, "User updated");

        Ok(user.clone())
    }

    pub async fn delete(&self, id: i64) -> Result<User> {
        let user = self
            .state
            .write()
            .await
            .users
            .remove(&id)
            .ok_or_else(user_not_found)?;

        tracing::info!(user_id = %id, "User deleted");

        Ok(user)
    }
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found.".to_string())
}
