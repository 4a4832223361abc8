use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::models::{NewUser, User, UserContact, UserRole, UserStatus};
use super::store::UserDirectory;
use crate::common::{StatusChange, UserId};

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
    secrets: RwLock<HashMap<UserId, String>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn insert_user(&self, new_user: NewUser, initial_password: &str) -> Result<Option<User>> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == new_user.username) {
            return Ok(None);
        }

        let user = new_user.into_user(Utc::now());
        users.insert(user.id, user.clone());
        self.secrets
            .write()
            .await
            .insert(user.id, initial_password.to_string());
        Ok(Some(user))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        self.secrets.write().await.remove(&id);
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn lookup_user_role(&self, id: UserId) -> Result<Option<UserRole>> {
        Ok(self.users.read().await.get(&id).map(|u| u.role))
    }

    async fn set_user_status(&self, id: UserId, status: UserStatus) -> Result<StatusChange> {
        let mut users = self.users.write().await;
        Ok(match users.get_mut(&id) {
            None => StatusChange::Missing,
            Some(user) if user.status == status => StatusChange::Unchanged,
            Some(user) => {
                user.status = status;
                StatusChange::Applied
            }
        })
    }

    async fn get_user_contact(&self, id: UserId) -> Result<Option<UserContact>> {
        Ok(self.users.read().await.get(&id).map(|u| UserContact {
            username: u.username.clone(),
            email: u.email.clone(),
        }))
    }

    async fn initial_password(&self, id: UserId) -> Result<Option<String>> {
        Ok(self.secrets.read().await.get(&id).cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
