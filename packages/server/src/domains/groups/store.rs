use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashSet;
use tokio::sync::RwLock;

use super::models::CareGroup;
use crate::common::UserId;

#[async_trait]
pub trait GroupMembership: Send + Sync {
    /// Add a member. Returns `false` if they were already in the group.
    async fn add_to_group(&self, user_id: UserId, group: CareGroup) -> Result<bool>;

    async fn groups_for_user(&self, user_id: UserId) -> Result<Vec<CareGroup>>;
}

pub struct PostgresGroupMembership {
    pool: PgPool,
}

impl PostgresGroupMembership {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupMembership for PostgresGroupMembership {
    async fn add_to_group(&self, user_id: UserId, group: CareGroup) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO group_members (user_id, group_id)
             VALUES ($1, $2)
             ON CONFLICT (user_id, group_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(group.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to add group member")?;

        Ok(result.rows_affected() > 0)
    }

    async fn groups_for_user(&self, user_id: UserId) -> Result<Vec<CareGroup>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT group_id FROM group_members WHERE user_id = $1 ORDER BY group_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list user groups")?;

        rows.into_iter().map(|(group,)| group.parse()).collect()
    }
}

#[derive(Default)]
pub struct InMemoryGroupMembership {
    members: RwLock<HashSet<(UserId, CareGroup)>>,
}

impl InMemoryGroupMembership {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupMembership for InMemoryGroupMembership {
    async fn add_to_group(&self, user_id: UserId, group: CareGroup) -> Result<bool> {
        Ok(self.members.write().await.insert((user_id, group)))
    }

    async fn groups_for_user(&self, user_id: UserId) -> Result<Vec<CareGroup>> {
        let mut groups: Vec<CareGroup> = self
            .members
            .read()
            .await
            .iter()
            .filter(|(member, _)| *member == user_id)
            .map(|(_, group)| *group)
            .collect();
        groups.sort();
        Ok(groups)
    }
}
