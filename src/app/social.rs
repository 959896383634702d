use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::follow::Follow;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct SocialService {
    db: Db,
}

impl SocialService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Creates the `user_id -> author_id` edge unless it already exists.
    /// Self-follows are ignored. Returns the new edge, if one was created.
    pub async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<Option<Follow>> {
        let row = sqlx::query(
            "INSERT INTO follows (user_id, author_id) \
             SELECT $1, $2 \
             WHERE $1 <> $2 \
             ON CONFLICT DO NOTHING \
             RETURNING user_id, author_id, created_at",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(self.db.pool())
        .await?;

        let follow = row.map(|row| Follow {
            user_id: row.get("user_id"),
            author_id: row.get("author_id"),
            created_at: row.get("created_at"),
        });

        Ok(follow)
    }

    pub async fn unfollow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(exists)
    }
}
