use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::user::{PublicUser, User};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, email, display_name, created_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        let user = row.map(|row| User {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            display_name: row.get("display_name"),
            created_at: row.get("created_at"),
        });

        Ok(user)
    }

    /// Profile header for `/<username>/`: the user plus post and follow counts.
    pub async fn get_profile(&self, username: &str) -> Result<Option<PublicUser>> {
        let row = sqlx::query(
            "SELECT u.id, u.username, u.display_name, u.created_at, \
                    (SELECT COUNT(*) FROM posts WHERE author_id = u.id) AS posts_count, \
                    (SELECT COUNT(*) FROM follows WHERE author_id = u.id) AS followers_count, \
                    (SELECT COUNT(*) FROM follows WHERE user_id = u.id) AS following_count \
             FROM users u WHERE u.username = $1",
        )
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;

        let profile = row.map(|row| PublicUser {
            id: row.get("id"),
            username: row.get("username"),
            display_name: row.get("display_name"),
            created_at: row.get("created_at"),
            posts_count: row.get("posts_count"),
            followers_count: row.get("followers_count"),
            following_count: row.get("following_count"),
        });

        Ok(profile)
    }
}
