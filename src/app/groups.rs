use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::domain::group::Group;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct GroupService {
    db: Db,
}

impl GroupService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let row = sqlx::query("SELECT id, title, slug, description FROM groups WHERE slug = $1")
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(group_from_row))
    }

    /// Every group, for the group picker on the post form.
    pub async fn list_all(&self) -> Result<Vec<Group>> {
        let rows = sqlx::query("SELECT id, title, slug, description FROM groups ORDER BY title, id")
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.iter().map(group_from_row).collect())
    }

    pub async fn create_group(
        &self,
        title: String,
        slug: String,
        description: String,
    ) -> Result<Group> {
        let row = sqlx::query(
            "INSERT INTO groups (title, slug, description) VALUES ($1, $2, $3) \
             RETURNING id, title, slug, description",
        )
        .bind(title)
        .bind(slug)
        .bind(description)
        .fetch_one(self.db.pool())
        .await?;

        Ok(group_from_row(&row))
    }
}

fn group_from_row(row: &PgRow) -> Group {
    Group {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
    }
}
