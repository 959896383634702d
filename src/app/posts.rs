use anyhow::Result;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};
use uuid::Uuid;

use crate::domain::group::GroupRef;
use crate::domain::page::{Page, PageWindow, PAGE_SIZE};
use crate::domain::post::Post;
use crate::infra::db::Db;

const POST_COLUMNS: &str = "p.id, p.text, p.pub_date, p.image, p.author_id, \
     u.username AS author_username, \
     g.id AS group_id, g.title AS group_title, g.slug AS group_slug";

/// Which posts a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(Uuid),
    /// Posts by every author the given user follows.
    FollowedBy(Uuid),
}

impl PostFilter {
    fn clause(&self) -> &'static str {
        match self {
            Self::All => "",
            Self::Group(_) => "WHERE p.group_id = $1",
            Self::Author(_) => "WHERE p.author_id = $1",
            Self::FollowedBy(_) => {
                "WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = $1)"
            }
        }
    }

    fn arg_count(&self) -> usize {
        match self {
            Self::All => 0,
            _ => 1,
        }
    }

    fn bind<'q>(
        &self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match *self {
            Self::All => query,
            Self::Group(group_id) => query.bind(group_id),
            Self::Author(author_id) => query.bind(author_id),
            Self::FollowedBy(user_id) => query.bind(user_id),
        }
    }
}

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// One page of posts, newest first.
    pub async fn list(&self, filter: PostFilter, page: Option<&str>) -> Result<Page<Post>> {
        let count = self.count(filter).await?;
        let window = PageWindow::resolve(page, count, PAGE_SIZE);

        let next_arg = filter.arg_count() + 1;
        let sql = format!(
            "SELECT {} \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             {} \
             ORDER BY p.pub_date DESC, p.id DESC \
             LIMIT ${} OFFSET ${}",
            POST_COLUMNS,
            filter.clause(),
            next_arg,
            next_arg + 1,
        );
        let rows = filter
            .bind(sqlx::query(&sql))
            .bind(window.limit())
            .bind(window.offset())
            .fetch_all(self.db.pool())
            .await?;

        let posts = rows.iter().map(post_from_row).collect();
        Ok(Page::new(window, posts))
    }

    pub async fn count(&self, filter: PostFilter) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) AS total FROM posts p {}", filter.clause());
        let row = filter
            .bind(sqlx::query(&sql))
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.get("total"))
    }

    /// A post addressed by its author's username, as in `/<username>/<post_id>/`.
    pub async fn get_authored_post(&self, username: &str, post_id: i64) -> Result<Option<Post>> {
        let sql = format!(
            "SELECT {} \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             WHERE p.id = $1 AND u.username = $2",
            POST_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(post_id)
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    pub async fn create_post(
        &self,
        author_id: Uuid,
        text: String,
        group_id: Option<i64>,
        image: Option<String>,
    ) -> Result<Post> {
        let sql = format!(
            "WITH p AS ( \
                INSERT INTO posts (author_id, text, group_id, image) \
                VALUES ($1, $2, $3, $4) \
                RETURNING id, text, pub_date, image, author_id, group_id \
             ) \
             SELECT {} \
             FROM p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id",
            POST_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(author_id)
            .bind(text)
            .bind(group_id)
            .bind(image)
            .fetch_one(self.db.pool())
            .await?;

        Ok(post_from_row(&row))
    }

    /// Rewrites a post owned by `author_id`. Returns `None` when the post does
    /// not exist or belongs to someone else.
    pub async fn update_post(
        &self,
        post_id: i64,
        author_id: Uuid,
        text: String,
        group_id: Option<i64>,
        image: Option<String>,
    ) -> Result<Option<Post>> {
        let sql = format!(
            "WITH p AS ( \
                UPDATE posts \
                SET text = $3, group_id = $4, image = $5 \
                WHERE id = $1 AND author_id = $2 \
                RETURNING id, text, pub_date, image, author_id, group_id \
             ) \
             SELECT {} \
             FROM p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id",
            POST_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(post_id)
            .bind(author_id)
            .bind(text)
            .bind(group_id)
            .bind(image)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(post_from_row))
    }
}

fn post_from_row(row: &PgRow) -> Post {
    let group_id: Option<i64> = row.get("group_id");
    let group = group_id.map(|id| GroupRef {
        id,
        title: row.get("group_title"),
        slug: row.get("group_slug"),
    });

    Post {
        id: row.get("id"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        group,
        image: row.get("image"),
        image_url: None,
    }
}
