use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Directed edge: `user_id` sees the posts of `author_id` in their feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub user_id: Uuid,
    pub author_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
