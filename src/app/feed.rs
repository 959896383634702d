use anyhow::Result;
use tracing::warn;
use uuid::Uuid;

use crate::app::posts::{PostFilter, PostService};
use crate::domain::page::{parse_page_number, Page};
use crate::domain::post::Post;
use crate::infra::{cache::PageCache, db::Db};

#[derive(Clone)]
pub struct FeedService {
    posts: PostService,
    cache: PageCache,
    index_ttl_seconds: u64,
}

impl FeedService {
    pub fn new(db: Db, cache: PageCache, index_ttl_seconds: u64) -> Self {
        Self {
            posts: PostService::new(db),
            cache,
            index_ttl_seconds,
        }
    }

    /// The front page listing. Pages are cached for a short time and are not
    /// invalidated by writes; a cache miss or an unreachable cache falls back
    /// to the database.
    pub async fn index(&self, page: Option<&str>) -> Result<Page<Post>> {
        let cache_key = index_cache_key(page);

        match self.cache.get(&cache_key).await {
            Ok(Some(payload)) => match serde_json::from_str::<Page<Post>>(&payload) {
                Ok(cached) => return Ok(cached),
                Err(err) => warn!(error = ?err, key = %cache_key, "discarding unreadable cached page"),
            },
            Ok(None) => {}
            Err(err) => warn!(error = ?err, "failed to read page cache"),
        }

        let listing = self.posts.list(PostFilter::All, page).await?;

        if self.index_ttl_seconds > 0 {
            match serde_json::to_string(&listing) {
                Ok(payload) => {
                    if let Err(err) = self
                        .cache
                        .set(&cache_key, &payload, self.index_ttl_seconds)
                        .await
                    {
                        warn!(error = ?err, "failed to write page cache");
                    }
                }
                Err(err) => warn!(error = ?err, "failed to serialize page for cache"),
            }
        }

        Ok(listing)
    }

    /// Posts by every author `user_id` follows.
    pub async fn follow_feed(&self, user_id: Uuid, page: Option<&str>) -> Result<Page<Post>> {
        self.posts.list(PostFilter::FollowedBy(user_id), page).await
    }
}

/// Requests that resolve to the same page number share a cache entry.
fn index_cache_key(page: Option<&str>) -> String {
    match parse_page_number(page) {
        Some(number) => format!("index:{}", number),
        None => "index:1".to_string(),
    }
}
