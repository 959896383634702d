pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::infra::{cache::PageCache, db::Db, storage::ObjectStorage};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub cache: PageCache,
    pub storage: ObjectStorage,
    pub admin_token: Option<String>,
    pub session_key: [u8; 32],
    pub session_ttl_hours: u64,
    pub index_cache_ttl_seconds: u64,
    pub media_url: Option<String>,
    pub upload_max_bytes: usize,
}
