use anyhow::Result;
use redis::{AsyncCommands, Client};

const KEY_PREFIX: &str = "page:";

/// Response-level cache for rendered listing pages.
#[derive(Clone)]
pub struct PageCache {
    client: Client,
}

impl PageCache {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(Self { client })
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value = conn
            .get::<_, Option<String>>(format!("{}{}", KEY_PREFIX, key))
            .await?;
        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(format!("{}{}", KEY_PREFIX, key), value, ttl_seconds)
            .await?;
        Ok(())
    }

    /// Drops every cached page. Returns the number of keys removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let pattern = format!("{}*", KEY_PREFIX);
        let mut cursor: u64 = 0;
        let mut removed = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                removed += keys.len();
                conn.del::<_, ()>(keys).await?;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }
}
