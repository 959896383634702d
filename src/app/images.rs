use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::app::forms::ValidImage;
use crate::infra::storage::ObjectStorage;

const KEY_PREFIX: &str = "posts/";

#[derive(Clone)]
pub struct ImageService {
    storage: ObjectStorage,
}

impl ImageService {
    pub fn new(storage: ObjectStorage) -> Self {
        Self { storage }
    }

    /// Uploads a validated image and returns its object key. Keys are derived
    /// from the content, so re-uploading the same file reuses one object.
    pub async fn store(&self, image: &ValidImage) -> Result<String> {
        let key = object_key(image);
        if !self.storage.exists(&key).await? {
            self.storage
                .put(&key, image.data.clone(), image.content_type)
                .await?;
        }
        Ok(key)
    }
}

pub fn object_key(image: &ValidImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&image.data);
    format!("{}{}.{}", KEY_PREFIX, hex::encode(hasher.finalize()), image.extension)
}

/// Public URL of an object key under the configured media base URL.
pub fn image_url(media_url: Option<&str>, key: &str) -> Option<String> {
    media_url.map(|base| format!("{}/{}", base, key))
}
