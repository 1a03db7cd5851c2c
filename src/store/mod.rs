mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::AppResult;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const USER_ID: &str = "user_id";
pub const DISPLAY_NAME: &str = "name";
pub const ROOM_CODE: &str = "room_code";

/// Client-local key/value persistence that outlives a single session.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;
    async fn remove(&self, key: &str) -> AppResult<()>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        (**self).remove(key).await
    }
}
