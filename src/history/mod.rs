//! Past messages of a room, fetched once when the room is entered.

use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{AppResult, SessionError, channel::WireMessage, rooms::Message};

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Messages of `room_code`, oldest first.
    async fn fetch(&self, room_code: &str) -> AppResult<Vec<Message>>;
}

#[async_trait]
impl<H: HistoryStore + ?Sized> HistoryStore for std::sync::Arc<H> {
    async fn fetch(&self, room_code: &str) -> AppResult<Vec<Message>> {
        (**self).fetch(room_code).await
    }
}

/// Fetches the backlog of `room_code`. A failed fetch is logged and reads as
/// an empty backlog, so live messaging carries on without it.
pub async fn load_history<H>(history: &H, room_code: &str) -> Vec<Message>
where
    H: HistoryStore + ?Sized,
{
    match history.fetch(room_code).await {
        Ok(messages) => {
            tracing::debug!(room_code, count = messages.len(), "history loaded");
            messages
        }
        Err(err) => {
            let err = SessionError::HistoryFetchFailed(err);
            tracing::warn!(room_code, error = %err, "continuing without history");
            Vec::new()
        }
    }
}

#[derive(Deserialize)]
struct HistoryResponse {
    messages: Vec<WireMessage>,
}

/// `GET {base_url}/rooms/{room_code}/messages` answering
/// `{"messages": [{"name", "msg", "timestamp"}, ...]}`.
#[derive(Clone)]
pub struct HttpHistoryStore {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpHistoryStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        HttpHistoryStore {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// The room code is one escaped path segment, so `#`, `?` or `/` in it
    /// cannot point the request at another room.
    fn url(&self, room_code: &str) -> AppResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|err| format!("history url {}: {err}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| format!("history url {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(["rooms", room_code, "messages"]);

        Ok(url)
    }

    /// Like [`HistoryStore::fetch`], with clock-only stamps dated relative to
    /// `fetched_at`.
    pub async fn fetch_at(&self, room_code: &str, fetched_at: OffsetDateTime) -> AppResult<Vec<Message>> {
        let HistoryResponse { messages } = self
            .http_client
            .get(self.url(room_code)?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(messages
            .into_iter()
            .map(|msg| Message::from_wire(msg, fetched_at))
            .collect())
    }
}

#[async_trait]
impl HistoryStore for HttpHistoryStore {
    async fn fetch(&self, room_code: &str) -> AppResult<Vec<Message>> {
        self.fetch_at(room_code, OffsetDateTime::now_utc()).await
    }
}
