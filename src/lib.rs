pub mod channel;
pub mod config;
pub mod history;
pub mod identity;
pub mod rooms;
pub mod store;

use std::fmt;

pub use identity::{Identity, resolve_identity};
pub use rooms::{
    Message, MessageKind, RoomMembership, Session, SessionEvent, SessionState, SessionUpdate, Timeline,
};

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self(anyhow::Error::msg(err.to_owned()))
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(serde_json::Error);
apperr_impl!(sqlx::Error);
apperr_impl!(reqwest::Error);
apperr_impl!(tokio_tungstenite::tungstenite::Error);

/// Failures a caller of the session has to react to.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No display name in storage or page context; the user must be asked.
    #[error("no display name available, ask the user for one")]
    MissingIdentity,
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("not joined to a room")]
    NotJoined,
    #[error("transport disconnected")]
    TransportDisconnect,
    #[error("history fetch failed: {0}")]
    HistoryFetchFailed(#[source] AppError),
    #[error("storage: {0}")]
    Storage(#[from] AppError),
}

pub type SessionResult<T> = Result<T, SessionError>;
