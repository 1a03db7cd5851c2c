//! Who the local user is: a device-scoped id plus the name shown to the room.

use rand::seq::IndexedRandom;
use uuid::Uuid;

use crate::{
    SessionError, SessionResult,
    store::{DISPLAY_NAME, KeyValueStore, USER_ID},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque, generated once per device and kept across sessions.
    pub user_id: String,
    /// Not unique; two people may pick the same name.
    pub display_name: String,
}

pub fn generate_user_id() -> String {
    "user_".to_owned() + &Uuid::now_v7().simple().to_string()
}

/// Resolves the local identity.
///
/// The user id is read from `store`, or generated and written back straight
/// away so the next start sees the same one. The display name comes from
/// `context_name` (whatever the host already knows, e.g. a pre-filled field)
/// and falls back to the stored name. With neither, the caller gets
/// [`SessionError::MissingIdentity`] and has to ask the user.
pub async fn resolve_identity<S>(store: &S, context_name: Option<&str>) -> SessionResult<Identity>
where
    S: KeyValueStore + ?Sized,
{
    let user_id = match store.get(USER_ID).await?.filter(|id| !id.is_empty()) {
        Some(user_id) => user_id,
        None => {
            let user_id = generate_user_id();
            store.set(USER_ID, &user_id).await?;
            tracing::info!(%user_id, "generated device user id");
            user_id
        }
    };

    let context_name = context_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned);
    let display_name = match context_name {
        Some(name) => name,
        None => store
            .get(DISPLAY_NAME)
            .await?
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .ok_or(SessionError::MissingIdentity)?,
    };

    Ok(Identity { user_id, display_name })
}

/// A throwaway "Adjective Noun" name to offer when prompting.
pub fn suggest_display_name() -> String {
    let adjectives = [
        "Quick", "Lazy", "Jolly", "Brave", "Silent", "Witty", "Clever", "Gentle",
        "Calm", "Bold", "Shy", "Proud", "Eager", "Rusty", "Golden", "Lucky",
    ];
    let nouns = [
        "Fox", "Bear", "Owl", "Wolf", "Otter", "Heron", "Lynx", "Badger",
        "Falcon", "Panda", "Turtle", "Dolphin", "Moose", "Crane", "Gecko", "Yak",
    ];

    let mut rng = rand::rng();
    format!(
        "{} {}",
        adjectives.choose(&mut rng).copied().unwrap_or("Nameless"),
        nouns.choose(&mut rng).copied().unwrap_or("User"),
    )
}
