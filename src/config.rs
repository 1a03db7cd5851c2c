/// Where to connect and what to remember, read from the environment (and a
/// `.env` file, if there is one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: String,
    pub history_url: String,
    pub store_url: String,
    /// Name known up front, skipping the prompt.
    pub display_name: Option<String>,
    pub forget_device_on_leave: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: "ws://127.0.0.1:8080/ws".to_owned(),
            history_url: "http://127.0.0.1:8080".to_owned(),
            store_url: "sqlite://roomchat.db?mode=rwc".to_owned(),
            display_name: None,
            forget_device_on_leave: false,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> ClientConfig {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ClientConfig {
        let defaults = ClientConfig::default();
        let var = |key: &str| lookup(key).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty());

        ClientConfig {
            server_url: var("ROOMCHAT_SERVER_URL").unwrap_or(defaults.server_url),
            history_url: var("ROOMCHAT_HISTORY_URL").unwrap_or(defaults.history_url),
            store_url: var("ROOMCHAT_STORE_URL").unwrap_or(defaults.store_url),
            display_name: var("ROOMCHAT_NAME"),
            forget_device_on_leave: var("ROOMCHAT_FORGET_DEVICE").is_some_and(|value| parse_flag(&value)),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
