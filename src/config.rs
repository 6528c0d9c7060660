use url::Url;

use crate::error::{ChatError, ChatResult};
use crate::pusher::PusherConfig;

pub const API_URL_VAR: &str = "CHAT_API_URL";

/// Everything the client needs to reach its collaborators. Built once in
/// `main` and handed to whoever issues external calls.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub pusher: PusherConfig,
}

impl Config {
    pub fn from_env() -> ChatResult<Self> {
        let raw = std::env::var(API_URL_VAR).map_err(|_| ChatError::MissingConfig(API_URL_VAR))?;
        Self::with_api_url(&raw)
    }

    pub fn with_api_url(raw: &str) -> ChatResult<Self> {
        Ok(Config {
            api_url: Url::parse(raw.trim())?,
            pusher: PusherConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base_url() {
        let config = Config::with_api_url(" http://localhost:8080/api ").unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:8080/api");
        assert_eq!(config.pusher.channel, "messages-channel");
    }

    #[test]
    fn rejects_relative_url() {
        assert!(matches!(
            Config::with_api_url("/api"),
            Err(ChatError::InvalidUrl(_))
        ));
    }
}
