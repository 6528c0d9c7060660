use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Missing configuration value {0}")]
    MissingConfig(&'static str),
    #[error("Invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("Malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Live channel failed: {0}")]
    Socket(#[from] tungstenite::Error),
    #[error("Live channel closed while waiting for {0}")]
    ChannelClosed(&'static str),
    #[error("Broker rejected the connection: {0}")]
    Rejected(String),
}

pub type ChatResult<T> = Result<T, ChatError>;
