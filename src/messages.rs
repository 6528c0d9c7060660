use serde::{Deserialize, Serialize};

use crate::pages::Notice;

/// Browser → server frames on the live socket.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "send_message")]
    SendMessage { content: String },
}

/// Server → browser frames on the live socket.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "current_user")]
    CurrentUser { name: String, icon_color: String },
    #[serde(rename = "message_list")]
    MessageList { html: String },
    #[serde(rename = "notice")]
    Notice(Notice),
    #[serde(rename = "composer_cleared")]
    ComposerCleared,
}
