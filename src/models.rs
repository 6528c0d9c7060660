use serde::{Deserialize, Serialize};

/// User record as the chat API returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub icon_color: String,
}

impl User {
    /// Tooltip text for the avatar: `name (alias)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.alias.as_deref().unwrap_or_default())
    }
}

/// A chat message. The sender travels embedded, not as a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    pub time: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinRequest {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinResponse {
    pub data: JoinedUser,
}

#[derive(Debug, Deserialize)]
pub struct JoinedUser {
    #[serde(rename = "_id")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub content: String,
    pub user_id: String,
}
