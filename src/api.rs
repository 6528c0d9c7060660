use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use url::Url;

use crate::error::{ChatError, ChatResult};
use crate::models::{JoinRequest, JoinResponse, Message, SendRequest, User};

/// The external chat API. Every screen talks to the backend through this
/// trait so the gate, the mount sequence and the composer can be driven
/// without a network.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Registers a user and returns the identifier used as session token.
    async fn join(&self, request: &JoinRequest) -> ChatResult<String>;

    /// Succeeds when the API answers the user lookup with a success status.
    async fn check_user(&self, token: &str) -> ChatResult<()>;

    async fn fetch_user(&self, token: &str) -> ChatResult<User>;

    async fn load_messages(&self) -> ChatResult<Vec<Message>>;

    /// Fire the send request. The response body is never read.
    async fn send(&self, request: &SendRequest) -> ChatResult<()>;
}

pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(base: Url) -> Self {
        Self::with_client(Client::new(), base)
    }

    pub fn with_client(client: Client, base: Url) -> Self {
        HttpBackend { client, base }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base.as_str().trim_end_matches('/'), path)
    }

    async fn user_response(&self, token: &str) -> ChatResult<Response> {
        let response = self
            .client
            .get(self.endpoint("user/data"))
            .query(&[("token", token)])
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn join(&self, request: &JoinRequest) -> ChatResult<String> {
        let response = self
            .client
            .post(self.endpoint("join"))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::Status(response.status()));
        }

        let body: JoinResponse = serde_json::from_slice(&response.bytes().await?)?;
        Ok(body.data.id)
    }

    async fn check_user(&self, token: &str) -> ChatResult<()> {
        let response = self.user_response(token).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ChatError::Status(response.status()))
        }
    }

    async fn fetch_user(&self, token: &str) -> ChatResult<User> {
        // Only the body matters here; the gate already judged the status.
        let response = self.user_response(token).await?;
        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }

    async fn load_messages(&self) -> ChatResult<Vec<Message>> {
        let response = self
            .client
            .get(self.endpoint("load/messages"))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }

    async fn send(&self, request: &SendRequest) -> ChatResult<()> {
        let response = self
            .client
            .post(self.endpoint("send/all"))
            .json(request)
            .send()
            .await?;
        debug!("send/all answered {}", response.status());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    pub(crate) fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            alias: Some(format!("{name}-alias")),
            icon_color: "#d79921".to_string(),
        }
    }

    pub(crate) fn message(id: &str, content: &str, from: &User) -> Message {
        Message {
            id: id.to_string(),
            content: content.to_string(),
            time: "2024-01-01T10:00:00".to_string(),
            user: from.clone(),
        }
    }

    /// In-memory backend recording what the screens asked for.
    #[derive(Default)]
    pub(crate) struct StubBackend {
        pub users: HashMap<String, User>,
        pub messages: Option<Vec<Message>>,
        pub fail_send: bool,
        pub joined: Mutex<Vec<JoinRequest>>,
        pub sent: Mutex<Vec<SendRequest>>,
        pub user_lookups: AtomicUsize,
    }

    impl StubBackend {
        pub(crate) fn with_user(user: User) -> Self {
            let mut users = HashMap::new();
            users.insert(user.id.clone(), user);
            StubBackend {
                users,
                ..Default::default()
            }
        }

        pub(crate) fn lookups(&self) -> usize {
            self.user_lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatBackend for StubBackend {
        async fn join(&self, request: &JoinRequest) -> ChatResult<String> {
            self.joined.lock().unwrap().push(request.clone());
            Ok(format!("id-{}", request.name))
        }

        async fn check_user(&self, token: &str) -> ChatResult<()> {
            self.fetch_user(token).await.map(|_| ())
        }

        async fn fetch_user(&self, token: &str) -> ChatResult<User> {
            self.user_lookups.fetch_add(1, Ordering::SeqCst);
            self.users
                .get(token)
                .cloned()
                .ok_or(ChatError::Status(reqwest::StatusCode::NOT_FOUND))
        }

        async fn load_messages(&self) -> ChatResult<Vec<Message>> {
            self.messages
                .clone()
                .ok_or(ChatError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR))
        }

        async fn send(&self, request: &SendRequest) -> ChatResult<()> {
            self.sent.lock().unwrap().push(request.clone());
            if self.fail_send {
                Err(ChatError::Status(reqwest::StatusCode::BAD_GATEWAY))
            } else {
                Ok(())
            }
        }
    }
}
