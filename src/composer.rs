use std::sync::Arc;

use log::debug;

use crate::api::ChatBackend;
use crate::models::SendRequest;

pub struct Composer {
    backend: Arc<dyn ChatBackend>,
    token: String,
    draft: String,
}

impl Composer {
    pub fn new(backend: Arc<dyn ChatBackend>, token: String) -> Self {
        Composer {
            backend,
            token,
            draft: String::new(),
        }
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn can_submit(&self) -> bool {
        !self.draft.is_empty()
    }

    /// Posts the draft as the session's user and clears it once the request
    /// completes, whatever the outcome. Send failures are not reported.
    pub async fn submit(&mut self) {
        if !self.can_submit() {
            return;
        }

        let request = SendRequest {
            content: self.draft.clone(),
            user_id: self.token.clone(),
        };
        if let Err(e) = self.backend.send(&request).await {
            debug!("Send failed silently: {}", e);
        }
        self.draft.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::StubBackend;

    #[tokio::test]
    async fn sends_content_with_raw_token() {
        let backend = Arc::new(StubBackend::default());
        let mut composer = Composer::new(backend.clone(), "abc123".into());
        composer.set_draft("hello");
        assert!(composer.can_submit());

        composer.submit().await;

        assert_eq!(
            *backend.sent.lock().unwrap(),
            vec![SendRequest {
                content: "hello".into(),
                user_id: "abc123".into()
            }]
        );
        assert_eq!(composer.draft(), "");
    }

    #[tokio::test]
    async fn clears_draft_when_send_fails() {
        let backend = Arc::new(StubBackend {
            fail_send: true,
            ..Default::default()
        });
        let mut composer = Composer::new(backend.clone(), "abc123".into());
        composer.set_draft("lost");

        composer.submit().await;

        assert_eq!(backend.sent.lock().unwrap().len(), 1);
        assert_eq!(composer.draft(), "");
        assert!(!composer.can_submit());
    }

    #[tokio::test]
    async fn empty_draft_sends_nothing() {
        let backend = Arc::new(StubBackend::default());
        let mut composer = Composer::new(backend.clone(), "abc123".into());

        composer.submit().await;

        assert!(backend.sent.lock().unwrap().is_empty());
    }
}
