use std::sync::{Arc, Mutex};

use log::{debug, error, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::ChatBackend;
use crate::error::ChatResult;
use crate::format::format_timestamp;
use crate::models::{Message, User};
use crate::pages::{escape, layout, Notice};
use crate::pusher::{self, PusherConfig, INSERTED_EVENT};

/// State behind one open messages screen.
///
/// The displayed list is a single value that the initial fetch and every
/// live event overwrite wholesale. Neither write checks what the other did,
/// so whichever lands last is what the user sees.
pub struct MessagesScreen {
    backend: Arc<dyn ChatBackend>,
    pusher: PusherConfig,
    token: String,
    user: watch::Sender<Option<User>>,
    messages: Arc<watch::Sender<Vec<Message>>>,
    binding: Mutex<Option<JoinHandle<()>>>,
}

impl MessagesScreen {
    pub fn new(backend: Arc<dyn ChatBackend>, pusher: PusherConfig, token: String) -> Self {
        MessagesScreen {
            backend,
            pusher,
            token,
            user: watch::Sender::new(None),
            messages: Arc::new(watch::Sender::new(Vec::new())),
            binding: Mutex::new(None),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    pub fn watch_user(&self) -> watch::Receiver<Option<User>> {
        self.user.subscribe()
    }

    pub fn watch_messages(&self) -> watch::Receiver<Vec<Message>> {
        self.messages.subscribe()
    }

    /// Loads the screen: user, message snapshot, then the live subscription.
    /// A failure anywhere stops the sequence and yields the error notice;
    /// whatever was already loaded stays on screen.
    pub async fn mount(&self) -> Option<Notice> {
        match self.load().await {
            Ok(()) => None,
            Err(e) => {
                error!("Could not load messages screen: {}", e);
                Some(Notice::load_error())
            }
        }
    }

    async fn load(&self) -> ChatResult<()> {
        let user = self.backend.fetch_user(&self.token).await?;
        self.user.send_replace(Some(user));

        let messages = self.backend.load_messages().await?;
        debug!("Loaded {} messages", messages.len());
        self.messages.send_replace(messages);

        let channel = pusher::subscribe(&self.pusher).await?;
        info!("Messages screen for {} listening on {}", self.token, channel.name());
        let list = Arc::clone(&self.messages);
        let binding = channel.bind(INSERTED_EVENT, move |payload| {
            match serde_json::from_str::<Vec<Message>>(payload) {
                Ok(snapshot) => {
                    debug!("Live update with {} messages", snapshot.len());
                    list.send_replace(snapshot);
                }
                Err(e) => debug!("Ignoring malformed live update: {}", e),
            }
        });
        if let Ok(mut slot) = self.binding.lock() {
            *slot = Some(binding);
        }
        Ok(())
    }

    /// Ownership is decided by the raw session token, not the fetched user.
    pub fn is_mine(&self, message: &Message) -> bool {
        message.user.id == self.token
    }

    pub fn render_list(&self, messages: &[Message]) -> String {
        messages
            .iter()
            .map(|message| render_message(message, self.is_mine(message)))
            .collect()
    }
}

impl Drop for MessagesScreen {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.binding.lock() {
            if let Some(binding) = slot.take() {
                binding.abort();
            }
        }
    }
}

fn avatar(user: &User) -> String {
    format!(
        r#"<span class="avatar" title="{}" style="background-color: {}"></span>"#,
        escape(&user.label()),
        escape(&user.icon_color)
    )
}

fn render_message(message: &Message, mine: bool) -> String {
    let user = &message.user;
    let time = format!(
        r#"<span class="tag">{}</span>"#,
        escape(&format_timestamp(&message.time))
    );

    if mine {
        format!(
            r#"<li class="message message-mine" data-id="{}"><div class="message-body"><h6>{} (você)</h6><p>{}</p>{}</div>{}</li>"#,
            escape(&message.id),
            escape(&user.name),
            escape(&message.content),
            time,
            avatar(user)
        )
    } else {
        format!(
            r#"<li class="message" data-id="{}">{}<div class="message-body"><h6>{}</h6><p>{}</p>{}</div></li>"#,
            escape(&message.id),
            avatar(user),
            escape(&user.name),
            escape(&message.content),
            time
        )
    }
}

/// Server-rendered shell of the messages screen. The list starts empty and
/// fills in once the browser opens the live socket.
pub fn render_page(token: &str) -> String {
    let body = format!(
        r#"<div class="screen screen-bottom" id="messages-screen" data-token="{}">
<div class="column">
<div class="scroll"><ul id="message-list"></ul></div>
<form id="composer" class="composer">
<input name="message" placeholder="send a message" required autocomplete="off">
<button type="submit" class="button">Send</button>
<span id="composer-avatar" class="avatar" title=""></span>
</form>
</div>
</div>"#,
        escape(token)
    );
    layout("Messages", &body, None)
}
