use std::convert::Infallible;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;
use warp::http::header::SET_COOKIE;
use warp::http::{StatusCode, Uri};
use warp::reply::Response;
use warp::ws::{Message, WebSocket};
use warp::{Filter, Rejection, Reply};

use crate::api::{ChatBackend, HttpBackend};
use crate::composer::Composer;
use crate::config::Config;
use crate::gate::{self, Access};
use crate::join::{self, JoinForm, JoinOutcome};
use crate::messages::{ClientMessage, ServerMessage};
use crate::models::{Message as ChatMessage, User};
use crate::pages::Notice;
use crate::pusher::PusherConfig;
use crate::screen::{self, MessagesScreen};
use crate::session::{self, SESSION_COOKIE};

#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    pub token: String,
}

pub struct Server {
    backend: Arc<dyn ChatBackend>,
    pusher: PusherConfig,
}

impl Server {
    pub fn new(config: &Config) -> Self {
        Self::with_backend(
            Arc::new(HttpBackend::new(config.api_url.clone())),
            config.pusher.clone(),
        )
    }

    pub fn with_backend(backend: Arc<dyn ChatBackend>, pusher: PusherConfig) -> Self {
        Server { backend, pusher }
    }

    /// One live connection is one mounted messages screen. Closing the socket
    /// is the browser leaving the page.
    pub async fn handle_live(self: Arc<Self>, ws: WebSocket, token: String) {
        let connection_id = Uuid::new_v4().to_string();
        info!("Live connection {} opened", connection_id);

        let (mut ws_tx, mut ws_rx) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode live message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(Message::text(text)).await {
                    warn!("Failed to send WebSocket message: {}", e);
                    break;
                }
            }
        });

        let screen = Arc::new(MessagesScreen::new(
            Arc::clone(&self.backend),
            self.pusher.clone(),
            token.clone(),
        ));
        let forward = tokio::spawn(forward_screen(
            Arc::clone(&screen),
            screen.watch_user(),
            screen.watch_messages(),
            tx.clone(),
        ));

        {
            let screen = Arc::clone(&screen);
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(notice) = screen.mount().await {
                    let _ = tx.send(ServerMessage::Notice(notice));
                }
            });
        }

        let mut composer = Composer::new(Arc::clone(&self.backend), token);
        while let Some(result) = ws_rx.next().await {
            let message = match result {
                Ok(message) => message,
                Err(e) => {
                    warn!("WebSocket error on {}: {}", connection_id, e);
                    break;
                }
            };
            if message.is_close() {
                break;
            }
            let Ok(text) = message.to_str() else {
                continue;
            };

            match serde_json::from_str::<ClientMessage>(text) {
                Ok(ClientMessage::SendMessage { content }) => {
                    composer.set_draft(content);
                    composer.submit().await;
                    let _ = tx.send(ServerMessage::ComposerCleared);
                }
                Err(e) => debug!("Ignoring unreadable frame on {}: {}", connection_id, e),
            }
        }

        forward.abort();
        info!("Live connection {} closed", connection_id);
    }
}

/// Pushes every change of the screen state to the browser.
async fn forward_screen(
    screen: Arc<MessagesScreen>,
    mut user: watch::Receiver<Option<User>>,
    mut messages: watch::Receiver<Vec<ChatMessage>>,
    tx: mpsc::UnboundedSender<ServerMessage>,
) {
    loop {
        let update = tokio::select! {
            changed = user.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = user.borrow_and_update().clone();
                let Some(current) = current else {
                    continue;
                };
                ServerMessage::CurrentUser {
                    name: current.name,
                    icon_color: current.icon_color,
                }
            }
            changed = messages.changed() => {
                if changed.is_err() {
                    break;
                }
                let html = screen.render_list(&messages.borrow_and_update());
                ServerMessage::MessageList { html }
            }
        };

        if tx.send(update).is_err() {
            break;
        }
    }
}

fn with_server(
    server: Arc<Server>,
) -> impl Filter<Extract = (Arc<Server>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&server))
}

async fn handle_join(form: JoinForm, server: Arc<Server>) -> Result<Response, Infallible> {
    let reply = match join::submit(server.backend.as_ref(), form).await {
        JoinOutcome::Joined(token) => warp::reply::with_header(
            warp::redirect::see_other(Uri::from_static("/messages")),
            SET_COOKIE,
            session::session_cookie(&token, Utc::now()),
        )
        .into_response(),
        JoinOutcome::MissingName => warp::reply::with_status(
            warp::reply::html(join::render(None)),
            StatusCode::BAD_REQUEST,
        )
        .into_response(),
        JoinOutcome::Failed => {
            warp::reply::html(join::render(Some(&Notice::load_error()))).into_response()
        }
    };
    Ok(reply)
}

async fn handle_messages_page(
    token: Option<String>,
    server: Arc<Server>,
) -> Result<Response, Infallible> {
    let reply = match gate::check_access(server.backend.as_ref(), token).await {
        Access::Granted(token) => warp::reply::html(screen::render_page(&token)).into_response(),
        Access::Redirect => gate::redirect_to_login().into_response(),
    };
    Ok(reply)
}

pub fn routes(server: Arc<Server>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let login_page = warp::path("login")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::html(join::render(None)));

    let login_submit = warp::path("login")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::form())
        .and(with_server(Arc::clone(&server)))
        .and_then(handle_join);

    let messages_page = warp::path("messages")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::cookie::optional(SESSION_COOKIE))
        .and(with_server(Arc::clone(&server)))
        .and_then(handle_messages_page);

    let live = warp::path!("messages" / "live")
        .and(warp::ws())
        .and(warp::query::<LiveQuery>())
        .and(with_server(server))
        .map(|ws: warp::ws::Ws, query: LiveQuery, server: Arc<Server>| {
            ws.on_upgrade(move |socket| server.handle_live(socket, query.token))
        });

    let static_files = warp::path("public").and(warp::fs::dir("public"));

    login_page
        .or(login_submit)
        .or(messages_page)
        .or(live)
        .or(static_files)
}
