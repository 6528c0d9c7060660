//! Minimal client for the hosted pub/sub broker (Pusher protocol 7).
//!
//! Only what the messages screen needs: connect, subscribe to one public
//! channel, keep the connection alive and hand channel events to a bound
//! handler. A dropped connection is reopened after a fixed delay and the
//! subscription sent again.

use std::borrow::Cow;
use std::time::Duration;

use futures_util::{SinkExt, Stream, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{ChatError, ChatResult};

pub const PUSHER_APP_KEY: &str = "353e80ec7ad4635651aa";
pub const PUSHER_CLUSTER: &str = "sa1";
pub const MESSAGES_CHANNEL: &str = "messages-channel";
pub const INSERTED_EVENT: &str = "inserted";

const PROTOCOL_VERSION: u8 = 7;
const CONNECTION_ESTABLISHED: &str = "pusher:connection_established";
const SUBSCRIBE: &str = "pusher:subscribe";
const SUBSCRIPTION_SUCCEEDED: &str = "pusher_internal:subscription_succeeded";
const PING: &str = "pusher:ping";
const PONG: &str = "pusher:pong";
const ERROR: &str = "pusher:error";

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct PusherConfig {
    pub app_key: String,
    pub cluster: String,
    pub channel: String,
    /// Replaces `wss://ws-{cluster}.pusher.com` when set.
    pub endpoint: Option<String>,
}

impl Default for PusherConfig {
    fn default() -> Self {
        PusherConfig {
            app_key: PUSHER_APP_KEY.to_string(),
            cluster: PUSHER_CLUSTER.to_string(),
            channel: MESSAGES_CHANNEL.to_string(),
            endpoint: None,
        }
    }
}

impl PusherConfig {
    pub fn socket_url(&self) -> String {
        let host = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("wss://ws-{}.pusher.com", self.cluster),
        };
        format!(
            "{host}/app/{}?protocol={PROTOCOL_VERSION}&client=live_chat&version={}&flavor=",
            self.app_key,
            env!("CARGO_PKG_VERSION")
        )
    }
}

/// One protocol frame. Server events carry `data` as a JSON-encoded string,
/// protocol frames sent by the client carry an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: &str, data: Value) -> Self {
        Frame {
            event: event.to_string(),
            channel: None,
            data,
        }
    }

    pub fn subscribe(channel: &str) -> Self {
        Frame::new(SUBSCRIBE, json!({ "channel": channel }))
    }

    pub fn pong() -> Self {
        Frame::new(PONG, json!({}))
    }

    /// The event payload as text, unwrapping string-encoded data.
    pub fn payload(&self) -> Cow<'_, str> {
        match &self.data {
            Value::String(text) => Cow::Borrowed(text),
            other => Cow::Owned(other.to_string()),
        }
    }

    fn to_message(&self) -> ChatResult<Message> {
        Ok(Message::text(serde_json::to_string(self)?))
    }
}

/// What the broker sent next: a parsed frame, or the end of the connection
/// with its close code when there was one.
enum Incoming {
    Frame(Frame),
    Closed(Option<u16>),
}

/// Reads until the next text frame that parses.
async fn next_frame<S>(socket: &mut S) -> ChatResult<Incoming>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(message) = socket.next().await {
        match message? {
            Message::Text(text) => match serde_json::from_str::<Frame>(text.as_str()) {
                Ok(frame) => return Ok(Incoming::Frame(frame)),
                Err(e) => debug!("Skipping malformed broker frame: {}", e),
            },
            Message::Close(close) => {
                return Ok(Incoming::Closed(close.map(|close| u16::from(close.code))))
            }
            _ => {}
        }
    }
    Ok(Incoming::Closed(None))
}

pub struct LiveChannel {
    name: String,
    events: mpsc::UnboundedReceiver<Frame>,
    reader: JoinHandle<()>,
}

impl LiveChannel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn next_event(&mut self) -> Option<Frame> {
        self.events.recv().await
    }

    /// Runs `handler` with the payload of every `event` on this channel until
    /// the broker turns the client away for good. Aborting the returned task
    /// closes the socket.
    pub fn bind<F>(mut self, event: &str, mut handler: F) -> JoinHandle<()>
    where
        F: FnMut(&str) + Send + 'static,
    {
        let event = event.to_string();
        tokio::spawn(async move {
            while let Some(frame) = self.next_event().await {
                if frame.event == event {
                    handler(&*frame.payload());
                }
            }
            debug!("Binding for {} on {} ended", event, self.name);
        })
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Connects and subscribes before returning, so a broker that cannot be
/// reached fails the caller. Later drops are retried in the background.
pub async fn subscribe(config: &PusherConfig) -> ChatResult<LiveChannel> {
    let socket = connect(config).await?;

    let (tx, rx) = mpsc::unbounded_channel();
    let reader = tokio::spawn(read_channel(socket, config.clone(), tx));

    Ok(LiveChannel {
        name: config.channel.clone(),
        events: rx,
        reader,
    })
}

async fn connect(config: &PusherConfig) -> ChatResult<Socket> {
    let url = config.socket_url();
    info!("Connecting to live channel {} via {}", config.channel, url);

    let (mut socket, _) = connect_async(url.as_str()).await?;
    await_established(&mut socket).await?;
    socket.send(Frame::subscribe(&config.channel).to_message()?).await?;
    Ok(socket)
}

async fn await_established(socket: &mut Socket) -> ChatResult<()> {
    loop {
        let Incoming::Frame(frame) = next_frame(socket).await? else {
            return Err(ChatError::ChannelClosed(CONNECTION_ESTABLISHED));
        };
        match frame.event.as_str() {
            CONNECTION_ESTABLISHED => {
                debug!("Broker connection established: {}", frame.payload());
                return Ok(());
            }
            ERROR => return Err(ChatError::Rejected(frame.payload().into_owned())),
            other => debug!("Ignoring {} before the handshake", other),
        }
    }
}

enum Disconnect {
    Closed(Option<u16>),
    Failed(ChatError),
    Unbound,
}

/// Close codes 4000-4099 tell the client not to come back.
fn may_reconnect(code: Option<u16>) -> bool {
    !matches!(code, Some(4000..=4099))
}

async fn read_channel(mut socket: Socket, config: PusherConfig, events: mpsc::UnboundedSender<Frame>) {
    let channel = config.channel.as_str();
    loop {
        match relay(&mut socket, channel, &events).await {
            Disconnect::Unbound => return,
            Disconnect::Closed(code) if !may_reconnect(code) => {
                info!("Live channel {} closed by the broker with {:?}, giving up", channel, code);
                return;
            }
            Disconnect::Closed(code) => {
                info!("Live channel {} closed by the broker with {:?}", channel, code);
            }
            Disconnect::Failed(e) => warn!("Live channel {} failed: {}", channel, e),
        }

        socket = loop {
            tokio::time::sleep(RECONNECT_DELAY).await;
            if events.is_closed() {
                return;
            }
            match connect(&config).await {
                Ok(socket) => break socket,
                Err(e) => warn!("Reconnecting to {} failed: {}", channel, e),
            }
        };
    }
}

/// Hands channel events to `events` until this connection ends.
async fn relay(socket: &mut Socket, channel: &str, events: &mpsc::UnboundedSender<Frame>) -> Disconnect {
    loop {
        let frame = match next_frame(socket).await {
            Ok(Incoming::Frame(frame)) => frame,
            Ok(Incoming::Closed(code)) => return Disconnect::Closed(code),
            Err(e) => return Disconnect::Failed(e),
        };

        let event = frame.event.clone();
        match event.as_str() {
            PING => {
                let sent = match Frame::pong().to_message() {
                    Ok(pong) => socket.send(pong).await.map_err(ChatError::from),
                    Err(e) => Err(e),
                };
                if let Err(e) = sent {
                    return Disconnect::Failed(e);
                }
            }
            SUBSCRIPTION_SUCCEEDED => info!("Subscribed to {}", channel),
            ERROR => warn!("Broker error on {}: {}", channel, frame.payload()),
            _ if frame.channel.as_deref() == Some(channel) => {
                if events.send(frame).is_err() {
                    return Disconnect::Unbound;
                }
            }
            other => debug!("Ignoring {} frame", other),
        }
    }
}
