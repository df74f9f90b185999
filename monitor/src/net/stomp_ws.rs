use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use seaxcore::ais_interface::{Command, Frame};
use seaxcore::prelude::{FeedError, FeedResult, Subscription, Transport, TransportEvent};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(0);

/// STOMP 1.2 over a plain WebSocket, one socket per subscription.
#[derive(Debug, Clone)]
pub struct StompWsTransport {
    url: String,
    host: String,
}

impl StompWsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let host = host_of(&url);
        Self { url, host }
    }
}

/// Live STOMP subscription on its own socket.
pub struct StompSubscription {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    id: String,
    destination: String,
}

impl Transport for StompWsTransport {
    type Subscription = StompSubscription;

    fn subscribe(&self, topic: &str) -> impl Future<Output = FeedResult<StompSubscription>> + Send {
        let url = self.url.clone();
        let host = self.host.clone();
        let destination = format!("/topic/{}", topic.trim_start_matches('/'));
        let id = format!("sub-{}", NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed));
        async move {
            let (stream, _) = connect_async(url.as_str())
                .await
                .map_err(|e| FeedError::Transport(e.to_string()))?;
            let (mut write, mut read) = stream.split();

            send_frame(&mut write, &Frame::connect(&host)).await?;
            tokio::time::timeout(HANDSHAKE_TIMEOUT, await_connected(&mut read))
                .await
                .map_err(|_| FeedError::Protocol("no CONNECTED frame from broker".into()))??;
            send_frame(&mut write, &Frame::subscribe(&id, &destination)).await?;
            debug!("subscribed {} to {}", id, destination);

            Ok(StompSubscription {
                write,
                read,
                id,
                destination,
            })
        }
    }
}

impl Subscription for StompSubscription {
    fn next_event(&mut self) -> impl Future<Output = TransportEvent> + Send {
        async move {
            loop {
                match self.read.next().await {
                    Some(Ok(Message::Text(text))) => match Frame::decode(&text.to_string()) {
                        Ok(Some(frame)) => match frame.command {
                            Command::Message => return TransportEvent::Message(frame.body),
                            Command::Error => warn!(
                                "broker error on {}: {} {}",
                                self.destination,
                                frame.get("message").unwrap_or(""),
                                frame.body
                            ),
                            other => debug!("ignoring {} frame on {}", other, self.destination),
                        },
                        Ok(None) => {}
                        Err(err) => warn!("undecodable frame on {}: {}", self.destination, err),
                    },
                    Some(Ok(Message::Close(_))) => {
                        return TransportEvent::Closed(Some("closed by broker".into()))
                    }
                    Some(Err(err)) => return TransportEvent::Closed(Some(err.to_string())),
                    None => return TransportEvent::Closed(None),
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    fn close(self) -> impl Future<Output = ()> + Send {
        let StompSubscription { mut write, id, .. } = self;
        async move {
            if let Err(err) = send_frame(&mut write, &Frame::unsubscribe(&id)).await {
                debug!("unsubscribe of {} not sent: {}", id, err);
            }
            let _ = send_frame(&mut write, &Frame::disconnect()).await;
            let _ = write.close().await;
        }
    }
}

async fn send_frame(write: &mut SplitSink<WsStream, Message>, frame: &Frame) -> FeedResult<()> {
    write
        .send(Message::text(frame.encode()))
        .await
        .map_err(|e| FeedError::Transport(e.to_string()))
}

async fn await_connected(read: &mut SplitStream<WsStream>) -> FeedResult<()> {
    while let Some(message) = read.next().await {
        match message.map_err(|e| FeedError::Transport(e.to_string()))? {
            Message::Text(text) => match Frame::decode(&text.to_string())? {
                Some(frame) if frame.command == Command::Connected => return Ok(()),
                Some(frame) if frame.command == Command::Error => {
                    return Err(FeedError::Protocol(
                        frame.get("message").unwrap_or("broker refused CONNECT").to_string(),
                    ))
                }
                _ => {}
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(FeedError::Transport("socket closed during STOMP handshake".into()))
}

/// `host:port` part of a socket URL, used as the STOMP virtual host.
fn host_of(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme
        .split(['/', '?'])
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}
