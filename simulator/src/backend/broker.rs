//! In-process STOMP 1.2 broker for the `/ws` endpoint.
//!
//! Only what the monitor needs: CONNECT, SUBSCRIBE/UNSUBSCRIBE by
//! destination, DISCONNECT and MESSAGE fan-out. No acks, no transactions.

use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use seaxcore::ais_interface::{Command, Frame};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use warp::ws::{Message, WebSocket};

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct Published {
    pub destination: String,
    pub body: String,
}

#[derive(Clone)]
pub struct Broker {
    messages: broadcast::Sender<Published>,
    kick: broadcast::Sender<()>,
    accepting: Arc<AtomicBool>,
    sessions: Arc<AtomicU64>,
}

impl Broker {
    pub fn new() -> Self {
        let (messages, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (kick, _) = broadcast::channel(4);
        Self {
            messages,
            kick,
            accepting: Arc::new(AtomicBool::new(true)),
            sessions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Serializes `payload` to JSON and fans it out to every subscriber of
    /// `destination`. Returns the number of live sessions it reached.
    pub fn publish<T: Serialize>(&self, destination: &str, payload: &T) -> anyhow::Result<usize> {
        let body = serde_json::to_string(payload)?;
        Ok(self
            .messages
            .send(Published {
                destination: destination.to_string(),
                body,
            })
            .unwrap_or(0))
    }

    /// Going down refuses new sessions and drops every live one.
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
        if !accepting {
            let _ = self.kick.send(());
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    pub async fn serve_socket(self, socket: WebSocket) {
        let session_id = self.sessions.fetch_add(1, Ordering::Relaxed);
        let (mut tx, mut rx) = socket.split();
        let mut messages = self.messages.subscribe();
        let mut kick = self.kick.subscribe();
        let mut session = StompSession::new(session_id);
        debug!("session {} opened", session_id);

        loop {
            let outgoing = tokio::select! {
                incoming = rx.next() => {
                    let Some(Ok(message)) = incoming else { break };
                    if message.is_close() {
                        break;
                    }
                    let Ok(text) = message.to_str() else { continue };
                    session.handle(text, self.is_accepting())
                }
                published = messages.recv() => match published {
                    Ok(published) => Outcome::send(session.deliver(&published)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("session {} lagged, {} messages skipped", session_id, skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = kick.recv() => {
                    debug!("session {} dropped by health toggle", session_id);
                    break;
                }
            };

            for frame in &outgoing.frames {
                if tx.send(Message::text(frame.encode())).await.is_err() {
                    session.close = true;
                }
            }
            if outgoing.close || session.close {
                break;
            }
        }

        let _ = tx.close().await;
        debug!("session {} closed", session_id);
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames to send back, and whether the socket closes afterwards.
#[derive(Debug, Default)]
pub struct Outcome {
    pub frames: Vec<Frame>,
    pub close: bool,
}

impl Outcome {
    fn send(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            close: false,
        }
    }

    fn fail(message: &str) -> Self {
        Self {
            frames: vec![Frame::new(Command::Error).header("message", message)],
            close: true,
        }
    }
}

/// Per-socket protocol state, kept apart from the socket for testing.
#[derive(Debug)]
pub struct StompSession {
    id: u64,
    connected: bool,
    close: bool,
    subscriptions: Vec<(String, String)>,
    delivered: u64,
}

impl StompSession {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            connected: false,
            close: false,
            subscriptions: Vec::new(),
            delivered: 0,
        }
    }

    pub fn handle(&mut self, raw: &str, accepting: bool) -> Outcome {
        let frame = match Frame::decode(raw) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Outcome::default(),
            Err(err) => return Outcome::fail(&err.to_string()),
        };

        let mut outcome = match frame.command {
            Command::Connect | Command::Stomp => {
                if !accepting {
                    return Outcome::fail("broker unavailable");
                }
                self.connected = true;
                Outcome::send(vec![Frame::new(Command::Connected)
                    .header("version", "1.2")
                    .header("heart-beat", "0,0")
                    .header("server", "seax-simulator")])
            }
            _ if !self.connected => return Outcome::fail("not connected"),
            Command::Subscribe => {
                let (Some(id), Some(destination)) = (frame.get("id"), frame.get("destination")) else {
                    return Outcome::fail("SUBSCRIBE needs id and destination");
                };
                self.subscriptions.retain(|(existing, _)| existing != id);
                self.subscriptions.push((id.to_string(), destination.to_string()));
                Outcome::default()
            }
            Command::Unsubscribe => {
                if let Some(id) = frame.get("id") {
                    self.subscriptions.retain(|(existing, _)| existing != id);
                }
                Outcome::default()
            }
            Command::Disconnect => Outcome {
                frames: Vec::new(),
                close: true,
            },
            Command::Send => Outcome::default(),
            other => return Outcome::fail(&format!("unexpected {} frame from client", other)),
        };

        if let Some(receipt) = frame.get("receipt") {
            outcome
                .frames
                .push(Frame::new(Command::Receipt).header("receipt-id", receipt));
        }
        outcome
    }

    pub fn deliver(&mut self, published: &Published) -> Vec<Frame> {
        if !self.connected {
            return Vec::new();
        }
        let mut frames = Vec::new();
        for (id, destination) in &self.subscriptions {
            if *destination != published.destination {
                continue;
            }
            self.delivered += 1;
            frames.push(
                Frame::new(Command::Message)
                    .header("destination", destination.as_str())
                    .header("subscription", id.as_str())
                    .header("message-id", format!("{}-{}", self.id, self.delivered))
                    .header("content-type", "application/json")
                    .with_body(published.body.clone()),
            );
        }
        frames
    }

    #[cfg(test)]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn published(destination: &str) -> Published {
        Published {
            destination: destination.into(),
            body: "{\"sourcemmsi\":1}".into(),
        }
    }

    #[test]
    fn connect_then_subscribe_receives_matching_messages() {
        let mut session = StompSession::new(0);
        let reply = session.handle(&Frame::connect("localhost").encode(), true);
        assert_eq!(reply.frames[0].command, Command::Connected);

        session.handle(&Frame::subscribe("s1", "/topic/ais-data").encode(), true);
        assert_eq!(session.subscription_count(), 1);

        let frames = session.deliver(&published("/topic/ais-data"));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].get("subscription"), Some("s1"));
        assert_eq!(frames[0].body, "{\"sourcemmsi\":1}");
        assert!(session.deliver(&published("/topic/violations/1")).is_empty());
    }

    #[test]
    fn unavailable_broker_refuses_connect() {
        let mut session = StompSession::new(0);
        let reply = session.handle(&Frame::connect("localhost").encode(), false);
        assert!(reply.close);
        assert_eq!(reply.frames[0].command, Command::Error);
    }

    #[test]
    fn subscribe_before_connect_is_an_error() {
        let mut session = StompSession::new(0);
        let reply = session.handle(&Frame::subscribe("s1", "/topic/x").encode(), true);
        assert!(reply.close);
    }

    #[test]
    fn unsubscribe_and_disconnect() {
        let mut session = StompSession::new(0);
        session.handle(&Frame::connect("localhost").encode(), true);
        session.handle(&Frame::subscribe("s1", "/topic/x").encode(), true);
        session.handle(&Frame::unsubscribe("s1").encode(), true);
        assert!(session.deliver(&published("/topic/x")).is_empty());

        let reply = session.handle(&Frame::disconnect().header("receipt", "bye").encode(), true);
        assert!(reply.close);
        assert_eq!(reply.frames[0].get("receipt-id"), Some("bye"));
    }

    #[test]
    fn heartbeat_is_ignored() {
        let mut session = StompSession::new(0);
        let reply = session.handle("\n", true);
        assert!(reply.frames.is_empty());
        assert!(!reply.close);
    }
}
