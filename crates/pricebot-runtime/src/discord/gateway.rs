//! Discord gateway sessions
//!
//! Keeps a satellite bot online: connect, identify, then heartbeat until told
//! to stop. A dropped connection is re-identified with exponential backoff.
//! Presence is all we need, dispatch events other than READY are ignored.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pricebot_core::{BotError, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);

mod op {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
}

#[derive(Debug, Deserialize)]
struct Payload {
    op: u8,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

fn identify(token: &str) -> Message {
    let payload = json!({
        "op": op::IDENTIFY,
        "d": {
            "token": token,
            "intents": 0,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "pricebot",
                "device": "pricebot",
            },
        },
    });
    Message::Text(payload.to_string())
}

fn heartbeat(seq: Option<u64>) -> Message {
    Message::Text(json!({ "op": op::HEARTBEAT, "d": seq }).to_string())
}

fn parse(message: &Message) -> Option<Payload> {
    match message {
        Message::Text(text) => serde_json::from_str(text).ok(),
        _ => None,
    }
}

fn heartbeat_interval(hello: &Payload) -> Option<Duration> {
    (hello.op == op::HELLO)
        .then(|| hello.d.get("heartbeat_interval").and_then(Value::as_u64))
        .flatten()
        .map(Duration::from_millis)
}

/// Delay between reconnect attempts, doubling up to a cap
#[derive(Debug)]
struct Backoff {
    next: Duration,
}

impl Backoff {
    const FIRST: Duration = Duration::from_secs(1);
    const MAX: Duration = Duration::from_secs(60);

    const fn new() -> Self {
        Self { next: Self::FIRST }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(Self::MAX);
        delay
    }

    const fn reset(&mut self) {
        self.next = Self::FIRST;
    }
}

/// How a heartbeat loop ended
enum Ended {
    Stopped,
    Dropped,
}

/// A live gateway connection for one bot identity, reconnecting on its own
pub(crate) struct GatewaySession {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl GatewaySession {
    pub(crate) async fn connect(url: &str, token: &str, label: &str) -> Result<Self> {
        let (socket, interval, seq) = tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake(url, token))
            .await
            .map_err(|_| BotError::TransientSend("gateway handshake timed out".into()))??;

        let (shutdown, stop) = oneshot::channel();
        let link = Link {
            url: url.to_string(),
            token: token.to_string(),
            label: label.to_string(),
        };
        let task = tokio::spawn(async move { run(link, socket, interval, seq, stop).await });

        Ok(Self { shutdown, task })
    }

    pub(crate) async fn close(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::debug!(error = %e, "Gateway task ended abnormally");
        }
    }
}

struct Link {
    url: String,
    token: String,
    label: String,
}

async fn handshake(url: &str, token: &str) -> Result<(Socket, Duration, Option<u64>)> {
    let (mut socket, _) = connect_async(url)
        .await
        .map_err(|e| BotError::TransientSend(format!("gateway connect failed: {e}")))?;

    let interval = match socket.next().await {
        Some(Ok(message)) => parse(&message).as_ref().and_then(heartbeat_interval),
        _ => None,
    }
    .ok_or_else(|| BotError::Provider("Discord gateway did not say hello".into()))?;

    socket
        .send(identify(token))
        .await
        .map_err(|e| BotError::TransientSend(format!("identify failed: {e}")))?;

    while let Some(message) = socket.next().await {
        let message = message.map_err(|e| BotError::TransientSend(format!("gateway read failed: {e}")))?;
        if let Message::Close(frame) = &message {
            let reason = frame.as_ref().map(|f| f.reason.to_string()).unwrap_or_default();
            return Err(BotError::Provider(format!("Discord closed the gateway: {reason}")));
        }

        let Some(payload) = parse(&message) else {
            continue;
        };
        match payload.op {
            op::DISPATCH if payload.t.as_deref() == Some("READY") => {
                return Ok((socket, interval, payload.s));
            }
            op::INVALID_SESSION => {
                return Err(BotError::Provider("Discord rejected the bot token".into()));
            }
            _ => {}
        }
    }

    Err(BotError::TransientSend("gateway closed before READY".into()))
}

/// Keep the identity online until stopped, re-identifying whenever the connection drops
async fn run(
    link: Link,
    mut socket: Socket,
    mut interval: Duration,
    mut seq: Option<u64>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut backoff = Backoff::new();

    loop {
        if let Ended::Stopped = heartbeat_loop(socket, interval, &mut seq, &mut stop, &link.label).await {
            return;
        }

        loop {
            let delay = backoff.next_delay();
            tracing::warn!(client_id = %link.label, delay_secs = delay.as_secs(), "Gateway session dropped, reconnecting");

            let attempt = tokio::select! {
                _ = &mut stop => return,
                attempt = async {
                    tokio::time::sleep(delay).await;
                    tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake(&link.url, &link.token)).await
                } => attempt,
            };

            match attempt {
                Ok(Ok((fresh, fresh_interval, fresh_seq))) => {
                    socket = fresh;
                    interval = fresh_interval;
                    seq = fresh_seq;
                    backoff.reset();
                    tracing::info!(client_id = %link.label, "Gateway session reconnected");
                    break;
                }
                Ok(Err(e)) => tracing::warn!(client_id = %link.label, error = %e, "Gateway reconnect failed"),
                Err(_) => tracing::warn!(client_id = %link.label, "Gateway reconnect timed out"),
            }
        }
    }
}

async fn heartbeat_loop(
    mut socket: Socket,
    interval: Duration,
    seq: &mut Option<u64>,
    stop: &mut oneshot::Receiver<()>,
    label: &str,
) -> Ended {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut *stop => {
                let _ = socket.close(None).await;
                tracing::debug!(client_id = %label, "Gateway session closed");
                return Ended::Stopped;
            }
            _ = ticker.tick() => {
                if let Err(e) = socket.send(heartbeat(*seq)).await {
                    tracing::warn!(client_id = %label, error = %e, "Heartbeat failed");
                    return Ended::Dropped;
                }
            }
            message = socket.next() => match message {
                Some(Ok(Message::Close(_))) | None => return Ended::Dropped,
                Some(Ok(message)) => {
                    let Some(payload) = parse(&message) else { continue };
                    if payload.s.is_some() {
                        *seq = payload.s;
                    }
                    match payload.op {
                        op::HEARTBEAT => {
                            let _ = socket.send(heartbeat(*seq)).await;
                        }
                        op::RECONNECT | op::INVALID_SESSION => {
                            let _ = socket.close(None).await;
                            return Ended::Dropped;
                        }
                        _ => {}
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(client_id = %label, error = %e, "Gateway read failed");
                    return Ended::Dropped;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_hello_interval() {
        let hello = parse(&Message::Text(r#"{"op":10,"d":{"heartbeat_interval":41250},"s":null,"t":null}"#.into())).unwrap();
        assert_eq!(heartbeat_interval(&hello), Some(Duration::from_millis(41250)));

        let dispatch = parse(&Message::Text(r#"{"op":0,"d":{},"s":1,"t":"READY"}"#.into())).unwrap();
        assert_eq!(heartbeat_interval(&dispatch), None);
    }

    #[test]
    fn test_identify_payload() {
        let Message::Text(text) = identify("bot-token") else {
            panic!("identify must be a text frame");
        };
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["op"], 2);
        assert_eq!(value["d"]["token"], "bot-token");
        assert_eq!(value["d"]["intents"], 0);
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let mut backoff = Backoff::new();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        for _ in 0..10 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    /// Fake gateway: hello, READY, and on the first connection an op 7 reconnect request
    async fn fake_gateway(listener: TcpListener, connections: Arc<AtomicUsize>) {
        while let Ok((stream, _)) = listener.accept().await {
            let seen = connections.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                let hello = json!({ "op": 10, "d": { "heartbeat_interval": 45000 } });
                let _ = ws.send(Message::Text(hello.to_string())).await;
                let _ = ws.next().await;
                let ready = json!({ "op": 0, "t": "READY", "s": 1, "d": {} });
                let _ = ws.send(Message::Text(ready.to_string())).await;
                if seen == 0 {
                    let _ = ws.send(Message::Text(json!({ "op": 7, "d": null }).to_string())).await;
                }
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    }

    #[tokio::test]
    async fn test_session_reconnects_when_asked() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let connections = Arc::new(AtomicUsize::new(0));
        tokio::spawn(fake_gateway(listener, connections.clone()));

        let session = GatewaySession::connect(&url, "bot-token", "client-1").await.unwrap();

        let reconnected = tokio::time::timeout(Duration::from_secs(10), async {
            while connections.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;
        assert!(reconnected.is_ok());

        session.close().await;
    }

    #[test]
    fn test_heartbeat_carries_sequence() {
        let Message::Text(text) = heartbeat(Some(42)) else {
            panic!("heartbeat must be a text frame");
        };
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({ "op": 1, "d": 42 }));
    }
}
