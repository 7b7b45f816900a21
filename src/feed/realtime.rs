use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::tokio_tools::spawn_named_task;

use super::source::LeaderboardSource;
use super::{FeedUpdate, FEED_CAPACITY};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const LOG_TARGET: &str = "feed::realtime";

#[derive(Debug, Clone)]
pub struct SupabaseRealtimeClientConfig {
    pub realtime_url: Url,
    pub api_key: String,
    pub schema: String,
    pub table: String,
    pub event: String,
    pub handshake_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
}

impl SupabaseRealtimeClientConfig {
    pub fn new(realtime_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            realtime_url,
            api_key: api_key.into(),
            schema: "public".to_string(),
            table: "players".to_string(),
            event: "*".to_string(),
            handshake_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(5),
        }
    }

    pub fn topic(&self) -> String {
        format!("realtime:{}:{}", self.schema, self.table)
    }

    /// Derives `wss://<host>/realtime/v1/websocket` from a Supabase REST base URL.
    pub fn derive_url(rest_base: &str) -> Result<Url> {
        let mut base = Url::parse(rest_base).context("invalid SUPABASE_URL")?;
        let target_scheme = match base.scheme() {
            "https" => "wss".to_string(),
            "http" => "ws".to_string(),
            other => other.to_string(),
        };
        base.set_path("/realtime/v1/websocket");
        base.set_query(None);
        base.set_fragment(None);
        base.set_scheme(target_scheme.as_str())
            .map_err(|_| anyhow!("failed to convert Supabase URL scheme"))?;
        Ok(base)
    }

    fn socket_url(&self) -> Url {
        let mut url = self.realtime_url.clone();
        url.query_pairs_mut()
            .append_pair("apikey", &self.api_key)
            .append_pair("vsn", "1.0.0");
        url
    }
}

/// Push feed over Supabase realtime `postgres_changes` on the players table.
///
/// Change payloads only describe one row, so every matching change triggers a
/// full reload from `source`; the controller always sees complete lists.
pub struct RealtimeFeed {
    cfg: SupabaseRealtimeClientConfig,
    source: Arc<dyn LeaderboardSource>,
}

impl RealtimeFeed {
    pub fn new(cfg: SupabaseRealtimeClientConfig, source: Arc<dyn LeaderboardSource>) -> Self {
        Self { cfg, source }
    }

    pub fn spawn(self, stop: CancellationToken) -> (JoinHandle<()>, mpsc::Receiver<FeedUpdate>) {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let handle = spawn_named_task("leaderboard-realtime", async move {
            if let Err(err) = self.run(tx, stop).await {
                warn!(target = LOG_TARGET, error = %err, "realtime feed stopped with error");
            }
        });
        (handle, rx)
    }

    async fn run(self, tx: mpsc::Sender<FeedUpdate>, stop: CancellationToken) -> Result<()> {
        info!(target = LOG_TARGET, url = %self.cfg.realtime_url, "starting Supabase realtime feed");
        while !stop.is_cancelled() && !tx.is_closed() {
            match self.connect().await {
                Ok(stream) => {
                    if let Err(err) = self.pump(stream, &tx, &stop).await {
                        warn!(target = LOG_TARGET, error = %err, "realtime stream ended with error");
                    }
                }
                Err(err) => {
                    warn!(target = LOG_TARGET, error = %err, "failed to connect to Supabase realtime");
                }
            }

            if stop.is_cancelled() {
                break;
            }

            debug!(
                target = LOG_TARGET,
                delay_secs = self.cfg.reconnect_delay.as_secs_f32(),
                "waiting before reconnect attempt"
            );
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = sleep(self.cfg.reconnect_delay) => {}
            }
        }

        info!(target = LOG_TARGET, "Supabase realtime feed stopped");
        Ok(())
    }

    async fn connect(&self) -> Result<WsStream> {
        let ws_url = self.cfg.socket_url().to_string();
        let (stream, _) = timeout(self.cfg.handshake_timeout, connect_async(ws_url))
            .await
            .context("Supabase realtime handshake timed out")?
            .context("Supabase realtime handshake failed")?;
        Ok(stream)
    }

    async fn pump(
        &self,
        stream: WsStream,
        tx: &mpsc::Sender<FeedUpdate>,
        stop: &CancellationToken,
    ) -> Result<()> {
        let (mut sink, mut source) = stream.split();

        sink.send(Message::Text(join_message(&self.cfg)?))
            .await
            .context("failed to send join message")?;

        let mut heartbeat = interval(self.cfg.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let heartbeat_msg = heartbeat_message()?;
        let topic = self.cfg.topic();
        let mut joined = false;

        loop {
            tokio::select! {
                _ = stop.cancelled() => {
                    debug!(target = LOG_TARGET, "shutdown signal received");
                    break;
                }
                _ = heartbeat.tick() => {
                    if let Err(err) = sink.send(Message::Text(heartbeat_msg.clone())).await {
                        warn!(target = LOG_TARGET, error = %err, "heartbeat send failed, ending loop");
                        break;
                    }
                }
                msg = source.next() => {
                    match msg {
                        Some(Ok(Message::Text(txt))) => {
                            match classify(&topic, &self.cfg.table, &txt) {
                                Ok(Incoming::Joined) => {
                                    debug!(target = LOG_TARGET, "subscription acknowledged");
                                    joined = true;
                                    // catch up on anything written before the join
                                    if !self.forward_reload(tx).await {
                                        break;
                                    }
                                }
                                Ok(Incoming::Rejected(status)) => {
                                    return Err(anyhow!("subscription rejected with status {status}"));
                                }
                                Ok(Incoming::Changed) if joined => {
                                    if !self.forward_reload(tx).await {
                                        break;
                                    }
                                }
                                Ok(Incoming::Changed) => {
                                    debug!(target = LOG_TARGET, "ignoring change before join ack");
                                }
                                Ok(Incoming::Ignored) => {}
                                Err(err) => {
                                    warn!(target = LOG_TARGET, error = %err, "failed to handle realtime message");
                                }
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            sink.send(Message::Pong(payload)).await.ok();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!(target = LOG_TARGET, ?frame, "socket closed by server");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            warn!(target = LOG_TARGET, error = %err, "websocket error");
                            break;
                        }
                        None => {
                            debug!(target = LOG_TARGET, "websocket stream ended");
                            break;
                        }
                    }
                }
            }
        }

        if let Ok(leave) = leave_message(topic) {
            sink.send(Message::Text(leave)).await.ok();
        }
        let _ = sink.close().await;

        Ok(())
    }

    /// Returns `false` once the consumer is gone.
    async fn forward_reload(&self, tx: &mpsc::Sender<FeedUpdate>) -> bool {
        let update = FeedUpdate::from(self.source.fetch().await);
        tx.send(update).await.is_ok()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Incoming {
    Joined,
    Rejected(String),
    Changed,
    Ignored,
}

fn classify(topic: &str, table: &str, txt: &str) -> Result<Incoming> {
    let message: IncomingMessage =
        serde_json::from_str(txt).context("failed to deserialize realtime message")?;
    if message.topic != topic {
        return Ok(Incoming::Ignored);
    }

    match message.event.as_str() {
        "phx_reply" => {
            let Some(payload) = message.payload else {
                return Ok(Incoming::Ignored);
            };
            let reply: ReplyPayload =
                serde_json::from_value(payload).context("failed to decode phx_reply payload")?;
            if reply.status == "ok" {
                Ok(Incoming::Joined)
            } else {
                Ok(Incoming::Rejected(reply.status))
            }
        }
        "postgres_changes" => {
            let Some(payload) = message.payload else {
                return Ok(Incoming::Ignored);
            };
            let payload: PgPayload = serde_json::from_value(payload)
                .context("failed to parse postgres change payload")?;
            match payload.data {
                Some(change) if change.table.is_empty() || change.table == table => {
                    debug!(
                        target = LOG_TARGET,
                        event_type = %change.event_type,
                        "players table changed"
                    );
                    Ok(Incoming::Changed)
                }
                _ => Ok(Incoming::Ignored),
            }
        }
        other => {
            debug!(target = LOG_TARGET, event = other, "ignoring realtime event");
            Ok(Incoming::Ignored)
        }
    }
}

fn join_message(cfg: &SupabaseRealtimeClientConfig) -> Result<String> {
    let payload = JoinPayload {
        access_token: &cfg.api_key,
        config: JoinConfig {
            postgres_changes: [PostgresChange {
                event: cfg.event.as_str(),
                schema: cfg.schema.as_str(),
                table: cfg.table.as_str(),
            }],
        },
    };

    encode_message(&PhoenixEnvelope {
        topic: cfg.topic(),
        event: "phx_join",
        reference: "1",
        payload,
    })
}

fn heartbeat_message() -> Result<String> {
    encode_message(&PhoenixEnvelope {
        topic: "phoenix".to_string(),
        event: "heartbeat",
        reference: "hb",
        payload: EmptyPayload {},
    })
}

fn leave_message(topic: String) -> Result<String> {
    encode_message(&PhoenixEnvelope {
        topic,
        event: "phx_leave",
        reference: "2",
        payload: EmptyPayload {},
    })
}

fn encode_message<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("failed to serialize realtime message")
}

#[derive(serde::Serialize)]
struct PhoenixEnvelope<T> {
    topic: String,
    event: &'static str,
    #[serde(rename = "ref")]
    reference: &'static str,
    payload: T,
}

#[derive(serde::Serialize)]
struct EmptyPayload {}

#[derive(serde::Serialize)]
struct JoinPayload<'a> {
    access_token: &'a str,
    config: JoinConfig<'a>,
}

#[derive(serde::Serialize)]
struct JoinConfig<'a> {
    postgres_changes: [PostgresChange<'a>; 1],
}

#[derive(serde::Serialize)]
struct PostgresChange<'a> {
    event: &'a str,
    schema: &'a str,
    table: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct IncomingMessage {
    topic: String,
    event: String,
    payload: Option<Value>,
}

#[derive(Debug, serde::Deserialize)]
struct PgPayload {
    data: Option<Change>,
}

#[derive(Debug, serde::Deserialize)]
struct Change {
    #[serde(default)]
    table: String,
    #[serde(rename = "eventType", alias = "type")]
    event_type: String,
}

#[derive(Debug, serde::Deserialize)]
struct ReplyPayload {
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client_config() -> SupabaseRealtimeClientConfig {
        SupabaseRealtimeClientConfig::new(
            Url::parse("wss://example.supabase.co/realtime/v1/websocket").unwrap(),
            "anon",
        )
    }

    #[test]
    fn derives_websocket_url_from_rest_base() {
        let url = SupabaseRealtimeClientConfig::derive_url("https://example.supabase.co/rest/v1?x=1")
            .unwrap();
        assert_eq!(url.as_str(), "wss://example.supabase.co/realtime/v1/websocket");

        let local = SupabaseRealtimeClientConfig::derive_url("http://localhost:54321").unwrap();
        assert_eq!(local.scheme(), "ws");
    }

    #[test]
    fn join_subscribes_to_player_changes() {
        let joined: Value = serde_json::from_str(&join_message(&client_config()).unwrap()).unwrap();
        assert_eq!(joined["topic"], "realtime:public:players");
        assert_eq!(joined["event"], "phx_join");
        assert_eq!(joined["ref"], "1");
        assert_eq!(
            joined["payload"]["config"]["postgres_changes"][0],
            json!({ "event": "*", "schema": "public", "table": "players" })
        );
    }

    #[test]
    fn classifies_join_reply_and_changes() {
        let topic = client_config().topic();
        let ok = json!({ "topic": topic, "event": "phx_reply", "ref": "1", "payload": { "status": "ok" } });
        assert_eq!(
            classify(&topic, "players", &ok.to_string()).unwrap(),
            Incoming::Joined
        );

        let rejected = json!({ "topic": topic, "event": "phx_reply", "payload": { "status": "error" } });
        assert_eq!(
            classify(&topic, "players", &rejected.to_string()).unwrap(),
            Incoming::Rejected("error".into())
        );

        let change = json!({
            "topic": topic,
            "event": "postgres_changes",
            "payload": { "data": { "table": "players", "eventType": "UPDATE", "commit_timestamp": "now" } }
        });
        assert_eq!(
            classify(&topic, "players", &change.to_string()).unwrap(),
            Incoming::Changed
        );

        let other_table = json!({
            "topic": topic,
            "event": "postgres_changes",
            "payload": { "data": { "table": "games", "type": "INSERT" } }
        });
        assert_eq!(
            classify(&topic, "players", &other_table.to_string()).unwrap(),
            Incoming::Ignored
        );
    }

    #[test]
    fn other_topics_are_ignored() {
        let msg = json!({ "topic": "phoenix", "event": "phx_reply", "payload": { "status": "ok" } });
        assert_eq!(
            classify(&client_config().topic(), "players", &msg.to_string()).unwrap(),
            Incoming::Ignored
        );
        assert!(classify(&client_config().topic(), "players", "not json").is_err());
    }
}
