use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::store::{PlayerStore, StoreError};
use crate::tokio_tools::spawn_named_task;

const LOG_TARGET: &str = "admin::sync";

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Keys tried in order for a user's display name.
const NAME_KEYS: [&str; 4] = ["username", "name", "user_name", "email"];

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("users request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("users endpoint {endpoint} returned status {status}")]
    Status { status: u16, endpoint: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub deleted: usize,
    /// Distinct users reported by the directory.
    pub total: usize,
}

/// The external list of users that should appear on the board.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn usernames(&self) -> Result<Vec<String>, SyncError>;
}

pub struct HttpUserDirectory {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl HttpUserDirectory {
    pub const TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(endpoint: Url, api_key: impl Into<String>) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().timeout(Self::TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn usernames(&self) -> Result<Vec<String>, SyncError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                status: status.as_u16(),
                endpoint: self.endpoint.to_string(),
            });
        }

        let payload: Value = response.json().await?;
        Ok(extract_usernames(&payload))
    }
}

/// Pulls usernames out of the loosely shaped users payload.
///
/// Accepts a list of user objects, a list of JSON-encoded user objects, or an
/// object whose values are such lists. Only entries with `role == "user"`
/// count.
pub fn extract_usernames(payload: &Value) -> Vec<String> {
    let entries: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(groups) => groups
            .values()
            .filter_map(Value::as_array)
            .flatten()
            .collect(),
        _ => Vec::new(),
    };

    entries.into_iter().filter_map(username_of).collect()
}

fn username_of(entry: &Value) -> Option<String> {
    match entry {
        Value::Object(_) => user_name(entry),
        Value::String(encoded) => serde_json::from_str::<Value>(encoded)
            .ok()
            .and_then(|decoded| user_name(&decoded)),
        _ => None,
    }
}

fn user_name(user: &Value) -> Option<String> {
    if user.get("role").and_then(Value::as_str) != Some("user") {
        return None;
    }
    NAME_KEYS.iter().find_map(|key| match user.get(*key)? {
        Value::String(name) if !name.is_empty() => Some(name.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// Makes the store's player set match the directory: missing users are
/// created at zero, players the directory no longer lists are deleted.
pub async fn sync_players(
    store: &dyn PlayerStore,
    directory: &dyn UserDirectory,
) -> Result<SyncReport, SyncError> {
    let wanted: BTreeSet<String> = directory.usernames().await?.into_iter().collect();
    let current: BTreeSet<String> = store
        .ranked()
        .await?
        .iter()
        .map(|player| player.name.clone())
        .collect();

    let mut report = SyncReport {
        total: wanted.len(),
        ..SyncReport::default()
    };
    for name in wanted.difference(&current) {
        store.upsert(name).await?;
        report.created += 1;
    }
    for name in current.difference(&wanted) {
        store.delete(name).await?;
        report.deleted += 1;
    }

    info!(
        target = LOG_TARGET,
        created = report.created,
        deleted = report.deleted,
        total = report.total,
        "synced users"
    );
    Ok(report)
}

/// Runs [`sync_players`] on a fixed interval. A pass whose directory fetch
/// fails is skipped so an outage never empties the board.
pub fn spawn_sync_loop(
    store: Arc<dyn PlayerStore>,
    directory: Arc<dyn UserDirectory>,
    every: Duration,
    stop: CancellationToken,
) -> JoinHandle<()> {
    spawn_named_task("user-sync", async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(target = LOG_TARGET, interval_secs = every.as_secs(), "user sync started");

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match sync_players(store.as_ref(), directory.as_ref()).await {
                Ok(report) => debug!(target = LOG_TARGET, ?report, "sync pass complete"),
                Err(err) => warn!(target = LOG_TARGET, error = %err, "sync pass skipped"),
            }
        }

        info!(target = LOG_TARGET, "user sync stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standings::PlayerRecord;
    use crate::store::InMemoryPlayerStore;
    use parking_lot::Mutex;
    use serde_json::json;

    struct FixedDirectory {
        names: Mutex<Option<Vec<String>>>,
        calls: Mutex<usize>,
    }

    impl FixedDirectory {
        fn new(names: Option<&[&str]>) -> Self {
            Self {
                names: Mutex::new(names.map(|n| n.iter().map(|s| s.to_string()).collect())),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl UserDirectory for FixedDirectory {
        async fn usernames(&self) -> Result<Vec<String>, SyncError> {
            *self.calls.lock() += 1;
            self.names.lock().clone().ok_or(SyncError::Status {
                status: 502,
                endpoint: "fixed".into(),
            })
        }
    }

    #[test]
    fn extracts_names_from_every_payload_shape() {
        let list = json!([
            { "role": "user", "username": "amy" },
            { "role": "admin", "username": "root" },
            { "role": "user", "username": "", "name": "bob" },
            { "role": "user", "email": "cat@example.com" },
            "{\"role\":\"user\",\"user_name\":\"dan\"}",
            "not json",
            { "role": "user" },
            42
        ]);
        assert_eq!(
            extract_usernames(&list),
            vec!["amy", "bob", "cat@example.com", "dan"]
        );

        let grouped = json!({
            "users": [{ "role": "user", "name": "eve" }],
            "count": 1
        });
        assert_eq!(extract_usernames(&grouped), vec!["eve"]);

        assert!(extract_usernames(&json!("nope")).is_empty());
    }

    #[tokio::test]
    async fn sync_creates_missing_and_deletes_stale() {
        let store = InMemoryPlayerStore::with_players([
            PlayerRecord::new("amy", 30),
            PlayerRecord::new("old", 7),
        ]);
        let directory = FixedDirectory::new(Some(&["amy", "bob", "bob"]));

        let report = sync_players(&store, &directory).await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                created: 1,
                deleted: 1,
                total: 2
            }
        );
        let list = store.ranked().await.unwrap();
        assert_eq!(list.get("amy").map(|p| p.score), Some(30));
        assert_eq!(list.get("bob").map(|p| p.score), Some(0));
        assert!(list.get("old").is_none());
    }

    #[tokio::test]
    async fn failed_directory_leaves_players_alone() {
        let store = InMemoryPlayerStore::with_players([PlayerRecord::new("amy", 30)]);
        let directory = FixedDirectory::new(None);

        assert!(sync_players(&store, &directory).await.is_err());
        assert_eq!(store.ranked().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_runs_each_interval_until_stopped() {
        let store: Arc<dyn PlayerStore> = Arc::new(InMemoryPlayerStore::new());
        let directory = Arc::new(FixedDirectory::new(Some(&["amy"])));
        let stop = CancellationToken::new();

        let handle = spawn_sync_loop(
            Arc::clone(&store),
            Arc::clone(&directory) as Arc<dyn UserDirectory>,
            Duration::from_secs(30),
            stop.clone(),
        );

        tokio::time::sleep(Duration::from_secs(61)).await;
        stop.cancel();
        handle.await.unwrap();

        assert_eq!(*directory.calls.lock(), 3);
        assert_eq!(store.ranked().await.unwrap().len(), 1);
    }
}
