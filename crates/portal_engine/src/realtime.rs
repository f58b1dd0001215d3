use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::rest::{check_status, map_reqwest_error};
use crate::{ChannelEvent, GatewayError, RowEventKind};

/// Capacity of the per-subscription event channel. Realtime folds are
/// idempotent, so a slow consumer only delays, never corrupts.
const CHANNEL_CAPACITY: usize = 64;

const POLL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// What a subscription listens for: a named channel, optionally scoped to
/// one table/event class with a filter expression, optionally carrying
/// presence snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub name: String,
    pub table: Option<String>,
    /// `INSERT`, `UPDATE` or `*`.
    pub event: Option<String>,
    pub filter: Option<String>,
    pub presence: bool,
}

impl ChannelSpec {
    pub fn presence(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            event: None,
            filter: None,
            presence: true,
        }
    }

    pub fn row_changes(
        name: impl Into<String>,
        table: impl Into<String>,
        event: impl Into<String>,
        filter: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: Some(table.into()),
            event: Some(event.into()),
            filter,
            presence: false,
        }
    }
}

/// Transport seam for the hosted realtime channel. The vendor protocol is
/// opaque; production uses the long-poll endpoint, tests substitute fakes.
#[async_trait::async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Blocks until events are available or the server's poll window
    /// closes; returns the next cursor alongside any events.
    async fn poll(
        &self,
        spec: &ChannelSpec,
        cursor: u64,
    ) -> Result<(u64, Vec<ChannelEvent>), GatewayError>;
}

#[derive(Debug, Deserialize)]
struct PollEnvelope {
    #[serde(default)]
    cursor: u64,
    #[serde(default)]
    events: Vec<PollEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum PollEvent {
    PresenceSync {
        #[serde(default)]
        ids: Vec<String>,
    },
    Row {
        table: String,
        event: String,
        #[serde(default)]
        row: serde_json::Value,
    },
}

#[derive(Debug, Clone)]
pub struct HttpRealtimeTransport {
    base_url: String,
    bearer_token: Option<String>,
    client: reqwest::Client,
}

impl HttpRealtimeTransport {
    pub fn new(
        base_url: String,
        bearer_token: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| GatewayError::Network(err.to_string()))?;
        Ok(Self {
            base_url,
            bearer_token,
            client,
        })
    }
}

#[async_trait::async_trait]
impl RealtimeTransport for HttpRealtimeTransport {
    async fn poll(
        &self,
        spec: &ChannelSpec,
        cursor: u64,
    ) -> Result<(u64, Vec<ChannelEvent>), GatewayError> {
        let mut pairs = vec![
            ("channel".to_string(), spec.name.clone()),
            ("cursor".to_string(), cursor.to_string()),
        ];
        if spec.presence {
            pairs.push(("presence".to_string(), "true".to_string()));
        }
        if let Some(table) = &spec.table {
            pairs.push(("table".to_string(), table.clone()));
        }
        if let Some(event) = &spec.event {
            pairs.push(("event".to_string(), event.clone()));
        }
        if let Some(filter) = &spec.filter {
            pairs.push(("filter".to_string(), filter.clone()));
        }

        let mut request = self
            .client
            .get(format!("{}/realtime/v1/poll", self.base_url))
            .query(&pairs);
        if let Some(token) = &self.bearer_token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = request.send().await.map_err(map_reqwest_error)?;
        let response = check_status(response)?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let envelope: PollEnvelope =
            serde_json::from_slice(&body).map_err(|err| GatewayError::Decode(err.to_string()))?;

        let events = envelope
            .events
            .into_iter()
            .map(|event| match event {
                PollEvent::PresenceSync { ids } => ChannelEvent::PresenceSync { ids },
                PollEvent::Row { table, event, row } => ChannelEvent::RowChanged {
                    table,
                    event: match event.as_str() {
                        "INSERT" => RowEventKind::Insert,
                        "DELETE" => RowEventKind::Delete,
                        _ => RowEventKind::Update,
                    },
                    row,
                },
            })
            .collect();
        Ok((envelope.cursor, events))
    }
}

/// One live subscription: a poll loop feeding a bounded channel, released
/// on drop. Dropping cancels the loop before the next poll completes, so
/// no events leak across view teardown.
pub struct Subscription {
    spec: ChannelSpec,
    cancel: CancellationToken,
    rx: tokio::sync::mpsc::Receiver<ChannelEvent>,
}

impl Subscription {
    pub fn spawn(
        runtime: &tokio::runtime::Handle,
        transport: Arc<dyn RealtimeTransport>,
        spec: ChannelSpec,
    ) -> Self {
        let (tx, rx) = tokio::sync::mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let loop_spec = spec.clone();

        runtime.spawn(async move {
            if tx.send(ChannelEvent::Joined).await.is_err() {
                return;
            }
            let mut cursor = 0u64;
            loop {
                let polled = tokio::select! {
                    _ = loop_cancel.cancelled() => return,
                    polled = transport.poll(&loop_spec, cursor) => polled,
                };
                match polled {
                    Ok((next_cursor, events)) => {
                        cursor = next_cursor;
                        for event in events {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        portal_logging::portal_warn!(
                            "poll failed on channel {}: {}",
                            loop_spec.name,
                            err
                        );
                        tokio::select! {
                            _ = loop_cancel.cancelled() => return,
                            _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                        }
                    }
                }
            }
        });

        Self { spec, cancel, rx }
    }

    pub fn spec(&self) -> &ChannelSpec {
        &self.spec
    }

    /// Token that stops the poll loop; lets an owner elsewhere release the
    /// subscription while a consumer drains remaining events.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Receives the next event; `None` once the subscription is finished.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ChannelEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
