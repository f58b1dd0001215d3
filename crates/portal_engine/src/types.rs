use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Correlates a command with its completion event.
pub type RequestId = u64;

/// Identifier of a tracked upload/download/delete operation. Assigned by
/// the caller; the engine only echoes it back on progress events.
pub type TransferId = u64;

/// Tagged gateway failure. This layer never retries; callers decide.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication required")]
    Auth,
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timeout")]
    Timeout,
    #[error("response too large (max {max_bytes}, actual {actual:?})")]
    TooLarge {
        max_bytes: u64,
        actual: Option<u64>,
    },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("persist error: {0}")]
    Persist(String),
}

/// Equality/inequality/substring predicates plus ordering and pagination,
/// rendered as PostgREST-style query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Eq(String, String),
    Neq(String, String),
    Ilike(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    pub conditions: Vec<Condition>,
    /// Order by this column, newest first.
    pub order_desc_by: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Query {
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.conditions.len() + 3);
        for condition in &self.conditions {
            match condition {
                Condition::Eq(col, value) => pairs.push((col.clone(), format!("eq.{value}"))),
                Condition::Neq(col, value) => pairs.push((col.clone(), format!("neq.{value}"))),
                Condition::Ilike(col, value) => {
                    pairs.push((col.clone(), format!("ilike.*{value}*")))
                }
            }
        }
        if let Some(col) = &self.order_desc_by {
            pairs.push(("order".to_string(), format!("{col}.desc")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutateOp {
    Insert,
    Update { id: String },
    /// Deletes every row matching the given predicates.
    Delete { filters: Vec<Condition> },
}

/// One entry of a drive listing as returned by the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriveEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(default)]
    pub folder: bool,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Kind of row change delivered on a realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowEventKind {
    Insert,
    Update,
    Delete,
}

/// Typed event delivered by one realtime subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The subscription is established; presence channels reach their
    /// synced state only on the first snapshot.
    Joined,
    /// Full presence snapshot; consumers replace, never merge.
    PresenceSync { ids: Vec<String> },
    RowChanged {
        table: String,
        event: RowEventKind,
        row: Value,
    },
}

/// Everything the engine reports back to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    QueryDone {
        request_id: RequestId,
        result: Result<Vec<Value>, GatewayError>,
    },
    MutateDone {
        request_id: RequestId,
        result: Result<Value, GatewayError>,
    },
    UploadDone {
        request_id: RequestId,
        result: Result<String, GatewayError>,
    },
    LoginDone {
        request_id: RequestId,
        result: Result<AdminToken, GatewayError>,
    },
    DriveListDone {
        request_id: RequestId,
        result: Result<Vec<DriveEntry>, GatewayError>,
    },
    DriveFolderDone {
        request_id: RequestId,
        result: Result<String, GatewayError>,
    },
    /// Redirect URL for the provider OAuth flow.
    DriveOauthDone {
        request_id: RequestId,
        result: Result<String, GatewayError>,
    },
    DriveDisconnectDone {
        request_id: RequestId,
        result: Result<(), GatewayError>,
    },
    Channel {
        channel: String,
        event: ChannelEvent,
    },
    TransferProgress {
        transfer_id: TransferId,
        percent: u8,
    },
    TransferDone {
        transfer_id: TransferId,
        result: Result<(), GatewayError>,
    },
}

/// Bearer token handed out by the admin login endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminToken {
    pub username: String,
    pub token: String,
}

/// Sink for engine events emitted from inside async operations.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: GatewayEvent);
}

/// Forwards events into a standard channel; the receiving side is the
/// app's single event loop.
pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<GatewayEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<GatewayEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: GatewayEvent) {
        let _ = self.tx.send(event);
    }
}
