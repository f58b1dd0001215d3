//! Portal engine: gateway IO and effect execution.
mod admin;
mod drive;
mod engine;
mod persist;
mod realtime;
mod rest;
mod types;

pub use admin::AdminAuthClient;
pub use drive::{DriveAuth, DriveConfig, DriveProxyClient, LIST_SETTLE_DELAY};
pub use engine::{EngineConfig, EngineHandle, GatewayCommand};
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use realtime::{ChannelSpec, HttpRealtimeTransport, RealtimeTransport, Subscription};
pub use rest::{Gateway, GatewayConfig, RestGateway};
pub use types::{
    AdminToken, ChannelEvent, ChannelEventSink, Condition, DriveEntry, EventSink, GatewayError,
    GatewayEvent, MutateOp, Query, RequestId, RowEventKind, TransferId,
};
