use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::drive::{DriveAuth, DriveConfig, DriveProxyClient};
use crate::persist::AtomicFileWriter;
use crate::realtime::{ChannelSpec, HttpRealtimeTransport, RealtimeTransport, Subscription};
use crate::rest::{Gateway, GatewayConfig, RestGateway};
use crate::{
    AdminAuthClient, ChannelEventSink, EventSink, GatewayError, GatewayEvent, MutateOp, Query,
    RequestId, TransferId,
};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub gateway: GatewayConfig,
    pub drive: DriveConfig,
    /// Destination for completed downloads.
    pub download_dir: PathBuf,
}

impl EngineConfig {
    pub fn default_with_download_dir(download_dir: PathBuf) -> Self {
        Self {
            gateway: GatewayConfig::default(),
            drive: DriveConfig::default(),
            download_dir,
        }
    }
}

#[derive(Debug, Clone)]
pub enum GatewayCommand {
    /// Swaps the bearer/admin token all clients authenticate with.
    SetSession { token: Option<String> },
    Query {
        request_id: RequestId,
        collection: String,
        query: Query,
    },
    Mutate {
        request_id: RequestId,
        collection: String,
        op: MutateOp,
        payload: Value,
    },
    UploadObject {
        request_id: RequestId,
        bucket: String,
        path: String,
        bytes: Vec<u8>,
        content_type: String,
    },
    AdminLogin {
        request_id: RequestId,
        username: String,
        password: String,
    },
    Subscribe { spec: ChannelSpec },
    Unsubscribe { channel: String },
    DriveList {
        request_id: RequestId,
        parent_id: Option<String>,
        search: Option<String>,
    },
    DriveUpload {
        transfer_id: TransferId,
        name: String,
        mime_type: String,
        data: Vec<u8>,
        parent_id: Option<String>,
    },
    DriveDownload {
        transfer_id: TransferId,
        file_id: String,
        file_name: String,
    },
    DriveDelete {
        transfer_id: TransferId,
        file_id: String,
    },
    DriveCreateFolder {
        request_id: RequestId,
        folder_name: String,
        parent_id: Option<String>,
    },
    DriveOauthStart { request_id: RequestId },
    DriveDisconnect { request_id: RequestId },
}

/// Handle to the IO engine: commands in, events out. A dedicated thread
/// owns the tokio runtime; every operation resolves as a [`GatewayEvent`].
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<GatewayCommand>,
    event_rx: Mutex<mpsc::Receiver<GatewayEvent>>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));
            run_engine(&runtime, config, cmd_rx, sink);
        });

        Self {
            cmd_tx,
            event_rx: Mutex::new(event_rx),
        }
    }

    pub fn command(&self, command: GatewayCommand) {
        let _ = self.cmd_tx.send(command);
    }

    pub fn try_recv(&self) -> Option<GatewayEvent> {
        self.event_rx
            .lock()
            .ok()
            .and_then(|rx| rx.try_recv().ok())
    }
}

struct Clients {
    rest: Arc<RestGateway>,
    drive: Arc<DriveProxyClient>,
    auth: Arc<AdminAuthClient>,
    transport: Arc<dyn RealtimeTransport>,
}

impl Clients {
    fn build(config: &EngineConfig, token: Option<String>) -> Result<Self, GatewayError> {
        let mut gateway_config = config.gateway.clone();
        gateway_config.bearer_token = token.clone();
        let rest = RestGateway::new(gateway_config)?;

        let drive_auth = match &token {
            Some(token) => DriveAuth::AdminToken(token.clone()),
            None => DriveAuth::Anonymous,
        };
        let drive = DriveProxyClient::new(config.drive.clone(), drive_auth)?;

        let auth = AdminAuthClient::new(
            config.drive.base_url.clone(),
            config.drive.request_timeout,
        )?;

        let transport = HttpRealtimeTransport::new(
            config.gateway.base_url.clone(),
            token,
            config.gateway.request_timeout,
        )?;

        Ok(Self {
            rest: Arc::new(rest),
            drive: Arc::new(drive),
            auth: Arc::new(auth),
            transport: Arc::new(transport),
        })
    }
}

fn run_engine(
    runtime: &tokio::runtime::Runtime,
    config: EngineConfig,
    cmd_rx: mpsc::Receiver<GatewayCommand>,
    sink: Arc<dyn EventSink>,
) {
    let mut clients = match Clients::build(&config, None) {
        Ok(clients) => clients,
        Err(err) => {
            portal_logging::portal_error!("failed to build gateway clients: {}", err);
            return;
        }
    };
    let mut subscriptions: HashMap<String, CancellationToken> = HashMap::new();

    while let Ok(command) = cmd_rx.recv() {
        match command {
            GatewayCommand::SetSession { token } => {
                match Clients::build(&config, token) {
                    Ok(rebuilt) => clients = rebuilt,
                    Err(err) => {
                        portal_logging::portal_error!("failed to apply session: {}", err);
                    }
                }
            }
            GatewayCommand::Subscribe { spec } => {
                let channel = spec.name.clone();
                if subscriptions.contains_key(&channel) {
                    continue;
                }
                let subscription =
                    Subscription::spawn(runtime.handle(), clients.transport.clone(), spec);
                subscriptions.insert(channel.clone(), subscription.cancel_token());
                let sink = sink.clone();
                runtime.spawn(async move {
                    let mut subscription = subscription;
                    while let Some(event) = subscription.recv().await {
                        sink.emit(GatewayEvent::Channel {
                            channel: channel.clone(),
                            event,
                        });
                    }
                });
            }
            GatewayCommand::Unsubscribe { channel } => {
                if let Some(token) = subscriptions.remove(&channel) {
                    token.cancel();
                }
            }
            GatewayCommand::Query {
                request_id,
                collection,
                query,
            } => {
                let rest = clients.rest.clone();
                let sink = sink.clone();
                runtime.spawn(async move {
                    let result = rest.query(&collection, &query).await;
                    sink.emit(GatewayEvent::QueryDone { request_id, result });
                });
            }
            GatewayCommand::Mutate {
                request_id,
                collection,
                op,
                payload,
            } => {
                let rest = clients.rest.clone();
                let sink = sink.clone();
                runtime.spawn(async move {
                    let result = rest.mutate(&collection, op, payload).await;
                    sink.emit(GatewayEvent::MutateDone { request_id, result });
                });
            }
            GatewayCommand::UploadObject {
                request_id,
                bucket,
                path,
                bytes,
                content_type,
            } => {
                let rest = clients.rest.clone();
                let sink = sink.clone();
                runtime.spawn(async move {
                    let result = rest.upload(&bucket, &path, bytes, &content_type).await;
                    sink.emit(GatewayEvent::UploadDone { request_id, result });
                });
            }
            GatewayCommand::AdminLogin {
                request_id,
                username,
                password,
            } => {
                let auth = clients.auth.clone();
                let sink = sink.clone();
                runtime.spawn(async move {
                    let result = auth.login(&username, &password).await;
                    sink.emit(GatewayEvent::LoginDone { request_id, result });
                });
            }
            GatewayCommand::DriveList {
                request_id,
                parent_id,
                search,
            } => {
                let drive = clients.drive.clone();
                let sink = sink.clone();
                runtime.spawn(async move {
                    let result = drive
                        .list(parent_id.as_deref(), search.as_deref())
                        .await;
                    sink.emit(GatewayEvent::DriveListDone { request_id, result });
                });
            }
            GatewayCommand::DriveUpload {
                transfer_id,
                name,
                mime_type,
                data,
                parent_id,
            } => {
                let drive = clients.drive.clone();
                let sink = sink.clone();
                runtime.spawn(async move {
                    let uploaded = drive
                        .upload(
                            transfer_id,
                            &name,
                            &mime_type,
                            &data,
                            parent_id.as_deref(),
                            sink.clone(),
                        )
                        .await;
                    let result = match uploaded {
                        Ok(file_id) => {
                            // Settle listing lag before reporting success so
                            // the follow-up refresh sees the fresh file.
                            if let Err(err) =
                                drive.list_settled(parent_id.as_deref(), &file_id).await
                            {
                                portal_logging::portal_warn!(
                                    "post-upload listing failed: {}",
                                    err
                                );
                            }
                            Ok(())
                        }
                        Err(err) => Err(err),
                    };
                    sink.emit(GatewayEvent::TransferDone {
                        transfer_id,
                        result,
                    });
                });
            }
            GatewayCommand::DriveDownload {
                transfer_id,
                file_id,
                file_name,
            } => {
                let drive = clients.drive.clone();
                let sink = sink.clone();
                let download_dir = config.download_dir.clone();
                runtime.spawn(async move {
                    let result = match drive.download(transfer_id, &file_id, sink.clone()).await {
                        Ok(bytes) => {
                            let writer = AtomicFileWriter::new(download_dir);
                            writer
                                .write(&file_name, &bytes)
                                .map(|_| ())
                                .map_err(|err| GatewayError::Persist(err.to_string()))
                        }
                        Err(err) => Err(err),
                    };
                    sink.emit(GatewayEvent::TransferDone {
                        transfer_id,
                        result,
                    });
                });
            }
            GatewayCommand::DriveDelete {
                transfer_id,
                file_id,
            } => {
                let drive = clients.drive.clone();
                let sink = sink.clone();
                runtime.spawn(async move {
                    let result = drive.delete(&file_id).await;
                    sink.emit(GatewayEvent::TransferDone {
                        transfer_id,
                        result,
                    });
                });
            }
            GatewayCommand::DriveCreateFolder {
                request_id,
                folder_name,
                parent_id,
            } => {
                let drive = clients.drive.clone();
                let sink = sink.clone();
                runtime.spawn(async move {
                    let result = drive
                        .create_folder(&folder_name, parent_id.as_deref())
                        .await;
                    sink.emit(GatewayEvent::DriveFolderDone { request_id, result });
                });
            }
            GatewayCommand::DriveOauthStart { request_id } => {
                let drive = clients.drive.clone();
                let sink = sink.clone();
                runtime.spawn(async move {
                    let result = drive.oauth_start().await;
                    sink.emit(GatewayEvent::DriveOauthDone { request_id, result });
                });
            }
            GatewayCommand::DriveDisconnect { request_id } => {
                let drive = clients.drive.clone();
                let sink = sink.clone();
                runtime.spawn(async move {
                    let result = drive.disconnect().await;
                    sink.emit(GatewayEvent::DriveDisconnectDone { request_id, result });
                });
            }
        }
    }

    // Channel closed: the handle is gone. Cancel what remains.
    for (_, token) in subscriptions {
        token.cancel();
    }
}
