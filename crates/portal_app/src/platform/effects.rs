use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use portal_core::{
    AdminSession, Draft, DriveFile, Effect, Job, MembershipSet, Msg, OverlayChannel,
    RemoteErrorKind, RemoteFailure, RowEvent, TransferId, WizardKind, TRANSFER_EXPIRY_MS,
};
use portal_engine::{
    AdminToken, ChannelEvent, ChannelSpec, Condition, DriveEntry, EngineConfig, EngineHandle,
    GatewayCommand, GatewayError, GatewayEvent, MutateOp, Query, RequestId, RowEventKind,
};
use portal_logging::{portal_info, portal_warn};
use serde_json::Value;

use super::session::SessionStore;

const ADMIN_RECIPIENT: &str = "admin";
const AVATAR_BUCKET: &str = "avatars";
const JOBS_PAGE_SIZE: u32 = 50;
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// What an outstanding request resolves into once its event arrives.
#[derive(Debug, Clone)]
enum PendingKind {
    OpenJobCount,
    Jobs,
    SavedIds,
    AppliedIds,
    ViewerProfile,
    UnreadCounts,
    SubmitDraft,
    Membership {
        set: MembershipSet,
        job_id: String,
    },
    PhotoUpload,
    Login,
    DriveList,
    DriveFolder,
    DriveOauth,
    DriveDisconnect,
    ChatSend,
    FireAndForget {
        context: &'static str,
    },
}

/// Pieces of the viewer context arriving from three independent queries;
/// the core message goes out once all three are in.
#[derive(Debug, Default)]
struct PartialViewerContext {
    saved: Option<Vec<String>>,
    applied: Option<Vec<String>>,
    skills: Option<Vec<String>>,
}

impl PartialViewerContext {
    fn take_complete(&mut self) -> Option<(Vec<String>, Vec<String>, Vec<String>)> {
        if self.saved.is_some() && self.applied.is_some() && self.skills.is_some() {
            Some((
                self.saved.take().unwrap(),
                self.applied.take().unwrap(),
                self.skills.take().unwrap(),
            ))
        } else {
            None
        }
    }
}

pub struct EffectRunner {
    engine: Arc<EngineHandle>,
    msg_tx: mpsc::Sender<Msg>,
    pending: Arc<Mutex<HashMap<RequestId, PendingKind>>>,
    next_request_id: AtomicU64,
    session_store: Arc<SessionStore>,
    /// Acting user: scopes quota counts, memberships and storage paths.
    user_id: String,
}

impl EffectRunner {
    pub fn new(
        config: EngineConfig,
        msg_tx: mpsc::Sender<Msg>,
        session_store: SessionStore,
        user_id: String,
    ) -> Self {
        let runner = Self {
            engine: Arc::new(EngineHandle::new(config)),
            msg_tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_request_id: AtomicU64::new(0),
            session_store: Arc::new(session_store),
            user_id,
        };
        runner.spawn_event_loop();
        runner
    }

    /// Applies a session restored from disk without a fresh login.
    pub fn restore_session(&self, session: &AdminSession) {
        self.engine.command(GatewayCommand::SetSession {
            token: Some(session.token.clone()),
        });
    }

    fn track(&self, kind: PendingKind) -> RequestId {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.pending
            .lock()
            .expect("lock pending requests")
            .insert(request_id, kind);
        request_id
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&self, effect: Effect) {
        match effect {
            Effect::AdminLogin { username, password } => {
                let request_id = self.track(PendingKind::Login);
                self.engine.command(GatewayCommand::AdminLogin {
                    request_id,
                    username,
                    password,
                });
            }
            Effect::PersistSession { session } => {
                self.session_store.save(&session);
                self.engine.command(GatewayCommand::SetSession {
                    token: Some(session.token),
                });
            }
            Effect::ClearSession => {
                self.session_store.clear();
                self.engine
                    .command(GatewayCommand::SetSession { token: None });
            }
            Effect::RedirectToLogin => {
                portal_warn!("authentication required; returning to login");
            }
            Effect::FetchOpenJobCount { owner } => {
                let request_id = self.track(PendingKind::OpenJobCount);
                self.engine.command(GatewayCommand::Query {
                    request_id,
                    collection: "jobs".to_string(),
                    query: Query {
                        conditions: vec![
                            Condition::Eq("owner_id".to_string(), owner),
                            Condition::Neq("status".to_string(), "EXPIRED".to_string()),
                            Condition::Neq("status".to_string(), "DELETED".to_string()),
                        ],
                        ..Query::default()
                    },
                });
            }
            Effect::UploadPhoto { name, data } => {
                let request_id = self.track(PendingKind::PhotoUpload);
                let content_type = mime_guess::from_path(&name)
                    .first_or_octet_stream()
                    .to_string();
                self.engine.command(GatewayCommand::UploadObject {
                    request_id,
                    bucket: AVATAR_BUCKET.to_string(),
                    path: format!("{}/{name}", self.user_id),
                    bytes: data,
                    content_type,
                });
            }
            Effect::SubmitDraft { kind, draft } => {
                let request_id = self.track(PendingKind::SubmitDraft);
                let (collection, op, payload) = submit_mutation(kind, &draft, &self.user_id);
                self.engine.command(GatewayCommand::Mutate {
                    request_id,
                    collection,
                    op,
                    payload,
                });
            }
            Effect::NotifySubmission { kind, title } => {
                let request_id = self.track(PendingKind::FireAndForget {
                    context: "submission notification",
                });
                self.engine.command(GatewayCommand::Mutate {
                    request_id,
                    collection: "notifications".to_string(),
                    op: MutateOp::Insert,
                    payload: serde_json::json!({
                        "recipient": ADMIN_RECIPIENT,
                        "kind": match kind {
                            WizardKind::JobPosting => "job_posted",
                            WizardKind::ProfileCompletion => "profile_completed",
                        },
                        "title": title,
                    }),
                });
            }
            Effect::FetchJobs => {
                let request_id = self.track(PendingKind::Jobs);
                self.engine.command(GatewayCommand::Query {
                    request_id,
                    collection: "jobs".to_string(),
                    query: Query {
                        conditions: vec![Condition::Eq(
                            "status".to_string(),
                            "OPEN".to_string(),
                        )],
                        order_desc_by: Some("created_at".to_string()),
                        limit: Some(JOBS_PAGE_SIZE),
                        offset: None,
                    },
                });
            }
            Effect::FetchViewerContext => {
                for (kind, collection, conditions) in [
                    (
                        PendingKind::SavedIds,
                        "saved_jobs",
                        vec![Condition::Eq("user_id".to_string(), self.user_id.clone())],
                    ),
                    (
                        PendingKind::AppliedIds,
                        "job_applications",
                        vec![Condition::Eq("user_id".to_string(), self.user_id.clone())],
                    ),
                    (
                        PendingKind::ViewerProfile,
                        "profiles",
                        vec![Condition::Eq("id".to_string(), self.user_id.clone())],
                    ),
                ] {
                    let request_id = self.track(kind);
                    self.engine.command(GatewayCommand::Query {
                        request_id,
                        collection: collection.to_string(),
                        query: Query {
                            conditions,
                            ..Query::default()
                        },
                    });
                }
            }
            Effect::PersistMembership {
                set,
                job_id,
                member,
            } => {
                let collection = membership_collection(set).to_string();
                let request_id = self.track(PendingKind::Membership {
                    set,
                    job_id: job_id.clone(),
                });
                let op = if member {
                    MutateOp::Insert
                } else {
                    MutateOp::Delete {
                        filters: vec![
                            Condition::Eq("user_id".to_string(), self.user_id.clone()),
                            Condition::Eq("job_id".to_string(), job_id.clone()),
                        ],
                    }
                };
                let payload = if member {
                    serde_json::json!({
                        "user_id": self.user_id,
                        "job_id": job_id,
                    })
                } else {
                    Value::Null
                };
                self.engine.command(GatewayCommand::Mutate {
                    request_id,
                    collection,
                    op,
                    payload,
                });
            }
            Effect::Subscribe { channel } => {
                self.engine.command(GatewayCommand::Subscribe {
                    spec: channel_spec(channel),
                });
            }
            Effect::Unsubscribe { channel } => {
                self.engine.command(GatewayCommand::Unsubscribe {
                    channel: channel.as_str().to_string(),
                });
            }
            Effect::FetchUnreadCounts => {
                let request_id = self.track(PendingKind::UnreadCounts);
                self.engine.command(GatewayCommand::Query {
                    request_id,
                    collection: "messages".to_string(),
                    query: Query {
                        conditions: vec![
                            Condition::Eq("recipient".to_string(), ADMIN_RECIPIENT.to_string()),
                            Condition::Eq("read".to_string(), "false".to_string()),
                        ],
                        ..Query::default()
                    },
                });
            }
            Effect::SendChatMessage { recipient, body } => {
                let request_id = self.track(PendingKind::ChatSend);
                self.engine.command(GatewayCommand::Mutate {
                    request_id,
                    collection: "messages".to_string(),
                    op: MutateOp::Insert,
                    payload: serde_json::json!({
                        "sender": ADMIN_RECIPIENT,
                        "recipient": recipient,
                        "body": body,
                        "read": false,
                    }),
                });
            }
            Effect::DriveList => {
                let request_id = self.track(PendingKind::DriveList);
                self.engine.command(GatewayCommand::DriveList {
                    request_id,
                    parent_id: None,
                    search: None,
                });
            }
            Effect::DriveUpload {
                transfer_id,
                name,
                mime_type,
                data,
            } => {
                self.engine.command(GatewayCommand::DriveUpload {
                    transfer_id,
                    name,
                    mime_type,
                    data,
                    parent_id: None,
                });
            }
            Effect::DriveDownload {
                transfer_id,
                file_id,
                name,
            } => {
                self.engine.command(GatewayCommand::DriveDownload {
                    transfer_id,
                    file_id,
                    file_name: name,
                });
            }
            Effect::DriveDelete {
                transfer_id,
                file_id,
            } => {
                self.engine.command(GatewayCommand::DriveDelete {
                    transfer_id,
                    file_id,
                });
            }
            Effect::DriveCreateFolder { name } => {
                let request_id = self.track(PendingKind::DriveFolder);
                self.engine.command(GatewayCommand::DriveCreateFolder {
                    request_id,
                    folder_name: name,
                    parent_id: None,
                });
            }
            Effect::DriveOauthStart => {
                let request_id = self.track(PendingKind::DriveOauth);
                self.engine
                    .command(GatewayCommand::DriveOauthStart { request_id });
            }
            Effect::DriveDisconnect => {
                let request_id = self.track(PendingKind::DriveDisconnect);
                self.engine
                    .command(GatewayCommand::DriveDisconnect { request_id });
            }
            Effect::ScheduleTransferExpiry { transfer_id } => {
                self.schedule_expiry(transfer_id);
            }
        }
    }

    fn schedule_expiry(&self, transfer_id: TransferId) {
        let msg_tx = self.msg_tx.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(TRANSFER_EXPIRY_MS));
            let _ = msg_tx.send(Msg::TransferExpired { id: transfer_id });
        });
    }

    fn spawn_event_loop(&self) {
        let engine = self.engine.clone();
        let msg_tx = self.msg_tx.clone();
        let pending = self.pending.clone();
        let partial = Arc::new(Mutex::new(PartialViewerContext::default()));
        thread::spawn(move || loop {
            if let Some(event) = engine.try_recv() {
                for msg in fold_event(event, &pending, &partial) {
                    if msg_tx.send(msg).is_err() {
                        return;
                    }
                }
            } else {
                thread::sleep(EVENT_POLL_INTERVAL);
            }
        });
    }
}

fn membership_collection(set: MembershipSet) -> &'static str {
    match set {
        MembershipSet::Saved => "saved_jobs",
        MembershipSet::Applied => "job_applications",
    }
}

fn channel_spec(channel: OverlayChannel) -> ChannelSpec {
    match channel {
        OverlayChannel::Presence => ChannelSpec::presence(channel.as_str()),
        OverlayChannel::Messages => ChannelSpec::row_changes(
            channel.as_str(),
            "messages",
            "INSERT",
            Some(format!("recipient=eq.{ADMIN_RECIPIENT}")),
        ),
    }
}

/// Builds the single atomic mutation behind a wizard submit.
fn submit_mutation(kind: WizardKind, draft: &Draft, user_id: &str) -> (String, MutateOp, Value) {
    match kind {
        WizardKind::JobPosting => {
            let mut payload = serde_json::json!({
                "title": draft.title,
                "employment_type": draft.employment_type,
                "description": draft.description,
                "status": "OPEN",
                "owner_id": user_id,
            });
            if !draft.external_link.trim().is_empty() {
                payload["external_link"] = Value::String(draft.external_link.trim().to_string());
            }
            ("jobs".to_string(), MutateOp::Insert, payload)
        }
        WizardKind::ProfileCompletion => {
            let mut payload = serde_json::json!({
                "full_name": draft.full_name,
                "phone": draft.phone,
                "role": draft.role,
                "location": draft.location,
                "skills": draft.skills,
                "bio": draft.bio,
            });
            if let Some(photo_url) = &draft.photo_url {
                payload["photo_url"] = Value::String(photo_url.clone());
            }
            (
                "profiles".to_string(),
                MutateOp::Update {
                    id: user_id.to_string(),
                },
                payload,
            )
        }
    }
}

fn fold_event(
    event: GatewayEvent,
    pending: &Arc<Mutex<HashMap<RequestId, PendingKind>>>,
    partial: &Arc<Mutex<PartialViewerContext>>,
) -> Vec<Msg> {
    match event {
        GatewayEvent::QueryDone { request_id, result } => {
            let Some(kind) = pending.lock().expect("lock pending").remove(&request_id) else {
                return Vec::new();
            };
            fold_query(kind, result, partial)
        }
        GatewayEvent::MutateDone { request_id, result } => {
            let Some(kind) = pending.lock().expect("lock pending").remove(&request_id) else {
                return Vec::new();
            };
            fold_mutation(kind, result)
        }
        GatewayEvent::UploadDone { request_id, result } => {
            let Some(_) = pending.lock().expect("lock pending").remove(&request_id) else {
                return Vec::new();
            };
            vec![Msg::PhotoUploaded {
                result: result.map_err(remote_failure),
            }]
        }
        GatewayEvent::LoginDone { request_id, result } => {
            pending.lock().expect("lock pending").remove(&request_id);
            vec![Msg::AdminLoginResolved {
                result: result
                    .map(|AdminToken { username, token }| AdminSession { username, token })
                    .map_err(remote_failure),
            }]
        }
        GatewayEvent::DriveListDone { request_id, result } => {
            pending.lock().expect("lock pending").remove(&request_id);
            vec![Msg::DriveListLoaded {
                result: result
                    .map(|entries| entries.into_iter().map(drive_file).collect())
                    .map_err(remote_failure),
            }]
        }
        GatewayEvent::DriveFolderDone { request_id, result } => {
            pending.lock().expect("lock pending").remove(&request_id);
            match result {
                Ok(folder_id) => {
                    portal_info!("created drive folder {}", folder_id);
                    vec![Msg::DriveRefreshRequested]
                }
                Err(err) => vec![Msg::DriveListLoaded {
                    result: Err(remote_failure(err)),
                }],
            }
        }
        GatewayEvent::DriveOauthDone { request_id, result } => {
            pending.lock().expect("lock pending").remove(&request_id);
            match result {
                Ok(url) => vec![Msg::DriveOauthUrlReady { url }],
                Err(err) => vec![Msg::NoticeRaised {
                    message: format!("could not start drive connection: {err}"),
                }],
            }
        }
        GatewayEvent::DriveDisconnectDone { request_id, result } => {
            pending.lock().expect("lock pending").remove(&request_id);
            match result {
                Ok(()) => vec![Msg::DriveDisconnected],
                Err(err) => vec![Msg::NoticeRaised {
                    message: format!("could not disconnect drive: {err}"),
                }],
            }
        }
        GatewayEvent::Channel { channel, event } => fold_channel(&channel, event),
        GatewayEvent::TransferProgress {
            transfer_id,
            percent,
        } => vec![Msg::TransferProgress {
            id: transfer_id,
            progress: percent,
        }],
        GatewayEvent::TransferDone {
            transfer_id,
            result,
        } => vec![Msg::TransferFinished {
            id: transfer_id,
            result: result.map_err(remote_failure),
        }],
    }
}

fn fold_query(
    kind: PendingKind,
    result: Result<Vec<Value>, GatewayError>,
    partial: &Arc<Mutex<PartialViewerContext>>,
) -> Vec<Msg> {
    match kind {
        PendingKind::OpenJobCount => match result {
            Ok(rows) => vec![Msg::OpenJobCountLoaded {
                open_count: rows.len() as u32,
            }],
            Err(err) => {
                portal_warn!("quota count failed: {}", err);
                vec![Msg::NoticeRaised {
                    message: format!("could not check posting limit: {err}"),
                }]
            }
        },
        PendingKind::Jobs => vec![Msg::JobsLoaded {
            result: result
                .map(|rows| rows.iter().filter_map(decode_job).collect())
                .map_err(remote_failure),
        }],
        PendingKind::SavedIds | PendingKind::AppliedIds | PendingKind::ViewerProfile => {
            let mut partial = partial.lock().expect("lock viewer context");
            match kind {
                PendingKind::SavedIds => {
                    partial.saved = Some(id_column(result, "job_id"));
                }
                PendingKind::AppliedIds => {
                    partial.applied = Some(id_column(result, "job_id"));
                }
                PendingKind::ViewerProfile => {
                    partial.skills = Some(profile_skills(result));
                }
                _ => unreachable!(),
            }
            match partial.take_complete() {
                Some((saved, applied, skills)) => vec![Msg::ViewerContextLoaded {
                    saved,
                    applied,
                    skills,
                }],
                None => Vec::new(),
            }
        }
        PendingKind::UnreadCounts => vec![Msg::UnreadLoaded {
            result: result.map(unread_counts).map_err(remote_failure),
        }],
        other => {
            portal_warn!("query event for non-query request: {:?}", other);
            Vec::new()
        }
    }
}

fn fold_mutation(kind: PendingKind, result: Result<Value, GatewayError>) -> Vec<Msg> {
    match kind {
        PendingKind::SubmitDraft => vec![Msg::SubmitResolved {
            result: result.map(|_| ()).map_err(remote_failure),
        }],
        PendingKind::Membership { set, job_id } => vec![Msg::MembershipResolved {
            set,
            job_id,
            result: result.map(|_| ()).map_err(remote_failure),
        }],
        PendingKind::ChatSend => match result {
            Ok(_) => Vec::new(),
            Err(err) => vec![Msg::NoticeRaised {
                message: format!("message not sent: {err}"),
            }],
        },
        PendingKind::FireAndForget { context } => {
            if let Err(err) = result {
                portal_warn!("{} failed: {}", context, err);
            }
            Vec::new()
        }
        other => {
            portal_warn!("mutation event for non-mutation request: {:?}", other);
            Vec::new()
        }
    }
}

fn fold_channel(channel: &str, event: ChannelEvent) -> Vec<Msg> {
    let channel = if channel == OverlayChannel::Presence.as_str() {
        OverlayChannel::Presence
    } else {
        OverlayChannel::Messages
    };
    match event {
        ChannelEvent::Joined => vec![Msg::ChannelJoined { channel }],
        ChannelEvent::PresenceSync { ids } => vec![Msg::PresenceSynced { online: ids }],
        ChannelEvent::RowChanged { table, event, .. } => vec![Msg::RowChanged {
            table,
            event: match event {
                RowEventKind::Insert => RowEvent::Insert,
                RowEventKind::Update => RowEvent::Update,
                RowEventKind::Delete => RowEvent::Delete,
            },
        }],
    }
}

fn remote_failure(err: GatewayError) -> RemoteFailure {
    let kind = match &err {
        GatewayError::Auth => RemoteErrorKind::Auth,
        GatewayError::NotFound => RemoteErrorKind::NotFound,
        GatewayError::Conflict => RemoteErrorKind::Conflict,
        GatewayError::Timeout => RemoteErrorKind::Timeout,
        GatewayError::TooLarge { .. } => RemoteErrorKind::TooLarge,
        GatewayError::Provider(_) => RemoteErrorKind::Provider,
        GatewayError::InvalidUrl(_)
        | GatewayError::Network(_)
        | GatewayError::HttpStatus(_)
        | GatewayError::Decode(_)
        | GatewayError::Persist(_) => RemoteErrorKind::Network,
    };
    RemoteFailure::new(kind, err.to_string())
}

fn drive_file(entry: DriveEntry) -> DriveFile {
    DriveFile {
        id: entry.id,
        name: entry.name,
        mime_type: entry.mime_type,
        is_folder: entry.folder,
        size: entry.size,
    }
}

fn decode_job(row: &Value) -> Option<Job> {
    Some(Job {
        id: row.get("id")?.as_str()?.to_string(),
        title: text_field(row, "title"),
        company: text_field(row, "company"),
        location: text_field(row, "location"),
        employment_type: text_field(row, "employment_type"),
        salary_min: row
            .get("salary_min")
            .and_then(Value::as_u64)
            .map(|v| v as u32),
        skills_text: skills_text(row.get("skills")),
        posted_days_ago: age_days(row.get("created_at")),
    })
}

fn text_field(row: &Value, key: &str) -> String {
    row.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn skills_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::String(text)) => text.clone(),
        _ => String::new(),
    }
}

fn age_days(value: Option<&Value>) -> u32 {
    let Some(created_at) = value.and_then(Value::as_str) else {
        return 0;
    };
    match chrono::DateTime::parse_from_rfc3339(created_at) {
        Ok(timestamp) => {
            let days = (Utc::now() - timestamp.with_timezone(&Utc)).num_days();
            days.max(0) as u32
        }
        Err(_) => 0,
    }
}

fn id_column(result: Result<Vec<Value>, GatewayError>, key: &str) -> Vec<String> {
    match result {
        Ok(rows) => rows
            .iter()
            .filter_map(|row| row.get(key).and_then(Value::as_str))
            .map(ToOwned::to_owned)
            .collect(),
        Err(err) => {
            portal_warn!("viewer context query failed: {}", err);
            Vec::new()
        }
    }
}

fn profile_skills(result: Result<Vec<Value>, GatewayError>) -> Vec<String> {
    match result {
        Ok(rows) => rows
            .first()
            .map(|row| {
                let text = skills_text(row.get("skills"));
                text.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default(),
        Err(err) => {
            portal_warn!("profile query failed: {}", err);
            Vec::new()
        }
    }
}

/// Re-fetched aggregate: unread message count per sender.
fn unread_counts(rows: Vec<Value>) -> Vec<(String, u32)> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for row in &rows {
        if let Some(sender) = row.get("sender").and_then(Value::as_str) {
            *counts.entry(sender.to_string()).or_insert(0) += 1;
        }
    }
    let mut counts: Vec<(String, u32)> = counts.into_iter().collect();
    counts.sort();
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_submit_inserts_open_posting() {
        let draft = Draft {
            title: "GIS Analyst".to_string(),
            employment_type: "Full-time".to_string(),
            description: "x".to_string(),
            ..Draft::default()
        };
        let (collection, op, payload) = submit_mutation(WizardKind::JobPosting, &draft, "owner-1");
        assert_eq!(collection, "jobs");
        assert_eq!(op, MutateOp::Insert);
        assert_eq!(payload["status"], "OPEN");
        assert_eq!(payload["title"], "GIS Analyst");
        assert_eq!(payload["owner_id"], "owner-1");
        // No empty link field is sent.
        assert!(payload.get("external_link").is_none());
    }

    #[test]
    fn profile_submit_updates_by_viewer_id() {
        let draft = Draft {
            full_name: "Ada Lovelace".to_string(),
            phone: "+44".to_string(),
            role: "Analyst".to_string(),
            location: "London".to_string(),
            skills: vec!["GIS".to_string()],
            bio: "Spatial analyst with ten years of experience.".to_string(),
            photo_url: Some("https://cdn.example.com/a.png".to_string()),
            ..Draft::default()
        };
        let (collection, op, payload) =
            submit_mutation(WizardKind::ProfileCompletion, &draft, "user-9");
        assert_eq!(collection, "profiles");
        assert_eq!(
            op,
            MutateOp::Update {
                id: "user-9".to_string()
            }
        );
        assert_eq!(payload["photo_url"], "https://cdn.example.com/a.png");
    }

    #[test]
    fn decodes_job_rows_with_array_or_string_skills() {
        let row = serde_json::json!({
            "id": "j1",
            "title": "Analyst",
            "skills": ["gis", "sql"],
        });
        let job = decode_job(&row).unwrap();
        assert_eq!(job.skills_text, "gis, sql");

        let row = serde_json::json!({
            "id": "j2",
            "title": "Surveyor",
            "skills": "gis, field work",
        });
        let job = decode_job(&row).unwrap();
        assert_eq!(job.skills_text, "gis, field work");

        // Rows without an id are dropped, not mis-decoded.
        assert!(decode_job(&serde_json::json!({"title": "broken"})).is_none());
    }

    #[test]
    fn unread_counts_fold_per_sender() {
        let rows = vec![
            serde_json::json!({"sender": "u1"}),
            serde_json::json!({"sender": "u2"}),
            serde_json::json!({"sender": "u1"}),
        ];
        assert_eq!(
            unread_counts(rows),
            vec![("u1".to_string(), 2), ("u2".to_string(), 1)]
        );
    }
}
