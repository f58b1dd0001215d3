use crate::browse::{ItemId, Job, MembershipSet};
use crate::overlay::{ActorId, OverlayChannel, RowEvent};
use crate::state::{AdminSession, DriveFile, RemoteFailure};
use crate::transfer::TransferId;
use crate::wizard::{Draft, DraftField, WizardKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Session restored from the persisted store at startup.
    SessionRestored { session: AdminSession },
    /// Admin submitted the login form.
    AdminLoginSubmitted { username: String, password: String },
    /// Login round-trip resolved.
    AdminLoginResolved {
        result: Result<AdminSession, RemoteFailure>,
    },
    LogoutClicked,

    /// A wizard view mounted; `owner` scopes the quota count.
    WizardOpened {
        kind: WizardKind,
        prefill: Option<Draft>,
        owner: String,
    },
    /// Mount-time quota snapshot for the job wizard.
    OpenJobCountLoaded { open_count: u32 },
    FieldEdited { field: DraftField, value: String },
    SkillAdded(String),
    SkillRemoved(String),
    /// User picked an image; size is checked before any upload starts.
    PhotoPicked {
        name: String,
        size_bytes: u64,
        data: Vec<u8>,
    },
    PhotoUploaded {
        result: Result<String, RemoteFailure>,
    },
    NextClicked,
    BackClicked,
    SubmitClicked,
    SubmitResolved { result: Result<(), RemoteFailure> },
    /// Navigation away without submit; the draft is discarded.
    WizardClosed,

    /// Jobs browser mounted.
    BrowserOpened,
    JobsLoaded {
        result: Result<Vec<Job>, RemoteFailure>,
    },
    /// Saved/applied id-sets and the viewer's skills.
    ViewerContextLoaded {
        saved: Vec<ItemId>,
        applied: Vec<ItemId>,
        skills: Vec<String>,
    },
    FilterTextChanged(String),
    FilterLocationChanged(String),
    FilterTypeChanged(Option<String>),
    FilterMinSalaryChanged(Option<u32>),
    FilterPostedWithinChanged(Option<u32>),
    JobSelected { job_id: ItemId },
    SaveToggled { job_id: ItemId },
    ApplyToggled { job_id: ItemId },
    MembershipResolved {
        set: MembershipSet,
        job_id: ItemId,
        result: Result<(), RemoteFailure>,
    },

    /// Admin presence/notification overlay mounted.
    OverlayOpened,
    ChannelJoined { channel: OverlayChannel },
    /// Full presence snapshot; replaces the online set wholesale.
    PresenceSynced { online: Vec<ActorId> },
    RowChanged { table: String, event: RowEvent },
    UnreadLoaded {
        result: Result<Vec<(ActorId, u32)>, RemoteFailure>,
    },
    ChatMessageSent { recipient: ActorId, body: String },
    OverlayClosed,

    /// Drive panel mounted or explicitly refreshed.
    DriveOpened,
    DriveRefreshRequested,
    DriveListLoaded {
        result: Result<Vec<DriveFile>, RemoteFailure>,
    },
    DriveUploadPicked {
        name: String,
        mime_type: String,
        data: Vec<u8>,
    },
    DriveDownloadClicked { file_id: String, name: String },
    DriveDeleteClicked { file_id: String, name: String },
    DriveFolderSubmitted { name: String },
    /// Start the provider OAuth flow for the drive account.
    DriveConnectClicked,
    /// Redirect URL handed back by the provider.
    DriveOauthUrlReady { url: String },
    DriveDisconnectClicked,
    DriveDisconnected,
    TransferProgress { id: TransferId, progress: u8 },
    TransferFinished {
        id: TransferId,
        result: Result<(), RemoteFailure>,
    },
    /// Expiry timer fired for a terminal transfer.
    TransferExpired { id: TransferId },

    /// Transient remote-failure notice raised outside a dedicated flow.
    NoticeRaised { message: String },
    NoticeDismissed,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
