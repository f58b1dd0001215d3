use crate::browse::{ItemId, MembershipSet};
use crate::overlay::{ActorId, OverlayChannel};
use crate::state::AdminSession;
use crate::transfer::TransferId;
use crate::wizard::{Draft, WizardKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    AdminLogin { username: String, password: String },
    PersistSession { session: AdminSession },
    ClearSession,
    /// Missing or rejected authentication on a protected view.
    RedirectToLogin,

    /// Counts the owner's non-terminal job postings (quota, mount-time).
    FetchOpenJobCount { owner: String },
    UploadPhoto { name: String, data: Vec<u8> },
    /// The one atomic create/update at the terminal wizard step.
    SubmitDraft { kind: WizardKind, draft: Draft },
    /// Fire-and-forget alert after a successful submit; never blocks or
    /// fails the submission.
    NotifySubmission { kind: WizardKind, title: String },

    FetchJobs,
    FetchViewerContext,
    PersistMembership {
        set: MembershipSet,
        job_id: ItemId,
        member: bool,
    },

    Subscribe { channel: OverlayChannel },
    Unsubscribe { channel: OverlayChannel },
    /// Re-fetches the unread aggregate; deltas are never computed locally.
    FetchUnreadCounts,
    SendChatMessage { recipient: ActorId, body: String },

    DriveList,
    DriveUpload {
        transfer_id: TransferId,
        name: String,
        mime_type: String,
        data: Vec<u8>,
    },
    DriveDownload {
        transfer_id: TransferId,
        file_id: String,
        name: String,
    },
    DriveDelete {
        transfer_id: TransferId,
        file_id: String,
    },
    DriveCreateFolder { name: String },
    DriveOauthStart,
    DriveDisconnect,
    /// Removal timer for a terminal transfer (fires after
    /// [`crate::TRANSFER_EXPIRY_MS`]).
    ScheduleTransferExpiry { transfer_id: TransferId },
}
