//! Portal core: pure state machine and view-model helpers.
mod browse;
mod effect;
mod msg;
mod overlay;
mod state;
mod transfer;
mod update;
mod view_model;
mod wizard;

pub use browse::{BrowserState, FilterState, ItemId, Job, MembershipSet, ToggleOutcome};
pub use effect::Effect;
pub use msg::Msg;
pub use overlay::{ActorId, ChannelPhase, OverlayChannel, OverlayState, RowEvent};
pub use state::{AdminSession, AppState, DriveFile, DriveState, RemoteErrorKind, RemoteFailure};
pub use transfer::{
    Transfer, TransferId, TransferKind, TransferLog, TransferStatus, TRANSFER_EXPIRY_MS,
};
pub use update::update;
pub use view_model::{
    AppViewModel, DriveRowView, JobRowView, TransferRowView, WizardView,
};
pub use wizard::{
    photo_within_limit, Draft, DraftField, WizardKind, WizardState, BIO_MIN_CHARS,
    IMAGE_MAX_BYTES, MAX_OPEN_JOBS,
};
