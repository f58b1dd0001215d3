use crate::browse::BrowserState;
use crate::overlay::OverlayState;
use crate::transfer::TransferLog;
use crate::view_model::AppViewModel;
use crate::wizard::WizardState;

/// Explicit admin session value passed to gateway construction; there is no
/// ambient token lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub username: String,
    pub token: String,
}

/// Tagged remote failure as folded into the core. Mirrors the gateway's
/// error taxonomy without depending on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Network,
    Auth,
    Conflict,
    NotFound,
    Timeout,
    TooLarge,
    Provider,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteFailure {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// One entry of the drive listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub is_folder: bool,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DriveState {
    pub files: Vec<DriveFile>,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    session: Option<AdminSession>,
    wizard: Option<WizardState>,
    browser: BrowserState,
    overlay: OverlayState,
    drive: DriveState,
    transfers: TransferLog,
    notice: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&AdminSession> {
        self.session.as_ref()
    }

    pub fn wizard(&self) -> Option<&WizardState> {
        self.wizard.as_ref()
    }

    pub fn browser(&self) -> &BrowserState {
        &self.browser
    }

    pub fn overlay(&self) -> &OverlayState {
        &self.overlay
    }

    pub fn drive(&self) -> &DriveState {
        &self.drive
    }

    pub fn transfers(&self) -> &TransferLog {
        &self.transfers
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn view(&self) -> AppViewModel {
        crate::view_model::build(self)
    }

    pub fn consume_dirty(&mut self) -> bool {
        let was = self.dirty;
        self.dirty = false;
        was
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_session(&mut self, session: Option<AdminSession>) {
        self.session = session;
    }

    pub(crate) fn set_wizard(&mut self, wizard: Option<WizardState>) {
        self.wizard = wizard;
    }

    pub(crate) fn wizard_mut(&mut self) -> Option<&mut WizardState> {
        self.wizard.as_mut()
    }

    pub(crate) fn browser_mut(&mut self) -> &mut BrowserState {
        &mut self.browser
    }

    pub(crate) fn overlay_mut(&mut self) -> &mut OverlayState {
        &mut self.overlay
    }

    pub(crate) fn drive_mut(&mut self) -> &mut DriveState {
        &mut self.drive
    }

    pub(crate) fn transfers_mut(&mut self) -> &mut TransferLog {
        &mut self.transfers
    }

    pub(crate) fn set_notice(&mut self, notice: Option<String>) {
        self.notice = notice;
    }
}
