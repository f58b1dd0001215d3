use crate::browse::ItemId;
use crate::overlay::{ActorId, ChannelPhase, OverlayChannel};
use crate::state::AppState;
use crate::transfer::{TransferId, TransferKind, TransferStatus};
use crate::wizard::{DraftField, WizardKind};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub logged_in: bool,
    pub wizard: Option<WizardView>,
    pub jobs: Vec<JobRowView>,
    pub selected_job: Option<ItemId>,
    pub online: Vec<ActorId>,
    pub unread_total: u32,
    pub presence_phase: ChannelPhase,
    pub drive_files: Vec<DriveRowView>,
    pub transfers: Vec<TransferRowView>,
    pub notice: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardView {
    pub kind: WizardKind,
    pub step: u8,
    pub step_count: u8,
    pub errors: Vec<(DraftField, String)>,
    pub is_submitting: bool,
    pub completed: bool,
    pub job_limit_reached: bool,
    pub submit_failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: ItemId,
    pub title: String,
    pub company: String,
    pub location: String,
    pub employment_type: String,
    pub salary_min: Option<u32>,
    pub skill_match_percent: u8,
    pub saved: bool,
    pub applied: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveRowView {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub is_folder: bool,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRowView {
    pub id: TransferId,
    pub kind: TransferKind,
    pub label: String,
    pub progress: u8,
    pub status: TransferStatus,
}

pub(crate) fn build(state: &AppState) -> AppViewModel {
    let browser = state.browser();
    let jobs = browser
        .filtered()
        .iter()
        .filter_map(|id| browser.jobs().iter().find(|job| &job.id == id))
        .map(|job| JobRowView {
            job_id: job.id.clone(),
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            employment_type: job.employment_type.clone(),
            salary_min: job.salary_min,
            skill_match_percent: browser.skill_match_percent(job),
            saved: browser.is_member(crate::MembershipSet::Saved, &job.id),
            applied: browser.is_member(crate::MembershipSet::Applied, &job.id),
            selected: browser.selected() == Some(&job.id),
        })
        .collect();

    let wizard = state.wizard().map(|wizard| WizardView {
        kind: wizard.kind(),
        step: wizard.step(),
        step_count: wizard.step_count(),
        errors: wizard
            .errors()
            .iter()
            .map(|(field, reason)| (*field, reason.clone()))
            .collect(),
        is_submitting: wizard.is_submitting(),
        completed: wizard.is_completed(),
        job_limit_reached: wizard.job_limit_reached(),
        submit_failure: wizard.last_submit_failure().map(|f| f.message.clone()),
    });

    AppViewModel {
        logged_in: state.session().is_some(),
        wizard,
        jobs,
        selected_job: browser.selected().cloned(),
        online: state.overlay().online().iter().cloned().collect(),
        unread_total: state.overlay().unread_total(),
        presence_phase: state.overlay().phase(OverlayChannel::Presence),
        drive_files: state
            .drive()
            .files
            .iter()
            .map(|file| DriveRowView {
                id: file.id.clone(),
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
                is_folder: file.is_folder,
                size: file.size,
            })
            .collect(),
        transfers: state
            .transfers()
            .active()
            .map(|transfer| TransferRowView {
                id: transfer.id,
                kind: transfer.kind,
                label: transfer.label.clone(),
                progress: transfer.progress,
                status: transfer.status,
            })
            .collect(),
        notice: state.notice().map(ToOwned::to_owned),
        dirty: state.is_dirty(),
    }
}
