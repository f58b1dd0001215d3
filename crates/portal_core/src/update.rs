use crate::browse::ToggleOutcome;
use crate::overlay::OverlayChannel;
use crate::state::{AppState, RemoteErrorKind, RemoteFailure};
use crate::transfer::{TransferKind, TransferStatus};
use crate::wizard::{photo_within_limit, WizardKind, WizardState, IMAGE_MAX_BYTES};
use crate::{Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SessionRestored { session } => {
            state.set_session(Some(session));
            state.mark_dirty();
            Vec::new()
        }
        Msg::AdminLoginSubmitted { username, password } => {
            vec![Effect::AdminLogin { username, password }]
        }
        Msg::AdminLoginResolved { result } => match result {
            Ok(session) => {
                state.set_session(Some(session.clone()));
                state.set_notice(None);
                state.mark_dirty();
                vec![Effect::PersistSession { session }]
            }
            Err(failure) => {
                state.set_notice(Some(format!("login failed: {}", failure.message)));
                state.mark_dirty();
                Vec::new()
            }
        },
        Msg::LogoutClicked => {
            state.set_session(None);
            state.mark_dirty();
            let mut effects = teardown_overlay(&mut state);
            effects.push(Effect::ClearSession);
            effects
        }

        Msg::WizardOpened {
            kind,
            prefill,
            owner,
        } => {
            state.set_wizard(Some(WizardState::new(kind, prefill)));
            state.mark_dirty();
            if kind == WizardKind::JobPosting {
                vec![Effect::FetchOpenJobCount { owner }]
            } else {
                Vec::new()
            }
        }
        Msg::OpenJobCountLoaded { open_count } => {
            if let Some(wizard) = state.wizard_mut() {
                wizard.apply_open_job_count(open_count);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::FieldEdited { field, value } => {
            if let Some(wizard) = state.wizard_mut() {
                wizard.draft_mut().set_field(field, value);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SkillAdded(skill) => {
            if let Some(wizard) = state.wizard_mut() {
                let skill = skill.trim().to_string();
                if !skill.is_empty() && !wizard.draft().skills.contains(&skill) {
                    wizard.draft_mut().skills.push(skill);
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::SkillRemoved(skill) => {
            if let Some(wizard) = state.wizard_mut() {
                wizard.draft_mut().skills.retain(|s| s != &skill);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::PhotoPicked {
            name,
            size_bytes,
            data,
        } => {
            let Some(wizard) = state.wizard_mut() else {
                return (state, Vec::new());
            };
            // Size ceiling is enforced before any upload attempt.
            if !photo_within_limit(size_bytes) {
                wizard.reject_photo(format!(
                    "image exceeds {} MiB limit",
                    IMAGE_MAX_BYTES / (1024 * 1024)
                ));
                state.mark_dirty();
                Vec::new()
            } else {
                state.mark_dirty();
                vec![Effect::UploadPhoto { name, data }]
            }
        }
        Msg::PhotoUploaded { result } => {
            if let Some(wizard) = state.wizard_mut() {
                match result {
                    Ok(url) => wizard.apply_photo_url(url),
                    Err(failure) => wizard.reject_photo(failure.message),
                }
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::NextClicked => {
            if let Some(wizard) = state.wizard_mut() {
                wizard.advance();
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::BackClicked => {
            if let Some(wizard) = state.wizard_mut() {
                wizard.retreat();
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SubmitClicked => {
            let Some(wizard) = state.wizard_mut() else {
                return (state, Vec::new());
            };
            if wizard.begin_submit() {
                let kind = wizard.kind();
                let draft = wizard.draft().clone();
                state.mark_dirty();
                vec![Effect::SubmitDraft { kind, draft }]
            } else {
                state.mark_dirty();
                Vec::new()
            }
        }
        Msg::SubmitResolved { result } => {
            let Some(wizard) = state.wizard_mut() else {
                return (state, Vec::new());
            };
            let auth_failed = matches!(
                &result,
                Err(RemoteFailure {
                    kind: RemoteErrorKind::Auth,
                    ..
                })
            );
            let succeeded = result.is_ok();
            let kind = wizard.kind();
            let title = wizard.draft().title.clone();
            wizard.resolve_submit(result);
            state.mark_dirty();
            if succeeded {
                // Side notification is fire-and-forget; its failure never
                // surfaces on the submission.
                vec![Effect::NotifySubmission { kind, title }]
            } else if auth_failed {
                vec![Effect::RedirectToLogin]
            } else {
                Vec::new()
            }
        }
        Msg::WizardClosed => {
            state.set_wizard(None);
            state.mark_dirty();
            Vec::new()
        }

        Msg::BrowserOpened => {
            vec![Effect::FetchJobs, Effect::FetchViewerContext]
        }
        Msg::JobsLoaded { result } => match result {
            Ok(jobs) => {
                state.browser_mut().set_jobs(jobs);
                state.mark_dirty();
                Vec::new()
            }
            Err(failure) => {
                state.set_notice(Some(format!("failed to load jobs: {}", failure.message)));
                state.mark_dirty();
                Vec::new()
            }
        },
        Msg::ViewerContextLoaded {
            saved,
            applied,
            skills,
        } => {
            state.browser_mut().set_viewer_context(saved, applied, skills);
            state.mark_dirty();
            Vec::new()
        }
        Msg::FilterTextChanged(text) => {
            state.browser_mut().update_filters(|f| f.text = text);
            state.mark_dirty();
            Vec::new()
        }
        Msg::FilterLocationChanged(location) => {
            state.browser_mut().update_filters(|f| f.location = location);
            state.mark_dirty();
            Vec::new()
        }
        Msg::FilterTypeChanged(employment_type) => {
            state
                .browser_mut()
                .update_filters(|f| f.employment_type = employment_type);
            state.mark_dirty();
            Vec::new()
        }
        Msg::FilterMinSalaryChanged(min_salary) => {
            state.browser_mut().update_filters(|f| f.min_salary = min_salary);
            state.mark_dirty();
            Vec::new()
        }
        Msg::FilterPostedWithinChanged(window) => {
            state
                .browser_mut()
                .update_filters(|f| f.posted_within_days = window);
            state.mark_dirty();
            Vec::new()
        }
        Msg::JobSelected { job_id } => {
            if state.browser_mut().select(&job_id) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SaveToggled { job_id } => {
            toggle_membership(&mut state, crate::MembershipSet::Saved, job_id)
        }
        Msg::ApplyToggled { job_id } => {
            toggle_membership(&mut state, crate::MembershipSet::Applied, job_id)
        }
        Msg::MembershipResolved {
            set,
            job_id,
            result,
        } => {
            let succeeded = result.is_ok();
            let follow_up = state.browser_mut().resolve_membership(set, &job_id, succeeded);
            if let Err(failure) = result {
                state.set_notice(Some(format!("could not update list: {}", failure.message)));
            }
            state.mark_dirty();
            match follow_up {
                Some(member) => vec![Effect::PersistMembership {
                    set,
                    job_id,
                    member,
                }],
                None => Vec::new(),
            }
        }

        Msg::OverlayOpened => {
            if state.session().is_none() {
                return (state, vec![Effect::RedirectToLogin]);
            }
            state.overlay_mut().begin_subscribing();
            state.mark_dirty();
            vec![
                Effect::Subscribe {
                    channel: OverlayChannel::Presence,
                },
                Effect::Subscribe {
                    channel: OverlayChannel::Messages,
                },
            ]
        }
        Msg::ChannelJoined { channel } => {
            state.overlay_mut().channel_joined(channel);
            state.mark_dirty();
            Vec::new()
        }
        Msg::PresenceSynced { online } => {
            state.overlay_mut().apply_presence_sync(online);
            state.mark_dirty();
            Vec::new()
        }
        Msg::RowChanged { table, event } => {
            if state.overlay().row_change_invalidates_unread(&table, event) {
                vec![Effect::FetchUnreadCounts]
            } else {
                Vec::new()
            }
        }
        Msg::UnreadLoaded { result } => match result {
            Ok(counts) => {
                state.overlay_mut().apply_unread(counts);
                state.mark_dirty();
                Vec::new()
            }
            Err(failure) => remote_failure_on_admin_view(&mut state, failure),
        },
        Msg::ChatMessageSent { recipient, body } => {
            if state.session().is_none() || body.trim().is_empty() {
                Vec::new()
            } else {
                vec![Effect::SendChatMessage { recipient, body }]
            }
        }
        Msg::OverlayClosed => teardown_overlay(&mut state),

        Msg::DriveOpened | Msg::DriveRefreshRequested => {
            if state.session().is_none() {
                vec![Effect::RedirectToLogin]
            } else {
                vec![Effect::DriveList]
            }
        }
        Msg::DriveListLoaded { result } => match result {
            Ok(files) => {
                let drive = state.drive_mut();
                drive.files = files;
                drive.connected = true;
                state.mark_dirty();
                Vec::new()
            }
            Err(failure) => remote_failure_on_admin_view(&mut state, failure),
        },
        Msg::DriveUploadPicked {
            name,
            mime_type,
            data,
        } => {
            let transfer_id = state
                .transfers_mut()
                .begin(TransferKind::Upload, name.clone());
            state.mark_dirty();
            vec![Effect::DriveUpload {
                transfer_id,
                name,
                mime_type,
                data,
            }]
        }
        Msg::DriveDownloadClicked { file_id, name } => {
            let transfer_id = state
                .transfers_mut()
                .begin(TransferKind::Download, name.clone());
            state.mark_dirty();
            vec![Effect::DriveDownload {
                transfer_id,
                file_id,
                name,
            }]
        }
        Msg::DriveDeleteClicked { file_id, name } => {
            let transfer_id = state.transfers_mut().begin(TransferKind::Delete, name);
            state.mark_dirty();
            vec![Effect::DriveDelete {
                transfer_id,
                file_id,
            }]
        }
        Msg::DriveFolderSubmitted { name } => {
            if name.trim().is_empty() {
                Vec::new()
            } else {
                vec![Effect::DriveCreateFolder { name }]
            }
        }
        Msg::DriveConnectClicked => {
            if state.session().is_none() {
                vec![Effect::RedirectToLogin]
            } else {
                vec![Effect::DriveOauthStart]
            }
        }
        Msg::DriveOauthUrlReady { url } => {
            state.set_notice(Some(format!("authorize drive access at {url}")));
            state.mark_dirty();
            Vec::new()
        }
        Msg::DriveDisconnectClicked => {
            if state.session().is_none() {
                vec![Effect::RedirectToLogin]
            } else {
                vec![Effect::DriveDisconnect]
            }
        }
        Msg::DriveDisconnected => {
            let drive = state.drive_mut();
            drive.files.clear();
            drive.connected = false;
            state.mark_dirty();
            Vec::new()
        }
        Msg::TransferProgress { id, progress } => {
            if state.transfers_mut().update_progress(id, progress) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::TransferFinished { id, result } => {
            let kind = state.transfers().get(id).map(|t| t.kind);
            let status = if result.is_ok() {
                TransferStatus::Done
            } else {
                TransferStatus::Error
            };
            if !state.transfers_mut().finish(id, status) {
                return (state, Vec::new());
            }
            state.mark_dirty();
            let mut effects = vec![Effect::ScheduleTransferExpiry { transfer_id: id }];
            // A finished upload or delete changes the remote listing.
            if result.is_ok()
                && matches!(kind, Some(TransferKind::Upload) | Some(TransferKind::Delete))
            {
                effects.push(Effect::DriveList);
            }
            effects
        }
        Msg::TransferExpired { id } => {
            if state.transfers_mut().expire(id) {
                state.mark_dirty();
            }
            Vec::new()
        }

        Msg::NoticeRaised { message } => {
            state.set_notice(Some(message));
            state.mark_dirty();
            Vec::new()
        }
        Msg::NoticeDismissed => {
            state.set_notice(None);
            state.mark_dirty();
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn toggle_membership(
    state: &mut AppState,
    set: crate::MembershipSet,
    job_id: String,
) -> Vec<Effect> {
    match state.browser_mut().toggle_membership(set, &job_id) {
        ToggleOutcome::Issue { desired } => {
            state.mark_dirty();
            vec![Effect::PersistMembership {
                set,
                job_id,
                member: desired,
            }]
        }
        ToggleOutcome::Queued => {
            state.mark_dirty();
            Vec::new()
        }
        ToggleOutcome::Ignored => Vec::new(),
    }
}

fn teardown_overlay(state: &mut AppState) -> Vec<Effect> {
    if !state.overlay().is_active() {
        return Vec::new();
    }
    state.overlay_mut().teardown();
    state.mark_dirty();
    vec![
        Effect::Unsubscribe {
            channel: OverlayChannel::Presence,
        },
        Effect::Unsubscribe {
            channel: OverlayChannel::Messages,
        },
    ]
}

/// Remote failures on protected admin views: authentication failures tear
/// the session down and redirect; anything else becomes a transient notice.
fn remote_failure_on_admin_view(state: &mut AppState, failure: RemoteFailure) -> Vec<Effect> {
    if failure.kind == RemoteErrorKind::Auth {
        state.set_session(None);
        state.mark_dirty();
        let mut effects = teardown_overlay(state);
        effects.push(Effect::ClearSession);
        effects.push(Effect::RedirectToLogin);
        effects
    } else {
        state.set_notice(Some(failure.message));
        state.mark_dirty();
        Vec::new()
    }
}
