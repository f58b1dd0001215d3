use std::sync::Once;

use portal_core::{
    update, AppState, DraftField, Effect, Msg, RemoteErrorKind, RemoteFailure, WizardKind,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(portal_logging::initialize_for_tests);
}

fn open_job_wizard(open_count: u32) -> AppState {
    let (state, effects) = update(
        AppState::new(),
        Msg::WizardOpened {
            kind: WizardKind::JobPosting,
            prefill: None,
            owner: "owner-1".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::FetchOpenJobCount {
            owner: "owner-1".to_string()
        }]
    );
    let (state, _) = update(state, Msg::OpenJobCountLoaded { open_count });
    state
}

fn edit(state: AppState, field: DraftField, value: &str) -> AppState {
    let (state, _) = update(
        state,
        Msg::FieldEdited {
            field,
            value: value.to_string(),
        },
    );
    state
}

#[test]
fn advance_blocked_until_step_fields_pass() {
    init_logging();
    let state = open_job_wizard(0);

    // Step 1 requires title and employment type.
    let (state, _) = update(state, Msg::NextClicked);
    let view = state.view().wizard.unwrap();
    assert_eq!(view.step, 1);
    assert!(view.errors.iter().any(|(f, _)| *f == DraftField::Title));
    assert!(view
        .errors
        .iter()
        .any(|(f, _)| *f == DraftField::EmploymentType));

    let state = edit(state, DraftField::Title, "GIS Analyst");
    let state = edit(state, DraftField::EmploymentType, "Full-time");
    let (state, _) = update(state, Msg::NextClicked);
    let view = state.view().wizard.unwrap();
    assert_eq!(view.step, 2);
    assert!(view.errors.is_empty());
}

#[test]
fn retreat_is_unconditional_and_floored() {
    init_logging();
    let state = open_job_wizard(0);
    let state = edit(state, DraftField::Title, "GIS Analyst");
    let state = edit(state, DraftField::EmploymentType, "Full-time");
    let (state, _) = update(state, Msg::NextClicked);
    assert_eq!(state.view().wizard.unwrap().step, 2);

    let (state, _) = update(state, Msg::BackClicked);
    assert_eq!(state.view().wizard.unwrap().step, 1);

    // Already at step 1: retreat stays put.
    let (state, _) = update(state, Msg::BackClicked);
    assert_eq!(state.view().wizard.unwrap().step, 1);
}

#[test]
fn external_link_must_be_absolute_url() {
    init_logging();
    let state = open_job_wizard(0);
    let state = edit(state, DraftField::Title, "GIS Analyst");
    let state = edit(state, DraftField::EmploymentType, "Full-time");
    let (state, _) = update(state, Msg::NextClicked);
    let state = edit(state, DraftField::Description, "Maps things.");
    let (state, _) = update(state, Msg::NextClicked);
    assert_eq!(state.view().wizard.unwrap().step, 3);

    let state = edit(state, DraftField::ExternalLink, "careers/apply");
    let (state, effects) = update(state, Msg::SubmitClicked);
    assert!(effects.is_empty());
    let view = state.view().wizard.unwrap();
    assert!(view
        .errors
        .iter()
        .any(|(f, _)| *f == DraftField::ExternalLink));
    assert!(!view.is_submitting);

    // A proper absolute URL clears the gate.
    let state = edit(state, DraftField::ExternalLink, "https://example.com/apply");
    let (state, effects) = update(state, Msg::SubmitClicked);
    assert_eq!(effects.len(), 1);
    assert!(matches!(effects[0], Effect::SubmitDraft { .. }));
    assert!(state.view().wizard.unwrap().is_submitting);
}

#[test]
fn submit_success_completes_and_notifies() {
    init_logging();
    // Scenario: owner with 2 open postings is under the quota.
    let state = open_job_wizard(2);
    assert!(!state.view().wizard.as_ref().unwrap().job_limit_reached);

    let state = edit(state, DraftField::Title, "GIS Analyst");
    let state = edit(state, DraftField::EmploymentType, "Full-time");
    let (state, _) = update(state, Msg::NextClicked);
    let state = edit(state, DraftField::Description, "x");
    let (state, _) = update(state, Msg::NextClicked);
    let (state, effects) = update(state, Msg::SubmitClicked);
    match &effects[..] {
        [Effect::SubmitDraft { kind, draft }] => {
            assert_eq!(*kind, WizardKind::JobPosting);
            assert_eq!(draft.title, "GIS Analyst");
            assert_eq!(draft.employment_type, "Full-time");
            assert_eq!(draft.description, "x");
        }
        other => panic!("unexpected effects: {other:?}"),
    }

    // Double-click while submitting is a no-op.
    let (state, effects) = update(state, Msg::SubmitClicked);
    assert!(effects.is_empty());

    let (state, effects) = update(state, Msg::SubmitResolved { result: Ok(()) });
    assert_eq!(
        effects,
        vec![Effect::NotifySubmission {
            kind: WizardKind::JobPosting,
            title: "GIS Analyst".to_string()
        }]
    );
    let view = state.view().wizard.unwrap();
    assert!(view.completed);
    assert!(!view.is_submitting);
}

#[test]
fn submit_failure_is_retryable() {
    init_logging();
    let state = open_job_wizard(0);
    let state = edit(state, DraftField::Title, "GIS Analyst");
    let state = edit(state, DraftField::EmploymentType, "Full-time");
    let (state, _) = update(state, Msg::NextClicked);
    let state = edit(state, DraftField::Description, "x");
    let (state, _) = update(state, Msg::NextClicked);
    let (state, _) = update(state, Msg::SubmitClicked);

    let (state, effects) = update(
        state,
        Msg::SubmitResolved {
            result: Err(RemoteFailure::new(RemoteErrorKind::Network, "offline")),
        },
    );
    assert!(effects.is_empty());
    let view = state.view().wizard.unwrap();
    assert!(!view.completed);
    assert!(!view.is_submitting);
    assert_eq!(view.submit_failure.as_deref(), Some("offline"));

    // The user may retry.
    let (state, effects) = update(state, Msg::SubmitClicked);
    assert_eq!(effects.len(), 1);
    assert!(state.view().wizard.unwrap().is_submitting);
}

#[test]
fn quota_reached_freezes_wizard() {
    init_logging();
    // Scenario: owner already holds 3 non-terminal postings.
    let state = open_job_wizard(3);
    let view = state.view().wizard.unwrap();
    assert!(view.job_limit_reached);
    assert_eq!(view.step, 1);

    // advance() and submit() are no-ops while frozen.
    let state = edit(state, DraftField::Title, "GIS Analyst");
    let state = edit(state, DraftField::EmploymentType, "Full-time");
    let (state, _) = update(state, Msg::NextClicked);
    assert_eq!(state.view().wizard.unwrap().step, 1);
    let (state, effects) = update(state, Msg::SubmitClicked);
    assert!(effects.is_empty());
    assert!(!state.view().wizard.unwrap().is_submitting);
}

#[test]
fn profile_wizard_enforces_bio_and_skills() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::WizardOpened {
            kind: WizardKind::ProfileCompletion,
            prefill: None,
            owner: "user-9".to_string(),
        },
    );
    // No quota fetch for the profile flow.
    assert!(effects.is_empty());

    let state = edit(state, DraftField::FullName, "Ada Lovelace");
    let state = edit(state, DraftField::Phone, "+44 20 7946 0000");
    let (state, _) = update(state, Msg::NextClicked);
    assert_eq!(state.view().wizard.unwrap().step, 2);

    let state = edit(state, DraftField::Role, "Analyst");
    let state = edit(state, DraftField::Location, "London");
    let (state, _) = update(state, Msg::NextClicked);
    // Still step 2: no skills yet.
    let view = state.view().wizard.unwrap();
    assert_eq!(view.step, 2);
    assert!(view.errors.iter().any(|(f, _)| *f == DraftField::Skills));

    let (state, _) = update(state, Msg::SkillAdded("GIS".to_string()));
    let (state, _) = update(state, Msg::NextClicked);
    assert_eq!(state.view().wizard.unwrap().step, 3);

    let state = edit(state, DraftField::Bio, "too short");
    let (state, effects) = update(state, Msg::SubmitClicked);
    assert!(effects.is_empty());
    assert!(state
        .view()
        .wizard
        .unwrap()
        .errors
        .iter()
        .any(|(f, _)| *f == DraftField::Bio));

    let state = edit(state, DraftField::Bio, "Spatial analyst with ten years of experience.");
    let (_state, effects) = update(state, Msg::SubmitClicked);
    assert_eq!(effects.len(), 1);
}

#[test]
fn oversized_photo_rejected_before_upload() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::WizardOpened {
            kind: WizardKind::ProfileCompletion,
            prefill: None,
            owner: "user-9".to_string(),
        },
    );

    let (state, effects) = update(
        state,
        Msg::PhotoPicked {
            name: "huge.png".to_string(),
            size_bytes: portal_core::IMAGE_MAX_BYTES + 1,
            data: Vec::new(),
        },
    );
    // No upload effect is issued for an oversized image.
    assert!(effects.is_empty());
    assert!(state
        .view()
        .wizard
        .unwrap()
        .errors
        .iter()
        .any(|(f, _)| *f == DraftField::Photo));

    let (state, effects) = update(
        state,
        Msg::PhotoPicked {
            name: "ok.png".to_string(),
            size_bytes: 1024,
            data: vec![0u8; 16],
        },
    );
    assert!(matches!(effects[..], [Effect::UploadPhoto { .. }]));
    let (state, _) = update(
        state,
        Msg::PhotoUploaded {
            result: Ok("https://cdn.example.com/ok.png".to_string()),
        },
    );
    assert!(state.view().wizard.unwrap().errors.is_empty());
}

#[test]
fn draft_is_discarded_on_close() {
    init_logging();
    let state = open_job_wizard(0);
    let state = edit(state, DraftField::Title, "GIS Analyst");
    let (state, effects) = update(state, Msg::WizardClosed);
    assert!(effects.is_empty());
    assert!(state.view().wizard.is_none());
}
