use std::sync::Once;

use portal_core::{
    update, AdminSession, AppState, DriveFile, Effect, Msg, RemoteErrorKind, RemoteFailure,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(portal_logging::initialize_for_tests);
}

fn logged_in() -> AppState {
    let (state, _) = update(
        AppState::new(),
        Msg::SessionRestored {
            session: AdminSession {
                username: "admin".to_string(),
                token: "token-1".to_string(),
            },
        },
    );
    state
}

fn listing() -> Vec<DriveFile> {
    vec![
        DriveFile {
            id: "d1".to_string(),
            name: "reports".to_string(),
            mime_type: String::new(),
            is_folder: true,
            size: None,
        },
        DriveFile {
            id: "f1".to_string(),
            name: "map.tif".to_string(),
            mime_type: "image/tiff".to_string(),
            is_folder: false,
            size: Some(4096),
        },
    ]
}

#[test]
fn drive_panel_requires_a_session() {
    init_logging();
    let (_state, effects) = update(AppState::new(), Msg::DriveOpened);
    assert_eq!(effects, vec![Effect::RedirectToLogin]);

    let (_state, effects) = update(logged_in(), Msg::DriveOpened);
    assert_eq!(effects, vec![Effect::DriveList]);
}

#[test]
fn listing_populates_the_panel() {
    init_logging();
    let (state, _) = update(
        logged_in(),
        Msg::DriveListLoaded {
            result: Ok(listing()),
        },
    );
    let view = state.view();
    assert_eq!(view.drive_files.len(), 2);
    assert!(view.drive_files[0].is_folder);
    assert_eq!(view.drive_files[1].name, "map.tif");
}

#[test]
fn listing_failure_raises_a_notice() {
    init_logging();
    let (state, effects) = update(
        logged_in(),
        Msg::DriveListLoaded {
            result: Err(RemoteFailure::new(
                RemoteErrorKind::Provider,
                "drive not connected",
            )),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().notice.as_deref(), Some("drive not connected"));
}

#[test]
fn empty_folder_names_are_not_submitted() {
    init_logging();
    let (_state, effects) = update(
        logged_in(),
        Msg::DriveFolderSubmitted {
            name: "   ".to_string(),
        },
    );
    assert!(effects.is_empty());

    let (_state, effects) = update(
        logged_in(),
        Msg::DriveFolderSubmitted {
            name: "reports".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::DriveCreateFolder {
            name: "reports".to_string()
        }]
    );
}

#[test]
fn connect_flow_surfaces_the_redirect_url() {
    init_logging();
    let (state, effects) = update(logged_in(), Msg::DriveConnectClicked);
    assert_eq!(effects, vec![Effect::DriveOauthStart]);

    let (state, _) = update(
        state,
        Msg::DriveOauthUrlReady {
            url: "https://accounts.example.com/oauth".to_string(),
        },
    );
    assert!(state
        .view()
        .notice
        .unwrap()
        .contains("https://accounts.example.com/oauth"));
}

#[test]
fn disconnect_clears_the_listing() {
    init_logging();
    let (state, _) = update(
        logged_in(),
        Msg::DriveListLoaded {
            result: Ok(listing()),
        },
    );
    let (state, effects) = update(state, Msg::DriveDisconnectClicked);
    assert_eq!(effects, vec![Effect::DriveDisconnect]);

    let (state, _) = update(state, Msg::DriveDisconnected);
    assert!(state.view().drive_files.is_empty());
}
