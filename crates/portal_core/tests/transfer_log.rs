use std::sync::Once;

use portal_core::{
    update, AppState, Effect, Msg, RemoteErrorKind, RemoteFailure, TransferKind, TransferStatus,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(portal_logging::initialize_for_tests);
}

fn start_upload(state: AppState) -> (AppState, u64) {
    let (state, effects) = update(
        state,
        Msg::DriveUploadPicked {
            name: "report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            data: vec![1, 2, 3],
        },
    );
    let transfer_id = match &effects[..] {
        [Effect::DriveUpload { transfer_id, .. }] => *transfer_id,
        other => panic!("unexpected effects: {other:?}"),
    };
    (state, transfer_id)
}

#[test]
fn transfer_runs_then_expires_after_terminal() {
    init_logging();
    let (state, id) = start_upload(AppState::new());
    let row = state.view().transfers[0].clone();
    assert_eq!(row.kind, TransferKind::Upload);
    assert_eq!(row.status, TransferStatus::Running);
    assert_eq!(row.progress, 0);

    let (state, _) = update(state, Msg::TransferProgress { id, progress: 40 });
    assert_eq!(state.view().transfers[0].progress, 40);

    let (state, effects) = update(state, Msg::TransferFinished { id, result: Ok(()) });
    assert!(effects.contains(&Effect::ScheduleTransferExpiry { transfer_id: id }));
    // A finished upload refreshes the drive listing.
    assert!(effects.contains(&Effect::DriveList));
    let row = state.view().transfers[0].clone();
    assert_eq!(row.status, TransferStatus::Done);
    assert_eq!(row.progress, 100);

    // The expiry timer fires and the entry leaves the active set.
    let (state, effects) = update(state, Msg::TransferExpired { id });
    assert!(effects.is_empty());
    assert!(state.view().transfers.is_empty());
}

#[test]
fn terminal_status_is_absorbing() {
    init_logging();
    let (state, id) = start_upload(AppState::new());
    let (state, _) = update(state, Msg::TransferFinished { id, result: Ok(()) });

    // Late progress callbacks after the terminal transition are no-ops.
    let (state, effects) = update(state, Msg::TransferProgress { id, progress: 10 });
    assert!(effects.is_empty());
    assert_eq!(state.view().transfers[0].progress, 100);
    assert_eq!(state.view().transfers[0].status, TransferStatus::Done);

    // A second finish does not reschedule expiry.
    let (state, effects) = update(state, Msg::TransferFinished { id, result: Ok(()) });
    assert!(effects.is_empty());
    let _ = state;
}

#[test]
fn failed_transfer_expires_too() {
    init_logging();
    let (state, id) = start_upload(AppState::new());
    let (state, effects) = update(
        state,
        Msg::TransferFinished {
            id,
            result: Err(RemoteFailure::new(RemoteErrorKind::Network, "reset")),
        },
    );
    assert!(effects.contains(&Effect::ScheduleTransferExpiry { transfer_id: id }));
    // A failed upload does not refresh the listing.
    assert!(!effects.contains(&Effect::DriveList));
    assert_eq!(state.view().transfers[0].status, TransferStatus::Error);

    let (state, _) = update(state, Msg::TransferExpired { id });
    assert!(state.view().transfers.is_empty());
}

#[test]
fn unknown_ids_are_tolerated() {
    init_logging();
    let state = AppState::new();
    let (state, effects) = update(state, Msg::TransferProgress { id: 99, progress: 50 });
    assert!(effects.is_empty());
    let (state, effects) = update(
        state,
        Msg::TransferFinished {
            id: 99,
            result: Ok(()),
        },
    );
    assert!(effects.is_empty());
    let (state, effects) = update(state, Msg::TransferExpired { id: 99 });
    assert!(effects.is_empty());
    assert!(state.view().transfers.is_empty());
}

#[test]
fn expiry_never_removes_a_running_transfer() {
    init_logging();
    let (state, id) = start_upload(AppState::new());
    // A stray expiry for a still-running transfer must not remove it.
    let (state, _) = update(state, Msg::TransferExpired { id });
    assert_eq!(state.view().transfers.len(), 1);
    assert_eq!(state.view().transfers[0].status, TransferStatus::Running);
}

#[test]
fn download_and_delete_are_tracked() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::DriveDownloadClicked {
            file_id: "f-1".to_string(),
            name: "map.tif".to_string(),
        },
    );
    let id = match &effects[..] {
        [Effect::DriveDownload { transfer_id, .. }] => *transfer_id,
        other => panic!("unexpected effects: {other:?}"),
    };
    assert_eq!(state.view().transfers[0].kind, TransferKind::Download);

    let (state, effects) = update(
        state,
        Msg::DriveDeleteClicked {
            file_id: "f-2".to_string(),
            name: "old.tif".to_string(),
        },
    );
    assert!(matches!(effects[..], [Effect::DriveDelete { .. }]));
    assert_eq!(state.view().transfers.len(), 2);

    // Ids are distinct and monotonically assigned.
    let ids: Vec<_> = state.view().transfers.iter().map(|t| t.id).collect();
    assert!(ids.contains(&id));
    assert_eq!(ids.len(), 2);
}
