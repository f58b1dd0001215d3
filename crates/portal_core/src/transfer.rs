use std::collections::BTreeMap;

pub type TransferId = u64;

/// Delay before a terminal transfer is removed from the active set.
pub const TRANSFER_EXPIRY_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Upload,
    Download,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Running,
    Done,
    Error,
}

impl TransferStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferStatus::Done | TransferStatus::Error)
    }
}

/// One tracked upload/download/delete operation. A self-expiring log entry,
/// not a queue item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub id: TransferId,
    pub kind: TransferKind,
    pub label: String,
    pub progress: u8,
    pub status: TransferStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferLog {
    next_id: TransferId,
    active: BTreeMap<TransferId, Transfer>,
}

impl TransferLog {
    pub fn active(&self) -> impl Iterator<Item = &Transfer> {
        self.active.values()
    }

    pub fn get(&self, id: TransferId) -> Option<&Transfer> {
        self.active.get(&id)
    }

    pub fn begin(&mut self, kind: TransferKind, label: impl Into<String>) -> TransferId {
        self.next_id += 1;
        let id = self.next_id;
        self.active.insert(
            id,
            Transfer {
                id,
                kind,
                label: label.into(),
                progress: 0,
                status: TransferStatus::Running,
            },
        );
        id
    }

    /// Applies a progress callback. Unknown ids are tolerated (late
    /// callbacks after expiry) and terminal entries are never revived.
    pub fn update_progress(&mut self, id: TransferId, progress: u8) -> bool {
        match self.active.get_mut(&id) {
            Some(transfer) if !transfer.status.is_terminal() => {
                transfer.progress = progress.min(100);
                true
            }
            _ => false,
        }
    }

    /// Marks a transfer terminal. Returns true when the transition happened
    /// and an expiry must be scheduled.
    pub fn finish(&mut self, id: TransferId, status: TransferStatus) -> bool {
        if !status.is_terminal() {
            return false;
        }
        match self.active.get_mut(&id) {
            Some(transfer) if !transfer.status.is_terminal() => {
                transfer.status = status;
                if status == TransferStatus::Done {
                    transfer.progress = 100;
                }
                true
            }
            _ => false,
        }
    }

    /// Removes an entry once its expiry timer fires. Running entries are
    /// left alone: only terminal transfers expire.
    pub fn expire(&mut self, id: TransferId) -> bool {
        match self.active.get(&id) {
            Some(transfer) if transfer.status.is_terminal() => {
                self.active.remove(&id);
                true
            }
            _ => false,
        }
    }
}
