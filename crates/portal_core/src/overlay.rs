use std::collections::{BTreeMap, BTreeSet};

pub type ActorId = String;

/// Lifecycle of one realtime subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelPhase {
    #[default]
    Disconnected,
    Subscribing,
    Synced,
}

/// Names of the two admin-overlay subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayChannel {
    Presence,
    Messages,
}

impl OverlayChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            OverlayChannel::Presence => "presence",
            OverlayChannel::Messages => "messages",
        }
    }
}

/// Kind of row change delivered by the realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowEvent {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverlayState {
    presence_phase: ChannelPhase,
    messages_phase: ChannelPhase,
    online: BTreeSet<ActorId>,
    unread: BTreeMap<ActorId, u32>,
}

impl OverlayState {
    pub fn phase(&self, channel: OverlayChannel) -> ChannelPhase {
        match channel {
            OverlayChannel::Presence => self.presence_phase,
            OverlayChannel::Messages => self.messages_phase,
        }
    }

    pub fn online(&self) -> &BTreeSet<ActorId> {
        &self.online
    }

    pub fn unread(&self) -> &BTreeMap<ActorId, u32> {
        &self.unread
    }

    pub fn unread_total(&self) -> u32 {
        self.unread.values().sum()
    }

    pub fn is_active(&self) -> bool {
        self.presence_phase != ChannelPhase::Disconnected
            || self.messages_phase != ChannelPhase::Disconnected
    }

    pub fn begin_subscribing(&mut self) {
        self.presence_phase = ChannelPhase::Subscribing;
        self.messages_phase = ChannelPhase::Subscribing;
    }

    pub fn channel_joined(&mut self, channel: OverlayChannel) {
        // The presence channel reaches Synced only on its first snapshot.
        if channel == OverlayChannel::Messages && self.messages_phase == ChannelPhase::Subscribing {
            self.messages_phase = ChannelPhase::Synced;
        }
    }

    /// Full replace from the latest snapshot; never an incremental merge.
    /// The overlay is only as correct as the last sync and tolerates missed
    /// intermediate events.
    pub fn apply_presence_sync(&mut self, ids: Vec<ActorId>) {
        if self.presence_phase == ChannelPhase::Disconnected {
            return;
        }
        self.presence_phase = ChannelPhase::Synced;
        self.online = ids.into_iter().collect();
    }

    /// A matching row change invalidates the unread aggregate; the caller
    /// re-fetches it rather than computing the delta locally.
    pub fn row_change_invalidates_unread(&self, table: &str, event: RowEvent) -> bool {
        self.messages_phase != ChannelPhase::Disconnected
            && table == "messages"
            && event == RowEvent::Insert
    }

    pub fn apply_unread(&mut self, counts: Vec<(ActorId, u32)>) {
        if self.messages_phase == ChannelPhase::Disconnected {
            return;
        }
        self.unread = counts.into_iter().collect();
    }

    pub fn teardown(&mut self) {
        self.presence_phase = ChannelPhase::Disconnected;
        self.messages_phase = ChannelPhase::Disconnected;
        self.online.clear();
        self.unread.clear();
    }
}
