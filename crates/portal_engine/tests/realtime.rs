use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use portal_engine::{
    ChannelEvent, ChannelSpec, GatewayError, RealtimeTransport, Subscription,
};

/// Emits one presence snapshot per poll, then idles.
struct FakeTransport {
    polls: AtomicU64,
}

#[async_trait::async_trait]
impl RealtimeTransport for FakeTransport {
    async fn poll(
        &self,
        _spec: &ChannelSpec,
        cursor: u64,
    ) -> Result<(u64, Vec<ChannelEvent>), GatewayError> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst);
        if poll == 0 {
            return Ok((
                cursor + 1,
                vec![ChannelEvent::PresenceSync {
                    ids: vec!["u1".to_string(), "u2".to_string()],
                }],
            ));
        }
        // Simulate an open long-poll window with nothing to deliver.
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok((cursor, Vec::new()))
    }
}

#[tokio::test]
async fn subscription_delivers_joined_then_events() {
    let transport = Arc::new(FakeTransport {
        polls: AtomicU64::new(0),
    });
    let mut subscription = Subscription::spawn(
        &tokio::runtime::Handle::current(),
        transport,
        ChannelSpec::presence("presence"),
    );

    assert_eq!(subscription.recv().await, Some(ChannelEvent::Joined));
    assert_eq!(
        subscription.recv().await,
        Some(ChannelEvent::PresenceSync {
            ids: vec!["u1".to_string(), "u2".to_string()]
        })
    );
}

#[tokio::test]
async fn cancelling_stops_the_poll_loop() {
    let transport = Arc::new(FakeTransport {
        polls: AtomicU64::new(0),
    });
    let mut subscription = Subscription::spawn(
        &tokio::runtime::Handle::current(),
        transport.clone(),
        ChannelSpec::presence("presence"),
    );
    assert_eq!(subscription.recv().await, Some(ChannelEvent::Joined));

    subscription.cancel_token().cancel();
    // Drain whatever was already queued; the stream must end.
    while let Some(event) = subscription.recv().await {
        let _ = event;
    }
    let polls_after_cancel = transport.polls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(transport.polls.load(Ordering::SeqCst), polls_after_cancel);
}

#[tokio::test]
async fn row_change_spec_carries_filter() {
    let spec = ChannelSpec::row_changes(
        "admin-messages",
        "messages",
        "INSERT",
        Some("recipient=eq.admin".to_string()),
    );
    assert_eq!(spec.table.as_deref(), Some("messages"));
    assert_eq!(spec.event.as_deref(), Some("INSERT"));
    assert!(!spec.presence);
}
