//! Scenario tests for channel fanout through the dispatcher.
//!
//! These tests drive `FanoutDispatcher` with raw protocol frames, exactly as
//! the WebSocket handler does, and observe what each connection's sink
//! receives. Sinks are plain bounded channels, so no sockets are involved.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::sync::mpsc;

use teamchat_realtime::adapters::websocket::{
    ChannelSink, ConnectionHandle, ConnectionRegistry, FanoutDispatcher, FrameOutcome,
};
use teamchat_realtime::domain::foundation::{ChannelId, ConnectionId, ConnectionState};
use teamchat_realtime::ports::{FanoutReport, MessageFanout, OutboundFrame, RealtimeObserver, SendError};

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Observer that records send failures so tests can assert none targeted a
/// destroyed connection.
#[derive(Default)]
struct FailureLog {
    send_failures: Mutex<Vec<(ConnectionId, SendError)>>,
    rejected: Mutex<usize>,
}

impl RealtimeObserver for FailureLog {
    fn frame_rejected(&self, _connection: &ConnectionId, _reason: &str) {
        *self.rejected.lock().unwrap() += 1;
    }

    fn send_failed(&self, recipient: &ConnectionId, _channel: &ChannelId, error: SendError) {
        self.send_failures.lock().unwrap().push((*recipient, error));
    }
}

struct Client {
    id: ConnectionId,
    rx: mpsc::Receiver<OutboundFrame>,
}

impl Client {
    fn drain(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            frames.push(serde_json::from_str(&frame).expect("outbound frame is JSON"));
        }
        frames
    }
}

struct Server {
    dispatcher: Arc<FanoutDispatcher>,
    log: Arc<FailureLog>,
}

impl Server {
    fn new() -> Self {
        let log = Arc::new(FailureLog::default());
        let dispatcher = Arc::new(FanoutDispatcher::new(
            Arc::new(ConnectionRegistry::new()),
            log.clone() as Arc<dyn RealtimeObserver>,
        ));
        Self { dispatcher, log }
    }

    fn registry(&self) -> &ConnectionRegistry {
        self.dispatcher.registry()
    }

    async fn connect(&self) -> Client {
        let (sink, rx) = ChannelSink::bounded(64);
        let handle = ConnectionHandle::new(Arc::new(sink));
        let id = handle.id();
        self.dispatcher.on_open(handle).await.unwrap();
        Client { id, rx }
    }

    async fn frame(&self, client: &Client, frame: Value) -> FrameOutcome {
        self.dispatcher.on_frame(&client.id, &frame.to_string()).await
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn three_users_in_one_channel() {
    let server = Server::new();
    let mut a = server.connect().await;
    let mut b = server.connect().await;
    let mut c = server.connect().await;

    for (client, user) in [(&a, 1), (&b, 2), (&c, 3)] {
        server.frame(client, json!({"type": "auth", "userId": user})).await;
        server
            .frame(client, json!({"type": "join_channel", "channelId": 10}))
            .await;
    }

    let outcome = server
        .frame(
            &a,
            json!({"type": "new_message", "channelId": 10, "data": {"content": "hi"}}),
        )
        .await;

    assert_eq!(
        outcome,
        FrameOutcome::Fanout(FanoutReport { delivered: 2, skipped: 0, failed: 0 })
    );
    let expected = vec![json!({"type": "new_message", "message": {"content": "hi"}})];
    assert_eq!(b.drain(), expected);
    assert_eq!(c.drain(), expected);
    assert!(a.drain().is_empty());
}

#[tokio::test]
async fn sender_exclusion_with_single_other_subscriber() {
    let server = Server::new();
    let mut a = server.connect().await;
    let mut b = server.connect().await;
    for (client, user) in [(&a, 1), (&b, 2)] {
        server.frame(client, json!({"type": "auth", "userId": user})).await;
        server
            .frame(client, json!({"type": "join_channel", "channelId": 7}))
            .await;
    }

    server
        .frame(&a, json!({"type": "new_message", "channelId": 7, "data": "ping"}))
        .await;

    assert_eq!(b.drain().len(), 1);
    assert_eq!(a.drain().len(), 0);
}

#[tokio::test]
async fn disconnected_subscriber_gets_nothing_and_sender_sees_no_error() {
    let server = Server::new();
    let mut a = server.connect().await;
    let b = server.connect().await;
    server.frame(&a, json!({"type": "auth", "userId": 1})).await;
    server.frame(&b, json!({"type": "auth", "userId": 2})).await;
    server
        .frame(&a, json!({"type": "join_channel", "channelId": 10}))
        .await;

    // Transport close for A.
    server.dispatcher.on_close(&a.id).await;
    assert_eq!(server.registry().state_of(&a.id).await, ConnectionState::Destroyed);

    let outcome = server
        .frame(&b, json!({"type": "new_message", "channelId": 10, "data": {"content": "late"}}))
        .await;

    assert_eq!(outcome, FrameOutcome::Fanout(FanoutReport::default()));
    assert!(a.drain().is_empty());
    assert!(server.log.send_failures.lock().unwrap().is_empty());
}

#[tokio::test]
async fn typing_indicator_reaches_the_other_subscriber() {
    let server = Server::new();
    let mut a = server.connect().await;
    let mut b = server.connect().await;
    server.frame(&a, json!({"type": "auth", "userId": 1})).await;
    server.frame(&b, json!({"type": "auth", "userId": 2})).await;
    server
        .frame(&a, json!({"type": "join_channel", "channelId": 10}))
        .await;

    server
        .frame(
            &b,
            json!({"type": "typing", "channelId": 10, "userId": 2, "isTyping": true}),
        )
        .await;

    assert_eq!(
        a.drain(),
        vec![json!({"type": "typing", "userId": 2, "channelId": 10, "isTyping": true})]
    );
    assert!(b.drain().is_empty());
}

#[tokio::test]
async fn no_cross_channel_leakage() {
    let server = Server::new();
    let a = server.connect().await;
    let mut b = server.connect().await;
    let mut c = server.connect().await;
    for (client, user) in [(&a, 1), (&b, 2), (&c, 3)] {
        server.frame(client, json!({"type": "auth", "userId": user})).await;
    }
    server.frame(&a, json!({"type": "join_channel", "channelId": 1})).await;
    server.frame(&b, json!({"type": "join_channel", "channelId": 1})).await;
    server.frame(&c, json!({"type": "join_channel", "channelId": 2})).await;

    server
        .frame(&a, json!({"type": "new_message", "channelId": 1, "data": "one"}))
        .await;
    server
        .frame(&a, json!({"type": "new_message", "channelId": 2, "data": "two"}))
        .await;

    assert_eq!(b.drain(), vec![json!({"type": "new_message", "message": "one"})]);
    assert_eq!(c.drain(), vec![json!({"type": "new_message", "message": "two"})]);
}

#[tokio::test]
async fn leave_stops_delivery() {
    let server = Server::new();
    let a = server.connect().await;
    let mut b = server.connect().await;
    for client in [&a, &b] {
        server.frame(client, json!({"type": "auth", "userId": 1})).await;
        server
            .frame(client, json!({"type": "join_channel", "channelId": 10}))
            .await;
    }
    server
        .frame(&b, json!({"type": "leave_channel", "channelId": 10}))
        .await;
    // Leaving twice is a no-op.
    server
        .frame(&b, json!({"type": "leave_channel", "channelId": 10}))
        .await;

    server
        .frame(&a, json!({"type": "new_message", "channelId": 10, "data": 1}))
        .await;

    assert!(b.drain().is_empty());
}

#[tokio::test]
async fn malformed_frames_leave_the_connection_usable() {
    let server = Server::new();
    let a = server.connect().await;
    let mut b = server.connect().await;

    for raw in ["", "[]", r#"{"type":"join_channel"}"#, r#"{"type":"nope","channelId":1}"#] {
        assert_eq!(
            server.dispatcher.on_frame(&a.id, raw).await,
            FrameOutcome::Rejected
        );
    }
    assert_eq!(*server.log.rejected.lock().unwrap(), 4);

    for client in [&a, &b] {
        server.frame(client, json!({"type": "auth", "userId": 1})).await;
        server
            .frame(client, json!({"type": "join_channel", "channelId": 10}))
            .await;
    }
    server
        .frame(&a, json!({"type": "new_message", "channelId": 10, "data": "still here"}))
        .await;

    assert_eq!(b.drain().len(), 1);
}

#[tokio::test]
async fn rest_handoff_broadcasts_to_all_subscribers() {
    let server = Server::new();
    let mut a = server.connect().await;
    let mut b = server.connect().await;
    for client in [&a, &b] {
        server
            .frame(client, json!({"type": "join_channel", "channelId": 5}))
            .await;
    }

    let fanout: Arc<dyn MessageFanout> = server.dispatcher.clone();
    let report = fanout
        .broadcast_message(ChannelId::new(5), json!({"id": 99, "content": "saved"}), None)
        .await;

    assert_eq!(report.delivered, 2);
    assert_eq!(a.drain().len(), 1);
    assert_eq!(b.drain().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fanout_with_concurrent_leave_delivers_a_consistent_set() {
    let server = Server::new();
    let sender = server.connect().await;
    server.frame(&sender, json!({"type": "auth", "userId": 0})).await;

    let mut subscribers = Vec::new();
    for user in 1..=100 {
        let client = server.connect().await;
        server.frame(&client, json!({"type": "auth", "userId": user})).await;
        server
            .frame(&client, json!({"type": "join_channel", "channelId": 10}))
            .await;
        subscribers.push(client);
    }
    let leaver_id = subscribers[50].id;

    let fanout = {
        let dispatcher = Arc::clone(&server.dispatcher);
        let sender_id = sender.id;
        tokio::spawn(async move {
            dispatcher
                .on_frame(
                    &sender_id,
                    r#"{"type":"new_message","channelId":10,"data":"burst"}"#,
                )
                .await
        })
    };
    let leave = {
        let dispatcher = Arc::clone(&server.dispatcher);
        tokio::spawn(async move {
            dispatcher
                .on_frame(&leaver_id, r#"{"type":"leave_channel","channelId":10}"#)
                .await
        })
    };

    let outcome = fanout.await.unwrap();
    assert_eq!(leave.await.unwrap(), FrameOutcome::Applied);

    let report = match outcome {
        FrameOutcome::Fanout(report) => report,
        other => panic!("expected fanout, got {:?}", other),
    };
    assert!(report.delivered == 100 || report.delivered == 99);
    assert_eq!(report.failed, 0);

    let leaver_frames = subscribers[50].drain().len();
    assert_eq!(leaver_frames, report.delivered - 99);
    for (i, client) in subscribers.iter_mut().enumerate() {
        if i != 50 {
            assert_eq!(client.drain().len(), 1);
        }
    }
}
