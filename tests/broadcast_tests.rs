//! Subscriber registry and broadcast fan-out tests

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, Notify};

use test_inbox::api::websocket::{
    serve_connection, EventBroadcaster, Frame, KeepAlive, Subscriber, SubscriberId,
    SubscriberRegistry, TransportError, HEARTBEAT,
};

/// Records every frame it is sent
struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<Frame>,
    closed: AtomicBool,
}

impl ChannelSubscriber {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Arc::new(Self {
            tx,
            closed: AtomicBool::new(false),
        });
        (subscriber, rx)
    }
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Every write fails
#[derive(Default)]
struct FailingSubscriber {
    attempts: AtomicUsize,
}

#[async_trait]
impl Subscriber for FailingSubscriber {
    async fn send(&self, _frame: Frame) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Io("broken pipe".to_string()))
    }

    async fn close(&self) {}
}

/// Every write blocks forever
#[derive(Default)]
struct BlockingSubscriber {
    entered: Notify,
}

#[async_trait]
impl Subscriber for BlockingSubscriber {
    async fn send(&self, _frame: Frame) -> Result<(), TransportError> {
        self.entered.notify_one();
        std::future::pending().await
    }

    async fn close(&self) {}
}

/// Peer that never acknowledges a close
struct StalledCloseSubscriber;

#[async_trait]
impl Subscriber for StalledCloseSubscriber {
    async fn send(&self, _frame: Frame) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&self) {
        std::future::pending::<()>().await
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Frame>) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

#[test]
fn test_registry_size_tracks_distinct_registrations() {
    let registry = SubscriberRegistry::new();
    let mut ids = Vec::new();
    for _ in 0..10 {
        let (subscriber, _rx) = ChannelSubscriber::new();
        ids.push(registry.register(subscriber));
    }
    assert_eq!(registry.len(), 10);

    for id in ids.iter().take(4) {
        registry.unregister(*id);
    }
    assert_eq!(registry.len(), 6);

    let distinct: HashSet<SubscriberId> = ids.into_iter().collect();
    assert_eq!(distinct.len(), 10);
}

#[test]
fn test_concurrent_register_and_unregister() {
    let registry = SubscriberRegistry::new();

    let doomed: Vec<SubscriberId> = (0..64)
        .map(|_| registry.register(Arc::new(FailingSubscriber::default())))
        .collect();

    let added: Vec<SubscriberId> = std::thread::scope(|scope| {
        let removers: Vec<_> = doomed
            .chunks(8)
            .map(|chunk| {
                let registry = &registry;
                scope.spawn(move || {
                    for id in chunk {
                        assert!(registry.unregister(*id));
                    }
                })
            })
            .collect();

        let adders: Vec<_> = (0..8)
            .map(|_| {
                let registry = &registry;
                scope.spawn(move || {
                    (0..16)
                        .map(|_| registry.register(Arc::new(FailingSubscriber::default())))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for remover in removers {
            remover.join().unwrap();
        }
        adders
            .into_iter()
            .flat_map(|adder| adder.join().unwrap())
            .collect()
    });

    assert_eq!(registry.len(), 128);
    assert!(added.iter().all(|id| registry.contains(*id)));
    assert!(doomed.iter().all(|id| !registry.contains(*id)));

    let snapshot: HashSet<SubscriberId> = registry.snapshot().into_iter().map(|(id, _)| id).collect();
    let expected: HashSet<SubscriberId> = added.into_iter().collect();
    assert_eq!(snapshot, expected);
}

#[tokio::test]
async fn test_broadcast_isolates_failing_subscriber() {
    let broadcaster = EventBroadcaster::default();
    let (first, mut first_rx) = ChannelSubscriber::new();
    let failing = Arc::new(FailingSubscriber::default());
    let (last, mut last_rx) = ChannelSubscriber::new();

    broadcaster.registry().register(first);
    broadcaster.registry().register(failing.clone());
    broadcaster.registry().register(last);

    broadcaster.broadcast(Frame::text("hello")).await;

    assert_eq!(drain(&mut first_rx), vec![Frame::text("hello")]);
    assert_eq!(drain(&mut last_rx), vec![Frame::text("hello")]);
    assert_eq!(failing.attempts.load(Ordering::SeqCst), 1);
    // The broadcaster never evicts; the subscriber's own read loop does
    assert_eq!(broadcaster.registry().len(), 3);
}

#[tokio::test]
async fn test_blocked_write_does_not_block_registry() {
    let broadcaster = Arc::new(EventBroadcaster::new(Duration::from_secs(3600)));
    let blocking = Arc::new(BlockingSubscriber::default());
    let (healthy, mut healthy_rx) = ChannelSubscriber::new();
    let (leaving, _leaving_rx) = ChannelSubscriber::new();

    broadcaster.registry().register(blocking.clone());
    broadcaster.registry().register(healthy);
    let leaving_id = broadcaster.registry().register(leaving);

    let task = {
        let broadcaster = Arc::clone(&broadcaster);
        tokio::spawn(async move { broadcaster.broadcast(Frame::text("hello")).await })
    };
    blocking.entered.notified().await;

    let removed = tokio::time::timeout(Duration::from_secs(1), async {
        broadcaster.registry().unregister(leaving_id)
    })
    .await
    .expect("unregister stalled behind a blocked write");
    assert!(removed);

    let (late, _late_rx) = ChannelSubscriber::new();
    broadcaster.registry().register(late);
    assert_eq!(broadcaster.registry().len(), 3);

    // Healthy peers were served in the same pass
    assert_eq!(drain(&mut healthy_rx), vec![Frame::text("hello")]);

    task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_blocked_write_times_out() {
    let broadcaster = EventBroadcaster::new(Duration::from_secs(2));
    let (healthy, mut healthy_rx) = ChannelSubscriber::new();
    broadcaster.registry().register(Arc::new(BlockingSubscriber::default()));
    broadcaster.registry().register(healthy);

    broadcaster.broadcast(Frame::text("hello")).await;

    assert_eq!(drain(&mut healthy_rx), vec![Frame::text("hello")]);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_every_interval() {
    let broadcaster = Arc::new(EventBroadcaster::default());
    let mut receivers = Vec::new();
    for _ in 0..3 {
        let (subscriber, rx) = ChannelSubscriber::new();
        broadcaster.registry().register(subscriber);
        receivers.push(rx);
    }

    let keepalive = KeepAlive::spawn(Arc::clone(&broadcaster), Duration::from_secs(5));
    tokio::time::advance(Duration::from_secs(5)).await;

    for rx in receivers.iter_mut() {
        assert_eq!(rx.recv().await, Some(Frame::text(HEARTBEAT)));
        assert!(rx.try_recv().is_err(), "expected exactly one heartbeat");
    }

    keepalive.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_heartbeat_after_shutdown() {
    let broadcaster = Arc::new(EventBroadcaster::default());
    let (subscriber, mut rx) = ChannelSubscriber::new();
    broadcaster.registry().register(subscriber);

    let keepalive = KeepAlive::spawn(Arc::clone(&broadcaster), Duration::from_secs(5));
    keepalive.shutdown().await;

    tokio::time::advance(Duration::from_secs(30)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_two_subscribers_receive_broadcast() {
    let broadcaster = EventBroadcaster::default();
    let (s1, mut rx1) = ChannelSubscriber::new();
    let (s2, mut rx2) = ChannelSubscriber::new();
    broadcaster.registry().register(s1);
    broadcaster.registry().register(s2);

    broadcaster.broadcast(Frame::text("hello")).await;

    assert_eq!(drain(&mut rx1), vec![Frame::text("hello")]);
    assert_eq!(drain(&mut rx2), vec![Frame::text("hello")]);
    assert_eq!(broadcaster.registry().len(), 2);
}

#[tokio::test]
async fn test_unregistered_subscriber_receives_nothing() {
    let broadcaster = EventBroadcaster::default();
    let (s1, mut rx1) = ChannelSubscriber::new();
    let id = broadcaster.registry().register(s1);
    broadcaster.registry().unregister(id);

    broadcaster.broadcast(Frame::text("hello")).await;

    assert!(drain(&mut rx1).is_empty());
}

#[tokio::test]
async fn test_concurrent_broadcasts_reach_everyone() {
    let broadcaster = Arc::new(EventBroadcaster::default());
    let (subscriber, mut rx) = ChannelSubscriber::new();
    broadcaster.registry().register(subscriber);

    let a = {
        let broadcaster = Arc::clone(&broadcaster);
        tokio::spawn(async move { broadcaster.broadcast(Frame::text("event")).await })
    };
    let b = {
        let broadcaster = Arc::clone(&broadcaster);
        tokio::spawn(async move { broadcaster.heartbeat().await })
    };
    a.await.unwrap();
    b.await.unwrap();

    let mut frames = drain(&mut rx);
    frames.sort_by_key(|frame| format!("{frame:?}"));
    assert_eq!(frames, vec![Frame::text("event"), Frame::text(HEARTBEAT)]);
}

#[tokio::test]
async fn test_read_failure_unregisters_subscriber() {
    let broadcaster = Arc::new(EventBroadcaster::default());
    let (subscriber, mut rx) = ChannelSubscriber::new();
    let (inbound_tx, inbound_rx) = futures::channel::mpsc::unbounded::<Result<Message, io::Error>>();

    let connection = {
        let broadcaster = Arc::clone(&broadcaster);
        let subscriber: Arc<dyn Subscriber> = subscriber.clone();
        tokio::spawn(async move { serve_connection(&broadcaster, subscriber, inbound_rx).await })
    };

    while broadcaster.registry().is_empty() {
        tokio::task::yield_now().await;
    }
    assert_eq!(broadcaster.registry().len(), 1);

    inbound_tx
        .unbounded_send(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer")))
        .unwrap();
    connection.await.unwrap();

    assert!(broadcaster.registry().is_empty());
    assert!(subscriber.closed.load(Ordering::SeqCst));

    broadcaster.broadcast(Frame::text("hello")).await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_ping_answered_and_close_ends_loop() {
    let broadcaster = EventBroadcaster::default();
    let (subscriber, mut rx) = ChannelSubscriber::new();
    let inbound = futures::stream::iter(vec![
        Ok::<_, io::Error>(Message::Text(r#"{"type":"ping"}"#.to_string())),
        Ok(Message::Text("not json".to_string())),
        Ok(Message::Close(None)),
        Ok(Message::Text(r#"{"type":"ping"}"#.to_string())),
    ]);

    serve_connection(&broadcaster, subscriber.clone(), inbound).await;

    assert_eq!(drain(&mut rx), vec![Frame::text(r#"{"type":"pong"}"#)]);
    assert!(broadcaster.registry().is_empty());
    assert!(subscriber.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_stream_end_unregisters() {
    let broadcaster = EventBroadcaster::default();
    let (subscriber, _rx) = ChannelSubscriber::new();

    serve_connection(&broadcaster, subscriber, futures::stream::empty::<Result<Message, io::Error>>()).await;

    assert!(broadcaster.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stalled_close_does_not_hold_connection_open() {
    let broadcaster = EventBroadcaster::new(Duration::from_secs(2));
    let started = tokio::time::Instant::now();

    serve_connection(
        &broadcaster,
        Arc::new(StalledCloseSubscriber),
        futures::stream::empty::<Result<Message, io::Error>>(),
    )
    .await;

    assert!(broadcaster.registry().is_empty());
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(started.elapsed() < Duration::from_secs(3));
}
